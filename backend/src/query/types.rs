//! Query request and response payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the client wants the answer presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Plain answer
    #[default]
    Text,
    /// Answer plus chart data
    Graph,
    /// Answer plus a result grid
    Table,
}

impl QueryMode {
    /// Parse a mode name, ignoring case; unknown names mean text
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
            Some("graph") => Self::Graph,
            Some("table") => Self::Table,
            _ => Self::Text,
        }
    }

    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Graph => "graph",
            Self::Table => "table",
        }
    }
}

/// Body of a query request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural language question
    pub query: String,
    /// Rows to return for non-aggregated queries (1..=50, default 5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    /// `text`, `graph` or `table`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Table to query instead of the latest upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
}

/// Labelled series for bar, line and pie charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesChart {
    /// Category per bar, point or slice
    pub labels: Vec<String>,
    /// Value per label
    pub values: Vec<f64>,
    /// Axis caption for the labels
    pub category_label: String,
    /// Axis caption for the values
    pub value_label: String,
    /// Chart title
    pub title: String,
}

/// Chart payload for graph mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chart_type", rename_all = "snake_case")]
pub enum VisualizationData {
    /// Bars per category
    BarChart(SeriesChart),
    /// Points in order
    LineChart(SeriesChart),
    /// Share of the total per category
    PieChart(SeriesChart),
    /// One headline number
    SingleValue {
        /// The number itself
        value: f64,
        /// Caption under the number
        label: String,
        /// Chart title
        title: String,
    },
}

impl VisualizationData {
    /// Wire name of the chart type
    pub fn chart_type(&self) -> &'static str {
        match self {
            Self::BarChart(_) => "bar_chart",
            Self::LineChart(_) => "line_chart",
            Self::PieChart(_) => "pie_chart",
            Self::SingleValue { .. } => "single_value",
        }
    }

    /// Chart title
    pub fn title(&self) -> &str {
        match self {
            Self::BarChart(s) | Self::LineChart(s) | Self::PieChart(s) => &s.title,
            Self::SingleValue { title, .. } => title,
        }
    }
}

/// Stringified result grid for table mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Column names of the result
    pub headers: Vec<String>,
    /// Cells rendered as text
    pub rows: Vec<Vec<String>>,
    /// Number of result rows
    pub row_count: usize,
}

/// Data section of a successful query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Model-written answer
    pub answer: String,
    /// Result rows; `null` when the query matched nothing
    pub results: Option<Vec<Map<String, Value>>>,
    /// Statement that was executed, before the row limit
    pub sql_query: String,
    /// Table the statement ran against
    pub table_name: String,
    /// Mode the answer was shaped for
    pub mode: QueryMode,
    /// Present in graph mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization_data: Option<VisualizationData>,
    /// Present in table mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_data: Option<TableData>,
}
