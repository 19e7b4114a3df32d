//! Natural language query pipeline pieces
//!
//! Schema description, generated-SQL handling and result shaping. The
//! orchestration lives in [`crate::services::query`].

pub mod schema;
pub mod shape;
pub mod sql;
pub mod types;

pub use types::{QueryMode, QueryRequest, QueryResponse, SeriesChart, TableData, VisualizationData};
