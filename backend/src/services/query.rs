//! Query service
//!
//! Answers a natural language question about an uploaded file:
//! describe the table, have the model write SQL, run it read-only, then have
//! the model explain the rows and shape them for the requested mode.

use super::uploads::UploadService;
use crate::db::tables;
use crate::error::AppError;
use crate::llm::prompts::{self, AnswerContext};
use crate::llm::{LanguageModel, LlmError};
use crate::query::{schema, shape, sql, QueryMode, QueryResponse};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Validated query parameters
#[derive(Debug, Clone)]
pub struct QueryParams {
    /// Trimmed question
    pub question: String,
    /// Rows kept for non-aggregated results
    pub top_k: usize,
    pub mode: QueryMode,
    /// Table to query instead of the latest upload
    pub table_name: Option<String>,
}

/// Query service
#[derive(Clone)]
pub struct QueryService {
    pool: SqlitePool,
    uploads: UploadService,
    llm: Arc<dyn LanguageModel>,
}

impl QueryService {
    /// Query service over `pool`, answering with `llm`
    pub fn new(pool: SqlitePool, uploads: UploadService, llm: Arc<dyn LanguageModel>) -> Self {
        Self { pool, uploads, llm }
    }

    /// Answer a question against the caller's data
    pub async fn query(&self, user_id: &str, params: QueryParams) -> Result<QueryResponse, AppError> {
        let table_name = self
            .uploads
            .resolve_table(user_id, params.table_name.as_deref())
            .await?;
        let table_schema = schema::describe_for_prompt(&self.pool, &table_name).await;

        let generated = self
            .generate_sql(&params.question, &table_schema, &table_name)
            .await?;
        if !sql::is_read_only(&generated) {
            warn!(sql = %generated, "Refusing generated statement");
            return Err(AppError::Upstream(
                "Generated query was rejected: only a single read-only SELECT statement is allowed"
                    .to_string(),
            ));
        }
        if !sql::reads_only_from(&generated, &table_name) {
            warn!(sql = %generated, table = %table_name, "Refusing statement outside the selected table");
            return Err(AppError::Upstream(format!(
                "Generated query was rejected: it may only read from table '{}'",
                table_name
            )));
        }

        let results = self.execute(&generated, params.top_k).await;
        info!(
            table = %table_name,
            mode = params.mode.as_str(),
            rows = results.len(),
            "Query executed"
        );

        let answer = self
            .answer(&params.question, &results, &table_schema, params.mode)
            .await;

        let (visualization_data, table_data) = match params.mode {
            QueryMode::Graph => (
                shape::visualization_data(&results, &params.question, &generated),
                None,
            ),
            QueryMode::Table => (None, shape::table_data(&results)),
            QueryMode::Text => (None, None),
        };

        Ok(QueryResponse {
            answer,
            results: if results.is_empty() {
                None
            } else {
                Some(results)
            },
            sql_query: generated,
            table_name,
            mode: params.mode,
            visualization_data,
            table_data,
        })
    }

    async fn generate_sql(
        &self,
        question: &str,
        table_schema: &str,
        table_name: &str,
    ) -> Result<String, AppError> {
        if !self.llm.is_configured() {
            return Err(AppError::Upstream(
                "GEMINI_KEY not found in environment variables. Please set GEMINI_KEY in your .env file."
                    .to_string(),
            ));
        }

        let failed = || {
            AppError::Upstream(
                "Failed to generate SQL query. Please check Gemini API configuration and ensure your API key is valid."
                    .to_string(),
            )
        };

        let prompt = prompts::sql_prompt(table_schema, table_name, question);
        let raw = self.llm.generate(&prompt).await.map_err(|e| {
            warn!(error = %e, "SQL generation failed");
            failed()
        })?;

        let statement = sql::strip_code_fences(&raw);
        if statement.is_empty() {
            return Err(failed());
        }
        debug!(sql = %statement, "Generated SQL");
        Ok(statement)
    }

    /// Run with the row policy applied; failures yield no rows
    async fn execute(&self, statement: &str, top_k: usize) -> Vec<Map<String, Value>> {
        let (limited, aggregation) = sql::apply_row_limit(statement, top_k);
        match tables::execute_select(&self.pool, &limited).await {
            Ok(mut rows) => {
                if !aggregation {
                    rows.truncate(top_k);
                }
                rows
            }
            Err(e) => {
                warn!(sql = %limited, error = %e, "Error executing SQL");
                Vec::new()
            }
        }
    }

    async fn answer(
        &self,
        question: &str,
        results: &[Map<String, Value>],
        table_schema: &str,
        mode: QueryMode,
    ) -> String {
        let results_json = serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".into());

        let prompt = match mode {
            QueryMode::Table => prompts::table_summary_prompt(question, &results_json, results.len()),
            QueryMode::Text | QueryMode::Graph => {
                let result_columns: Vec<String> = results
                    .first()
                    .map(|row| row.keys().cloned().collect())
                    .unwrap_or_default();
                let calculations = shape::calculations(results, question)
                    .and_then(|c| serde_json::to_string_pretty(&c).ok());
                prompts::analyst_prompt(&AnswerContext {
                    question,
                    schema: table_schema,
                    result_columns: &result_columns,
                    results_json: &results_json,
                    row_count: results.len(),
                    calculations_json: calculations.as_deref(),
                })
            }
        };

        match self.llm.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => answer_error(&e),
        }
    }
}

fn answer_error(e: &LlmError) -> String {
    format!("Error generating answer: {}", e)
}
