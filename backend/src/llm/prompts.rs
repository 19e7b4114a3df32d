//! Prompt templates for SQL generation and answer writing

/// Characters of result JSON shown to the model in table mode
const TABLE_PREVIEW_CHARS: usize = 500;

/// Prompt asking for one SQLite SELECT answering `question`
pub fn sql_prompt(schema: &str, table_name: &str, question: &str) -> String {
    format!(
        r#"You are an expert SQL query generator for traffic challan (traffic fine) data. Convert the user's question into one precise SQLite SELECT statement.

TABLE SCHEMA:
{schema}

TABLE NAME: "{table_name}"

USER QUERY: {question}

REQUIREMENTS:
1. Return ONLY the SQL statement. No explanations, no markdown, no code fences.
2. Produce exactly one SELECT statement (a WITH clause is allowed). Never modify data.
3. Use the exact table name "{table_name}" in double quotes.
4. Use the exact column names from the schema, in double quotes.
5. Combine multiple conditions with AND/OR as the question implies.

DATA TYPES:
Every column is stored as TEXT. Always CAST numeric columns:
- Amounts: CAST("challan_amount" AS REAL)
- Counts and ids: CAST("column" AS INTEGER)
- Cast both sides of numeric comparisons and every operand of calculations.

FILTERING:
- Partial matches: "column" LIKE '%value%'
- Case-insensitive matches: LOWER("column") LIKE LOWER('%value%')
- Ranges: BETWEEN or >= AND <=
- Missing values: IS NULL / IS NOT NULL

AGGREGATION:
- Totals: SUM(CAST("challan_amount" AS REAL)) AS total_amount
- Averages: AVG(CAST("challan_amount" AS REAL)) AS avg_amount
- Counts: COUNT(*) AS total_count, COUNT(DISTINCT "column") for unique values
- Extremes: MAX(...) AS max_amount, MIN(...) AS min_amount
- Breakdowns: put the grouping column first, then the aggregate, and GROUP BY it
- Percentages: (COUNT(*) * 100.0 / (SELECT COUNT(*) FROM "{table_name}")) AS percentage

SORTING AND LIMITS:
- "top", "highest", "maximum": ORDER BY ... DESC LIMIT N
- "bottom", "lowest", "minimum": ORDER BY ... ASC LIMIT N
- Respect any N the user asks for.

EXAMPLES:
- "Show all challans above 1000 rupees"
  SELECT * FROM "{table_name}" WHERE CAST("challan_amount" AS REAL) > 1000
- "Total challan amount collected"
  SELECT SUM(CAST("challan_amount" AS REAL)) AS total_amount FROM "{table_name}"
- "Count of challans by vehicle class"
  SELECT "vehicle_class", COUNT(*) AS total_count FROM "{table_name}" GROUP BY "vehicle_class" ORDER BY total_count DESC
- "What percentage of challans are pending?"
  SELECT (COUNT(CASE WHEN LOWER("challan_status") LIKE '%pending%' THEN 1 END) * 100.0 / COUNT(*)) AS percentage FROM "{table_name}"
- "Challans by date"
  SELECT "challan_date", COUNT(*) AS total_count FROM "{table_name}" GROUP BY "challan_date" ORDER BY "challan_date"

Generate the SQL query now (ONLY SQL):"#
    )
}

/// Prompt for the one or two sentence caption above a result table
pub fn table_summary_prompt(question: &str, results_json: &str, row_count: usize) -> String {
    let preview: String = results_json.chars().take(TABLE_PREVIEW_CHARS).collect();
    format!(
        r#"You are a data analyst. Write a VERY BRIEF summary (1-2 sentences maximum) of query results that will be shown as a table.

- Keep it short; the table below carries the details.
- State what is being shown, for example "Found {row_count} records matching your query."

USER QUERY: {question}
NUMBER OF RESULTS: {row_count}

RETRIEVED DATA ROWS ({row_count} rows):
{preview}... (data will be shown in table)

Generate ONLY a brief 1-2 sentence summary:"#
    )
}

/// Inputs for the full analyst prompt
pub struct AnswerContext<'a> {
    /// The user's question
    pub question: &'a str,
    /// Schema description of the queried table
    pub schema: &'a str,
    /// Columns of the first result row
    pub result_columns: &'a [String],
    /// Result rows as pretty JSON
    pub results_json: &'a str,
    /// Number of result rows
    pub row_count: usize,
    /// Derived totals and percentages, if any
    pub calculations_json: Option<&'a str>,
}

/// Prompt for a complete natural language answer
pub fn analyst_prompt(ctx: &AnswerContext<'_>) -> String {
    let column_info = if ctx.result_columns.is_empty() {
        String::new()
    } else {
        format!(
            "\nAvailable columns in results: {}",
            ctx.result_columns.join(", ")
        )
    };
    let calculations = ctx
        .calculations_json
        .map(|c| format!("\n\nCalculated/Aggregated Values: {}", c))
        .unwrap_or_default();

    format!(
        r#"You are an expert data analyst for traffic challan (traffic fine) data. Answer the user's question using only the rows retrieved from the uploaded file.

TABLE STRUCTURE:
{schema}
{column_info}

USER QUERY:
{question}

RETRIEVED DATA ROWS ({row_count} rows):
{results}{calculations}

DOMAIN NOTES:
- Challan Amount is the fine in rupees.
- Challan Place and Latitue Longtitue locate the offence.
- Vehicle Number and Vehicle Class describe the vehicle; Violator and Owner fields describe the people involved.
- Challan Status, Send To Court Date and Court Name track the case.

RULES:
1. Answer strictly from the retrieved rows. Never guess or use outside knowledge.
2. If the answer is not in the data, say "No records match the criteria".
3. Quote values exactly as they appear.
4. Use the aggregated values when present instead of recounting rows.
5. Format currency with the ₹ symbol and Indian digit grouping (₹1,25,000), and percentages as "X%".

RESPONSE FORMAT:
- Start with a direct answer in the first sentence.
- Then give the supporting details: record counts, breakdowns, highest/lowest values.
- Use bullet points for lists and breakdowns.
- Be complete but concise.

Now answer the user's query:"#,
        schema = ctx.schema,
        column_info = column_info,
        question = ctx.question,
        row_count = ctx.row_count,
        results = ctx.results_json,
        calculations = calculations,
    )
}
