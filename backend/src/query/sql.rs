//! Handling of model-generated SQL

/// Keywords that mark a statement as an aggregation
const AGGREGATION_MARKERS: &[&str] = &[
    "sum(",
    "avg(",
    "count(",
    "max(",
    "min(",
    "group by",
    "having",
    "percentage",
];

/// Row cap appended to aggregations without their own LIMIT
pub const AGGREGATION_LIMIT: usize = 100;

const WRITE_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "attach", "detach",
    "pragma", "vacuum", "reindex", "analyze", "begin", "commit", "rollback", "savepoint",
];

/// Strip Markdown code fences around a generated statement
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() <= 2 {
        return trimmed.trim_matches('`').trim().to_string();
    }
    lines.remove(0);
    if lines.last().is_some_and(|l| l.trim().starts_with("```")) {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

/// Tables the gateway keeps for itself
const RESERVED_TABLES: &[&str] = &["users", "excel_uploads"];

/// Prefixes of SQLite and migration internals
const RESERVED_PREFIXES: &[&str] = &["sqlite_", "_sqlx", "pragma_"];

/// Words that end a table reference in a FROM list
const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "group", "order", "limit", "having", "window", "union", "intersect", "except",
    "join", "inner", "left", "right", "full", "outer", "cross", "natural", "on", "using",
];

/// A lexical unit of a statement
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Keyword or identifier, lowercased; quoted identifiers are never keywords
    Word { text: String, quoted: bool },
    /// String literal, content dropped
    Literal,
    Punct(char),
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word { text, quoted: false } if text == keyword)
    }

    fn word(&self) -> Option<&str> {
        match self {
            Token::Word { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Split a statement into tokens, skipping comments and whitespace
fn tokenize(sql: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                while let Some(n) = chars.next() {
                    if n == '\'' {
                        // '' is an escaped quote
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                tokens.push(Token::Literal);
            }
            '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                let mut text = String::new();
                while let Some(n) = chars.next() {
                    if n == close {
                        if close != ']' && chars.peek() == Some(&close) {
                            chars.next();
                            text.push(close);
                        } else {
                            break;
                        }
                    } else {
                        text.push(n);
                    }
                }
                tokens.push(Token::Word {
                    text: text.to_lowercase(),
                    quoted: true,
                });
            }
            '-' if chars.peek() == Some(&'-') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut text: String = c.to_lowercase().collect();
                while let Some(&n) = chars.peek() {
                    if n.is_alphanumeric() || n == '_' || n == '$' {
                        text.extend(n.to_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word {
                    text,
                    quoted: false,
                });
            }
            c if c.is_whitespace() => {}
            c => tokens.push(Token::Punct(c)),
        }
    }
    tokens
}

/// Index just past the group opened at `start`
fn skip_group(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    for (offset, token) in tokens[start..].iter().enumerate() {
        match token {
            Token::Punct('(') => depth += 1,
            Token::Punct(')') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return start + offset + 1;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

/// Names the statement defines in its WITH clause
fn cte_names(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    for (i, token) in tokens.iter().enumerate().skip(1) {
        let Some(name) = token.word() else { continue };
        let prev = &tokens[i - 1];
        if !(prev.is_keyword("with") || prev.is_keyword("recursive") || *prev == Token::Punct(',')) {
            continue;
        }

        // name [(columns)] AS [NOT] [MATERIALIZED] (
        let mut j = i + 1;
        if tokens.get(j) == Some(&Token::Punct('(')) {
            j = skip_group(tokens, j);
        }
        if !tokens.get(j).is_some_and(|t| t.is_keyword("as")) {
            continue;
        }
        j += 1;
        while tokens
            .get(j)
            .is_some_and(|t| t.is_keyword("not") || t.is_keyword("materialized"))
        {
            j += 1;
        }
        if tokens.get(j) == Some(&Token::Punct('(')) {
            names.push(name.to_string());
        }
    }
    names
}

/// Tables named by the FROM list or JOIN target starting at `i`
///
/// Subqueries are skipped here; their own FROM clauses are read separately.
fn table_refs(tokens: &[Token], mut i: usize) -> Vec<String> {
    let mut names = Vec::new();
    loop {
        match tokens.get(i) {
            Some(Token::Punct('(')) => i = skip_group(tokens, i),
            Some(Token::Word { text, .. }) => {
                let mut name = text.clone();
                i += 1;
                // schema.table
                if tokens.get(i) == Some(&Token::Punct('.')) {
                    if let Some(Token::Word { text, .. }) = tokens.get(i + 1) {
                        name = text.clone();
                        i += 2;
                    }
                }
                names.push(name);
                // table-valued function arguments
                if tokens.get(i) == Some(&Token::Punct('(')) {
                    i = skip_group(tokens, i);
                }
            }
            _ => break,
        }

        if tokens.get(i).is_some_and(|t| t.is_keyword("as")) {
            i += 1;
        }
        if let Some(Token::Word { text, quoted }) = tokens.get(i) {
            if *quoted || !CLAUSE_KEYWORDS.contains(&text.as_str()) {
                i += 1;
            }
        }
        if tokens.get(i) == Some(&Token::Punct(',')) {
            i += 1;
        } else {
            break;
        }
    }
    names
}

fn is_reserved(name: &str) -> bool {
    RESERVED_TABLES.contains(&name) || RESERVED_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Drop trailing semicolons and whitespace
pub fn trim_statement(sql: &str) -> &str {
    sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Accept only a single SELECT (or WITH ... SELECT) statement
pub fn is_read_only(sql: &str) -> bool {
    let tokens = tokenize(trim_statement(sql));
    if tokens.contains(&Token::Punct(';')) {
        return false;
    }
    match tokens.first() {
        Some(t) if t.is_keyword("select") || t.is_keyword("with") => {}
        _ => return false,
    }
    !tokens
        .iter()
        .any(|t| WRITE_KEYWORDS.iter().any(|k| t.is_keyword(k)))
}

/// Accept a statement only if every table it reads is `table` or a CTE it defines
///
/// Names of the gateway's own tables and of SQLite internals are refused
/// wherever they appear.
pub fn reads_only_from(sql: &str, table: &str) -> bool {
    let tokens = tokenize(trim_statement(sql));
    if tokens.iter().filter_map(Token::word).any(is_reserved) {
        return false;
    }

    let table = table.to_lowercase();
    let ctes = cte_names(&tokens);
    for (i, token) in tokens.iter().enumerate() {
        // IS [NOT] DISTINCT FROM compares values
        let from = token.is_keyword("from") && !(i > 0 && tokens[i - 1].is_keyword("distinct"));
        if !(from || token.is_keyword("join")) {
            continue;
        }
        let refs = table_refs(&tokens, i + 1);
        if refs.iter().any(|name| *name != table && !ctes.contains(name)) {
            return false;
        }
    }
    true
}

/// Whether the statement aggregates rows
pub fn is_aggregation(sql: &str) -> bool {
    let lower = sql.to_lowercase();
    AGGREGATION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Statement to execute and whether it aggregates
///
/// A statement without a LIMIT gets `LIMIT top_k * 2`, or
/// [`AGGREGATION_LIMIT`] for aggregations.
pub fn apply_row_limit(sql: &str, top_k: usize) -> (String, bool) {
    let statement = trim_statement(sql);
    let aggregation = is_aggregation(statement);
    if statement.to_lowercase().contains("limit") {
        return (statement.to_string(), aggregation);
    }

    let limit = if aggregation {
        AGGREGATION_LIMIT
    } else {
        top_k * 2
    };
    (format!("{} LIMIT {}", statement, limit), aggregation)
}
