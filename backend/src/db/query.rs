//! Query definition loading and parameter binding.
//!
//! The review query lives in a plain SQL file that uses named parameters
//! (`:start_time`, `:end_time`, `:time_window`). Loading rewrites those names
//! into positional placeholders (`$1`, `$2`, ...) so the values can always be
//! bound by the driver, and records which parameter contract the file follows.
//! Binding then wraps the query in a projection that casts its columns to a
//! fixed type set, so every backend reads the same result contract.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{ResultShape, TimeWindow, TimeframeSelection};

/// Alias given to the user query inside the wrapping projection.
const SUBQUERY_ALIAS: &str = "review_check";

/// A named parameter recognised in query files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedParam {
    StartTime,
    EndTime,
    TimeWindow,
}

impl NamedParam {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "start_time" => Some(NamedParam::StartTime),
            "end_time" => Some(NamedParam::EndTime),
            "time_window" => Some(NamedParam::TimeWindow),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NamedParam::StartTime => "start_time",
            NamedParam::EndTime => "end_time",
            NamedParam::TimeWindow => "time_window",
        }
    }
}

/// How the time window reaches the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterContract {
    /// The query filters on its own; nothing is bound.
    None,
    /// `start_time` and `end_time` are bound as timestamps.
    Range,
    /// `time_window` is bound as an interval literal such as `24 hours`.
    Interval,
}

/// A value ready to be handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BoundValue {
    Timestamp(DateTime<Utc>),
    Text(String),
}

/// A parsed query file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDefinition {
    source: Option<PathBuf>,
    sql: String,
    params: Vec<NamedParam>,
    contract: ParameterContract,
}

/// Query text with its positional values, ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundQuery {
    pub sql: String,
    pub values: Vec<BoundValue>,
    pub shape: ResultShape,
    pub contract: ParameterContract,
    /// The window the values were derived from.
    pub window: TimeWindow,
}

impl QueryDefinition {
    /// Read and parse a query file.
    ///
    /// A missing or unreadable file is reported as `NotFound`; the file is
    /// read again on every call.
    pub async fn load(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            RepositoryError::not_found_with_context(
                format!("Error: '{}' file not found in the directory.", file_name),
                ErrorContext::new("load_query")
                    .with_entity("query_file")
                    .with_details(format!("{}: {}", path.display(), e)),
            )
        })?;

        let mut definition = Self::parse(&text).map_err(|e| match e {
            RepositoryError::QueryError { message, context } => RepositoryError::QueryError {
                message,
                context: context.with_details(path.display().to_string()),
            },
            other => other,
        })?;
        definition.source = Some(path.to_path_buf());
        Ok(definition)
    }

    /// Parse query text, rewriting named parameters in order of first
    /// appearance.
    pub fn parse(text: &str) -> RepositoryResult<Self> {
        let trimmed = strip_trailing_terminators(text);
        if trimmed.is_empty() {
            return Err(RepositoryError::query_with_context(
                "Query file is empty",
                ErrorContext::new("parse_query").with_entity("query_file"),
            ));
        }

        let (sql, params) = rewrite_named_params(trimmed)?;

        let uses_range = params
            .iter()
            .any(|p| matches!(p, NamedParam::StartTime | NamedParam::EndTime));
        let uses_interval = params.contains(&NamedParam::TimeWindow);
        let contract = match (uses_range, uses_interval) {
            (true, true) => {
                return Err(RepositoryError::query_with_context(
                    "Query mixes :start_time/:end_time with :time_window",
                    ErrorContext::new("parse_query").with_entity("query_file"),
                ))
            }
            (true, false) => ParameterContract::Range,
            (false, true) => ParameterContract::Interval,
            (false, false) => ParameterContract::None,
        };

        Ok(Self {
            source: None,
            sql,
            params,
            contract,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Query text with positional placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[NamedParam] {
        &self.params
    }

    pub fn contract(&self) -> ParameterContract {
        self.contract
    }

    /// Bind the resolved window and wrap the query for `shape`.
    ///
    /// An interval-only query cannot express a custom range, so that
    /// combination is rejected.
    pub fn bind(
        &self,
        window: TimeWindow,
        selection: &TimeframeSelection,
        shape: ResultShape,
    ) -> RepositoryResult<BoundQuery> {
        let mut values = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let value = match param {
                NamedParam::StartTime => BoundValue::Timestamp(window.start),
                NamedParam::EndTime => BoundValue::Timestamp(window.end),
                NamedParam::TimeWindow => match selection {
                    TimeframeSelection::Preset { preset } => {
                        BoundValue::Text(preset.interval_literal().to_string())
                    }
                    TimeframeSelection::Custom { .. } => {
                        return Err(RepositoryError::query_with_context(
                            "Query only accepts :time_window and cannot filter a custom range",
                            ErrorContext::new("bind_query").with_entity("query_file"),
                        ))
                    }
                },
            };
            values.push(value);
        }

        Ok(BoundQuery {
            sql: wrap_for_shape(&self.sql, shape),
            values,
            shape,
            contract: self.contract,
            window,
        })
    }
}

/// Wrap the query so its columns come back with canonical types.
pub fn wrap_for_shape(sql: &str, shape: ResultShape) -> String {
    let projection = match shape {
        ResultShape::Report => concat!(
            "\"report_type\"::text AS report_type, ",
            "\"label\"::text AS label, ",
            "\"annotator\"::text AS annotator, ",
            "\"count\"::float8 AS count"
        ),
        ResultShape::Legacy => concat!(
            "\"incident_check\"::text AS incident_check, ",
            "\"incident_count\"::float8 AS incident_count"
        ),
    };
    format!(
        "SELECT {} FROM (\n{}\n) AS {}",
        projection, sql, SUBQUERY_ALIAS
    )
}

fn strip_trailing_terminators(text: &str) -> &str {
    let mut trimmed = text.trim();
    while let Some(rest) = trimmed.strip_suffix(';') {
        trimmed = rest.trim_end();
    }
    trimmed
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Scan the query, replacing `:name` outside literals, quoted identifiers,
/// comments and `::` casts.
fn rewrite_named_params(sql: &str) -> RepositoryResult<(String, Vec<NamedParam>)> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut params: Vec<NamedParam> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '$' {
            if let Some(tag_end) = dollar_tag_end(&chars, i) {
                let end = find_dollar_close(&chars, tag_end, &chars[i..tag_end]);
                out.extend(&chars[i..end]);
                i = end;
                continue;
            }
        }

        match c {
            '\'' | '"' => {
                let escapes = c == '\'' && is_escape_string_prefix(&chars, i);
                let end = find_closing_quote(&chars, i + 1, c, escapes);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if next == Some('-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if next == Some('*') => {
                let mut end = chars.len();
                let mut j = i + 2;
                while j + 1 < chars.len() {
                    if chars[j] == '*' && chars[j + 1] == '/' {
                        end = j + 2;
                        break;
                    }
                    j += 1;
                }
                out.extend(&chars[i..end]);
                i = end;
            }
            '$' if next.is_some_and(|n| n.is_ascii_digit()) => {
                return Err(RepositoryError::query_with_context(
                    "Positional placeholders are not supported; use :start_time, :end_time or :time_window",
                    ErrorContext::new("parse_query").with_entity("query_file"),
                ));
            }
            ':' if next == Some(':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if next.is_some_and(is_ident_start) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let param = NamedParam::from_name(&name).ok_or_else(|| {
                    RepositoryError::query_with_context(
                        format!("Unknown query parameter ':{}'", name),
                        ErrorContext::new("parse_query").with_entity("query_file"),
                    )
                })?;
                let position = match params.iter().position(|p| *p == param) {
                    Some(idx) => idx + 1,
                    None => {
                        params.push(param);
                        params.len()
                    }
                };
                out.push('$');
                out.push_str(&position.to_string());
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok((out, params))
}

/// Index just past the quote closing the literal opened before `from`.
///
/// Doubled quotes inside the literal are escapes, as are backslashes in
/// `E'...'` strings. An unterminated literal runs to the end of the text.
fn find_closing_quote(chars: &[char], from: usize, quote: char, backslash_escapes: bool) -> usize {
    let mut j = from;
    while j < chars.len() {
        if backslash_escapes && chars[j] == '\\' {
            j += 2;
            continue;
        }
        if chars[j] == quote {
            if chars.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    chars.len()
}

/// `true` when the quote at `at` opens an `E'...'` string.
fn is_escape_string_prefix(chars: &[char], at: usize) -> bool {
    match at.checked_sub(1).map(|p| chars[p]) {
        Some('e') | Some('E') => at < 2 || !is_ident_char(chars[at - 2]),
        _ => false,
    }
}

/// End of a `$tag$` opener starting at `at`, if there is one.
///
/// Tags follow identifier rules; a `$` inside an identifier is not a quote.
fn dollar_tag_end(chars: &[char], at: usize) -> Option<usize> {
    if at > 0 && (is_ident_char(chars[at - 1]) || chars[at - 1] == '$') {
        return None;
    }
    let mut j = at + 1;
    match chars.get(j) {
        Some('$') => return Some(j + 1),
        Some(&c) if is_ident_start(c) => {}
        _ => return None,
    }
    while j < chars.len() && is_ident_char(chars[j]) {
        j += 1;
    }
    (chars.get(j) == Some(&'$')).then_some(j + 1)
}

/// Index just past the closing `tag`, or the end of the text.
fn find_dollar_close(chars: &[char], from: usize, tag: &[char]) -> usize {
    let mut j = from;
    while j + tag.len() <= chars.len() {
        if &chars[j..j + tag.len()] == tag {
            return j + tag.len();
        }
        j += 1;
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Preset;
    use chrono::TimeZone;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_rewrites_in_order_of_first_appearance() {
        let def = QueryDefinition::parse(
            "SELECT * FROM t WHERE ts <= :end_time AND ts >= :start_time AND ts <> :end_time",
        )
        .unwrap();
        assert_eq!(
            def.sql(),
            "SELECT * FROM t WHERE ts <= $1 AND ts >= $2 AND ts <> $1"
        );
        assert_eq!(def.params(), &[NamedParam::EndTime, NamedParam::StartTime]);
        assert_eq!(def.contract(), ParameterContract::Range);
    }

    #[test]
    fn test_preserves_casts_literals_and_comments() {
        let text = "SELECT ':start_time', \"a:end_time\", x::int -- :bogus\n/* :other */ FROM t WHERE ts > now() - :time_window::interval";
        let def = QueryDefinition::parse(text).unwrap();
        assert_eq!(
            def.sql(),
            "SELECT ':start_time', \"a:end_time\", x::int -- :bogus\n/* :other */ FROM t WHERE ts > now() - $1::interval"
        );
        assert_eq!(def.contract(), ParameterContract::Interval);
    }

    #[test]
    fn test_escaped_quotes_stay_inside_literal() {
        let def = QueryDefinition::parse("SELECT 'it''s :start_time' WHERE a = :start_time").unwrap();
        assert_eq!(def.sql(), "SELECT 'it''s :start_time' WHERE a = $1");
    }

    #[test]
    fn test_dollar_quoted_bodies_are_left_alone() {
        let text = "SELECT $$ :bogus $1 $$, $body$ it's :other $body$ \
                    FROM t WHERE ts BETWEEN :start_time AND :end_time";
        let def = QueryDefinition::parse(text).unwrap();
        assert_eq!(def.params(), &[NamedParam::StartTime, NamedParam::EndTime]);
        assert!(def.sql().contains("$$ :bogus $1 $$"));
        assert!(def.sql().contains("$body$ it's :other $body$"));
        assert!(def.sql().ends_with("BETWEEN $1 AND $2"));
    }

    #[test]
    fn test_escape_string_backslash_quote() {
        let text = r"SELECT E'it\'s :bogus' AS note FROM t WHERE ts > :start_time";
        let def = QueryDefinition::parse(text).unwrap();
        assert_eq!(def.params(), &[NamedParam::StartTime]);
        assert!(def.sql().contains(r"E'it\'s :bogus'"));
    }

    #[test]
    fn test_dollar_inside_identifier_is_not_a_quote() {
        let def = QueryDefinition::parse("SELECT a$b$ FROM t WHERE ts > :start_time").unwrap();
        assert_eq!(def.params(), &[NamedParam::StartTime]);
        assert!(def.sql().ends_with("ts > $1"));
    }

    #[test]
    fn test_unknown_parameter_is_query_error() {
        let err = QueryDefinition::parse("SELECT * FROM t WHERE a = :user_id").unwrap_err();
        assert!(matches!(err, RepositoryError::QueryError { .. }));
        assert!(err.message().contains(":user_id"));
    }

    #[test]
    fn test_mixed_contracts_rejected() {
        let err = QueryDefinition::parse("SELECT :start_time, :time_window").unwrap_err();
        assert!(matches!(err, RepositoryError::QueryError { .. }));
    }

    #[test]
    fn test_positional_placeholders_rejected() {
        assert!(QueryDefinition::parse("SELECT * FROM t WHERE a = $1").is_err());
    }

    #[test]
    fn test_empty_query_rejected() {
        let err = QueryDefinition::parse("  ;\n ").unwrap_err();
        assert!(matches!(err, RepositoryError::QueryError { .. }));
    }

    #[test]
    fn test_trailing_semicolons_stripped() {
        let def = QueryDefinition::parse("SELECT 1;;\n").unwrap();
        assert_eq!(def.sql(), "SELECT 1");
        assert_eq!(def.contract(), ParameterContract::None);
    }

    #[test]
    fn test_bind_range_values() {
        let def = QueryDefinition::parse("SELECT * FROM t WHERE ts BETWEEN :start_time AND :end_time").unwrap();
        let bound = def
            .bind(window(), &TimeframeSelection::default(), ResultShape::Report)
            .unwrap();
        assert_eq!(
            bound.values,
            vec![
                BoundValue::Timestamp(window().start),
                BoundValue::Timestamp(window().end)
            ]
        );
        assert!(bound.sql.starts_with("SELECT \"report_type\"::text AS report_type"));
        assert!(bound.sql.ends_with(") AS review_check"));
    }

    #[test]
    fn test_bind_interval_uses_preset_literal() {
        let def = QueryDefinition::parse("SELECT * FROM t WHERE ts > now() - :time_window::interval").unwrap();
        let bound = def
            .bind(
                window(),
                &TimeframeSelection::preset(Preset::SevenDays),
                ResultShape::Legacy,
            )
            .unwrap();
        assert_eq!(bound.values, vec![BoundValue::Text("7 days".into())]);
        assert!(bound.sql.contains("\"incident_count\"::float8"));
    }

    #[test]
    fn test_bind_interval_rejects_custom_range() {
        let def = QueryDefinition::parse("SELECT * FROM t WHERE ts > now() - :time_window::interval").unwrap();
        let w = window();
        let err = def
            .bind(w, &TimeframeSelection::custom(w.start, w.end), ResultShape::Report)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::QueryError { .. }));
    }

    #[test]
    fn test_wrapped_query_survives_trailing_comment() {
        let def = QueryDefinition::parse("SELECT 1 -- trailing").unwrap();
        let sql = wrap_for_shape(def.sql(), ResultShape::Report);
        assert!(sql.contains("-- trailing\n) AS review_check"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_not_found() {
        let err = QueryDefinition::load("/nonexistent/dir/review-check.sql")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert_eq!(
            err.message(),
            "Error: 'review-check.sql' file not found in the directory."
        );
    }
}
