//! SQL builders for alarm listings.
//!
//! Everything here is pure: functions turn pagination, sort and filter
//! input into SQL fragments plus named parameters. Identifiers that end up
//! in SQL text (sort column, direction) are always chosen from a fixed
//! allow-list; every caller-supplied value is bound as a parameter.
//!
//! # Payload filters
//!
//! A payload filter is a JSON object mapping keys to expected values:
//!
//! - A key is a dotted path, `segment ('.' segment)*`, where each segment is
//!   one or more ASCII letters, digits, `_` or `-`. Dots always separate
//!   segments; keys containing literal dots cannot be addressed.
//! - A non-empty object value is flattened into its leaves, so
//!   `{"sensor": {"level": "high"}}` means the same as
//!   `{"sensor.level": "high"}`. An empty object value is rejected.
//! - Any other value must equal the JSON value stored at the path. Missing
//!   paths never match; `null` only matches an explicit null. Numbers are
//!   compared by their serialized form, so `3` does not match `3.0`.
//! - Paths are at most [`MAX_PAYLOAD_PATH_DEPTH`] segments deep.
//! - All leaves must match.
//!
//! # Example
//!
//! ```
//! use alarms_store::queries::{ListQuery, Scope};
//! use alarms_types::PageMetadata;
//!
//! let pm = PageMetadata::new()
//!     .limit(10)
//!     .order("subtopic")
//!     .dir("desc")
//!     .payload_filter("level", "high");
//!
//! let query = ListQuery::build(Scope::Group, "0c4a3b9e-1d2f-4e5a-8b7c-9d0e1f2a3b4c", &pm)?;
//! assert!(query.sql.contains("WHERE group_id = :group_id AND"));
//! assert!(query.sql.contains("ORDER BY subtopic DESC, id DESC"));
//! assert!(query.sql.ends_with("LIMIT :limit OFFSET :offset"));
//! assert!(query.count_sql.starts_with("SELECT COUNT(*) FROM alarms WHERE"));
//! # Ok::<(), alarms_store::queries::QueryError>(())
//! ```

use alarms_types::{PageMetadata, Payload};
use rusqlite::ToSql;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

/// Column used when no known sort field is requested.
pub const DEFAULT_ORDER: &str = "created";

/// Direction used when no known direction is requested.
pub const DEFAULT_DIR: &str = "ASC";

/// Maximum number of segments in a payload filter path.
pub const MAX_PAYLOAD_PATH_DEPTH: usize = 8;

/// Columns of the alarms table, in row-mapping order.
pub const ALARM_COLUMNS: &str = "id, thing_id, group_id, subtopic, protocol, payload, created";

/// Columns a listing may be sorted by.
const ORDER_COLUMNS: [&str; 6] = ["id", "created", "subtopic", "protocol", "thing_id", "group_id"];

/// Errors raised while building a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The payload filter does not follow the filter grammar.
    #[error("Malformed payload filter: {0}")]
    MalformedFilter(String),
}

/// Resolve a requested sort field to an allow-listed column.
pub fn order_clause(field: Option<&str>) -> &'static str {
    field
        .map(str::trim)
        .and_then(|field| {
            ORDER_COLUMNS
                .iter()
                .find(|column| column.eq_ignore_ascii_case(field))
                .copied()
        })
        .unwrap_or(DEFAULT_ORDER)
}

/// Resolve a requested sort direction to `ASC` or `DESC`.
pub fn dir_clause(dir: Option<&str>) -> &'static str {
    match dir.map(str::trim) {
        Some(dir) if dir.eq_ignore_ascii_case("desc") => "DESC",
        Some(dir) if dir.eq_ignore_ascii_case("asc") => "ASC",
        _ => DEFAULT_DIR,
    }
}

/// Render the ORDER BY clause. Non-id sorts get `id` as a tie-breaker.
pub fn order_by(column: &'static str, dir: &'static str) -> String {
    if column == "id" {
        format!("ORDER BY id {dir}")
    } else {
        format!("ORDER BY {column} {dir}, id {dir}")
    }
}

/// Render the LIMIT/OFFSET clause. A zero limit means no limit at all.
pub fn offset_limit_clause(limit: u64) -> &'static str {
    if limit == 0 {
        ""
    } else {
        "LIMIT :limit OFFSET :offset"
    }
}

/// The mandatory predicate of a scoped listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Alarms raised by one device.
    Thing,
    /// Alarms raised within one group.
    Group,
}

impl Scope {
    /// SQL predicate restricting rows to the scope.
    pub fn predicate(self) -> &'static str {
        match self {
            Scope::Thing => "thing_id = :thing_id",
            Scope::Group => "group_id = :group_id",
        }
    }

    /// Name of the parameter bound to the scope id.
    pub fn param(self) -> &'static str {
        match self {
            Scope::Thing => ":thing_id",
            Scope::Group => ":group_id",
        }
    }
}

/// Combine the scope predicate with an optional extra predicate.
pub fn where_clause(scope: Scope, extra: Option<&str>) -> String {
    match extra.map(str::trim) {
        Some(extra) if !extra.is_empty() => {
            format!("WHERE {} AND ({})", scope.predicate(), extra)
        }
        _ => format!("WHERE {}", scope.predicate()),
    }
}

/// Owned named parameters for a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    params: Vec<(String, SqlValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `name` (including its `:` prefix).
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.params.push((name.into(), value.into()));
    }

    /// Append every parameter of `other`.
    pub fn extend(&mut self, other: &QueryParams) {
        self.params.extend(other.params.iter().cloned());
    }

    /// Look up a bound value by name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Borrow as rusqlite named parameters.
    pub fn as_named(&self) -> Vec<(&str, &dyn ToSql)> {
        self.params
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}

/// A rendered payload predicate and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadFilter {
    pub clause: String,
    pub params: QueryParams,
}

/// Render a payload filter following the grammar in the module docs.
///
/// Returns `Ok(None)` for a missing or empty filter.
pub fn payload_filter(filter: Option<&Payload>) -> Result<Option<PayloadFilter>, QueryError> {
    let Some(filter) = filter.filter(|filter| !filter.is_empty()) else {
        return Ok(None);
    };

    let mut leaves = Vec::new();
    for (key, value) in filter {
        collect_leaves(parse_path(key)?, value, &mut leaves)?;
    }

    let mut clauses = Vec::with_capacity(leaves.len());
    let mut params = QueryParams::new();
    for (i, (path, value)) in leaves.into_iter().enumerate() {
        let path_param = format!(":payload_path_{i}");
        let value_param = format!(":payload_value_{i}");
        clauses.push(format!("(payload -> {path_param}) = json({value_param})"));
        params.push(path_param, json_path(&path));
        params.push(value_param, value.to_string());
    }

    Ok(Some(PayloadFilter {
        clause: clauses.join(" AND "),
        params,
    }))
}

fn parse_path(key: &str) -> Result<Vec<String>, QueryError> {
    if key.is_empty() {
        return Err(QueryError::MalformedFilter("empty key".to_string()));
    }

    key.split('.')
        .map(|segment| {
            if segment.is_empty() {
                Err(QueryError::MalformedFilter(format!(
                    "empty path segment in key {key:?}"
                )))
            } else if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                Err(QueryError::MalformedFilter(format!(
                    "invalid character in key {key:?}"
                )))
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

fn collect_leaves<'a>(
    path: Vec<String>,
    value: &'a Value,
    leaves: &mut Vec<(Vec<String>, &'a Value)>,
) -> Result<(), QueryError> {
    if path.len() > MAX_PAYLOAD_PATH_DEPTH {
        return Err(QueryError::MalformedFilter(format!(
            "path {:?} is deeper than {} segments",
            path.join("."),
            MAX_PAYLOAD_PATH_DEPTH
        )));
    }

    match value {
        Value::Object(map) if map.is_empty() => Err(QueryError::MalformedFilter(format!(
            "empty object at {:?}",
            path.join(".")
        ))),
        Value::Object(map) => {
            for (key, nested) in map {
                let mut nested_path = path.clone();
                nested_path.extend(parse_path(key)?);
                collect_leaves(nested_path, nested, leaves)?;
            }
            Ok(())
        }
        _ => {
            leaves.push((path, value));
            Ok(())
        }
    }
}

/// Render validated segments as a SQLite JSON path.
fn json_path(segments: &[String]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        path.push_str(".\"");
        path.push_str(segment);
        path.push('"');
    }
    path
}

/// A fully rendered scoped listing: page query, count query and parameters.
///
/// Both statements share the same WHERE clause and filter parameters, so the
/// count always reflects the predicate that produced the page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Page query.
    pub sql: String,
    /// Count query.
    pub count_sql: String,
    /// Parameters of the count query (scope and payload filter).
    pub filter_params: QueryParams,
    /// Parameters of the page query (filter plus limit and offset).
    pub page_params: QueryParams,
    /// Sort column actually applied.
    pub order: &'static str,
    /// Sort direction actually applied.
    pub dir: &'static str,
}

impl ListQuery {
    /// Build the listing for `scope_id` within `scope`.
    pub fn build(scope: Scope, scope_id: &str, pm: &PageMetadata) -> Result<Self, QueryError> {
        let order = order_clause(pm.order.as_deref());
        let dir = dir_clause(pm.dir.as_deref());
        let limit_clause = offset_limit_clause(pm.limit);
        let filter = payload_filter(pm.payload.as_ref())?;

        let mut filter_params = QueryParams::new();
        filter_params.push(scope.param(), scope_id.to_string());
        if let Some(filter) = &filter {
            filter_params.extend(&filter.params);
        }

        let where_sql = where_clause(scope, filter.as_ref().map(|f| f.clause.as_str()));

        let mut sql = format!(
            "SELECT {} FROM alarms {} {}",
            ALARM_COLUMNS,
            where_sql,
            order_by(order, dir)
        );
        let mut page_params = filter_params.clone();
        if !limit_clause.is_empty() {
            sql.push(' ');
            sql.push_str(limit_clause);
            page_params.push(":limit", to_sql_integer(pm.limit));
            page_params.push(":offset", to_sql_integer(pm.offset));
        }

        let count_sql = format!("SELECT COUNT(*) FROM alarms {}", where_sql);

        Ok(Self {
            sql,
            count_sql,
            filter_params,
            page_params,
            order,
            dir,
        })
    }
}

fn to_sql_integer(value: u64) -> SqlValue {
    SqlValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GROUP: &str = "0c4a3b9e-1d2f-4e5a-8b7c-9d0e1f2a3b4c";

    fn object(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn text(value: Option<&SqlValue>) -> &str {
        match value {
            Some(SqlValue::Text(s)) => s,
            other => panic!("expected text, got {other:?}"),
        }
    }

    // ==================== Order / direction ====================

    #[test]
    fn test_order_clause_known_fields() {
        assert_eq!(order_clause(Some("id")), "id");
        assert_eq!(order_clause(Some("created")), "created");
        assert_eq!(order_clause(Some("subtopic")), "subtopic");
        assert_eq!(order_clause(Some("protocol")), "protocol");
        assert_eq!(order_clause(Some("thing_id")), "thing_id");
        assert_eq!(order_clause(Some("group_id")), "group_id");
    }

    #[test]
    fn test_order_clause_is_case_insensitive() {
        assert_eq!(order_clause(Some("Created")), "created");
        assert_eq!(order_clause(Some(" SUBTOPIC ")), "subtopic");
    }

    #[test]
    fn test_order_clause_falls_back_to_default() {
        assert_eq!(order_clause(None), DEFAULT_ORDER);
        assert_eq!(order_clause(Some("")), DEFAULT_ORDER);
        assert_eq!(order_clause(Some("nonexistent_column")), DEFAULT_ORDER);
        assert_eq!(order_clause(Some("created; DROP TABLE alarms")), DEFAULT_ORDER);
    }

    #[test]
    fn test_dir_clause() {
        assert_eq!(dir_clause(Some("asc")), "ASC");
        assert_eq!(dir_clause(Some("DESC")), "DESC");
        assert_eq!(dir_clause(Some("desc ")), "DESC");
        assert_eq!(dir_clause(Some("sideways")), DEFAULT_DIR);
        assert_eq!(dir_clause(None), DEFAULT_DIR);
    }

    #[test]
    fn test_order_by_adds_tiebreaker() {
        assert_eq!(order_by("created", "DESC"), "ORDER BY created DESC, id DESC");
        assert_eq!(order_by("id", "ASC"), "ORDER BY id ASC");
    }

    #[test]
    fn test_offset_limit_clause() {
        assert_eq!(offset_limit_clause(0), "");
        assert_eq!(offset_limit_clause(10), "LIMIT :limit OFFSET :offset");
    }

    // ==================== Where clause ====================

    #[test]
    fn test_where_clause_scope_only() {
        assert_eq!(where_clause(Scope::Thing, None), "WHERE thing_id = :thing_id");
        assert_eq!(where_clause(Scope::Group, Some("  ")), "WHERE group_id = :group_id");
    }

    #[test]
    fn test_where_clause_with_extra() {
        assert_eq!(
            where_clause(Scope::Group, Some("a = :a OR b = :b")),
            "WHERE group_id = :group_id AND (a = :a OR b = :b)"
        );
    }

    // ==================== Payload filter ====================

    #[test]
    fn test_payload_filter_absent_or_empty() {
        assert_eq!(payload_filter(None).unwrap(), None);
        assert_eq!(payload_filter(Some(&Payload::new())).unwrap(), None);
    }

    #[test]
    fn test_payload_filter_single_key() {
        let filter = object(json!({"level": "high"}));
        let rendered = payload_filter(Some(&filter)).unwrap().unwrap();

        assert_eq!(
            rendered.clause,
            "(payload -> :payload_path_0) = json(:payload_value_0)"
        );
        assert_eq!(text(rendered.params.get(":payload_path_0")), "$.\"level\"");
        assert_eq!(text(rendered.params.get(":payload_value_0")), "\"high\"");
    }

    #[test]
    fn test_payload_filter_dotted_and_nested_are_equivalent() {
        let dotted = object(json!({"sensor.level": "high"}));
        let nested = object(json!({"sensor": {"level": "high"}}));

        assert_eq!(
            payload_filter(Some(&dotted)).unwrap(),
            payload_filter(Some(&nested)).unwrap()
        );
    }

    #[test]
    fn test_payload_filter_multiple_leaves() {
        let filter = object(json!({"level": "high", "sensor": {"id": 7, "ok": true}}));
        let rendered = payload_filter(Some(&filter)).unwrap().unwrap();

        assert_eq!(rendered.clause.matches(" AND ").count(), 2);
        assert_eq!(rendered.params.len(), 6);
        assert_eq!(text(rendered.params.get(":payload_path_1")), "$.\"sensor\".\"id\"");
        assert_eq!(text(rendered.params.get(":payload_value_1")), "7");
        assert_eq!(text(rendered.params.get(":payload_value_2")), "true");
    }

    #[test]
    fn test_payload_filter_never_interpolates_values() {
        let filter = object(json!({"level": "x') OR 1=1 --"}));
        let rendered = payload_filter(Some(&filter)).unwrap().unwrap();

        assert!(!rendered.clause.contains("OR 1=1"));
        assert!(text(rendered.params.get(":payload_value_0")).contains("OR 1=1"));
    }

    #[test]
    fn test_payload_filter_rejects_bad_keys() {
        for key in ["", "a..b", ".a", "a.", "a b", "a\"b", "a[0]", "$.a"] {
            let mut filter = Payload::new();
            filter.insert(key.to_string(), json!(1));
            assert!(
                matches!(
                    payload_filter(Some(&filter)),
                    Err(QueryError::MalformedFilter(_))
                ),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_payload_filter_rejects_empty_object() {
        let filter = object(json!({"sensor": {}}));
        assert!(payload_filter(Some(&filter)).is_err());
    }

    #[test]
    fn test_payload_filter_depth_limit() {
        let at_limit = object(json!({"a.b.c.d.e.f.g.h": 1}));
        assert!(payload_filter(Some(&at_limit)).is_ok());

        let too_deep = object(json!({"a.b.c.d.e.f.g": {"h": {"i": 1}}}));
        let err = payload_filter(Some(&too_deep)).unwrap_err();
        assert!(err.to_string().contains("deeper than 8"));
    }

    // ==================== ListQuery ====================

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::build(Scope::Thing, GROUP, &PageMetadata::new()).unwrap();

        assert_eq!(
            query.sql,
            "SELECT id, thing_id, group_id, subtopic, protocol, payload, created \
             FROM alarms WHERE thing_id = :thing_id ORDER BY created ASC, id ASC"
        );
        assert_eq!(
            query.count_sql,
            "SELECT COUNT(*) FROM alarms WHERE thing_id = :thing_id"
        );
        assert_eq!(query.order, "created");
        assert_eq!(query.dir, "ASC");
        assert_eq!(query.filter_params, query.page_params);
        assert_eq!(text(query.filter_params.get(":thing_id")), GROUP);
    }

    #[test]
    fn test_list_query_with_window() {
        let pm = PageMetadata::new().offset(20).limit(10);
        let query = ListQuery::build(Scope::Group, GROUP, &pm).unwrap();

        assert!(query.sql.ends_with("LIMIT :limit OFFSET :offset"));
        assert_eq!(query.page_params.get(":limit"), Some(&SqlValue::Integer(10)));
        assert_eq!(query.page_params.get(":offset"), Some(&SqlValue::Integer(20)));
        assert!(query.filter_params.get(":limit").is_none());
        assert!(!query.count_sql.contains("LIMIT"));
    }

    #[test]
    fn test_list_query_shares_predicate_with_count() {
        let pm = PageMetadata::new().limit(5).payload_filter("level", "high");
        let query = ListQuery::build(Scope::Group, GROUP, &pm).unwrap();

        let where_sql = "WHERE group_id = :group_id AND \
                         ((payload -> :payload_path_0) = json(:payload_value_0))";
        assert!(query.sql.contains(where_sql));
        assert!(query.count_sql.ends_with(where_sql));
        assert_eq!(query.filter_params.len(), 3);
        assert_eq!(query.page_params.len(), 5);
    }

    #[test]
    fn test_list_query_huge_window_saturates() {
        let pm = PageMetadata::new().offset(u64::MAX).limit(u64::MAX);
        let query = ListQuery::build(Scope::Thing, GROUP, &pm).unwrap();

        assert_eq!(
            query.page_params.get(":limit"),
            Some(&SqlValue::Integer(i64::MAX))
        );
    }

    #[test]
    fn test_list_query_rejects_malformed_filter() {
        let pm = PageMetadata::new().payload_filter("a..b", 1);
        assert!(ListQuery::build(Scope::Thing, GROUP, &pm).is_err());
    }
}
