//! Generic record store: a table-agnostic data access facade.
//!
//! Every domain repository composes one [`RecordStore`] configured with a
//! [`TableSpec`] (table name plus readable/writable attribute allowlists).
//! The store translates ad-hoc column/value criteria and write payloads into
//! parameterized SQL against that one table, enforcing the writable-attribute
//! contract so that request bodies spread into a payload cannot target
//! columns outside the allowlist.
//!
//! Identifier safety: table and column names are interpolated into SQL only
//! after validation against the static allowlists; all values travel as bind
//! parameters. Query construction is split into pure `build_*` functions so
//! the validation rules are testable without a database.
//!
//! The store borrows one exclusive connection for its lifetime. Handlers
//! acquire that connection from the bounded pool at the top of the request
//! and it is released on drop, on every exit path.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgConnection, Postgres, QueryBuilder, Row, TypeInfo};
use tracing::instrument;

use crate::db::errors::{DbError, Result};

/// One row, represented as a column -> scalar/JSON-string mapping.
pub type Record = Map<String, Value>;

/// Outcome of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Created {
    pub insert_id: i64,
    pub affected_rows: u64,
}

/// Static per-table configuration: the table name and its attribute
/// allowlists. The readable list is the ordered set of columns returned by
/// read operations; it may include sensitive columns (e.g. a password hash)
/// which callers must strip before external exposure. The writable list is
/// the set of columns accepted by create/update payloads.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub table: &'static str,
    pub readable: &'static [&'static str],
    pub writable: &'static [&'static str],
}

impl TableSpec {
    pub const fn new(table: &'static str) -> Self {
        Self {
            table,
            readable: &["id"],
            writable: &["id"],
        }
    }

    /// Reject the first payload key that is not a writable attribute.
    pub fn check_writable(&self, record: &Record) -> Result<()> {
        for key in record.keys() {
            if !self.writable.contains(&key.as_str()) {
                return Err(DbError::UnknownColumn {
                    column: key.clone(),
                    table: self.table,
                });
            }
        }
        Ok(())
    }

    fn check_readable(&self, column: &str) -> Result<()> {
        if !self.readable.contains(&column) {
            return Err(DbError::UnknownColumn {
                column: column.to_string(),
                table: self.table,
            });
        }
        Ok(())
    }
}

/// Generic data-access facade over one configured table and one exclusively
/// borrowed connection.
pub struct RecordStore<'c> {
    db: &'c mut PgConnection,
    spec: &'static TableSpec,
}

impl<'c> RecordStore<'c> {
    pub fn new(db: &'c mut PgConnection, spec: &'static TableSpec) -> Self {
        Self { db, spec }
    }

    pub fn spec(&self) -> &'static TableSpec {
        self.spec
    }

    /// The borrowed connection, for table-specific queries (joins, ordering,
    /// pagination) that domain repositories run alongside the generic
    /// operations.
    pub fn connection(&mut self) -> &mut PgConnection {
        self.db
    }

    /// All rows, readable columns only.
    #[instrument(skip(self), fields(table = self.spec.table), err)]
    pub async fn all(&mut self) -> Result<Vec<Record>> {
        let mut qb = QueryBuilder::new("SELECT ");
        push_column_list(&mut qb, self.spec.readable);
        qb.push(" FROM ").push(self.spec.table);

        let rows = qb.build().fetch_all(&mut *self.db).await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Find rows matching a conjunction of equality predicates, one per
    /// criteria entry. A `null` criterion becomes `IS NULL` (SQL equality
    /// with NULL is otherwise always false). Empty or all-falsy criteria are
    /// rejected rather than scanning the whole table.
    #[instrument(skip(self, criteria), fields(table = self.spec.table), err)]
    pub async fn find(&mut self, criteria: &Record, limit: Option<i64>) -> Result<Vec<Record>> {
        let mut qb = build_find_query(self.spec, criteria, limit)?;
        let rows = qb.build().fetch_all(&mut *self.db).await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Insert one row after validating every payload key against the
    /// writable allowlist.
    #[instrument(skip(self, record), fields(table = self.spec.table), err)]
    pub async fn create(&mut self, record: &Record) -> Result<Created> {
        let mut qb = build_insert_query(self.spec, record)?;
        let row = qb.build().fetch_one(&mut *self.db).await?;
        let insert_id: i64 = row.try_get("id").map_err(DbError::from)?;
        Ok(Created {
            insert_id,
            affected_rows: 1,
        })
    }

    /// Update the single row matching the payload's `id`. Existence is not
    /// pre-checked; the affected-row count is returned so callers can detect
    /// a concurrently vanished row.
    #[instrument(skip(self, record), fields(table = self.spec.table), err)]
    pub async fn update(&mut self, record: &Record) -> Result<u64> {
        let mut qb = build_update_query(self.spec, record)?;
        let done = qb.build().execute(&mut *self.db).await?;
        Ok(done.rows_affected())
    }

    /// Delete the single row matching `id`, returning the affected count.
    #[instrument(skip(self), fields(table = self.spec.table), err)]
    pub async fn delete(&mut self, id: i64) -> Result<u64> {
        let mut qb = QueryBuilder::new("DELETE FROM ");
        qb.push(self.spec.table).push(" WHERE \"id\" = ");
        qb.push_bind(id);

        let done = qb.build().execute(&mut *self.db).await?;
        Ok(done.rows_affected())
    }
}

/// A value that does not count as a usable search criterion: absent, false,
/// zero, or the empty string.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_i64() == Some(0) || n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn push_column_list(qb: &mut QueryBuilder<'_, Postgres>, columns: &[&str]) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("\"{column}\""));
    }
}

/// Bind one criteria/payload value as a parameter. JSON arrays and objects
/// are stored as JSON-serialized strings.
fn push_bind_value(qb: &mut QueryBuilder<'static, Postgres>, value: &Value) -> Result<()> {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Bool(b) => {
            qb.push_bind(*b);
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                qb.push_bind(i);
            } else if let Some(f) = n.as_f64() {
                qb.push_bind(f);
            } else {
                return Err(DbError::Other(anyhow::anyhow!(
                    "numeric value out of range for binding: {n}"
                )));
            }
        }
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        Value::Array(_) | Value::Object(_) => {
            let serialized = serde_json::to_string(value)
                .map_err(|e| DbError::Other(anyhow::anyhow!("serialize JSON payload value: {e}")))?;
            qb.push_bind(serialized);
        }
    }
    Ok(())
}

fn build_find_query(
    spec: &'static TableSpec,
    criteria: &Record,
    limit: Option<i64>,
) -> Result<QueryBuilder<'static, Postgres>> {
    if criteria.is_empty() || criteria.values().all(is_falsy) {
        return Err(DbError::InvalidQuery { table: spec.table });
    }
    for column in criteria.keys() {
        spec.check_readable(column)?;
    }

    let mut qb = QueryBuilder::new("SELECT ");
    push_column_list(&mut qb, spec.readable);
    qb.push(" FROM ").push(spec.table).push(" WHERE ");

    for (i, (column, value)) in criteria.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        qb.push(format!("\"{column}\""));
        if value.is_null() {
            qb.push(" IS NULL");
        } else {
            qb.push(" = ");
            push_bind_value(&mut qb, value)?;
        }
    }

    if let Some(limit) = limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }

    Ok(qb)
}

fn build_insert_query(spec: &'static TableSpec, record: &Record) -> Result<QueryBuilder<'static, Postgres>> {
    spec.check_writable(record)?;
    if record.is_empty() {
        return Err(DbError::InvalidQuery { table: spec.table });
    }

    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(spec.table).push(" (");
    for (i, column) in record.keys().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("\"{column}\""));
    }
    qb.push(") VALUES (");
    for (i, value) in record.values().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_bind_value(&mut qb, value)?;
    }
    qb.push(") RETURNING \"id\"");

    Ok(qb)
}

fn build_update_query(spec: &'static TableSpec, record: &Record) -> Result<QueryBuilder<'static, Postgres>> {
    let id = record
        .get("id")
        .ok_or(DbError::MissingIdentifier { table: spec.table })?;
    spec.check_writable(record)?;
    if record.len() < 2 {
        // Only the id is present: nothing to set.
        return Err(DbError::InvalidQuery { table: spec.table });
    }

    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(spec.table).push(" SET ");
    let mut first = true;
    for (column, value) in record.iter().filter(|(key, _)| key.as_str() != "id") {
        if !first {
            qb.push(", ");
        }
        first = false;
        qb.push(format!("\"{column}\" = "));
        push_bind_value(&mut qb, value)?;
    }
    qb.push(" WHERE \"id\" = ");
    push_bind_value(&mut qb, id)?;

    Ok(qb)
}

/// Decode a dynamically-built row into a [`Record`]. Timestamps become
/// RFC 3339 strings; JSON columns pass through as values.
fn row_to_record(row: &PgRow) -> Result<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let name = column.name();
        let value = match column.type_info().name() {
            "BOOL" => row
                .try_get::<Option<bool>, _>(name)
                .map_err(DbError::from)?
                .map(Value::Bool)
                .unwrap_or(Value::Null),
            "INT2" => int_value(row.try_get::<Option<i16>, _>(name).map_err(DbError::from)?.map(i64::from)),
            "INT4" => int_value(row.try_get::<Option<i32>, _>(name).map_err(DbError::from)?.map(i64::from)),
            "INT8" => int_value(row.try_get::<Option<i64>, _>(name).map_err(DbError::from)?),
            "FLOAT4" => float_value(row.try_get::<Option<f32>, _>(name).map_err(DbError::from)?.map(f64::from)),
            "FLOAT8" => float_value(row.try_get::<Option<f64>, _>(name).map_err(DbError::from)?),
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => row
                .try_get::<Option<String>, _>(name)
                .map_err(DbError::from)?
                .map(Value::String)
                .unwrap_or(Value::Null),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(name)
                .map_err(DbError::from)?
                .map(|ts| Value::String(ts.to_rfc3339()))
                .unwrap_or(Value::Null),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(name)
                .map_err(DbError::from)?
                .map(|ts| Value::String(ts.and_utc().to_rfc3339()))
                .unwrap_or(Value::Null),
            other => {
                return Err(DbError::Other(anyhow::anyhow!(
                    "unsupported column type {other} for '{name}'"
                )));
            }
        };
        record.insert(name.to_string(), value);
    }
    Ok(record)
}

/// Decode a [`Record`] into a typed database response.
pub fn from_record<T: serde::de::DeserializeOwned>(record: Record) -> Result<T> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| DbError::Other(anyhow::anyhow!("decode record: {e}")))
}

fn int_value(value: Option<i64>) -> Value {
    value.map(|i| Value::Number(Number::from(i))).unwrap_or(Value::Null)
}

fn float_value(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static SPEC: TableSpec = TableSpec {
        table: "widgets",
        readable: &["id", "name", "owner_id", "created_at"],
        writable: &["id", "name", "owner_id"],
    };

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn find_rejects_empty_criteria() {
        let result = build_find_query(&SPEC, &Record::new(), None);
        assert!(matches!(result, Err(DbError::InvalidQuery { table: "widgets" })));
    }

    #[test]
    fn find_rejects_all_falsy_criteria() {
        for criteria in [
            json!({"owner_id": 0}),
            json!({"name": ""}),
            json!({"name": "", "owner_id": 0}),
            json!({"owner_id": false}),
        ] {
            let result = build_find_query(&SPEC, &record(criteria), None);
            assert!(matches!(result, Err(DbError::InvalidQuery { .. })));
        }
    }

    #[test]
    fn find_accepts_mixed_falsy_and_truthy_criteria() {
        let criteria = record(json!({"name": "boiler", "owner_id": 0}));
        let qb = build_find_query(&SPEC, &criteria, None).unwrap();
        assert_eq!(
            qb.sql(),
            "SELECT \"id\", \"name\", \"owner_id\", \"created_at\" FROM widgets WHERE \"name\" = $1 AND \"owner_id\" = $2"
        );
    }

    #[test]
    fn find_rewrites_null_to_is_null() {
        let criteria = record(json!({"name": "boiler", "owner_id": null}));
        let qb = build_find_query(&SPEC, &criteria, None).unwrap();
        assert_eq!(
            qb.sql(),
            "SELECT \"id\", \"name\", \"owner_id\", \"created_at\" FROM widgets WHERE \"name\" = $1 AND \"owner_id\" IS NULL"
        );
    }

    #[test]
    fn find_appends_limit_as_parameter() {
        let criteria = record(json!({"name": "boiler"}));
        let qb = build_find_query(&SPEC, &criteria, Some(5)).unwrap();
        assert!(qb.sql().ends_with(" LIMIT $2"));
    }

    #[test]
    fn find_rejects_unknown_criteria_column() {
        let criteria = record(json!({"nmae": "typo"}));
        let result = build_find_query(&SPEC, &criteria, None);
        match result {
            Err(DbError::UnknownColumn { column, table }) => {
                assert_eq!(column, "nmae");
                assert_eq!(table, "widgets");
            }
            Ok(_) => panic!("expected UnknownColumn, got Ok"),
            Err(other) => panic!("expected UnknownColumn, got {other:?}"),
        }
    }

    #[test]
    fn insert_rejects_unknown_column() {
        let payload = record(json!({"name": "boiler", "is_admin": true}));
        let result = build_insert_query(&SPEC, &payload);
        match result {
            Err(DbError::UnknownColumn { column, .. }) => assert_eq!(column, "is_admin"),
            Ok(_) => panic!("expected UnknownColumn, got Ok"),
            Err(other) => panic!("expected UnknownColumn, got {other:?}"),
        }
    }

    #[test]
    fn insert_builds_parameterized_statement() {
        let payload = record(json!({"name": "boiler", "owner_id": 7}));
        let qb = build_insert_query(&SPEC, &payload).unwrap();
        assert_eq!(
            qb.sql(),
            "INSERT INTO widgets (\"name\", \"owner_id\") VALUES ($1, $2) RETURNING \"id\""
        );
    }

    #[test]
    fn update_requires_identifier() {
        let payload = record(json!({"name": "boiler"}));
        let result = build_update_query(&SPEC, &payload);
        assert!(matches!(result, Err(DbError::MissingIdentifier { table: "widgets" })));
    }

    #[test]
    fn update_requires_identifier_even_with_unknown_columns() {
        // The missing id is reported before any column validation.
        let payload = record(json!({"bogus": 1}));
        let result = build_update_query(&SPEC, &payload);
        assert!(matches!(result, Err(DbError::MissingIdentifier { .. })));
    }

    #[test]
    fn update_rejects_unknown_column() {
        let payload = record(json!({"id": 3, "bogus": 1}));
        let result = build_update_query(&SPEC, &payload);
        match result {
            Err(DbError::UnknownColumn { column, .. }) => assert_eq!(column, "bogus"),
            Ok(_) => panic!("expected UnknownColumn, got Ok"),
            Err(other) => panic!("expected UnknownColumn, got {other:?}"),
        }
    }

    #[test]
    fn update_builds_single_row_statement() {
        let payload = record(json!({"id": 3, "name": "boiler", "owner_id": 7}));
        let qb = build_update_query(&SPEC, &payload).unwrap();
        assert_eq!(
            qb.sql(),
            "UPDATE widgets SET \"name\" = $1, \"owner_id\" = $2 WHERE \"id\" = $3"
        );
    }

    #[test]
    fn update_with_only_id_has_nothing_to_set() {
        let payload = record(json!({"id": 3}));
        let result = build_update_query(&SPEC, &payload);
        assert!(matches!(result, Err(DbError::InvalidQuery { .. })));
    }

    #[test]
    fn nested_payload_values_bind_as_json_strings() {
        let payload = record(json!({"name": "boiler", "owner_id": {"nested": [1, 2]}}));
        let qb = build_insert_query(&SPEC, &payload).unwrap();
        // Two ordinary parameters; the object was serialized, not expanded.
        assert_eq!(
            qb.sql(),
            "INSERT INTO widgets (\"name\", \"owner_id\") VALUES ($1, $2) RETURNING \"id\""
        );
    }

    #[test]
    fn falsy_detection() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(0.0)));
        assert!(is_falsy(&json!("")));
        assert!(!is_falsy(&json!(true)));
        assert!(!is_falsy(&json!(1)));
        assert!(!is_falsy(&json!("x")));
        assert!(!is_falsy(&json!({})));
    }
}
