//! PostgreSQL store backed by a sqlx pool.
//!
//! Records are exchanged as JSON: inserts go through `jsonb_populate_record`
//! and rows come back through `to_jsonb`, so any table whose columns map onto
//! JSON fields can be seeded without per-entity code. Rows of raw queries are
//! decoded column by column; columns of other types should be cast in SQL,
//! e.g. `created_at::text`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, PgPool, Postgres, Row, TypeInfo};

use crate::error::{DbError, DbResult};
use crate::isolation::IsolationLevel;
use crate::work::{Store, Transaction, UnitOfWork, WorkScope};

/// PostgreSQL store.
#[derive(Debug, Clone)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	pub async fn connect(url: &str) -> DbResult<Self> {
		let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
		Ok(Self::new(pool))
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}
}

#[async_trait]
impl Store for PgStore {
	fn ambient(&self) -> Box<dyn UnitOfWork> {
		Box::new(PgWork {
			pool: self.pool.clone(),
		})
	}

	async fn begin(&self, level: Option<IsolationLevel>) -> DbResult<Box<dyn Transaction>> {
		let mut tx = self.pool.begin().await?;
		if let Some(level) = level {
			let sql = format!("SET TRANSACTION ISOLATION LEVEL {}", level.to_sql());
			sqlx::query(&sql).execute(&mut *tx).await?;
		}
		Ok(Box::new(PgTransaction {
			tx: Some(tx),
			isolation: level,
		}))
	}
}

/// Ambient unit of work running each statement on the pool.
#[derive(Debug, Clone)]
pub struct PgWork {
	pool: PgPool,
}

#[async_trait]
impl UnitOfWork for PgWork {
	fn scope(&self) -> WorkScope {
		WorkScope::Ambient
	}

	async fn execute(&mut self, sql: &str, params: Vec<Value>) -> DbResult<u64> {
		execute_on(&self.pool, sql, params).await
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<Value>) -> DbResult<Vec<Value>> {
		fetch_all_on(&self.pool, sql, params).await
	}

	async fn save(&mut self, entity: &str, record: Value) -> DbResult<Value> {
		save_on(&self.pool, entity, record).await
	}

	async fn find(&mut self, entity: &str, id: i64) -> DbResult<Option<Value>> {
		find_on(&self.pool, entity, id).await
	}

	async fn remove(&mut self, entity: &str, id: i64) -> DbResult<bool> {
		remove_on(&self.pool, entity, id).await
	}
}

/// Open transaction on a single pooled connection.
pub struct PgTransaction {
	tx: Option<sqlx::Transaction<'static, Postgres>>,
	isolation: Option<IsolationLevel>,
}

impl PgTransaction {
	fn tx(&mut self) -> DbResult<&mut sqlx::Transaction<'static, Postgres>> {
		self.tx
			.as_mut()
			.ok_or_else(|| DbError::TransactionError("Transaction already consumed".to_string()))
	}

	fn take(&mut self) -> DbResult<sqlx::Transaction<'static, Postgres>> {
		self.tx
			.take()
			.ok_or_else(|| DbError::TransactionError("Transaction already consumed".to_string()))
	}
}

#[async_trait]
impl UnitOfWork for PgTransaction {
	fn scope(&self) -> WorkScope {
		WorkScope::Transaction(self.isolation)
	}

	async fn execute(&mut self, sql: &str, params: Vec<Value>) -> DbResult<u64> {
		let tx = self.tx()?;
		execute_on(&mut **tx, sql, params).await
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<Value>) -> DbResult<Vec<Value>> {
		let tx = self.tx()?;
		fetch_all_on(&mut **tx, sql, params).await
	}

	async fn save(&mut self, entity: &str, record: Value) -> DbResult<Value> {
		let tx = self.tx()?;
		save_on(&mut **tx, entity, record).await
	}

	async fn find(&mut self, entity: &str, id: i64) -> DbResult<Option<Value>> {
		let tx = self.tx()?;
		find_on(&mut **tx, entity, id).await
	}

	async fn remove(&mut self, entity: &str, id: i64) -> DbResult<bool> {
		let tx = self.tx()?;
		remove_on(&mut **tx, entity, id).await
	}
}

#[async_trait]
impl Transaction for PgTransaction {
	fn as_work(&mut self) -> &mut dyn UnitOfWork {
		self
	}

	async fn commit(mut self: Box<Self>) -> DbResult<()> {
		self.take()?.commit().await?;
		Ok(())
	}

	async fn rollback(mut self: Box<Self>) -> DbResult<()> {
		self.take()?.rollback().await?;
		Ok(())
	}
}

fn bind_value(query: Query<'_, Postgres, PgArguments>, value: Value) -> Query<'_, Postgres, PgArguments> {
	match value {
		Value::Null => query.bind(None::<i32>),
		Value::Bool(b) => query.bind(b),
		Value::Number(n) => match n.as_i64() {
			Some(i) => query.bind(i),
			None => query.bind(n.as_f64()),
		},
		Value::String(s) => query.bind(s),
		other => query.bind(sqlx::types::Json(other)),
	}
}

fn build_query(sql: &str, params: Vec<Value>) -> Query<'_, Postgres, PgArguments> {
	params
		.into_iter()
		.fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

/// Double-quotes an identifier, escaping embedded quotes.
fn quote_ident(name: &str) -> String {
	format!("\"{}\"", name.replace('"', "\"\""))
}

fn object(entity: &str, record: Value) -> DbResult<Map<String, Value>> {
	match record {
		Value::Object(mut fields) => {
			if matches!(fields.get("id"), Some(Value::Null)) {
				fields.remove("id");
			}
			Ok(fields)
		}
		_ => Err(DbError::invalid_record(entity, "expected a JSON object")),
	}
}

/// Builds the insert-or-update statement used by `save`.
///
/// The record is passed as a single JSONB parameter and expanded with
/// `jsonb_populate_record`, so column types come from the table itself.
fn save_statement(entity: &str, fields: &Map<String, Value>) -> String {
	let table = quote_ident(entity);
	if fields.is_empty() {
		return format!("INSERT INTO {table} DEFAULT VALUES RETURNING to_jsonb({table}.*)");
	}

	let columns: Vec<String> = fields.keys().map(|key| quote_ident(key)).collect();
	let column_list = columns.join(", ");
	let mut sql = format!(
		"INSERT INTO {table} ({column_list}) SELECT {column_list} FROM jsonb_populate_record(NULL::{table}, $1)"
	);
	if fields.contains_key("id") {
		let updates: Vec<String> = columns
			.iter()
			.filter(|column| column.as_str() != "\"id\"")
			.map(|column| format!("{column} = EXCLUDED.{column}"))
			.collect();
		if updates.is_empty() {
			sql.push_str(" ON CONFLICT (\"id\") DO NOTHING");
		} else {
			sql.push_str(&format!(" ON CONFLICT (\"id\") DO UPDATE SET {}", updates.join(", ")));
		}
	}
	sql.push_str(&format!(" RETURNING to_jsonb({table}.*)"));
	sql
}

async fn execute_on<'e, E>(executor: E, sql: &str, params: Vec<Value>) -> DbResult<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result = build_query(sql, params).execute(executor).await?;
	Ok(result.rows_affected())
}

async fn fetch_all_on<'e, E>(executor: E, sql: &str, params: Vec<Value>) -> DbResult<Vec<Value>>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = build_query(sql, params).fetch_all(executor).await?;
	rows.iter().map(row_to_json).collect()
}

fn json_of<T: Into<Value>>(value: Option<T>) -> Value {
	value.map_or(Value::Null, Into::into)
}

/// Decodes a row into a JSON object keyed by column name.
fn row_to_json(row: &PgRow) -> DbResult<Value> {
	let mut fields = Map::with_capacity(row.columns().len());
	for column in row.columns() {
		let index = column.ordinal();
		let value = match column.type_info().name() {
			"BOOL" => json_of(row.try_get::<Option<bool>, _>(index)?),
			"INT2" => json_of(row.try_get::<Option<i16>, _>(index)?),
			"INT4" => json_of(row.try_get::<Option<i32>, _>(index)?),
			"INT8" => json_of(row.try_get::<Option<i64>, _>(index)?),
			"FLOAT4" => json_of(row.try_get::<Option<f32>, _>(index)?),
			"FLOAT8" => json_of(row.try_get::<Option<f64>, _>(index)?),
			"JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?.unwrap_or(Value::Null),
			"TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
				json_of(row.try_get::<Option<String>, _>(index)?)
			}
			other => {
				return Err(DbError::Unsupported(format!(
					"cannot decode column `{}` of type {other}",
					column.name()
				)));
			}
		};
		fields.insert(column.name().to_string(), value);
	}
	Ok(Value::Object(fields))
}

async fn save_on<'e, E>(executor: E, entity: &str, record: Value) -> DbResult<Value>
where
	E: Executor<'e, Database = Postgres>,
{
	let fields = object(entity, record)?;
	let sql = save_statement(entity, &fields);
	let mut query = sqlx::query(&sql);
	if !fields.is_empty() {
		query = query.bind(sqlx::types::Json(Value::Object(fields.clone())));
	}
	match query.fetch_optional(executor).await? {
		Some(row) => Ok(row.try_get::<Value, _>(0)?),
		// ON CONFLICT DO NOTHING on an existing id-only record.
		None => Ok(Value::Object(fields)),
	}
}

async fn find_on<'e, E>(executor: E, entity: &str, id: i64) -> DbResult<Option<Value>>
where
	E: Executor<'e, Database = Postgres>,
{
	let table = quote_ident(entity);
	let sql = format!("SELECT to_jsonb(t.*) FROM {table} AS t WHERE t.\"id\" = $1");
	let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
	row.map(|row| row.try_get::<Value, _>(0).map_err(DbError::from))
		.transpose()
}

async fn remove_on<'e, E>(executor: E, entity: &str, id: i64) -> DbResult<bool>
where
	E: Executor<'e, Database = Postgres>,
{
	let sql = format!("DELETE FROM {} WHERE \"id\" = $1", quote_ident(entity));
	let result = sqlx::query(&sql).bind(id).execute(executor).await?;
	Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn fields(value: Value) -> Map<String, Value> {
		object("users", value).unwrap()
	}

	#[rstest]
	fn test_quote_ident_escapes_quotes() {
		assert_eq!(quote_ident("users"), "\"users\"");
		assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
	}

	#[rstest]
	fn test_save_statement_without_id_is_plain_insert() {
		let sql = save_statement("users", &fields(json!({ "name": "a", "id": null })));

		assert_eq!(
			sql,
			"INSERT INTO \"users\" (\"name\") SELECT \"name\" FROM jsonb_populate_record(NULL::\"users\", $1) RETURNING to_jsonb(\"users\".*)"
		);
	}

	#[rstest]
	fn test_save_statement_with_id_upserts() {
		let sql = save_statement("users", &fields(json!({ "id": 3, "name": "a" })));

		assert!(sql.contains("ON CONFLICT (\"id\") DO UPDATE SET \"name\" = EXCLUDED.\"name\""));
	}

	#[rstest]
	fn test_save_statement_for_empty_record() {
		let sql = save_statement("users", &Map::new());
		assert_eq!(
			sql,
			"INSERT INTO \"users\" DEFAULT VALUES RETURNING to_jsonb(\"users\".*)"
		);
	}

	#[rstest]
	fn test_non_object_record_is_rejected() {
		assert!(matches!(
			object("users", json!(1)),
			Err(DbError::InvalidRecord { .. })
		));
	}
}
