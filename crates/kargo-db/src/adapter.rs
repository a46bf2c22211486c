//! Storage adapter
//!
//! The single translation point between canonical SQL and the two backends.
//! Callers write `?` placeholders and the SQLite date functions; Postgres
//! rewriting, result-shape normalisation, monetary rounding and statement
//! deadlines all live here.

use crate::config::{BackendKind, DbConfig};
use crate::error::map_db_err;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use kargo_core::errors::{CoreError, CoreResult};
use kargo_core::money::Money;
use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbBackend,
    DbErr, Statement, TransactionTrait, Value,
};
use std::future::Future;
use std::time::Duration;

/// One result row; column access through `try_get("", name)`.
pub type Row = sea_orm::QueryResult;

/// Outcome of a non-`SELECT` statement. `last_insert_id` is only populated
/// by the embedded backend; inserts that need an id on Postgres go through
/// [`StorageAdapter::insert_returning_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
}

/// A typed statement parameter. Monetary values get their own variant so
/// rounding and the non-negativity check happen exactly once, here.
#[derive(Debug, Clone)]
pub enum Param {
    Text(String),
    OptText(Option<String>),
    Int(i64),
    OptInt(Option<i64>),
    Bool(bool),
    Money(f64),
    OptMoney(Option<f64>),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Bytes(Option<Vec<u8>>),
}

impl Param {
    fn into_value(self) -> CoreResult<Value> {
        Ok(match self {
            Param::Text(v) => Value::String(Some(Box::new(v))),
            Param::OptText(v) => Value::String(v.map(Box::new)),
            Param::Int(v) => Value::BigInt(Some(v)),
            Param::OptInt(v) => Value::BigInt(v),
            Param::Bool(v) => Value::Bool(Some(v)),
            Param::Money(v) => Value::Double(Some(round_money(v)?)),
            Param::OptMoney(v) => Value::Double(v.map(round_money).transpose()?),
            Param::DateTime(v) => Value::ChronoDateTimeUtc(Some(Box::new(v))),
            Param::Date(v) => Value::ChronoDate(Some(Box::new(v))),
            Param::Bytes(v) => Value::Bytes(v.map(Box::new)),
        })
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<Option<String>> for Param {
    fn from(v: Option<String>) -> Self {
        Param::OptText(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<Option<i64>> for Param {
    fn from(v: Option<i64>) -> Self {
        Param::OptInt(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<Money> for Param {
    fn from(v: Money) -> Self {
        Param::Money(v.as_f64())
    }
}

impl From<DateTime<Utc>> for Param {
    fn from(v: DateTime<Utc>) -> Self {
        Param::DateTime(v)
    }
}

impl From<NaiveDate> for Param {
    fn from(v: NaiveDate) -> Self {
        Param::Date(v)
    }
}

/// Round to two decimals, ties away from zero; reject negatives.
fn round_money(value: f64) -> CoreResult<f64> {
    if !value.is_finite() {
        return Err(CoreError::invalid_argument(format!(
            "monetary value must be finite, got {}",
            value
        )));
    }
    let rounded = (value * 100.0).round() / 100.0;
    if rounded < 0.0 {
        return Err(CoreError::invalid_argument(format!(
            "monetary value must not be negative, got {}",
            value
        )));
    }
    Ok(rounded)
}

lazy_static! {
    static ref DATE_NOW: Regex =
        Regex::new(r"(?i)DATE\(\s*'now'\s*,\s*'localtime'\s*\)").unwrap();
    static ref DATE_COL: Regex =
        Regex::new(r"(?i)DATE\(\s*([A-Za-z_][A-Za-z0-9_.]*)\s*,\s*'localtime'\s*\)").unwrap();
}

/// Rewrite `?` placeholders to `$1, $2, …`, skipping string literals.
fn translate_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut in_string = false;
    for c in sql.chars() {
        match c {
            '\'' => {
                in_string = !in_string;
                out.push(c);
            }
            '?' if !in_string => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}

/// Rewrite the SQLite calendar-day functions into their Postgres form.
fn normalize_dates(sql: &str, time_zone: &Tz) -> String {
    let sql = DATE_NOW.replace_all(sql, "CURRENT_DATE");
    let replacement = format!("($1 AT TIME ZONE '{}')::date", time_zone.name());
    DATE_COL.replace_all(&sql, replacement.as_str()).into_owned()
}

/// Dialect policy shared by the adapter and its transactions.
#[derive(Debug, Clone)]
struct Dialect {
    backend: DbBackend,
    time_zone: Tz,
    statement_timeout: Duration,
}

impl Dialect {
    fn prepare(&self, sql: &str) -> String {
        match self.backend {
            DbBackend::Postgres => translate_placeholders(&normalize_dates(sql, &self.time_zone)),
            _ => sql.to_string(),
        }
    }

    fn statement(&self, sql: &str, params: Vec<Param>) -> CoreResult<Statement> {
        let values = params
            .into_iter()
            .map(Param::into_value)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Statement::from_sql_and_values(
            self.backend,
            self.prepare(sql),
            values,
        ))
    }

    async fn with_deadline<F, T>(&self, future: F) -> CoreResult<T>
    where
        F: Future<Output = Result<T, DbErr>>,
    {
        match tokio::time::timeout(self.statement_timeout, future).await {
            Ok(result) => result.map_err(map_db_err),
            Err(_) => Err(CoreError::timeout(format!(
                "statement exceeded {:?}",
                self.statement_timeout
            ))),
        }
    }

    async fn query_one<C: ConnectionTrait>(
        &self,
        conn: &C,
        sql: &str,
        params: Vec<Param>,
    ) -> CoreResult<Option<Row>> {
        let statement = self.statement(sql, params)?;
        self.with_deadline(conn.query_one(statement)).await
    }

    async fn query_all<C: ConnectionTrait>(
        &self,
        conn: &C,
        sql: &str,
        params: Vec<Param>,
    ) -> CoreResult<Vec<Row>> {
        let statement = self.statement(sql, params)?;
        self.with_deadline(conn.query_all(statement)).await
    }

    async fn execute<C: ConnectionTrait>(
        &self,
        conn: &C,
        sql: &str,
        params: Vec<Param>,
    ) -> CoreResult<ExecOutcome> {
        let statement = self.statement(sql, params)?;
        let result = self.with_deadline(conn.execute(statement)).await?;
        let last_insert_id = match self.backend {
            // Postgres raw statements have no insert id; RETURNING covers it.
            DbBackend::Postgres => None,
            _ => Some(result.last_insert_id() as i64),
        };
        Ok(ExecOutcome {
            last_insert_id,
            rows_affected: result.rows_affected(),
        })
    }

    async fn insert_returning_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        sql: &str,
        params: Vec<Param>,
    ) -> CoreResult<i64> {
        match self.backend {
            DbBackend::Postgres => {
                let sql = format!("{} RETURNING id", sql.trim_end().trim_end_matches(';'));
                let row = self
                    .query_one(conn, &sql, params)
                    .await?
                    .ok_or_else(|| CoreError::internal("insert returned no id"))?;
                row.try_get::<i64>("", "id").map_err(map_db_err)
            }
            _ => {
                let outcome = self.execute(conn, sql, params).await?;
                outcome
                    .last_insert_id
                    .ok_or_else(|| CoreError::internal("insert returned no id"))
            }
        }
    }
}

/// Connection pool plus dialect policy
#[derive(Debug)]
pub struct StorageAdapter {
    conn: DatabaseConnection,
    dialect: Dialect,
}

impl StorageAdapter {
    /// Connect to the configured backend.
    pub async fn connect(config: &DbConfig) -> CoreResult<Self> {
        let mut options = ConnectOptions::new(&config.url);
        options
            .max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        tracing::info!(backend = ?config.backend, "connecting to database");
        let conn = Database::connect(options).await.map_err(map_db_err)?;

        let backend = match config.backend {
            BackendKind::Postgres => DbBackend::Postgres,
            BackendKind::Sqlite => DbBackend::Sqlite,
        };

        Ok(Self {
            conn,
            dialect: Dialect {
                backend,
                time_zone: config.time_zone,
                statement_timeout: config.statement_timeout,
            },
        })
    }

    pub fn backend(&self) -> DbBackend {
        self.dialect.backend
    }

    pub fn time_zone(&self) -> Tz {
        self.dialect.time_zone
    }

    /// `SELECT … LIMIT 1`: the single row or nothing.
    pub async fn query_one(&self, sql: &str, params: Vec<Param>) -> CoreResult<Option<Row>> {
        self.dialect.query_one(&self.conn, sql, params).await
    }

    /// Any other `SELECT`: a finite sequence of rows.
    pub async fn query_all(&self, sql: &str, params: Vec<Param>) -> CoreResult<Vec<Row>> {
        self.dialect.query_all(&self.conn, sql, params).await
    }

    /// Non-`SELECT` statements.
    pub async fn execute(&self, sql: &str, params: Vec<Param>) -> CoreResult<ExecOutcome> {
        self.dialect.execute(&self.conn, sql, params).await
    }

    /// Insert and return the new row id on either backend.
    pub async fn insert_returning_id(&self, sql: &str, params: Vec<Param>) -> CoreResult<i64> {
        self.dialect
            .insert_returning_id(&self.conn, sql, params)
            .await
    }

    /// Open a transaction.
    pub async fn begin(&self) -> CoreResult<AdapterTxn> {
        let txn = self.conn.begin().await.map_err(map_db_err)?;
        Ok(AdapterTxn {
            txn,
            dialect: self.dialect.clone(),
        })
    }

    /// Drain the pool, waiting for in-flight statements. The connection
    /// handle is a shared pool reference, so closing through any clone
    /// closes it for all holders.
    pub async fn close(&self) -> CoreResult<()> {
        self.conn.clone().close().await.map_err(map_db_err)
    }
}

/// One open transaction (or savepoint) with the same query surface
#[derive(Debug)]
pub struct AdapterTxn {
    txn: DatabaseTransaction,
    dialect: Dialect,
}

impl AdapterTxn {
    pub async fn query_one(&self, sql: &str, params: Vec<Param>) -> CoreResult<Option<Row>> {
        self.dialect.query_one(&self.txn, sql, params).await
    }

    pub async fn query_all(&self, sql: &str, params: Vec<Param>) -> CoreResult<Vec<Row>> {
        self.dialect.query_all(&self.txn, sql, params).await
    }

    pub async fn execute(&self, sql: &str, params: Vec<Param>) -> CoreResult<ExecOutcome> {
        self.dialect.execute(&self.txn, sql, params).await
    }

    pub async fn insert_returning_id(&self, sql: &str, params: Vec<Param>) -> CoreResult<i64> {
        self.dialect
            .insert_returning_id(&self.txn, sql, params)
            .await
    }

    /// Nested transaction, backed by a savepoint.
    pub async fn savepoint(&self) -> CoreResult<AdapterTxn> {
        let txn = self.txn.begin().await.map_err(map_db_err)?;
        Ok(AdapterTxn {
            txn,
            dialect: self.dialect.clone(),
        })
    }

    pub async fn commit(self) -> CoreResult<()> {
        self.txn.commit().await.map_err(map_db_err)
    }

    pub async fn rollback(self) -> CoreResult<()> {
        self.txn.rollback().await.map_err(map_db_err)
    }
}
