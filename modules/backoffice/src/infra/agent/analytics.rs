//! Read-only SQL over one user's records.
//!
//! Every query gets a fresh in-memory SQLite database holding the tables
//! `profile`, `clients`, `jobs`, `invoices` and `expenses` (camelCase columns,
//! matching the API field names). Only a single `SELECT`/`WITH` statement is
//! accepted and the connection is switched to `query_only` before it runs.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use tracing::{debug, instrument, warn};

use crate::domain::ports::{AnalyticsSandbox, AnalyticsSnapshot};

static READ_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*(select|with)\b").expect("static regex"));

const SCHEMA: &[&str] = &[
    "CREATE TABLE profile (id TEXT PRIMARY KEY, identitySubject TEXT, firstName TEXT, lastName TEXT, \
     personalEmail TEXT, businessName TEXT, businessEmail TEXT, businessPhone TEXT, businessAddress TEXT, \
     businessCategory TEXT, hourlyRate REAL, lastInvoiceNumber INTEGER, onboardingComplete INTEGER, createdAt TEXT)",
    "CREATE TABLE clients (id TEXT PRIMARY KEY, userId TEXT, name TEXT, email TEXT, address TEXT, \
     archived INTEGER, createdAt TEXT)",
    "CREATE TABLE jobs (id TEXT PRIMARY KEY, userId TEXT, clientId TEXT, title TEXT, status TEXT, \
     startTime TEXT, endTime TEXT, location TEXT, invoiceId TEXT, calendarEventId TEXT, createdAt TEXT)",
    "CREATE TABLE invoices (id TEXT PRIMARY KEY, userId TEXT, clientId TEXT, jobId TEXT, invoiceNumber TEXT, \
     invoiceTitle TEXT, invoiceDescription TEXT, status TEXT, issueDate TEXT, dueDate TEXT, lineItems TEXT, \
     total REAL, createdAt TEXT)",
    "CREATE TABLE expenses (id TEXT PRIMARY KEY, userId TEXT, jobId TEXT, vendorName TEXT, date TEXT, \
     totalAmount REAL, taxAmount REAL, currency TEXT, lineItems TEXT, receiptImageUrl TEXT, createdAt TEXT)",
];

/// Builds a throwaway SQLite database per query.
#[derive(Debug, Clone)]
pub struct SqliteSandbox {
    timeout: Duration,
}

impl Default for SqliteSandbox {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl SqliteSandbox {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn evaluate(&self, snapshot: &AnalyticsSnapshot, sql: &str) -> sqlx::Result<Value> {
        let options: SqliteConnectOptions = "sqlite::memory:".parse()?;
        let mut conn = SqliteConnection::connect_with(&options).await?;

        let result = async {
            materialize(&mut conn, snapshot).await?;
            sqlx::query("PRAGMA query_only = ON")
                .execute(&mut conn)
                .await?;
            let rows = sqlx::query(sql).fetch_all(&mut conn).await?;
            rows.iter()
                .map(row_to_json)
                .collect::<sqlx::Result<Vec<_>>>()
                .map(Value::Array)
        }
        .await;

        if let Err(e) = conn.close().await {
            debug!("Closing analytics connection failed: {}", e);
        }
        result
    }
}

/// Returns the statement to run, or the reason it is refused.
fn gate(sql: &str) -> Result<&str, &'static str> {
    let sql = sql.trim();
    let statement = match statement_end(sql) {
        Some(end) if !sql[end + 1..].trim().is_empty() => {
            return Err("only a single statement is allowed");
        }
        Some(end) => sql[..end].trim_end(),
        None => sql,
    };
    if statement.is_empty() {
        return Err("empty query");
    }
    if !READ_STATEMENT.is_match(statement) {
        return Err("only SELECT or WITH statements are allowed");
    }
    Ok(statement)
}

/// Byte offset of the first `;` outside quotes, quoted identifiers and comments.
fn statement_end(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => return Some(i),
            quote @ (b'\'' | b'"' | b'`') => {
                // A doubled quote is an escaped quote and keeps the literal open.
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        if bytes.get(i + 1) == Some(&quote) {
                            i += 1;
                        } else {
                            break;
                        }
                    }
                    i += 1;
                }
            }
            b'[' => {
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn ts(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

async fn materialize(conn: &mut SqliteConnection, s: &AnalyticsSnapshot) -> sqlx::Result<()> {
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(&mut *conn).await?;
    }

    let p = &s.profile;
    sqlx::query("INSERT INTO profile VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
        .bind(p.id.to_string())
        .bind(&p.identity_subject)
        .bind(&p.first_name)
        .bind(&p.last_name)
        .bind(&p.personal_email)
        .bind(&p.business_name)
        .bind(&p.business_email)
        .bind(&p.business_phone)
        .bind(&p.business_address)
        .bind(&p.business_category)
        .bind(p.hourly_rate)
        .bind(p.last_invoice_number)
        .bind(p.onboarding_complete)
        .bind(ts(&p.created_at))
        .execute(&mut *conn)
        .await?;

    for c in &s.clients {
        sqlx::query("INSERT INTO clients VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(c.id.to_string())
            .bind(c.user_id.map(|id| id.to_string()))
            .bind(&c.name)
            .bind(&c.email)
            .bind(&c.address)
            .bind(c.archived)
            .bind(ts(&c.created_at))
            .execute(&mut *conn)
            .await?;
    }

    for j in &s.jobs {
        sqlx::query("INSERT INTO jobs VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(j.id.to_string())
            .bind(j.user_id.to_string())
            .bind(j.client_id.map(|id| id.to_string()))
            .bind(&j.title)
            .bind(j.status.as_str())
            .bind(j.start_time.as_ref().map(ts))
            .bind(j.end_time.as_ref().map(ts))
            .bind(&j.location)
            .bind(j.invoice_id.map(|id| id.to_string()))
            .bind(&j.calendar_event_id)
            .bind(ts(&j.created_at))
            .execute(&mut *conn)
            .await?;
    }

    for i in &s.invoices {
        let items = serde_json::to_string(&i.line_items).unwrap_or_else(|_| "[]".to_string());
        sqlx::query("INSERT INTO invoices VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(i.id.to_string())
            .bind(i.user_id.to_string())
            .bind(i.client_id.map(|id| id.to_string()))
            .bind(i.job_id.map(|id| id.to_string()))
            .bind(&i.invoice_number)
            .bind(&i.invoice_title)
            .bind(&i.invoice_description)
            .bind(i.status.as_str())
            .bind(&i.issue_date)
            .bind(&i.due_date)
            .bind(items)
            .bind(i.total)
            .bind(ts(&i.created_at))
            .execute(&mut *conn)
            .await?;
    }

    for e in &s.expenses {
        let items = serde_json::to_string(&e.line_items).unwrap_or_else(|_| "[]".to_string());
        sqlx::query("INSERT INTO expenses VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(e.id.to_string())
            .bind(e.user_id.to_string())
            .bind(e.job_id.map(|id| id.to_string()))
            .bind(&e.vendor_name)
            .bind(e.date.as_ref().map(ts))
            .bind(e.total_amount)
            .bind(e.tax_amount)
            .bind(&e.currency)
            .bind(items)
            .bind(&e.receipt_image_url)
            .bind(ts(&e.created_at))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn row_to_json(row: &SqliteRow) -> sqlx::Result<Value> {
    let mut out = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let kind = raw.type_info().name().to_ascii_uppercase();
            match kind.as_str() {
                "INTEGER" | "BOOLEAN" | "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
                "REAL" | "NUMERIC" => Value::from(row.try_get::<f64, _>(idx)?),
                "BLOB" => Value::from(hex::encode(row.try_get::<Vec<u8>, _>(idx)?)),
                _ => Value::from(row.try_get::<String, _>(idx)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(Value::Object(out))
}

#[async_trait]
impl AnalyticsSandbox for SqliteSandbox {
    #[instrument(name = "backoffice.analytics.run_query", skip_all, fields(user_id = %snapshot.profile.id))]
    async fn run_query(&self, snapshot: &AnalyticsSnapshot, sql: &str) -> String {
        let statement = match gate(sql) {
            Ok(s) => s,
            Err(reason) => {
                warn!(%reason, "Analytics query rejected");
                return format!("Query rejected: {reason}");
            }
        };

        match tokio::time::timeout(self.timeout, self.evaluate(snapshot, statement)).await {
            Ok(Ok(rows)) => rows.to_string(),
            Ok(Err(e)) => {
                debug!("Analytics query failed: {}", e);
                format!("SQL Error: {e}")
            }
            Err(_) => format!("SQL Error: query exceeded {:?}", self.timeout),
        }
    }
}
