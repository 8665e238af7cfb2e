use chrono::{Duration, TimeZone, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{check_identifier, AuthSession, Backend, Filter, Query, Row, User};
use crate::db::DbPool;
use crate::error::{AuthError, BackendError};

/// Local stand-in for the hosted backend. Each content table stores rows as
/// JSON documents (`id INTEGER PRIMARY KEY, doc TEXT`), so any row shape the
/// models produce round-trips unchanged.
pub struct SqliteBackend {
    pub pool: DbPool,
    session_hours: i64,
}

impl SqliteBackend {
    pub fn new(pool: DbPool, session_hours: i64) -> Self {
        Self {
            pool,
            session_hours: session_hours.max(1),
        }
    }

    /// Register a login. Used to seed the first admin account.
    pub fn create_user(&self, email: &str, password: &str) -> Result<bool, BackendError> {
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| BackendError::Query(e.to_string()))?;
        crate::db::seed_admin(&self.pool, email, &hash).map_err(|e| BackendError::Query(e.to_string()))
    }
}

// ── SQL building ────────────────────────────────────────────────────

fn column_expr(column: &str) -> Result<String, BackendError> {
    check_identifier(column)?;
    if column == "id" {
        Ok("id".to_string())
    } else {
        Ok(format!("json_extract(doc, '$.{}')", column))
    }
}

/// JSON scalars as SQLite bind values. Booleans become 0/1 because that is
/// what `json_extract` yields for `true`/`false`.
fn bind_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn where_clause(filters: &[Filter]) -> Result<(String, Vec<SqlValue>), BackendError> {
    if filters.is_empty() {
        return Ok((String::new(), Vec::new()));
    }
    let mut parts = Vec::with_capacity(filters.len());
    let mut binds = Vec::new();
    for filter in filters {
        let expr = column_expr(filter.column())?;
        match (filter, filter.value()) {
            (Filter::Eq(..), Value::Null) => parts.push(format!("{} IS NULL", expr)),
            (Filter::Neq(..), Value::Null) => parts.push(format!("{} IS NOT NULL", expr)),
            (Filter::Eq(..), v) => {
                parts.push(format!("{} = ?", expr));
                binds.push(bind_value(v));
            }
            (Filter::Neq(..), v) => {
                parts.push(format!("{} != ?", expr));
                binds.push(bind_value(v));
            }
        }
    }
    Ok((format!(" WHERE {}", parts.join(" AND ")), binds))
}

fn table_name(table: &str) -> Result<String, BackendError> {
    check_identifier(table)?;
    Ok(format!("\"{}\"", table))
}

fn decode_row(id: i64, doc: &str) -> Result<Row, BackendError> {
    let mut row: Row = serde_json::from_str(doc)?;
    row.insert("id".to_string(), Value::from(id));
    Ok(row)
}

/// The document stored for a row: everything but `id`, which lives in its
/// own column.
fn encode_doc(row: &Row) -> Result<String, BackendError> {
    let mut doc = row.clone();
    doc.remove("id");
    Ok(serde_json::to_string(&doc)?)
}

fn row_id(row: &Row) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

fn insert_row(conn: &Connection, table: &str, row: &Row) -> Result<(), BackendError> {
    let doc = encode_doc(row)?;
    conn.execute(
        &format!("INSERT INTO {} (id, doc) VALUES (?1, ?2)", table),
        params![row_id(row), doc],
    )?;
    Ok(())
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[rocket::async_trait]
impl Backend for SqliteBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
        let table = table_name(table)?;
        let (clause, mut binds) = where_clause(&query.filters)?;
        let mut sql = format!("SELECT id, doc FROM {}{}", table, clause);
        match &query.order {
            Some(order) => sql.push_str(&format!(
                " ORDER BY {} {}, id ASC",
                column_expr(&order.column)?,
                if order.ascending { "ASC" } else { "DESC" }
            )),
            None => sql.push_str(" ORDER BY id ASC"),
        }
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            binds.push(SqlValue::Integer(limit as i64));
        }

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(binds.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter().map(|(id, doc)| decode_row(*id, doc)).collect()
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> Result<(), BackendError> {
        let table = table_name(table)?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        for row in rows {
            insert_row(&tx, &table, row)?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn update(&self, table: &str, patch: &Row, filters: &[Filter]) -> Result<(), BackendError> {
        let table = table_name(table)?;
        let (clause, binds) = where_clause(filters)?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let matched = {
            let mut stmt = tx.prepare(&format!("SELECT id, doc FROM {}{}", table, clause))?;
            let rows = stmt
                .query_map(params_from_iter(binds.iter()), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        for (id, doc) in matched {
            let mut row = decode_row(id, &doc)?;
            for (key, value) in patch {
                if key != "id" {
                    row.insert(key.clone(), value.clone());
                }
            }
            tx.execute(
                &format!("UPDATE {} SET doc = ?1 WHERE id = ?2", table),
                params![encode_doc(&row)?, id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: &[Row], conflict: &str) -> Result<(), BackendError> {
        let table = table_name(table)?;
        let conflict_expr = column_expr(conflict)?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        for row in rows {
            let key = row.get(conflict).cloned().unwrap_or(Value::Null);
            let existing: Option<i64> = if key.is_null() {
                None
            } else {
                tx.query_row(
                    &format!("SELECT id FROM {} WHERE {} = ?1 LIMIT 1", table, conflict_expr),
                    params![bind_value(&key)],
                    |r| r.get(0),
                )
                .optional()?
            };
            match existing {
                Some(id) => {
                    tx.execute(
                        &format!("UPDATE {} SET doc = ?1 WHERE id = ?2", table),
                        params![encode_doc(row)?, id],
                    )?;
                }
                None => insert_row(&tx, &table, row)?,
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        let table = table_name(table)?;
        let (clause, binds) = where_clause(filters)?;
        let conn = self.pool.get()?;
        conn.execute(
            &format!("DELETE FROM {}{}", table, clause),
            params_from_iter(binds.iter()),
        )?;
        Ok(())
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<i64, BackendError> {
        let table = table_name(table)?;
        let (clause, binds) = where_clause(filters)?;
        let conn = self.pool.get()?;
        let n = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}{}", table, clause),
            params_from_iter(binds.iter()),
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Read-max and insert inside one immediate transaction, so concurrent
    /// creates are serialized by SQLite's write lock.
    async fn insert_ordered(
        &self,
        table: &str,
        mut row: Row,
        order_column: &str,
    ) -> Result<i64, BackendError> {
        let table = table_name(table)?;
        let order_expr = column_expr(order_column)?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let max: Option<i64> = tx.query_row(
            &format!("SELECT MAX({}) FROM {}", order_expr, table),
            [],
            |r| r.get(0),
        )?;
        let next = max.map(|m| m + 1).unwrap_or(0);
        row.insert(order_column.to_string(), Value::from(next));
        insert_row(&tx, &table, &row)?;
        tx.commit()?;
        Ok(next)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let conn = self.pool.get().map_err(BackendError::from)?;
        let email = email.trim().to_lowercase();
        let found: Option<(String, String)> = conn
            .query_row(
                "SELECT id, password_hash FROM auth_users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(BackendError::from)?;

        let (user_id, hash) = found.ok_or(AuthError::InvalidCredentials)?;
        if !bcrypt::verify(password, &hash).unwrap_or(false) {
            return Err(AuthError::InvalidCredentials);
        }

        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let expires = now + Duration::hours(self.session_hours);
        conn.execute(
            "INSERT INTO auth_sessions (token_hash, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![hash_token(&token), user_id, now.timestamp(), expires.timestamp()],
        )
        .map_err(BackendError::from)?;

        Ok(AuthSession {
            access_token: token,
            user: User { id: user_id, email },
            expires_at: Some(expires),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let conn = self.pool.get().map_err(BackendError::from)?;
        conn.execute(
            "DELETE FROM auth_sessions WHERE token_hash = ?1",
            params![hash_token(access_token)],
        )
        .map_err(BackendError::from)?;
        Ok(())
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<AuthSession>, BackendError> {
        let conn = self.pool.get()?;
        let found: Option<(String, String, i64)> = conn
            .query_row(
                "SELECT u.id, u.email, s.expires_at
                 FROM auth_sessions s JOIN auth_users u ON u.id = s.user_id
                 WHERE s.token_hash = ?1",
                params![hash_token(access_token)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((id, email, expires_at)) = found else {
            return Ok(None);
        };
        if expires_at <= Utc::now().timestamp() {
            conn.execute(
                "DELETE FROM auth_sessions WHERE token_hash = ?1",
                params![hash_token(access_token)],
            )?;
            return Ok(None);
        }

        Ok(Some(AuthSession {
            access_token: access_token.to_string(),
            user: User { id, email },
            expires_at: Utc.timestamp_opt(expires_at, 0).single(),
        }))
    }

    async fn purge_expired_sessions(&self) -> Result<usize, BackendError> {
        let conn = self.pool.get()?;
        let n = conn.execute(
            "DELETE FROM auth_sessions WHERE expires_at <= ?1",
            params![Utc::now().timestamp()],
        )?;
        Ok(n)
    }
}
