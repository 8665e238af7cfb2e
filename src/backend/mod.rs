use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuthError, BackendError};

pub mod rest;
pub mod sqlite;

/// One row as exchanged with the backend: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn neq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Neq(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Neq(c, _) => c,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Filter::Eq(_, v) | Filter::Neq(_, v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Read query: filters are ANDed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn all() -> Self {
        Query::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// An issued session. The access token is opaque to everything but the
/// backend that minted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: User,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The hosted backend: credential sessions plus per-table CRUD.
/// Implementations: `SqliteBackend` (local file) and `RestBackend`
/// (PostgREST/GoTrue compatible HTTP API).
#[rocket::async_trait]
pub trait Backend: Send + Sync {
    // ── Data ────────────────────────────────────────────────────────
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError>;

    /// First matching row, or `None` when nothing matches.
    async fn select_single(&self, table: &str, query: &Query) -> Result<Option<Row>, BackendError> {
        let query = query.clone().limit(1);
        Ok(self.select(table, &query).await?.into_iter().next())
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> Result<(), BackendError>;
    async fn update(&self, table: &str, patch: &Row, filters: &[Filter]) -> Result<(), BackendError>;
    async fn upsert(&self, table: &str, rows: &[Row], conflict: &str) -> Result<(), BackendError>;
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;
    async fn count(&self, table: &str, filters: &[Filter]) -> Result<i64, BackendError>;

    /// Insert `row` with `order_column` set to one past the current maximum
    /// (0 for an empty table). Returns the assigned value.
    ///
    /// This default reads the maximum and inserts in two round trips, so two
    /// concurrent callers can be handed the same value. Backends that can do
    /// the read-modify-write atomically override it.
    async fn insert_ordered(
        &self,
        table: &str,
        mut row: Row,
        order_column: &str,
    ) -> Result<i64, BackendError> {
        let top = self
            .select(table, &Query::all().order_by(order_column, false).limit(1))
            .await?;
        let next = top
            .first()
            .and_then(|r| r.get(order_column))
            .and_then(Value::as_i64)
            .map(|max| max + 1)
            .unwrap_or(0);
        row.insert(order_column.to_string(), Value::from(next));
        self.insert(table, &[row]).await?;
        Ok(next)
    }

    /// A handle whose data calls run as the holder of `access_token`.
    /// `None` when the backend has no per-user roles and the shared handle
    /// is already correct.
    fn for_user(&self, _access_token: &str) -> Option<Arc<dyn Backend>> {
        None
    }

    // ── Auth ────────────────────────────────────────────────────────
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
    async fn get_session(&self, access_token: &str) -> Result<Option<AuthSession>, BackendError>;

    /// Drop sessions past their expiry. Hosted backends expire sessions on
    /// their own, so the default does nothing.
    async fn purge_expired_sessions(&self) -> Result<usize, BackendError> {
        Ok(0)
    }
}

/// Plain SQL identifier: letter or underscore, then letters, digits or
/// underscores.
pub fn is_identifier(name: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"))
        .is_match(name)
}

pub(crate) fn check_identifier(name: &str) -> Result<(), BackendError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(BackendError::InvalidIdentifier(name.to_string()))
    }
}
