use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{check_identifier, AuthSession, Backend, Filter, Query, Row, User};
use crate::error::{AuthError, BackendError};

/// Client for a hosted backend speaking the PostgREST (`/rest/v1`) and
/// GoTrue (`/auth/v1`) HTTP dialects.
///
/// Data calls carry `bearer` when set (the signed-in admin's access token,
/// see `for_user`) and the anon key otherwise, so row-level security sees
/// the right role.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base: Url,
    api_key: String,
    bearer: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    user: User,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, BackendError> {
        Self::with_client(base_url, api_key, Client::new())
    }

    pub(crate) fn with_client(
        base_url: &str,
        api_key: &str,
        client: Client,
    ) -> Result<Self, BackendError> {
        // join() replaces the last path segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized).map_err(|e| BackendError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            base,
            api_key: api_key.to_string(),
            bearer: None,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|e| BackendError::Connection(e.to_string()))
    }

    fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        check_identifier(table)?;
        self.endpoint(&format!("rest/v1/{}", table))
    }

    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(
                bearer
                    .or(self.bearer.as_deref())
                    .unwrap_or(&self.api_key),
            )
    }

    /// `GET /rest/v1/<table>` URL for `query`: filters, then order, then limit.
    pub(crate) fn select_url(&self, table: &str, query: &Query) -> Result<Url, BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("select", "*");
        apply_filters(&mut url, &query.filters)?;
        if let Some(order) = &query.order {
            check_identifier(&order.column)?;
            let dir = if order.ascending { "asc" } else { "desc" };
            url.query_pairs_mut()
                .append_pair("order", &format!("{}.{}", order.column, dir));
        }
        if let Some(limit) = query.limit {
            url.query_pairs_mut().append_pair("limit", &limit.to_string());
        }
        Ok(url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(BackendError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// PostgREST operator value: `eq.foo`, `neq.3`, `is.null`.
pub(crate) fn filter_param(filter: &Filter) -> Result<(String, String), BackendError> {
    check_identifier(filter.column())?;
    let (op, null_op) = match filter {
        Filter::Eq(..) => ("eq", "is"),
        Filter::Neq(..) => ("neq", "not.is"),
    };
    let rendered = match filter.value() {
        Value::Null => format!("{}.null", null_op),
        Value::String(s) => format!("{}.{}", op, s),
        other => format!("{}.{}", op, other),
    };
    Ok((filter.column().to_string(), rendered))
}

pub(crate) fn apply_filters(url: &mut Url, filters: &[Filter]) -> Result<(), BackendError> {
    let params = filters
        .iter()
        .map(filter_param)
        .collect::<Result<Vec<_>, _>>()?;
    let mut pairs = url.query_pairs_mut();
    for (column, value) in params {
        pairs.append_pair(&column, &value);
    }
    Ok(())
}

/// Total from a `Content-Range` header such as `0-4/5` or `*/0`.
pub(crate) fn parse_content_range(header: &str) -> Option<i64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

#[rocket::async_trait]
impl Backend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
        let url = self.select_url(table, query)?;
        let response = self.send(self.request(Method::GET, url, None)).await?;
        Ok(response.json::<Vec<Row>>().await?)
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> Result<(), BackendError> {
        let url = self.table_url(table)?;
        self.send(
            self.request(Method::POST, url, None)
                .header("Prefer", "return=minimal")
                .json(rows),
        )
        .await?;
        Ok(())
    }

    async fn update(&self, table: &str, patch: &Row, filters: &[Filter]) -> Result<(), BackendError> {
        let mut url = self.table_url(table)?;
        apply_filters(&mut url, filters)?;
        self.send(
            self.request(Method::PATCH, url, None)
                .header("Prefer", "return=minimal")
                .json(patch),
        )
        .await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: &[Row], conflict: &str) -> Result<(), BackendError> {
        check_identifier(conflict)?;
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("on_conflict", conflict);
        self.send(
            self.request(Method::POST, url, None)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(rows),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        let mut url = self.table_url(table)?;
        apply_filters(&mut url, filters)?;
        self.send(self.request(Method::DELETE, url, None)).await?;
        Ok(())
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<i64, BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("select", "*");
        apply_filters(&mut url, filters)?;
        let response = self
            .send(
                self.request(Method::HEAD, url, None)
                    .header("Prefer", "count=exact"),
            )
            .await?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| BackendError::Decode("missing Content-Range header".to_string()))
    }

    fn for_user(&self, access_token: &str) -> Option<Arc<dyn Backend>> {
        Some(Arc::new(RestBackend {
            bearer: Some(access_token.to_string()),
            ..self.clone()
        }))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let url = self.endpoint("auth/v1/token?grant_type=password")?;
        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(BackendError::from)?;

        match response.status() {
            s if s.is_success() => {
                let token: TokenResponse = response.json().await.map_err(BackendError::from)?;
                Ok(AuthSession {
                    access_token: token.access_token,
                    user: token.user,
                    expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            s => Err(AuthError::Backend(format!("sign-in returned {}", s.as_u16()))),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.endpoint("auth/v1/logout")?;
        match self.send(self.request(Method::POST, url, Some(access_token))).await {
            Ok(_) => Ok(()),
            Err(BackendError::Status { status: 401, .. }) => Err(AuthError::SessionExpired),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<AuthSession>, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        match self.send(self.request(Method::GET, url, Some(access_token))).await {
            Ok(response) => {
                let user: User = response.json().await?;
                Ok(Some(AuthSession {
                    access_token: access_token.to_string(),
                    user,
                    expires_at: None,
                }))
            }
            Err(BackendError::Status { status: 401 | 403, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
