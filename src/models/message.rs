use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, decode_lenient, encode, timestamp};
use crate::backend::{Filter, Query, Row};
use crate::context::AppContext;
use crate::error::{AppError, BackendError, ValidationError};
use crate::validate;

/// A note left through the public contact form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    /// Rows written elsewhere without a timestamp sort as the oldest.
    #[serde(default, with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Public contact form. Fields are optional so a missing field reaches
/// validation instead of being rejected by the form parser.
#[derive(Debug, Default, Clone, FromForm)]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

pub const SENT_OK: &str = "Message sent successfully! I'll get back to you soon.";
pub const SEND_FAILED: &str = "Failed to send message. Please try again or contact me directly.";

impl ContactSubmission {
    /// First failing rule wins; rules run in form order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let field = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();
        let (name, email, subject, message) = (
            field(&self.name),
            field(&self.email),
            field(&self.subject),
            field(&self.message),
        );

        if [&name, &email, &subject, &message]
            .iter()
            .any(|v| v.is_empty())
        {
            return Err(ValidationError::new("form", "Please fill in all fields."));
        }
        validate::min_chars("name", &name, 2, "Please enter a valid name.")?;
        if !validate::is_valid_email(email.trim()) {
            return Err(ValidationError::new(
                "email",
                "Please enter a valid email address.",
            ));
        }
        validate::min_chars(
            "subject",
            &subject,
            3,
            "Subject must be at least 3 characters long.",
        )?;
        validate::min_chars(
            "message",
            &message,
            10,
            "Message must be at least 10 characters long.",
        )
    }

    fn to_message(&self, now: DateTime<Utc>) -> Message {
        let field = |v: &Option<String>| v.as_deref().unwrap_or("").trim().to_string();
        Message {
            id: None,
            name: field(&self.name),
            email: field(&self.email),
            subject: field(&self.subject),
            message: field(&self.message),
            is_read: false,
            created_at: now,
        }
    }
}

impl Message {
    /// Validate and store a contact form submission. Nothing is sent to the
    /// backend unless validation passes.
    pub async fn submit(ctx: &AppContext, submission: &ContactSubmission) -> Result<(), AppError> {
        submission.validate()?;
        let row = encode(&submission.to_message(Utc::now()));
        ctx.backend().insert(&ctx.tables.messages, &[row]).await?;
        Ok(())
    }

    /// Inbox order: newest first.
    pub async fn list(ctx: &AppContext) -> Result<Vec<Self>, BackendError> {
        Self::newest(ctx, None).await
    }

    pub async fn recent(ctx: &AppContext, limit: usize) -> Result<Vec<Self>, BackendError> {
        Self::newest(ctx, Some(limit)).await
    }

    async fn newest(ctx: &AppContext, limit: Option<usize>) -> Result<Vec<Self>, BackendError> {
        let mut query = Query::all().order_by("created_at", false);
        query.limit = limit;
        let rows = ctx.backend().select(&ctx.tables.messages, &query).await?;
        Ok(decode_lenient("message", rows))
    }

    pub async fn find(ctx: &AppContext, id: i64) -> Result<Option<Self>, BackendError> {
        ctx.backend()
            .select_single(&ctx.tables.messages, &Query::all().eq("id", id))
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn mark_read(ctx: &AppContext, id: i64) -> Result<(), BackendError> {
        let mut patch = Row::new();
        patch.insert("is_read".to_string(), Value::Bool(true));
        ctx.backend()
            .update(&ctx.tables.messages, &patch, &[Filter::eq("id", id)])
            .await
    }

    pub async fn delete(ctx: &AppContext, id: i64) -> Result<(), BackendError> {
        ctx.backend()
            .delete(&ctx.tables.messages, &[Filter::eq("id", id)])
            .await
    }

    pub async fn count(ctx: &AppContext) -> Result<i64, BackendError> {
        ctx.backend().count(&ctx.tables.messages, &[]).await
    }

    pub async fn unread_count(ctx: &AppContext) -> Result<i64, BackendError> {
        ctx.backend()
            .count(&ctx.tables.messages, &[Filter::eq("is_read", false)])
            .await
    }
}
