use serde::{Deserialize, Serialize};

use super::{decode_all, encode};
use crate::backend::{Filter, Query};
use crate::context::AppContext;
use crate::error::{AppError, BackendError, ValidationError};
use crate::validate;

/// A headline number on the public page ("12 Projects Completed").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub order_index: i64,
}

#[derive(Debug, FromForm)]
pub struct StatRowForm {
    pub key: String,
    pub label: String,
    pub value: i64,
}

#[derive(Debug, FromForm)]
pub struct StatsForm {
    pub stats: Vec<StatRowForm>,
}

impl Stat {
    /// Offered by the editor while the table is still empty.
    pub fn defaults() -> Vec<Stat> {
        [
            ("projects", "Projects Completed"),
            ("clients", "Happy Clients"),
            ("experience", "Years Experience"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (key, label))| Stat {
            key: key.to_string(),
            label: label.to_string(),
            value: 0,
            order_index: i as i64,
        })
        .collect()
    }

    pub async fn list(ctx: &AppContext) -> Result<Vec<Self>, BackendError> {
        let rows = ctx
            .backend()
            .select(&ctx.tables.stats, &Query::all().order_by("order_index", true))
            .await?;
        decode_all(rows)
    }

    /// Turn the submitted editor rows into stats, numbering them in form order.
    pub fn from_form(form: &StatsForm) -> Result<Vec<Self>, ValidationError> {
        let mut stats: Vec<Stat> = Vec::with_capacity(form.stats.len());
        for (i, row) in form.stats.iter().enumerate() {
            validate::required("key", &row.key, "Every stat needs a key.")?;
            validate::required("label", &row.label, "Every stat needs a label.")?;
            let key = row.key.trim().to_string();
            if stats.iter().any(|s| s.key == key) {
                return Err(ValidationError::new(
                    "key",
                    format!("Stat key '{}' is used twice.", key),
                ));
            }
            stats.push(Stat {
                key,
                label: row.label.trim().to_string(),
                value: row.value,
                order_index: i as i64,
            });
        }
        Ok(stats)
    }

    /// Make the stats table hold exactly `stats`. Rows are upserted on `key`
    /// first and keys no longer submitted are deleted afterwards, so a failed
    /// write leaves the previous stats readable.
    pub async fn replace_all(ctx: &AppContext, stats: &[Stat]) -> Result<(), AppError> {
        let backend = ctx.backend();
        let existing = Self::list(ctx).await?;
        if !stats.is_empty() {
            let rows: Vec<_> = stats.iter().map(encode).collect();
            backend.upsert(&ctx.tables.stats, &rows, "key").await?;
        }
        for old in existing
            .iter()
            .filter(|old| !stats.iter().any(|s| s.key == old.key))
        {
            backend
                .delete(&ctx.tables.stats, &[Filter::eq("key", old.key.as_str())])
                .await?;
        }
        Ok(())
    }
}
