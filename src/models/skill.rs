use serde::{Deserialize, Serialize};

use super::{decode, decode_all, encode};
use crate::backend::{Filter, Query};
use crate::context::AppContext;
use crate::error::{AppError, BackendError, ValidationError};
use crate::validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Proficiency, 0–100.
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub order_index: i64,
}

#[derive(Debug, Default, FromForm)]
pub struct SkillForm {
    pub name: String,
    pub category: Option<String>,
    pub level: Option<i64>,
    pub order_index: Option<i64>,
}

impl SkillForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::required("name", &self.name, "Skill name is required.")?;
        match self.level {
            Some(level) if !(0..=100).contains(&level) => Err(ValidationError::new(
                "level",
                "Skill level must be between 0 and 100.",
            )),
            _ => Ok(()),
        }
    }

    pub fn to_skill(&self) -> Skill {
        Skill {
            id: None,
            name: self.name.trim().to_string(),
            category: validate::non_blank(self.category.as_deref()),
            level: self.level,
            order_index: self.order_index.unwrap_or(0),
        }
    }
}

impl Skill {
    pub async fn list(ctx: &AppContext) -> Result<Vec<Self>, BackendError> {
        let rows = ctx
            .backend()
            .select(&ctx.tables.skills, &Query::all().order_by("order_index", true))
            .await?;
        decode_all(rows)
    }

    pub async fn find(ctx: &AppContext, id: i64) -> Result<Option<Self>, BackendError> {
        ctx.backend()
            .select_single(&ctx.tables.skills, &Query::all().eq("id", id))
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn create(ctx: &AppContext, form: &SkillForm) -> Result<i64, AppError> {
        form.validate()?;
        let row = encode(&form.to_skill());
        let index = ctx
            .backend()
            .insert_ordered(&ctx.tables.skills, row, "order_index")
            .await?;
        Ok(index)
    }

    pub async fn update(ctx: &AppContext, id: i64, form: &SkillForm) -> Result<(), AppError> {
        form.validate()?;
        let mut patch = encode(&form.to_skill());
        if form.order_index.is_none() {
            patch.remove("order_index");
        }
        ctx.backend()
            .update(&ctx.tables.skills, &patch, &[Filter::eq("id", id)])
            .await?;
        Ok(())
    }

    pub async fn delete(ctx: &AppContext, id: i64) -> Result<(), BackendError> {
        ctx.backend()
            .delete(&ctx.tables.skills, &[Filter::eq("id", id)])
            .await
    }

    pub async fn count(ctx: &AppContext) -> Result<i64, BackendError> {
        ctx.backend().count(&ctx.tables.skills, &[]).await
    }
}
