use serde::{Deserialize, Serialize};

use super::{decode, decode_all, encode};
use crate::backend::{Filter, Query};
use crate::context::AppContext;
use crate::error::{AppError, BackendError, ValidationError};
use crate::validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub project_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub order_index: i64,
}

#[derive(Debug, Default, FromForm)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub project_url: Option<String>,
    pub is_published: bool,
    pub order_index: Option<i64>,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            id: None,
            title: String::new(),
            description: String::new(),
            image_url: None,
            project_url: None,
            is_published: true,
            order_index: 0,
        }
    }
}

impl ProjectForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::required("title", &self.title, "Project title is required.")?;
        validate::required("description", &self.description, "Project description is required.")?;
        validate::optional_http_url(
            "image_url",
            self.image_url.as_deref(),
            "Image URL must be an http(s) address.",
        )?;
        validate::optional_http_url(
            "project_url",
            self.project_url.as_deref(),
            "Project URL must be an http(s) address.",
        )
    }

    pub fn to_project(&self) -> Project {
        Project {
            id: None,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            image_url: validate::non_blank(self.image_url.as_deref()),
            project_url: validate::non_blank(self.project_url.as_deref()),
            is_published: self.is_published,
            order_index: self.order_index.unwrap_or(0),
        }
    }
}

impl Project {
    /// Every project, in display order.
    pub async fn list(ctx: &AppContext) -> Result<Vec<Self>, BackendError> {
        let rows = ctx
            .backend()
            .select(&ctx.tables.projects, &Query::all().order_by("order_index", true))
            .await?;
        decode_all(rows)
    }

    /// What the public page shows.
    pub async fn published(ctx: &AppContext) -> Result<Vec<Self>, BackendError> {
        let query = Query::all()
            .eq("is_published", true)
            .order_by("order_index", true);
        let rows = ctx.backend().select(&ctx.tables.projects, &query).await?;
        decode_all(rows)
    }

    pub async fn find(ctx: &AppContext, id: i64) -> Result<Option<Self>, BackendError> {
        ctx.backend()
            .select_single(&ctx.tables.projects, &Query::all().eq("id", id))
            .await?
            .map(decode)
            .transpose()
    }

    /// Validate and append after the current last project. Returns the
    /// assigned `order_index`.
    pub async fn create(ctx: &AppContext, form: &ProjectForm) -> Result<i64, AppError> {
        form.validate()?;
        let row = encode(&form.to_project());
        let index = ctx
            .backend()
            .insert_ordered(&ctx.tables.projects, row, "order_index")
            .await?;
        Ok(index)
    }

    pub async fn update(ctx: &AppContext, id: i64, form: &ProjectForm) -> Result<(), AppError> {
        form.validate()?;
        let mut patch = encode(&form.to_project());
        if form.order_index.is_none() {
            patch.remove("order_index");
        }
        ctx.backend()
            .update(&ctx.tables.projects, &patch, &[Filter::eq("id", id)])
            .await?;
        Ok(())
    }

    pub async fn delete(ctx: &AppContext, id: i64) -> Result<(), BackendError> {
        ctx.backend()
            .delete(&ctx.tables.projects, &[Filter::eq("id", id)])
            .await
    }

    pub async fn count(ctx: &AppContext) -> Result<i64, BackendError> {
        ctx.backend().count(&ctx.tables.projects, &[]).await
    }
}
