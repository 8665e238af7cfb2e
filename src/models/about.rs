use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, encode, SINGLETON_ID};
use crate::backend::Query;
use crate::context::AppContext;
use crate::error::{AppError, BackendError, ValidationError};
use crate::validate;

/// Hero bio and about text. `about_text` is HTML written by the admin and is
/// rendered unescaped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AboutContent {
    #[serde(default)]
    pub hero_bio: String,
    #[serde(default)]
    pub about_text: String,
}

#[derive(Debug, FromForm)]
pub struct AboutForm {
    pub hero_bio: String,
    pub about_text: String,
}

impl From<&AboutForm> for AboutContent {
    fn from(form: &AboutForm) -> Self {
        AboutContent {
            hero_bio: form.hero_bio.trim().to_string(),
            about_text: form.about_text.trim().to_string(),
        }
    }
}

impl AboutContent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::required("hero_bio", &self.hero_bio, "Hero bio is required.")
    }

    /// The stored row, or `None` before the first save.
    pub async fn load(ctx: &AppContext) -> Result<Option<Self>, BackendError> {
        ctx.backend()
            .select_single(&ctx.tables.about, &Query::all())
            .await?
            .map(decode)
            .transpose()
    }

    /// Insert-or-replace the singleton row.
    pub async fn save(&self, ctx: &AppContext) -> Result<(), AppError> {
        self.validate()?;
        let mut row = encode(self);
        row.insert("id".to_string(), Value::from(SINGLETON_ID));
        ctx.backend().upsert(&ctx.tables.about, &[row], "id").await?;
        Ok(())
    }
}
