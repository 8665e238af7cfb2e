use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, encode, SINGLETON_ID};
use crate::backend::Query;
use crate::context::AppContext;
use crate::error::{AppError, BackendError, ValidationError};
use crate::validate;

/// Platforms the contact editor offers a field for.
pub const SOCIAL_PLATFORMS: &[&str] = &["github", "linkedin", "twitter", "instagram", "facebook"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub social_links: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, FromForm)]
pub struct ContactForm {
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub social: BTreeMap<String, String>,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::required("email", &self.email, "Contact email is required.")?;
        if !validate::is_valid_email(self.email.trim()) {
            return Err(ValidationError::new(
                "email",
                "Please enter a valid email address.",
            ));
        }
        for (platform, url) in &self.social {
            if validate::optional_http_url("social", Some(url), "").is_err() {
                return Err(ValidationError::new(
                    "social",
                    format!("The {} link must be an http(s) address.", platform),
                ));
            }
        }
        Ok(())
    }

    pub fn to_contact(&self) -> Contact {
        let links: BTreeMap<String, String> = self
            .social
            .iter()
            .filter_map(|(platform, url)| {
                validate::non_blank(Some(url)).map(|u| (platform.trim().to_lowercase(), u))
            })
            .collect();
        Contact {
            email: self.email.trim().to_string(),
            phone: validate::non_blank(self.phone.as_deref()),
            location: validate::non_blank(self.location.as_deref()),
            social_links: if links.is_empty() { None } else { Some(links) },
        }
    }
}

impl Contact {
    pub async fn load(ctx: &AppContext) -> Result<Option<Self>, BackendError> {
        ctx.backend()
            .select_single(&ctx.tables.contact, &Query::all())
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn save(ctx: &AppContext, form: &ContactForm) -> Result<(), AppError> {
        form.validate()?;
        let mut row = encode(&form.to_contact());
        row.insert("id".to_string(), Value::from(SINGLETON_ID));
        ctx.backend().upsert(&ctx.tables.contact, &[row], "id").await?;
        Ok(())
    }

    /// Social links in a stable order, skipping empty URLs.
    pub fn links(&self) -> Vec<(&str, &str)> {
        self.social_links
            .iter()
            .flatten()
            .filter(|(_, url)| !url.trim().is_empty())
            .map(|(platform, url)| (platform.as_str(), url.as_str()))
            .collect()
    }
}
