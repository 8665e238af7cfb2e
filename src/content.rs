use rocket::tokio;

use crate::context::AppContext;
use crate::error::BackendError;
use crate::models::about::AboutContent;
use crate::models::contact::Contact;
use crate::models::project::Project;
use crate::models::skill::Skill;
use crate::models::stat::Stat;

/// Outcome of one independent fetch. A failed region keeps its placeholder;
/// it never takes the rest of the page down with it.
#[derive(Debug, Clone, PartialEq)]
pub enum Region<T> {
    Ready(T),
    Failed,
}

impl<T> Region<T> {
    /// Log a failed fetch and keep going.
    pub fn from_result(what: &str, result: Result<T, BackendError>) -> Self {
        match result {
            Ok(v) => Region::Ready(v),
            Err(e) => {
                log::error!("Error loading {}: {}", what, e);
                Region::Failed
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Region::Ready(v) => Some(v),
            Region::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Region::Failed)
    }
}

/// Everything the public page shows, one region per fetch.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub hero_bio: Region<Option<String>>,
    pub about_text: Region<Option<String>>,
    pub stats: Region<Vec<Stat>>,
    pub projects: Region<Vec<Project>>,
    pub skills: Region<Vec<Skill>>,
    pub contact: Region<Option<Contact>>,
}

async fn hero_bio(ctx: &AppContext) -> Result<Option<String>, BackendError> {
    Ok(AboutContent::load(ctx)
        .await?
        .map(|a| a.hero_bio)
        .filter(|bio| !bio.is_empty()))
}

async fn about_text(ctx: &AppContext) -> Result<Option<String>, BackendError> {
    Ok(AboutContent::load(ctx)
        .await?
        .map(|a| a.about_text)
        .filter(|text| !text.is_empty()))
}

/// Run the six page fetches concurrently and collect whatever succeeded.
pub async fn load_page(ctx: &AppContext) -> PageContent {
    let (hero, about, stats, projects, skills, contact) = tokio::join!(
        hero_bio(ctx),
        about_text(ctx),
        Stat::list(ctx),
        Project::published(ctx),
        Skill::list(ctx),
        Contact::load(ctx),
    );

    PageContent {
        hero_bio: Region::from_result("hero bio", hero),
        about_text: Region::from_result("about", about),
        stats: Region::from_result("stats", stats),
        projects: Region::from_result("projects", projects),
        skills: Region::from_result("skills", skills),
        contact: Region::from_result("contact info", contact),
    }
}
