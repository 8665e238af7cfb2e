//! Dashboard sections: which one is showing, and what it shows.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rocket::request::FromParam;
use rocket::tokio;

use crate::auth::hash_key;
use crate::content::Region;
use crate::context::AppContext;
use crate::error::BackendError;
use crate::models::about::AboutContent;
use crate::models::contact::Contact;
use crate::models::message::Message;
use crate::models::project::Project;
use crate::models::skill::Skill;
use crate::models::stat::Stat;
use crate::views::admin::{self, OverviewCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Overview,
    About,
    Projects,
    Skills,
    Contact,
    Messages,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Overview,
        Section::About,
        Section::Projects,
        Section::Skills,
        Section::Contact,
        Section::Messages,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::About => "about",
            Section::Projects => "projects",
            Section::Skills => "skills",
            Section::Contact => "contact",
            Section::Messages => "messages",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Overview => "Dashboard Overview",
            Section::About => "About Section",
            Section::Projects => "Projects Management",
            Section::Skills => "Skills Management",
            Section::Contact => "Contact Information",
            Section::Messages => "Messages Inbox",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.slug() == slug)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl<'a> FromParam<'a> for Section {
    type Error = &'a str;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        Section::from_slug(param).ok_or(param)
    }
}

// ── Navigator ──────────────────────────────────────────

/// Views one session may track before the least recently used is dropped.
const MAX_VIEWS_PER_SESSION: usize = 16;

/// Handle for one navigation. Only the newest ticket of a view may apply
/// its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    session: String,
    view: String,
    pub generation: u64,
    pub section: Section,
}

struct NavState {
    generation: u64,
    section: Section,
    touched: Instant,
}

/// "Current section" per client view (a browser tab) of each session, with a
/// generation counter. A fetch that finishes after the same view started a
/// newer navigation is stale and must be dropped. Views never supersede
/// each other.
#[derive(Default)]
pub struct Navigator {
    sessions: Mutex<HashMap<String, HashMap<String, NavState>>>,
}

impl Navigator {
    pub fn new() -> Self {
        Navigator::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashMap<String, NavState>>> {
        match self.sessions.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start navigating view `view` of `token`'s session to `section`.
    pub fn begin(&self, token: &str, view: &str, section: Section) -> Ticket {
        let session = hash_key(token);
        let mut map = self.lock();
        let views = map.entry(session.clone()).or_default();

        if !views.contains_key(view) && views.len() >= MAX_VIEWS_PER_SESSION {
            let oldest = views
                .iter()
                .min_by_key(|(_, s)| s.touched)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                views.remove(&oldest);
            }
        }

        let state = views.entry(view.to_string()).or_insert(NavState {
            generation: 0,
            section,
            touched: Instant::now(),
        });
        state.generation += 1;
        state.section = section;
        state.touched = Instant::now();
        Ticket {
            session,
            view: view.to_string(),
            generation: state.generation,
            section,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.lock()
            .get(&ticket.session)
            .and_then(|views| views.get(&ticket.view))
            .map(|s| s.generation == ticket.generation)
            .unwrap_or(false)
    }

    /// Section the view most recently navigated to.
    pub fn current(&self, token: &str, view: &str) -> Option<Section> {
        self.lock()
            .get(&hash_key(token))
            .and_then(|views| views.get(view))
            .map(|s| s.section)
    }

    /// Forget every view of a session.
    pub fn forget(&self, token: &str) {
        self.lock().remove(&hash_key(token));
    }

    /// Drop views idle for longer than `max_idle`. Returns how many went.
    pub fn prune(&self, max_idle: Duration) -> usize {
        let mut map = self.lock();
        let mut dropped = 0;
        map.retain(|_, views| {
            let before = views.len();
            views.retain(|_, s| s.touched.elapsed() < max_idle);
            dropped += before - views.len();
            !views.is_empty()
        });
        dropped
    }
}

// ── Section loading ────────────────────────────────────

/// A rendered dashboard section.
#[derive(Debug, Clone)]
pub struct SectionView {
    pub section: Section,
    pub title: &'static str,
    pub html: String,
    pub failed: bool,
}

async fn count_or_zero<F>(what: &str, fut: F) -> i64
where
    F: std::future::Future<Output = Result<i64, BackendError>>,
{
    match fut.await {
        Ok(n) => n,
        Err(e) => {
            log::error!("Error counting {}: {}", what, e);
            0
        }
    }
}

pub async fn overview_counts(ctx: &AppContext) -> OverviewCounts {
    let (projects, skills, messages, unread) = tokio::join!(
        count_or_zero("projects", Project::count(ctx)),
        count_or_zero("skills", Skill::count(ctx)),
        count_or_zero("messages", Message::count(ctx)),
        count_or_zero("unread messages", Message::unread_count(ctx)),
    );
    OverviewCounts {
        projects,
        skills,
        messages,
        unread,
    }
}

/// Unread badge value; a failing count shows 0.
pub async fn unread_badge(ctx: &AppContext) -> i64 {
    count_or_zero("unread messages", Message::unread_count(ctx)).await
}

/// Fetch and render one section. Fetch failures become inline error regions
/// and set `failed` so the page can raise a notification too.
pub async fn load_section(ctx: &AppContext, section: Section, base: &str) -> SectionView {
    let (html, failed) = match section {
        Section::Overview => {
            let (counts, recent) = tokio::join!(overview_counts(ctx), Message::recent(ctx, 5));
            let recent = Region::from_result("recent messages", recent);
            (admin::overview(&counts, &recent, base), recent.is_failed())
        }
        Section::About => {
            let (about, stats) = tokio::join!(AboutContent::load(ctx), Stat::list(ctx));
            let about = Region::from_result("about", about);
            let stats = Region::from_result("stats", stats);
            let failed = about.is_failed() || stats.is_failed();
            (admin::about_editor(&about, &stats, base, None), failed)
        }
        Section::Projects => {
            let projects = Region::from_result("projects", Project::list(ctx).await);
            (admin::projects_list(&projects, base), projects.is_failed())
        }
        Section::Skills => {
            let skills = Region::from_result("skills", Skill::list(ctx).await);
            (admin::skills_list(&skills, base), skills.is_failed())
        }
        Section::Contact => {
            let contact = Region::from_result("contact info", Contact::load(ctx).await);
            (admin::contact_editor(&contact, base, None), contact.is_failed())
        }
        Section::Messages => {
            let messages = Region::from_result("messages", Message::list(ctx).await);
            (admin::messages_list(&messages, base), messages.is_failed())
        }
    };
    SectionView {
        section,
        title: section.title(),
        html,
        failed,
    }
}
