#![cfg(test)]

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use reqwest::Client;
use serde_json::{json, Value};

use crate::auth::hash_key;
use crate::backend::rest::{apply_filters, filter_param, parse_content_range, RestBackend};
use crate::backend::sqlite::SqliteBackend;
use crate::backend::{is_identifier, AuthSession, Backend, Filter, Query, Row};
use crate::config::{AppConfig, BackendKind, Tables};
use crate::content::{self, Region};
use crate::context::AppContext;
use crate::db::{self, run_migrations, DbPool};
use crate::error::{AppError, AuthError, BackendError};
use crate::manager::{self, Navigator, Section};
use crate::models::about::AboutContent;
use crate::models::contact::{Contact, ContactForm};
use crate::models::message::{ContactSubmission, Message};
use crate::models::project::{Project, ProjectForm};
use crate::models::skill::{Skill, SkillForm};
use crate::models::stat::{Stat, StatRowForm, StatsForm};
use crate::models::encode;
use crate::rate_limit::{LoginThrottle, LOGIN_WINDOW};
use crate::render;
use crate::routes::admin::api::export_filename;
use crate::validate;
use crate::views::{admin, public};

/// Atomic counter for unique shared-cache DB names so parallel tests don't collide.
static TEST_DB_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Fresh in-memory SQLite pool with every table created. Shared cache so
/// all pooled connections see the same data.
fn test_pool() -> DbPool {
    let id = TEST_DB_COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    let uri = format!("file:folio_testdb_{}?mode=memory&cache=shared", id);
    let manager = SqliteConnectionManager::file(uri);
    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .expect("Failed to create test pool");
    run_migrations(&pool, &Tables::default()).expect("Failed to run migrations");
    pool
}

// ── Recording backend ──────────────────────────────────

/// Wraps the SQLite backend, records every data call and fails calls on
/// tables marked with `fail` (or single operations marked with `fail_op`).
struct Recorder {
    inner: SqliteBackend,
    calls: Mutex<Vec<(&'static str, String)>>,
    failing: Mutex<Vec<String>>,
    failing_ops: Mutex<Vec<(&'static str, String)>>,
}

impl Recorder {
    fn new(pool: DbPool) -> Self {
        Recorder {
            inner: SqliteBackend::new(pool, 24),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
            failing_ops: Mutex::new(Vec::new()),
        }
    }

    fn fail(&self, table: &str) {
        self.failing.lock().unwrap().push(table.to_string());
    }

    fn fail_op(&self, op: &'static str, table: &str) {
        self.failing_ops.lock().unwrap().push((op, table.to_string()));
    }

    fn record(&self, op: &'static str, table: &str) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push((op, table.to_string()));
        let op_fails = self
            .failing_ops
            .lock()
            .unwrap()
            .iter()
            .any(|(o, t)| *o == op && t == table);
        if op_fails || self.failing.lock().unwrap().iter().any(|t| t == table) {
            Err(BackendError::Query(format!("injected failure on {}", table)))
        } else {
            Ok(())
        }
    }

    fn count_calls(&self, op: &str, table: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, t)| *o == op && t == table)
            .count()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[rocket::async_trait]
impl Backend for Recorder {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
        self.record("select", table)?;
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> Result<(), BackendError> {
        self.record("insert", table)?;
        self.inner.insert(table, rows).await
    }

    async fn update(&self, table: &str, patch: &Row, filters: &[Filter]) -> Result<(), BackendError> {
        self.record("update", table)?;
        self.inner.update(table, patch, filters).await
    }

    async fn upsert(&self, table: &str, rows: &[Row], conflict: &str) -> Result<(), BackendError> {
        self.record("upsert", table)?;
        self.inner.upsert(table, rows, conflict).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        self.record("delete", table)?;
        self.inner.delete(table, filters).await
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<i64, BackendError> {
        self.record("count", table)?;
        self.inner.count(table, filters).await
    }

    async fn insert_ordered(&self, table: &str, row: Row, order_column: &str) -> Result<i64, BackendError> {
        self.record("insert", table)?;
        self.inner.insert_ordered(table, row, order_column).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.inner.sign_in(email, password).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.inner.sign_out(access_token).await
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<AuthSession>, BackendError> {
        self.inner.get_session(access_token).await
    }

    async fn purge_expired_sessions(&self) -> Result<usize, BackendError> {
        self.inner.purge_expired_sessions().await
    }
}

fn setup() -> (AppContext, Arc<Recorder>) {
    let rec = Arc::new(Recorder::new(test_pool()));
    let ctx = AppContext::new(rec.clone(), Tables::default());
    (ctx, rec)
}

fn submission(name: &str, email: &str, subject: &str, message: &str) -> ContactSubmission {
    ContactSubmission {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        subject: Some(subject.to_string()),
        message: Some(message.to_string()),
    }
}

fn valid_submission() -> ContactSubmission {
    submission(
        "Jane Doe",
        "jane@example.com",
        "Project inquiry",
        "I would like to talk about a project.",
    )
}

fn project_form(title: &str) -> ProjectForm {
    ProjectForm {
        title: title.to_string(),
        description: format!("{} description", title),
        is_published: true,
        ..Default::default()
    }
}

fn skill_form(name: &str) -> SkillForm {
    SkillForm {
        name: name.to_string(),
        level: Some(80),
        ..Default::default()
    }
}

// ═══════════════════════════════════════════════════════════
// Contact form
// ═══════════════════════════════════════════════════════════

#[rocket::async_test]
async fn contact_valid_submission_inserts_once() {
    let (ctx, rec) = setup();
    Message::submit(&ctx, &valid_submission()).await.unwrap();

    assert_eq!(rec.total_calls(), 1);
    assert_eq!(rec.count_calls("insert", "messages"), 1);

    let stored = Message::list(&ctx).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Jane Doe");
    assert!(!stored[0].is_read);
}

#[rocket::async_test]
async fn contact_invalid_fields_make_no_backend_calls() {
    let (ctx, rec) = setup();
    let cases = [
        (submission("", "jane@example.com", "Hello", "Long enough message"), "Please fill in all fields."),
        (submission("J", "jane@example.com", "Hello", "Long enough message"), "Please enter a valid name."),
        (submission("Jane", "jane@example", "Hello", "Long enough message"), "Please enter a valid email address."),
        (submission("Jane", "jane example@x.com", "Hello", "Long enough message"), "Please enter a valid email address."),
        (submission("Jane", "jane@example.com", "Hi", "Long enough message"), "Subject must be at least 3 characters long."),
        (submission("Jane", "jane@example.com", "Hello", "Too short"), "Message must be at least 10 characters long."),
    ];
    for (form, expected) in cases {
        match Message::submit(&ctx, &form).await {
            Err(AppError::Validation(v)) => assert_eq!(v.message, expected),
            other => panic!("expected validation error {:?}, got {:?}", expected, other),
        }
    }
    assert_eq!(rec.total_calls(), 0);
}

#[rocket::async_test]
async fn contact_missing_field_is_fill_all() {
    let (ctx, rec) = setup();
    let form = ContactSubmission {
        message: None,
        ..valid_submission()
    };
    let err = Message::submit(&ctx, &form).await.unwrap_err();
    assert_eq!(err.user_message("x"), "Please fill in all fields.");
    assert_eq!(rec.total_calls(), 0);
}

#[test]
fn contact_rules_apply_in_order() {
    // Short name and bad email: the name rule wins.
    let err = submission("J", "nope", "Hi", "short").validate().unwrap_err();
    assert_eq!(err.message, "Please enter a valid name.");
    // Whitespace padding does not count toward length.
    let err = submission("  J  ", "jane@example.com", "Hello", "Long enough message")
        .validate()
        .unwrap_err();
    assert_eq!(err.field, "name");
}

#[test]
fn whitespace_only_fields_hit_length_rules() {
    // Present but blank fields are not "missing"; the length rules catch them.
    let err = submission("   ", "jane@example.com", "Hello", "Long enough message")
        .validate()
        .unwrap_err();
    assert_eq!(err.message, "Please enter a valid name.");
    let err = submission("Jane", "jane@example.com", "  ", "Long enough message")
        .validate()
        .unwrap_err();
    assert_eq!(err.message, "Subject must be at least 3 characters long.");
    let err = submission("Jane", "jane@example.com", "Hello", "").validate().unwrap_err();
    assert_eq!(err.message, "Please fill in all fields.");
}

#[rocket::async_test]
async fn contact_backend_failure_uses_fallback_message() {
    let (ctx, rec) = setup();
    rec.fail("messages");
    let err = Message::submit(&ctx, &valid_submission()).await.unwrap_err();
    assert!(matches!(err, AppError::Backend(_)));
    assert_eq!(
        err.user_message(crate::models::message::SEND_FAILED),
        crate::models::message::SEND_FAILED
    );
    assert_eq!(rec.count_calls("insert", "messages"), 1);
}

// ═══════════════════════════════════════════════════════════
// Messages inbox
// ═══════════════════════════════════════════════════════════

#[rocket::async_test]
async fn mark_read_decreases_unread_by_one() {
    let (ctx, _rec) = setup();
    Message::submit(&ctx, &valid_submission()).await.unwrap();
    Message::submit(&ctx, &valid_submission()).await.unwrap();
    assert_eq!(Message::unread_count(&ctx).await.unwrap(), 2);

    let first = Message::list(&ctx).await.unwrap()[0].id.unwrap();
    Message::mark_read(&ctx, first).await.unwrap();

    assert_eq!(Message::unread_count(&ctx).await.unwrap(), 1);
    assert_eq!(Message::count(&ctx).await.unwrap(), 2);
    assert!(Message::find(&ctx, first).await.unwrap().unwrap().is_read);
}

#[rocket::async_test]
async fn inbox_lists_newest_first() {
    let (ctx, _rec) = setup();
    for (i, day) in [3, 1, 2].iter().enumerate() {
        let msg = Message {
            id: None,
            name: format!("Sender {}", i),
            email: "s@example.com".to_string(),
            subject: "Subject".to_string(),
            message: "Body of the message".to_string(),
            is_read: false,
            created_at: Utc.with_ymd_and_hms(2026, 1, *day, 12, 0, 0).unwrap(),
        };
        ctx.backend().insert("messages", &[encode(&msg)]).await.unwrap();
    }
    let names: Vec<String> = Message::list(&ctx).await.unwrap().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["Sender 0", "Sender 2", "Sender 1"]);

    let recent = Message::recent(&ctx, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
}

fn inbox_message(name: &str, created_at: DateTime<Utc>) -> Message {
    Message {
        id: None,
        name: name.to_string(),
        email: "s@example.com".to_string(),
        subject: "Subject".to_string(),
        message: "Body of the message".to_string(),
        is_read: false,
        created_at,
    }
}

#[rocket::async_test]
async fn inbox_orders_within_one_second() {
    let (ctx, _rec) = setup();
    let noon = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let earlier = inbox_message("Earlier", noon);
    let later = inbox_message("Later", noon + chrono::Duration::milliseconds(500));

    assert_eq!(encode(&earlier)["created_at"], "2026-01-01T12:00:00.000000Z");
    assert_eq!(encode(&later)["created_at"], "2026-01-01T12:00:00.500000Z");

    ctx.backend()
        .insert("messages", &[encode(&earlier), encode(&later)])
        .await
        .unwrap();
    let names: Vec<String> = Message::list(&ctx).await.unwrap().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["Later", "Earlier"]);
    assert_eq!(Message::list(&ctx).await.unwrap()[0].created_at, later.created_at);
}

#[rocket::async_test]
async fn inbox_skips_malformed_rows() {
    let (ctx, _rec) = setup();
    let untimed = json!({
        "name": "No Clock",
        "email": "n@example.com",
        "subject": "Subject",
        "message": "Body of the message",
    });
    let broken = json!({
        "name": 5,
        "email": "b@example.com",
        "subject": "Subject",
        "message": "Body of the message",
        "created_at": "2026-01-01T12:00:00.000000Z",
    });
    let rows: Vec<Row> = [untimed, broken]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
    ctx.backend().insert("messages", &rows).await.unwrap();
    Message::submit(&ctx, &valid_submission()).await.unwrap();

    let inbox = Message::list(&ctx).await.unwrap();
    let names: Vec<&str> = inbox.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Jane Doe", "No Clock"]);
    assert_eq!(inbox[1].created_at, DateTime::<Utc>::default());
    assert_eq!(Message::count(&ctx).await.unwrap(), 3);
}

#[rocket::async_test]
async fn message_delete_removes_row() {
    let (ctx, _rec) = setup();
    Message::submit(&ctx, &valid_submission()).await.unwrap();
    let id = Message::list(&ctx).await.unwrap()[0].id.unwrap();
    Message::delete(&ctx, id).await.unwrap();
    assert_eq!(Message::count(&ctx).await.unwrap(), 0);
    assert!(Message::find(&ctx, id).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════
// Projects & skills
// ═══════════════════════════════════════════════════════════

#[rocket::async_test]
async fn project_creates_get_increasing_order_index() {
    let (ctx, _rec) = setup();
    let a = Project::create(&ctx, &project_form("Alpha")).await.unwrap();
    let b = Project::create(&ctx, &project_form("Beta")).await.unwrap();
    let c = Project::create(&ctx, &project_form("Gamma")).await.unwrap();
    assert_eq!((a, b, c), (0, 1, 2));

    let titles: Vec<String> = Project::list(&ctx).await.unwrap().into_iter().map(|p| p.title).collect();
    assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
}

#[rocket::async_test]
async fn skill_creates_get_increasing_order_index() {
    let (ctx, _rec) = setup();
    let a = Skill::create(&ctx, &skill_form("Rust")).await.unwrap();
    let b = Skill::create(&ctx, &skill_form("SQL")).await.unwrap();
    assert!(b > a);
    let skills = Skill::list(&ctx).await.unwrap();
    assert_eq!(skills[0].name, "Rust");
    assert_eq!(skills[1].order_index, b);
}

#[rocket::async_test]
async fn default_insert_ordered_appends_after_max() {
    // The two-step trait default, exercised through a backend without the override.
    struct Plain(SqliteBackend);

    #[rocket::async_trait]
    impl Backend for Plain {
        async fn select(&self, t: &str, q: &Query) -> Result<Vec<Row>, BackendError> {
            self.0.select(t, q).await
        }
        async fn insert(&self, t: &str, r: &[Row]) -> Result<(), BackendError> {
            self.0.insert(t, r).await
        }
        async fn update(&self, t: &str, p: &Row, f: &[Filter]) -> Result<(), BackendError> {
            self.0.update(t, p, f).await
        }
        async fn upsert(&self, t: &str, r: &[Row], c: &str) -> Result<(), BackendError> {
            self.0.upsert(t, r, c).await
        }
        async fn delete(&self, t: &str, f: &[Filter]) -> Result<(), BackendError> {
            self.0.delete(t, f).await
        }
        async fn count(&self, t: &str, f: &[Filter]) -> Result<i64, BackendError> {
            self.0.count(t, f).await
        }
        async fn sign_in(&self, e: &str, p: &str) -> Result<AuthSession, AuthError> {
            self.0.sign_in(e, p).await
        }
        async fn sign_out(&self, t: &str) -> Result<(), AuthError> {
            self.0.sign_out(t).await
        }
        async fn get_session(&self, t: &str) -> Result<Option<AuthSession>, BackendError> {
            self.0.get_session(t).await
        }
    }

    let backend = Plain(SqliteBackend::new(test_pool(), 24));
    let first = backend.insert_ordered("skills", encode(&Skill::default()), "order_index").await.unwrap();
    let second = backend.insert_ordered("skills", encode(&Skill::default()), "order_index").await.unwrap();
    assert_eq!((first, second), (0, 1));
}

#[rocket::async_test]
async fn project_validation_blocks_backend() {
    let (ctx, rec) = setup();
    let form = ProjectForm {
        description: "Something".to_string(),
        ..Default::default()
    };
    let err = Project::create(&ctx, &form).await.unwrap_err();
    assert_eq!(err.user_message(""), "Project title is required.");

    let mut form = project_form("Site");
    form.project_url = Some("javascript:alert(1)".to_string());
    assert!(matches!(Project::create(&ctx, &form).await, Err(AppError::Validation(_))));
    assert_eq!(rec.total_calls(), 0);
}

#[rocket::async_test]
async fn skill_level_out_of_range_is_rejected() {
    let (ctx, rec) = setup();
    let mut form = skill_form("Go");
    form.level = Some(101);
    let err = Skill::create(&ctx, &form).await.unwrap_err();
    assert_eq!(err.user_message(""), "Skill level must be between 0 and 100.");
    form.level = Some(-1);
    assert!(Skill::create(&ctx, &form).await.is_err());
    assert_eq!(rec.total_calls(), 0);
}

#[rocket::async_test]
async fn project_update_keeps_order_when_not_given() {
    let (ctx, _rec) = setup();
    Project::create(&ctx, &project_form("First")).await.unwrap();
    Project::create(&ctx, &project_form("Second")).await.unwrap();
    let second = Project::list(&ctx).await.unwrap()[1].clone();
    let id = second.id.unwrap();

    let mut form = project_form("Second, renamed");
    form.is_published = false;
    Project::update(&ctx, id, &form).await.unwrap();

    let updated = Project::find(&ctx, id).await.unwrap().unwrap();
    assert_eq!(updated.title, "Second, renamed");
    assert_eq!(updated.order_index, 1);
    assert!(!updated.is_published);

    form.order_index = Some(7);
    Project::update(&ctx, id, &form).await.unwrap();
    assert_eq!(Project::find(&ctx, id).await.unwrap().unwrap().order_index, 7);
}

#[rocket::async_test]
async fn published_filters_drafts() {
    let (ctx, _rec) = setup();
    Project::create(&ctx, &project_form("Live")).await.unwrap();
    let mut draft = project_form("Draft");
    draft.is_published = false;
    Project::create(&ctx, &draft).await.unwrap();

    let published = Project::published(&ctx).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].title, "Live");
    assert_eq!(Project::count(&ctx).await.unwrap(), 2);
}

#[rocket::async_test]
async fn project_delete_and_missing_find() {
    let (ctx, _rec) = setup();
    Project::create(&ctx, &project_form("Gone")).await.unwrap();
    let id = Project::list(&ctx).await.unwrap()[0].id.unwrap();
    Project::delete(&ctx, id).await.unwrap();
    assert!(Project::find(&ctx, id).await.unwrap().is_none());
    assert!(Skill::find(&ctx, 999).await.unwrap().is_none());
}

#[rocket::async_test]
async fn projects_select_error_shows_error_state_without_retry() {
    let (ctx, rec) = setup();
    rec.fail("projects");
    let view = manager::load_section(&ctx, Section::Projects, "/admin").await;
    assert!(view.failed);
    assert!(view.html.contains("Error loading projects"));
    assert_eq!(rec.count_calls("select", "projects"), 1);
}

#[rocket::async_test]
async fn empty_tables_show_empty_state() {
    let (ctx, _rec) = setup();
    let projects = manager::load_section(&ctx, Section::Projects, "/admin").await;
    assert!(!projects.failed);
    assert!(projects.html.contains(admin::PROJECTS_EMPTY));

    let skills = manager::load_section(&ctx, Section::Skills, "/admin").await;
    assert!(skills.html.contains(admin::SKILLS_EMPTY));

    let messages = manager::load_section(&ctx, Section::Messages, "/admin").await;
    assert!(messages.html.contains(admin::MESSAGES_EMPTY));
    assert!(!messages.html.contains("Error loading"));
}

// ═══════════════════════════════════════════════════════════
// Singleton editors & stats
// ═══════════════════════════════════════════════════════════

#[rocket::async_test]
async fn about_save_is_idempotent() {
    let (ctx, _rec) = setup();
    let first = AboutContent {
        hero_bio: "Builder of things".to_string(),
        about_text: "<p>Hi</p>".to_string(),
    };
    first.save(&ctx).await.unwrap();
    first.save(&ctx).await.unwrap();
    let second = AboutContent {
        hero_bio: "Maker of things".to_string(),
        about_text: String::new(),
    };
    second.save(&ctx).await.unwrap();

    assert_eq!(ctx.backend().count("about", &[]).await.unwrap(), 1);
    assert_eq!(AboutContent::load(&ctx).await.unwrap(), Some(second));
}

#[rocket::async_test]
async fn about_requires_hero_bio() {
    let (ctx, rec) = setup();
    let about = AboutContent {
        hero_bio: "   ".to_string(),
        about_text: "x".to_string(),
    };
    assert!(matches!(about.save(&ctx).await, Err(AppError::Validation(_))));
    assert_eq!(rec.total_calls(), 0);
}

#[rocket::async_test]
async fn contact_save_is_idempotent_and_drops_blank_links() {
    let (ctx, _rec) = setup();
    let mut social = BTreeMap::new();
    social.insert("github".to_string(), "https://github.com/jane".to_string());
    social.insert("twitter".to_string(), "  ".to_string());
    let form = ContactForm {
        email: "jane@example.com".to_string(),
        phone: Some(String::new()),
        location: Some("Lisbon".to_string()),
        social,
    };
    Contact::save(&ctx, &form).await.unwrap();
    Contact::save(&ctx, &form).await.unwrap();

    assert_eq!(ctx.backend().count("contact", &[]).await.unwrap(), 1);
    let stored = Contact::load(&ctx).await.unwrap().unwrap();
    assert_eq!(stored.phone, None);
    assert_eq!(stored.location.as_deref(), Some("Lisbon"));
    assert_eq!(stored.links(), vec![("github", "https://github.com/jane")]);
}

#[rocket::async_test]
async fn contact_rejects_bad_email_and_links() {
    let (ctx, rec) = setup();
    let mut form = ContactForm {
        email: "not-an-email".to_string(),
        ..Default::default()
    };
    let err = Contact::save(&ctx, &form).await.unwrap_err();
    assert_eq!(err.user_message(""), "Please enter a valid email address.");

    form.email = "jane@example.com".to_string();
    form.social.insert("linkedin".to_string(), "ftp://example.com".to_string());
    let err = Contact::save(&ctx, &form).await.unwrap_err();
    assert!(err.user_message("").contains("linkedin"));
    assert_eq!(rec.total_calls(), 0);
}

#[rocket::async_test]
async fn stats_replace_all_rewrites_table() {
    let (ctx, _rec) = setup();
    Stat::replace_all(&ctx, &Stat::defaults()).await.unwrap();
    assert_eq!(Stat::list(&ctx).await.unwrap().len(), 3);

    let form = StatsForm {
        stats: vec![
            StatRowForm { key: "clients".to_string(), label: "Clients".to_string(), value: 12 },
            StatRowForm { key: "projects".to_string(), label: "Projects".to_string(), value: 40 },
        ],
    };
    let stats = Stat::from_form(&form).unwrap();
    Stat::replace_all(&ctx, &stats).await.unwrap();

    let stored = Stat::list(&ctx).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].key, "clients");
    assert_eq!(stored[0].order_index, 0);
    assert_eq!(stored[1].value, 40);
}

#[rocket::async_test]
async fn failed_stats_write_keeps_previous_stats() {
    let (ctx, rec) = setup();
    Stat::replace_all(&ctx, &Stat::defaults()).await.unwrap();
    rec.fail_op("upsert", "stats");
    rec.reset_calls();

    let form = StatsForm {
        stats: vec![StatRowForm { key: "awards".to_string(), label: "Awards".to_string(), value: 3 }],
    };
    let stats = Stat::from_form(&form).unwrap();
    assert!(Stat::replace_all(&ctx, &stats).await.is_err());

    assert_eq!(rec.count_calls("delete", "stats"), 0);
    let keys: Vec<String> = Stat::list(&ctx).await.unwrap().into_iter().map(|s| s.key).collect();
    assert_eq!(keys, vec!["projects", "clients", "experience"]);
}

#[test]
fn stats_form_rejects_duplicate_keys() {
    let form = StatsForm {
        stats: vec![
            StatRowForm { key: "a".to_string(), label: "A".to_string(), value: 1 },
            StatRowForm { key: " a ".to_string(), label: "B".to_string(), value: 2 },
        ],
    };
    assert_eq!(Stat::from_form(&form).unwrap_err().field, "key");
}

#[rocket::async_test]
async fn stats_editor_offers_defaults_when_empty() {
    let html = admin::stats_editor(&Region::Ready(Vec::new()), "/admin");
    assert!(html.contains("Projects Completed"));
    assert!(html.contains("name=\"stats[2].key\" value=\"experience\""));
}

// ═══════════════════════════════════════════════════════════
// Public content loader
// ═══════════════════════════════════════════════════════════

#[rocket::async_test]
async fn failing_region_leaves_siblings_intact() {
    let (ctx, rec) = setup();
    Project::create(&ctx, &project_form("Shown")).await.unwrap();
    rec.fail("stats");
    rec.fail("skills");

    let page = content::load_page(&ctx).await;
    assert!(page.stats.is_failed());
    assert!(page.skills.is_failed());
    assert_eq!(page.projects.ready().map(|p| p.len()), Some(1));
    assert!(!page.contact.is_failed());

    // Failed stats fall back to the default cards, failed skills to nothing.
    assert!(public::stats(&page.stats).contains("Happy Clients"));
    assert_eq!(public::skills(&page.skills), "");
    assert!(public::projects(&page.projects).contains("Shown"));
}

#[rocket::async_test]
async fn public_page_placeholders() {
    let (ctx, rec) = setup();
    let page = content::load_page(&ctx).await;
    assert_eq!(public::hero_bio(&page.hero_bio), public::HERO_PLACEHOLDER);
    assert!(public::projects(&page.projects).contains(public::PROJECTS_EMPTY));
    assert!(public::skills(&page.skills).contains(public::SKILLS_EMPTY));
    assert_eq!(public::contact_details(&page.contact), "");

    rec.fail("projects");
    let page = content::load_page(&ctx).await;
    assert!(public::projects(&page.projects).contains(public::PROJECTS_ERROR));
}

#[rocket::async_test]
async fn public_page_escapes_everything_but_about() {
    let (ctx, _rec) = setup();
    AboutContent {
        hero_bio: "<b>bold</b>".to_string(),
        about_text: "<em>trusted</em>".to_string(),
    }
    .save(&ctx)
    .await
    .unwrap();
    Project::create(&ctx, &project_form("<script>x</script>")).await.unwrap();

    let page = content::load_page(&ctx).await;
    assert_eq!(public::hero_bio(&page.hero_bio), "&lt;b&gt;bold&lt;/b&gt;");
    assert_eq!(public::about_text(&page.about_text), "<em>trusted</em>");
    let projects = public::projects(&page.projects);
    assert!(projects.contains("&lt;script&gt;"));
    assert!(!projects.contains("<script>"));
}

#[test]
fn page_context_refills_form() {
    let page = content::PageContent {
        hero_bio: Region::Ready(None),
        about_text: Region::Ready(None),
        stats: Region::Failed,
        projects: Region::Ready(Vec::new()),
        skills: Region::Ready(Vec::new()),
        contact: Region::Ready(None),
    };
    let form = submission("Jo", "jo@example.com", "Hey", "short");
    let ctx = public::page_context(&page, Some(&form), Some(("error", "Please enter a valid name.")));
    assert_eq!(ctx["form"]["name"], "Jo");
    assert_eq!(ctx["form"]["message"], "short");
    assert_eq!(ctx["status_kind"], "error");

    let ctx = public::page_context(&page, None, None);
    assert_eq!(ctx["form"]["email"], "");
    assert_eq!(ctx["status_msg"], Value::Null);
}

// ═══════════════════════════════════════════════════════════
// Dashboard sections & navigation
// ═══════════════════════════════════════════════════════════

#[test]
fn section_slugs_round_trip() {
    for section in Section::ALL {
        assert_eq!(Section::from_slug(section.slug()), Some(section));
    }
    assert_eq!(Section::Projects.title(), "Projects Management");
    assert_eq!(Section::Overview.title(), "Dashboard Overview");
    assert_eq!(Section::from_slug("settings"), None);
    assert_eq!(Section::from_slug("Projects"), None);
}

#[test]
fn navigator_discards_superseded_tickets() {
    let nav = Navigator::new();
    let first = nav.begin("token-a", "main", Section::Projects);
    let second = nav.begin("token-a", "main", Section::Skills);

    assert!(!nav.is_current(&first));
    assert!(nav.is_current(&second));
    assert_eq!(nav.current("token-a", "main"), Some(Section::Skills));
    assert!(second.generation > first.generation);

    // Other sessions are independent.
    let other = nav.begin("token-b", "main", Section::About);
    assert!(nav.is_current(&other));
    assert!(nav.is_current(&second));

    nav.forget("token-a");
    assert!(!nav.is_current(&second));
    assert_eq!(nav.current("token-a", "main"), None);

    assert_eq!(nav.prune(Duration::ZERO), 1);
    assert_eq!(nav.current("token-b", "main"), None);
}

#[test]
fn navigator_views_of_one_session_are_independent() {
    let nav = Navigator::new();
    let tab_a = nav.begin("token", "tab-a", Section::Projects);
    let tab_b = nav.begin("token", "tab-b", Section::Skills);
    assert!(nav.is_current(&tab_a));
    assert!(nav.is_current(&tab_b));

    let tab_a_again = nav.begin("token", "tab-a", Section::About);
    assert!(!nav.is_current(&tab_a));
    assert!(nav.is_current(&tab_a_again));
    assert!(nav.is_current(&tab_b));
    assert_eq!(nav.current("token", "tab-a"), Some(Section::About));
    assert_eq!(nav.current("token", "tab-b"), Some(Section::Skills));

    nav.forget("token");
    assert!(!nav.is_current(&tab_a_again));
    assert!(!nav.is_current(&tab_b));
    assert_eq!(nav.prune(Duration::ZERO), 0);
}

#[test]
fn navigator_caps_views_per_session() {
    let nav = Navigator::new();
    let first = nav.begin("token", "view-0", Section::Overview);
    let tickets: Vec<_> = (1..=16)
        .map(|i| {
            thread::sleep(Duration::from_millis(1));
            nav.begin("token", &format!("view-{}", i), Section::Projects)
        })
        .collect();
    let last = &tickets[15];
    assert!(!nav.is_current(&first));
    assert!(nav.is_current(last));
    assert!(nav.is_current(&tickets[0]));
    assert_eq!(nav.prune(Duration::ZERO), 16);
}

#[rocket::async_test]
async fn overview_counts_survive_a_failing_count() {
    let (ctx, rec) = setup();
    Project::create(&ctx, &project_form("One")).await.unwrap();
    Message::submit(&ctx, &valid_submission()).await.unwrap();
    rec.fail("skills");

    let counts = manager::overview_counts(&ctx).await;
    assert_eq!(counts.projects, 1);
    assert_eq!(counts.skills, 0);
    assert_eq!(counts.messages, 1);
    assert_eq!(counts.unread, 1);
}

#[rocket::async_test]
async fn every_section_renders() {
    let (ctx, _rec) = setup();
    Message::submit(&ctx, &valid_submission()).await.unwrap();
    for section in Section::ALL {
        let view = manager::load_section(&ctx, section, "/admin").await;
        assert_eq!(view.title, section.title());
        assert!(!view.failed, "{} failed", section);
        assert!(!view.html.is_empty());
    }
    let inbox = manager::load_section(&ctx, Section::Messages, "/admin").await;
    assert!(inbox.html.contains("Mark as Read"));
    assert!(inbox.html.contains("message-card unread"));
}

// ═══════════════════════════════════════════════════════════
// Auth
// ═══════════════════════════════════════════════════════════

fn seed_user(rec: &Recorder) {
    let hash = bcrypt::hash("correct horse", 4).unwrap();
    assert!(db::seed_admin(&rec.inner.pool, "Admin@Example.com", &hash).unwrap());
    assert!(!db::seed_admin(&rec.inner.pool, "other@example.com", &hash).unwrap());
}

#[rocket::async_test]
async fn sign_in_and_out() {
    let (ctx, rec) = setup();
    seed_user(&rec);

    let session = ctx.backend().sign_in("admin@example.com", "correct horse").await.unwrap();
    assert_eq!(session.user.email, "admin@example.com");
    assert!(session.expires_at.unwrap() > Utc::now());

    let found = ctx.backend().get_session(&session.access_token).await.unwrap();
    assert_eq!(found.map(|s| s.user), Some(session.user.clone()));

    ctx.backend().sign_out(&session.access_token).await.unwrap();
    assert!(ctx.backend().get_session(&session.access_token).await.unwrap().is_none());
}

#[rocket::async_test]
async fn sign_in_rejects_bad_credentials() {
    let (ctx, rec) = setup();
    seed_user(&rec);
    assert!(matches!(
        ctx.backend().sign_in("admin@example.com", "wrong").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        ctx.backend().sign_in("nobody@example.com", "correct horse").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(ctx.backend().get_session("made-up-token").await.unwrap().is_none());
}

#[rocket::async_test]
async fn expired_sessions_are_rejected_and_purged() {
    let (ctx, rec) = setup();
    seed_user(&rec);
    let stale = ctx.backend().sign_in("admin@example.com", "correct horse").await.unwrap();
    let live = ctx.backend().sign_in("admin@example.com", "correct horse").await.unwrap();
    {
        let conn = rec.inner.pool.get().unwrap();
        conn.execute(
            "UPDATE auth_sessions SET expires_at = ?1 WHERE token_hash = ?2",
            rusqlite::params![Utc::now().timestamp() - 60, hash_key(&stale.access_token)],
        )
        .unwrap();
    }
    assert_eq!(ctx.backend().purge_expired_sessions().await.unwrap(), 1);
    assert!(ctx.backend().get_session(&stale.access_token).await.unwrap().is_none());
    assert!(ctx.backend().get_session(&live.access_token).await.unwrap().is_some());
}

#[test]
fn login_throttle_limits_per_ip() {
    let throttle = LoginThrottle::new(3, LOGIN_WINDOW);
    assert!(throttle.check_and_record("10.0.0.1"));
    assert!(throttle.check_and_record("10.0.0.1"));
    assert_eq!(throttle.remaining("10.0.0.1"), 1);
    assert!(throttle.check_and_record("10.0.0.1"));
    assert!(!throttle.check_and_record("10.0.0.1"));
    assert!(throttle.check_and_record("10.0.0.2"));

    throttle.reset("10.0.0.1");
    assert_eq!(throttle.remaining("10.0.0.1"), 3);
    assert_eq!(throttle.cleanup(), 0);

    let short = LoginThrottle::new(1, Duration::ZERO);
    assert!(short.check_and_record("10.0.0.3"));
    assert_eq!(short.cleanup(), 1);
}

// ═══════════════════════════════════════════════════════════
// Backend plumbing & configuration
// ═══════════════════════════════════════════════════════════

#[rocket::async_test]
async fn sqlite_filters_and_limits() {
    let (ctx, _rec) = setup();
    for (key, value) in [("a", 1), ("b", 2), ("", 3)] {
        let mut row = Row::new();
        row.insert("key".to_string(), Value::from(key));
        row.insert("value".to_string(), Value::from(value));
        ctx.backend().insert("stats", &[row]).await.unwrap();
    }
    let b = ctx.backend().select("stats", &Query::all().eq("key", "b")).await.unwrap();
    assert_eq!(b.len(), 1);
    assert_eq!(b[0]["value"], 2);

    let n = ctx.backend().count("stats", &[Filter::neq("key", "")]).await.unwrap();
    assert_eq!(n, 2);

    let top = ctx
        .backend()
        .select("stats", &Query::all().order_by("value", false).limit(1))
        .await
        .unwrap();
    assert_eq!(top[0]["value"], 3);

    assert!(matches!(
        ctx.backend().select("stats; DROP TABLE stats", &Query::all()).await,
        Err(BackendError::InvalidIdentifier(_))
    ));
    assert!(matches!(
        ctx.backend().select("stats", &Query::all().eq("key')--", 1)).await,
        Err(BackendError::InvalidIdentifier(_))
    ));
}

/// Local stand-in for the hosted API: answers one request with `response`
/// and hands back that request, lowercased.
fn one_shot_server(response: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_lowercase();
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        stream.write_all(response.as_bytes()).unwrap();
        String::from_utf8_lossy(&buf).to_lowercase()
    });
    (base, handle)
}

const NO_CONTENT: &str = "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n";
const COUNT_TWO: &str =
    "HTTP/1.1 200 OK\r\nContent-Range: 0-1/2\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

fn rest_backend(base: &str) -> RestBackend {
    let client = Client::builder().no_proxy().build().unwrap();
    RestBackend::with_client(base, "anon-key", client).unwrap()
}

fn authorization(request: &str) -> &str {
    request
        .lines()
        .find(|l| l.starts_with("authorization:"))
        .unwrap_or("")
}

#[rocket::async_test]
async fn admin_calls_carry_the_user_token() {
    let (base, server) = one_shot_server(NO_CONTENT);
    let ctx = AppContext::new(Arc::new(rest_backend(&base)), Tables::default());
    Message::mark_read(&ctx.as_user("user-jwt"), 5).await.unwrap();
    let request = server.join().unwrap();
    assert!(request.starts_with("patch /rest/v1/messages?id=eq.5 "), "{}", request);
    assert_eq!(authorization(&request), "authorization: bearer user-jwt");
    assert!(request.contains("apikey: anon-key"));

    // Public calls stay on the anon key.
    let (base, server) = one_shot_server(COUNT_TWO);
    let ctx = AppContext::new(Arc::new(rest_backend(&base)), Tables::default());
    assert_eq!(Message::unread_count(&ctx).await.unwrap(), 2);
    let request = server.join().unwrap();
    assert_eq!(authorization(&request), "authorization: bearer anon-key");
}

#[rocket::async_test]
async fn sqlite_context_is_shared_for_users() {
    let (ctx, rec) = setup();
    Message::submit(&ctx, &valid_submission()).await.unwrap();
    let as_admin = ctx.as_user("any-token");
    assert!(Arc::ptr_eq(&ctx.backend, &as_admin.backend));
    assert_eq!(Message::count(&as_admin).await.unwrap(), 1);
    assert_eq!(rec.count_calls("count", "messages"), 1);
}

#[rocket::async_test]
async fn rest_upsert_and_count_headers() {
    let (base, server) = one_shot_server(NO_CONTENT);
    let backend = rest_backend(&base);
    let row = encode(&Stat {
        key: "clients".to_string(),
        label: "Happy Clients".to_string(),
        value: 12,
        order_index: 0,
    });
    backend.upsert("stats", &[row], "key").await.unwrap();
    let request = server.join().unwrap();
    assert!(request.starts_with("post /rest/v1/stats?on_conflict=key "), "{}", request);
    assert!(request.contains("prefer: resolution=merge-duplicates,return=minimal"));
    assert!(request.contains("\"key\":\"clients\""));

    let (base, server) = one_shot_server(COUNT_TWO);
    let backend = rest_backend(&base);
    let total = backend.count("skills", &[Filter::eq("category", "Backend")]).await.unwrap();
    assert_eq!(total, 2);
    let request = server.join().unwrap();
    assert!(
        request.starts_with("head /rest/v1/skills?select=*&category=eq.backend "),
        "{}",
        request
    );
    assert!(request.contains("prefer: count=exact"));
}

#[test]
fn rest_filter_params() {
    let param = |f: Filter| filter_param(&f).unwrap();
    assert_eq!(param(Filter::eq("id", 5)), ("id".to_string(), "eq.5".to_string()));
    assert_eq!(param(Filter::eq("is_read", false)).1, "eq.false");
    assert_eq!(param(Filter::eq("name", "Jane Doe")).1, "eq.Jane Doe");
    assert_eq!(param(Filter::neq("key", "")).1, "neq.");
    assert_eq!(param(Filter::eq("image_url", Value::Null)).1, "is.null");
    assert_eq!(param(Filter::neq("image_url", Value::Null)).1, "not.is.null");
    assert!(matches!(
        filter_param(&Filter::eq("id; drop", 1)),
        Err(BackendError::InvalidIdentifier(_))
    ));

    let mut url = url::Url::parse("http://localhost/rest/v1/messages").unwrap();
    apply_filters(&mut url, &[Filter::eq("name", "Jane Doe"), Filter::eq("is_read", true)]).unwrap();
    assert_eq!(url.query(), Some("name=eq.Jane+Doe&is_read=eq.true"));
}

#[test]
fn rest_select_url_shape() {
    let backend = RestBackend::new("http://localhost:54321/base", "anon-key").unwrap();
    let query = Query::all()
        .eq("is_published", true)
        .order_by("order_index", true)
        .limit(5);
    let url = backend.select_url("projects", &query).unwrap();
    assert_eq!(url.path(), "/base/rest/v1/projects");
    assert_eq!(
        url.query(),
        Some("select=*&is_published=eq.true&order=order_index.asc&limit=5")
    );

    let newest = backend
        .select_url("messages", &Query::all().order_by("created_at", false))
        .unwrap();
    assert_eq!(newest.query(), Some("select=*&order=created_at.desc"));
    assert!(backend.select_url("bad table", &Query::all()).is_err());
}

#[test]
fn content_range_totals() {
    assert_eq!(parse_content_range("0-24/3573"), Some(3573));
    assert_eq!(parse_content_range("*/0"), Some(0));
    assert_eq!(parse_content_range("0-9/*"), None);
}

#[test]
fn table_configuration_is_checked() {
    assert!(Tables::default().validate().is_ok());
    let mut tables = Tables::default();
    tables.skills = "projects".to_string();
    assert!(tables.validate().is_err());
    tables.skills = "my skills".to_string();
    assert!(tables.validate().is_err());
    assert!(Tables::default().contains("messages"));
    assert!(!Tables::default().contains("auth_users"));
    assert!(is_identifier("_portfolio_2"));
    assert!(!is_identifier("2fast"));
}

#[test]
fn config_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.backend, BackendKind::Sqlite);
    assert_eq!(config.admin_slug, "admin");
    assert_eq!(config.session_expiry_hours, 24);
    assert_eq!(config.login_rate_limit, 5);
}

#[test]
fn export_file_name() {
    let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
    assert_eq!(export_filename("projects", day), "projects_export_2026-10-16.json");
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

#[test]
fn html_escape_covers_markup() {
    assert_eq!(
        render::html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
        "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
    );
    assert_eq!(render::html_escape("plain"), "plain");
}

#[test]
fn date_formatting() {
    let dt = Utc.with_ymd_and_hms(2026, 3, 5, 9, 7, 0).unwrap();
    assert_eq!(render::format_date(&dt), "March 5, 2026");
    assert_eq!(render::format_datetime(&dt), "Mar 5, 2026, 09:07");
}

#[test]
fn truncation_counts_chars() {
    assert_eq!(render::truncate_chars("héllo wörld", 5), "héllo…");
    assert_eq!(render::truncate_chars("short", 10), "short");
}

#[test]
fn email_shape() {
    assert!(validate::is_valid_email("a@b.co"));
    assert!(validate::is_valid_email("first.last+tag@sub.example.org"));
    assert!(!validate::is_valid_email("a@b"));
    assert!(!validate::is_valid_email("a b@c.de"));
    assert!(!validate::is_valid_email("@c.de"));
    assert!(!validate::is_valid_email("a@@c.de"));
}

#[test]
fn notices_only_use_known_kinds() {
    assert!(render::notice("success", "ok").contains("notice-success"));
    assert!(render::notice("bogus", "<x>").contains("notice-info"));
    assert!(render::notice("error", "<x>").contains("&lt;x&gt;"));
}

#[test]
fn confirm_page_escapes_names() {
    let html = admin::confirm_delete("project", "<b>x</b>", "/admin/projects/1/delete", "/admin/projects");
    assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
    assert!(html.contains("action=\"/admin/projects/1/delete\""));
}
