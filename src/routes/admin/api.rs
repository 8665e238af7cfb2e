use std::io::Cursor;
use std::sync::Arc;

use rocket::http::{ContentType, Header, Status};
use rocket::response::status::Custom;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{Request, Response, State};
use serde_json::{json, Value};

use super::admin_base;
use crate::auth::AdminUser;
use crate::backend::Query;
use crate::context::{AdminSlug, AppContext};
use crate::manager::{self, Navigator, Section};

// ── Section fragments ──────────────────────────────────

/// View id used when the caller does not send one.
pub const DEFAULT_VIEW: &str = "main";

/// Section body for in-page navigation. `view` identifies the client view
/// (one per browser tab) doing the navigating. A response for a navigation
/// that view has since superseded comes back as 409 and must be ignored.
#[get("/api/section/<section>?<view>")]
pub async fn section_fragment(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    nav: &State<Arc<Navigator>>,
    section: Section,
    view: Option<&str>,
) -> Result<Json<Value>, Custom<Json<Value>>> {
    let view_id = view
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_VIEW);
    let ctx = ctx.as_user(admin.token());
    let ticket = nav.begin(admin.token(), view_id, section);
    let loaded = manager::load_section(&ctx, section, &admin_base(slug)).await;

    if !nav.is_current(&ticket) {
        let latest = nav.current(admin.token(), view_id).unwrap_or(section);
        return Err(Custom(
            Status::Conflict,
            Json(json!({ "stale": true, "current": latest.slug() })),
        ));
    }

    Ok(Json(json!({
        "section": section.slug(),
        "title": loaded.title,
        "generation": ticket.generation,
        "html": loaded.html,
        "failed": loaded.failed,
    })))
}

#[get("/api/unread")]
pub async fn unread(admin: AdminUser, ctx: &State<AppContext>) -> Json<Value> {
    let ctx = ctx.as_user(admin.token());
    Json(json!({ "unread": manager::unread_badge(&ctx).await }))
}

// ── Export ─────────────────────────────────────────────

/// JSON body served as a file download.
pub struct JsonDownload {
    pub filename: String,
    pub body: String,
}

impl<'r> Responder<'r, 'static> for JsonDownload {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(ContentType::JSON)
            .header(Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.filename),
            ))
            .sized_body(self.body.len(), Cursor::new(self.body))
            .ok()
    }
}

pub fn export_filename(table: &str, today: chrono::NaiveDate) -> String {
    format!("{}_export_{}.json", table, today.format("%Y-%m-%d"))
}

/// Every row of one content table. Only the configured tables are exported.
#[get("/api/export/<table>")]
pub async fn export(
    admin: AdminUser,
    ctx: &State<AppContext>,
    table: &str,
) -> Result<Option<JsonDownload>, Custom<Json<Value>>> {
    let ctx = ctx.as_user(admin.token());
    if !ctx.tables.contains(table) {
        return Ok(None);
    }
    let failed = || {
        Custom(
            Status::InternalServerError,
            Json(json!({ "error": "Failed to export data" })),
        )
    };
    let rows = ctx.backend().select(table, &Query::all()).await.map_err(|e| {
        log::error!("Error exporting {}: {}", table, e);
        failed()
    })?;
    let body = serde_json::to_string_pretty(&rows).map_err(|e| {
        log::error!("Error encoding {} export: {}", table, e);
        failed()
    })?;
    log::info!("Exported {} rows from {}", rows.len(), table);
    Ok(Some(JsonDownload {
        filename: export_filename(table, chrono::Utc::now().date_naive()),
        body,
    }))
}
