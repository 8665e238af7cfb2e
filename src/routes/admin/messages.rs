use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;

use super::{admin_base, Page};
use crate::auth::AdminUser;
use crate::context::{AdminSlug, AppContext};
use crate::manager::{self, Section};
use crate::models::message::Message;
use crate::views::admin;

fn inbox_url(slug: &AdminSlug) -> String {
    format!("{}/messages", admin_base(slug))
}

#[post("/messages/<id>/read")]
pub async fn message_read(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Flash<Redirect> {
    let ctx = &ctx.as_user(admin.token());
    match Message::mark_read(ctx, id).await {
        Ok(()) => Flash::success(Redirect::to(inbox_url(slug)), "Message marked as read"),
        Err(e) => {
            log::error!("Error marking message {} as read: {}", id, e);
            Flash::error(Redirect::to(inbox_url(slug)), "Failed to update message")
        }
    }
}

#[get("/messages/<id>/delete")]
pub async fn message_delete_confirm(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Result<Option<Template>, Flash<Redirect>> {
    let ctx = &ctx.as_user(admin.token());
    let message = match Message::find(ctx, id).await {
        Ok(Some(m)) => m,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::error!("Error loading message {}: {}", id, e);
            return Err(Flash::error(Redirect::to(inbox_url(slug)), "Error loading messages"));
        }
    };
    let body = admin::confirm_delete(
        "message",
        &message.subject,
        &format!("{}/messages/{}/delete", admin_base(slug), id),
        &inbox_url(slug),
    );
    let unread = manager::unread_badge(ctx).await;
    let page = Page {
        slug,
        admin: &admin,
        active: Section::Messages,
        title: "Delete Message",
        body,
        unread,
    };
    Ok(Some(page.render(&None)))
}

#[post("/messages/<id>/delete")]
pub async fn message_delete(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Flash<Redirect> {
    let ctx = &ctx.as_user(admin.token());
    match Message::delete(ctx, id).await {
        Ok(()) => Flash::success(Redirect::to(inbox_url(slug)), "Message deleted"),
        Err(e) => {
            log::error!("Error deleting message {}: {}", id, e);
            Flash::error(Redirect::to(inbox_url(slug)), "Failed to delete message")
        }
    }
}
