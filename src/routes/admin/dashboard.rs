use rocket::request::FlashMessage;
use rocket::tokio;
use rocket::State;
use rocket_dyn_templates::Template;

use super::{admin_base, Page};
use crate::auth::AdminUser;
use crate::context::{AdminSlug, AppContext};
use crate::manager::{self, Section};

// ── Dashboard ──────────────────────────────────────────

#[get("/")]
pub async fn dashboard(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    show(admin, ctx, slug, Section::Overview, flash).await
}

#[get("/<section>")]
pub async fn section_page(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    section: Section,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    show(admin, ctx, slug, section, flash).await
}

/// Full-page navigation always renders the section that was asked for; the
/// browser itself drops a page load superseded by a newer one.
async fn show(
    admin: AdminUser,
    ctx: &AppContext,
    slug: &AdminSlug,
    section: Section,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    let ctx = ctx.as_user(admin.token());
    let base = admin_base(slug);
    let (view, unread) = tokio::join!(
        manager::load_section(&ctx, section, &base),
        manager::unread_badge(&ctx),
    );

    let page = Page {
        slug,
        admin: &admin,
        active: section,
        title: view.title,
        body: view.html,
        unread,
    };
    if view.failed && flash.is_none() {
        return page.render_notice("error", &format!("Error loading {}", section));
    }
    page.render(&flash)
}
