use rocket::form::Form;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;

use super::{admin_base, Page};
use crate::auth::AdminUser;
use crate::content::Region;
use crate::context::{AdminSlug, AppContext};
use crate::error::AppError;
use crate::manager::{self, Section};
use crate::models::about::{AboutContent, AboutForm};
use crate::models::contact::{Contact, ContactForm};
use crate::models::stat::{Stat, StatsForm};
use crate::views::admin;

fn section_url(slug: &AdminSlug, section: Section) -> String {
    format!("{}/{}", admin_base(slug), section.slug())
}

async fn editor_page(
    ctx: &AppContext,
    slug: &AdminSlug,
    admin: &AdminUser,
    section: Section,
    body: String,
) -> Template {
    let unread = manager::unread_badge(ctx).await;
    Page {
        slug,
        admin,
        active: section,
        title: section.title(),
        body,
        unread,
    }
    .render(&None)
}

// ── About ──────────────────────────────────────────────

#[post("/about", data = "<form>")]
pub async fn about_save(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    form: Form<AboutForm>,
) -> Result<Flash<Redirect>, Template> {
    let ctx = &ctx.as_user(admin.token());
    let about = AboutContent::from(&*form);
    match about.save(ctx).await {
        Ok(()) => Ok(Flash::success(
            Redirect::to(section_url(slug, Section::About)),
            "About section updated successfully!",
        )),
        Err(AppError::Validation(v)) => {
            let stats = Region::from_result("stats", Stat::list(ctx).await);
            let body = admin::about_editor(
                &Region::Ready(Some(about)),
                &stats,
                &admin_base(slug),
                Some(&v.message),
            );
            Err(editor_page(ctx, slug, &admin, Section::About, body).await)
        }
        Err(e) => {
            log::error!("Error saving about: {}", e);
            Ok(Flash::error(
                Redirect::to(section_url(slug, Section::About)),
                "Failed to save changes",
            ))
        }
    }
}

// ── Stats ──────────────────────────────────────────────

#[post("/stats", data = "<form>")]
pub async fn stats_save(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    form: Form<StatsForm>,
) -> Flash<Redirect> {
    let ctx = &ctx.as_user(admin.token());
    let to = Redirect::to(section_url(slug, Section::About));
    let stats = match Stat::from_form(&form) {
        Ok(stats) => stats,
        Err(v) => return Flash::error(to, v.message),
    };
    match Stat::replace_all(ctx, &stats).await {
        Ok(()) => Flash::success(to, "Stats updated successfully!"),
        Err(e) => {
            log::error!("Error saving stats: {}", e);
            Flash::error(to, "Failed to save stats")
        }
    }
}

// ── Contact ────────────────────────────────────────────

#[post("/contact", data = "<form>")]
pub async fn contact_save(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    form: Form<ContactForm>,
) -> Result<Flash<Redirect>, Template> {
    let ctx = &ctx.as_user(admin.token());
    match Contact::save(ctx, &form).await {
        Ok(()) => Ok(Flash::success(
            Redirect::to(section_url(slug, Section::Contact)),
            "Contact information updated successfully!",
        )),
        Err(AppError::Validation(v)) => {
            let body = admin::contact_editor(
                &Region::Ready(Some(form.to_contact())),
                &admin_base(slug),
                Some(&v.message),
            );
            Err(editor_page(ctx, slug, &admin, Section::Contact, body).await)
        }
        Err(e) => {
            log::error!("Error saving contact info: {}", e);
            Ok(Flash::error(
                Redirect::to(section_url(slug, Section::Contact)),
                "Failed to save changes",
            ))
        }
    }
}
