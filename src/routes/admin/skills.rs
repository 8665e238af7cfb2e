use rocket::form::Form;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;

use super::{admin_base, Page};
use crate::auth::AdminUser;
use crate::context::{AdminSlug, AppContext};
use crate::error::AppError;
use crate::manager::{self, Section};
use crate::models::skill::{Skill, SkillForm};
use crate::views::admin;

fn list_url(slug: &AdminSlug) -> String {
    format!("{}/skills", admin_base(slug))
}

async fn form_page(
    ctx: &AppContext,
    slug: &AdminSlug,
    admin: &AdminUser,
    title: &str,
    body: String,
) -> Template {
    let unread = manager::unread_badge(ctx).await;
    Page {
        slug,
        admin,
        active: Section::Skills,
        title,
        body,
        unread,
    }
    .render(&None)
}

async fn save_failed(
    ctx: &AppContext,
    slug: &AdminSlug,
    admin: &AdminUser,
    form: &SkillForm,
    id: Option<i64>,
    err: AppError,
) -> Result<Flash<Redirect>, Template> {
    match err {
        AppError::Validation(v) => {
            let base = admin_base(slug);
            let (heading, action) = match id {
                Some(id) => ("Edit Skill", format!("{}/skills/{}/edit", base, id)),
                None => ("Add New Skill", format!("{}/skills/new", base)),
            };
            let body = admin::skill_form(
                &form.to_skill(),
                heading,
                &action,
                id.is_some(),
                &base,
                Some(&v.message),
            );
            Err(form_page(ctx, slug, admin, heading, body).await)
        }
        other => {
            log::error!("Error saving skill: {}", other);
            Ok(Flash::error(Redirect::to(list_url(slug)), "Failed to save skill"))
        }
    }
}

async fn find_or_flash(
    ctx: &AppContext,
    slug: &AdminSlug,
    id: i64,
) -> Result<Option<Skill>, Flash<Redirect>> {
    Skill::find(ctx, id).await.map_err(|e| {
        log::error!("Error loading skill {}: {}", id, e);
        Flash::error(Redirect::to(list_url(slug)), "Error loading skills")
    })
}

#[get("/skills/new")]
pub async fn skill_new(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
) -> Template {
    let ctx = &ctx.as_user(admin.token());
    let base = admin_base(slug);
    let body = admin::skill_form(
        &Skill::default(),
        "Add New Skill",
        &format!("{}/skills/new", base),
        false,
        &base,
        None,
    );
    form_page(ctx, slug, &admin, "Add New Skill", body).await
}

#[post("/skills/new", data = "<form>")]
pub async fn skill_create(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    form: Form<SkillForm>,
) -> Result<Flash<Redirect>, Template> {
    let ctx = &ctx.as_user(admin.token());
    match Skill::create(ctx, &form).await {
        Ok(index) => {
            log::info!("Skill '{}' created at position {}", form.name.trim(), index);
            Ok(Flash::success(
                Redirect::to(list_url(slug)),
                "Skill created successfully!",
            ))
        }
        Err(e) => save_failed(ctx, slug, &admin, &form, None, e).await,
    }
}

#[get("/skills/<id>/edit")]
pub async fn skill_edit(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Result<Option<Template>, Flash<Redirect>> {
    let ctx = &ctx.as_user(admin.token());
    let Some(skill) = find_or_flash(ctx, slug, id).await? else {
        return Ok(None);
    };
    let base = admin_base(slug);
    let body = admin::skill_form(
        &skill,
        "Edit Skill",
        &format!("{}/skills/{}/edit", base, id),
        true,
        &base,
        None,
    );
    Ok(Some(form_page(ctx, slug, &admin, "Edit Skill", body).await))
}

#[post("/skills/<id>/edit", data = "<form>")]
pub async fn skill_update(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
    form: Form<SkillForm>,
) -> Result<Flash<Redirect>, Template> {
    let ctx = &ctx.as_user(admin.token());
    match Skill::update(ctx, id, &form).await {
        Ok(()) => Ok(Flash::success(
            Redirect::to(list_url(slug)),
            "Skill updated successfully!",
        )),
        Err(e) => save_failed(ctx, slug, &admin, &form, Some(id), e).await,
    }
}

#[get("/skills/<id>/delete")]
pub async fn skill_delete_confirm(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Result<Option<Template>, Flash<Redirect>> {
    let ctx = &ctx.as_user(admin.token());
    let Some(skill) = find_or_flash(ctx, slug, id).await? else {
        return Ok(None);
    };
    let body = admin::confirm_delete(
        "skill",
        &skill.name,
        &format!("{}/skills/{}/delete", admin_base(slug), id),
        &list_url(slug),
    );
    Ok(Some(form_page(ctx, slug, &admin, "Delete Skill", body).await))
}

#[post("/skills/<id>/delete")]
pub async fn skill_delete(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Flash<Redirect> {
    let ctx = &ctx.as_user(admin.token());
    match Skill::delete(ctx, id).await {
        Ok(()) => Flash::success(Redirect::to(list_url(slug)), "Skill deleted"),
        Err(e) => {
            log::error!("Error deleting skill {}: {}", id, e);
            Flash::error(Redirect::to(list_url(slug)), "Failed to delete skill")
        }
    }
}
