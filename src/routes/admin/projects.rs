use rocket::form::Form;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;

use super::{admin_base, Page};
use crate::auth::AdminUser;
use crate::context::{AdminSlug, AppContext};
use crate::error::AppError;
use crate::manager::{self, Section};
use crate::models::project::{Project, ProjectForm};
use crate::views::admin;

fn list_url(slug: &AdminSlug) -> String {
    format!("{}/projects", admin_base(slug))
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
        active: Section::Projects,
        title,
        body,
        unread,
    }
    .render(&None)
}

/// Re-show the form with the rejected input, or go back to the list when the
/// backend itself failed.
async fn save_failed(
    ctx: &AppContext,
    slug: &AdminSlug,
    admin: &AdminUser,
    form: &ProjectForm,
    id: Option<i64>,
    err: AppError,
) -> Result<Flash<Redirect>, Template> {
    match err {
        AppError::Validation(v) => {
            let base = admin_base(slug);
            let (heading, action) = match id {
                Some(id) => ("Edit Project", format!("{}/projects/{}/edit", base, id)),
                None => ("Add New Project", format!("{}/projects/new", base)),
            };
            let body = admin::project_form(
                &form.to_project(),
                heading,
                &action,
                id.is_some(),
                &base,
                Some(&v.message),
            );
            Err(form_page(ctx, slug, admin, heading, body).await)
        }
        other => {
            log::error!("Error saving project: {}", other);
            Ok(Flash::error(Redirect::to(list_url(slug)), "Failed to save project"))
        }
    }
}

// ── New ────────────────────────────────────────────────

#[get("/projects/new")]
pub async fn project_new(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
) -> Template {
    let ctx = &ctx.as_user(admin.token());
    let base = admin_base(slug);
    let body = admin::project_form(
        &Project::default(),
        "Add New Project",
        &format!("{}/projects/new", base),
        false,
        &base,
        None,
    );
    form_page(ctx, slug, &admin, "Add New Project", body).await
}

#[post("/projects/new", data = "<form>")]
pub async fn project_create(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    form: Form<ProjectForm>,
) -> Result<Flash<Redirect>, Template> {
    let ctx = &ctx.as_user(admin.token());
    match Project::create(ctx, &form).await {
        Ok(index) => {
            log::info!("Project '{}' created at position {}", form.title.trim(), index);
            Ok(Flash::success(
                Redirect::to(list_url(slug)),
                "Project created successfully!",
            ))
        }
        Err(e) => save_failed(ctx, slug, &admin, &form, None, e).await,
    }
}

// ── Edit ───────────────────────────────────────────────

#[get("/projects/<id>/edit")]
pub async fn project_edit(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Result<Option<Template>, Flash<Redirect>> {
    let ctx = &ctx.as_user(admin.token());
    let project = match Project::find(ctx, id).await {
        Ok(Some(p)) => p,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::error!("Error loading project {}: {}", id, e);
            return Err(Flash::error(Redirect::to(list_url(slug)), "Error loading projects"));
        }
    };
    let base = admin_base(slug);
    let body = admin::project_form(
        &project,
        "Edit Project",
        &format!("{}/projects/{}/edit", base, id),
        true,
        &base,
        None,
    );
    Ok(Some(form_page(ctx, slug, &admin, "Edit Project", body).await))
}

#[post("/projects/<id>/edit", data = "<form>")]
pub async fn project_update(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
    form: Form<ProjectForm>,
) -> Result<Flash<Redirect>, Template> {
    let ctx = &ctx.as_user(admin.token());
    match Project::update(ctx, id, &form).await {
        Ok(()) => Ok(Flash::success(
            Redirect::to(list_url(slug)),
            "Project updated successfully!",
        )),
        Err(e) => save_failed(ctx, slug, &admin, &form, Some(id), e).await,
    }
}

// ── Delete ─────────────────────────────────────────────

#[get("/projects/<id>/delete")]
pub async fn project_delete_confirm(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Result<Option<Template>, Flash<Redirect>> {
    let ctx = &ctx.as_user(admin.token());
    let project = match Project::find(ctx, id).await {
        Ok(Some(p)) => p,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::error!("Error loading project {}: {}", id, e);
            return Err(Flash::error(Redirect::to(list_url(slug)), "Error loading projects"));
        }
    };
    let base = admin_base(slug);
    let body = admin::confirm_delete(
        "project",
        &project.title,
        &format!("{}/projects/{}/delete", base, id),
        &list_url(slug),
    );
    Ok(Some(form_page(ctx, slug, &admin, "Delete Project", body).await))
}

#[post("/projects/<id>/delete")]
pub async fn project_delete(
    admin: AdminUser,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Flash<Redirect> {
    let ctx = &ctx.as_user(admin.token());
    match Project::delete(ctx, id).await {
        Ok(()) => Flash::success(Redirect::to(list_url(slug)), "Project deleted"),
        Err(e) => {
            log::error!("Error deleting project {}: {}", id, e);
            Flash::error(Redirect::to(list_url(slug)), "Failed to delete project")
        }
    }
}
