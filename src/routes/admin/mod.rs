use rocket::request::FlashMessage;
use rocket_dyn_templates::Template;
use serde_json::{json, Value};

use crate::auth::AdminUser;
use crate::context::AdminSlug;
use crate::manager::Section;

use super::apply_flash;

pub mod api;
pub mod content;
pub mod dashboard;
pub mod messages;
pub mod projects;
pub mod skills;

/// Helper: get the admin base path from managed state
pub(crate) fn admin_base(slug: &AdminSlug) -> String {
    slug.base()
}

/// Everything `admin/dashboard.html.tera` needs around a section body.
pub(crate) struct Page<'a> {
    pub slug: &'a AdminSlug,
    pub admin: &'a AdminUser,
    pub active: Section,
    pub title: &'a str,
    pub body: String,
    pub unread: i64,
}

impl Page<'_> {
    fn context(&self) -> Value {
        let sections: Vec<Value> = Section::ALL
            .iter()
            .map(|s| {
                json!({
                    "slug": s.slug(),
                    "title": s.title(),
                    "active": *s == self.active,
                })
            })
            .collect();
        json!({
            "admin_slug": self.slug.0,
            "base": admin_base(self.slug),
            "page_title": self.title,
            "section": self.active.slug(),
            "sections": sections,
            "body": self.body,
            "unread": self.unread,
            "user_email": self.admin.session.user.email,
        })
    }

    pub fn render(self, flash: &Option<FlashMessage<'_>>) -> Template {
        let mut context = self.context();
        apply_flash(&mut context, flash);
        Template::render("admin/dashboard", &context)
    }

    /// Render with an explicit notice instead of a pending flash.
    pub fn render_notice(self, kind: &str, message: &str) -> Template {
        let mut context = self.context();
        context["flash_kind"] = json!(kind);
        context["flash_msg"] = json!(message);
        Template::render("admin/dashboard", &context)
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        dashboard::dashboard,
        dashboard::section_page,
        projects::project_new,
        projects::project_create,
        projects::project_edit,
        projects::project_update,
        projects::project_delete_confirm,
        projects::project_delete,
        skills::skill_new,
        skills::skill_create,
        skills::skill_edit,
        skills::skill_update,
        skills::skill_delete_confirm,
        skills::skill_delete,
        content::about_save,
        content::stats_save,
        content::contact_save,
        messages::message_read,
        messages::message_delete_confirm,
        messages::message_delete,
        api::section_fragment,
        api::unread,
        api::export,
    ]
}
