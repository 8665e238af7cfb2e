//! Dashboard section bodies. Each returns the HTML placed in the content
//! area of `admin/dashboard.html.tera`.

use crate::content::Region;
use crate::models::about::AboutContent;
use crate::models::contact::{Contact, SOCIAL_PLATFORMS};
use crate::models::message::Message;
use crate::models::project::Project;
use crate::models::skill::Skill;
use crate::models::stat::Stat;
use crate::render::{format_datetime, html_escape, notice, truncate_chars};

pub const PROJECTS_EMPTY: &str = "No projects yet. Add your first project!";
pub const SKILLS_EMPTY: &str = "No skills yet. Add your first skill!";
pub const MESSAGES_EMPTY: &str = "No messages yet";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverviewCounts {
    pub projects: i64,
    pub skills: i64,
    pub messages: i64,
    pub unread: i64,
}

fn card(title: &str, action: &str, body: &str) -> String {
    format!(
        "<div class=\"section-card\"><div class=\"section-card-header\"><h2 class=\"section-card-title\">{}</h2>{}</div>{}</div>",
        html_escape(title),
        action,
        body
    )
}

fn empty_state(text: &str) -> String {
    format!("<div class=\"empty-state\"><p>{}</p></div>", html_escape(text))
}

fn error_state(text: &str) -> String {
    format!("<div class=\"error-state\"><p>{}</p></div>", html_escape(text))
}

fn form_error(error: Option<&str>) -> String {
    error.map(|e| notice("error", e)).unwrap_or_default()
}

fn opt(value: Option<&str>) -> String {
    html_escape(value.unwrap_or(""))
}

// ── Overview ───────────────────────────────────────────

pub fn overview(counts: &OverviewCounts, recent: &Region<Vec<Message>>, base: &str) -> String {
    let stat = |label: &str, icon: &str, value: i64| {
        format!(
            "<div class=\"stats-card\"><div class=\"stats-card-header\"><span class=\"stats-card-title\">{}</span><span class=\"stats-card-icon\">{}</span></div><div class=\"stats-card-value\">{}</div></div>",
            label, icon, value
        )
    };
    let grid = format!(
        "<div class=\"stats-grid\">{}{}{}{}</div>",
        stat("Total Projects", "💼", counts.projects),
        stat("Total Skills", "⚡", counts.skills),
        stat("Total Messages", "💬", counts.messages),
        stat("Unread Messages", "📧", counts.unread),
    );
    let actions = format!(
        "<div class=\"quick-actions\"><a class=\"btn btn-primary\" href=\"{0}/projects/new\">Add New Project</a><a class=\"btn btn-primary\" href=\"{0}/skills/new\">Add New Skill</a><a class=\"btn btn-secondary\" href=\"{0}/messages\">View Messages</a><a class=\"btn btn-secondary\" href=\"/\" target=\"_blank\">View Live Site</a></div>",
        base
    );
    let recent_html = match recent {
        Region::Failed => error_state("Error loading messages"),
        Region::Ready(list) if list.is_empty() => empty_state(MESSAGES_EMPTY),
        Region::Ready(list) => list
            .iter()
            .map(|m| message_card(m, base, false))
            .collect(),
    };
    format!(
        "{}{}{}",
        grid,
        card("Quick Actions", "", &actions),
        card("Recent Messages", "", &recent_html)
    )
}

// ── About + stats ──────────────────────────────────────

pub fn about_editor(
    about: &Region<Option<AboutContent>>,
    stats: &Region<Vec<Stat>>,
    base: &str,
    error: Option<&str>,
) -> String {
    let about_html = match about {
        Region::Failed => error_state("Error loading about editor"),
        Region::Ready(current) => {
            let current = current.clone().unwrap_or_default();
            about_form(&current, base, error)
        }
    };
    format!(
        "{}{}",
        card("Edit About Section", "", &about_html),
        card("Edit Stats", "", &stats_editor(stats, base))
    )
}

pub fn about_form(about: &AboutContent, base: &str, error: Option<&str>) -> String {
    format!(
        "{}<form method=\"post\" action=\"{}/about\" class=\"admin-form\">\
<div class=\"form-group\"><label for=\"hero_bio\">Hero Bio</label><textarea id=\"hero_bio\" name=\"hero_bio\" rows=\"3\" required>{}</textarea></div>\
<div class=\"form-group\"><label for=\"about_text\">About Text (HTML allowed)</label><textarea id=\"about_text\" name=\"about_text\" rows=\"8\">{}</textarea></div>\
<div class=\"form-actions\"><button type=\"submit\" class=\"btn btn-primary\">SAVE CHANGES</button></div></form>",
        form_error(error),
        base,
        html_escape(&about.hero_bio),
        html_escape(&about.about_text)
    )
}

/// Stats rows; an empty table offers the default three.
pub fn stats_editor(stats: &Region<Vec<Stat>>, base: &str) -> String {
    let rows = match stats {
        Region::Failed => return error_state("Error loading stats"),
        Region::Ready(list) if list.is_empty() => Stat::defaults(),
        Region::Ready(list) => list.clone(),
    };
    let fields: String = rows
        .iter()
        .enumerate()
        .map(|(i, stat)| {
            format!(
                "<div class=\"form-row\">\
<div class=\"form-group\"><label>Label</label><input type=\"text\" name=\"stats[{i}].label\" value=\"{label}\" required></div>\
<div class=\"form-group\"><label>Value</label><input type=\"number\" name=\"stats[{i}].value\" value=\"{value}\" required></div>\
<input type=\"hidden\" name=\"stats[{i}].key\" value=\"{key}\"></div>",
                i = i,
                label = html_escape(&stat.label),
                value = stat.value,
                key = html_escape(&stat.key),
            )
        })
        .collect();
    format!(
        "<form method=\"post\" action=\"{}/stats\" class=\"admin-form\">{}<div class=\"form-actions\"><button type=\"submit\" class=\"btn btn-primary\">SAVE STATS</button></div></form>",
        base, fields
    )
}

// ── Projects ───────────────────────────────────────────

pub fn projects_list(projects: &Region<Vec<Project>>, base: &str) -> String {
    let body = match projects {
        Region::Failed => error_state("Error loading projects"),
        Region::Ready(list) if list.is_empty() => empty_state(PROJECTS_EMPTY),
        Region::Ready(list) => {
            let rows: String = list
                .iter()
                .map(|p| {
                    let id = p.id.unwrap_or_default();
                    format!(
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"table-actions\"><a class=\"action-btn action-btn-edit\" href=\"{base}/projects/{id}/edit\">Edit</a><a class=\"action-btn action-btn-delete\" href=\"{base}/projects/{id}/delete\">Delete</a></td></tr>",
                        p.order_index,
                        html_escape(&p.title),
                        if p.is_published { "✅ Published" } else { "❌ Draft" },
                        base = base,
                        id = id,
                    )
                })
                .collect();
            format!(
                "<table class=\"data-table\"><thead><tr><th>#</th><th>Title</th><th>Status</th><th>Actions</th></tr></thead><tbody>{}</tbody></table>",
                rows
            )
        }
    };
    card(
        "Projects",
        &format!(
            "<a class=\"btn btn-primary\" href=\"{}/projects/new\">ADD NEW PROJECT</a>",
            base
        ),
        &body,
    )
}

/// Create/edit form. `action` is the POST target; `show_order` adds the
/// order field, which only makes sense once the project exists.
pub fn project_form(
    project: &Project,
    heading: &str,
    action: &str,
    show_order: bool,
    base: &str,
    error: Option<&str>,
) -> String {
    let order = if show_order {
        format!(
            "<div class=\"form-group\"><label for=\"order_index\">Order</label><input type=\"number\" id=\"order_index\" name=\"order_index\" value=\"{}\"></div>",
            project.order_index
        )
    } else {
        String::new()
    };
    let body = format!(
        "{}<form method=\"post\" action=\"{}\" class=\"admin-form\">\
<div class=\"form-group\"><label for=\"title\">Title</label><input type=\"text\" id=\"title\" name=\"title\" value=\"{}\" required></div>\
<div class=\"form-group\"><label for=\"description\">Description</label><textarea id=\"description\" name=\"description\" rows=\"5\" required>{}</textarea></div>\
<div class=\"form-group\"><label for=\"image_url\">Image URL</label><input type=\"url\" id=\"image_url\" name=\"image_url\" value=\"{}\"></div>\
<div class=\"form-group\"><label for=\"project_url\">Project URL</label><input type=\"url\" id=\"project_url\" name=\"project_url\" value=\"{}\"></div>\
{}\
<div class=\"form-group form-check\"><label><input type=\"checkbox\" name=\"is_published\" value=\"true\"{}> Published</label></div>\
<div class=\"form-actions\"><a class=\"btn btn-secondary\" href=\"{}/projects\">Cancel</a><button type=\"submit\" class=\"btn btn-primary\">SAVE PROJECT</button></div></form>",
        form_error(error),
        action,
        html_escape(&project.title),
        html_escape(&project.description),
        opt(project.image_url.as_deref()),
        opt(project.project_url.as_deref()),
        order,
        if project.is_published { " checked" } else { "" },
        base,
    );
    card(heading, "", &body)
}

// ── Skills ─────────────────────────────────────────────

pub fn skills_list(skills: &Region<Vec<Skill>>, base: &str) -> String {
    let body = match skills {
        Region::Failed => error_state("Error loading skills"),
        Region::Ready(list) if list.is_empty() => empty_state(SKILLS_EMPTY),
        Region::Ready(list) => {
            let rows: String = list
                .iter()
                .map(|s| {
                    let id = s.id.unwrap_or_default();
                    format!(
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"table-actions\"><a class=\"action-btn action-btn-edit\" href=\"{base}/skills/{id}/edit\">Edit</a><a class=\"action-btn action-btn-delete\" href=\"{base}/skills/{id}/delete\">Delete</a></td></tr>",
                        s.order_index,
                        html_escape(&s.name),
                        html_escape(s.category.as_deref().unwrap_or("N/A")),
                        s.level.map(|l| format!("{}%", l)).unwrap_or_else(|| "N/A".to_string()),
                        base = base,
                        id = id,
                    )
                })
                .collect();
            format!(
                "<table class=\"data-table\"><thead><tr><th>#</th><th>Name</th><th>Category</th><th>Level</th><th>Actions</th></tr></thead><tbody>{}</tbody></table>",
                rows
            )
        }
    };
    card(
        "Skills",
        &format!(
            "<a class=\"btn btn-primary\" href=\"{}/skills/new\">ADD NEW SKILL</a>",
            base
        ),
        &body,
    )
}

pub fn skill_form(
    skill: &Skill,
    heading: &str,
    action: &str,
    show_order: bool,
    base: &str,
    error: Option<&str>,
) -> String {
    let order = if show_order {
        format!(
            "<div class=\"form-group\"><label for=\"order_index\">Order</label><input type=\"number\" id=\"order_index\" name=\"order_index\" value=\"{}\"></div>",
            skill.order_index
        )
    } else {
        String::new()
    };
    let level = skill.level.map(|l| l.to_string()).unwrap_or_default();
    let body = format!(
        "{}<form method=\"post\" action=\"{}\" class=\"admin-form\">\
<div class=\"form-group\"><label for=\"name\">Name</label><input type=\"text\" id=\"name\" name=\"name\" value=\"{}\" required></div>\
<div class=\"form-group\"><label for=\"category\">Category</label><input type=\"text\" id=\"category\" name=\"category\" value=\"{}\"></div>\
<div class=\"form-group\"><label for=\"level\">Level (0-100)</label><input type=\"number\" id=\"level\" name=\"level\" min=\"0\" max=\"100\" value=\"{}\"></div>\
{}\
<div class=\"form-actions\"><a class=\"btn btn-secondary\" href=\"{}/skills\">Cancel</a><button type=\"submit\" class=\"btn btn-primary\">SAVE SKILL</button></div></form>",
        form_error(error),
        action,
        html_escape(&skill.name),
        opt(skill.category.as_deref()),
        level,
        order,
        base,
    );
    card(heading, "", &body)
}

// ── Contact ────────────────────────────────────────────

pub fn contact_editor(contact: &Region<Option<Contact>>, base: &str, error: Option<&str>) -> String {
    match contact {
        Region::Failed => error_state("Error loading contact editor"),
        Region::Ready(current) => {
            let current = current.clone().unwrap_or_default();
            card("Edit Contact Information", "", &contact_form(&current, base, error))
        }
    }
}

pub fn contact_form(contact: &Contact, base: &str, error: Option<&str>) -> String {
    let socials: String = SOCIAL_PLATFORMS
        .iter()
        .map(|platform| {
            let url = contact
                .social_links
                .as_ref()
                .and_then(|links| links.get(*platform))
                .map(String::as_str);
            format!(
                "<div class=\"form-group\"><label for=\"social-{p}\">{p}</label><input type=\"url\" id=\"social-{p}\" name=\"social[{p}]\" value=\"{v}\"></div>",
                p = platform,
                v = opt(url),
            )
        })
        .collect();
    format!(
        "{}<form method=\"post\" action=\"{}/contact\" class=\"admin-form\">\
<div class=\"form-row\"><div class=\"form-group\"><label for=\"email\">Email</label><input type=\"email\" id=\"email\" name=\"email\" value=\"{}\" required></div>\
<div class=\"form-group\"><label for=\"phone\">Phone</label><input type=\"tel\" id=\"phone\" name=\"phone\" value=\"{}\"></div></div>\
<div class=\"form-group\"><label for=\"location\">Location</label><input type=\"text\" id=\"location\" name=\"location\" value=\"{}\"></div>\
<fieldset class=\"social-fields\"><legend>Social Links</legend>{}</fieldset>\
<div class=\"form-actions\"><button type=\"submit\" class=\"btn btn-primary\">SAVE CHANGES</button></div></form>",
        form_error(error),
        base,
        html_escape(&contact.email),
        opt(contact.phone.as_deref()),
        opt(contact.location.as_deref()),
        socials
    )
}

// ── Messages ───────────────────────────────────────────

fn message_card(msg: &Message, base: &str, with_actions: bool) -> String {
    let id = msg.id.unwrap_or_default();
    let body = if with_actions {
        html_escape(&msg.message)
    } else {
        html_escape(&truncate_chars(&msg.message, 100))
    };
    let actions = if with_actions {
        let mark = if msg.is_read {
            String::new()
        } else {
            format!(
                "<form method=\"post\" action=\"{}/messages/{}/read\"><button type=\"submit\" class=\"btn btn-primary\">Mark as Read</button></form>",
                base, id
            )
        };
        format!(
            "<div class=\"message-actions\">{}<a class=\"btn btn-secondary\" href=\"{}/messages/{}/delete\">Delete</a></div>",
            mark, base, id
        )
    } else {
        String::new()
    };
    format!(
        "<div class=\"message-card{}\"><div class=\"message-header\"><span class=\"message-from\">{} ({})</span><span class=\"message-date\">{}</span></div><div class=\"message-subject\">{}</div><div class=\"message-body\">{}</div>{}</div>",
        if msg.is_read { "" } else { " unread" },
        html_escape(&msg.name),
        html_escape(&msg.email),
        format_datetime(&msg.created_at),
        html_escape(&msg.subject),
        body,
        actions
    )
}

pub fn messages_list(messages: &Region<Vec<Message>>, base: &str) -> String {
    let body = match messages {
        Region::Failed => error_state("Error loading messages"),
        Region::Ready(list) if list.is_empty() => empty_state(MESSAGES_EMPTY),
        Region::Ready(list) => list.iter().map(|m| message_card(m, base, true)).collect(),
    };
    card("Messages Inbox", "", &body)
}

// ── Shared ─────────────────────────────────────────────

/// Confirmation step for deletes. The GET renders this, the POST deletes.
pub fn confirm_delete(what: &str, name: &str, action: &str, cancel: &str) -> String {
    let body = format!(
        "<p>Are you sure you want to delete the {} \"{}\"? This action cannot be undone.</p>\
<form method=\"post\" action=\"{}\" class=\"form-actions\"><a class=\"btn btn-secondary\" href=\"{}\">Cancel</a><button type=\"submit\" class=\"btn btn-danger\">Delete</button></form>",
        html_escape(what),
        html_escape(name),
        action,
        cancel
    );
    card(&format!("Delete {}", what), "", &body)
}
