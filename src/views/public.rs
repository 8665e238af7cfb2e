//! HTML fragments for the public portfolio page. Each function renders one
//! region of `site/index.html.tera`.

use crate::content::{PageContent, Region};
use crate::models::contact::Contact;
use crate::models::message::ContactSubmission;
use crate::models::project::Project;
use crate::models::skill::Skill;
use crate::models::stat::Stat;
use crate::render::{html_escape, social_icon};

pub const HERO_PLACEHOLDER: &str = "Designer, developer and tinkerer.";
pub const PROJECTS_EMPTY: &str = "No projects available yet. Check back soon!";
pub const PROJECTS_ERROR: &str = "Error loading projects. Please try again later.";
pub const SKILLS_EMPTY: &str = "No skills data available.";

pub fn hero_bio(region: &Region<Option<String>>) -> String {
    match region.ready().and_then(|bio| bio.as_deref()) {
        Some(bio) => html_escape(bio),
        None => HERO_PLACEHOLDER.to_string(),
    }
}

/// About text is HTML authored in the dashboard and goes out as-is.
pub fn about_text(region: &Region<Option<String>>) -> String {
    region
        .ready()
        .and_then(|text| text.clone())
        .unwrap_or_default()
}

/// Stat cards. Until stats load (or when none exist) the default cards show
/// with zero values.
pub fn stats(region: &Region<Vec<Stat>>) -> String {
    let stats = match region.ready() {
        Some(list) if !list.is_empty() => list.clone(),
        _ => Stat::defaults(),
    };
    stats
        .iter()
        .map(|stat| {
            format!(
                "<div class=\"stat-card\" data-stat=\"{key}\"><div class=\"stat-number\" data-target=\"{value}\">{value}</div><div class=\"stat-label\">{label}</div></div>",
                key = html_escape(&stat.key),
                value = stat.value,
                label = html_escape(&stat.label),
            )
        })
        .collect()
}

pub fn project_card(project: &Project) -> String {
    let image = match project.image_url.as_deref() {
        Some(url) => format!(
            "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
            html_escape(url),
            html_escape(&project.title)
        ),
        None => "<div class=\"project-image-placeholder\">💻</div>".to_string(),
    };
    let link = project
        .project_url
        .as_deref()
        .map(|url| {
            format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"project-link\">View Project</a>",
                html_escape(url)
            )
        })
        .unwrap_or_default();
    format!(
        "<div class=\"project-card\"><div class=\"project-image\">{}</div><div class=\"project-content\"><h3 class=\"project-title\">{}</h3><p class=\"project-description\">{}</p><div class=\"project-links\">{}</div></div></div>",
        image,
        html_escape(&project.title),
        html_escape(&project.description),
        link
    )
}

pub fn projects(region: &Region<Vec<Project>>) -> String {
    match region {
        Region::Failed => placeholder("project-placeholder", PROJECTS_ERROR),
        Region::Ready(list) if list.is_empty() => placeholder("project-placeholder", PROJECTS_EMPTY),
        Region::Ready(list) => list.iter().map(project_card).collect(),
    }
}

pub fn skill_card(skill: &Skill) -> String {
    let level = skill
        .level
        .map(|l| {
            format!(
                "<div class=\"skill-level\"><span style=\"width:{}%\"></span></div>",
                l.clamp(0, 100)
            )
        })
        .unwrap_or_default();
    let category = skill
        .category
        .as_deref()
        .map(|c| format!("<div class=\"skill-category\">{}</div>", html_escape(c)))
        .unwrap_or_default();
    format!(
        "<div class=\"skill-card\"><div class=\"skill-name\">{}</div>{}{}</div>",
        html_escape(&skill.name),
        category,
        level
    )
}

/// A failed skills fetch leaves the grid empty.
pub fn skills(region: &Region<Vec<Skill>>) -> String {
    match region {
        Region::Failed => String::new(),
        Region::Ready(list) if list.is_empty() => placeholder("skills-placeholder", SKILLS_EMPTY),
        Region::Ready(list) => list.iter().map(skill_card).collect(),
    }
}

fn contact_item(icon: &str, label: &str, body: String) -> String {
    format!(
        "<div class=\"contact-item\"><div class=\"contact-icon\">{}</div><div><div class=\"contact-label\">{}</div>{}</div></div>",
        icon, label, body
    )
}

pub fn contact_details(region: &Region<Option<Contact>>) -> String {
    let Some(Some(contact)) = region.ready() else {
        return String::new();
    };
    let mut html = String::new();
    if !contact.email.is_empty() {
        let email = html_escape(&contact.email);
        html.push_str(&contact_item(
            "✉️",
            "Email",
            format!("<a href=\"mailto:{0}\">{0}</a>", email),
        ));
    }
    if let Some(phone) = contact.phone.as_deref() {
        let phone = html_escape(phone);
        html.push_str(&contact_item(
            "📱",
            "Phone",
            format!("<a href=\"tel:{0}\">{0}</a>", phone),
        ));
    }
    if let Some(location) = contact.location.as_deref() {
        html.push_str(&contact_item(
            "📍",
            "Location",
            format!("<span>{}</span>", html_escape(location)),
        ));
    }
    html
}

pub fn social_links(region: &Region<Option<Contact>>) -> String {
    let Some(Some(contact)) = region.ready() else {
        return String::new();
    };
    contact
        .links()
        .into_iter()
        .map(|(platform, url)| {
            format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"social-link\" title=\"{}\">{}</a>",
                html_escape(url),
                html_escape(platform),
                social_icon(platform)
            )
        })
        .collect()
}

fn placeholder(class: &str, text: &str) -> String {
    format!("<div class=\"{}\"><p>{}</p></div>", class, html_escape(text))
}

/// Template context for `site/index`. `form` refills the contact form after
/// a rejected submission.
pub fn page_context(
    content: &PageContent,
    form: Option<&ContactSubmission>,
    status: Option<(&str, &str)>,
) -> serde_json::Value {
    let value = |v: Option<&Option<String>>| {
        v.and_then(|s| s.as_deref()).unwrap_or("").to_string()
    };
    serde_json::json!({
        "hero_bio": hero_bio(&content.hero_bio),
        "about_text": about_text(&content.about_text),
        "stats": stats(&content.stats),
        "projects": projects(&content.projects),
        "skills": skills(&content.skills),
        "contact_details": contact_details(&content.contact),
        "social_links": social_links(&content.contact),
        "form": {
            "name": value(form.map(|f| &f.name)),
            "email": value(form.map(|f| &f.email)),
            "subject": value(form.map(|f| &f.subject)),
            "message": value(form.map(|f| &f.message)),
        },
        "status_kind": status.map(|(kind, _)| kind),
        "status_msg": status.map(|(_, msg)| msg),
    })
}
