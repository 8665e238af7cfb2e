use rocket::request::FlashMessage;
use serde_json::{json, Value};

pub mod admin;
pub mod auth;
pub mod public;

/// Copy a pending flash message into a template context as
/// `flash_kind` / `flash_msg`.
pub(crate) fn apply_flash(context: &mut Value, flash: &Option<FlashMessage<'_>>) {
    if let Some(f) = flash {
        context["flash_kind"] = json!(f.kind());
        context["flash_msg"] = json!(f.message());
    }
}
