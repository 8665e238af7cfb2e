use rocket::form::Form;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;

use crate::content;
use crate::context::AppContext;
use crate::error::AppError;
use crate::models::message::{ContactSubmission, Message, SEND_FAILED, SENT_OK};
use crate::views::public;

// ── Portfolio page ─────────────────────────────────────

#[get("/")]
pub async fn index(ctx: &State<AppContext>, flash: Option<FlashMessage<'_>>) -> Template {
    let page = content::load_page(ctx).await;
    let status = flash.as_ref().map(|f| (f.kind(), f.message()));
    let context = public::page_context(&page, None, status);
    Template::render("site/index", &context)
}

// ── Contact form ───────────────────────────────────────

/// A stored message redirects back to the form with a notice. A rejected or
/// failed submission re-renders the page with the visitor's input intact.
#[post("/contact", data = "<form>")]
pub async fn contact_submit(
    ctx: &State<AppContext>,
    form: Form<ContactSubmission>,
) -> Result<Flash<Redirect>, Template> {
    let submission = form.into_inner();
    match Message::submit(ctx, &submission).await {
        Ok(()) => {
            log::info!("Contact message stored");
            Ok(Flash::success(Redirect::to("/#contact"), SENT_OK))
        }
        Err(e) => {
            let text = match &e {
                AppError::Validation(v) => v.message.clone(),
                _ => {
                    log::error!("Error sending message: {}", e);
                    SEND_FAILED.to_string()
                }
            };
            let page = content::load_page(ctx).await;
            let context = public::page_context(&page, Some(&submission), Some(("error", &text)));
            Err(Template::render("site/index", &context))
        }
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![index, contact_submit]
}
