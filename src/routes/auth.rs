use std::path::PathBuf;
use std::sync::Arc;

use rocket::form::Form;
use rocket::http::{CookieJar, Header};
use rocket::request::FlashMessage;
use rocket::response::{self, Flash, Redirect, Responder};
use rocket::{Request, State};
use rocket_dyn_templates::Template;
use serde_json::json;

use crate::auth::{self, AdminUser, ClientIp};
use crate::context::{AdminSlug, AppContext};
use crate::error::AuthError;
use crate::manager::Navigator;
use crate::rate_limit::LoginThrottle;

use super::apply_flash;

/// Wrapper that adds no-cache headers to a Template response
pub struct NoCacheTemplate(Template);

impl<'r> Responder<'r, 'static> for NoCacheTemplate {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let mut resp = self.0.respond_to(req)?;
        resp.set_header(Header::new(
            "Cache-Control",
            "no-store, no-cache, must-revalidate, max-age=0",
        ));
        resp.set_header(Header::new("Pragma", "no-cache"));
        Ok(resp)
    }
}

#[derive(Debug, FromForm)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub const TOO_MANY_ATTEMPTS: &str = "Too many login attempts. Please try again in 15 minutes.";

fn login_template(slug: &AdminSlug, email: &str, error: Option<&str>) -> NoCacheTemplate {
    let context = json!({
        "admin_slug": slug.0,
        "email": email,
        "error": error,
    });
    NoCacheTemplate(Template::render("admin/login", &context))
}

#[get("/login")]
pub fn login_page(
    admin: Option<AdminUser>,
    slug: &State<AdminSlug>,
    flash: Option<FlashMessage<'_>>,
) -> Result<NoCacheTemplate, Redirect> {
    if admin.is_some() {
        return Err(Redirect::to(slug.base()));
    }
    let mut context = json!({ "admin_slug": slug.0, "email": "" });
    apply_flash(&mut context, &flash);
    Ok(NoCacheTemplate(Template::render("admin/login", &context)))
}

#[post("/login", data = "<form>")]
pub async fn login_submit(
    form: Form<LoginForm>,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    throttle: &State<Arc<LoginThrottle>>,
    ip: ClientIp,
    cookies: &CookieJar<'_>,
) -> Result<Flash<Redirect>, NoCacheTemplate> {
    if !throttle.check_and_record(&ip.0) {
        log::warn!("Login throttled for {}", auth::hash_key(&ip.0));
        return Err(login_template(slug, &form.email, Some(TOO_MANY_ATTEMPTS)));
    }

    match auth::login(ctx, cookies, &form.email, &form.password).await {
        Ok(session) => {
            throttle.reset(&ip.0);
            log::info!("Admin {} signed in", session.user.email);
            Ok(Flash::success(Redirect::to(slug.base()), "Login successful!"))
        }
        Err(e) => {
            if !matches!(e, AuthError::InvalidCredentials) {
                log::error!("Login error: {}", e);
            }
            Err(login_template(slug, &form.email, Some(&e.to_string())))
        }
    }
}

#[post("/logout")]
pub async fn logout(
    admin: Option<AdminUser>,
    ctx: &State<AppContext>,
    slug: &State<AdminSlug>,
    nav: &State<Arc<Navigator>>,
    cookies: &CookieJar<'_>,
) -> Flash<Redirect> {
    if let Some(admin) = &admin {
        nav.forget(admin.token());
    }
    let to = Redirect::to(format!("{}/login", slug.base()));
    match auth::logout(ctx, cookies).await {
        Ok(()) => Flash::success(to, "Logged out successfully"),
        Err(e) => {
            log::error!("Logout error: {}", e);
            Flash::error(to, "Logout failed")
        }
    }
}

/// Catch-all for any /<admin_slug>/* route that failed the AdminUser guard.
#[get("/<_path..>", rank = 100)]
pub fn admin_redirect_to_login(_path: PathBuf, slug: &State<AdminSlug>) -> Redirect {
    Redirect::to(format!("{}/login", slug.base()))
}

#[post("/<_path..>", rank = 100)]
pub fn admin_post_redirect_to_login(_path: PathBuf, slug: &State<AdminSlug>) -> Flash<Redirect> {
    Flash::error(
        Redirect::to(format!("{}/login", slug.base())),
        "Session expired, please log in again",
    )
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        login_page,
        login_submit,
        logout,
        admin_redirect_to_login,
        admin_post_redirect_to_login,
    ]
}
