#[macro_use]
extern crate rocket;

use std::error::Error;
use std::process;
use std::sync::Arc;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::fs::FileServer;
use rocket::http::Header;
use rocket::response::content::RawHtml;
use rocket_dyn_templates::Template;

mod auth;
mod backend;
mod boot;
mod config;
mod content;
mod context;
mod db;
mod error;
mod manager;
mod models;
mod rate_limit;
mod render;
mod routes;
mod tasks;
mod validate;
mod views;

#[cfg(test)]
mod tests;

use backend::rest::RestBackend;
use backend::sqlite::SqliteBackend;
use backend::Backend;
use config::{AppConfig, BackendKind};
use context::{AdminSlug, AppContext};
use manager::Navigator;
use rate_limit::{LoginThrottle, LOGIN_WINDOW};

pub struct NoCacheAdmin;

#[rocket::async_trait]
impl Fairing for NoCacheAdmin {
    fn info(&self) -> Info {
        Info { name: "No-Cache Admin Pages", kind: Kind::Response }
    }

    async fn on_response<'r>(&self, req: &'r rocket::Request<'_>, res: &mut rocket::Response<'r>) {
        let prefix = req
            .rocket()
            .state::<AdminSlug>()
            .map(|s| s.base())
            .unwrap_or_else(|| "/admin".to_string());
        if req.uri().path().starts_with(&*prefix) {
            res.set_header(Header::new("Cache-Control", "no-store, no-cache, must-revalidate, max-age=0"));
            res.set_header(Header::new("Pragma", "no-cache"));
        }
    }
}

#[catch(404)]
fn not_found() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>404</h1><p>Page not found.</p><a href='/'>← Home</a></body></html>".to_string())
}

#[catch(500)]
fn server_error() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>500</h1><p>Internal server error.</p><a href='/'>← Home</a></body></html>".to_string())
}

/// `[default.folio]` from Rocket's figment. A missing section means defaults;
/// a malformed one is fatal.
fn load_config() -> AppConfig {
    match rocket::Config::figment().extract_inner::<AppConfig>("folio") {
        Ok(config) => config,
        Err(e) if e.missing() => {
            log::info!("No [folio] configuration found, using defaults");
            AppConfig::default()
        }
        Err(e) => {
            log::error!("Invalid [folio] configuration: {}", e);
            process::exit(1);
        }
    }
}

fn build_backend(config: &AppConfig) -> Result<Arc<dyn Backend>, Box<dyn Error>> {
    match config.backend {
        BackendKind::Sqlite => {
            let pool = db::init_pool(&config.database_path)?;
            db::run_migrations(&pool, &config.tables)?;
            let backend = SqliteBackend::new(pool, config.session_expiry_hours);
            if let (Some(email), Some(password)) =
                (&config.seed_admin_email, &config.seed_admin_password)
            {
                if backend.create_user(email, password)? {
                    log::info!("Seeded admin account {}", email);
                }
            }
            log::info!("Using local SQLite backend at {}", config.database_path);
            Ok(Arc::new(backend))
        }
        BackendKind::Rest => {
            let backend = RestBackend::new(&config.rest_url, &config.rest_anon_key)?;
            log::info!("Using hosted backend at {}", config.rest_url);
            Ok(Arc::new(backend))
        }
    }
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let config = load_config();

    // Boot check: verify/create directories, validate critical files
    boot::run(&config);

    let backend = match build_backend(&config) {
        Ok(b) => b,
        Err(e) => {
            log::error!("Failed to initialize backend: {}", e);
            process::exit(1);
        }
    };

    let ctx = AppContext::new(backend, config.tables.clone());
    let admin_slug = AdminSlug(config.admin_slug.trim_matches('/').to_string());
    let admin_mount = admin_slug.base();
    let throttle = Arc::new(LoginThrottle::new(config.login_rate_limit, LOGIN_WINDOW));

    log::info!("Admin panel mounted at: {}", admin_mount);

    rocket::build()
        .manage(ctx)
        .manage(admin_slug)
        .manage(throttle)
        .manage(Arc::new(Navigator::new()))
        .attach(Template::fairing())
        .attach(NoCacheAdmin)
        .attach(tasks::BackgroundTasks)
        .mount("/static", FileServer::from("website/static"))
        .mount("/", routes::public::routes())
        .mount(&admin_mount, routes::admin::routes())
        .mount(&admin_mount, routes::auth::routes())
        .register("/", catchers![not_found, server_error])
}
