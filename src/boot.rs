use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::process;

use crate::config::{AppConfig, BackendKind};

/// Required directories that will be created if missing
const REQUIRED_DIRS: &[&str] = &[
    "website",
    "website/db",
    "website/static",
    "website/static/css",
    "website/templates",
    "website/templates/site",
    "website/templates/admin",
];

/// Critical template files; the server cannot function without these
const CRITICAL_TEMPLATES: &[&str] = &[
    "website/templates/site/index.html.tera",
    "website/templates/admin/login.html.tera",
    "website/templates/admin/dashboard.html.tera",
];

/// Static assets; pages still render without them, unstyled.
const STATIC_ASSETS: &[&str] = &["website/static/css/site.css", "website/static/css/admin.css"];

/// Run all boot checks. Call this before Rocket launches.
/// Creates missing directories, warns about missing files, and
/// aborts if critical dependencies are absent.
pub fn run(config: &AppConfig) {
    info!("Folio boot check starting...");

    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Directories ─────────────────────────────────
    for dir in REQUIRED_DIRS {
        let path = Path::new(dir);
        if !path.exists() {
            match fs::create_dir_all(path) {
                Ok(_) => info!("  Created directory: {}", dir),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir, e);
                    errors += 1;
                }
            }
        }
    }

    // ── 2. Critical templates ──────────────────────────
    for file in CRITICAL_TEMPLATES {
        if !Path::new(file).exists() {
            error!("  MISSING critical template: {}", file);
            errors += 1;
        }
    }

    // ── 3. Static assets ───────────────────────────────
    for file in STATIC_ASSETS {
        if !Path::new(file).exists() {
            warn!("  Missing static asset: {} (pages will be unstyled)", file);
            warnings += 1;
        }
    }

    // ── 4. Table names ─────────────────────────────────
    if let Err(e) = config.tables.validate() {
        error!("  Invalid table configuration: {}", e);
        errors += 1;
    }

    if config.admin_slug.trim_matches('/').is_empty() {
        error!("  admin_slug must not be empty");
        errors += 1;
    }

    // ── 5. Backend settings ────────────────────────────
    match config.backend {
        BackendKind::Sqlite => {
            if let Some(dir) = Path::new(&config.database_path).parent() {
                if dir.exists() {
                    let test_file = dir.join(".write_test");
                    match fs::write(&test_file, "test") {
                        Ok(_) => {
                            let _ = fs::remove_file(&test_file);
                        }
                        Err(e) => {
                            error!("  Database directory not writable: {}", e);
                            errors += 1;
                        }
                    }
                }
            }
            if config.seed_admin_email.is_some() != config.seed_admin_password.is_some() {
                warn!("  seed_admin_email and seed_admin_password must be set together; no admin will be seeded");
                warnings += 1;
            }
        }
        BackendKind::Rest => {
            if config.rest_url.trim().is_empty() {
                error!("  backend = \"rest\" but rest_url is empty");
                errors += 1;
            }
            if config.rest_anon_key.trim().is_empty() {
                warn!("  rest_anon_key is empty; the backend will likely reject requests");
                warnings += 1;
            }
        }
    }

    // ── 6. Rocket.toml exists ───────────────────────────
    if !Path::new("Rocket.toml").exists() {
        warn!("  Rocket.toml not found, using default config");
        warnings += 1;
    }

    // ── Summary ─────────────────────────────────────────
    if errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("Boot check passed. All systems go.");
    }
}
