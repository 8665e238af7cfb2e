use serde::Deserialize;

/// Application settings, read from the `folio` key of Rocket's figment
/// (`Rocket.toml` `[default.folio]` or `ROCKET_FOLIO`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub database_path: String,
    pub rest_url: String,
    pub rest_anon_key: String,
    pub tables: Tables,
    pub admin_slug: String,
    pub session_expiry_hours: i64,
    pub login_rate_limit: u64,
    pub seed_admin_email: Option<String>,
    pub seed_admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            backend: BackendKind::Sqlite,
            database_path: "website/db/folio.db".to_string(),
            rest_url: String::new(),
            rest_anon_key: String::new(),
            tables: Tables::default(),
            admin_slug: "admin".to_string(),
            session_expiry_hours: 24,
            login_rate_limit: 5,
            seed_admin_email: None,
            seed_admin_password: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Rest,
}

/// Names of the six content tables. Supplied by configuration so the same
/// build can point at differently named tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub about: String,
    pub stats: String,
    pub projects: String,
    pub skills: String,
    pub contact: String,
    pub messages: String,
}

impl Default for Tables {
    fn default() -> Self {
        Tables {
            about: "about".to_string(),
            stats: "stats".to_string(),
            projects: "projects".to_string(),
            skills: "skills".to_string(),
            contact: "contact".to_string(),
            messages: "messages".to_string(),
        }
    }
}

impl Tables {
    pub fn all(&self) -> [&str; 6] {
        [
            &self.about,
            &self.stats,
            &self.projects,
            &self.skills,
            &self.contact,
            &self.messages,
        ]
    }

    /// True when `name` is one of the configured tables.
    pub fn contains(&self, name: &str) -> bool {
        self.all().contains(&name)
    }

    /// Every name must be a plain SQL identifier and the six must be distinct.
    pub fn validate(&self) -> Result<(), String> {
        let all = self.all();
        for (i, name) in all.iter().enumerate() {
            if !crate::backend::is_identifier(name) {
                return Err(format!("table name '{}' is not a valid identifier", name));
            }
            if all[..i].contains(name) {
                return Err(format!("table name '{}' is configured twice", name));
            }
        }
        Ok(())
    }
}
