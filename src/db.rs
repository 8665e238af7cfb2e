use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::config::Tables;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_pool(path: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    // WAL for concurrent readers while the admin writes
    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    Ok(pool)
}

/// Create one document table per configured content table plus the auth
/// tables. Table names must already have passed `Tables::validate`.
pub fn run_migrations(pool: &DbPool, tables: &Tables) -> Result<(), Box<dyn std::error::Error>> {
    tables.validate()?;
    let conn = pool.get()?;

    for table in tables.all() {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                id INTEGER PRIMARY KEY,
                doc TEXT NOT NULL DEFAULT '{{}}'
            );"
        ))?;
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS auth_users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS auth_sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES auth_users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_auth_sessions_expiry ON auth_sessions(expires_at);
        ",
    )?;

    Ok(())
}

/// Create the first admin account when the user table is empty.
/// Returns true when an account was created.
pub fn seed_admin(
    pool: &DbPool,
    email: &str,
    password_hash: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let conn = pool.get()?;
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM auth_users", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO auth_users (id, email, password_hash) VALUES (?1, ?2, ?3)",
        params![
            uuid::Uuid::new_v4().to_string(),
            email.trim().to_lowercase(),
            password_hash
        ],
    )?;
    Ok(true)
}
