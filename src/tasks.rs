use rocket::fairing::{Fairing, Info, Kind};
use rocket::tokio;
use rocket::{Orbit, Rocket};
use std::sync::Arc;
use std::time::Duration;

use crate::context::AppContext;
use crate::manager::Navigator;
use crate::rate_limit::LoginThrottle;

/// How often expired backend sessions are purged.
const SESSION_CLEANUP_EVERY: Duration = Duration::from_secs(30 * 60);
/// How often idle throttle and navigator entries are dropped.
const MEMORY_PRUNE_EVERY: Duration = Duration::from_secs(10 * 60);
/// Navigator entries idle this long are forgotten.
const NAVIGATOR_MAX_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

pub struct BackgroundTasks;

#[rocket::async_trait]
impl Fairing for BackgroundTasks {
    fn info(&self) -> Info {
        Info {
            name: "Background Tasks",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let Some(ctx) = rocket.state::<AppContext>().cloned() else {
            log::error!("[task] AppContext not in managed state, background tasks not started");
            return;
        };

        // Session cleanup task
        let backend = Arc::clone(&ctx.backend);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SESSION_CLEANUP_EVERY).await;
                match backend.purge_expired_sessions().await {
                    Ok(count) => {
                        if count > 0 {
                            log::info!("[task] Cleaned up {} expired sessions", count);
                        }
                    }
                    Err(e) => log::error!("[task] Session cleanup failed: {}", e),
                }
            }
        });

        // Throttle + navigator pruning
        let throttle = rocket.state::<Arc<LoginThrottle>>().cloned();
        let navigator = rocket.state::<Arc<Navigator>>().cloned();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(MEMORY_PRUNE_EVERY).await;
                let clients = throttle.as_ref().map(|t| t.cleanup()).unwrap_or(0);
                let sessions = navigator
                    .as_ref()
                    .map(|n| n.prune(NAVIGATOR_MAX_IDLE))
                    .unwrap_or(0);
                if clients + sessions > 0 {
                    log::info!(
                        "[task] Pruned {} throttle entries and {} idle navigators",
                        clients,
                        sessions
                    );
                }
            }
        });

        log::info!("[task] Background tasks started");
    }
}
