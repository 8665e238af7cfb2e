use std::sync::Arc;

use crate::backend::Backend;
use crate::config::Tables;

/// Everything a handler needs to talk to the backend. Built once at launch
/// and handed to Rocket as managed state.
#[derive(Clone)]
pub struct AppContext {
    pub backend: Arc<dyn Backend>,
    pub tables: Tables,
}

impl AppContext {
    pub fn new(backend: Arc<dyn Backend>, tables: Tables) -> Self {
        AppContext { backend, tables }
    }

    pub fn backend(&self) -> &dyn Backend {
        &*self.backend
    }

    /// Context whose backend calls run as the signed-in admin holding
    /// `access_token`. Admin routes use this for every data call.
    pub fn as_user(&self, access_token: &str) -> AppContext {
        match self.backend.for_user(access_token) {
            Some(backend) => AppContext {
                backend,
                tables: self.tables.clone(),
            },
            None => self.clone(),
        }
    }
}

/// Admin URL prefix without the leading slash.
pub struct AdminSlug(pub String);

impl AdminSlug {
    pub fn base(&self) -> String {
        format!("/{}", self.0)
    }
}
