use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::profiles::repo::{PgProfileRepo, ProfileRepo};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub profiles: Arc<dyn ProfileRepo>,
}

impl AppState {
    /// Postgres-backed state sharing one pool.
    pub fn postgres(config: Arc<AppConfig>, db: PgPool) -> Self {
        Self {
            config,
            users: Arc::new(PgUserRepo::new(db.clone())),
            profiles: Arc::new(PgProfileRepo::new(db)),
        }
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        profiles: Arc<dyn ProfileRepo>,
    ) -> Self {
        Self {
            config,
            users,
            profiles,
        }
    }
}
