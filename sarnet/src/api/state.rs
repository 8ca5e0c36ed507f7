use std::sync::Arc;

use crate::auth::TokenService;
use crate::colorize::ColorizerProvider;
use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::media::MediaStorage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub tokens: TokenService,
    pub media: MediaStorage,
    pub colorizer: ColorizerProvider,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn DatabaseBackend>, colorizer: ColorizerProvider) -> Self {
        let tokens = TokenService::new(&config.auth);
        let media = MediaStorage::new(&config.media);

        Self {
            config: Arc::new(config),
            db,
            tokens,
            media,
            colorizer,
        }
    }
}
