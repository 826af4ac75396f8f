use std::sync::Arc;

use crate::config::Config;
use crate::storage::Storage;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Config,
}
