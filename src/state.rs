use crate::config::Config;
use crate::services::{
    auth::AuthService,
    item::ItemService,
    token::{TokenError, TokenService},
};
use crate::storage::{StorageHealth, Store};
use std::sync::Arc;

/// What every handler gets. Cheap to clone: it's all Arcs and keys.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub items: Arc<ItemService>,
    pub tokens: TokenService,
    pub health: Arc<dyn StorageHealth>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services on top of one store that can do everything.
    pub fn new<S>(config: Config, store: Arc<S>) -> Result<Self, TokenError>
    where
        S: Store + 'static,
    {
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl)?;

        Ok(Self {
            auth: Arc::new(AuthService::new(store.clone(), store.clone(), tokens.clone())),
            items: Arc::new(ItemService::new(store.clone(), store.clone())),
            tokens,
            health: store,
            config: Arc::new(config),
        })
    }
}
