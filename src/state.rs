use std::sync::Arc;

use crate::services::ProductStore;

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductStore>,
}

impl AppState {
    pub fn new(products: impl ProductStore + 'static) -> Self {
        Self {
            products: Arc::new(products),
        }
    }
}
