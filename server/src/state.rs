use std::sync::Arc;

use crate::{
    clock::{Clock, SystemClock},
    storage::UploadStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UploadStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: impl UploadStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}
