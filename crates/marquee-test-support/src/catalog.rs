//! Static show catalog for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use marquee_core::error::BookingError;
use marquee_core::show::{ShowCatalog, ShowInfo};
use uuid::Uuid;

/// A catalog backed by a plain map, seeded by the test.
#[derive(Debug, Default)]
pub struct StaticShowCatalog {
    shows: Mutex<HashMap<Uuid, ShowInfo>>,
}

impl StaticShowCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a show to the catalog.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, show: ShowInfo) {
        self.shows.lock().unwrap().insert(show.id, show);
    }
}

#[async_trait]
impl ShowCatalog for StaticShowCatalog {
    async fn show(&self, show_id: Uuid) -> Result<Option<ShowInfo>, BookingError> {
        Ok(self.shows.lock().unwrap().get(&show_id).cloned())
    }
}
