//! Debounced state saving
//!
//! Every change schedules a save after a quiet period; scheduling again
//! cancels the pending save. The saved state is captured when the save runs,
//! so the stored position is as fresh as possible.

use crate::db::saved_state::{PersistenceRepository, SavedState};
use crate::error::Result;
use crate::playback::state::PlaybackSnapshot;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub struct StateSaver {
    repository: Arc<dyn PersistenceRepository>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl StateSaver {
    pub fn new(repository: Arc<dyn PersistenceRepository>, debounce: Duration) -> Self {
        Self {
            repository,
            debounce,
            pending: Mutex::new(None),
        }
    }

    pub fn repository(&self) -> &Arc<dyn PersistenceRepository> {
        &self.repository
    }

    /// Save `snapshot` once the debounce period passes without another change
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, snapshot: Arc<PlaybackSnapshot>) {
        let repository = self.repository.clone();
        let debounce = self.debounce;
        let job = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let state = SavedState::from_snapshot(&snapshot);
            debug!(empty = state.is_none(), "Committing saved state");
            if let Err(e) = repository.save(state.as_ref()).await {
                error!("Failed to save playback state: {}", e);
            }
        });

        if let Some(previous) = self.swap_pending(Some(job)) {
            previous.abort();
        }
    }

    /// Drop any pending save
    pub fn cancel(&self) {
        if let Some(previous) = self.swap_pending(None) {
            previous.abort();
        }
    }

    /// Cancel any pending save and write `snapshot` immediately
    pub async fn save_now(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        self.cancel();
        let state = SavedState::from_snapshot(snapshot);
        self.repository.save(state.as_ref()).await
    }

    fn swap_pending(&self, job: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *pending, job)
    }
}

impl Drop for StateSaver {
    fn drop(&mut self) {
        self.cancel();
    }
}
