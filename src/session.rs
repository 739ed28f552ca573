//! Shared browser session lifecycle.
//!
//! Exactly one live session handle exists at a time. Concurrent tests
//! share read access; create/replace/close go through this manager,
//! serialized behind a lock. The slot carries a generation counter so
//! a recovery requested by one test is performed at most once even when
//! several failing tests race for it — siblings that lost the race
//! simply re-acquire the fresh handle.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::browser::{BrowserEngine, BrowserSession, LaunchConfig};
use crate::error::{VisionError, VisionResult};

struct SessionSlot {
    handle: Option<Arc<dyn BrowserSession>>,
    generation: u64,
}

/// Owns the single shared browser session handle
pub struct SessionManager {
    engine: Arc<dyn BrowserEngine>,
    launch: LaunchConfig,
    slot: Mutex<SessionSlot>,
}

impl SessionManager {
    /// Create a manager for the given engine and static launch config
    pub fn new(engine: Arc<dyn BrowserEngine>, launch: LaunchConfig) -> Self {
        Self {
            engine,
            launch,
            slot: Mutex::new(SessionSlot {
                handle: None,
                generation: 0,
            }),
        }
    }

    /// Close any existing handle, then create a new one
    pub async fn spawn(&self) -> VisionResult<Arc<dyn BrowserSession>> {
        let mut slot = self.slot.lock().await;
        self.respawn_locked(&mut slot).await
    }

    /// Current handle and its generation.
    ///
    /// The generation identifies the handle a task observed, so a later
    /// `recover` call can tell whether a sibling already replaced it.
    pub async fn current(&self) -> VisionResult<(Arc<dyn BrowserSession>, u64)> {
        let slot = self.slot.lock().await;
        let handle = slot
            .handle
            .clone()
            .ok_or_else(|| VisionError::Browser("browser session not spawned".to_string()))?;
        Ok((handle, slot.generation))
    }

    /// Replace a failed handle, unless a sibling task already did.
    ///
    /// `seen_generation` is the generation the caller obtained from
    /// `current()` before its failure. Returns the fresh handle either way.
    pub async fn recover(&self, seen_generation: u64) -> VisionResult<(Arc<dyn BrowserSession>, u64)> {
        let mut slot = self.slot.lock().await;
        if slot.generation != seen_generation {
            if let Some(handle) = slot.handle.clone() {
                log::debug!(
                    "session already replaced (generation {} > {}), reusing",
                    slot.generation,
                    seen_generation
                );
                return Ok((handle, slot.generation));
            }
        }
        let handle = self.respawn_locked(&mut slot).await?;
        Ok((handle, slot.generation))
    }

    /// Close the handle if present
    pub async fn close_all(&self) -> VisionResult<()> {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.handle.take() {
            handle.close()?;
        }
        Ok(())
    }

    async fn respawn_locked(&self, slot: &mut SessionSlot) -> VisionResult<Arc<dyn BrowserSession>> {
        if let Some(old) = slot.handle.take() {
            if let Err(err) = old.close() {
                log::warn!("failed to close previous session: {}", err);
            }
        }
        let engine = Arc::clone(&self.engine);
        let config = self.launch.clone();
        let handle = tokio::task::spawn_blocking(move || engine.launch(&config))
            .await
            .map_err(|err| VisionError::Browser(format!("session launch task failed: {}", err)))??;
        slot.handle = Some(Arc::clone(&handle));
        slot.generation += 1;
        log::debug!("browser session spawned (generation {})", slot.generation);
        Ok(handle)
    }
}
