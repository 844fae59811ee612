//! Owned table of chat-thread → AI-thread bindings plus per-thread
//! processing gates. Lives for the process lifetime; lost bindings are
//! reconstructed from chat history by the correlator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ThreadDirectory {
    bindings: Mutex<HashMap<String, String>>,
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ThreadDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory-only lookup, no network.
    pub fn resolve(&self, thread_key: &str) -> Option<String> {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(thread_key)
            .cloned()
    }

    /// Called exactly once per newly started conversation.
    pub fn bind(&self, thread_key: &str, ai_thread_id: &str) {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(thread_key.to_string(), ai_thread_id.to_string());
    }

    /// Idempotent insert used by recovery: the first writer wins and every
    /// caller gets the winning value back. Recovery is deterministic for the
    /// same history, so concurrent recoveries converge on one id.
    pub fn bind_if_absent(&self, thread_key: &str, ai_thread_id: &str) -> String {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(thread_key.to_string())
            .or_insert_with(|| ai_thread_id.to_string())
            .clone()
    }

    /// Per-thread processing gate: at most one event per chat thread is in
    /// flight, later events in the same thread queue behind the guard.
    pub async fn guard(&self, thread_key: &str) -> OwnedMutexGuard<()> {
        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
            gates
                .entry(thread_key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        gate.lock_owned().await
    }
}
