//! Core relay runtime: webhook ingress, signature guard, thread binding
//! directory and the per-event dispatch state machine.
mod annotation;
mod config;
mod correlator;
mod directory;
mod dispatcher;
mod event;
mod server;
mod signature;

pub use annotation::{annotation_token, recover_thread_id, thread_id_from_token, AI_THREAD_ID_PREFIX};
pub use config::{build_router, ConfigError, RuntimeConfig, DEFAULT_EVENTS_PATH};
pub use correlator::{CorrelateError, Correlator};
pub use directory::ThreadDirectory;
pub use dispatcher::{Dispatcher, EventError, FALLBACK_MESSAGE};
pub use event::{InboundEvent, MessageEvent, UserProfile};
pub use server::{router, AppState};
pub use signature::{
    current_unix_timestamp_seconds, SignatureError, SignatureVerifier, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
