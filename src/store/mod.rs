//! Store module - Local and remote persistence
//!
//! - `local`: device-local key/value cache (file or memory backed)
//! - `remote`: per-user cloud profile document
//! - `error`: store errors

mod error;
mod local;
mod remote;

pub use error::StoreError;
pub use local::LocalPreferenceStore;
#[cfg(test)]
pub use local::{KeyValueBackend, MemoryBackend};
pub use remote::{ProfilePatch, RealtimeDbProfileStore, RemoteProfileStore, UserProfile};
