//! Conduit session store
//!
//! Holds the logged-in user and token, persists them across runs and keeps
//! the gateway's bearer token in step with every change.
//!
//! ```no_run
//! use conduit_gateway::{ApiClient, Notifier};
//! use conduit_session::{MemoryStorage, SessionStore};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let notifier = Notifier::default();
//! let api = Arc::new(ApiClient::new("http://localhost:8080/api", reqwest::Client::new(), notifier.clone()));
//! let store = SessionStore::new(api, Arc::new(MemoryStorage::new()), notifier);
//! store.initialize().await;
//! # }
//! ```

mod backend;
pub mod storage;
mod store;

pub use backend::SessionBackend;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use store::{SessionSnapshot, SessionStore, TokenStatus, DEFAULT_STORAGE_KEY};
