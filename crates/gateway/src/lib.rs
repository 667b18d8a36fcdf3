//! Conduit API gateway
//!
//! A single stateful client for the RealWorld ("Conduit") REST API. It
//! attaches the bearer token, rejects already-expired tokens before they hit
//! the network, classifies every failure into an [`ApiError`] and reports it
//! on the [`Notifier`] side channel. When the session turns out to be invalid
//! it tells the registered [`InvalidationListener`].

pub mod base_url;
mod client;
mod error;
mod fetch;
pub mod jwt;
mod notify;
pub mod types;

pub use base_url::RuntimeContext;
pub use client::{ApiClient, Invalidation, InvalidationListener};
pub use error::{ApiError, Result};
pub use fetch::RequestOptions;
pub use notify::{Notification, Notifier, Severity};
