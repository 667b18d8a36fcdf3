use crate::backend::SessionBackend;
use crate::storage::{SessionStorage, StorageError};
use conduit_gateway::types::UserResponse;
use conduit_gateway::{Invalidation, InvalidationListener, Notifier};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;

/// Storage key the snapshot is written under
pub const DEFAULT_STORAGE_KEY: &str = "auth-storage";

const SNAPSHOT_VERSION: u32 = 0;

/// How much the store trusts its current token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Restored from storage, not yet confirmed by the server.
    Unknown,
    /// Issued by a login or confirmed by `initialize`.
    Valid,
    /// No usable token.
    Invalid,
}

/// Point-in-time copy of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<UserResponse>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub token_ready: bool,
    pub is_loading: bool,
    pub status: TokenStatus,
}

#[derive(Debug)]
struct SessionState {
    user: Option<UserResponse>,
    token: Option<String>,
    is_authenticated: bool,
    is_loading: bool,
    status: TokenStatus,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            token: None,
            is_authenticated: false,
            is_loading: false,
            status: TokenStatus::Invalid,
        }
    }
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            token: self.token.clone(),
            is_authenticated: self.is_authenticated,
            token_ready: self.status == TokenStatus::Valid,
            is_loading: self.is_loading,
            status: self.status,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    #[serde(default)]
    user: Option<UserResponse>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    is_authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEnvelope {
    state: PersistedSession,
    #[serde(default)]
    version: u32,
}

/// Single source of truth for who is logged in.
///
/// The store is the only writer of the backend's token. It registers itself
/// as the backend's [`InvalidationListener`] when built, so a token the
/// gateway gives up on always ends in [`SessionStore::logout`].
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    storage: Arc<dyn SessionStorage>,
    storage_key: String,
    notifier: Notifier,
    state: RwLock<SessionState>,
    changes: broadcast::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// Build a store over `backend`, restoring any snapshot in `storage`
    pub fn new(backend: Arc<dyn SessionBackend>, storage: Arc<dyn SessionStorage>, notifier: Notifier) -> Arc<Self> {
        Self::with_storage_key(backend, storage, notifier, DEFAULT_STORAGE_KEY)
    }

    pub fn with_storage_key(
        backend: Arc<dyn SessionBackend>,
        storage: Arc<dyn SessionStorage>,
        notifier: Notifier,
        storage_key: &str,
    ) -> Arc<Self> {
        let (changes, _) = broadcast::channel(16);
        let store = Arc::new(Self {
            backend,
            storage,
            storage_key: storage_key.to_string(),
            notifier,
            state: RwLock::new(SessionState::default()),
            changes,
        });

        let weak = Arc::downgrade(&store);
        store
            .backend
            .set_invalidation_listener(weak as Weak<dyn InvalidationListener>);
        store.rehydrate();
        store
    }

    fn rehydrate(&self) {
        let persisted = match self.read_snapshot() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => {
                log::debug!("No persisted session under {}", self.storage_key);
                return;
            }
            Err(err) => {
                log::warn!("Ignoring unreadable session snapshot: {}", err);
                return;
            }
        };

        let token = persisted.token.clone();
        {
            let mut state = self.write_state();
            state.is_authenticated = persisted.is_authenticated && persisted.token.is_some();
            state.user = persisted.user;
            state.token = persisted.token;
            state.status = if state.token.is_some() {
                TokenStatus::Unknown
            } else {
                TokenStatus::Invalid
            };
        }

        if let Some(token) = token {
            log::info!("Restored persisted session, awaiting validation");
            self.backend.set_token(Some(token));
        }
    }

    fn read_snapshot(&self) -> Result<Option<PersistedSession>, StorageError> {
        match self.storage.load(&self.storage_key)? {
            Some(raw) => {
                let envelope: PersistedEnvelope = serde_json::from_str(&raw)?;
                if envelope.version != SNAPSHOT_VERSION {
                    log::warn!("Session snapshot version {} differs from {}", envelope.version, SNAPSHOT_VERSION);
                }
                Ok(Some(envelope.state))
            }
            None => Ok(None),
        }
    }

    fn write_snapshot(&self, state: &SessionState) -> Result<(), StorageError> {
        let envelope = PersistedEnvelope {
            state: PersistedSession {
                user: state.user.clone(),
                token: state.token.clone(),
                is_authenticated: state.is_authenticated,
            },
            version: SNAPSHOT_VERSION,
        };
        let raw = serde_json::to_string(&envelope)?;
        self.storage.save(&self.storage_key, &raw)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation, persist the result and tell subscribers.
    fn update<R>(&self, mutate: impl FnOnce(&mut SessionState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.write_state();
            let result = mutate(&mut state);
            if let Err(err) = self.write_snapshot(&state) {
                log::warn!("Failed to persist session: {}", err);
            }
            (result, state.snapshot())
        };
        let _ = self.changes.send(snapshot);
        result
    }

    /// Adopt a freshly issued token and its user
    pub fn login(&self, user: UserResponse, token: String) {
        // The gateway must carry the token before anyone sees the flags flip.
        self.backend.set_token(Some(token.clone()));

        let username = user.username.clone();
        self.update(|state| {
            state.user = Some(user);
            state.token = Some(token);
            state.is_authenticated = true;
            state.status = TokenStatus::Valid;
        });

        log::info!("Logged in as {}", username);
        self.notifier.success(
            "Welcome back!",
            format!("Hello {}! You have successfully logged in.", username),
        );
    }

    /// Drop the session. Safe to call in any state, any number of times.
    pub fn logout(&self) {
        self.backend.set_token(None);

        let previous = self.update(|state| {
            state.token = None;
            state.is_authenticated = false;
            state.status = TokenStatus::Invalid;
            state.user.take()
        });

        log::info!("Logged out");
        let message = match previous {
            Some(user) => format!("Goodbye {}!", user.username),
            None => "You have been logged out.".to_string(),
        };
        self.notifier.info("Logged out", message);
    }

    /// Replace the user record without touching the token
    pub fn update_user(&self, user: UserResponse) {
        self.update(|state| state.user = Some(user));
        self.notifier
            .success("Profile updated", "Your profile has been successfully updated.");
    }

    /// Install `token` directly, trusting it without a server round trip
    pub fn set_token(&self, token: Option<String>) {
        self.backend.set_token(token.clone());
        self.update(|state| {
            state.is_authenticated = token.is_some();
            state.status = if token.is_some() {
                TokenStatus::Valid
            } else {
                TokenStatus::Invalid
            };
            state.token = token;
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.update(|state| state.is_loading = loading);
    }

    /// Confirm a restored token with the server.
    ///
    /// Without a token this does nothing. Any failure logs the session out.
    pub async fn initialize(&self) {
        let token = match self.token() {
            Some(token) => token,
            None => {
                log::debug!("No token to validate");
                return;
            }
        };

        self.set_loading(true);

        match self.backend.get_current_user().await {
            Ok(response) => {
                let applied = self.update(|state| {
                    if state.token.as_deref() != Some(token.as_str()) {
                        return false;
                    }
                    state.user = Some(response.user);
                    state.is_authenticated = true;
                    state.status = TokenStatus::Valid;
                    true
                });
                if applied {
                    log::info!("Session validated");
                } else {
                    log::warn!("Session changed while validating; discarding stale result");
                }
            }
            Err(err) => {
                log::error!("Failed to initialize auth: {}", err);
                if self.token().as_deref() == Some(token.as_str()) {
                    self.logout();
                } else {
                    log::warn!("Session changed while validating; keeping the newer session");
                }
            }
        }

        self.set_loading(false);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read_state().snapshot()
    }

    pub fn user(&self) -> Option<UserResponse> {
        self.read_state().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read_state().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_authenticated
    }

    /// True once the token has been issued or confirmed this run
    pub fn token_ready(&self) -> bool {
        self.read_state().status == TokenStatus::Valid
    }

    pub fn is_loading(&self) -> bool {
        self.read_state().is_loading
    }

    pub fn status(&self) -> TokenStatus {
        self.read_state().status
    }

    /// Gate for queries that need a confirmed login (the feed, for one)
    pub fn can_run_authenticated_queries(&self) -> bool {
        let state = self.read_state();
        state.is_authenticated && state.status == TokenStatus::Valid
    }

    /// Snapshots published after every mutation
    pub fn on_change(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.changes.subscribe()
    }
}

impl InvalidationListener for SessionStore {
    fn session_invalidated(&self, reason: Invalidation) {
        log::warn!("Gateway invalidated the session ({:?})", reason);
        self.logout();
    }
}
