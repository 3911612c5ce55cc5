//! Device permission negotiation
//!
//! `PermissionCoordinator` is the single owner of the permission state.
//! The state lives in a watch channel: external components read snapshots
//! or subscribe for changes, and every mutation goes through the
//! device-driven `on_authorization_changed` event (plus the internal
//! timeout fallback during an in-flight request). Waiters hold their own
//! watch receivers, so a concurrent `request_access` joins the outstanding
//! wait instead of competing for a single continuation, and double
//! resolution is unrepresentable.

use crate::constants::timeouts;
use crate::error::{Error, Result};
use crate::position::{PositionBackend, PositionSession};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Device authorization state
///
/// `Denied` and `Restricted` are terminal from the app's perspective; only
/// an external settings change, observed via the device callback, moves
/// out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// The user has not been asked yet
    Undetermined,
    /// The user declined the prompt
    Denied,
    /// Access blocked by device policy (parental controls etc.)
    Restricted,
    /// Approximate-location authorization
    AuthorizedLimited,
    /// Full-accuracy authorization
    AuthorizedFull,
}

impl PermissionState {
    /// Whether continuous updates may run under this state
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::AuthorizedLimited | Self::AuthorizedFull)
    }

    /// Whether re-prompting is pointless and the user must go to settings
    pub fn needs_settings(&self) -> bool {
        matches!(self, Self::Denied | Self::Restricted)
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undetermined => write!(f, "undetermined"),
            Self::Denied => write!(f, "denied"),
            Self::Restricted => write!(f, "restricted"),
            Self::AuthorizedLimited => write!(f, "authorized_limited"),
            Self::AuthorizedFull => write!(f, "authorized_full"),
        }
    }
}

impl std::str::FromStr for PermissionState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "undetermined" => Ok(Self::Undetermined),
            "denied" => Ok(Self::Denied),
            "restricted" => Ok(Self::Restricted),
            "authorized_limited" | "authorized-limited" => Ok(Self::AuthorizedLimited),
            "authorized_full" | "authorized-full" => Ok(Self::AuthorizedFull),
            _ => Err(format!("Unknown permission state: {}", s)),
        }
    }
}

/// Trait for the device permission API
pub trait PermissionBackend: Send + Sync + 'static {
    /// The device's current authorization for this process
    fn current_status(&self) -> PermissionState;

    /// Show the system permission prompt; the answer arrives later through
    /// `PermissionCoordinator::on_authorization_changed`
    fn request_prompt(&self);
}

/// Outcome of a `request_access` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Authorized (possibly already); continuous updates are running
    Authorized(PermissionState),
    /// Previously denied or restricted: direct the user to system settings
    OpenSettings,
    /// The prompt resolved to a non-authorized state
    Refused(PermissionState),
    /// No device callback before the deadline; carries the last known
    /// (possibly stale) state
    TimedOut(PermissionState),
}

/// Owns the permission state machine and drives the position session
pub struct PermissionCoordinator<P, L> {
    backend: Arc<P>,
    session: Arc<PositionSession<L>>,
    state: watch::Sender<PermissionState>,
    prompt_in_flight: AtomicBool,
    prompt_timeout: Duration,
}

impl<P: PermissionBackend, L: PositionBackend> PermissionCoordinator<P, L> {
    /// Create a coordinator, seeding the state from the device's current
    /// authorization
    pub fn new(backend: Arc<P>, session: Arc<PositionSession<L>>) -> Self {
        let initial = backend.current_status();
        let (state, _) = watch::channel(initial);
        Self {
            backend,
            session,
            state,
            prompt_in_flight: AtomicBool::new(false),
            prompt_timeout: timeouts::PERMISSION_PROMPT,
        }
    }

    /// Override the prompt wait deadline
    pub fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// Snapshot of the current permission state
    pub fn state(&self) -> PermissionState {
        *self.state.borrow()
    }

    /// Watch permission changes
    pub fn subscribe(&self) -> watch::Receiver<PermissionState> {
        self.state.subscribe()
    }

    /// Negotiate access with the user
    ///
    /// Already authorized: a no-op that (re)starts continuous updates.
    /// Denied/restricted: no re-prompt, the caller is directed to settings.
    /// Undetermined: shows the prompt (at most once while a wait is
    /// outstanding) and suspends until the device callback or the deadline;
    /// on deadline the last known state is returned rather than blocking
    /// forever.
    pub async fn request_access(&self) -> Result<AccessDecision> {
        let current = self.state();

        if current.is_authorized() {
            if let Err(e) = self.session.start(current).await {
                warn!(error = %e, "could not start position updates");
            }
            return Ok(AccessDecision::Authorized(current));
        }
        if current.needs_settings() {
            return Ok(AccessDecision::OpenSettings);
        }

        // Subscribe before prompting so the callback cannot slip between.
        let mut changes = self.state.subscribe();

        // The callback may have landed between the snapshot above and the
        // subscription; re-check before committing to a wait.
        let rechecked = self.state();
        if rechecked != current {
            return if rechecked.is_authorized() {
                Ok(AccessDecision::Authorized(rechecked))
            } else if rechecked.needs_settings() {
                Ok(AccessDecision::OpenSettings)
            } else {
                Ok(AccessDecision::Refused(rechecked))
            };
        }

        if !self.prompt_in_flight.swap(true, Ordering::SeqCst) {
            info!("requesting location permission");
            self.backend.request_prompt();
        }

        match tokio::time::timeout(self.prompt_timeout, changes.changed()).await {
            Ok(Ok(())) => {
                let new_state = *changes.borrow();
                if new_state.is_authorized() {
                    Ok(AccessDecision::Authorized(new_state))
                } else {
                    Ok(AccessDecision::Refused(new_state))
                }
            }
            Ok(Err(_)) => Err(Error::Unknown(
                "permission state channel closed".to_string(),
            )),
            Err(_) => {
                // Allow a later request_access to re-prompt.
                self.prompt_in_flight.store(false, Ordering::SeqCst);
                let stale = self.state();
                warn!(state = %stale, "permission prompt timed out, falling back to last known state");
                Ok(AccessDecision::TimedOut(stale))
            }
        }
    }

    /// Device callback: authorization changed
    ///
    /// Publishes the new state (waking every pending `request_access`) and
    /// starts or stops the position session accordingly.
    pub async fn on_authorization_changed(&self, new_state: PermissionState) {
        self.prompt_in_flight.store(false, Ordering::SeqCst);
        let previous = self.state.send_replace(new_state);
        if previous != new_state {
            info!(from = %previous, to = %new_state, "authorization changed");
        }

        if new_state.is_authorized() {
            if let Err(e) = self.session.start(new_state).await {
                warn!(error = %e, "could not start position updates");
            }
        } else if new_state.needs_settings() {
            self.session.stop().await;
            self.session.discard_last_known();
        }
    }
}
