//! Session termination. When renewal is impossible the session is cleared, one
//! notice is shown and the UI is sent back to sign-in. Listeners are injected;
//! nothing here reaches for a global.

use crate::session::CredentialStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please sign in again";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn session_expired() -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    SignIn,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    Notice(Notice),
    Navigate(Route),
}

pub trait SessionListener: Send + Sync {
    fn notice(&self, notice: Notice);

    fn navigate(&self, route: Route);
}

/// Reports session events through `tracing`, for headless callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogListener;

impl SessionListener for LogListener {
    fn notice(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Warning => warn!("{}", notice.message),
        }
    }

    fn navigate(&self, route: Route) {
        info!(?route, "navigate");
    }
}

/// Forwards session events to a UI layer over a channel.
#[derive(Clone, Debug)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelListener {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            debug!("ui event dropped: receiver closed");
        }
    }
}

impl SessionListener for ChannelListener {
    fn notice(&self, notice: Notice) {
        self.forward(UiEvent::Notice(notice));
    }

    fn navigate(&self, route: Route) {
        self.forward(UiEvent::Navigate(route));
    }
}

#[derive(Clone)]
pub struct SessionTerminator {
    store: Arc<CredentialStore>,
    listener: Arc<dyn SessionListener>,
}

impl SessionTerminator {
    #[must_use]
    pub fn new(store: Arc<CredentialStore>, listener: Arc<dyn SessionListener>) -> Self {
        Self { store, listener }
    }

    /// Ends the session after an unrecoverable refresh failure. Returns `false`
    /// without side effects when the session is already cleared.
    pub fn terminate(&self) -> bool {
        if self.store.snapshot().is_empty() {
            debug!("session already cleared");
            return false;
        }

        match self.store.clear() {
            Ok(false) => return false,
            Ok(true) => {}
            // The in-memory session is gone either way.
            Err(err) => error!("{err:#}"),
        }

        warn!("session terminated");

        self.listener.notice(Notice::session_expired());
        self.listener.navigate(Route::SignIn);

        true
    }

    /// User-initiated sign out: clears the session and navigates to sign-in
    /// without the expiry notice. Returns whether a session was cleared.
    pub fn sign_out(&self) -> bool {
        let cleared = match self.store.clear() {
            Ok(cleared) => cleared,
            Err(err) => {
                error!("{err:#}");
                true
            }
        };

        info!(cleared, "signed out");

        self.listener.navigate(Route::SignIn);

        cleared
    }
}
