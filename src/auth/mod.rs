pub mod classify;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod login;
pub mod notifier;
pub mod refresh;

pub use classify::{AuthFailure, classify, classify_error};
pub use coordinator::{Coordinator, Dispatch, MAX_RETRIES};
pub use dispatcher::{ApiRequest, ApiResponse, HttpDispatcher, RequestDispatcher};
pub use error::{ApiError, RefreshError};
pub use login::SessionManager;
pub use notifier::{
    ChannelListener, LogListener, Notice, NoticeLevel, Route, SESSION_EXPIRED_MESSAGE,
    SessionListener, SessionTerminator, UiEvent,
};
pub use refresh::{HttpTokenRefresher, RefreshedTokens, TokenRefresher};
