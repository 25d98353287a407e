//! # Ledgerdesk (session and token lifecycle client)
//!
//! `ledgerdesk` keeps a signed-in session to the billing console API alive. It
//! stores the access/refresh token pair and the user's profile, attaches the
//! access token to every request, and renews it transparently when the API
//! reports it expired.
//!
//! ## Reauthentication
//!
//! All authenticated traffic goes through one [`auth::Coordinator`]:
//!
//! - **Classification:** only a `401` whose body carries an expired-token marker
//!   triggers renewal; everything else reaches the caller unchanged.
//! - **One retry:** a request is renewed and retried at most once. A second
//!   expiry is final for that request.
//! - **Singleflight renewal:** concurrent expiries share one call to the renewal
//!   endpoint, so rotating refresh tokens are never spent twice.
//! - **Forced sign out:** when renewal fails the session is cleared, a single
//!   notice is emitted and the UI is sent back to sign-in.
//!
//! ## Persistence
//!
//! The session survives restarts through a [`session::CredentialStorage`]
//! backend. Partially persisted state is treated as signed out.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod session;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
