//! Session state and lifecycle
//!
//! The transport layer creates one session per connection and hands it to
//! the gateway on every request. This module holds the session view the
//! gateway reads and writes, plus the login/logout machinery built on it.

pub mod lifecycle;
pub mod store;

pub use lifecycle::{
    BlacklistSource, FileBlacklist, LoginData, LoginReply, NoBlacklist, SessionLifecycle,
    UserIdResolver,
};
pub use store::{Request, Session, SESSION_GROUPS, SESSION_USERNAME};
