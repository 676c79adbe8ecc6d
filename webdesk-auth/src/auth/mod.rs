//! Authorization primitives
//!
//! Group evaluation, user identity, and the privilege checks the method
//! registry wraps around handlers.

pub mod groups;
pub mod identity;
pub mod privileges;

pub use groups::{group_satisfies, group_satisfies_opt, ADMIN_GROUP};
pub use identity::{Credentials, UserProfile};
pub use privileges::{PrivilegeEvaluator, SessionGate};
