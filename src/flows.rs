//! Convenience surface layered on [`Dispatcher::dispatch`](crate::dispatch::Dispatcher::dispatch):
//! per-verb helpers and the login/registration/logout session flows.

pub mod session;

mod verbs;

pub use session::*;
