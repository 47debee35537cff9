//! Session and dashboard flows built on the request pipeline.
//!
//! Login, two-factor, signup, and password-reset calls are unauthenticated and go straight
//! through the base executor; everything that needs a session goes through
//! [`AuthenticatedClient`](crate::client::AuthenticatedClient) and therefore benefits from
//! refresh-and-replay.

pub mod dashboard;
pub mod session;

pub use session::*;
