//! Session credentials and the authenticated user model.

pub mod profile;
pub mod token;

pub use profile::*;
pub use token::*;
