//! Services: domain logic behind the route handlers.
//!
//! `session` persists the authenticated session in a signed cookie and
//! `credentials` exchanges credentials and tokens with the library API.

pub mod credentials;
pub mod session;
