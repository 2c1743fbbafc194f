//! Well-known role name constants.
//!
//! These must match the `role` claim issued by the identity service.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_ANALYST: &str = "analyst";
