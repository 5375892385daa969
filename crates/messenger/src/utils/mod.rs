//! Utility functions for the messenger core.

pub mod password;
pub mod validation;

pub use password::{hash_password, verify_password};
pub use validation::{
    dedupe_members, validate_email, validate_password, validate_search, validate_username,
};
