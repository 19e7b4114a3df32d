//! Authentication primitives
//!
//! Token signing, one-time code generation and input checks shared by the
//! auth service and the request extractor.

pub mod codes;
pub mod token;

pub use codes::{generate_otp, generate_patterned_mpin, CODE_LENGTH};
pub use token::{parse_bearer, Claims, TokenError, TokenService};

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern compiles")
});

/// Check that an address looks like a deliverable email
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

/// Normalize an email for lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check that a code has exactly [`CODE_LENGTH`] characters
pub fn is_valid_code(code: &str) -> bool {
    code.chars().count() == CODE_LENGTH
}
