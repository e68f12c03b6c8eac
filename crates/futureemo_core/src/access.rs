//! Admin capability gate.
//!
//! # Invariants
//! - With a configured key, only an exact match unlocks admin operations.
//! - Without a configured key, admin operations are open.
//! - The presented token is never logged.

use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Admin authorization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// A key is configured and the presented token is missing or wrong.
    Unauthorized,
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "admin key is missing or does not match"),
        }
    }
}

impl Error for AccessError {}

/// Gate built from the optional configured admin key.
#[derive(Clone, Default)]
pub struct AdminGuard {
    key: Option<String>,
}

impl std::fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGuard")
            .field("key_configured", &self.key.is_some())
            .finish()
    }
}

impl AdminGuard {
    /// Blank keys count as "not configured".
    pub fn new(key: Option<String>) -> Self {
        let key = key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self { key }
    }

    pub fn is_locked(&self) -> bool {
        self.key.is_some()
    }

    /// Checks a presented token against the configured key.
    pub fn authorize(&self, presented: Option<&str>) -> Result<(), AccessError> {
        let Some(expected) = self.key.as_deref() else {
            return Ok(());
        };
        match presented {
            Some(token) if tokens_match(expected.as_bytes(), token.as_bytes()) => Ok(()),
            _ => {
                warn!("event=admin_access module=access status=error error_code=unauthorized");
                Err(AccessError::Unauthorized)
            }
        }
    }
}

// Compares every byte so timing does not reveal the matching prefix length.
fn tokens_match(expected: &[u8], presented: &[u8]) -> bool {
    if expected.len() != presented.len() {
        return false;
    }
    expected
        .iter()
        .zip(presented)
        .fold(0_u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::{AccessError, AdminGuard};

    #[test]
    fn open_when_no_key_is_configured() {
        let guard = AdminGuard::new(None);
        assert!(!guard.is_locked());
        assert_eq!(guard.authorize(None), Ok(()));
        assert_eq!(guard.authorize(Some("anything")), Ok(()));
    }

    #[test]
    fn blank_key_counts_as_unconfigured() {
        let guard = AdminGuard::new(Some("   ".to_string()));
        assert!(!guard.is_locked());
        assert_eq!(guard.authorize(None), Ok(()));
    }

    #[test]
    fn configured_key_requires_exact_match() {
        let guard = AdminGuard::new(Some("s3cret".to_string()));
        assert!(guard.is_locked());
        assert_eq!(guard.authorize(Some("s3cret")), Ok(()));
        assert_eq!(guard.authorize(Some("s3cre")), Err(AccessError::Unauthorized));
        assert_eq!(guard.authorize(Some("S3CRET")), Err(AccessError::Unauthorized));
        assert_eq!(guard.authorize(None), Err(AccessError::Unauthorized));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let guard = AdminGuard::new(Some("s3cret".to_string()));
        let rendered = format!("{guard:?}");
        assert!(!rendered.contains("s3cret"));
    }
}
