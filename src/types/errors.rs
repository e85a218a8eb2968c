use std::fmt;

use crate::types::tab::TabId;

// === TabError ===

/// Errors related to tab collection operations.
///
/// Out-of-range indexes are not an error anywhere in the crate; they are
/// clamped or treated as no-ops, so only membership violations surface.
#[derive(Debug)]
pub enum TabError {
    /// No tab with the given id is a member of any collection.
    NotFound(TabId),
}

impl fmt::Display for TabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabError::NotFound(id) => write!(f, "Tab not found: {}", id),
        }
    }
}

impl std::error::Error for TabError {}

// === StateError ===

/// Errors related to persisting tab state.
///
/// Read-side failures (missing file, truncation, wrong key) are deliberately
/// not errors; they surface as "no state" so restoration can fall back.
#[derive(Debug)]
pub enum StateError {
    /// An I/O error occurred while writing a state file.
    Io(String),
    /// Encryption of an incognito state file failed.
    Crypto(String),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::Io(msg) => write!(f, "Tab state I/O error: {}", msg),
            StateError::Crypto(msg) => write!(f, "Tab state crypto error: {}", msg),
        }
    }
}

impl std::error::Error for StateError {}

// === CryptoError ===

/// Errors related to the incognito encryption context.
#[derive(Debug)]
pub enum CryptoError {
    /// Encryption operation failed.
    Encryption(String),
    /// Failed to generate random bytes.
    RandomGeneration(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::Encryption(msg) => write!(f, "Encryption failed: {}", msg),
            CryptoError::RandomGeneration(msg) => {
                write!(f, "Random generation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for CryptoError {}
