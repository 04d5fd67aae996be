//! Error classification shared by every layer.

use serde::{Deserialize, Serialize};

/// The four kinds every error in the system is classified into.
///
/// Crate-level error enums expose a `kind()` method returning one of these,
/// so callers branch on the discriminant instead of inspecting concrete types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or rule-violating input (bad cart, bad status, low stock).
    InvalidInput,
    /// A referenced product, variant, order or user does not exist.
    NotFound,
    /// Missing or wrong credentials.
    Unauthorized,
    /// Storage or infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
