use crate::logic::transport::TransportError;

use super::cache::CacheError;

/// Why a catalog could not be loaded or refreshed
///
/// Every variant leaves the installed catalog untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No API key configured, nothing was fetched
    MissingApiKey,
    /// Network / timeout failure talking to the patterns endpoint
    Transport(TransportError),
    /// Patterns endpoint answered with something other than 200
    HttpStatus(u16),
    /// Body was not valid catalog JSON
    Parse(String),
    /// Body had no `patterns` field
    MissingPatterns,
    /// Body had an empty `patterns` list
    EmptyPatterns,
    /// Local fallback file could not be read or written
    Io(String),
    Cache(CacheError),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required for syncing patterns"),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::HttpStatus(code) => write!(f, "Patterns endpoint returned HTTP {}", code),
            Self::Parse(e) => write!(f, "Malformed pattern catalog: {}", e),
            Self::MissingPatterns => write!(f, "Pattern catalog has no patterns field"),
            Self::EmptyPatterns => write!(f, "Pattern catalog is empty"),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Cache(e) => write!(f, "Cache error: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<TransportError> for CatalogError {
    fn from(err: TransportError) -> Self {
        CatalogError::Transport(err)
    }
}

impl From<CacheError> for CatalogError {
    fn from(err: CacheError) -> Self {
        CatalogError::Cache(err)
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err.to_string())
    }
}
