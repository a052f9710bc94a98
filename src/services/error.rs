use thiserror::Error;

use crate::db::StoreError;

/// Failure kinds shared by every lifecycle operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MarketError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        MarketError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        MarketError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        MarketError::InvalidState(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        MarketError::Conflict(message.into())
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
