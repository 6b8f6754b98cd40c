//! Error types for org-switch-roles

use crate::aws::AwsError;
use thiserror::Error;

/// Main error type for switch-role operations
#[derive(Error, Debug)]
pub enum SwitchRolesError {
    #[error("AWS operation failed: {0}")]
    Aws(#[from] AwsError),

    #[error("No accounts found to create a policy for - OU Name: {ou_name}")]
    NoAccounts { ou_name: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type SwitchRolesResult<T> = Result<T, SwitchRolesError>;

impl SwitchRolesError {
    pub fn no_accounts(ou_name: impl Into<String>) -> Self {
        Self::NoAccounts {
            ou_name: ou_name.into(),
        }
    }
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for SwitchRolesError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for SwitchRolesError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
