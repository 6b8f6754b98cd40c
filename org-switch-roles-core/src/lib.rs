//! Switch-role tooling for AWS Organizations.
//!
//! The crate covers the three steps every run goes through:
//!
//! 1. obtain credentials ([`aws::sts`]),
//! 2. list the accounts of the organization or of an OU sub-tree
//!    ([`aws::organizations`], [`aws::tree`]),
//! 3. turn the accounts into an artifact: `sts:AssumeRole` policies
//!    rendered as a CloudFormation template ([`synthesis`]) or an AWS CLI
//!    profile configuration file ([`render`]).

pub mod aws;
pub mod error;
pub mod render;
pub mod synthesis;
pub mod types;

pub use error::{SwitchRolesError, SwitchRolesResult};
pub use types::{Account, AccountStatus, TemporaryCredentials};
