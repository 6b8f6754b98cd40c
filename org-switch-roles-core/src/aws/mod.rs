//! AWS service access: configuration loading, STS and Organizations

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_sts::config::Region;
use thiserror::Error;

pub mod organizations;
pub mod sts;
pub mod tree;

/// Region used when neither the command line nor the environment names one.
/// Organizations is served from us-east-1 in the commercial partition.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Errors raised while talking to AWS
#[derive(Error, Debug)]
pub enum AwsError {
    #[error("AWS SDK error: {0}")]
    SdkError(String),

    #[error("AWS configuration error: {0}")]
    ConfigError(String),

    #[error("AWS response missing {0}")]
    MissingField(&'static str),

    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Organizational unit not found: {0}")]
    OrganizationalUnitNotFound(String),
}

/// Result type for AWS operations
pub type AwsResult<T> = Result<T, AwsError>;

/// Load the shared SDK configuration.
///
/// The region resolves from `region`, then the default provider chain
/// (environment, profile), then [`DEFAULT_REGION`].
pub async fn load_sdk_config(profile: Option<&str>, region: Option<&str>) -> SdkConfig {
    let region_provider = RegionProviderChain::first_try(region.map(|r| Region::new(r.to_string())))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION));

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
    if let Some(profile) = profile {
        log::debug!("Using AWS profile {profile}");
        loader = loader.profile_name(profile);
    }

    loader.load().await
}
