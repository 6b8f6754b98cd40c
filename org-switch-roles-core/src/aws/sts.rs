//! STS helpers: caller identity and role assumption

use crate::aws::{AwsError, AwsResult};
use crate::types::TemporaryCredentials;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;

/// Session name used when none is configured
pub const DEFAULT_SESSION_NAME: &str = "TempAccess";

/// `arn:aws:iam::{account_id}:role/{role_name}`
#[must_use]
pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/{role_name}")
}

/// `arn:aws:iam::{account_id}:mfa/{user_name}`
#[must_use]
pub fn mfa_serial_arn(account_id: &str, user_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:mfa/{user_name}")
}

/// Return the current caller account ID using STS GetCallerIdentity.
///
/// # Arguments
///
/// * `client` - STS client to use for the API call
pub async fn caller_account_id(client: &StsClient) -> AwsResult<String> {
    let out = client.get_caller_identity().send().await.map_err(|e| {
        AwsError::SdkError(format!(
            "STS GetCallerIdentity failed: {}",
            DisplayErrorContext(&e)
        ))
    })?;
    let acct = out
        .account()
        .map(std::string::ToString::to_string)
        .ok_or(AwsError::MissingField("GetCallerIdentity Account"))?;
    Ok(acct)
}

/// MFA device and the one-time code read for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaToken {
    pub serial_number: String,
    pub token_code: String,
}

/// Parameters of an AssumeRole call.
///
/// The MFA pair and the external id are independent and only sent when set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    role_arn: String,
    session_name: String,
    mfa: Option<MfaToken>,
    external_id: Option<String>,
}

impl AssumeRoleRequest {
    #[must_use]
    pub fn new(role_arn: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            mfa: None,
            external_id: None,
        }
    }

    #[must_use]
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = session_name.into();
        self
    }

    /// Attach an MFA device and token code.
    ///
    /// The code is trimmed; an empty code is rejected instead of silently
    /// dropping the MFA pair from the request.
    pub fn with_mfa(mut self, serial_number: impl Into<String>, token_code: &str) -> AwsResult<Self> {
        let token_code = token_code.trim();
        if token_code.is_empty() {
            return Err(AwsError::ConfigError(
                "MFA token code is required but was empty".to_string(),
            ));
        }
        self.mfa = Some(MfaToken {
            serial_number: serial_number.into(),
            token_code: token_code.to_string(),
        });
        Ok(self)
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: Option<String>) -> Self {
        self.external_id = external_id.filter(|id| !id.is_empty());
        self
    }

    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn mfa(&self) -> Option<&MfaToken> {
        self.mfa.as_ref()
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }
}

/// Exchange the request for temporary credentials.
///
/// Failures are logged and returned; there is no retry.
pub async fn assume_role(
    client: &StsClient,
    request: &AssumeRoleRequest,
) -> AwsResult<TemporaryCredentials> {
    log::debug!(
        "Assuming role {} (mfa: {}, external id: {})",
        request.role_arn(),
        request.mfa().is_some(),
        request.external_id().is_some()
    );

    let out = client
        .assume_role()
        .role_arn(request.role_arn())
        .role_session_name(request.session_name())
        .set_serial_number(request.mfa().map(|m| m.serial_number.clone()))
        .set_token_code(request.mfa().map(|m| m.token_code.clone()))
        .set_external_id(request.external_id().map(str::to_string))
        .send()
        .await
        .map_err(|e| {
            let message = format!(
                "STS AssumeRole on {} failed: {}",
                request.role_arn(),
                DisplayErrorContext(&e)
            );
            log::error!("{message}");
            AwsError::SdkError(message)
        })?;

    let creds = out
        .credentials()
        .ok_or(AwsError::MissingField("AssumeRole Credentials"))?;

    Ok(TemporaryCredentials {
        access_key_id: creds.access_key_id().to_string(),
        secret_access_key: creds.secret_access_key().to_string(),
        session_token: creds.session_token().to_string(),
    })
}
