//! AWS CLI `config` file rendering
//!
//! Produces one `[profile ...]` section per account, each assuming
//! `role_name` in that account from `source_profile`:
//!
//! ```text
//! [profile payments]
//! role_arn = arn:aws:iam::111111111111:role/admin
//! source_profile = default
//! mfa_serial = arn:aws:iam::999999999999:mfa/alice
//! ```

use crate::aws::sts::{mfa_serial_arn, role_arn};
use crate::synthesis::naming::account_tokens;
use crate::types::Account;

/// Everything the config file is rendered from
#[derive(Debug, Clone)]
pub struct ProfileConfigContext<'a> {
    pub accounts: &'a [Account],
    /// Account the user's IAM identity lives in
    pub source_account_id: &'a str,
    pub username: &'a str,
    /// Role assumed in every listed account
    pub role_name: &'a str,
    /// Profile holding the user's long-term credentials
    pub source_profile: &'a str,
    /// Emit `mfa_serial` so the CLI prompts for a token code
    pub mfa: bool,
    pub region: Option<&'a str>,
}

/// Render the CLI configuration file
#[must_use]
pub fn render_profile_config(context: &ProfileConfigContext<'_>) -> String {
    let mfa_serial = mfa_serial_arn(context.source_account_id, context.username);
    let mut lines = vec![format!(
        "# Generated from the organization accounts visible to {}",
        context.source_account_id
    )];

    for (account, profile) in context.accounts.iter().zip(account_tokens(context.accounts)) {
        lines.push(String::new());
        if !account.name.is_empty() {
            lines.push(format!("# {} ({})", account.name, account.id));
        }
        lines.push(format!("[profile {profile}]"));
        lines.push(format!("role_arn = {}", role_arn(&account.id, context.role_name)));
        lines.push(format!("source_profile = {}", context.source_profile));
        if context.mfa {
            lines.push(format!("mfa_serial = {mfa_serial}"));
        }
        if let Some(region) = context.region {
            lines.push(format!("region = {region}"));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
