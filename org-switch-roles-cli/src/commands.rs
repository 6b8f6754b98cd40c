//! Steps shared by the subcommand handlers

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use aws_sdk_organizations::Client as OrganizationsClient;
use log::info;
use org_switch_roles_core::aws::organizations::accounts_from_listing;
use org_switch_roles_core::aws::tree::{
    find_org_in_tree, get_all_accounts_in_ou_and_sub, get_ou_accounts,
};
use org_switch_roles_core::Account;

/// Where the MFA token code comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaSource {
    /// The role does not require MFA
    Disabled,
    /// Prompt on stderr and read one line from stdin
    Prompt,
    /// Code given on the command line
    Code(String),
}

impl MfaSource {
    pub fn from_flags(token: bool, token_code: Option<String>) -> Self {
        match (token_code, token) {
            (Some(code), _) => Self::Code(code),
            (None, true) => Self::Prompt,
            (None, false) => Self::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// The raw token code, if MFA is enabled. Emptiness is checked by the
    /// AssumeRole request builder.
    pub fn token_code(&self) -> Result<Option<String>> {
        match self {
            Self::Disabled => Ok(None),
            Self::Code(code) => Ok(Some(code.clone())),
            Self::Prompt => {
                let stdin = io::stdin();
                read_token(&mut stdin.lock(), &mut io::stderr()).map(Some)
            }
        }
    }
}

fn read_token(input: &mut impl BufRead, prompt: &mut impl Write) -> Result<String> {
    write!(prompt, "Enter MFA: ").context("Failed to write MFA prompt")?;
    prompt.flush().context("Failed to write MFA prompt")?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read MFA token from stdin")?;
    Ok(line.trim().to_string())
}

/// Accounts of the organizational unit `ou_name`, optionally including every
/// sub-unit.
pub async fn accounts_from_organization(
    client: &OrganizationsClient,
    ou_name: &str,
    as_root: bool,
) -> Result<Vec<Account>> {
    let unit = find_org_in_tree(client, ou_name)
        .await
        .with_context(|| format!("Failed to resolve organizational unit '{ou_name}'"))?;

    let listed = if as_root {
        get_all_accounts_in_ou_and_sub(client, &unit.id).await
    } else {
        get_ou_accounts(client, &unit.id).await
    };
    let accounts = listed
        .with_context(|| format!("Failed to list accounts of {} ({})", unit.name, unit.id))?;

    info!("Found {} accounts for {ou_name}", accounts.len());
    Ok(accounts)
}

/// ACTIVE accounts from a saved `list-accounts` JSON document
pub fn accounts_from_file(path: &Path) -> Result<Vec<Account>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file {}", path.display()))?;
    let accounts = accounts_from_listing(&json)
        .with_context(|| format!("Failed to parse accounts file {}", path.display()))?;
    info!("Loaded {} active accounts from {}", accounts.len(), path.display());
    Ok(accounts)
}
