//! Identifier derivation for OU paths, roles and accounts

use crate::error::{SwitchRolesError, SwitchRolesResult};
use crate::types::Account;
use convert_case::{Case, Casing};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

// AWS IAM policy name character limit (128 characters)
// Reference: https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_iam-quotas.html
const MAX_POLICY_NAME_LENGTH: usize = 128;

/// Suffix of every generated policy name
pub const POLICY_SUFFIX: &str = "access";

fn sanitize_component(component: &str) -> String {
    static SANITIZE_REGEX: OnceLock<Regex> = OnceLock::new();
    static DASHES_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = SANITIZE_REGEX
        .get_or_init(|| Regex::new(r"[^a-zA-Z0-9+=,.@_-]").expect("valid sanitize pattern"));
    let dashes = DASHES_REGEX.get_or_init(|| Regex::new(r"-+").expect("valid dash pattern"));

    let sanitized = regex.replace_all(component, "-");
    let cleaned = dashes.replace_all(&sanitized, "-").trim_matches('-').to_string();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

fn truncate_policy_name(name: &str) -> String {
    if name.len() <= MAX_POLICY_NAME_LENGTH {
        return name.to_string();
    }
    name.chars().take(MAX_POLICY_NAME_LENGTH).collect()
}

/// Lower-case, title-case and strip to ASCII alphanumerics: `dev-tools` -> `DevTools`
fn pascal_identifier(value: &str) -> String {
    value
        .to_lowercase()
        .to_case(Case::Pascal)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// A parsed organizational unit path such as `Eng/Prod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuPath {
    raw: String,
    components: Vec<String>,
}

impl OuPath {
    /// Split on `/`, ignoring a leading separator and empty components.
    pub fn parse(raw: &str) -> SwitchRolesResult<Self> {
        let components: Vec<String> = raw
            .trim_start_matches('/')
            .split('/')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        if components.is_empty() {
            return Err(SwitchRolesError::validation(format!(
                "organizational unit path '{raw}' has no components"
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            components,
        })
    }

    /// The path exactly as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// PascalCase concatenation for logical resource names: `Eng/Prod` -> `EngProd`
    #[must_use]
    pub fn logical_name(&self) -> String {
        self.components.iter().map(|c| pascal_identifier(c)).collect()
    }

    /// Dot-joined lowercase form for policy names: `Eng/Prod` -> `eng.prod`
    #[must_use]
    pub fn policy_prefix(&self) -> String {
        self.components
            .iter()
            .map(|c| sanitize_component(&c.to_lowercase()))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Strip every non-alphanumeric character and lower-case the rest
#[must_use]
pub fn sanitize_account_name(name: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let regex = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid pattern"));
    regex.replace_all(name, "").to_lowercase()
}

/// One sanitized token per account, in input order.
///
/// An empty token falls back to the account id; a token already taken by an
/// earlier account gets the account id appended, then a counter until it is
/// unique.
#[must_use]
pub fn account_tokens(accounts: &[Account]) -> Vec<String> {
    let mut seen = HashSet::new();
    accounts
        .iter()
        .map(|account| {
            let mut base = sanitize_account_name(&account.name);
            if base.is_empty() {
                base = account.id.clone();
            }
            if seen.insert(base.clone()) {
                return base;
            }

            let with_id = format!("{base}{}", account.id);
            let mut token = with_id.clone();
            let mut counter = 2usize;
            while !seen.insert(token.clone()) {
                token = format!("{with_id}{counter}");
                counter += 1;
            }
            token
        })
        .collect()
}

/// Statement id unique per (role, OU) or, with an account, per (role, account):
/// `adminToEngProd`, `adminToEngProd123456789012`
#[must_use]
pub fn statement_sid(role_name: &str, ou: &OuPath, account_id: Option<&str>) -> String {
    let role: String = role_name
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let account: String = account_id
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!("{role}To{}{account}", ou.logical_name())
}

/// CloudFormation logical id: `AdminAccessToEngProd`,
/// `AdminAccessToEngProdAccount123456789012`
#[must_use]
pub fn logical_id(role_name: &str, ou: &OuPath, account_id: Option<&str>) -> String {
    let base = format!("{}AccessTo{}", pascal_identifier(role_name), ou.logical_name());
    match account_id {
        Some(id) => format!("{base}Account{}", pascal_identifier(id)),
        None => base,
    }
}

/// Managed policy name: `{prefix}.{role}.access` or
/// `{prefix}.{account_token}.{role}.access`, truncated to the IAM limit.
#[must_use]
pub fn policy_name(prefix: &str, account_token: Option<&str>, role_name: &str) -> String {
    let mut parts = vec![sanitize_component(prefix)];
    if let Some(token) = account_token {
        parts.push(sanitize_component(token));
    }
    parts.push(sanitize_component(role_name));
    parts.push(POLICY_SUFFIX.to_string());
    truncate_policy_name(&parts.join("."))
}
