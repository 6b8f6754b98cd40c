//! Switch-role policy document generation

use crate::aws::sts::role_arn;
use crate::error::{SwitchRolesError, SwitchRolesResult};
use crate::synthesis::naming::{self, OuPath};
use crate::types::{Account, Condition, PolicyDocument, Statement};
use std::collections::{HashMap, HashSet};

/// The only action granted by switch-role policies
pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";

/// Roles used when none are requested
pub const DEFAULT_ROLE_NAMES: [&str; 3] = ["admin", "poweruser", "read"];

/// How policies are laid out across accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisMode {
    /// One policy per role covering every account
    #[default]
    Aggregated,
    /// One policy per account per role, plus the aggregated policy per role
    PerAccount,
}

/// Knobs for [`synthesize`]
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    pub mode: SynthesisMode,
    /// Add an `aws:MultiFactorAuthPresent` condition to every statement
    pub require_mfa: bool,
    /// Policy name prefix; defaults to the dotted OU path
    pub policy_prefix: Option<String>,
}

/// A synthesized managed policy, ready to be placed in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    pub logical_id: String,
    pub policy_name: String,
    pub description: String,
    pub role_name: String,
    /// `None` for the aggregated policy of a role
    pub account_id: Option<String>,
    pub document: PolicyDocument,
}

/// Requested role names with blanks and duplicates removed (first occurrence
/// wins); [`DEFAULT_ROLE_NAMES`] when nothing is left.
#[must_use]
pub fn normalize_role_names(roles: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let names: Vec<String> = roles
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty() && seen.insert(r.clone()))
        .collect();

    if names.is_empty() {
        DEFAULT_ROLE_NAMES.iter().map(|r| (*r).to_string()).collect()
    } else {
        names
    }
}

/// Role ARNs for every account, deduplicated, in account order
#[must_use]
pub fn switch_role_resources(accounts: &[Account], role_name: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    accounts
        .iter()
        .map(|account| role_arn(&account.id, role_name))
        .filter(|arn| seen.insert(arn.clone()))
        .collect()
}

/// Policy document with a single statement allowing `sts:AssumeRole` into
/// `role_name` in each of `accounts`.
#[must_use]
pub fn switch_policy(
    accounts: &[Account],
    role_name: &str,
    sid: String,
    conditions: &[Condition],
) -> PolicyDocument {
    let statement = Statement::allow(
        sid,
        vec![ASSUME_ROLE_ACTION.to_string()],
        switch_role_resources(accounts, role_name),
    )
    .with_conditions(conditions.to_vec());

    let mut document = PolicyDocument::new();
    document.add_statement(statement);
    document
}

/// Reject policy sets where two policies share a logical id, a policy name or
/// a statement id. Distinct role names can collapse to the same identifier
/// once punctuation is stripped (`read-only`, `read_only`).
fn ensure_unique_identifiers(policies: &[ManagedPolicy]) -> SwitchRolesResult<()> {
    let mut logical_ids: HashMap<&str, &str> = HashMap::new();
    let mut policy_names: HashMap<&str, &str> = HashMap::new();
    let mut sids: HashMap<&str, &str> = HashMap::new();

    for policy in policies {
        let role = policy.role_name.as_str();
        if let Some(other) = logical_ids.insert(&policy.logical_id, role) {
            return Err(clash("logical id", other, role, &policy.logical_id));
        }
        if let Some(other) = policy_names.insert(&policy.policy_name, role) {
            return Err(clash("policy name", other, role, &policy.policy_name));
        }
        for statement in &policy.document.statement {
            if let Some(other) = sids.insert(statement.sid.as_str(), role) {
                return Err(clash("statement id", other, role, &statement.sid));
            }
        }
    }

    Ok(())
}

fn clash(kind: &str, first: &str, second: &str, value: &str) -> SwitchRolesError {
    SwitchRolesError::validation(format!(
        "roles '{first}' and '{second}' both map to {kind} {value}"
    ))
}

/// Build the switch-role policies for `roles` over `accounts`.
///
/// Fails with [`SwitchRolesError::NoAccounts`] when `accounts` is empty and
/// with [`SwitchRolesError::Validation`] when two roles map to the same
/// identifier. Accounts repeating an earlier id are ignored.
pub fn synthesize(
    accounts: &[Account],
    roles: &[String],
    ou: &OuPath,
    options: &SynthesisOptions,
) -> SwitchRolesResult<Vec<ManagedPolicy>> {
    if accounts.is_empty() {
        return Err(SwitchRolesError::no_accounts(ou.as_str()));
    }

    let mut seen_ids = HashSet::new();
    let accounts: Vec<Account> = accounts
        .iter()
        .filter(|account| seen_ids.insert(account.id.as_str()))
        .cloned()
        .collect();
    let roles = normalize_role_names(roles);
    let prefix = options
        .policy_prefix
        .clone()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| ou.policy_prefix());
    let conditions = if options.require_mfa {
        vec![Condition::mfa_present()]
    } else {
        Vec::new()
    };
    let tokens = match options.mode {
        SynthesisMode::PerAccount => naming::account_tokens(&accounts),
        SynthesisMode::Aggregated => Vec::new(),
    };

    let mut policies = Vec::new();
    for role in &roles {
        policies.push(ManagedPolicy {
            logical_id: naming::logical_id(role, ou, None),
            policy_name: naming::policy_name(&prefix, None, role),
            description: format!(
                "Allows switching to the {role} role in the accounts of {}",
                ou.as_str()
            ),
            role_name: role.clone(),
            account_id: None,
            document: switch_policy(
                &accounts,
                role,
                naming::statement_sid(role, ou, None),
                &conditions,
            ),
        });

        if options.mode != SynthesisMode::PerAccount {
            continue;
        }

        for (account, token) in accounts.iter().zip(&tokens) {
            policies.push(ManagedPolicy {
                logical_id: naming::logical_id(role, ou, Some(&account.id)),
                policy_name: naming::policy_name(&prefix, Some(token), role),
                description: format!(
                    "Allows switching to the {role} role in account {} ({}) of {}",
                    account.name,
                    account.id,
                    ou.as_str()
                ),
                role_name: role.clone(),
                account_id: Some(account.id.clone()),
                document: switch_policy(
                    std::slice::from_ref(account),
                    role,
                    naming::statement_sid(role, ou, Some(&account.id)),
                    &conditions,
                ),
            });
        }
    }

    ensure_unique_identifiers(&policies)?;

    log::info!(
        "Synthesized {} policies for {} roles and {} accounts",
        policies.len(),
        roles.len(),
        accounts.len()
    );
    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountStatus;

    fn accounts(ids: &[&str]) -> Vec<Account> {
        ids.iter()
            .map(|id| Account::new(id, &format!("Account {id}"), AccountStatus::Active))
            .collect()
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|r| (*r).to_string()).collect()
    }

    #[test]
    fn test_single_account_single_role() {
        let ou = OuPath::parse("Eng/Prod").unwrap();
        let policies = synthesize(
            &accounts(&["123"]),
            &roles(&["admin"]),
            &ou,
            &SynthesisOptions::default(),
        )
        .unwrap();

        assert_eq!(policies.len(), 1);
        let statements = &policies[0].document.statement;
        assert_eq!(statements.len(), 1);
        assert!(statements[0].sid.contains("admin"));
        assert!(statements[0].sid.contains("EngProd"));
        assert_eq!(statements[0].resource, vec!["arn:aws:iam::123:role/admin"]);
        assert_eq!(statements[0].action, vec![ASSUME_ROLE_ACTION]);
        assert_eq!(policies[0].policy_name, "eng.prod.admin.access");
        assert_eq!(policies[0].logical_id, "AdminAccessToEngProd");
    }

    #[test]
    fn test_aggregated_statement_counts() {
        let ou = OuPath::parse("Eng").unwrap();
        let accts = accounts(&["111", "222", "333", "444"]);
        let role_names = roles(&["admin", "read"]);
        let policies =
            synthesize(&accts, &role_names, &ou, &SynthesisOptions::default()).unwrap();

        let statements: Vec<&Statement> = policies
            .iter()
            .flat_map(|p| p.document.statement.iter())
            .collect();
        assert_eq!(statements.len(), role_names.len());
        for statement in statements {
            assert_eq!(statement.resource.len(), accts.len());
        }
    }

    #[test]
    fn test_per_account_policy_counts() {
        let ou = OuPath::parse("Eng").unwrap();
        let accts = accounts(&["111", "222", "333"]);
        let role_names = roles(&["admin", "poweruser"]);
        let options = SynthesisOptions {
            mode: SynthesisMode::PerAccount,
            ..SynthesisOptions::default()
        };
        let policies = synthesize(&accts, &role_names, &ou, &options).unwrap();

        let per_account = policies.iter().filter(|p| p.account_id.is_some()).count();
        let aggregated = policies.iter().filter(|p| p.account_id.is_none()).count();
        assert_eq!(per_account, accts.len() * role_names.len());
        assert_eq!(aggregated, role_names.len());

        let sids: HashSet<&str> = policies
            .iter()
            .map(|p| p.document.statement[0].sid.as_str())
            .collect();
        assert_eq!(sids.len(), policies.len());

        let logical_ids: HashSet<&str> = policies.iter().map(|p| p.logical_id.as_str()).collect();
        assert_eq!(logical_ids.len(), policies.len());
    }

    #[test]
    fn test_per_account_policy_names_use_sanitized_tokens() {
        let ou = OuPath::parse("Eng/Prod").unwrap();
        let accts = vec![Account::new("111", "Payments (EU)", AccountStatus::Active)];
        let options = SynthesisOptions {
            mode: SynthesisMode::PerAccount,
            ..SynthesisOptions::default()
        };
        let policies = synthesize(&accts, &roles(&["read"]), &ou, &options).unwrap();

        assert_eq!(policies[1].policy_name, "eng.prod.paymentseu.read.access");
        assert_eq!(
            policies[1].document.statement[0].resource,
            vec!["arn:aws:iam::111:role/read"]
        );
    }

    #[test]
    fn test_resources_are_deduplicated() {
        let ou = OuPath::parse("Eng").unwrap();
        let accts = accounts(&["111", "111", "222"]);
        let policies =
            synthesize(&accts, &roles(&["admin"]), &ou, &SynthesisOptions::default()).unwrap();
        assert_eq!(
            policies[0].document.statement[0].resource,
            vec!["arn:aws:iam::111:role/admin", "arn:aws:iam::222:role/admin"]
        );
    }

    #[test]
    fn test_empty_accounts_abort() {
        let ou = OuPath::parse("Eng/Prod").unwrap();
        let result = synthesize(&[], &roles(&["admin"]), &ou, &SynthesisOptions::default());
        match result {
            Err(SwitchRolesError::NoAccounts { ou_name }) => assert_eq!(ou_name, "Eng/Prod"),
            other => panic!("expected NoAccounts, got {other:?}"),
        }
    }

    #[test]
    fn test_roles_with_same_identifiers_are_rejected() {
        let ou = OuPath::parse("Eng").unwrap();
        let result = synthesize(
            &accounts(&["111"]),
            &roles(&["read-only", "read_only"]),
            &ou,
            &SynthesisOptions::default(),
        );
        match result {
            Err(SwitchRolesError::Validation(message)) => {
                assert!(message.contains("'read-only'"), "{message}");
                assert!(message.contains("'read_only'"), "{message}");
                assert!(message.contains("ReadOnlyAccessToEng"), "{message}");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_roles_with_same_statement_id_are_rejected() {
        // ReadonlyAccessToEng and ReadOnlyAccessToEng differ, both Sids are readonlyToEng
        let ou = OuPath::parse("Eng").unwrap();
        let result = synthesize(
            &accounts(&["111"]),
            &roles(&["readonly", "read-only"]),
            &ou,
            &SynthesisOptions::default(),
        );
        match result {
            Err(SwitchRolesError::Validation(message)) => {
                assert!(message.contains("statement id readonlyToEng"), "{message}");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_per_account_repeated_account_is_emitted_once() {
        let ou = OuPath::parse("Eng").unwrap();
        let options = SynthesisOptions {
            mode: SynthesisMode::PerAccount,
            ..SynthesisOptions::default()
        };
        let policies =
            synthesize(&accounts(&["111", "222", "111"]), &roles(&["admin"]), &ou, &options)
                .unwrap();
        assert_eq!(policies.len(), 3);
        let logical_ids: HashSet<&str> = policies.iter().map(|p| p.logical_id.as_str()).collect();
        assert_eq!(logical_ids.len(), policies.len());
    }

    #[test]
    fn test_default_and_deduplicated_roles() {
        assert_eq!(normalize_role_names(&[]), roles(&DEFAULT_ROLE_NAMES));
        assert_eq!(
            normalize_role_names(&roles(&["read", " ", "admin", "read"])),
            roles(&["read", "admin"])
        );
    }

    #[test]
    fn test_mfa_condition_and_prefix() {
        let ou = OuPath::parse("Eng").unwrap();
        let options = SynthesisOptions {
            require_mfa: true,
            policy_prefix: Some("platform-dev".to_string()),
            ..SynthesisOptions::default()
        };
        let policies = synthesize(&accounts(&["111"]), &roles(&["admin"]), &ou, &options).unwrap();

        assert_eq!(policies[0].policy_name, "platform-dev.admin.access");
        assert_eq!(
            policies[0].document.statement[0].condition,
            vec![Condition::mfa_present()]
        );
    }
}
