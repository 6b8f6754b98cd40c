//! Core type definitions shared by the AWS and synthesis layers

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Lifecycle status of an organization member account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Suspended,
    PendingClosure,
    #[default]
    #[serde(other)]
    Unknown,
}

impl From<&str> for AccountStatus {
    fn from(value: &str) -> Self {
        match value {
            "ACTIVE" => Self::Active,
            "SUSPENDED" => Self::Suspended,
            "PENDING_CLOSURE" => Self::PendingClosure,
            _ => Self::Unknown,
        }
    }
}

/// An organization member account.
///
/// Join timestamps and join methods are dropped on conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: AccountStatus,
}

impl Account {
    #[must_use]
    pub fn new(id: &str, name: &str, status: AccountStatus) -> Self {
        Self {
            id: id.to_string(),
            arn: None,
            email: None,
            name: name.to_string(),
            status,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Temporary credentials for one assumed-role session
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .finish()
    }
}

/// Effect of an IAM policy statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

/// IAM condition operators used by generated statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConditionOperator {
    Bool,
    StringEquals,
}

impl ConditionOperator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::StringEquals => "StringEquals",
        }
    }
}

/// A single `operator: { key: values }` condition entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub operator: ConditionOperator,
    pub key: String,
    pub values: Vec<String>,
}

impl Condition {
    /// Condition requiring the caller to have authenticated with MFA
    #[must_use]
    pub fn mfa_present() -> Self {
        Self {
            operator: ConditionOperator::Bool,
            key: "aws:MultiFactorAuthPresent".to_string(),
            values: vec!["true".to_string()],
        }
    }
}

/// Serialize conditions into the nested IAM `Condition` block, with
/// operators and keys in sorted order.
fn serialize_conditions<S>(conditions: &[Condition], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut condition_map: BTreeMap<&str, BTreeMap<&str, &Vec<String>>> = BTreeMap::new();

    for condition in conditions {
        condition_map
            .entry(condition.operator.as_str())
            .or_default()
            .insert(&condition.key, &condition.values);
    }

    condition_map.serialize(serializer)
}

/// Policy statement structure
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub sid: String,
    pub effect: Effect,
    pub action: Vec<String>,
    pub resource: Vec<String>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_conditions"
    )]
    pub condition: Vec<Condition>,
}

impl Statement {
    /// Create an Allow statement without conditions
    #[must_use]
    pub fn allow(sid: String, action: Vec<String>, resource: Vec<String>) -> Self {
        Self {
            sid,
            effect: Effect::Allow,
            action,
            resource,
            condition: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_conditions(mut self, condition: Vec<Condition>) -> Self {
        self.condition = condition;
        self
    }
}

/// Policy document structure
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: Vec::new(),
        }
    }

    pub fn add_statement(&mut self, statement: Statement) {
        self.statement.push(statement);
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new()
    }
}
