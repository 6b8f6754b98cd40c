//! CloudFormation template assembly and serialization

use crate::error::{SwitchRolesError, SwitchRolesResult};
use crate::synthesis::policy_builder::ManagedPolicy;
use crate::types::PolicyDocument;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
pub const TEMPLATE_DESCRIPTION: &str = "Template with the policies for switch roles to accounts";
const MANAGED_POLICY_TYPE: &str = "AWS::IAM::ManagedPolicy";

/// Serialization format of the rendered template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateFormat {
    #[default]
    Yaml,
    Json,
}

impl TemplateFormat {
    /// File extension used when writing the template to disk
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yml",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedPolicyProperties {
    pub managed_policy_name: String,
    pub description: String,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: ManagedPolicyProperties,
}

/// `{"Ref": logical_id}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Ref {
    #[serde(rename = "Ref")]
    pub logical_id: String,
}

/// `{"Fn::Sub": template}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Sub {
    #[serde(rename = "Fn::Sub")]
    pub template: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: Sub,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Ref,
    pub export: Export,
}

/// A CloudFormation template holding managed policies, with resources and
/// outputs kept in insertion order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    pub description: String,
    pub resources: IndexMap<String, Resource>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

impl Template {
    #[must_use]
    pub fn new(description: &str) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: description.to_string(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Add the policy as an `AWS::IAM::ManagedPolicy` and export its ARN.
    ///
    /// A policy whose logical id is already present is rejected and the
    /// template is left unchanged.
    pub fn add_managed_policy(&mut self, policy: &ManagedPolicy) -> SwitchRolesResult<()> {
        let output_id = format!("{}Arn", policy.logical_id);
        if self.resources.contains_key(&policy.logical_id)
            || self.outputs.contains_key(&output_id)
        {
            return Err(SwitchRolesError::validation(format!(
                "duplicate logical id {} in template",
                policy.logical_id
            )));
        }

        self.resources.insert(
            policy.logical_id.clone(),
            Resource {
                resource_type: MANAGED_POLICY_TYPE.to_string(),
                properties: ManagedPolicyProperties {
                    managed_policy_name: policy.policy_name.clone(),
                    description: policy.description.clone(),
                    policy_document: policy.document.clone(),
                },
            },
        );
        self.outputs.insert(
            output_id,
            Output {
                description: format!("ARN of the {} managed policy", policy.policy_name),
                value: Ref {
                    logical_id: policy.logical_id.clone(),
                },
                export: Export {
                    name: Sub {
                        template: format!("${{AWS::StackName}}-{}", policy.logical_id),
                    },
                },
            },
        );
        Ok(())
    }

    /// Template with every policy, in order
    pub fn from_policies(policies: &[ManagedPolicy]) -> SwitchRolesResult<Self> {
        let mut template = Self::new(TEMPLATE_DESCRIPTION);
        for policy in policies {
            template.add_managed_policy(policy)?;
        }
        Ok(template)
    }

    pub fn to_yaml(&self) -> SwitchRolesResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> SwitchRolesResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render(&self, format: TemplateFormat) -> SwitchRolesResult<String> {
        match format {
            TemplateFormat::Yaml => self.to_yaml(),
            TemplateFormat::Json => self.to_json(),
        }
    }
}
