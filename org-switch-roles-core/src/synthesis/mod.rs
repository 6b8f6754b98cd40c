//! Switch-role policy synthesis
//!
//! [`naming`] derives identifiers from OU paths, roles and account names,
//! [`policy_builder`] turns accounts and roles into managed policies and
//! [`template`] places them in a CloudFormation template.

pub mod naming;
pub mod policy_builder;
pub mod template;

pub use naming::OuPath;
pub use policy_builder::{synthesize, ManagedPolicy, SynthesisMode, SynthesisOptions};
pub use template::{Template, TemplateFormat};
