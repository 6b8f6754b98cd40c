//! org-switch-roles CLI
//!
//! Entry point for the `org-switch-roles` command-line tool.
//!
//! # Exit Codes
//!
//! - `ExitCode::Success` (0): Operation completed successfully
//! - `ExitCode::Error` (1): Credentials, AWS API, validation or I/O failure
//! - `ExitCode::NoAccounts` (3): No accounts found to create policies for
//!
//! Argument errors are reported by clap with exit code 2.
//!
//! See `types::ExitCode` for the enum definition.

use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, Context, Result};
use aws_sdk_organizations::Client as OrganizationsClient;
use aws_sdk_sts::Client as StsClient;
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use org_switch_roles_core::aws::organizations::{
    list_active_accounts, organizations_client, AccountPager,
};
use org_switch_roles_core::aws::sts::{
    assume_role, caller_account_id, mfa_serial_arn, role_arn, AssumeRoleRequest,
    DEFAULT_SESSION_NAME,
};
use org_switch_roles_core::aws::load_sdk_config;
use org_switch_roles_core::render::{render_profile_config, ProfileConfigContext};
use org_switch_roles_core::synthesis::{
    synthesize, OuPath, SynthesisMode, SynthesisOptions, Template, TemplateFormat,
};
use org_switch_roles_core::SwitchRolesError;

mod commands;
mod output;
mod types;

use commands::MfaSource;
use types::{ExitCode, OutputFormat};

/// Settings of the aws-config subcommand
#[derive(Debug, Clone)]
struct AwsConfigCliConfig {
    /// Management account of the organization
    root_account_id: String,
    /// Role assumed in the management account to list accounts
    root_role_name: String,
    /// IAM user name in the caller's account (used for the MFA serial)
    user_name: String,
    /// Role every generated profile assumes
    role_name: String,
    mfa: MfaSource,
    external_id: Option<String>,
    session_name: String,
    source_profile: String,
    output: PathBuf,
    profile: Option<String>,
    region: Option<String>,
}

impl AwsConfigCliConfig {
    fn validate(&self) -> Result<()> {
        if self.root_account_id.len() != 12
            || !self.root_account_id.chars().all(|c| c.is_ascii_digit())
        {
            anyhow::bail!(
                "Root account ID must be 12 digits: {}",
                self.root_account_id
            );
        }
        for (flag, value) in [
            ("--root-role-name", &self.root_role_name),
            ("--user-name", &self.user_name),
            ("--role-name", &self.role_name),
            ("--source-profile", &self.source_profile),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{flag} cannot be empty");
            }
        }
        Ok(())
    }
}

/// Settings of the switch-policies subcommand
#[derive(Debug, Clone)]
struct SwitchPoliciesCliConfig {
    ou_name: String,
    as_root: bool,
    roles: Vec<String>,
    mode: SynthesisMode,
    require_mfa: bool,
    policy_prefix: Option<String>,
    format: TemplateFormat,
    write_file: bool,
    output_dir: PathBuf,
    accounts_file: Option<PathBuf>,
    profile: Option<String>,
    region: Option<String>,
}

impl SwitchPoliciesCliConfig {
    fn validate(&self) -> Result<OuPath> {
        let ou = OuPath::parse(&self.ou_name)?;

        if let Some(file) = &self.accounts_file {
            if !file.is_file() {
                anyhow::bail!("Accounts file does not exist: {}", file.display());
            }
        }
        if self.write_file && !self.output_dir.is_dir() {
            anyhow::bail!(
                "Output directory does not exist: {}",
                self.output_dir.display()
            );
        }

        Ok(ou)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "org-switch-roles",
    author,
    version,
    about = "Generate AWS CLI profiles and switch-role policies for an AWS Organization",
    long_about = "Lists the accounts of an AWS Organization and renders either an AWS CLI \
profile configuration for switching roles into each of them, or a CloudFormation template \
of IAM managed policies granting sts:AssumeRole into the accounts of an organizational unit.\n\n\
org-switch-roles aws-config --root-account-id 123456789012 --root-role-name OrganizationReader \
--user-name alice --role-name admin --token\n  \
org-switch-roles switch-policies --ou-name Eng/Prod --role admin --role read\n  \
org-switch-roles switch-policies --ou-name Eng --as-root --per-account --write-file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an AWS CLI config file with one profile per organization account
    #[command(
        long_about = "Assumes a role in the organization's management account, lists every \
active account of the organization (except the caller's own) and writes an AWS CLI config \
file with one switch-role profile per account."
    )]
    AwsConfig {
        /// Account ID of the root account of the Organization
        #[arg(long = "root-account-id")]
        root_account_id: String,

        /// Role name to assume in the root account
        #[arg(long = "root-role-name")]
        root_role_name: String,

        /// Your username in the current IAM account
        #[arg(long = "user-name")]
        user_name: String,

        /// Name of the role you want to assume in the accounts of the organization
        #[arg(long = "role-name")]
        role_name: String,

        /// Whether or not the role requires MFA (prompts for the token code)
        #[arg(long = "token")]
        token: bool,

        /// MFA token code, instead of prompting for it
        #[arg(long = "token-code", value_name = "CODE")]
        token_code: Option<String>,

        /// External ID required by the role
        #[arg(long = "external-id")]
        external_id: Option<String>,

        /// Session name of the assumed role
        #[arg(long = "session-name", default_value = DEFAULT_SESSION_NAME)]
        session_name: String,

        /// Profile the generated profiles take credentials from
        #[arg(long = "source-profile", default_value = "default")]
        source_profile: String,

        /// Path of the generated config file
        #[arg(short = 'o', long = "output", default_value = "config")]
        output: PathBuf,

        /// AWS profile used for the initial credentials
        #[arg(long = "profile", env = "AWS_PROFILE")]
        profile: Option<String>,

        /// AWS region; also written into every generated profile
        #[arg(short = 'r', long = "region")]
        region: Option<String>,

        /// Enable debug logging output to stderr
        #[arg(short = 'd', long = "debug")]
        debug: bool,
    },

    /// Generate a CloudFormation template of switch-role policies for an OU
    #[command(
        long_about = "Resolves an organizational unit, collects its active accounts and \
renders a CloudFormation template with one IAM managed policy per role granting \
sts:AssumeRole into those accounts. With --per-account, one policy per account and role \
is added next to the aggregated policy of each role."
    )]
    SwitchPolicies {
        /// Name or path of the organization unit (e.g. Eng/Prod)
        #[arg(long = "ou-name", visible_alias = "organization-unit-name")]
        ou_name: String,

        /// Use the organization unit as the root, including all sub OUs accounts
        #[arg(long = "as-root", visible_alias = "org-as-root")]
        as_root: bool,

        /// Role to grant access to; repeat for several roles [default: admin, poweruser, read]
        #[arg(long = "role", value_name = "ROLE")]
        roles: Vec<String>,

        /// Also create one managed policy per account and role
        #[arg(long = "per-account")]
        per_account: bool,

        /// Require MFA when switching roles
        #[arg(long = "require-mfa")]
        require_mfa: bool,

        /// Prefix of the policy names [default: dotted OU path, e.g. eng.prod]
        #[arg(long = "policy-prefix")]
        policy_prefix: Option<String>,

        /// Template serialization format
        #[arg(short = 'f', long = "format", default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Write the template to <ou_path>.yml (or .json) instead of stdout
        #[arg(short = 'w', long = "write-file")]
        write_file: bool,

        /// Directory the template file is written to
        #[arg(long = "output-dir", default_value = ".")]
        output_dir: PathBuf,

        /// Read accounts from a saved `aws organizations list-accounts` JSON output
        /// instead of querying the organization tree
        #[arg(long = "accounts-file", conflicts_with = "as_root")]
        accounts_file: Option<PathBuf>,

        /// AWS profile used to query the organization
        #[arg(long = "profile", env = "AWS_PROFILE")]
        profile: Option<String>,

        /// AWS region
        #[arg(short = 'r', long = "region")]
        region: Option<String>,

        /// Enable debug logging output to stderr
        #[arg(short = 'd', long = "debug")]
        debug: bool,
    },
}

/// Initialize logging based on configuration
fn init_logging(debug: bool) -> Result<()> {
    let log_level = if debug {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Error
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_target(false)
        .format_timestamp_secs()
        .try_init()
        .context("Logger already initialized")?;

    Ok(())
}

/// Handle the aws-config subcommand
async fn handle_aws_config(config: &AwsConfigCliConfig) -> Result<()> {
    info!("Running aws-config command");

    config
        .validate()
        .context("Configuration validation failed")?;

    let sdk_config = load_sdk_config(config.profile.as_deref(), config.region.as_deref()).await;
    let sts = StsClient::new(&sdk_config);

    let source_account = caller_account_id(&sts)
        .await
        .context("Failed to resolve the caller account")?;
    debug!("Caller account: {source_account}");

    let mut request = AssumeRoleRequest::new(role_arn(
        &config.root_account_id,
        &config.root_role_name,
    ))
    .with_session_name(&config.session_name)
    .with_external_id(config.external_id.clone());

    if let Some(code) = config.mfa.token_code()? {
        request = request.with_mfa(mfa_serial_arn(&source_account, &config.user_name), &code)?;
    }

    let credentials = assume_role(&sts, &request)
        .await
        .map_err(|e| anyhow!("Error in getting the credentials: {e}"))?;

    let organizations = organizations_client(&sdk_config, &credentials);
    let profiles = write_profile_config(&organizations, &source_account, config).await?;
    println!(
        "Wrote {profiles} profiles to {}",
        config.output.display()
    );
    Ok(())
}

/// List the organization accounts through `pager`, render one profile per
/// account and write the config file. Returns the number of profiles.
async fn write_profile_config<P>(
    pager: &P,
    source_account: &str,
    config: &AwsConfigCliConfig,
) -> Result<usize>
where
    P: AccountPager + ?Sized,
{
    let accounts = list_active_accounts(pager, source_account)
        .await
        .context("Failed to list organization accounts")?;
    if accounts.is_empty() {
        warn!("No active accounts found besides {source_account}");
    }

    let rendered = render_profile_config(&ProfileConfigContext {
        accounts: &accounts,
        source_account_id: source_account,
        username: &config.user_name,
        role_name: &config.role_name,
        source_profile: &config.source_profile,
        mfa: config.mfa.is_enabled(),
        region: config.region.as_deref(),
    });

    output::write_artifact(&config.output, &rendered)?;
    Ok(accounts.len())
}

/// Handle the switch-policies subcommand
async fn handle_switch_policies(config: &SwitchPoliciesCliConfig) -> Result<()> {
    info!("Running switch-policies command");

    let ou = config
        .validate()
        .context("Configuration validation failed")?;

    let accounts = match &config.accounts_file {
        Some(path) => commands::accounts_from_file(path)?,
        None => {
            let sdk_config =
                load_sdk_config(config.profile.as_deref(), config.region.as_deref()).await;
            let client = OrganizationsClient::new(&sdk_config);
            commands::accounts_from_organization(&client, &config.ou_name, config.as_root).await?
        }
    };

    let policies = synthesize(
        &accounts,
        &config.roles,
        &ou,
        &SynthesisOptions {
            mode: config.mode,
            require_mfa: config.require_mfa,
            policy_prefix: config.policy_prefix.clone(),
        },
    )?;

    let rendered = Template::from_policies(&policies)?
        .render(config.format)
        .context("Failed to serialize the template")?;

    if config.write_file {
        let path = output::template_path(&config.output_dir, &ou, config.format);
        output::write_artifact(&path, &rendered)?;
        println!("Wrote {} policies to {}", policies.len(), path.display());
    } else {
        output::print_artifact(&rendered)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::AwsConfig {
            root_account_id,
            root_role_name,
            user_name,
            role_name,
            token,
            token_code,
            external_id,
            session_name,
            source_profile,
            output,
            profile,
            region,
            debug,
        } => {
            if let Err(e) = init_logging(debug) {
                eprintln!("org-switch-roles: Failed to initialize logging: {e}");
                process::exit(ExitCode::Error.into());
            }

            let config = AwsConfigCliConfig {
                root_account_id,
                root_role_name,
                user_name,
                role_name,
                mfa: MfaSource::from_flags(token, token_code),
                external_id,
                session_name,
                source_profile,
                output,
                profile,
                region,
            };

            handle_aws_config(&config).await
        }

        Commands::SwitchPolicies {
            ou_name,
            as_root,
            roles,
            per_account,
            require_mfa,
            policy_prefix,
            format,
            write_file,
            output_dir,
            accounts_file,
            profile,
            region,
            debug,
        } => {
            if let Err(e) = init_logging(debug) {
                eprintln!("org-switch-roles: Failed to initialize logging: {e}");
                process::exit(ExitCode::Error.into());
            }

            let config = SwitchPoliciesCliConfig {
                ou_name,
                as_root,
                roles,
                mode: if per_account {
                    SynthesisMode::PerAccount
                } else {
                    SynthesisMode::Aggregated
                },
                require_mfa,
                policy_prefix,
                format: format.into(),
                write_file,
                output_dir,
                accounts_file,
                profile,
                region,
            };

            handle_switch_policies(&config).await
        }
    };

    let code = match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            let code = exit_code_for(&e);
            print_cli_command_error(e);
            code
        }
    };

    process::exit(code.into());
}

fn exit_code_for(e: &anyhow::Error) -> ExitCode {
    match e.downcast_ref::<SwitchRolesError>() {
        Some(SwitchRolesError::NoAccounts { .. }) => ExitCode::NoAccounts,
        _ => ExitCode::Error,
    }
}

fn print_cli_command_error(e: anyhow::Error) {
    eprintln!("Error: {e}");
    let mut source = e.source();
    while let Some(err) = source {
        eprintln!("  Caused by: {err}");
        source = err.source();
    }
}
