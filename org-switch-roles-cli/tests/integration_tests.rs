//! Integration tests for the org-switch-roles CLI binary.
//!
//! These tests exercise argument parsing, template generation from saved
//! account listings, file output and the error exit codes. They never talk to
//! AWS: every switch-policies run uses `--accounts-file`.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Path of a file under tests/resources
fn resource(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("resources")
        .join(name)
}

/// Helper function to get the CLI binary command
fn cli_command() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("org-switch-roles"))
}

/// switch-policies over the sample accounts file for OU Eng/Prod
fn switch_policies_command() -> Command {
    let mut cmd = cli_command();
    cmd.arg("switch-policies")
        .arg("--ou-name")
        .arg("Eng/Prod")
        .arg("--accounts-file")
        .arg(resource("accounts.json"));
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success();
    String::from_utf8(output.get_output().stdout.clone()).unwrap()
}

#[test]
fn test_cli_help() {
    cli_command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("aws-config"))
        .stdout(predicate::str::contains("switch-policies"));
}

#[test]
fn test_cli_version() {
    cli_command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_no_arguments() {
    cli_command()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_switch_policies_help() {
    cli_command()
        .args(["switch-policies", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--ou-name"))
        .stdout(predicate::str::contains("--as-root"))
        .stdout(predicate::str::contains("--per-account"))
        .stdout(predicate::str::contains("--role"));
}

#[test]
fn test_aws_config_help() {
    cli_command()
        .args(["aws-config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--root-account-id"))
        .stdout(predicate::str::contains("--token"))
        .stdout(predicate::str::contains("--external-id"));
}

#[test]
fn test_aws_config_missing_arguments() {
    cli_command()
        .args(["aws-config", "--root-account-id", "123456789012"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--root-role-name"));
}

#[test]
fn test_aws_config_invalid_root_account() {
    cli_command()
        .args([
            "aws-config",
            "--root-account-id",
            "not-an-account",
            "--root-role-name",
            "OrganizationReader",
            "--user-name",
            "alice",
            "--role-name",
            "admin",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Root account ID must be 12 digits"));
}

#[test]
fn test_switch_policies_default_roles_yaml() {
    let stdout = stdout_of(&mut switch_policies_command());
    let template: serde_yaml::Value = serde_yaml::from_str(&stdout).expect("Invalid YAML output");

    let resources = template["Resources"].as_mapping().unwrap();
    assert_eq!(resources.len(), 3, "one policy per default role");

    for (logical_id, role) in [
        ("AdminAccessToEngProd", "admin"),
        ("PoweruserAccessToEngProd", "poweruser"),
        ("ReadAccessToEngProd", "read"),
    ] {
        let properties = &template["Resources"][logical_id]["Properties"];
        assert_eq!(
            properties["ManagedPolicyName"].as_str().unwrap(),
            format!("eng.prod.{role}.access")
        );
        let arns: Vec<&str> = properties["PolicyDocument"]["Statement"][0]["Resource"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        // The suspended account is filtered out
        assert_eq!(
            arns,
            vec![
                format!("arn:aws:iam::111111111111:role/{role}"),
                format!("arn:aws:iam::333333333333:role/{role}"),
            ]
        );
    }
}

#[test]
fn test_switch_policies_json_per_account() {
    let mut cmd = switch_policies_command();
    cmd.args(["--role", "admin", "--per-account", "--format", "json"]);
    let stdout = stdout_of(&mut cmd);
    let template: Value = serde_json::from_str(&stdout).expect("Invalid JSON output");

    let resources = template["Resources"].as_object().unwrap();
    // 2 accounts x 1 role + 1 aggregated
    assert_eq!(resources.len(), 3);
    assert_eq!(
        template["Resources"]["AdminAccessToEngProdAccount111111111111"]["Properties"]
            ["ManagedPolicyName"],
        "eng.prod.paymentseu.admin.access"
    );
    assert_eq!(
        template["Resources"]["AdminAccessToEngProdAccount333333333333"]["Properties"]
            ["ManagedPolicyName"],
        "eng.prod.datalake.admin.access"
    );
    assert_eq!(
        template["Outputs"]["AdminAccessToEngProdArn"]["Value"]["Ref"],
        "AdminAccessToEngProd"
    );
}

#[test]
fn test_switch_policies_require_mfa_and_prefix() {
    let mut cmd = switch_policies_command();
    cmd.args([
        "--role",
        "read",
        "--require-mfa",
        "--policy-prefix",
        "platform-dev",
        "--format",
        "json",
    ]);
    let stdout = stdout_of(&mut cmd);
    let template: Value = serde_json::from_str(&stdout).unwrap();

    let properties = &template["Resources"]["ReadAccessToEngProd"]["Properties"];
    assert_eq!(properties["ManagedPolicyName"], "platform-dev.read.access");
    assert_eq!(
        properties["PolicyDocument"]["Statement"][0]["Condition"]["Bool"]
            ["aws:MultiFactorAuthPresent"][0],
        "true"
    );
}

#[test]
fn test_switch_policies_organization_unit_name_alias() {
    let mut cmd = cli_command();
    cmd.args(["switch-policies", "--organization-unit-name", "/Sandbox"])
        .arg("--accounts-file")
        .arg(resource("accounts.json"))
        .args(["--role", "admin"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("AdminAccessToSandbox"))
        .stdout(predicate::str::contains("sandbox.admin.access"));
}

#[test]
fn test_switch_policies_write_file() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = switch_policies_command();
    cmd.args(["--role", "admin", "--write-file", "--output-dir"])
        .arg(temp_dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Wrote 1 policies"));

    let path = temp_dir.path().join("eng.prod.yml");
    let contents = std::fs::read_to_string(&path).expect("template file should exist");
    assert!(contents.contains("AWS::IAM::ManagedPolicy"));
    assert!(contents.contains("arn:aws:iam::111111111111:role/admin"));
}

#[test]
fn test_switch_policies_write_json_file() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = switch_policies_command();
    cmd.args(["--format", "json", "--write-file", "--output-dir"])
        .arg(temp_dir.path());
    cmd.assert().success();

    let contents = std::fs::read_to_string(temp_dir.path().join("eng.prod.json")).unwrap();
    let template: Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(template["Resources"].as_object().unwrap().len(), 3);
}

#[test]
fn test_switch_policies_no_active_accounts() {
    let mut cmd = cli_command();
    cmd.args(["switch-policies", "--ou-name", "Eng/Prod"])
        .arg("--accounts-file")
        .arg(resource("suspended_accounts.json"));
    cmd.assert()
        .failure()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "No accounts found to create a policy for - OU Name: Eng/Prod",
        ));
}

#[test]
fn test_switch_policies_missing_accounts_file() {
    let mut cmd = cli_command();
    cmd.args([
        "switch-policies",
        "--ou-name",
        "Eng",
        "--accounts-file",
        "/nonexistent/accounts.json",
    ]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Accounts file does not exist"));
}

#[test]
fn test_switch_policies_invalid_accounts_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let mut cmd = cli_command();
    cmd.args(["switch-policies", "--ou-name", "Eng", "--accounts-file"])
        .arg(&path);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse accounts file"));
}

#[test]
fn test_switch_policies_empty_ou_path() {
    let mut cmd = cli_command();
    cmd.args(["switch-policies", "--ou-name", "/"])
        .arg("--accounts-file")
        .arg(resource("accounts.json"));
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("has no components"));
}

#[test]
fn test_switch_policies_accounts_file_conflicts_with_as_root() {
    let mut cmd = switch_policies_command();
    cmd.arg("--as-root");
    cmd.assert().failure().code(2);
}

#[test]
fn test_switch_policies_roles_with_same_identifier() {
    let mut cmd = switch_policies_command();
    cmd.args(["--role", "read-only", "--role", "read_only"]);
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "roles 'read-only' and 'read_only' both map to logical id ReadOnlyAccessToEngProd",
        ));
}
