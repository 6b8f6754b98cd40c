//! Organizational unit hierarchy resolution

use crate::aws::organizations::convert_account;
use crate::aws::{AwsError, AwsResult};
use crate::synthesis::naming::OuPath;
use crate::types::Account;
use async_trait::async_trait;
use aws_sdk_organizations::error::DisplayErrorContext;
use aws_sdk_organizations::Client as OrganizationsClient;
use std::collections::VecDeque;

/// A node of the organization hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
}

impl OrganizationalUnit {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Read access to the organization tree. Implementations return complete
/// (already paginated) child lists.
#[async_trait]
pub trait OrganizationTree: Send + Sync {
    async fn root_id(&self) -> AwsResult<String>;

    async fn child_units(&self, parent_id: &str) -> AwsResult<Vec<OrganizationalUnit>>;

    async fn child_accounts(&self, parent_id: &str) -> AwsResult<Vec<Account>>;
}

fn sdk_error(operation: &str, e: impl std::error::Error) -> AwsError {
    AwsError::SdkError(format!(
        "Organizations {operation} failed: {}",
        DisplayErrorContext(e)
    ))
}

#[async_trait]
impl OrganizationTree for OrganizationsClient {
    async fn root_id(&self) -> AwsResult<String> {
        let response = self
            .list_roots()
            .send()
            .await
            .map_err(|e| sdk_error("ListRoots", e))?;
        response
            .roots()
            .iter()
            .find_map(|root| root.id().map(str::to_string))
            .ok_or(AwsError::MissingField("ListRoots Roots"))
    }

    async fn child_units(&self, parent_id: &str) -> AwsResult<Vec<OrganizationalUnit>> {
        let mut units = Vec::new();
        let mut next_token = None;

        loop {
            let response = self
                .list_organizational_units_for_parent()
                .parent_id(parent_id)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| sdk_error("ListOrganizationalUnitsForParent", e))?;

            for unit in response.organizational_units() {
                if let (Some(id), Some(name)) = (unit.id(), unit.name()) {
                    units.push(OrganizationalUnit::new(id, name));
                }
            }

            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(units)
    }

    async fn child_accounts(&self, parent_id: &str) -> AwsResult<Vec<Account>> {
        let mut accounts = Vec::new();
        let mut next_token = None;

        loop {
            let response = self
                .list_accounts_for_parent()
                .parent_id(parent_id)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| sdk_error("ListAccountsForParent", e))?;

            accounts.extend(response.accounts().iter().filter_map(convert_account));

            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(accounts)
    }
}

/// Find an organizational unit by name or path.
///
/// `Eng/Prod` (or `/Eng/Prod`) walks down from the root one component at a
/// time. A single name such as `Prod` is searched breadth-first across the
/// whole tree and the first match is returned.
pub async fn find_org_in_tree<T>(tree: &T, name: &str) -> AwsResult<OrganizationalUnit>
where
    T: OrganizationTree + ?Sized,
{
    let path = OuPath::parse(name)
        .map_err(|_| AwsError::OrganizationalUnitNotFound(name.to_string()))?;
    let root = tree.root_id().await?;

    let found = match path.components() {
        [single] => find_by_name(tree, &root, single).await?,
        components => walk_path(tree, &root, components).await?,
    };

    match found {
        Some(unit) => {
            log::info!("Resolved organizational unit {name} to {}", unit.id);
            Ok(unit)
        }
        None => Err(AwsError::OrganizationalUnitNotFound(name.to_string())),
    }
}

async fn walk_path<T>(
    tree: &T,
    root: &str,
    components: &[String],
) -> AwsResult<Option<OrganizationalUnit>>
where
    T: OrganizationTree + ?Sized,
{
    let mut parent = root.to_string();
    let mut current = None;

    for component in components {
        let children = tree.child_units(&parent).await?;
        match children.into_iter().find(|unit| &unit.name == component) {
            Some(unit) => {
                parent = unit.id.clone();
                current = Some(unit);
            }
            None => return Ok(None),
        }
    }

    Ok(current)
}

async fn find_by_name<T>(tree: &T, root: &str, name: &str) -> AwsResult<Option<OrganizationalUnit>>
where
    T: OrganizationTree + ?Sized,
{
    let mut queue = VecDeque::from([root.to_string()]);

    while let Some(parent) = queue.pop_front() {
        for unit in tree.child_units(&parent).await? {
            if unit.name == name {
                return Ok(Some(unit));
            }
            queue.push_back(unit.id);
        }
    }

    Ok(None)
}

/// ACTIVE accounts placed directly under the organizational unit
pub async fn get_ou_accounts<T>(tree: &T, ou_id: &str) -> AwsResult<Vec<Account>>
where
    T: OrganizationTree + ?Sized,
{
    let accounts: Vec<Account> = tree
        .child_accounts(ou_id)
        .await?
        .into_iter()
        .filter(Account::is_active)
        .collect();
    log::debug!("{} active accounts under {ou_id}", accounts.len());
    Ok(accounts)
}

/// ACTIVE accounts of the organizational unit and all of its descendants,
/// depth-first pre-order.
pub async fn get_all_accounts_in_ou_and_sub<T>(tree: &T, ou_id: &str) -> AwsResult<Vec<Account>>
where
    T: OrganizationTree + ?Sized,
{
    let mut accounts = Vec::new();
    let mut stack = vec![ou_id.to_string()];

    while let Some(parent) = stack.pop() {
        accounts.extend(get_ou_accounts(tree, &parent).await?);

        let children = tree.child_units(&parent).await?;
        stack.extend(children.into_iter().rev().map(|unit| unit.id));
    }

    log::info!("{} active accounts in {ou_id} and its sub-units", accounts.len());
    Ok(accounts)
}
