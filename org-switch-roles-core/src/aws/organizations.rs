//! Organization account listing

use crate::aws::{AwsError, AwsResult};
use crate::types::{Account, AccountStatus, TemporaryCredentials};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_organizations::config::Credentials;
use aws_sdk_organizations::error::DisplayErrorContext;
use aws_sdk_organizations::Client as OrganizationsClient;
use serde::Deserialize;
use std::collections::HashSet;

/// One page of a ListAccounts response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    pub next_token: Option<String>,
}

/// Source of account pages, keyed by the continuation token of the
/// previous page (`None` for the first page).
#[async_trait]
pub trait AccountPager: Send + Sync {
    async fn list_accounts_page(&self, next_token: Option<String>) -> AwsResult<AccountPage>;
}

#[async_trait]
impl AccountPager for OrganizationsClient {
    async fn list_accounts_page(&self, next_token: Option<String>) -> AwsResult<AccountPage> {
        let response = self
            .list_accounts()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                AwsError::SdkError(format!(
                    "Organizations ListAccounts failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(AccountPage {
            accounts: response.accounts().iter().filter_map(convert_account).collect(),
            next_token: response.next_token().map(str::to_string),
        })
    }
}

/// Convert an SDK account, skipping entries without an id.
pub(crate) fn convert_account(account: &aws_sdk_organizations::types::Account) -> Option<Account> {
    let Some(id) = account.id() else {
        log::warn!("Skipping account without an id: {:?}", account.name());
        return None;
    };
    #[allow(deprecated)]
    let status = account
        .status()
        .map(|s| AccountStatus::from(s.as_str()))
        .unwrap_or_default();

    Some(Account {
        id: id.to_string(),
        arn: account.arn().map(str::to_string),
        email: account.email().map(str::to_string),
        name: account.name().unwrap_or_default().to_string(),
        status,
    })
}

/// Build an Organizations client that signs with the assumed-role credentials
#[must_use]
pub fn organizations_client(
    base: &SdkConfig,
    credentials: &TemporaryCredentials,
) -> OrganizationsClient {
    let provider = Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        Some(credentials.session_token.clone()),
        None,
        "AssumeRole",
    );
    let config = aws_sdk_organizations::config::Builder::from(base)
        .credentials_provider(provider)
        .build();
    OrganizationsClient::from_conf(config)
}

/// List every ACTIVE account of the organization except `self_account`.
///
/// Pages are requested until one arrives without a continuation token. A
/// token that was already followed is a pagination error.
/// Accounts keep the order in which the API returned them.
pub async fn list_active_accounts<P>(pager: &P, self_account: &str) -> AwsResult<Vec<Account>>
where
    P: AccountPager + ?Sized,
{
    let mut accounts = Vec::new();
    let mut next_token: Option<String> = None;
    let mut seen_tokens = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = pager.list_accounts_page(next_token.clone()).await?;
        pages += 1;

        let total = page.accounts.len();
        accounts.extend(
            page.accounts
                .into_iter()
                .filter(|account| account.id != self_account && account.is_active()),
        );
        log::debug!("Page {pages}: {total} accounts, {} kept so far", accounts.len());

        match page.next_token {
            Some(token) if !seen_tokens.insert(token.clone()) => {
                return Err(AwsError::Pagination(format!(
                    "ListAccounts returned continuation token {token} twice"
                )));
            }
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    log::info!("Found {} active accounts in {pages} pages", accounts.len());
    Ok(accounts)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AccountListing {
    Response {
        #[serde(rename = "Accounts")]
        accounts: Vec<Account>,
    },
    Bare(Vec<Account>),
}

/// Parse a saved `aws organizations list-accounts` response (or a bare
/// array of accounts) and keep the ACTIVE ones.
pub fn accounts_from_listing(json: &str) -> serde_json::Result<Vec<Account>> {
    let accounts = match serde_json::from_str::<AccountListing>(json)? {
        AccountListing::Response { accounts } | AccountListing::Bare(accounts) => accounts,
    };
    Ok(accounts.into_iter().filter(Account::is_active).collect())
}
