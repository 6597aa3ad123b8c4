use std::thread;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    StatusCode,
    blocking::{Client, RequestBuilder},
    header::ACCEPT,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    domain::{GitHubAccount, ItemKind, ItemState, RawItem},
    pipeline::ItemSource,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_WEB_URL: &str = "https://github.com";
const ENTERPRISE_API_SUFFIX: &str = "/api/v3";
const USER_AGENT_HEADER: &str = "ghstatus/0.1";
const GITHUB_JSON: &str = "application/vnd.github+json";
const PER_PAGE: usize = 100;
const PER_PAGE_PARAM: &str = "100";
// The search API stops at 1000 results.
const MAX_PAGES: u32 = 10;

pub fn build_client() -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(USER_AGENT_HEADER)
        .build()
        .map_err(FetchError::Http)
}

/// Checks the token against `GET /user` and returns the account it belongs to.
pub fn verify_account(
    client: &Client,
    api_url: &str,
    token: &str,
) -> Result<GitHubAccount, FetchError> {
    if token.trim().is_empty() {
        return Err(FetchError::MissingToken);
    }

    let response = client
        .get(format!("{}/user", api_url.trim_end_matches('/')))
        .header(ACCEPT, GITHUB_JSON)
        .bearer_auth(token)
        .send()?;
    if response.status() == StatusCode::UNAUTHORIZED {
        return Err(FetchError::CredentialRejected);
    }
    let user: GitHubUser = response.error_for_status()?.json()?;
    debug!(login = %user.login, "GitHub credentials verified");

    Ok(GitHubAccount {
        login: user.login,
        token: token.to_owned(),
    })
}

/// Open pull requests involving `login`, one query per relationship.
pub fn pull_request_queries(login: &str) -> Vec<String> {
    vec![
        format!("is:pr is:open author:{login}"),
        format!("is:pr is:open review-requested:{login}"),
        format!("is:pr is:open mentions:{login}"),
        format!("is:pr is:open assignee:{login}"),
    ]
}

/// Open issues involving `login`, one query per relationship.
pub fn issue_queries(login: &str) -> Vec<String> {
    vec![
        format!("is:issue is:open author:{login}"),
        format!("is:issue is:open assignee:{login}"),
        format!("is:issue is:open mentions:{login}"),
    ]
}

/// Item source backed by the GitHub REST API.
pub struct GitHubSource {
    client: Client,
    api_url: String,
    web_url: String,
    account: GitHubAccount,
}

impl GitHubSource {
    pub fn new(client: Client, api_url: &str, account: GitHubAccount) -> Self {
        let api_url = api_url.trim_end_matches('/').to_owned();
        let web_url = web_url_for(&api_url);
        Self {
            client,
            api_url,
            web_url,
            account,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.api_url))
            .header(ACCEPT, GITHUB_JSON)
            .bearer_auth(&self.account.token)
    }

    /// Runs the queries concurrently and concatenates their results in query
    /// order. Any failing query fails the whole source.
    fn search_all(&self, queries: &[String], kind: ItemKind) -> Result<Vec<RawItem>, FetchError> {
        let batches: Vec<Result<Vec<RawItem>, FetchError>> = thread::scope(|scope| {
            let handles: Vec<_> = queries
                .iter()
                .map(|query| scope.spawn(move || self.search(query, kind)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(FetchError::BackgroundWorkerGone))
                })
                .collect()
        });

        let mut items = Vec::new();
        for batch in batches {
            items.extend(batch?);
        }
        Ok(items)
    }

    fn search(&self, query: &str, kind: ItemKind) -> Result<Vec<RawItem>, FetchError> {
        let values = collect_pages(|page| {
            let page = page.to_string();
            let response: SearchResponse = self
                .get("/search/issues")
                .query(&[
                    ("q", query),
                    ("sort", "updated"),
                    ("order", "desc"),
                    ("per_page", PER_PAGE_PARAM),
                    ("page", page.as_str()),
                ])
                .send()?
                .error_for_status()?
                .json()?;
            Ok(response.items)
        })?;
        debug!(kind = kind.label(), query, results = values.len(), "search finished");

        Ok(decode_all(values, |value| decode_search_item(value, &self.api_url)))
    }
}

impl ItemSource for GitHubSource {
    type Error = FetchError;

    fn fetch_pull_requests(&self) -> Result<Vec<RawItem>, FetchError> {
        let queries = pull_request_queries(&self.account.login);
        self.search_all(&queries, ItemKind::PullRequest)
    }

    fn fetch_issues(&self) -> Result<Vec<RawItem>, FetchError> {
        let queries = issue_queries(&self.account.login);
        self.search_all(&queries, ItemKind::Issue)
    }

    fn fetch_notifications(&self, since: DateTime<Utc>) -> Result<Vec<RawItem>, FetchError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let values = collect_pages(|page| {
            let page = page.to_string();
            let batch: Vec<Value> = self
                .get("/notifications")
                .query(&[
                    ("all", "false"),
                    ("participating", "false"),
                    ("since", since.as_str()),
                    ("per_page", PER_PAGE_PARAM),
                    ("page", page.as_str()),
                ])
                .send()?
                .error_for_status()?
                .json()?;
            Ok(batch)
        })?;
        debug!(results = values.len(), "notifications fetched");

        Ok(decode_all(values, |value| {
            decode_notification(value, &self.api_url, &self.web_url)
        }))
    }
}

/// Requests pages starting at 1 until a short page comes back or the page cap
/// is reached.
fn collect_pages<F>(mut fetch_page: F) -> Result<Vec<Value>, FetchError>
where
    F: FnMut(u32) -> Result<Vec<Value>, FetchError>,
{
    let mut values = Vec::new();
    for page in 1..=MAX_PAGES {
        let batch = fetch_page(page)?;
        let full_page = batch.len() >= PER_PAGE;
        values.extend(batch);
        if !full_page {
            break;
        }
    }
    Ok(values)
}

/// Decodes each item on its own; undecodable items are logged and skipped.
fn decode_all<F>(values: Vec<Value>, decode: F) -> Vec<RawItem>
where
    F: Fn(Value) -> Result<RawItem, DecodeError>,
{
    values
        .into_iter()
        .filter_map(|value| match decode(value) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!("skipping undecodable item: {err}");
                None
            }
        })
        .collect()
}

fn decode_search_item(value: Value, api_url: &str) -> Result<RawItem, DecodeError> {
    let item: SearchItem = serde_json::from_value(value)?;
    let updated_at = parse_timestamp(&item.updated_at)?;

    Ok(RawItem {
        id: item.id.to_string(),
        title: format!("#{} {}", item.number, item.title),
        url: item.html_url,
        repository: extract_repo_name(api_url, &item.repository_url),
        updated_at,
        author: item.user.map(|user| user.login),
        draft: item.draft,
        state: Some(ItemState::from_wire(&item.state)),
        reason: None,
    })
}

fn decode_notification(
    value: Value,
    api_url: &str,
    web_url: &str,
) -> Result<RawItem, DecodeError> {
    let item: NotificationResponse = serde_json::from_value(value)?;
    let updated_at = parse_timestamp(&item.updated_at)?;

    let repository = item.repository.as_ref().map(|repo| repo.full_name.clone());
    let url = item
        .subject
        .url
        .as_deref()
        .map(|url| html_url(api_url, web_url, url))
        .or_else(|| item.repository.as_ref().and_then(|repo| repo.html_url.clone()))
        .or_else(|| repository.as_ref().map(|name| format!("{web_url}/{name}")))
        .unwrap_or_default();

    Ok(RawItem {
        id: item.id,
        title: item.subject.title,
        url,
        repository,
        updated_at,
        author: None,
        draft: None,
        state: None,
        reason: Some(item.reason),
    })
}

/// Accepts RFC 3339 timestamps only; values without an offset are rejected.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| DecodeError::Timestamp(raw.to_owned()))
}

fn extract_repo_name(api_url: &str, repository_url: &str) -> Option<String> {
    repository_url
        .strip_prefix(api_url)
        .and_then(|rest| rest.strip_prefix("/repos/"))
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}

fn html_url(api_url: &str, web_url: &str, api_link: &str) -> String {
    let html = match api_link
        .strip_prefix(api_url)
        .and_then(|rest| rest.strip_prefix("/repos"))
    {
        Some(rest) => format!("{web_url}{rest}"),
        None => api_link.to_owned(),
    };
    // Notification subjects point at `/pulls/N`, but the page lives at `/pull/N`.
    html.replace("/pulls/", "/pull/")
}

fn web_url_for(api_url: &str) -> String {
    if api_url == DEFAULT_API_URL {
        DEFAULT_WEB_URL.to_owned()
    } else {
        api_url
            .strip_suffix(ENTERPRISE_API_SUFFIX)
            .unwrap_or(api_url)
            .to_owned()
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(
        "GITHUB_TOKEN is not set; create a personal access token at https://github.com/settings/tokens"
    )]
    MissingToken,
    #[error("GitHub rejected the token; check that it is valid and has the repo and notifications scopes")]
    CredentialRejected,
    #[error("Background worker disconnected before returning a result")]
    BackgroundWorkerGone,
}

#[derive(Error, Debug)]
enum DecodeError {
    #[error("unexpected item shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("timestamp {0:?} is not RFC 3339 with an offset")]
    Timestamp(String),
}

// Response payloads ---------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NotificationResponse {
    id: String,
    reason: String,
    updated_at: String,
    subject: NotificationSubject,
    repository: Option<NotificationRepository>,
}

#[derive(Debug, Deserialize)]
struct NotificationSubject {
    title: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotificationRepository {
    full_name: String,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: u64,
    html_url: String,
    repository_url: String,
    title: String,
    number: u64,
    updated_at: String,
    user: Option<GitHubUser>,
    state: String,
    #[serde(default)]
    draft: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

// -------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------
