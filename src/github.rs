//! Contribution flow: add a bank entry to the shared repository through a pull request.
//!
//! Runs five sequential REST calls: resolve the base ref, create a branch, read the
//! bank file on that branch, write it back with the new entry, and open the PR.
//! Any failing step aborts the flow; a created branch is left behind.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{
  header::{ACCEPT, AUTHORIZATION, USER_AGENT},
  Method, RequestBuilder, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::config::GithubSettings;
use crate::domain::BankEntry;
use crate::error::{AppError, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Contribution {
  pub branch: String,
  pub pr_url: String,
  pub pr_number: u64,
}

#[derive(Clone)]
pub struct GithubClient {
  http: reqwest::Client,
  settings: GithubSettings,
}

#[derive(Deserialize)]
struct RefOut {
  object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
  sha: String,
}

#[derive(Deserialize)]
struct ContentsOut {
  content: String,
  sha: String,
}

#[derive(Deserialize)]
struct PullOut {
  html_url: String,
  number: u64,
}

impl GithubClient {
  pub fn new(settings: GithubSettings) -> Self {
    Self { http: reqwest::Client::new(), settings }
  }

  pub fn settings(&self) -> &GithubSettings {
    &self.settings
  }

  fn repo_url(&self, tail: &str) -> String {
    format!(
      "{}/repos/{}/{}/{}",
      self.settings.api_base.trim_end_matches('/'),
      self.settings.owner,
      self.settings.repo,
      tail
    )
  }

  fn request(&self, method: Method, url: String) -> RequestBuilder {
    self.http.request(method, url)
      .header(AUTHORIZATION, format!("Bearer {}", self.settings.token))
      .header(ACCEPT, "application/vnd.github+json")
      .header(USER_AGENT, "mock-interview-backend/0.1")
  }

  #[instrument(level = "info", skip(self, entry), fields(title = %entry.title))]
  pub async fn contribute(&self, entry: &BankEntry) -> Result<Contribution> {
    let base = &self.settings.base_branch;
    let path = &self.settings.bank_path;

    // 1) base ref
    let base_ref: RefOut = read_json(self.request(Method::GET, self.repo_url(&format!("git/ref/heads/{base}")))).await?;

    // 2) branch
    let branch = branch_name(&entry.title);
    let res = self.request(Method::POST, self.repo_url("git/refs"))
      .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": base_ref.object.sha }))
      .send().await?;
    check(res).await?;

    // 3) current bank on the new branch; a missing file starts empty
    let res = self.request(Method::GET, self.repo_url(&format!("contents/{path}")))
      .query(&[("ref", branch.as_str())])
      .send().await?;
    let (mut entries, file_sha) = if res.status() == StatusCode::NOT_FOUND {
      (Vec::new(), None)
    } else {
      let contents: ContentsOut = check(res).await?.json().await?;
      (decode_bank(&contents.content)?, Some(contents.sha))
    };

    // 4) write back
    entries.push(entry.clone());
    let body = serde_json::to_string_pretty(&entries)?;
    let mut put = json!({
      "message": format!("Add question: {}", entry.title),
      "content": STANDARD.encode(body.as_bytes()),
      "branch": branch,
    });
    if let Some(sha) = file_sha {
      put["sha"] = json!(sha);
    }
    let res = self.request(Method::PUT, self.repo_url(&format!("contents/{path}"))).json(&put).send().await?;
    check(res).await?;

    // 5) pull request
    let pr: PullOut = read_json(
      self.request(Method::POST, self.repo_url("pulls")).json(&json!({
        "title": format!("Add question: {}", entry.title),
        "head": branch,
        "base": base,
        "body": format!(
          "Adds **{}** ({}, {}) to the question bank.\n\nCategories: {}",
          entry.title, entry.kind, entry.difficulty, entry.category.join(", ")
        ),
      })),
    )
    .await?;

    info!(target: "github", %branch, pr = pr.number, url = %pr.html_url, "Contribution PR opened");
    Ok(Contribution { branch, pr_url: pr.html_url, pr_number: pr.number })
  }
}

async fn read_json<T: for<'de> Deserialize<'de>>(req: RequestBuilder) -> Result<T> {
  let res = check(req.send().await?).await?;
  Ok(res.json::<T>().await?)
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response> {
  let status = res.status();
  if status.is_success() {
    return Ok(res);
  }
  let url = res.url().path().to_string();
  let body = res.text().await.unwrap_or_default();
  let message = serde_json::from_str::<serde_json::Value>(&body)
    .ok()
    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
    .unwrap_or(body);
  warn!(target: "github", status = status.as_u16(), %url, "GitHub call failed");
  let msg = format!("GitHub HTTP {} on {}: {}", status.as_u16(), url, message);
  Err(if status == StatusCode::TOO_MANY_REQUESTS {
    AppError::UpstreamRateLimited(msg)
  } else {
    AppError::Upstream(msg)
  })
}

/// Contents API payloads are base64 wrapped at 60 columns.
fn decode_bank(content: &str) -> Result<Vec<BankEntry>> {
  let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
  let bytes = STANDARD
    .decode(compact.as_bytes())
    .map_err(|e| AppError::Upstream(format!("bank file is not valid base64: {e}")))?;
  if bytes.iter().all(u8::is_ascii_whitespace) {
    return Ok(Vec::new());
  }
  Ok(serde_json::from_slice(&bytes)?)
}

fn branch_name(title: &str) -> String {
  let mut slug = String::new();
  for c in title.chars() {
    if c.is_ascii_alphanumeric() {
      slug.push(c.to_ascii_lowercase());
    } else if !slug.ends_with('-') && !slug.is_empty() {
      slug.push('-');
    }
  }
  let slug: String = slug.trim_end_matches('-').chars().take(40).collect();
  let suffix = uuid::Uuid::new_v4().simple().to_string();
  let slug = if slug.is_empty() { "question".to_string() } else { slug };
  format!("contribute/{}-{}", slug, &suffix[..8])
}
