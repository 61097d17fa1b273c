//! Process configuration: environment settings plus optional prompt overrides from TOML.
//!
//! Everything is read once at startup into `Settings` and handed down explicitly;
//! nothing below `main` reads the environment.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub llm: LlmSettings,
  pub bank_path: PathBuf,
  pub github: Option<GithubSettings>,
  pub prompts: Prompts,
}

/// Process-wide LLM defaults. Each may be overridden per request except the timeout.
#[derive(Clone, Debug)]
pub struct LlmSettings {
  pub api_key: Option<String>,
  pub base_url: String,
  pub model: String,
  /// Longest silence tolerated between two upstream chunks.
  pub idle_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct GithubSettings {
  pub token: String,
  pub owner: String,
  pub repo: String,
  pub base_branch: String,
  /// Path of the question bank file inside the repository.
  pub bank_path: String,
  pub api_base: String,
}

impl Settings {
  pub fn from_env() -> Self {
    let mut settings = Self::from_lookup(|key| std::env::var(key).ok());
    if let Some(cfg) = load_agent_config_from_env() {
      settings.prompts = cfg.prompts;
    }
    settings
  }

  /// Build settings from any key/value source. Empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let port = get("PORT").and_then(|p| p.parse::<u16>().ok()).unwrap_or(3000);
    let idle_secs = get("OPENAI_IDLE_TIMEOUT_SECS")
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS);

    let llm = LlmSettings {
      api_key: get("OPENAI_API_KEY"),
      base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
      model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
      idle_timeout: Duration::from_secs(idle_secs),
    };

    let github = match (get("GITHUB_TOKEN"), get("GITHUB_OWNER"), get("GITHUB_REPO")) {
      (Some(token), Some(owner), Some(repo)) => Some(GithubSettings {
        token,
        owner,
        repo,
        base_branch: get("GITHUB_BASE_BRANCH").unwrap_or_else(|| "main".into()),
        bank_path: get("GITHUB_BANK_PATH").unwrap_or_else(|| "data/questions.json".into()),
        api_base: get("GITHUB_API_BASE").unwrap_or_else(|| "https://api.github.com".into()),
      }),
      _ => None,
    };

    Self {
      port,
      llm,
      bank_path: get("QUESTION_BANK_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data/questions.json")),
      github,
      prompts: Prompts::default(),
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Default prompt templates per request kind. Placeholders use `{name}` syntax.
/// Any subset can be overridden from the TOML `[prompts]` table.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
  pub question_from_title_user_template: String,
  pub model_answer_system: String,
  pub model_answer_user_template: String,
  pub model_answer_text_system: String,
  pub model_answer_text_user_template: String,
  pub evaluation_system: String,
  pub evaluation_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You are a senior technical interviewer who writes realistic interview questions.".into(),
      question_user_template: "Write one {type} interview question in the category '{category}' at '{difficulty}' difficulty. Provide translations for these language codes: {languages}. For Coding questions include 2-4 test cases.".into(),
      question_from_title_user_template: "Turn the interview question titled \"{title}\" into a full {type} question in the category '{category}' at '{difficulty}' difficulty. Keep the title's intent. Provide translations for these language codes: {languages}. For Coding questions include 2-4 test cases.".into(),
      model_answer_system: "You are an expert candidate answering a technical interview question. Be correct, complete and concise.".into(),
      model_answer_user_template: "Question: {title}\n\n{description}\n\nWrite a model answer (markdown allowed inside the strings, code in fenced blocks) for each of these language codes: {languages}.".into(),
      model_answer_text_system: "You are an expert candidate answering a technical interview question. Answer in clear markdown.".into(),
      model_answer_text_user_template: "Question: {title}\n\n{description}\n\nWrite a model answer in language '{language}'.".into(),
      evaluation_system: "You are a strict but fair technical interviewer grading a candidate's answer.".into(),
      evaluation_user_template: "Question: {title}\n\n{description}\n\nCandidate answer:\n{answer}\n\nGrade the answer. Scores are between 0 and 1. Write feedback and improvement suggestions for each of these language codes: {languages}.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "mock_interview_backend", %path, "Loaded prompt overrides (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "mock_interview_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mock_interview_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_apply_when_env_is_empty() {
    let s = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")]));
    assert_eq!(s.port, 3000);
    assert!(s.llm.api_key.is_none());
    assert_eq!(s.llm.base_url, DEFAULT_BASE_URL);
    assert_eq!(s.llm.model, DEFAULT_MODEL);
    assert!(s.github.is_none());
  }

  #[test]
  fn github_needs_token_owner_and_repo() {
    let partial = Settings::from_lookup(lookup(&[("GITHUB_TOKEN", "t"), ("GITHUB_OWNER", "o")]));
    assert!(partial.github.is_none());

    let full = Settings::from_lookup(lookup(&[
      ("GITHUB_TOKEN", "t"), ("GITHUB_OWNER", "o"), ("GITHUB_REPO", "r"), ("PORT", "8080"),
    ]));
    let gh = full.github.expect("github settings");
    assert_eq!(gh.base_branch, "main");
    assert_eq!(gh.bank_path, "data/questions.json");
    assert_eq!(full.port, 8080);
  }

  #[test]
  fn toml_overrides_only_named_prompts() {
    let cfg: AgentConfig = toml::from_str("[prompts]\nevaluation_system = \"Grade harshly.\"\n").expect("toml");
    assert_eq!(cfg.prompts.evaluation_system, "Grade harshly.");
    assert_eq!(cfg.prompts.question_system, Prompts::default().question_system);
  }
}
