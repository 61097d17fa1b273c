//! Application state shared by all handlers.
//!
//! This module owns:
//!   - the settings read at startup (prompts included)
//!   - the LLM client with its process-wide defaults
//!   - the on-disk question bank
//!   - the optional contribution client
//!   - the in-memory registry of generated questions

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::bank::QuestionBank;
use crate::config::Settings;
use crate::domain::Question;
use crate::error::Result;
use crate::github::GithubClient;
use crate::openai::OpenAI;

pub struct AppState {
  pub settings: Settings,
  pub llm: OpenAI,
  pub bank: QuestionBank,
  pub github: Option<GithubClient>,
  generated: Arc<RwLock<Vec<Question>>>,
}

impl AppState {
  #[instrument(level = "info", skip_all)]
  pub fn new(settings: Settings) -> Result<Self> {
    let llm = OpenAI::new(settings.llm.clone())?;
    if settings.llm.api_key.is_some() {
      info!(target: "mock_interview_backend", base_url = %settings.llm.base_url, model = %settings.llm.model, "LLM default key configured");
    } else {
      info!(target: "mock_interview_backend", base_url = %settings.llm.base_url, model = %settings.llm.model, "No OPENAI_API_KEY; requests must carry apiKey");
    }

    let bank = QuestionBank::new(settings.bank_path.clone());
    info!(target: "bank", path = %bank.path().display(), "Question bank location");

    let github = settings.github.clone().map(GithubClient::new);
    match &github {
      Some(gh) => info!(target: "github", owner = %gh.settings().owner, repo = %gh.settings().repo, "Contributions enabled"),
      None => info!(target: "github", "Contributions disabled (GITHUB_TOKEN/OWNER/REPO not set)"),
    }

    Ok(Self { settings, llm, bank, github, generated: Arc::new(RwLock::new(Vec::new())) })
  }

  /// Append to the registry; the same id twice keeps only the first copy.
  #[instrument(level = "debug", skip(self, q), fields(id = %q.id))]
  pub async fn record_generated(&self, q: Question) -> bool {
    let mut list = self.generated.write().await;
    if list.iter().any(|existing| existing.id == q.id) {
      return false;
    }
    list.push(q);
    info!(target: "bank", count = list.len(), "Generated question recorded");
    true
  }

  pub async fn generated_questions(&self) -> Vec<Question> {
    self.generated.read().await.clone()
  }
}
