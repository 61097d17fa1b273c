//! Public HTTP request/response structs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{BankEntry, Question, RequestKind};
use crate::openai::LlmOverride;
use crate::prompt::PromptParams;
use crate::repair::ParsedResult;

/// Body of `/api/v1/stream` and `/api/v1/complete`.
///
/// `kind` picks schema and prompt template; prompt parameters and credential
/// overrides sit next to it at the top level.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StreamRequest {
  pub kind: RequestKind,
  #[serde(flatten)]
  pub params: PromptParams,
  #[serde(flatten)]
  pub credentials: LlmOverride,
}

#[derive(Debug, Serialize)]
pub struct CompleteOut {
  pub kind: RequestKind,
  pub result: ParsedResult,
}

/// Query for `GET /api/v1/questions/bank`. All filters are case-insensitive.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BankQuery {
  #[serde(default, rename = "type")]
  pub kind: Option<String>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub difficulty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BankPickOut {
  pub entry: Option<BankEntry>,
}

#[derive(Debug, Serialize)]
pub struct BankAppendOut {
  pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct GeneratedOut {
  pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct ContributeIn {
  pub entry: BankEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributeOut {
  pub branch: String,
  pub pr_url: String,
  pub pr_number: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
  pub ok: bool,
  pub llm_configured: bool,
  pub contribution_enabled: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, QuestionType};
  use serde_json::json;

  #[test]
  fn stream_request_reads_flat_body() {
    let req: StreamRequest = serde_json::from_value(json!({
      "kind": "question",
      "category": "Algorithms",
      "difficulty": "Easy",
      "type": "Coding",
      "language": "fr",
      "apiKey": "sk-test",
      "baseUrl": "http://localhost:8080/v1"
    }))
    .expect("request");
    assert_eq!(req.kind, RequestKind::Question);
    assert_eq!(req.params.difficulty, Some(Difficulty::Easy));
    assert_eq!(req.params.question_type, Some(QuestionType::Coding));
    assert_eq!(req.credentials.api_key.as_deref(), Some("sk-test"));
    assert!(req.credentials.model.is_none());
  }

  #[test]
  fn evaluation_request_carries_question_context() {
    let req: StreamRequest = serde_json::from_value(json!({
      "kind": "evaluation",
      "question": { "title": "Two Sum", "description": "Find indices", "type": "Coding" },
      "answer": "use a map"
    }))
    .expect("request");
    let q = req.params.question.expect("question");
    assert_eq!(q.title, "Two Sum");
    assert_eq!(req.params.answer.as_deref(), Some("use a map"));
  }
}
