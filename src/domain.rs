//! Domain models: request kinds, interview questions, model answers and evaluations.
//!
//! Wire names are camelCase to match what the browser UI and the LLM prompts use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Language code that must always be present in localized maps.
pub const DEFAULT_LANG: &str = "en";

/// Language code → localized string.
pub type Localized = BTreeMap<String, String>;

/// The closed set of things a streamed completion can be asked to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
  /// Generate (or extract from a title) one interview question as JSON.
  Question,
  /// Model answer as a JSON object with localized answers.
  ModelAnswerStructured,
  /// Model answer as free markdown text.
  ModelAnswerText,
  /// Evaluate a candidate answer as JSON with scores and feedback.
  Evaluation,
}

impl RequestKind {
  /// Shape of the terminal object this kind produces.
  pub fn shape(self) -> ResponseShape {
    match self {
      RequestKind::Question => ResponseShape::Question,
      RequestKind::ModelAnswerStructured => ResponseShape::ModelAnswer,
      RequestKind::ModelAnswerText => ResponseShape::Text,
      RequestKind::Evaluation => ResponseShape::Evaluation,
    }
  }

  pub fn is_structured(self) -> bool {
    !matches!(self.shape(), ResponseShape::Text)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      RequestKind::Question => "question",
      RequestKind::ModelAnswerStructured => "model_answer_structured",
      RequestKind::ModelAnswerText => "model_answer_text",
      RequestKind::Evaluation => "evaluation",
    }
  }
}

impl std::fmt::Display for RequestKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Which schema (if any) governs the accumulated text of a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseShape {
  Question,
  ModelAnswer,
  Evaluation,
  /// Free markdown; never parsed.
  Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
  Coding,
  Question,
}

impl QuestionType {
  pub fn as_str(self) -> &'static str {
    match self {
      QuestionType::Coding => "Coding",
      QuestionType::Question => "Question",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionTranslation {
  pub title: String,
  pub description: String,
  pub topic: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
  pub input: String,
  pub output: String,
}

/// An interview question as generated by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub category: String,
  pub difficulty: Difficulty,
  pub translations: BTreeMap<String, QuestionTranslation>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub test_cases: Option<Vec<TestCase>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
  pub correctness: f64,
  pub efficiency: f64,
  pub readability: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
  pub overall_score: f64,
  pub category_scores: CategoryScores,
  pub feedback: Localized,
  #[serde(default)]
  pub improvement_suggestions: Vec<Localized>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelAnswer {
  pub answer: Localized,
}

/// One line of the flat question bank file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BankEntry {
  pub title: String,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub category: Vec<String>,
  pub difficulty: String,
}
