//! Response schemas: the shape descriptions embedded into prompts and the validators
//! that decide whether a parsed object is a conformant terminal result.
//!
//! Validation never repairs values. A score of 1.2 is reported, not clamped, so the
//! caller can tell a misbehaving model from a successful one.

use serde::Serialize;
use serde_json::Value;

use crate::domain::{
  EvaluationResult, Localized, ModelAnswer, Question, ResponseShape, DEFAULT_LANG,
};

pub const QUESTION_SHAPE: &str = r#"{
  "id": string,
  "type": "Coding" | "Question",
  "category": string,
  "difficulty": "Easy" | "Medium" | "Hard",
  "translations": { "<lang>": { "title": string, "description": string, "topic": string } },
  "testCases": [ { "input": string, "output": string } ]   // optional, Coding only
}
"translations" MUST contain "en"."#;

pub const MODEL_ANSWER_SHAPE: &str = r#"{
  "answer": { "<lang>": string (markdown) }
}
"answer" MUST contain "en"."#;

pub const EVALUATION_SHAPE: &str = r#"{
  "overallScore": number between 0 and 1,
  "categoryScores": { "correctness": number 0-1, "efficiency": number 0-1, "readability": number 0-1 },
  "feedback": { "<lang>": string },
  "improvementSuggestions": [ { "<lang>": string } ]
}
"feedback" MUST contain "en"."#;

/// Shape description for a schema-bound response, `None` for free text.
pub fn shape_description(shape: ResponseShape) -> Option<&'static str> {
  match shape {
    ResponseShape::Question => Some(QUESTION_SHAPE),
    ResponseShape::ModelAnswer => Some(MODEL_ANSWER_SHAPE),
    ResponseShape::Evaluation => Some(EVALUATION_SHAPE),
    ResponseShape::Text => None,
  }
}

/// A schema-conformant terminal object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
  Question(Question),
  ModelAnswer(ModelAnswer),
  Evaluation(EvaluationResult),
  Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
  pub field: String,
  pub message: String,
}

impl ValidationIssue {
  fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into() }
  }
}

impl std::fmt::Display for ValidationIssue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: {}", self.field, self.message)
  }
}

/// Validate a well-formed JSON value against the schema for `shape`.
pub fn validate(shape: ResponseShape, value: Value) -> Result<Payload, Vec<ValidationIssue>> {
  match shape {
    ResponseShape::Question => {
      let q: Question = typed(value)?;
      check_question(&q)?;
      Ok(Payload::Question(q))
    }
    ResponseShape::ModelAnswer => {
      let a: ModelAnswer = typed(value)?;
      require_default_lang("answer", &a.answer)?;
      Ok(Payload::ModelAnswer(a))
    }
    ResponseShape::Evaluation => {
      let e: EvaluationResult = typed(value)?;
      check_evaluation(&e)?;
      Ok(Payload::Evaluation(e))
    }
    ResponseShape::Text => match value {
      Value::String(s) => Ok(Payload::Text(s)),
      other => Ok(Payload::Text(other.to_string())),
    },
  }
}

fn typed<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, Vec<ValidationIssue>> {
  serde_json::from_value(value).map_err(|e| vec![ValidationIssue::new("$", e.to_string())])
}

fn check_question(q: &Question) -> Result<(), Vec<ValidationIssue>> {
  let mut issues = Vec::new();
  if !q.translations.contains_key(DEFAULT_LANG) {
    issues.push(ValidationIssue::new("translations", format!("missing \"{DEFAULT_LANG}\" entry")));
  }
  if q.category.trim().is_empty() {
    issues.push(ValidationIssue::new("category", "must not be empty"));
  }
  if issues.is_empty() { Ok(()) } else { Err(issues) }
}

pub fn check_evaluation(e: &EvaluationResult) -> Result<(), Vec<ValidationIssue>> {
  let mut issues = Vec::new();
  check_score(&mut issues, "overallScore", e.overall_score);
  check_score(&mut issues, "categoryScores.correctness", e.category_scores.correctness);
  check_score(&mut issues, "categoryScores.efficiency", e.category_scores.efficiency);
  check_score(&mut issues, "categoryScores.readability", e.category_scores.readability);
  if let Err(mut more) = require_default_lang("feedback", &e.feedback) {
    issues.append(&mut more);
  }
  if issues.is_empty() { Ok(()) } else { Err(issues) }
}

fn check_score(issues: &mut Vec<ValidationIssue>, field: &str, score: f64) {
  if !(0.0..=1.0).contains(&score) {
    issues.push(ValidationIssue::new(field, format!("score {score} outside [0, 1]")));
  }
}

fn require_default_lang(field: &str, map: &Localized) -> Result<(), Vec<ValidationIssue>> {
  if map.contains_key(DEFAULT_LANG) {
    Ok(())
  } else {
    Err(vec![ValidationIssue::new(field, format!("missing \"{DEFAULT_LANG}\" entry"))])
  }
}
