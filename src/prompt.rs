//! Prompt composition: `RequestKind` + parameters → `[System, User]` messages and a temperature.
//!
//! Pure construction, no I/O.

use serde::{Deserialize, Serialize};

use crate::config::Prompts;
use crate::domain::{Difficulty, QuestionType, RequestKind, DEFAULT_LANG};
use crate::schema::shape_description;
use crate::util::fill_template;

/// Structured extraction from a known title: schema conformance over variety.
pub const QUESTION_FROM_TITLE_TEMPERATURE: f32 = 0.3;
pub const QUESTION_TEMPERATURE: f32 = 0.9;
pub const MODEL_ANSWER_TEMPERATURE: f32 = 0.7;
pub const EVALUATION_TEMPERATURE: f32 = 0.3;

pub const JSON_OUTPUT_RULES: &str = "Output rules:
- Respond with a single JSON object and nothing else.
- Do NOT wrap the JSON in markdown code fences (no ```).
- The response must be directly parseable by a JSON parser.";

pub const MARKDOWN_OUTPUT_RULES: &str = "Output rules:
- Respond with markdown that can be rendered directly.
- Do NOT wrap the whole response in a code fence; use fenced blocks only for code snippets.
- No preamble and no closing remarks.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
}

impl ChatMessage {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }
  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }
}

/// The question an answer or evaluation refers to.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionContext {
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, rename = "type")]
  pub kind: Option<QuestionType>,
}

/// Everything a prompt may be parameterized by. Fields a kind does not use are ignored.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptParams {
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub difficulty: Option<Difficulty>,
  #[serde(default, rename = "type")]
  pub question_type: Option<QuestionType>,
  /// Title hint, e.g. picked from the question bank.
  #[serde(default)]
  pub title: Option<String>,
  /// UI language; structured responses always include `en` as well.
  #[serde(default)]
  pub language: Option<String>,
  #[serde(default)]
  pub question: Option<QuestionContext>,
  #[serde(default)]
  pub answer: Option<String>,
  #[serde(default)]
  pub system_prompt: Option<String>,
  #[serde(default)]
  pub user_prompt: Option<String>,
}

impl PromptParams {
  /// `en` first, then the requested language if it differs.
  pub fn languages(&self) -> Vec<String> {
    let mut langs = vec![DEFAULT_LANG.to_string()];
    if let Some(lang) = self.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
      if lang != DEFAULT_LANG {
        langs.push(lang.to_string());
      }
    }
    langs
  }

  fn title_hint(&self) -> Option<&str> {
    self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComposedPrompt {
  pub kind: RequestKind,
  pub messages: Vec<ChatMessage>,
  pub temperature: f32,
  /// Ask the provider for JSON-object mode.
  pub json_mode: bool,
}

pub fn temperature_for(kind: RequestKind, params: &PromptParams) -> f32 {
  match kind {
    RequestKind::Question if params.title_hint().is_some() => QUESTION_FROM_TITLE_TEMPERATURE,
    RequestKind::Question => QUESTION_TEMPERATURE,
    RequestKind::ModelAnswerStructured | RequestKind::ModelAnswerText => MODEL_ANSWER_TEMPERATURE,
    RequestKind::Evaluation => EVALUATION_TEMPERATURE,
  }
}

pub fn compose(kind: RequestKind, params: &PromptParams, prompts: &Prompts) -> ComposedPrompt {
  let rules = if kind.is_structured() { JSON_OUTPUT_RULES } else { MARKDOWN_OUTPUT_RULES };
  let shape = shape_description(kind.shape())
    .map(|s| format!("Required JSON shape:\n{s}\n\n"))
    .unwrap_or_default();

  let system = match params.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
    Some(custom) => format!("{custom}\n\n{shape}{rules}"),
    None => format!("{}\n\n{shape}{rules}", default_system(kind, prompts)),
  };

  let vars = template_vars(params);
  let pairs: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
  let user_tpl = match params.user_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
    Some(custom) => custom,
    None => default_user_template(kind, params, prompts),
  };
  let user = fill_template(user_tpl, &pairs);

  ComposedPrompt {
    kind,
    messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
    temperature: temperature_for(kind, params),
    json_mode: kind.is_structured(),
  }
}

fn default_system(kind: RequestKind, prompts: &Prompts) -> &str {
  match kind {
    RequestKind::Question => &prompts.question_system,
    RequestKind::ModelAnswerStructured => &prompts.model_answer_system,
    RequestKind::ModelAnswerText => &prompts.model_answer_text_system,
    RequestKind::Evaluation => &prompts.evaluation_system,
  }
}

fn default_user_template<'a>(kind: RequestKind, params: &PromptParams, prompts: &'a Prompts) -> &'a str {
  match kind {
    RequestKind::Question if params.title_hint().is_some() => &prompts.question_from_title_user_template,
    RequestKind::Question => &prompts.question_user_template,
    RequestKind::ModelAnswerStructured => &prompts.model_answer_user_template,
    RequestKind::ModelAnswerText => &prompts.model_answer_text_user_template,
    RequestKind::Evaluation => &prompts.evaluation_user_template,
  }
}

fn template_vars(params: &PromptParams) -> Vec<(&'static str, String)> {
  let question = params.question.clone().unwrap_or_default();
  let question_type = params
    .question_type
    .or(question.kind)
    .unwrap_or(QuestionType::Coding);
  let title = params
    .title_hint()
    .map(str::to_string)
    .unwrap_or_else(|| question.title.clone());

  vec![
    ("category", params.category.clone().unwrap_or_else(|| "General".into())),
    ("difficulty", params.difficulty.unwrap_or(Difficulty::Medium).as_str().to_string()),
    ("type", question_type.as_str().to_string()),
    ("title", title),
    ("description", question.description),
    ("answer", params.answer.clone().unwrap_or_default()),
    ("languages", params.languages().join(", ")),
    ("language", params.languages().last().cloned().unwrap_or_else(|| DEFAULT_LANG.into())),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params() -> PromptParams {
    PromptParams {
      category: Some("Algorithms".into()),
      difficulty: Some(Difficulty::Easy),
      question_type: Some(QuestionType::Coding),
      ..Default::default()
    }
  }

  #[test]
  fn messages_are_system_then_user() {
    let p = compose(RequestKind::Question, &params(), &Prompts::default());
    let roles: Vec<Role> = p.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User]);
    assert!(p.messages[1].content.contains("'Algorithms'"));
    assert!(p.messages[1].content.contains("'Easy'"));
    assert!(p.json_mode);
  }

  #[test]
  fn custom_system_prompt_is_kept_verbatim_with_rules_appended() {
    let mut ps = params();
    ps.system_prompt = Some("You only ask about Rust.".into());
    let p = compose(RequestKind::Evaluation, &ps, &Prompts::default());
    let system = &p.messages[0].content;
    assert!(system.starts_with("You only ask about Rust.\n\n"));
    assert!(system.ends_with(JSON_OUTPUT_RULES));
    assert!(system.contains("overallScore"));
  }

  #[test]
  fn free_text_answers_get_markdown_rules() {
    let mut ps = params();
    ps.system_prompt = Some("Be brief.".into());
    ps.language = Some("ja".into());
    let p = compose(RequestKind::ModelAnswerText, &ps, &Prompts::default());
    assert!(p.messages[0].content.ends_with(MARKDOWN_OUTPUT_RULES));
    assert!(!p.messages[0].content.contains("Required JSON shape"));
    assert!(p.messages[1].content.contains("'ja'"));
    assert!(!p.json_mode);
  }

  #[test]
  fn title_hint_switches_to_extraction_template_and_low_temperature() {
    let plain = compose(RequestKind::Question, &params(), &Prompts::default());
    assert_eq!(plain.temperature, QUESTION_TEMPERATURE);

    let mut ps = params();
    ps.title = Some("Two Sum".into());
    let titled = compose(RequestKind::Question, &ps, &Prompts::default());
    assert_eq!(titled.temperature, QUESTION_FROM_TITLE_TEMPERATURE);
    assert!(titled.messages[1].content.contains("\"Two Sum\""));
  }

  #[test]
  fn custom_user_prompt_gets_placeholders_filled() {
    let mut ps = params();
    ps.user_prompt = Some("Ask about {category} in {languages}".into());
    ps.language = Some("fr".into());
    let p = compose(RequestKind::Question, &ps, &Prompts::default());
    assert_eq!(p.messages[1].content, "Ask about Algorithms in en, fr");
  }

  #[test]
  fn evaluation_prompt_carries_question_and_answer() {
    let mut ps = params();
    ps.question = Some(QuestionContext {
      title: "Reverse a String".into(),
      description: "Return it reversed.".into(),
      kind: Some(QuestionType::Coding),
    });
    ps.answer = Some("s[::-1]".into());
    let p = compose(RequestKind::Evaluation, &ps, &Prompts::default());
    assert_eq!(p.temperature, EVALUATION_TEMPERATURE);
    assert!(p.messages[1].content.contains("Reverse a String"));
    assert!(p.messages[1].content.contains("s[::-1]"));
  }
}
