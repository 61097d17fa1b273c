//! Render reconciliation: parse results → UI phase plus the localized fields to show.
//!
//! `render` is a pure function of its inputs. `ViewStore` holds the view for the
//! latest request only; anything tagged with an older `RequestToken` is dropped.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tracing::debug;

use crate::domain::{ResponseShape, TestCase, DEFAULT_LANG};
use crate::repair::{ParsedResult, Snapshot};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiPhase {
  #[default]
  Loading,
  Streaming,
  Settled,
  Error,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreView {
  pub overall: Option<f64>,
  pub correctness: Option<f64>,
  pub efficiency: Option<f64>,
  pub readability: Option<f64>,
}

/// What the UI shows for one response.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderView {
  pub phase: UiPhase,
  pub title: Option<String>,
  pub topic: Option<String>,
  /// Question description, answer markdown, or evaluation feedback.
  pub body: Option<String>,
  pub scores: Option<ScoreView>,
  pub suggestions: Vec<String>,
  pub test_cases: Vec<TestCase>,
  /// Raw model output, kept for display when the response could not be processed.
  pub raw: Option<String>,
  pub notice: Option<String>,
}

impl RenderView {
  pub fn loading() -> Self {
    Self::default()
  }

  pub fn error(notice: impl Into<String>, raw: Option<String>) -> Self {
    Self { phase: UiPhase::Error, notice: Some(notice.into()), raw, ..Self::default() }
  }
}

pub fn render(shape: ResponseShape, result: &ParsedResult, lang: &str) -> RenderView {
  match result {
    ParsedResult::Pending => RenderView::loading(),
    ParsedResult::Partial(Snapshot::Text(text)) => RenderView {
      phase: UiPhase::Streaming,
      body: Some(text.clone()),
      ..RenderView::default()
    },
    ParsedResult::Partial(Snapshot::Json(value)) => fields(shape, value, lang, UiPhase::Streaming),
    ParsedResult::Complete(payload) => match serde_json::to_value(payload) {
      Ok(tagged) => {
        let data = tagged.get("data").cloned().unwrap_or(Value::Null);
        match data {
          Value::String(text) => RenderView { phase: UiPhase::Settled, body: Some(text), ..RenderView::default() },
          other => fields(shape, &other, lang, UiPhase::Settled),
        }
      }
      Err(e) => RenderView::error(format!("could not render response: {e}"), None),
    },
    ParsedResult::Failed(failure) => RenderView::error(
      format!("Could not process the response ({})", failure.reason),
      Some(failure.raw.clone()),
    ),
  }
}

fn fields(shape: ResponseShape, v: &Value, lang: &str, phase: UiPhase) -> RenderView {
  let mut view = RenderView { phase, ..RenderView::default() };
  match shape {
    ResponseShape::Question => {
      if let Some(tr) = v.get("translations") {
        let entry = tr.get(lang).filter(|e| e.is_object()).or_else(|| tr.get(DEFAULT_LANG));
        if let Some(entry) = entry {
          view.title = str_field(entry, "title");
          view.body = str_field(entry, "description");
          view.topic = str_field(entry, "topic");
        }
      }
      view.test_cases = v
        .get("testCases")
        .and_then(Value::as_array)
        .map(|cases| {
          cases
            .iter()
            .filter_map(|c| Some(TestCase { input: str_field(c, "input")?, output: str_field(c, "output")? }))
            .collect()
        })
        .unwrap_or_default();
    }
    ResponseShape::ModelAnswer => {
      view.body = v.get("answer").and_then(|m| pick_localized(m, lang));
    }
    ResponseShape::Evaluation => {
      view.body = v.get("feedback").and_then(|m| pick_localized(m, lang));
      let cat = v.get("categoryScores");
      let score = |parent: Option<&Value>, key: &str| parent.and_then(|p| p.get(key)).and_then(Value::as_f64);
      let scores = ScoreView {
        overall: score(Some(v), "overallScore"),
        correctness: score(cat, "correctness"),
        efficiency: score(cat, "efficiency"),
        readability: score(cat, "readability"),
      };
      if scores != ScoreView::default() {
        view.scores = Some(scores);
      }
      view.suggestions = v
        .get("improvementSuggestions")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|m| pick_localized(m, lang)).collect())
        .unwrap_or_default();
    }
    ResponseShape::Text => {
      view.body = v.as_str().map(str::to_string);
    }
  }
  view
}

fn str_field(v: &Value, key: &str) -> Option<String> {
  v.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Requested language, falling back to `en`.
pub fn pick_localized(map: &Value, lang: &str) -> Option<String> {
  map
    .get(lang)
    .and_then(Value::as_str)
    .or_else(|| map.get(DEFAULT_LANG).and_then(Value::as_str))
    .map(str::to_string)
}

/// Identifies one user-initiated request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

/// Hands out request tokens; only the most recent one is current.
///
/// Backed by a watch channel so a superseded reader can be woken while it waits.
#[derive(Debug)]
pub struct RequestGate {
  latest: watch::Sender<u64>,
}

impl Default for RequestGate {
  fn default() -> Self {
    Self { latest: watch::channel(0).0 }
  }
}

impl RequestGate {
  pub fn begin(&self) -> RequestToken {
    let mut next = 0;
    self.latest.send_modify(|v| {
      *v += 1;
      next = *v;
    });
    RequestToken(next)
  }

  pub fn is_current(&self, token: RequestToken) -> bool {
    *self.latest.borrow() == token.0
  }

  /// Resolves once a newer request has begun.
  pub async fn superseded(&self, token: RequestToken) {
    let mut rx = self.latest.subscribe();
    let _ = rx.wait_for(|v| *v != token.0).await;
  }
}

/// UI state for one panel (question, answer or evaluation).
#[derive(Debug)]
pub struct ViewStore {
  gate: RequestGate,
  language: String,
  view: RwLock<RenderView>,
}

impl ViewStore {
  pub fn new(language: impl Into<String>) -> Self {
    Self { gate: RequestGate::default(), language: language.into(), view: RwLock::new(RenderView::loading()) }
  }

  /// Start a new request; every older token becomes stale.
  pub async fn begin(&self) -> RequestToken {
    let mut view = self.view.write().await;
    let token = self.gate.begin();
    *view = RenderView::loading();
    token
  }

  pub fn is_current(&self, token: RequestToken) -> bool {
    self.gate.is_current(token)
  }

  /// Resolves once `token` is no longer the latest request.
  pub async fn superseded(&self, token: RequestToken) {
    self.gate.superseded(token).await
  }

  /// Render and store `result` if `token` is still current. Returns whether it was applied.
  pub async fn apply(&self, token: RequestToken, shape: ResponseShape, result: &ParsedResult) -> bool {
    let next = render(shape, result, &self.language);
    self.replace(token, next).await
  }

  /// Move the view to the error phase, e.g. after a network failure.
  pub async fn fail(&self, token: RequestToken, notice: impl Into<String>, raw: Option<String>) -> bool {
    self.replace(token, RenderView::error(notice, raw)).await
  }

  async fn replace(&self, token: RequestToken, next: RenderView) -> bool {
    let mut view = self.view.write().await;
    if !self.gate.is_current(token) {
      debug!(target: "stream", ?token, "Dropping update from superseded request");
      return false;
    }
    *view = next;
    true
  }

  pub async fn snapshot(&self) -> RenderView {
    self.view.read().await.clone()
  }
}
