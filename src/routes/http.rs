//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs request parameters and basic result info.

use std::sync::Arc;

use axum::{
  body::Body,
  extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
  http::header,
  response::{IntoResponse, Response},
  Json,
};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::bank::check_entry;
use crate::domain::{BankEntry, ResponseShape};
use crate::error::{AppError, Result};
use crate::openai::TextStream;
use crate::prompt::compose;
use crate::protocol::*;
use crate::repair::{ParsedResult, ResponseAccumulator};
use crate::schema::{validate, Payload};
use crate::state::AppState;
use crate::util::trunc_for_log;

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
  body.map(|Json(v)| v).map_err(|e| AppError::BadRequest(e.body_text()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut {
    ok: true,
    llm_configured: state.settings.llm.api_key.is_some(),
    contribution_enabled: state.github.is_some(),
  })
}

/// Resolve credentials, compose the prompt and open the upstream stream.
async fn open_stream(state: &AppState, req: &StreamRequest) -> Result<TextStream> {
  let target = state.llm.resolve(&req.credentials)?;
  let prompt = compose(req.kind, &req.params, &state.settings.prompts);
  state.llm.stream_chat(&target, &prompt).await
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_stream(
  State(state): State<Arc<AppState>>,
  body: std::result::Result<Json<StreamRequest>, JsonRejection>,
) -> Result<Response> {
  let req = json_body(body)?;
  info!(target: "stream", kind = %req.kind, language = ?req.params.language, "Stream requested");
  let kind = req.kind;
  let deltas = open_stream(&state, &req).await?;

  // Errors after the first byte can only cut the body short; log them here.
  let relay = deltas
    .inspect_err(move |e| warn!(target: "stream", %kind, error = %e, "Relay interrupted"))
    .map_ok(Bytes::from);

  Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], Body::from_stream(relay)).into_response())
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_complete(
  State(state): State<Arc<AppState>>,
  body: std::result::Result<Json<StreamRequest>, JsonRejection>,
) -> Result<Json<CompleteOut>> {
  let req = json_body(body)?;
  let mut deltas = open_stream(&state, &req).await?;
  let mut acc = ResponseAccumulator::new(req.kind.shape());
  while let Some(delta) = deltas.next().await {
    match delta {
      Ok(text) => {
        acc.push(&text);
      }
      Err(e) => {
        warn!(
          target: "stream",
          kind = %req.kind,
          error = %e,
          received = acc.text().len(),
          partial = %trunc_for_log(acc.text(), 200),
          "Completion interrupted"
        );
        return Err(e);
      }
    }
  }
  let result = acc.finish().clone();

  if let ParsedResult::Complete(Payload::Question(q)) = &result {
    state.record_generated(q.clone()).await;
  }
  info!(target: "stream", kind = %req.kind, settled = matches!(result, ParsedResult::Complete(_)), "Completion settled");
  Ok(Json(CompleteOut { kind: req.kind, result }))
}

#[instrument(level = "info", skip(state, query))]
pub async fn http_get_bank(
  State(state): State<Arc<AppState>>,
  query: std::result::Result<Query<BankQuery>, QueryRejection>,
) -> Result<Json<BankPickOut>> {
  let Query(q) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
  let entry = state.bank.pick(&q).await?;
  info!(target: "bank", found = entry.is_some(), kind = ?q.kind, category = ?q.category, difficulty = ?q.difficulty, "Bank pick");
  Ok(Json(BankPickOut { entry }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_bank(
  State(state): State<Arc<AppState>>,
  body: std::result::Result<Json<BankEntry>, JsonRejection>,
) -> Result<Json<BankAppendOut>> {
  let entry = json_body(body)?;
  let count = state.bank.append(entry).await?;
  Ok(Json(BankAppendOut { count }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_generated(State(state): State<Arc<AppState>>) -> Json<GeneratedOut> {
  Json(GeneratedOut { questions: state.generated_questions().await })
}

/// Register a question the browser streamed and settled itself. Validated like any response.
#[instrument(level = "info", skip(state, body))]
pub async fn http_post_generated(
  State(state): State<Arc<AppState>>,
  body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<GeneratedOut>> {
  let value = json_body(body)?;
  match validate(ResponseShape::Question, value).map_err(AppError::Validation)? {
    Payload::Question(q) => {
      state.record_generated(q).await;
      Ok(Json(GeneratedOut { questions: state.generated_questions().await }))
    }
    other => Err(AppError::Internal(format!("question schema produced {other:?}"))),
  }
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_contribute(
  State(state): State<Arc<AppState>>,
  body: std::result::Result<Json<ContributeIn>, JsonRejection>,
) -> Result<Json<ContributeOut>> {
  let ContributeIn { entry } = json_body(body)?;
  check_entry(&entry)?;
  let github = state
    .github
    .as_ref()
    .ok_or_else(|| AppError::Configuration("contributions are disabled: GITHUB_TOKEN, GITHUB_OWNER and GITHUB_REPO must be set".into()))?;
  let c = github.contribute(&entry).await?;
  Ok(Json(ContributeOut { branch: c.branch, pr_url: c.pr_url, pr_number: c.pr_number }))
}
