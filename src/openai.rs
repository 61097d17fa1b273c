//! Minimal OpenAI-compatible client for streamed chat completions.
//!
//! We only call chat.completions with `stream: true` and relay the text deltas.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::{collections::VecDeque, pin::Pin, time::Duration};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::LlmSettings;
use crate::error::{AppError, Result};
use crate::prompt::{ChatMessage, ComposedPrompt};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw completion text, chunk by chunk, in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Per-request overrides of the process-wide LLM defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmOverride {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
}

/// Endpoint, model and credential for one call.
#[derive(Clone)]
pub struct Target {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl std::fmt::Debug for Target {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Target")
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .finish_non_exhaustive()
  }
}

#[derive(Clone)]
pub struct OpenAI {
  client: reqwest::Client,
  defaults: LlmSettings,
}

impl OpenAI {
  pub fn new(defaults: LlmSettings) -> Result<Self> {
    let client = reqwest::Client::builder()
      .connect_timeout(CONNECT_TIMEOUT)
      .build()
      .map_err(|e| AppError::Internal(format!("HTTP client init failed: {e}")))?;
    Ok(Self { client, defaults })
  }

  pub fn defaults(&self) -> &LlmSettings {
    &self.defaults
  }

  /// Request override first, then process default. A missing key is the caller's problem.
  pub fn resolve(&self, over: &LlmOverride) -> Result<Target> {
    let pick = |o: &Option<String>| o.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let api_key = pick(&over.api_key)
      .or_else(|| self.defaults.api_key.clone())
      .ok_or_else(|| AppError::Configuration("API key is required: pass apiKey or set OPENAI_API_KEY".into()))?;
    let base_url = pick(&over.base_url).unwrap_or_else(|| self.defaults.base_url.clone());
    let model = pick(&over.model).unwrap_or_else(|| self.defaults.model.clone());
    Ok(Target { api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// Open a streamed chat completion and return its text deltas.
  ///
  /// Dropping the returned stream drops the upstream response, which closes the
  /// connection and stops generation on the provider side.
  #[instrument(level = "info", skip(self, target, prompt), fields(model = %target.model, kind = %prompt.kind))]
  pub async fn stream_chat(&self, target: &Target, prompt: &ComposedPrompt) -> Result<TextStream> {
    let url = format!("{}/chat/completions", target.base_url);
    let req = ChatCompletionRequest {
      model: &target.model,
      messages: &prompt.messages,
      temperature: prompt.temperature,
      stream: true,
      response_format: prompt.json_mode.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "mock-interview-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(ACCEPT, "text/event-stream")
      .header(AUTHORIZATION, format!("Bearer {}", target.api_key))
      .json(&req).send().await?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      let msg = format!("LLM provider HTTP {}: {}", status.as_u16(), msg);
      warn!(status = status.as_u16(), elapsed = ?start.elapsed(), "Upstream rejected completion");
      return Err(if status.as_u16() == 429 {
        AppError::UpstreamRateLimited(msg)
      } else {
        AppError::Upstream(msg)
      });
    }
    info!(elapsed = ?start.elapsed(), "Upstream stream opened");

    let state = SseState {
      body: Box::pin(res.bytes_stream()),
      decoder: SseDecoder::default(),
      queue: VecDeque::new(),
      idle: self.defaults.idle_timeout,
      done: false,
      failed: None,
      relayed_bytes: 0,
    };
    Ok(Box::pin(futures::stream::unfold(state, next_delta)))
  }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct SseState {
  body: ByteStream,
  decoder: SseDecoder,
  queue: VecDeque<String>,
  idle: Duration,
  done: bool,
  failed: Option<AppError>,
  relayed_bytes: usize,
}

impl Drop for SseState {
  fn drop(&mut self) {
    if self.done {
      info!(target: "stream", relayed_bytes = self.relayed_bytes, "Upstream stream finished");
    } else {
      info!(target: "stream", relayed_bytes = self.relayed_bytes, "Consumer went away; aborting upstream request");
    }
  }
}

async fn next_delta(mut st: SseState) -> Option<(Result<String>, SseState)> {
  loop {
    if let Some(text) = st.queue.pop_front() {
      st.relayed_bytes += text.len();
      return Some((Ok(text), st));
    }
    // Only surfaces once every delta decoded before it has been relayed.
    if let Some(err) = st.failed.take() {
      return Some((Err(err), st));
    }
    if st.done {
      return None;
    }
    match tokio::time::timeout(st.idle, st.body.next()).await {
      Err(_) => {
        st.done = true;
        st.failed = Some(AppError::UpstreamTimeout(format!("no data from LLM provider for {:?}", st.idle)));
      }
      Ok(Some(Err(e))) => {
        st.done = true;
        st.failed = Some(AppError::from(e));
      }
      Ok(Some(Ok(bytes))) => {
        let events = st.decoder.push(&bytes);
        st.absorb(events);
      }
      Ok(None) => {
        let events = st.decoder.finish();
        st.absorb(events);
        st.done = true;
      }
    }
  }
}

impl SseState {
  fn absorb(&mut self, events: Vec<SseEvent>) {
    for ev in events {
      match ev {
        SseEvent::Delta(text) => self.queue.push_back(text),
        SseEvent::Done => self.done = true,
        SseEvent::Error(msg) => {
          self.done = true;
          self.failed = Some(AppError::Upstream(format!("LLM provider stream error: {msg}")));
          return;
        }
      }
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SseEvent {
  Delta(String),
  Done,
  Error(String),
}

/// Line-buffered decoder for `data:` events; network chunks may split lines anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
  buf: Vec<u8>,
}

impl SseDecoder {
  pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
    self.buf.extend_from_slice(bytes);
    let mut events = Vec::new();
    while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
      let line: Vec<u8> = self.buf.drain(..=pos).collect();
      if let Some(ev) = parse_sse_line(&String::from_utf8_lossy(&line)) {
        events.push(ev);
      }
    }
    events
  }

  pub fn finish(&mut self) -> Vec<SseEvent> {
    let rest = std::mem::take(&mut self.buf);
    parse_sse_line(&String::from_utf8_lossy(&rest)).into_iter().collect()
  }
}

fn parse_sse_line(line: &str) -> Option<SseEvent> {
  let data = line.trim_end_matches(&['\r', '\n'][..]).strip_prefix("data:")?;
  let data = data.strip_prefix(' ').unwrap_or(data);
  if data.trim() == "[DONE]" {
    return Some(SseEvent::Done);
  }
  match serde_json::from_str::<ChatCompletionChunk>(data) {
    Ok(chunk) => {
      if let Some(err) = chunk.error {
        return Some(SseEvent::Error(err.message));
      }
      let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .collect();
      if text.is_empty() { None } else { Some(SseEvent::Delta(text)) }
    }
    Err(e) => {
      warn!(target: "stream", error = %e, "Skipping undecodable SSE event");
      None
    }
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: &'a [ChatMessage],
  temperature: f32,
  stream: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionChunk {
  #[serde(default)] choices: Vec<ChunkChoice>,
  #[serde(default)] error: Option<EObj>,
}
#[derive(Deserialize)]
struct ChunkChoice { #[serde(default)] delta: Option<ChunkDelta> }
#[derive(Deserialize)]
struct ChunkDelta { #[serde(default)] content: Option<String> }

#[derive(Deserialize)]
struct EObj { message: String }

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
