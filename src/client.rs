//! Streaming consumer: reads a proxied completion, drives the repair engine chunk by
//! chunk, and publishes render views through a `ViewStore`.
//!
//! A consumer stops reading as soon as its request token is superseded; dropping the
//! response closes the connection, and the proxy then aborts its own upstream call.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{info, instrument, warn};

use crate::domain::ResponseShape;
use crate::error::{AppError, Result};
use crate::protocol::StreamRequest;
use crate::reconcile::{RequestToken, ViewStore};
use crate::repair::{ParsedResult, ResponseAccumulator};

/// HTTP client for the `/api/v1/stream` proxy.
#[derive(Clone)]
pub struct ProxyClient {
  http: reqwest::Client,
  base_url: String,
}

impl ProxyClient {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { http: reqwest::Client::new(), base_url: base_url.into().trim_end_matches('/').to_string() }
  }

  /// Start a new request on `store` and consume it to the end (or until superseded).
  ///
  /// Returns the final result, or `None` when a newer request took over.
  #[instrument(level = "info", skip(self, store, request), fields(kind = %request.kind))]
  pub async fn run(&self, store: &ViewStore, request: &StreamRequest) -> Result<Option<ParsedResult>> {
    let token = store.begin().await;
    let shape = request.kind.shape();

    let res = match self.http.post(format!("{}/api/v1/stream", self.base_url)).json(request).send().await {
      Ok(res) => res,
      Err(e) => {
        store.fail(token, format!("Request failed: {e}"), None).await;
        return Err(e.into());
      }
    };

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);
      store.fail(token, message.clone(), None).await;
      return Err(if (400..500).contains(&status) {
        AppError::BadRequest(message)
      } else {
        AppError::Upstream(message)
      });
    }

    consume(store, token, shape, res.bytes_stream()).await
  }
}

/// Feed a byte stream into a fresh accumulator, applying every update under `token`.
pub async fn consume<S, E>(
  store: &ViewStore,
  token: RequestToken,
  shape: ResponseShape,
  stream: S,
) -> Result<Option<ParsedResult>>
where
  S: Stream<Item = std::result::Result<Bytes, E>>,
  E: std::fmt::Display,
{
  let mut acc = ResponseAccumulator::new(shape);
  let mut utf8 = Utf8Chunker::default();
  futures::pin_mut!(stream);

  loop {
    // A newer request ends this read at once, even while the stream is stalled.
    let item = tokio::select! {
      biased;
      _ = store.superseded(token) => {
        info!(target: "stream", ?token, "Request superseded; abandoning stream");
        return Ok(None);
      }
      item = stream.next() => item,
    };
    let Some(item) = item else { break };
    match item {
      Ok(bytes) => {
        let text = utf8.push(&bytes);
        if !text.is_empty() {
          store.apply(token, shape, acc.push(&text)).await;
        }
      }
      Err(e) => {
        warn!(target: "stream", ?token, error = %e, "Stream interrupted");
        let raw = Some(acc.text().to_string()).filter(|t| !t.is_empty());
        store.fail(token, format!("Stream interrupted: {e}"), raw).await;
        return Err(AppError::Upstream(e.to_string()));
      }
    }
  }

  if !store.is_current(token) {
    return Ok(None);
  }
  let tail = utf8.finish();
  if !tail.is_empty() {
    acc.push(&tail);
  }
  let result = acc.finish().clone();
  store.apply(token, shape, &result).await;
  Ok(Some(result))
}

/// Decodes UTF-8 across chunk boundaries; a split multi-byte sequence waits for its tail.
#[derive(Debug, Default)]
pub struct Utf8Chunker {
  pending: Vec<u8>,
}

impl Utf8Chunker {
  pub fn push(&mut self, bytes: &[u8]) -> String {
    self.pending.extend_from_slice(bytes);
    let mut out = String::new();
    loop {
      match std::str::from_utf8(&self.pending) {
        Ok(s) => {
          out.push_str(s);
          self.pending.clear();
          return out;
        }
        Err(e) => {
          let valid = e.valid_up_to();
          out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
          match e.error_len() {
            None => {
              self.pending.drain(..valid);
              return out;
            }
            Some(bad) => {
              out.push(char::REPLACEMENT_CHARACTER);
              self.pending.drain(..valid + bad);
            }
          }
        }
      }
    }
  }

  pub fn finish(&mut self) -> String {
    let rest = std::mem::take(&mut self.pending);
    String::from_utf8_lossy(&rest).into_owned()
  }
}
