//! In-process fake upstreams for tests.

use std::{
  convert::Infallible,
  net::SocketAddr,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use axum::{
  body::Body,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  routing::post,
  Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub async fn spawn(router: Router) -> SocketAddr {
  let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
  let addr = listener.local_addr().expect("local addr");
  tokio::spawn(async move {
    axum::serve(listener, router).await.expect("serve");
  });
  addr
}

enum Mode {
  Chunks(Vec<String>),
  Status(u16, String),
  Endless(String),
  Raw(String),
}

struct Inner {
  mode: Mode,
  requests: Mutex<Vec<(Value, Option<String>)>>,
  dropped: AtomicBool,
}

/// OpenAI-compatible `/v1/chat/completions` that streams canned deltas.
#[derive(Clone)]
pub struct FakeLlm(Arc<Inner>);

impl FakeLlm {
  fn with(mode: Mode) -> Self {
    Self(Arc::new(Inner { mode, requests: Mutex::new(Vec::new()), dropped: AtomicBool::new(false) }))
  }

  pub fn chunks(chunks: &[&str]) -> Self {
    Self::with(Mode::Chunks(chunks.iter().map(|c| c.to_string()).collect()))
  }

  pub fn status(code: u16, body: &str) -> Self {
    Self::with(Mode::Status(code, body.to_string()))
  }

  /// Sends `body` verbatim as a single network chunk.
  pub fn raw(body: &str) -> Self {
    Self::with(Mode::Raw(body.to_string()))
  }

  /// Emits the same delta every 20ms until the client disconnects.
  pub fn endless(delta: &str) -> Self {
    Self::with(Mode::Endless(delta.to_string()))
  }

  pub fn last_request(&self) -> Option<Value> {
    self.0.requests.lock().unwrap().last().map(|(v, _)| v.clone())
  }

  pub fn last_auth(&self) -> Option<String> {
    self.0.requests.lock().unwrap().last().and_then(|(_, a)| a.clone())
  }

  pub fn request_count(&self) -> usize {
    self.0.requests.lock().unwrap().len()
  }

  pub fn upstream_dropped(&self) -> bool {
    self.0.dropped.load(Ordering::SeqCst)
  }
}

fn sse_event(delta: &str) -> String {
  format!("data: {}\n\n", json!({ "choices": [ { "delta": { "content": delta } } ] }))
}

struct DropFlag(Arc<Inner>);

impl Drop for DropFlag {
  fn drop(&mut self) {
    self.0.dropped.store(true, Ordering::SeqCst);
  }
}

async fn completions(State(fake): State<FakeLlm>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
  let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
  fake.0.requests.lock().unwrap().push((body, auth));

  match &fake.0.mode {
    Mode::Status(code, body) => {
      let status = StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
      (status, body.clone()).into_response()
    }
    Mode::Chunks(chunks) => {
      let mut sse: String = chunks.iter().map(|c| sse_event(c)).collect();
      sse.push_str("data: [DONE]\n\n");
      // Small network pieces so lines and UTF-8 sequences get split.
      let pieces: Vec<Result<Vec<u8>, Infallible>> =
        sse.into_bytes().chunks(7).map(|p| Ok(p.to_vec())).collect();
      Body::from_stream(futures::stream::iter(pieces)).into_response()
    }
    Mode::Raw(body) => Body::from(body.clone()).into_response(),
    Mode::Endless(delta) => {
      let event = sse_event(delta);
      let stream = futures::stream::unfold(DropFlag(fake.0.clone()), move |flag| {
        let event = event.clone();
        async move {
          tokio::time::sleep(Duration::from_millis(20)).await;
          Some((Ok::<_, Infallible>(event.into_bytes()), flag))
        }
      });
      Body::from_stream(stream).into_response()
    }
  }
}

pub fn fake_llm(fake: FakeLlm) -> Router {
  Router::new().route("/v1/chat/completions", post(completions)).with_state(fake)
}
