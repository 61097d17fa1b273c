//! Incremental repair/parse of streamed model output.
//!
//! A `ResponseAccumulator` owns the text of one in-flight response. Every update is
//! re-derived from the whole accumulated text, in two tiers:
//!
//! 1. strict JSON parse;
//! 2. forgiving pass: strip markdown fences, skip prose around the root value,
//!    close whatever strings/arrays/objects a truncated stream left open, then parse.
//!
//! While the stream is open a successful parse is only ever `Partial`. `Complete` and
//! `Failed` are decided by `finish()`, and a document that needed closing at that
//! point is truncated, hence `Failed`. Failures always keep the raw text.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::ResponseShape;
use crate::schema::{validate, Payload, ValidationIssue};
use crate::util::trunc_for_log;

/// Re-parse at least this often even when no structural punctuation arrived.
const COALESCE_BYTES: usize = 256;

/// Characters after which a re-parse is likely to surface new fields.
const BOUNDARY_CHARS: &[char] = &[',', '}', ']', '"', ':', '\n'];

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ParsedResult {
  /// Nothing usable yet.
  Pending,
  /// Best-effort content of an open stream; may change or disappear.
  Partial(Snapshot),
  /// Schema-conformant terminal object.
  Complete(Payload),
  /// Terminal failure; raw text retained.
  Failed(ParseFailure),
}

impl ParsedResult {
  pub fn is_terminal(&self) -> bool {
    matches!(self, ParsedResult::Complete(_) | ParsedResult::Failed(_))
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "format", content = "content", rename_all = "snake_case")]
pub enum Snapshot {
  Json(Value),
  Text(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParseFailure {
  pub raw: String,
  pub reason: FailureReason,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
  /// The stream completed without any content.
  Empty,
  /// The stream ended inside the JSON document.
  Truncated,
  /// No JSON document could be recovered.
  Malformed(String),
  /// Well-formed JSON that violates the schema (ranges, enums, required fields).
  Validation(Vec<ValidationIssue>),
}

impl std::fmt::Display for FailureReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FailureReason::Empty => f.write_str("empty response"),
      FailureReason::Truncated => f.write_str("response ended mid-document"),
      FailureReason::Malformed(e) => write!(f, "malformed response: {e}"),
      FailureReason::Validation(issues) => {
        let joined = issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ");
        write!(f, "invalid response: {joined}")
      }
    }
  }
}

/// Accumulated text of one response plus the latest parse of it.
#[derive(Debug)]
pub struct ResponseAccumulator {
  shape: ResponseShape,
  text: String,
  unparsed_bytes: usize,
  latest: ParsedResult,
  finished: bool,
}

impl ResponseAccumulator {
  pub fn new(shape: ResponseShape) -> Self {
    Self {
      shape,
      text: String::new(),
      unparsed_bytes: 0,
      latest: ParsedResult::Pending,
      finished: false,
    }
  }

  pub fn shape(&self) -> ResponseShape {
    self.shape
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn latest(&self) -> &ParsedResult {
    &self.latest
  }

  pub fn is_finished(&self) -> bool {
    self.finished
  }

  /// Append one chunk. Re-parses only on punctuation boundaries or after enough bytes.
  pub fn push(&mut self, chunk: &str) -> &ParsedResult {
    if self.finished {
      warn!(target: "stream", chunk_len = chunk.len(), "Chunk after finish ignored");
      return &self.latest;
    }
    self.text.push_str(chunk);
    self.unparsed_bytes += chunk.len();

    let due = self.shape == ResponseShape::Text
      || chunk.contains(BOUNDARY_CHARS)
      || self.unparsed_bytes >= COALESCE_BYTES;
    if due {
      self.reparse(false);
    }
    &self.latest
  }

  /// Close the stream; the result is terminal.
  pub fn finish(&mut self) -> &ParsedResult {
    if !self.finished {
      self.finished = true;
      self.reparse(true);
      match &self.latest {
        ParsedResult::Failed(f) => {
          warn!(target: "stream", reason = %f.reason, raw = %trunc_for_log(&f.raw, 200), "Response failed to parse")
        }
        _ => debug!(target: "stream", text_len = self.text.len(), "Response complete"),
      }
    }
    &self.latest
  }

  fn reparse(&mut self, finished: bool) {
    self.unparsed_bytes = 0;
    let next = classify(self.shape, &self.text, finished);
    // A mid-stream miss keeps the last partial on screen instead of blanking it.
    if matches!(next, ParsedResult::Pending) && matches!(self.latest, ParsedResult::Partial(_)) {
      return;
    }
    self.latest = next;
  }
}

/// Derive a result from the full text of a response.
pub fn classify(shape: ResponseShape, text: &str, finished: bool) -> ParsedResult {
  if shape == ResponseShape::Text {
    return match (text.is_empty(), finished) {
      (true, false) => ParsedResult::Pending,
      (true, true) => failed(text, FailureReason::Empty),
      (false, false) => ParsedResult::Partial(Snapshot::Text(text.to_string())),
      (false, true) => ParsedResult::Complete(Payload::Text(text.to_string())),
    };
  }

  if text.trim().is_empty() {
    return if finished { failed(text, FailureReason::Empty) } else { ParsedResult::Pending };
  }

  let strict = serde_json::from_str::<Value>(text);
  let (value, truncated) = match strict {
    Ok(v) => (v, false),
    Err(strict_err) => match repair(text) {
      Some(r) => match serde_json::from_str::<Value>(&r.json) {
        Ok(v) => (v, r.truncated),
        Err(e) => return unusable(text, finished, e.to_string()),
      },
      None => return unusable(text, finished, strict_err.to_string()),
    },
  };

  if !finished {
    return ParsedResult::Partial(Snapshot::Json(value));
  }
  if truncated {
    return failed(text, FailureReason::Truncated);
  }
  match validate(shape, value) {
    Ok(payload) => ParsedResult::Complete(payload),
    Err(issues) => failed(text, FailureReason::Validation(issues)),
  }
}

fn unusable(text: &str, finished: bool, err: String) -> ParsedResult {
  if finished { failed(text, FailureReason::Malformed(err)) } else { ParsedResult::Pending }
}

fn failed(text: &str, reason: FailureReason) -> ParsedResult {
  ParsedResult::Failed(ParseFailure { raw: text.to_string(), reason })
}

/// Output of the forgiving pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repaired {
  pub json: String,
  /// Open strings/containers had to be closed.
  pub truncated: bool,
}

/// Forgiving pass: fences, surrounding prose, then structural closing.
///
/// Prose may itself contain brackets ("the result [JSON]:"), so every `{`/`[` is a
/// candidate root until one closes into parseable JSON.
pub fn repair(text: &str) -> Option<Repaired> {
  let body = strip_code_fences(text);
  body
    .match_indices(|c| c == '{' || c == '[')
    .filter_map(|(start, _)| close_truncated_json(&body[start..]))
    .find(|r| serde_json::from_str::<Value>(&r.json).is_ok())
}

/// Remove a leading ```lang fence and a trailing ``` fence, including a partially
/// streamed one. A fence opener still missing its newline yields "".
pub fn strip_code_fences(text: &str) -> &str {
  let mut t = text.trim();
  let mut opened = false;
  if let Some(rest) = t.strip_prefix("```") {
    opened = true;
    t = match rest.find('\n') {
      Some(i) => &rest[i + 1..],
      None => "",
    };
  }
  let end_trimmed = t.trim_end();
  let without_ticks = end_trimmed.trim_end_matches('`');
  if without_ticks.len() != end_trimmed.len() {
    let before = without_ticks.trim_end();
    if opened || before.ends_with('}') || before.ends_with(']') {
      return before;
    }
  }
  end_trimmed
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Container {
  Object,
  Array,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expect {
  KeyOrClose,
  Key,
  Colon,
  ValueOrClose,
  Value,
  CommaOrClose,
}

impl Expect {
  fn takes_value(self) -> bool {
    matches!(self, Expect::Value | Expect::ValueOrClose)
  }
}

#[derive(Clone, Copy, Debug)]
struct Frame {
  container: Container,
  expect: Expect,
}

struct Closer {
  stack: Vec<Frame>,
  /// Byte length of the longest prefix that is valid once closed, with its closers.
  checkpoint: Option<(usize, String)>,
  root_end: Option<usize>,
}

impl Closer {
  fn closers(&self) -> String {
    self
      .stack
      .iter()
      .rev()
      .map(|f| match f.container {
        Container::Object => '}',
        Container::Array => ']',
      })
      .collect()
  }

  fn expect(&self) -> Expect {
    self.stack.last().map(|f| f.expect).unwrap_or(Expect::Value)
  }

  fn set_expect(&mut self, e: Expect) {
    if let Some(top) = self.stack.last_mut() {
      top.expect = e;
    }
  }

  fn value_done(&mut self, end: usize) {
    if self.stack.is_empty() {
      self.root_end = Some(end);
      self.checkpoint = Some((end, String::new()));
    } else {
      self.set_expect(Expect::CommaOrClose);
      self.checkpoint = Some((end, self.closers()));
    }
  }

  fn cut(&self, src: &str) -> Option<Repaired> {
    self.checkpoint.as_ref().map(|(len, closers)| Repaired {
      json: format!("{}{}", &src[..*len], closers),
      truncated: true,
    })
  }
}

/// Close a JSON document that may have been cut off at any byte.
///
/// Open strings in value position are closed (their content is kept); anything that
/// cannot be completed (a half key, a dangling `:` or `,`, a partial literal) is cut back
/// to the last position where the document was valid. Text after a complete root value is
/// dropped. Returns `None` when the input is not JSON-like at all.
pub fn close_truncated_json(src: &str) -> Option<Repaired> {
  let bytes = src.as_bytes();
  let len = bytes.len();
  let mut st = Closer { stack: Vec::new(), checkpoint: None, root_end: None };
  let mut i = 0;

  while i < len {
    let b = bytes[i];
    if b.is_ascii_whitespace() {
      i += 1;
      continue;
    }
    if st.root_end.is_some() {
      break;
    }
    let expect = st.expect();
    match b {
      b'{' | b'[' => {
        if !expect.takes_value() {
          return None;
        }
        let (container, inner) = if b == b'{' {
          (Container::Object, Expect::KeyOrClose)
        } else {
          (Container::Array, Expect::ValueOrClose)
        };
        st.stack.push(Frame { container, expect: inner });
        i += 1;
        st.checkpoint = Some((i, st.closers()));
      }
      b'}' | b']' => {
        let want = if b == b'}' { Container::Object } else { Container::Array };
        let top = st.stack.last()?;
        let closable = matches!(
          (top.container, top.expect),
          (_, Expect::CommaOrClose) | (Container::Object, Expect::KeyOrClose) | (Container::Array, Expect::ValueOrClose)
        );
        if top.container != want || !closable {
          return None;
        }
        st.stack.pop();
        i += 1;
        st.value_done(i);
      }
      b',' => {
        let top = st.stack.last()?;
        if top.expect != Expect::CommaOrClose {
          return None;
        }
        let next = if top.container == Container::Object { Expect::Key } else { Expect::Value };
        st.set_expect(next);
        i += 1;
      }
      b':' => {
        if expect != Expect::Colon {
          return None;
        }
        st.set_expect(Expect::Value);
        i += 1;
      }
      b'"' => {
        let is_key = matches!(expect, Expect::KeyOrClose | Expect::Key);
        if !is_key && !expect.takes_value() {
          return None;
        }
        let content_start = i + 1;
        let mut j = content_start;
        let mut closed = false;
        while j < len {
          match bytes[j] {
            b'\\' => j += 2,
            b'"' => {
              j += 1;
              closed = true;
              break;
            }
            _ => j += 1,
          }
        }
        if !closed {
          if is_key {
            return st.cut(src);
          }
          let body_end = complete_escapes_end(bytes, content_start);
          st.value_done(len);
          let closers = st.closers();
          return Some(Repaired {
            json: format!("{}\"{}", &src[..body_end], closers),
            truncated: true,
          });
        }
        i = j;
        if is_key {
          st.set_expect(Expect::Colon);
        } else {
          st.value_done(i);
        }
      }
      b'-' | b'0'..=b'9' => {
        if !expect.takes_value() {
          return None;
        }
        let start = i;
        while i < len && matches!(bytes[i], b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
          i += 1;
        }
        let token = &src[start..i];
        if serde_json::from_str::<serde_json::Number>(token).is_err() {
          return if i == len { st.cut(src) } else { None };
        }
        st.value_done(i);
      }
      b't' | b'f' | b'n' => {
        if !expect.takes_value() {
          return None;
        }
        let rest = &src[i..];
        let literal = ["true", "false", "null"].into_iter().find(|l| l.as_bytes()[0] == b)?;
        if rest.starts_with(literal) {
          i += literal.len();
          st.value_done(i);
        } else if literal.starts_with(rest) {
          return st.cut(src);
        } else {
          return None;
        }
      }
      _ => return None,
    }
  }

  if let Some(end) = st.root_end {
    return Some(Repaired { json: src[..end].to_string(), truncated: false });
  }
  st.cut(src)
}

/// End of the string content that excludes a trailing incomplete escape sequence.
fn complete_escapes_end(bytes: &[u8], from: usize) -> usize {
  let len = bytes.len();
  let mut i = from;
  while i < len {
    if bytes[i] == b'\\' {
      if i + 1 >= len {
        return i;
      }
      if bytes[i + 1] == b'u' {
        if i + 6 > len {
          return i;
        }
        i += 6;
      } else {
        i += 2;
      }
    } else {
      i += 1;
    }
  }
  len
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, QuestionType};
  use serde_json::json;

  const SCENARIO_A: &str = r#"{"id":"x1","type":"Coding","category":"Algorithms","difficulty":"Easy","translations":{"en":{"title":"Reverse a String","description":"...","topic":"Strings"}},"testCases":[{"input":"hello","output":"olleh"}]}"#;

  fn repaired(src: &str) -> Value {
    let r = close_truncated_json(src).expect("repairable");
    serde_json::from_str(&r.json).unwrap_or_else(|e| panic!("{:?} -> {}: {e}", src, r.json))
  }

  #[test]
  fn closes_open_string_value_keeping_content() {
    assert_eq!(repaired(r#"{"feedback":{"en":"Good us"#), json!({"feedback": {"en": "Good us"}}));
  }

  #[test]
  fn drops_dangling_key_colon_and_comma() {
    assert_eq!(repaired(r#"{"overallScore":0.8,"categoryScor"#), json!({"overallScore": 0.8}));
    assert_eq!(repaired(r#"{"a":1,"b""#), json!({"a": 1}));
    assert_eq!(repaired(r#"{"a":1,"b":"#), json!({"a": 1}));
    assert_eq!(repaired(r#"{"a":[1,2,"#), json!({"a": [1, 2]}));
  }

  #[test]
  fn partial_literals_and_numbers() {
    assert_eq!(repaired(r#"{"a":tr"#), json!({}));
    assert_eq!(repaired(r#"{"a":true,"b":nu"#), json!({"a": true}));
    assert_eq!(repaired(r#"{"a":0."#), json!({}));
    assert_eq!(repaired(r#"{"a":[0.75"#), json!({"a": [0.75]}));
  }

  #[test]
  fn incomplete_escapes_are_dropped() {
    assert_eq!(repaired(r#"{"a":"line\"#), json!({"a": "line"}));
    assert_eq!(repaired(r#"{"a":"x\u00"#), json!({"a": "x"}));
    assert_eq!(repaired(r#"{"a":"say \"hi\" é"#), json!({"a": "say \"hi\" é"}));
  }

  #[test]
  fn nested_containers_close_in_order() {
    assert_eq!(
      repaired(r#"{"improvementSuggestions":[{"en":"Add tests","fr":"Ajou"#),
      json!({"improvementSuggestions": [{"en": "Add tests", "fr": "Ajou"}]})
    );
  }

  #[test]
  fn complete_document_is_not_truncated_and_trailing_text_is_dropped() {
    let r = close_truncated_json("{\"a\":1}\nHope this helps!").expect("repair");
    assert_eq!(r, Repaired { json: "{\"a\":1}".into(), truncated: false });
  }

  #[test]
  fn non_json_is_rejected() {
    assert!(close_truncated_json("{oops}").is_none());
    assert!(close_truncated_json("{\"a\" 1}").is_none());
    assert!(repair("I cannot help with that.").is_none());
  }

  #[test]
  fn fences_are_stripped_even_half_streamed() {
    assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("```json\n{\"a\":1}\n``"), "{\"a\":1}");
    assert_eq!(strip_code_fences("```js"), "");
    assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
  }

  #[test]
  fn empty_text_is_pending_not_failed() {
    let mut acc = ResponseAccumulator::new(ResponseShape::Evaluation);
    assert_eq!(acc.push(""), &ParsedResult::Pending);
    assert_eq!(classify(ResponseShape::Question, "   ", false), ParsedResult::Pending);
  }

  #[test]
  fn fenced_document_matches_unfenced_result() {
    let fenced = format!("```json\n{SCENARIO_A}\n```");
    let plain = classify(ResponseShape::Question, SCENARIO_A, true);
    assert!(matches!(plain, ParsedResult::Complete(_)));
    assert_eq!(classify(ResponseShape::Question, &fenced, true), plain);
  }

  #[test]
  fn strict_prefixes_are_never_complete() {
    for (idx, _) in SCENARIO_A.char_indices().skip(1) {
      let prefix = &SCENARIO_A[..idx];
      let mid = classify(ResponseShape::Question, prefix, false);
      assert!(
        matches!(mid, ParsedResult::Pending | ParsedResult::Partial(_)),
        "prefix {prefix:?} gave {mid:?}"
      );
      let end = classify(ResponseShape::Question, prefix, true);
      assert!(matches!(end, ParsedResult::Failed(_)), "finished prefix {prefix:?} gave {end:?}");
    }
  }

  #[test]
  fn scenario_a_three_chunks_complete() {
    let mut acc = ResponseAccumulator::new(ResponseShape::Question);
    let (first, rest) = SCENARIO_A.split_at(40);
    let (second, third) = rest.split_at(70);
    for chunk in [first, second, third] {
      let r = acc.push(chunk);
      assert!(!r.is_terminal());
    }
    match acc.finish() {
      ParsedResult::Complete(Payload::Question(q)) => {
        assert_eq!(q.id, "x1");
        assert_eq!(q.kind, QuestionType::Coding);
        assert_eq!(q.difficulty, Difficulty::Easy);
        assert_eq!(q.translations["en"].title, "Reverse a String");
        let cases = q.test_cases.as_ref().expect("test cases");
        assert_eq!(cases[0].output, "olleh");
      }
      other => panic!("expected complete question, got {other:?}"),
    }
  }

  #[test]
  fn scenario_b_truncated_stream_fails_with_raw_text() {
    let raw = r#"{"overallScore":0.8,"categoryScor"#;
    let mut acc = ResponseAccumulator::new(ResponseShape::Evaluation);
    acc.push(raw);
    match acc.finish() {
      ParsedResult::Failed(f) => {
        assert_eq!(f.raw, raw);
        assert_eq!(f.reason, FailureReason::Truncated);
      }
      other => panic!("expected failure, got {other:?}"),
    }
  }

  #[test]
  fn partial_evaluation_is_visible_mid_stream() {
    let mut acc = ResponseAccumulator::new(ResponseShape::Evaluation);
    acc.push(r#"{"overallScore":0.8,"#);
    let r = acc.push(r#""feedback":{"en":"Solid appro"#);
    match r {
      ParsedResult::Partial(Snapshot::Json(v)) => {
        assert_eq!(v["overallScore"], json!(0.8));
        assert_eq!(v["feedback"]["en"], "Solid appro");
      }
      other => panic!("expected partial, got {other:?}"),
    }
  }

  #[test]
  fn mid_stream_miss_keeps_previous_partial() {
    let mut acc = ResponseAccumulator::new(ResponseShape::Evaluation);
    acc.push(r#"{"overallScore":0.8,"#);
    let before = acc.latest().clone();
    assert!(matches!(before, ParsedResult::Partial(_)));
    acc.push(r#" "oops" "x", "#);
    assert_eq!(acc.latest(), &before);
  }

  #[test]
  fn out_of_range_score_is_validation_failure() {
    let text = r#"{"overallScore":1.5,"categoryScores":{"correctness":0.9,"efficiency":0.8,"readability":0.7},"feedback":{"en":"Nice"},"improvementSuggestions":[]}"#;
    match classify(ResponseShape::Evaluation, text, true) {
      ParsedResult::Failed(ParseFailure { reason: FailureReason::Validation(issues), raw }) => {
        assert_eq!(issues[0].field, "overallScore");
        assert_eq!(raw, text);
      }
      other => panic!("expected validation failure, got {other:?}"),
    }
  }

  #[test]
  fn prose_around_json_is_tolerated_at_finish() {
    let text = "Sure! Here is the answer:\n{\"answer\":{\"en\":\"Use a hash map.\"}}\nGood luck.";
    assert!(matches!(
      classify(ResponseShape::ModelAnswer, text, true),
      ParsedResult::Complete(Payload::ModelAnswer(_))
    ));
  }

  #[test]
  fn brackets_in_leading_prose_are_skipped() {
    let text = "Here is the result [JSON]:\n{\"answer\":{\"en\":\"Use a hash map.\"}}";
    match classify(ResponseShape::ModelAnswer, text, true) {
      ParsedResult::Complete(Payload::ModelAnswer(a)) => assert_eq!(a.answer["en"], "Use a hash map."),
      other => panic!("expected a model answer, got {other:?}"),
    }
    let mid = classify(ResponseShape::ModelAnswer, "See {below}: {\"answer\":{\"en\":\"Use a", false);
    assert_eq!(mid, ParsedResult::Partial(Snapshot::Json(serde_json::json!({"answer": {"en": "Use a"}}))));
  }

  #[test]
  fn never_json_stream_terminates_as_failed() {
    let mut acc = ResponseAccumulator::new(ResponseShape::Evaluation);
    acc.push("I'm sorry, ");
    assert_eq!(acc.latest(), &ParsedResult::Pending);
    acc.push("I can't grade that.");
    match acc.finish() {
      ParsedResult::Failed(f) => {
        assert!(matches!(f.reason, FailureReason::Malformed(_)));
        assert_eq!(f.raw, "I'm sorry, I can't grade that.");
      }
      other => panic!("expected failure, got {other:?}"),
    }
  }

  #[test]
  fn empty_finished_stream_fails_as_empty() {
    let mut acc = ResponseAccumulator::new(ResponseShape::Question);
    assert!(matches!(acc.finish(), ParsedResult::Failed(ParseFailure { reason: FailureReason::Empty, .. })));
  }

  #[test]
  fn free_text_passes_through_verbatim() {
    let mut acc = ResponseAccumulator::new(ResponseShape::Text);
    assert_eq!(acc.push("## Approach\n"), &ParsedResult::Partial(Snapshot::Text("## Approach\n".into())));
    acc.push("Use ```{not json``` freely");
    assert_eq!(
      acc.finish(),
      &ParsedResult::Complete(Payload::Text("## Approach\nUse ```{not json``` freely".into()))
    );
  }

  #[test]
  fn chunks_after_finish_are_ignored() {
    let mut acc = ResponseAccumulator::new(ResponseShape::Text);
    acc.push("done");
    acc.finish();
    acc.push(" more");
    assert_eq!(acc.text(), "done");
  }

  #[test]
  fn small_chunks_without_punctuation_are_coalesced() {
    let mut acc = ResponseAccumulator::new(ResponseShape::ModelAnswer);
    acc.push(r#"{"answer":{"en":"#);
    acc.push(r#""Use"#);
    let seen = acc.latest().clone();
    acc.push(" two");
    acc.push(" pointers");
    assert_eq!(acc.latest(), &seen);
    acc.push(".\"");
    match acc.latest() {
      ParsedResult::Partial(Snapshot::Json(v)) => assert_eq!(v["answer"]["en"], "Use two pointers."),
      other => panic!("expected partial, got {other:?}"),
    }
  }
}
