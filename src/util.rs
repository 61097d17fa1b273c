//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Unknown placeholders are left as they are.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_known_placeholders_only() {
    let out = fill_template("{a} and {b} but not {c}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y but not {c}");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "héllo wörld";
    let t = trunc_for_log(s, 2);
    assert!(t.starts_with('h'));
    assert!(t.ends_with("bytes total)"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }
}
