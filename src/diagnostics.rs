// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn raw tsc output into ordered, structured diagnostics
// role: parsing/diagnostics
// inputs: Raw compiler stdout (may contain ANSI escapes and a trailing "Found N errors in" summary)
// outputs: Vec<Diagnostic> in output order, validated against DIAGNOSTIC_SCHEMA
// invariants:
// - Unparseable lines are dropped, never fatal
// - One pass per layout present; no de-duplication across layouts
// - A message runs until (not including) the next header line of either layout
// errors: BenchError::ParseInvalid when a produced record fails the shape check
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BenchError;

static RE_ANSI: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"[\x1b\x{9b}][\[()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><]").unwrap()
});
static RE_SUMMARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Found \d+ errors? in").unwrap());

// src/components/Component.tsx:231:33 - error TS2339: Property 'foo' does not exist on type 'Bar'
static RE_COLON: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(.+?):(\d+):(\d+) - (error|warning) (TS\d+): (.*)$").unwrap());
// src/components/Component.tsx(231,33): error TS2339: Property 'foo' does not exist on type 'Bar'
static RE_PAREN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(.+?)\((\d+),(\d+)\): (error|warning) (TS\d+): (.*)$").unwrap());

static DIAGNOSTIC_SCHEMA: Lazy<jsonschema::Validator> = Lazy::new(|| {
  let schema = serde_json::json!({
    "type": "array",
    "items": {
      "type": "object",
      "required": ["path", "line", "column", "severity", "code", "message", "layout"],
      "properties": {
        "path": { "type": "string", "minLength": 1 },
        "line": { "type": "integer", "minimum": 1 },
        "column": { "type": "integer", "minimum": 1 },
        "severity": { "enum": ["error", "warning"] },
        "code": { "type": "string", "pattern": "^TS[0-9]+$" },
        "message": { "type": "string" },
        "layout": { "enum": ["colon", "paren"] }
      }
    }
  });
  jsonschema::validator_for(&schema).expect("diagnostic schema compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Error,
  Warning,
}

/// The two line grammars tsc emits, depending on `--pretty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
  /// `path:line:col - severity CODE: message`
  Colon,
  /// `path(line,col): severity CODE: message`
  Paren,
}

impl Layout {
  const ALL: [Layout; 2] = [Layout::Colon, Layout::Paren];

  fn regex(&self) -> &'static Regex {
    match self {
      Layout::Colon => &RE_COLON,
      Layout::Paren => &RE_PAREN,
    }
  }

  fn header(&self, line: &str) -> Option<Diagnostic> {
    let c = self.regex().captures(line)?;
    let severity = match &c[4] {
      "error" => Severity::Error,
      _ => Severity::Warning,
    };

    Some(Diagnostic {
      path: c[1].to_string(),
      line: c[2].parse().ok()?,
      column: c[3].parse().ok()?,
      severity,
      code: c[5].to_string(),
      message: c[6].to_string(),
      layout: *self,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub path: String,
  pub line: u32,
  pub column: u32,
  pub severity: Severity,
  pub code: String,
  pub message: String,
  pub layout: Layout,
}

pub fn strip_ansi(input: &str) -> String {
  RE_ANSI.replace_all(input, "").into_owned()
}

/// Drop everything from the first line starting with "Found N errors in" onward.
pub fn truncate_summary(input: &str) -> &str {
  match RE_SUMMARY.find(input) {
    Some(m) => &input[..m.start()],
    None => input,
  }
}

fn is_header(line: &str) -> bool {
  Layout::ALL.iter().any(|l| l.regex().is_match(line))
}

/// Layouts with at least one header line, in order of first appearance.
pub fn detect_layouts(text: &str) -> Vec<Layout> {
  let mut found: Vec<Layout> = Vec::new();
  for line in text.lines() {
    for layout in Layout::ALL {
      if !found.contains(&layout) && layout.header(line).is_some() {
        found.push(layout);
      }
    }
    if found.len() == Layout::ALL.len() {
      break;
    }
  }
  found
}

fn parse_layout(text: &str, layout: Layout) -> Vec<Diagnostic> {
  let mut out: Vec<Diagnostic> = Vec::new();
  let mut current: Option<Diagnostic> = None;

  for line in text.lines() {
    if let Some(d) = layout.header(line) {
      if let Some(mut done) = current.take() {
        done.message = done.message.trim().to_string();
        out.push(done);
      }
      current = Some(d);
      continue;
    }

    if is_header(line) {
      // header of the other layout (or one with unparseable numbers) ends the record
      if let Some(mut done) = current.take() {
        done.message = done.message.trim().to_string();
        out.push(done);
      }
      continue;
    }

    if let Some(d) = current.as_mut() {
      d.message.push('\n');
      d.message.push_str(line);
    }
  }

  if let Some(mut done) = current.take() {
    done.message = done.message.trim().to_string();
    out.push(done);
  }

  out
}

pub fn validate_shape(diagnostics: &[Diagnostic]) -> Result<(), BenchError> {
  let instance = serde_json::to_value(diagnostics).map_err(|e| BenchError::ParseInvalid(e.to_string()))?;
  DIAGNOSTIC_SCHEMA
    .validate(&instance)
    .map_err(|e| BenchError::ParseInvalid(e.to_string()))
}

/// Parse compiler output into diagnostics.
///
/// ANSI escapes are stripped and the trailing summary is cut before matching.
/// Each layout present in the text gets one pass, in order of first appearance.
pub fn parse(raw: &str) -> Result<Vec<Diagnostic>> {
  let stripped = strip_ansi(raw);
  let text = truncate_summary(&stripped);

  let mut items: Vec<Diagnostic> = Vec::new();
  for layout in detect_layouts(text) {
    items.extend(parse_layout(text, layout));
  }

  validate_shape(&items)?;
  Ok(items)
}
