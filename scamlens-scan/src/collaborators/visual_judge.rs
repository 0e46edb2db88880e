// LLM visual judge client.
//
// The judge looks at the page (screenshot and/or URL plus extracted text)
// and returns a clone likelihood 0-100, a suspected brand, and a free-text
// explanation. LLMs do not reliably return clean JSON: the structured fields
// frequently arrive embedded in the explanation text, fenced, truncated, or
// paraphrased. `extract_json_from_text` recovers them before normalization.

use super::{Collaborator, ScanContext};
use async_trait::async_trait;
use regex::Regex;
use scamlens_common::config::ProviderEndpoint;
use scamlens_fusion::{ProviderFamily, SourceId};
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;

const MAX_EXPLANATION_CHARS: usize = 600;

pub struct VisualJudgeClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl VisualJudgeClient {
    pub fn new(client: reqwest::Client, config: &ProviderEndpoint) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Collaborator for VisualJudgeClient {
    fn source_id(&self) -> SourceId {
        "visual_judge".to_string()
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::VisualJudge
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, ctx: &ScanContext) -> anyhow::Result<Value> {
        if ctx.url.is_none() && ctx.screenshot_b64.is_none() {
            anyhow::bail!("nothing to judge: no url and no screenshot");
        }

        let body = json!({
            "url": ctx.url,
            "screenshot": ctx.screenshot_b64,
            "page_text": ctx.page_text,
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }

        let raw: Value = response.json().await?;
        Ok(refine_judgment(raw))
    }
}

/// Repair a judge response whose structured fields leaked into the
/// explanation text.
///
/// When the explanation contains an embedded JSON object, its likelihood /
/// suspected_brand / explanation fields override the top-level ones. The
/// final explanation is cleaned and trimmed for display.
pub fn refine_judgment(mut raw: Value) -> Value {
    let embedded = raw
        .get("explanation")
        .and_then(Value::as_str)
        .and_then(extract_json_from_text);

    if let (Some(parsed), Some(obj)) = (embedded, raw.as_object_mut()) {
        if let Some(likelihood) = parsed.get("likelihood") {
            obj.insert("likelihood".to_string(), likelihood.clone());
        }
        if let Some(brand) = parsed.get("suspected_brand") {
            obj.insert("suspected_brand".to_string(), brand.clone());
        }
        if let Some(explanation) = parsed.get("explanation") {
            obj.insert("explanation".to_string(), explanation.clone());
        }
    }

    if let Some(obj) = raw.as_object_mut() {
        if let Some(explanation) = obj.get("explanation").and_then(Value::as_str) {
            let cleaned = clean_explanation(explanation, MAX_EXPLANATION_CHARS);
            obj.insert("explanation".to_string(), Value::String(cleaned));
        }
    }

    raw
}

/// Recover a JSON object from free-form model output.
///
/// Tries, in order: the slice between the first `{` and the last `}`; the
/// text from the first `{` with a closing brace appended (truncated
/// output); the whole cleaned text; and finally per-field regex extraction.
pub fn extract_json_from_text(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }

    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let first = cleaned.find('{');
    let last = cleaned.rfind('}');

    if let (Some(start), Some(end)) = (first, last) {
        if start < end {
            if let Some(obj) = parse_object(&cleaned[start..=end]) {
                return Some(obj);
            }
        }
    }

    // Truncated output: more opening braces than closing ones
    if let Some(start) = first {
        let opens = cleaned.matches('{').count();
        let closes = cleaned.matches('}').count();
        if opens > closes {
            let candidate = format!("{}{}", &cleaned[start..], "}".repeat(opens - closes));
            if let Some(obj) = parse_object(&candidate) {
                return Some(obj);
            }
        }
    }

    if let Some(obj) = parse_object(cleaned) {
        return Some(obj);
    }

    extract_fields_by_regex(cleaned)
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

/// Last-resort field scraping for output that never was valid JSON.
fn extract_fields_by_regex(text: &str) -> Option<Value> {
    static LIKELIHOOD: OnceLock<Regex> = OnceLock::new();
    static BRAND: OnceLock<Regex> = OnceLock::new();
    static EXPLANATION: OnceLock<Regex> = OnceLock::new();

    let likelihood_re = LIKELIHOOD
        .get_or_init(|| Regex::new(r#""likelihood"\s*:\s*(\d+)"#).expect("valid regex"));
    let brand_re = BRAND
        .get_or_init(|| Regex::new(r#""suspected_brand"\s*:\s*"([^"]*)""#).expect("valid regex"));
    let explanation_re = EXPLANATION.get_or_init(|| {
        Regex::new(r#""explanation"\s*:\s*"([^"\\]*(?:\\.[^"\\]*)*)""#).expect("valid regex")
    });

    let mut fields = serde_json::Map::new();

    if let Some(captures) = likelihood_re.captures(text) {
        if let Ok(likelihood) = captures[1].parse::<i64>() {
            fields.insert("likelihood".to_string(), json!(likelihood));
        }
    }
    if let Some(captures) = brand_re.captures(text) {
        fields.insert("suspected_brand".to_string(), json!(&captures[1]));
    }
    if let Some(captures) = explanation_re.captures(text) {
        fields.insert("explanation".to_string(), json!(&captures[1]));
    }

    if fields.is_empty() {
        None
    } else {
        Some(Value::Object(fields))
    }
}

/// Strip code fences and trim to the nearest sentence boundary under
/// `max_chars`.
pub fn clean_explanation(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.chars().count() <= max_chars {
        return cleaned.to_string();
    }

    let cut: String = cleaned.chars().take(max_chars).collect();
    let last_sentence_end = cut
        .rfind('.')
        .into_iter()
        .chain(cut.rfind('!'))
        .chain(cut.rfind('?'))
        .max();

    match last_sentence_end {
        Some(pos) if pos > 0 => cut[..=pos].to_string(),
        _ => format!("{cut}..."),
    }
}
