// Rule-based URL heuristics.
//
// The one in-process detector: cheap lexical checks on the URL and page
// text. Each tripped rule adds a fixed increment; the total is capped at
// 100. Runs locally, so its "timeout" is nominal.

use super::{Collaborator, ScanContext};
use async_trait::async_trait;
use scamlens_fusion::{ProviderFamily, SourceId};
use serde_json::{json, Value};
use std::net::Ipv4Addr;
use std::time::Duration;
use url::Url;

const PUNYCODE_PREFIX: &str = "xn--";

/// Phrases that mark a credential-harvesting page when seen in page text.
const LOGIN_WORDS: [&str; 8] = [
    "login",
    "log in",
    "sign in",
    "signin",
    "password",
    "verify your account",
    "account verification",
    "credit card",
];

/// Multi-part public suffixes the registered-domain heuristic must keep
/// together.
const SECOND_LEVEL_SUFFIXES: [&str; 6] =
    ["co.uk", "com.au", "co.jp", "com.br", "co.in", "com.mx"];

#[derive(Default)]
pub struct UrlHeuristics;

#[async_trait]
impl Collaborator for UrlHeuristics {
    fn source_id(&self) -> SourceId {
        "url_heuristics".to_string()
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::UrlHeuristics
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn fetch(&self, ctx: &ScanContext) -> anyhow::Result<Value> {
        let url = ctx
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("heuristics require a url"))?;
        url_risk(url, ctx.page_text.as_deref())
    }
}

/// Score lexical risk markers for a URL.
pub fn url_risk(url: &str, page_text: Option<&str>) -> anyhow::Result<Value> {
    let parsed = Url::parse(url).map_err(|e| anyhow::anyhow!("invalid url: {e}"))?;
    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
    if host.is_empty() {
        anyhow::bail!("url has no host");
    }

    let registered = registered_domain(&host);
    let subdomain = host
        .strip_suffix(&registered)
        .map(|s| s.trim_end_matches('.'))
        .unwrap_or("")
        .to_string();

    let mut risk = 0u32;
    let mut signals = serde_json::Map::new();

    if host.contains(PUNYCODE_PREFIX) {
        risk += 20;
        signals.insert("punycode".to_string(), json!(true));
    }
    if host.parse::<Ipv4Addr>().is_ok() {
        risk += 25;
        signals.insert("ip_in_host".to_string(), json!(true));
    }
    if host.matches('-').count() >= 3 {
        risk += 10;
        signals.insert("many_hyphens".to_string(), json!(true));
    }
    if subdomain.len() > 30 {
        risk += 10;
        signals.insert("long_subdomain".to_string(), json!(true));
    }
    if page_text.map(contains_login_words).unwrap_or(false) {
        risk += 10;
        signals.insert("login_words".to_string(), json!(true));
    }

    Ok(json!({
        "risk": risk.min(100),
        "host": host,
        "registered_domain": registered,
        "subdomain": subdomain,
        "signals": signals,
    }))
}

/// Extract the registered domain from a hostname.
///
/// Keeps known multi-part suffixes intact ("example.co.uk" stays three
/// labels); everything else reduces to the last two labels. IP hosts are
/// returned unchanged.
pub fn registered_domain(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    if host.parse::<Ipv4Addr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let last_two = labels[labels.len() - 2..].join(".");
    if SECOND_LEVEL_SUFFIXES.contains(&last_two.as_str()) && labels.len() >= 3 {
        return labels[labels.len() - 3..].join(".");
    }
    last_two
}

/// True when the page text contains credential-harvesting phrases.
pub fn contains_login_words(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    LOGIN_WORDS.iter().any(|word| lowered.contains(word))
}
