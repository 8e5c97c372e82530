//! Coarse visitor client classification
//!
//! Device, browser and OS labels are resolved from ordered rule tables: the
//! first rule with a matching needle wins and anything unmatched falls back to
//! [`UNKNOWN_LABEL`]. Matching is case-insensitive substring search over the
//! `User-Agent` header, so malformed or hostile values can only ever produce
//! the fallback label.

use axum::http::{header::USER_AGENT, HeaderMap};
use serde::Serialize;

pub const UNKNOWN_LABEL: &str = "Other";

/// Longest user agent persisted with a click record
pub const MAX_STORED_USER_AGENT_LEN: usize = 512;

/// A single classification rule: label applies when any needle is present
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub needles: &'static [&'static str],
    pub label: &'static str,
}

impl Rule {
    const fn new(needles: &'static [&'static str], label: &'static str) -> Self {
        Self { needles, label }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.needles.iter().any(|needle| haystack.contains(needle))
    }
}

// Tablets before phones: Android tablets omit "mobi", so bare "android" only
// lands on Tablet after the Mobile rule has had its chance.
pub const DEVICE_RULES: &[Rule] = &[
    Rule::new(&["bot", "crawl", "spider", "slurp", "facebookexternalhit"], "Bot"),
    Rule::new(&["ipad", "tablet", "kindle", "silk/", "playbook"], "Tablet"),
    Rule::new(
        &["mobi", "iphone", "ipod", "windows phone", "blackberry", "opera mini"],
        "Mobile",
    ),
    Rule::new(&["android"], "Tablet"),
    Rule::new(&["windows nt", "macintosh", "x11", "cros", "linux"], "Desktop"),
];

// Chromium derivatives advertise "chrome/" and "safari/" too.
pub const BROWSER_RULES: &[Rule] = &[
    Rule::new(&["edg/", "edge/", "edga/", "edgios/"], "Edge"),
    Rule::new(&["opr/", "opera"], "Opera"),
    Rule::new(&["samsungbrowser/"], "Samsung Internet"),
    Rule::new(&["chrome/", "crios/", "chromium/"], "Chrome"),
    Rule::new(&["firefox/", "fxios/"], "Firefox"),
    Rule::new(&["safari/"], "Safari"),
    Rule::new(&["msie ", "trident/"], "Internet Explorer"),
];

// iOS user agents contain "like Mac OS X"; Android ones contain "Linux".
pub const OS_RULES: &[Rule] = &[
    Rule::new(&["windows phone"], "Windows Phone"),
    Rule::new(&["windows"], "Windows"),
    Rule::new(&["iphone", "ipad", "ipod"], "iOS"),
    Rule::new(&["android"], "Android"),
    Rule::new(&["cros"], "Chrome OS"),
    Rule::new(&["mac os x", "macintosh"], "macOS"),
    Rule::new(&["linux", "x11"], "Linux"),
];

/// Evaluate a rule table top to bottom against a lower-cased haystack
pub fn first_match(rules: &[Rule], haystack: &str) -> &'static str {
    rules
        .iter()
        .find(|rule| rule.matches(haystack))
        .map(|rule| rule.label)
        .unwrap_or(UNKNOWN_LABEL)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientProfile {
    pub device: String,
    pub browser: String,
    pub os: String,
}

impl ClientProfile {
    pub fn unknown() -> Self {
        Self {
            device: UNKNOWN_LABEL.to_string(),
            browser: UNKNOWN_LABEL.to_string(),
            os: UNKNOWN_LABEL.to_string(),
        }
    }

    pub fn from_user_agent(user_agent: &str) -> Self {
        let haystack = user_agent.to_lowercase();
        Self {
            device: first_match(DEVICE_RULES, &haystack).to_string(),
            browser: first_match(BROWSER_RULES, &haystack).to_string(),
            os: first_match(OS_RULES, &haystack).to_string(),
        }
    }

    /// Classify a request from its headers.
    ///
    /// The `Sec-CH-UA-Mobile: ?1` client hint upgrades an unclassified device
    /// to Mobile, which covers browsers that send reduced user agents.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_agent = user_agent(headers).unwrap_or_default();
        let mut profile = Self::from_user_agent(&user_agent);

        if profile.device == UNKNOWN_LABEL
            && header_lossy(headers, "sec-ch-ua-mobile").as_deref() == Some("?1")
        {
            profile.device = "Mobile".to_string();
        }

        profile
    }
}

/// Raw user agent, lossily decoded and truncated for storage
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(USER_AGENT)?;
    let decoded = String::from_utf8_lossy(raw.as_bytes());
    let truncated: String = decoded.chars().take(MAX_STORED_USER_AGENT_LEN).collect();
    Some(truncated)
}

pub(crate) fn header_lossy(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).trim().to_string())
        .filter(|value| !value.is_empty())
}
