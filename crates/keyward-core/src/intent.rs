//! Key-creation intent codec.
//!
//! A [`KeyCreationIntent`] is a not-yet-submitted "create API key" form that
//! has to survive a page navigation (pick or create a project first, then
//! land on the project page with the creation modal pre-filled). The
//! producer encodes an [`IntentDraft`] into a query string; the consumer
//! decodes whatever query it lands on.
//!
//! Decoding is total. Every input, including garbage and the empty string,
//! yields a fully populated intent with defaults filled in. Fields the
//! encoder leaves out (empty, `false`, unlimited) decode back to exactly
//! those defaults, so a consumer never has to tell "absent" from "default".
//!
//! The `key` field carries the raw upstream secret through the URL. That is
//! the contract between the producer and consumer pages; it ends up in
//! browser history and referrers along the way.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::QueryParams;

/// Query key for the intent name.
pub const NAME_PARAM: &str = "name";
/// Query key for the raw upstream secret.
pub const KEY_PARAM: &str = "key";
/// Query key for the free-text description.
pub const DESCRIPTION_PARAM: &str = "description";
/// Query key for the browser-access flag.
pub const ALLOWS_WEB_PARAM: &str = "allowsWeb";
/// Query key for the comma-joined domain whitelist.
pub const WHITELISTED_URLS_PARAM: &str = "whitelistedUrls";
/// Query key for the per-key rate limit.
pub const RATE_LIMIT_PARAM: &str = "rateLimit";
/// Query key telling the consumer to open its creation modal on load.
pub const OPEN_MODAL_PARAM: &str = "openModal";

const TRUE: &str = "true";

// ── Rate limit ───────────────────────────────────────────────────────

/// Per-key request limit, `-1` meaning unlimited.
///
/// Construction coerces every value below 1 to the sentinel, so a
/// `RateLimit` is always either `-1` or a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct RateLimit(i64);

impl RateLimit {
    /// The "unlimited / not set" sentinel.
    pub const UNLIMITED: Self = Self(-1);

    /// Wrap a raw value, coercing anything below 1 to [`RateLimit::UNLIMITED`].
    #[must_use]
    pub const fn new(value: i64) -> Self {
        if value < 1 { Self::UNLIMITED } else { Self(value) }
    }

    /// The positive limit, or `None` when unlimited.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn get(self) -> Option<u64> {
        if self.0 < 1 { None } else { Some(self.0 as u64) }
    }

    /// Wire value: the positive limit or `-1`.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        self.0 < 1
    }

    /// Parse a query value the way the dashboard always has (`parseInt`
    /// base 10), clamping failures and values below 1 to unlimited.
    pub fn parse_lenient(raw: &str) -> Self {
        parse_int_prefix(raw).map_or(Self::UNLIMITED, Self::new)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

impl From<i64> for RateLimit {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<RateLimit> for i64 {
    fn from(limit: RateLimit) -> Self {
        limit.0
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(n) => write!(f, "{n}"),
            None => f.write_str("unlimited"),
        }
    }
}

/// Leading-integer parse: optional whitespace, optional sign, then the
/// longest run of ASCII digits. `"42abc"` is 42, `"1.5"` is 1, `"abc"` is
/// `None`. Runs too long for `i64` saturate.
fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // ASCII digits only, so a parse failure means overflow.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

// ── Intent ───────────────────────────────────────────────────────────

/// A decoded, fully populated key-creation intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCreationIntent {
    pub name: String,
    pub key: String,
    pub description: String,
    pub allows_web: bool,
    /// Normalized domains: no protocol, no leading `/`, never empty.
    pub whitelisted_urls: Vec<String>,
    pub rate_limit: RateLimit,
}

impl KeyCreationIntent {
    /// Whether any field differs from its default.
    pub fn has_content(&self) -> bool {
        self != &Self::default()
    }
}

/// A partially filled intent, as known to a producer at encode time.
///
/// `None` and empty values are both left out of the encoded query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntentDraft {
    pub name: Option<String>,
    pub key: Option<String>,
    pub description: Option<String>,
    pub allows_web: Option<bool>,
    pub whitelisted_urls: Option<Vec<String>>,
    pub rate_limit: Option<i64>,
}

impl IntentDraft {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn allows_web(mut self, allows_web: bool) -> Self {
        self.allows_web = Some(allows_web);
        self
    }

    #[must_use]
    pub fn whitelisted_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelisted_urls = Some(urls.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn rate_limit(mut self, rate_limit: i64) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }
}

impl From<KeyCreationIntent> for IntentDraft {
    fn from(intent: KeyCreationIntent) -> Self {
        Self {
            name: Some(intent.name),
            key: Some(intent.key),
            description: Some(intent.description),
            allows_web: Some(intent.allows_web),
            whitelisted_urls: Some(intent.whitelisted_urls),
            rate_limit: Some(intent.rate_limit.as_i64()),
        }
    }
}

/// An intent read back by a consumer, together with the auto-open marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumedIntent {
    pub intent: KeyCreationIntent,
    pub auto_open: bool,
}

// ── Decoding ─────────────────────────────────────────────────────────

/// Decode an intent from query parameters. Never fails.
pub fn decode(params: &QueryParams) -> KeyCreationIntent {
    let text = |key: &str| params.get(key).unwrap_or_default().to_owned();

    KeyCreationIntent {
        name: text(NAME_PARAM),
        key: text(KEY_PARAM),
        description: text(DESCRIPTION_PARAM),
        allows_web: params.get(ALLOWS_WEB_PARAM) == Some(TRUE),
        whitelisted_urls: parse_whitelist(params.get(WHITELISTED_URLS_PARAM).unwrap_or_default()),
        rate_limit: params
            .get(RATE_LIMIT_PARAM)
            .map_or(RateLimit::UNLIMITED, RateLimit::parse_lenient),
    }
}

/// Parse a raw query string (or URL) and decode it.
pub fn decode_query(raw: &str) -> KeyCreationIntent {
    decode(&QueryParams::parse(raw))
}

/// Whether the query asks the consumer to open its creation UI.
pub fn wants_auto_open(params: &QueryParams) -> bool {
    params.get(OPEN_MODAL_PARAM) == Some(TRUE)
}

/// Decode both the intent and the auto-open marker from a raw query or URL.
pub fn resume(raw: &str) -> ResumedIntent {
    let params = QueryParams::parse(raw);
    let resumed = ResumedIntent {
        intent: decode(&params),
        auto_open: wants_auto_open(&params),
    };
    tracing::debug!(
        has_content = resumed.intent.has_content(),
        auto_open = resumed.auto_open,
        whitelisted = resumed.intent.whitelisted_urls.len(),
        "resumed key-creation intent"
    );
    resumed
}

/// Split a comma-joined whitelist and normalize each entry.
///
/// Entries are trimmed, lose a leading `http://` or `https://` (any case)
/// and any leading `/`, and are dropped if nothing is left. Order and
/// duplicates are preserved.
pub fn parse_whitelist(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',')
        .map(normalize_domain)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

fn normalize_domain(entry: &str) -> &str {
    let entry = entry.trim();
    let entry = strip_prefix_ignore_case(entry, "https://")
        .or_else(|| strip_prefix_ignore_case(entry, "http://"))
        .unwrap_or(entry);
    entry.trim_start_matches('/')
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

// ── Encoding ─────────────────────────────────────────────────────────

/// Encode a draft into query parameters.
///
/// Only meaningful fields are written: non-empty strings, `allowsWeb` only
/// when true, a non-empty whitelist, and a rate limit of at least 1. When
/// `include_marker` is set, `openModal=true` is appended.
pub fn encode_params(draft: &IntentDraft, include_marker: bool) -> QueryParams {
    let mut params = QueryParams::new();

    let texts = [
        (NAME_PARAM, &draft.name),
        (KEY_PARAM, &draft.key),
        (DESCRIPTION_PARAM, &draft.description),
    ];
    for (param, value) in texts {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            params.append(param, value);
        }
    }

    if draft.allows_web == Some(true) {
        params.append(ALLOWS_WEB_PARAM, TRUE);
    }

    if let Some(urls) = draft.whitelisted_urls.as_ref().filter(|u| !u.is_empty()) {
        params.append(WHITELISTED_URLS_PARAM, urls.join(","));
    }

    if let Some(limit) = draft.rate_limit.filter(|&l| l >= 1) {
        params.append(RATE_LIMIT_PARAM, limit.to_string());
    }

    if include_marker {
        params.append(OPEN_MODAL_PARAM, TRUE);
    }

    params
}

/// Encode a draft into a URL-safe query string (no leading `?`).
pub fn encode(draft: &IntentDraft, include_marker: bool) -> String {
    encode_params(draft, include_marker).to_query_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn all_defaults() -> KeyCreationIntent {
        KeyCreationIntent {
            name: String::new(),
            key: String::new(),
            description: String::new(),
            allows_web: false,
            whitelisted_urls: Vec::new(),
            rate_limit: RateLimit::UNLIMITED,
        }
    }

    #[test]
    fn decode_is_total_for_empty_and_unrelated_input() {
        assert_eq!(decode_query(""), all_defaults());
        assert_eq!(decode_query("foo=bar&&=&%%%"), all_defaults());
        assert_eq!(decode_query("?utm_source=mail#x"), all_defaults());
    }

    #[test]
    fn empty_draft_round_trips_to_defaults() {
        assert_eq!(decode_query(&encode(&IntentDraft::new(), true)), all_defaults());
        assert_eq!(decode_query(&encode(&IntentDraft::new(), false)), all_defaults());
        assert_eq!(encode(&IntentDraft::new(), false), "");
    }

    #[test]
    fn whitelist_is_normalized() {
        let params: QueryParams =
            [(WHITELISTED_URLS_PARAM, "https://api.example.com,  /foo.com ,")]
                .into_iter()
                .collect();
        assert_eq!(decode(&params).whitelisted_urls, ["api.example.com", "foo.com"]);
    }

    #[test]
    fn whitelist_protocol_strip_is_case_insensitive() {
        assert_eq!(
            parse_whitelist("HTTP://a.com,HttpS:///b.com,c.com/path"),
            ["a.com", "b.com", "c.com/path"]
        );
    }

    #[test]
    fn whitelist_keeps_order_and_duplicates() {
        assert_eq!(parse_whitelist("b.com,a.com,b.com"), ["b.com", "a.com", "b.com"]);
    }

    #[test]
    fn whitelist_of_only_separators_is_empty() {
        assert!(parse_whitelist(" , ,https://,//").is_empty());
        assert!(parse_whitelist("").is_empty());
    }

    #[test]
    fn rate_limit_clamps_to_sentinel() {
        for raw in ["rateLimit=0", "rateLimit=-5", "rateLimit=abc", "rateLimit=", ""] {
            assert_eq!(decode_query(raw).rate_limit, RateLimit::UNLIMITED, "{raw}");
        }
        assert_eq!(decode_query("rateLimit=42").rate_limit.get(), Some(42));
        assert_eq!(
            decode_query("rateLimit=123456789012345678901234").rate_limit.as_i64(),
            i64::MAX
        );
    }

    #[test]
    fn text_values_keep_surrounding_whitespace() {
        assert_eq!(decode_query("description=hello ").description, "hello ");
        assert_eq!(decode_query("name=%20padded%20").name, " padded ");
    }

    #[test]
    fn rate_limit_uses_leading_integer() {
        assert_eq!(RateLimit::parse_lenient(" 12"), RateLimit::new(12));
        assert_eq!(RateLimit::parse_lenient("42abc"), RateLimit::new(42));
        assert_eq!(RateLimit::parse_lenient("1.9"), RateLimit::new(1));
        assert_eq!(RateLimit::parse_lenient("+7"), RateLimit::new(7));
        assert_eq!(RateLimit::parse_lenient("99999999999999999999"), RateLimit::new(i64::MAX));
        assert_eq!(RateLimit::parse_lenient("-99999999999999999999"), RateLimit::UNLIMITED);
        assert_eq!(RateLimit::parse_lenient("-"), RateLimit::UNLIMITED);
    }

    #[test]
    fn rate_limit_never_holds_zero_or_negative() {
        assert_eq!(RateLimit::new(0).as_i64(), -1);
        assert_eq!(RateLimit::new(-20).as_i64(), -1);
        assert_eq!(RateLimit::new(3).as_i64(), 3);
        let parsed: RateLimit = serde_json::from_str("0").unwrap();
        assert!(parsed.is_unlimited());
    }

    #[test]
    fn encoder_omits_non_positive_rate_limits() {
        assert!(!encode(&IntentDraft::new().rate_limit(-1), false).contains("rateLimit"));
        assert!(!encode(&IntentDraft::new().rate_limit(0), false).contains("rateLimit"));
        assert_eq!(encode(&IntentDraft::new().rate_limit(5), false), "rateLimit=5");
    }

    #[test]
    fn allows_web_is_only_ever_true_on_the_wire() {
        assert_eq!(encode(&IntentDraft::new().allows_web(false), false), "");
        assert_eq!(encode(&IntentDraft::new().allows_web(true), false), "allowsWeb=true");
        assert!(!decode_query("name=x").allows_web);
        assert!(!decode_query("allowsWeb=True").allows_web);
        assert!(!decode_query("allowsWeb=1").allows_web);
    }

    #[test]
    fn empty_strings_are_omitted() {
        let draft = IntentDraft::new()
            .name("")
            .key("")
            .description("")
            .whitelisted_urls(Vec::<String>::new());
        assert_eq!(encode(&draft, false), "");
    }

    #[test]
    fn marker_follows_flag() {
        let draft = IntentDraft::new().name("x");
        assert!(encode(&draft, true).ends_with("openModal=true"));
        assert!(!encode(&draft, false).contains(OPEN_MODAL_PARAM));
        assert_eq!(encode(&IntentDraft::new(), true), "openModal=true");
    }

    #[test]
    fn end_to_end_scenario() {
        let draft = IntentDraft::new()
            .name("OpenAI")
            .whitelisted_urls(["api.openai.com"])
            .allows_web(true)
            .rate_limit(60);

        let wire = encode(&draft, true);
        assert_eq!(
            wire,
            "name=OpenAI&allowsWeb=true&whitelistedUrls=api.openai.com&rateLimit=60&openModal=true"
        );

        let resumed = resume(&wire);
        assert!(resumed.auto_open);
        assert_eq!(
            resumed.intent,
            KeyCreationIntent {
                name: "OpenAI".to_owned(),
                key: String::new(),
                description: String::new(),
                allows_web: true,
                whitelisted_urls: vec!["api.openai.com".to_owned()],
                rate_limit: RateLimit::new(60),
            }
        );
    }

    #[test]
    fn special_characters_survive_round_trip() {
        let draft = IntentDraft::new()
            .name("Prod & Staging = 100%")
            .key("sk-abc+/=?#")
            .description("line one\nline two, with comma")
            .whitelisted_urls(["a.com", "b.com/v1"]);

        let intent = decode_query(&encode(&draft, false));
        assert_eq!(intent.name, "Prod & Staging = 100%");
        assert_eq!(intent.key, "sk-abc+/=?#");
        assert_eq!(intent.description, "line one\nline two, with comma");
        assert_eq!(intent.whitelisted_urls, ["a.com", "b.com/v1"]);
    }

    #[test]
    fn decoded_intent_re_encodes_to_itself() {
        let intent =
            decode_query("name=n&whitelistedUrls=https://x.io,%20/y.io&rateLimit=9&allowsWeb=true");
        let again = decode_query(&encode(&IntentDraft::from(intent.clone()), false));
        assert_eq!(again, intent);
    }

    #[test]
    fn wants_auto_open_requires_exact_true() {
        assert!(wants_auto_open(&QueryParams::parse("openModal=true")));
        assert!(!wants_auto_open(&QueryParams::parse("openModal=1")));
        assert!(!wants_auto_open(&QueryParams::parse("")));
    }

    #[test]
    fn has_content_detects_non_defaults() {
        assert!(!all_defaults().has_content());
        assert!(decode_query("rateLimit=3").has_content());
    }

    #[test]
    fn intent_serializes_camel_case() {
        let json = serde_json::to_value(decode_query("rateLimit=4&allowsWeb=true")).unwrap();
        assert_eq!(json["rateLimit"], 4);
        assert_eq!(json["allowsWeb"], true);
        assert_eq!(json["whitelistedUrls"], serde_json::json!([]));
    }
}
