//! Producer and consumer ends of the key-creation flow.
//!
//! The producer turns command-line flags into an encoded dashboard URL that
//! lands on either the project chooser (`/projects/new`) or a project page.
//! The consumer takes such a URL back, decodes the intent, and lets flags
//! fill in or override fields before the key is submitted.

use uuid::Uuid;

use keyward_core::intent::parse_whitelist;
use keyward_core::{DomainTable, IntentDraft, KeyCreationIntent, RateLimit};

/// Dashboard URL carrying an encoded intent.
///
/// With a project the URL opens that project's page; without one it opens
/// the chooser, which forwards the query once a project is picked.
pub fn dashboard_url(base: &str, project: Option<Uuid>, query: &str) -> String {
    let base = base.trim_end_matches('/');
    let page = project.map_or_else(|| "new".to_owned(), |id| id.to_string());
    if query.is_empty() {
        format!("{base}/projects/{page}")
    } else {
        format!("{base}/projects/{page}?{query}")
    }
}

/// Project id from a dashboard URL path such as `/projects/<uuid>?…`.
pub fn project_from_url(url: &str) -> Option<Uuid> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let mut segments = path.split('/');
    while let Some(segment) = segments.next() {
        if segment == "projects" {
            return segments.next().and_then(|id| id.parse().ok());
        }
    }
    None
}

/// Fill an empty whitelist from the domain table, returning the suggestion.
pub fn apply_domain_suggestion(
    draft: &mut IntentDraft,
    table: &DomainTable,
) -> Option<&'static str> {
    let has_whitelist = draft.whitelisted_urls.as_ref().is_some_and(|u| !u.is_empty());
    if has_whitelist {
        return None;
    }
    let suggestion = table.suggest(draft.name.as_deref()?)?;
    draft.whitelisted_urls = Some(vec![suggestion.to_owned()]);
    Some(suggestion)
}

/// Overlay non-empty draft fields on a resumed intent.
///
/// Override values go through the same normalization as decoding, so the
/// result keeps the intent's invariants.
pub fn merge_overrides(
    mut intent: KeyCreationIntent,
    overrides: &IntentDraft,
) -> KeyCreationIntent {
    let texts = [
        (&mut intent.name, &overrides.name),
        (&mut intent.key, &overrides.key),
        (&mut intent.description, &overrides.description),
    ];
    for (field, value) in texts {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            value.clone_into(field);
        }
    }
    if let Some(allows_web) = overrides.allows_web {
        intent.allows_web = allows_web;
    }
    if let Some(urls) = overrides.whitelisted_urls.as_ref().filter(|u| !u.is_empty()) {
        intent.whitelisted_urls = parse_whitelist(&urls.join(","));
    }
    if let Some(limit) = overrides.rate_limit {
        intent.rate_limit = RateLimit::new(limit);
    }
    intent
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use keyward_core::decode_query;

    const ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    #[test]
    fn url_targets_chooser_or_project() {
        assert_eq!(
            dashboard_url("https://app.keyward.dev/", None, "name=x"),
            "https://app.keyward.dev/projects/new?name=x"
        );
        let id: Uuid = ID.parse().unwrap();
        assert_eq!(
            dashboard_url("https://app.keyward.dev", Some(id), ""),
            format!("https://app.keyward.dev/projects/{ID}")
        );
    }

    #[test]
    fn project_id_is_read_from_path() {
        let url = format!("https://app.keyward.dev/projects/{ID}?name=x&openModal=true");
        assert_eq!(project_from_url(&url), Some(ID.parse().unwrap()));
        assert_eq!(project_from_url("https://app.keyward.dev/projects/new?name=x"), None);
        assert_eq!(project_from_url("name=x"), None);
    }

    #[test]
    fn suggestion_only_fills_empty_whitelist() {
        let table = DomainTable::builtin();

        let mut draft = IntentDraft::new().name("OpenAI");
        assert_eq!(apply_domain_suggestion(&mut draft, &table), Some("api.openai.com"));
        assert_eq!(draft.whitelisted_urls, Some(vec!["api.openai.com".to_owned()]));

        let mut draft = IntentDraft::new().name("OpenAI").whitelisted_urls(["proxy.example"]);
        assert_eq!(apply_domain_suggestion(&mut draft, &table), None);
        assert_eq!(draft.whitelisted_urls, Some(vec!["proxy.example".to_owned()]));

        let mut draft = IntentDraft::new();
        assert_eq!(apply_domain_suggestion(&mut draft, &table), None);
    }

    #[test]
    fn overrides_fill_and_normalize() {
        let intent = decode_query("name=OpenAI&rateLimit=10&allowsWeb=true");
        let overrides = IntentDraft::new()
            .key("sk-1")
            .name("")
            .whitelisted_urls(["https://api.openai.com/", " "])
            .rate_limit(0);

        let merged = merge_overrides(intent, &overrides);
        assert_eq!(merged.name, "OpenAI");
        assert_eq!(merged.key, "sk-1");
        assert!(merged.allows_web);
        assert_eq!(merged.whitelisted_urls, ["api.openai.com/"]);
        assert!(merged.rate_limit.is_unlimited());
    }
}
