//! Default whitelisted-domain inference from a key name.
//!
//! When someone names a key "OpenAI prod" they almost certainly want it to
//! reach `api.openai.com`. [`DomainTable`] is a static lookup of
//! `(name fragment, domain)` pairs consulted by producers that have a name
//! but no whitelist yet. It is deliberately kept apart from the intent codec;
//! swap the table with [`DomainTable::new`].

/// Built-in fragments, checked in order. More specific fragments come first
/// so that e.g. "openrouter" does not resolve to the `OpenAI` domain.
const BUILTIN: &[(&str, &str)] = &[
    ("openrouter", "openrouter.ai"),
    ("azureopenai", "openai.azure.com"),
    ("openai", "api.openai.com"),
    ("chatgpt", "api.openai.com"),
    ("anthropic", "api.anthropic.com"),
    ("claude", "api.anthropic.com"),
    ("gemini", "generativelanguage.googleapis.com"),
    ("googleai", "generativelanguage.googleapis.com"),
    ("mistral", "api.mistral.ai"),
    ("groq", "api.groq.com"),
    ("cohere", "api.cohere.com"),
    ("deepseek", "api.deepseek.com"),
    ("perplexity", "api.perplexity.ai"),
    ("together", "api.together.xyz"),
    ("fireworks", "api.fireworks.ai"),
    ("replicate", "api.replicate.com"),
    ("huggingface", "api-inference.huggingface.co"),
    ("elevenlabs", "api.elevenlabs.io"),
    ("stability", "api.stability.ai"),
    ("xai", "api.x.ai"),
    ("grok", "api.x.ai"),
    ("stripe", "api.stripe.com"),
    ("twilio", "api.twilio.com"),
    ("sendgrid", "api.sendgrid.com"),
    ("resend", "api.resend.com"),
    ("mapbox", "api.mapbox.com"),
];

/// A swappable `(fragment, domain)` lookup table.
#[derive(Debug, Clone, Copy)]
pub struct DomainTable {
    entries: &'static [(&'static str, &'static str)],
}

impl DomainTable {
    /// Use a custom table. Fragments must be lowercase ASCII without
    /// separators to match.
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// The table shipped with the dashboard.
    pub const fn builtin() -> Self {
        Self::new(BUILTIN)
    }

    /// Suggest a domain for a typed key name.
    ///
    /// The name is lowercased and stripped of whitespace, `-`, `_` and `.`
    /// before the first fragment contained in it wins.
    pub fn suggest(&self, name: &str) -> Option<&'static str> {
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.'))
            .flat_map(char::to_lowercase)
            .collect();
        if normalized.is_empty() {
            return None;
        }

        let hit = self
            .entries
            .iter()
            .find(|(fragment, _)| normalized.contains(fragment))
            .map(|&(_, domain)| domain);
        tracing::trace!(name, suggestion = ?hit, "domain lookup");
        hit
    }

    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }
}

impl Default for DomainTable {
    fn default() -> Self {
        Self::builtin()
    }
}
