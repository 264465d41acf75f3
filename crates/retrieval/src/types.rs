//! Core retrieval types shared by adapters, ranking and the chat pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A content source a user can connect.
///
/// Declaration order is the fixed order in which sources are searched and in
/// which their results appear in references and context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Wiki pages (Confluence)
    Confluence,
    /// Mailbox messages (Gmail)
    Gmail,
    /// Chat messages (Slack)
    Slack,
}

impl Source {
    /// All sources, in search order.
    pub const ALL: [Source; 3] = [Source::Confluence, Source::Gmail, Source::Slack];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Confluence => "confluence",
            Source::Gmail => "gmail",
            Source::Slack => "slack",
        }
    }

    /// Parse a source tag. Accepts the generic kind names as aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "confluence" | "wiki" => Some(Source::Confluence),
            "gmail" | "mailbox" | "mail" => Some(Source::Gmail),
            "slack" | "chat" => Some(Source::Slack),
            _ => None,
        }
    }

    /// Character budget for a candidate's extracted content.
    pub fn char_budget(&self) -> usize {
        match self {
            Source::Confluence => 1500,
            Source::Gmail => 1200,
            Source::Slack => 1000,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search hit from a source adapter.
///
/// `content` has already been normalized and trimmed to the source's
/// character budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub content: String,
    pub source: Source,
    pub url: String,
}

impl Candidate {
    pub fn new(
        source: Source,
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source,
            url: url.into(),
        }
    }
}

/// A citation shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
    pub source: Source,
}

impl From<&Candidate> for Reference {
    fn from(candidate: &Candidate) -> Self {
        Self {
            title: candidate.title.clone(),
            url: candidate.url.clone(),
            source: candidate.source,
        }
    }
}

/// A piece of grounding text handed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBlock {
    pub source: Source,
    pub title: String,
    pub content: String,
}

impl From<Candidate> for ContextBlock {
    fn from(candidate: Candidate) -> Self {
        Self {
            source: candidate.source,
            title: candidate.title,
            content: candidate.content,
        }
    }
}

/// Per-request access tokens, one optional token per source.
///
/// Empty tokens count as absent. Tokens are never logged.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceTokens {
    #[serde(default)]
    confluence: Option<String>,
    #[serde(default)]
    gmail: Option<String>,
    #[serde(default)]
    slack: Option<String>,
}

impl SourceTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token for `source`.
    pub fn with(mut self, source: Source, token: impl Into<String>) -> Self {
        let token = Some(token.into());
        match source {
            Source::Confluence => self.confluence = token,
            Source::Gmail => self.gmail = token,
            Source::Slack => self.slack = token,
        }
        self
    }

    /// Token for `source`, if present and non-empty.
    pub fn token(&self, source: Source) -> Option<&str> {
        let token = match source {
            Source::Confluence => self.confluence.as_deref(),
            Source::Gmail => self.gmail.as_deref(),
            Source::Slack => self.slack.as_deref(),
        };
        token.filter(|t| !t.trim().is_empty())
    }

    /// Drop every token whose source is not in `sources`.
    pub fn restrict_to(mut self, sources: &[Source]) -> Self {
        for source in Source::ALL {
            if !sources.contains(&source) {
                match source {
                    Source::Confluence => self.confluence = None,
                    Source::Gmail => self.gmail = None,
                    Source::Slack => self.slack = None,
                }
            }
        }
        self
    }

    /// Sources with a usable token, in search order.
    pub fn connected(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|source| self.token(*source).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.connected().is_empty()
    }
}

impl fmt::Debug for SourceTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTokens")
            .field("connected", &self.connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_serialization() {
        assert_eq!(serde_json::to_string(&Source::Gmail).unwrap(), "\"gmail\"");
        let parsed: Source = serde_json::from_str("\"confluence\"").unwrap();
        assert_eq!(parsed, Source::Confluence);
    }

    #[test]
    fn test_source_parse_aliases() {
        assert_eq!(Source::parse("wiki"), Some(Source::Confluence));
        assert_eq!(Source::parse(" Slack "), Some(Source::Slack));
        assert_eq!(Source::parse("mailbox"), Some(Source::Gmail));
        assert_eq!(Source::parse("dropbox"), None);
    }

    #[test]
    fn test_source_order_and_budgets() {
        assert!(Source::Confluence < Source::Gmail && Source::Gmail < Source::Slack);
        assert_eq!(Source::Confluence.char_budget(), 1500);
        assert_eq!(Source::Gmail.char_budget(), 1200);
        assert_eq!(Source::Slack.char_budget(), 1000);
    }

    #[test]
    fn test_empty_tokens_are_absent() {
        let tokens = SourceTokens::new()
            .with(Source::Slack, "xoxp-1")
            .with(Source::Gmail, "  ");
        assert_eq!(tokens.token(Source::Slack), Some("xoxp-1"));
        assert_eq!(tokens.token(Source::Gmail), None);
        assert_eq!(tokens.connected(), vec![Source::Slack]);
        assert!(!tokens.is_empty());
        assert!(SourceTokens::new().is_empty());
    }

    #[test]
    fn test_restrict_tokens() {
        let tokens = SourceTokens::new()
            .with(Source::Confluence, "a")
            .with(Source::Slack, "b")
            .restrict_to(&[Source::Slack]);
        assert_eq!(tokens.connected(), vec![Source::Slack]);
    }

    #[test]
    fn test_debug_hides_tokens() {
        let tokens = SourceTokens::new().with(Source::Gmail, "ya29.secret");
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("Gmail"));
    }

    #[test]
    fn test_reference_and_context_from_candidate() {
        let candidate = Candidate::new(Source::Slack, "Message in #ops", "text", "https://x");
        let reference = Reference::from(&candidate);
        assert_eq!(reference.url, "https://x");
        let block = ContextBlock::from(candidate);
        assert_eq!(block.title, "Message in #ops");
        assert_eq!(block.source, Source::Slack);
    }
}
