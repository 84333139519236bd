//! The page-view event and its wire encoding.

use url::Url;

use super::error::DomainError;

pub const PARAM_REFERRER: &str = "referrer";
pub const PARAM_TITLE: &str = "title";
pub const PARAM_AGENT: &str = "agent";
pub const PARAM_BOT: &str = "bot";
pub const PARAM_LANGUAGE: &str = "language";
pub const PARAM_SITE: &str = "site";

/// Every parameter name a tracking request carries.
pub const EVENT_PARAMS: [&str; 6] = [
    PARAM_REFERRER,
    PARAM_TITLE,
    PARAM_AGENT,
    PARAM_BOT,
    PARAM_LANGUAGE,
    PARAM_SITE,
];

/// Identifier distinguishing this content source among those sharing a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteId(String);

impl SiteId {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("site identifier must not be empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(format!(
                "site identifier `{trimmed}` must not contain whitespace"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single page view, built at DOM-ready and consumed by exactly one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingEvent {
    pub referrer: String,
    pub title: Option<String>,
    pub agent: String,
    pub bot: bool,
    pub language: String,
    pub site: SiteId,
}

impl TrackingEvent {
    /// Query pairs in wire order. `title` is omitted when the page had none.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(6);
        pairs.push((PARAM_REFERRER, self.referrer.as_str()));
        if let Some(title) = self.title.as_deref() {
            pairs.push((PARAM_TITLE, title));
        }
        pairs.push((PARAM_AGENT, self.agent.as_str()));
        pairs.push((PARAM_BOT, if self.bot { "true" } else { "false" }));
        pairs.push((PARAM_LANGUAGE, self.language.as_str()));
        pairs.push((PARAM_SITE, self.site.as_str()));
        pairs
    }

    /// Append the event to `endpoint`, keeping any query the endpoint already has.
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in self.query_pairs() {
                query.append_pair(key, value);
            }
        }
        url
    }
}
