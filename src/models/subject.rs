use crate::error::ConfigError;
use crate::models::condition::Condition;
use std::time::Duration;
use url::Url;

/// Where a subject's state comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectSource {
    /// Traded instrument polled from the quote feed, e.g. `SZ002261`
    Quote { code: String },
    /// Product page checked for stock through the page extractor
    Listing { url: String, site: Option<String> },
}

/// A monitored entity. Read-only during a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub source: SubjectSource,
    pub conditions: Vec<Condition>,
    pub cooldown: Option<Duration>,
}

impl Subject {
    pub fn quote(code: impl Into<String>, name: impl Into<String>, conditions: Vec<Condition>) -> Self {
        let code = code.into();
        Self {
            id: code.clone(),
            name: name.into(),
            source: SubjectSource::Quote { code },
            conditions,
            cooldown: None,
        }
    }

    /// A product listing. Without conditions it alerts whenever the product is in stock.
    pub fn listing(url: impl Into<String>, name: impl Into<String>, conditions: Vec<Condition>) -> Self {
        let url = url.into();
        let conditions = if conditions.is_empty() {
            vec![Condition::Above {
                value: 0.0,
                message: Some("Back in stock".to_string()),
            }]
        } else {
            conditions
        };
        Self {
            id: url.clone(),
            name: name.into(),
            source: SubjectSource::Listing { url, site: None },
            conditions,
            cooldown: None,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        if let SubjectSource::Listing { site: ref mut s, .. } = self.source {
            *s = Some(site.into());
        }
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Quotes only trade inside exchange sessions; listings are checked any time.
    pub fn requires_market_gate(&self) -> bool {
        matches!(self.source, SubjectSource::Quote { .. })
    }
}

/// Host of a listing URL with any leading `www.` removed
pub fn site_for_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?;
    Ok(host.trim_start_matches("www.").to_string())
}

impl Subject {
    /// Site a listing belongs to: the configured one, else derived from its URL.
    /// `None` for quotes.
    pub fn listing_site(&self) -> Result<Option<String>, ConfigError> {
        match &self.source {
            SubjectSource::Quote { .. } => Ok(None),
            SubjectSource::Listing { site: Some(site), .. } => Ok(Some(site.clone())),
            SubjectSource::Listing { url, site: None } => site_for_url(url).map(Some),
        }
    }
}
