use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::domain::non_blank;

/// Read-only view of the page that hosted the form at submission time.
pub trait AttributionSource: Sync {
    fn query_param(&self, name: &str) -> Option<String>;
    fn referrer(&self) -> Option<String>;
    fn user_agent(&self) -> Option<String>;
    fn page_path(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Mobile,
    #[default]
    Desktop,
}

impl DeviceType {
    /// Coarse user-agent sniff; an absent user-agent counts as desktop.
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        static MOBILE: OnceLock<Regex> = OnceLock::new();
        let pattern = MOBILE
            .get_or_init(|| Regex::new(r"(?i)Mobile|Android|iPhone").expect("device pattern compiles"));

        match user_agent {
            Some(agent) if pattern.is_match(agent) => Self::Mobile,
            _ => Self::Desktop,
        }
    }
}

/// Marketing metadata captured once per submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
    pub referrer_url: Option<String>,
    pub landing_page: Option<String>,
    pub device_type: DeviceType,
    pub browser: Option<String>,
}

impl Attribution {
    /// Reads every field from `source`. Absent or blank values become `None`; this never fails.
    pub fn capture(source: &dyn AttributionSource) -> Self {
        let param = |name: &str| source.query_param(name).as_deref().and_then(non_blank);
        let user_agent = source.user_agent().as_deref().and_then(non_blank);

        Self {
            utm_source: param("utm_source"),
            utm_medium: param("utm_medium"),
            utm_campaign: param("utm_campaign"),
            utm_content: param("utm_content"),
            utm_term: param("utm_term"),
            referrer_url: source.referrer().as_deref().and_then(non_blank),
            landing_page: source.page_path().as_deref().and_then(non_blank),
            device_type: DeviceType::from_user_agent(user_agent.as_deref()),
            browser: user_agent,
        }
    }

    pub fn campaign(&self) -> CampaignAttribution {
        CampaignAttribution {
            utm_source: self.utm_source.clone(),
            utm_campaign: self.utm_campaign.clone(),
            referrer_url: self.referrer_url.clone(),
            device_type: self.device_type,
        }
    }
}

/// The attribution subset stored alongside masterclass registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignAttribution {
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub referrer_url: Option<String>,
    pub device_type: DeviceType,
}

/// Page context reported by the browser client alongside an advance request.
///
/// `page_url` may be absolute or a path such as `/event?utm_source=newsletter`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientContext {
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(skip)]
    pub user_agent: Option<String>,
}

impl ClientContext {
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    fn page(&self) -> Option<Url> {
        let raw = self.page_url.as_deref()?.trim();
        match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://localhost")
                .and_then(|base| base.join(raw))
                .ok(),
            Err(_) => None,
        }
    }
}

impl AttributionSource for ClientContext {
    fn query_param(&self, name: &str) -> Option<String> {
        self.page()?
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    fn referrer(&self) -> Option<String> {
        self.referrer.clone()
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn page_path(&self) -> Option<String> {
        self.page().map(|url| url.path().to_string())
    }
}
