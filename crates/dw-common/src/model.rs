use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::filter::{CountryFilter, EventFilter};

// ============================================================================
// Subscriptions
// ============================================================================

/// A webhook registration with optional country and event filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub id: String,
    pub url: String,
    /// Empty string matches every event kind
    #[serde(default)]
    #[schema(value_type = String, example = "CHANGE")]
    pub event: EventFilter,
    /// Empty string matches every country
    #[serde(default)]
    #[schema(value_type = String, example = "NO")]
    pub country: CountryFilter,
}

impl Subscription {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        event: EventFilter,
        country: CountryFilter,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            event,
            country,
        }
    }
}

/// Body POSTed to a subscriber. Echoes the subscription's own filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotificationPayload {
    pub id: String,
    pub country: String,
    pub event: String,
    pub time: String,
}

impl NotificationPayload {
    pub fn for_subscription(subscription: &Subscription, at: DateTime<Utc>) -> Self {
        Self {
            id: subscription.id.clone(),
            country: subscription.country.to_string(),
            event: subscription.event.to_string(),
            time: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

// ============================================================================
// Dashboards
// ============================================================================

/// Which derived data a dashboard view includes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Features {
    pub temperature: bool,
    pub precipitation: bool,
    pub capital: bool,
    pub coordinates: bool,
    pub population: bool,
    pub area: bool,
    pub target_currencies: Vec<String>,
}

/// A stored dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(default)]
    pub id: String,
    pub country: String,
    pub iso_code: String,
    #[serde(default)]
    pub features: Features,
    #[serde(default = "Utc::now")]
    pub last_change: DateTime<Utc>,
}

/// Client-supplied dashboard fields; ID and timestamp are server-assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDraft {
    pub country: String,
    pub iso_code: String,
    #[serde(default)]
    pub features: Features,
}

impl Dashboard {
    pub fn from_draft(id: impl Into<String>, draft: DashboardDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            country: draft.country,
            iso_code: draft.iso_code.trim().to_uppercase(),
            features: draft.features,
            last_change: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CountryCode, EventKind, Filter};

    #[test]
    fn test_subscription_wire_shape() {
        let sub = Subscription::new(
            "42",
            "https://hooks.example/a",
            EventKind::Change.into(),
            Filter::Any,
        );
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["event"], "CHANGE");
        assert_eq!(json["country"], "");

        let back: Subscription = serde_json::from_value(json).unwrap();
        assert_eq!(back, sub);
    }

    #[test]
    fn test_subscription_missing_filters_are_wildcards() {
        let sub: Subscription =
            serde_json::from_str(r#"{"id":"1","url":"https://1.no/1"}"#).unwrap();
        assert!(sub.event.is_any());
        assert!(sub.country.is_any());
    }

    #[test]
    fn test_payload_echoes_subscription_filters() {
        let sub = Subscription::new(
            "7",
            "https://x",
            Filter::Any,
            Filter::Exact(CountryCode::new("no")),
        );
        let at = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let payload = NotificationPayload::for_subscription(&sub, at);
        assert_eq!(payload.id, "7");
        assert_eq!(payload.country, "NO");
        assert_eq!(payload.event, "");
        assert_eq!(payload.time, "2024-03-01T12:00:00Z");
    }

    #[test]
    fn test_dashboard_camel_case_fields() {
        let raw = r#"{
            "country": "Norway",
            "isoCode": "no",
            "features": {"temperature": true, "targetCurrencies": ["EUR", "SEK"]}
        }"#;
        let draft: DashboardDraft = serde_json::from_str(raw).unwrap();
        let dash = Dashboard::from_draft("99", draft, Utc::now());
        assert_eq!(dash.iso_code, "NO");
        assert!(dash.features.temperature);
        assert!(!dash.features.area);

        let json = serde_json::to_value(&dash).unwrap();
        assert!(json.get("lastChange").is_some());
        assert_eq!(json["features"]["targetCurrencies"][1], "SEK");
    }
}
