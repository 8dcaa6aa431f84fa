//! Flat query parameters sent to the dashboard backend

use serde::{Deserialize, Serialize};

use super::state::{DatePreset, FilterState};

/// Parameters derived from a [`FilterState`]
///
/// `date_preset` is always present. The custom bounds appear only for a
/// complete custom range, and entity filters only when they are not "all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub date_preset: DatePreset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl QueryParams {
    pub fn from_state(state: &FilterState) -> Self {
        let (since, until) = match state.custom_range() {
            Some((from, to)) => (Some(from.to_string()), Some(to.to_string())),
            None => (None, None),
        };

        Self {
            date_preset: state.date_preset,
            since,
            until,
            campaign_id: state.campaign.id().map(str::to_string),
            adset_id: state.adset.id().map(str::to_string),
            ad_id: state.ad.id().map(str::to_string),
            brand: state.brand.id().map(str::to_string),
        }
    }

    /// Ordered `(key, value)` pairs for a query string
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("date_preset", self.date_preset.as_str().to_string())];
        let optional = [
            ("since", &self.since),
            ("until", &self.until),
            ("campaign_id", &self.campaign_id),
            ("adset_id", &self.adset_id),
            ("ad_id", &self.ad_id),
            ("brand", &self.brand),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        pairs
    }
}

impl From<&FilterState> for QueryParams {
    fn from(state: &FilterState) -> Self {
        QueryParams::from_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::state::{FilterLevel, Selection};
    use serde_json::json;

    #[test]
    fn test_default_params() {
        let params = QueryParams::from_state(&FilterState::new());
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"date_preset": "last_30d"})
        );
        assert_eq!(params.to_pairs(), vec![("date_preset", "last_30d".to_string())]);
    }

    #[test]
    fn test_entity_filters_omitted_when_all() {
        let mut state = FilterState::new();
        state.select(FilterLevel::Brand, "LS2".into());
        state.select(FilterLevel::Campaign, "123".into());
        state.select(FilterLevel::Adset, "456".into());

        let params = QueryParams::from_state(&state);
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "date_preset": "last_30d",
                "campaign_id": "123",
                "adset_id": "456",
                "brand": "LS2"
            })
        );

        state.select(FilterLevel::Campaign, Selection::All);
        let params = QueryParams::from_state(&state);
        assert!(params.campaign_id.is_none());
        assert!(params.adset_id.is_none());
        assert_eq!(params.brand.as_deref(), Some("LS2"));
    }

    #[test]
    fn test_since_until_require_complete_custom_range() {
        let mut state = FilterState::new();
        state.set_date_preset(DatePreset::Custom);
        state.date_from = Some("2024-01-01".into());
        let params = QueryParams::from_state(&state);
        assert_eq!(params.date_preset, DatePreset::Custom);
        assert!(params.since.is_none());
        assert!(params.until.is_none());

        state.date_to = Some(String::new());
        assert!(QueryParams::from_state(&state).until.is_none());

        state.date_to = Some("2024-01-31".into());
        let params = QueryParams::from_state(&state);
        assert_eq!(
            params.to_pairs(),
            vec![
                ("date_preset", "custom".to_string()),
                ("since", "2024-01-01".to_string()),
                ("until", "2024-01-31".to_string()),
            ]
        );

        // Stale bounds under a non-custom preset are never sent
        state.date_preset = DatePreset::Last7d;
        let params = QueryParams::from_state(&state);
        assert!(params.since.is_none());
        assert!(params.until.is_none());
    }
}
