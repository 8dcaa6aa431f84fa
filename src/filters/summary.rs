//! Human readable summary of the filters currently in effect

use std::fmt;

use serde::Serialize;

use super::options::{EntityKind, EntityOption, OptionCache};
use super::state::{DatePreset, FilterState};

/// One non-default filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveFilter {
    Date(DatePreset),
    Brand(String),
    Campaign { id: String, name: Option<String> },
    Adset(String),
    Ad(String),
}

impl fmt::Display for ActiveFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveFilter::Date(preset) => write!(f, "Date: {}", preset.label()),
            ActiveFilter::Brand(brand) => write!(f, "Brand: {}", brand),
            ActiveFilter::Campaign { id, name } => {
                write!(f, "Campaign: {}", name.as_deref().unwrap_or(id))
            }
            ActiveFilter::Adset(id) => write!(f, "Adset: {}", id),
            ActiveFilter::Ad(id) => write!(f, "Ad: {}", id),
        }
    }
}

/// Every filter that differs from the initial state, in hierarchy order
///
/// Campaign names are resolved from `catalog` first, then from the current
/// campaign options.
pub fn active_filters(
    state: &FilterState,
    options: &OptionCache,
    catalog: &[EntityOption],
) -> Vec<ActiveFilter> {
    let mut active = Vec::new();

    if state.date_preset != DatePreset::default() {
        active.push(ActiveFilter::Date(state.date_preset));
    }
    if let Some(brand) = state.brand.id() {
        active.push(ActiveFilter::Brand(brand.to_string()));
    }
    if let Some(id) = state.campaign.id() {
        let name = catalog
            .iter()
            .find(|c| c.id == id)
            .or_else(|| options.find(EntityKind::Campaigns, id))
            .map(|c| c.name.clone())
            .filter(|n| !n.is_empty());
        active.push(ActiveFilter::Campaign {
            id: id.to_string(),
            name,
        });
    }
    if let Some(id) = state.adset.id() {
        active.push(ActiveFilter::Adset(id.to_string()));
    }
    if let Some(id) = state.ad.id() {
        active.push(ActiveFilter::Ad(id.to_string()));
    }

    active
}

/// One-line status text, e.g. "Applied: Brand: LS2, Campaign: Summer"
pub fn status_line(active: &[ActiveFilter]) -> String {
    if active.is_empty() {
        return "No filters applied".to_string();
    }
    let parts: Vec<String> = active.iter().map(ToString::to_string).collect();
    format!("Applied: {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::state::FilterLevel;

    #[test]
    fn test_default_state_has_no_active_filters() {
        let active = active_filters(&FilterState::new(), &OptionCache::default(), &[]);
        assert!(active.is_empty());
        assert_eq!(status_line(&active), "No filters applied");
    }

    #[test]
    fn test_summary_resolves_campaign_name() {
        let mut state = FilterState::new();
        state.set_date_preset(DatePreset::Last7d);
        state.select(FilterLevel::Brand, "LS2".into());
        state.select(FilterLevel::Campaign, "c1".into());
        state.select(FilterLevel::Adset, "s1".into());

        let catalog = vec![EntityOption::new("c1", "LS2 | Summer", None)];
        let active = active_filters(&state, &OptionCache::default(), &catalog);

        assert_eq!(active.len(), 4);
        assert_eq!(active[0], ActiveFilter::Date(DatePreset::Last7d));
        assert_eq!(active[1], ActiveFilter::Brand("LS2".into()));
        assert_eq!(active[3], ActiveFilter::Adset("s1".into()));
        assert_eq!(
            status_line(&active),
            "Applied: Date: Last 7 days, Brand: LS2, Campaign: LS2 | Summer, Adset: s1"
        );
    }

    #[test]
    fn test_unknown_campaign_falls_back_to_id() {
        let mut state = FilterState::new();
        state.select(FilterLevel::Campaign, "c9".into());
        let active = active_filters(&state, &OptionCache::default(), &[]);
        assert_eq!(active[0].to_string(), "Campaign: c9");
    }
}
