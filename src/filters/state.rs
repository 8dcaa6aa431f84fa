//! Filter selection state

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::FilterError;

/// Sentinel used on the wire for "no filter at this level"
pub const ALL: &str = "all";

/// Named relative date range, or an explicit custom range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    #[serde(rename = "last_7d")]
    Last7d,
    #[default]
    #[serde(rename = "last_30d")]
    Last30d,
    #[serde(rename = "last_90d")]
    Last90d,
    #[serde(rename = "last_180d")]
    Last180d,
    Lifetime,
    Custom,
}

impl DatePreset {
    pub const ALL_PRESETS: [DatePreset; 6] = [
        DatePreset::Last7d,
        DatePreset::Last30d,
        DatePreset::Last90d,
        DatePreset::Last180d,
        DatePreset::Lifetime,
        DatePreset::Custom,
    ];

    /// Wire name, e.g. "last_30d"
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePreset::Last7d => "last_7d",
            DatePreset::Last30d => "last_30d",
            DatePreset::Last90d => "last_90d",
            DatePreset::Last180d => "last_180d",
            DatePreset::Lifetime => "lifetime",
            DatePreset::Custom => "custom",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            DatePreset::Last7d => "Last 7 days",
            DatePreset::Last30d => "Last 30 days",
            DatePreset::Last90d => "Last 90 days",
            DatePreset::Last180d => "Last 180 days",
            DatePreset::Lifetime => "Lifetime",
            DatePreset::Custom => "Custom range",
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, DatePreset::Custom)
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatePreset {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatePreset::ALL_PRESETS
            .iter()
            .find(|p| p.as_str() == s.trim())
            .copied()
            .ok_or_else(|| FilterError::InvalidPreset(s.to_string()))
    }
}

/// Selection at one level of the entity hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Selection {
    /// No filter at this level
    #[default]
    All,
    /// A concrete entity id (or brand name)
    Id(String),
}

impl Selection {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    /// The concrete id, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Id(id) => Some(id),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Selection::All => ALL,
            Selection::Id(id) => id,
        }
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL {
            Selection::All
        } else {
            Selection::Id(value.to_string())
        }
    }
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        Selection::from(value.as_str())
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Selection::from(raw))
    }
}

/// Levels of the brand → campaign → adset → ad hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterLevel {
    Brand = 0,
    Campaign = 1,
    Adset = 2,
    Ad = 3,
}

/// Current filter selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub date_preset: DatePreset,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub brand: Selection,
    pub campaign: Selection,
    pub adset: Selection,
    pub ad: Selection,
}

impl FilterState {
    /// Initial state: every level "all", last 30 days
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `level` and reset every level below it to `All`
    pub fn select(&mut self, level: FilterLevel, selection: Selection) {
        match level {
            FilterLevel::Brand => {
                self.brand = selection;
                self.campaign = Selection::All;
                self.adset = Selection::All;
                self.ad = Selection::All;
            }
            FilterLevel::Campaign => {
                self.campaign = selection;
                self.adset = Selection::All;
                self.ad = Selection::All;
            }
            FilterLevel::Adset => {
                self.adset = selection;
                self.ad = Selection::All;
            }
            FilterLevel::Ad => {
                self.ad = selection;
            }
        }
    }

    /// Set the preset, dropping custom bounds unless the preset is custom
    pub fn set_date_preset(&mut self, preset: DatePreset) {
        self.date_preset = preset;
        if !preset.is_custom() {
            self.date_from = None;
            self.date_to = None;
        }
    }

    /// Both custom bounds, when the preset is custom and neither is empty
    pub fn custom_range(&self) -> Option<(&str, &str)> {
        if !self.date_preset.is_custom() {
            return None;
        }
        match (self.date_from.as_deref(), self.date_to.as_deref()) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => Some((from, to)),
            _ => None,
        }
    }
}
