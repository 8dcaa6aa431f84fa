//! Response shapes of the dashboard backend

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::filters::options::EntityOption;

/// Accept ids sent either as JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Uint(n) => n.to_string(),
    })
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrap(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrap>::deserialize(deserializer)?.map(|w| w.0))
}

/// Parse each item on its own, dropping the ones that do not fit `T`
fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    let total = raw.len();
    let items: Vec<T> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    if items.len() < total {
        debug!("Skipped {} malformed items of {}", total - items.len(), total);
    }
    Ok(items)
}

/// `GET /api/ads-data`
#[derive(Debug, Clone, Deserialize)]
pub struct AdsDataResponse {
    #[serde(default)]
    pub campaigns: Vec<CampaignRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_name: Option<String>,
}

impl From<CampaignRecord> for EntityOption {
    fn from(record: CampaignRecord) -> Self {
        EntityOption::new(record.campaign_id, record.campaign_name.unwrap_or_default(), None)
    }
}

/// `{ items: [...] }` envelope used by the adset and ad endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct ItemsResponse<T> {
    #[serde(default = "Vec::new", deserialize_with = "lenient_items")]
    pub items: Vec<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/campaign-adsets` item
#[derive(Debug, Clone, Deserialize)]
pub struct AdsetItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub campaign_id: Option<String>,
}

/// `GET /api/adset-ads` item, either `{ad: {id, name}}` or flat `{id, name}`
#[derive(Debug, Clone, Deserialize)]
pub struct AdItem {
    #[serde(default)]
    pub ad: Option<AdRef>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdRef {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl AdItem {
    /// Flatten into an option owned by `adset_id`; items without an id are dropped
    pub fn into_option(self, adset_id: &str) -> Option<EntityOption> {
        let (nested_id, nested_name) = match self.ad {
            Some(ad) => (ad.id, ad.name),
            None => (None, None),
        };
        let id = nested_id.or(self.id)?;
        let name = nested_name.or(self.name).unwrap_or_default();
        Some(EntityOption::new(id, name, Some(adset_id.to_string())))
    }
}
