//! Option lists backing the filter dropdowns

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of entity an option list holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Brands,
    Campaigns,
    Adsets,
    Ads,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Brands => "brands",
            EntityKind::Campaigns => "campaigns",
            EntityKind::Adsets => "adsets",
            EntityKind::Ads => "ads",
        };
        f.write_str(name)
    }
}

/// One selectable entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOption {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl EntityOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id,
        }
    }

    /// Text shown in a dropdown; falls back to the id for unnamed entities
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Currently available options per entity kind
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptionCache {
    pub brands: Vec<EntityOption>,
    pub campaigns: Vec<EntityOption>,
    pub adsets: Vec<EntityOption>,
    pub ads: Vec<EntityOption>,
}

impl OptionCache {
    pub fn get(&self, kind: EntityKind) -> &[EntityOption] {
        match kind {
            EntityKind::Brands => &self.brands,
            EntityKind::Campaigns => &self.campaigns,
            EntityKind::Adsets => &self.adsets,
            EntityKind::Ads => &self.ads,
        }
    }

    pub fn replace(&mut self, kind: EntityKind, options: Vec<EntityOption>) {
        match kind {
            EntityKind::Brands => self.brands = options,
            EntityKind::Campaigns => self.campaigns = options,
            EntityKind::Adsets => self.adsets = options,
            EntityKind::Ads => self.ads = options,
        }
    }

    pub fn clear(&mut self, kind: EntityKind) {
        self.replace(kind, Vec::new());
    }

    pub fn find(&self, kind: EntityKind, id: &str) -> Option<&EntityOption> {
        self.get(kind).iter().find(|o| o.id == id)
    }
}

/// Infers a campaign's brand from its name by substring matching
#[derive(Debug, Clone)]
pub struct BrandMatcher {
    brands: Vec<String>,
}

impl BrandMatcher {
    pub fn new(brands: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            brands: brands.into_iter().map(Into::into).collect(),
        }
    }

    /// Configured spelling of `brand`, matched case-insensitively
    pub fn canonical(&self, brand: &str) -> Option<&str> {
        self.brands
            .iter()
            .find(|b| b.eq_ignore_ascii_case(brand))
            .map(String::as_str)
    }

    /// First configured brand contained in `campaign_name`, case-insensitive
    pub fn brand_of(&self, campaign_name: &str) -> Option<&str> {
        let name = campaign_name.to_lowercase();
        self.brands
            .iter()
            .find(|b| !b.is_empty() && name.contains(&b.to_lowercase()))
            .map(String::as_str)
    }

    /// Campaigns whose name maps to `brand`
    pub fn filter_campaigns(&self, campaigns: &[EntityOption], brand: &str) -> Vec<EntityOption> {
        campaigns
            .iter()
            .filter(|c| {
                self.brand_of(&c.name)
                    .is_some_and(|b| b.eq_ignore_ascii_case(brand))
            })
            .cloned()
            .collect()
    }

    /// Brand dropdown options, in configured order
    pub fn brand_options(&self) -> Vec<EntityOption> {
        self.brands
            .iter()
            .map(|b| EntityOption::new(b.as_str(), b.as_str(), None))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(id: &str, name: &str) -> EntityOption {
        EntityOption::new(id, name, None)
    }

    #[test]
    fn test_brand_matching_is_case_insensitive() {
        let matcher = BrandMatcher::new(["LS2", "Bulldog", "EGO"]);
        assert_eq!(matcher.brand_of("Summer sale ls2 helmets"), Some("LS2"));
        assert_eq!(matcher.brand_of("BULLDOG | Retarget"), Some("Bulldog"));
        assert_eq!(matcher.brand_of("Generic awareness"), None);
    }

    #[test]
    fn test_brand_order_wins() {
        let matcher = BrandMatcher::new(["LS2", "EGO"]);
        assert_eq!(matcher.brand_of("ego x ls2 collab"), Some("LS2"));
    }

    #[test]
    fn test_brand_options_and_filter() {
        let matcher = BrandMatcher::new(["LS2", "Bulldog", "EGO"]);
        let campaigns = vec![
            campaign("1", "LS2 traffic"),
            campaign("2", "Bulldog launch"),
            campaign("3", "ls2 conversions"),
            campaign("4", "Unbranded"),
        ];

        let brands: Vec<String> = matcher.brand_options().into_iter().map(|b| b.id).collect();
        assert_eq!(brands, vec!["LS2", "Bulldog", "EGO"]);

        let ls2: Vec<String> = matcher
            .filter_campaigns(&campaigns, "LS2")
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ls2, vec!["1", "3"]);
        assert_eq!(matcher.filter_campaigns(&campaigns, "ls2").len(), 2);
    }

    #[test]
    fn test_canonical_brand_spelling() {
        let matcher = BrandMatcher::new(["LS2", "Bulldog"]);
        assert_eq!(matcher.canonical("ls2"), Some("LS2"));
        assert_eq!(matcher.canonical("BULLDOG"), Some("Bulldog"));
        assert_eq!(matcher.canonical("Nolan"), None);
    }

    #[test]
    fn test_cache_replace_and_find() {
        let mut cache = OptionCache::default();
        cache.replace(
            EntityKind::Adsets,
            vec![EntityOption::new("s1", "", Some("c1".into()))],
        );
        assert_eq!(cache.get(EntityKind::Adsets).len(), 1);
        assert_eq!(cache.find(EntityKind::Adsets, "s1").unwrap().display_name(), "s1");
        cache.clear(EntityKind::Adsets);
        assert!(cache.adsets.is_empty());
    }
}
