//! Dashboard backend boundary
//!
//! Option lists come from three read-only JSON endpoints:
//!
//! - `GET /api/ads-data` - campaign catalog, filtered locally by brand
//! - `GET /api/campaign-adsets?campaign_id=<id>` - adsets of a campaign
//! - `GET /api/adset-ads?adset_id=<id>` - ads of an adset
//!
//! Every fetch returns a [`FilterResult`](crate::FilterResult);
//! collapsing failures into empty lists is left to the filter manager.

pub mod source;
pub mod types;

pub use source::{HttpOptionSource, OptionSource};
pub use types::{AdItem, AdsDataResponse, AdsetItem, CampaignRecord, ItemsResponse};
