//! Global Filter Module
//!
//! Cascading dashboard filters: date range, brand, campaign, adset and ad.
//!
//! # Architecture
//!
//! - [`state`] - Selection types (`DatePreset`, `Selection`, `FilterState`)
//! - [`params`] - Flat backend query parameters derived from the selection
//! - [`options`] - Dropdown option lists and brand matching
//! - [`notifier`] - Change fan-out to subscribers
//! - [`summary`] - Human readable "active filters" summary
//! - [`manager`] - `FilterStateManager`, the state machine tying it together
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ads_filters::api::HttpOptionSource;
//! use ads_filters::config::Settings;
//! use ads_filters::filters::{BrandMatcher, FilterStateManager};
//!
//! let settings = Settings::default();
//! let source = Arc::new(HttpOptionSource::new(&settings.api)?);
//! let manager = FilterStateManager::new(source, BrandMatcher::new(settings.filters.brands));
//!
//! manager.subscribe(|params, _snapshot| {
//!     println!("reload with {:?}", params.to_pairs());
//! });
//!
//! manager.load_initial_data().await;
//! manager.set_brand("LS2").await;
//! manager.set_campaign("123").await;
//! ```

pub mod manager;
pub mod notifier;
pub mod options;
pub mod params;
pub mod state;
pub mod summary;

pub use manager::{ChangeOutcome, FilterCommand, FilterHandle, FilterStateManager};
pub use notifier::{FilterCallback, FilterSnapshot, Notifier, SubscriptionId};
pub use options::{BrandMatcher, EntityKind, EntityOption, OptionCache};
pub use params::QueryParams;
pub use state::{DatePreset, FilterLevel, FilterState, Selection, ALL};
pub use summary::{active_filters, status_line, ActiveFilter};
