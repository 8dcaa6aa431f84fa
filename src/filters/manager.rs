//! Cascading filter state manager
//!
//! Owns the selection, reloads dependent option lists as the user narrows
//! it, and notifies subscribers once the option lists match the selection.
//!
//! Every option level carries a generation counter. A cascading setter bumps
//! the generations it invalidates and tags its reload with the new value; a
//! response whose tag is no longer current is dropped, so the last change
//! always wins regardless of the order responses arrive in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, info, warn};
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::api::OptionSource;
use crate::errors::{FilterError, FilterResult};

use super::notifier::{FilterSnapshot, Notifier, SubscriptionId};
use super::options::{BrandMatcher, EntityKind, EntityOption, OptionCache};
use super::params::QueryParams;
use super::state::{DatePreset, FilterLevel, FilterState, Selection};
use super::summary::{self, ActiveFilter};

/// What a setter did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// State changed and subscribers were notified
    Notified,
    /// A newer change to the same option level won; nothing was notified
    Superseded,
    /// Request rejected without touching state
    Ignored,
}

/// Deferred filter mutation, queued through a [`FilterHandle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    SetDatePreset(DatePreset),
    SetCustomDateRange { from: String, to: String },
    SetBrand(String),
    SetCampaign(String),
    SetAdset(String),
    SetAd(String),
    Apply,
    Reset,
}

/// Cheap, synchronous command sender
///
/// Subscribers use it to change filters from inside a notification; the
/// command runs on the next [`FilterStateManager::process_pending`].
#[derive(Debug, Clone)]
pub struct FilterHandle {
    tx: mpsc::UnboundedSender<FilterCommand>,
}

impl FilterHandle {
    pub fn send(&self, command: FilterCommand) -> FilterResult<()> {
        self.tx.send(command).map_err(|_| FilterError::ChannelClosed)
    }

    pub fn set_date_preset(&self, preset: DatePreset) -> FilterResult<()> {
        self.send(FilterCommand::SetDatePreset(preset))
    }

    pub fn set_custom_date_range(&self, from: impl Into<String>, to: impl Into<String>) -> FilterResult<()> {
        self.send(FilterCommand::SetCustomDateRange {
            from: from.into(),
            to: to.into(),
        })
    }

    pub fn set_brand(&self, brand: impl Into<String>) -> FilterResult<()> {
        self.send(FilterCommand::SetBrand(brand.into()))
    }

    pub fn set_campaign(&self, id: impl Into<String>) -> FilterResult<()> {
        self.send(FilterCommand::SetCampaign(id.into()))
    }

    pub fn set_adset(&self, id: impl Into<String>) -> FilterResult<()> {
        self.send(FilterCommand::SetAdset(id.into()))
    }

    pub fn set_ad(&self, id: impl Into<String>) -> FilterResult<()> {
        self.send(FilterCommand::SetAd(id.into()))
    }

    pub fn reset(&self) -> FilterResult<()> {
        self.send(FilterCommand::Reset)
    }
}

struct Inner {
    filters: FilterState,
    options: OptionCache,
    /// Unfiltered campaigns from the last successful catalog load
    catalog: Vec<EntityOption>,
}

impl Inner {
    fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot {
            filters: self.filters.clone(),
            options: self.options.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Generations {
    campaigns: AtomicU64,
    adsets: AtomicU64,
    ads: AtomicU64,
}

impl Generations {
    fn counter(&self, kind: EntityKind) -> &AtomicU64 {
        match kind {
            // brand options are rebuilt together with campaigns
            EntityKind::Brands | EntityKind::Campaigns => &self.campaigns,
            EntityKind::Adsets => &self.adsets,
            EntityKind::Ads => &self.ads,
        }
    }

    fn bump(&self, kind: EntityKind) -> u64 {
        self.counter(kind).fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, kind: EntityKind, generation: u64) -> bool {
        self.counter(kind).load(Ordering::SeqCst) == generation
    }

    /// Invalidate every option level below `level`; returns the tag for the
    /// level directly beneath it
    fn invalidate_below(&self, level: FilterLevel) -> u64 {
        match level {
            FilterLevel::Brand => {
                self.bump(EntityKind::Ads);
                self.bump(EntityKind::Adsets);
                self.bump(EntityKind::Campaigns)
            }
            FilterLevel::Campaign => {
                self.bump(EntityKind::Ads);
                self.bump(EntityKind::Adsets)
            }
            FilterLevel::Adset | FilterLevel::Ad => self.bump(EntityKind::Ads),
        }
    }
}

fn parse_date(value: &str) -> FilterResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| FilterError::InvalidDate(format!("'{}': {}", value, e)))
}

fn or_empty(kind: EntityKind, scope: &str, fetched: FilterResult<Vec<EntityOption>>) -> Vec<EntityOption> {
    fetched.unwrap_or_else(|e| {
        warn!("Failed to load {} for {}: {}; using an empty list", kind, scope, e);
        Vec::new()
    })
}

/// Single source of truth for the dashboard's filter selection
///
/// Commands sent through a [`FilterHandle`] are queued, never run by the
/// setters themselves. The owner of the manager drives them by calling
/// [`process_pending`](Self::process_pending) after each change, as
/// [`FilterRunner`](crate::runner::FilterRunner) does after every console
/// command.
pub struct FilterStateManager {
    source: Arc<dyn OptionSource>,
    brands: BrandMatcher,
    inner: RwLock<Inner>,
    generations: Generations,
    notifier: Notifier,
    commands: mpsc::UnboundedSender<FilterCommand>,
    pending: Mutex<mpsc::UnboundedReceiver<FilterCommand>>,
}

impl FilterStateManager {
    pub fn new(source: Arc<dyn OptionSource>, brands: BrandMatcher) -> Self {
        let (commands, pending) = mpsc::unbounded_channel();
        let options = OptionCache {
            brands: brands.brand_options(),
            ..OptionCache::default()
        };

        Self {
            source,
            brands,
            inner: RwLock::new(Inner {
                filters: FilterState::new(),
                options,
                catalog: Vec::new(),
            }),
            generations: Generations::default(),
            notifier: Notifier::new(),
            commands,
            pending: Mutex::new(pending),
        }
    }

    // ------------------------------------------------------------------
    // Subscriptions and accessors
    // ------------------------------------------------------------------

    /// Register a callback invoked with `(query_params, snapshot)` on every change
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&QueryParams, &FilterSnapshot) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn handle(&self) -> FilterHandle {
        FilterHandle {
            tx: self.commands.clone(),
        }
    }

    pub async fn state(&self) -> FilterState {
        self.inner.read().await.filters.clone()
    }

    pub async fn options(&self) -> OptionCache {
        self.inner.read().await.options.clone()
    }

    pub async fn snapshot(&self) -> FilterSnapshot {
        self.inner.read().await.snapshot()
    }

    pub async fn query_params(&self) -> QueryParams {
        QueryParams::from_state(&self.inner.read().await.filters)
    }

    pub async fn active_filters(&self) -> Vec<ActiveFilter> {
        let inner = self.inner.read().await;
        summary::active_filters(&inner.filters, &inner.options, &inner.catalog)
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    /// Seed the campaign catalog; does not notify
    ///
    /// Returns the number of campaigns loaded (0 on failure).
    pub async fn load_initial_data(&self) -> usize {
        let generation = self.generations.bump(EntityKind::Campaigns);
        let fetched = self.source.fetch_campaigns().await;

        let mut inner = self.inner.write().await;
        if !self.generations.is_current(EntityKind::Campaigns, generation) {
            debug!("Initial campaign load superseded by a newer change");
            return 0;
        }
        if !self.apply_campaigns(&mut inner, fetched) {
            return 0;
        }
        info!("Loaded {} campaigns", inner.catalog.len());
        inner.catalog.len()
    }

    pub async fn set_date_preset(&self, preset: DatePreset) -> ChangeOutcome {
        let snapshot = {
            let mut inner = self.inner.write().await;
            inner.filters.set_date_preset(preset);
            inner.snapshot()
        };
        self.notify(snapshot)
    }

    /// Only honoured under the custom preset with two valid, ordered dates
    pub async fn set_custom_date_range(&self, from: &str, to: &str) -> ChangeOutcome {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            debug!("Incomplete custom range ({:?}, {:?}); waiting for both bounds", from, to);
            return ChangeOutcome::Ignored;
        }
        let (start, end) = match (parse_date(from), parse_date(to)) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Ignoring custom range: {}", e);
                return ChangeOutcome::Ignored;
            }
        };
        if start > end {
            warn!("Ignoring custom range: {} is after {}", from, to);
            return ChangeOutcome::Ignored;
        }

        let snapshot = {
            let mut inner = self.inner.write().await;
            if !inner.filters.date_preset.is_custom() {
                warn!(
                    "Ignoring custom range under preset {}",
                    inner.filters.date_preset
                );
                return ChangeOutcome::Ignored;
            }
            inner.filters.date_from = Some(from.to_string());
            inner.filters.date_to = Some(to.to_string());
            inner.snapshot()
        };
        self.notify(snapshot)
    }

    /// Select a brand and reload the campaign list for it
    ///
    /// Brands are matched case-insensitively and stored with their configured
    /// spelling.
    pub async fn set_brand(&self, brand: impl Into<Selection>) -> ChangeOutcome {
        let brand = match brand.into() {
            Selection::Id(name) => match self.brands.canonical(&name) {
                Some(configured) => Selection::Id(configured.to_string()),
                None => Selection::Id(name),
            },
            Selection::All => Selection::All,
        };
        let generation = {
            let mut inner = self.inner.write().await;
            inner.filters.select(FilterLevel::Brand, brand);
            inner.options.clear(EntityKind::Adsets);
            inner.options.clear(EntityKind::Ads);
            self.generations.invalidate_below(FilterLevel::Brand)
        };

        let fetched = self.source.fetch_campaigns().await;
        self.finish(EntityKind::Campaigns, generation, |inner| {
            self.apply_campaigns(inner, fetched);
        })
        .await
    }

    /// Select a campaign and reload its adsets
    pub async fn set_campaign(&self, campaign: impl Into<Selection>) -> ChangeOutcome {
        let campaign = campaign.into();
        let (generation, snapshot) = {
            let mut inner = self.inner.write().await;
            inner.filters.select(FilterLevel::Campaign, campaign.clone());
            inner.options.clear(EntityKind::Adsets);
            inner.options.clear(EntityKind::Ads);
            let generation = self.generations.invalidate_below(FilterLevel::Campaign);
            (generation, inner.snapshot())
        };

        let Some(campaign_id) = campaign.id() else {
            return self.notify(snapshot);
        };

        let fetched = self.source.fetch_adsets(campaign_id).await;
        let adsets = or_empty(EntityKind::Adsets, campaign_id, fetched);
        self.finish(EntityKind::Adsets, generation, move |inner| {
            inner.options.replace(EntityKind::Adsets, adsets)
        })
        .await
    }

    /// Select an adset and reload its ads
    pub async fn set_adset(&self, adset: impl Into<Selection>) -> ChangeOutcome {
        let adset = adset.into();
        let (generation, snapshot) = {
            let mut inner = self.inner.write().await;
            inner.filters.select(FilterLevel::Adset, adset.clone());
            inner.options.clear(EntityKind::Ads);
            let generation = self.generations.invalidate_below(FilterLevel::Adset);
            (generation, inner.snapshot())
        };

        let Some(adset_id) = adset.id() else {
            return self.notify(snapshot);
        };

        let fetched = self.source.fetch_ads(adset_id).await;
        let ads = or_empty(EntityKind::Ads, adset_id, fetched);
        self.finish(EntityKind::Ads, generation, move |inner| {
            inner.options.replace(EntityKind::Ads, ads)
        })
        .await
    }

    /// Select an ad; terminal level, no reload
    pub async fn set_ad(&self, ad: impl Into<Selection>) -> ChangeOutcome {
        let snapshot = {
            let mut inner = self.inner.write().await;
            inner.filters.select(FilterLevel::Ad, ad.into());
            inner.snapshot()
        };
        self.notify(snapshot)
    }

    /// Restore the initial selection and reload the top-level options
    pub async fn reset(&self) -> ChangeOutcome {
        let generation = {
            let mut inner = self.inner.write().await;
            inner.filters = FilterState::new();
            inner.options = OptionCache {
                brands: self.brands.brand_options(),
                ..OptionCache::default()
            };
            self.generations.invalidate_below(FilterLevel::Brand)
        };
        info!("Filters reset");

        let fetched = self.source.fetch_campaigns().await;
        self.finish(EntityKind::Campaigns, generation, |inner| {
            self.apply_campaigns(inner, fetched);
        })
        .await
    }

    /// Re-broadcast the current state unchanged
    pub async fn apply(&self) -> ChangeOutcome {
        let snapshot = self.snapshot().await;
        self.notify(snapshot)
    }

    // ------------------------------------------------------------------
    // Deferred commands
    // ------------------------------------------------------------------

    pub async fn execute(&self, command: FilterCommand) -> ChangeOutcome {
        debug!("Executing {:?}", command);
        match command {
            FilterCommand::SetDatePreset(preset) => self.set_date_preset(preset).await,
            FilterCommand::SetCustomDateRange { from, to } => {
                self.set_custom_date_range(&from, &to).await
            }
            FilterCommand::SetBrand(brand) => self.set_brand(brand).await,
            FilterCommand::SetCampaign(id) => self.set_campaign(id).await,
            FilterCommand::SetAdset(id) => self.set_adset(id).await,
            FilterCommand::SetAd(id) => self.set_ad(id).await,
            FilterCommand::Apply => self.apply().await,
            FilterCommand::Reset => self.reset().await,
        }
    }

    /// Run every command queued so far, in order
    ///
    /// Commands queued while this batch runs wait for the next call.
    pub async fn process_pending(&self) -> usize {
        let batch: Vec<FilterCommand> = {
            let mut rx = self.pending.lock().await;
            std::iter::from_fn(|| rx.try_recv().ok()).collect()
        };

        let count = batch.len();
        for command in batch {
            self.execute(command).await;
        }
        count
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Returns `false` when the fetch failed and the list was cleared
    fn apply_campaigns(&self, inner: &mut Inner, fetched: FilterResult<Vec<EntityOption>>) -> bool {
        match fetched {
            Ok(campaigns) => {
                inner.options.campaigns = match inner.filters.brand.id() {
                    Some(brand) => self.brands.filter_campaigns(&campaigns, brand),
                    None => campaigns.clone(),
                };
                inner.catalog = campaigns;
                true
            }
            Err(e) => {
                warn!("Failed to load campaigns: {}; using an empty list", e);
                inner.options.clear(EntityKind::Campaigns);
                false
            }
        }
    }

    /// Install a reload result if it is still the latest for `kind`, then notify
    async fn finish<F>(&self, kind: EntityKind, generation: u64, apply: F) -> ChangeOutcome
    where
        F: FnOnce(&mut Inner),
    {
        let snapshot = {
            let mut inner = self.inner.write().await;
            if !self.generations.is_current(kind, generation) {
                debug!("Discarding stale {} reload (generation {})", kind, generation);
                return ChangeOutcome::Superseded;
            }
            apply(&mut *inner);
            inner.snapshot()
        };
        self.notify(snapshot)
    }

    fn notify(&self, snapshot: FilterSnapshot) -> ChangeOutcome {
        let delivered = self.notifier.notify(&snapshot);
        debug!(
            "Filter change delivered to {}/{} subscribers",
            delivered,
            self.notifier.len()
        );
        ChangeOutcome::Notified
    }
}
