//! Derived advertising metrics
//!
//! Backend rows carry raw counters (spend, impressions, clicks, ...) which
//! arrive as JSON numbers or numeric strings depending on the endpoint. The
//! ratios every dashboard view shows are computed here.

use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Num(f64),
    Str(String),
    Null,
}

impl Lenient {
    fn into_f64(self) -> f64 {
        match self {
            Lenient::Num(n) => n,
            Lenient::Str(s) => s.trim().parse().unwrap_or(0.0),
            Lenient::Null => 0.0,
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Lenient::deserialize(deserializer)?.into_f64();
    Ok(if value.is_finite() { value } else { 0.0 })
}

/// Counts are truncated like the dashboard's integer parsing; negatives become 0
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = lenient_f64(deserializer)?;
    Ok(if value > 0.0 { value.trunc() as u64 } else { 0 })
}

/// Raw counters of one row (day, campaign, breakdown bucket, ...)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawMetrics {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spend: f64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub impressions: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub clicks: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub inline_link_clicks: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub post_engagement: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub purchase_value: f64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub reach: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub purchases: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub messaging_starts: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub video_views: u64,
    /// Average impressions per person; not additive, totals recompute it
    #[serde(default, deserialize_with = "lenient_f64")]
    pub frequency: f64,
}

impl RawMetrics {
    pub fn derived(&self) -> DerivedMetrics {
        DerivedMetrics::from(self)
    }

    /// Frequency recomputed as impressions per reached person
    fn with_frequency(mut self) -> Self {
        self.frequency = ratio(self.impressions as f64, self.reach as f64);
        self
    }
}

impl Add for RawMetrics {
    type Output = RawMetrics;

    fn add(self, rhs: RawMetrics) -> RawMetrics {
        RawMetrics {
            spend: self.spend + rhs.spend,
            impressions: self.impressions + rhs.impressions,
            clicks: self.clicks + rhs.clicks,
            inline_link_clicks: self.inline_link_clicks + rhs.inline_link_clicks,
            post_engagement: self.post_engagement + rhs.post_engagement,
            purchase_value: self.purchase_value + rhs.purchase_value,
            reach: self.reach + rhs.reach,
            purchases: self.purchases + rhs.purchases,
            messaging_starts: self.messaging_starts + rhs.messaging_starts,
            video_views: self.video_views + rhs.video_views,
            frequency: 0.0,
        }
        .with_frequency()
    }
}

impl Sum for RawMetrics {
    fn sum<I: Iterator<Item = RawMetrics>>(iter: I) -> Self {
        iter.fold(RawMetrics::default(), Add::add)
    }
}

impl<'a> Sum<&'a RawMetrics> for RawMetrics {
    fn sum<I: Iterator<Item = &'a RawMetrics>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Ratios shown next to the raw counters; 0 whenever the denominator is 0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedMetrics {
    /// Clicks per 100 impressions
    pub ctr: f64,
    pub link_ctr: f64,
    /// Spend per click
    pub cpc: f64,
    pub link_cpc: f64,
    /// Spend per 1000 impressions
    pub cpm: f64,
    /// Spend per engagement
    pub cpe: f64,
    /// Purchase value per unit of spend
    pub roas: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl From<&RawMetrics> for DerivedMetrics {
    fn from(raw: &RawMetrics) -> Self {
        let impressions = raw.impressions as f64;
        let clicks = raw.clicks as f64;
        let link_clicks = raw.inline_link_clicks as f64;

        Self {
            ctr: ratio(clicks, impressions) * 100.0,
            link_ctr: ratio(link_clicks, impressions) * 100.0,
            cpc: ratio(raw.spend, clicks),
            link_cpc: ratio(raw.spend, link_clicks),
            cpm: ratio(raw.spend, impressions) * 1000.0,
            cpe: ratio(raw.spend, raw.post_engagement as f64),
            roas: ratio(raw.purchase_value, raw.spend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_derived_metrics() {
        let raw = RawMetrics {
            spend: 200.0,
            impressions: 10_000,
            clicks: 250,
            inline_link_clicks: 100,
            post_engagement: 400,
            purchase_value: 900.0,
            ..RawMetrics::default()
        };
        let d = raw.derived();
        assert!(approx(d.ctr, 2.5));
        assert!(approx(d.link_ctr, 1.0));
        assert!(approx(d.cpc, 0.8));
        assert!(approx(d.link_cpc, 2.0));
        assert!(approx(d.cpm, 20.0));
        assert!(approx(d.cpe, 0.5));
        assert!(approx(d.roas, 4.5));
    }

    #[test]
    fn test_zero_denominators_yield_zero() {
        let d = RawMetrics::default().derived();
        assert_eq!(d, DerivedMetrics::default());

        let only_spend = RawMetrics {
            spend: 50.0,
            ..RawMetrics::default()
        };
        let d = only_spend.derived();
        assert_eq!(d.cpc, 0.0);
        assert_eq!(d.cpm, 0.0);
        assert_eq!(d.roas, 0.0);
    }

    #[test]
    fn test_lenient_row_parsing() {
        let raw: RawMetrics = serde_json::from_str(
            r#"{"spend": "123.45", "impressions": "1000", "clicks": 12.9, "post_engagement": null, "date_start": "2024-01-01"}"#,
        )
        .unwrap();
        assert!(approx(raw.spend, 123.45));
        assert_eq!(raw.impressions, 1000);
        assert_eq!(raw.clicks, 12);
        assert_eq!(raw.post_engagement, 0);
        assert_eq!(raw.inline_link_clicks, 0);

        let row: RawMetrics = serde_json::from_str(
            r#"{"reach": "800", "purchases": 3, "messaging_starts": "5", "video_views": 40, "frequency": "1.25"}"#,
        )
        .unwrap();
        assert_eq!(row.reach, 800);
        assert_eq!(row.purchases, 3);
        assert_eq!(row.messaging_starts, 5);
        assert_eq!(row.video_views, 40);
        assert!(approx(row.frequency, 1.25));

        let garbage: RawMetrics = serde_json::from_str(r#"{"spend": "n/a"}"#).unwrap();
        assert_eq!(garbage.spend, 0.0);
    }

    #[test]
    fn test_totals_row() {
        let rows = vec![
            RawMetrics {
                spend: 10.0,
                impressions: 1000,
                clicks: 10,
                reach: 500,
                purchases: 1,
                messaging_starts: 2,
                video_views: 30,
                frequency: 2.0,
                ..RawMetrics::default()
            },
            RawMetrics {
                spend: 30.0,
                impressions: 3000,
                clicks: 50,
                reach: 1500,
                purchases: 4,
                video_views: 70,
                frequency: 2.0,
                ..RawMetrics::default()
            },
        ];
        let total: RawMetrics = rows.iter().sum();
        assert_eq!(total.impressions, 4000);
        assert_eq!(total.reach, 2000);
        assert_eq!(total.purchases, 5);
        assert_eq!(total.messaging_starts, 2);
        assert_eq!(total.video_views, 100);
        assert!(approx(total.frequency, 2.0));
        assert!(approx(total.derived().ctr, 1.5));
        assert!(approx(total.derived().cpm, 10.0));
    }
}
