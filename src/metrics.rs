//! Derived metric formulas and record enrichment.
//!
//! All functions here are pure: the same inputs always produce the same
//! outputs, and nothing is mutated.

use crate::model::{CostTier, DerivedMetrics, EnrichedRecord, FollowerTier, InfluencerRecord};

/// EMV weight per view.
pub const EMV_VIEW_WEIGHT: f64 = 0.03;

/// EMV weight per like.
pub const EMV_LIKE_WEIGHT: f64 = 0.1;

/// EMV weight per comment.
pub const EMV_COMMENT_WEIGHT: f64 = 0.4;

const BASIS_POINTS: u64 = 10_000;

/// Earned media value: `views*0.03 + likes*0.1 + comments*0.4`.
///
/// Counters are unsigned, so the result is never negative.
pub fn emv(views: u64, likes: u64, comments: u64) -> f64 {
    views as f64 * EMV_VIEW_WEIGHT
        + likes as f64 * EMV_LIKE_WEIGHT
        + comments as f64 * EMV_COMMENT_WEIGHT
}

/// Marketing cost of a participation.
///
/// Zero for unpaid participations, otherwise `floor(follower_count * rate)`
/// where the rate depends on the follower tier. Computed in basis points so
/// the floor is exact.
pub fn cost(follower_count: u64, tier: FollowerTier, cost_tier: CostTier) -> u64 {
    match cost_tier {
        CostTier::Unpaid => 0,
        CostTier::Paid => follower_count.saturating_mul(tier.rate_basis_points()) / BASIS_POINTS,
    }
}

/// Return on ad spend in percent: `floor(emv / cost * 100)`.
///
/// When `cost` is zero the EMV itself is returned. The two cases are not in
/// the same unit; aggregates flag groups that mix them.
pub fn roas(emv: f64, cost: u64) -> f64 {
    if cost == 0 {
        return emv;
    }
    ((emv / cost as f64) * 100.0).floor()
}

/// Compute the derived metrics of a record.
///
/// ROAS uses the unrounded EMV; the stored EMV is floored.
pub fn derive_metrics(record: &InfluencerRecord) -> DerivedMetrics {
    let cost = cost(record.follower_count, record.follower_tier, record.cost_tier);
    let raw_emv = emv(record.views, record.likes, record.comments);
    let roas = roas(raw_emv, cost);

    DerivedMetrics {
        emv: raw_emv.floor(),
        cost,
        roas,
    }
}

/// Produce an analytics-ready copy of a record.
pub fn enrich(record: &InfluencerRecord) -> EnrichedRecord {
    EnrichedRecord {
        record: record.clone(),
        metrics: derive_metrics(record),
    }
}

/// Enrich every record, preserving order.
pub fn enrich_all(records: &[InfluencerRecord]) -> Vec<EnrichedRecord> {
    records.iter().map(enrich).collect()
}

impl EnrichedRecord {
    /// Recompute the derived metrics, ignoring the ones currently held.
    pub fn re_enrich(&self) -> EnrichedRecord {
        enrich(&self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emv_formula() {
        assert_eq!(emv(1000, 100, 10), 44.0);
        assert_eq!(emv(0, 0, 0), 0.0);
        assert_eq!(emv(5000, 500, 50), 220.0);
    }

    #[test]
    fn test_cost_unpaid_is_zero() {
        assert_eq!(cost(100_000, FollowerTier::Macro, CostTier::Unpaid), 0);
        assert_eq!(cost(2_000_000, FollowerTier::Mega, CostTier::Unpaid), 0);
        assert_eq!(cost(0, FollowerTier::Nano, CostTier::Unpaid), 0);
    }

    #[test]
    fn test_cost_paid_rates() {
        assert_eq!(cost(100_000, FollowerTier::Macro, CostTier::Paid), 8000);
        assert_eq!(cost(1_000_000, FollowerTier::Mega, CostTier::Paid), 50_000);
        assert_eq!(cost(50_000, FollowerTier::Micro, CostTier::Paid), 6000);
        assert_eq!(cost(10_000, FollowerTier::Nano, CostTier::Paid), 1500);
    }

    #[test]
    fn test_cost_floors() {
        // 333 * 0.15 = 49.95
        assert_eq!(cost(333, FollowerTier::Nano, CostTier::Paid), 49);
        // 19 * 0.05 = 0.95
        assert_eq!(cost(19, FollowerTier::Mega, CostTier::Paid), 0);
    }

    #[test]
    fn test_roas_free_equals_emv() {
        assert_eq!(roas(44.0, 0), 44.0);
        assert_eq!(roas(44.7, 0), 44.7);
    }

    #[test]
    fn test_roas_paid() {
        assert_eq!(roas(200.0, 100), 200.0);
        assert_eq!(roas(220.0, 8000), 2.0);
        assert_eq!(roas(1.0, 3), 33.0);
    }

    #[test]
    fn test_enrich_paid_record() {
        let record = InfluencerRecord::new("b", "b")
            .with_cost_tier(CostTier::Paid)
            .with_followers(100_000, FollowerTier::Macro)
            .with_engagement(5000, 500, 50);

        let enriched = enrich(&record);

        assert_eq!(enriched.metrics.emv, 220.0);
        assert_eq!(enriched.metrics.cost, 8000);
        assert_eq!(enriched.metrics.roas, 2.0);
        assert_eq!(enriched.record, record);
    }

    #[test]
    fn test_enrich_floors_emv_but_not_free_roas() {
        // 7 views -> 0.21 EMV
        let record = InfluencerRecord::new("c", "c").with_engagement(7, 0, 0);

        let metrics = derive_metrics(&record);

        assert_eq!(metrics.emv, 0.0);
        assert!((metrics.roas - 0.21).abs() < 1e-12);
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let record = InfluencerRecord::new("a", "a")
            .with_cost_tier(CostTier::Paid)
            .with_followers(42_000, FollowerTier::Micro)
            .with_engagement(12_345, 678, 90);

        let once = enrich(&record);
        let mut tampered = once.clone();
        tampered.metrics.emv = 1.0;
        tampered.metrics.roas = -5.0;

        assert_eq!(once.re_enrich(), once);
        assert_eq!(tampered.re_enrich(), once);
    }
}
