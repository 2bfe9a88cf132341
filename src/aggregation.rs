//! Aggregation of enriched records into per-group summaries.
//!
//! # Determinism
//!
//! Every reduction walks the members in input order, so floating point sums
//! are bit-for-bit reproducible for the same input. Grouping itself keeps
//! groups in first-appearance order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{CostTier, EnrichedRecord, FollowerTier, Labeled};
use crate::ranking::performance_score;

/// Key used for whole-set summaries.
pub const SUMMARY_KEY: &str = "all";

/// Default number of campaigns returned by [`recent_campaigns`].
pub const DEFAULT_RECENT_CAMPAIGNS: usize = 10;

/// Dimension to group records by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Campaign,
    Staff,
    Country,
    FollowerTier,
    Hospital,
}

impl GroupBy {
    /// Group key of a record; empty when the record has no value for it.
    pub fn key<'a>(&self, record: &'a EnrichedRecord) -> &'a str {
        let record = &record.record;
        match self {
            GroupBy::Campaign => &record.campaign,
            GroupBy::Staff => &record.staff,
            GroupBy::Country => &record.country,
            GroupBy::FollowerTier => record.follower_tier.label(),
            GroupBy::Hospital => &record.hospital,
        }
    }
}

/// Reduction of one group of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub key: String,
    pub influencer_count: usize,

    pub views: u64,
    pub saves: u64,
    pub comments: u64,
    pub likes: u64,
    pub shares: u64,

    pub total_emv: f64,
    pub avg_emv: f64,
    pub total_cost: u64,
    pub avg_roas: f64,
    pub avg_response_rate: f64,

    /// Members with a paid participation.
    pub paid_count: usize,

    /// Distinct countries among the members.
    pub country_count: usize,

    /// Distinct non-empty campaigns among the members.
    pub campaign_count: usize,

    /// Member count per follower tier; absent tiers are omitted.
    pub follower_tiers: BTreeMap<FollowerTier, usize>,

    /// Most recent observation date of any member.
    pub latest_date: Option<NaiveDate>,

    /// Composite performance score, see [`performance_score`].
    pub performance: f64,

    /// True when the group mixes free (ROAS = EMV) and paid (ROAS in
    /// percent) members, making `avg_roas` a blend of two units.
    pub mixed_roas_units: bool,
}

impl GroupAggregate {
    /// Zero-valued aggregate for a group without members.
    pub fn empty(key: &str) -> Self {
        Self {
            key: key.to_string(),
            influencer_count: 0,
            views: 0,
            saves: 0,
            comments: 0,
            likes: 0,
            shares: 0,
            total_emv: 0.0,
            avg_emv: 0.0,
            total_cost: 0,
            avg_roas: 0.0,
            avg_response_rate: 0.0,
            paid_count: 0,
            country_count: 0,
            campaign_count: 0,
            follower_tiers: BTreeMap::new(),
            latest_date: None,
            performance: 0.0,
            mixed_roas_units: false,
        }
    }

    /// Reduce the given members to an aggregate.
    ///
    /// # Arguments
    ///
    /// * `key` - Group key the members share
    /// * `members` - Group members, in input order
    ///
    /// # Returns
    ///
    /// The aggregate; [`GroupAggregate::empty`] when `members` is empty.
    pub fn from_members(key: &str, members: &[&EnrichedRecord]) -> Self {
        let mut agg = Self::empty(key);
        if members.is_empty() {
            return agg;
        }

        let mut roas_sum = 0.0;
        let mut response_rate_sum = 0.0;
        let mut countries = BTreeSet::new();
        let mut campaigns = BTreeSet::new();
        let mut has_free = false;
        let mut has_paid = false;

        for member in members {
            let record = &member.record;
            let metrics = &member.metrics;

            agg.views = agg.views.saturating_add(record.views);
            agg.saves = agg.saves.saturating_add(record.saves);
            agg.comments = agg.comments.saturating_add(record.comments);
            agg.likes = agg.likes.saturating_add(record.likes);
            agg.shares = agg.shares.saturating_add(record.shares);

            agg.total_emv += metrics.emv;
            agg.total_cost = agg.total_cost.saturating_add(metrics.cost);
            roas_sum += metrics.roas;
            response_rate_sum += record.response_rate;

            if record.cost_tier == CostTier::Paid {
                agg.paid_count += 1;
            }
            if metrics.cost == 0 {
                has_free = true;
            } else {
                has_paid = true;
            }

            countries.insert(record.country.as_str());
            if !record.campaign.is_empty() {
                campaigns.insert(record.campaign.as_str());
            }
            *agg.follower_tiers.entry(record.follower_tier).or_insert(0) += 1;

            if record.date > agg.latest_date {
                agg.latest_date = record.date;
            }
        }

        let count = members.len();
        let n = count as f64;

        agg.influencer_count = count;
        agg.avg_emv = agg.total_emv / n;
        agg.avg_roas = roas_sum / n;
        agg.avg_response_rate = response_rate_sum / n;
        agg.country_count = countries.len();
        agg.campaign_count = campaigns.len();
        agg.mixed_roas_units = has_free && has_paid;
        agg.performance =
            performance_score(agg.avg_response_rate, agg.views, agg.saves, agg.influencer_count);

        agg
    }
}

/// Group records by an arbitrary key function.
///
/// Groups appear in the order their key is first seen, and members keep
/// their input order.
pub fn group_by<'a, K, F>(records: &'a [EnrichedRecord], key_fn: F) -> Vec<(K, Vec<&'a EnrichedRecord>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&'a EnrichedRecord) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a EnrichedRecord>)> = Vec::new();

    for record in records {
        let key = key_fn(record);
        match index.get(&key) {
            Some(&slot) => groups[slot].1.push(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![record]));
            }
        }
    }

    groups
}

/// Aggregate records along a dimension.
///
/// Records with an empty key for the dimension are left out.
pub fn aggregate(records: &[EnrichedRecord], by: GroupBy) -> Vec<GroupAggregate> {
    group_by(records, |r| by.key(r))
        .into_iter()
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, members)| GroupAggregate::from_members(key, &members))
        .collect()
}

/// Aggregate the whole record set as a single group.
pub fn summarize(records: &[EnrichedRecord]) -> GroupAggregate {
    let members: Vec<&EnrichedRecord> = records.iter().collect();
    GroupAggregate::from_members(SUMMARY_KEY, &members)
}

/// A staff member singled out on the performance board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffHighlight {
    pub staff: String,
    pub value: f64,
}

/// Best staff members by the three board metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPerformers {
    pub by_total_emv: StaffHighlight,
    pub by_avg_roas: StaffHighlight,
    pub by_avg_response_rate: StaffHighlight,
}

/// Pick the top staff members from staff aggregates.
///
/// The first group wins ties. Returns `None` when there are no groups.
pub fn top_performers(staff_groups: &[GroupAggregate]) -> Option<TopPerformers> {
    Some(TopPerformers {
        by_total_emv: best_by(staff_groups, |g| g.total_emv)?,
        by_avg_roas: best_by(staff_groups, |g| g.avg_roas)?,
        by_avg_response_rate: best_by(staff_groups, |g| g.avg_response_rate)?,
    })
}

fn best_by(groups: &[GroupAggregate], metric: impl Fn(&GroupAggregate) -> f64) -> Option<StaffHighlight> {
    let mut best: Option<&GroupAggregate> = None;
    for group in groups {
        if best.is_none_or(|b| metric(group) > metric(b)) {
            best = Some(group);
        }
    }
    best.map(|g| StaffHighlight {
        staff: g.key.clone(),
        value: metric(g),
    })
}

/// Campaigns ordered by their latest observation, newest first.
///
/// Campaigns without any dated member come last; ties keep first-appearance
/// order. At most `limit` campaigns are returned.
pub fn recent_campaigns(records: &[EnrichedRecord], limit: usize) -> Vec<GroupAggregate> {
    let mut campaigns = aggregate(records, GroupBy::Campaign);
    campaigns.sort_by(|a, b| b.latest_date.cmp(&a.latest_date));
    campaigns.truncate(limit);
    campaigns
}
