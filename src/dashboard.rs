//! Dashboard views over the shared store.
//!
//! Each view takes a snapshot of the store and runs the pure pipeline on it:
//!
//! ```text
//! records -> filter -> aggregate -> sort -> paginate
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let dashboard = Dashboard::new(store, DashboardConfig::default());
//! let summary = dashboard.summary(&FilterSpec::new()).await;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregation::{
    aggregate, recent_campaigns, summarize, top_performers, GroupAggregate, GroupBy, TopPerformers,
    DEFAULT_RECENT_CAMPAIGNS,
};
use crate::config::Config;
use crate::filter::{contacts_for_hospital, filter_records, FilterSpec, GroupFilter, InfluencerQuery};
use crate::model::{ContactInfo, EnrichedRecord, InfluencerStatus, Labeled};
use crate::ranking::{
    sort_groups, sort_influencers, InfluencerSortField, Page, SortKey, SortOrder,
    DEFAULT_INFLUENCER_PAGE_SIZE, DEFAULT_PAGE_SIZE,
};
use crate::store::{StoreError, Store};
use crate::workflow::{kanban_board, workflow_steps, KanbanColumn, KanbanLane, StepState};

/// Number of countries listed in the summary.
const TOP_COUNTRIES: usize = 10;

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Groups per page of the campaign list.
    pub page_size: usize,

    /// Campaigns listed by the recent-campaigns view.
    pub recent_campaigns: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            recent_campaigns: DEFAULT_RECENT_CAMPAIGNS,
        }
    }
}

impl From<&Config> for DashboardConfig {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            recent_campaigns: config.recent_campaigns,
        }
    }
}

/// Headline numbers for the filtered record set.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// Store version the summary was computed from.
    pub version: u64,

    /// Number of allow-list entries in the filter.
    pub active_constraints: usize,

    /// Totals over every matching record.
    pub totals: GroupAggregate,

    /// Records per status, keyed by status.
    pub by_status: BTreeMap<InfluencerStatus, usize>,

    /// Records per cost tier label.
    pub by_cost_tier: BTreeMap<String, usize>,

    /// Countries with the most records.
    pub top_countries: Vec<CountryCount>,
}

impl DashboardSummary {
    /// Compute the summary of an already filtered record set.
    pub fn from_records(records: &[EnrichedRecord], spec: &FilterSpec, version: u64) -> Self {
        let mut by_status = BTreeMap::new();
        let mut by_cost_tier = BTreeMap::new();

        for r in records {
            *by_status.entry(r.record.status).or_insert(0) += 1;
            *by_cost_tier
                .entry(r.record.cost_tier.label().to_string())
                .or_insert(0) += 1;
        }

        let mut top_countries: Vec<CountryCount> = aggregate(records, GroupBy::Country)
            .into_iter()
            .map(|g| CountryCount {
                country: g.key,
                count: g.influencer_count,
            })
            .collect();
        top_countries.sort_by(|a, b| b.count.cmp(&a.count));
        top_countries.truncate(TOP_COUNTRIES);

        Self {
            version,
            active_constraints: spec.active_constraint_count(),
            totals: summarize(records),
            by_status,
            by_cost_tier,
            top_countries,
        }
    }
}

/// Country with record count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub count: usize,
}

/// How the grouped view is cut, ordered and paged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupView {
    #[serde(default)]
    pub by: GroupBy,
    #[serde(default)]
    pub sort: SortKey,
    pub page: Option<usize>,
    pub search: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

impl GroupView {
    pub fn group_filter(&self) -> GroupFilter {
        GroupFilter {
            search: self.search.clone(),
            active_only: self.active_only,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupsResponse {
    pub version: u64,
    pub by: GroupBy,
    pub sort: SortKey,

    /// True when any listed group blends free and paid ROAS.
    pub mixed_roas_units: bool,

    #[serde(flatten)]
    pub page: Page<GroupAggregate>,
}

/// Staff performance board.
#[derive(Debug, Clone, Serialize)]
pub struct StaffBoard {
    /// Staff aggregates, highest total EMV first.
    pub staff: Vec<GroupAggregate>,
    pub top: Option<TopPerformers>,
}

/// How the influencer list is ordered and paged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListView {
    #[serde(default)]
    pub sort: InfluencerSortField,
    #[serde(default)]
    pub order: SortOrder,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// A single influencer with its workflow position.
#[derive(Debug, Clone, Serialize)]
pub struct InfluencerDetail {
    #[serde(flatten)]
    pub influencer: EnrichedRecord,
    pub lane: Option<KanbanLane>,
    pub steps: Vec<StepState>,
}

impl From<EnrichedRecord> for InfluencerDetail {
    fn from(influencer: EnrichedRecord) -> Self {
        let status = influencer.record.status;
        Self {
            lane: KanbanLane::ALL.into_iter().find(|lane| lane.contains(status)),
            steps: workflow_steps(&influencer.record),
            influencer,
        }
    }
}

/// Read-side views over the store.
#[derive(Debug, Clone)]
pub struct Dashboard {
    store: Store,
    config: Arc<DashboardConfig>,
}

impl Dashboard {
    pub fn new(store: Store, config: DashboardConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    async fn filtered(&self, spec: &FilterSpec) -> (u64, Vec<EnrichedRecord>) {
        let snapshot = self.store.snapshot().await;
        (snapshot.version, filter_records(&snapshot.records, spec))
    }

    /// Totals and breakdowns for the analytics header.
    pub async fn summary(&self, spec: &FilterSpec) -> DashboardSummary {
        let (version, records) = self.filtered(spec).await;
        DashboardSummary::from_records(&records, spec, version)
    }

    /// Grouped, sorted and paged aggregates.
    ///
    /// # Arguments
    ///
    /// * `spec` - Record filter applied before grouping
    /// * `view` - Dimension, sort key, page and group filter
    ///
    /// # Returns
    ///
    /// The requested page; out-of-range page numbers are clamped.
    pub async fn groups(&self, spec: &FilterSpec, view: &GroupView) -> GroupsResponse {
        let (version, records) = self.filtered(spec).await;

        let mut groups = view.group_filter().apply(aggregate(&records, view.by));
        sort_groups(&mut groups, view.sort);

        let page = Page::clamped(&groups, view.page.unwrap_or(1), self.config.page_size);

        GroupsResponse {
            version,
            by: view.by,
            sort: view.sort,
            mixed_roas_units: page.items.iter().any(|g| g.mixed_roas_units),
            page,
        }
    }

    /// Per-staff aggregates and the top performers among them.
    pub async fn staff_board(&self, spec: &FilterSpec) -> StaffBoard {
        let (_, records) = self.filtered(spec).await;

        let mut staff = aggregate(&records, GroupBy::Staff);
        sort_groups(&mut staff, SortKey::Emv);
        let top = top_performers(&staff);

        StaffBoard { staff, top }
    }

    /// Campaigns with the most recent activity.
    pub async fn recent_campaigns(&self, spec: &FilterSpec) -> Vec<GroupAggregate> {
        let (_, records) = self.filtered(spec).await;
        recent_campaigns(&records, self.config.recent_campaigns)
    }

    /// Searched, sorted and paged influencer rows.
    pub async fn influencers(&self, query: &InfluencerQuery, view: &ListView) -> Page<EnrichedRecord> {
        let records = self.store.records().await;

        let mut rows = query.apply(&records);
        sort_influencers(&mut rows, view.sort, view.order);

        let per_page = view
            .per_page
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_INFLUENCER_PAGE_SIZE);
        Page::clamped(&rows, view.page.unwrap_or(1), per_page)
    }

    pub async fn influencer(&self, id: &str) -> Result<InfluencerDetail, StoreError> {
        self.store.get(id).await.map(InfluencerDetail::from)
    }

    pub async fn kanban(&self, hospital: &str) -> Vec<KanbanColumn> {
        kanban_board(&self.store.records().await, hospital)
    }

    pub async fn contacts(&self, hospital: &str, search: Option<&str>) -> Vec<ContactInfo> {
        let records = self.store.records().await;
        let contacts = self.store.contacts().await;
        contacts_for_hospital(&contacts, &records, hospital, search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Dataset;
    use chrono::NaiveDate;

    fn setup_dashboard(page_size: usize) -> Dashboard {
        let json = r#"{
            "influencers": [
                {"id": "1", "campaign": "X", "staff": "김민주", "country": "한국", "hospital": "Oblive Clinic",
                 "views": 1000, "likes": 100, "comments": 10, "followerCount": 10000, "followerType": "nano",
                 "costType": "unpaid", "date": "2025-03-01", "responseRate": 80},
                {"id": "2", "campaign": "X", "staff": "박영수", "country": "미국", "hospital": "Oblive Clinic",
                 "views": 5000, "likes": 500, "comments": 50, "followerCount": 100000, "followerType": "macro",
                 "costType": "paid", "date": "2025-03-05", "responseRate": 60, "status": "포스팅 완료"},
                {"id": "3", "campaign": "Y", "staff": "김민주", "country": "한국", "hospital": "Yuonne Clinic",
                 "views": 2000, "likes": 200, "comments": 20, "followerCount": 20000, "followerType": "micro",
                 "costType": "unpaid", "date": "2025-04-01", "responseRate": 70}
            ],
            "contacts": [
                {"id": "c1", "influencerId": "1", "englishName": "Jane"},
                {"id": "c3", "influencerId": "3", "englishName": "Min"}
            ]
        }"#;
        let store = Store::new(Dataset::from_json_str(json).unwrap());
        Dashboard::new(
            store,
            DashboardConfig {
                page_size,
                recent_campaigns: 10,
            },
        )
    }

    #[tokio::test]
    async fn test_summary_totals_and_breakdowns() {
        let dashboard = setup_dashboard(10);

        let summary = dashboard.summary(&FilterSpec::new()).await;

        assert_eq!(summary.totals.influencer_count, 3);
        assert_eq!(summary.totals.total_emv, 352.0);
        assert_eq!(summary.totals.total_cost, 8000);
        assert_eq!(summary.by_status.get(&InfluencerStatus::Posted), Some(&1));
        assert_eq!(summary.by_cost_tier.get("paid"), Some(&1));
        assert_eq!(
            summary.top_countries[0],
            CountryCount {
                country: "한국".to_string(),
                count: 2
            }
        );
        assert_eq!(summary.active_constraints, 0);
    }

    #[tokio::test]
    async fn test_summary_respects_filter() {
        let dashboard = setup_dashboard(10);
        let spec = FilterSpec::new().with_date_range(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        );

        let summary = dashboard.summary(&spec).await;

        assert_eq!(summary.totals.influencer_count, 2);
        assert_eq!(summary.totals.total_emv, 264.0);
    }

    #[tokio::test]
    async fn test_groups_sorted_and_paged() {
        let dashboard = setup_dashboard(1);
        let view = GroupView {
            by: GroupBy::Campaign,
            sort: SortKey::Emv,
            page: Some(2),
            ..Default::default()
        };

        let response = dashboard.groups(&FilterSpec::new(), &view).await;

        assert_eq!(response.page.total_items, 2);
        assert_eq!(response.page.total_pages, 2);
        assert_eq!(response.page.items.len(), 1);
        assert_eq!(response.page.items[0].key, "Y");
        assert!(!response.mixed_roas_units);
    }

    #[tokio::test]
    async fn test_groups_clamp_page_and_active_filter() {
        let dashboard = setup_dashboard(10);
        let view = GroupView {
            page: Some(99),
            active_only: true,
            ..Default::default()
        };

        let response = dashboard.groups(&FilterSpec::new(), &view).await;

        assert_eq!(response.page.page, 1);
        assert!(response.page.items.is_empty());
    }

    #[tokio::test]
    async fn test_staff_board() {
        let dashboard = setup_dashboard(10);

        let board = dashboard.staff_board(&FilterSpec::new()).await;

        assert_eq!(board.staff.len(), 2);
        assert_eq!(board.staff[0].key, "박영수");
        let top = board.top.unwrap();
        assert_eq!(top.by_total_emv.staff, "박영수");
        assert_eq!(top.by_avg_response_rate.staff, "김민주");
    }

    #[tokio::test]
    async fn test_recent_campaigns() {
        let dashboard = setup_dashboard(10);
        let recent = dashboard.recent_campaigns(&FilterSpec::new()).await;
        let keys: Vec<&str> = recent.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Y", "X"]);
    }

    #[tokio::test]
    async fn test_influencer_list_and_detail() {
        let dashboard = setup_dashboard(10);
        let view = ListView {
            sort: InfluencerSortField::Views,
            order: SortOrder::Desc,
            ..Default::default()
        };

        let page = dashboard.influencers(&InfluencerQuery::default(), &view).await;
        assert_eq!(page.items[0].record.id, "2");
        assert_eq!(page.per_page, DEFAULT_INFLUENCER_PAGE_SIZE);

        let detail = dashboard.influencer("2").await.unwrap();
        assert_eq!(detail.lane, Some(KanbanLane::Posted));
        assert_eq!(detail.steps.len(), 3);

        assert!(dashboard.influencer("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_kanban_and_contacts() {
        let dashboard = setup_dashboard(10);

        let board = dashboard.kanban("Oblive Clinic").await;
        let posted = board.iter().find(|c| c.lane == KanbanLane::Posted).unwrap();
        assert_eq!(posted.count, 1);

        let contacts = dashboard.contacts("Yuonne Clinic", None).await;
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, "c3");
    }
}
