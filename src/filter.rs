//! View constraints over record sets.
//!
//! [`FilterSpec`] is the analytics filter (date range plus per-dimension
//! allow-lists). [`InfluencerQuery`] drives the influencer list,
//! [`GroupFilter`] the campaign list, and [`contacts_for_hospital`] the
//! contact sheet. All of them are plain values passed into pure functions.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregation::GroupAggregate;
use crate::ingest::canonical_hospital;
use crate::model::{
    ContactInfo, CostTier, EnrichedRecord, FollowerTier, InfluencerRecord, InfluencerStatus,
    OutreachType,
};

/// Tokens that select every campaign.
pub const ALL_CAMPAIGNS_TOKENS: [&str; 2] = ["전체", "ALL"];

/// Minimum member count for a campaign to count as active.
pub const ACTIVE_MIN_MEMBERS: usize = 3;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True when `start` is after `end`; such a range matches nothing.
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Campaign constraint of a [`FilterSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignSelection {
    /// Wildcard: every campaign passes.
    #[default]
    All,
    /// Only the named campaigns pass; an empty set is unrestricted.
    Only(BTreeSet<String>),
}

impl CampaignSelection {
    /// Build a selection from raw UI tokens.
    ///
    /// Any wildcard token turns the whole selection into [`CampaignSelection::All`],
    /// whatever else accompanies it. No names at all is also `All`.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = BTreeSet::new();
        for token in tokens {
            let token = token.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            if is_wildcard(token) {
                return CampaignSelection::All;
            }
            names.insert(token.to_string());
        }
        if names.is_empty() {
            return CampaignSelection::All;
        }
        CampaignSelection::Only(names)
    }

    pub fn allows(&self, campaign: &str) -> bool {
        match self {
            CampaignSelection::All => true,
            CampaignSelection::Only(names) => names.is_empty() || names.contains(campaign),
        }
    }

    /// Number of named campaigns constraining the view.
    pub fn restriction_count(&self) -> usize {
        match self {
            CampaignSelection::All => 0,
            CampaignSelection::Only(names) => names.len(),
        }
    }
}

fn is_wildcard(token: &str) -> bool {
    ALL_CAMPAIGNS_TOKENS
        .iter()
        .any(|wildcard| token.eq_ignore_ascii_case(wildcard))
}

/// The set of active analytics constraints.
///
/// Every predicate is conjunctive; an empty allow-set places no restriction
/// on its dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// `None` means no date restriction.
    pub date_range: Option<DateRange>,
    pub staff: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    pub follower_tiers: BTreeSet<FollowerTier>,
    pub cost_tiers: BTreeSet<CostTier>,
    pub campaigns: CampaignSelection,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn with_staff<I, S>(mut self, staff: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.staff = staff.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_follower_tiers(mut self, tiers: impl IntoIterator<Item = FollowerTier>) -> Self {
        self.follower_tiers = tiers.into_iter().collect();
        self
    }

    pub fn with_cost_tiers(mut self, tiers: impl IntoIterator<Item = CostTier>) -> Self {
        self.cost_tiers = tiers.into_iter().collect();
        self
    }

    pub fn with_campaigns(mut self, campaigns: CampaignSelection) -> Self {
        self.campaigns = campaigns;
        self
    }

    /// True when no record can match.
    pub fn matches_nothing(&self) -> bool {
        self.date_range.is_some_and(|range| range.is_inverted())
    }

    pub fn matches(&self, record: &InfluencerRecord) -> bool {
        if self.matches_nothing() {
            return false;
        }

        let in_range = match (self.date_range, record.date) {
            (Some(range), Some(date)) => range.contains(date),
            // Dateless records and unbounded filters both pass.
            _ => true,
        };

        in_range
            && allowed(&self.staff, &record.staff)
            && allowed(&self.countries, &record.country)
            && allowed(&self.follower_tiers, &record.follower_tier)
            && allowed(&self.cost_tiers, &record.cost_tier)
            && self.campaigns.allows(&record.campaign)
    }

    /// Number of allow-list entries in effect, date range excluded.
    pub fn active_constraint_count(&self) -> usize {
        self.staff.len()
            + self.countries.len()
            + self.follower_tiers.len()
            + self.cost_tiers.len()
            + self.campaigns.restriction_count()
    }

    /// Drop every allow-list but keep the date range.
    pub fn cleared(&self) -> Self {
        Self {
            date_range: self.date_range,
            ..Self::default()
        }
    }
}

fn allowed<T: Ord>(set: &BTreeSet<T>, value: &T) -> bool {
    set.is_empty() || set.contains(value)
}

/// Return the records matching `spec`, in input order.
pub fn filter_records(records: &[EnrichedRecord], spec: &FilterSpec) -> Vec<EnrichedRecord> {
    if spec.matches_nothing() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| spec.matches(&r.record))
        .cloned()
        .collect()
}

/// Influencer list constraints. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfluencerQuery {
    /// Case-insensitive substring of the username or url.
    pub search: Option<String>,
    pub status: Option<InfluencerStatus>,
    #[serde(rename = "type")]
    pub outreach_type: Option<OutreachType>,
    pub hospital: Option<String>,
    pub round: Option<u32>,
}

impl InfluencerQuery {
    pub fn matches(&self, record: &InfluencerRecord) -> bool {
        let matches_search = match non_blank(&self.search) {
            Some(term) => contains_ci(&record.username, term) || contains_ci(&record.url, term),
            None => true,
        };

        matches_search
            && self.status.is_none_or(|s| record.status == s)
            && self.outreach_type.is_none_or(|t| record.outreach_type == t)
            && non_blank(&self.hospital).is_none_or(|h| record.hospital == canonical_hospital(h))
            && self.round.is_none_or(|r| record.round == r)
    }

    pub fn apply(&self, records: &[EnrichedRecord]) -> Vec<EnrichedRecord> {
        records
            .iter()
            .filter(|r| self.matches(&r.record))
            .cloned()
            .collect()
    }
}

/// Campaign list constraints applied after aggregation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupFilter {
    /// Case-insensitive substring of the group key.
    pub search: Option<String>,

    /// Keep only groups with at least [`ACTIVE_MIN_MEMBERS`] members.
    #[serde(default)]
    pub active_only: bool,
}

impl GroupFilter {
    pub fn matches(&self, group: &GroupAggregate) -> bool {
        let matches_search = non_blank(&self.search).is_none_or(|t| contains_ci(&group.key, t));
        let matches_status = !self.active_only || group.influencer_count >= ACTIVE_MIN_MEMBERS;
        matches_search && matches_status
    }

    pub fn apply(&self, groups: Vec<GroupAggregate>) -> Vec<GroupAggregate> {
        groups.into_iter().filter(|g| self.matches(g)).collect()
    }
}

/// Contacts of influencers assigned to `hospital`, optionally searched.
///
/// The search matches the english or korean name, the contact's instagram
/// account, or the linked influencer's username.
pub fn contacts_for_hospital(
    contacts: &[ContactInfo],
    records: &[EnrichedRecord],
    hospital: &str,
    search: Option<&str>,
) -> Vec<ContactInfo> {
    let term = search.map(str::trim).filter(|t| !t.is_empty());

    contacts
        .iter()
        .filter_map(|contact| {
            let influencer = records
                .iter()
                .find(|r| r.record.id == contact.influencer_id)?;
            if influencer.record.hospital != hospital {
                return None;
            }
            let matches = term.is_none_or(|t| {
                contains_ci(&contact.english_name, t)
                    || contains_ci(&contact.korean_name, t)
                    || contains_ci(&contact.instagram_account, t)
                    || contains_ci(&influencer.record.username, t)
            });
            matches.then(|| contact.clone())
        })
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::enrich_all;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<EnrichedRecord> {
        enrich_all(&[
            InfluencerRecord::new("1", "alpha")
                .with_campaign("Oblive Clinic")
                .with_staff("김민주")
                .with_country("한국")
                .with_followers(12_000, FollowerTier::Nano)
                .with_date(date(2025, 3, 1)),
            InfluencerRecord::new("2", "bravo")
                .with_campaign("Yuonne Clinic")
                .with_staff("박영수")
                .with_country("미국")
                .with_followers(200_000, FollowerTier::Macro)
                .with_cost_tier(CostTier::Paid)
                .with_date(date(2025, 3, 10)),
            InfluencerRecord::new("3", "charlie")
                .with_campaign("Oblive Clinic")
                .with_staff("박영수")
                .with_country("일본")
                .with_followers(60_000, FollowerTier::Micro)
                .with_date(date(2025, 4, 2)),
            InfluencerRecord::new("4", "delta")
                .with_campaign("Benjamin Clinic")
                .with_staff("김민주")
                .with_country("한국"),
        ])
    }

    fn ids(records: &[EnrichedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.record.id.as_str()).collect()
    }

    #[test]
    fn test_empty_spec_matches_everything() {
        let records = sample();
        assert_eq!(filter_records(&records, &FilterSpec::new()).len(), 4);
    }

    #[test]
    fn test_date_range_is_inclusive_and_dateless_records_pass() {
        let records = sample();
        let spec = FilterSpec::new().with_date_range(date(2025, 3, 1), date(2025, 3, 10));

        assert_eq!(ids(&filter_records(&records, &spec)), vec!["1", "2", "4"]);
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let records = sample();
        let spec = FilterSpec::new().with_date_range(date(2025, 4, 1), date(2025, 3, 1));

        assert!(spec.matches_nothing());
        assert!(filter_records(&records, &spec).is_empty());
    }

    #[test]
    fn test_dimension_allow_lists() {
        let records = sample();

        let by_staff = FilterSpec::new().with_staff(["박영수"]);
        assert_eq!(ids(&filter_records(&records, &by_staff)), vec!["2", "3"]);

        let by_country = FilterSpec::new().with_countries(["한국"]);
        assert_eq!(ids(&filter_records(&records, &by_country)), vec!["1", "4"]);

        let by_tier = FilterSpec::new().with_follower_tiers([FollowerTier::Macro]);
        assert_eq!(ids(&filter_records(&records, &by_tier)), vec!["2"]);

        let by_cost = FilterSpec::new().with_cost_tiers([CostTier::Unpaid]);
        assert_eq!(ids(&filter_records(&records, &by_cost)), vec!["1", "3", "4"]);
    }

    #[test]
    fn test_predicates_are_conjunctive() {
        let records = sample();
        let spec = FilterSpec::new()
            .with_staff(["박영수"])
            .with_countries(["일본", "한국"]);

        assert_eq!(ids(&filter_records(&records, &spec)), vec!["3"]);
    }

    #[test]
    fn test_campaign_wildcard_bypasses_names() {
        let selection = CampaignSelection::from_tokens(["Oblive Clinic", "전체"]);
        assert_eq!(selection, CampaignSelection::All);

        let selection = CampaignSelection::from_tokens(["all"]);
        assert_eq!(selection, CampaignSelection::All);

        let records = sample();
        let spec = FilterSpec::new()
            .with_campaigns(CampaignSelection::from_tokens(["Oblive Clinic", "ALL"]));
        assert_eq!(filter_records(&records, &spec).len(), 4);
    }

    #[test]
    fn test_campaign_names_restrict() {
        let records = sample();
        let spec = FilterSpec::new()
            .with_campaigns(CampaignSelection::from_tokens(["Oblive Clinic"]));
        assert_eq!(ids(&filter_records(&records, &spec)), vec!["1", "3"]);

        let empty = FilterSpec::new().with_campaigns(CampaignSelection::from_tokens([" "]));
        assert_eq!(filter_records(&records, &empty).len(), 4);
    }

    #[test]
    fn test_no_campaign_tokens_is_default_selection() {
        assert_eq!(
            CampaignSelection::from_tokens(Vec::<&str>::new()),
            CampaignSelection::default()
        );
        assert_eq!(
            CampaignSelection::from_tokens([" ", ""]),
            CampaignSelection::All
        );
        assert_eq!(
            FilterSpec::new().with_campaigns(CampaignSelection::from_tokens(Vec::<String>::new())),
            FilterSpec::default()
        );
    }

    #[test]
    fn test_adding_constraint_never_grows_result() {
        let records = sample();
        let specs = [
            FilterSpec::new(),
            FilterSpec::new().with_staff(["김민주"]),
            FilterSpec::new()
                .with_staff(["김민주"])
                .with_countries(["한국"]),
            FilterSpec::new()
                .with_staff(["김민주"])
                .with_countries(["한국"])
                .with_date_range(date(2025, 1, 1), date(2025, 12, 31)),
            FilterSpec::new()
                .with_staff(["김민주"])
                .with_countries(["한국"])
                .with_date_range(date(2025, 1, 1), date(2025, 12, 31))
                .with_follower_tiers([FollowerTier::Micro]),
        ];

        let sizes: Vec<usize> = specs
            .iter()
            .map(|s| filter_records(&records, s).len())
            .collect();

        assert!(sizes.windows(2).all(|w| w[1] <= w[0]), "{sizes:?}");
    }

    #[test]
    fn test_active_constraint_count_and_clear() {
        let spec = FilterSpec::new()
            .with_date_range(date(2025, 1, 1), date(2025, 1, 31))
            .with_staff(["a", "b"])
            .with_cost_tiers([CostTier::Paid])
            .with_campaigns(CampaignSelection::from_tokens(["X"]));

        assert_eq!(spec.active_constraint_count(), 4);

        let cleared = spec.cleared();
        assert_eq!(cleared.active_constraint_count(), 0);
        assert_eq!(cleared.date_range, spec.date_range);
    }

    #[test]
    fn test_influencer_query() {
        let mut records = sample();
        records[2].record.status = InfluencerStatus::Posted;
        records[2].record.hospital = "Oblive Clinic".to_string();
        records[2].record.round = 2;

        let query = InfluencerQuery {
            search: Some("CHAR".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&records)), vec!["3"]);

        let query = InfluencerQuery {
            search: Some("instagram.com".to_string()),
            status: Some(InfluencerStatus::Posted),
            hospital: Some("Oblive Clinic".to_string()),
            round: Some(2),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&records)), vec!["3"]);

        let query = InfluencerQuery {
            hospital: Some("오블리브의원".to_string()),
            round: Some(2),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&records)), vec!["3"]);

        let query = InfluencerQuery {
            round: Some(3),
            ..Default::default()
        };
        assert!(query.apply(&records).is_empty());
    }

    #[test]
    fn test_contacts_for_hospital() {
        let mut records = sample();
        records[0].record.hospital = "Oblive Clinic".to_string();
        records[1].record.hospital = "Yuonne Clinic".to_string();

        let contact = |id: &str, influencer: &str, name: &str| ContactInfo {
            id: id.to_string(),
            influencer_id: influencer.to_string(),
            hospital_delivered: false,
            instagram_account: String::new(),
            follower_count: 0,
            english_name: name.to_string(),
            korean_name: String::new(),
            phone_number: String::new(),
            birth_date: None,
            nationality: String::new(),
            language: String::new(),
            appointment_date: None,
            appointment_time: String::new(),
            additional_procedure: String::new(),
            reservation_confirmed: false,
            procedure_dday: 0,
            reminded: false,
        };
        let contacts = vec![
            contact("c1", "1", "Jane"),
            contact("c2", "2", "John"),
            contact("c3", "missing", "Ghost"),
        ];

        let found = contacts_for_hospital(&contacts, &records, "Oblive Clinic", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c1");

        let found = contacts_for_hospital(&contacts, &records, "Oblive Clinic", Some("alpha"));
        assert_eq!(found.len(), 1);

        let found = contacts_for_hospital(&contacts, &records, "Oblive Clinic", Some("john"));
        assert!(found.is_empty());
    }
}
