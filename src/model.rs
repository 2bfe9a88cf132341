//! Data models for Campaign Lens.
//!
//! An [`InfluencerRecord`] is one influencer's participation in one campaign
//! round. Records carry only base attributes; EMV, cost and ROAS live in
//! [`DerivedMetrics`] and are always recomputed from the base fields (see
//! [`crate::metrics`]). Categorical fields are enums so that every code path
//! after ingestion works with validated values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A categorical value with a canonical label plus accepted aliases.
///
/// The first label is the canonical (serde) name, the second the Korean label
/// used by the operators' spreadsheets. Matching ignores case, whitespace,
/// parentheses, underscores and hyphens.
pub trait Labeled: Sized + Copy + 'static {
    const VARIANTS: &'static [Self];

    fn labels(&self) -> &'static [&'static str];

    /// Canonical label.
    fn label(&self) -> &'static str {
        self.labels()[0]
    }

    /// Korean display label.
    fn display_label(&self) -> &'static str {
        let labels = self.labels();
        labels.get(1).copied().unwrap_or(labels[0])
    }

    fn parse_label(input: &str) -> Option<Self> {
        let needle = squash(input);
        if needle.is_empty() {
            return None;
        }
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.labels().iter().any(|l| squash(l) == needle))
    }
}

fn squash(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Audience size class of an influencer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FollowerTier {
    #[serde(alias = "메가")]
    Mega,
    #[serde(alias = "매크로")]
    Macro,
    #[serde(alias = "마이크로")]
    Micro,
    /// Also the fallback for unrecognised tiers.
    #[default]
    #[serde(alias = "나노")]
    Nano,
}

impl FollowerTier {
    /// Cost rate in basis points of the follower count.
    pub fn rate_basis_points(&self) -> u64 {
        match self {
            FollowerTier::Mega => 500,
            FollowerTier::Macro => 800,
            FollowerTier::Micro => 1200,
            FollowerTier::Nano => 1500,
        }
    }
}

impl Labeled for FollowerTier {
    const VARIANTS: &'static [Self] = &[
        FollowerTier::Mega,
        FollowerTier::Macro,
        FollowerTier::Micro,
        FollowerTier::Nano,
    ];

    fn labels(&self) -> &'static [&'static str] {
        match self {
            FollowerTier::Mega => &["mega", "메가"],
            FollowerTier::Macro => &["macro", "매크로"],
            FollowerTier::Micro => &["micro", "마이크로"],
            FollowerTier::Nano => &["nano", "나노"],
        }
    }
}

/// Whether a participation was compensated.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    #[serde(alias = "유가")]
    Paid,
    #[default]
    #[serde(alias = "무가")]
    Unpaid,
}

impl Labeled for CostTier {
    const VARIANTS: &'static [Self] = &[CostTier::Paid, CostTier::Unpaid];

    fn labels(&self) -> &'static [&'static str] {
        match self {
            CostTier::Paid => &["paid", "유가"],
            CostTier::Unpaid => &["unpaid", "무가"],
        }
    }
}

/// Outreach lifecycle status of an influencer.
///
/// Variant order follows the lifecycle, which is also the sort order used by
/// the influencer list.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InfluencerStatus {
    #[default]
    #[serde(alias = "태핑 완료 회신대기", alias = "태핑완료")]
    TappedAwaitingReply,
    #[serde(alias = "회신 수신", alias = "회신수신")]
    ReplyReceived,
    #[serde(alias = "구글폼 전송", alias = "구글폼전송")]
    GoogleFormSent,
    #[serde(alias = "구글폼 회신", alias = "구글폼회신")]
    GoogleFormReplied,
    #[serde(alias = "예약 확정", alias = "예약확정")]
    BookingConfirmed,
    #[serde(alias = "시술 완료", alias = "시술완료")]
    ProcedureCompleted,
    #[serde(alias = "포스팅 완료", alias = "포스팅완료")]
    Posted,
    #[serde(alias = "거절")]
    Rejected,
    #[serde(alias = "포스팅 지연", alias = "포스팅지연")]
    PostDelayed,
    #[serde(alias = "취소")]
    Cancelled,
}

impl Labeled for InfluencerStatus {
    const VARIANTS: &'static [Self] = &[
        InfluencerStatus::TappedAwaitingReply,
        InfluencerStatus::ReplyReceived,
        InfluencerStatus::GoogleFormSent,
        InfluencerStatus::GoogleFormReplied,
        InfluencerStatus::BookingConfirmed,
        InfluencerStatus::ProcedureCompleted,
        InfluencerStatus::Posted,
        InfluencerStatus::Rejected,
        InfluencerStatus::PostDelayed,
        InfluencerStatus::Cancelled,
    ];

    fn labels(&self) -> &'static [&'static str] {
        match self {
            InfluencerStatus::TappedAwaitingReply => &["tapped_awaiting_reply", "태핑 완료 회신대기", "태핑완료"],
            InfluencerStatus::ReplyReceived => &["reply_received", "회신 수신"],
            InfluencerStatus::GoogleFormSent => &["google_form_sent", "구글폼 전송"],
            InfluencerStatus::GoogleFormReplied => &["google_form_replied", "구글폼 회신"],
            InfluencerStatus::BookingConfirmed => &["booking_confirmed", "예약 확정"],
            InfluencerStatus::ProcedureCompleted => &["procedure_completed", "시술 완료"],
            InfluencerStatus::Posted => &["posted", "포스팅 완료"],
            InfluencerStatus::Rejected => &["rejected", "거절"],
            InfluencerStatus::PostDelayed => &["post_delayed", "포스팅 지연"],
            InfluencerStatus::Cancelled => &["cancelled", "취소"],
        }
    }
}

/// How the influencer was first reached.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OutreachType {
    #[default]
    #[serde(alias = "인스타 크롤링", alias = "인스타크롤링")]
    InstagramCrawl,
    #[serde(alias = "틱톡 크롤링", alias = "틱톡크롤링")]
    TiktokCrawl,
    #[serde(alias = "인바운드 (메타)", alias = "인바운드메타")]
    InboundMeta,
    #[serde(alias = "추가 수동 서치업", alias = "추가수동서치")]
    ManualSearch,
    #[serde(alias = "재태핑")]
    Retapping,
    #[serde(alias = "인바운드 (DM)", alias = "인바운드DM")]
    InboundDm,
}

impl Labeled for OutreachType {
    const VARIANTS: &'static [Self] = &[
        OutreachType::InstagramCrawl,
        OutreachType::TiktokCrawl,
        OutreachType::InboundMeta,
        OutreachType::ManualSearch,
        OutreachType::Retapping,
        OutreachType::InboundDm,
    ];

    fn labels(&self) -> &'static [&'static str] {
        match self {
            OutreachType::InstagramCrawl => &["instagram_crawl", "인스타 크롤링"],
            OutreachType::TiktokCrawl => &["tiktok_crawl", "틱톡 크롤링"],
            OutreachType::InboundMeta => &["inbound_meta", "인바운드 (메타)"],
            OutreachType::ManualSearch => &["manual_search", "추가 수동 서치업", "추가수동서치"],
            OutreachType::Retapping => &["retapping", "재태핑"],
            OutreachType::InboundDm => &["inbound_dm", "인바운드 (DM)"],
        }
    }
}

/// Country value used when the source row has none.
pub const UNKNOWN_COUNTRY: &str = "unknown";

/// One influencer's participation in one campaign round.
///
/// Instances are produced by [`crate::ingest`], which applies all defaults,
/// so every field here is populated and well-typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerRecord {
    /// Unique identifier.
    pub id: String,

    /// `@`-prefixed handle.
    pub username: String,

    /// Profile URL.
    pub url: String,

    /// Date the influencer was first tagged.
    pub first_tagging: NaiveDate,

    pub outreach_type: OutreachType,
    pub status: InfluencerStatus,

    pub has_reply: bool,
    pub is_rejected: bool,
    pub google_form_sent: bool,
    pub google_form_reply: bool,
    pub content_guide_sent: bool,
    pub procedure_completed: bool,

    pub confirmed_date: Option<NaiveDate>,

    /// Canonical hospital name, empty when unassigned.
    pub hospital: String,

    pub post_link: String,
    pub scheduled_post_date: Option<NaiveDate>,
    pub guidelines: String,

    /// Campaign round, starting at 1.
    pub round: u32,

    /// Country name, [`UNKNOWN_COUNTRY`] when absent.
    pub country: String,
    pub follower_tier: FollowerTier,
    pub follower_count: u64,

    /// Assigned staff member.
    pub staff: String,

    /// Campaign name, empty when unassigned.
    pub campaign: String,
    pub cost_tier: CostTier,

    /// Response rate in percent (0-100).
    pub response_rate: f64,

    pub views: u64,
    pub saves: u64,
    pub comments: u64,
    pub likes: u64,
    pub shares: u64,

    /// Observation date; records without one pass any date filter.
    pub date: Option<NaiveDate>,
}

/// Fallback first-tagging date for rows that have none.
pub fn default_first_tagging() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

impl InfluencerRecord {
    /// Create a record with default values for everything but id and handle.
    pub fn new(id: &str, username: &str) -> Self {
        let handle = username.trim_start_matches('@');
        Self {
            id: id.to_string(),
            username: format!("@{handle}"),
            url: format!("https://instagram.com/{handle}"),
            first_tagging: default_first_tagging(),
            outreach_type: OutreachType::default(),
            status: InfluencerStatus::default(),
            has_reply: false,
            is_rejected: false,
            google_form_sent: false,
            google_form_reply: false,
            content_guide_sent: false,
            procedure_completed: false,
            confirmed_date: None,
            hospital: String::new(),
            post_link: String::new(),
            scheduled_post_date: None,
            guidelines: String::new(),
            round: 1,
            country: UNKNOWN_COUNTRY.to_string(),
            follower_tier: FollowerTier::default(),
            follower_count: 0,
            staff: String::new(),
            campaign: String::new(),
            cost_tier: CostTier::default(),
            response_rate: 0.0,
            views: 0,
            saves: 0,
            comments: 0,
            likes: 0,
            shares: 0,
            date: None,
        }
    }

    pub fn with_campaign(mut self, campaign: &str) -> Self {
        self.campaign = campaign.to_string();
        self
    }

    pub fn with_staff(mut self, staff: &str) -> Self {
        self.staff = staff.to_string();
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = country.to_string();
        self
    }

    pub fn with_hospital(mut self, hospital: &str) -> Self {
        self.hospital = hospital.to_string();
        self
    }

    pub fn with_followers(mut self, follower_count: u64, tier: FollowerTier) -> Self {
        self.follower_count = follower_count;
        self.follower_tier = tier;
        self
    }

    pub fn with_cost_tier(mut self, cost_tier: CostTier) -> Self {
        self.cost_tier = cost_tier;
        self
    }

    /// Set views, likes and comments.
    pub fn with_engagement(mut self, views: u64, likes: u64, comments: u64) -> Self {
        self.views = views;
        self.likes = likes;
        self.comments = comments;
        self
    }

    pub fn with_saves(mut self, saves: u64) -> Self {
        self.saves = saves;
        self
    }

    pub fn with_response_rate(mut self, response_rate: f64) -> Self {
        self.response_rate = response_rate;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_status(mut self, status: InfluencerStatus) -> Self {
        self.status = status;
        self.is_rejected = status == InfluencerStatus::Rejected;
        self
    }
}

/// Metrics derived from an [`InfluencerRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Earned media value, floored.
    pub emv: f64,

    /// Marketing cost, zero for unpaid participations.
    pub cost: u64,

    /// Return on ad spend in percent; raw EMV when cost is zero.
    pub roas: f64,
}

/// A record together with its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: InfluencerRecord,

    #[serde(flatten)]
    pub metrics: DerivedMetrics,
}

/// Booking contact attached to an influencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub id: String,
    pub influencer_id: String,
    pub hospital_delivered: bool,
    pub instagram_account: String,
    pub follower_count: u64,
    pub english_name: String,
    pub korean_name: String,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    pub nationality: String,
    pub language: String,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: String,
    pub additional_procedure: String,
    pub reservation_confirmed: bool,

    /// Days until the procedure; negative once it has passed.
    pub procedure_dday: i64,
    pub reminded: bool,
}

/// A hospital campaign and the influencers assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub hospital: String,
    #[serde(default, alias = "influencerIds")]
    pub influencer_ids: Vec<String>,
}

/// Partial update of an influencer, as sent by the editing UI.
///
/// Only base attributes can be edited; derived metrics are recomputed by the
/// store after the update is applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfluencerUpdate {
    pub status: Option<InfluencerStatus>,
    pub outreach_type: Option<OutreachType>,
    pub has_reply: Option<bool>,
    pub google_form_sent: Option<bool>,
    pub google_form_reply: Option<bool>,
    pub content_guide_sent: Option<bool>,
    pub procedure_completed: Option<bool>,
    pub confirmed_date: Option<NaiveDate>,
    pub hospital: Option<String>,
    pub post_link: Option<String>,
    pub scheduled_post_date: Option<NaiveDate>,
    pub guidelines: Option<String>,
    pub round: Option<u32>,
    pub staff: Option<String>,
    pub campaign: Option<String>,
    pub cost_tier: Option<CostTier>,
    pub follower_tier: Option<FollowerTier>,
    pub follower_count: Option<u64>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub saves: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
}

impl InfluencerUpdate {
    /// Apply the update in place.
    ///
    /// Setting a status keeps `is_rejected` in sync with it.
    pub fn apply_to(&self, record: &mut InfluencerRecord) {
        if let Some(status) = self.status {
            record.status = status;
            record.is_rejected = status == InfluencerStatus::Rejected;
        }
        if let Some(outreach_type) = self.outreach_type {
            record.outreach_type = outreach_type;
        }
        set(&mut record.has_reply, self.has_reply);
        set(&mut record.google_form_sent, self.google_form_sent);
        set(&mut record.google_form_reply, self.google_form_reply);
        set(&mut record.content_guide_sent, self.content_guide_sent);
        set(&mut record.procedure_completed, self.procedure_completed);
        if self.confirmed_date.is_some() {
            record.confirmed_date = self.confirmed_date;
        }
        set_cloned(&mut record.hospital, &self.hospital);
        set_cloned(&mut record.post_link, &self.post_link);
        if self.scheduled_post_date.is_some() {
            record.scheduled_post_date = self.scheduled_post_date;
        }
        set_cloned(&mut record.guidelines, &self.guidelines);
        if let Some(round) = self.round {
            record.round = round.max(1);
        }
        set_cloned(&mut record.staff, &self.staff);
        set_cloned(&mut record.campaign, &self.campaign);
        set(&mut record.cost_tier, self.cost_tier);
        set(&mut record.follower_tier, self.follower_tier);
        set(&mut record.follower_count, self.follower_count);
        set(&mut record.views, self.views);
        set(&mut record.likes, self.likes);
        set(&mut record.saves, self.saves);
        set(&mut record.comments, self.comments);
        set(&mut record.shares, self.shares);
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.outreach_type.is_none()
            && self.has_reply.is_none()
            && self.google_form_sent.is_none()
            && self.google_form_reply.is_none()
            && self.content_guide_sent.is_none()
            && self.procedure_completed.is_none()
            && self.confirmed_date.is_none()
            && self.hospital.is_none()
            && self.post_link.is_none()
            && self.scheduled_post_date.is_none()
            && self.guidelines.is_none()
            && self.round.is_none()
            && self.staff.is_none()
            && self.campaign.is_none()
            && self.cost_tier.is_none()
            && self.follower_tier.is_none()
            && self.follower_count.is_none()
            && self.views.is_none()
            && self.likes.is_none()
            && self.saves.is_none()
            && self.comments.is_none()
            && self.shares.is_none()
    }
}

/// Partial update of a contact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    pub hospital_delivered: Option<bool>,
    pub english_name: Option<String>,
    pub korean_name: Option<String>,
    pub phone_number: Option<String>,
    pub nationality: Option<String>,
    pub language: Option<String>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub additional_procedure: Option<String>,
    pub reservation_confirmed: Option<bool>,
    pub procedure_dday: Option<i64>,
    pub reminded: Option<bool>,
}

impl ContactUpdate {
    pub fn apply_to(&self, contact: &mut ContactInfo) {
        set(&mut contact.hospital_delivered, self.hospital_delivered);
        set_cloned(&mut contact.english_name, &self.english_name);
        set_cloned(&mut contact.korean_name, &self.korean_name);
        set_cloned(&mut contact.phone_number, &self.phone_number);
        set_cloned(&mut contact.nationality, &self.nationality);
        set_cloned(&mut contact.language, &self.language);
        if self.appointment_date.is_some() {
            contact.appointment_date = self.appointment_date;
        }
        set_cloned(&mut contact.appointment_time, &self.appointment_time);
        set_cloned(&mut contact.additional_procedure, &self.additional_procedure);
        set(&mut contact.reservation_confirmed, self.reservation_confirmed);
        set(&mut contact.procedure_dday, self.procedure_dday);
        set(&mut contact.reminded, self.reminded);
    }
}

fn set<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_cloned(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        target.clone_from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_accepts_korean_and_canonical() {
        assert_eq!(FollowerTier::parse_label("매크로"), Some(FollowerTier::Macro));
        assert_eq!(FollowerTier::parse_label("MACRO"), Some(FollowerTier::Macro));
        assert_eq!(CostTier::parse_label("무가"), Some(CostTier::Unpaid));
        assert_eq!(
            InfluencerStatus::parse_label("태핑완료"),
            Some(InfluencerStatus::TappedAwaitingReply)
        );
        assert_eq!(
            InfluencerStatus::parse_label("포스팅지연"),
            Some(InfluencerStatus::PostDelayed)
        );
        assert_eq!(
            OutreachType::parse_label("인바운드메타"),
            Some(OutreachType::InboundMeta)
        );
        assert_eq!(
            OutreachType::parse_label("추가수동서치"),
            Some(OutreachType::ManualSearch)
        );
    }

    #[test]
    fn test_parse_label_rejects_unknown() {
        assert_eq!(FollowerTier::parse_label("giga"), None);
        assert_eq!(FollowerTier::parse_label("  "), None);
    }

    #[test]
    fn test_serde_accepts_korean_aliases() {
        let status: InfluencerStatus = serde_json::from_str("\"예약 확정\"").unwrap();
        assert_eq!(status, InfluencerStatus::BookingConfirmed);

        let tier: FollowerTier = serde_json::from_str("\"나노\"").unwrap();
        assert_eq!(tier, FollowerTier::Nano);

        assert_eq!(
            serde_json::to_string(&InfluencerStatus::PostDelayed).unwrap(),
            "\"post_delayed\""
        );
    }

    #[test]
    fn test_new_record_defaults() {
        let record = InfluencerRecord::new("1", "glow.daily");

        assert_eq!(record.username, "@glow.daily");
        assert_eq!(record.url, "https://instagram.com/glow.daily");
        assert_eq!(record.country, UNKNOWN_COUNTRY);
        assert_eq!(record.round, 1);
        assert_eq!(record.follower_tier, FollowerTier::Nano);
        assert_eq!(record.cost_tier, CostTier::Unpaid);
        assert!(record.date.is_none());
    }

    #[test]
    fn test_update_status_syncs_rejected_flag() {
        let mut record = InfluencerRecord::new("1", "a");
        let update = InfluencerUpdate {
            status: Some(InfluencerStatus::Rejected),
            ..Default::default()
        };
        update.apply_to(&mut record);
        assert!(record.is_rejected);

        let update = InfluencerUpdate {
            status: Some(InfluencerStatus::BookingConfirmed),
            ..Default::default()
        };
        update.apply_to(&mut record);
        assert!(!record.is_rejected);
    }

    #[test]
    fn test_update_leaves_unset_fields() {
        let mut record = InfluencerRecord::new("1", "a")
            .with_campaign("Oblive Clinic")
            .with_engagement(100, 10, 1);
        let update = InfluencerUpdate {
            views: Some(500),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut record);

        assert_eq!(record.views, 500);
        assert_eq!(record.likes, 10);
        assert_eq!(record.campaign, "Oblive Clinic");
    }
}
