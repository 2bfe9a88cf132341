//! Dataset loading and normalisation.
//!
//! The dataset file is JSON shaped like the operators' spreadsheet export:
//!
//! ```json
//! { "influencers": [ ... ], "contacts": [ ... ], "campaigns": [ ... ] }
//! ```
//!
//! Every field of every row is optional. Defaults are applied here, once, so
//! the rest of the crate only ever sees well-typed records:
//!
//! - missing or malformed numbers become 0, negatives are clamped to 0
//! - missing strings become empty, a missing country becomes `"unknown"`
//! - usernames get an `@` prefix (`@user_<n>` when absent)
//! - dates are ISO `YYYY-MM-DD` or spreadsheet serial numbers
//! - Korean status, type, tier and cost labels map to their enums
//! - hospital aliases map to canonical English names
//!
//! Only a file that cannot be read or is not JSON at all is an error.

use std::collections::HashSet;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{
    default_first_tagging, Campaign, ContactInfo, CostTier, FollowerTier, InfluencerRecord,
    InfluencerStatus, Labeled, OutreachType, UNKNOWN_COUNTRY,
};

/// Spreadsheet alias to canonical hospital name.
const HOSPITAL_ALIASES: &[(&str, &str)] = &[
    ("동안센트럴의원", "Dongan Central Clinic"),
    ("Dongahncentral Clinic (Yongsan)", "Dongan Central Clinic"),
    ("오블리브의원", "Oblive Clinic"),
    ("Obliv Clinic (Incheon)", "Oblive Clinic"),
    ("유온느의원", "Yuonne Clinic"),
    ("Uonne Clinic (Mapo)", "Yuonne Clinic"),
    ("벤자민의원", "Benjamin Clinic"),
    ("Benjamin Clinic (Gangnam)", "Benjamin Clinic"),
    ("Benjamin Clinic (Gangnam), Obliv Clinic (Incheon)", "Benjamin Clinic"),
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Normalised contents of a dataset file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub influencers: Vec<InfluencerRecord>,
    pub contacts: Vec<ContactInfo>,
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDataset {
    #[serde(default)]
    influencers: Vec<Value>,
    #[serde(default, alias = "contactInfo")]
    contacts: Vec<Value>,
    #[serde(default)]
    campaigns: Option<Vec<Value>>,
}

/// Load and normalise a dataset file.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, IngestError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let dataset = Dataset::from_json_str(&text)?;

    info!(
        path = %path.display(),
        influencers = dataset.influencers.len(),
        contacts = dataset.contacts.len(),
        campaigns = dataset.campaigns.len(),
        "Loaded dataset"
    );

    Ok(dataset)
}

impl Dataset {
    /// Parse and normalise a dataset from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, IngestError> {
        let raw: RawDataset = serde_json::from_str(text)?;

        let mut seen = HashSet::new();
        let mut influencers = Vec::with_capacity(raw.influencers.len());
        for (index, value) in raw.influencers.iter().enumerate() {
            let Some(row) = value.as_object() else {
                warn!(index, "Skipping influencer row that is not an object");
                continue;
            };
            let record = parse_influencer(&Row(row), index);
            if !seen.insert(record.id.clone()) {
                warn!(id = %record.id, index, "Skipping influencer with duplicate id");
                continue;
            }
            influencers.push(record);
        }

        let contacts = raw
            .contacts
            .iter()
            .enumerate()
            .filter_map(|(index, value)| match value.as_object() {
                Some(row) => Some(parse_contact(&Row(row), index)),
                None => {
                    warn!(index, "Skipping contact row that is not an object");
                    None
                }
            })
            .collect();

        let mut campaigns = match raw.campaigns {
            Some(rows) => rows
                .iter()
                .enumerate()
                .filter_map(|(index, value)| value.as_object().map(|row| parse_campaign(&Row(row), index)))
                .collect(),
            None => derive_campaigns(&influencers),
        };
        link_campaigns(&mut campaigns, &influencers);

        Ok(Self {
            influencers,
            contacts,
            campaigns,
        })
    }

    /// Distinct hospitals, campaigns first, then in record order.
    pub fn hospitals(&self) -> Vec<String> {
        hospitals(&self.campaigns, &self.influencers)
    }
}

/// Distinct non-empty hospitals named by campaigns or records.
pub fn hospitals(campaigns: &[Campaign], records: &[InfluencerRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    campaigns
        .iter()
        .map(|c| c.hospital.as_str())
        .chain(records.iter().map(|r| r.hospital.as_str()))
        .filter(|h| !h.is_empty() && seen.insert(*h))
        .map(str::to_string)
        .collect()
}

/// Canonical name of a hospital, mapping known spreadsheet aliases.
pub fn canonical_hospital(name: &str) -> String {
    let name = name.trim();
    HOSPITAL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// One campaign per hospital, in first-appearance order.
pub fn derive_campaigns(records: &[InfluencerRecord]) -> Vec<Campaign> {
    hospitals(&[], records)
        .into_iter()
        .map(|hospital| Campaign {
            id: format!("campaign_{}", slug(&hospital)),
            name: format!("{hospital} Campaign"),
            hospital,
            influencer_ids: Vec::new(),
        })
        .collect()
}

/// Set each campaign's members to the records assigned to its hospital.
pub fn link_campaigns(campaigns: &mut [Campaign], records: &[InfluencerRecord]) {
    for campaign in campaigns.iter_mut() {
        campaign.influencer_ids = records
            .iter()
            .filter(|r| r.hospital == campaign.hospital)
            .map(|r| r.id.clone())
            .collect();
    }
}

fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Day zero of spreadsheet serial dates.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Parse a date cell: ISO text (a time suffix is ignored) or a serial number.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let day = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        }
        Value::Number(n) => {
            let serial = n.as_f64()?;
            if !serial.is_finite() || serial < 0.0 {
                return None;
            }
            excel_epoch().checked_add_signed(Duration::try_days(serial.floor() as i64)?)
        }
        _ => None,
    }
}

/// View over one JSON row; lookups try each key in turn.
struct Row<'a>(&'a Map<String, Value>);

impl Row<'_> {
    fn get(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .find(|v| !v.is_null())
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        let text = match self.get(keys)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    fn text_or_empty(&self, keys: &[&str]) -> String {
        self.text(keys).unwrap_or_default()
    }

    fn float(&self, keys: &[&str]) -> Option<f64> {
        let n = match self.get(keys)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().replace(',', "").parse().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Non-negative count; malformed values are 0.
    fn count(&self, keys: &[&str]) -> u64 {
        self.float(keys).map_or(0, |n| n.max(0.0).floor() as u64)
    }

    fn signed(&self, keys: &[&str]) -> i64 {
        self.float(keys).map_or(0, |n| n.trunc() as i64)
    }

    /// `true`, `"Y"`, `"O"`, `"true"` or a non-zero number.
    fn flag(&self, keys: &[&str]) -> bool {
        match self.get(keys) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("y") || s.eq_ignore_ascii_case("o") || s.eq_ignore_ascii_case("true")
            }
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    fn date(&self, keys: &[&str]) -> Option<NaiveDate> {
        self.get(keys).and_then(parse_date)
    }

    fn label<T: Labeled>(&self, keys: &[&str]) -> Option<T> {
        self.text(keys).and_then(|s| T::parse_label(&s))
    }
}

fn handle_with_at(handle: &str) -> String {
    if handle.starts_with('@') {
        handle.to_string()
    } else {
        format!("@{handle}")
    }
}

fn parse_influencer(row: &Row<'_>, index: usize) -> InfluencerRecord {
    let n = index + 1;
    let id = row.text(&["id"]).unwrap_or_else(|| n.to_string());
    let username = handle_with_at(
        &row.text(&["username", "handle"])
            .unwrap_or_else(|| format!("user_{n}")),
    );
    let handle = username.trim_start_matches('@');
    let url = row
        .text(&["url", "URL"])
        .unwrap_or_else(|| format!("https://instagram.com/{handle}"));

    let status: InfluencerStatus = row.label(&["status"]).unwrap_or_default();
    let is_rejected = row.flag(&["isRejected", "is_rejected"]) || status == InfluencerStatus::Rejected;

    InfluencerRecord {
        id,
        username,
        url,
        first_tagging: row
            .date(&["firstTagging", "first_tagging"])
            .unwrap_or_else(default_first_tagging),
        outreach_type: row
            .label::<OutreachType>(&["type", "outreachType", "outreach_type"])
            .unwrap_or_default(),
        status,
        has_reply: row.flag(&["hasReply", "has_reply"]),
        is_rejected,
        google_form_sent: row.flag(&["googleFormSent", "google_form_sent"]),
        google_form_reply: row.flag(&["googleFormReply", "google_form_reply"]),
        content_guide_sent: row.flag(&["contentGuideSent", "content_guide_sent"]),
        procedure_completed: row.flag(&["procedureCompleted", "procedure_completed"]),
        confirmed_date: row.date(&["confirmedDate", "confirmed_date"]),
        hospital: canonical_hospital(&row.text_or_empty(&["hospital"])),
        post_link: row.text_or_empty(&["postLink", "post_link"]),
        scheduled_post_date: row.date(&["scheduledPostDate", "scheduled_post_date"]),
        guidelines: row.text_or_empty(&["guidelines"]),
        round: (row.count(&["round"]).clamp(1, u64::from(u32::MAX))) as u32,
        country: row
            .text(&["country"])
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
        follower_tier: row
            .label::<FollowerTier>(&["followerType", "followerTier", "follower_tier"])
            .unwrap_or_default(),
        follower_count: row.count(&["followerCount", "follower_count"]),
        staff: row.text_or_empty(&["staff"]),
        campaign: row.text_or_empty(&["campaign"]),
        cost_tier: row
            .label::<CostTier>(&["costType", "costTier", "cost_tier"])
            .unwrap_or_default(),
        response_rate: row
            .float(&["responseRate", "response_rate"])
            .map_or(0.0, |r| r.clamp(0.0, 100.0)),
        views: row.count(&["views"]),
        saves: row.count(&["saves"]),
        comments: row.count(&["comments"]),
        likes: row.count(&["likes"]),
        shares: row.count(&["shares"]),
        date: row.date(&["date"]),
    }
}

fn parse_contact(row: &Row<'_>, index: usize) -> ContactInfo {
    let influencer_id = row.text_or_empty(&["influencerId", "influencer_id"]);
    let id = row.text(&["id"]).unwrap_or_else(|| {
        if influencer_id.is_empty() {
            format!("contact_{}", index + 1)
        } else {
            format!("contact_{influencer_id}")
        }
    });

    ContactInfo {
        id,
        influencer_id,
        hospital_delivered: row.flag(&["hospitalDelivered", "hospital_delivered"]),
        instagram_account: row
            .text(&["instagramAccount", "instagram_account"])
            .map(|h| handle_with_at(&h))
            .unwrap_or_default(),
        follower_count: row.count(&["followerCount", "follower_count"]),
        english_name: row.text_or_empty(&["englishName", "english_name"]),
        korean_name: row.text_or_empty(&["koreanName", "korean_name"]),
        phone_number: row.text_or_empty(&["phoneNumber", "phone_number"]),
        birth_date: row.date(&["birthDate", "birth_date"]),
        nationality: row.text_or_empty(&["nationality"]),
        language: row.text_or_empty(&["language"]),
        appointment_date: row.date(&["appointmentDate", "appointment_date"]),
        appointment_time: row.text_or_empty(&["appointmentTime", "appointment_time"]),
        additional_procedure: row.text_or_empty(&["additionalProcedure", "additional_procedure"]),
        reservation_confirmed: row.flag(&["reservationConfirmed", "reservation_confirmed"]),
        procedure_dday: row.signed(&["procedureDday", "procedure_dday"]),
        reminded: row.flag(&["reminded"]),
    }
}

fn parse_campaign(row: &Row<'_>, index: usize) -> Campaign {
    let hospital = canonical_hospital(&row.text_or_empty(&["hospital"]));
    Campaign {
        id: row
            .text(&["id"])
            .unwrap_or_else(|| format!("campaign_{}", index + 1)),
        name: row
            .text(&["name"])
            .unwrap_or_else(|| format!("{hospital} Campaign")),
        hospital,
        influencer_ids: Vec::new(),
    }
}
