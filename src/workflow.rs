//! Outreach workflow: hospital kanban boards and step gating.
//!
//! The board groups a hospital's influencers into status lanes. Moving a
//! card and toggling workflow steps produce [`InfluencerUpdate`]s that the
//! store applies, so the rules here stay free of any state.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{EnrichedRecord, InfluencerRecord, InfluencerStatus, InfluencerUpdate, Labeled};

/// A status column of a hospital's campaign board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KanbanLane {
    #[serde(alias = "구글폼 회신")]
    FormReplied,
    #[serde(alias = "예약 확정")]
    BookingConfirmed,
    #[serde(alias = "시술 완료")]
    ProcedureCompleted,
    #[serde(alias = "포스팅 완료")]
    Posted,
    #[serde(alias = "포스팅 지연")]
    PostDelayed,
    /// Holds both rejected and cancelled influencers.
    #[serde(alias = "거절/취소")]
    RejectedOrCancelled,
}

impl KanbanLane {
    /// Lanes in board order.
    pub const ALL: [KanbanLane; 6] = [
        KanbanLane::FormReplied,
        KanbanLane::BookingConfirmed,
        KanbanLane::ProcedureCompleted,
        KanbanLane::Posted,
        KanbanLane::PostDelayed,
        KanbanLane::RejectedOrCancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            KanbanLane::FormReplied => "구글폼 회신",
            KanbanLane::BookingConfirmed => "예약 확정",
            KanbanLane::ProcedureCompleted => "시술 완료",
            KanbanLane::Posted => "포스팅 완료",
            KanbanLane::PostDelayed => "포스팅 지연",
            KanbanLane::RejectedOrCancelled => "거절/취소",
        }
    }

    pub fn contains(&self, status: InfluencerStatus) -> bool {
        match self {
            KanbanLane::RejectedOrCancelled => {
                matches!(status, InfluencerStatus::Rejected | InfluencerStatus::Cancelled)
            }
            lane => lane.drop_status() == status,
        }
    }

    /// Status given to a card dropped on this lane.
    pub fn drop_status(&self) -> InfluencerStatus {
        match self {
            KanbanLane::FormReplied => InfluencerStatus::GoogleFormReplied,
            KanbanLane::BookingConfirmed => InfluencerStatus::BookingConfirmed,
            KanbanLane::ProcedureCompleted => InfluencerStatus::ProcedureCompleted,
            KanbanLane::Posted => InfluencerStatus::Posted,
            KanbanLane::PostDelayed => InfluencerStatus::PostDelayed,
            KanbanLane::RejectedOrCancelled => InfluencerStatus::Rejected,
        }
    }
}

/// Compact view of an influencer on the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanCard {
    pub id: String,
    pub username: String,
    pub status: InfluencerStatus,
    pub status_label: &'static str,
    pub round: u32,
    pub views: u64,

    /// Confirmed booking date, else the scheduled post date.
    pub date: Option<NaiveDate>,

    pub has_reply: bool,
    pub google_form_sent: bool,
    pub content_guide_sent: bool,
}

impl From<&InfluencerRecord> for KanbanCard {
    fn from(record: &InfluencerRecord) -> Self {
        Self {
            id: record.id.clone(),
            username: record.username.clone(),
            status: record.status,
            status_label: status_label(record.status),
            round: record.round,
            views: record.views,
            date: record.confirmed_date.or(record.scheduled_post_date),
            has_reply: record.has_reply,
            google_form_sent: record.google_form_sent,
            content_guide_sent: record.content_guide_sent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanColumn {
    pub lane: KanbanLane,
    pub label: &'static str,
    pub count: usize,
    pub cards: Vec<KanbanCard>,
}

/// Build the board of one hospital.
///
/// Influencers whose status has no lane (still in early outreach) are not
/// shown.
pub fn kanban_board(records: &[EnrichedRecord], hospital: &str) -> Vec<KanbanColumn> {
    KanbanLane::ALL
        .iter()
        .map(|&lane| {
            let cards: Vec<KanbanCard> = records
                .iter()
                .map(|r| &r.record)
                .filter(|r| r.hospital == hospital && lane.contains(r.status))
                .map(KanbanCard::from)
                .collect();
            KanbanColumn {
                lane,
                label: lane.label(),
                count: cards.len(),
                cards,
            }
        })
        .collect()
}

/// Update produced by dropping a card on `lane`.
///
/// Returns `None` when the card already has the lane's drop status.
pub fn move_card(record: &InfluencerRecord, lane: KanbanLane) -> Option<InfluencerUpdate> {
    let status = lane.drop_status();
    if record.status == status {
        return None;
    }
    Some(InfluencerUpdate {
        status: Some(status),
        ..Default::default()
    })
}

/// A gated outreach step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    HasReply,
    GoogleFormSent,
    GoogleFormReply,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 3] = [
        WorkflowStep::HasReply,
        WorkflowStep::GoogleFormSent,
        WorkflowStep::GoogleFormReply,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStep::HasReply => "회신 수신",
            WorkflowStep::GoogleFormSent => "구글폼 전송",
            WorkflowStep::GoogleFormReply => "구글폼 회신",
        }
    }

    /// Step that must be done before this one can change.
    pub fn prerequisite(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowStep::HasReply => None,
            WorkflowStep::GoogleFormSent => Some(WorkflowStep::HasReply),
            WorkflowStep::GoogleFormReply => Some(WorkflowStep::GoogleFormSent),
        }
    }

    fn is_done(&self, record: &InfluencerRecord) -> bool {
        match self {
            WorkflowStep::HasReply => record.has_reply,
            WorkflowStep::GoogleFormSent => record.google_form_sent,
            WorkflowStep::GoogleFormReply => record.google_form_reply,
        }
    }

    fn requested(&self, update: &InfluencerUpdate) -> Option<bool> {
        match self {
            WorkflowStep::HasReply => update.has_reply,
            WorkflowStep::GoogleFormSent => update.google_form_sent,
            WorkflowStep::GoogleFormReply => update.google_form_reply,
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStep::HasReply => "has_reply",
            WorkflowStep::GoogleFormSent => "google_form_sent",
            WorkflowStep::GoogleFormReply => "google_form_reply",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("step {step} is locked until {requires} is done")]
    StepLocked {
        step: WorkflowStep,
        requires: WorkflowStep,
    },
}

/// State of one step as shown in the progress widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepState {
    pub step: WorkflowStep,
    pub label: &'static str,
    pub done: bool,
    pub enabled: bool,
}

/// Progress of a record through the gated steps.
pub fn workflow_steps(record: &InfluencerRecord) -> Vec<StepState> {
    WorkflowStep::ALL
        .iter()
        .map(|&step| StepState {
            step,
            label: step.label(),
            done: step.is_done(record),
            enabled: step.prerequisite().is_none_or(|p| p.is_done(record)),
        })
        .collect()
}

/// Check that `update` only toggles steps whose prerequisite holds.
///
/// Prerequisites are evaluated on the record as it would be after the
/// update, so a request may set a step and its prerequisite together.
pub fn validate_update(
    record: &InfluencerRecord,
    update: &InfluencerUpdate,
) -> Result<(), WorkflowError> {
    let mut after = record.clone();
    update.apply_to(&mut after);

    for step in WorkflowStep::ALL {
        let Some(requires) = step.prerequisite() else {
            continue;
        };
        let toggled = step
            .requested(update)
            .is_some_and(|value| value != step.is_done(record));
        if toggled && !requires.is_done(&after) {
            return Err(WorkflowError::StepLocked { step, requires });
        }
    }

    Ok(())
}

/// Korean label of a status, as shown on cards and lists.
pub fn status_label(status: InfluencerStatus) -> &'static str {
    status.display_label()
}
