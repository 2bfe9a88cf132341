//! Sorting and pagination of aggregates and influencer rows.
//!
//! All sorts are stable, so equal keys keep their input order and pages
//! stay consistent across repeated requests.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::aggregation::GroupAggregate;
use crate::model::EnrichedRecord;

/// Default number of groups per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Default number of rows per page of the influencer list.
pub const DEFAULT_INFLUENCER_PAGE_SIZE: usize = 50;

/// Maximum number of page buttons before ellipses kick in.
const MAX_PAGE_LINKS: usize = 7;

/// Pages shown on each side of the current one.
const SIDE_PAGE_LINKS: usize = 2;

/// Metric to order group aggregates by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Performance,
    #[serde(alias = "influencers")]
    InfluencerCount,
    Views,
    #[default]
    Emv,
    Roas,
}

/// Composite performance score of a group.
///
/// `round((avg_response_rate*0.4 + views/count*0.0001 + saves/count*0.01) * 10) / 10`,
/// zero for an empty group.
pub fn performance_score(avg_response_rate: f64, views: u64, saves: u64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    let raw = avg_response_rate * 0.4 + (views as f64 / n) * 0.0001 + (saves as f64 / n) * 0.01;
    (raw * 10.0).round() / 10.0
}

/// Sort groups in place: by name ascending, by any metric descending.
pub fn sort_groups(groups: &mut [GroupAggregate], key: SortKey) {
    match key {
        SortKey::Name => groups.sort_by(|a, b| a.key.cmp(&b.key)),
        SortKey::Performance => groups.sort_by(|a, b| b.performance.total_cmp(&a.performance)),
        SortKey::InfluencerCount => {
            groups.sort_by(|a, b| b.influencer_count.cmp(&a.influencer_count))
        }
        SortKey::Views => groups.sort_by(|a, b| b.views.cmp(&a.views)),
        SortKey::Emv => groups.sort_by(|a, b| b.total_emv.total_cmp(&a.total_emv)),
        SortKey::Roas => groups.sort_by(|a, b| b.avg_roas.total_cmp(&a.avg_roas)),
    }
}

/// Number of pages needed for `len` items.
pub fn total_pages(len: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    len.div_ceil(per_page)
}

/// Return the items of 1-based page `page`.
///
/// Out-of-range pages, including page 0, yield an empty slice.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    if page == 0 || per_page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(per_page);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}

/// Clamp a requested page into `1..=total_pages` (1 when there are none).
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// One page of results plus the numbers needed to render a pager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub links: Vec<PageLink>,
}

impl<T: Clone> Page<T> {
    /// Build the page for a UI-driven page number, clamping it into range.
    pub fn clamped(items: &[T], page: usize, per_page: usize) -> Self {
        let total_pages = total_pages(items.len(), per_page);
        let page = clamp_page(page, total_pages);
        Self {
            items: paginate(items, page, per_page).to_vec(),
            page,
            per_page,
            total_items: items.len(),
            total_pages,
            links: page_links(page, total_pages),
        }
    }
}

/// A pager button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLink {
    Page(usize),
    Ellipsis,
}

/// Pager buttons for `current` out of `total` pages.
///
/// Every page is listed when there are at most seven. Otherwise the first
/// and last page are always listed together with two pages on either side
/// of the current one, and gaps become ellipses.
pub fn page_links(current: usize, total: usize) -> Vec<PageLink> {
    if total <= MAX_PAGE_LINKS {
        return (1..=total).map(PageLink::Page).collect();
    }

    let mut links = vec![PageLink::Page(1)];

    if current > SIDE_PAGE_LINKS + 2 {
        links.push(PageLink::Ellipsis);
    }

    let from = current.saturating_sub(SIDE_PAGE_LINKS).max(2);
    let to = (current + SIDE_PAGE_LINKS).min(total - 1);
    links.extend((from..=to).map(PageLink::Page));

    if current + SIDE_PAGE_LINKS + 1 < total {
        links.push(PageLink::Ellipsis);
    }

    links.push(PageLink::Page(total));
    links
}

/// Influencer list column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfluencerSortField {
    #[default]
    Username,
    Status,
    Hospital,
    Round,
    Views,
    Likes,
    Saves,
    FirstTagging,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Sort influencer rows in place by a column.
pub fn sort_influencers(records: &mut [EnrichedRecord], field: InfluencerSortField, order: SortOrder) {
    records.sort_by(|a, b| {
        let (a, b) = (&a.record, &b.record);
        let ordering = match field {
            InfluencerSortField::Username => a.username.cmp(&b.username),
            InfluencerSortField::Status => a.status.cmp(&b.status),
            InfluencerSortField::Hospital => a.hospital.cmp(&b.hospital),
            InfluencerSortField::Round => a.round.cmp(&b.round),
            InfluencerSortField::Views => a.views.cmp(&b.views),
            InfluencerSortField::Likes => a.likes.cmp(&b.likes),
            InfluencerSortField::Saves => a.saves.cmp(&b.saves),
            InfluencerSortField::FirstTagging => a.first_tagging.cmp(&b.first_tagging),
        };
        order.apply(ordering)
    });
}
