//! Campaign Lens - analytics backend for clinic influencer marketing.
//!
//! # Overview
//!
//! Campaign Lens serves an operator dashboard that tracks influencers
//! through a clinic's outreach funnel and reports on the media value they
//! earn. Records flow one way through a pure pipeline:
//!
//! ```text
//! ingest -> enrich -> filter -> aggregate -> sort -> paginate
//! ```
//!
//! Derived metrics (EMV, cost, ROAS) are never taken from input; they are
//! recomputed from base attributes whenever a record is loaded or edited.
//!
//! # Modules
//!
//! - [`model`]: Records, categorical labels and partial updates
//! - [`metrics`]: EMV, cost and ROAS formulas and record enrichment
//! - [`filter`]: Filter specifications and list queries
//! - [`aggregation`]: Group-by reductions and summaries
//! - [`ranking`]: Sorting, pagination and pager links
//! - [`workflow`]: Kanban lanes and outreach step gating
//! - [`ingest`]: Dataset loading with defaults applied once
//! - [`store`]: Shared in-memory dataset
//! - [`dashboard`]: Views combining the above
//! - [`config`]: Environment configuration
//! - [`api`]: HTTP API handlers

pub mod aggregation;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod ranking;
pub mod store;
pub mod workflow;
