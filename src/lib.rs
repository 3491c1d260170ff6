//! Verdict - multi-backend consensus engine for content risk assessment
//!
//! This library fans a piece of content out to several judge backends,
//! combines their risk verdicts under a selectable consensus strategy, and
//! learns per-backend reliability weights from every call.

pub mod cli;
pub mod config;
pub mod consensus;
pub mod judge;
pub mod logging;
pub mod metrics;
pub mod performance;
pub mod registry;
