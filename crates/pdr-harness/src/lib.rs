//! # pdr-harness
//!
//! A scenario runner exercising [`pdr_repository`], [`pdr_codec`], and
//! [`pdr_manager`] together against an in-memory mock terminus, producing a
//! pass/fail report the `harness` binary can render as text or JSON.

mod mock_transport;
mod report;
mod scenarios;

pub use mock_transport::MockTerminus;
pub use report::Report;
pub use scenarios::{all as run_all_scenarios, ScenarioResult};
