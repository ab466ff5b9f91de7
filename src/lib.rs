//! Sales performance dashboard core.
//!
//! Two entry points serve the presentation layer:
//! - [`load`] turns raw spreadsheet rows into validated [`Record`]s plus a
//!   list of [`Finding`]s to display;
//! - [`compute`] turns those records and the current [`FilterSelection`]
//!   into an [`AggregateResult`] (leaderboard, achievement, trend, ...).
//!
//! Both are pure and never fail on data problems.
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod util;
pub mod validation;

pub use error::{Error, Result};
pub use loader::{load, load_with, parse, read_csv, read_csv_from_reader, LoadOptions};
pub use pipeline::{compute, compute_with, PipelineOptions};
pub use types::{
    AchievementSummary, AggregateResult, DerivedRecord, FilterSelection, Finding, Leaderboard,
    LeaderboardEntry, RawRow, Record, TrendPoint,
};
pub use validation::{check_duplicates, check_invariant};
