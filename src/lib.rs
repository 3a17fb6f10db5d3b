//! Compiles period-comparison sales metrics into presentation-ready view
//! models: ranked top-N lists, growth-rate series, distribution breakdowns and
//! radar datasets, all with consistent number formatting.

pub mod change;
pub mod dashboard;
pub mod distribution;
pub mod formatting;
pub mod options;
pub mod payload;
pub mod ranking;
pub mod viewmodel;

pub use change::{ChangeResult, Direction, compute_change, implied_previous, resolve_change};
pub use dashboard::{DashboardViews, NamedView, compile_dashboard, compile_latest};
pub use distribution::{Distribution, DistributionSlice, distribution};
pub use formatting::{FormatMode, FormatStyle, format, format_compact, truncate_label};
pub use options::AssembleOptions;
pub use payload::{DashboardPayload, MetricRecord, Period, Widget, parse_payload};
pub use ranking::{RankOrder, RankedEntry, top_n};
pub use viewmodel::{ChartKind, Column, MetricTable, ViewModel, assemble};
