//! # hq-algo: studies on the Hydro-Québec transmission network
//!
//! ## Power flow
//!
//! [`solve_power_flow`] solves one operating point; [`PowerFlowAnalyzer`]
//! runs it over a time series and derives the reports.
//!
//! | Mode | Description |
//! |------|-------------|
//! | [`PowerFlowMode::Dc`] | Linear B′θ = P per island, lossless |
//! | [`PowerFlowMode::Ac`] | Newton-Raphson on the Y-bus, DC warm start |
//!
//! ## Dispatch
//!
//! - [`DispatchMethod::MeritOrder`]: cheapest offers first, no network
//! - [`DispatchMethod::LinearOpf`]: LP with DC flows and thermal limits
//!   (`solver-clarabel` feature)
//!
//! ## Slack redistribution
//!
//! [`redistribute`] hands the slack generator's output back to the other
//! units in merit order until it is negligible.
//!
//! ## GIS and reporting
//!
//! - [`geo`]: haversine distances and line lengths
//! - [`region_join`]: node to MRC assignment
//! - [`timeseries`]: peaks, seasonal statistics and production patterns
//! - [`emissions`], [`summary`]
//!
//! ## Example
//!
//! ```ignore
//! use hq_algo::{PowerFlowAnalyzer, PowerFlowMode};
//!
//! let mut analyzer = PowerFlowAnalyzer::new(&network).with_time_series(&series);
//! if analyzer.run_power_flow(None, Some(PowerFlowMode::Ac)) {
//!     for line in analyzer.get_critical_lines(90.0)? {
//!         println!("{} {:.1}%", line.line, line.loading);
//!     }
//! }
//! ```

pub mod dispatch;
pub mod emissions;
pub mod error;
pub mod geo;
pub mod power_flow;
pub mod redistribution;
pub mod region_join;
pub mod summary;
pub mod timeseries;

pub use dispatch::{
    check_feasibility, DispatchMethod, DispatchResult, Dispatcher, Offer, SnapshotDispatch,
};
pub use emissions::{distribution_emissions, transport_emissions, EmissionsReport};
pub use error::{DispatchError, PowerFlowError};
pub use geo::{
    distance_km, fill_line_lengths, haversine_km, path_length_km, rounded_length_km,
    EARTH_RADIUS_KM,
};
pub use power_flow::{
    solve_power_flow, BusVoltage, CriticalLine, GeneratorOutput, LineFlow, LineLoading,
    LossReport, PowerFlowAnalyzer, PowerFlowMode, PowerFlowSettings, PowerFlowSolution,
    VoltageProfileRow,
};
pub use redistribution::{redistribute, RedistributionReport, RedistributionSettings};
pub use region_join::{
    join_nodes, join_points, NodeRole, RegionJoin, RegionJoinSummary, RegionPoints, RoleCounts,
};
pub use summary::{EnergyBalance, NetworkSummary, TimeHorizon};
pub use timeseries::{
    check_temporal_consistency, find_peak_demand, production_patterns, seasonal_stats,
    PeakDemand, ProductionPattern, SeasonalStats,
};
