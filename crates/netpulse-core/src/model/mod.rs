// ── Dashboard domain model ──
//
// Canonical types consumed by the CLI and TUI. Wire types from
// `netpulse-api` are converted into these in `crate::convert`, which is
// where missing optional fields receive their defaults.

pub mod anomaly;
pub mod network;
pub mod view;

pub use anomaly::{Alert, Anomaly, AnomalyId, Severity};
pub use network::{Device, ProtocolDistribution, TopTalker, TrafficPoint, rank_talkers};
pub use view::{ANOMALY_CAP, ConnectionState, Stats, TRAFFIC_CAP, ViewModel, format_rate};
