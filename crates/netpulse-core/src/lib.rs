// netpulse-core: Real-time state layer between netpulse-api and consumers (CLI/TUI).
//
// Merges REST snapshots and stream deltas into one bounded view model,
// derives acknowledgeable alerts from anomalies and owns the session state
// machine. Consumers read through `Monitor` and never touch wire types.

pub mod alerts;
pub mod coalesce;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod monitor;
pub mod reducer;
pub mod session;
pub mod store;
pub mod stream;
pub mod validation;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alerts::{AlertFilter, AlertStore};
pub use config::{DEFAULT_API_URL, MonitorConfig};
pub use error::CoreError;
pub use monitor::{Monitor, Subscription};
pub use reducer::{Delta, Snapshot};
pub use session::{Authenticator, Session, SessionEvent, SessionState};
pub use store::DashboardStore;
pub use stream::ViewStream;
pub use validation::{Field, LoginForm, ResetForm, SignupForm, ValidationError, ValidationErrors};

// Model types at the crate root for ergonomics.
pub use model::{
    Alert, Anomaly, AnomalyId, ConnectionState, Device, ProtocolDistribution, Severity, Stats,
    TopTalker, TrafficPoint, ViewModel,
};

// Query parameters are part of the public surface of `Monitor`.
pub use netpulse_api::network::AnomalyQuery;
pub use netpulse_api::{ReconnectConfig, StreamStatus, TlsMode};
