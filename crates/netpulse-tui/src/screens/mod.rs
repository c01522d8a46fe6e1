//! Screen implementations. Each screen is a top-level Component.

pub mod alerts;
pub mod anomalies;
pub mod dashboard;
pub mod devices;
pub mod login;
pub mod traffic;

use crate::component::Component;
use crate::screen::ScreenId;

/// Create screen components for the tab bar, in tab order.
pub fn create_screens() -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (
            ScreenId::Dashboard,
            Box::new(dashboard::DashboardScreen::new()),
        ),
        (
            ScreenId::Anomalies,
            Box::new(anomalies::AnomaliesScreen::new()),
        ),
        (ScreenId::Devices, Box::new(devices::DevicesScreen::new())),
        (ScreenId::Traffic, Box::new(traffic::TrafficScreen::new())),
        (ScreenId::Alerts, Box::new(alerts::AlertsScreen::new())),
    ]
}
