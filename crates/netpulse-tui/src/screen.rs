//! The five tabs. Each is bound to the digit key of its position.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    Dashboard,
    Anomalies,
    Devices,
    Traffic,
    Alerts,
}

impl ScreenId {
    /// Tab-bar order; a screen's position here is its identity.
    pub const ALL: [Self; 5] = [
        Self::Dashboard,
        Self::Anomalies,
        Self::Devices,
        Self::Traffic,
        Self::Alerts,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Digit that selects this tab.
    pub fn hotkey(self) -> char {
        u32::try_from(self.index() + 1)
            .ok()
            .and_then(|n| char::from_digit(n, 10))
            .unwrap_or('?')
    }

    pub fn from_hotkey(key: char) -> Option<Self> {
        let n = usize::try_from(key.to_digit(10)?).ok()?;
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Anomalies => "Anomalies",
            Self::Devices => "Devices",
            Self::Traffic => "Traffic",
            Self::Alerts => "Alerts",
        }
    }
}
