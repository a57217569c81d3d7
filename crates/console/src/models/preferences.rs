//! Per-session appearance and feature preferences.

use serde::{Deserialize, Serialize};

/// A colour theme the console can render with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub id: &'static str,
    pub label: &'static str,
    /// Swatch shown next to the option.
    pub accent: &'static str,
}

/// Available themes, in display order.
pub const THEMES: [Theme; 6] = [
    Theme {
        id: "apple-blue",
        label: "Azul Apple",
        accent: "#0a84ff",
    },
    Theme {
        id: "dark-pro",
        label: "Oscuro Pro",
        accent: "#5e5ce6",
    },
    Theme {
        id: "apple-light",
        label: "Claro Apple",
        accent: "#8e8e93",
    },
    Theme {
        id: "apple-dark",
        label: "Oscuro Apple",
        accent: "#1c1c1e",
    },
    Theme {
        id: "red-vivid",
        label: "Rojo Vivo",
        accent: "#ff3b30",
    },
    Theme {
        id: "green-fresh",
        label: "Verde Fresco",
        accent: "#34c759",
    },
];

/// Default theme id.
pub const DEFAULT_THEME: &str = "apple-blue";

/// Appearance and feature toggles kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub dark_mode: bool,
    pub theme: String,
    pub hardware_requests: bool,
    pub auto_assign: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            theme: DEFAULT_THEME.to_string(),
            hardware_requests: false,
            auto_assign: true,
        }
    }
}

impl Preferences {
    /// Look up a theme by id.
    #[must_use]
    pub fn find_theme(id: &str) -> Option<&'static Theme> {
        THEMES.iter().find(|t| t.id == id)
    }

    /// The active theme id, falling back to the default for unknown values.
    #[must_use]
    pub fn theme_id(&self) -> &str {
        Self::find_theme(&self.theme).map_or(DEFAULT_THEME, |t| t.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert!(!prefs.dark_mode);
        assert_eq!(prefs.theme, "apple-blue");
        assert!(!prefs.hardware_requests);
        assert!(prefs.auto_assign);
    }

    #[test]
    fn test_partial_session_value_fills_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"dark_mode": true}"#).unwrap();
        assert!(prefs.dark_mode);
        assert_eq!(prefs.theme, "apple-blue");
        assert!(prefs.auto_assign);
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let prefs = Preferences {
            theme: "neon".to_string(),
            ..Preferences::default()
        };
        assert_eq!(prefs.theme_id(), "apple-blue");
        assert!(Preferences::find_theme("green-fresh").is_some());
    }
}
