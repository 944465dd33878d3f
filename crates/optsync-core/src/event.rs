//! Lifecycle events that trigger synchronization

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Host lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Host process started
    Startup,
    /// A theme was activated
    ThemeActivated(String),
}

impl Display for LifecycleEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::ThemeActivated(theme) => write!(f, "theme_activated:{theme}"),
        }
    }
}

/// Which events a binding responds to
///
/// Textual forms: `startup`, `theme_activated` (any theme) and
/// `theme_activated:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventFilter {
    /// Host startup
    Startup,
    /// Activation of any theme
    AnyThemeActivated,
    /// Activation of one named theme
    ThemeActivated(String),
}

impl EventFilter {
    /// Whether `event` passes this filter
    #[must_use]
    pub fn matches(&self, event: &LifecycleEvent) -> bool {
        match (self, event) {
            (Self::Startup, LifecycleEvent::Startup)
            | (Self::AnyThemeActivated, LifecycleEvent::ThemeActivated(_)) => true,
            (Self::ThemeActivated(want), LifecycleEvent::ThemeActivated(got)) => want == got,
            _ => false,
        }
    }
}

/// Unrecognized event filter text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lifecycle event '{0}' (expected startup, theme_activated or theme_activated:<name>)")]
pub struct UnknownEvent(pub String);

impl FromStr for EventFilter {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "startup" => Ok(Self::Startup),
            None if s == "theme_activated" => Ok(Self::AnyThemeActivated),
            Some(("theme_activated", name)) if !name.is_empty() => {
                Ok(Self::ThemeActivated(name.to_owned()))
            }
            _ => Err(UnknownEvent(s.to_owned())),
        }
    }
}

impl TryFrom<String> for EventFilter {
    type Error = UnknownEvent;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EventFilter> for String {
    fn from(filter: EventFilter) -> Self {
        filter.to_string()
    }
}

impl Display for EventFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::AnyThemeActivated => f.write_str("theme_activated"),
            Self::ThemeActivated(theme) => write!(f, "theme_activated:{theme}"),
        }
    }
}
