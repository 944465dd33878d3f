//! Record key to desired shape bindings

use optsync_reconcile::DesiredShape;

use crate::event::{EventFilter, LifecycleEvent};

/// A store record kept in a desired shape
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    key: String,
    shape: DesiredShape,
    events: Vec<EventFilter>,
}

impl Binding {
    /// Binding triggered on startup
    #[must_use]
    pub fn new(key: impl Into<String>, shape: DesiredShape) -> Self {
        Self {
            key: key.into(),
            shape,
            events: vec![EventFilter::Startup],
        }
    }

    /// Replace the triggering events
    #[must_use]
    pub fn with_events(mut self, events: impl IntoIterator<Item = EventFilter>) -> Self {
        self.events = events.into_iter().collect();
        self
    }

    /// Store record key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Shape the record must satisfy
    #[inline]
    #[must_use]
    pub fn shape(&self) -> &DesiredShape {
        &self.shape
    }

    /// Events that trigger this binding
    #[inline]
    #[must_use]
    pub fn events(&self) -> &[EventFilter] {
        &self.events
    }

    /// Whether `event` triggers this binding
    #[must_use]
    pub fn triggered_by(&self, event: &LifecycleEvent) -> bool {
        self.events.iter().any(|filter| filter.matches(event))
    }
}
