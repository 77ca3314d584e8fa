//! Status publishing.

use crate::host::StatusWidgets;
use framefeed_core::{ConnectionState, StatusView};

/// Applies [`StatusView`]s to the host's widgets, if it has any.
#[derive(Default)]
pub struct StatusPublisher {
    widgets: Option<Box<dyn StatusWidgets>>,
    last: Option<StatusView>,
}

impl StatusPublisher {
    pub fn attach(&mut self, widgets: Box<dyn StatusWidgets>) {
        self.widgets = Some(widgets);
    }

    pub fn publish(&mut self, state: ConnectionState) {
        let view = StatusView::for_state(state);
        self.last = Some(view);

        let Some(widgets) = self.widgets.as_mut() else {
            tracing::trace!(%state, "No status widgets, skipping update");
            return;
        };

        widgets.set_indicator(view.indicator);
        widgets.set_text(view.text);
        if let Some(enabled) = view.connect_enabled {
            widgets.set_connect_enabled(enabled);
        }
        if let Some(enabled) = view.disconnect_enabled {
            widgets.set_disconnect_enabled(enabled);
        }
    }

    /// The most recently published view.
    pub fn last(&self) -> Option<StatusView> {
        self.last
    }
}
