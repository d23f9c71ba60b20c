//! Overlay forms, colors and geometry for each notification state

use crate::config::{OverlaySettings, StateColors, StateLabels};
use crate::display::{Rect, Rgb, ScreenDescriptor};
use crate::notification::NotificationState;

/// The two shapes an overlay can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayForm {
    /// Square anchored at the screen's top-left corner, no text
    Small,
    /// Fixed-size banner centered on the screen, with a label
    Large,
}

/// Resolved styling for the overlay
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    large_width: u32,
    large_height: u32,
    small_size: u32,
    colors: StateColors,
    labels: StateLabels,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::new(
            &OverlaySettings::default(),
            StateColors::default(),
            StateLabels::default(),
        )
    }
}

impl OverlayStyle {
    pub fn new(settings: &OverlaySettings, colors: StateColors, labels: StateLabels) -> Self {
        Self {
            large_width: settings.large_width.max(1),
            large_height: settings.large_height.max(1),
            small_size: settings.small_size.max(1),
            colors,
            labels,
        }
    }

    /// Which form a state is drawn in
    pub fn form(state: NotificationState) -> OverlayForm {
        match state {
            NotificationState::Overspeed | NotificationState::BreakDue => OverlayForm::Large,
            NotificationState::Unknown
            | NotificationState::BreakOver
            | NotificationState::Break
            | NotificationState::Typing => OverlayForm::Small,
        }
    }

    pub fn color(&self, state: NotificationState) -> Rgb {
        self.colors.for_state(state)
    }

    /// Label for large-form states
    pub fn label(&self, state: NotificationState) -> Option<&str> {
        match state {
            NotificationState::Overspeed => Some(&self.labels.overspeed),
            NotificationState::BreakDue => Some(&self.labels.break_due),
            _ => None,
        }
    }

    /// Large banner centered within `screen`
    pub fn large_rect(&self, screen: &ScreenDescriptor) -> Rect {
        Rect {
            x: centered(screen.origin_x, screen.width, self.large_width),
            y: centered(screen.origin_y, screen.height, self.large_height),
            width: self.large_width,
            height: self.large_height,
        }
    }

    /// Small square at the screen origin
    pub fn small_rect(&self, screen: &ScreenDescriptor) -> Rect {
        Rect {
            x: screen.origin_x,
            y: screen.origin_y,
            width: self.small_size,
            height: self.small_size,
        }
    }
}

/// Offset that centers `inner` within a span of `outer` starting at `origin`.
/// May fall before `origin` when the screen is smaller than the overlay.
fn centered(origin: i32, outer: u32, inner: u32) -> i32 {
    let offset = (i64::from(outer) - i64::from(inner)) / 2;
    (i64::from(origin) + offset).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
