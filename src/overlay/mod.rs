//! Overlay Presentation Layer
//!
//! The display controller turns notification states into overlay updates on
//! every screen, skipping any request that matches what is already shown.

pub mod style;

use tracing::{debug, info};

use crate::display::pool::SurfacePool;
use crate::display::{DisplayError, DisplaySurfaceProvider, Rgb, ScreenDescriptor};
use crate::notification::NotificationState;

pub use style::{OverlayForm, OverlayStyle};

/// What the overlay currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayedState {
    Hidden,
    ShowingSmall(NotificationState),
    ShowingLarge(NotificationState),
}

impl DisplayedState {
    pub fn is_visible(self) -> bool {
        !matches!(self, DisplayedState::Hidden)
    }

    /// The state on screen; `None` exactly when hidden
    pub fn current_state(self) -> Option<NotificationState> {
        match self {
            DisplayedState::Hidden => None,
            DisplayedState::ShowingSmall(state) | DisplayedState::ShowingLarge(state) => Some(state),
        }
    }
}

/// Tracks the displayed state and drives the surface pool
pub struct DisplayController<P: DisplaySurfaceProvider> {
    pool: SurfacePool<P>,
    style: OverlayStyle,
    displayed: DisplayedState,
}

impl<P: DisplaySurfaceProvider> DisplayController<P> {
    /// Wrap a freshly created pool. Surfaces start unmapped.
    pub fn new(pool: SurfacePool<P>, style: OverlayStyle) -> Self {
        Self {
            pool,
            style,
            displayed: DisplayedState::Hidden,
        }
    }

    pub fn displayed(&self) -> DisplayedState {
        self.displayed
    }

    pub fn screens(&self) -> &[ScreenDescriptor] {
        self.pool.screens()
    }

    /// Show the "waiting for data" indicator
    pub fn show_initial(&mut self) -> Result<bool, DisplayError> {
        let color = self.style.color(NotificationState::Unknown);
        self.show_small(NotificationState::Unknown, color)
    }

    /// Show the centered banner with `label` on every screen.
    ///
    /// Returns `Ok(false)` when `state` is already displayed.
    pub fn show_large(
        &mut self,
        state: NotificationState,
        label: &str,
        color: Rgb,
    ) -> Result<bool, DisplayError> {
        if self.is_showing(state) {
            return Ok(false);
        }

        let style = &self.style;
        self.pool.present(|screen| style.large_rect(screen), color, Some(label))?;

        info!(
            "Showing {} overlay (code {}) on {} screen(s)",
            state,
            state.code(),
            self.pool.len()
        );
        self.displayed = DisplayedState::ShowingLarge(state);
        Ok(true)
    }

    /// Show the small corner indicator on every screen.
    ///
    /// Returns `Ok(false)` when `state` is already displayed.
    pub fn show_small(&mut self, state: NotificationState, color: Rgb) -> Result<bool, DisplayError> {
        if self.is_showing(state) {
            return Ok(false);
        }

        let style = &self.style;
        self.pool.present(|screen| style.small_rect(screen), color, None)?;

        info!("Showing {} indicator (code {})", state, state.code());
        self.displayed = DisplayedState::ShowingSmall(state);
        Ok(true)
    }

    /// Unmap every surface. Returns `Ok(false)` when already hidden.
    pub fn hide_all(&mut self) -> Result<bool, DisplayError> {
        if !self.displayed.is_visible() {
            return Ok(false);
        }

        self.pool.hide()?;

        info!("Overlay hidden");
        self.displayed = DisplayedState::Hidden;
        Ok(true)
    }

    /// Apply the display action for a wire code. Unrecognized codes, and the
    /// explicit unknown state, hide the overlay.
    pub fn dispatch(&mut self, code: i32) -> Result<bool, DisplayError> {
        let state = NotificationState::from_code(code);
        debug!("Dispatching code {} ({:?})", code, state);

        let state = match state {
            Some(NotificationState::Unknown) | None => return self.hide_all(),
            Some(state) => state,
        };

        let color = self.style.color(state);
        match OverlayStyle::form(state) {
            OverlayForm::Large => {
                let label = self.style.label(state).unwrap_or_default().to_string();
                self.show_large(state, &label, color)
            }
            OverlayForm::Small => self.show_small(state, color),
        }
    }

    /// Release every surface and the display connection
    pub fn teardown(&mut self) {
        self.pool.teardown();
        self.displayed = DisplayedState::Hidden;
    }

    fn is_showing(&self, state: NotificationState) -> bool {
        self.displayed.current_state() == Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Rect, ScreenDescriptor};
    use crate::testing::{Call, CallLog, RecordingProvider};

    fn screens() -> Vec<ScreenDescriptor> {
        vec![
            ScreenDescriptor::new(0, 0, 1920, 1080),
            ScreenDescriptor::new(1920, 0, 2560, 1440),
            ScreenDescriptor::new(-1280, 56, 1280, 1024),
        ]
    }

    fn controller_with(screens: Vec<ScreenDescriptor>) -> (DisplayController<RecordingProvider>, CallLog) {
        let provider = RecordingProvider::with_screens(Vec::new());
        let log = provider.log();
        let pool = SurfacePool::initialize(provider, screens).unwrap();
        log.lock().clear();
        (DisplayController::new(pool, OverlayStyle::default()), log)
    }

    fn applies(log: &CallLog) -> Vec<Call> {
        log.lock()
            .iter()
            .filter(|c| matches!(c, Call::Apply { .. }))
            .cloned()
            .collect()
    }

    #[test]
    fn test_initial_indicator_is_small_black() {
        let (mut controller, log) = controller_with(screens());

        assert!(controller.show_initial().unwrap());
        assert_eq!(
            controller.displayed(),
            DisplayedState::ShowingSmall(NotificationState::Unknown)
        );

        let applied = applies(&log);
        assert_eq!(applied.len(), 3);
        assert_eq!(
            applied[0],
            Call::Apply {
                surface: 0,
                rect: Rect { x: 0, y: 0, width: 20, height: 20 },
                color: Rgb(0x000000),
                label: None,
            }
        );
    }

    #[test]
    fn test_overspeed_shows_centered_red_banner_everywhere() {
        let (mut controller, log) = controller_with(screens());

        assert!(controller.dispatch(3).unwrap());

        let applied = applies(&log);
        assert_eq!(
            applied,
            vec![
                Call::Apply {
                    surface: 0,
                    rect: Rect { x: 864, y: 486, width: 192, height: 108 },
                    color: Rgb(0xB70000),
                    label: Some("OVERSPEED".to_string()),
                },
                Call::Apply {
                    surface: 1,
                    rect: Rect { x: 1920 + 1184, y: 666, width: 192, height: 108 },
                    color: Rgb(0xB70000),
                    label: Some("OVERSPEED".to_string()),
                },
                Call::Apply {
                    surface: 2,
                    rect: Rect { x: -1280 + 544, y: 56 + 458, width: 192, height: 108 },
                    color: Rgb(0xB70000),
                    label: Some("OVERSPEED".to_string()),
                },
            ]
        );
        let shown = log.lock().iter().filter(|c| matches!(c, Call::Show(_))).count();
        assert_eq!(shown, 3);
    }

    #[test]
    fn test_repeated_code_is_noop() {
        let (mut controller, log) = controller_with(screens());

        assert!(controller.dispatch(1).unwrap());
        let after_first = log.lock().len();

        assert!(!controller.dispatch(1).unwrap());
        assert_eq!(log.lock().len(), after_first);
        assert_eq!(
            controller.displayed(),
            DisplayedState::ShowingSmall(NotificationState::Break)
        );

        let applied = applies(&log);
        assert_eq!(applied.len(), 3);
        assert!(applied
            .iter()
            .all(|c| matches!(c, Call::Apply { color: Rgb(0x142F8C), label: None, .. })));
    }

    #[test]
    fn test_break_due_then_unrecognized_hides() {
        let (mut controller, log) = controller_with(screens());

        controller.dispatch(4).unwrap();
        assert_eq!(
            controller.displayed(),
            DisplayedState::ShowingLarge(NotificationState::BreakDue)
        );
        assert!(applies(&log)
            .iter()
            .all(|c| matches!(c, Call::Apply { color: Rgb(0xFF6D00), label: Some(l), .. } if l == "BREAK")));

        log.lock().clear();
        assert!(controller.dispatch(99).unwrap());
        assert_eq!(controller.displayed(), DisplayedState::Hidden);
        assert!(!controller.displayed().is_visible());
        assert_eq!(controller.displayed().current_state(), None);

        let calls = log.lock().clone();
        assert_eq!(
            calls,
            vec![Call::Hide(0), Call::Hide(1), Call::Hide(2), Call::Flush]
        );
    }

    #[test]
    fn test_hide_when_hidden_is_noop() {
        let (mut controller, log) = controller_with(screens());

        assert!(!controller.hide_all().unwrap());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_every_code_maps_to_one_action() {
        let (mut controller, _log) = controller_with(screens());

        let expected = [
            (-1, DisplayedState::Hidden),
            (0, DisplayedState::ShowingSmall(NotificationState::BreakOver)),
            (1, DisplayedState::ShowingSmall(NotificationState::Break)),
            (2, DisplayedState::ShowingSmall(NotificationState::Typing)),
            (3, DisplayedState::ShowingLarge(NotificationState::Overspeed)),
            (4, DisplayedState::ShowingLarge(NotificationState::BreakDue)),
            (5, DisplayedState::Hidden),
            (-7, DisplayedState::Hidden),
        ];

        for (code, displayed) in expected {
            controller.show_initial().unwrap();
            controller.dispatch(code).unwrap();
            assert_eq!(controller.displayed(), displayed, "code {}", code);
        }
    }

    #[test]
    fn test_unknown_code_hides_initial_indicator() {
        let (mut controller, _log) = controller_with(screens());
        controller.show_initial().unwrap();

        assert!(controller.dispatch(-1).unwrap());
        assert_eq!(controller.displayed(), DisplayedState::Hidden);
    }

    #[test]
    fn test_switching_forms_moves_every_surface() {
        let (mut controller, log) = controller_with(screens());

        controller.dispatch(3).unwrap();
        log.lock().clear();
        assert!(controller.dispatch(2).unwrap());

        let applied = applies(&log);
        let expected_rects: Vec<_> = screens()
            .iter()
            .map(|s| Rect { x: s.origin_x, y: s.origin_y, width: 20, height: 20 })
            .collect();
        let rects: Vec<_> = applied
            .iter()
            .map(|c| match c {
                Call::Apply { rect, .. } => *rect,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(rects, expected_rects);
        assert!(applied
            .iter()
            .all(|c| matches!(c, Call::Apply { color: Rgb(0x8C4914), label: None, .. })));
    }

    #[test]
    fn test_failed_redraw_keeps_previous_state() {
        let provider = RecordingProvider::with_screens(Vec::new());
        let switch = provider.failure_switch();
        let pool = SurfacePool::initialize(provider, screens()).unwrap();
        let mut controller = DisplayController::new(pool, OverlayStyle::default());

        controller.dispatch(0).unwrap();
        *switch.lock() = true;
        assert!(controller.dispatch(3).is_err());
        assert_eq!(
            controller.displayed(),
            DisplayedState::ShowingSmall(NotificationState::BreakOver)
        );

        *switch.lock() = false;
        assert!(controller.dispatch(3).unwrap());
    }

    #[test]
    fn test_fallback_screen_gets_single_overlay() {
        let mut provider = RecordingProvider::with_screens(Vec::new()).session(1366, 768);
        let log = provider.log();
        let discovered = crate::display::discover_screens(&mut provider, 16);
        let pool = SurfacePool::initialize(provider, discovered).unwrap();
        let mut controller = DisplayController::new(pool, OverlayStyle::default());

        controller.dispatch(4).unwrap();
        let applied = applies(&log);
        assert_eq!(
            applied,
            vec![Call::Apply {
                surface: 0,
                rect: Rect { x: 587, y: 330, width: 192, height: 108 },
                color: Rgb(0xFF6D00),
                label: Some("BREAK".to_string()),
            }]
        );
    }
}
