//! Application Coordinator
//!
//! Owns the display controller for the life of the process and guarantees
//! the overlay surfaces are released on every exit path.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::AppConfig;
use crate::connection::Connector;
use crate::dispatch::DispatchLoop;
use crate::display::pool::SurfacePool;
use crate::display::{discover_screens, DisplaySurfaceProvider};
use crate::overlay::{DisplayController, OverlayStyle};
use crate::shutdown::Waiter;

/// Main application coordinator
pub struct UsageBarApp<P: DisplaySurfaceProvider> {
    controller: DisplayController<P>,
}

impl<P: DisplaySurfaceProvider> UsageBarApp<P> {
    /// Discover screens, create one surface per screen and show the
    /// "waiting for data" indicator
    pub fn new(mut provider: P, config: &AppConfig) -> Result<Self> {
        let screens = discover_screens(&mut provider, config.overlay.max_screens);
        let pool = SurfacePool::initialize(provider, screens)
            .context("failed to create overlay surfaces")?;
        let style = OverlayStyle::new(&config.overlay, config.colors.clone(), config.labels.clone());
        let mut controller = DisplayController::new(pool, style);
        for (index, screen) in controller.screens().iter().enumerate() {
            info!("Screen {}: {}", index, screen);
        }
        controller
            .show_initial()
            .context("failed to show the initial indicator")?;

        Ok(Self { controller })
    }

    /// Run the dispatch loop until shutdown is requested
    pub fn run<C: Connector, W: Waiter>(&mut self, dispatch: &mut DispatchLoop<C, W>) -> Result<()> {
        dispatch
            .run(&mut self.controller)
            .context("display connection failed")
    }

    #[cfg(test)]
    pub fn controller(&self) -> &DisplayController<P> {
        &self.controller
    }
}

impl<P: DisplaySurfaceProvider> Drop for UsageBarApp<P> {
    fn drop(&mut self) {
        info!("Releasing overlay surfaces");
        self.controller.teardown();
    }
}
