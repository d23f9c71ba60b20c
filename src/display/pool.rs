//! Overlay surface pool
//!
//! One surface per screen, created once at startup and reused until teardown.

use tracing::{debug, info};

use super::{DisplayError, DisplaySurfaceProvider, Rect, Rgb, ScreenDescriptor};

/// Owns the display provider and one surface per screen
pub struct SurfacePool<P: DisplaySurfaceProvider> {
    provider: P,
    screens: Vec<ScreenDescriptor>,
    surfaces: Vec<P::Surface>,
}

impl<P: DisplaySurfaceProvider> SurfacePool<P> {
    /// Create one surface per screen. If any creation fails, the surfaces
    /// already created are released before returning the error.
    pub fn initialize(mut provider: P, screens: Vec<ScreenDescriptor>) -> Result<Self, DisplayError> {
        let mut surfaces = Vec::with_capacity(screens.len());
        for screen in &screens {
            match provider.create_surface(screen) {
                Ok(surface) => surfaces.push(surface),
                Err(e) => {
                    for surface in surfaces.drain(..) {
                        provider.destroy_surface(surface);
                    }
                    return Err(e);
                }
            }
        }
        provider.flush()?;

        info!("Created {} overlay surface(s)", surfaces.len());
        Ok(Self {
            provider,
            screens,
            surfaces,
        })
    }

    pub fn screens(&self) -> &[ScreenDescriptor] {
        &self.screens
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Apply the same color and label to every surface, placing each one at
    /// the rectangle `layout` computes for its screen, then show them all.
    pub fn present<F>(&mut self, layout: F, color: Rgb, label: Option<&str>) -> Result<(), DisplayError>
    where
        F: Fn(&ScreenDescriptor) -> Rect,
    {
        for (screen, surface) in self.screens.iter().zip(self.surfaces.iter_mut()) {
            let rect = layout(screen);
            self.provider.apply(surface, rect, color, label)?;
            self.provider.show(surface)?;
        }
        self.provider.flush()
    }

    /// Unmap every surface
    pub fn hide(&mut self) -> Result<(), DisplayError> {
        for surface in self.surfaces.iter_mut() {
            self.provider.hide(surface)?;
        }
        self.provider.flush()
    }

    /// Release every surface. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.surfaces.is_empty() {
            return;
        }
        debug!("Releasing {} overlay surface(s)", self.surfaces.len());
        for surface in self.surfaces.drain(..) {
            self.provider.destroy_surface(surface);
        }
        let _ = self.provider.flush();
    }
}

impl<P: DisplaySurfaceProvider> Drop for SurfacePool<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}
