//! Display Layer
//!
//! Screen discovery and overlay surfaces. The windowing system itself sits
//! behind [`DisplaySurfaceProvider`]; the X11 implementation lives in [`x11`].

pub mod pool;
pub mod x11;

use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Default cap on the number of screens that receive an overlay
pub const DEFAULT_MAX_SCREENS: usize = 16;

/// Errors raised by a display backend
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("cannot open display: {0}")]
    Unavailable(String),
    #[error("failed to create overlay surface: {0}")]
    SurfaceCreation(String),
    #[error("display request failed: {0}")]
    Request(String),
    #[error("multi-monitor layout unavailable: {0}")]
    LayoutUnavailable(String),
}

/// Geometry of one physical display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenDescriptor {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenDescriptor {
    pub fn new(origin_x: i32, origin_y: i32, width: u32, height: u32) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }
}

impl fmt::Display for ScreenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.origin_x, self.origin_y
        )
    }
}

/// An on-screen rectangle in root coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A 24-bit `0xRRGGBB` color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);

    /// Parse `#RRGGBB`, `0xRRGGBB` or bare `RRGGBB`
    pub fn parse(value: &str) -> Option<Rgb> {
        let trimmed = value.trim();
        let hex = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Rgb)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0 & 0xFF_FFFF)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value).ok_or_else(|| format!("invalid color '{}', expected #RRGGBB", value))
    }
}

/// Windowing-system capability used by the overlay.
///
/// A provider owns the display connection. Surfaces are opaque handles the
/// provider hands out and later receives back for mutation; all mutations may
/// be buffered until [`flush`](DisplaySurfaceProvider::flush).
pub trait DisplaySurfaceProvider {
    type Surface;

    /// Query the multi-monitor layout. An empty list or an error means the
    /// layout is unavailable.
    fn query_screens(&mut self) -> Result<Vec<ScreenDescriptor>, DisplayError>;

    /// Size of the whole display session, used when no layout is available
    fn session_size(&self) -> (u32, u32);

    /// Create an unmanaged, undecorated, initially unmapped surface on `screen`
    fn create_surface(&mut self, screen: &ScreenDescriptor) -> Result<Self::Surface, DisplayError>;

    /// Move and resize the surface and set its fill color and optional label
    fn apply(
        &mut self,
        surface: &mut Self::Surface,
        rect: Rect,
        color: Rgb,
        label: Option<&str>,
    ) -> Result<(), DisplayError>;

    /// Raise, map and paint the surface
    fn show(&mut self, surface: &mut Self::Surface) -> Result<(), DisplayError>;

    /// Unmap the surface
    fn hide(&mut self, surface: &mut Self::Surface) -> Result<(), DisplayError>;

    /// Push all buffered requests to the display server
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Release a surface. Failures are not reported; this runs during teardown.
    fn destroy_surface(&mut self, surface: Self::Surface);
}

/// Discover the screens to draw on.
///
/// Never fails: an unavailable or empty layout degrades to one synthetic
/// screen covering the whole session. At most `max_screens` are kept.
pub fn discover_screens<P: DisplaySurfaceProvider>(
    provider: &mut P,
    max_screens: usize,
) -> Vec<ScreenDescriptor> {
    let mut screens = match provider.query_screens() {
        Ok(screens) => screens,
        Err(e) => {
            warn!("Screen layout query failed, using the whole display: {}", e);
            Vec::new()
        }
    };

    if screens.is_empty() {
        let (width, height) = provider.session_size();
        debug!("No screen layout reported, falling back to {}x{}", width, height);
        return vec![ScreenDescriptor::new(0, 0, width, height)];
    }

    let cap = max_screens.max(1);
    if screens.len() > cap {
        debug!("Dropping {} screens beyond the cap of {}", screens.len() - cap, cap);
        screens.truncate(cap);
    }
    screens
}
