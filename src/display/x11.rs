//! X11 display backend
//!
//! Overlay surfaces are override-redirect windows, so the window manager never
//! decorates, focuses or places them. Screen layout comes from Xinerama.

use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xinerama::ConnectionExt as _;
use x11rb::protocol::xproto::{
    ChangeGCAux, ChangeWindowAttributesAux, Char2b, ConfigureWindowAux, ConnectionExt as _,
    CreateGCAux, CreateWindowAux, Font, Gcontext, Rectangle, StackMode, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT};

use super::{DisplayError, DisplaySurfaceProvider, Rect, Rgb, ScreenDescriptor};
use crate::config::OverlaySettings;

/// Longest string a single ImageText8 request can carry
const MAX_TEXT8_LEN: usize = 255;

impl From<ConnectionError> for DisplayError {
    fn from(e: ConnectionError) -> Self {
        DisplayError::Request(e.to_string())
    }
}

impl From<ReplyError> for DisplayError {
    fn from(e: ReplyError) -> Self {
        DisplayError::Request(e.to_string())
    }
}

impl From<ReplyOrIdError> for DisplayError {
    fn from(e: ReplyOrIdError) -> Self {
        DisplayError::SurfaceCreation(e.to_string())
    }
}

/// An override-redirect window and its graphics context
pub struct X11Surface {
    window: Window,
    gc: Gcontext,
    rect: Rect,
    color: Rgb,
    label: Option<String>,
}

/// Connection to the X server
pub struct X11Display {
    conn: RustConnection,
    screen_num: usize,
    font: Option<Font>,
    text_color: Rgb,
}

impl X11Display {
    /// Open the display named by `$DISPLAY` and load the label font
    pub fn connect(settings: &OverlaySettings) -> Result<Self, DisplayError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| DisplayError::Unavailable(e.to_string()))?;

        let font = load_font(&conn, &[settings.font.as_str(), settings.fallback_font.as_str()]);
        if font.is_none() {
            warn!("No label font available, overlays will be drawn without text");
        }

        Ok(Self {
            conn,
            screen_num,
            font,
            text_color: settings.text_color,
        })
    }

    fn root_screen(&self) -> &x11rb::protocol::xproto::Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    fn text_extents(&self, font: Font, text: &[u8]) -> Result<TextExtents, DisplayError> {
        let chars: Vec<Char2b> = text.iter().map(|&b| Char2b { byte1: 0, byte2: b }).collect();
        let reply = self.conn.query_text_extents(font, &chars)?.reply()?;
        Ok(TextExtents {
            width: reply.overall_width,
            ascent: reply.font_ascent.into(),
            descent: reply.font_descent.into(),
        })
    }

    /// Fill the surface and draw its label
    fn draw(&self, surface: &X11Surface) -> Result<(), DisplayError> {
        self.conn.change_gc(surface.gc, &ChangeGCAux::new().foreground(surface.color.0))?;
        self.conn.poly_fill_rectangle(
            surface.window,
            surface.gc,
            &[Rectangle {
                x: 0,
                y: 0,
                width: clamp_u16(surface.rect.width),
                height: clamp_u16(surface.rect.height),
            }],
        )?;

        let (Some(label), Some(font)) = (surface.label.as_deref(), self.font) else {
            return Ok(());
        };
        let text = &label.as_bytes()[..label.len().min(MAX_TEXT8_LEN)];
        let (x, y) = label_origin(surface.rect, self.text_extents(font, text)?);

        self.conn.change_gc(
            surface.gc,
            &ChangeGCAux::new()
                .foreground(self.text_color.0)
                .background(surface.color.0)
                .font(font),
        )?;
        self.conn
            .image_text8(surface.window, surface.gc, clamp_i16(x), clamp_i16(y), text)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct TextExtents {
    width: i32,
    ascent: i32,
    descent: i32,
}

/// Baseline origin that centers the text box inside `rect`
fn label_origin(rect: Rect, text: TextExtents) -> (i32, i32) {
    let width = i32::try_from(rect.width).unwrap_or(i32::MAX);
    let height = i32::try_from(rect.height).unwrap_or(i32::MAX);
    let x = (width - text.width) / 2;
    let y = (height + text.ascent - text.descent) / 2;
    (x, y)
}

/// Open the first font in `names` the server knows
fn load_font(conn: &RustConnection, names: &[&str]) -> Option<Font> {
    for name in names {
        let id = match conn.generate_id() {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to allocate font id: {}", e);
                return None;
            }
        };
        match conn.open_font(id, name.as_bytes()).map(|cookie| cookie.check()) {
            Ok(Ok(())) => {
                debug!("Loaded font {}", name);
                return Some(id);
            }
            Ok(Err(e)) => debug!("Font {} unavailable: {}", name, e),
            Err(e) => debug!("Font {} unavailable: {}", name, e),
        }
    }
    None
}

impl DisplaySurfaceProvider for X11Display {
    type Surface = X11Surface;

    fn query_screens(&mut self) -> Result<Vec<ScreenDescriptor>, DisplayError> {
        let active = self
            .conn
            .xinerama_is_active()
            .map_err(|e| DisplayError::LayoutUnavailable(e.to_string()))?
            .reply()
            .map_err(|e| DisplayError::LayoutUnavailable(e.to_string()))?;
        if active.state == 0 {
            return Ok(Vec::new());
        }

        let reply = self.conn.xinerama_query_screens()?.reply()?;
        Ok(reply
            .screen_info
            .iter()
            .map(|info| ScreenDescriptor {
                origin_x: info.x_org.into(),
                origin_y: info.y_org.into(),
                width: info.width.into(),
                height: info.height.into(),
            })
            .collect())
    }

    fn session_size(&self) -> (u32, u32) {
        let screen = self.root_screen();
        (screen.width_in_pixels.into(), screen.height_in_pixels.into())
    }

    fn create_surface(&mut self, screen: &ScreenDescriptor) -> Result<X11Surface, DisplayError> {
        let (root, black, white) = {
            let root = self.root_screen();
            (root.root, root.black_pixel, root.white_pixel)
        };
        let rect = Rect {
            x: screen.origin_x,
            y: screen.origin_y,
            width: screen.width.max(1),
            height: screen.height.max(1),
        };

        let window = self.conn.generate_id()?;
        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            root,
            clamp_i16(rect.x),
            clamp_i16(rect.y),
            clamp_u16(rect.width),
            clamp_u16(rect.height),
            0,
            WindowClass::INPUT_OUTPUT,
            COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(white)
                .border_pixel(black)
                .override_redirect(1),
        )?;

        let gc = self.conn.generate_id()?;
        self.conn
            .create_gc(gc, window, &CreateGCAux::new().foreground(black).graphics_exposures(0))?;

        debug!("Created overlay window {:#x} on screen {}", window, screen);
        Ok(X11Surface {
            window,
            gc,
            rect,
            color: Rgb(black),
            label: None,
        })
    }

    fn apply(
        &mut self,
        surface: &mut X11Surface,
        rect: Rect,
        color: Rgb,
        label: Option<&str>,
    ) -> Result<(), DisplayError> {
        self.conn.configure_window(
            surface.window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width.max(1))
                .height(rect.height.max(1)),
        )?;
        // Let the server repaint the fill on expose
        self.conn.change_window_attributes(
            surface.window,
            &ChangeWindowAttributesAux::new().background_pixel(color.0),
        )?;

        surface.rect = rect;
        surface.color = color;
        surface.label = label.map(str::to_string);
        Ok(())
    }

    fn show(&mut self, surface: &mut X11Surface) -> Result<(), DisplayError> {
        self.conn.configure_window(
            surface.window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.conn.map_window(surface.window)?;
        // Content drawn while unmapped is lost
        self.draw(surface)
    }

    fn hide(&mut self, surface: &mut X11Surface) -> Result<(), DisplayError> {
        self.conn.unmap_window(surface.window)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.conn.flush()?;
        Ok(())
    }

    fn destroy_surface(&mut self, surface: X11Surface) {
        if let Err(e) = self.conn.free_gc(surface.gc) {
            debug!("Failed to free graphics context: {}", e);
        }
        if let Err(e) = self.conn.destroy_window(surface.window) {
            debug!("Failed to destroy window {:#x}: {}", surface.window, e);
        }
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        if let Some(font) = self.font.take() {
            let _ = self.conn.close_font(font);
        }
        let _ = self.conn.flush();
        debug!("Closed X display connection");
    }
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn clamp_u16(value: u32) -> u16 {
    value.min(u32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_clamping() {
        assert_eq!(clamp_i16(-46), -46);
        assert_eq!(clamp_i16(100_000), i16::MAX);
        assert_eq!(clamp_i16(-100_000), i16::MIN);
        assert_eq!(clamp_u16(192), 192);
        assert_eq!(clamp_u16(70_000), u16::MAX);
    }

    #[test]
    fn test_label_is_centered_on_font_box() {
        let rect = Rect { x: 864, y: 486, width: 192, height: 108 };

        let large = TextExtents { width: 160, ascent: 30, descent: 8 };
        assert_eq!(label_origin(rect, large), (16, 65));

        let fixed = TextExtents { width: 54, ascent: 11, descent: 2 };
        assert_eq!(label_origin(rect, fixed), (69, 58));
    }
}
