//! In-memory display provider that records every request

use parking_lot::Mutex;
use std::sync::Arc;

use crate::display::{DisplayError, DisplaySurfaceProvider, Rect, Rgb, ScreenDescriptor};

/// A request received by [`RecordingProvider`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(usize, ScreenDescriptor),
    Apply {
        surface: usize,
        rect: Rect,
        color: Rgb,
        label: Option<String>,
    },
    Show(usize),
    Hide(usize),
    Flush,
    Destroy(usize),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub struct RecordingProvider {
    layout: Option<Vec<ScreenDescriptor>>,
    session: (u32, u32),
    log: CallLog,
    next_surface: usize,
    create_limit: Option<usize>,
    fail_requests: Arc<Mutex<bool>>,
}

impl RecordingProvider {
    pub fn with_screens(layout: Vec<ScreenDescriptor>) -> Self {
        Self {
            layout: Some(layout),
            session: (1920, 1080),
            log: CallLog::default(),
            next_surface: 0,
            create_limit: None,
            fail_requests: Arc::new(Mutex::new(false)),
        }
    }

    /// A provider whose layout query errors out
    pub fn without_layout() -> Self {
        Self {
            layout: None,
            ..Self::with_screens(Vec::new())
        }
    }

    pub fn session(mut self, width: u32, height: u32) -> Self {
        self.session = (width, height);
        self
    }

    /// Refuse to create more than `count` surfaces
    pub fn fail_create_after(mut self, count: usize) -> Self {
        self.create_limit = Some(count);
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Switch that makes every later mutation fail while set
    pub fn failure_switch(&self) -> Arc<Mutex<bool>> {
        self.fail_requests.clone()
    }

    fn check(&self) -> Result<(), DisplayError> {
        if *self.fail_requests.lock() {
            return Err(DisplayError::Request("connection lost".to_string()));
        }
        Ok(())
    }
}

impl DisplaySurfaceProvider for RecordingProvider {
    type Surface = usize;

    fn query_screens(&mut self) -> Result<Vec<ScreenDescriptor>, DisplayError> {
        self.layout
            .clone()
            .ok_or_else(|| DisplayError::LayoutUnavailable("extension missing".to_string()))
    }

    fn session_size(&self) -> (u32, u32) {
        self.session
    }

    fn create_surface(&mut self, screen: &ScreenDescriptor) -> Result<usize, DisplayError> {
        if self.create_limit.is_some_and(|limit| self.next_surface >= limit) {
            return Err(DisplayError::SurfaceCreation("out of resources".to_string()));
        }
        let id = self.next_surface;
        self.next_surface += 1;
        self.log.lock().push(Call::Create(id, *screen));
        Ok(id)
    }

    fn apply(
        &mut self,
        surface: &mut usize,
        rect: Rect,
        color: Rgb,
        label: Option<&str>,
    ) -> Result<(), DisplayError> {
        self.check()?;
        self.log.lock().push(Call::Apply {
            surface: *surface,
            rect,
            color,
            label: label.map(str::to_string),
        });
        Ok(())
    }

    fn show(&mut self, surface: &mut usize) -> Result<(), DisplayError> {
        self.check()?;
        self.log.lock().push(Call::Show(*surface));
        Ok(())
    }

    fn hide(&mut self, surface: &mut usize) -> Result<(), DisplayError> {
        self.check()?;
        self.log.lock().push(Call::Hide(*surface));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.check()?;
        self.log.lock().push(Call::Flush);
        Ok(())
    }

    fn destroy_surface(&mut self, surface: usize) {
        self.log.lock().push(Call::Destroy(surface));
    }
}
