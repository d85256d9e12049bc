//! Screen output: flips the displayed background between two colors.

use std::cell::Cell;
use std::rc::Rc;

use crate::color::Color;
use crate::output::{BlinkOutput, OutputError};

/// Read side of the displayed color, for whatever renders the screen.
#[derive(Debug, Clone)]
pub struct ScreenHandle(Rc<Cell<Color>>);

impl ScreenHandle {
    pub fn color(&self) -> Color {
        self.0.get()
    }
}

/// Called with the new color whenever the displayed color changes.
pub type ScreenObserver = Box<dyn FnMut(Color)>;

pub struct ScreenOutput {
    on_color: Color,
    off_color: Color,
    displayed: Rc<Cell<Color>>,
    observer: Option<ScreenObserver>,
}

impl Default for ScreenOutput {
    fn default() -> Self {
        Self::new(Color::WHITE, Color::BLACK)
    }
}

impl ScreenOutput {
    /// Starts out showing `off_color`.
    pub fn new(on_color: Color, off_color: Color) -> Self {
        Self {
            on_color,
            off_color,
            displayed: Rc::new(Cell::new(off_color)),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: ScreenObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn handle(&self) -> ScreenHandle {
        ScreenHandle(self.displayed.clone())
    }

    pub fn color(&self) -> Color {
        self.displayed.get()
    }
}

impl BlinkOutput for ScreenOutput {
    fn name(&self) -> &'static str {
        "screen"
    }

    fn apply(&mut self, on: bool) -> Result<(), OutputError> {
        let color = if on { self.on_color } else { self.off_color };
        if self.displayed.replace(color) != color
            && let Some(observer) = self.observer.as_mut()
        {
            observer(color);
        }
        Ok(())
    }
}
