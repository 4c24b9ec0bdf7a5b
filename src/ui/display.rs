//! SSD1306 OLED status screen.

use core::fmt::Write as _;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use crate::ble::StatusEvent;
use crate::error::BleError;
use crate::tput::{LinkPhase, TransferMode};

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Initialise the SSD1306 display and clear the screen.
pub fn init<I2C>(i2c: I2C) -> Display<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    let _ = display.init();
    display.clear_buffer();
    let _ = display.flush();
    display
}

fn text_style() -> embedded_graphics::mono_font::MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

/// What the screen shows, folded from `StatusEvent`s.
#[derive(Clone, Copy, Default)]
pub struct StatusView {
    pub phase: LinkPhase,
    pub mode: TransferMode,
    pub rx_kbps: u32,
    pub tx_kbps: u32,
    pub last_error: Option<BleError>,
}

impl StatusView {
    pub fn apply(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::Phase(phase) => {
                self.phase = phase;
                if phase != LinkPhase::Connected {
                    self.mode = TransferMode::default();
                    self.rx_kbps = 0;
                    self.tx_kbps = 0;
                }
            }
            StatusEvent::Mode(mode) => {
                self.mode = mode;
                self.tx_kbps = 0;
                self.last_error = None;
            }
            StatusEvent::Rates(report) => {
                self.rx_kbps = report.rx_kbps.unwrap_or(0);
                self.tx_kbps = report.tx_kbps.unwrap_or(0);
            }
            StatusEvent::Error(e) => self.last_error = Some(e),
        }
    }
}

pub fn draw_status<I2C>(display: &mut Display<I2C>, view: &StatusView)
where
    I2C: embedded_hal::i2c::I2c,
{
    display.clear_buffer();

    let _ = Text::new("BLE throughput", Point::new(0, 10), text_style()).draw(display);

    let phase = match view.phase {
        LinkPhase::Idle => "Idle - press button",
        LinkPhase::Scanning => "Scanning...",
        LinkPhase::Connected => view.mode.label(),
    };
    let _ = Text::new(phase, Point::new(0, 24), text_style()).draw(display);

    if view.phase == LinkPhase::Connected {
        let mut line: heapless::String<24> = heapless::String::new();
        let _ = write!(line, "RX {} kbps", view.rx_kbps);
        let _ = Text::new(line.as_str(), Point::new(0, 38), text_style()).draw(display);

        line.clear();
        let _ = write!(line, "TX {} kbps", view.tx_kbps);
        let _ = Text::new(line.as_str(), Point::new(0, 50), text_style()).draw(display);
    }

    if view.last_error.is_some() {
        let _ = Text::new("ERR", Point::new(104, 10), text_style()).draw(display);
    }

    let _ = display.flush();
}
