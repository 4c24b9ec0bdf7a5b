//! User interface subsystem - trigger button, status LED, OLED screen.
//!
//! ## Components
//!
//! - **Button**: one tactile switch with debouncing; each press raises
//!   the mode trigger (or starts a scan while disconnected)
//! - **LED**: mirrors the link phase (off / blinking / on)
//! - **Display**: SSD1306 128×64 OLED via I²C, fed by `ble::STATUS`

pub mod buttons;
pub mod display;
pub mod led;

use defmt::info;
use embassy_nrf::peripherals::TWISPI0;
use embassy_nrf::twim::Twim;

use crate::ble::STATUS;
use display::StatusView;

/// Redraws the status screen on every status event.
#[embassy_executor::task]
pub async fn display_task(i2c: Twim<'static, TWISPI0>) -> ! {
    let mut display = display::init(i2c);
    let mut view = StatusView::default();
    display::draw_status(&mut display, &view);
    info!("Display ready");

    loop {
        let event = STATUS.receive().await;
        view.apply(event);
        display::draw_status(&mut display, &view);
    }
}
