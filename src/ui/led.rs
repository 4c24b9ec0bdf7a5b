//! Status LED (active-low).
//!
//! | Phase     | LED            |
//! |-----------|----------------|
//! | Idle      | off            |
//! | Scanning  | blinks at 1 Hz |
//! | Connected | on             |

use crate::ble::PHASE;
use crate::config::LED_BLINK_HALF_PERIOD_MS;
use crate::tput::LinkPhase;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive};
use embassy_time::{Duration, Timer};

#[embassy_executor::task]
pub async fn led_task(pin: AnyPin) -> ! {
    let mut led = Output::new(pin, Level::High, OutputDrive::Standard);
    let mut phase = LinkPhase::Idle;

    loop {
        phase = match phase {
            LinkPhase::Idle => {
                led.set_high();
                PHASE.wait().await
            }
            LinkPhase::Connected => {
                led.set_low();
                PHASE.wait().await
            }
            LinkPhase::Scanning => {
                led.toggle();
                let half = Timer::after(Duration::from_millis(LED_BLINK_HALF_PERIOD_MS));
                match select(half, PHASE.wait()).await {
                    Either::First(()) => LinkPhase::Scanning,
                    Either::Second(next) => next,
                }
            }
        };
    }
}
