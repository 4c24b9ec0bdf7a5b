//! GPIO trigger button with async debouncing.
//!
//! One active-low button with internal pull-up. Each debounced press
//! raises `ble::TRIGGER`; the mode switch worker does the rest.

use crate::ble::TRIGGER;
use crate::config::BUTTON_DEBOUNCE_MS;
use defmt::info;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::{Duration, Timer};

/// Waits for the pin to go low (pressed), debounces, raises the trigger,
/// then waits for release before repeating.
#[embassy_executor::task]
pub async fn trigger_button_task(pin: AnyPin) -> ! {
    let mut btn = Input::new(pin, Pull::Up);

    loop {
        // Falling edge = press (active-low).
        btn.wait_for_falling_edge().await;

        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        if btn.is_low() {
            info!("Button: trigger");
            TRIGGER.signal(());

            // Wait for release to avoid repeat triggers.
            btn.wait_for_rising_edge().await;
            Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        }
    }
}
