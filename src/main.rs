//! BLE throughput client firmware for nRF52840.
//!
//! Scans for a peripheral named `TPUT`, connects as Central and pumps
//! GATT notifications and write commands through it, logging RX/TX
//! throughput once per second.
//!
//! Button 1 starts a scan while disconnected and cycles the transfer
//! mode while connected.

#![no_std]
#![no_main]

mod ble;
mod config;
mod error;
mod tput;
mod ui;

use cortex_m_rt::{exception, ExceptionFrame};
use defmt::{error, info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::gpio::Pin as _;
use embassy_nrf::interrupt::{self, InterruptExt as _};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use nrf_softdevice::{raw, Softdevice};
use panic_probe as _;

use crate::config::{GAP_EVENT_LENGTH, REQUESTED_ATT_MTU, WRITE_CMD_TX_QUEUE_SIZE};

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    info!("SoftDevice task started");
    sd.run().await
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: GAP_EVENT_LENGTH,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: REQUESTED_ATT_MTU,
        }),
        conn_gattc: Some(raw::ble_gattc_conn_cfg_t {
            write_cmd_tx_queue_size: WRITE_CMD_TX_QUEUE_SIZE,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 0,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("BLE throughput client starting");

    let mut conf = embassy_nrf::config::Config::default();
    // SoftDevice reserves priorities 0, 1 and 4.
    conf.gpiote_interrupt_priority = interrupt::Priority::P2;
    conf.time_interrupt_priority = interrupt::Priority::P2;
    let p = embassy_nrf::init(conf);

    interrupt::SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0.set_priority(interrupt::Priority::P3);

    let sd = Softdevice::enable(&softdevice_config());
    unwrap!(spawner.spawn(softdevice_task(sd)));

    // nRF52840-DK: button 1, LED 1, I²C on P0.26/P0.27.
    let mut twim_config = twim::Config::default();
    twim_config.frequency = twim::Frequency::K400;
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim_config);

    spawner.must_spawn(ble::central::link_task(sd));
    spawner.must_spawn(ble::mode_switch::mode_switch_task());
    spawner.must_spawn(ble::write_pump::write_pump_task());
    spawner.must_spawn(ble::transport::congestion_task());
    spawner.must_spawn(ble::reporter::reporter_task());
    spawner.must_spawn(ui::buttons::trigger_button_task(p.P0_11.degrade()));
    spawner.must_spawn(ui::led::led_task(p.P0_13.degrade()));
    spawner.must_spawn(ui::display_task(i2c));

    info!("Ready, press button 1 to scan for the throughput server");
}

#[exception]
unsafe fn HardFault(ef: &ExceptionFrame) -> ! {
    error!("HardFault at PC {=u32:#010x}", ef.pc());
    cortex_m::peripheral::SCB::sys_reset()
}
