//! Test-only library interface for ble-tput-client.
//!
//! This module re-exports the pure logic modules that can be tested
//! on the host (no embedded hardware required): the throughput core,
//! configuration constants, the error taxonomy, and advertisement
//! parsing.
//!
//! Usage: `cargo test --lib` / `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].
//! This lib.rs provides a separate entry point for host-based testing.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod tput;

// Internal module paths for the actual implementations
#[path = "ble/adv_parser.rs"]
mod ble_adv_parser_impl;

pub mod ble {
    pub mod adv_parser {
        pub use crate::ble_adv_parser_impl::{
            ad_structures, complete_local_name, has_complete_name, local_name,
        };
    }
}

pub use error::{BleError, Error};
pub use tput::ThroughputState;
