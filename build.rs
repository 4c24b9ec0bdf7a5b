//! Build script - places the nRF52840 + S140 linker script where the
//! linker can find it and adds the cortex-m-rt / defmt link arguments
//! for firmware builds. Host builds (unit tests) are left untouched.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    let firmware = env::var_os("CARGO_FEATURE_EMBEDDED").is_some();
    let target_arm = env::var("CARGO_CFG_TARGET_ARCH").map_or(false, |arch| arch == "arm");
    if !(firmware && target_arm) {
        return;
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::copy("memory.x", out_dir.join("memory.x")).expect("memory.x must exist at the crate root");

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
