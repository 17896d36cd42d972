// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! This build script generates the `memory.x` linker script into a
//! directory where the linker can always find it at build time. The
//! application image sits above the S132 SoftDevice in flash and leaves
//! the last page free for the persisted configuration record; RAM starts
//! after the region the SoftDevice reserves for itself.

use consts::{BASE_APP_ADDR, CONFIG_FLASH_PAGE_SIZE, FLASH_SIZE, RAM_SIZE, SOFTDEVICE_RAM_RESERVED};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());

    let app_flash_len = FLASH_SIZE - BASE_APP_ADDR - CONFIG_FLASH_PAGE_SIZE;

    let memory_x_content = format!(
        r##"
        MEMORY
        {{
            /* NOTE 1 K = 1 KiBi = 1024 bytes */
            FLASH (rx) : ORIGIN = 0x00000000 + {:#X}, LENGTH = {:#X}
            RAM : ORIGIN = 0x20000000 + {:#X}, LENGTH = {:#X}
        }}
        "##,
        BASE_APP_ADDR,
        app_flash_len,
        SOFTDEVICE_RAM_RESERVED,
        RAM_SIZE - SOFTDEVICE_RAM_RESERVED
    );
    File::create(out.join("./memory.x"))
        .unwrap()
        .write_all(memory_x_content.as_bytes())
        .unwrap();

    println!("cargo:rustc-link-search={}", out.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
