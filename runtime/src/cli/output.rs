// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Output mode flags shared by every subcommand.
//!
//! The binary records `--json` / `--quiet` in the environment so commands
//! can check them without threading flags through every call.

use serde::Serialize;

pub fn is_json() -> bool {
    flag("SCOUT_JSON")
}

pub fn is_quiet() -> bool {
    flag("SCOUT_QUIET")
}

fn flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to serialize output: {e}"),
    }
}

/// Print a progress line to stderr unless quiet or in JSON mode.
pub fn status(message: impl AsRef<str>) {
    if !is_quiet() && !is_json() {
        eprintln!("  {}", message.as_ref());
    }
}
