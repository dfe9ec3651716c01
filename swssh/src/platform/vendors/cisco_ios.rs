//! Cisco IOS dialect.
//!
//! `copy running-config startup-config` asks for the destination file
//! name; an empty line accepts the default:
//!
//! ```text
//! Router#copy running-config startup-config
//! Destination filename [startup-config]?
//! Building configuration...
//! [OK]
//! Router#
//! ```
//!
//! The `[OK]` line also matches the prompt heuristic, which is harmless
//! here because it only appears once the write is done.

use std::time::Duration;

use crate::platform::{Dialect, SaveStep};

/// Create the Cisco IOS dialect.
pub fn dialect() -> Dialect {
    Dialect::new("CISCO")
        .with_paging_command("terminal length 0")
        .with_save_step(SaveStep::expect(
            "copy running-config startup-config",
            "]?",
            Duration::from_secs(5),
        ))
        .with_save_step(SaveStep::prompt("", Duration::from_secs(20)))
        .with_transaction("ifconfig", "show running-config")
}
