//! H3C Comware dialect.
//!
//! Prompts look like `<H3C>` and `[H3C]`. `save force` writes the
//! configuration without asking for a file name or confirmation.

use std::time::Duration;

use crate::platform::{Dialect, SaveStep};

/// Create the H3C dialect.
pub fn dialect() -> Dialect {
    Dialect::new("H3C")
        .with_paging_command("screen-length disable")
        .with_save_step(SaveStep::prompt("save force", Duration::from_secs(20)))
        .with_transaction("ifconfig", "display current-configuration interface")
}
