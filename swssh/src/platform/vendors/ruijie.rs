//! Ruijie RGOS dialect.
//!
//! RGOS follows the Cisco command set but saves without a confirmation
//! question.

use std::time::Duration;

use crate::platform::{Dialect, SaveStep};

/// Create the Ruijie dialect.
pub fn dialect() -> Dialect {
    Dialect::new("RUIJIE")
        .with_paging_command("terminal length 0")
        .with_save_step(SaveStep::prompt(
            "copy running-config startup-config",
            Duration::from_secs(20),
        ))
        .with_transaction("ifconfig", "show running-config")
}
