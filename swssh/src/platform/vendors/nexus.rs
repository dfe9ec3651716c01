//! Cisco Nexus (NX-OS) dialect.

use std::time::Duration;

use crate::platform::{Dialect, SaveStep};

/// Create the Nexus dialect.
pub fn dialect() -> Dialect {
    Dialect::new("NEXUS")
        .with_paging_command("terminal length 0")
        .with_save_step(SaveStep::prompt(
            "copy running-config startup-config",
            Duration::from_secs(20),
        ))
        .with_transaction("ifconfig", "show running-config interface")
}
