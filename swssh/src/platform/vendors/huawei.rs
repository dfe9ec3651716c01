//! Huawei VRP dialect.
//!
//! Prompts look like `<HUAWEI>` in user view and `[HUAWEI]` in system view.
//! Saving asks for confirmation:
//!
//! ```text
//! <HUAWEI>save
//! The current configuration will be written to the device.
//! Are you sure to continue? [Y/N]:y
//! Now saving the current configuration to the slot 0.
//! Save the configuration successfully.
//! <HUAWEI>
//! ```

use std::time::Duration;

use crate::platform::{Dialect, SaveStep};

/// Create the Huawei dialect.
pub fn dialect() -> Dialect {
    Dialect::new("HUAWEI")
        .with_paging_command("screen-length 0 temporary")
        .with_save_step(SaveStep::expect("save", "[Y/N]:", Duration::from_secs(5)))
        .with_save_step(SaveStep::prompt("y", Duration::from_secs(5)))
        .with_transaction("ifconfig", "display current-configuration interface")
}
