//! Vendor dialects and vendor detection.
//!
//! Each supported vendor maps to a read-only [`Dialect`] table describing
//! how to disable paging, how to save the running configuration and which
//! named transactions exist. [`detect`] figures out the vendor of a live
//! session when it is not known up front.

mod definition;
pub mod detect;
mod registry;
pub mod vendors;

pub use definition::{Completion, Dialect, SaveStep};
pub use detect::detect_vendor;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::PlatformError;

/// A supported switch vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Vendor {
    /// Huawei VRP.
    Huawei,
    /// H3C Comware.
    H3c,
    /// Cisco IOS / IOS-XE.
    CiscoIos,
    /// Cisco Nexus NX-OS.
    Nexus,
    /// Ruijie RGOS.
    Ruijie,
}

impl Vendor {
    /// Every supported vendor.
    pub const ALL: [Vendor; 5] = [
        Vendor::Huawei,
        Vendor::H3c,
        Vendor::CiscoIos,
        Vendor::Nexus,
        Vendor::Ruijie,
    ];

    /// Upper-case name used in reports and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Huawei => "HUAWEI",
            Vendor::H3c => "H3C",
            Vendor::CiscoIos => "CISCO",
            Vendor::Nexus => "NEXUS",
            Vendor::Ruijie => "RUIJIE",
        }
    }

    /// The dialect table for this vendor.
    pub fn dialect(self) -> &'static Dialect {
        registry::dialect(self)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HUAWEI" => Ok(Vendor::Huawei),
            "H3C" => Ok(Vendor::H3c),
            "CISCO" | "CISCO_IOS" | "IOS" => Ok(Vendor::CiscoIos),
            "NEXUS" | "NXOS" => Ok(Vendor::Nexus),
            "RUIJIE" => Ok(Vendor::Ruijie),
            _ => Err(PlatformError::UnknownVendor {
                name: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Vendor {
    type Error = PlatformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
