//! Built-in dialect tables, created once and shared read-only.

use std::sync::LazyLock;

use super::Vendor;
use super::definition::Dialect;
use super::vendors;

static HUAWEI: LazyLock<Dialect> = LazyLock::new(vendors::huawei::dialect);
static H3C: LazyLock<Dialect> = LazyLock::new(vendors::h3c::dialect);
static CISCO_IOS: LazyLock<Dialect> = LazyLock::new(vendors::cisco_ios::dialect);
static NEXUS: LazyLock<Dialect> = LazyLock::new(vendors::nexus::dialect);
static RUIJIE: LazyLock<Dialect> = LazyLock::new(vendors::ruijie::dialect);

/// Get the dialect table for a vendor.
pub fn dialect(vendor: Vendor) -> &'static Dialect {
    match vendor {
        Vendor::Huawei => &*HUAWEI,
        Vendor::H3c => &*H3C,
        Vendor::CiscoIos => &*CISCO_IOS,
        Vendor::Nexus => &*NEXUS,
        Vendor::Ruijie => &*RUIJIE,
    }
}
