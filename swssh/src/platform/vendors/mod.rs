//! Built-in dialects, one module per vendor.

pub mod cisco_ios;
pub mod h3c;
pub mod huawei;
pub mod nexus;
pub mod ruijie;
