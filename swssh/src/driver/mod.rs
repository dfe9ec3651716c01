//! Sessions and vendor-aware device operations.
//!
//! [`Session`] drives one interactive shell. [`Device`] layers a vendor's
//! dialect over a session through the [`VendorAdapter`] trait.

mod builder;
mod device;
pub(crate) mod response;
mod session;

pub use builder::SessionBuilder;
pub use device::{Device, SaveState, VendorAdapter};
pub use response::{Response, sanitize};
pub use session::Session;
