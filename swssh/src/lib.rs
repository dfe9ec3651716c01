//! # swssh
//!
//! Async SSH command runner for fleets of network switches.
//!
//! swssh opens an interactive shell on each device, figures out which
//! vendor it is talking to, and runs commands the way an operator at the
//! console would: waiting for output to settle, for a prompt, or for a
//! confirmation question.
//!
//! ## Features
//!
//! - Async SSH connections via russh, including older CBC/CTR ciphers
//! - Huawei, H3C, Cisco IOS, Cisco Nexus and Ruijie dialects
//! - Vendor detection from the welcome text, SSH banner or version probes
//! - Idle, deadline, substring and prompt based command completion
//! - Bounded concurrent fan-out over hundreds of hosts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use swssh::{Device, SessionBuilder, Vendor, VendorAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), swssh::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .build()?;
//!
//!     session.connect().await?;
//!
//!     let vendor = swssh::detect_vendor(&mut session).await?;
//!     let mut device = Device::new(&mut session, vendor);
//!     device.session_preparation().await;
//!
//!     let response = device
//!         .session()
//!         .exec_command_expect_prompt("display version", Duration::from_secs(10))
//!         .await?;
//!     println!("{}", response.sanitized());
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod platform;
pub mod runner;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use driver::{Device, Response, SaveState, Session, SessionBuilder, VendorAdapter};
pub use error::{Error, Result};
pub use platform::{Dialect, Vendor, detect_vendor};
pub use runner::{CommandPlan, Coordinator, HostReport, HostTarget, RepeatPolicy};
pub use transport::{AuthMethod, Connector, HostKeyVerification, SshConfig, SshConnector};
