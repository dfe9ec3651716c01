//! Vendor detection for a freshly connected session.
//!
//! Three sources are tried in order, each only if the previous one found
//! nothing:
//!
//! 1. the welcome text printed when the shell opened,
//! 2. the SSH banner sent during authentication,
//! 3. `show version` / `display version` probes on the device itself.
//!
//! Keyword tables are matched in order, so more specific keywords come
//! first. The welcome keywords are weak hints (`info` is what Huawei's
//! login notices start with, `user` what Cisco's last-login line says).

use std::time::Duration;

use log::{debug, info};

use super::Vendor;
use crate::driver::Session;
use crate::error::{PlatformError, Result};
use crate::transport::Connector;

/// How long to wait for late welcome text before reading it again.
pub const SETTLE: Duration = Duration::from_secs(1);

/// Welcome text keywords (matched against lower-cased text).
pub const WELCOME_KEYWORDS: &[(&str, Vendor)] = &[
    ("h3c", Vendor::H3c),
    ("nexus", Vendor::Nexus),
    ("ruijie", Vendor::Ruijie),
    ("info", Vendor::Huawei),
    ("user", Vendor::CiscoIos),
];

/// SSH banner keywords (matched against lower-cased text).
pub const BANNER_KEYWORDS: &[(&str, Vendor)] = &[
    ("h3c", Vendor::H3c),
    ("huawei", Vendor::Huawei),
    ("nexus", Vendor::Nexus),
    ("ruijie", Vendor::Ruijie),
    ("cisco", Vendor::CiscoIos),
];

/// A command to run and the keywords to look for in its output.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// Command sent to the device.
    pub command: &'static str,
    /// Match against lower-cased output instead of the raw text.
    pub ignore_case: bool,
    /// Keywords in order.
    pub keywords: &'static [(&'static str, Vendor)],
}

/// Version probes, in the order they are sent.
pub const PROBES: &[Probe] = &[
    Probe {
        command: "show version | in Ruij",
        ignore_case: false,
        keywords: &[("Ruijie", Vendor::Ruijie)],
    },
    Probe {
        command: "show version | in Software",
        ignore_case: false,
        keywords: &[("Nexus", Vendor::Nexus), ("Cisco", Vendor::CiscoIos)],
    },
    Probe {
        command: "display version | in Copyright",
        ignore_case: true,
        keywords: &[("h3c", Vendor::H3c), ("huawei", Vendor::Huawei)],
    },
];

fn first_match(text: &str, keywords: &[(&str, Vendor)]) -> Option<Vendor> {
    keywords
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, vendor)| *vendor)
}

/// Guess the vendor from welcome text.
pub fn match_welcome(welcome: &str) -> Option<Vendor> {
    first_match(&welcome.to_lowercase(), WELCOME_KEYWORDS)
}

/// Guess the vendor from an SSH banner.
pub fn match_banner(banner: &str) -> Option<Vendor> {
    first_match(&banner.to_lowercase(), BANNER_KEYWORDS)
}

impl Probe {
    /// Look for this probe's keywords in its command output.
    pub fn matches(&self, output: &str) -> Option<Vendor> {
        if self.ignore_case {
            first_match(&output.to_lowercase(), self.keywords)
        } else {
            first_match(output, self.keywords)
        }
    }
}

/// Work out which vendor a connected session is talking to.
///
/// Returns `VendorUndetermined` if no source gave an answer. Errors from
/// the probe commands are returned as-is.
pub async fn detect_vendor<C: Connector>(session: &mut Session<C>) -> Result<Vendor> {
    let host = session.host().to_string();

    let mut welcome = session.welcome().to_string();
    if welcome.is_empty() {
        tokio::time::sleep(SETTLE).await;
        welcome = session.read_idle().await?;
    }

    if let Some(vendor) = match_welcome(&welcome) {
        info!("[{}] vendor {} detected from welcome text", host, vendor);
        return Ok(vendor);
    }

    if let Some(vendor) = session.banner().and_then(match_banner) {
        info!("[{}] vendor {} detected from SSH banner", host, vendor);
        return Ok(vendor);
    }

    for probe in PROBES {
        let response = session.exec_command(probe.command).await?;
        if let Some(vendor) = probe.matches(&response.result) {
            info!("[{}] vendor {} detected by {:?}", host, vendor, probe.command);
            return Ok(vendor);
        }
        debug!("[{}] no vendor keyword in output of {:?}", host, probe.command);
    }

    Err(PlatformError::VendorUndetermined { host }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{FakeDevice, test_config};

    async fn detect(device: &FakeDevice) -> Result<Vendor> {
        let mut session = Session::with_connector(test_config("sw1"), device.clone());
        session.connect().await.unwrap();
        detect_vendor(&mut session).await
    }

    #[test]
    fn test_welcome_keywords_in_order() {
        assert_eq!(match_welcome("Info: The max number of VTY users is 10"), Some(Vendor::Huawei));
        assert_eq!(match_welcome("Cisco Nexus Operating System (NX-OS) Software"), Some(Vendor::Nexus));
        assert_eq!(match_welcome("User Access Verification"), Some(Vendor::CiscoIos));
        // "h3c" wins over the "info" of "information".
        assert_eq!(match_welcome("H3C Comware information"), Some(Vendor::H3c));
        assert_eq!(match_welcome("sw1#"), None);
    }

    #[test]
    fn test_banner_keywords() {
        assert_eq!(match_banner("Welcome to HUAWEI device"), Some(Vendor::Huawei));
        assert_eq!(match_banner("Ruijie Networks"), Some(Vendor::Ruijie));
        assert_eq!(match_banner("authorized access only"), None);
    }

    #[test]
    fn test_probe_case_handling() {
        assert_eq!(PROBES[1].matches("Cisco IOS Software, C2960"), Some(Vendor::CiscoIos));
        assert_eq!(PROBES[1].matches("Cisco Nexus Operating System"), Some(Vendor::Nexus));
        assert_eq!(PROBES[0].matches("ruijie"), None);
        assert_eq!(
            PROBES[2].matches("Copyright (c) 2004-2020 New H3C Technologies Co., Ltd."),
            Some(Vendor::H3c)
        );
    }

    #[tokio::test]
    async fn test_welcome_beats_probes() {
        let device = FakeDevice::new("<HW-01>")
            .welcome("Info: The max number of VTY users is 5.\r\n<HW-01>")
            .reply("show version | in Ruij", "Ruijie\r\n<HW-01>");

        assert_eq!(detect(&device).await.unwrap(), Vendor::Huawei);
        assert!(device.received().is_empty());
    }

    #[tokio::test]
    async fn test_banner_used_when_welcome_is_silent() {
        let device = FakeDevice::new("sw1#").banner("Cisco Systems, Inc. authorized use only");

        assert_eq!(detect(&device).await.unwrap(), Vendor::CiscoIos);
        assert!(device.received().is_empty());
    }

    #[tokio::test]
    async fn test_probes_in_order() {
        let device = FakeDevice::new("<sw1>")
            .reply("show version | in Ruij", "show version | in Ruij\r\n  ^\r\n% Unrecognized command\r\n<sw1>")
            .reply("show version | in Software", "show version | in Software\r\n% Unrecognized command\r\n<sw1>")
            .reply(
                "display version | in Copyright",
                "display version | in Copyright\r\nCopyright (c) 2000-2021 Huawei Technologies Co., Ltd.\r\n<sw1>",
            );

        assert_eq!(detect(&device).await.unwrap(), Vendor::Huawei);
        assert_eq!(device.received().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_welcome_is_read_again() {
        let device = FakeDevice::new("sw1#").welcome("");
        let mut session = Session::with_connector(test_config("sw1"), device.clone());
        session.connect().await.unwrap();
        assert_eq!(session.welcome(), "");

        // Nothing anywhere: every probe runs, then detection gives up.
        let err = detect_vendor(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::VendorUndetermined { ref host }) if host == "sw1"
        ));
        assert_eq!(device.received().len(), PROBES.len());
    }
}
