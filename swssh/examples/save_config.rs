//! Single device example: detect the vendor and save the configuration
//!
//! # Usage
//!
//! ```bash
//! cargo run --example save_config -- <host[:port]> <username> <password>
//! ```

use std::env;
use std::time::Duration;

use swssh::{Device, HostTarget, SaveState, SessionBuilder, VendorAdapter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [target, user, password] = args.as_slice() else {
        eprintln!("usage: save_config <host[:port]> <username> <password>");
        std::process::exit(1);
    };
    let target: HostTarget = target.parse()?;

    let mut session = SessionBuilder::new(&target.host)
        .port(target.port.unwrap_or(22))
        .username(user)
        .password(password)
        .timeout(Duration::from_secs(10))
        .build()?;

    println!("Connecting to {}...", target.host);
    session.connect().await?;
    if let Some(banner) = session.banner() {
        println!("Banner: {}", banner.trim());
    }

    let vendor = swssh::detect_vendor(&mut session).await?;
    println!("Vendor: {}", vendor);

    let mut device = Device::new(&mut session, vendor);
    if !device.session_preparation().await {
        eprintln!("Warning: could not disable paging");
    }

    match device.save().await {
        SaveState::Confirmed | SaveState::PromptReached => println!("Configuration saved"),
        state => eprintln!("Save did not finish: {:?}", state),
    }

    session.close().await?;
    Ok(())
}
