//! Fan-out example: run the same commands on many switches at once
//!
//! Each host's output is printed when it finishes; a summary follows.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example fanout -- --hosts "10.0.0.1;10.0.0.2:2222" --user admin \
//!     --password secret --cmd "show clock;show version"
//! ```
//!
//! Read targets from a file (one `host` or `host:port` per line) and let
//! the vendor be detected per host:
//! ```bash
//! cargo run --example fanout -- -f switches.txt --user admin --key ~/.ssh/id_ed25519 \
//!     --tran ifconfig --pretty
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use swssh::{
    AuthMethod, CommandPlan, Coordinator, HostTarget, RepeatPolicy, SshConfig, Vendor,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut targets = Vec::new();
    if let Some(path) = &args.host_file {
        for line in fs::read_to_string(path)?.lines() {
            let line = line.trim();
            if !line.is_empty() && !line.starts_with('#') {
                targets.push(line.parse::<HostTarget>()?);
            }
        }
    }
    for host in args.hosts.split(';').filter(|h| !h.trim().is_empty()) {
        targets.push(host.parse::<HostTarget>()?);
    }
    if targets.is_empty() {
        eprintln!("Error: no targets, use --hosts or -f");
        std::process::exit(1);
    }

    // Template shared by every host
    let mut template = SshConfig::new("");
    template.username = args.user.clone();
    template.timeout = Duration::from_secs(args.timeout);
    template.idle_wait = Duration::from_millis(args.read_wait);
    template.auth = match (&args.key, &args.password) {
        (Some(path), _) => AuthMethod::PrivateKey {
            path: path.clone(),
            passphrase: None,
        },
        (None, Some(password)) => AuthMethod::Password(password.clone().into()),
        (None, None) => {
            eprintln!("Error: Must provide either --password or --key");
            std::process::exit(1);
        }
    };

    let mut plan = CommandPlan::new(args.cmd.split(';').map(str::trim).filter(|c| !c.is_empty()))
        .command_interval(Duration::from_secs(args.cmd_interval))
        .save_config(args.save)
        .pretty(args.pretty);
    if args.strict {
        plan = plan.strict(Duration::from_secs(args.cmd_timeout));
    }
    if let Some(vendor) = &args.vendor {
        plan = plan.with_vendor(vendor.parse::<Vendor>()?);
    }
    if let Some(name) = &args.transaction {
        plan = plan.with_transaction(name);
    }
    if let Some(interval) = args.repeat_interval {
        plan = plan.repeat(RepeatPolicy {
            interval: Duration::from_secs(interval),
            duration: args.repeat_duration.map(Duration::from_secs),
        });
    }

    println!("Running on {} hosts...", targets.len());
    let reports = Coordinator::new(template)
        .limit(args.limit)
        .output(std::io::stdout())
        .run(targets, &plan)
        .await;

    println!("{}", "-".repeat(50));
    for report in &reports {
        let vendor = report.vendor.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
        match &report.error {
            None => println!("{:<20} {:<8} ok", report.host, vendor),
            Some(e) => println!("{:<20} {:<8} FAILED: {}", report.host, vendor, e),
        }
        if let Some(state) = report.saved {
            println!("{:<20} save: {:?}", "", state);
        }
    }

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    println!("{}", "-".repeat(50));
    println!("{} hosts, {} failed", reports.len(), failed);

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    hosts: String,
    host_file: Option<PathBuf>,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    cmd: String,
    vendor: Option<String>,
    transaction: Option<String>,
    save: bool,
    strict: bool,
    pretty: bool,
    timeout: u64,
    read_wait: u64,
    cmd_timeout: u64,
    cmd_interval: u64,
    limit: usize,
    repeat_interval: Option<u64>,
    repeat_duration: Option<u64>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            hosts: String::new(),
            host_file: None,
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: None,
            key: None,
            cmd: String::new(),
            vendor: None,
            transaction: None,
            save: false,
            strict: false,
            pretty: false,
            timeout: 10,
            read_wait: 500,
            cmd_timeout: 10,
            cmd_interval: 2,
            limit: 500,
            repeat_interval: None,
            repeat_duration: None,
        };

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = args.get(i + 1).cloned();
            let mut takes_value = true;

            match (flag, value) {
                ("--hosts" | "-h", Some(v)) => parsed.hosts = v,
                ("-f", Some(v)) => parsed.host_file = Some(PathBuf::from(v)),
                ("--user" | "-u", Some(v)) => parsed.user = v,
                ("--password" | "-P", Some(v)) => parsed.password = Some(v),
                ("--key" | "-k", Some(v)) => parsed.key = Some(PathBuf::from(v)),
                ("--cmd" | "-c", Some(v)) => parsed.cmd = v,
                ("--vendor" | "-V", Some(v)) => parsed.vendor = Some(v),
                ("--tran", Some(v)) => parsed.transaction = Some(v),
                ("--timeout", Some(v)) => parsed.timeout = v.parse().unwrap_or(10),
                ("--read-wait", Some(v)) => parsed.read_wait = v.parse().unwrap_or(500),
                ("--cmd-timeout", Some(v)) => parsed.cmd_timeout = v.parse().unwrap_or(10),
                ("--cmd-interval", Some(v)) => parsed.cmd_interval = v.parse().unwrap_or(2),
                ("--limit", Some(v)) => parsed.limit = v.parse().unwrap_or(500),
                ("--repeat", Some(v)) => parsed.repeat_interval = v.parse().ok(),
                ("--repeat-duration", Some(v)) => parsed.repeat_duration = v.parse().ok(),
                (flag, _) => {
                    takes_value = false;
                    match flag {
                        "--save" => parsed.save = true,
                        "--strict" => parsed.strict = true,
                        "--pretty" => parsed.pretty = true,
                        "--help" => {
                            Self::print_help();
                            std::process::exit(0);
                        }
                        _ => eprintln!("Unknown argument: {}", flag),
                    }
                }
            }

            i += if takes_value { 2 } else { 1 };
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"swssh fanout example

USAGE:
    cargo run --example fanout -- [OPTIONS]

OPTIONS:
    -h, --hosts <LIST>         Targets separated by ';' (host or host:port)
    -f <FILE>                  Read targets from a file, one per line
    -u, --user <USER>          Username [default: $USER]
    -P, --password <PASS>      Password for authentication
    -k, --key <PATH>           Path to SSH private key (password is ignored)
    -c, --cmd <LIST>           Commands separated by ';'
    -V, --vendor <VENDOR>      HUAWEI, H3C, CISCO, NEXUS or RUIJIE [default: detect]
    --tran <NAME>              Run a named transaction (e.g. ifconfig)
    --save                     Save the running configuration afterwards
    --strict                   Wait for the prompt after every command
    --pretty                   Strip command echo and prompt from output
    --timeout <SECS>           Connection timeout [default: 10]
    --read-wait <MS>           Idle-read wait [default: 500]
    --cmd-timeout <SECS>       Prompt timeout in strict mode [default: 10]
    --cmd-interval <SECS>      Pause between commands [default: 2]
    --limit <N>                Hosts worked on at once [default: 500]
    --repeat <SECS>            Re-run every SECS seconds
    --repeat-duration <SECS>   Stop repeating after SECS seconds [default: never]
    --help                     Print this help message

EXAMPLES:
    # Two Cisco switches, strict mode
    cargo run --example fanout -- --hosts "10.0.0.1;10.0.0.2" -u admin -P secret \
        -V cisco --strict --cmd "show clock;show ip int brief"

    # Interface configuration of every switch in a file
    cargo run --example fanout -- -f switches.txt -u admin -k ~/.ssh/id_rsa --tran ifconfig
"#
        );
    }
}
