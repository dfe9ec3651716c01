//! Run one plan against many hosts at once.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::plan::{CommandPlan, HostReport, HostTarget};
use crate::driver::{Device, Session, VendorAdapter, sanitize};
use crate::error::{DriverError, Error};
use crate::platform::{Vendor, detect_vendor};
use crate::transport::{Connector, SshConfig, SshConnector};

/// Default number of hosts worked on at the same time.
pub const DEFAULT_LIMIT: usize = 500;

/// Shared sink for host transcripts.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Runs a [`CommandPlan`] on many hosts concurrently.
///
/// Each host gets its own task and session; at most `limit` hosts are
/// worked on at once. A failure on one host never affects another.
///
/// # Example
///
/// ```rust,no_run
/// use swssh::{CommandPlan, Coordinator, HostTarget, SshConfig};
///
/// # async fn example() {
/// let mut template = SshConfig::new("");
/// template.username = "admin".to_string();
///
/// let targets = vec![HostTarget::new("10.0.0.1"), HostTarget::new("10.0.0.2")];
/// let plan = CommandPlan::new(["show clock"]);
///
/// let reports = Coordinator::new(template)
///     .output(std::io::stdout())
///     .run(targets, &plan)
///     .await;
/// for report in &reports {
///     println!("{}: {}", report.host, report.is_success());
/// }
/// # }
/// ```
pub struct Coordinator<C = SshConnector> {
    connector: C,
    template: SshConfig,
    limit: usize,
    output: Option<SharedWriter>,
}

impl Coordinator<SshConnector> {
    /// A coordinator connecting over SSH with `template` settings.
    pub fn new(template: SshConfig) -> Self {
        Self::with_connector(template, SshConnector)
    }
}

impl<C> Coordinator<C>
where
    C: Connector + Clone + 'static,
{
    /// A coordinator obtaining shells from `connector`.
    pub fn with_connector(template: SshConfig, connector: C) -> Self {
        Self {
            connector,
            template,
            limit: DEFAULT_LIMIT,
            output: None,
        }
    }

    /// Set how many hosts may be worked on at once (at least one).
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Echo every host's transcript to `writer`.
    pub fn output(self, writer: impl Write + Send + 'static) -> Self {
        self.shared_output(Arc::new(Mutex::new(writer)))
    }

    /// Echo transcripts to a writer that is shared with the caller.
    pub fn shared_output(mut self, writer: SharedWriter) -> Self {
        self.output = Some(writer);
        self
    }

    /// Run `plan` on every target and wait for all of them.
    ///
    /// Reports come back in the same order as `targets`.
    pub async fn run(&self, targets: Vec<HostTarget>, plan: &CommandPlan) -> Vec<HostReport> {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let plan = Arc::new(plan.clone());
        info!("running on {} hosts, {} at a time", targets.len(), self.limit);

        let tasks: Vec<(String, JoinHandle<HostReport>)> = targets
            .into_iter()
            .map(|target| {
                let host = target.host.clone();
                let job = HostJob {
                    config: target.config(&self.template),
                    vendor: target.vendor.or(plan.vendor),
                    connector: self.connector.clone(),
                    plan: Arc::clone(&plan),
                    output: self.output.clone(),
                };
                let semaphore = Arc::clone(&semaphore);

                let handle = tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let message = e.to_string();
                            return HostReport::failed(
                                job.config.host,
                                DriverError::TaskFailed { message }.into(),
                            );
                        }
                    };
                    job.run().await
                });
                (host, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(tasks.len());
        for (host, handle) in tasks {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    error!("[{}] host task failed: {}", host, e);
                    let message = e.to_string();
                    HostReport::failed(host, DriverError::TaskFailed { message }.into())
                }
            };
            reports.push(report);
        }

        let failed = reports.iter().filter(|r| !r.is_success()).count();
        info!("finished {} hosts, {} with errors", reports.len(), failed);
        reports
    }
}

/// Everything one host task needs.
struct HostJob<C> {
    config: SshConfig,
    vendor: Option<Vendor>,
    connector: C,
    plan: Arc<CommandPlan>,
    output: Option<SharedWriter>,
}

impl<C: Connector> HostJob<C> {
    async fn run(self) -> HostReport {
        let host = self.config.host.clone();
        let mut report = HostReport::new(&host);
        let mut session = Session::with_connector(self.config, self.connector);

        if let Err(e) = session.connect().await {
            error!("[{}] {}", host, e);
            report.error = Some(e);
            return report;
        }

        let vendor = match self.vendor {
            Some(vendor) => Ok(vendor),
            None => detect_vendor(&mut session).await,
        };
        match vendor {
            Ok(vendor) => {
                report.vendor = Some(vendor);
                let mut device = Device::new(&mut session, vendor);
                run_plan(&mut device, &self.plan, &mut report, self.output.as_ref()).await;
            }
            Err(e) => {
                error!("[{}] failed to determine vendor: {}", host, e);
                report.error = Some(e);
            }
        }

        if let Err(e) = session.close().await {
            debug!("[{}] error while closing: {}", host, e);
        }

        info!("[{}] execution completed", host);
        report
    }
}

async fn run_plan<C: Connector>(
    device: &mut Device<'_, C>,
    plan: &CommandPlan,
    report: &mut HostReport,
    output: Option<&SharedWriter>,
) {
    let host = device.session().host().to_string();
    let commands = plan.commands_for(device.vendor()).to_vec();

    if plan.disable_paging && plan.has_work(device.vendor()) && !device.session_preparation().await {
        warn!("[{}] failed to prepare the session, executing commands directly", host);
    }

    let started = Instant::now();
    loop {
        let (transcript, error) = run_once(device, plan, &commands).await;
        if report.error.is_none() {
            report.error = error;
        }

        if plan.save_config {
            let state = device.save().await;
            if !state.is_success() {
                warn!("[{}] failed to save configuration ({:?})", host, state);
            }
            report.saved = Some(state);
        }

        if let Some(writer) = output {
            let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = writeln!(writer, "{}", transcript) {
                warn!("[{}] failed to write output: {}", host, e);
            }
        }
        report.output = transcript;

        let Some(repeat) = &plan.repeat else { break };
        if repeat.duration.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        if !device.session().is_alive() {
            warn!("[{}] session lost, stop repeating", host);
            break;
        }
        tokio::time::sleep(repeat.interval).await;
    }
}

/// Run the commands and transaction once. Returns the transcript and the
/// first error, after which the remaining commands are skipped.
async fn run_once<C: Connector>(
    device: &mut Device<'_, C>,
    plan: &CommandPlan,
    commands: &[String],
) -> (String, Option<Error>) {
    let host = device.session().host().to_string();
    let mut transcript = String::new();
    let mut failure = None;

    let tidy = |text: &str| {
        if plan.pretty {
            sanitize(text, true, true)
        } else {
            text.to_string()
        }
    };

    for command in commands {
        let result = if plan.strict {
            device
                .session()
                .exec_command_expect_prompt(command, plan.command_timeout)
                .await
        } else {
            device.session().exec_command(command).await
        };

        match result {
            Ok(response) => transcript.push_str(&tidy(&response.result)),
            Err(e) => {
                if let Some(partial) = e.partial_output() {
                    transcript.push_str(&tidy(partial));
                }
                error!("[{}] failed to exec cmd '{}': {}", host, command, e);
                failure = Some(e);
                break;
            }
        }

        if !plan.strict {
            tokio::time::sleep(plan.command_interval).await;
        }
    }

    if failure.is_none() {
        if let Some(name) = &plan.transaction {
            match device.run_transaction(name).await {
                Ok(response) => transcript.push_str(&tidy(&response.result)),
                Err(e) => {
                    error!("[{}] failed to run transaction '{}': {}", host, name, e);
                    failure = Some(e);
                }
            }
        }
    }

    (transcript, failure)
}
