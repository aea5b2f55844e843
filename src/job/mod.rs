//! SparkJob: submission and lifecycle management
//!
//! A job renders its submission command once at construction, runs it
//! through the shell executor, and afterwards tracks the driver
//! through the backend-appropriate channel. Conclusion is monotonic:
//! once the driver state is terminal, no method writes state again.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::backend::{Backend, BackendChannel, ChannelError, DefaultChannel};
use crate::command;
use crate::exec::{self, ExecError};
use crate::options::{DeployMode, SubmissionOptions};
use crate::parse;
use crate::system;

mod state;

pub use state::DriverState;

/// Construction-time configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file {0} does not exist")]
    MainFileNotFound(String),

    #[error("bin/spark-submit was not found in \"{0}\"; set SPARK_HOME or pass spark_home")]
    LauncherNotFound(String),
}

/// Submission failures
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("job was already submitted")]
    AlreadySubmitted,

    #[error("spark-submit failed with code {code}:\n{output}")]
    Launcher { output: String, code: i32 },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Kill failures
#[derive(Debug, Error)]
pub enum KillError {
    #[error("job \"{0}\" has no submission id to kill")]
    NoSubmissionId(String),

    #[error("kill request for job \"{name}\" (id \"{id}\") was rejected with code {code}:\n{body}")]
    Rejected {
        name: String,
        id: String,
        body: String,
        code: i32,
    },

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Knobs for a single submit call
#[derive(Debug, Clone, Default)]
pub struct SubmitSettings {
    /// Poll the driver state in a background thread at this interval.
    /// Only takes effect for standalone REST masters.
    pub poll_interval: Option<Duration>,

    /// Propagate the SPARK_HOME/JAVA_HOME/PYSPARK_* snapshot to the
    /// launcher child.
    pub use_env_vars: bool,

    /// Fail the submit call if the launcher runs longer than this.
    pub timeout: Option<Duration>,
}

/// Mutable submission record, owned by one job
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    /// Combined launcher output captured at submit time
    pub output: String,

    /// Launcher exit code; -1 until the launcher has run
    pub code: i32,

    /// Backend tracking identifier; empty until assigned
    pub submission_id: String,

    /// Last observed driver state; `None` before submission
    pub driver_state: Option<DriverState>,

    /// True once `driver_state` is terminal
    pub concluded: bool,

    /// When the state was last written
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubmitResponse {
    fn new() -> Self {
        Self {
            output: String::new(),
            code: -1,
            submission_id: String::new(),
            driver_state: None,
            concluded: false,
            updated_at: None,
        }
    }

    /// Write a state and recompute the conclusion flag.
    fn set_state(&mut self, state: DriverState) {
        self.driver_state = Some(state);
        self.concluded = state.is_terminal();
        self.updated_at = Some(Utc::now());
    }
}

/// A spark-submit job: rendered command, backend classification, and
/// the lifecycle record.
pub struct SparkJob {
    opts: SubmissionOptions,
    main_file: String,
    spark_bin: String,
    backend: Backend,
    submit_cmd: String,
    env_vars: HashMap<String, String>,
    channel: Arc<dyn BackendChannel>,
    response: Arc<Mutex<SubmitResponse>>,
}

impl SparkJob {
    /// Build a job against the production channel.
    ///
    /// `main_file` must start with `s3`, start with `local:`, or
    /// resolve to an existing local file, and
    /// `<spark_home>/bin/spark-submit` must exist.
    pub fn new(main_file: &str, opts: SubmissionOptions) -> Result<Self, ConfigError> {
        Self::with_channel(main_file, opts, Arc::new(DefaultChannel::new()))
    }

    /// Build a job that dispatches status/kill through `channel`.
    pub fn with_channel(
        main_file: &str,
        opts: SubmissionOptions,
        channel: Arc<dyn BackendChannel>,
    ) -> Result<Self, ConfigError> {
        let is_remote = main_file.starts_with("s3") || main_file.starts_with("local:");
        if !is_remote && !system::expand_user(main_file).is_file() {
            return Err(ConfigError::MainFileNotFound(main_file.to_string()));
        }

        let spark_home = opts.resolved_spark_home();
        let spark_bin = format!("{}/bin/spark-submit", spark_home);
        if !Path::new(&spark_bin).is_file() {
            return Err(ConfigError::LauncherNotFound(spark_home));
        }

        let env_vars = system::env_vars();
        if !env_vars.contains_key("JAVA_HOME") {
            tracing::warn!("JAVA_HOME is not defined in environment variables");
        }

        let backend = Backend::classify(opts.master());
        let submit_cmd = command::render(&spark_bin, &opts, main_file);

        Ok(Self {
            opts,
            main_file: main_file.to_string(),
            spark_bin,
            backend,
            submit_cmd,
            env_vars,
            channel,
            response: Arc::new(Mutex::new(SubmitResponse::new())),
        })
    }

    /// Submit the job.
    ///
    /// State moves to `SUBMITTED` before the launcher runs, so a crash
    /// mid-execution still reads as attempted. A nonzero launcher exit
    /// records `ERROR` and raises [`SubmitError::Launcher`]; an
    /// elapsed timeout raises [`ExecError::Timeout`] without touching
    /// state further.
    pub fn submit(&self, settings: &SubmitSettings) -> Result<(), SubmitError> {
        {
            let mut response = lock(&self.response);
            if response.driver_state.is_some() {
                return Err(SubmitError::AlreadySubmitted);
            }
            response.set_state(DriverState::Submitted);
        }

        let env = if settings.use_env_vars {
            Some(self.env_vars.clone())
        } else {
            None
        };
        let outcome = exec::execute(&self.submit_cmd, settings.timeout, env.as_ref())?;

        let mut response = lock(&self.response);
        response.output = outcome.output;
        response.code = outcome.code;

        if outcome.code != 0 {
            response.set_state(DriverState::Error);
            return Err(SubmitError::Launcher {
                output: response.output.clone(),
                code: outcome.code,
            });
        }

        if self.opts.deploy_mode() == DeployMode::Client {
            // Client deploy: the driver ran in the launcher process,
            // so a zero exit is the final word.
            response.set_state(DriverState::Finished);
            return Ok(());
        }

        match parse::submission_id(&response.output, self.backend) {
            None => {
                tracing::warn!(
                    "submissionId not found in output {:?} for Spark job {:?}",
                    response.output,
                    self.opts.name()
                );
                response.set_state(DriverState::Unknown);
            }
            Some(id) => {
                response.submission_id = id;
                drop(response);

                if let Some(interval) = settings.poll_interval {
                    if interval > Duration::ZERO && self.backend == Backend::Rest {
                        self.spawn_poller(interval);
                    }
                }
            }
        }
        Ok(())
    }

    fn spawn_poller(&self, interval: Duration) {
        let probe = self.probe();
        let spawned = thread::Builder::new()
            .name(self.opts.name().to_string())
            .spawn(move || loop {
                thread::sleep(interval);
                if probe.refresh() {
                    break;
                }
            });
        if let Err(err) = spawned {
            tracing::warn!(
                "could not start poll thread for Spark job {:?}: {}",
                self.opts.name(),
                err
            );
        }
    }

    fn probe(&self) -> StatusProbe {
        StatusProbe {
            backend: self.backend,
            master: self.opts.master().to_string(),
            spark_bin: self.spark_bin.clone(),
            name: self.opts.name().to_string(),
            channel: Arc::clone(&self.channel),
            response: Arc::clone(&self.response),
        }
    }

    /// Current driver state, refreshed through the backend first.
    ///
    /// The refresh costs one status call when a tracking id exists and
    /// the job has not concluded; use [`SparkJob::last_state`] for a
    /// non-blocking read.
    pub fn state(&self) -> Option<DriverState> {
        self.probe().refresh();
        lock(&self.response).driver_state
    }

    /// Last observed driver state, without a backend round-trip.
    pub fn last_state(&self) -> Option<DriverState> {
        lock(&self.response).driver_state
    }

    /// Kill the job through the backend's kill channel.
    ///
    /// A concluded job logs a warning and performs no backend call. A
    /// response code outside {0, 200} raises [`KillError::Rejected`]
    /// and leaves state unchanged.
    pub fn kill(&self) -> Result<(), KillError> {
        let id = {
            let response = lock(&self.response);
            if response.concluded {
                tracing::warn!(
                    "Spark job {:?} has concluded with state {:?} and cannot be killed",
                    self.opts.name(),
                    response.driver_state
                );
                return Ok(());
            }
            if response.submission_id.is_empty() {
                return Err(KillError::NoSubmissionId(self.opts.name().to_string()));
            }
            response.submission_id.clone()
        };

        let request = self
            .backend
            .kill_request(self.opts.master(), &self.spark_bin, &id);
        let reply = self.channel.dispatch(&request)?;

        if reply.code != 0 && reply.code != 200 {
            return Err(KillError::Rejected {
                name: self.opts.name().to_string(),
                id,
                body: reply.body,
                code: reply.code,
            });
        }

        let mut response = lock(&self.response);
        if !response.concluded {
            response.set_state(DriverState::Killed);
        }
        Ok(())
    }

    /// The rendered spark-submit command.
    pub fn submit_cmd(&self) -> &str {
        &self.submit_cmd
    }

    /// The command reformatted one option per line, for display.
    pub fn submit_cmd_multiline(&self) -> String {
        command::render_multiline(&self.submit_cmd, &self.main_file)
    }

    /// Combined launcher output captured at submit time.
    pub fn output(&self) -> String {
        lock(&self.response).output.clone()
    }

    /// Launcher exit code; -1 until the launcher has run.
    pub fn code(&self) -> i32 {
        lock(&self.response).code
    }

    /// Backend tracking identifier; empty until assigned.
    pub fn submission_id(&self) -> String {
        lock(&self.response).submission_id.clone()
    }

    /// True once the driver state is terminal.
    pub fn concluded(&self) -> bool {
        lock(&self.response).concluded
    }

    /// The backend classified from the master string.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Snapshot of the full submission record.
    pub fn response(&self) -> SubmitResponse {
        lock(&self.response).clone()
    }
}

/// Everything one status refresh needs, foreground or background.
struct StatusProbe {
    backend: Backend,
    master: String,
    spark_bin: String,
    name: String,
    channel: Arc<dyn BackendChannel>,
    response: Arc<Mutex<SubmitResponse>>,
}

impl StatusProbe {
    /// Refresh the driver state once. Returns the conclusion flag.
    ///
    /// No-op before a tracking id exists and after conclusion. A
    /// missing driver-state token writes `Unknown`; a channel failure
    /// leaves state untouched so the next poll can retry.
    fn refresh(&self) -> bool {
        let id = {
            let response = lock(&self.response);
            if response.concluded || response.submission_id.is_empty() {
                return response.concluded;
            }
            response.submission_id.clone()
        };

        let request = self
            .backend
            .status_request(&self.master, &self.spark_bin, &id);
        let state = match self.channel.dispatch(&request) {
            Ok(reply) => match parse::driver_state(&reply.body) {
                Some(token) => DriverState::parse(&token),
                None => {
                    tracing::warn!(
                        "driverState not found in output {:?} for Spark job {:?}",
                        reply.body,
                        self.name
                    );
                    DriverState::Unknown
                }
            },
            Err(err) => {
                tracing::warn!("status check failed for Spark job {:?}: {}", self.name, err);
                let response = lock(&self.response);
                return response.concluded;
            }
        };

        let mut response = lock(&self.response);
        // A racing kill may have concluded the job in the meantime.
        if !response.concluded {
            response.set_state(state);
        }
        response.concluded
    }
}

fn lock(response: &Mutex<SubmitResponse>) -> MutexGuard<'_, SubmitResponse> {
    response.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
