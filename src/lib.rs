//! spark-launcher - client-side manager for spark-submit jobs
//!
//! This crate renders a `spark-submit` command from a typed option
//! set, launches it, extracts the backend-issued tracking id from the
//! launcher output, and then monitors or kills the job through the
//! master-appropriate channel (standalone REST API, YARN CLI, or
//! Kubernetes CLI).

pub mod backend;
pub mod command;
pub mod exec;
pub mod job;
pub mod mock;
pub mod options;
pub mod parse;
pub mod system;

pub use backend::{
    Backend, BackendChannel, ChannelError, ChannelRequest, ChannelResponse, DefaultChannel,
    HttpMethod,
};
pub use exec::{ExecError, ExecOutcome};
pub use job::{
    ConfigError, DriverState, KillError, SparkJob, SubmitError, SubmitResponse, SubmitSettings,
};
pub use options::{DeployMode, OptionValue, OptionsError, SubmissionOptions};
