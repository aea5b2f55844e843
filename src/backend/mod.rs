//! Backend classification and status/kill channels
//!
//! The master string implies exactly one backend, classified once at
//! job construction. Status and kill requests are built here as pure
//! values and dispatched through the [`BackendChannel`] seam, so tests
//! can script responses without a cluster.

use thiserror::Error;

use crate::exec::{self, ExecError};

/// Cluster backend implied by the master string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Standalone master; status/kill go through the REST API
    Rest,
    /// YARN resource manager; status/kill go through the `yarn` CLI
    Yarn,
    /// Kubernetes; status/kill go through `spark-submit` itself
    Kubernetes,
}

impl Backend {
    /// Classify a master string.
    pub fn classify(master: &str) -> Backend {
        if master.contains("yarn") {
            Backend::Yarn
        } else if master.contains("k8s") {
            Backend::Kubernetes
        } else {
            Backend::Rest
        }
    }

    /// Build the status request for a tracking id.
    pub fn status_request(&self, master: &str, spark_bin: &str, id: &str) -> ChannelRequest {
        match self {
            Backend::Yarn => ChannelRequest::Cli {
                command: format!("yarn application -status {}", id),
            },
            Backend::Kubernetes => ChannelRequest::Cli {
                command: format!("{} --master {} --status {}", spark_bin, master, id),
            },
            Backend::Rest => ChannelRequest::Http {
                method: HttpMethod::Get,
                url: api_url(master, "status", id),
            },
        }
    }

    /// Build the kill request for a tracking id.
    ///
    /// The REST kill endpoint is invoked with POST; status stays GET.
    pub fn kill_request(&self, master: &str, spark_bin: &str, id: &str) -> ChannelRequest {
        match self {
            Backend::Yarn => ChannelRequest::Cli {
                command: format!("yarn application -kill {}", id),
            },
            Backend::Kubernetes => ChannelRequest::Cli {
                command: format!("{} --master {} --kill {}", spark_bin, master, id),
            },
            Backend::Rest => ChannelRequest::Http {
                method: HttpMethod::Post,
                url: api_url(master, "kill", id),
            },
        }
    }
}

/// REST endpoint URL, with the `spark://` scheme rewritten to plain
/// HTTP.
pub fn api_url(master: &str, endpoint: &str, id: &str) -> String {
    format!(
        "{}/v1/submissions/{}/{}",
        master.replace("spark://", "http://"),
        endpoint,
        id
    )
}

/// HTTP verb for REST requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A single status or kill request, ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRequest {
    /// CLI command run through the shell executor
    Cli { command: String },
    /// HTTP request against the standalone REST API
    Http { method: HttpMethod, url: String },
}

/// Raw response from a status/kill dispatch
#[derive(Debug, Clone)]
pub struct ChannelResponse {
    /// Response body, or the CLI's combined output
    pub body: String,
    /// HTTP status code, or the CLI exit code
    pub code: i32,
}

/// Channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("status/kill command failed: {0}")]
    Exec(#[from] ExecError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Dispatch seam for status/kill requests
pub trait BackendChannel: Send + Sync {
    /// Execute a request and return the raw response.
    fn dispatch(&self, request: &ChannelRequest) -> Result<ChannelResponse, ChannelError>;
}

/// Production channel: CLI requests through the shell executor, HTTP
/// requests through a blocking client.
pub struct DefaultChannel {
    client: reqwest::blocking::Client,
}

impl DefaultChannel {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for DefaultChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendChannel for DefaultChannel {
    fn dispatch(&self, request: &ChannelRequest) -> Result<ChannelResponse, ChannelError> {
        tracing::debug!("dispatching {:?}", request);
        match request {
            ChannelRequest::Cli { command } => {
                let outcome = exec::execute(command, None, None)?;
                Ok(ChannelResponse {
                    body: outcome.output,
                    code: outcome.code,
                })
            }
            ChannelRequest::Http { method, url } => {
                let builder = match method {
                    HttpMethod::Get => self.client.get(url),
                    HttpMethod::Post => self.client.post(url),
                };
                let response = builder.send()?;
                let code = response.status().as_u16() as i32;
                let body = response.text()?;
                Ok(ChannelResponse { body, code })
            }
        }
    }
}
