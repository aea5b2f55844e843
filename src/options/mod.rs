//! Submission option set
//!
//! Typed `spark-submit` options: an insertion-ordered name/value table
//! plus the fields that render specially (install root, raw `--conf`
//! overrides, entry-point arguments). [`SubmissionOptions::default`] is
//! the built-in default table; caller values override it key-by-key so
//! the canonical rendering order stays stable.

use serde::{Deserialize, Serialize};

use crate::system;

/// Value of a single spark-submit option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Rendered as `--key value`
    Str(String),
    /// Rendered as a bare `--key` when true, omitted when false
    Flag(bool),
}

/// Where the driver runs, per the `deploy_mode` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployMode {
    /// Driver runs in the submitting process; outcome is known when
    /// the launcher exits
    #[default]
    Client,
    /// Driver runs on the cluster and is tracked by submission id
    Cluster,
}

impl DeployMode {
    fn from_option(value: Option<&str>) -> DeployMode {
        match value {
            Some("cluster") => DeployMode::Cluster,
            _ => DeployMode::Client,
        }
    }
}

/// Errors raised when loading options from a TOML document
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("failed to parse options TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("option \"{key}\" has an unsupported value type")]
    Unsupported { key: String },
}

/// The full option set for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOptions {
    /// `--key value` / `--flag` options, in rendering order
    entries: Vec<(String, OptionValue)>,
    /// Launcher install root override; `$SPARK_HOME` or `~/spark_home`
    /// when unset
    spark_home: Option<String>,
    /// Raw `--conf` override strings, rendered verbatim
    conf: Vec<String>,
    /// Single string appended after the entry point
    main_file_args: String,
}

impl Default for SubmissionOptions {
    /// The built-in default table. Key order here is the canonical
    /// rendering order for the submission command.
    fn default() -> Self {
        let mut opts = SubmissionOptions::new();
        opts.set("master", "local[*]");
        opts.set("name", "spark-submit-task");
        opts.set("deploy_mode", "client");
        opts.set("driver_memory", "1g");
        opts.set("executor_memory", "1g");
        opts.set("executor_cores", "1");
        opts.set("total_executor_cores", "2");
        opts.set_flag("verbose", false);
        opts.set_flag("supervise", false);
        opts
    }
}

impl SubmissionOptions {
    /// An empty option set, with no defaults applied.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            spark_home: None,
            conf: Vec::new(),
            main_file_args: String::new(),
        }
    }

    /// Set a `--key value` option, overriding in place when the key is
    /// already present.
    pub fn set(&mut self, name: &str, value: &str) {
        self.put(name, OptionValue::Str(value.to_string()));
    }

    /// Set a boolean flag option.
    pub fn set_flag(&mut self, name: &str, on: bool) {
        self.put(name, OptionValue::Flag(on));
    }

    fn put(&mut self, name: &str, value: OptionValue) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Append a raw `--conf` override entry.
    pub fn add_conf(&mut self, entry: &str) {
        self.conf.push(entry.to_string());
    }

    /// Set the string appended after the entry point.
    pub fn set_main_file_args(&mut self, args: &str) {
        self.main_file_args = args.to_string();
    }

    /// Override the launcher install root.
    pub fn set_spark_home(&mut self, path: &str) {
        self.spark_home = Some(path.to_string());
    }

    /// Overlay `other` key-by-key. Keys already present keep their
    /// position; new keys append in `other`'s order. A non-empty conf
    /// list or args string in `other` replaces this one's entirely.
    pub fn merge(&mut self, other: &SubmissionOptions) {
        for (name, value) in &other.entries {
            self.put(name, value.clone());
        }
        if let Some(home) = &other.spark_home {
            self.spark_home = Some(home.clone());
        }
        if !other.conf.is_empty() {
            self.conf = other.conf.clone();
        }
        if !other.main_file_args.is_empty() {
            self.main_file_args = other.main_file_args.clone();
        }
    }

    /// Parse an override set from a TOML document. Strings, integers
    /// and floats become `--key value` options, booleans become flags,
    /// `conf` must be an array of strings, and `main_file_args` /
    /// `spark_home` fill their dedicated fields.
    pub fn from_toml_str(text: &str) -> Result<Self, OptionsError> {
        let table: toml::Table = text.parse()?;
        let mut opts = SubmissionOptions::new();

        for (key, value) in table {
            match (key.as_str(), value) {
                ("spark_home", toml::Value::String(home)) => opts.set_spark_home(&home),
                ("main_file_args", toml::Value::String(args)) => opts.set_main_file_args(&args),
                ("conf", toml::Value::Array(items)) => {
                    for item in items {
                        match item {
                            toml::Value::String(entry) => opts.add_conf(&entry),
                            _ => return Err(OptionsError::Unsupported { key: key.clone() }),
                        }
                    }
                }
                (_, toml::Value::String(text)) => opts.set(&key, &text),
                (_, toml::Value::Integer(n)) => opts.set(&key, &n.to_string()),
                (_, toml::Value::Float(n)) => opts.set(&key, &n.to_string()),
                (_, toml::Value::Boolean(on)) => opts.set_flag(&key, on),
                _ => return Err(OptionsError::Unsupported { key: key.clone() }),
            }
        }
        Ok(opts)
    }

    /// The stored option entries, in rendering order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Look up a single option by name.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    fn str_value(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(OptionValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// The master this job is submitted against.
    pub fn master(&self) -> &str {
        self.str_value("master").unwrap_or("local[*]")
    }

    /// The job name, used in log lines and as the poll thread name.
    pub fn name(&self) -> &str {
        self.str_value("name").unwrap_or("spark-submit-task")
    }

    /// Deploy mode parsed from the `deploy_mode` option.
    pub fn deploy_mode(&self) -> DeployMode {
        DeployMode::from_option(self.str_value("deploy_mode"))
    }

    /// Raw `--conf` override entries.
    pub fn conf(&self) -> &[String] {
        &self.conf
    }

    /// The string appended after the entry point.
    pub fn main_file_args(&self) -> &str {
        &self.main_file_args
    }

    /// Launcher install root: the explicit override, else
    /// `$SPARK_HOME`, else `~/spark_home`.
    pub fn resolved_spark_home(&self) -> String {
        match &self.spark_home {
            Some(home) => home.clone(),
            None => system::default_spark_home(),
        }
    }
}
