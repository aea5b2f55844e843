//! Environment snapshot and diagnostics
//!
//! Read-only helpers: the env-var snapshot propagated to launcher
//! children on request, and a plain-text system-information report.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use regex_lite::Regex;

use crate::exec;

/// Environment variables tracked for launcher children
const TRACKED_VARS: &[&str] = &[
    "SPARK_HOME",
    "JAVA_HOME",
    "PYSPARK_PYTHON",
    "PYSPARK_DRIVER_PYTHON",
];

/// Snapshot of the tracked environment variables that are currently
/// set.
pub fn env_vars() -> HashMap<String, String> {
    TRACKED_VARS
        .iter()
        .filter_map(|name| env::var(name).ok().map(|value| (name.to_string(), value)))
        .collect()
}

/// Expand a leading `~/` to the user's home directory.
pub(crate) fn expand_user(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Launcher install root: `$SPARK_HOME`, falling back to
/// `~/spark_home`.
pub fn default_spark_home() -> String {
    env::var("SPARK_HOME")
        .unwrap_or_else(|_| expand_user("~/spark_home").to_string_lossy().into_owned())
}

/// Spark-related system information: launcher, Scala and Java versions
/// plus a host descriptor. Diagnostic only; failures degrade to a
/// shorter report.
pub fn info() -> String {
    let spark_home = default_spark_home();
    let mut cmd = format!("{}/bin/spark-submit --version", quote_spaces(&spark_home));

    let java_bin = match env::var("JAVA_HOME") {
        Ok(home) if !home.is_empty() => format!("{}/bin/java", home),
        _ => "java".to_string(),
    };
    cmd.push_str(&format!(" ; {} -version", quote_spaces(&java_bin)));

    let text = match exec::execute(&cmd, None, None) {
        Ok(outcome) => outcome.output,
        Err(_) => String::new(),
    };

    let patterns = [
        ("Spark version", r"  version (.+)"),
        ("Scala version", r"(?i)scala version (.+?),"),
        ("Java version", r#"(?i)version "(.+)""#),
    ];

    let mut lines = Vec::new();
    for (label, pattern) in patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(caps) = re.captures(&text) {
            if let Some(m) = caps.get(1) {
                lines.push(format!("{}: {}", label, m.as_str().trim()));
            }
        }
    }
    lines.push(format!(
        "spark-launcher version: {}",
        env!("CARGO_PKG_VERSION")
    ));
    lines.push(format!("OS: {} {}", env::consts::OS, env::consts::ARCH));
    lines.join("\n")
}

fn quote_spaces(text: &str) -> String {
    if text.contains(' ') {
        format!("\"{}\"", text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_vars_only_returns_set_ones() {
        let vars = env_vars();
        for name in vars.keys() {
            assert!(TRACKED_VARS.contains(&name.as_str()));
        }
    }

    #[test]
    fn test_expand_user() {
        let home = env::var("HOME").unwrap();
        assert_eq!(
            expand_user("~/spark_home"),
            PathBuf::from(home).join("spark_home")
        );
        assert_eq!(expand_user("/opt/spark"), PathBuf::from("/opt/spark"));
    }

    #[test]
    fn test_quote_spaces() {
        assert_eq!(quote_spaces("/opt/spark"), "/opt/spark");
        assert_eq!(quote_spaces("/opt/my spark"), "\"/opt/my spark\"");
    }

    #[test]
    fn test_info_always_reports_host() {
        let report = info();
        assert!(report.contains("OS: "));
        assert!(report.contains("spark-launcher version: "));
    }
}
