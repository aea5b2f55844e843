//! Launcher and backend output scraping
//!
//! Two of the three backends only speak semi-structured text, so
//! tracking ids and driver states are pulled out with patterns. A miss
//! is an `Option::None`, never an error; the first occurrence wins when
//! a pattern matches more than once.

use regex_lite::Regex;

use crate::backend::Backend;

/// Extract the backend-issued tracking identifier from launcher
/// output.
pub fn submission_id(output: &str, backend: Backend) -> Option<String> {
    match backend {
        Backend::Rest => capture(r#""submissionId" : "(.+)""#, output),
        Backend::Yarn => {
            let re = Regex::new(r"application[0-9_]+").unwrap();
            re.find(output).map(|m| m.as_str().to_string())
        }
        Backend::Kubernetes => capture(r"pod name: ((.+?)-([a-z0-9]+)-driver)", output),
    }
}

/// Extract the cluster-reported driver state token, backend
/// independent.
pub fn driver_state(output: &str) -> Option<String> {
    capture(r#""driverState" : "(.+)""#, output)
}

fn capture(pattern: &str, output: &str) -> Option<String> {
    let re = Regex::new(pattern).unwrap();
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
