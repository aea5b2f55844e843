//! Submission command rendering
//!
//! Pure rendering of an option set into the single `spark-submit`
//! line. Token order is fixed: launcher path, `--key value` options,
//! bare boolean flags, `--conf` entries, the entry point, then the
//! entry-point arguments.

use crate::options::{OptionValue, SubmissionOptions};

/// Render the submission command. Option names are hyphenated, false
/// flags render nothing, and conf entries pass through verbatim.
pub fn render(spark_bin: &str, opts: &SubmissionOptions, main_file: &str) -> String {
    let mut tokens: Vec<String> = vec![spark_bin.to_string()];

    for (name, value) in opts.entries() {
        if let OptionValue::Str(value) = value {
            tokens.push(format!("--{} {}", hyphenate(name), value));
        }
    }
    for (name, value) in opts.entries() {
        if let OptionValue::Flag(true) = value {
            tokens.push(format!("--{}", hyphenate(name)));
        }
    }
    for entry in opts.conf() {
        tokens.push(format!("--conf {}", entry));
    }

    tokens.push(main_file.to_string());
    if !opts.main_file_args().is_empty() {
        tokens.push(opts.main_file_args().to_string());
    }

    tidy(&tokens.join(" "))
}

/// Reformat a rendered command with one option per line, for display.
pub fn render_multiline(cmd: &str, main_file: &str) -> String {
    cmd.replace(" --", " \\\n--")
        .replace(&format!(" {}", main_file), &format!(" \\\n{}", main_file))
}

fn hyphenate(name: &str) -> String {
    name.replace('_', "-")
}

/// Ensure exactly one space precedes every `--` token, collapse double
/// spaces, and trim the ends.
fn tidy(cmd: &str) -> String {
    cmd.replace("--", " --").replace("  ", " ").trim().to_string()
}
