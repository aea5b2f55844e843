//! End-to-end lifecycle tests against a fake SPARK_HOME tree.
//!
//! The launcher is a shell script that prints canned output, so these
//! run the real submit path (shell executor included) while status and
//! kill go through a scripted channel.

use std::fs;
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use spark_launcher::mock::MockChannel;
use spark_launcher::{
    Backend, ChannelRequest, DriverState, HttpMethod, KillError, SparkJob, SubmissionOptions,
    SubmitSettings,
};

/// A fake SPARK_HOME whose bin/spark-submit prints `output` and exits
/// with `code`.
fn fake_spark_home(output: &str, code: i32) -> TempDir {
    let home = TempDir::new().unwrap();
    let bin = home.path().join("bin");
    fs::create_dir(&bin).unwrap();

    let launcher = bin.join("spark-submit");
    let mut file = fs::File::create(&launcher).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "cat <<'EOF'").unwrap();
    writeln!(file, "{}", output).unwrap();
    writeln!(file, "EOF").unwrap();
    writeln!(file, "exit {}", code).unwrap();
    drop(file);

    fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755)).unwrap();
    home
}

fn entry_point(home: &TempDir) -> String {
    let path = home.path().join("app.py");
    fs::write(&path, "print('ok')\n").unwrap();
    path.to_string_lossy().into_owned()
}

fn options(home: &TempDir) -> SubmissionOptions {
    let mut opts = SubmissionOptions::default();
    opts.set_spark_home(&home.path().to_string_lossy());
    opts
}

#[test]
fn client_mode_concludes_finished_without_an_id() {
    let home = fake_spark_home("Pi is roughly 3.14", 0);
    let main_file = entry_point(&home);

    let job = SparkJob::new(&main_file, options(&home)).unwrap();
    job.submit(&SubmitSettings::default()).unwrap();

    assert_eq!(job.state(), Some(DriverState::Finished));
    assert_eq!(job.submission_id(), "");
    assert_eq!(job.code(), 0);
    assert!(job.output().contains("Pi is roughly"));
}

#[test]
fn rest_cluster_submission_tracks_until_terminal() {
    let home = fake_spark_home(
        r#"{
  "action" : "CreateSubmissionResponse",
  "submissionId" : "driver-20200803-0001",
  "success" : true
}"#,
        0,
    );
    let main_file = entry_point(&home);

    let mut opts = options(&home);
    opts.set("master", "spark://host:6066");
    opts.set("deploy_mode", "cluster");

    let channel = Arc::new(MockChannel::new());
    channel.push_response(r#"{"driverState" : "RUNNING"}"#, 200);
    channel.push_response(r#"{"driverState" : "FINISHED"}"#, 200);

    let job = SparkJob::with_channel(&main_file, opts, channel.clone()).unwrap();
    job.submit(&SubmitSettings::default()).unwrap();

    assert_eq!(job.submission_id(), "driver-20200803-0001");
    assert!(!job.concluded());

    assert_eq!(job.state(), Some(DriverState::Running));
    assert!(!job.concluded());
    assert_eq!(job.state(), Some(DriverState::Finished));
    assert!(job.concluded());

    // The status channel saw GET requests against the rewritten URL.
    let requests = channel.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0],
        ChannelRequest::Http {
            method: HttpMethod::Get,
            url: "http://host:6066/v1/submissions/status/driver-20200803-0001".to_string(),
        }
    );
}

#[test]
fn yarn_cluster_submission_uses_the_cli_channel() {
    let home = fake_spark_home(
        "INFO yarn.Client: Submitted application application_1616000000000_0007",
        0,
    );
    let main_file = entry_point(&home);

    let mut opts = options(&home);
    opts.set("master", "yarn");
    opts.set("deploy_mode", "cluster");

    let channel = Arc::new(MockChannel::new());
    channel.push_response(r#""driverState" : "FINISHED""#, 0);

    let job = SparkJob::with_channel(&main_file, opts, channel.clone()).unwrap();
    // A poll interval is requested but YARN never polls in the
    // background; only the explicit state() call dispatches.
    job.submit(&SubmitSettings {
        poll_interval: Some(Duration::from_millis(10)),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(job.backend(), Backend::Yarn);
    assert_eq!(job.submission_id(), "application_1616000000000_0007");
    assert!(channel.requests().is_empty());

    assert_eq!(job.state(), Some(DriverState::Finished));
    assert_eq!(
        channel.requests(),
        vec![ChannelRequest::Cli {
            command: "yarn application -status application_1616000000000_0007".to_string(),
        }]
    );
}

#[test]
fn background_poller_races_with_kill() {
    let home = fake_spark_home(r#""submissionId" : "driver-42""#, 0);
    let main_file = entry_point(&home);

    let mut opts = options(&home);
    opts.set("master", "spark://host:6066");
    opts.set("deploy_mode", "cluster");

    let channel = Arc::new(MockChannel::new());
    // Enough non-terminal states to keep the poller busy.
    for _ in 0..50 {
        channel.push_response(r#"{"driverState" : "RUNNING"}"#, 200);
    }

    let job = SparkJob::with_channel(&main_file, opts, channel.clone()).unwrap();
    job.submit(&SubmitSettings {
        poll_interval: Some(Duration::from_millis(10)),
        ..Default::default()
    })
    .unwrap();

    // kill() pops the next scripted response; any code-200 body
    // satisfies it.
    job.kill().unwrap();
    assert_eq!(job.last_state(), Some(DriverState::Killed));

    // The poller self-terminates once the job concludes; request
    // traffic stops shortly after the kill.
    thread::sleep(Duration::from_millis(50));
    let settled = channel.requests().len();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(channel.requests().len(), settled);
    assert_eq!(job.last_state(), Some(DriverState::Killed));
}

#[test]
fn kill_before_any_submission_is_an_error() {
    let home = fake_spark_home("", 0);
    let main_file = entry_point(&home);

    let channel = Arc::new(MockChannel::new());
    let job = SparkJob::with_channel(&main_file, options(&home), channel.clone()).unwrap();

    assert!(matches!(job.kill(), Err(KillError::NoSubmissionId(_))));
    assert!(channel.requests().is_empty());
}

#[test]
fn kill_goes_through_the_rest_channel_with_post() {
    let home = fake_spark_home(r#""submissionId" : "driver-9""#, 0);
    let main_file = entry_point(&home);

    let mut opts = options(&home);
    opts.set("master", "spark://host:6066");
    opts.set("deploy_mode", "cluster");

    let channel = Arc::new(MockChannel::new());
    channel.push_response(r#"{"success" : true}"#, 200);

    let job = SparkJob::with_channel(&main_file, opts, channel.clone()).unwrap();
    job.submit(&SubmitSettings::default()).unwrap();
    job.kill().unwrap();

    assert_eq!(
        channel.requests(),
        vec![ChannelRequest::Http {
            method: HttpMethod::Post,
            url: "http://host:6066/v1/submissions/kill/driver-9".to_string(),
        }]
    );
}

#[test]
fn submit_waits_for_a_slow_launcher_within_timeout() {
    let home = fake_spark_home("", 0);
    let main_file = entry_point(&home);

    let launcher = home.path().join("bin/spark-submit");
    fs::write(&launcher, "#!/bin/sh\nsleep 1\necho done\n").unwrap();
    fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755)).unwrap();

    let job = SparkJob::new(&main_file, options(&home)).unwrap();
    let started = Instant::now();
    job.submit(&SubmitSettings {
        timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    })
    .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(job.last_state(), Some(DriverState::Finished));
}
