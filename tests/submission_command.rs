//! Rendered-command contract tests through the public API.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use tempfile::TempDir;

use spark_launcher::{SparkJob, SubmissionOptions};

fn fake_spark_home() -> TempDir {
    let home = TempDir::new().unwrap();
    let bin = home.path().join("bin");
    fs::create_dir(&bin).unwrap();
    let launcher = bin.join("spark-submit");
    fs::write(&launcher, "#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755)).unwrap();
    home
}

fn entry_point(home: &TempDir) -> String {
    let path = home.path().join("app.py");
    fs::write(&path, "print('ok')\n").unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn canonical_command_shape() {
    let home = fake_spark_home();
    let spark_home = home.path().to_string_lossy().into_owned();
    let main_file = entry_point(&home);

    let mut opts = SubmissionOptions::default();
    opts.set_spark_home(&spark_home);
    opts.set("total_executor_cores", "4");
    opts.set_flag("verbose", true);
    opts.add_conf("'foo'='bar'");
    opts.set_main_file_args("conf.json");

    let job = SparkJob::new(&main_file, opts).unwrap();
    assert_eq!(
        job.submit_cmd(),
        format!(
            "{}/bin/spark-submit --master local[*] --name spark-submit-task \
             --deploy-mode client --driver-memory 1g --executor-memory 1g \
             --executor-cores 1 --total-executor-cores 4 --verbose \
             --conf 'foo'='bar' {} conf.json",
            spark_home, main_file
        )
    );
}

#[test]
fn command_is_cached_at_construction() {
    let home = fake_spark_home();
    let main_file = entry_point(&home);

    let mut opts = SubmissionOptions::default();
    opts.set_spark_home(&home.path().to_string_lossy());

    let job = SparkJob::new(&main_file, opts).unwrap();
    let first = job.submit_cmd().to_string();
    assert_eq!(job.submit_cmd(), first);
}

#[test]
fn multiline_command_round_trips() {
    let home = fake_spark_home();
    let main_file = entry_point(&home);

    let mut opts = SubmissionOptions::default();
    opts.set_spark_home(&home.path().to_string_lossy());

    let job = SparkJob::new(&main_file, opts).unwrap();
    let multiline = job.submit_cmd_multiline();
    assert!(multiline.lines().count() > 1);
    assert_eq!(multiline.replace(" \\\n", " "), job.submit_cmd());
}

#[test]
fn toml_overrides_feed_the_command() {
    let home = fake_spark_home();
    let main_file = entry_point(&home);

    let overlay = SubmissionOptions::from_toml_str(
        r#"
        deploy_mode = "cluster"
        executor_memory = "2g"
        verbose = true
        conf = ["spark.executor.instances=2"]
        "#,
    )
    .unwrap();

    let mut opts = SubmissionOptions::default();
    opts.set_spark_home(&home.path().to_string_lossy());
    opts.merge(&overlay);

    let job = SparkJob::new(&main_file, opts).unwrap();
    let cmd = job.submit_cmd();
    assert!(cmd.contains("--deploy-mode cluster"));
    assert!(cmd.contains("--executor-memory 2g"));
    assert!(cmd.contains("--verbose"));
    assert!(cmd.contains("--conf spark.executor.instances=2"));
}
