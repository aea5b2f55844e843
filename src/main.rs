//! spark-launch CLI
//!
//! Entry point for the `spark-launch` command-line tool.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};

use spark_launcher::{
    Backend, BackendChannel, DefaultChannel, DriverState, SparkJob, SubmissionOptions,
    SubmitSettings,
};

#[derive(Parser)]
#[command(name = "spark-launch")]
#[command(about = "Submit and manage spark-submit jobs", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job and report the outcome
    Submit {
        /// Entry point: local path, s3 location, or local: cluster path
        main_file: String,

        /// Master the job is submitted against
        #[arg(long)]
        master: Option<String>,

        /// Deploy mode: client or cluster
        #[arg(long)]
        deploy_mode: Option<String>,

        /// Job name
        #[arg(long)]
        name: Option<String>,

        /// Raw --conf override, repeatable
        #[arg(long = "conf")]
        conf: Vec<String>,

        /// Options file (TOML) merged over the built-in defaults
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Seconds between driver-state polls after submission
        #[arg(long)]
        poll: Option<u64>,

        /// Launcher timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Propagate SPARK_HOME/JAVA_HOME/PYSPARK_* to the launcher
        #[arg(long)]
        use_env_vars: bool,

        /// Print the rendered command without executing it
        #[arg(long)]
        dry_run: bool,

        /// Output the submission record as JSON
        #[arg(long)]
        json: bool,

        /// Arguments passed to the entry point (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Query the driver state for a tracking id
    Status {
        /// Master the job was submitted against
        #[arg(long)]
        master: String,

        /// Backend tracking id
        id: String,
    },

    /// Kill a submitted job
    Kill {
        /// Master the job was submitted against
        #[arg(long)]
        master: String,

        /// Backend tracking id
        id: String,
    },

    /// Print Spark-related system information
    Info,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            main_file,
            master,
            deploy_mode,
            name,
            conf,
            config,
            poll,
            timeout,
            use_env_vars,
            dry_run,
            json,
            args,
        } => {
            let opts = match build_options(master, deploy_mode, name, conf, config, args) {
                Ok(opts) => opts,
                Err(message) => {
                    eprintln!("Error loading options: {}", message);
                    process::exit(1);
                }
            };
            run_submit(&main_file, opts, poll, timeout, use_env_vars, dry_run, json);
        }
        Commands::Status { master, id } => run_status(&master, &id),
        Commands::Kill { master, id } => run_kill(&master, &id),
        Commands::Info => println!("{}", spark_launcher::system::info()),
    }
}

fn build_options(
    master: Option<String>,
    deploy_mode: Option<String>,
    name: Option<String>,
    conf: Vec<String>,
    config: Option<PathBuf>,
    args: Vec<String>,
) -> Result<SubmissionOptions, String> {
    let mut opts = SubmissionOptions::default();

    if let Some(path) = config {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        let overlay = SubmissionOptions::from_toml_str(&text).map_err(|e| e.to_string())?;
        opts.merge(&overlay);
    }

    if let Some(master) = master {
        opts.set("master", &master);
    }
    if let Some(deploy_mode) = deploy_mode {
        opts.set("deploy_mode", &deploy_mode);
    }
    if let Some(name) = name {
        opts.set("name", &name);
    }
    for entry in conf {
        opts.add_conf(&entry);
    }
    if !args.is_empty() {
        opts.set_main_file_args(&args.join(" "));
    }
    Ok(opts)
}

fn run_submit(
    main_file: &str,
    opts: SubmissionOptions,
    poll: Option<u64>,
    timeout: Option<u64>,
    use_env_vars: bool,
    dry_run: bool,
    json: bool,
) {
    let job = match SparkJob::new(main_file, opts) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    if dry_run {
        println!("{}", job.submit_cmd_multiline());
        return;
    }

    let settings = SubmitSettings {
        poll_interval: None,
        use_env_vars,
        timeout: timeout.map(Duration::from_secs),
    };
    if let Err(e) = job.submit(&settings) {
        eprintln!("Submission failed: {}", e);
        process::exit(1);
    }

    // Foreground poll until the driver concludes, for any backend.
    if let Some(seconds) = poll {
        while !job.concluded() {
            thread::sleep(Duration::from_secs(seconds.max(1)));
            if let Some(state) = job.state() {
                eprintln!("driver state: {}", state);
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&job.response()) {
            Ok(body) => println!("{}", body),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        if !job.submission_id().is_empty() {
            println!("submission id: {}", job.submission_id());
        }
        if let Some(state) = job.last_state() {
            println!("driver state: {}", state);
        }
        println!("exit code: {}", job.code());
    }
}

fn run_status(master: &str, id: &str) {
    let request = Backend::classify(master).status_request(master, &default_spark_bin(), id);
    let channel = DefaultChannel::new();

    match channel.dispatch(&request) {
        Ok(reply) => {
            let state = spark_launcher::parse::driver_state(&reply.body)
                .map(|token| DriverState::parse(&token))
                .unwrap_or(DriverState::Unknown);
            println!("{}", state);
        }
        Err(e) => {
            eprintln!("Status check failed: {}", e);
            process::exit(1);
        }
    }
}

fn run_kill(master: &str, id: &str) {
    let request = Backend::classify(master).kill_request(master, &default_spark_bin(), id);
    let channel = DefaultChannel::new();

    match channel.dispatch(&request) {
        Ok(reply) if reply.code == 0 || reply.code == 200 => {
            println!("killed {}", id);
        }
        Ok(reply) => {
            eprintln!("Kill rejected with code {}:\n{}", reply.code, reply.body);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Kill failed: {}", e);
            process::exit(1);
        }
    }
}

fn default_spark_bin() -> String {
    format!(
        "{}/bin/spark-submit",
        spark_launcher::system::default_spark_home()
    )
}
