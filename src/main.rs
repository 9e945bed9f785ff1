mod cmd;
mod exec;
mod features;
mod ingress;
mod logging;
mod merge;
mod plan;
mod poll;
mod render;
mod secrets;
mod stack;
mod tls;
mod validate;

use clap::{Parser, Subcommand};
use cmd::apply::{InstallPreferences, Paths};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "cloudstrap",
    version,
    about = "Bootstrap a serverless cloud platform onto Kubernetes"
)]
#[command(
    long_about = "Cloudstrap provisions a serverless cloud control plane onto a\nKubernetes cluster in a single run: it merges declarative YAML plans,\nvalidates prerequisites, installs the ingress controller, cert-manager,\nsealed-secrets and object-storage add-ons, materializes secrets and\nconfiguration, and deploys the platform components."
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "CLOUDSTRAP_JSON",
        help = "Enable JSON log output"
    )]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one or more plan files to the cluster
    Apply {
        #[arg(
            long,
            short = 'f',
            required = true,
            env = "CLOUDSTRAP_PLAN",
            value_delimiter = ',',
            help = "Plan file(s), merged in argument order"
        )]
        file: Vec<String>,
        #[arg(
            long,
            env = "CLOUDSTRAP_SKIP_SEALEDSECRETS",
            help = "Skip the sealed-secrets installation"
        )]
        skip_sealedsecrets: bool,
        #[arg(
            long,
            env = "CLOUDSTRAP_SKIP_MINIO",
            help = "Skip the object-storage installation"
        )]
        skip_minio: bool,
        #[arg(
            long,
            env = "CLOUDSTRAP_SKIP_CREATE_SECRETS",
            help = "Skip creating secrets"
        )]
        skip_create_secrets: bool,
        #[arg(long, help = "Print the merged plan and exit without installing")]
        print_plan: bool,
        #[arg(
            long,
            default_value = "260",
            env = "CLOUDSTRAP_READINESS_ATTEMPTS",
            help = "Readiness poll attempt budget"
        )]
        readiness_attempts: u32,
        #[arg(
            long,
            default_value = "2",
            env = "CLOUDSTRAP_READINESS_INTERVAL",
            help = "Seconds between readiness poll attempts"
        )]
        readiness_interval: u64,
        #[arg(
            long,
            default_value = "scripts",
            env = "CLOUDSTRAP_SCRIPTS_DIR",
            help = "Directory holding the install scripts"
        )]
        scripts_dir: String,
        #[arg(
            long,
            default_value = "templates",
            env = "CLOUDSTRAP_TEMPLATES_DIR",
            help = "Directory holding the manifest templates"
        )]
        templates_dir: String,
        #[arg(
            long,
            default_value = "tmp",
            env = "CLOUDSTRAP_STAGING_DIR",
            help = "Scratch directory for generated manifests"
        )]
        staging_dir: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let log = logging::Logger::default_logger();
    if cli.json {
        log.set_json(true);
    }

    let result = match cli.command {
        Commands::Apply {
            file,
            skip_sealedsecrets,
            skip_minio,
            skip_create_secrets,
            print_plan,
            readiness_attempts,
            readiness_interval,
            scripts_dir,
            templates_dir,
            staging_dir,
        } => cmd::apply::run(
            &log,
            &file,
            InstallPreferences {
                skip_minio,
                skip_sealedsecrets,
                skip_create_secrets,
            },
            print_plan,
            poll::PollConfig {
                max_attempts: readiness_attempts,
                interval: Duration::from_secs(readiness_interval),
            },
            Paths {
                scripts: scripts_dir.into(),
                templates: templates_dir.into(),
                staging: staging_dir.into(),
            },
        ),
    };

    if let Err(e) = result {
        log.error(&e, &[]);
        std::process::exit(1);
    }
}
