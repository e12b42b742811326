use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use baselinescan::output::OutputFormat;
use baselinescan::ScanOptions;

#[derive(Parser)]
#[command(
    name = "baselinescan",
    about = "Run a baseline security scan against a target URL and grade the findings",
    version,
    after_help = "Exit codes: 0 success, 1 at least one FAIL, 2 at least one WARN and no FAILs, 3 tooling failure"
)]
struct Cli {
    /// Target URL including the protocol, eg https://www.example.com
    #[arg(long, short = 't')]
    target: String,

    /// Policy file to use to INFO, IGNORE or FAIL warnings
    #[arg(long, short = 'c', value_name = "FILE")]
    policy_file: Option<PathBuf>,

    /// URL of policy file to use to INFO, IGNORE or FAIL warnings
    #[arg(long, short = 'u', value_name = "URL", conflicts_with = "policy_file")]
    policy_url: Option<String>,

    /// Generate a default policy file (all rules set to WARN)
    #[arg(long, short = 'g', value_name = "FILE")]
    generate: Option<PathBuf>,

    /// Number of minutes to crawl for
    #[arg(long, short = 'm', default_value_t = 1)]
    mins: u64,

    /// File to write the engine's full HTML report
    #[arg(long, short = 'r', value_name = "FILE")]
    report_html: Option<PathBuf>,

    /// File to write the engine's full XML report
    #[arg(long, short = 'x', value_name = "FILE")]
    report_xml: Option<PathBuf>,

    /// Include the alpha passive scan rules as well
    #[arg(long, short = 'a')]
    include_alpha: bool,

    /// Show debug messages
    #[arg(long, short = 'd')]
    debug: bool,

    /// Default rules not in the policy file to INFO
    #[arg(long, short = 'i')]
    info_unspecified: bool,

    /// Short output format - don't show PASSes or example URLs
    #[arg(long, short = 's')]
    short: bool,

    /// Verdict output format (console, json)
    #[arg(long, short = 'f', default_value = "console")]
    format: String,

    /// Directory for file based options (policy files, reports)
    #[arg(long, short = 'w', default_value = ".", value_name = "DIR")]
    work_dir: PathBuf,

    /// Command used to launch the scanning engine daemon
    #[arg(long, default_value = "zap.sh", value_name = "CMD")]
    engine_cmd: String,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_str_lenient(&cli.format).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", cli.format);
        OutputFormat::Console
    });

    let options = ScanOptions {
        target: cli.target,
        policy_file: cli.policy_file,
        policy_url: cli.policy_url,
        generate: cli.generate,
        crawl_mins: cli.mins,
        report_html: cli.report_html,
        report_xml: cli.report_xml,
        include_alpha: cli.include_alpha,
        info_unspecified: cli.info_unspecified,
        detailed_output: !cli.short,
        format,
        work_dir: cli.work_dir,
        engine_cmd: cli.engine_cmd,
    };

    match baselinescan::run(&options) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}
