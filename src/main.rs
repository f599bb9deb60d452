#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use toolstash_check::{AmbientEnv, Options, SystemExecutor, run};

/// Automates running `toolstash -cmp` against a commit: build the commit's
/// parent (or --base), save it with toolstash, build the commit, and compare
/// the compiler output of `std` and `cmd` between the two.
#[derive(Parser, Debug)]
#[command(name = "toolstash-check")]
#[command(about = "Check that a commit does not change compiler output", long_about = None)]
struct Cli {
    /// Commit to check
    #[arg(default_value = "HEAD")]
    commit: String,

    /// Build for all GOOS/GOARCH platforms
    #[arg(long)]
    all: bool,

    /// Revision to compare against (default: parent of commit)
    #[arg(long)]
    base: Option<String>,

    /// Additional flags to pass to compile
    #[arg(long, allow_hyphen_values = true)]
    gcflags: Option<String>,

    /// Build with -race
    #[arg(long)]
    race: bool,

    /// Rebuild the target compiler with make.bash instead of go install
    #[arg(long)]
    remake: bool,

    /// Path to the Go repository (default: $GOROOT)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Print commands as they are run (or set TOOLSTASH_CHECK_LOG)
    #[arg(short, long)]
    verbose: bool,

    /// Build with -work
    #[arg(long)]
    work: bool,

    /// Path to the buildall script used with --all (default: located with go list)
    #[arg(long)]
    buildall: Option<PathBuf>,
}

impl From<Cli> for Options {
    fn from(cli: Cli) -> Self {
        Options {
            commit: cli.commit,
            base: cli.base,
            all: cli.all,
            gcflags: cli.gcflags.filter(|f| !f.is_empty()),
            race: cli.race,
            remake: cli.remake,
            repo: cli.repo,
            verbose: cli.verbose,
            work: cli.work,
            buildall: cli.buildall,
        }
    }
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("TOOLSTASH_CHECK_LOG").unwrap_or_else(|_| {
        if verbose { "toolstash_check=debug".to_string() } else { "toolstash_check=warn".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = Options::from(cli);
    let ambient = AmbientEnv::detect();

    match run(&options, &ambient, &SystemExecutor::new()) {
        Ok(outcome) => println!("{}", outcome.summary()),
        Err(e) => {
            eprintln!("toolstash-check: {e}");
            if e.is_usage() {
                eprintln!("{}", Cli::command().render_usage());
            }
            std::process::exit(e.exit_code());
        }
    }
}
