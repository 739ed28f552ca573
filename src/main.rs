use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use web_vision::{
    ChromeEngine, DotReporter, Reporter, ReporterStyle, RunConfig, RunCoordinator, RunOverrides,
    SpecReporter, SuiteFile, TestRegistry, VisionError, VisionResult,
};

/// Web Vision - Visual regression testing for web pages
#[derive(Parser, Debug)]
#[command(
    name = "web-vision",
    about = "Browser-driven visual regression testing with baseline comparison",
    after_help = "ENVIRONMENT VARIABLES:\n\
        WEB_VISION_BASE_URL        Base URL prepended to test URLs\n\
        WEB_VISION_SELECTOR        Global capture selector\n\
        WEB_VISION_RETRY_LIMIT     Retries per test on transient failure\n\
        WEB_VISION_BASELINE_DIR    Baseline image directory\n\
        WEB_VISION_CURRENT_DIR     Fresh capture directory\n\
        WEB_VISION_DIFF_DIR        Diff artifact directory\n\
        WEB_VISION_REPORTER        Reporter style (spec or dot)\n\
        WEB_VISION_HEADED          Run the browser headed (1/true)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a visual regression suite against a live server
    Run {
        /// Path to the JSON suite file
        #[arg(short, long)]
        suite: PathBuf,

        /// Base URL prepended to every test URL
        #[arg(short, long)]
        base_url: Option<String>,

        /// Global capture selector (full page when omitted)
        #[arg(long)]
        selector: Option<String>,

        /// Overwrite every baseline with this run's captures
        #[arg(long)]
        overwrite: bool,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// Give each test an isolated (incognito) page context
        #[arg(long)]
        isolated: bool,

        /// Retries per test on transient failure
        #[arg(short, long)]
        retry_limit: Option<u32>,

        /// Only run tests from the named group
        #[arg(short, long)]
        filter: Option<String>,

        /// Reporter style: spec (one line per test) or dot
        #[arg(long)]
        reporter: Option<String>,

        /// Baseline image directory
        #[arg(long)]
        baseline_dir: Option<PathBuf>,

        /// Fresh capture directory
        #[arg(long)]
        current_dir: Option<PathBuf>,

        /// Diff artifact directory
        #[arg(long)]
        diff_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match args.command {
        Some(Commands::Run {
            suite,
            base_url,
            selector,
            overwrite,
            headed,
            isolated,
            retry_limit,
            filter,
            reporter,
            baseline_dir,
            current_dir,
            diff_dir,
        }) => {
            let cli = RunOverrides {
                base_url,
                selector,
                ignore_css_animations: None,
                overwrite: overwrite.then_some(true),
                isolated_context: isolated.then_some(true),
                group_filter: filter,
                retry_limit,
                headless: headed.then_some(false),
                reporter: None,
                baseline_dir,
                current_dir,
                diff_dir,
            };
            match run_suite(&suite, cli, reporter).await {
                Ok(code) => std::process::exit(code),
                Err(err) => {
                    eprintln!("error: {}", err);
                    std::process::exit(2);
                }
            }
        }

        None => {
            println!("Web Vision - Visual regression testing for web pages");
            println!();
            println!("Usage: web-vision <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run   Run a visual regression suite against a live server");
            println!();
            println!("Run with --help for more information.");
        }
    }
}

async fn run_suite(
    suite_path: &std::path::Path,
    mut cli: RunOverrides,
    reporter_name: Option<String>,
) -> VisionResult<i32> {
    if let Some(name) = reporter_name {
        cli.reporter = Some(ReporterStyle::from_name(&name).ok_or_else(|| {
            VisionError::Config(format!(
                "Unknown reporter '{}'. Use: spec or dot",
                name
            ))
        })?);
    }

    let suite = SuiteFile::load(suite_path)?;

    // Lowest precedence first: suite defaults, environment, CLI flags.
    let config = RunConfig::defaults()
        .apply(&suite.defaults)
        .apply(&RunOverrides::from_env())
        .apply(&cli);

    let mut registry = TestRegistry::new();
    registry.register_suite(&suite, config.group_filter.as_deref());

    let reporter: Arc<dyn Reporter> = match config.reporter {
        ReporterStyle::Spec => Arc::new(SpecReporter),
        ReporterStyle::Dot => Arc::new(DotReporter),
    };

    let mut coordinator =
        RunCoordinator::new(config, registry, Arc::new(ChromeEngine::new()), reporter);
    let summary = coordinator.execute().await?;
    Ok(summary.exit_code())
}
