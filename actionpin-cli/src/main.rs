mod config;

use actionpin_core::adapters::{FsWritePort, build_resolver};
use actionpin_core::{LintOutcome, ToolError, ValidationMethod, run_lint, write_report};
use actionpin_render::{render_report_md, render_summary_text};
use actionpin_types::report::{LintReport, ReportToolInfo};
use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::{CliOverrides, ConfigMerger};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Exit code for aborted runs and tool errors.
const EXIT_ERROR: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "actionpin",
    version,
    about = "Validate GitHub Actions `uses:` references and pin them to commit SHAs."
)]
struct Cli {
    /// Debug logging on stderr (RUST_LOG still wins when set).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every action reference under PATH and fix what can be fixed.
    Lint(LintArgs),
}

#[derive(Debug, Parser)]
struct LintArgs {
    /// Repository root to scan.
    #[arg(default_value = ".")]
    path: Utf8PathBuf,

    /// Config file (default: <PATH>/actionpin.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Rewrite failing references to pinned SHAs.
    #[arg(long, overrides_with = "no_auto_fix")]
    auto_fix: bool,
    #[arg(long, overrides_with = "auto_fix")]
    no_auto_fix: bool,

    /// When fixing, move tags to the newest release and branches to the default branch.
    #[arg(long, overrides_with = "no_auto_latest")]
    auto_latest: bool,
    #[arg(long, overrides_with = "auto_latest")]
    no_auto_latest: bool,

    /// Report references that are not full commit SHAs.
    #[arg(long, overrides_with = "no_require_pinned_sha")]
    require_pinned_sha: bool,
    #[arg(long, overrides_with = "require_pinned_sha")]
    no_require_pinned_sha: bool,

    /// Separate version comments with two spaces instead of one.
    #[arg(long, overrides_with = "no_two_space_comments")]
    two_space_comments: bool,
    #[arg(long, overrides_with = "two_space_comments")]
    no_two_space_comments: bool,

    /// How references are checked (default: api with a token, git without).
    #[arg(long, value_enum)]
    validation_method: Option<MethodArg>,

    /// Concurrent remote lookups.
    #[arg(long)]
    workers: Option<usize>,

    /// Do not scan composite action.yml files.
    #[arg(long, default_value_t = false)]
    skip_actions: bool,

    /// Print the patch instead of writing files.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// GitHub token for the API strategy.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Also write the JSON report to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum MethodArg {
    Api,
    Git,
}

impl From<MethodArg> for ValidationMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Api => ValidationMethod::Api,
            MethodArg::Git => ValidationMethod::Git,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn real_main(cli: Cli) -> anyhow::Result<u8> {
    match cli.cmd {
        Command::Lint(args) => cmd_lint(args),
    }
}

fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn cmd_lint(args: LintArgs) -> anyhow::Result<u8> {
    let file_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::load_or_default(&args.path).context("load actionpin.toml config")?,
    };

    let settings = ConfigMerger::new(file_config)
        .merge(CliOverrides {
            root: args.path.clone(),
            require_pinned_sha: flag(args.require_pinned_sha, args.no_require_pinned_sha),
            auto_fix: flag(args.auto_fix, args.no_auto_fix),
            auto_latest: flag(args.auto_latest, args.no_auto_latest),
            two_space_comments: flag(args.two_space_comments, args.no_two_space_comments),
            validation_method: args.validation_method.map(ValidationMethod::from),
            workers: args.workers,
            skip_actions: args.skip_actions,
            dry_run: args.dry_run,
            github_token: args.github_token.clone(),
        })
        .context("merge configuration")?;
    debug!(
        root = %settings.root,
        method = %settings.effective_validation_method(),
        auto_fix = settings.auto_fix,
        require_pinned_sha = settings.require_pinned_sha,
        workers = settings.workers(),
        "merged settings"
    );

    let resolver = build_resolver(&settings)?;
    let tool = ReportToolInfo {
        name: "actionpin".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    match run_lint(&settings, resolver, tool) {
        Ok(outcome) => {
            emit(&outcome.report, args.format)?;
            if settings.dry_run {
                print_patch(&outcome, args.format);
            }
            write_report_file(&outcome.report, args.report.as_ref())?;
            Ok(outcome.exit_code())
        }
        Err(ToolError::Aborted { report, .. }) => {
            emit(&report, args.format)?;
            write_report_file(&report, args.report.as_ref())?;
            Ok(EXIT_ERROR)
        }
        Err(ToolError::Internal(e)) => Err(e),
    }
}

fn emit(report: &LintReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_summary_text(report)),
        OutputFormat::Markdown => print!("{}", render_report_md(report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).context("serialize report")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn print_patch(outcome: &LintOutcome, format: OutputFormat) {
    // JSON stdout must stay parseable.
    if matches!(format, OutputFormat::Json) {
        return;
    }
    if let Some(fixed) = &outcome.fix
        && !fixed.patch.is_empty()
    {
        println!();
        print!("{}", fixed.patch);
    }
}

fn write_report_file(report: &LintReport, path: Option<&Utf8PathBuf>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    write_report(report, path, &FsWritePort).with_context(|| format!("write report {path}"))
}
