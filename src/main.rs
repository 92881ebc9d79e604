// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ldom_render::adapters::{
    Adapter, ExtractMode, InterlinearAdapter, InterlinearBatch, InterlinearOutput, TemplateSource,
    TypesettingAdapter, UiTemplateAdapter,
};
use ldom_render::app_config::{self, Config};
use ldom_render::document;
use ldom_render::file_utils::FileManager;
use ldom_render::render::{JobId, JobRunner, RunnerConfig};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a template (or a directory of templates) to typesetting source
    Typeset {
        /// Markup or JSON document, or a directory of them
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Output file, or output directory for a directory input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Language column to render; repeat for several
        #[arg(short = 'L', long = "language")]
        languages: Vec<String>,
    },

    /// Align language variants word by word and print a JSON report
    Interlinear {
        /// Markup or JSON document, or a directory of them
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language of the alignment
        #[arg(short, long)]
        source_language: Option<String>,

        /// Target language of the alignment
        #[arg(short, long)]
        target_language: Option<String>,
    },

    /// Extract the UI template tree of a markup file as JSON
    Template {
        /// Markup file
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Only structure, titles and language tags
        #[arg(short, long)]
        metadata_only: bool,

        /// Write the tree here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Typeset and render documents to PDF through the external tool
    Render {
        /// Document, typesetting source, or a directory of them
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Job identifier for a single input; derived from the source when omitted
        #[arg(short, long)]
        job_id: Option<String>,

        /// Tool to invoke instead of the workspace build script
        #[arg(long, env = "LDOM_RENDER_TOOL")]
        tool: Option<PathBuf>,

        /// Timeout in seconds for one tool invocation
        #[arg(long)]
        timeout: Option<u64>,

        /// Workspace directory
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Generate shell completions for ldom-render
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// ldom-render - Liturgical document rendering
///
/// Converts multilingual liturgical templates into typesetting source,
/// interlinear alignments and UI template trees, and renders PDFs.
#[derive(Parser, Debug)]
#[command(name = "ldom-render")]
#[command(version)]
#[command(about = "Liturgical document rendering tool")]
#[command(long_about = "ldom-render turns multilingual liturgical templates into LaTeX, interlinear alignments and UI trees.

EXAMPLES:
    ldom-render typeset vespers.html                   # Write vespers.tex next to the input
    ldom-render typeset -L en -L gr services/ -o out/  # Batch with two language columns
    ldom-render interlinear vespers.json               # Print the alignment report
    ldom-render template --metadata-only vespers.html  # Print the template tree
    ldom-render render vespers.html --job-id vespers   # Produce vespers.pdf in the workspace
    ldom-render completions bash > ldom-render.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in ldom.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "ldom.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Language for untagged markup text
    #[arg(short, long, global = true)]
    default_language: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Accept everything here; the effective level is applied via set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "ldom-render", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Typeset {
            input_path,
            output,
            languages,
        } => run_typeset(&config, &input_path, output, languages),
        Commands::Interlinear {
            input_path,
            output,
            source_language,
            target_language,
        } => run_interlinear(&config, &input_path, output, source_language, target_language),
        Commands::Template {
            input_path,
            metadata_only,
            output,
        } => run_template(&input_path, metadata_only, output),
        Commands::Render {
            input_path,
            job_id,
            tool,
            timeout,
            workspace,
        } => {
            let mut config = config;
            if let Some(tool) = tool {
                config.render.tool_path = Some(tool);
            }
            if let Some(timeout) = timeout {
                config.render.timeout_secs = timeout;
            }
            if let Some(workspace) = workspace {
                config.render.workspace_root = workspace;
            }
            config.validate().context("Configuration validation failed")?;
            run_render(&config, &input_path, job_id).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

// @loads: Config file, then CLI overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(language) = &cli.default_language {
        config.default_language = language.clone();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

// @returns: Inputs of a file or directory path
fn collect_inputs(input_path: &Path) -> Result<Vec<PathBuf>> {
    if input_path.is_file() {
        return Ok(vec![input_path.to_path_buf()]);
    }
    if !input_path.is_dir() {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    let mut inputs = Vec::new();
    for extension in ldom_render::adapters::interlinear::BATCH_EXTENSIONS {
        inputs.extend(FileManager::find_files(input_path, extension)?);
    }
    inputs.sort();
    Ok(inputs)
}

fn progress_bar(total: usize, unit: &str) -> ProgressBar {
    let progress_bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
            unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));
    progress_bar
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            FileManager::write_to_file(path, content)?;
            info!("Success: {:?}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn run_typeset(config: &Config, input_path: &Path, output: Option<PathBuf>, languages: Vec<String>) -> Result<()> {
    let mut options = config.typesetting_options();
    if !languages.is_empty() {
        options.languages = languages;
    }
    let adapter = TypesettingAdapter::new(options);
    let extension = config.render.source_extension.as_str();

    if input_path.is_file() {
        let raw = FileManager::read_to_string(input_path)?;
        let doc = document::parse_source(&raw, &config.default_language)?;
        let source = adapter.transform(&doc)?;
        let target = output.unwrap_or_else(|| {
            FileManager::generate_output_path(input_path, input_path.parent().unwrap_or(Path::new(".")), extension)
        });
        FileManager::write_to_file(&target, &source)?;
        info!("Success: {:?}", target);
        return Ok(());
    }

    let inputs = collect_inputs(input_path)?;
    let output_dir = output.unwrap_or_else(|| input_path.to_path_buf());
    let progress = progress_bar(inputs.len(), "files");
    let mut failures = 0;

    for input in &inputs {
        progress.set_message(input.file_name().unwrap_or_default().to_string_lossy().to_string());
        let result = FileManager::read_to_string(input).and_then(|raw| {
            let doc = document::parse_source(&raw, &config.default_language)?;
            let source = adapter.transform(&doc)?;
            let target = FileManager::generate_output_path(input, &output_dir, extension);
            FileManager::write_to_file(&target, &source)
        });
        if let Err(e) = result {
            failures += 1;
            progress.suspend(|| error!("Failed to typeset {:?}: {}", input, e));
        }
        progress.inc(1);
    }

    progress.finish_with_message("done");
    info!("Typeset {} of {} file(s)", inputs.len() - failures, inputs.len());
    if failures > 0 {
        return Err(anyhow!("{} file(s) failed to typeset", failures));
    }
    Ok(())
}

/// JSON report of an interlinear run
#[derive(Serialize)]
struct InterlinearReport<'a> {
    outputs: &'a BTreeMap<String, InterlinearOutput>,
    failures: BTreeMap<&'a str, String>,
}

impl<'a> From<&'a InterlinearBatch> for InterlinearReport<'a> {
    fn from(batch: &'a InterlinearBatch) -> Self {
        Self {
            outputs: &batch.outputs,
            failures: batch
                .failures
                .iter()
                .map(|(key, error)| (key.as_str(), error.to_string()))
                .collect(),
        }
    }
}

fn run_interlinear(
    config: &Config,
    input_path: &Path,
    output: Option<PathBuf>,
    source_language: Option<String>,
    target_language: Option<String>,
) -> Result<()> {
    let mut options = config.interlinear_options();
    if source_language.is_some() {
        options.source_language = source_language;
    }
    if target_language.is_some() {
        options.target_language = target_language;
    }
    let adapter = InterlinearAdapter::new(options);

    let batch = if input_path.is_dir() {
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("Aligning {:?}", input_path));
        spinner.enable_steady_tick(Duration::from_millis(120));
        let batch = adapter.align_directory(input_path)?;
        spinner.finish_and_clear();
        batch
    } else {
        let raw = FileManager::read_to_string(input_path)?;
        let key = input_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());
        adapter.transform(&BTreeMap::from([(key, raw)]))?
    };

    for (key, failure) in &batch.failures {
        warn!("Alignment failed for {}: {}", key, failure);
    }
    debug!("Aligned {} input(s), {} failure(s)", batch.outputs.len(), batch.failures.len());

    let report = serde_json::to_string_pretty(&InterlinearReport::from(&batch))
        .context("Failed to serialize alignment report")?;
    write_or_print(output.as_deref(), &report)
}

fn run_template(input_path: &Path, metadata_only: bool, output: Option<PathBuf>) -> Result<()> {
    let markup = FileManager::read_to_string(input_path)?;
    let mode = if metadata_only {
        ExtractMode::MetadataOnly
    } else {
        ExtractMode::Full
    };

    let tree = UiTemplateAdapter::new().transform(&TemplateSource::new(markup, mode))?;
    write_or_print(output.as_deref(), &tree.to_json()?)
}

// @returns: Typesetting source for an input, passing raw sources through
fn source_for(config: &Config, adapter: &TypesettingAdapter, input: &Path) -> Result<String> {
    let raw = FileManager::read_to_string(input)?;
    let is_source = input
        .extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&config.render.source_extension));
    if is_source {
        return Ok(raw);
    }

    let doc = document::parse_source(&raw, &config.default_language)?;
    Ok(adapter.transform(&doc)?)
}

async fn run_render(config: &Config, input_path: &Path, job_id: Option<String>) -> Result<()> {
    let runner = JobRunner::new(RunnerConfig::from(&config.render));
    let adapter = TypesettingAdapter::new(config.typesetting_options());
    info!("Rendering in workspace {:?}", runner.workspace().root());

    if input_path.is_file() {
        let source = source_for(config, &adapter, input_path)?;
        let id = job_id.map(JobId::new).unwrap_or_else(|| JobId::for_source(&source));
        let artifact = runner.render(source, id).await?;
        info!("Success: {:?}", artifact.path);
        return Ok(());
    }

    if job_id.is_some() {
        return Err(anyhow!("--job-id applies to a single input only"));
    }

    let mut inputs = collect_inputs(input_path)?;
    inputs.extend(FileManager::find_files(input_path, &config.render.source_extension)?);
    let progress = progress_bar(inputs.len(), "jobs");

    let mut sources = Vec::new();
    let mut failures = 0;
    for input in &inputs {
        match source_for(config, &adapter, input) {
            Ok(source) => sources.push((input.clone(), source)),
            Err(e) => {
                failures += 1;
                progress.inc(1);
                progress.suspend(|| error!("Failed to prepare {:?}: {}", input, e));
            }
        }
    }

    let jobs = runner.spawn_batch(sources);
    debug!("Spawned {} job(s) for {} input(s)", jobs.len(), inputs.len() - failures);

    let waits = jobs.into_iter().map(|mut job| {
        let progress = progress.clone();
        async move {
            let result = job.wait().await;
            progress.inc(job.inputs.len() as u64);
            (job, result)
        }
    });
    let results = join_all(waits).await;
    progress.finish_with_message("done");

    for (job, result) in results {
        match result {
            Ok(artifact) => {
                for input in &job.inputs {
                    info!("Success: {:?} -> {:?}", input, artifact.path);
                }
            }
            Err(_) => failures += job.inputs.len(),
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} input(s) failed to render", failures, inputs.len()));
    }
    Ok(())
}
