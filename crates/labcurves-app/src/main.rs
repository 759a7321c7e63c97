//! Lab Curves - command-line driver
//!
//! Loads an image file into the in-memory host, runs the registered curves
//! procedure on it exactly as a host application would, and writes the
//! flattened result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use labcurves_host::{Host, MemoryHost};
use labcurves_plugin::registry::LAB_CURVES_PROCEDURE;
use labcurves_plugin::{PluginConfig, ProcedureRegistry, SourceMode};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Process a composite of all visible layers.
    Visible,
    /// Process the current layer only.
    Current,
}

impl From<Mode> for SourceMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Visible => SourceMode::NewFromVisible,
            Mode::Current => SourceMode::CurrentLayer,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Apply L*a*b* curves to an image with an external tool")]
struct Args {
    /// Image to process.
    #[arg(required_unless_present = "describe")]
    input: Option<PathBuf>,

    /// Where to write the flattened result (format from extension).
    #[arg(short, long, required_unless_present = "describe")]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Mode::Visible)]
    mode: Mode,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// External curves binary, overriding configuration.
    #[arg(long)]
    tool: Option<PathBuf>,

    /// Argument passed to the tool before the file path. Repeatable.
    #[arg(long = "tool-arg")]
    tool_args: Vec<String>,

    /// Accept a run where the tool leaves the file untouched.
    #[arg(long)]
    allow_unchanged: bool,

    /// Directory for the temporary exchange file.
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Print the registered procedures as JSON and exit.
    #[arg(long)]
    describe: bool,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = ProcedureRegistry::with_builtin();
    if args.describe {
        println!("{}", registry.describe_json()?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => PluginConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => PluginConfig::default(),
    };
    if let Some(tool) = &args.tool {
        config.tool.binary = Some(tool.clone());
    }
    if !args.tool_args.is_empty() {
        config.tool.args = args.tool_args.clone();
    }
    if args.allow_unchanged {
        config.tool.require_rewrite = false;
    }

    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        anyhow::bail!("both INPUT and --output are required");
    };

    let mut host = match &args.temp_dir {
        Some(dir) => MemoryHost::new(dir),
        None => MemoryHost::default(),
    };
    let image = host
        .load_image(input)
        .with_context(|| format!("opening {}", input.display()))?;
    let drawable = host.active_drawable(image)?;

    let mode = SourceMode::from(args.mode);
    registry
        .run(
            LAB_CURVES_PROCEDURE,
            &mut host,
            image,
            drawable,
            &[mode.as_param()],
            &config,
        )
        .context("Lab curves procedure failed")?;

    for layer in host.layer_ids(image)? {
        let name = host.layer_name(layer)?;
        info!(%layer, name, "Layer");
    }

    host.export_flattened(image, output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(output = %output.display(), "Done");
    Ok(())
}
