use clap::{Parser, Subcommand};
use photofx::effects::{EffectKind, parse_effect};
use photofx::imaging::{BackendError, ImageBackend, RustBackend, operations};
use photofx::{config, output, server};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photofx")]
#[command(about = "HTTP service that applies one image effect per request")]
#[command(long_about = "\
HTTP service that applies one image effect per request

Every effect is a POST route taking a multipart upload (field `file`) and
query parameters, and answering with a PNG:

  curl -F file=@photo.jpg 'http://localhost:8000/rotate?angle=30' -o out.png

Run 'photofx effects' for the list of routes and parameters, and
'photofx gen-config' for a documented photofx.toml.

Logging is controlled with RUST_LOG (default: info).")]
#[command(version = env!("PHOTOFX_VERSION"))]
struct Cli {
    /// Config file [default: ./photofx.toml when present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply one effect to a file, as the matching route would
    Apply {
        /// Effect name as listed by `photofx effects`, e.g. `rotate`
        effect: String,
        /// Input image
        input: PathBuf,
        /// Output PNG
        output: PathBuf,
        /// Effect parameter, repeatable: -p angle=30
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
    /// List effects, their routes and parameters
    Effects,
    /// Print a stock photofx.toml with all options documented
    GenConfig,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Serve { bind, port } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let backend = build_backend(&config)?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(server::run_server(&config, backend))?;
        }
        Command::Apply {
            effect,
            input,
            output: destination,
            params,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            let kind = EffectKind::from_name(&effect)?;
            let query = serde_urlencoded::to_string(&params)?;
            let effect = parse_effect(kind, &query, &config.effect_defaults())?;

            let bytes = std::fs::read(&input)?;
            let backend = build_backend(&config)?;
            let processed = operations::process(backend.as_ref(), &bytes, &effect)?;
            std::fs::write(&destination, &processed.png)?;
            output::print_apply_summary(kind, &input, &destination, &processed);
        }
        Command::Effects => {
            output::print_effect_list(&EffectKind::ALL);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Production backend configured from `[limits]` and `[text]`.
fn build_backend(config: &config::ServiceConfig) -> Result<Arc<dyn ImageBackend>, BackendError> {
    let mut backend = RustBackend::new()?.with_max_dimension(config.limits.max_dimension);
    if let Some(font) = &config.text.font_path {
        backend = backend.with_font_file(font)?;
        tracing::info!("caption font: {}", font.display());
    }
    Ok(Arc::new(backend))
}
