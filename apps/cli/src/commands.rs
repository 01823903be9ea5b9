//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use qanary_gerbil_core::GerbilAdapter;
use qanary_gerbil_shared::{AppConfig, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// qanary-gerbil: run Qanary pipelines for the GERBIL QA benchmark.
#[derive(Parser)]
#[command(
    name = "qanary-gerbil",
    version,
    about = "Expose Qanary question answering pipelines as GERBIL QA endpoints.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.qanary-gerbil/qanary-gerbil.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Orchestration service base URL (overrides `pipeline.host`).
    #[arg(long, env = "QANARY_PIPELINE_HOST", global = true)]
    pub pipeline_host: Option<String>,

    /// Orchestration service port (overrides `pipeline.port`).
    #[arg(long, env = "QANARY_PIPELINE_PORT", global = true)]
    pub pipeline_port: Option<u16>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Serve the GERBIL endpoints over HTTP.
    Serve {
        /// Socket address to bind (overrides `server.bind`).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print the GERBIL endpoint URL for a component selection.
    Generate {
        /// Component names, in pipeline order.
        components: Vec<String>,
    },

    /// Run one benchmark question and print the GERBIL response.
    Execute {
        /// Natural-language question.
        #[arg(short, long)]
        question: String,

        /// Language tag of the question.
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Component list, e.g. "wdaqua-core0, QueryExecuter".
        #[arg(short, long)]
        components: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so that
/// `execute` output can be piped.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "qanary_gerbil=info",
        1 => "qanary_gerbil=debug",
        _ => "qanary_gerbil=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Serve { bind } => cmd_serve(&config, bind.as_deref()).await,
        Command::Generate { components } => cmd_generate(&config, &components),
        Command::Execute {
            question,
            language,
            components,
        } => cmd_execute(&config, &question, &language, &components).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Config file (or defaults), then CLI flags on top.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    if let Some(host) = &cli.pipeline_host {
        config.pipeline.host = host.clone();
    }
    if let Some(port) = cli.pipeline_port {
        config.pipeline.port = port;
    }

    config.validate()?;
    Ok(config)
}

async fn cmd_serve(config: &AppConfig, bind: Option<&str>) -> Result<()> {
    let adapter = GerbilAdapter::from_config(config)?;
    let bind = bind.unwrap_or(&config.server.bind);

    info!(
        bind,
        pipeline_host = %config.pipeline.host,
        pipeline_port = config.pipeline.port,
        "starting GERBIL adapter"
    );

    crate::server::serve(adapter, bind).await
}

fn cmd_generate(config: &AppConfig, components: &[String]) -> Result<()> {
    let adapter = GerbilAdapter::from_config(config)?;
    let endpoint = adapter.generate_endpoint(components)?;
    println!("{endpoint}");
    Ok(())
}

async fn cmd_execute(
    config: &AppConfig,
    question: &str,
    language: &str,
    components: &str,
) -> Result<()> {
    let adapter = GerbilAdapter::from_config(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .map_err(|e| eyre!("invalid progress template: {e}"))?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(format!("Running pipeline [{components}]"));
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let result = adapter
        .execute_benchmark(question, language, components)
        .await;
    spinner.finish_and_clear();

    let response = result?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let dir = std::env::temp_dir().join(format!("qanary-gerbil-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[pipeline]\nhost = \"http://file.example.org\"\nport = 8181\ntimeout_secs = 42\n",
        )
        .expect("write config");

        let cli = Cli::try_parse_from([
            "qanary-gerbil",
            "--config",
            path.to_str().expect("utf-8 temp path"),
            "--pipeline-host",
            "http://qanary.example.org",
            "--pipeline-port",
            "9000",
            "generate",
            "A",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.pipeline.host, "http://qanary.example.org");
        assert_eq!(config.pipeline.port, 9000);
        assert_eq!(config.pipeline.timeout_secs, 42);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn execute_requires_question_and_components() {
        assert!(Cli::try_parse_from(["qanary-gerbil", "execute", "--question", "q"]).is_err());
        let cli = Cli::try_parse_from([
            "qanary-gerbil",
            "execute",
            "-q",
            "Who is the president of France?",
            "-c",
            "wdaqua-core0, QueryExecuter",
        ])
        .unwrap();
        match cli.command {
            Command::Execute { language, .. } => assert_eq!(language, "en"),
            _ => panic!("expected execute"),
        }
    }
}
