mod platform;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use kamusi_client::ClientHandle;
use kamusi_core::{BatchQueryRequest, Language, QueryRequest, SearchRequest, TOP_K_CHOICES};
use kamusi_logging::{kamusi_info, LogDestination};
use log::LevelFilter;

use platform::app::{run_interactive, Session};
use platform::commands::OneShot;
use platform::config::{AppConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "kamusi", version, about = "Swahili-English dictionary search client")]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Backend base URL; overrides the configuration file.
    #[arg(long, global = true, env = "KAMUSI_API_URL")]
    api_url: Option<String>,
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::Terminal)]
    log: LogTarget,
    /// Repeat for more log output (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a query, showing pipeline progress as it happens.
    Search {
        query: String,
        #[arg(short, value_parser = parse_top_k)]
        k: Option<u32>,
        #[arg(long)]
        language: Option<Language>,
        /// Do not print pipeline steps.
        #[arg(long)]
        hide_steps: bool,
    },
    /// Query without streaming.
    Ask {
        query: String,
        #[arg(short, value_parser = parse_top_k)]
        k: Option<u32>,
        #[arg(long)]
        language: Option<Language>,
    },
    /// Run several queries in one request.
    Batch {
        #[arg(required = true)]
        queries: Vec<String>,
        #[arg(short, value_parser = parse_top_k)]
        k: Option<u32>,
        #[arg(long)]
        language: Option<Language>,
    },
    /// List the closest dictionary entries without generating an answer.
    Similar {
        query: String,
        #[arg(short, value_parser = clap::value_parser!(u32).range(1..))]
        k: Option<u32>,
    },
    /// Show backend health.
    Health {
        /// Keep polling at the configured interval.
        #[arg(long)]
        watch: bool,
    },
    /// Read queries from stdin, one per line.
    Interactive,
    /// Manage the configuration file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a configuration file with the default values.
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogTarget {
    Off,
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Off => LogDestination::Off,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

fn parse_top_k(raw: &str) -> Result<u32, String> {
    match raw.parse::<u32>() {
        Ok(k) if TOP_K_CHOICES.contains(&k) => Ok(k),
        _ => Err(format!("expected one of {TOP_K_CHOICES:?}")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    kamusi_logging::initialize(cli.log.into(), level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if let Command::Config(ConfigCommand::Init { force }) = cli.command {
        AppConfig::write_default(&cli.config, force)?;
        println!("Wrote {}", cli.config.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = AppConfig::load(&cli.config)?.with_api_url(cli.api_url);
    kamusi_info!("Using backend {}", config.api_url);
    let stdout = io::stdout();

    match cli.command {
        Command::Search {
            query,
            k,
            language,
            hide_steps,
        } => {
            let mut form = config.search_form();
            form.k = k.unwrap_or(form.k);
            form.language = language.unwrap_or(form.language);
            form.show_pipeline_steps = form.show_pipeline_steps && !hide_steps;

            let client = ClientHandle::new(config.client_settings())?;
            let mut session = Session::new(form, client, stdout.lock());
            if session.search(&query)?.is_some() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Ask { query, k, language } => {
            let request = QueryRequest {
                query,
                k: Some(k.unwrap_or(config.default_k)),
                language: Some(language.unwrap_or(config.default_language)),
            };
            OneShot::new(config.client_settings())?.ask(request, &mut stdout.lock())?;
        }
        Command::Batch {
            queries,
            k,
            language,
        } => {
            let request = BatchQueryRequest {
                queries,
                k: Some(k.unwrap_or(config.default_k)),
                language: Some(language.unwrap_or(config.default_language)),
            };
            OneShot::new(config.client_settings())?.batch(request, &mut stdout.lock())?;
        }
        Command::Similar { query, k } => {
            let request = SearchRequest {
                query,
                k: Some(k.unwrap_or(config.default_k)),
            };
            OneShot::new(config.client_settings())?.similar(request, &mut stdout.lock())?;
        }
        Command::Health { watch } => {
            let settings = config.client_settings();
            let interval = settings.health_interval;
            let client = ClientHandle::new(settings)?;
            let mut session = Session::new(config.search_form(), client, stdout.lock());
            if watch {
                session.watch_health(interval)?;
            } else {
                session.check_health()?;
            }
        }
        Command::Interactive => {
            let settings = config.client_settings();
            let interval = settings.health_interval;
            let client = ClientHandle::new(settings)?;
            let mut session = Session::new(config.search_form(), client, io::stdout());
            run_interactive(&mut session, interval)?;
        }
        Command::Config(_) => {}
    }
    Ok(ExitCode::SUCCESS)
}
