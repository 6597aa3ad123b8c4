mod classify;
mod config;
mod dedupe;
mod domain;
mod format;
mod github;
mod pipeline;
mod render;
mod summary;
mod timeline;

use std::{env, process::ExitCode};

use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt};

use config::{DEFAULT_BOT_LOGIN, DEFAULT_TITLE_WIDTH, PipelineConfig};
use github::{FetchError, GitHubSource};
use pipeline::ActivitySnapshot;

#[derive(Parser)]
#[command(name = "ghstatus")]
#[command(about = "Summarize open pull requests, issues and mentions that need your attention")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
    /// Output format; `auto` picks the widget when run by xbar or SwiftBar
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    format: OutputFormat,
    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = github::DEFAULT_API_URL)]
    api_url: String,
    /// Author login whose pull requests and issues are ignored
    #[arg(long, default_value = DEFAULT_BOT_LOGIN)]
    bot_login: String,
    /// Longest title shown before it is shortened with `...`
    #[arg(long, default_value_t = DEFAULT_TITLE_WIDTH, value_parser = parse_title_width)]
    max_title: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Auto,
    Xbar,
    Console,
}

impl OutputFormat {
    fn resolve(self, menu_bar_host: bool) -> OutputFormat {
        match self {
            OutputFormat::Auto if menu_bar_host => OutputFormat::Xbar,
            OutputFormat::Auto => OutputFormat::Console,
            explicit => explicit,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug || env::var_os("DEBUG").is_some());

    let format = cli.format.resolve(is_menu_bar_host());
    let config = PipelineConfig::new(cli.bot_login.clone());
    debug!(?format, api_url = %cli.api_url, "starting cycle");

    let outcome = collect_activity(&cli, &config);
    match format {
        OutputFormat::Xbar => {
            match outcome {
                Ok(snapshot) => println!("{}", render::render_widget(&snapshot, cli.max_title)),
                Err(err) => {
                    error!("{err}");
                    println!("{}", render::render_widget_error(&err.to_string()));
                }
            }
            ExitCode::SUCCESS
        }
        _ => match outcome {
            Ok(snapshot) => {
                println!("{}", render::render_console(&snapshot, cli.max_title));
                if snapshot.all_failed() {
                    eprintln!("Error: every GitHub source failed");
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            }
            Err(err) => {
                eprintln!("Error: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

fn collect_activity(cli: &Cli, config: &PipelineConfig) -> Result<ActivitySnapshot, FetchError> {
    let client = github::build_client()?;
    let token = cli.token.as_deref().unwrap_or_default();
    let account = github::verify_account(&client, &cli.api_url, token)?;
    let source = GitHubSource::new(client, &cli.api_url, account);
    Ok(pipeline::run_cycle(&source, config, Utc::now()))
}

fn init_tracing(debug: bool) {
    let default_directive = if debug { "ghstatus=debug" } else { "ghstatus=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

fn is_menu_bar_host() -> bool {
    env::var_os("SWIFTBAR").is_some() || env::var_os("BITBAR").is_some()
}

fn parse_title_width(raw: &str) -> Result<usize, String> {
    let width: usize = raw
        .parse()
        .map_err(|err| format!("not a number: {err}"))?;
    if width < 4 {
        return Err("must be at least 4 to leave room for `...`".to_owned());
    }
    Ok(width)
}
