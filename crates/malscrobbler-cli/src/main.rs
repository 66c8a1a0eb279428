use clap::{ArgAction, Parser, Subcommand};
use commands::{check, config, serve};

mod commands;
mod logging;
mod output;
mod server;

#[derive(Parser)]
#[command(name = "malscrobbler")]
#[command(about = "malscrobbler - Scrobble Plex episodes to your MyAnimeList")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for Plex webhooks and update MyAnimeList
    #[command(long_about = "Verify the Plex and MyAnimeList credentials, then listen for Plex webhooks. Every finished episode is reconciled against your MyAnimeList entry for the series. Runs until interrupted with Ctrl-C.")]
    Serve {
        /// Address to listen on (overrides server.bind_address)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Port to listen on (replaces the port of the bind address)
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,

        /// Only scrobble events from this Plex account
        #[arg(long, value_name = "NAME")]
        viewer: Option<String>,

        /// Log decisions without updating MyAnimeList (also reacts to pause events)
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,

        /// Write logs to a daily-rotating file instead of stderr
        #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
        log_file: Option<String>,
    },
    /// Configure credentials and settings
    #[command(long_about = "Manage configuration and credentials for malscrobbler. Use subcommands to view the configuration or to set up Plex and MyAnimeList.")]
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Show the MyAnimeList mapping stored on a Plex season
    #[command(long_about = "Resolve the JSON mapping stored in a Plex season's summary and show the matching MyAnimeList entry. Useful when writing the mapping for a new season.")]
    Check {
        /// Plex rating key of the season
        season_id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    #[command(long_about = "Display the current configuration. Tokens are masked unless --full is given.")]
    Show {
        /// Show full configuration including masked secrets
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure Plex (server URL and token)
    #[command(long_about = "Configure the Plex server URL and API token. The token can be found by inspecting network requests in Plex Web (X-Plex-Token).")]
    Plex {
        /// Plex API Token (if not provided, will prompt)
        #[arg(long)]
        token: Option<String>,

        /// Plex Server URL (if not provided, will prompt)
        #[arg(long)]
        server_url: Option<String>,
    },

    /// Configure MyAnimeList (client id and OAuth tokens)
    #[command(long_about = "Configure the MyAnimeList API client id and OAuth tokens. Create an API client at https://myanimelist.net/apiconfig first.")]
    Mal {
        /// MyAnimeList Client ID (if not provided, will prompt)
        #[arg(long)]
        client_id: Option<String>,

        /// OAuth access token (if not provided, will prompt)
        #[arg(long)]
        access_token: Option<String>,

        /// OAuth refresh token (if not provided, will prompt)
        #[arg(long)]
        refresh_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Serve {
            bind,
            port,
            viewer,
            dry_run,
            log_file,
        } => {
            let options = serve::ServeOptions {
                bind,
                port,
                viewer,
                dry_run,
                log_file,
            };
            serve::run_serve(options, cli.verbose, cli.quiet, &output).await
        }
        Commands::Config { cmd } => {
            logging::init_logging(cli.verbose, cli.quiet).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
            config::run_config(cmd, &output).await
        }
        Commands::Check { season_id } => {
            logging::init_logging(cli.verbose, cli.quiet).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
            check::run_check(&season_id, &output).await
        }
    }
}
