use clap::{Parser, Subcommand};
use playdeck::app::{self, AppOptions, SessionLog};
use playdeck::config;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "playdeck")]
#[command(about = "Playlist player with shuffle and loop modes")]
#[command(version)]
struct Cli {
    /// Library index file (defaults to the config directory)
    #[arg(long, global = true, env = "PLAYDECK_LIBRARY")]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive player (the default)
    Play {
        /// Milliseconds between end-of-track checks
        #[arg(long)]
        poll_ms: Option<u64>,

        /// Play without a sound device
        #[arg(long)]
        headless: bool,

        /// Simulated track length in seconds when playing without sound
        #[arg(long)]
        track_seconds: Option<u64>,
    },
    /// Add audio files or folders to the last used playlist
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Rename the last used playlist
    Rename { name: String },
    /// Print the last used playlist
    Show,
}

fn main() -> anyhow::Result<()> {
    let log = SessionLog::default();
    let writer = log.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playdeck=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(move || writer.clone()),
        )
        .init();

    let cli = Cli::parse();
    let library = match cli.library {
        Some(path) => path,
        None => config::library_path()?,
    };

    let command = cli.command.unwrap_or(Command::Play {
        poll_ms: None,
        headless: false,
        track_seconds: None,
    });

    match command {
        Command::Play {
            poll_ms,
            headless,
            track_seconds,
        } => app::run(AppOptions {
            library,
            poll_interval: poll_ms
                .map(Duration::from_millis)
                .unwrap_or(config::POLL_INTERVAL),
            headless,
            track_length: track_seconds.map(Duration::from_secs),
            log,
        }),
        Command::Add { paths } => {
            let added = app::add_tracks(&library, &paths)?;
            println!("Added {added} tracks");
            Ok(())
        }
        Command::Rename { name } => app::rename(&library, &name),
        Command::Show => {
            print!("{}", app::show(&library)?);
            Ok(())
        }
    }
}
