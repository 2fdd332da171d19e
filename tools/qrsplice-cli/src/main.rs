//! qrsplice CLI: QR code, overlay, audio mix, and concatenation.
//!
//! Usage:
//!   qrsplice run [OPTIONS]                 Run the full pipeline
//!   qrsplice qr <URL> -o <FILE>            Generate a QR code image
//!   qrsplice overlay <VIDEO> <IMAGE> -o    Overlay an image onto a video
//!   qrsplice mix <VIDEO> <AUDIO> -o        Mix an audio track into a video
//!   qrsplice concat <VIDEO>... -o          Join videos end to end
//!   qrsplice probe <MEDIA>                 Show stream information
//!   qrsplice check                         Check for ffmpeg and ffprobe
//!   qrsplice init-config                   Write the default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qrsplice_common::config::LoggingConfig;
use qrsplice_common::logging::{init_logging, level_for};

mod commands;

use commands::concat::PolicyArg;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "qrsplice",
    about = "Stamp a QR code onto a video, mix in audio, and append a second clip",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full QR -> overlay -> mix -> concat pipeline
    Run(RunArgs),

    #[command(flatten)]
    Tool(ToolCommand),
}

/// Single-stage and housekeeping commands.
#[derive(Subcommand)]
enum ToolCommand {
    /// Generate a QR code PNG, optionally with a centred logo
    Qr {
        /// Data to encode
        url: String,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Logo image to embed at the centre
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Pixels per module
        #[arg(long, default_value = "10")]
        scale: u32,

        /// Quiet zone width in modules
        #[arg(long, default_value = "4")]
        border: u32,
    },

    /// Overlay an image onto a video
    Overlay {
        video: PathBuf,
        image: PathBuf,

        /// Output video path
        #[arg(short, long)]
        output: PathBuf,

        /// Horizontal position expression
        #[arg(long, default_value = "main_w-overlay_w-10")]
        x: String,

        /// Vertical position expression
        #[arg(long, default_value = "10")]
        y: String,
    },

    /// Mix an external audio track into a video
    Mix {
        video: PathBuf,
        audio: PathBuf,

        /// Output video path
        #[arg(short, long)]
        output: PathBuf,

        /// Gain applied to the video's own audio
        #[arg(long, default_value = "1.0")]
        gain_video: f64,

        /// Gain applied to the external track
        #[arg(long, default_value = "0.8")]
        gain_overlay: f64,
    },

    /// Join videos end to end
    Concat {
        /// Videos in playback order
        #[arg(required = true)]
        videos: Vec<PathBuf>,

        /// Output video path
        #[arg(short, long)]
        output: PathBuf,

        /// What to do when the inputs differ
        #[arg(long, value_enum, default_value = "strict")]
        policy: PolicyArg,
    },

    /// Show stream information for a media file
    Probe {
        path: PathBuf,

        /// Print the raw probe as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg and ffprobe are installed
    Check,

    /// Write the default pipeline config
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "qrsplice.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: level_for(cli.verbose).to_string(),
        json: cli.json_logs,
    };

    match cli.command {
        Commands::Run(args) => {
            let config = commands::run::resolve_config(&args)?;
            init_logging(&commands::run::merge_logging(
                logging,
                &config.logging,
                cli.verbose,
            ));
            commands::run::run(config).await
        }
        Commands::Tool(command) => {
            init_logging(&logging);
            dispatch(command).await
        }
    }
}

async fn dispatch(command: ToolCommand) -> anyhow::Result<()> {
    match command {
        ToolCommand::Qr {
            url,
            output,
            logo,
            scale,
            border,
        } => commands::qr::run(url, output, logo, scale, border),
        ToolCommand::Overlay {
            video,
            image,
            output,
            x,
            y,
        } => commands::overlay::run(video, image, output, x, y).await,
        ToolCommand::Mix {
            video,
            audio,
            output,
            gain_video,
            gain_overlay,
        } => commands::mix::run(video, audio, output, gain_video, gain_overlay).await,
        ToolCommand::Concat {
            videos,
            output,
            policy,
        } => commands::concat::run(videos, output, policy).await,
        ToolCommand::Probe { path, json } => commands::probe::run(path, json).await,
        ToolCommand::Check => commands::check::run().await,
        ToolCommand::InitConfig { output, force } => commands::init_config::run(output, force),
    }
}
