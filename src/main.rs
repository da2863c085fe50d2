use std::io::Write;
use std::path::Path;

use chatsvg::config::Config;
use chatsvg::discord::{DiscordClient, parse_id};
use chatsvg::images::{HttpImageSource, ImageCache};
use chatsvg::transcript::Transcriber;
use clap::Parser;

/// Render every message of a Discord channel to an SVG image
#[derive(Parser, Debug)]
#[command(name = "chatsvg")]
#[command(version)]
#[command(about = "Render a chat channel's history to SVG images, one per message", long_about = None)]
struct Args {
    /// Bot token used to authenticate with the chat service
    #[arg(value_name = "TOKEN")]
    token: String,

    /// Numeric id of the channel to transcribe
    #[arg(value_name = "CHANNEL_ID")]
    channel_id: u64,
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only file names.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (config, config_path) = Config::load(Path::new("."))?;
    if let Some(path) = &config_path {
        tracing::info!(path = %path.display(), "loaded config");
    }
    let theme = config.theme.resolve()?;

    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        format!(
            "Failed to create output directory {}: {}",
            config.output_dir.display(),
            e
        )
    })?;

    let client = DiscordClient::new(&args.token, &config.api_base);
    let channel = client
        .channel(args.channel_id)
        .map_err(|e| format!("Failed to look up channel {}: {}", args.channel_id, e))?;
    tracing::info!(
        channel_id = args.channel_id,
        name = channel.name.as_deref().unwrap_or("-"),
        "logged in"
    );
    let channel_id = parse_id(&channel.id).map_err(|e| e.to_string())?;

    let mut directory = client
        .load_directory(&channel)
        .map_err(|e| format!("Failed to load guild directory: {}", e))?;

    let images = ImageCache::new(
        HttpImageSource::new(),
        config.image_cache.capacity,
        config.image_cache.ttl(),
    );
    let transcriber = Transcriber {
        theme: &theme,
        line_width: config.line_width,
        output_dir: &config.output_dir,
        max_attempts: config.max_attempts,
        images: &images,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = transcriber
        .run(
            client.history(channel_id, config.page_size),
            &mut directory,
            &mut out,
        )
        .map_err(|e| format!("Failed to read channel history: {}", e))?;

    tracing::info!(
        written = summary.written,
        failed = summary.failed.len(),
        "transcription finished"
    );
    for failed in &summary.failed {
        tracing::warn!(id = failed.id, error = %failed.error, "not transcribed");
    }

    writeln!(out, "\nDone!").map_err(|e| format!("Failed to write to stdout: {}", e))?;
    Ok(())
}
