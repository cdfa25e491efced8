use anyhow::Result;
use clap::{Parser, Subcommand};
use labsfx::app::App;
use labsfx::fx::{ImagePrompt, MusicPrompt};
use labsfx::models::{AspectRatio, Config, ImageModel, MusicModel};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "labsfx")]
#[command(about = "Generate images and music with ImageFX and MusicFX")]
struct CliArgs {
    /// Override FX_RETRIES for this run.
    #[arg(long, global = true)]
    retries: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate images from a text prompt.
    Image {
        prompt: String,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
        /// LANDSCAPE, PORTRAIT, SQUARE, MOBILE_PORTRAIT_THREE_FOUR or MOBILE_LANDSCAPE_FOUR_THREE.
        #[arg(short, long, default_value_t = AspectRatio::Landscape)]
        aspect_ratio: AspectRatio,
        #[arg(short, long, default_value = "IMAGEN_3_5")]
        model: ImageModel,
        #[arg(short, long, default_value_t = 0)]
        seed: i64,
    },
    /// Generate music clips from a text prompt.
    Music {
        prompt: String,
        #[arg(short = 'n', long, default_value_t = 2)]
        count: u32,
        #[arg(short = 'd', long, default_value_t = 30)]
        seconds: u32,
        #[arg(short, long = "loop")]
        looped: bool,
        #[arg(short, long, default_value = "DEFAULT")]
        model: MusicModel,
    },
    /// Download a previously generated image by media id.
    Fetch { media_id: String },
    /// Describe an image file.
    Caption {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labsfx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(retries) = args.retries {
        config.retries = retries;
    }

    let app = App::new(&config)?;

    match run(&app, args.command).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed (status {}): {}", e.status_code(), e);
            std::process::exit(1);
        }
    }
}

async fn run(app: &App, command: Command) -> labsfx::Result<()> {
    match command {
        Command::Image {
            prompt,
            count,
            aspect_ratio,
            model,
            seed,
        } => {
            let prompt = ImagePrompt::new(prompt)?
                .with_count(count)
                .with_aspect_ratio(aspect_ratio)
                .with_model(model)
                .with_seed(seed);
            for path in app.generate_images(prompt).await? {
                println!("{}", path.display());
            }
        }
        Command::Music {
            prompt,
            count,
            seconds,
            looped,
            model,
        } => {
            let prompt = MusicPrompt::new(prompt)?
                .with_generation_count(count)
                .with_sound_length_seconds(seconds)
                .with_loop(looped)
                .with_model(model);
            for path in app.generate_music(prompt).await? {
                println!("{}", path.display());
            }
        }
        Command::Fetch { media_id } => {
            let path = app.fetch_image(&media_id).await?;
            println!("{}", path.display());
        }
        Command::Caption { path, count } => {
            let captions = app.caption_file(&path, count).await?;
            info!("Received {} caption(s)", captions.len());
            for caption in captions {
                println!("{}", caption);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_command() {
        let args = CliArgs::parse_from([
            "labsfx", "image", "a red fox", "-n", "2", "--aspect-ratio", "square",
        ]);
        match args.command {
            Command::Image {
                prompt,
                count,
                aspect_ratio,
                model,
                seed,
            } => {
                assert_eq!(prompt, "a red fox");
                assert_eq!(count, 2);
                assert_eq!(aspect_ratio, AspectRatio::Square);
                assert_eq!(model, ImageModel::Imagen3_5);
                assert_eq!(seed, 0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_music_command_with_global_retries() {
        let args = CliArgs::parse_from(["labsfx", "music", "lofi", "--loop", "--retries", "2"]);
        assert_eq!(args.retries, Some(2));
        match args.command {
            Command::Music {
                count,
                seconds,
                looped,
                ..
            } => {
                assert_eq!(count, 2);
                assert_eq!(seconds, 30);
                assert!(looped);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_aspect_ratio() {
        let parsed = CliArgs::try_parse_from(["labsfx", "image", "fox", "-a", "wide"]);
        assert!(parsed.is_err());
    }
}
