//! Command-line front end for the generation pipeline.
//!
//! Reads the workflow and input files from disk, runs one generation
//! against the server configured via `COMFYUI_BASE_URL` /
//! `COMFYUI_API_KEY`, and writes the produced video next to the
//! inputs (or to `--output`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portray_comfyui::inputs::ImageSource;
use portray_comfyui::{GenerationRequest, Generator};
use portray_core::config::ComfyUiConfig;
use portray_core::media::MediaPayload;

const USAGE: &str = "Usage: portray <workflow.json> <image-file> \
    [--audio <file>] [--timeout <minutes>] [--output <path>]";

struct CliArgs {
    workflow: PathBuf,
    image: PathBuf,
    audio: Option<PathBuf>,
    timeout_minutes: u64,
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portray=info,portray_comfyui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args(std::env::args().skip(1).collect())?;

    let config = ComfyUiConfig::from_env();
    let generator = Generator::new(&config)?;

    generator
        .check_health()
        .await
        .with_context(|| format!("ComfyUI at {} is not reachable", config.base_url))?;
    tracing::info!(base_url = %config.base_url, "ComfyUI is reachable");

    let workflow_json = tokio::fs::read_to_string(&args.workflow)
        .await
        .with_context(|| format!("failed to read workflow {}", args.workflow.display()))?;

    let mut attachments = vec![load_attachment(&args.image).await?];
    let image = ImageSource::Attachment(attachments[0].file_name.clone());

    let audio_attachment = match &args.audio {
        Some(path) => {
            let payload = load_attachment(path).await?;
            let name = payload.file_name.clone();
            attachments.push(payload);
            Some(name)
        }
        None => None,
    };

    let request = GenerationRequest {
        workflow_json,
        image,
        audio_attachment,
        attachments,
        timeout_minutes: args.timeout_minutes,
    };

    let media = generator.generate(&request).await?;

    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&media.file_name));
    tokio::fs::write(&output_path, &media.data)
        .await
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    tracing::info!(
        path = %output_path.display(),
        mime = %media.mime_type,
        size = %media.file_size,
        "Generated media written",
    );
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut positional = Vec::new();
    let mut audio = None;
    let mut timeout_minutes = 10u64;
    let mut output = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--audio" => {
                let value = iter.next().context("--audio requires a file path")?;
                audio = Some(PathBuf::from(value));
            }
            "--timeout" => {
                let value = iter.next().context("--timeout requires a minute count")?;
                timeout_minutes = value
                    .parse()
                    .context("--timeout must be a positive integer")?;
            }
            "--output" => {
                let value = iter.next().context("--output requires a file path")?;
                output = Some(PathBuf::from(value));
            }
            other if other.starts_with("--") => bail!("unknown flag '{other}'\n{USAGE}"),
            other => positional.push(PathBuf::from(other)),
        }
    }

    let [workflow, image] = <[PathBuf; 2]>::try_from(positional)
        .map_err(|_| anyhow::anyhow!("expected a workflow and an image file\n{USAGE}"))?;

    Ok(CliArgs {
        workflow,
        image,
        audio,
        timeout_minutes,
        output,
    })
}

/// Read a file into an attachment, deriving the MIME type from its
/// extension.
async fn load_attachment(path: &Path) -> anyhow::Result<MediaPayload> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("input path has no file name")?;

    Ok(MediaPayload {
        mime_type: guess_mime(&file_name).to_string(),
        file_name,
        data,
    })
}

/// Minimal extension-to-MIME mapping for local input files.
fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}
