use clap::Parser;
use outpaint_studio::aspect_ratio::{AspectRatio, ASPECT_RATIOS};
use outpaint_studio::config::AppConfig;
use outpaint_studio::session::{Session, SessionState};
use outpaint_studio::transport;
use std::path::PathBuf;

/// Letterboxes an image onto an aspect ratio and optionally has the AI fill the padding.
#[derive(Parser, Debug)]
#[command(name = "pad_canvas", about = "Compose (and optionally AI-fill) a padded canvas")]
struct PadArgs {
    /// Source image (PNG, JPEG, WEBP, BMP, GIF).
    input: PathBuf,

    /// Target aspect ratio: 1:1, 4:3, 16:9, 3:4 or 9:16.
    #[arg(value_parser = parse_ratio)]
    ratio: AspectRatio,

    /// Where to write the canvas, or the AI result with --fill.
    output: PathBuf,

    /// Send the canvas to the image model and save its result. Needs API_KEY.
    #[arg(long)]
    fill: bool,

    /// Extra instructions appended to the fill instruction.
    #[arg(long, default_value = "")]
    prompt: String,
}

fn parse_ratio(name: &str) -> Result<AspectRatio, String> {
    AspectRatio::by_name(name).ok_or_else(|| {
        let known: Vec<&str> = ASPECT_RATIOS.iter().map(|r| r.name()).collect();
        format!("expected one of {}", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = PadArgs::parse();

    let config = AppConfig::load_or_default(&AppConfig::default_path()).with_env_overrides();
    let mut session = Session::new(config.max_canvas_dimension);

    let bytes = std::fs::read(&args.input)?;
    let file_name = args.input.file_name().and_then(|n| n.to_str());
    session.upload(&bytes, file_name)?;
    session.change_ratio(args.ratio)?;
    session.set_prompt(args.prompt);

    if !args.fill {
        let canvas = session.canvas().ok_or("image has no pixels")?;
        canvas.pixels().save(&args.output)?;
        println!(
            "Created {}x{} padded canvas at: {}",
            canvas.dimensions().width,
            canvas.dimensions().height,
            args.output.display()
        );
        return Ok(());
    }

    let orchestrator = config.orchestrator(AppConfig::api_key_from_env()?);
    let ticket = session.submit()?;
    let result = orchestrator.fill(&ticket.request).await;
    session.complete(ticket.id, result);

    match session.state() {
        SessionState::Filled { encoded_image, .. } => {
            let result = transport::parse_data_uri(encoded_image)?;
            std::fs::write(&args.output, &result.bytes)?;
            println!("Saved AI result ({}) to: {}", result.mime_type, args.output.display());
            Ok(())
        }
        SessionState::Errored { message, .. } => Err(message.clone().into()),
        other => Err(format!("fill ended in unexpected state {:?}", other).into()),
    }
}
