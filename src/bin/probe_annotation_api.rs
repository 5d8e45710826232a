//! Fetch the annotation of one surface and keep it as a sample.

use clap::Parser;
use saintsophia::config::Settings;
use saintsophia::telemetry;
use saintsophia::tools::{annotation_count, AnnotationSource, FetchOutcome, HttpAnnotationSource};
use std::path::PathBuf;

const PREVIEW_CHARS: usize = 500;

#[derive(Parser)]
#[command(version, about = "Probe the annotation API with a single surface")]
struct Cli {
    #[arg(long, default_value = "208-02")]
    surface: String,
    #[arg(short, long, default_value = "sample_annotation.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(None);

    let settings = Settings::from_env()?;
    let source = HttpAnnotationSource::new(&settings.annotation_api)?;
    println!("GET {}?surface={}", source.endpoint(), cli.surface);
    match source.fetch(&cli.surface).await? {
        FetchOutcome::Found(body) => {
            std::fs::write(&cli.output, &body)?;
            println!("Saved sample to {}", cli.output.display());
            match annotation_count(&body) {
                Some(n) => println!("Annotations: {}", n),
                None => println!("Response is not JSON"),
            }
            let text = String::from_utf8_lossy(&body);
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            println!("{}", preview);
        }
        FetchOutcome::NotFound => println!("No annotation for surface {}", cli.surface),
    }
    Ok(())
}
