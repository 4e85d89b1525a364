use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use meal_capture::backend::http::HttpBackend;
use meal_capture::capture::image::ImageFile;
use meal_capture::config::{BackendConfig, ControllerConfig, DeviceClass};
use meal_capture::{AnalysisResult, CaptureController, CaptureResult, Notice, NoticeLevel, Notifier};
use tracing_subscriber::EnvFilter;

/// Identify a dish from a photo and log it as a meal.
#[derive(Parser, Debug)]
#[command(name = "mealcap")]
#[command(about = "🍽️  Identify a dish from a photo and log the meal")]
#[command(long_about = "Upload a meal photo, identify the dish with the remote inference function,
and store the result in your meal log. Backend settings can be passed as flags or
MEALCAP_* environment variables.")]
struct Args {
    /// Image file to analyze
    #[arg(help = "Path to the meal photo (JPEG, PNG, WebP, ...)")]
    image: PathBuf,

    /// Backend project URL
    #[arg(long, env = "MEALCAP_URL")]
    url: String,

    /// Public API key
    #[arg(long, env = "MEALCAP_ANON_KEY", hide_env_values = true)]
    anon_key: String,

    /// Access token of the signed-in user
    #[arg(long, env = "MEALCAP_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Storage bucket for uploaded images
    #[arg(long, env = "MEALCAP_BUCKET", default_value = "meal-images")]
    bucket: String,

    /// Name of the dish identification function
    #[arg(long, default_value = "identify-dish")]
    function: String,

    /// Table receiving meal rows
    #[arg(long, default_value = "meals")]
    table: String,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

/// Prints notices for a terminal user.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let marker = match notice.level {
            NoticeLevel::Success => "✓",
            NoticeLevel::Warning => "!",
            NoticeLevel::Error => "✗",
        };
        eprintln!("{} {}: {}", marker, notice.title, notice.message);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut backend_config = BackendConfig::new(args.url, args.anon_key);
    backend_config.access_token = args.token;
    backend_config.identify_function = args.function;
    backend_config.meals_table = args.table;
    let backend = HttpBackend::new(backend_config)?;

    let config = ControllerConfig::new(DeviceClass::Desktop, args.bucket);
    let as_json = args.json;
    let mut controller = CaptureController::builder()
        .with_config(config)
        .with_backend(backend)
        .with_notifier(Arc::new(ConsoleNotifier))
        .on_complete(move |meal| match render(&meal, as_json) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to encode result: {}", e),
        })
        .build()?;

    let file = ImageFile::from_path(&args.image).await?;
    let outcome = controller.submit_file(file).await;
    Ok(exit_code(&outcome))
}

/// Format a result for the terminal, as JSON or aligned text.
fn render(meal: &AnalysisResult, as_json: bool) -> CaptureResult<String> {
    if as_json {
        return Ok(serde_json::to_string_pretty(meal)?);
    }
    Ok([
        format!("Dish:       {}", meal.dish_name),
        format!("Calories:   {}", meal.calories),
        format!("Protein:    {} g", meal.protein),
        format!("Carbs:      {} g", meal.carbs),
        format!("Fat:        {} g", meal.fat),
        format!("Confidence: {:.0}%", meal.confidence * 100.0),
        format!("Image:      {}", meal.image_url),
    ]
    .join("\n"))
}

// Failures already reached the user through the notifier.
fn exit_code(outcome: &CaptureResult<AnalysisResult>) -> ExitCode {
    match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
