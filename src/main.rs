//! Startup glue for the shelfgrab exporter: configuration, tracing, and the
//! end-of-run summary. All pipeline behavior lives in the library.

use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing_subscriber::FmtSubscriber;
use url::Url;

use shelfgrab::catalog::GeoPoint;
use shelfgrab::client::{ApiClient, ApiConfig};
use shelfgrab::errorlog::ErrorLog;
use shelfgrab::export::{ExportPipeline, output_path};
use shelfgrab::progress::StdOutSink;
use shelfgrab::types::ExportError;

const DEFAULT_BASE_URL: &str = "https://gvg1d6u3wk.execute-api.ap-southeast-1.amazonaws.com/prod";
const DEFAULT_API_KEY: &str = "HdI3wa6E3L6ECd1XYZZjJ92d4wUGOD4X6CrtO6MM";
const DEFAULT_CLIENT_TOKEN: &str =
    "0115f406e71219ec9ea58e2eaaa4480ef966bdc42e245ec4bf601b23f07bd48e";

// Fixed query coordinate; kept pinned because it is known to return stores.
const DEFAULT_LAT: f64 = 3.058623;
const DEFAULT_LON: f64 = 101.596634;

const DEFAULT_OUT_DIR: &str = "data";

#[tokio::main]
async fn main() -> Result<(), ExportError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let base_url = env::var("SHELFGRAB_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let base_url = Url::parse(&base_url)?;
    let api_key = env::var("SHELFGRAB_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string());
    let client_token =
        env::var("SHELFGRAB_CLIENT_TOKEN").unwrap_or_else(|_| DEFAULT_CLIENT_TOKEN.to_string());

    let origin = GeoPoint {
        lat: env_f64("SHELFGRAB_LAT", DEFAULT_LAT),
        lon: env_f64("SHELFGRAB_LON", DEFAULT_LON),
    };

    let out_dir = env::var("SHELFGRAB_OUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUT_DIR));

    let client = ApiClient::new(&ApiConfig {
        base_url,
        api_key,
        client_token,
    })?;

    let started_at = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let errors = ErrorLog::new(out_dir.join(format!("errors-{started_at}.jsonl")));
    let output = output_path(&out_dir, "products", "csv");

    let pipeline = ExportPipeline::new(client, errors.clone(), origin);
    let mut progress = StdOutSink::default();

    let start = Instant::now();
    let summary = pipeline.run(&output, &mut progress).await?;
    let duration = start.elapsed();

    println!("\n✅ Export complete!");
    println!("  stores          : {}", summary.stores);
    println!("  taxonomy nodes  : {}", summary.taxonomies);
    println!("  product rows    : {}", summary.products_written);
    println!("  failed fetches  : {}", summary.failed_fetches);
    println!("  duration        : {}", format_duration(duration));
    println!("  output file     : {}", output.display());
    if summary.failed_fetches > 0 {
        println!("  error log       : {}", errors.path().display());
    }

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(default)
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    let minutes = secs / 60;
    let seconds = secs % 60;
    format!("{}m {}.{:03}s", minutes, seconds, millis)
}
