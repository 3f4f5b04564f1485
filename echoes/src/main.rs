//! Echoes of the Bell terminal adventure.
//!
//! A line-oriented frontend for the story engine. Choices are picked by
//! number, anything else is sent as a free-text action.
//!
//! ```bash
//! CHAT_API_KEY=... cargo run -p echoes
//! ```

mod headless;

use echoes_core::{Game, StoryConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    init_tracing();

    let config = StoryConfig::from_env();
    if config.chat_api_key.is_none() {
        eprintln!("Warning: CHAT_API_KEY is not set, the storyteller will fail every turn.");
        eprintln!("Set it in a .env file or with: export CHAT_API_KEY=your_key_here");
    }

    info!(cache_dir = ?config.cache_dir, "Starting Echoes of the Bell");
    let game = Game::new(config).await;
    headless::run(game).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_help() {
    println!("Echoes of the Bell: A School Rescue");
    println!();
    println!("USAGE:");
    println!("    echoes [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help    Print this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    CHAT_API_KEY             Key for the storyteller and vector scenes");
    println!("    IMAGE_API_KEY            Key for bitmap illustrations");
    println!("    TEXT_MODEL               Storyteller model");
    println!("    IMAGE_MODEL              Bitmap model");
    println!("    GEN_SVG_IMAGE            'false' draws bitmaps instead of vector scenes");
    println!("    ILLUSTRATION_CACHE_DIR   Illustration cache directory (default: .echoes)");
    println!("    RUST_LOG                 Log filter (default: info)");
}
