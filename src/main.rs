// ABOUTME: Entry point for the capflow command line tool
// ABOUTME: Loads .env values and hands control to the CLI application

use anyhow::Result;
use capflow::cli::App;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    App::run_from_args().await
}
