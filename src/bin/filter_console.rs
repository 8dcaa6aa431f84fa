use ads_filters::config::Settings;
use ads_filters::runner::FilterRunner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Pick up APP__* overrides from a local .env, if present
    dotenvy::dotenv().ok();

    // 2. Create Runner
    let args: Vec<String> = std::env::args().collect();
    let runner = match args.get(1) {
        Some(config_path) => {
            if !std::path::Path::new(config_path).exists() {
                eprintln!("Config file '{}' not found.", config_path);
                std::process::exit(1);
            }
            FilterRunner::new(config_path)?
        }
        None => FilterRunner::from_settings(Settings::from_env()?),
    };

    // 3. Run
    if let Err(e) = runner.run().await {
        eprintln!("Filter console error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
