use karaoke_jukebox::JukeboxConfig;
use karaoke_jukebox::jukebox::{initialize, logging::init_logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Config first so a .env file can set ENVIRONMENT before logging starts
    let config = JukeboxConfig::from_env()?;
    init_logging();

    initialize(config).await?;

    Ok(())
}
