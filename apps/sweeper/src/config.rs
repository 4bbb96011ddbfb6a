use pricewatch_core::settings::LifecycleSettings;
use pricewatch_core::Result;

const DEFAULT_DB_PATH: &str = "./db/pricewatch.db";

pub struct Config {
    pub db_path: String,
    pub lifecycle: LifecycleSettings,
}

impl Config {
    /// Reads `.env` if present, then `PW_DB_PATH` and the `PW_*` lifecycle settings.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let db_path = std::env::var("PW_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let lifecycle = LifecycleSettings::from_env()?;
        Ok(Self { db_path, lifecycle })
    }
}
