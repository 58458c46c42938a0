use anyhow::{Context, bail};

/// Required runtime configuration, resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tacticus API key, sent as the `X-API-KEY` header.
    pub api_key: String,
    /// Id of the target Google spreadsheet.
    pub spreadsheet_id: String,
    /// Service-account credentials, as raw JSON.
    pub google_credentials: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_key: env_or_file("TACTICUS_API_KEY")?,
            spreadsheet_id: env_or_file("GUILD_RAID_SPREADSHEET_ID")?,
            google_credentials: env_or_file("GOOGLE_API_CREDENTIALS")?,
        })
    }
}

/// Resolve a configuration value, checking `<NAME>_FILE` (a path to a file
/// holding the value, the docker-secrets convention) before `<NAME>` itself.
/// A missing or empty value is an error.
pub fn env_or_file(name: &str) -> anyhow::Result<String> {
    let file_var = format!("{name}_FILE");
    let value = if let Ok(path) = std::env::var(&file_var) {
        std::fs::read_to_string(&path)
            .with_context(|| format!("{file_var} points at unreadable file {path}"))?
            .trim()
            .to_string()
    } else {
        std::env::var(name).unwrap_or_default()
    };

    if value.is_empty() {
        bail!("environment variable {name} is required");
    }
    Ok(value)
}
