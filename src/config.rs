use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "photo-tooter";

/// Credentials for the Mastodon instance.
///
/// # Loading
///
/// ```rust,no_run
/// use photo_tooter::config::Config;
///
/// // From ~/.config/photo-tooter/config.json
/// let config = Config::load(None).unwrap();
///
/// // Or build one and save it
/// let config = Config::new("https://mastodon.social/", " token ");
/// assert_eq!(config.base_url, "https://mastodon.social");
/// config.save(None).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Instance URL without trailing slash, e.g. `https://mastodon.social`.
    pub base_url: String,
    /// Access token with `write:statuses` and `write:media` scopes.
    pub access_token: String,
}

/// On-disk shape, so a missing field gets a friendlier message than serde's.
#[derive(Deserialize)]
struct StoredConfig {
    base_url: Option<String>,
    access_token: Option<String>,
}

impl Config {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            access_token: access_token.trim().to_string(),
        }
    }

    /// `~/.config/photo-tooter/config.json`
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to locate home directory")?;
        Ok(home.join(".config").join(APP_NAME).join("config.json"))
    }

    /// Reject anything that is not an http(s) URL.
    pub fn validate_base_url(url: &str) -> Result<()> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("URL must start with http:// or https://");
        }
        Ok(())
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at {}. Run `{APP_NAME} configure` first.",
                config_path.display()
            );
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let stored: StoredConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Config file is corrupted: {}", config_path.display()))?;

        match (stored.base_url, stored.access_token) {
            (Some(base_url), Some(access_token))
                if !base_url.trim().is_empty() && !access_token.trim().is_empty() =>
            {
                Ok(Self::new(&base_url, &access_token))
            }
            _ => anyhow::bail!(
                "Config file {} is missing required fields. Run `{APP_NAME} configure` again.",
                config_path.display()
            ),
        }
    }

    /// Save config to the given path, or to the default location. Returns the path written.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        restrict_permissions(&config_path);
        log::debug!("Config saved to {}", config_path.display());
        Ok(config_path)
    }
}

/// The file holds an access token: owner read/write only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        log::warn!("Failed to restrict permissions on {}: {e}", path.display());
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}
