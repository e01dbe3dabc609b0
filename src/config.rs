use crate::i18n::Locale;
use crate::loader::BundleLoaders;
use crate::retry::RetryConfig;
use crate::state::StateOptions;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    // Locale selection
    pub default_locale: Locale,

    // Persistence
    pub store_path: PathBuf,

    // Bundle source
    pub bundle_dir: PathBuf,
    pub bundle_url: Option<String>,

    // Fetching
    pub fetch_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            default_locale: default_locale_from(std::env::var("LOCALE_CODE").ok().as_deref()),

            store_path: std::env::var("LOCALE_STORE_PATH")
                .unwrap_or_else(|_| "data/preferences.json".to_string())
                .into(),

            bundle_dir: std::env::var("LOCALE_BUNDLE_DIR")
                .unwrap_or_else(|_| "locale".to_string())
                .into(),
            bundle_url: std::env::var("LOCALE_BUNDLE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),

            fetch_max_attempts: match std::env::var("LOCALE_FETCH_MAX_ATTEMPTS") {
                Ok(value) => value
                    .parse::<u32>()
                    .ok()
                    .filter(|attempts| *attempts >= 1)
                    .with_context(|| {
                        format!("LOCALE_FETCH_MAX_ATTEMPTS must be a positive integer, got '{}'", value)
                    })?,
                Err(_) => 3,
            },
        })
    }

    /// Retry policy for bundle fetches.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.fetch_max_attempts,
            ..RetryConfig::bundle_fetch()
        }
    }

    pub fn state_options(&self) -> StateOptions {
        StateOptions {
            default_locale: self.default_locale,
            retry: self.retry(),
        }
    }

    /// Bundle loaders for the configured source: HTTP when `LOCALE_BUNDLE_URL`
    /// is set, the bundle directory otherwise.
    pub fn loaders(&self) -> Result<BundleLoaders> {
        match &self.bundle_url {
            Some(url) => {
                let client = reqwest::Client::builder()
                    .timeout(std::time::Duration::from_secs(10))
                    .build()
                    .context("Failed to build HTTP client")?;
                Ok(BundleLoaders::from_http(client, url))
            }
            None => Ok(BundleLoaders::from_dir(&self.bundle_dir)),
        }
    }
}

/// Resolve the fallback locale from the `LOCALE_CODE` setting.
///
/// Accepts a member name (`"PT_BR"`) or a tag (`"pt-BR"`). Unset means `EN`;
/// an unrecognized value falls back to `EN` with a warning.
pub fn default_locale_from(value: Option<&str>) -> Locale {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Locale::BASE;
    };

    Locale::from_member_name(value)
        .or_else(|_| Locale::from_code(value))
        .unwrap_or_else(|e| {
            warn!("LOCALE_CODE: {}, falling back to {}", e, Locale::BASE);
            Locale::BASE
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "LOCALE_CODE",
        "LOCALE_STORE_PATH",
        "LOCALE_BUNDLE_DIR",
        "LOCALE_BUNDLE_URL",
        "LOCALE_FETCH_MAX_ATTEMPTS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    // ==================== default_locale_from Tests ====================

    #[test]
    fn test_unset_defaults_to_english() {
        assert_eq!(default_locale_from(None), Locale::En);
        assert_eq!(default_locale_from(Some("  ")), Locale::En);
    }

    #[test]
    fn test_member_name() {
        assert_eq!(default_locale_from(Some("FR")), Locale::Fr);
        assert_eq!(default_locale_from(Some("ZH_HANT")), Locale::ZhHant);
    }

    #[test]
    fn test_tag() {
        assert_eq!(default_locale_from(Some("pt-BR")), Locale::PtBr);
    }

    #[test]
    fn test_unrecognized_falls_back_to_english() {
        assert_eq!(default_locale_from(Some("KLINGON")), Locale::En);
    }

    // ==================== from_env Tests ====================

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        let config = Config::from_env().expect("Should load");

        assert_eq!(config.default_locale, Locale::En);
        assert_eq!(config.store_path, PathBuf::from("data/preferences.json"));
        assert_eq!(config.bundle_dir, PathBuf::from("locale"));
        assert!(config.bundle_url.is_none());
        assert_eq!(config.fetch_max_attempts, 3);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("LOCALE_CODE", "JA");
        std::env::set_var("LOCALE_BUNDLE_URL", "https://cdn.example.com/locale");
        std::env::set_var("LOCALE_FETCH_MAX_ATTEMPTS", "5");

        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.default_locale, Locale::Ja);
        assert_eq!(
            config.bundle_url.as_deref(),
            Some("https://cdn.example.com/locale")
        );
        assert_eq!(config.retry().max_attempts, 5);
        assert_eq!(config.state_options().default_locale, Locale::Ja);
    }

    #[test]
    #[serial]
    fn test_loaders_cover_non_base_locales() {
        clear_env();
        std::env::set_var("LOCALE_BUNDLE_DIR", "/tmp/bundles");

        let config = Config::from_env().expect("Should load");
        clear_env();

        let loaders = config.loaders().expect("Should build loaders");
        assert!(!loaders.contains(Locale::En));
        assert!(loaders.contains(Locale::Fr));
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_attempts() {
        clear_env();
        std::env::set_var("LOCALE_FETCH_MAX_ATTEMPTS", "0");

        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("LOCALE_FETCH_MAX_ATTEMPTS"));
    }
}
