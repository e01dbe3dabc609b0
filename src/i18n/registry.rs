//! Locale registry: single source of truth for supported locales and their names.
//!
//! Uses a singleton pattern with `OnceLock` so the table is built once and
//! shared read-only afterwards.

use crate::i18n::Locale;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Metadata for a supported locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    pub locale: Locale,

    /// Locale tag (e.g. "en", "pt-BR")
    pub code: &'static str,

    /// Name of the locale in its own language (e.g. "Deutsch", "日本語")
    pub native_name: &'static str,

    /// Whether this is the base locale (only one is)
    pub is_base: bool,
}

/// Global locale registry singleton.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
    names: BTreeMap<Locale, &'static str>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global locale registry instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| {
            let locales = default_locales();
            let names = locales
                .iter()
                .map(|config| (config.locale, config.native_name))
                .collect();
            LocaleRegistry { locales, names }
        })
    }

    /// Get a locale configuration by its tag.
    ///
    /// # Returns
    /// * `Some(&LocaleConfig)` if the tag is supported
    /// * `None` otherwise
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|config| config.code == code)
    }

    /// Get the configuration of a locale. Total over the closed set.
    pub fn config(&self, locale: Locale) -> &LocaleConfig {
        // ALL and the registry are built from the same list, so the index matches.
        &self.locales[locale as usize]
    }

    /// Get all locales in declaration order.
    pub fn list_all(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().collect()
    }

    /// The display name of every supported locale.
    pub fn names(&self) -> &BTreeMap<Locale, &'static str> {
        &self.names
    }

    /// Check if a tag names a supported locale.
    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }
}

fn default_locales() -> Vec<LocaleConfig> {
    Locale::ALL
        .iter()
        .map(|&locale| LocaleConfig {
            locale,
            code: locale.code(),
            native_name: locale.display_name(),
            is_base: locale.is_base(),
        })
        .collect()
}
