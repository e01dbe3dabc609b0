//! Bundle loaders: an explicit lookup table from [`Locale`] to a lazily
//! invoked loader.
//!
//! Resource locations are derived from the closed locale set when the table is
//! built, never from runtime strings, so a loader can only ever touch the
//! files or URLs registered here.

use crate::bundle::{parse_bundle, BundleError, TranslationBundle};
use crate::i18n::Locale;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Future returned by a bundle loader.
pub type BundleFuture = BoxFuture<'static, Result<TranslationBundle, BundleError>>;

type LoaderFn = Arc<dyn Fn() -> BundleFuture + Send + Sync>;

/// Locale -> loader table.
#[derive(Clone, Default)]
pub struct BundleLoaders {
    loaders: HashMap<Locale, LoaderFn>,
}

impl BundleLoaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the loader for `locale`.
    pub fn register<F, Fut>(&mut self, locale: Locale, loader: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TranslationBundle, BundleError>> + Send + 'static,
    {
        self.loaders
            .insert(locale, Arc::new(move || loader().boxed()));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F, Fut>(mut self, locale: Locale, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TranslationBundle, BundleError>> + Send + 'static,
    {
        self.register(locale, loader);
        self
    }

    pub fn contains(&self, locale: Locale) -> bool {
        self.loaders.contains_key(&locale)
    }

    /// Registered locales, sorted.
    pub fn locales(&self) -> Vec<Locale> {
        let mut locales: Vec<Locale> = self.loaders.keys().copied().collect();
        locales.sort();
        locales
    }

    /// Start loading the bundle for `locale`.
    ///
    /// A locale without a registered loader yields [`BundleError::NoLoader`].
    pub fn load(&self, locale: Locale) -> BundleFuture {
        match self.loaders.get(&locale) {
            Some(loader) => loader(),
            None => async move { Err(BundleError::NoLoader(locale)) }.boxed(),
        }
    }

    /// Loaders reading `<dir>/<tag>.json` for every non-base locale.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut loaders = Self::new();

        for locale in Locale::ALL.into_iter().filter(|l| !l.is_base()) {
            let path = dir.join(format!("{}.json", locale.code()));
            loaders.register(locale, move || read_bundle_file(path.clone()));
        }

        loaders
    }

    /// Loaders fetching `<base_url>/<tag>.json` for every non-base locale.
    pub fn from_http(client: reqwest::Client, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let mut loaders = Self::new();

        for locale in Locale::ALL.into_iter().filter(|l| !l.is_base()) {
            let url = format!("{}/{}.json", base_url, locale.code());
            let client = client.clone();
            loaders.register(locale, move || fetch_bundle(client.clone(), url.clone()));
        }

        loaders
    }
}

impl fmt::Debug for BundleLoaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleLoaders")
            .field("locales", &self.locales())
            .finish()
    }
}

async fn read_bundle_file(path: PathBuf) -> Result<TranslationBundle, BundleError> {
    debug!("Reading bundle from {}", path.display());
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| BundleError::Io { path, source })?;
    parse_bundle(&bytes)
}

async fn fetch_bundle(client: reqwest::Client, url: String) -> Result<TranslationBundle, BundleError> {
    debug!("Fetching bundle from {}", url);
    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(BundleError::Http {
            url,
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    parse_bundle(&bytes)
}
