//! Locale state manager.
//!
//! Owns the current locale (persisted through a [`PreferenceStore`]) and the
//! currently installed translation bundle. Changing the locale is synchronous;
//! loading the matching bundle is a reaction to the change that runs on a
//! spawned Tokio task.
//!
//! Two behaviours are kept on purpose:
//! - The load guard is per instance and not keyed by locale. Once any bundle
//!   has been installed, later locale changes clear the bundle instead of
//!   fetching.
//! - Fetches are never cancelled. Whichever fetch resolves last installs its
//!   bundle, even if the locale has changed since it started. Such installs
//!   are logged and counted as stale.

use crate::bundle::{BundleError, TranslationBundle};
use crate::i18n::{BundleValidator, LoadMetrics, Locale};
use crate::loader::BundleLoaders;
use crate::retry::{with_retry_if, RetryConfig};
use crate::storage::PreferenceStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Preference key holding the selected locale tag.
pub const STORAGE_KEY: &str = "locale";

/// A bundle together with the locale whose fetch produced it.
#[derive(Debug, Clone)]
pub struct LoadedBundle {
    pub locale: Locale,
    pub bundle: Arc<TranslationBundle>,
}

/// Progress of the most recent bundle load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No fetch is pending; the bundle was cleared or never needed
    Idle,
    Loading(Locale),
    Loaded(Locale),
    Failed { locale: Locale, message: String },
}

#[derive(Debug, Clone)]
pub struct StateOptions {
    /// Locale used when nothing (valid) is persisted
    pub default_locale: Locale,
    pub retry: RetryConfig,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            default_locale: Locale::BASE,
            retry: RetryConfig::default(),
        }
    }
}

/// Handle to the locale state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct LocaleState {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn PreferenceStore>,
    loaders: BundleLoaders,
    retry: RetryConfig,
    default_locale: Locale,
    locale: watch::Sender<Locale>,
    bundle: watch::Sender<Option<LoadedBundle>>,
    status: watch::Sender<LoadStatus>,
    loaded: AtomicBool,
    started: AtomicBool,
    metrics: LoadMetrics,
}

impl LocaleState {
    /// Restore the locale from `store`. No bundle is loaded until [`start`](Self::start).
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        loaders: BundleLoaders,
        options: StateOptions,
    ) -> Self {
        let default_locale = options.default_locale;
        let stored = store.get(STORAGE_KEY, default_locale.code());
        let locale = match Locale::from_code(&stored) {
            Ok(locale) => locale,
            Err(e) => {
                warn!("Ignoring persisted locale preference ({}), using {}", e, default_locale);
                default_locale
            }
        };

        debug!("Restored locale {} (default {})", locale, default_locale);

        Self {
            inner: Arc::new(Inner {
                store,
                loaders,
                retry: options.retry,
                default_locale,
                locale: watch::Sender::new(locale),
                bundle: watch::Sender::new(None),
                status: watch::Sender::new(LoadStatus::Idle),
                loaded: AtomicBool::new(false),
                started: AtomicBool::new(false),
                metrics: LoadMetrics::new(),
            }),
        }
    }

    /// Run the initial load for the restored locale. Only the first call has an effect.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return;
        }
        Inner::on_locale_change(&self.inner, self.locale());
    }

    /// Persist and switch to `locale`.
    ///
    /// The new locale is visible immediately. If it differs from the current
    /// one, the bundle reaction runs (possibly spawning a fetch), so this must
    /// be called from within a Tokio runtime.
    pub fn set_locale(&self, locale: Locale) {
        if let Err(e) = self.inner.store.set(STORAGE_KEY, locale.code()) {
            warn!("Failed to persist locale preference: {}", e);
        }

        let changed = self.inner.locale.send_if_modified(|current| {
            if *current == locale {
                false
            } else {
                *current = locale;
                true
            }
        });

        if changed {
            debug!("Locale changed to {}", locale);
            Inner::on_locale_change(&self.inner, locale);
        }
    }

    pub fn locale(&self) -> Locale {
        *self.inner.locale.borrow()
    }

    pub fn default_locale(&self) -> Locale {
        self.inner.default_locale
    }

    /// The installed bundle, if any.
    pub fn bundle(&self) -> Option<LoadedBundle> {
        self.inner.bundle.borrow().clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.status.borrow().clone()
    }

    /// Whether any bundle has been installed during this instance's lifetime.
    pub fn has_loaded(&self) -> bool {
        self.inner.loaded.load(Ordering::Acquire)
    }

    pub fn subscribe_locale(&self) -> watch::Receiver<Locale> {
        self.inner.locale.subscribe()
    }

    pub fn subscribe_bundle(&self) -> watch::Receiver<Option<LoadedBundle>> {
        self.inner.bundle.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<LoadStatus> {
        self.inner.status.subscribe()
    }

    pub fn metrics(&self) -> &LoadMetrics {
        &self.inner.metrics
    }
}

impl Inner {
    fn on_locale_change(inner: &Arc<Inner>, locale: Locale) {
        if !locale.is_base() && !inner.loaded.load(Ordering::Acquire) {
            debug!("Fetching bundle for {}", locale);
            inner.metrics.record_fetch_started();
            inner.status.send_replace(LoadStatus::Loading(locale));

            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                inner.fetch_and_install(locale).await;
            });
        } else {
            debug!(
                "Clearing bundle for {} (base: {}, already loaded: {})",
                locale,
                locale.is_base(),
                inner.loaded.load(Ordering::Acquire)
            );
            inner.bundle.send_replace(None);
            inner.metrics.record_bundle_cleared();
            inner.status.send_replace(LoadStatus::Idle);
        }
    }

    async fn fetch_and_install(&self, locale: Locale) {
        let operation = format!("Loading {} bundle", locale);
        let result = with_retry_if(
            &self.retry,
            &operation,
            || self.loaders.load(locale),
            BundleError::is_retryable,
        )
        .await;

        let bundle = match result {
            Ok(bundle) => bundle,
            Err(e) => {
                error!("Failed to load {} bundle: {}", locale, e);
                self.metrics.record_fetch_failure();
                self.status.send_replace(LoadStatus::Failed {
                    locale,
                    message: e.to_string(),
                });
                return;
            }
        };

        let validation = BundleValidator::validate(&bundle);
        if validation.has_errors() {
            warn!(
                "Bundle validation errors for {}: {:?}",
                locale, validation.errors
            );
        }
        if validation.has_warnings() {
            warn!(
                "Bundle validation warnings for {}: {:?}",
                locale, validation.warnings
            );
        }

        let current = *self.locale.borrow();
        if current != locale {
            warn!(
                "Installing {} bundle although the current locale is now {}",
                locale, current
            );
            self.metrics.record_stale_install();
        }

        info!("Installed {} bundle ({} messages)", locale, bundle.len());
        self.bundle.send_replace(Some(LoadedBundle {
            locale,
            bundle: Arc::new(bundle),
        }));
        self.loaded.store(true, Ordering::Release);
        self.metrics.record_bundle_installed();
        self.status.send_replace(LoadStatus::Loaded(locale));
    }
}
