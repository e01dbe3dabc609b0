//! Context distribution.
//!
//! [`LocaleProvider`] is handed to whatever renders the dashboard. It gives
//! out two things:
//! - [`LocaleContext`]: the current locale plus a setter, for code that only
//!   reads or switches the locale
//! - [`RenderScope`]: a snapshot holding an [`IntlProvider`] for the current
//!   locale and messages, for code that renders text
//!
//! A scope's `key` changes whenever the locale changes. Consumers keying
//! their cached output on it rebuild everything locale-sensitive instead of
//! patching it.

use crate::bundle::flatten;
use crate::i18n::Locale;
use crate::intl::{default_error_handler, ErrorHandler, IntlProvider};
use crate::state::{LoadedBundle, LocaleState};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// Function that switches the locale.
pub type LocaleSetter = Arc<dyn Fn(Locale) + Send + Sync>;

/// `{ locale, set_locale }` as seen by a consumer.
///
/// `locale` is a snapshot taken when the context was handed out.
#[derive(Clone)]
pub struct LocaleContext {
    locale: Locale,
    setter: LocaleSetter,
}

impl LocaleContext {
    pub fn new(locale: Locale, setter: LocaleSetter) -> Self {
        Self { locale, setter }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&self, locale: Locale) {
        (self.setter)(locale)
    }
}

/// Context used outside of any provider: base locale, setter does nothing.
impl Default for LocaleContext {
    fn default() -> Self {
        Self::new(Locale::BASE, Arc::new(|_: Locale| {}))
    }
}

impl fmt::Debug for LocaleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocaleContext")
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

/// Everything a renderer needs for one pass.
#[derive(Debug)]
pub struct RenderScope {
    /// Remount key, bumped on every locale change
    pub key: u64,
    pub locale: Locale,
    /// Locale of the installed bundle, which may differ from `locale`
    pub bundle_locale: Option<Locale>,
    pub context: LocaleContext,
    pub intl: Arc<IntlProvider>,
}

/// Owns the locale state and builds render scopes from it. Cheap to clone.
#[derive(Clone)]
pub struct LocaleProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    state: LocaleState,
    on_error: ErrorHandler,
    cache: Mutex<ScopeCache>,
}

struct ScopeCache {
    locale_rx: watch::Receiver<Locale>,
    bundle_rx: watch::Receiver<Option<LoadedBundle>>,
    key: u64,
    scope: Option<Arc<RenderScope>>,
}

impl LocaleProvider {
    /// Start `state` and wrap it with the default diagnostic handler.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(state: LocaleState) -> Self {
        Self::mount_with_error_handler(state, default_error_handler())
    }

    /// Like [`mount`](Self::mount) with a custom diagnostic handler.
    pub fn mount_with_error_handler(state: LocaleState, on_error: ErrorHandler) -> Self {
        state.start();
        let cache = ScopeCache {
            locale_rx: state.subscribe_locale(),
            bundle_rx: state.subscribe_bundle(),
            key: 0,
            scope: None,
        };

        Self {
            inner: Arc::new(ProviderInner {
                state,
                on_error,
                cache: Mutex::new(cache),
            }),
        }
    }

    pub fn state(&self) -> &LocaleState {
        &self.inner.state
    }

    pub fn locale(&self) -> Locale {
        self.inner.state.locale()
    }

    pub fn set_locale(&self, locale: Locale) {
        self.inner.state.set_locale(locale);
    }

    /// The raw locale context.
    pub fn context(&self) -> LocaleContext {
        self.context_for(self.locale())
    }

    /// The scope for the current locale and bundle.
    ///
    /// Returns the previous scope if nothing changed since it was built.
    pub fn scope(&self) -> Arc<RenderScope> {
        let mut cache = self
            .inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let locale_changed = cache.locale_rx.has_changed().unwrap_or(false);
        let bundle_changed = cache.bundle_rx.has_changed().unwrap_or(false);

        if let Some(scope) = &cache.scope {
            if !locale_changed && !bundle_changed {
                return Arc::clone(scope);
            }
        }

        if locale_changed {
            cache.key += 1;
        }

        let locale = *cache.locale_rx.borrow_and_update();
        let loaded = cache.bundle_rx.borrow_and_update().clone();

        let messages = flatten(loaded.as_ref().map(|b| b.bundle.as_ref()));
        debug!(
            "Building render scope {} for {} ({} messages)",
            cache.key,
            locale,
            messages.as_ref().map_or(0, |m| m.len())
        );

        let intl = IntlProvider::new(
            locale,
            self.inner.state.default_locale(),
            messages,
            Arc::clone(&self.inner.on_error),
        );
        let scope = Arc::new(RenderScope {
            key: cache.key,
            locale,
            bundle_locale: loaded.map(|b| b.locale),
            context: self.context_for(locale),
            intl: Arc::new(intl),
        });

        cache.scope = Some(Arc::clone(&scope));
        scope
    }

    /// Watch for locale or bundle changes.
    pub fn watch(&self) -> ScopeWatcher {
        ScopeWatcher {
            provider: self.clone(),
            locale_rx: self.inner.state.subscribe_locale(),
            bundle_rx: self.inner.state.subscribe_bundle(),
        }
    }

    fn context_for(&self, locale: Locale) -> LocaleContext {
        let state = self.inner.state.clone();
        LocaleContext::new(locale, Arc::new(move |locale| state.set_locale(locale)))
    }
}

impl fmt::Debug for LocaleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocaleProvider")
            .field("locale", &self.locale())
            .finish_non_exhaustive()
    }
}

/// Resolves with a fresh scope each time the locale or the bundle changes.
pub struct ScopeWatcher {
    provider: LocaleProvider,
    locale_rx: watch::Receiver<Locale>,
    bundle_rx: watch::Receiver<Option<LoadedBundle>>,
}

impl ScopeWatcher {
    pub async fn changed(&mut self) -> Arc<RenderScope> {
        tokio::select! {
            _ = self.locale_rx.changed() => {}
            _ = self.bundle_rx.changed() => {}
        }
        // Both may have moved; one scope covers both.
        let _ = self.locale_rx.borrow_and_update();
        let _ = self.bundle_rx.borrow_and_update();

        self.provider.scope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{BundleError, StructuredMessage, TranslationBundle};
    use crate::intl::IntlError;
    use crate::loader::BundleLoaders;
    use crate::retry::RetryConfig;
    use crate::state::{LoadStatus, StateOptions, STORAGE_KEY};
    use crate::storage::{MemoryStore, PreferenceStore};
    use std::time::Duration;
    use tokio::time::timeout;

    fn french_loaders() -> BundleLoaders {
        BundleLoaders::new().with(Locale::Fr, || async {
            let mut bundle = TranslationBundle::new();
            bundle.insert(
                "nav_dot_orders".to_string(),
                StructuredMessage::new("Commandes").with_context("sidebar"),
            );
            Ok::<_, BundleError>(bundle)
        })
    }

    fn provider_with(store: Arc<dyn PreferenceStore>) -> LocaleProvider {
        let state = LocaleState::new(
            store,
            french_loaders(),
            StateOptions {
                default_locale: Locale::En,
                retry: RetryConfig::single_attempt(),
            },
        );
        LocaleProvider::mount(state)
    }

    async fn wait_for_status(provider: &LocaleProvider, expected: LoadStatus) {
        let mut rx = provider.state().subscribe_status();
        timeout(Duration::from_secs(2), async {
            loop {
                if *rx.borrow_and_update() == expected {
                    return;
                }
                rx.changed().await.expect("state dropped");
            }
        })
        .await
        .expect("status not reached in time");
    }

    // ==================== Context Tests ====================

    #[test]
    fn test_default_context_is_base_with_noop_setter() {
        let context = LocaleContext::default();
        assert_eq!(context.locale(), Locale::BASE);
        context.set_locale(Locale::Fr);
        assert_eq!(context.locale(), Locale::BASE);
    }

    #[tokio::test]
    async fn test_context_setter_updates_provider_immediately() {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::new());
        let provider = provider_with(store.clone());
        let context = provider.context();

        assert_eq!(context.locale(), Locale::En);
        context.set_locale(Locale::Fr);

        assert_eq!(provider.locale(), Locale::Fr);
        assert_eq!(provider.context().locale(), Locale::Fr);
        assert_eq!(store.get(STORAGE_KEY, "en"), "fr");
    }

    // ==================== Scope Tests ====================

    #[tokio::test]
    async fn test_scope_is_reused_until_something_changes() {
        let provider = provider_with(Arc::new(MemoryStore::new()));

        let first = provider.scope();
        let second = provider.scope();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.key, 0);
        assert!(first.intl.messages().is_none());
    }

    #[tokio::test]
    async fn test_scope_is_rekeyed_on_locale_change() {
        let provider = provider_with(Arc::new(MemoryStore::new()));
        let before = provider.scope();

        provider.set_locale(Locale::Fr);
        let after = provider.scope();

        assert_eq!(after.key, before.key + 1);
        assert_eq!(after.locale, Locale::Fr);
        assert!(!Arc::ptr_eq(&before.intl, &after.intl));
    }

    #[tokio::test]
    async fn test_scope_carries_flattened_messages_once_loaded() {
        let provider = provider_with(Arc::new(MemoryStore::new()));

        provider.set_locale(Locale::Fr);
        wait_for_status(&provider, LoadStatus::Loaded(Locale::Fr)).await;

        let scope = provider.scope();
        assert_eq!(scope.bundle_locale, Some(Locale::Fr));
        assert_eq!(
            scope.intl.format_message("nav.orders", Some("Orders"), &[]),
            "Commandes"
        );
        assert_eq!(scope.context.locale(), Locale::Fr);
    }

    #[tokio::test]
    async fn test_bundle_change_rebuilds_intl_but_keeps_key() {
        let provider = provider_with(Arc::new(MemoryStore::new()));

        provider.set_locale(Locale::Fr);
        let loading = provider.scope();
        wait_for_status(&provider, LoadStatus::Loaded(Locale::Fr)).await;
        let loaded = provider.scope();

        assert_eq!(loading.key, loaded.key);
        assert!(loading.intl.messages().is_none());
        assert!(loaded.intl.has_message("nav.orders"));
    }

    #[tokio::test]
    async fn test_remount_key_changes_even_when_locale_returns() {
        let provider = provider_with(Arc::new(MemoryStore::new()));
        let before = provider.scope();

        provider.set_locale(Locale::Fr);
        provider.set_locale(Locale::En);
        let after = provider.scope();

        assert_eq!(after.locale, before.locale);
        assert_ne!(after.key, before.key);
    }

    // ==================== Error Handler Tests ====================

    #[tokio::test]
    async fn test_custom_error_handler_reaches_intl() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handler: ErrorHandler = Arc::new(move |err: &IntlError| {
            seen_clone.lock().unwrap().push(err.code());
        });

        let state = LocaleState::new(
            Arc::new(MemoryStore::new()),
            BundleLoaders::new(),
            StateOptions::default(),
        );
        let provider = LocaleProvider::mount_with_error_handler(state, handler);

        provider.scope().intl.format_message("x", Some("Hi {name}"), &[]);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    // ==================== Watcher Tests ====================

    #[tokio::test]
    async fn test_watcher_resolves_on_locale_and_bundle_changes() {
        let provider = provider_with(Arc::new(MemoryStore::new()));
        let mut watcher = provider.watch();

        provider.set_locale(Locale::Fr);
        let scope = timeout(Duration::from_secs(2), watcher.changed())
            .await
            .expect("locale change not observed");
        assert_eq!(scope.locale, Locale::Fr);

        wait_for_status(&provider, LoadStatus::Loaded(Locale::Fr)).await;
        let scope = timeout(Duration::from_secs(2), watcher.changed())
            .await
            .expect("bundle change not observed");
        assert_eq!(scope.bundle_locale, Some(Locale::Fr));
    }
}
