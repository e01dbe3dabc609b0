//! Locale selection for the dashboard.
//!
//! Tracks the user's locale (persisted across sessions), lazily loads the
//! translation bundle for it, and hands the locale, a setter and a message
//! renderer to the rest of the UI.
//!
//! ```no_run
//! use locale_provider::{
//!     i18n::Locale, loader::BundleLoaders, provider::LocaleProvider,
//!     state::{LocaleState, StateOptions}, storage::JsonFileStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let state = LocaleState::new(
//!     Arc::new(JsonFileStore::new("data/preferences.json")),
//!     BundleLoaders::from_dir("locale"),
//!     StateOptions::default(),
//! );
//! let provider = LocaleProvider::mount(state);
//!
//! provider.context().set_locale(Locale::De);
//! let scope = provider.scope();
//! println!("{}", scope.intl.format_message("nav.orders", Some("Orders"), &[]));
//! # }
//! ```

pub mod bundle;
pub mod config;
pub mod i18n;
pub mod intl;
pub mod loader;
mod message_format;
pub mod provider;
pub mod retry;
pub mod state;
pub mod storage;
