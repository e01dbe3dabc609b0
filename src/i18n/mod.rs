//! Internationalization (i18n) building blocks.
//!
//! # Architecture
//!
//! - `locale`: the closed set of supported locales
//! - `registry`: single source of truth for locale metadata and display names
//! - `validator`: bundle quality validation
//! - `metrics`: bundle loading counters
//!
//! # Example
//!
//! ```
//! use locale_provider::i18n::{Locale, LocaleRegistry};
//!
//! let japanese = Locale::from_code("ja").unwrap();
//! assert_eq!(japanese.display_name(), "日本語");
//! assert_eq!(LocaleRegistry::get().names().len(), Locale::ALL.len());
//! ```

mod locale;
mod metrics;
mod registry;
mod validator;

pub use locale::{Locale, UnknownLocale};
pub use metrics::{LoadMetrics, MetricsReport};
pub use registry::{LocaleConfig, LocaleRegistry};
pub use validator::{BundleValidator, ValidationReport};
