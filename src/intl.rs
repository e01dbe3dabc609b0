//! Message rendering.
//!
//! An [`IntlProvider`] is built for one locale and one set of flattened
//! messages. It is never updated in place: a locale or bundle change produces
//! a new provider, which also drops the parsed-pattern cache.
//!
//! Messages are ICU MessageFormat patterns: `{name}` placeholders plus
//! `plural`, `selectordinal` and `select` arguments. Plural branches are
//! chosen with the CLDR rules of the provider's locale.
//!
//! ```
//! use locale_provider::i18n::Locale;
//! use locale_provider::intl::{default_error_handler, IntlProvider};
//! use std::collections::HashMap;
//!
//! let messages = HashMap::from([(
//!     "cart.items".to_string(),
//!     "{count, plural, one {# Artikel} other {# Artikel}} im Warenkorb".to_string(),
//! )]);
//! let intl = IntlProvider::new(Locale::De, Locale::En, Some(messages), default_error_handler());
//!
//! assert_eq!(
//!     intl.format_message("cart.items", None, &[("count", "3")]),
//!     "3 Artikel im Warenkorb"
//! );
//! ```

use crate::bundle::FlattenedMessages;
use crate::i18n::Locale;
use crate::message_format::{parse_pattern, plural_category, PluralKey, Segment};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntlErrorCode {
    MissingTranslation,
    MissingValue,
    InvalidValue,
    MalformedMessage,
}

/// Diagnostics raised while rendering a message. None of them stop rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntlError {
    #[error("Missing message \"{id}\" for locale \"{locale}\", using default message as fallback")]
    MissingTranslation { id: String, locale: Locale },

    #[error("No value provided for \"{{{name}}}\" in message \"{id}\"")]
    MissingValue { id: String, name: String },

    #[error("Value \"{value}\" for \"{{{name}}}\" in message \"{id}\" is not a number")]
    InvalidValue { id: String, name: String, value: String },

    #[error("Malformed message \"{id}\": {reason}")]
    MalformedMessage { id: String, reason: String },
}

impl IntlError {
    pub fn code(&self) -> IntlErrorCode {
        match self {
            IntlError::MissingTranslation { .. } => IntlErrorCode::MissingTranslation,
            IntlError::MissingValue { .. } => IntlErrorCode::MissingValue,
            IntlError::InvalidValue { .. } => IntlErrorCode::InvalidValue,
            IntlError::MalformedMessage { .. } => IntlErrorCode::MalformedMessage,
        }
    }
}

/// Receives every rendering diagnostic.
pub type ErrorHandler = Arc<dyn Fn(&IntlError) + Send + Sync>;

/// Missing translations are expected while bundles are partial or still
/// loading; they are not reported.
pub fn is_suppressed(err: &IntlError) -> bool {
    err.code() == IntlErrorCode::MissingTranslation
}

/// Handler that drops suppressed diagnostics and logs everything else.
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|err: &IntlError| {
        if !is_suppressed(err) {
            error!("{}", err);
        }
    })
}

/// Shift results such as `3 - 1` print as `2`, not `2.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Renders messages for one locale.
pub struct IntlProvider {
    locale: Locale,
    default_locale: Locale,
    messages: Option<FlattenedMessages>,
    on_error: ErrorHandler,
    patterns: Mutex<HashMap<String, Arc<Vec<Segment>>>>,
}

impl IntlProvider {
    pub fn new(
        locale: Locale,
        default_locale: Locale,
        messages: Option<FlattenedMessages>,
        on_error: ErrorHandler,
    ) -> Self {
        Self {
            locale,
            default_locale,
            messages,
            on_error,
            patterns: Mutex::new(HashMap::new()),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    pub fn messages(&self) -> Option<&FlattenedMessages> {
        self.messages.as_ref()
    }

    pub fn has_message(&self, id: &str) -> bool {
        self.messages.as_ref().is_some_and(|m| m.contains_key(id))
    }

    /// Number of bundle patterns parsed so far. Default messages are parsed
    /// on every render and never cached.
    pub fn cached_patterns(&self) -> usize {
        self.patterns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Render message `id`.
    ///
    /// Falls back to `default_message`, then to `id` itself. A missing
    /// translation is reported unless the message is being rendered in the
    /// default locale with a default message at hand.
    pub fn format_message(
        &self,
        id: &str,
        default_message: Option<&str>,
        values: &[(&str, &str)],
    ) -> String {
        let message = self.messages.as_ref().and_then(|m| m.get(id));

        if message.is_none() && (default_message.is_none() || self.locale != self.default_locale)
        {
            self.report(IntlError::MissingTranslation {
                id: id.to_string(),
                locale: self.locale,
            });
        }

        let source = message.map(String::as_str).or(default_message).unwrap_or(id);

        let parsed = if message.is_some() {
            self.cached_pattern(source)
        } else {
            parse_pattern(source).map(Arc::new)
        };
        let segments = match parsed {
            Ok(segments) => segments,
            Err(reason) => {
                self.report(IntlError::MalformedMessage {
                    id: id.to_string(),
                    reason,
                });
                return source.to_string();
            }
        };

        let mut out = String::with_capacity(source.len());
        self.render(id, &segments, values, None, &mut out);
        out
    }

    /// Append `segments` to `out`. `number` is what `#` stands for inside a
    /// plural branch.
    fn render(
        &self,
        id: &str,
        segments: &[Segment],
        values: &[(&str, &str)],
        number: Option<&str>,
        out: &mut String,
    ) {
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Pound => out.push_str(number.unwrap_or("#")),
                Segment::Argument(name) => match self.value(id, name, values) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
                Segment::Plural {
                    name,
                    ordinal,
                    offset,
                    branches,
                } => {
                    let value = self.value(id, name, values);
                    let parsed = value.and_then(|v| v.trim().parse::<f64>().ok());
                    if let (Some(value), None) = (value, parsed) {
                        self.report(IntlError::InvalidValue {
                            id: id.to_string(),
                            name: name.clone(),
                            value: value.to_string(),
                        });
                    }

                    let (branch, shown) = match (value, parsed) {
                        (Some(value), Some(n)) => {
                            let shown = if *offset == 0.0 {
                                value.trim().to_string()
                            } else {
                                format_number(n - offset)
                            };
                            let category = plural_category(self.locale, &shown, *ordinal);
                            let branch = branches
                                .iter()
                                .find(|(key, _)| *key == PluralKey::Exact(n))
                                .or_else(|| {
                                    branches.iter().find(|(key, _)| {
                                        matches!(key, PluralKey::Category(c) if c == category)
                                    })
                                });
                            (branch, shown)
                        }
                        _ => (None, format!("{{{}}}", name)),
                    };

                    let other = branches
                        .iter()
                        .find(|(key, _)| matches!(key, PluralKey::Category(c) if c == "other"));
                    if let Some((_, segments)) = branch.or(other) {
                        self.render(id, segments, values, Some(&shown), out);
                    }
                }
                Segment::Select { name, branches } => {
                    let value = self.value(id, name, values);
                    let branch = value
                        .and_then(|v| branches.iter().find(|(key, _)| key == v))
                        .or_else(|| branches.iter().find(|(key, _)| key == "other"));
                    if let Some((_, segments)) = branch {
                        self.render(id, segments, values, number, out);
                    }
                }
            }
        }
    }

    /// Look up `name`, reporting a missing value.
    fn value<'v>(&self, id: &str, name: &str, values: &[(&str, &'v str)]) -> Option<&'v str> {
        let found = values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value);
        if found.is_none() {
            self.report(IntlError::MissingValue {
                id: id.to_string(),
                name: name.to_string(),
            });
        }
        found
    }

    fn cached_pattern(&self, source: &str) -> Result<Arc<Vec<Segment>>, String> {
        let mut patterns = self.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(segments) = patterns.get(source) {
            return Ok(Arc::clone(segments));
        }

        let segments = Arc::new(parse_pattern(source)?);
        patterns.insert(source.to_string(), Arc::clone(&segments));
        Ok(segments)
    }

    fn report(&self, err: IntlError) {
        (self.on_error)(&err);
    }
}

impl fmt::Debug for IntlProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntlProvider")
            .field("locale", &self.locale)
            .field("default_locale", &self.default_locale)
            .field("messages", &self.messages.as_ref().map(|m| m.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> (ErrorHandler, Arc<Mutex<Vec<IntlError>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handler: ErrorHandler = Arc::new(move |err: &IntlError| {
            seen_clone.lock().unwrap().push(err.clone());
        });
        (handler, seen)
    }

    fn messages(entries: &[(&str, &str)]) -> Option<FlattenedMessages> {
        Some(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    // ==================== Lookup Tests ====================

    #[test]
    fn test_translated_message_is_used() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(
            Locale::Fr,
            Locale::En,
            messages(&[("home.title", "Accueil")]),
            handler,
        );

        assert_eq!(intl.format_message("home.title", Some("Home"), &[]), "Accueil");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_translation_falls_back_to_default_and_reports() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(Locale::Fr, Locale::En, messages(&[]), handler);

        assert_eq!(intl.format_message("home.title", Some("Home"), &[]), "Home");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code(), IntlErrorCode::MissingTranslation);
    }

    #[test]
    fn test_default_locale_with_default_message_is_silent() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(Locale::En, Locale::En, None, handler);

        assert_eq!(intl.format_message("home.title", Some("Home"), &[]), "Home");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_default_message_falls_back_to_id() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(Locale::En, Locale::En, None, handler);

        assert_eq!(intl.format_message("home.title", None, &[]), "home.title");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    // ==================== Placeholder Tests ====================

    #[test]
    fn test_placeholders_are_substituted() {
        let (handler, _) = capture();
        let intl = IntlProvider::new(
            Locale::Es,
            Locale::En,
            messages(&[("greeting", "Hola {name}, tienes {count} pedidos")]),
            handler,
        );

        let text = intl.format_message("greeting", None, &[("name", "Ana"), ("count", "2")]);
        assert_eq!(text, "Hola Ana, tienes 2 pedidos");
    }

    #[test]
    fn test_missing_value_is_reported_and_left_verbatim() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(
            Locale::Es,
            Locale::En,
            messages(&[("greeting", "Hola {name}")]),
            handler,
        );

        assert_eq!(intl.format_message("greeting", None, &[]), "Hola {name}");
        assert_eq!(
            seen.lock().unwrap()[0],
            IntlError::MissingValue {
                id: "greeting".to_string(),
                name: "name".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_message_returns_raw_source() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(
            Locale::Es,
            Locale::En,
            messages(&[("greeting", "Hola {name")]),
            handler,
        );

        assert_eq!(intl.format_message("greeting", None, &[]), "Hola {name");
        assert_eq!(seen.lock().unwrap()[0].code(), IntlErrorCode::MalformedMessage);
    }

    #[test]
    fn test_patterns_are_cached_per_provider() {
        let (handler, _) = capture();
        let intl = IntlProvider::new(
            Locale::It,
            Locale::En,
            messages(&[("a", "{x}"), ("b", "{y}")]),
            handler,
        );

        intl.format_message("a", None, &[("x", "1")]);
        intl.format_message("a", None, &[("x", "2")]);
        intl.format_message("b", None, &[("y", "3")]);

        assert_eq!(intl.cached_patterns(), 2);
    }

    #[test]
    fn test_default_messages_are_not_cached() {
        let (handler, _) = capture();
        let intl = IntlProvider::new(Locale::It, Locale::En, messages(&[("a", "{x}")]), handler);

        for i in 0..50 {
            let default_message = format!("Dynamic {} {{x}}", i);
            intl.format_message("missing", Some(&default_message), &[("x", "1")]);
        }
        assert_eq!(intl.cached_patterns(), 0);

        intl.format_message("a", None, &[("x", "1")]);
        assert_eq!(intl.cached_patterns(), 1);
    }

    // ==================== Plural and Select Tests ====================

    #[test]
    fn test_plural_picks_branch_by_locale_rules() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(
            Locale::De,
            Locale::En,
            messages(&[("items", "{count,plural,one{# Artikel} other{# Artikel}}")]),
            handler,
        );

        assert_eq!(intl.format_message("items", None, &[("count", "3")]), "3 Artikel");
        assert_eq!(intl.format_message("items", None, &[("count", "1")]), "1 Artikel");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_plural_uses_russian_few_and_many() {
        let (handler, _) = capture();
        let intl = IntlProvider::new(
            Locale::Ru,
            Locale::En,
            messages(&[(
                "files",
                "{n, plural, one {# файл} few {# файла} many {# файлов} other {# файла}}",
            )]),
            handler,
        );

        assert_eq!(intl.format_message("files", None, &[("n", "1")]), "1 файл");
        assert_eq!(intl.format_message("files", None, &[("n", "3")]), "3 файла");
        assert_eq!(intl.format_message("files", None, &[("n", "11")]), "11 файлов");
    }

    #[test]
    fn test_exact_match_wins_and_offset_shifts_pound() {
        let (handler, _) = capture();
        let intl = IntlProvider::new(
            Locale::En,
            Locale::En,
            messages(&[(
                "likes",
                "{n, plural, offset:1 =0 {Nobody} =1 {You} one {You and # other} other {You and # others}}",
            )]),
            handler,
        );

        assert_eq!(intl.format_message("likes", None, &[("n", "0")]), "Nobody");
        assert_eq!(intl.format_message("likes", None, &[("n", "1")]), "You");
        assert_eq!(intl.format_message("likes", None, &[("n", "2")]), "You and 1 other");
        assert_eq!(intl.format_message("likes", None, &[("n", "4")]), "You and 3 others");
    }

    #[test]
    fn test_selectordinal() {
        let (handler, _) = capture();
        let intl = IntlProvider::new(
            Locale::En,
            Locale::En,
            messages(&[(
                "place",
                "{n, selectordinal, one {#st} two {#nd} few {#rd} other {#th}}",
            )]),
            handler,
        );

        assert_eq!(intl.format_message("place", None, &[("n", "1")]), "1st");
        assert_eq!(intl.format_message("place", None, &[("n", "22")]), "22nd");
        assert_eq!(intl.format_message("place", None, &[("n", "13")]), "13th");
    }

    #[test]
    fn test_select_with_fallback_to_other() {
        let (handler, _) = capture();
        let intl = IntlProvider::new(
            Locale::Fr,
            Locale::En,
            messages(&[(
                "role",
                "{name} est {role, select, admin {administrateur} other {membre}}",
            )]),
            handler,
        );

        assert_eq!(
            intl.format_message("role", None, &[("name", "Léa"), ("role", "admin")]),
            "Léa est administrateur"
        );
        assert_eq!(
            intl.format_message("role", None, &[("name", "Léa"), ("role", "guest")]),
            "Léa est membre"
        );
    }

    #[test]
    fn test_non_numeric_plural_value_is_reported() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(
            Locale::En,
            Locale::En,
            messages(&[("items", "{n, plural, one {# item} other {# items}}")]),
            handler,
        );

        assert_eq!(intl.format_message("items", None, &[("n", "many")]), "{n} items");
        assert_eq!(seen.lock().unwrap()[0].code(), IntlErrorCode::InvalidValue);
    }

    #[test]
    fn test_plural_without_other_is_malformed() {
        let (handler, seen) = capture();
        let intl = IntlProvider::new(
            Locale::En,
            Locale::En,
            messages(&[("items", "{n, plural, one {# item}}")]),
            handler,
        );

        assert_eq!(
            intl.format_message("items", None, &[("n", "1")]),
            "{n, plural, one {# item}}"
        );
        assert_eq!(seen.lock().unwrap()[0].code(), IntlErrorCode::MalformedMessage);
    }

    // ==================== Handler Tests ====================

    #[test]
    fn test_only_missing_translation_is_suppressed() {
        assert!(is_suppressed(&IntlError::MissingTranslation {
            id: "x".to_string(),
            locale: Locale::Fr
        }));
        assert!(!is_suppressed(&IntlError::MissingValue {
            id: "x".to_string(),
            name: "n".to_string()
        }));
        assert!(!is_suppressed(&IntlError::MalformedMessage {
            id: "x".to_string(),
            reason: "bad".to_string()
        }));
    }

    #[test]
    fn test_error_messages() {
        let err = IntlError::MissingValue {
            id: "greeting".to_string(),
            name: "name".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No value provided for \"{name}\" in message \"greeting\""
        );
    }
}
