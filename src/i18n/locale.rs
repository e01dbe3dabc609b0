//! Locale type: the closed set of locales the dashboard ships translations for.
//!
//! Every locale has two string forms:
//! - its tag (e.g. `"es-CO"`), used for persistence and bundle file names
//! - its member name (e.g. `"ES_CO"`), used by the `LOCALE_CODE` environment setting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a string does not name a supported locale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown locale: '{0}'")]
pub struct UnknownLocale(pub String);

/// A supported locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ar,
    Az,
    Bg,
    Bn,
    Ca,
    Cs,
    Da,
    De,
    El,
    En,
    Es,
    #[serde(rename = "es-CO")]
    EsCo,
    Et,
    Fa,
    Fr,
    Hi,
    Hu,
    Hy,
    Id,
    Is,
    It,
    Ja,
    Ko,
    Mn,
    Nb,
    Nl,
    Pl,
    Pt,
    #[serde(rename = "pt-BR")]
    PtBr,
    Ro,
    Ru,
    Sk,
    Sl,
    Sq,
    Sr,
    Sv,
    Th,
    Tr,
    Uk,
    Vi,
    #[serde(rename = "zh-Hans")]
    ZhHans,
    #[serde(rename = "zh-Hant")]
    ZhHant,
}

impl Locale {
    /// The language embedded in the UI sources. It never needs a bundle.
    pub const BASE: Locale = Locale::En;

    /// Every supported locale, in declaration order.
    pub const ALL: [Locale; 42] = [
        Locale::Ar,
        Locale::Az,
        Locale::Bg,
        Locale::Bn,
        Locale::Ca,
        Locale::Cs,
        Locale::Da,
        Locale::De,
        Locale::El,
        Locale::En,
        Locale::Es,
        Locale::EsCo,
        Locale::Et,
        Locale::Fa,
        Locale::Fr,
        Locale::Hi,
        Locale::Hu,
        Locale::Hy,
        Locale::Id,
        Locale::Is,
        Locale::It,
        Locale::Ja,
        Locale::Ko,
        Locale::Mn,
        Locale::Nb,
        Locale::Nl,
        Locale::Pl,
        Locale::Pt,
        Locale::PtBr,
        Locale::Ro,
        Locale::Ru,
        Locale::Sk,
        Locale::Sl,
        Locale::Sq,
        Locale::Sr,
        Locale::Sv,
        Locale::Th,
        Locale::Tr,
        Locale::Uk,
        Locale::Vi,
        Locale::ZhHans,
        Locale::ZhHant,
    ];

    /// The locale tag (e.g. `"en"`, `"pt-BR"`, `"zh-Hans"`).
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Ar => "ar",
            Locale::Az => "az",
            Locale::Bg => "bg",
            Locale::Bn => "bn",
            Locale::Ca => "ca",
            Locale::Cs => "cs",
            Locale::Da => "da",
            Locale::De => "de",
            Locale::El => "el",
            Locale::En => "en",
            Locale::Es => "es",
            Locale::EsCo => "es-CO",
            Locale::Et => "et",
            Locale::Fa => "fa",
            Locale::Fr => "fr",
            Locale::Hi => "hi",
            Locale::Hu => "hu",
            Locale::Hy => "hy",
            Locale::Id => "id",
            Locale::Is => "is",
            Locale::It => "it",
            Locale::Ja => "ja",
            Locale::Ko => "ko",
            Locale::Mn => "mn",
            Locale::Nb => "nb",
            Locale::Nl => "nl",
            Locale::Pl => "pl",
            Locale::Pt => "pt",
            Locale::PtBr => "pt-BR",
            Locale::Ro => "ro",
            Locale::Ru => "ru",
            Locale::Sk => "sk",
            Locale::Sl => "sl",
            Locale::Sq => "sq",
            Locale::Sr => "sr",
            Locale::Sv => "sv",
            Locale::Th => "th",
            Locale::Tr => "tr",
            Locale::Uk => "uk",
            Locale::Vi => "vi",
            Locale::ZhHans => "zh-Hans",
            Locale::ZhHant => "zh-Hant",
        }
    }

    /// The upper-case member name (e.g. `"EN"`, `"PT_BR"`, `"ZH_HANS"`).
    ///
    /// Derived from the tag: upper-cased with `-` replaced by `_`.
    pub fn member_name(&self) -> String {
        self.code().to_uppercase().replace('-', "_")
    }

    /// Create a Locale from its tag.
    ///
    /// # Example
    /// ```
    /// use locale_provider::i18n::Locale;
    ///
    /// assert_eq!(Locale::from_code("pt-BR").unwrap(), Locale::PtBr);
    /// assert!(Locale::from_code("pt-br").is_err());
    /// ```
    pub fn from_code(code: &str) -> Result<Locale, UnknownLocale> {
        Locale::ALL
            .iter()
            .copied()
            .find(|locale| locale.code() == code)
            .ok_or_else(|| UnknownLocale(code.to_string()))
    }

    /// Create a Locale from its member name (`"EN"`, `"ES_CO"`, ...).
    pub fn from_member_name(name: &str) -> Result<Locale, UnknownLocale> {
        Locale::ALL
            .iter()
            .copied()
            .find(|locale| locale.member_name() == name)
            .ok_or_else(|| UnknownLocale(name.to_string()))
    }

    /// Whether this is the base locale.
    pub fn is_base(&self) -> bool {
        *self == Locale::BASE
    }

    /// The locale's name written in its own language.
    pub fn display_name(&self) -> &'static str {
        match self {
            Locale::Ar => "العربيّة",
            Locale::Az => "Azərbaycanca",
            Locale::Bg => "български",
            Locale::Bn => "বাংলা",
            Locale::Ca => "català",
            Locale::Cs => "česky",
            Locale::Da => "dansk",
            Locale::De => "Deutsch",
            Locale::El => "Ελληνικά",
            Locale::En => "English",
            Locale::Es => "español",
            Locale::EsCo => "español de Colombia",
            Locale::Et => "eesti",
            Locale::Fa => "فارسی",
            Locale::Fr => "français",
            Locale::Hi => "Hindi",
            Locale::Hu => "Magyar",
            Locale::Hy => "հայերեն",
            Locale::Id => "Bahasa Indonesia",
            Locale::Is => "Íslenska",
            Locale::It => "italiano",
            Locale::Ja => "日本語",
            Locale::Ko => "한국어",
            Locale::Mn => "Mongolian",
            Locale::Nb => "norsk (bokmål)",
            Locale::Nl => "Nederlands",
            Locale::Pl => "polski",
            Locale::Pt => "Português",
            Locale::PtBr => "Português Brasileiro",
            Locale::Ro => "Română",
            Locale::Ru => "Русский",
            Locale::Sk => "Slovensky",
            Locale::Sl => "Slovenščina",
            Locale::Sq => "shqip",
            Locale::Sr => "српски",
            Locale::Sv => "svenska",
            Locale::Th => "ภาษาไทย",
            Locale::Tr => "Türkçe",
            Locale::Uk => "Українська",
            Locale::Vi => "Tiếng Việt",
            Locale::ZhHans => "简体中文",
            Locale::ZhHant => "繁體中文",
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::BASE
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_code(s)
    }
}
