use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Title substituted when a note is saved with a blank title
pub const UNTITLED: &str = "Untitled Note";

/// Recognition languages supported by the capture side
///
/// The catalog is fixed; both new notes and the speech capture config draw
/// from it. Tags are BCP-47.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    /// English (United States)
    #[serde(rename = "en-US")]
    EnUs,
    /// English (United Kingdom)
    #[serde(rename = "en-GB")]
    EnGb,
    /// Spanish (Spain)
    #[serde(rename = "es-ES")]
    EsEs,
    /// French (France)
    #[serde(rename = "fr-FR")]
    FrFr,
    /// German (Germany)
    #[serde(rename = "de-DE")]
    DeDe,
    /// Italian (Italy)
    #[serde(rename = "it-IT")]
    ItIt,
    /// Portuguese (Brazil)
    #[serde(rename = "pt-BR")]
    PtBr,
    /// Russian (Russia)
    #[serde(rename = "ru-RU")]
    RuRu,
    /// Japanese (Japan)
    #[serde(rename = "ja-JP")]
    JaJp,
    /// Korean (South Korea)
    #[serde(rename = "ko-KR")]
    KoKr,
    /// Chinese (Simplified, China)
    #[serde(rename = "zh-CN")]
    ZhCn,
}

impl Language {
    /// All supported languages, in display order
    pub const ALL: [Self; 11] = [
        Self::EnUs,
        Self::EnGb,
        Self::EsEs,
        Self::FrFr,
        Self::DeDe,
        Self::ItIt,
        Self::PtBr,
        Self::RuRu,
        Self::JaJp,
        Self::KoKr,
        Self::ZhCn,
    ];

    /// BCP-47 tag passed to the speech engine and stored on notes
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::EnGb => "en-GB",
            Self::EsEs => "es-ES",
            Self::FrFr => "fr-FR",
            Self::DeDe => "de-DE",
            Self::ItIt => "it-IT",
            Self::PtBr => "pt-BR",
            Self::RuRu => "ru-RU",
            Self::JaJp => "ja-JP",
            Self::KoKr => "ko-KR",
            Self::ZhCn => "zh-CN",
        }
    }

    /// Parse a BCP-47 tag; returns `None` for anything outside the catalog
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_tag() == tag)
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::EnUs
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A persisted note
///
/// `id` is `None` until the first successful save, after which the store
/// assigns a monotonic rowid that never changes. `timestamp` is re-stamped
/// on every save. `tags` is a dormant field: always empty at creation and
/// never populated by any operation, but persisted and exported so the
/// format stays stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier; `None` until first persisted
    #[serde(default)]
    pub id: Option<i64>,
    /// Title, HTML-escaped at save time
    pub title: String,
    /// Body text, HTML-escaped at save time; append target for dictation
    pub text: String,
    /// Recognition language the note was created under
    pub language: Language,
    /// Milliseconds since epoch of the last save
    pub timestamp: i64,
    /// Ordered tag list (currently always empty)
    pub tags: Vec<String>,
    /// Mock summarization output, if one was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Note {
    /// Create a fresh, unsaved note in the given language
    #[must_use]
    pub fn new(language: Language) -> Self {
        Self {
            id: None,
            title: String::new(),
            text: String::new(),
            language,
            timestamp: now_millis(),
            tags: Vec::new(),
            summary: None,
        }
    }
}

/// HTML-escape a string for safe storage
///
/// The only injection defense in the system: rendered note previews use
/// unescaped-HTML insertion downstream, so everything user-controlled is
/// escaped before it reaches the store.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Current wall-clock time in milliseconds since the Unix epoch
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}
