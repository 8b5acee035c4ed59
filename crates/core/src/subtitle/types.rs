//! Types for subtitle search requests and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::{canonical_cache_key, language_name};

/// Kind of content a subtitle is searched for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Movie,
    TvEpisode,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::TvEpisode => "tv_episode",
        }
    }
}

/// Subtitle file format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Ass,
    Ssa,
    Sub,
    Ttml,
}

impl SubtitleFormat {
    /// File extension (lowercase, without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Ssa => "ssa",
            SubtitleFormat::Sub => "sub",
            SubtitleFormat::Ttml => "ttml",
        }
    }

    /// Parse a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "srt" => Some(SubtitleFormat::Srt),
            "vtt" | "webvtt" => Some(SubtitleFormat::Vtt),
            "ass" => Some(SubtitleFormat::Ass),
            "ssa" => Some(SubtitleFormat::Ssa),
            "sub" => Some(SubtitleFormat::Sub),
            "ttml" | "dfxp" => Some(SubtitleFormat::Ttml),
            _ => None,
        }
    }

    /// Detect the format from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// How a provider matched a result to the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Matched on the video file hash.
    Hash,
    /// Matched on the IMDb identifier.
    Imdb,
    /// Matched on title (and year/episode).
    Title,
    /// Loose text match.
    Fuzzy,
}

impl MatchType {
    /// Intrinsic confidence of this match type, in [0, 1].
    pub fn confidence(&self) -> f64 {
        match self {
            MatchType::Hash => 0.95,
            MatchType::Imdb => 0.85,
            MatchType::Title => 0.65,
            MatchType::Fuzzy => 0.4,
        }
    }
}

/// Identifier of a subtitle provider.
///
/// Well-known providers have dedicated variants; anything else is carried
/// as `Other` so third-party clients can be registered without changing
/// this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderId {
    OpenSubtitles,
    Subdl,
    Podnapisi,
    Addic7ed,
    Yify,
    Local,
    Other(String),
}

impl ProviderId {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderId::OpenSubtitles => "opensubtitles",
            ProviderId::Subdl => "subdl",
            ProviderId::Podnapisi => "podnapisi",
            ProviderId::Addic7ed => "addic7ed",
            ProviderId::Yify => "yify",
            ProviderId::Local => "local",
            ProviderId::Other(name) => name,
        }
    }

    /// Name safe for use as a single path component.
    pub fn slug(&self) -> String {
        self.as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "opensubtitles" => ProviderId::OpenSubtitles,
            "subdl" => ProviderId::Subdl,
            "podnapisi" => ProviderId::Podnapisi,
            "addic7ed" => ProviderId::Addic7ed,
            "yify" => ProviderId::Yify,
            "local" => ProviderId::Local,
            _ => ProviderId::Other(value.to_string()),
        }
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        ProviderId::from(value.as_str())
    }
}

impl From<ProviderId> for String {
    fn from(value: ProviderId) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a subtitle search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    /// Title of the movie or series.
    pub title: String,
    /// Release year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    pub content_type: ContentType,
    /// IMDb identifier (e.g. "tt0133093").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    /// Hash of the video file, the strongest match signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    /// Language codes in preference order (deduplicated, lowercase).
    pub languages: Vec<String>,
    /// Subtitle formats in preference order.
    #[serde(default)]
    pub preferred_formats: Vec<SubtitleFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}

impl SearchRequest {
    /// Create a request, normalizing the language list.
    ///
    /// Codes are trimmed and lowercased; empty and repeated codes are dropped
    /// while keeping the first occurrence's position.
    /// A request left with no codes matches nothing: searching it returns no
    /// results without contacting any provider.
    pub fn new<I, S>(title: impl Into<String>, content_type: ContentType, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for lang in languages {
            let code = lang.as_ref().trim().to_lowercase();
            if !code.is_empty() && !normalized.contains(&code) {
                normalized.push(code);
            }
        }

        Self {
            title: title.into(),
            year: None,
            content_type,
            imdb_id: None,
            file_hash: None,
            languages: normalized,
            preferred_formats: Vec::new(),
            season: None,
            episode: None,
        }
    }

    /// Request subtitles for a movie.
    pub fn movie<I, S>(title: impl Into<String>, year: u32, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(title, ContentType::Movie, languages).with_year(year)
    }

    /// Request subtitles for a single TV episode.
    pub fn episode<I, S>(title: impl Into<String>, season: u32, episode: u32, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = Self::new(title, ContentType::TvEpisode, languages);
        request.season = Some(season);
        request.episode = Some(episode);
        request
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_imdb_id(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn with_file_hash(mut self, file_hash: impl Into<String>) -> Self {
        self.file_hash = Some(file_hash.into());
        self
    }

    pub fn with_formats(mut self, formats: Vec<SubtitleFormat>) -> Self {
        let mut deduped = Vec::with_capacity(formats.len());
        for format in formats {
            if !deduped.contains(&format) {
                deduped.push(format);
            }
        }
        self.preferred_formats = deduped;
        self
    }

    /// Order-independent key identifying this request in the result cache.
    pub fn cache_key(&self) -> String {
        canonical_cache_key(self)
    }

    /// Position of a language in the preference list.
    pub fn language_rank(&self, code: &str) -> Option<usize> {
        let code = code.trim().to_lowercase();
        self.languages.iter().position(|l| *l == code)
    }

    /// Position of a format in the preference list.
    pub fn format_rank(&self, format: SubtitleFormat) -> Option<usize> {
        self.preferred_formats.iter().position(|f| *f == format)
    }
}

/// A subtitle offered by a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// Provider-scoped identifier.
    pub id: String,
    pub provider: ProviderId,
    /// Language code (lowercase).
    pub language: String,
    /// Human-readable language name.
    pub language_name: String,
    pub format: SubtitleFormat,
    pub download_url: String,
    pub file_name: String,
    pub match_type: MatchType,
    /// Ranking score in [0, 1], assigned by the ranker.
    #[serde(default)]
    pub match_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_count: Option<u64>,
    /// User rating in [0, 5].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_group: Option<String>,
    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
}

impl SearchResult {
    /// Create a result with the required fields; optional metadata is unset.
    pub fn new(
        id: impl Into<String>,
        provider: ProviderId,
        language: impl Into<String>,
        format: SubtitleFormat,
        file_name: impl Into<String>,
        match_type: MatchType,
    ) -> Self {
        let language = language.into().trim().to_lowercase();
        Self {
            id: id.into(),
            provider,
            language_name: language_name(&language),
            language,
            format,
            download_url: String::new(),
            file_name: file_name.into(),
            match_type,
            match_score: 0.0,
            download_count: None,
            rating: None,
            is_verified: false,
            release_group: None,
            file_size: None,
            upload_date: None,
        }
    }

    /// Identifier of the subtitle file across providers, used by the file cache.
    pub fn content_id(&self) -> String {
        format!("{}:{}", self.provider, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_normalizes_languages() {
        let request = SearchRequest::new("Movie", ContentType::Movie, [" EN", "es", "en", ""]);
        assert_eq!(request.languages, vec!["en", "es"]);
    }

    #[test]
    fn test_language_and_format_rank() {
        let request = SearchRequest::movie("Movie", 2020, ["fr", "en"])
            .with_formats(vec![SubtitleFormat::Ass, SubtitleFormat::Srt, SubtitleFormat::Ass]);

        assert_eq!(request.language_rank("EN"), Some(1));
        assert_eq!(request.language_rank("de"), None);
        assert_eq!(request.preferred_formats.len(), 2);
        assert_eq!(request.format_rank(SubtitleFormat::Srt), Some(1));
        assert_eq!(request.format_rank(SubtitleFormat::Vtt), None);
    }

    #[test]
    fn test_provider_id_string_forms() {
        assert_eq!(ProviderId::from("OpenSubtitles"), ProviderId::OpenSubtitles);
        assert_eq!(
            ProviderId::from("my-source"),
            ProviderId::Other("my-source".to_string())
        );
        assert_eq!(ProviderId::Other("a/b c".to_string()).slug(), "a_b_c");

        let json = serde_json::to_string(&ProviderId::Podnapisi).unwrap();
        assert_eq!(json, "\"podnapisi\"");
        let parsed: ProviderId = serde_json::from_str("\"addic7ed\"").unwrap();
        assert_eq!(parsed, ProviderId::Addic7ed);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            SubtitleFormat::from_file_name("Movie.2020.EN.SRT"),
            Some(SubtitleFormat::Srt)
        );
        assert_eq!(
            SubtitleFormat::from_file_name("episode.webvtt"),
            Some(SubtitleFormat::Vtt)
        );
        assert_eq!(SubtitleFormat::from_file_name("readme.txt"), None);
        assert_eq!(SubtitleFormat::from_file_name("noext"), None);
    }

    #[test]
    fn test_match_type_confidence_order() {
        assert!(MatchType::Hash.confidence() > MatchType::Imdb.confidence());
        assert!(MatchType::Imdb.confidence() > MatchType::Title.confidence());
        assert!(MatchType::Title.confidence() > MatchType::Fuzzy.confidence());
    }

    #[test]
    fn test_search_result_new_fills_language_name() {
        let result = SearchResult::new(
            "42",
            ProviderId::Subdl,
            "ES",
            SubtitleFormat::Srt,
            "movie.srt",
            MatchType::Title,
        );
        assert_eq!(result.language, "es");
        assert_eq!(result.language_name, "Spanish");
        assert_eq!(result.content_id(), "subdl:42");
    }

    #[test]
    fn test_search_request_minimal_json() {
        let json = r#"{"title": "Heat", "content_type": "movie", "languages": ["en"]}"#;
        let parsed: SearchRequest = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.title, "Heat");
        assert_eq!(parsed.content_type, ContentType::Movie);
        assert!(parsed.year.is_none());
        assert!(parsed.preferred_formats.is_empty());
    }
}
