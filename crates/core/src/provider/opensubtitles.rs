//! OpenSubtitles REST v1 backend implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::config::OpenSubtitlesConfig;
use crate::subtitle::{
    ContentType, MatchType, ProviderId, SearchRequest, SearchResult, SubtitleFormat,
};

use super::{ProviderClient, ProviderError};

/// OpenSubtitles.com client.
pub struct OpenSubtitlesClient {
    client: Client,
    config: OpenSubtitlesConfig,
}

impl OpenSubtitlesClient {
    /// Create a new client with the given configuration.
    pub fn new(config: OpenSubtitlesConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Build the subtitles search URL.
    ///
    /// Parameters are emitted in alphabetical order with lowercase values;
    /// the API redirects anything else.
    fn build_search_url(&self, request: &SearchRequest) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();

        if let Some(episode) = request.episode {
            params.push(("episode_number", episode.to_string()));
        }
        if let Some(imdb_id) = request.imdb_id.as_deref().and_then(normalize_imdb_id) {
            params.push(("imdb_id", imdb_id));
        }
        if !request.languages.is_empty() {
            let mut languages = request.languages.clone();
            languages.sort();
            params.push(("languages", languages.join(",")));
        }
        if let Some(hash) = &request.file_hash {
            params.push(("moviehash", hash.to_lowercase()));
        }
        if request.imdb_id.is_none() {
            params.push(("query", request.title.trim().to_lowercase()));
        }
        if let Some(season) = request.season {
            params.push(("season_number", season.to_string()));
        }
        params.push((
            "type",
            match request.content_type {
                ContentType::Movie => "movie",
                ContentType::TvEpisode => "episode",
            }
            .to_string(),
        ));
        if let Some(year) = request.year {
            params.push(("year", year.to_string()));
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}/api/v1/subtitles?{}", self.base_url(), query)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.config.api_key)
            .header("Accept", "application/json")
    }

    /// Ask the API for a temporary download link.
    async fn request_download_link(&self, file_id: u64) -> Result<DownloadLink, ProviderError> {
        let url = format!("{}/api/v1/download", self.base_url());
        let response = self
            .authorized(self.client.post(&url))
            .json(&DownloadBody { file_id })
            .send()
            .await
            .map_err(map_request_error)?;

        let response = check_status(response, &file_id.to_string()).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ProviderClient for OpenSubtitlesClient {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenSubtitles
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn search_subtitles(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::Disabled(self.provider()));
        }

        let url = self.build_search_url(request);
        debug!(title = %request.title, "Searching OpenSubtitles");

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response, &request.title).await?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        let results = map_search_response(body, request);
        debug!(results = results.len(), "OpenSubtitles search complete");
        Ok(results)
    }

    async fn download_subtitle(&self, result: &SearchResult) -> Result<PathBuf, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::Disabled(self.provider()));
        }

        let file_id: u64 = result
            .id
            .parse()
            .map_err(|_| ProviderError::NotFound(format!("invalid file id: {}", result.id)))?;

        let link = self.request_download_link(file_id).await?;
        debug!(file_id, remaining = ?link.remaining, "Fetching OpenSubtitles download link");

        let response = self
            .client
            .get(&link.link)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response, &result.id).await?;
        let bytes = response.bytes().await.map_err(map_request_error)?;

        let dir = &self.config.download_dir;
        fs::create_dir_all(dir).await.map_err(|e| ProviderError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let name = link.file_name.as_deref().unwrap_or(&result.file_name);
        let path = dir.join(format!("{}-{}", file_id, sanitize_file_name(name)));
        fs::write(&path, &bytes).await.map_err(|e| ProviderError::Io {
            path: path.clone(),
            source: e,
        })?;

        debug!(path = %path.display(), size = bytes.len(), "Downloaded subtitle");
        Ok(path)
    }
}

fn map_request_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_connect() {
        ProviderError::ConnectionFailed(e.to_string())
    } else {
        ProviderError::ApiError(e.to_string())
    }
}

async fn check_status(
    response: reqwest::Response,
    subject: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound(subject.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::ApiError(format!(
        "HTTP {}: {}",
        status,
        body.chars().take(200).collect::<String>()
    )))
}

/// Numeric form of an IMDb id ("tt0133093" -> "133093").
fn normalize_imdb_id(imdb_id: &str) -> Option<String> {
    let digits = imdb_id.trim().trim_start_matches("tt").trim_start_matches('0');
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(digits.to_string())
    }
}

/// Release group is conventionally the suffix after the last '-'.
fn release_group(release: &str) -> Option<String> {
    let (_, group) = release.trim().rsplit_once('-')?;
    let group = group.trim();
    if group.is_empty() || !group.chars().all(|c| c.is_ascii_alphanumeric()) {
        None
    } else {
        Some(group.to_string())
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "subtitle.srt".to_string()
    } else {
        cleaned.to_string()
    }
}

fn parse_upload_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert an API response into search results, one per subtitle file.
fn map_search_response(response: SearchResponse, request: &SearchRequest) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for item in response.data {
        let attrs = item.attributes;
        let match_type = if attrs.moviehash_match {
            MatchType::Hash
        } else if request.imdb_id.is_some() {
            MatchType::Imdb
        } else {
            MatchType::Title
        };
        let release = attrs.release.unwrap_or_default();

        for file in attrs.files {
            let file_name = file
                .file_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("{}.srt", release));
            let format = SubtitleFormat::from_file_name(&file_name).unwrap_or(SubtitleFormat::Srt);

            let mut result = SearchResult::new(
                file.file_id.to_string(),
                ProviderId::OpenSubtitles,
                &attrs.language,
                format,
                file_name,
                match_type,
            );
            result.download_url = attrs.url.clone().unwrap_or_default();
            result.download_count = attrs.download_count;
            // API ratings are on a 0-10 scale.
            result.rating = attrs.ratings.filter(|r| *r > 0.0).map(|r| r / 2.0);
            result.is_verified = attrs.from_trusted;
            result.release_group = release_group(&release);
            result.upload_date = attrs.upload_date.as_deref().and_then(parse_upload_date);
            results.push(result);
        }
    }

    results
}

// OpenSubtitles API types
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SubtitleItem>,
}

#[derive(Debug, Deserialize)]
struct SubtitleItem {
    attributes: SubtitleAttributes,
}

#[derive(Debug, Deserialize)]
struct SubtitleAttributes {
    language: String,
    download_count: Option<u64>,
    ratings: Option<f64>,
    #[serde(default)]
    from_trusted: bool,
    #[serde(default)]
    moviehash_match: bool,
    upload_date: Option<String>,
    release: Option<String>,
    url: Option<String>,
    #[serde(default)]
    files: Vec<SubtitleFile>,
}

#[derive(Debug, Deserialize)]
struct SubtitleFile {
    file_id: u64,
    file_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct DownloadBody {
    file_id: u64,
}

#[derive(Debug, Deserialize)]
struct DownloadLink {
    link: String,
    file_name: Option<String>,
    remaining: Option<i64>,
}
