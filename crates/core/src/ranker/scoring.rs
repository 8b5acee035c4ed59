//! Result scoring and ordering.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use super::RankerConfig;
use crate::subtitle::{ContentType, MatchType, ProviderId, SearchRequest, SearchResult};

pub const MATCH_ACCURACY_WEIGHT: f64 = 0.35;
pub const PROVIDER_RELIABILITY_WEIGHT: f64 = 0.15;
pub const CONTENT_QUALITY_WEIGHT: f64 = 0.25;
pub const USER_PREFERENCE_WEIGHT: f64 = 0.15;
pub const TECHNICAL_WEIGHT: f64 = 0.10;

// Match accuracy bonuses on top of the match type's confidence.
const LANGUAGE_MATCH_BONUS: f64 = 0.10;
const FORMAT_MATCH_BONUS: f64 = 0.05;
const EPISODE_MATCH_BONUS: f64 = 0.10;
const YEAR_MATCH_BONUS: f64 = 0.05;

// Content quality shares.
const DOWNLOAD_SHARE: f64 = 0.40;
/// Download count at which the download share saturates.
const DOWNLOAD_SATURATION: f64 = 100_000.0;
const RATING_SHARE: f64 = 0.30;
const VERIFIED_BONUS: f64 = 0.20;
const RELEASE_GROUP_BONUS: f64 = 0.10;

// User preference shares.
const LANGUAGE_PREFERENCE_SHARE: f64 = 0.70;
const FORMAT_PREFERENCE_SHARE: f64 = 0.30;

// Technical adjustments.
const TECHNICAL_BASE: f64 = 0.5;
const COMPATIBLE_FORMAT_BONUS: f64 = 0.20;
const MIN_REASONABLE_SIZE: u64 = 2 * 1024;
const MAX_REASONABLE_SIZE: u64 = 2 * 1024 * 1024;
const SMALL_FILE_PENALTY: f64 = 0.25;
const LARGE_FILE_PENALTY: f64 = 0.15;
const RECENT_UPLOAD_DAYS: i64 = 30;
const RECENT_UPLOAD_BONUS: f64 = 0.05;
const SYNC_KEYWORD_BONUS: f64 = 0.05;
const AUTO_GENERATED_PENALTY: f64 = 0.20;

static SEASON_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)s(\d{1,2})[ ._-]?e(\d{1,3})").unwrap());

static CROSS_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])(\d{1,2})x(\d{2,3})(?:[^0-9]|$)").unwrap());

/// Per-factor scores behind a result's `match_score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub match_accuracy: f64,
    pub provider_reliability: f64,
    pub content_quality: f64,
    pub user_preference: f64,
    pub technical: f64,
    /// Weighted total, clamped to [0, 1].
    pub total: f64,
    /// Human-readable notes on what moved the score.
    pub factors: Vec<String>,
}

/// Scores and orders search results against a request.
#[derive(Debug, Clone)]
pub struct ResultRanker {
    config: RankerConfig,
    known_release_groups: HashSet<String>,
}

impl Default for ResultRanker {
    fn default() -> Self {
        Self::new(RankerConfig::default())
    }
}

impl ResultRanker {
    pub fn new(config: RankerConfig) -> Self {
        let known_release_groups = config
            .known_release_groups
            .iter()
            .map(|g| g.trim().to_uppercase())
            .collect();
        Self {
            config,
            known_release_groups,
        }
    }

    /// Score every result and return them best first.
    pub fn rank(&self, results: Vec<SearchResult>, request: &SearchRequest) -> Vec<SearchResult> {
        self.rank_at(results, request, Utc::now())
    }

    /// `rank` with an explicit current time for recency scoring.
    pub fn rank_at(
        &self,
        mut results: Vec<SearchResult>,
        request: &SearchRequest,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        for result in &mut results {
            result.match_score = self.score_breakdown_at(result, request, now).total;
        }
        sort_results(&mut results);
        results
    }

    /// Explain how a result is scored.
    pub fn score_breakdown(&self, result: &SearchResult, request: &SearchRequest) -> ScoreBreakdown {
        self.score_breakdown_at(result, request, Utc::now())
    }

    pub fn score_breakdown_at(
        &self,
        result: &SearchResult,
        request: &SearchRequest,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let mut factors = Vec::new();

        let match_accuracy = self.match_accuracy(result, request, &mut factors);
        let provider_reliability = provider_reliability(&result.provider);
        if provider_reliability >= 0.85 {
            factors.push(format!("reliable provider ({})", result.provider));
        }
        let content_quality = self.content_quality(result, &mut factors);
        let user_preference = self.user_preference(result, request, &mut factors);
        let technical = self.technical(result, now, &mut factors);

        let total = (match_accuracy * MATCH_ACCURACY_WEIGHT
            + provider_reliability * PROVIDER_RELIABILITY_WEIGHT
            + content_quality * CONTENT_QUALITY_WEIGHT
            + user_preference * USER_PREFERENCE_WEIGHT
            + technical * TECHNICAL_WEIGHT)
            .clamp(0.0, 1.0);

        ScoreBreakdown {
            match_accuracy,
            provider_reliability,
            content_quality,
            user_preference,
            technical,
            total,
            factors,
        }
    }

    fn match_accuracy(
        &self,
        result: &SearchResult,
        request: &SearchRequest,
        factors: &mut Vec<String>,
    ) -> f64 {
        let mut score = result.match_type.confidence();
        factors.push(
            match result.match_type {
                MatchType::Hash => "file hash match",
                MatchType::Imdb => "IMDb match",
                MatchType::Title => "title match",
                MatchType::Fuzzy => "fuzzy match",
            }
            .to_string(),
        );

        if request.language_rank(&result.language).is_some() {
            score += LANGUAGE_MATCH_BONUS;
        }

        if request.format_rank(result.format).is_some() {
            score += FORMAT_MATCH_BONUS;
        }

        if request.content_type == ContentType::TvEpisode {
            if let (Some(season), Some(episode)) = (request.season, request.episode) {
                if names_episode(&result.file_name, season, episode) {
                    score += EPISODE_MATCH_BONUS;
                    factors.push(format!("episode S{:02}E{:02} in file name", season, episode));
                }
            }
        }

        if let Some(year) = request.year {
            if result.file_name.contains(&year.to_string()) {
                score += YEAR_MATCH_BONUS;
                factors.push(format!("year {} in file name", year));
            }
        }

        score.min(1.0)
    }

    fn content_quality(&self, result: &SearchResult, factors: &mut Vec<String>) -> f64 {
        let mut score = 0.0;

        if let Some(count) = result.download_count {
            let scaled = (count as f64 + 1.0).log10() / (DOWNLOAD_SATURATION + 1.0).log10();
            score += scaled.min(1.0) * DOWNLOAD_SHARE;
            if count >= 1_000 {
                factors.push(format!("{} downloads", count));
            }
        }

        if let Some(rating) = result.rating {
            score += (rating.clamp(0.0, 5.0) / 5.0) * RATING_SHARE;
        }

        if result.is_verified {
            score += VERIFIED_BONUS;
            factors.push("verified".to_string());
        }

        if let Some(group) = &result.release_group {
            if self.known_release_groups.contains(&group.trim().to_uppercase()) {
                score += RELEASE_GROUP_BONUS;
                factors.push(format!("known release group {}", group));
            }
        }

        score.min(1.0)
    }

    fn user_preference(
        &self,
        result: &SearchResult,
        request: &SearchRequest,
        factors: &mut Vec<String>,
    ) -> f64 {
        let mut score = 0.0;

        if let Some(rank) = request.language_rank(&result.language) {
            let count = request.languages.len() as f64;
            score += LANGUAGE_PREFERENCE_SHARE * (count - rank as f64) / count;
            if rank == 0 {
                factors.push("first-choice language".to_string());
            }
        }

        if request.preferred_formats.is_empty() {
            score += FORMAT_PREFERENCE_SHARE * 0.5;
        } else if let Some(rank) = request.format_rank(result.format) {
            let count = request.preferred_formats.len() as f64;
            score += FORMAT_PREFERENCE_SHARE * (count - rank as f64) / count;
        }

        score.min(1.0)
    }

    fn technical(
        &self,
        result: &SearchResult,
        now: DateTime<Utc>,
        factors: &mut Vec<String>,
    ) -> f64 {
        let mut score = TECHNICAL_BASE;

        if self.config.compatible_formats.contains(&result.format) {
            score += COMPATIBLE_FORMAT_BONUS;
        } else {
            factors.push(format!("{} not natively supported", result.format.extension()));
        }

        if let Some(size) = result.file_size {
            if size < MIN_REASONABLE_SIZE {
                score -= SMALL_FILE_PENALTY;
                factors.push("suspiciously small file".to_string());
            } else if size > MAX_REASONABLE_SIZE {
                score -= LARGE_FILE_PENALTY;
                factors.push("unusually large file".to_string());
            }
        }

        if let Some(uploaded) = result.upload_date {
            let age = now - uploaded;
            if age >= Duration::zero() && age <= Duration::days(RECENT_UPLOAD_DAYS) {
                score += RECENT_UPLOAD_BONUS;
                factors.push("recent upload".to_string());
            }
        }

        let name = result.file_name.to_lowercase();
        if name.contains("sync") || name.contains("fixed") {
            score += SYNC_KEYWORD_BONUS;
            factors.push("synced/fixed release".to_string());
        }
        if name.contains("auto-generated") || name.contains("autogenerated") {
            score -= AUTO_GENERATED_PENALTY;
            factors.push("auto-generated".to_string());
        }

        score.clamp(0.0, 1.0)
    }
}

/// Order results best first.
///
/// Keys: match score, download count, rating (both descending, missing
/// values last), then language name and file name ascending.
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.match_score
            .total_cmp(&a.match_score)
            .then_with(|| descending_nulls_last(a.download_count, b.download_count))
            .then_with(|| descending_nulls_last(a.rating, b.rating))
            .then_with(|| a.language_name.cmp(&b.language_name))
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
}

fn descending_nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Fixed reliability estimate per provider.
fn provider_reliability(provider: &ProviderId) -> f64 {
    match provider {
        ProviderId::Local => 0.95,
        ProviderId::OpenSubtitles => 0.90,
        ProviderId::Podnapisi => 0.85,
        ProviderId::Addic7ed => 0.85,
        ProviderId::Subdl => 0.80,
        ProviderId::Yify => 0.60,
        ProviderId::Other(_) => 0.5,
    }
}

/// Whether a file name carries `sNNeNN` or `NxNN` for the given episode.
fn names_episode(file_name: &str, season: u32, episode: u32) -> bool {
    let matches = |re: &Regex| {
        re.captures_iter(file_name).any(|caps| {
            let s = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
            let e = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
            s == Some(season) && e == Some(episode)
        })
    };
    matches(&SEASON_EPISODE) || matches(&CROSS_EPISODE)
}
