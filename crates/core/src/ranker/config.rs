//! Configuration for the result ranker.

use serde::{Deserialize, Serialize};

use crate::subtitle::SubtitleFormat;

/// Static inputs to ranking.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankerConfig {
    /// Release groups whose subtitles are known to be well timed.
    #[serde(default = "default_release_groups")]
    pub known_release_groups: Vec<String>,
    /// Formats the playback engine renders natively.
    #[serde(default = "default_compatible_formats")]
    pub compatible_formats: Vec<SubtitleFormat>,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            known_release_groups: default_release_groups(),
            compatible_formats: default_compatible_formats(),
        }
    }
}

fn default_release_groups() -> Vec<String> {
    [
        "SPARKS", "FLUX", "NTB", "NTG", "CMRG", "GECKOS", "AMIABLE", "TEPES", "EDITH", "KOGI",
        "RARBG", "YIFY", "YTS",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_compatible_formats() -> Vec<SubtitleFormat> {
    vec![
        SubtitleFormat::Srt,
        SubtitleFormat::Vtt,
        SubtitleFormat::Ass,
        SubtitleFormat::Ssa,
    ]
}
