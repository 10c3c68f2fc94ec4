use serde::{Deserialize, Serialize};

/// Additive boosts applied to a candidate's similarity when its text carries
/// a content signal. The boost factor starts at 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostWeights {
    /// Text contains at least one numeric character (any script, including superscripts)
    #[serde(default = "default_digits_boost")]
    pub digits: f32,

    /// Text contains `%`
    #[serde(default = "default_percentage_boost")]
    pub percentage: f32,

    /// Text contains `$`
    #[serde(default = "default_currency_boost")]
    pub currency: f32,

    /// Text contains `TABLE` (any case) or a pipe
    #[serde(default = "default_table_boost")]
    pub table: f32,

    /// Comparative query and text contains a temporal/comparison word
    #[serde(default = "default_temporal_boost")]
    pub temporal: f32,
}

fn default_digits_boost() -> f32 {
    0.15
}

fn default_percentage_boost() -> f32 {
    0.10
}

fn default_currency_boost() -> f32 {
    0.08
}

fn default_table_boost() -> f32 {
    0.12
}

fn default_temporal_boost() -> f32 {
    0.10
}

impl Default for BoostWeights {
    fn default() -> Self {
        Self {
            digits: default_digits_boost(),
            percentage: default_percentage_boost(),
            currency: default_currency_boost(),
            table: default_table_boost(),
            temporal: default_temporal_boost(),
        }
    }
}

impl BoostWeights {
    fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> {
        [
            ("digits", self.digits),
            ("percentage", self.percentage),
            ("currency", self.currency),
            ("table", self.table),
            ("temporal", self.temporal),
        ]
        .into_iter()
    }
}

/// Configuration for scoring, filtering and diversity selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Content-signal boosts
    #[serde(default)]
    pub boosts: BoostWeights,

    /// Maximum chunks per source in standard selection (before backfill)
    #[serde(default = "default_standard_per_source_cap")]
    pub standard_per_source_cap: usize,

    /// Lower bound of the per-source quota in comparative selection
    #[serde(default = "default_comparative_min_per_source")]
    pub comparative_min_per_source: usize,

    /// Over-fetch factor applied to k for ordinary queries
    #[serde(default = "default_standard_overfetch")]
    pub standard_overfetch: usize,

    /// Over-fetch factor applied to k for comparative queries
    #[serde(default = "default_comparative_overfetch")]
    pub comparative_overfetch: usize,

    /// Extra widening applied before discarding hits outside the target sources
    #[serde(default = "default_target_overfetch_multiplier")]
    pub target_overfetch_multiplier: usize,

    /// Boilerplate is only dropped when shorter than this many words
    #[serde(default = "default_boilerplate_max_words")]
    pub boilerplate_max_words: usize,

    /// Substrings that mark a query as comparative (matched case-insensitively)
    #[serde(default = "default_comparative_keywords")]
    pub comparative_keywords: Vec<String>,

    /// Temporal/comparison words that earn the temporal boost (case-sensitive)
    #[serde(default = "default_temporal_words")]
    pub temporal_words: Vec<String>,

    /// Boilerplate markers (matched against lowercased text)
    #[serde(default = "default_boilerplate_markers")]
    pub boilerplate_markers: Vec<String>,

    /// Enable caching of ranked results
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Cache size (number of requests to cache)
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Upper bound on a single similarity search call
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
}

fn default_standard_per_source_cap() -> usize {
    3
}

fn default_comparative_min_per_source() -> usize {
    2
}

fn default_standard_overfetch() -> usize {
    3
}

fn default_comparative_overfetch() -> usize {
    4
}

fn default_target_overfetch_multiplier() -> usize {
    3
}

fn default_boilerplate_max_words() -> usize {
    100
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_comparative_keywords() -> Vec<String> {
    to_strings(&[
        "between",
        "vs",
        "versus",
        "compare",
        "compared",
        "difference",
        "changed",
        "change",
        "first and second",
        "Q1 and Q2",
        "quarter",
    ])
}

fn default_temporal_words() -> Vec<String> {
    to_strings(&[
        "quarter", "Q1", "Q2", "Q3", "Q4", "year", "period", "change", "increase", "decrease",
        "compared",
    ])
}

fn default_boilerplate_markers() -> Vec<String> {
    to_strings(&[
        "table of contents",
        "contents\n",
        "page number",
        "chapter 1\n",
        "chapter 2\n",
        "section 1\n",
        "section 2\n",
        "...........",
        "copyright notice",
        "all rights reserved",
    ])
}

fn default_true() -> bool {
    true
}

fn default_cache_size() -> usize {
    100
}

fn default_search_timeout_ms() -> u64 {
    30_000
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            boosts: BoostWeights::default(),
            standard_per_source_cap: default_standard_per_source_cap(),
            comparative_min_per_source: default_comparative_min_per_source(),
            standard_overfetch: default_standard_overfetch(),
            comparative_overfetch: default_comparative_overfetch(),
            target_overfetch_multiplier: default_target_overfetch_multiplier(),
            boilerplate_max_words: default_boilerplate_max_words(),
            comparative_keywords: default_comparative_keywords(),
            temporal_words: default_temporal_words(),
            boilerplate_markers: default_boilerplate_markers(),
            enable_cache: true,
            cache_size: default_cache_size(),
            search_timeout_ms: default_search_timeout_ms(),
        }
    }
}

impl RankingConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, weight) in self.boosts.iter() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!(
                    "boosts.{name} must be a non-negative number, got {weight}"
                ));
            }
        }

        if self.standard_per_source_cap == 0 {
            return Err("standard_per_source_cap must be > 0".to_string());
        }

        if self.comparative_min_per_source == 0 {
            return Err("comparative_min_per_source must be > 0".to_string());
        }

        if self.standard_overfetch == 0 || self.comparative_overfetch == 0 {
            return Err("over-fetch factors must be > 0".to_string());
        }

        if self.target_overfetch_multiplier == 0 {
            return Err("target_overfetch_multiplier must be > 0".to_string());
        }

        if self.enable_cache && self.cache_size == 0 {
            return Err("cache_size must be > 0 when caching is enabled".to_string());
        }

        if self.search_timeout_ms == 0 {
            return Err("search_timeout_ms must be > 0".to_string());
        }

        Ok(())
    }

    /// Config without result caching, for callers that rank each query once
    pub fn uncached() -> Self {
        Self {
            enable_cache: false,
            ..Default::default()
        }
    }
}
