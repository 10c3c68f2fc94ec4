use crate::config::RankingConfig;
use log::debug;

/// How a query is treated by the over-fetch and selection stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryProfile {
    /// The query compares entities or time periods
    pub is_comparative: bool,
}

impl QueryProfile {
    /// Classify a query against the configured comparative keywords.
    ///
    /// Keywords are plain substrings: "vs" also fires inside "canvas".
    pub fn classify(query: &str, config: &RankingConfig) -> Self {
        let query_lower = query.to_lowercase();
        let is_comparative = config
            .comparative_keywords
            .iter()
            .any(|kw| query_lower.contains(&kw.to_lowercase()));

        debug!("Query classified: comparative={is_comparative}");
        Self { is_comparative }
    }
}

/// How many hits to request from the similarity source and how many to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    /// Count passed to `SimilaritySource::search`
    pub request: usize,

    /// Hits kept after the target-source filter
    pub keep: usize,
}

/// Over-fetch width for `k` requested candidates
pub fn overfetch_width(k: usize, profile: QueryProfile, config: &RankingConfig) -> usize {
    let factor = if profile.is_comparative {
        config.comparative_overfetch
    } else {
        config.standard_overfetch
    };
    k.saturating_mul(factor)
}

impl FetchPlan {
    pub fn new(
        k: usize,
        profile: QueryProfile,
        has_targets: bool,
        config: &RankingConfig,
    ) -> Self {
        let width = overfetch_width(k, profile, config);
        let request = if has_targets {
            width.saturating_mul(config.target_overfetch_multiplier)
        } else {
            width
        };
        Self {
            request,
            keep: width,
        }
    }
}
