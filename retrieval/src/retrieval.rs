use crate::config::RankingConfig;
use crate::diversity::{DiversitySelector, SelectionMode};
use crate::error::{Result, RetrievalError};
use crate::filter::ContentFilter;
use crate::query::{FetchPlan, QueryProfile};
use crate::result::{RankStats, RetrievalResult};
use crate::scorer::CandidateScorer;
use docqa_passage_store::{SimilarityHit, SimilaritySource};
use log::{debug, info, warn};
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Cache key: the query, k, and the target-source set in canonical order.
/// Results for one target scope are never served for another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    k: usize,
    targets: Vec<String>,
}

impl CacheKey {
    fn new(query: &str, k: usize, targets: &[String]) -> Self {
        let mut targets = targets.to_vec();
        targets.sort();
        targets.dedup();
        Self {
            query: query.to_string(),
            k,
            targets,
        }
    }
}

/// Retrieval front-end: similarity search, boilerplate filtering, boosted
/// scoring and per-source diversity selection.
pub struct Ranker {
    config: RankingConfig,
    source: Arc<dyn SimilaritySource>,
    scorer: CandidateScorer,
    filter: ContentFilter,
    selector: DiversitySelector,
    cache: Option<Mutex<LruCache<CacheKey, RetrievalResult>>>,
}

impl Ranker {
    /// Create a ranker over a similarity source
    pub fn new(config: RankingConfig, source: Arc<dyn SimilaritySource>) -> Result<Self> {
        config.validate().map_err(RetrievalError::InvalidConfig)?;

        let cache = if config.enable_cache {
            let size = NonZeroUsize::new(config.cache_size)
                .ok_or_else(|| RetrievalError::Cache("Invalid cache size".to_string()))?;
            Some(Mutex::new(LruCache::new(size)))
        } else {
            None
        };

        Ok(Self {
            scorer: CandidateScorer::new(&config),
            filter: ContentFilter::new(&config),
            selector: DiversitySelector::new(&config),
            config,
            source,
            cache,
        })
    }

    /// Rank up to `k` candidates for `query`.
    ///
    /// `target_sources` restricts the result to those source documents; an
    /// empty slice means no restriction. An empty index, or a target filter
    /// that removes every hit, yields an empty result with confidence 0.0.
    /// Similarity source failures and timeouts are returned as errors and are
    /// not cached.
    pub async fn rank(
        &self,
        query: &str,
        k: usize,
        target_sources: Option<&[String]>,
    ) -> Result<RetrievalResult> {
        let start = Instant::now();
        let targets = target_sources.unwrap_or_default();

        if k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let key = CacheKey::new(query, k, targets);
        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().await;
            if let Some(cached) = cache.get(&key) {
                info!("Cache hit for query: '{query}'");
                let mut result = cached.clone();
                result.stats.cache_hit = true;
                result.stats.total_time_ms = start.elapsed().as_millis() as u64;
                return Ok(result);
            }
        }

        let profile = QueryProfile::classify(query, &self.config);
        let plan = FetchPlan::new(k, profile, !targets.is_empty(), &self.config);
        let mut stats = RankStats {
            comparative: profile.is_comparative,
            ..Default::default()
        };

        let mut hits = self.search(query, plan.request).await?;
        stats.fetched = hits.len();
        debug!("Similarity source returned {} hits", hits.len());

        if !targets.is_empty() {
            let wanted: HashSet<&str> = targets.iter().map(String::as_str).collect();
            hits.retain(|hit| {
                hit.passage
                    .metadata
                    .source
                    .as_deref()
                    .is_some_and(|source| wanted.contains(source))
            });
            stats.off_target = stats.fetched - hits.len();
            hits.truncate(plan.keep);
        }

        let result = if hits.is_empty() {
            debug!("No relevant documents for query: '{query}'");
            RetrievalResult::empty()
        } else {
            let (hits, dropped) = self.filter.retain_informative(hits);
            stats.boilerplate = dropped;

            let ranked = self.scorer.score_all(&hits, profile.is_comparative);
            let mode = SelectionMode::for_request(profile, targets.len());
            let selection = self.selector.select(&ranked, k, mode);
            stats.backfilled = selection.backfilled;

            RetrievalResult::from_selected(selection.candidates)
        };

        stats.total_time_ms = start.elapsed().as_millis() as u64;
        let result = result.with_stats(stats);

        if let Some(cache) = &self.cache {
            cache.lock().await.put(key, result.clone());
        }

        info!(
            "Ranked {} candidates in {}ms (confidence {:.3})",
            result.len(),
            result.stats.total_time_ms,
            result.retrieval_confidence
        );

        Ok(result)
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SimilarityHit>> {
        let timeout = Duration::from_millis(self.config.search_timeout_ms);
        match tokio::time::timeout(timeout, self.source.search(query, count)).await {
            Ok(Ok(hits)) => Ok(hits),
            Ok(Err(err)) => {
                warn!("Similarity search failed: {err}");
                Err(err.into())
            }
            Err(_) => {
                warn!("Similarity search timed out after {}ms", self.config.search_timeout_ms);
                Err(RetrievalError::Timeout {
                    elapsed_ms: self.config.search_timeout_ms,
                })
            }
        }
    }

    /// Clear result cache
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().await.clear();
            info!("Result cache cleared");
        }
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        match &self.cache {
            Some(cache) => {
                let cache = cache.lock().await;
                CacheStats {
                    size: cache.len(),
                    capacity: cache.cap().get(),
                }
            }
            None => CacheStats::default(),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RankingConfig {
        &self.config
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
}
