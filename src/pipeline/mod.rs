//! The canonical request pipeline
//!
//! One entry point handles every chat request: authenticate, rate-limit,
//! branch to feedback, short-circuit greetings, then run the tiered search
//! (full-text, LIKE fallback, browse) with Q&A ranking and a fuzzy
//! "did you mean" when everything comes back empty.

pub mod greeting;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::cache::{response_cache_key, MemoryStore};
use crate::config::Config;
use crate::error::{CollegiumError, Result};
use crate::feedback::{FeedbackAction, FeedbackUpdater};
use crate::keywords::KeywordExtractor;
use crate::lexicon::Lexicon;
use crate::query;
use crate::ranking::fuzzy::NameMatcher;
use crate::ranking::{EditDistance, QaRanker, RankedQa};
use crate::ratelimit::RateLimiter;
use crate::storage::{Database, Tenant};
use crate::text;

use greeting::GreetingMatcher;
use response::{ApiResponse, FeedbackResponse, QaHit, SearchResponse, TenantInfo};

/// Follow-ups offered when a tenant has no BASIC record of its own.
const DEFAULT_SUGGESTIONS: &[&str] = &[
    "Ask about placements",
    "Ask about fees",
    "Ask about hostel",
    "How do I apply?",
];

/// One inbound chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub token: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub feedback: Option<FeedbackPayload>,
    #[serde(default)]
    pub client: ClientInfo,
}

/// Feedback attached to a request instead of a search.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeedbackPayload {
    pub target_id: i64,
    pub action: FeedbackAction,
}

/// Where the request came from, for rate limiting and audit logs.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub ip: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            user_agent: None,
        }
    }
}

pub struct SearchPipeline {
    db: Arc<Database>,
    cache: Arc<MemoryStore>,
    limiter: RateLimiter,
    extractor: KeywordExtractor,
    ranker: QaRanker,
    matcher: NameMatcher,
    updater: FeedbackUpdater,
    config: Config,
}

impl SearchPipeline {
    pub fn new(db: Arc<Database>, cache: Arc<MemoryStore>, config: Config) -> Self {
        let limiter = RateLimiter::new(cache.clone(), &config.rate_limit);
        let extractor =
            KeywordExtractor::new(config.search.min_token_len, config.search.top_k);
        let similarity = Arc::new(EditDistance::new(config.ranking.similarity_prefix_chars));
        let ranker = QaRanker::new(
            similarity,
            config.ranking.overlap_weight,
            config.ranking.similarity_weight,
            config.ranking.tag_bonus,
        );
        let matcher = NameMatcher::new(
            config.search.fuzzy_threshold,
            config.ranking.similarity_prefix_chars,
        );
        let clamp = match (config.ranking.rank_score_min, config.ranking.rank_score_max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        };
        let updater = FeedbackUpdater::new(db.clone(), cache.clone(), clamp);

        Self {
            db,
            cache,
            limiter,
            extractor,
            ranker,
            matcher,
            updater,
            config,
        }
    }

    /// Handle one request end to end.
    pub fn handle(&self, request: &ChatRequest) -> Result<ApiResponse> {
        if request.token.trim().is_empty() {
            return Err(CollegiumError::Unauthorized(
                "auth token required".to_string(),
            ));
        }

        let tenant = self.db.resolve_token(&request.token)?.ok_or_else(|| {
            tracing::warn!(ip = %request.client.ip, "rejected unknown auth token");
            CollegiumError::Unauthorized("invalid auth token or inactive college".to_string())
        })?;

        self.limiter
            .check(&request.token, &request.client.ip, Utc::now())
            .map_err(|e| {
                tracing::warn!(tenant = %tenant.id, ip = %request.client.ip, "rate limited");
                e
            })?;

        let limit = request
            .limit
            .map(|l| l.clamp(1, self.config.search.max_limit))
            .unwrap_or(self.config.search.default_limit);
        let normalized_query = text::normalize(&request.query);

        if let Some(feedback) = &request.feedback {
            return self.handle_feedback(&tenant, feedback, request, &normalized_query, limit);
        }

        let lexicon = Lexicon::load(&self.db);

        // Small talk never reaches the search tiers or the cache.
        if let Some(reply) = GreetingMatcher::new(&lexicon).match_greeting(&normalized_query) {
            tracing::debug!(tenant = %tenant.id, "greeting fast-path");
            return Ok(ApiResponse::Search(Box::new(SearchResponse {
                status: "ok".to_string(),
                college: TenantInfo::from(&tenant),
                query: request.query.clone(),
                normalized_query,
                extracted_keywords: vec![],
                results_count: 0,
                results: vec![],
                greeting: Some(reply.to_string()),
                nearest_qa: vec![],
                suggestions: self.suggestions(&tenant.id),
                suggested_name: None,
                corrected_query: None,
            })));
        }

        let cache_key = response_cache_key(&tenant.id, &normalized_query, limit);
        if let Some(cached) = self.cache.get_json::<SearchResponse>(&cache_key) {
            tracing::debug!(tenant = %tenant.id, "response cache hit");
            return Ok(ApiResponse::Search(Box::new(cached)));
        }

        let response = self.search(&tenant, request, &normalized_query, limit, &lexicon)?;

        let ttl = Duration::from_secs(self.config.cache.response_ttl_secs);
        if let Err(e) = self.cache.set_json(&cache_key, &response, ttl) {
            tracing::warn!(tenant = %tenant.id, "failed to cache response: {e}");
        }

        Ok(ApiResponse::Search(Box::new(response)))
    }

    fn handle_feedback(
        &self,
        tenant: &Tenant,
        feedback: &FeedbackPayload,
        request: &ChatRequest,
        normalized_query: &str,
        limit: usize,
    ) -> Result<ApiResponse> {
        self.updater.apply(
            tenant,
            feedback.target_id,
            feedback.action,
            &request.client.ip,
            request.client.user_agent.as_deref(),
            normalized_query,
            limit,
        )?;
        Ok(ApiResponse::Feedback(FeedbackResponse {
            status: "ok".to_string(),
            message: "feedback recorded".to_string(),
            target_id: feedback.target_id,
            action: feedback.action.as_str().to_string(),
        }))
    }

    fn search(
        &self,
        tenant: &Tenant,
        request: &ChatRequest,
        normalized_query: &str,
        limit: usize,
        lexicon: &Lexicon,
    ) -> Result<SearchResponse> {
        let keywords = self.extractor.extract(&request.query, lexicon);

        let records = if keywords.is_empty() {
            // Nothing extractable: browse the newest published records.
            self.db.recent_records(&tenant.id, limit)?
        } else {
            self.tiered_search(&tenant.id, &keywords, limit)
        };

        let results: Vec<_> = records
            .into_iter()
            .map(|record| response::record_hit(record, &keywords))
            .collect();

        let mut nearest_qa = vec![];
        let mut suggested_name = None;
        let mut corrected_query = None;
        let suggestions;

        if results.is_empty() {
            nearest_qa = self.nearest_qa(&tenant.id, &keywords, normalized_query);
            if let Some(found) = self.did_you_mean(&tenant.id, normalized_query) {
                corrected_query = Some(text::normalize(&found));
                suggested_name = Some(found);
            }
            suggestions = self.suggestions(&tenant.id);
        } else {
            // Hit path: only follow-ups the results themselves carry.
            suggestions = response::payload_suggestions(&results);
        }

        tracing::info!(
            tenant = %tenant.id,
            keywords = keywords.len(),
            results = results.len(),
            qa = nearest_qa.len(),
            "search served"
        );

        Ok(SearchResponse {
            status: "ok".to_string(),
            college: TenantInfo::from(tenant),
            query: request.query.clone(),
            normalized_query: normalized_query.to_string(),
            extracted_keywords: keywords,
            results_count: results.len(),
            results,
            greeting: None,
            nearest_qa,
            suggestions,
            suggested_name,
            corrected_query,
        })
    }

    /// Full-text first, LIKE as the safety net. A failing tier logs and
    /// yields to the next; only an empty outcome is final.
    fn tiered_search(
        &self,
        tenant_id: &str,
        keywords: &[String],
        limit: usize,
    ) -> Vec<crate::storage::RecordRow> {
        let match_expr = query::fulltext_expression(keywords);

        let mut records = if match_expr.is_empty() {
            vec![]
        } else {
            match self.db.search_records_fts(tenant_id, &match_expr, limit) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::info!(tenant_id, "full-text tier failed, falling back: {e}");
                    vec![]
                }
            }
        };

        if records.is_empty() {
            records = match self.db.search_records_like(
                tenant_id,
                keywords,
                limit,
                self.config.search.max_like_keywords,
            ) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(tenant_id, "LIKE tier failed: {e}");
                    vec![]
                }
            };
        }

        records
    }

    /// Ranked Q&A suggestions; any storage failure degrades to none.
    fn nearest_qa(
        &self,
        tenant_id: &str,
        keywords: &[String],
        normalized_query: &str,
    ) -> Vec<QaHit> {
        let candidate_limit = self.config.search.qa_candidate_limit;
        let match_expr = query::fulltext_expression(keywords);

        let fetched = if match_expr.is_empty() {
            Ok(vec![])
        } else {
            self.db.qa_candidates_fts(tenant_id, &match_expr, candidate_limit)
        };

        let candidates = match fetched {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => match self.db.qa_candidates_like(
                tenant_id,
                keywords,
                candidate_limit,
                self.config.search.max_like_keywords,
            ) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(tenant_id, "Q&A LIKE lookup failed: {e}");
                    vec![]
                }
            },
            Err(e) => {
                tracing::warn!(tenant_id, "Q&A full-text lookup failed: {e}");
                vec![]
            }
        };

        self.ranker
            .rank(candidates, normalized_query)
            .into_iter()
            .take(self.config.search.qa_top)
            .map(|RankedQa { candidate, score }| QaHit {
                id: candidate.id,
                question: candidate.question,
                answer: candidate.answer,
                tags: candidate.tags,
                score,
            })
            .collect()
    }

    /// Closest catalog name for a query that matched nothing.
    fn did_you_mean(&self, tenant_id: &str, normalized_query: &str) -> Option<String> {
        if normalized_query.is_empty() {
            return None;
        }
        let names = match self
            .db
            .catalog_titles(tenant_id, self.config.search.catalog_limit)
        {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(tenant_id, "catalog lookup failed: {e}");
                return None;
            }
        };
        self.matcher
            .best_match(normalized_query, &names)
            .map(|m| m.name)
    }

    /// Tenant-curated follow-ups, defaults when none exist.
    fn suggestions(&self, tenant_id: &str) -> Vec<String> {
        let curated = self.db.basic_suggestions(tenant_id).unwrap_or_else(|e| {
            tracing::debug!(tenant_id, "suggestion lookup failed: {e}");
            vec![]
        });
        if curated.is_empty() {
            DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
        } else {
            curated
        }
    }
}
