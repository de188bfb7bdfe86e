//! `agri-agent`: operator CLI for the claim fusion pipeline.

use agri_config::AppConfig;
use agri_providers::{
    DuckDuckGoSearch, GeminiCompleter, GeminiConfig, GeminiEmbedder, HttpPageScraper,
    ScraperConfig, TavilySearch,
};
use agri_resilience::{CircuitBreaker, CircuitBreakerConfig, RateLimiter};
use agri_workflow::{AgriWorkflow, SearchConfig, SearchStage};
use anyhow::{Context, Result};
use article_validator::{ArticleValidator, ValidationReport};
use clap::{Parser, Subcommand};
use claim_extraction::{ClaimExtractor, ExtractorConfig};
use claim_resolver::Resolver;
use nli_judge::{JudgeCache, NliJudge};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "agri-agent",
    about = "Fuse Vietnamese agricultural web claims into an auditable gold set"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the search -> extract -> resolve -> write workflow for a crop.
    Query {
        /// Crop or entity to research, e.g. "Lúa ST25".
        crop: String,
        /// Override the generated search query.
        #[arg(long)]
        query: Option<String>,
        /// Emit the full workflow state as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate a wiki article (markdown) against fresh web evidence.
    Validate {
        /// Path to the markdown article.
        file: PathBuf,
        /// Skip the web cross-check and validate the article standalone.
        #[arg(long)]
        no_web: bool,
        /// Emit the full validation report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    let services = Services::build(&config)?;

    match cli.command {
        Command::Query { crop, query, json } => {
            let state = services
                .workflow
                .run(&crop, query.as_deref(), None)
                .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("{}", state.summary);
                if !state.debug.errors.is_empty() {
                    eprintln!("\n{} nguồn gặp lỗi (xem --json để biết chi tiết)", state.debug.errors.len());
                }
            }
        }
        Command::Validate { file, no_web, json } => {
            let report = services
                .validator
                .validate_file(&file, !no_web)
                .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_report(&report));
            }
            if !report.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Wired service graph: the rate limiter and circuit breaker are built once
/// and shared by the extractor and the judge, enforcing process-wide limits
/// against the single LLM provider.
struct Services {
    workflow: Arc<AgriWorkflow>,
    validator: ArticleValidator,
}

impl Services {
    fn build(config: &AppConfig) -> Result<Self> {
        let api_key = agri_config::google_api_key().context(
            "GOOGLE_API_KEY chưa được thiết lập trong môi trường. \
             Hãy cấu hình API key trước khi chạy.",
        )?;

        let limiter = Arc::new(RateLimiter::new(
            config.resilience.rate_limit_max_requests,
            Duration::from_millis(config.resilience.rate_limit_window_ms),
        ));
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: config.resilience.breaker_failure_threshold,
            timeout: Duration::from_secs(config.resilience.breaker_timeout_secs),
            half_open_max: config.resilience.breaker_half_open_max,
        }));

        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let extraction_llm = GeminiConfig {
            model: config.llm.model.clone(),
            embedding_model: config.llm.embedding_model.clone(),
            temperature: config.llm.extraction_temperature,
            timeout,
            ..GeminiConfig::default()
        };
        let judge_llm = GeminiConfig {
            temperature: config.llm.judge_temperature,
            ..extraction_llm.clone()
        };

        let extractor = Arc::new(ClaimExtractor::new(
            Arc::new(GeminiCompleter::new(api_key.clone(), extraction_llm.clone())),
            Arc::clone(&limiter),
            Arc::clone(&breaker),
            ExtractorConfig {
                chunk_threshold: config.extraction.chunk_threshold,
                chunk_size: config.extraction.chunk_size,
                overlap: config.extraction.overlap,
                max_retries: config.extraction.max_retries,
                ..ExtractorConfig::default()
            },
        ));

        let embedder = Arc::new(GeminiEmbedder::new(api_key.clone(), extraction_llm));
        let trust = Arc::new(config.trust.clone());

        let judge = Arc::new(NliJudge::new(
            Arc::new(GeminiCompleter::new(api_key, judge_llm)),
            Some(embedder),
            JudgeCache::new(config.judge_cache_dir()),
            Arc::clone(&limiter),
            Arc::clone(&breaker),
        ));

        let resolver = Arc::new(Resolver::new(Arc::clone(&trust), Some(Arc::clone(&judge))));

        let fallback_search = agri_config::tavily_api_key().map(|key| {
            Arc::new(TavilySearch::new(key, timeout, 10)) as Arc<dyn agri_providers::SearchProvider>
        });
        let search_stage = SearchStage::new(
            Arc::new(DuckDuckGoSearch::new(timeout, config.search.max_urls)),
            fallback_search,
            Arc::clone(&trust),
            SearchConfig {
                region: config.search.region.clone(),
                blocked_hosts: config.search.blocked_hosts.clone(),
                min_trust: config.search.min_trust,
                max_urls: config.search.max_urls,
            },
        );

        let workflow = Arc::new(AgriWorkflow::new(
            search_stage,
            Arc::clone(&extractor),
            Arc::new(HttpPageScraper::new(ScraperConfig {
                timeout,
                ..ScraperConfig::default()
            })),
            Arc::clone(&resolver),
        ));

        let validator = ArticleValidator::new(
            extractor,
            resolver,
            Some(judge),
            Some(Arc::clone(&workflow)),
        );

        Ok(Self {
            workflow,
            validator,
        })
    }
}

/// Human-readable validation report.
fn render_report(report: &ValidationReport) -> String {
    if !report.success {
        return format!("Validation thất bại: {}", report.errors.join("; "));
    }

    let mut lines = Vec::new();
    lines.push(format!("Bài viết: {}", report.article_title));
    lines.push(format!("Điểm validation: {:.0}%", report.validation_score * 100.0));
    lines.push(format!("Số claims trích xuất: {}", report.article_claims.len()));
    lines.push(format!("Số claims đã validate: {}", report.resolved_claims.len()));

    if !report.warnings.is_empty() {
        lines.push(format!("Cảnh báo ({}):", report.warnings.len()));
        for warning in &report.warnings {
            lines.push(format!("  - {warning}"));
        }
    }

    if !report.resolved_claims.is_empty() {
        lines.push("Top claims đã validate:".to_string());
        for (index, resolved) in report.resolved_claims.iter().take(5).enumerate() {
            let claim = &resolved.gold_claim;
            let mut line = format!(
                "  {}. {} - {}: {} (Score: {:.2})",
                index + 1,
                claim.subject,
                claim.predicate,
                claim.object.as_deref().unwrap_or(""),
                resolved.total_score,
            );
            if resolved.has_contradictions {
                line.push_str(" [CÓ MÂU THUẪN]");
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}
