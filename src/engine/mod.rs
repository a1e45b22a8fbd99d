pub mod audience;
pub mod catalog;
pub mod judge;
pub mod rules;
pub mod score;
pub mod text;
pub mod ui_match;
pub mod ui_refs;


use futures::StreamExt;
use tracing::{info, warn};

use crate::article::RawArticle;
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::model::{
    Article, AuditReport, BatchResult, BatchSlot, BatchSummary, CatalogStatus, Category,
    CategoryCounts, Finding, QualityRating, RatingCounts, Severity, SeverityCounts,
};
use crate::util::{now_utc_string, sha256_text};

use self::audience::{AudienceClassifier, audience_findings};
use self::catalog::CatalogSource;
use self::judge::{ContentJudge, judge_content};
use self::rules::RuleChecks;
use self::score::{overall_score, quality_rating};
use self::text::Markup;
use self::ui_match::{CatalogMatcher, pair_checks, summarize, ui_findings};
use self::ui_refs::UiReferenceExtractor;

pub struct AuditEngine<J, C> {
    config: AuditConfig,
    markup: Markup,
    rules: RuleChecks,
    audience: AudienceClassifier,
    extractor: UiReferenceExtractor,
    matcher: CatalogMatcher,
    judge: J,
    catalog: C,
}

impl<J: ContentJudge, C: CatalogSource> AuditEngine<J, C> {
    pub fn new(config: AuditConfig, judge: J, catalog: C) -> Result<Self, AuditError> {
        config.validate()?;
        Ok(Self {
            markup: Markup::new()?,
            rules: RuleChecks::new(&config.rules)?,
            audience: AudienceClassifier::new(&config.audience)?,
            extractor: UiReferenceExtractor::new()?,
            matcher: CatalogMatcher::new(&config.ui),
            config,
            judge,
            catalog,
        })
    }

    pub async fn audit_raw(&self, raw: RawArticle) -> Result<AuditReport, AuditError> {
        let article = Article::try_from(raw)?;
        self.audit(&article).await
    }

    pub async fn audit(&self, article: &Article) -> Result<AuditReport, AuditError> {
        ensure_complete(article)?;

        let parsed = self.markup.parse(article);
        let verdict = self.audience.classify(&parsed);

        let ((catalog, catalog_status), judgment, (outcome, references)) = tokio::join!(
            async {
                match self.catalog.load().await {
                    Ok(entries) if entries.is_empty() => {
                        warn!(
                            article_id = %article.id,
                            "UI catalog is empty; references cannot be verified"
                        );
                        (entries, CatalogStatus::Empty)
                    }
                    Ok(entries) => (entries, CatalogStatus::Loaded),
                    Err(error) => {
                        warn!(
                            article_id = %article.id,
                            error = %error,
                            "UI catalog unavailable; references cannot be verified"
                        );
                        (Vec::new(), CatalogStatus::Unavailable)
                    }
                }
            },
            judge_content(&self.judge, &parsed, &verdict, &self.config.judge),
            async { (self.rules.run(&parsed), self.extractor.extract(&parsed)) },
        );

        let results = self.matcher.match_references(&references, &catalog);
        let ui_checks = pair_checks(references, results);
        let ui_summary = summarize(&ui_checks);

        let mut findings = outcome.findings;
        findings.extend(audience_findings(&verdict));
        findings.extend(ui_findings(&ui_checks));
        findings.extend(judgment.findings);

        let overall_score = overall_score(&findings, &self.config.scoring);
        let quality_rating = quality_rating(overall_score, &self.config.scoring);
        let needs_human_review = ui_summary.unknown > 0
            || catalog_status.is_degraded()
            || judgment.status.is_degraded()
            || judgment.flagged
            || findings.iter().any(|finding| {
                finding.needs_review
                    || (finding.category == Category::Technical
                        && finding.severity == Severity::Critical)
            });

        info!(
            article_id = %article.id,
            findings = findings.len(),
            score = overall_score,
            rating = ?quality_rating,
            needs_human_review,
            "audited article"
        );

        Ok(AuditReport {
            article_id: article.id.clone(),
            article_title: article.title.clone(),
            article_url: article.url.clone(),
            locale: article.locale.clone(),
            audited_at: now_utc_string(),
            content_sha256: sha256_text(&article.body),
            severity_counts: SeverityCounts::tally(&findings),
            category_counts: CategoryCounts::tally(&findings),
            findings,
            audience_verdict: verdict,
            overall_score,
            quality_rating,
            needs_human_review,
            instruction_coverage: outcome.coverage,
            hardcoded_links: outcome.hardcoded_links,
            ui_summary,
            ui_checks,
            catalog_status,
            judgment_status: judgment.status,
            judgment_summary: judgment.summary,
            verification_flagged: judgment.flagged,
            verification_reason: judgment.flag_reason,
        })
    }

    pub async fn audit_batch(
        &self,
        records: Vec<Result<RawArticle, AuditError>>,
    ) -> BatchResult {
        let concurrency = self.config.batch.concurrency.max(1);
        info!(articles = records.len(), concurrency, "starting batch audit");

        let slots = futures::stream::iter(records.into_iter().enumerate())
            .map(|(index, record)| async move {
                let audited = match record {
                    Ok(raw) => self.audit_raw(raw).await,
                    Err(error) => Err(error),
                };
                match audited {
                    Ok(report) => BatchSlot::Audited {
                        report: Box::new(report),
                    },
                    Err(error) => {
                        warn!(index, error = %error, "article could not be audited");
                        BatchSlot::Failed {
                            index,
                            error: error.to_string(),
                        }
                    }
                }
            })
            .buffered(concurrency)
            .collect::<Vec<BatchSlot>>()
            .await;

        let summary = summarize_batch(&slots);
        info!(
            audited = summary.audited_count,
            failed = summary.failed_count,
            needs_review = summary.needs_review_count,
            "batch audit finished"
        );

        BatchResult {
            generated_at: now_utc_string(),
            slots,
            summary,
        }
    }
}

fn ensure_complete(article: &Article) -> Result<(), AuditError> {
    let required = [
        ("id", &article.id),
        ("title", &article.title),
        ("body", &article.body),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AuditError::ArticleIncomplete { field });
        }
    }
    Ok(())
}

pub fn summarize_batch(slots: &[BatchSlot]) -> BatchSummary {
    let reports = slots.iter().filter_map(BatchSlot::report).collect::<Vec<_>>();

    let mut ratings = RatingCounts::default();
    for report in &reports {
        match report.quality_rating {
            QualityRating::Excellent => ratings.excellent += 1,
            QualityRating::Good => ratings.good += 1,
            QualityRating::NeedsWork => ratings.needs_work += 1,
            QualityRating::Critical => ratings.critical += 1,
        }
    }

    let average_score = (!reports.is_empty()).then(|| {
        let total = reports
            .iter()
            .map(|report| f64::from(report.overall_score))
            .sum::<f64>();
        total / reports.len() as f64
    });

    BatchSummary {
        article_count: slots.len(),
        audited_count: reports.len(),
        failed_count: slots.len() - reports.len(),
        needs_review_count: reports
            .iter()
            .filter(|report| report.needs_human_review)
            .count(),
        average_score,
        ratings,
    }
}

pub fn review_items(report: &AuditReport) -> Vec<&Finding> {
    report
        .findings
        .iter()
        .filter(|finding| finding.needs_review)
        .collect()
}
