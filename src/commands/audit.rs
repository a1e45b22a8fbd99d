use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::AuditArgs;
use crate::commands::{build_engine, emit, load_article_records, load_config};
use crate::engine::review_items;

pub async fn run(args: AuditArgs) -> Result<()> {
    let config = load_config(&args.engine)?;
    let engine = build_engine(config, args.engine.offline)?;

    let mut records = load_article_records(&args.article)?;
    if records.len() != 1 {
        bail!(
            "expected exactly one article record in {}, found {}; use `batch` for several",
            args.article.display(),
            records.len()
        );
    }
    let raw = records
        .pop()
        .context("article record disappeared")?
        .with_context(|| format!("failed to read article from {}", args.article.display()))?;

    let report = engine
        .audit_raw(raw)
        .await
        .with_context(|| format!("failed to audit {}", args.article.display()))?;

    for finding in review_items(&report) {
        warn!(
            article_id = %report.article_id,
            category = %finding.category,
            message = %finding.message,
            "needs human review"
        );
    }
    info!(
        article_id = %report.article_id,
        score = report.overall_score,
        judgment = ?report.judgment_status,
        "audit completed"
    );

    emit(args.output.as_deref(), &report)
}
