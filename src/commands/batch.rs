use anyhow::{Result, bail};
use tracing::info;

use crate::cli::BatchArgs;
use crate::commands::{build_engine, emit, load_article_records, load_config};

pub async fn run(args: BatchArgs) -> Result<()> {
    let mut config = load_config(&args.engine)?;
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            bail!("--concurrency must be greater than zero");
        }
        config.batch.concurrency = concurrency;
    }
    let engine = build_engine(config, args.engine.offline)?;

    let records = load_article_records(&args.articles)?;
    if records.is_empty() {
        info!(path = %args.articles.display(), "no article records found");
    }

    let result = engine.audit_batch(records).await;
    info!(
        articles = result.summary.article_count,
        audited = result.summary.audited_count,
        failed = result.summary.failed_count,
        average_score = ?result.summary.average_score,
        "batch completed"
    );

    emit(args.output.as_deref(), &result)
}
