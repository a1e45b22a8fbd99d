pub mod audit;
pub mod batch;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::article::{RawArticle, raw_articles_from_json};
use crate::cli::EngineArgs;
use crate::config::AuditConfig;
use crate::engine::AuditEngine;
use crate::engine::catalog::{CachedCatalog, ConfiguredCatalog};
use crate::engine::judge::ConfiguredJudge;
use crate::error::AuditError;
use crate::util::{print_json_pretty, write_json_pretty};

pub type CliEngine = AuditEngine<ConfiguredJudge, CachedCatalog<ConfiguredCatalog>>;

pub fn load_config(args: &EngineArgs) -> Result<AuditConfig> {
    let mut config =
        AuditConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(source) = &args.catalog {
        config.catalog.source = Some(source.clone());
    }
    Ok(config)
}

pub fn build_engine(config: AuditConfig, offline: bool) -> Result<CliEngine> {
    let judge = ConfiguredJudge::from_config(&config.judge, offline)
        .context("failed to set up the content judge")?;
    let source = ConfiguredCatalog::from_source(
        config.catalog.source.as_deref(),
        Duration::from_secs(config.catalog.timeout_secs),
    )
    .context("failed to set up the UI catalog")?;
    let catalog = CachedCatalog::new(source, Duration::from_secs(config.catalog.cache_ttl_secs));

    let judge_mode = match judge {
        ConfiguredJudge::Anthropic(_) => "enabled",
        ConfiguredJudge::Disabled(_) => "disabled",
    };
    info!(
        judge = judge_mode,
        catalog = config.catalog.source.as_deref().unwrap_or("built-in"),
        "audit engine ready"
    );

    AuditEngine::new(config, judge, catalog).context("failed to build the audit engine")
}

pub fn load_article_records(path: &Path) -> Result<Vec<Result<RawArticle, AuditError>>> {
    if !path.is_dir() {
        let value = read_json(path)?;
        return Ok(raw_articles_from_json(value));
    }

    let mut files = fs::read_dir(path)
        .with_context(|| format!("failed to read article directory: {}", path.display()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<PathBuf>>>()
        .with_context(|| format!("failed to list article directory: {}", path.display()))?;
    files.retain(|file| file.is_file() && file.extension().is_some_and(|ext| ext == "json"));
    files.sort();

    let mut records = Vec::new();
    for file in files {
        match read_json(&file) {
            Ok(value) => records.extend(raw_articles_from_json(value)),
            Err(error) => records.push(Err(AuditError::MalformedArticle(format!("{error:#}")))),
        }
    }

    info!(path = %path.display(), records = records.len(), "loaded article records");
    Ok(records)
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn emit<T: Serialize>(output: Option<&Path>, value: &T) -> Result<()> {
    match output {
        Some(path) => {
            write_json_pretty(path, value)?;
            info!(path = %path.display(), "wrote audit output");
            Ok(())
        }
        None => print_json_pretty(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn directory_records_load_in_file_name_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("b.json"),
            r#"{"id": 2, "title": "Second", "body": "b"}"#,
        )
        .expect("write b");
        fs::write(
            dir.path().join("a.json"),
            r#"[{"id": 1, "title": "First", "body": "a"}]"#,
        )
        .expect("write a");
        fs::write(dir.path().join("c.json"), "{ not json").expect("write c");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write notes");

        let records = load_article_records(dir.path()).expect("directory should load");

        assert_eq!(records.len(), 3);
        let titles = records
            .iter()
            .map(|record| record.as_ref().ok().and_then(|raw| raw.title.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            titles,
            vec![Some("First".to_string()), Some("Second".to_string()), None]
        );
        assert!(matches!(records[2], Err(AuditError::MalformedArticle(_))));
    }

    #[test]
    fn single_file_must_be_valid_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("article.json");
        fs::write(&path, "not json").expect("write article");

        assert!(load_article_records(&path).is_err());
        assert!(load_article_records(&dir.path().join("missing.json")).is_err());
    }
}
