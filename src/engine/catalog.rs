use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::engine::ui_refs::normalize_reference;
use crate::error::CatalogError;
use crate::model::{CatalogEntry, UiKind};

const BUILTIN_ENTRIES: &[(UiKind, &str)] = &[
    (UiKind::NavPath, "shop manager"),
    (UiKind::NavPath, "listings"),
    (UiKind::NavPath, "orders & shipping"),
    (UiKind::NavPath, "messages"),
    (UiKind::NavPath, "marketing"),
    (UiKind::NavPath, "finances"),
    (UiKind::NavPath, "settings"),
    (UiKind::NavPath, "stats"),
    (UiKind::NavPath, "your account"),
    (UiKind::NavPath, "purchases and reviews"),
    (UiKind::NavPath, "account settings"),
    (UiKind::NavPath, "favorites"),
    (UiKind::NavPath, "cart"),
    (UiKind::NavPath, "you tab"),
    (UiKind::NavPath, "shop icon"),
    (UiKind::NavPath, "three dots menu"),
    (UiKind::NavPath, "hamburger menu"),
    (UiKind::Button, "shop manager"),
    (UiKind::Button, "add a listing"),
    (UiKind::Button, "save"),
    (UiKind::Button, "publish"),
    (UiKind::Button, "edit"),
    (UiKind::Button, "delete"),
    (UiKind::Button, "renew"),
    (UiKind::Button, "deactivate"),
];

pub trait CatalogSource {
    fn load(&self) -> impl Future<Output = Result<Vec<CatalogEntry>, CatalogError>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl CatalogSource for BuiltinCatalog {
    async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(BUILTIN_ENTRIES
            .iter()
            .map(|(kind, text)| CatalogEntry {
                kind: *kind,
                normalized_text: (*text).to_string(),
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalog {
    async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_catalog(&raw)
    }
}

#[derive(Debug, Clone)]
pub struct HttpCatalog {
    http: reqwest::Client,
    url: String,
}

impl HttpCatalog {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("abt-audit/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

impl CatalogSource for HttpCatalog {
    async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let raw = response.text().await?;
        parse_catalog(&raw)
    }
}

#[derive(Debug, Clone)]
pub enum ConfiguredCatalog {
    Builtin(BuiltinCatalog),
    File(FileCatalog),
    Http(HttpCatalog),
}

impl ConfiguredCatalog {
    pub fn from_source(source: Option<&str>, timeout: Duration) -> Result<Self, CatalogError> {
        match source.map(str::trim).filter(|value| !value.is_empty()) {
            None => Ok(Self::Builtin(BuiltinCatalog)),
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(Self::Http(HttpCatalog::new(url, timeout)?))
            }
            Some(path) => Ok(Self::File(FileCatalog::new(path))),
        }
    }
}

impl CatalogSource for ConfiguredCatalog {
    async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        match self {
            Self::Builtin(source) => source.load().await,
            Self::File(source) => source.load().await,
            Self::Http(source) => source.load().await,
        }
    }
}

pub struct CachedCatalog<S> {
    source: S,
    ttl: Duration,
    cached: Mutex<Option<(Instant, Vec<CatalogEntry>)>>,
}

impl<S> CachedCatalog<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: Mutex::new(None),
        }
    }
}

impl<S: CatalogSource + Sync> CatalogSource for CachedCatalog<S> {
    async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut cached = self.cached.lock().await;
        if let Some((fetched_at, entries)) = cached.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                debug!(entries = entries.len(), "serving cached UI catalog");
                return Ok(entries.clone());
            }
        }

        let entries = self.source.load().await?;
        info!(entries = entries.len(), "loaded UI catalog");
        *cached = Some((Instant::now(), entries.clone()));
        Ok(entries)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCatalog {
    List(Vec<RawCatalogEntry>),
    Wrapped { entries: Vec<RawCatalogEntry> },
}

#[derive(Debug, Deserialize)]
struct RawCatalogEntry {
    #[serde(alias = "type", alias = "element_type")]
    kind: String,
    #[serde(alias = "text", alias = "label")]
    normalized_text: String,
}

pub fn parse_catalog(raw: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    let parsed: RawCatalog =
        serde_json::from_str(raw).map_err(|error| CatalogError::Parse(error.to_string()))?;
    let raw_entries = match parsed {
        RawCatalog::List(entries) | RawCatalog::Wrapped { entries } => entries,
    };

    let total = raw_entries.len();
    let entries = raw_entries
        .into_iter()
        .filter_map(|entry| {
            let kind = UiKind::parse(&entry.kind)?;
            let normalized_text = normalize_reference(&entry.normalized_text);
            (!normalized_text.is_empty()).then_some(CatalogEntry {
                kind,
                normalized_text,
            })
        })
        .collect::<Vec<CatalogEntry>>();

    if entries.len() < total {
        warn!(
            skipped = total - entries.len(),
            kept = entries.len(),
            "skipped catalog entries with unknown kind or empty text"
        );
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCatalog {
        calls: AtomicUsize,
    }

    impl CatalogSource for CountingCatalog {
        async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CatalogEntry {
                kind: UiKind::Button,
                normalized_text: "save".to_string(),
            }])
        }
    }

    #[test]
    fn parse_catalog_accepts_lists_wrappers_and_aliases() {
        let listed = parse_catalog(
            r#"[{"kind": "button", "normalized_text": "Shop Manager"},
                {"type": "navigation", "text": "Orders & Shipping"},
                {"type": "widget", "text": "Spinner"}]"#,
        )
        .expect("list catalog parses");
        assert_eq!(
            listed,
            vec![
                CatalogEntry {
                    kind: UiKind::Button,
                    normalized_text: "shop manager".to_string(),
                },
                CatalogEntry {
                    kind: UiKind::NavPath,
                    normalized_text: "orders & shipping".to_string(),
                },
            ]
        );

        let wrapped = parse_catalog(r#"{"entries": [{"kind": "nav-path", "label": "Stats"}]}"#)
            .expect("wrapped catalog parses");
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].kind, UiKind::NavPath);
    }

    #[test]
    fn parse_catalog_rejects_non_catalog_json() {
        let error = parse_catalog(r#"{"unexpected": true}"#).expect_err("should fail");
        assert!(matches!(error, CatalogError::Parse(_)));
    }

    #[tokio::test]
    async fn file_catalog_reads_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"[{"kind": "button", "text": "Renew"}]"#).expect("write");

        let entries = FileCatalog::new(&path).load().await.expect("file catalog loads");
        assert_eq!(entries[0].normalized_text, "renew");

        let missing = FileCatalog::new(dir.path().join("missing.json")).load().await;
        assert!(matches!(missing, Err(CatalogError::Io { .. })));
    }

    #[tokio::test]
    async fn cached_catalog_reuses_fresh_entries() {
        let cached = CachedCatalog::new(
            CountingCatalog {
                calls: AtomicUsize::new(0),
            },
            Duration::from_secs(60),
        );

        cached.load().await.expect("first load");
        cached.load().await.expect("second load");
        assert_eq!(cached.source.calls.load(Ordering::SeqCst), 1);

        let expiring = CachedCatalog::new(
            CountingCatalog {
                calls: AtomicUsize::new(0),
            },
            Duration::ZERO,
        );
        expiring.load().await.expect("first load");
        expiring.load().await.expect("second load");
        assert_eq!(expiring.source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn configured_catalog_picks_source_by_shape() {
        let timeout = Duration::from_secs(1);
        assert!(matches!(
            ConfiguredCatalog::from_source(None, timeout),
            Ok(ConfiguredCatalog::Builtin(_))
        ));
        assert!(matches!(
            ConfiguredCatalog::from_source(Some("catalog.json"), timeout),
            Ok(ConfiguredCatalog::File(_))
        ));
        assert!(matches!(
            ConfiguredCatalog::from_source(Some("https://ui.example.com/catalog"), timeout),
            Ok(ConfiguredCatalog::Http(_))
        ));
    }
}
