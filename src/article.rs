use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::AuditError;
use crate::model::{Article, Audience};

pub const DEFAULT_LOCALE: &str = "en-us";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default, alias = "html_url")]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, alias = "audience", alias = "segment")]
    pub audience_segment_hint: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

impl TryFrom<RawArticle> for Article {
    type Error = AuditError;

    fn try_from(raw: RawArticle) -> Result<Self, Self::Error> {
        let url = raw.url.map(|url| url.trim().to_string()).unwrap_or_default();

        let id = match raw.id {
            Some(RawId::Number(id)) => Some(id.to_string()),
            Some(RawId::Text(id)) => non_blank(id),
            None => article_id_from_url(&url),
        }
        .ok_or(AuditError::ArticleIncomplete { field: "id" })?;

        let title = raw
            .title
            .and_then(non_blank)
            .ok_or(AuditError::ArticleIncomplete { field: "title" })?;
        let body = raw
            .body
            .and_then(non_blank)
            .ok_or(AuditError::ArticleIncomplete { field: "body" })?;

        let audience_segment_hint = match raw.audience_segment_hint.as_deref() {
            Some(hint) => {
                let parsed = Audience::parse(hint);
                if parsed.is_none() {
                    debug!(article_id = %id, hint, "ignoring unrecognized audience hint");
                }
                parsed
            }
            None => segment_from_url(&url).and_then(|segment| Audience::parse(&segment)),
        };

        let locale = raw
            .locale
            .and_then(non_blank)
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());

        Ok(Self {
            id,
            url,
            title,
            body,
            audience_segment_hint,
            locale,
        })
    }
}

pub fn raw_articles_from_json(value: Value) -> Vec<Result<RawArticle, AuditError>> {
    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut object) if object.get("articles").is_some_and(Value::is_array) => {
            match object.remove("articles") {
                Some(Value::Array(records)) => records,
                _ => Vec::new(),
            }
        }
        other => vec![other],
    };

    records
        .into_iter()
        .map(|record| {
            serde_json::from_value::<RawArticle>(record)
                .map_err(|error| AuditError::MalformedArticle(error.to_string()))
        })
        .collect()
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn article_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/articles/")?;
    let digits = rest
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>();
    (!digits.is_empty()).then_some(digits)
}

pub fn segment_from_url(url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "segment")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
