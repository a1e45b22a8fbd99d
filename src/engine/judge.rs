use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::JudgeConfig;
use crate::engine::text::ParsedArticle;
use crate::error::JudgeError;
use crate::model::{
    Audience, AudienceVerdict, Category, Finding, FindingSource, JudgmentStatus, Severity,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

const PROMPT_TEMPLATE: &str = r#"You audit help-center articles against the ABT content standard.

Categories:
- Actionable: steps are complete and followable, button names and navigation paths are specific, web and app instructions are both present where applicable.
- Brief: language is concise; flag marketing jargon, legalese, repetition and filler.
- Targeted: the title matches user intent, the most important information comes first, the scope is neither too broad nor too narrow.
- Technical: hardcoded language tags in links, outdated UI references, broken or absolute internal links.
- Audience: content addressed to the wrong audience (buyer vs seller), or cross-links to the other audience's tools.

Severities: info, minor, major, critical.

Article
Title: {title}
URL: {url}
Locale: {locale}
Declared audience: {declared}
Detected audience: {detected}

Content:
{content}

Respond with a single JSON object and nothing else:
{"summary": "<two or three sentence assessment>",
 "issues": [{"category": "<Actionable|Brief|Targeted|Technical|Audience>",
             "severity": "<info|minor|major|critical>",
             "message": "<what is wrong>",
             "location": "<where in the article, optional>",
             "recommendation": "<how to fix it, optional>"}],
 "member_services_flag": <true when facts such as fees, policies or deadlines need verification by member services>,
 "flag_reason": "<why the article needs verification, optional>"}
Return an empty issues array when the article meets the standard."#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeRequest {
    pub article_id: String,
    pub prompt: String,
}

pub trait ContentJudge {
    fn judge(
        &self,
        request: &JudgeRequest,
    ) -> impl Future<Output = Result<String, JudgeError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub findings: Vec<Finding>,
    pub status: JudgmentStatus,
    pub summary: Option<String>,
    pub flagged: bool,
    pub flag_reason: Option<String>,
}

impl Judgment {
    fn degraded(status: JudgmentStatus, finding: Finding) -> Self {
        Self {
            findings: vec![finding],
            status,
            summary: None,
            flagged: false,
            flag_reason: None,
        }
    }
}

pub fn build_request(
    parsed: &ParsedArticle<'_>,
    verdict: &AudienceVerdict,
    max_content_chars: usize,
) -> JudgeRequest {
    let article = parsed.article;
    let content = parsed
        .body
        .text
        .chars()
        .take(max_content_chars)
        .collect::<String>();
    let declared = verdict
        .hinted
        .map(Audience::as_str)
        .unwrap_or("Unknown");

    let prompt = fill_template(
        PROMPT_TEMPLATE,
        &[
            ("title", article.title.as_str()),
            ("url", article.url.as_str()),
            ("locale", article.locale.as_str()),
            ("declared", declared),
            ("detected", verdict.detected.as_str()),
            ("content", content.as_str()),
        ],
    );

    JudgeRequest {
        article_id: article.id.clone(),
        prompt,
    }
}

fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        filled.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = values.iter().find_map(|(name, value)| {
            after
                .strip_prefix(name)
                .and_then(|tail| tail.strip_prefix('}'))
                .map(|tail| (*value, tail))
        });
        match placeholder {
            Some((value, tail)) => {
                filled.push_str(value);
                rest = tail;
            }
            None => {
                filled.push('{');
                rest = after;
            }
        }
    }
    filled.push_str(rest);
    filled
}

pub async fn judge_content<J: ContentJudge>(
    judge: &J,
    parsed: &ParsedArticle<'_>,
    verdict: &AudienceVerdict,
    config: &JudgeConfig,
) -> Judgment {
    let request = build_request(parsed, verdict, config.max_content_chars);
    let timeout = config.timeout();

    let response = match tokio::time::timeout(timeout, judge.judge(&request)).await {
        Ok(response) => response,
        Err(_) => Err(JudgeError::Timeout(timeout)),
    };

    match response {
        Ok(raw) => {
            debug!(article_id = %request.article_id, bytes = raw.len(), "content judge responded");
            parse_judgment(&raw)
        }
        Err(JudgeError::Disabled) => Judgment::degraded(
            JudgmentStatus::Skipped,
            Finding::new(
                FindingSource::Judgment,
                Category::Technical,
                Severity::Info,
                "content analysis skipped; ABT judgment needs a manual pass",
            ),
        ),
        Err(error) => {
            warn!(article_id = %request.article_id, error = %error, "content judge unavailable");
            Judgment::degraded(
                JudgmentStatus::Unavailable,
                Finding::new(
                    FindingSource::Judgment,
                    Category::Technical,
                    Severity::Critical,
                    "content analysis unavailable",
                )
                .with_location(error.to_string())
                .flagged_for_review(),
            )
        }
    }
}

pub fn parse_judgment(raw: &str) -> Judgment {
    let Some(object) = extract_json_object(raw) else {
        warn!(bytes = raw.len(), "content judge response is not a JSON object");
        return unparseable("no JSON object found");
    };

    let entries = match collect_entries(&object) {
        Some(entries) => entries,
        None => return unparseable("no issues array"),
    };

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|summary| !summary.is_empty())
        .map(str::to_string);

    let mut coerced = 0_usize;
    let findings = entries
        .iter()
        .enumerate()
        .map(|(index, (entry, default_category))| {
            validate_entry(entry, *default_category).unwrap_or_else(|problem| {
                coerced += 1;
                Finding::new(
                    FindingSource::Judgment,
                    Category::Technical,
                    Severity::Minor,
                    format!("analysis format issue: entry {} {problem}", index + 1),
                )
            })
        })
        .collect::<Vec<Finding>>();

    if coerced > 0 {
        warn!(coerced, total = findings.len(), "coerced malformed judge entries");
    }

    let flagged = object
        .get("member_services_flag")
        .or_else(|| object.get("needs_verification"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let flag_reason = optional_text(object.get("flag_reason"));

    Judgment {
        findings,
        status: JudgmentStatus::Completed,
        summary,
        flagged,
        flag_reason,
    }
}

fn unparseable(reason: &str) -> Judgment {
    Judgment::degraded(
        JudgmentStatus::Unparseable,
        Finding::new(
            FindingSource::Judgment,
            Category::Technical,
            Severity::Major,
            format!("content analysis response could not be parsed ({reason}); the whole judgment was dropped"),
        )
        .flagged_for_review(),
    )
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn extract_json_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn collect_entries(object: &serde_json::Map<String, Value>) -> Option<Vec<(Value, Option<Category>)>> {
    if let Some(issues) = object.get("issues") {
        return issues
            .as_array()
            .map(|issues| issues.iter().cloned().map(|issue| (issue, None)).collect());
    }

    let mut entries = Vec::new();
    let mut found = false;
    for category in Category::ALL {
        let key = category.as_str().to_ascii_lowercase();
        if let Some(list) = object.get(&key).and_then(Value::as_array) {
            found = true;
            entries.extend(list.iter().cloned().map(|issue| (issue, Some(category))));
        }
    }
    found.then_some(entries)
}

fn validate_entry(entry: &Value, default_category: Option<Category>) -> Result<Finding, String> {
    let object = entry.as_object().ok_or("is not an object")?;

    let category = match object.get("category") {
        Some(Value::String(raw)) => Category::parse(raw)
            .ok_or_else(|| format!("has unrecognized category \"{raw}\""))?,
        Some(_) => return Err("has a non-string category".to_string()),
        None => default_category.ok_or("is missing a category")?,
    };

    let severity = match object.get("severity") {
        Some(Value::String(raw)) => Severity::parse(raw)
            .ok_or_else(|| format!("has unrecognized severity \"{raw}\""))?,
        _ => return Err("is missing a severity".to_string()),
    };

    let message = object
        .get("message")
        .or_else(|| object.get("description"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .ok_or("is missing a message")?;

    let location = match object.get("location") {
        None | Some(Value::Null) => None,
        Some(Value::String(location)) if location.trim().is_empty() => None,
        Some(Value::String(location)) => Some(location.trim().to_string()),
        Some(_) => return Err("has a non-string location".to_string()),
    };

    let recommendation = match object.get("recommendation") {
        None | Some(Value::Null) => None,
        Some(text @ Value::String(_)) => optional_text(Some(text)),
        Some(_) => return Err("has a non-string recommendation".to_string()),
    };

    let mut finding = Finding::new(FindingSource::Judgment, category, severity, message);
    finding.location = location;
    finding.recommendation = recommendation;
    Ok(finding)
}

#[derive(Debug, Clone)]
pub struct AnthropicJudge {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

impl AnthropicJudge {
    pub fn new(config: &JudgeConfig, api_key: impl Into<String>) -> Result<Self, JudgeError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("abt-audit/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.into(),
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        })
    }

    fn map_transport(&self, error: reqwest::Error) -> JudgeError {
        if error.is_timeout() {
            JudgeError::Timeout(self.timeout)
        } else {
            JudgeError::Transport(error)
        }
    }
}

impl ContentJudge for AnthropicJudge {
    async fn judge(&self, request: &JudgeRequest) -> Result<String, JudgeError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|error| self.map_transport(error))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(JudgeError::Auth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(JudgeError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|error| self.map_transport(error))?;
        let text = payload
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| block.get("text").and_then(Value::as_str))
                    .collect::<Vec<&str>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(JudgeError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledJudge;

impl ContentJudge for DisabledJudge {
    async fn judge(&self, _request: &JudgeRequest) -> Result<String, JudgeError> {
        Err(JudgeError::Disabled)
    }
}

#[derive(Debug, Clone)]
pub enum ConfiguredJudge {
    Anthropic(AnthropicJudge),
    Disabled(DisabledJudge),
}

impl ConfiguredJudge {
    pub fn from_config(config: &JudgeConfig, offline: bool) -> Result<Self, JudgeError> {
        if offline {
            return Ok(Self::Disabled(DisabledJudge));
        }
        match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Self::Anthropic(AnthropicJudge::new(config, key)?)),
            _ => {
                warn!("no judge API key configured; content analysis disabled");
                Ok(Self::Disabled(DisabledJudge))
            }
        }
    }
}

impl ContentJudge for ConfiguredJudge {
    async fn judge(&self, request: &JudgeRequest) -> Result<String, JudgeError> {
        match self {
            Self::Anthropic(judge) => judge.judge(request).await,
            Self::Disabled(judge) => judge.judge(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::text::Markup;
    use crate::model::Article;
    use pretty_assertions::assert_eq;

    struct CannedJudge(Result<&'static str, fn() -> JudgeError>);

    impl ContentJudge for CannedJudge {
        async fn judge(&self, _request: &JudgeRequest) -> Result<String, JudgeError> {
            match &self.0 {
                Ok(raw) => Ok((*raw).to_string()),
                Err(make_error) => Err(make_error()),
            }
        }
    }

    struct SlowJudge;

    impl ContentJudge for SlowJudge {
        async fn judge(&self, _request: &JudgeRequest) -> Result<String, JudgeError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(r#"{"issues": []}"#.to_string())
        }
    }

    fn sample_article() -> Article {
        Article {
            id: "42".to_string(),
            url: "https://help.etsy.com/hc/articles/42".to_string(),
            title: "Renew a listing".to_string(),
            body: "<p>Click <b>Renew</b> to renew your listing.</p>".to_string(),
            audience_segment_hint: Some(Audience::Seller),
            locale: "en-us".to_string(),
        }
    }

    fn verdict() -> AudienceVerdict {
        AudienceVerdict {
            detected: Audience::Seller,
            hinted: Some(Audience::Seller),
            mismatch: false,
            buyer_signals: 0,
            seller_signals: 1,
        }
    }

    async fn run_judge<J: ContentJudge>(judge: &J, config: &JudgeConfig) -> Judgment {
        let article = sample_article();
        let markup = Markup::new().expect("markup patterns compile");
        judge_content(judge, &markup.parse(&article), &verdict(), config).await
    }

    #[test]
    fn valid_entries_become_judgment_findings() {
        let judgment = parse_judgment(
            r#"Here is the audit:
            {"summary": "Mostly fine.",
             "issues": [
               {"category": "actionable", "severity": "major", "message": "Missing app steps", "location": "Step 2"},
               {"category": "Brief", "severity": "warning", "description": "Filler phrase"}
             ]}"#,
        );

        assert_eq!(judgment.status, JudgmentStatus::Completed);
        assert_eq!(judgment.summary.as_deref(), Some("Mostly fine."));
        assert_eq!(
            judgment.findings,
            vec![
                Finding::new(
                    FindingSource::Judgment,
                    Category::Actionable,
                    Severity::Major,
                    "Missing app steps"
                )
                .with_location("Step 2"),
                Finding::new(
                    FindingSource::Judgment,
                    Category::Brief,
                    Severity::Minor,
                    "Filler phrase"
                ),
            ]
        );
    }

    #[test]
    fn recommendations_and_verification_flag_are_kept() {
        let judgment = parse_judgment(
            r#"{"issues": [{"category": "Brief", "severity": "minor", "message": "Long intro",
                            "recommendation": "Delete the intro"}],
                "member_services_flag": true,
                "flag_reason": "Fee amounts need MS verification"}"#,
        );

        assert_eq!(judgment.status, JudgmentStatus::Completed);
        assert_eq!(
            judgment.findings[0].recommendation.as_deref(),
            Some("Delete the intro")
        );
        assert!(judgment.flagged);
        assert_eq!(
            judgment.flag_reason.as_deref(),
            Some("Fee amounts need MS verification")
        );

        let unflagged = parse_judgment(r#"{"issues": []}"#);
        assert!(!unflagged.flagged);
        assert_eq!(unflagged.flag_reason, None);
    }

    #[test]
    fn template_values_are_not_expanded_again() {
        let filled = fill_template(
            "T={title} C={content} {\"json\": {other}}",
            &[("title", "{content}"), ("content", "body")],
        );
        assert_eq!(filled, "T={content} C=body {\"json\": {other}}");
    }

    #[test]
    fn malformed_entries_are_coerced_not_dropped() {
        let judgment = parse_judgment(
            r#"{"issues": [
                 {"category": "Tone", "severity": "major", "message": "Too casual"},
                 {"category": "Brief", "severity": "urgent", "message": "Wordy"},
                 {"category": "Brief", "severity": "minor"},
                 "just a string",
                 {"category": "Targeted", "severity": "info", "message": "Title could be sharper"}
               ]}"#,
        );

        assert_eq!(judgment.status, JudgmentStatus::Completed);
        assert_eq!(judgment.findings.len(), 5);
        for finding in &judgment.findings[..4] {
            assert_eq!(finding.category, Category::Technical);
            assert_eq!(finding.severity, Severity::Minor);
            assert!(finding.message.starts_with("analysis format issue"));
        }
        assert!(judgment.findings[0].message.contains("unrecognized category \"Tone\""));
        assert_eq!(judgment.findings[4].category, Category::Targeted);
    }

    #[test]
    fn per_category_arrays_supply_the_category() {
        let judgment = parse_judgment(
            r#"{"actionable": [{"severity": "minor", "message": "Name the button"}],
                "targeted": []}"#,
        );
        assert_eq!(judgment.findings.len(), 1);
        assert_eq!(judgment.findings[0].category, Category::Actionable);
    }

    #[test]
    fn unparseable_response_is_one_summary_finding() {
        for raw in ["I could not analyze this.", "{not json}", r#"{"verdict": "fine"}"#] {
            let judgment = parse_judgment(raw);
            assert_eq!(judgment.status, JudgmentStatus::Unparseable, "raw: {raw}");
            assert_eq!(judgment.findings.len(), 1);
            assert_eq!(judgment.findings[0].category, Category::Technical);
        }
    }

    #[test]
    fn request_embeds_article_and_audience_context() {
        let article = sample_article();
        let markup = Markup::new().expect("markup patterns compile");
        let request = build_request(&markup.parse(&article), &verdict(), 12);

        assert_eq!(request.article_id, "42");
        assert!(request.prompt.contains("Title: Renew a listing"));
        assert!(request.prompt.contains("Declared audience: Seller"));
        assert!(request.prompt.contains("Detected audience: Seller"));
        assert!(request.prompt.contains("Content:\nClick Renew \n"));
        assert!(!request.prompt.contains("your listing"), "content is truncated");
    }

    #[tokio::test]
    async fn timeout_yields_single_critical_unavailable_finding() {
        let config = JudgeConfig {
            timeout_secs: 1,
            ..JudgeConfig::default()
        };
        let judgment = tokio::time::timeout(Duration::from_secs(5), run_judge(&SlowJudge, &config))
            .await
            .expect("adapter must honour its own timeout");

        assert_eq!(judgment.status, JudgmentStatus::Unavailable);
        assert_eq!(judgment.findings.len(), 1);
        assert_eq!(judgment.findings[0].severity, Severity::Critical);
        assert_eq!(judgment.findings[0].message, "content analysis unavailable");
    }

    #[tokio::test]
    async fn auth_failure_degrades_instead_of_failing() {
        let judge = CannedJudge(Err(|| JudgeError::Auth { status: 401 }));
        let judgment = run_judge(&judge, &JudgeConfig::default()).await;

        assert_eq!(judgment.status, JudgmentStatus::Unavailable);
        assert_eq!(judgment.findings[0].category, Category::Technical);
        assert_eq!(judgment.findings[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn disabled_judge_is_recorded_as_skipped() {
        let judgment = run_judge(&DisabledJudge, &JudgeConfig::default()).await;
        assert_eq!(judgment.status, JudgmentStatus::Skipped);
        assert_eq!(judgment.findings[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn empty_issue_list_yields_no_findings() {
        let judge = CannedJudge(Ok(r#"{"summary": "", "issues": []}"#));
        let judgment = run_judge(&judge, &JudgeConfig::default()).await;

        assert_eq!(judgment.status, JudgmentStatus::Completed);
        assert!(judgment.findings.is_empty());
        assert_eq!(judgment.summary, None);
    }
}
