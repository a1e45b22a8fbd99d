use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Actionable,
    Brief,
    Targeted,
    Technical,
    Audience,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Actionable,
        Self::Brief,
        Self::Targeted,
        Self::Technical,
        Self::Audience,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actionable => "Actionable",
            Self::Brief => "Brief",
            Self::Targeted => "Targeted",
            Self::Technical => "Technical",
            Self::Audience => "Audience",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" | "suggestion" => Some(Self::Info),
            "minor" | "warning" => Some(Self::Minor),
            "major" => Some(Self::Major),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingSource {
    Rule,
    Judgment,
    UiCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub source: FindingSource,
    #[serde(default)]
    pub needs_review: bool,
}

impl Finding {
    pub fn new(
        source: FindingSource,
        category: Category,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            location: None,
            recommendation: None,
            source,
            needs_review: false,
        }
    }

    pub fn rule(category: Category, severity: Severity, message: impl Into<String>) -> Self {
        Self::new(FindingSource::Rule, category, severity, message)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn flagged_for_review(mut self) -> Self {
        self.needs_review = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Audience {
    Buyer,
    Seller,
    Both,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "Buyer",
            Self::Seller => "Seller",
            Self::Both => "Both",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buyer" | "shopping" => Some(Self::Buyer),
            "seller" | "selling" => Some(Self::Seller),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudienceVerdict {
    pub detected: Audience,
    pub hinted: Option<Audience>,
    pub mismatch: bool,
    pub buyer_signals: usize,
    pub seller_signals: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub id: String,
    pub url: String,
    pub title: String,
    pub body: String,
    pub audience_segment_hint: Option<Audience>,
    pub locale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiKind {
    Button,
    NavPath,
}

impl UiKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "button" | "link" => Some(Self::Button),
            "nav-path" | "nav_path" | "navigation" | "menu" | "tab" => Some(Self::NavPath),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiReference {
    pub kind: UiKind,
    pub raw_text: String,
    pub normalized_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub kind: UiKind,
    pub normalized_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Verified,
    Stale,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_catalog_entry: Option<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiCheck {
    pub reference: UiReference,
    pub result: MatchResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiSummary {
    pub total: usize,
    pub verified: usize,
    pub stale: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QualityRating {
    Excellent,
    Good,
    #[serde(rename = "Needs Work")]
    NeedsWork,
    Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstructionCoverage {
    pub web: bool,
    pub app: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub minor: usize,
    pub major: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Info => counts.info += 1,
                Severity::Minor => counts.minor += 1,
                Severity::Major => counts.major += 1,
                Severity::Critical => counts.critical += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub actionable: usize,
    pub brief: usize,
    pub targeted: usize,
    pub technical: usize,
    pub audience: usize,
}

impl CategoryCounts {
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.category {
                Category::Actionable => counts.actionable += 1,
                Category::Brief => counts.brief += 1,
                Category::Targeted => counts.targeted += 1,
                Category::Technical => counts.technical += 1,
                Category::Audience => counts.audience += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgmentStatus {
    Completed,
    Unparseable,
    Unavailable,
    Skipped,
}

impl JudgmentStatus {
    pub fn is_degraded(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogStatus {
    Loaded,
    Empty,
    Unavailable,
}

impl CatalogStatus {
    pub fn is_degraded(self) -> bool {
        !matches!(self, Self::Loaded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub article_id: String,
    pub article_title: String,
    pub article_url: String,
    pub locale: String,
    pub audited_at: String,
    pub content_sha256: String,
    pub findings: Vec<Finding>,
    pub audience_verdict: AudienceVerdict,
    pub overall_score: u32,
    pub quality_rating: QualityRating,
    pub needs_human_review: bool,
    pub severity_counts: SeverityCounts,
    pub category_counts: CategoryCounts,
    pub instruction_coverage: InstructionCoverage,
    pub hardcoded_links: Vec<String>,
    pub ui_summary: UiSummary,
    pub ui_checks: Vec<UiCheck>,
    pub catalog_status: CatalogStatus,
    pub judgment_status: JudgmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judgment_summary: Option<String>,
    pub verification_flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchSlot {
    Audited { report: Box<AuditReport> },
    Failed { index: usize, error: String },
}

impl BatchSlot {
    pub fn report(&self) -> Option<&AuditReport> {
        match self {
            Self::Audited { report } => Some(report),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingCounts {
    pub excellent: usize,
    pub good: usize,
    pub needs_work: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub article_count: usize,
    pub audited_count: usize,
    pub failed_count: usize,
    pub needs_review_count: usize,
    pub average_score: Option<f64>,
    pub ratings: RatingCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub generated_at: String,
    pub slots: Vec<BatchSlot>,
    pub summary: BatchSummary,
}
