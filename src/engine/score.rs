use crate::config::ScoringConfig;
use crate::model::{Finding, QualityRating};

const MAX_SCORE: u32 = 100;

pub fn overall_score(findings: &[Finding], config: &ScoringConfig) -> u32 {
    let penalty = findings.iter().fold(0_u32, |total, finding| {
        total.saturating_add(config.penalties.for_severity(finding.severity))
    });
    MAX_SCORE.saturating_sub(penalty)
}

pub fn quality_rating(score: u32, config: &ScoringConfig) -> QualityRating {
    let breakpoints = &config.breakpoints;
    if score >= breakpoints.excellent {
        QualityRating::Excellent
    } else if score >= breakpoints.good {
        QualityRating::Good
    } else if score >= breakpoints.needs_work {
        QualityRating::NeedsWork
    } else {
        QualityRating::Critical
    }
}
