use std::collections::BTreeSet;

use regex::Regex;

use crate::config::RuleConfig;
use crate::engine::text::{ParsedArticle, sentence_lengths, word_count};
use crate::model::{Category, Finding, InstructionCoverage, Severity};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub findings: Vec<Finding>,
    pub hardcoded_links: Vec<String>,
    pub coverage: InstructionCoverage,
}

pub struct RuleChecks {
    max_words: usize,
    max_avg_sentence_len: f64,
    locale_segment: Regex,
    stale_phrases: Vec<(String, Regex)>,
    step_phrase: Regex,
    web_reference: Regex,
    app_reference: Regex,
    web_branch: Regex,
    app_branch: Regex,
}

impl RuleChecks {
    pub fn new(config: &RuleConfig) -> Result<Self, regex::Error> {
        let mut stale_phrases = Vec::with_capacity(config.stale_ui_phrases.len());
        for phrase in &config.stale_ui_phrases {
            let trimmed = phrase.trim();
            if trimmed.is_empty() {
                continue;
            }
            stale_phrases.push((trimmed.to_string(), phrase_pattern(trimmed)?));
        }

        Ok(Self {
            max_words: config.max_words,
            max_avg_sentence_len: config.max_avg_sentence_len,
            locale_segment: Regex::new(
                r"(?i)(?:/hc|^(?:https?:)?//[^/?#]+)/([a-z]{2}-[a-z]{2})(?:/|$|[?#])",
            )?,
            stale_phrases,
            step_phrase: Regex::new(r"(?i)\bstep\s+(\d{1,2})\b")?,
            web_reference: Regex::new(r"(?i)\b(?:web|website|browser|computer|desktop|etsy\.com)\b")?,
            app_reference: Regex::new(r"(?i)\b(?:app|mobile)\b")?,
            web_branch: Regex::new(
                r"(?im)^(?:#+\s*)?(?:on|in|using|from|via)\s+(?:the\s+|your\s+|a\s+)?(?:etsy\.com|web|website|browser|computer|desktop)\b",
            )?,
            app_branch: Regex::new(
                r"(?im)^(?:#+\s*)?(?:on|in|using|from|via)\s+(?:the\s+|your\s+)?(?:sell\s+on\s+etsy\s+|etsy\s+)?(?:app|mobile|phone|ios|android)\b",
            )?,
        })
    }

    pub fn run(&self, parsed: &ParsedArticle<'_>) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();

        self.check_link_targets(parsed, &mut outcome);
        self.check_stale_phrases(parsed, &mut outcome.findings);
        self.check_brevity(parsed, &mut outcome.findings);
        outcome.coverage = InstructionCoverage {
            web: self.web_branch.is_match(&parsed.body.text),
            app: self.app_branch.is_match(&parsed.body.text),
        };
        self.check_steps(parsed, outcome.coverage, &mut outcome.findings);

        outcome
    }

    fn check_link_targets(&self, parsed: &ParsedArticle<'_>, outcome: &mut RuleOutcome) {
        let mut seen = BTreeSet::new();

        for link in &parsed.body.links {
            let href = link.href.as_deref().map(str::trim).unwrap_or_default();

            if href.is_empty() || href == "#" {
                outcome.findings.push(
                    Finding::rule(
                        Category::Technical,
                        Severity::Critical,
                        format!("link \"{}\" has an empty target", link.text),
                    )
                    .with_location(link.text.clone()),
                );
                continue;
            }

            if !is_well_formed_target(href) {
                outcome.findings.push(
                    Finding::rule(
                        Category::Technical,
                        Severity::Critical,
                        format!("link \"{}\" has a malformed target", link.text),
                    )
                    .with_location(href.to_string()),
                );
            }

            if let Some(captures) = self.locale_segment.captures(href) {
                let locale = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                outcome.findings.push(
                    Finding::rule(
                        Category::Technical,
                        Severity::Minor,
                        format!(
                            "link hardcodes locale segment /{locale}/; remove it so the help center can localize the link"
                        ),
                    )
                    .with_location(href.to_string()),
                );
                if seen.insert(href.to_string()) {
                    outcome.hardcoded_links.push(href.to_string());
                }
            }
        }
    }

    fn check_stale_phrases(&self, parsed: &ParsedArticle<'_>, findings: &mut Vec<Finding>) {
        for (line_index, line) in parsed.body.text.lines().enumerate() {
            for (phrase, pattern) in &self.stale_phrases {
                for hit in pattern.find_iter(line) {
                    findings.push(
                        Finding::rule(
                            Category::Technical,
                            Severity::Major,
                            format!(
                                "references retired UI label \"{}\" (denylisted: {phrase})",
                                hit.as_str()
                            ),
                        )
                        .with_location(format!("line {}", line_index + 1)),
                    );
                }
            }
        }
    }

    fn check_brevity(&self, parsed: &ParsedArticle<'_>, findings: &mut Vec<Finding>) {
        let words = word_count(&parsed.body.text);
        let lengths = sentence_lengths(&parsed.body.text);
        let average = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };

        let mut reasons = Vec::new();
        if words > self.max_words {
            reasons.push(format!("{words} words exceeds the {} word limit", self.max_words));
        }
        if average > self.max_avg_sentence_len {
            reasons.push(format!(
                "average sentence length {average:.1} words exceeds {:.1}",
                self.max_avg_sentence_len
            ));
        }

        if !reasons.is_empty() {
            findings.push(Finding::rule(
                Category::Brief,
                Severity::Minor,
                format!("article is not brief: {}", reasons.join("; ")),
            ));
        }
    }

    fn check_steps(
        &self,
        parsed: &ParsedArticle<'_>,
        coverage: InstructionCoverage,
        findings: &mut Vec<Finding>,
    ) {
        let text = &parsed.body.text;
        let step_numbers = self
            .step_phrase
            .captures_iter(text)
            .filter_map(|captures| captures.get(1))
            .filter_map(|number| number.as_str().parse::<u32>().ok())
            .collect::<BTreeSet<u32>>();

        let claims_steps = parsed.body.has_ordered_list || !step_numbers.is_empty();
        if !claims_steps {
            return;
        }

        let step_count = parsed.body.ordered_items.max(step_numbers.len());
        if step_count < 2 {
            findings.push(Finding::rule(
                Category::Actionable,
                Severity::Major,
                format!(
                    "article presents step-by-step instructions but provides {step_count} step(s)"
                ),
            ));
        }

        let references_both =
            self.web_reference.is_match(text) && self.app_reference.is_match(text);
        if references_both && !(coverage.web && coverage.app) {
            let missing = match (coverage.web, coverage.app) {
                (false, false) => "web and app",
                (false, true) => "web",
                _ => "app",
            };
            findings.push(Finding::rule(
                Category::Actionable,
                Severity::Major,
                format!(
                    "instructions mention both web and app but lack a dedicated {missing} branch"
                ),
            ));
        }
    }
}

fn phrase_pattern(phrase: &str) -> Result<Regex, regex::Error> {
    let leading = if phrase.starts_with(|c: char| c.is_alphanumeric()) {
        r"\b"
    } else {
        ""
    };
    let trailing = if phrase.ends_with(|c: char| c.is_alphanumeric()) {
        r"\b"
    } else {
        ""
    };
    let escaped = regex::escape(phrase).replace(' ', r"\s+");
    Regex::new(&format!("(?i){leading}{escaped}{trailing}"))
}

pub fn is_well_formed_target(href: &str) -> bool {
    if href.chars().any(char::is_whitespace) {
        return false;
    }

    let lower = href.to_ascii_lowercase();
    if let Some(fragment) = lower.strip_prefix('#') {
        return !fragment.is_empty();
    }
    if lower.starts_with('/') {
        return true;
    }
    if let Some(address) = lower.strip_prefix("mailto:") {
        return address.contains('@') && !address.starts_with('@');
    }
    if let Some(number) = lower.strip_prefix("tel:") {
        return !number.is_empty();
    }

    let rest = match lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return !lower.contains(':'),
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority
        .rsplit('@')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default();

    !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && !host.contains("..")
        && (host.contains('.') || host == "localhost")
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}
