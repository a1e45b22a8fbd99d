use regex::Regex;

use crate::config::AudienceConfig;
use crate::engine::text::ParsedArticle;
use crate::model::{Audience, AudienceVerdict, Category, Finding, Severity};

pub struct AudienceClassifier {
    buyer_terms: Vec<Regex>,
    seller_terms: Vec<Regex>,
    min_signal: usize,
    dominance_ratio: f64,
}

impl AudienceClassifier {
    pub fn new(config: &AudienceConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            buyer_terms: compile_terms(&config.buyer_terms)?,
            seller_terms: compile_terms(&config.seller_terms)?,
            min_signal: config.min_signal.max(1),
            dominance_ratio: config.dominance_ratio,
        })
    }

    pub fn classify(&self, parsed: &ParsedArticle<'_>) -> AudienceVerdict {
        let haystack = format!("{}\n{}", parsed.article.title, parsed.body.text);
        let (buyer_signals, seller_signals) =
            count_signals(&self.buyer_terms, &self.seller_terms, &haystack);

        let detected = self.decide(buyer_signals, seller_signals);
        let hinted = parsed.article.audience_segment_hint;
        let mismatch = hinted.is_some_and(|hint| hint != detected) && detected != Audience::Both;

        AudienceVerdict {
            detected,
            hinted,
            mismatch,
            buyer_signals,
            seller_signals,
        }
    }

    fn decide(&self, buyer: usize, seller: usize) -> Audience {
        if buyer == 0 && seller == 0 {
            return Audience::Both;
        }

        if buyer >= self.min_signal && seller >= self.min_signal {
            let (strong, weak) = if buyer >= seller {
                (buyer, seller)
            } else {
                (seller, buyer)
            };
            if (strong as f64) < (weak as f64) * self.dominance_ratio {
                return Audience::Both;
            }
        }

        match buyer.cmp(&seller) {
            std::cmp::Ordering::Greater => Audience::Buyer,
            std::cmp::Ordering::Less => Audience::Seller,
            std::cmp::Ordering::Equal => Audience::Both,
        }
    }
}

pub fn audience_findings(verdict: &AudienceVerdict) -> Vec<Finding> {
    let Some(hinted) = verdict.hinted.filter(|_| verdict.mismatch) else {
        return Vec::new();
    };

    vec![Finding::rule(
        Category::Audience,
        Severity::Major,
        format!(
            "article is segmented for {hinted} but its content addresses {} (buyer signals: {}, seller signals: {})",
            verdict.detected, verdict.buyer_signals, verdict.seller_signals
        ),
    )]
}

fn compile_terms(terms: &[String]) -> Result<Vec<Regex>, regex::Error> {
    terms
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .map(|term| {
            let escaped = regex::escape(term).replace(' ', r"\s+");
            Regex::new(&format!(r"(?i)\b{escaped}\b"))
        })
        .collect()
}

// Longest match wins, so "contact the seller" is never also counted as "seller".
fn count_signals(
    buyer_terms: &[Regex],
    seller_terms: &[Regex],
    haystack: &str,
) -> (usize, usize) {
    let mut hits = Vec::new();
    for (side, terms) in [(Audience::Buyer, buyer_terms), (Audience::Seller, seller_terms)] {
        for term in terms {
            hits.extend(term.find_iter(haystack).map(|hit| (hit.start(), hit.end(), side)));
        }
    }
    hits.sort_by(|left, right| {
        (right.1 - right.0)
            .cmp(&(left.1 - left.0))
            .then(left.0.cmp(&right.0))
    });

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let (mut buyer, mut seller) = (0, 0);
    for (start, end, side) in hits {
        if claimed
            .iter()
            .any(|(taken_start, taken_end)| start < *taken_end && *taken_start < end)
        {
            continue;
        }
        claimed.push((start, end));
        match side {
            Audience::Seller => seller += 1,
            _ => buyer += 1,
        }
    }
    (buyer, seller)
}
