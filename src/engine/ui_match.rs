use crate::config::UiMatchConfig;
use crate::model::{
    CatalogEntry, Category, Finding, FindingSource, MatchResult, MatchStatus, Severity, UiCheck,
    UiKind, UiReference, UiSummary,
};

const PATH_SEPARATOR: &str = " > ";

pub struct CatalogMatcher {
    max_edit_distance: usize,
    min_substring_len: usize,
}

impl CatalogMatcher {
    pub fn new(config: &UiMatchConfig) -> Self {
        Self {
            max_edit_distance: config.fuzzy_max_edit_distance,
            min_substring_len: config.min_substring_len,
        }
    }

    pub fn match_references(
        &self,
        references: &[UiReference],
        catalog: &[CatalogEntry],
    ) -> Vec<MatchResult> {
        references
            .iter()
            .map(|reference| self.match_reference(reference, catalog))
            .collect()
    }

    fn match_reference(&self, reference: &UiReference, catalog: &[CatalogEntry]) -> MatchResult {
        let whole = self.match_text(reference.kind, &reference.normalized_text, catalog);
        if whole.status == MatchStatus::Verified
            || reference.kind != UiKind::NavPath
            || !reference.normalized_text.contains(PATH_SEPARATOR)
        {
            return whole;
        }

        // Paths are rarely catalogued whole; fall back to checking each hop.
        let mut worst: Option<MatchResult> = None;
        for segment in reference.normalized_text.split(PATH_SEPARATOR) {
            let result = self.match_text(UiKind::NavPath, segment, catalog);
            let replace = worst
                .as_ref()
                .is_none_or(|current| rank(result.status) >= rank(current.status));
            if replace {
                worst = Some(result);
            }
        }

        worst.unwrap_or(whole)
    }

    fn match_text(&self, kind: UiKind, text: &str, catalog: &[CatalogEntry]) -> MatchResult {
        let candidates = catalog.iter().filter(|entry| entry.kind == kind);

        let mut best_fuzzy: Option<(usize, &CatalogEntry)> = None;
        for entry in candidates {
            if entry.normalized_text == text {
                return MatchResult {
                    status: MatchStatus::Verified,
                    matched_catalog_entry: Some(entry.clone()),
                };
            }

            if let Some(distance) = self.fuzzy_distance(text, &entry.normalized_text) {
                if best_fuzzy.is_none_or(|(best, _)| distance < best) {
                    best_fuzzy = Some((distance, entry));
                }
            }
        }

        match best_fuzzy {
            Some((_, entry)) => MatchResult {
                status: MatchStatus::Stale,
                matched_catalog_entry: Some(entry.clone()),
            },
            None => MatchResult {
                status: MatchStatus::Unknown,
                matched_catalog_entry: None,
            },
        }
    }

    fn fuzzy_distance(&self, text: &str, known: &str) -> Option<usize> {
        let distance = edit_distance(text, known);
        if distance <= self.max_edit_distance {
            return Some(distance);
        }

        let (shorter, longer) = if text.len() <= known.len() {
            (text, known)
        } else {
            (known, text)
        };
        let substring = shorter.chars().count() >= self.min_substring_len
            && contains_words(longer, shorter);
        substring.then_some(distance)
    }
}

fn rank(status: MatchStatus) -> u8 {
    match status {
        MatchStatus::Verified => 0,
        MatchStatus::Stale => 1,
        MatchStatus::Unknown => 2,
    }
}

fn contains_words(haystack: &str, needle: &str) -> bool {
    haystack
        .match_indices(needle)
        .any(|(start, matched)| {
            let before = haystack[..start].chars().next_back();
            let after = haystack[start + matched.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
}

pub fn edit_distance(left: &str, right: &str) -> usize {
    let right_chars = right.chars().collect::<Vec<char>>();
    let mut previous = (0..=right_chars.len()).collect::<Vec<usize>>();
    let mut current = vec![0; right_chars.len() + 1];

    for (i, left_char) in left.chars().enumerate() {
        current[0] = i + 1;
        for (j, right_char) in right_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(left_char != *right_char);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right_chars.len()]
}

pub fn pair_checks(references: Vec<UiReference>, results: Vec<MatchResult>) -> Vec<UiCheck> {
    references
        .into_iter()
        .zip(results)
        .map(|(reference, result)| UiCheck { reference, result })
        .collect()
}

pub fn summarize(checks: &[UiCheck]) -> UiSummary {
    let mut summary = UiSummary {
        total: checks.len(),
        ..UiSummary::default()
    };
    for check in checks {
        match check.result.status {
            MatchStatus::Verified => summary.verified += 1,
            MatchStatus::Stale => summary.stale += 1,
            MatchStatus::Unknown => summary.unknown += 1,
        }
    }
    summary
}

pub fn ui_findings(checks: &[UiCheck]) -> Vec<Finding> {
    checks
        .iter()
        .filter_map(|check| {
            let reference = &check.reference;
            match check.result.status {
                MatchStatus::Verified => None,
                MatchStatus::Stale => {
                    let closest = check
                        .result
                        .matched_catalog_entry
                        .as_ref()
                        .map(|entry| entry.normalized_text.as_str())
                        .unwrap_or_default();
                    Some(
                        Finding::new(
                            FindingSource::UiCheck,
                            Category::Technical,
                            Severity::Major,
                            format!(
                                "UI reference \"{}\" looks outdated; closest current element is \"{closest}\"",
                                reference.raw_text
                            ),
                        )
                        .with_location(reference.raw_text.clone()),
                    )
                }
                MatchStatus::Unknown => Some(
                    Finding::new(
                        FindingSource::UiCheck,
                        Category::Technical,
                        Severity::Minor,
                        format!(
                            "UI reference \"{}\" is not in the UI catalog; needs manual review",
                            reference.raw_text
                        ),
                    )
                    .with_location(reference.raw_text.clone())
                    .flagged_for_review(),
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn matcher() -> CatalogMatcher {
        CatalogMatcher::new(&UiMatchConfig::default())
    }

    fn entry(kind: UiKind, text: &str) -> CatalogEntry {
        CatalogEntry {
            kind,
            normalized_text: text.to_string(),
        }
    }

    fn reference(kind: UiKind, raw: &str) -> UiReference {
        UiReference {
            kind,
            raw_text: raw.to_string(),
            normalized_text: crate::engine::ui_refs::normalize_reference(raw),
        }
    }

    #[test]
    fn exact_match_in_same_kind_is_verified() {
        let catalog = vec![entry(UiKind::Button, "shop manager")];
        let results =
            matcher().match_references(&[reference(UiKind::Button, "Shop Manager")], &catalog);

        assert_eq!(
            results,
            vec![MatchResult {
                status: MatchStatus::Verified,
                matched_catalog_entry: Some(entry(UiKind::Button, "shop manager")),
            }]
        );
    }

    #[test]
    fn unmatched_reference_is_unknown_and_flagged() {
        let catalog = vec![entry(UiKind::Button, "shop manager")];
        let references = vec![reference(UiKind::Button, "Seller Dashboard")];
        let results = matcher().match_references(&references, &catalog);
        assert_eq!(results[0].status, MatchStatus::Unknown);

        let findings = ui_findings(&pair_checks(references, results));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Minor);
        assert_eq!(findings[0].category, Category::Technical);
        assert_eq!(findings[0].source, FindingSource::UiCheck);
        assert!(findings[0].needs_review);
    }

    #[test]
    fn near_miss_and_substring_are_stale() {
        let catalog = vec![
            entry(UiKind::Button, "add a listing"),
            entry(UiKind::Button, "publish"),
        ];
        let references = vec![
            reference(UiKind::Button, "Publsh"),
            reference(UiKind::Button, "Add a listing now"),
        ];
        let results = matcher().match_references(&references, &catalog);

        assert_eq!(results[0].status, MatchStatus::Stale);
        assert_eq!(
            results[0].matched_catalog_entry,
            Some(entry(UiKind::Button, "publish"))
        );
        assert_eq!(results[1].status, MatchStatus::Stale);

        let findings = ui_findings(&pair_checks(references, results));
        assert!(findings.iter().all(|finding| finding.severity == Severity::Major));
    }

    #[test]
    fn kinds_do_not_cross_match() {
        let catalog = vec![entry(UiKind::NavPath, "settings")];
        let results = matcher().match_references(&[reference(UiKind::Button, "Settings")], &catalog);
        assert_eq!(results[0].status, MatchStatus::Unknown);
    }

    #[test]
    fn nav_paths_resolve_hop_by_hop() {
        let catalog = vec![
            entry(UiKind::NavPath, "shop manager"),
            entry(UiKind::NavPath, "settings"),
        ];
        let verified = matcher().match_references(
            &[reference(UiKind::NavPath, "Shop Manager > Settings")],
            &catalog,
        );
        assert_eq!(verified[0].status, MatchStatus::Verified);

        let partial = matcher().match_references(
            &[reference(UiKind::NavPath, "Shop Manager > Seller Dashboard")],
            &catalog,
        );
        assert_eq!(partial[0].status, MatchStatus::Unknown);
    }

    #[test]
    fn empty_catalog_resolves_everything_to_unknown() {
        let references = vec![
            reference(UiKind::Button, "Save"),
            reference(UiKind::NavPath, "Shop Manager > Settings"),
        ];
        let results = matcher().match_references(&references, &[]);
        assert!(
            results
                .iter()
                .all(|result| result.status == MatchStatus::Unknown)
        );
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn edit_distance_counts_single_char_operations() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("save", "save"), 0);
    }

    #[test]
    fn summary_counts_statuses() {
        let references = vec![
            reference(UiKind::Button, "Save"),
            reference(UiKind::Button, "Sav"),
            reference(UiKind::Button, "Launch rocket"),
        ];
        let catalog = vec![entry(UiKind::Button, "save")];
        let results = matcher().match_references(&references, &catalog);
        let summary = summarize(&pair_checks(references, results));

        assert_eq!(
            summary,
            UiSummary {
                total: 3,
                verified: 1,
                stale: 1,
                unknown: 1,
            }
        );
    }
}
