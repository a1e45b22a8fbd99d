use regex::Regex;

use crate::engine::text::ParsedArticle;
use crate::model::{UiKind, UiReference};

const MIN_REFERENCE_CHARS: usize = 2;
const MAX_REFERENCE_CHARS: usize = 60;

pub struct UiReferenceExtractor {
    pattern: Regex,
}

impl UiReferenceExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let word = r"[A-Z][A-Za-z0-9'’]*";
        let segment = format!(r"{word}(?:[ ](?:&|{word}))*");
        let plain_path = format!(r"{segment}(?:[ ]*>[ ]*{segment})+");

        let pattern = format!(
            r#"\b(?i:(click|tap|select|press|choose|go\s+to|navigate\s+to|open))\s+(?i:on\s+)?(?i:the\s+)?(?:\*\*([^*\n]{{1,60}}?)\*\*|"([^"\n]{{1,60}})"|“([^”\n]{{1,60}})”|\[([^\]\n]{{1,60}})\]|({plain_path}))"#
        );

        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    pub fn extract(&self, parsed: &ParsedArticle<'_>) -> Vec<UiReference> {
        let text = &parsed.body.emphasized;
        let mut references = Vec::new();

        for captures in self.pattern.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let verb = captures
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default();

            if captures.get(5).is_some() && text[whole.end()..].starts_with('(') {
                continue;
            }

            let Some(phrase) = (2..=6).find_map(|index| captures.get(index)) else {
                continue;
            };
            let raw_text = phrase.as_str().trim().to_string();
            let length = raw_text.chars().count();
            if !(MIN_REFERENCE_CHARS..=MAX_REFERENCE_CHARS).contains(&length) {
                continue;
            }

            let navigates = verb.starts_with("go") || verb.starts_with("navigate");
            let kind = if raw_text.contains('>') || navigates {
                UiKind::NavPath
            } else {
                UiKind::Button
            };

            let normalized_text = normalize_reference(&raw_text);
            if normalized_text.is_empty() {
                continue;
            }

            references.push(UiReference {
                kind,
                raw_text,
                normalized_text,
            });
        }

        references
    }
}

pub fn normalize_reference(raw: &str) -> String {
    raw.split('>')
        .map(normalize_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<String>>()
        .join(" > ")
}

fn normalize_segment(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::text::Markup;
    use crate::model::Article;
    use pretty_assertions::assert_eq;

    fn extract(body: &str) -> Vec<UiReference> {
        let article = Article {
            id: "1".to_string(),
            url: String::new(),
            title: "Help".to_string(),
            body: body.to_string(),
            audience_segment_hint: None,
            locale: "en-us".to_string(),
        };
        let markup = Markup::new().expect("markup patterns compile");
        UiReferenceExtractor::new()
            .expect("extractor pattern compiles")
            .extract(&markup.parse(&article))
    }

    fn reference(kind: UiKind, raw: &str, normalized: &str) -> UiReference {
        UiReference {
            kind,
            raw_text: raw.to_string(),
            normalized_text: normalized.to_string(),
        }
    }

    #[test]
    fn extracts_bold_quoted_and_bracketed_phrases() {
        let references = extract(
            "<p>Click <strong>Shop Manager</strong>.</p>\
             <p>Tap the \"Save changes\" button.</p>\
             <p>Select [Renew].</p>\
             <p>Press “Publish!”</p>",
        );

        assert_eq!(
            references,
            vec![
                reference(UiKind::Button, "Shop Manager", "shop manager"),
                reference(UiKind::Button, "Save changes", "save changes"),
                reference(UiKind::Button, "Renew", "renew"),
                reference(UiKind::Button, "Publish!", "publish"),
            ]
        );
    }

    #[test]
    fn navigation_verbs_and_paths_yield_nav_references() {
        let references = extract(
            "<p>Go to <b>Shop Manager &gt; Settings</b>.</p>\
             <p>Navigate to Your Account &gt; Purchases &amp; Reviews to check.</p>",
        );

        assert_eq!(
            references,
            vec![
                reference(
                    UiKind::NavPath,
                    "Shop Manager > Settings",
                    "shop manager > settings"
                ),
                reference(
                    UiKind::NavPath,
                    "Your Account > Purchases & Reviews",
                    "your account > purchases & reviews"
                ),
            ]
        );
    }

    #[test]
    fn duplicates_are_preserved() {
        let references = extract("<p>Click **Edit**. Then click **Edit** again.</p>");
        assert_eq!(references.len(), 2);
        assert_eq!(references[0], references[1]);
    }

    #[test]
    fn markdown_links_and_plain_prose_are_ignored() {
        let references = extract("<p>Select [this article](/hc/articles/2). Click here to learn more.</p>");
        assert!(references.is_empty(), "unexpected: {references:?}");
    }

    #[test]
    fn normalize_reference_trims_punctuation_per_segment() {
        assert_eq!(
            normalize_reference("  \"Shop  Manager\" >  Settings. "),
            "shop manager > settings"
        );
        assert_eq!(normalize_reference("!!"), "");
    }
}
