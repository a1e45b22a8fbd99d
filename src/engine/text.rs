use regex::Regex;

use crate::model::Article;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBody {
    pub text: String,
    pub emphasized: String,
    pub links: Vec<Link>,
    pub has_ordered_list: bool,
    pub ordered_items: usize,
}

#[derive(Debug, Clone)]
pub struct ParsedArticle<'a> {
    pub article: &'a Article,
    pub body: ParsedBody,
}

pub struct Markup {
    script_style: Regex,
    block_break: Regex,
    bold: Regex,
    tag: Regex,
    anchor: Regex,
    href: Regex,
    markdown_link: Regex,
    ordered_block: Regex,
    list_item: Regex,
    markdown_ordered_line: Regex,
    spaces: Regex,
}

impl Markup {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            script_style: Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")?,
            block_break: Regex::new(
                r"(?i)<br\s*/?>|</?(?:p|div|li|ol|ul|h[1-6]|tr|table|section|article|blockquote)\b[^>]*>",
            )?,
            bold: Regex::new(r"(?i)</?(?:strong|b)\b[^>]*>")?,
            tag: Regex::new(r"<[^>]*>")?,
            anchor: Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>")?,
            href: Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)?,
            markdown_link: Regex::new(r"\[([^\]\n]*)\]\(([^)\n]*)\)")?,
            ordered_block: Regex::new(r"(?is)<ol\b[^>]*>(.*?)</ol\s*>")?,
            list_item: Regex::new(r"(?i)<li\b")?,
            markdown_ordered_line: Regex::new(r"(?m)^[ \t]*\d{1,2}[.)][ \t]+\S")?,
            spaces: Regex::new(r"[ \t\u{a0}]+")?,
        })
    }

    pub fn parse<'a>(&self, article: &'a Article) -> ParsedArticle<'a> {
        ParsedArticle {
            article,
            body: self.parse_body(&article.body),
        }
    }

    pub fn parse_body(&self, body: &str) -> ParsedBody {
        let without_scripts = self.script_style.replace_all(body, "");

        let text = self.visible_text(&without_scripts);
        let emphasized = {
            let marked = self.bold.replace_all(&without_scripts, "**");
            self.visible_text(&marked)
        };

        let mut links = Vec::new();
        for captures in self.anchor.captures_iter(&without_scripts) {
            let attributes = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let inner = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
            let href = self.href.captures(attributes).and_then(|href| {
                href.get(1)
                    .or_else(|| href.get(2))
                    .or_else(|| href.get(3))
                    .map(|m| decode_entities(m.as_str().trim()))
            });
            links.push(Link {
                href,
                text: self.inline_text(inner),
            });
        }
        for captures in self.markdown_link.captures_iter(&without_scripts) {
            links.push(Link {
                href: captures.get(2).map(|m| m.as_str().trim().to_string()),
                text: captures
                    .get(1)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            });
        }

        let html_items = self
            .ordered_block
            .captures_iter(&without_scripts)
            .filter_map(|captures| captures.get(1))
            .map(|block| self.list_item.find_iter(block.as_str()).count())
            .sum::<usize>();
        let has_html_list = self.ordered_block.is_match(&without_scripts);
        let markdown_items = self.markdown_ordered_line.find_iter(&text).count();

        ParsedBody {
            has_ordered_list: has_html_list || markdown_items > 0,
            ordered_items: html_items.max(markdown_items),
            text,
            emphasized,
            links,
        }
    }

    fn visible_text(&self, markup: &str) -> String {
        let broken = self.block_break.replace_all(markup, "\n");
        let stripped = self.tag.replace_all(&broken, "");
        let decoded = decode_entities(&stripped);

        decoded
            .lines()
            .map(|line| self.spaces.replace_all(line, " ").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn inline_text(&self, markup: &str) -> String {
        let stripped = self.tag.replace_all(markup, "");
        let decoded = decode_entities(&stripped);
        self.spaces.replace_all(decoded.trim(), " ").to_string()
    }
}

pub fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&rsquo;", "\u{2019}")
        .replace("&ldquo;", "\u{201c}")
        .replace("&rdquo;", "\u{201d}")
        .replace("&amp;", "&")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .count()
}

pub fn sentence_lengths(text: &str) -> Vec<usize> {
    let mut lengths = Vec::new();
    for line in text.lines() {
        let mut current = String::new();
        let mut characters = line.chars().peekable();
        while let Some(character) = characters.next() {
            current.push(character);
            let at_boundary = characters.peek().is_none_or(|next| next.is_whitespace());
            if matches!(character, '.' | '!' | '?') && at_boundary {
                push_sentence(&mut lengths, &current);
                current.clear();
            }
        }
        push_sentence(&mut lengths, &current);
    }
    lengths
}

fn push_sentence(lengths: &mut Vec<usize>, sentence: &str) {
    let words = word_count(sentence);
    if words > 0 {
        lengths.push(words);
    }
}
