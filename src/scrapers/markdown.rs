//! HTML to plain text conversion.
//!
//! Tables come out as pipe-delimited rows (`cell | cell | cell`) with a
//! `---|---` line under header rows; everything else becomes one text block
//! per block-level element.

use super::FetchOptions;
use reqwest::Url;
use scraper::{ElementRef, Html, Node};

/// Never rendered, whatever the options say
const SKIPPED_TAGS: [&str; 8] = [
    "head", "script", "style", "noscript", "svg", "template", "button", "select",
];

const BLOCK_TAGS: [&str; 16] = [
    "p", "div", "section", "article", "main", "aside", "nav", "footer", "ul", "ol", "li", "dl",
    "dt", "dd", "blockquote", "pre",
];

const OVERLAY_MARKERS: [&str; 4] = ["overlay", "modal", "popup", "cookie"];

const MAX_COLSPAN: usize = 16;

/// Text of a page plus the iframes it embeds
#[derive(Debug, Clone, Default)]
pub struct ConvertedPage {
    pub markdown: String,
    pub iframes: Vec<String>,
}

/// Convert an HTML document fetched from `page_url`
pub fn html_to_markdown(html: &str, page_url: &str, options: &FetchOptions) -> ConvertedPage {
    let document = Html::parse_document(html);
    let mut converter = Converter {
        options,
        base: Url::parse(page_url).ok(),
        blocks: Vec::new(),
        inline: String::new(),
        iframes: Vec::new(),
    };

    converter.walk(document.root_element());
    converter.flush();

    ConvertedPage {
        markdown: converter.blocks.join("\n\n"),
        iframes: converter.iframes,
    }
}

/// Resolve `href` against `page_url`, keeping it only if it stays on the same host
pub fn same_host_url(page_url: &str, href: &str) -> Option<Url> {
    let base = Url::parse(page_url).ok()?;
    let target = base.join(href).ok()?;
    (target.host_str() == base.host_str()).then_some(target)
}

struct Converter<'o> {
    options: &'o FetchOptions,
    base: Option<Url>,
    blocks: Vec<String>,
    inline: String,
    iframes: Vec<String>,
}

impl Converter<'_> {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();

        if SKIPPED_TAGS.contains(&name) || self.options.excluded_tags.iter().any(|t| t == name) {
            return;
        }
        if self.options.remove_overlay_elements && is_overlay(element) {
            return;
        }

        match name {
            "table" => {
                self.flush();
                self.table(element);
            }
            "iframe" => {
                if let Some(src) = element.value().attr("src") {
                    self.iframes.push(src.to_string());
                }
            }
            "br" => self.flush(),
            "a" if self.options.exclude_external_links && self.is_external(element) => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let heading = collapse_whitespace(&element.text().collect::<String>());
                if !heading.is_empty() {
                    self.blocks
                        .push(format!("{} {}", "#".repeat(level), heading));
                }
            }
            _ if BLOCK_TAGS.contains(&name) => {
                self.flush();
                self.walk(element);
                self.flush();
            }
            _ => self.walk(element),
        }
    }

    fn push_text(&mut self, text: &str) {
        let words = collapse_whitespace(text);
        if words.is_empty() {
            if !text.is_empty() && !self.inline.is_empty() && !self.inline.ends_with(' ') {
                self.inline.push(' ');
            }
            return;
        }
        if text.starts_with(char::is_whitespace)
            && !self.inline.is_empty()
            && !self.inline.ends_with(' ')
        {
            self.inline.push(' ');
        }
        self.inline.push_str(&words);
        if text.ends_with(char::is_whitespace) {
            self.inline.push(' ');
        }
    }

    /// End the current prose block, dropping it if it is too short
    fn flush(&mut self) {
        let block = self.inline.trim();
        if !block.is_empty() && block.split_whitespace().count() >= self.options.word_count_threshold {
            self.blocks.push(block.to_string());
        }
        self.inline.clear();
    }

    fn table(&mut self, table: ElementRef<'_>) {
        let mut lines = Vec::new();

        for (index, row) in table_rows(table).into_iter().enumerate() {
            let mut cells = Vec::new();
            let mut header = true;

            for cell in row.children().filter_map(ElementRef::wrap) {
                let tag = cell.value().name();
                if tag != "td" && tag != "th" {
                    continue;
                }
                if tag == "td" {
                    header = false;
                }
                cells.push(cell_text(cell));

                let span = cell
                    .value()
                    .attr("colspan")
                    .and_then(|s| s.trim().parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, MAX_COLSPAN);
                cells.extend(std::iter::repeat(String::new()).take(span - 1));
            }

            if cells.is_empty() {
                continue;
            }
            lines.push(cells.join(" | "));
            if header && index == 0 {
                lines.push(vec!["---"; cells.len()].join("|"));
            }
        }

        if !lines.is_empty() {
            self.blocks.push(lines.join("\n"));
        }
    }

    fn is_external(&self, anchor: ElementRef<'_>) -> bool {
        let (Some(base), Some(href)) = (self.base.as_ref(), anchor.value().attr("href")) else {
            return false;
        };
        match base.join(href) {
            Ok(target) => {
                matches!(target.scheme(), "http" | "https") && target.host_str() != base.host_str()
            }
            Err(_) => false,
        }
    }
}

fn is_overlay(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let class = value.attr("class").unwrap_or_default().to_lowercase();
    let id = value.id().unwrap_or_default().to_lowercase();
    OVERLAY_MARKERS
        .iter()
        .any(|marker| class.contains(marker) || id.contains(marker))
}

/// Rows of this table only, not of tables nested inside it
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|row| row.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

/// Text nodes are joined without separators, so "<span>Arsenal</span><span>Chelsea</span>"
/// reads "ArsenalChelsea".
fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_whitespace(&cell.text().collect::<String>()).replace('|', "/")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
