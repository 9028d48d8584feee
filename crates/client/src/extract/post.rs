//! Synchronous parsing of a single post.
//!
//! The parsed tree never leaves this module; callers get owned strings back.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static CONTENT: LazyLock<Selector> = LazyLock::new(|| selector(r#"div[data-ft='{"tn":"*s"}'] > div:first-child"#));
static MULTIMEDIA: LazyLock<Selector> = LazyLock::new(|| selector(r#"div[data-ft='{"tn":"H"}']"#));
static AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector("header > h3 > span > strong > a"));
static DATE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"footer[data-ft='{"tn":"*W"}'] > div:first-child > abbr"#));
static FOOTER_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"footer[data-ft='{"tn":"*W"}'] > div:nth-child(2) > a"#));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static LABELLED_ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[aria-label]"));
static IMAGE_ALT: LazyLock<Selector> = LazyLock::new(|| selector("a > img[alt]"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid selector")
}

/// Raw fields of one post, before date normalization and link resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParsedPost {
    pub author: String,
    pub title: String,
    pub description: String,
    pub date_str: String,
    /// First footer link `href`, unresolved.
    pub footer_href: Option<String>,
    /// `href` of a trailing `More` link when the post is truncated.
    pub more: Option<String>,
}

impl ParsedPost {
    /// Parse post markup. Missing elements become empty strings or `None`.
    pub fn parse(markup: &str, text_only: bool) -> Self {
        let document = Html::parse_document(markup);
        let content: Vec<ElementRef<'_>> = document.select(&CONTENT).collect();
        let multimedia = document.select(&MULTIMEDIA).next();

        let content_text: String = content.iter().flat_map(|el| el.text()).collect();
        let content_text = content_text.trim();

        let more = content
            .iter()
            .flat_map(|el| el.select(&ANCHOR))
            .last()
            .filter(|a| a.text().collect::<String>() == "More")
            .and_then(|a| a.value().attr("href"))
            .filter(|href| href.starts_with("/story.php"))
            .map(str::to_string);

        let description = if text_only {
            let mut description = content_text.to_string();
            if let Some(label) = multimedia.and_then(media_label) {
                description.push('\n');
                description.push_str(&label);
            }
            description
        } else {
            let content_html = content.first().map(|el| el.inner_html()).unwrap_or_default();
            let media_html = multimedia.map(|el| el.inner_html()).unwrap_or_default();
            format!("{content_html}<br/>{media_html}")
        };

        Self {
            author: first_text(&document, &AUTHOR),
            title: content_text.to_string(),
            description,
            date_str: first_text(&document, &DATE).trim().to_string(),
            footer_href: document
                .select(&FOOTER_LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string),
            more,
        }
    }
}

fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect())
        .unwrap_or_default()
}

/// Accessible label of the media block: an `aria-label`, else an image `alt`.
fn media_label(multimedia: ElementRef<'_>) -> Option<String> {
    let aria = multimedia
        .select(&LABELLED_ANCHOR)
        .filter_map(|a| a.value().attr("aria-label"))
        .find(|label| !label.trim().is_empty());
    let alt = || {
        multimedia
            .select(&IMAGE_ALT)
            .filter_map(|img| img.value().attr("alt"))
            .find(|alt| !alt.trim().is_empty())
    };
    aria.or_else(alt).map(str::to_string)
}
