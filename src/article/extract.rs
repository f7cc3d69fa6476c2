use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{ExtractedArticle, Section};
use crate::article_list::FlattenedArticleRef;
use crate::error::{ArticleError, ExtractionError, MalformedListingError};

/// Ceiling, in characters, on the paragraph text kept per section.
pub const CONTENT_CAP: usize = 2048;

const ARTICLE_ROOT_ID: &str = "duo-article";
const SECTION_NAME_LENGTH: usize = 8;

static ARTICLE_ROOT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#duo-article").expect("Invalid article selector"));
static KEYWORDS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="keywords"]"#).expect("Invalid keywords selector")
});
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("Invalid heading selector"));
static SECTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".section").expect("Invalid section selector"));
static ARTICLE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"p_artikkeli=(\w+)").expect("Invalid article id pattern"));

pub fn parse_article_id(href: &str) -> Result<String, MalformedListingError> {
    ARTICLE_ID_RE
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| MalformedListingError::ArticleId(href.to_string()))
}

/// Joins paragraphs in order until the next one would push the total past
/// `cap` characters. A paragraph is never split.
pub fn accumulate_paragraphs<I>(paragraphs: I, cap: usize) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut content = String::new();
    let mut length = 0;
    for paragraph in paragraphs {
        let paragraph_length = paragraph.chars().count();
        if length + paragraph_length > cap {
            break;
        }
        content.push_str(&paragraph);
        length += paragraph_length;
    }
    content
}

fn text_of(element: ElementRef) -> String {
    element.text().collect()
}

fn direct_children<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

fn first_heading(section: ElementRef, tag: &str) -> String {
    direct_children(section, tag)
        .next()
        .map(text_of)
        .unwrap_or_default()
}

fn extract_section(section: ElementRef, name: &str) -> Section {
    Section {
        name: name.to_string(),
        h2: first_heading(section, "h2"),
        h3: first_heading(section, "h3"),
        content: accumulate_paragraphs(direct_children(section, "p").map(text_of), CONTENT_CAP),
    }
}

/// Parses one article page into its sections.
///
/// Every section is named after the first characters of the article's `h1`,
/// not its own heading; stored rows depend on that naming.
#[tracing::instrument(skip_all, fields(title = %reference.title))]
pub fn extract_article(
    html: &str,
    reference: &FlattenedArticleRef,
) -> Result<ExtractedArticle, ArticleError> {
    let document = Html::parse_document(html);
    let root = document
        .select(&ARTICLE_ROOT)
        .next()
        .ok_or_else(|| ExtractionError::MissingRoot(ARTICLE_ROOT_ID.to_string()))?;

    let keywords = root
        .select(&KEYWORDS)
        .next()
        .and_then(|meta| meta.attr("content"))
        .map(str::to_string);

    let heading = root
        .select(&HEADING)
        .next()
        .ok_or(ExtractionError::MissingHeading)?;
    let name: String = text_of(heading).chars().take(SECTION_NAME_LENGTH).collect();

    let sections: Vec<Section> = root
        .select(&SECTION)
        .map(|section| extract_section(section, &name))
        .collect();

    let article_id = parse_article_id(&reference.href)?;
    tracing::debug!("Extracted {} sections from {}", sections.len(), article_id);

    Ok(ExtractedArticle {
        breadcrumb: reference.breadcrumb.clone(),
        title: reference.title.clone(),
        article_id,
        keywords,
        sections,
    })
}
