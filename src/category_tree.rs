use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;

const NAVIGATION_ID: &str = "vakionavi";
const MAIN_MENU_CLASS: &str = "main-menu-item";

static NAVIGATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#vakionavi").expect("Invalid navigation selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("Invalid anchor selector"));

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDescriptor {
    pub main_category: String,
    pub subcategory: String,
    pub listing_id: String,
}

impl std::fmt::Display for CategoryDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} - {}", self.main_category, self.subcategory)
    }
}

fn listing_id(href: &str) -> Option<&str> {
    href.split('=').nth(1)
}

/// Reads the left navigation menu into one descriptor per subcategory link.
///
/// Each group under the menu container may open with a `main-menu-item`
/// anchor, which names the main category for the subcategory anchors
/// following it.
#[tracing::instrument(skip_all)]
pub fn parse_categories(page: &str) -> Result<Vec<CategoryDescriptor>, ParseError> {
    if page.trim().is_empty() {
        tracing::error!("Main page is empty. Nothing to parse");
        return Ok(vec![]);
    }

    let html = Html::parse_document(page);
    let root = html
        .select(&NAVIGATION)
        .next()
        .ok_or_else(|| ParseError::MissingContainer(NAVIGATION_ID.to_string()))?;

    let mut categories = vec![];
    let mut main_category: Option<String> = None;

    for group in root.children().filter_map(ElementRef::wrap) {
        for anchor in group.select(&ANCHOR) {
            let text = anchor.text().collect::<String>();
            if anchor.value().classes().any(|c| c == MAIN_MENU_CLASS) {
                main_category = Some(text);
                continue;
            }
            let href = anchor
                .attr("href")
                .ok_or_else(|| ParseError::MissingHref(text.clone()))?;
            let listing_id =
                listing_id(href).ok_or_else(|| ParseError::MissingListingId(href.to_string()))?;
            let main = main_category
                .clone()
                .ok_or_else(|| ParseError::MissingMainCategory(text.clone()))?;
            categories.push(CategoryDescriptor {
                main_category: main,
                subcategory: text,
                listing_id: listing_id.to_string(),
            });
        }
    }

    tracing::info!("Successfully parsed {} categories", categories.len());
    Ok(categories)
}
