use serde_json::Value;

use super::{Flattened, FlattenedArticleRef, BREADCRUMB_SEPARATOR, NEW_ARTICLE_PLACEHOLDER};
use crate::error::MalformedListingError;

/// Deepest nesting accepted below the node handed to [`flatten`].
pub const MAX_DEPTH: usize = 64;

fn child_breadcrumb(breadcrumb: Option<&str>, text: &str) -> String {
    match breadcrumb {
        Some(prefix) => format!("{}{}{}", prefix, BREADCRUMB_SEPARATOR, text),
        None => text.to_string(),
    }
}

fn text_of(node: &Value) -> Option<&str> {
    node.get("text").and_then(Value::as_str)
}

/// Children of a group node. `Ok(None)` marks a leaf; a `nodes` field that is
/// present but not a list is malformed.
fn children_of<'a>(
    node: &'a Value,
    text: &str,
) -> Result<Option<&'a Vec<Value>>, MalformedListingError> {
    match node.get("nodes") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(children)) => Ok(Some(children)),
        Some(_) => Err(MalformedListingError::InvalidNodes {
            text: text.to_string(),
        }),
    }
}

fn flatten_node(
    node: &Value,
    breadcrumb: Option<&str>,
    depth: usize,
    out: &mut Flattened,
) -> Result<(), MalformedListingError> {
    if depth > MAX_DEPTH {
        return Err(MalformedListingError::TooDeep(MAX_DEPTH));
    }
    let text = text_of(node).ok_or_else(|| MalformedListingError::MissingText {
        breadcrumb: breadcrumb.unwrap_or_default().to_string(),
    })?;

    match children_of(node, text)? {
        Some(children) => {
            let breadcrumb = child_breadcrumb(breadcrumb, text);
            for child in children {
                // a broken child only costs its own subtree
                if let Err(err) = flatten_node(child, Some(breadcrumb.as_str()), depth + 1, out) {
                    tracing::error!("Failed to process articles list node: {}", err);
                    tracing::debug!("Current sub tree: {}", child);
                    out.malformed.push(err);
                }
            }
        }
        None => match node.get("href").and_then(Value::as_str) {
            Some(href) if text != NEW_ARTICLE_PLACEHOLDER => out.refs.push(FlattenedArticleRef {
                breadcrumb: breadcrumb.unwrap_or_default().to_string(),
                title: text.to_string(),
                href: href.to_string(),
            }),
            _ => {
                tracing::debug!("Skipping leaf {:?} under {:?}", text, breadcrumb);
                out.skipped += 1;
            }
        },
    }
    Ok(())
}

/// Flattens `node` depth-first, left to right.
///
/// Leaves become article references whose breadcrumb is `breadcrumb` extended
/// by the text of every ancestor between `node` and the leaf. Placeholder
/// leaves and leaves without a string href are counted in `skipped`. A
/// descendant without string `text`, or with `nodes` that is not a list,
/// drops only its own subtree and is recorded in `malformed`; `node` itself
/// being malformed is an error.
pub fn flatten(node: &Value, breadcrumb: Option<&str>) -> Result<Flattened, MalformedListingError> {
    let mut out = Flattened::default();
    flatten_node(node, breadcrumb, 0, &mut out)?;
    Ok(out)
}

/// Decodes a listing document and flattens the tree under its first element.
#[tracing::instrument(skip_all)]
pub fn flatten_listing(body: &str) -> Result<Flattened, MalformedListingError> {
    let listing: Vec<Value> =
        serde_json::from_str(body).map_err(|err| MalformedListingError::Json(err.to_string()))?;
    let root = listing.first().ok_or(MalformedListingError::EmptyListing)?;
    let root_name = text_of(root).ok_or_else(|| MalformedListingError::MissingText {
        breadcrumb: String::new(),
    })?;
    if children_of(root, root_name)?.is_none() {
        return Err(MalformedListingError::MissingNodes(root_name.to_string()));
    }

    tracing::info!("Start parsing {} articles list", root_name);
    let flattened = flatten(root, None)?;
    tracing::info!(
        "[{}]: Discovered {} articles, skipped {}",
        root_name,
        flattened.refs.len(),
        flattened.skipped
    );
    Ok(flattened)
}
