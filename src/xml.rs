//! XML utility functions for navigating response documents.
//!
//! Tag names are matched without their namespace prefix: endpoints wrap
//! records in the protocol namespace while the payload lives in its own,
//! and the harvester cares about local names only.

use roxmltree::Node;

/// Get the tag name without namespace prefix.
pub fn tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Find the first child element with the given local tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use oai_harvester::xml::find_child;
///
/// let xml = r#"<record><header/><metadata/></record>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// assert!(find_child(doc.root_element(), "header").is_some());
/// assert!(find_child(doc.root_element(), "about").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && tag_name(*child) == tag)
}

/// Find all child elements with the given local tag name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && tag_name(*child) == tag)
}

/// Find a descendant element by a slash-separated path of local tag names.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use oai_harvester::xml::{find_by_path, text_of};
///
/// let xml = r#"<record><header><identifier>oai:x:1</identifier></header></record>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let id = find_by_path(doc.root_element(), "header/identifier").unwrap();
/// assert_eq!(text_of(id), "oai:x:1");
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    let mut current = node;
    for part in path.split('/') {
        current = find_child(current, part)?;
    }
    Some(current)
}

/// Get the text content of a node, trimmed. Empty string if there is none.
pub fn text_of(node: Node<'_, '_>) -> String {
    node.text().map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Iterate over all descendant elements with the given local tag name.
pub fn descendants_named<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.descendants()
        .filter(move |n| n.is_element() && tag_name(*n) == tag)
}

/// Slice the raw XML of a node out of the document's source text.
///
/// `source` must be the exact string the node's document was parsed from.
pub fn raw_slice<'a>(source: &'a str, node: Node<'_, '_>) -> &'a str {
    &source[node.range()]
}

/// Escape a string for use in an XML attribute value.
pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
