//! DOM-level markup editing
//!
//! Rendered pages are parsed into an html5ever tree with scraper, edited in
//! place through node ids, and serialized back. Only real elements are ever
//! touched: markup-looking text inside comments, scripts or attribute values
//! stays text.

use ego_tree::NodeId;
use html5ever::{LocalName, Namespace, QualName};
use scraper::{ElementRef, Html, Node, Selector, StrTendril};

/// A parsed page (or fragment) that can be edited and serialized
pub struct Markup {
    tree: Html,
    fragment: bool,
}

impl Markup {
    /// Parses `source` as a full document if it looks like one, otherwise as
    /// a body fragment
    pub fn parse(source: &str) -> Self {
        if looks_like_document(source) {
            Self {
                tree: Html::parse_document(source),
                fragment: false,
            }
        } else {
            Self {
                tree: Html::parse_fragment(source),
                fragment: true,
            }
        }
    }

    /// The underlying scraper tree, for selector queries
    pub fn tree(&self) -> &Html {
        &self.tree
    }

    /// Ids of the elements matching `selector`, in document order
    pub fn select_ids(&self, selector: &str) -> Vec<NodeId> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.tree.select(&selector).map(|element| element.id()).collect()
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.tree.tree.get(id).and_then(ElementRef::wrap)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.element(id)?.value().attr(name).map(str::to_string)
    }

    /// Whitespace-normalized text content of an element
    pub fn text(&self, id: NodeId) -> String {
        self.element(id)
            .map(|element| collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default()
    }

    /// Sets an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(mut node) = self.tree.tree.get_mut(id) else {
            return;
        };
        let Node::Element(element) = node.value() else {
            return;
        };

        if let Some((_, existing)) = element
            .attrs
            .iter_mut()
            .find(|(key, _)| &*key.local == name)
        {
            *existing = StrTendril::from_slice(value);
            return;
        }
        element
            .attrs
            .insert(attribute_name(name), StrTendril::from_slice(value));
    }

    /// Removes an attribute, returning its old value
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let mut node = self.tree.tree.get_mut(id)?;
        let Node::Element(element) = node.value() else {
            return None;
        };

        let key = element.attrs.keys().find(|key| &*key.local == name)?.clone();
        element
            .attrs
            .shift_remove(&key)
            .map(|value| value.to_string())
    }

    /// Serializes the edited tree
    ///
    /// Fragments serialize back to just their content, documents to the full
    /// page including the doctype.
    pub fn serialize(&self) -> String {
        if self.fragment {
            self.tree.root_element().inner_html()
        } else {
            self.tree.html()
        }
    }
}

fn attribute_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

fn looks_like_document(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.contains("<!doctype") || lower.contains("<html")
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
