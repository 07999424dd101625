//! Owned HTML element trees.
//!
//! Pages are parsed once with `scraper` and copied into a flat arena of
//! nodes linked by index. The document is `Send`, cheap to query repeatedly,
//! and carries no reference back to the parser or the response it came from.
//! Building, dropping, and walking the arena never recurse, so nesting depth
//! is bounded only by memory.

use std::collections::BTreeMap;
use std::fmt;

use scraper::{ElementRef, Html, Node};

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ElementData {
    tag: String,
    attributes: BTreeMap<String, String>,
    children: Vec<usize>,
}

/// A parsed HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    nodes: Vec<NodeData>,
    roots: Vec<usize>,
}

impl HtmlDocument {
    /// Parse a full HTML document.
    pub fn parse(source: &str) -> Self {
        let html = Html::parse_document(source);
        let (nodes, root) = copy_tree(html.root_element());
        Self {
            nodes,
            roots: vec![root],
        }
    }

    /// Parse an HTML fragment (no implied `<head>`/`<body>`).
    pub fn parse_fragment(source: &str) -> Self {
        let html = Html::parse_fragment(source);
        let (nodes, root) = copy_tree(html.root_element());
        let roots = match &nodes[root] {
            NodeData::Element(data) => data.children.clone(),
            NodeData::Text(_) => Vec::new(),
        };
        Self { nodes, roots }
    }

    /// Text of the first `<title>` element.
    pub fn title(&self) -> Option<String> {
        self.find_by_tag("title")
            .first()
            .map(|e| e.text().trim().to_string())
    }

    fn node(&self, index: usize) -> HtmlNode<'_> {
        match &self.nodes[index] {
            NodeData::Element(data) => HtmlNode::Element(Element { doc: self, data }),
            NodeData::Text(text) => HtmlNode::Text(text),
        }
    }
}

/// Copy a scraper subtree into an arena. Returns the arena and the index of
/// `root` within it.
///
/// Each child gets its slot when its parent is visited, so sibling order is
/// fixed up front and elements can be filled in from a work stack.
fn copy_tree(root: ElementRef<'_>) -> (Vec<NodeData>, usize) {
    let mut nodes = vec![NodeData::Element(ElementData::default())];
    let mut pending = vec![(root, 0)];

    while let Some((element, index)) = pending.pop() {
        let value = element.value();
        let mut children = Vec::new();
        for child in element.children() {
            match child.value() {
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        children.push(nodes.len());
                        pending.push((child, nodes.len()));
                        nodes.push(NodeData::Element(ElementData::default()));
                    }
                }
                Node::Text(text) => {
                    children.push(nodes.len());
                    nodes.push(NodeData::Text(String::from(&**text)));
                }
                _ => {}
            }
        }

        nodes[index] = NodeData::Element(ElementData {
            tag: value.name().to_string(),
            attributes: value
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            children,
        });
    }

    (nodes, 0)
}

/// A node borrowed from a document.
#[derive(Debug, Clone, Copy)]
pub enum HtmlNode<'a> {
    /// An element with its own children.
    Element(Element<'a>),
    /// A run of text.
    Text(&'a str),
}

/// An HTML element borrowed from its document.
#[derive(Clone, Copy)]
pub struct Element<'a> {
    doc: &'a HtmlDocument,
    data: &'a ElementData,
}

impl<'a> Element<'a> {
    /// Lowercase tag name.
    pub fn tag(&self) -> &'a str {
        &self.data.tag
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.data.attributes.get(name).map(String::as_str)
    }

    /// All attributes, sorted by name.
    pub fn attributes(&self) -> &'a BTreeMap<String, String> {
        &self.data.attributes
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.data.tag)
            .field("attributes", &self.data.attributes)
            .field("children", &self.data.children.len())
            .finish()
    }
}

/// Direct children of a document or element, in document order.
pub struct Children<'a> {
    doc: &'a HtmlDocument,
    ids: std::slice::Iter<'a, usize>,
}

impl<'a> Iterator for Children<'a> {
    type Item = HtmlNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let doc = self.doc;
        self.ids.next().map(|&index| doc.node(index))
    }
}

/// Query capabilities shared by documents and elements.
pub trait ElementQuery {
    /// Direct children.
    fn children(&self) -> Children<'_>;

    /// Every element below this node, depth-first in document order.
    fn descendants(&self) -> Descendants<'_> {
        let children = self.children();
        Descendants {
            doc: children.doc,
            stack: children.ids.as_slice().iter().rev().copied().collect(),
        }
    }

    /// Elements with the given tag name (case-insensitive).
    fn find_by_tag(&self, tag: &str) -> Vec<Element<'_>> {
        self.descendants()
            .filter(|e| e.tag().eq_ignore_ascii_case(tag))
            .collect()
    }

    /// Elements carrying an attribute, optionally with an exact value.
    fn find_by_attribute(&self, name: &str, value: Option<&str>) -> Vec<Element<'_>> {
        self.descendants()
            .filter(|e| match (e.attr(name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }

    /// First element with the given `id`.
    fn find_by_id(&self, id: &str) -> Option<Element<'_>> {
        self.descendants().find(|e| e.attr("id") == Some(id))
    }

    /// All descendant text, concatenated in document order.
    fn text(&self) -> String {
        let children = self.children();
        let doc = children.doc;
        let mut stack: Vec<usize> = children.ids.as_slice().iter().rev().copied().collect();
        let mut out = String::new();
        while let Some(index) = stack.pop() {
            match &doc.nodes[index] {
                NodeData::Text(text) => out.push_str(text),
                NodeData::Element(data) => stack.extend(data.children.iter().rev()),
            }
        }
        out
    }
}

impl ElementQuery for Element<'_> {
    fn children(&self) -> Children<'_> {
        Children {
            doc: self.doc,
            ids: self.data.children.iter(),
        }
    }
}

impl ElementQuery for HtmlDocument {
    fn children(&self) -> Children<'_> {
        Children {
            doc: self,
            ids: self.roots.iter(),
        }
    }
}

/// Depth-first iterator over descendant elements.
pub struct Descendants<'a> {
    doc: &'a HtmlDocument,
    stack: Vec<usize>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let doc = self.doc;
        while let Some(index) = self.stack.pop() {
            if let NodeData::Element(data) = &doc.nodes[index] {
                self.stack.extend(data.children.iter().rev());
                return Some(Element { doc, data });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title> Sign in </title></head>
          <body>
            <div id="main" class="card">
              <form id="kc-form-login" action="https://example.com/auth?a=1" method="post">
                <input name="username" type="text">
                <input name="password" type="password">
              </form>
              <p class="note">Hello <b>world</b>!</p>
            </div>
          </body>
        </html>
    "#;

    #[test]
    fn test_find_by_tag() {
        let doc = HtmlDocument::parse(PAGE);
        let inputs = doc.find_by_tag("INPUT");
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].attr("name"), Some("username"));
        assert_eq!(inputs[1].attr("name"), Some("password"));
    }

    #[test]
    fn test_find_by_attribute() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.find_by_attribute("type", Some("password")).len(), 1);
        assert_eq!(doc.find_by_attribute("name", None).len(), 2);
        assert!(doc.find_by_attribute("data-x", None).is_empty());
    }

    #[test]
    fn test_find_by_id_and_nested_query() {
        let doc = HtmlDocument::parse(PAGE);
        let form = doc.find_by_id("kc-form-login").unwrap();
        assert_eq!(form.tag(), "form");
        assert_eq!(form.attr("action"), Some("https://example.com/auth?a=1"));
        assert_eq!(form.find_by_tag("input").len(), 2);
        assert!(doc.find_by_id("missing").is_none());
    }

    #[test]
    fn test_text_extraction() {
        let doc = HtmlDocument::parse(PAGE);
        let note = doc.find_by_attribute("class", Some("note"))[0];
        assert_eq!(note.text(), "Hello world!");
        assert_eq!(doc.title().as_deref(), Some("Sign in"));
    }

    #[test]
    fn test_fragment_has_no_wrapper() {
        let doc = HtmlDocument::parse_fragment("<span>a</span><span>b</span>");
        assert_eq!(doc.find_by_tag("span").len(), 2);
        assert!(doc.find_by_tag("body").is_empty());
        assert_eq!(doc.text(), "ab");
    }

    #[test]
    fn test_children_in_document_order() {
        let doc = HtmlDocument::parse_fragment("<p>a<b>b</b>c</p>");
        let p = doc.find_by_tag("p")[0];
        let kinds: Vec<String> = p
            .children()
            .map(|node| match node {
                HtmlNode::Element(e) => format!("<{}>", e.tag()),
                HtmlNode::Text(t) => t.to_string(),
            })
            .collect();
        assert_eq!(kinds, ["a", "<b>", "c"]);
    }

    #[test]
    fn test_deeply_nested_markup() {
        let depth = 10_000;
        let source = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));

        let doc = HtmlDocument::parse(&source);
        assert_eq!(doc.find_by_tag("div").len(), depth);
        assert_eq!(doc.text(), "x");

        let copy = doc.clone();
        assert_eq!(copy, doc);
        drop(copy);
        drop(doc);
    }
}
