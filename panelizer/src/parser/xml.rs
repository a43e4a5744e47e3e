//! Arena-backed XML document
//!
//! Board files are XML trees that the panelizer mutates in place: nodes are
//! detached, cloned and re-attached elsewhere. Every node lives in a single
//! arena and is addressed by a copyable [`NodeId`], so node lists captured
//! before a mutation stay valid after it.
//!
//! Loading goes through `roxmltree`; serialization is a hand-written
//! pretty printer that keeps the original prolog (XML declaration and
//! DOCTYPE) verbatim.

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] roxmltree::Error),
    #[error("Document has no root element")]
    NoRoot,
}

/// Index of a node inside an [`XmlDocument`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        name: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct XmlNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    prolog: String,
    nodes: Vec<XmlNode>,
    root: NodeId,
}

impl XmlDocument {
    /// Parse a document from text. DTDs are allowed since board files
    /// declare a DOCTYPE.
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let parsed = roxmltree::Document::parse_with_options(text, options)?;
        let root_element = parsed.root_element();
        let prolog = text[..root_element.range().start].trim().to_string();

        let mut doc = Self {
            prolog,
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = doc
            .import(root_element)
            .ok_or(XmlError::NoRoot)?;
        doc.root = root;
        Ok(doc)
    }

    /// Create a document holding a single empty root element.
    pub fn new(root_name: &str) -> Self {
        let mut doc = Self {
            prolog: "<?xml version=\"1.0\" encoding=\"utf-8\"?>".to_string(),
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.create_element(root_name, std::iter::empty::<(&str, String)>());
        doc
    }

    fn import(&mut self, node: roxmltree::Node<'_, '_>) -> Option<NodeId> {
        let kind = if node.is_element() {
            let attributes = node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect();
            NodeKind::Element {
                name: node.tag_name().name().to_string(),
                attributes,
            }
        } else if node.is_text() {
            let text = node.text().unwrap_or_default();
            if text.trim().is_empty() {
                return None;
            }
            NodeKind::Text(text.to_string())
        } else if node.is_comment() {
            NodeKind::Comment(node.text().unwrap_or_default().to_string())
        } else {
            return None;
        };

        let id = self.push(kind);
        for child in node.children() {
            if let Some(child_id) = self.import(child) {
                self.nodes[child_id.0].parent = Some(id);
                self.nodes[id.0].children.push(child_id);
            }
        }
        Some(id)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(XmlNode {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn prolog(&self) -> &str {
        &self.prolog
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    /// Element name, `None` for text and comment nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn rename(&mut self, id: NodeId, new_name: &str) {
        if let NodeKind::Element { name, .. } = &mut self.nodes[id.0].kind {
            *name = new_name.to_string();
        }
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => attributes.get(key).map(|s| s.as_str()),
            _ => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, key: &str) -> bool {
        self.attribute(id, key).is_some()
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attribute(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            attributes.insert(key.to_string(), value.into());
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, key: &str) -> Option<String> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => attributes.shift_remove(key),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        let attributes = match &self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        };
        attributes
            .into_iter()
            .flat_map(|a| a.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self, id: NodeId) -> String {
        self.nodes[id.0]
            .children
            .iter()
            .filter_map(|c| match &self.nodes[c.0].kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        let text_id = self.push(NodeKind::Text(text.to_string()));
        self.nodes[text_id.0].parent = Some(id);
        self.nodes[id.0].children.push(text_id);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.child_elements(id)
            .filter(move |c| self.name(*c) == Some(name))
    }

    pub fn first_child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// Pre-order list of the element subtree rooted at `id`, root first.
    /// The list is a snapshot: later mutations do not affect it.
    pub fn descendants_and_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.is_element(current) {
                continue;
            }
            out.push(current);
            for child in self.nodes[current.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Whether the node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Remove a node from its parent. The node and its subtree stay in the
    /// arena and can be re-attached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Copy the subtree rooted at `id` into fresh arena slots. The copy is
    /// not attached anywhere.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.0].kind.clone();
        let copy = self.push(kind);
        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Create an unattached element.
    pub fn create_element<K, V>(
        &mut self,
        name: &str,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> NodeId
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.push(NodeKind::Element {
            name: name.to_string(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        })
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let indent = " ".repeat(depth);
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Text(text) => writeln!(f, "{}{}", indent, escape_text(text)),
            NodeKind::Comment(text) => writeln!(f, "{}<!--{}-->", indent, text),
            NodeKind::Element { name, attributes } => {
                write!(f, "{}<{}", indent, name)?;
                for (key, value) in attributes {
                    write!(f, " {}=\"{}\"", key, escape_attribute(value))?;
                }
                if node.children.is_empty() {
                    return writeln!(f, "/>");
                }
                // Pure text content stays on one line.
                if node
                    .children
                    .iter()
                    .all(|c| matches!(self.nodes[c.0].kind, NodeKind::Text(_)))
                {
                    return writeln!(f, ">{}</{}>", escape_text(&self.text(id)), name);
                }
                writeln!(f, ">")?;
                for child in &node.children {
                    self.write_node(f, *child, depth + 1)?;
                }
                writeln!(f, "{}</{}>", indent, name)
            }
        }
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prolog.is_empty() {
            writeln!(f, "{}", self.prolog)?;
        }
        self.write_node(f, self.root, 0)
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Whitespace other than spaces is written as character references so
/// attribute-value normalization does not fold it on reload.
fn escape_attribute(s: &str) -> String {
    escape_text(s)
        .replace('"', "&quot;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE eagle SYSTEM "eagle.dtd">
<eagle version="7.7.0">
  <drawing>
    <!-- plain section -->
    <plain>
      <wire x1="0" y1="0" x2="10" y2="0" width="0" layer="20"/>
      <text x="1" y="2" size="1.27" layer="25">R&amp;D</text>
    </plain>
  </drawing>
</eagle>
"#;

    fn parse() -> XmlDocument {
        XmlDocument::parse(SAMPLE).unwrap()
    }

    #[test]
    fn test_parse_keeps_structure() {
        let doc = parse();
        assert_eq!(doc.name(doc.root()), Some("eagle"));
        assert_eq!(doc.attribute(doc.root(), "version"), Some("7.7.0"));

        let drawing = doc.first_child_named(doc.root(), "drawing").unwrap();
        let plain = doc.first_child_named(drawing, "plain").unwrap();
        let items: Vec<_> = doc.child_elements(plain).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(doc.name(items[0]), Some("wire"));
        assert_eq!(doc.text(items[1]), "R&D");
    }

    #[test]
    fn test_prolog_is_kept() {
        let doc = parse();
        assert!(doc.prolog().contains("<?xml"));
        assert!(doc.prolog().contains("<!DOCTYPE eagle"));
    }

    #[test]
    fn test_attribute_order_preserved_on_update() {
        let mut doc = parse();
        let drawing = doc.first_child_named(doc.root(), "drawing").unwrap();
        let plain = doc.first_child_named(drawing, "plain").unwrap();
        let wire = doc.first_child_named(plain, "wire").unwrap();

        doc.set_attribute(wire, "x1", "5");
        let keys: Vec<_> = doc.attributes(wire).map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["x1", "y1", "x2", "y2", "width", "layer"]);
        assert_eq!(doc.attribute(wire, "x1"), Some("5"));

        assert_eq!(doc.remove_attribute(wire, "width").as_deref(), Some("0"));
        assert!(!doc.has_attribute(wire, "width"));
    }

    #[test]
    fn test_detach_and_append() {
        let mut doc = parse();
        let drawing = doc.first_child_named(doc.root(), "drawing").unwrap();
        let plain = doc.first_child_named(drawing, "plain").unwrap();
        let wire = doc.first_child_named(plain, "wire").unwrap();

        doc.detach(wire);
        assert!(!doc.is_attached(wire));
        assert_eq!(doc.child_elements(plain).count(), 1);

        doc.append_child(drawing, wire);
        assert!(doc.is_attached(wire));
        assert_eq!(doc.parent(wire), Some(drawing));
        assert_eq!(doc.child_elements(plain).count(), 1);
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let mut doc = parse();
        let drawing = doc.first_child_named(doc.root(), "drawing").unwrap();
        let plain = doc.first_child_named(drawing, "plain").unwrap();

        let copy = doc.deep_clone(plain);
        assert!(!doc.is_attached(copy));
        let copy_wire = doc.first_child_named(copy, "wire").unwrap();
        doc.set_attribute(copy_wire, "layer", "46");

        let wire = doc.first_child_named(plain, "wire").unwrap();
        assert_eq!(doc.attribute(wire, "layer"), Some("20"));
        assert_eq!(doc.attribute(copy_wire, "layer"), Some("46"));
    }

    #[test]
    fn test_descendants_and_self_preorder() {
        let doc = parse();
        let all = doc.descendants_and_self(doc.root());
        let names: Vec<_> = all.iter().filter_map(|id| doc.name(*id)).collect();
        assert_eq!(names, vec!["eagle", "drawing", "plain", "wire", "text"]);
    }

    #[test]
    fn test_set_text_replaces_children() {
        let mut doc = parse();
        let root = doc.root();
        let node = doc.create_element("attribute", [("name", "NAME")]);
        doc.append_child(root, node);
        doc.set_text(node, "R1");
        assert_eq!(doc.text(node), "R1");
        doc.set_text(node, "R2");
        assert_eq!(doc.text(node), "R2");
        assert_eq!(doc.children(node).len(), 1);
    }

    #[test]
    fn test_display_round_trip() {
        let doc = parse();
        let written = doc.to_string();
        assert!(written.starts_with("<?xml"));
        assert!(written.contains("<!-- plain section -->"));
        assert!(written.contains(r#"<text x="1" y="2" size="1.27" layer="25">R&amp;D</text>"#));

        let reparsed = XmlDocument::parse(&written).unwrap();
        assert_eq!(
            reparsed.descendants_and_self(reparsed.root()).len(),
            doc.descendants_and_self(doc.root()).len()
        );
    }

    #[test]
    fn test_escape_attribute_quotes() {
        let mut doc = XmlDocument::new("root");
        let root = doc.root();
        doc.set_attribute(root, "label", "a \"b\" <c>");
        let written = doc.to_string();
        assert!(written.contains(r#"label="a &quot;b&quot; &lt;c&gt;""#));
    }

    #[test]
    fn test_attribute_whitespace_survives_reload() {
        let doc = XmlDocument::parse("<a v=\"x&#10;y&#13;&#9;z\"/>").unwrap();
        assert_eq!(doc.attribute(doc.root(), "v"), Some("x\ny\r\tz"));

        let written = doc.to_string();
        assert!(written.contains(r#"v="x&#10;y&#13;&#9;z""#));
        let reparsed = XmlDocument::parse(&written).unwrap();
        assert_eq!(reparsed.attribute(reparsed.root(), "v"), Some("x\ny\r\tz"));
    }

    #[test]
    fn test_parse_error() {
        assert!(XmlDocument::parse("<eagle><drawing></eagle>").is_err());
    }
}
