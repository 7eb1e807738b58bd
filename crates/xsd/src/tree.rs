//! Owned, labeled schema tree.
//!
//! The parser hands us a borrowed `roxmltree::Document`; the mapping engine
//! needs a tree it can keep around and, for schemas without global elements,
//! extend with synthesized root elements. `SchemaTree` is a small arena of
//! element nodes with namespace-qualified tags, attributes and ordered
//! children. Everything but elements (text, comments, PIs) is dropped.

use crate::Result;
use std::fmt;
use std::path::Path;

/// Default XML Schema namespace.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Index of a node inside its `SchemaTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Namespace-qualified tag name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// Parse Clark notation: `{http://example.com/ns}localName`.
    pub fn from_clark(name: &str) -> Self {
        if let Some(rest) = name.strip_prefix('{') {
            if let Some(end) = rest.find('}') {
                return Self::new(Some(&rest[..end]), &rest[end + 1..]);
            }
        }
        Self::new(None, name)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: QName,
    attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
}

/// A parsed schema document.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    source: String,
}

impl SchemaTree {
    /// Parse schema text into an owned tree.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let source = text.into();
        let (nodes, root) = {
            let doc = roxmltree::Document::parse(&source)?;
            let mut nodes = Vec::new();
            let root = copy_element(doc.root_element(), &mut nodes);
            (nodes, root)
        };

        Ok(Self {
            nodes,
            root,
            source,
        })
    }

    /// Read and parse a schema file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(text)
    }

    pub fn root(&self) -> Node<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { tree: self, id }
    }

    /// The raw document text, used for domain detection.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a detached `element` node named `name` whose only child is
    /// `child`. The child keeps its original parent in the document; the new
    /// node is not reachable from the root.
    pub fn synthesize_element(&mut self, namespace: &str, name: &str, child: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: QName::new(Some(namespace), "element"),
            attributes: vec![("name".to_string(), name.to_string())],
            children: vec![child],
        });
        id
    }
}

fn copy_element(node: roxmltree::Node<'_, '_>, nodes: &mut Vec<NodeData>) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(NodeData {
        tag: QName::new(node.tag_name().namespace(), node.tag_name().name()),
        attributes: node
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect(),
        children: Vec::new(),
    });

    let children: Vec<NodeId> = node
        .children()
        .filter(|child| child.is_element())
        .map(|child| copy_element(child, nodes))
        .collect();
    nodes[id.0].children = children;

    id
}

/// Borrowed handle to a node of a `SchemaTree`.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SchemaTree,
    id: NodeId,
}

impl<'t> Node<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SchemaTree {
        self.tree
    }

    pub fn tag(&self) -> &'t QName {
        &self.data().tag
    }

    pub fn local_name(&self) -> &'t str {
        &self.data().tag.local
    }

    /// True if the node is `{ns}local`.
    pub fn is(&self, ns: &str, local: &str) -> bool {
        let tag = self.tag();
        tag.local == local && tag.namespace.as_deref() == Some(ns)
    }

    /// True if the node is in namespace `ns` and its local name is one of `locals`.
    pub fn is_any(&self, ns: &str, locals: &[&str]) -> bool {
        locals.iter().any(|local| self.is(ns, local))
    }

    pub fn attribute(&self, name: &str) -> Option<&'t str> {
        self.data()
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&'t str, &'t str)> + 't {
        self.data()
            .attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// The `name` attribute.
    pub fn name(&self) -> Option<&'t str> {
        self.attribute("name")
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| Node { tree, id })
    }

    /// Direct children tagged `{ns}element`.
    pub fn child_elements<'a>(&self, ns: &'a str) -> impl Iterator<Item = Node<'t>> + 'a
    where
        't: 'a,
    {
        self.children().filter(move |child| child.is(ns, "element"))
    }

    /// All descendants in pre-order, excluding the node itself.
    pub fn descendants(&self) -> Vec<Node<'t>> {
        let mut out = Vec::new();
        let mut stack: Vec<Node<'t>> = self.children().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children: Vec<Node<'t>> = node.children().collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Pre-order search for descendants whose local name is in `locals`,
    /// restricted to this node's own definition: nested `element`
    /// declarations are never entered.
    pub fn find_scoped(&self, ns: &str, locals: &[&str]) -> Vec<Node<'t>> {
        let mut found = Vec::new();
        self.collect_scoped(ns, locals, &mut found);
        found
    }

    fn collect_scoped(&self, ns: &str, locals: &[&str], found: &mut Vec<Node<'t>>) {
        for child in self.children() {
            if child.is(ns, "element") {
                continue;
            }
            if child.is_any(ns, locals) {
                found.push(child);
            }
            child.collect_scoped(ns, locals, found);
        }
    }

    /// First scoped descendant with the given local name.
    pub fn find_first_scoped(&self, ns: &str, local: &str) -> Option<Node<'t>> {
        self.find_scoped(ns, &[local]).into_iter().next()
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("tag", &self.tag().to_string())
            .field("name", &self.name())
            .finish()
    }
}
