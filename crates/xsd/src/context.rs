//! Parent lookup over a schema tree.

use crate::tree::{Node, NodeId, SchemaTree};
use std::collections::HashMap;

/// Parent links for every node reachable from the tree root, built in one
/// pre-order pass.
#[derive(Debug)]
pub struct ContextIndex<'t> {
    tree: &'t SchemaTree,
    xsd_ns: String,
    parents: HashMap<NodeId, NodeId>,
}

impl<'t> ContextIndex<'t> {
    pub fn build(tree: &'t SchemaTree, xsd_ns: impl Into<String>) -> Self {
        let mut parents = HashMap::with_capacity(tree.len());
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            for child in node.children() {
                parents.insert(child.id(), node.id());
                stack.push(child);
            }
        }

        Self {
            tree,
            xsd_ns: xsd_ns.into(),
            parents,
        }
    }

    pub fn parent_of(&self, node: Node<'_>) -> Option<Node<'t>> {
        self.parents.get(&node.id()).map(|&id| self.tree.node(id))
    }

    /// True iff the node sits directly under a `choice` group.
    pub fn is_choice_member(&self, node: Node<'_>) -> bool {
        self.choice_parent(node).is_some()
    }

    /// Names of the elements declared under the same `choice` as `node`, in
    /// declaration order. Empty when `node` is not a choice member.
    pub fn choice_siblings(&self, node: Node<'_>) -> Vec<String> {
        match self.choice_parent(node) {
            Some(choice) => choice
                .child_elements(&self.xsd_ns)
                .filter_map(|sibling| sibling.name())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    fn choice_parent(&self, node: Node<'_>) -> Option<Node<'t>> {
        self.parent_of(node)
            .filter(|parent| parent.is(&self.xsd_ns, "choice"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::XSD_NAMESPACE;

    const CHOICE: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="emit">
    <xs:complexType>
      <xs:sequence>
        <xs:choice>
          <xs:element name="CNPJ" type="TCnpj"/>
          <xs:element name="CPF" type="TCpf"/>
        </xs:choice>
        <xs:element name="xNome" type="xs:string"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    fn find<'t>(tree: &'t SchemaTree, name: &str) -> Node<'t> {
        tree.root()
            .descendants()
            .into_iter()
            .find(|n| n.name() == Some(name))
            .unwrap()
    }

    #[test]
    fn test_parent_of() {
        let tree = SchemaTree::parse(CHOICE).unwrap();
        let index = ContextIndex::build(&tree, XSD_NAMESPACE);

        assert!(index.parent_of(tree.root()).is_none());
        let emit = find(&tree, "emit");
        assert_eq!(index.parent_of(emit), Some(tree.root()));
    }

    #[test]
    fn test_choice_membership() {
        let tree = SchemaTree::parse(CHOICE).unwrap();
        let index = ContextIndex::build(&tree, XSD_NAMESPACE);

        let cnpj = find(&tree, "CNPJ");
        let name = find(&tree, "xNome");

        assert!(index.is_choice_member(cnpj));
        assert!(!index.is_choice_member(name));
        assert_eq!(index.choice_siblings(cnpj), vec!["CNPJ", "CPF"]);
        assert!(index.choice_siblings(name).is_empty());
    }
}
