//! Table-vs-column decision for element declarations.

use crate::tree::Node;

const GROUPS: &[&str] = &["sequence", "choice", "all"];
const ATTRIBUTE_DECLS: &[&str] = &["attribute", "attributeGroup"];

/// Default structural policy.
///
/// An element becomes a table when its own definition contains a group
/// construct. Attribute-bearing leaf elements (inline attribute declarations
/// without a group, or a `simpleContent` wrapper) stay columns even when they
/// repeat. Any other inline complex type is a table, and a plain element
/// becomes a table only when it may repeat.
pub fn is_table(element: Node<'_>, xsd_ns: &str) -> bool {
    if !element.find_scoped(xsd_ns, GROUPS).is_empty() {
        return true;
    }

    if has_simple_content(element, xsd_ns)
        || !element.find_scoped(xsd_ns, ATTRIBUTE_DECLS).is_empty()
    {
        return false;
    }

    if !element.find_scoped(xsd_ns, &["complexType"]).is_empty() {
        return true;
    }

    is_repeatable(element)
}

/// No inline complex type or group: the element carries a single value.
pub fn is_scalar(element: Node<'_>, xsd_ns: &str) -> bool {
    element
        .find_scoped(xsd_ns, &["complexType", "sequence", "choice", "all"])
        .is_empty()
}

fn has_simple_content(element: Node<'_>, xsd_ns: &str) -> bool {
    !element.find_scoped(xsd_ns, &["simpleContent"]).is_empty()
}

/// `maxOccurs` is `unbounded` or a number greater than one.
pub fn is_repeatable(element: Node<'_>) -> bool {
    match element.attribute("maxOccurs") {
        Some("unbounded") => true,
        Some(value) => value.trim().parse::<u64>().map(|n| n > 1).unwrap_or(false),
        None => false,
    }
}

/// `minOccurs` is anything but `0`.
pub fn is_required(element: Node<'_>) -> bool {
    element.attribute("minOccurs").map(str::trim) != Some("0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{SchemaTree, XSD_NAMESPACE};

    fn classify(xsd: &str, name: &str) -> bool {
        let text = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            xsd
        );
        let tree = SchemaTree::parse(text).unwrap();
        let node = tree
            .root()
            .descendants()
            .into_iter()
            .find(|n| n.name() == Some(name))
            .unwrap();
        is_table(node, XSD_NAMESPACE)
    }

    #[test]
    fn test_group_makes_table() {
        let xsd = r#"<xs:element name="ide"><xs:complexType><xs:sequence>
            <xs:element name="cUF" type="xs:string"/>
        </xs:sequence></xs:complexType></xs:element>"#;
        assert!(classify(xsd, "ide"));
        assert!(!classify(xsd, "cUF"));
    }

    #[test]
    fn test_simple_content_with_attributes_is_column() {
        let xsd = r#"<xs:element name="qty" maxOccurs="unbounded"><xs:complexType>
            <xs:simpleContent><xs:extension base="xs:decimal">
                <xs:attribute name="unit" type="xs:string"/>
            </xs:extension></xs:simpleContent>
        </xs:complexType></xs:element>"#;
        assert!(!classify(xsd, "qty"));
    }

    #[test]
    fn test_attribute_only_element_is_column() {
        let xsd = r#"<xs:element name="moeda" maxOccurs="unbounded"><xs:complexType>
            <xs:attribute name="codigo" type="xs:string"/>
            <xs:attributeGroup ref="comum"/>
        </xs:complexType></xs:element>"#;
        assert!(!classify(xsd, "moeda"));
    }

    #[test]
    fn test_attributes_with_group_is_table() {
        let xsd = r#"<xs:element name="livro"><xs:complexType>
            <xs:sequence><xs:element name="titulo" type="xs:string"/></xs:sequence>
            <xs:attribute name="isbn" type="xs:string"/>
        </xs:complexType></xs:element>"#;
        assert!(classify(xsd, "livro"));
    }

    #[test]
    fn test_scalar_shape() {
        let tree = SchemaTree::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="tag" type="xs:string" maxOccurs="unbounded"/>
                <xs:element name="marker"><xs:complexType/></xs:element>
            </xs:schema>"#,
        )
        .unwrap();
        let scalar: Vec<bool> = tree
            .root()
            .children()
            .map(|n| is_scalar(n, XSD_NAMESPACE))
            .collect();
        assert_eq!(scalar, vec![true, false]);
    }

    #[test]
    fn test_empty_complex_type_is_table() {
        let xsd = r#"<xs:element name="marker"><xs:complexType/></xs:element>"#;
        assert!(classify(xsd, "marker"));
    }

    #[test]
    fn test_repeatable_scalar_is_table() {
        assert!(classify(
            r#"<xs:element name="obs" type="xs:string" maxOccurs="10"/>"#,
            "obs"
        ));
        assert!(classify(
            r#"<xs:element name="obs" type="xs:string" maxOccurs="unbounded"/>"#,
            "obs"
        ));
        assert!(!classify(
            r#"<xs:element name="obs" type="xs:string" maxOccurs="1"/>"#,
            "obs"
        ));
    }

    #[test]
    fn test_requiredness() {
        let tree = SchemaTree::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="a" minOccurs="0"/>
                <xs:element name="b" minOccurs="1"/>
                <xs:element name="c"/>
            </xs:schema>"#,
        )
        .unwrap();
        let required: Vec<bool> = tree.root().children().map(is_required).collect();
        assert_eq!(required, vec![false, true, true]);
    }
}
