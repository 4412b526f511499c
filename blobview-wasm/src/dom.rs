//! Live browser nodes as seen by the position resolver and the table builder.

use blobview::{CODE_CELL_CLASS, LINE_NUMBER_CLASS, NodeRole, ViewNode, markup};
use wasm_bindgen::JsCast;
use web_sys::{Element, Node};

/// A node of the rendered table in the page.
#[derive(Debug, Clone)]
pub(crate) struct DomNode(pub(crate) Node);

impl DomNode {
    fn element(&self) -> Option<&Element> {
        self.0.dyn_ref::<Element>()
    }

    fn has_class(&self, class: &str) -> bool {
        self.element()
            .is_some_and(|element| element.class_list().contains(class))
    }
}

impl ViewNode for DomNode {
    fn parent(&self) -> Option<Self> {
        self.0.parent_node().map(Self)
    }

    fn previous_sibling(&self) -> Option<Self> {
        self.0.previous_sibling().map(Self)
    }

    fn role(&self) -> NodeRole {
        let Some(element) = self.element() else {
            return NodeRole::Other;
        };
        match element.tag_name().as_str() {
            "TR" => NodeRole::Row,
            "TD" if self.has_class(LINE_NUMBER_CLASS) => NodeRole::LineNumberCell,
            "TD" if self.has_class(CODE_CELL_CLASS) => NodeRole::CodeCell,
            _ => NodeRole::Other,
        }
    }

    fn char_len(&self) -> usize {
        self.0
            .text_content()
            .map_or(0, |text| text.chars().count())
    }

    fn row_line_number(&self) -> Option<usize> {
        let cell = self
            .element()?
            .query_selector(&format!(".{LINE_NUMBER_CLASS}"))
            .ok()
            .flatten()?;
        cell.text_content()?.trim().parse().ok()
    }
}

/// Read highlighted markup out of the children of `root`.
///
/// Text nodes keep their characters and elements keep their class; comments
/// and other node types are dropped.
pub(crate) fn markup_nodes(root: &Node) -> Vec<markup::Node> {
    let children = root.child_nodes();
    (0..children.length())
        .filter_map(|index| children.item(index))
        .filter_map(|child| match child.node_type() {
            Node::TEXT_NODE => Some(markup::Node::text(child.text_content().unwrap_or_default())),
            Node::ELEMENT_NODE => {
                let class = child
                    .dyn_ref::<Element>()
                    .map(Element::class_name)
                    .unwrap_or_default();
                Some(markup::Node::element(class, markup_nodes(&child)))
            }
            _ => None,
        })
        .collect()
}
