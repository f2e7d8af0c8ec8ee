//! Minimal in-memory page: an arena of element and text nodes.

use std::ops::Range;

use super::{Marker, NodeId, PageText};
use crate::annotations::{Position, SelectionContext, SurroundingText};
use crate::error::WrapError;

/// Elements whose text is never wrapped.
const UNWRAPPABLE: &[&str] = &["script", "style", "textarea", "noscript", "title"];

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document with a `<body>` root.
    pub fn new() -> Self {
        let body = Node {
            data: NodeData::Element {
                tag: "body".into(),
                attributes: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![body],
            body: 0,
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push(
            parent,
            NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attributes: Vec::new(),
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeData::Text(text.to_string()))
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(NodeData::Element { attributes, .. }) = self.nodes.get_mut(node).map(|n| &mut n.data) {
            match attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node).map_or(&[][..], |n| n.children.as_slice())
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node].data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Element { .. } => {
                for &child in &self.nodes[node].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[node].parent, move |&p| self.nodes[p].parent)
    }

    /// Highlight markers currently in the page as `(highlight id, wrapped text)`,
    /// in document order.
    pub fn markers(&self) -> Vec<(String, String)> {
        let mut found = Vec::new();
        self.walk(self.body, &mut |doc, id| {
            if doc
                .attribute(id, "class")
                .is_some_and(|c| c.split_whitespace().any(|c| c == Marker::CLASS))
            {
                let highlight_id = doc.attribute(id, Marker::ID_ATTRIBUTE).unwrap_or_default();
                found.push((highlight_id.to_string(), doc.text_content(id)));
            }
        });
        found
    }

    /// Describe a selection that starts in text node `node`: the element
    /// holding it plus the page text on either side. `None` for non-text nodes.
    pub fn selection_context(&self, node: NodeId, position: Option<Position>) -> Option<SelectionContext> {
        let parent = self.nodes.get(node)?.parent?;
        let texts = self.text_nodes();
        let at = texts.iter().position(|&n| n == node)?;

        let before: String = texts[..at].iter().filter_map(|&n| self.text_of(n)).collect();
        let mut after = String::new();
        for &n in &texts[at + 1..] {
            if after.chars().count() >= SurroundingText::MAX_CHARS {
                break;
            }
            after.push_str(self.text_of(n).unwrap_or_default());
        }

        let skip = before.chars().count().saturating_sub(SurroundingText::MAX_CHARS);
        let before: String = before.chars().skip(skip).collect();
        let after: String = after.chars().take(SurroundingText::MAX_CHARS).collect();

        Some(SelectionContext {
            tag_name: self.tag(parent).map(str::to_ascii_uppercase),
            class_name: Some(self.attribute(parent, "class").unwrap_or_default().to_string()),
            id: Some(self.attribute(parent, "id").unwrap_or_default().to_string()),
            position,
            surrounding_text: Some(SurroundingText {
                before: before.trim().to_string(),
                after: after.trim().to_string(),
            }),
        })
    }

    fn walk(&self, node: NodeId, visit: &mut impl FnMut(&Self, NodeId)) {
        visit(self, node);
        for &child in &self.nodes[node].children {
            self.walk(child, visit);
        }
    }
}

impl PageText for Document {
    fn text_nodes(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(self.body, &mut |doc, id| {
            if matches!(doc.nodes[id].data, NodeData::Text(_)) {
                found.push(id);
            }
        });
        found
    }

    fn text_of(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            NodeData::Text(t) => Some(t),
            NodeData::Element { .. } => None,
        }
    }

    fn wrap(&mut self, node: NodeId, range: Range<usize>, marker: &Marker) -> Result<NodeId, WrapError> {
        let text = self.text_of(node).ok_or(WrapError::NotText(node))?;
        let in_bounds = range.start < range.end
            && range.end <= text.len()
            && text.is_char_boundary(range.start)
            && text.is_char_boundary(range.end);
        if !in_bounds {
            return Err(WrapError::OutOfBounds {
                start: range.start,
                end: range.end,
            });
        }
        if let Some(tag) = self
            .ancestors(node)
            .filter_map(|a| self.tag(a))
            .find(|t| UNWRAPPABLE.contains(t))
        {
            return Err(WrapError::Rejected(tag.to_string()));
        }
        let Some(parent) = self.nodes[node].parent else {
            return Err(WrapError::NotText(node));
        };

        let before = text[..range.start].to_string();
        let middle = text[range.clone()].to_string();
        let after = text[range.end..].to_string();

        // The original node keeps the leading text; the span and trailing text
        // are spliced in right after it.
        self.nodes[node].data = NodeData::Text(before);
        let span = self.nodes.len();
        self.nodes.push(Node {
            data: NodeData::Element {
                tag: "span".into(),
                attributes: marker.attributes(),
            },
            parent: Some(parent),
            children: Vec::new(),
        });
        self.push(span, NodeData::Text(middle));

        let mut spliced = vec![span];
        if !after.is_empty() {
            let tail = self.nodes.len();
            self.nodes.push(Node {
                data: NodeData::Text(after),
                parent: Some(parent),
                children: Vec::new(),
            });
            spliced.push(tail);
        }

        let siblings = &mut self.nodes[parent].children;
        let at = siblings.iter().position(|&c| c == node).map_or(siblings.len(), |i| i + 1);
        siblings.splice(at..at, spliced);
        Ok(span)
    }
}
