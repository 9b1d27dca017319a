use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Maximum allowed element nesting depth.
/// Prevents stack exhaustion from maliciously nested feed documents.
const MAX_DEPTH: usize = 100;

/// Errors raised while building a [`Document`] from feed markup.
///
/// These are the only hard parse failures in the pipeline: a selector
/// that matches nothing is data, but a document that cannot be built
/// at all is an error for the feed being processed.
#[derive(Debug, Error)]
pub enum MarkupError {
    /// The markup is not well-formed XML (mismatched tags, truncated
    /// document, bad entity reference, etc.)
    #[error("XML syntax error: {0}")]
    Syntax(String),

    /// Element nesting exceeds the safety limit.
    #[error("markup nesting depth exceeds maximum of {0} levels")]
    TooDeep(usize),

    /// The document ended while elements were still open.
    #[error("unexpected end of document")]
    UnexpectedEof,

    /// The document contains no root element at all.
    #[error("document has no root element")]
    NoRoot,
}

/// Handle to an element node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// Synthetic document node; parent of the root element.
pub const DOCUMENT: NodeId = NodeId(0);

#[derive(Debug)]
enum XmlChild {
    Text(String),
    Element(NodeId),
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<XmlChild>,
}

/// An immutable element tree built from one feed document.
///
/// Nodes are stored in an arena in document order. Only elements and
/// character data are kept — attributes, comments, and processing
/// instructions are not part of the extraction model (selectors address
/// elements by tag name and read their text, mirroring how the
/// per-source rules are written).
///
/// Entity declarations are never expanded: `quick-xml` resolves only the
/// five XML builtins, so custom entities fail the parse instead of
/// leaking external content.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse feed markup into an element tree.
    ///
    /// Fails only on structurally broken markup; an empty-but-valid
    /// document with a root element parses fine.
    pub fn parse(markup: &str) -> Result<Self, MarkupError> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(true);

        let mut nodes = vec![Node {
            name: String::new(),
            parent: None,
            children: Vec::new(),
        }];
        let mut stack: Vec<NodeId> = vec![DOCUMENT];

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if stack.len() > MAX_DEPTH {
                        return Err(MarkupError::TooDeep(MAX_DEPTH));
                    }
                    let parent = *stack.last().ok_or(MarkupError::UnexpectedEof)?;
                    let id = NodeId(nodes.len());
                    nodes.push(Node {
                        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                        parent: Some(parent),
                        children: Vec::new(),
                    });
                    nodes[parent.0].children.push(XmlChild::Element(id));
                    stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    let parent = *stack.last().ok_or(MarkupError::UnexpectedEof)?;
                    let id = NodeId(nodes.len());
                    nodes.push(Node {
                        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                        parent: Some(parent),
                        children: Vec::new(),
                    });
                    nodes[parent.0].children.push(XmlChild::Element(id));
                }
                Ok(Event::End(_)) => {
                    // quick-xml rejects mismatched end tags before we get here
                    if stack.len() <= 1 {
                        return Err(MarkupError::Syntax("unmatched closing tag".into()));
                    }
                    stack.pop();
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|err| MarkupError::Syntax(err.to_string()))?;
                    if !text.is_empty() {
                        let current = *stack.last().ok_or(MarkupError::UnexpectedEof)?;
                        nodes[current.0].children.push(XmlChild::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    if !text.is_empty() {
                        let current = *stack.last().ok_or(MarkupError::UnexpectedEof)?;
                        nodes[current.0].children.push(XmlChild::Text(text));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(MarkupError::Syntax(e.to_string())),
                _ => {} // declarations, comments, PIs, doctype
            }
        }

        if stack.len() != 1 {
            return Err(MarkupError::UnexpectedEof);
        }

        let doc = Document { nodes };
        if doc.child_elements(DOCUMENT).next().is_none() {
            return Err(MarkupError::NoRoot);
        }
        Ok(doc)
    }

    /// Tag name of an element, as written (namespace prefixes included).
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Parent element, if any. The root element's parent is [`DOCUMENT`].
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Direct child elements of a node, in document order.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().filter_map(|c| match c {
            XmlChild::Element(id) => Some(*id),
            XmlChild::Text(_) => None,
        })
    }

    /// All element descendants of `id` (excluding `id` itself), in
    /// document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.child_elements(id) {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    /// Concatenated character data of a node and all its descendants,
    /// in document order.
    pub fn deep_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.append_text(id, &mut out);
        out
    }

    fn append_text(&self, id: NodeId, out: &mut String) {
        for child in &self.nodes[id.0].children {
            match child {
                XmlChild::Text(t) => out.push_str(t),
                XmlChild::Element(e) => self.append_text(*e, out),
            }
        }
    }
}
