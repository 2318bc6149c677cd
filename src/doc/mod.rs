// Abstract document tree
// The textual parsing/printing library itself is an external collaborator;
// the core only sees mapping/sequence/scalar nodes with source byte ranges
// for diagnostics, and produces such nodes on the way out.

use std::fmt;
use thiserror::Error;

/// Byte range of a node in the source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}..{}", self.start, self.end)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocError {
    #[error("Expected {expected} at {span}")]
    WrongType { expected: &'static str, span: Span },

    #[error("{message} at {span}")]
    Invalid { message: String, span: Span },

    #[error("Unknown key {key:?} at {span}")]
    UnknownKey { key: String, span: Span },

    #[error("Duplicate {what} {value:?} at {span}")]
    Duplicate {
        what: &'static str,
        value: String,
        span: Span,
    },

    #[error("{feature} is not supported on this model ({span})")]
    Unsupported { feature: String, span: Span },
}

impl DocError {
    pub fn invalid(message: impl Into<String>, span: Span) -> Self {
        DocError::Invalid {
            message: message.into(),
            span,
        }
    }

    /// The offending byte range, for editor highlighting
    pub fn span(&self) -> Span {
        match self {
            DocError::WrongType { span, .. }
            | DocError::Invalid { span, .. }
            | DocError::UnknownKey { span, .. }
            | DocError::Duplicate { span, .. }
            | DocError::Unsupported { span, .. } => *span,
        }
    }
}

pub type Result<T> = std::result::Result<T, DocError>;

/// Scalar value with its source type preserved
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// One entry of a mapping node
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: String,
    pub key_span: Span,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Mapping(Vec<MapEntry>),
    Sequence(Vec<Node>),
    Scalar(Scalar),
}

/// A document tree node with source position and output layout hints
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    span: Span,
    /// Emit a blank line before this node in the output document
    pub blank_line_before: bool,
    /// Emit this node in inline flow style
    pub flow: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            span: Span::default(),
            blank_line_before: false,
            flow: false,
        }
    }

    // --- constructors -----------------------------------------------------

    pub fn str(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Scalar(Scalar::Str(value.into())))
    }

    pub fn int(value: i64) -> Self {
        Self::new(NodeKind::Scalar(Scalar::Int(value)))
    }

    pub fn float(value: f64) -> Self {
        Self::new(NodeKind::Scalar(Scalar::Float(value)))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(NodeKind::Scalar(Scalar::Bool(value)))
    }

    pub fn null() -> Self {
        Self::new(NodeKind::Scalar(Scalar::Null))
    }

    pub fn mapping(entries: Vec<(&str, Node)>) -> Self {
        Self::new(NodeKind::Mapping(
            entries
                .into_iter()
                .map(|(key, value)| MapEntry {
                    key: key.to_string(),
                    key_span: Span::default(),
                    value,
                })
                .collect(),
        ))
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Self::new(NodeKind::Sequence(items))
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_blank_line(mut self) -> Self {
        self.blank_line_before = true;
        self
    }

    pub fn with_flow(mut self) -> Self {
        self.flow = true;
        self
    }

    /// Append an entry to a mapping node (no-op span)
    pub fn push_entry(&mut self, key: &str, value: Node) {
        if let NodeKind::Mapping(entries) = &mut self.kind {
            entries.push(MapEntry {
                key: key.to_string(),
                key_span: Span::default(),
                value,
            });
        }
    }

    // --- accessors --------------------------------------------------------

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, NodeKind::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(_))
    }

    pub fn as_mapping(&self) -> Result<&[MapEntry]> {
        match &self.kind {
            NodeKind::Mapping(entries) => Ok(entries),
            _ => Err(DocError::WrongType {
                expected: "mapping",
                span: self.span,
            }),
        }
    }

    pub fn as_sequence(&self) -> Result<&[Node]> {
        match &self.kind {
            NodeKind::Sequence(items) => Ok(items),
            _ => Err(DocError::WrongType {
                expected: "sequence",
                span: self.span,
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match &self.kind {
            NodeKind::Scalar(Scalar::Str(s)) => Ok(s),
            _ => Err(DocError::WrongType {
                expected: "string",
                span: self.span,
            }),
        }
    }

    /// String form of any scalar, e.g. for ids written without quotes
    pub fn scalar_text(&self) -> Result<String> {
        match &self.kind {
            NodeKind::Scalar(Scalar::Str(s)) => Ok(s.clone()),
            NodeKind::Scalar(Scalar::Int(i)) => Ok(i.to_string()),
            NodeKind::Scalar(Scalar::Float(f)) => Ok(f.to_string()),
            NodeKind::Scalar(Scalar::Bool(b)) => Ok(b.to_string()),
            _ => Err(DocError::WrongType {
                expected: "scalar",
                span: self.span,
            }),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match &self.kind {
            NodeKind::Scalar(Scalar::Int(i)) => Ok(*i),
            _ => Err(DocError::WrongType {
                expected: "integer",
                span: self.span,
            }),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match &self.kind {
            NodeKind::Scalar(Scalar::Float(f)) => Ok(*f),
            NodeKind::Scalar(Scalar::Int(i)) => Ok(*i as f64),
            _ => Err(DocError::WrongType {
                expected: "number",
                span: self.span,
            }),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match &self.kind {
            NodeKind::Scalar(Scalar::Bool(b)) => Ok(*b),
            _ => Err(DocError::WrongType {
                expected: "boolean",
                span: self.span,
            }),
        }
    }

    /// Look up a mapping entry by key
    pub fn get(&self, key: &str) -> Option<&Node> {
        match &self.kind {
            NodeKind::Mapping(entries) => entries
                .iter()
                .find(|entry| entry.key == key)
                .map(|entry| &entry.value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_typed_access() {
        let node = Node::int(42).with_span(Span::new(10, 12));
        assert_eq!(node.as_int().unwrap(), 42);
        assert_eq!(node.as_float().unwrap(), 42.0);

        let err = node.as_str().unwrap_err();
        assert_eq!(err.span(), Span::new(10, 12));
    }

    #[test]
    fn test_mapping_lookup() {
        let node = Node::mapping(vec![
            ("name", Node::str("HOME")),
            ("enabled", Node::bool(true)),
        ]);
        assert!(node.is_mapping());
        assert_eq!(node.get("name").unwrap().as_str().unwrap(), "HOME");
        assert_eq!(node.get("enabled").unwrap().as_bool().unwrap(), true);
        assert!(node.get("missing").is_none());
    }

    #[test]
    fn test_wrong_type_carries_offending_span() {
        // The reported range must match the token, not the whole document
        let inner = Node::str("oops").with_span(Span::new(120, 126));
        let doc = Node::mapping(vec![("count", inner)]).with_span(Span::new(0, 500));

        let err = doc.get("count").unwrap().as_int().unwrap_err();
        assert_eq!(err.span(), Span::new(120, 126));
    }

    #[test]
    fn test_layout_hints() {
        let node = Node::sequence(vec![Node::int(1), Node::int(2)])
            .with_flow()
            .with_blank_line();
        assert!(node.flow);
        assert!(node.blank_line_before);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Node::int(88).scalar_text().unwrap(), "88");
        assert_eq!(Node::str("88A").scalar_text().unwrap(), "88A");
        assert!(Node::sequence(vec![]).scalar_text().is_err());
    }
}
