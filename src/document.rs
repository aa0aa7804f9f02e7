//! Generic document model for parsed configuration files
//!
//! A [`Document`] is an immutable tree of [`Node`]s. Locations inside it are
//! addressed with dotted paths such as `services.surfshark.cap_add[0]`, and
//! rules select locations with [`PathPattern`]s, which add `*` (any single key
//! or index) and `**` (any number of levels, including zero).
//!
//! ```
//! use conform::document::{Document, Node, PathPattern};
//!
//! let doc = Document::new(Node::mapping([(
//!     "services",
//!     Node::mapping([("web", Node::mapping([("restart", Node::from("always"))]))]),
//! )]));
//!
//! let pattern: PathPattern = "services.*.restart".parse().unwrap();
//! let paths: Vec<String> = doc.match_all(&pattern).map(|(p, _)| p.to_string()).collect();
//! assert_eq!(paths, vec!["services.web.restart"]);
//! ```

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a path or path pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path segment at offset {0}")]
    EmptySegment(usize),

    #[error("unterminated bracket starting at offset {0}")]
    Unterminated(usize),

    #[error("invalid index '{index}' at offset {offset}")]
    InvalidIndex { index: String, offset: usize },

    #[error("unexpected character '{ch}' at offset {offset}")]
    Unexpected { ch: char, offset: usize },

    #[error("wildcard not allowed in a concrete path: {0}")]
    Wildcard(String),
}

/// A scalar leaf value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// String content, if this is a string scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, if this is an integer or float scalar
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Equality that treats integers and floats as the same numeric domain.
    ///
    /// Strings never equal numbers: `"3.8"` and `3.8` are different values.
    pub fn loosely_equals(&self, other: &Scalar) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Scalar::Null => NodeKind::Null,
            Scalar::Bool(_) => NodeKind::Bool,
            Scalar::Int(_) | Scalar::Float(_) => NodeKind::Number,
            Scalar::String(_) => NodeKind::String,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Kind of a node, used by kind checks and type-mismatch errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Mapping,
    Sequence,
    String,
    Number,
    Bool,
    Null,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Mapping => write!(f, "mapping"),
            NodeKind::Sequence => write!(f, "sequence"),
            NodeKind::String => write!(f, "string"),
            NodeKind::Number => write!(f, "number"),
            NodeKind::Bool => write!(f, "bool"),
            NodeKind::Null => write!(f, "null"),
        }
    }
}

/// Insertion-ordered string-keyed map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; an existing key keeps its position and gets the new value
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

/// A node in the document tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

impl Node {
    /// Build a mapping node from key/value pairs, keeping their order
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Mapping(entries.into_iter().collect())
    }

    /// Build a sequence node
    pub fn sequence<I: IntoIterator<Item = Node>>(items: I) -> Self {
        Node::Sequence(items.into_iter().collect())
    }

    pub fn null() -> Self {
        Node::Scalar(Scalar::Null)
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Scalar(s) => s.kind(),
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Mapping(_) => NodeKind::Mapping,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.as_scalar().is_some_and(Scalar::is_null)
    }

    /// Direct child addressed by one segment
    pub fn child(&self, segment: &Segment) -> Option<&Node> {
        match (self, segment) {
            (Node::Mapping(m), Segment::Key(k)) => m.get(k),
            (Node::Sequence(items), Segment::Index(i)) => items.get(*i),
            _ => None,
        }
    }

    /// All direct children in document order
    pub fn children(&self) -> Vec<(Segment, &Node)> {
        match self {
            Node::Scalar(_) => Vec::new(),
            Node::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, n)| (Segment::Index(i), n))
                .collect(),
            Node::Mapping(m) => m
                .iter()
                .map(|(k, n)| (Segment::Key(k.to_string()), n))
                .collect(),
        }
    }

    /// Resolve a path relative to this node
    pub fn get(&self, path: &NodePath) -> Option<&Node> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Short human-readable rendering used in messages
    pub fn describe(&self) -> String {
        match self {
            Node::Scalar(s) => s.to_string(),
            Node::Sequence(items) => format!("sequence of {} item(s)", items.len()),
            Node::Mapping(m) => format!("mapping of {} key(s)", m.len()),
        }
    }
}

impl From<Scalar> for Node {
    fn from(s: Scalar) -> Self {
        Node::Scalar(s)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Scalar(s.into())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Scalar(s.into())
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Scalar(i.into())
    }
}

impl From<f64> for Node {
    fn from(x: f64) -> Self {
        Node::Scalar(x.into())
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Scalar(b.into())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Scalar(s) => s.serialize(serializer),
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Mapping(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// One step of a concrete path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A concrete location inside a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath {
    segments: Vec<Segment>,
}

impl NodePath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path extended by one segment
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn key(&self, key: &str) -> Self {
        self.child(Segment::Key(key.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    /// Concatenate a relative path
    pub fn join(&self, other: &NodePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) => write_key(f, k, i == 0)?,
                Segment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = parse_segments(s)?
            .into_iter()
            .map(|raw| match raw {
                RawSegment::Key(k) => Ok(Segment::Key(k)),
                RawSegment::Index(i) => Ok(Segment::Index(i)),
                RawSegment::Star | RawSegment::DoubleStar => Err(PathError::Wildcard(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }
}

impl TryFrom<String> for NodePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.to_string()
    }
}

/// One step of a path pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    Key(String),
    Index(usize),
    /// `*`: any single mapping key or sequence index
    AnyChild,
    /// `**`: zero or more levels
    AnyDepth,
}

/// A path that may contain wildcards
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    pub fn has_wildcards(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, PatternSegment::AnyChild | PatternSegment::AnyDepth))
    }

    /// The concrete path this pattern denotes, if it has no wildcards
    pub fn as_path(&self) -> Option<NodePath> {
        self.segments
            .iter()
            .map(|s| match s {
                PatternSegment::Key(k) => Some(Segment::Key(k.clone())),
                PatternSegment::Index(i) => Some(Segment::Index(*i)),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(NodePath::new)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PatternSegment::Key(k) => write_key(f, k, i == 0)?,
                PatternSegment::Index(idx) => write!(f, "[{}]", idx)?,
                PatternSegment::AnyChild if i == 0 => write!(f, "*")?,
                PatternSegment::AnyChild => write!(f, ".*")?,
                PatternSegment::AnyDepth if i == 0 => write!(f, "**")?,
                PatternSegment::AnyDepth => write!(f, ".**")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PathPattern {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments: Vec<PatternSegment> = Vec::new();
        for raw in parse_segments(s)? {
            let segment = match raw {
                RawSegment::Key(k) => PatternSegment::Key(k),
                RawSegment::Index(i) => PatternSegment::Index(i),
                RawSegment::Star => PatternSegment::AnyChild,
                RawSegment::DoubleStar => PatternSegment::AnyDepth,
            };
            // `**.**` matches exactly what `**` matches
            if segment == PatternSegment::AnyDepth
                && segments.last() == Some(&PatternSegment::AnyDepth)
            {
                continue;
            }
            segments.push(segment);
        }
        Ok(Self { segments })
    }
}

impl TryFrom<String> for PathPattern {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.to_string()
    }
}

impl From<&NodePath> for PathPattern {
    fn from(path: &NodePath) -> Self {
        Self {
            segments: path
                .segments()
                .iter()
                .map(|s| match s {
                    Segment::Key(k) => PatternSegment::Key(k.clone()),
                    Segment::Index(i) => PatternSegment::Index(*i),
                })
                .collect(),
        }
    }
}

fn needs_quoting(key: &str) -> bool {
    key.is_empty()
        || key == "$"
        || key
            .chars()
            .any(|c| matches!(c, '.' | '[' | ']' | '*' | '"' | '\\'))
}

fn write_key(f: &mut fmt::Formatter<'_>, key: &str, first: bool) -> fmt::Result {
    if needs_quoting(key) {
        let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
        write!(f, "[\"{}\"]", escaped)
    } else if first {
        write!(f, "{}", key)
    } else {
        write!(f, ".{}", key)
    }
}

#[derive(Debug, PartialEq)]
enum RawSegment {
    Key(String),
    Index(usize),
    Star,
    DoubleStar,
}

/// Shared tokenizer for paths and patterns.
///
/// Grammar: `$` | segment ( `.` key | `[` index `]` | `["` quoted `"]` | `[*]` )*
fn parse_segments(text: &str) -> Result<Vec<RawSegment>, PathError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();

    if chars.is_empty() || text == "$" {
        return Ok(out);
    }

    let mut i = 0;
    if chars[0] == '$' {
        match chars.get(1) {
            Some('.') => i = 2,
            Some('[') => i = 1,
            _ => {}
        }
    }

    // true at the start and right after a '.'
    let mut expect_segment = true;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if expect_segment {
                    return Err(PathError::EmptySegment(i));
                }
                expect_segment = true;
                i += 1;
            }
            '[' => {
                let start = i;
                i += 1;
                match chars.get(i) {
                    Some('"') => {
                        i += 1;
                        let mut key = String::new();
                        loop {
                            match chars.get(i) {
                                None => return Err(PathError::Unterminated(start)),
                                Some('\\') => {
                                    let escaped =
                                        chars.get(i + 1).ok_or(PathError::Unterminated(start))?;
                                    key.push(*escaped);
                                    i += 2;
                                }
                                Some('"') => {
                                    i += 1;
                                    break;
                                }
                                Some(c) => {
                                    key.push(*c);
                                    i += 1;
                                }
                            }
                        }
                        if chars.get(i) != Some(&']') {
                            return Err(PathError::Unterminated(start));
                        }
                        out.push(RawSegment::Key(key));
                    }
                    Some('*') => {
                        i += 1;
                        if chars.get(i) != Some(&']') {
                            return Err(PathError::Unterminated(start));
                        }
                        out.push(RawSegment::Star);
                    }
                    _ => {
                        let digits_start = i;
                        while i < chars.len() && chars[i] != ']' {
                            i += 1;
                        }
                        if i >= chars.len() {
                            return Err(PathError::Unterminated(start));
                        }
                        let index: String = chars[digits_start..i].iter().collect();
                        let parsed = index.trim().parse::<usize>().map_err(|_| {
                            PathError::InvalidIndex {
                                index: index.clone(),
                                offset: digits_start,
                            }
                        })?;
                        out.push(RawSegment::Index(parsed));
                    }
                }
                // consume ']'
                i += 1;
                expect_segment = false;
            }
            c => {
                if !expect_segment {
                    return Err(PathError::Unexpected { ch: c, offset: i });
                }
                let start = i;
                while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    if chars[i] == ']' {
                        return Err(PathError::Unexpected { ch: ']', offset: i });
                    }
                    i += 1;
                }
                let key: String = chars[start..i].iter().collect();
                out.push(match key.as_str() {
                    "*" => RawSegment::Star,
                    "**" => RawSegment::DoubleStar,
                    _ => RawSegment::Key(key),
                });
                expect_segment = false;
            }
        }
    }

    if expect_segment {
        return Err(PathError::EmptySegment(chars.len()));
    }

    Ok(out)
}

#[derive(Debug, Clone)]
struct Frame<'a> {
    node: &'a Node,
    path: NodePath,
    next: usize,
}

/// Lazy iterator over the locations matched by a pattern.
///
/// Walks the tree depth-first with an explicit stack, yielding matches in
/// document order. Each call to [`Document::match_all`] starts a new walk.
#[derive(Debug, Clone)]
pub struct Matches<'a> {
    pattern: Vec<PatternSegment>,
    stack: Vec<Frame<'a>>,
    seen: Option<HashSet<NodePath>>,
}

impl<'a> Matches<'a> {
    fn new(root: &'a Node, pattern: &PathPattern) -> Self {
        let seen = pattern
            .segments
            .contains(&PatternSegment::AnyDepth)
            .then(HashSet::new);
        Self {
            pattern: pattern.segments.clone(),
            stack: vec![Frame {
                node: root,
                path: NodePath::root(),
                next: 0,
            }],
            seen,
        }
    }

    fn push_children(&mut self, node: &'a Node, path: &NodePath, next: usize) {
        for (segment, child) in node.children().into_iter().rev() {
            self.stack.push(Frame {
                node: child,
                path: path.child(segment),
                next,
            });
        }
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = (NodePath, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Frame { node, path, next }) = self.stack.pop() {
            let Some(segment) = self.pattern.get(next).cloned() else {
                if let Some(seen) = &mut self.seen {
                    if !seen.insert(path.clone()) {
                        continue;
                    }
                }
                return Some((path, node));
            };

            match segment {
                PatternSegment::Key(key) => {
                    if let Some(child) = node.as_mapping().and_then(|m| m.get(&key)) {
                        self.stack.push(Frame {
                            node: child,
                            path: path.key(&key),
                            next: next + 1,
                        });
                    }
                }
                PatternSegment::Index(index) => {
                    if let Some(child) = node.as_sequence().and_then(|s| s.get(index)) {
                        self.stack.push(Frame {
                            node: child,
                            path: path.index(index),
                            next: next + 1,
                        });
                    }
                }
                PatternSegment::AnyChild => self.push_children(node, &path, next + 1),
                PatternSegment::AnyDepth => {
                    // Descend first so the zero-level match pops before the children
                    self.push_children(node, &path, next);
                    self.stack.push(Frame {
                        node,
                        path,
                        next: next + 1,
                    });
                }
            }
        }
        None
    }
}

/// A parsed configuration document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
    source: Option<PathBuf>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self { root, source: None }
    }

    /// Record the file this document was loaded from
    pub fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Node at `path`, or `None` when nothing is there
    pub fn get(&self, path: &NodePath) -> Option<&Node> {
        self.root.get(path)
    }

    /// Parse `path` and look it up
    pub fn lookup(&self, path: &str) -> Result<Option<&Node>, PathError> {
        let path: NodePath = path.parse()?;
        Ok(self.get(&path))
    }

    pub fn contains(&self, path: &NodePath) -> bool {
        self.get(path).is_some()
    }

    /// All locations matching `pattern`, in document order
    pub fn match_all(&self, pattern: &PathPattern) -> Matches<'_> {
        Matches::new(&self.root, pattern)
    }
}

impl From<Node> for Document {
    fn from(root: Node) -> Self {
        Self::new(root)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose() -> Document {
        Document::new(Node::mapping([
            ("version", Node::from("3.8")),
            (
                "services",
                Node::mapping([
                    (
                        "surfshark",
                        Node::mapping([
                            ("restart", Node::from("unless-stopped")),
                            (
                                "cap_add",
                                Node::sequence([Node::from("NET_ADMIN"), Node::from("SYS_MODULE")]),
                            ),
                        ]),
                    ),
                    (
                        "web",
                        Node::mapping([
                            ("restart", Node::from("always")),
                            ("depends_on", Node::sequence([Node::from("surfshark")])),
                        ]),
                    ),
                ]),
            ),
        ]))
    }

    fn paths(doc: &Document, pattern: &str) -> Vec<String> {
        let pattern: PathPattern = pattern.parse().unwrap();
        doc.match_all(&pattern).map(|(p, _)| p.to_string()).collect()
    }

    #[test]
    fn test_parse_and_display_path() {
        let path: NodePath = "services.surfshark.cap_add[0]".parse().unwrap();
        assert_eq!(path.segments().len(), 4);
        assert_eq!(path.segments()[3], Segment::Index(0));
        assert_eq!(path.to_string(), "services.surfshark.cap_add[0]");
    }

    #[test]
    fn test_quoted_keys_roundtrip_through_display() {
        let path = NodePath::root().key("labels").key("traefik.enable");
        assert_eq!(path.to_string(), "labels[\"traefik.enable\"]");
        let reparsed: NodePath = path.to_string().parse().unwrap();
        assert_eq!(reparsed, path);
    }

    #[test]
    fn test_root_path() {
        assert!("$".parse::<NodePath>().unwrap().is_root());
        assert!("".parse::<NodePath>().unwrap().is_root());
        assert_eq!(NodePath::root().to_string(), "$");
        assert_eq!("$.services".parse::<NodePath>().unwrap().to_string(), "services");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("a..b".parse::<NodePath>(), Err(PathError::EmptySegment(2)));
        assert_eq!("a.".parse::<NodePath>(), Err(PathError::EmptySegment(2)));
        assert!(matches!(
            "a[0".parse::<NodePath>(),
            Err(PathError::Unterminated(1))
        ));
        assert!(matches!(
            "a[x]".parse::<NodePath>(),
            Err(PathError::InvalidIndex { .. })
        ));
        assert!(matches!(
            "a[0]b".parse::<NodePath>(),
            Err(PathError::Unexpected { ch: 'b', .. })
        ));
        assert!(matches!(
            "services.*".parse::<NodePath>(),
            Err(PathError::Wildcard(_))
        ));
    }

    #[test]
    fn test_get_and_not_found() {
        let doc = compose();
        assert_eq!(
            doc.lookup("services.surfshark.cap_add[0]").unwrap(),
            Some(&Node::from("NET_ADMIN"))
        );
        assert_eq!(doc.lookup("services.db").unwrap(), None);
        assert_eq!(doc.lookup("services.web.restart[0]").unwrap(), None);
        assert_eq!(doc.lookup("version.nested").unwrap(), None);
    }

    #[test]
    fn test_match_single_wildcard() {
        let doc = compose();
        assert_eq!(
            paths(&doc, "services.*.restart"),
            vec!["services.surfshark.restart", "services.web.restart"]
        );
        assert_eq!(
            paths(&doc, "services.surfshark.cap_add[*]"),
            vec!["services.surfshark.cap_add[0]", "services.surfshark.cap_add[1]"]
        );
    }

    #[test]
    fn test_match_concrete_and_missing() {
        let doc = compose();
        assert_eq!(paths(&doc, "services.web"), vec!["services.web"]);
        assert!(paths(&doc, "services.db").is_empty());
        assert_eq!(paths(&doc, "$"), vec!["$"]);
    }

    #[test]
    fn test_match_any_depth() {
        let doc = compose();
        assert_eq!(
            paths(&doc, "**.restart"),
            vec!["services.surfshark.restart", "services.web.restart"]
        );
        // `**` also matches zero levels
        assert_eq!(paths(&doc, "services.**.depends_on"), vec!["services.web.depends_on"]);
        assert_eq!(paths(&doc, "version.**"), vec!["version"]);
    }

    #[test]
    fn test_any_depth_does_not_duplicate() {
        let doc = compose();
        let all = paths(&doc, "**.*.**");
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn test_consecutive_any_depth_collapse() {
        let pattern: PathPattern = "a.**.**.b".parse().unwrap();
        assert_eq!(pattern.to_string(), "a.**.b");
    }

    #[test]
    fn test_match_all_is_restartable() {
        let doc = compose();
        let pattern: PathPattern = "services.*".parse().unwrap();
        let mut first = doc.match_all(&pattern);
        assert!(first.next().is_some());

        // A new walk starts from the beginning regardless of the first one
        let second: Vec<_> = doc.match_all(&pattern).collect();
        assert_eq!(second.len(), 2);
        assert_eq!(first.count(), 1);
    }

    #[test]
    fn test_pattern_as_path() {
        let pattern: PathPattern = "services.db".parse().unwrap();
        assert_eq!(pattern.as_path().unwrap().to_string(), "services.db");
        let pattern: PathPattern = "services.*".parse().unwrap();
        assert!(pattern.has_wildcards());
        assert!(pattern.as_path().is_none());
    }

    #[test]
    fn test_scalar_loose_equality() {
        assert!(Scalar::Int(1).loosely_equals(&Scalar::Float(1.0)));
        assert!(!Scalar::from("3.8").loosely_equals(&Scalar::Float(3.8)));
        assert!(Scalar::from("a").loosely_equals(&Scalar::from("a")));
    }

    #[test]
    fn test_mapping_keeps_order_on_overwrite() {
        let mut m = Mapping::new();
        m.insert("b", Node::from(1_i64));
        m.insert("a", Node::from(2_i64));
        m.insert("b", Node::from(3_i64));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(m.get("b"), Some(&Node::from(3_i64)));
    }

    #[test]
    fn test_node_serializes_to_plain_structure() {
        let doc = compose();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["services"]["web"]["restart"], "always");
        assert_eq!(value["services"]["surfshark"]["cap_add"][1], "SYS_MODULE");
    }
}
