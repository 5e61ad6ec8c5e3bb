//! Document Mapper
//!
//! Parses YAML text into plain values plus a position-annotated mirror tree.
//!
//! # Core Concepts
//!
//! - **Per-document isolation**: text is split on `---` lines and every
//!   document is scanned on its own, so a syntax error only discards the
//!   document that contains it.
//! - **Incomplete nodes**: a dangling `key:` or `-` is kept in the mirror tree
//!   but omitted from the plain value, so a half-typed entry never reads as a
//!   deletion.
//!
//! # Example
//!
//! ```rust,ignore
//! use formsync_document::map;
//!
//! let mapped = map("kind: Policy\nmetadata:\n  name: a\n");
//! let node = mapped.snapshot.node_at(&"Policy.0.metadata.name".parse()?).unwrap();
//! assert_eq!(node.line(), 3);
//! ```

use crate::annotated::{AnnotatedBody, MappingNode, NodeMeta, SourcePos, SourceRange};
use crate::path::NodePath;
use crate::scalar::resolve_plain;
use crate::snapshot::Snapshot;
use indexmap::IndexMap;
use saphyr_parser::{Event, Marker, Parser, ScalarStyle, Span};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// YAML scan failure, fatal only to the document that contains it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    /// Where the scanner stopped
    pub position: SourceRange,
    /// Scanner message
    pub message: String,
}

/// One successfully parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Plain value with incomplete nodes omitted
    pub value: Value,
    /// Mirror tree; paths are relative to the document root
    pub mirror: MappingNode,
}

/// Result of mapping a YAML text
#[derive(Debug, Clone)]
pub struct MappedText {
    /// Mapped documents
    pub snapshot: Snapshot,
    /// Syntax errors of the documents that were skipped
    pub syntax_errors: Vec<SyntaxError>,
}

impl MappedText {
    /// Whether any document failed to parse
    #[inline]
    #[must_use]
    pub fn has_syntax_errors(&self) -> bool {
        !self.syntax_errors.is_empty()
    }
}

/// Map YAML text into a snapshot
#[must_use]
pub fn map(text: &str) -> MappedText {
    let (documents, syntax_errors) = parse_documents(text);
    tracing::debug!(
        documents = documents.len(),
        errors = syntax_errors.len(),
        "mapped yaml text"
    );
    MappedText {
        snapshot: Snapshot::from_documents(documents),
        syntax_errors,
    }
}

/// Parse every document of a multi-document text
#[must_use]
pub fn parse_documents(text: &str) -> (Vec<ParsedDocument>, Vec<SyntaxError>) {
    let mut documents = Vec::new();
    let mut errors = Vec::new();
    for (offset, chunk) in split_documents(text) {
        match parse_chunk(chunk, offset) {
            Ok(mut docs) => documents.append(&mut docs),
            Err(err) => errors.push(err),
        }
    }
    (documents, errors)
}

/// Split text into `(line offset, chunk)` pairs at `---` separator lines
fn split_documents(text: &str) -> Vec<(usize, &str)> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut start_line = 0;
    let mut byte = 0;
    for (line_no, line) in text.split_inclusive('\n').enumerate() {
        let is_separator = line
            .strip_prefix("---")
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
        if is_separator && byte > start {
            chunks.push((start_line, &text[start..byte]));
            start = byte;
            start_line = line_no;
        } else if is_separator {
            start_line = line_no;
        }
        byte += line.len();
    }
    if start < text.len() {
        chunks.push((start_line, &text[start..]));
    }
    chunks
}

fn parse_chunk(chunk: &str, line_offset: usize) -> Result<Vec<ParsedDocument>, SyntaxError> {
    let mut events = Vec::new();
    for result in Parser::new_from_str(chunk) {
        match result {
            Ok(pair) => events.push(pair),
            Err(err) => {
                let marker = err.marker();
                let pos = SourcePos::new(marker.line() + line_offset, marker.col() + 1);
                return Err(SyntaxError {
                    position: SourceRange::new(pos, pos),
                    message: err.info().to_string(),
                });
            }
        }
    }
    EventTree::new(chunk, events, line_offset).documents()
}

/// A built subtree before its parent attaches key metadata
#[derive(Debug, Clone)]
struct Built {
    /// `None` when the node is syntactically incomplete
    value: Option<Value>,
    body: AnnotatedBody<NodeMeta>,
    range: Option<SourceRange>,
    last_line: usize,
}

struct EventTree<'a> {
    lines: Vec<&'a str>,
    events: Vec<(Event<'a>, Span)>,
    pos: usize,
    line_offset: usize,
    anchors: HashMap<usize, Built>,
}

impl<'a> EventTree<'a> {
    fn new(source: &'a str, events: Vec<(Event<'a>, Span)>, line_offset: usize) -> Self {
        Self {
            lines: source.lines().collect(),
            events,
            pos: 0,
            line_offset,
            anchors: HashMap::new(),
        }
    }

    fn unexpected(&self, what: &str) -> SyntaxError {
        let pos = self
            .events
            .get(self.pos)
            .map_or(SourcePos::new(1 + self.line_offset, 1), |(_, span)| self.at(&span.start));
        SyntaxError {
            position: SourceRange::new(pos, pos),
            message: format!("unexpected {what}"),
        }
    }

    fn at(&self, marker: &Marker) -> SourcePos {
        SourcePos::new(marker.line() + self.line_offset, marker.col() + 1)
    }

    fn documents(mut self) -> Result<Vec<ParsedDocument>, SyntaxError> {
        let mut out = Vec::new();
        while self.pos < self.events.len() {
            if !matches!(self.events[self.pos].0, Event::DocumentStart(_)) {
                self.pos += 1;
                continue;
            }
            self.pos += 1;
            let root = self.node(&NodePath::root())?;
            if let Some((Event::DocumentEnd, _)) = self.events.get(self.pos) {
                self.pos += 1;
            }
            let Some(value) = root.value else { continue };
            if value.is_null() {
                continue;
            }
            let line = root.range.map_or(root.last_line, |r| r.start.line);
            let meta = NodeMeta {
                key: String::new(),
                path: NodePath::root(),
                line,
                length: span_length(line, root.last_line),
                key_range: None,
                value_range: root.range,
                secret: false,
                incomplete: false,
            };
            out.push(ParsedDocument {
                value,
                mirror: MappingNode::new(meta, root.body),
            });
        }
        Ok(out)
    }

    fn node(&mut self, path: &NodePath) -> Result<Built, SyntaxError> {
        let Some((event, span)) = self.events.get(self.pos).cloned() else {
            return Err(self.unexpected("end of input"));
        };
        self.pos += 1;
        let (built, anchor) = match event {
            Event::Scalar(text, style, anchor, _) => (self.scalar(&text, style, &span), anchor),
            Event::SequenceStart(anchor, _) => (self.sequence(&span, path)?, anchor),
            Event::MappingStart(anchor, _) => (self.mapping(&span, path)?, anchor),
            Event::Alias(id) => {
                let mut built = self
                    .anchors
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| self.unexpected("alias to unknown anchor"))?;
                repath_body(&mut built.body, path);
                let start = self.at(&span.start);
                built.range = Some(SourceRange::new(start, self.at(&span.end)));
                built.last_line = start.line;
                return Ok(built);
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("event"));
            }
        };
        if anchor > 0 {
            self.anchors.insert(anchor, built.clone());
        }
        Ok(built)
    }

    fn scalar(&self, text: &str, style: ScalarStyle, span: &Span) -> Built {
        let start = self.at(&span.start);
        if style == ScalarStyle::Plain && text.is_empty() && span.start.index() == span.end.index() {
            // Implicit empty: the scanner places it at the next token
            return Built {
                value: None,
                body: AnnotatedBody::Scalar(Value::Null),
                range: None,
                last_line: 0,
            };
        }
        let value = match style {
            ScalarStyle::Plain => resolve_plain(text),
            _ => Value::String(text.to_string()),
        };
        let last_line = self.last_content_line(&span.start, &span.end);
        let end = if last_line < self.at(&span.end).line {
            let line_text = self.local_line(last_line);
            SourcePos::new(last_line, line_text.chars().count() + 1)
        } else {
            self.at(&span.end)
        };
        Built {
            value: Some(value.clone()),
            body: AnnotatedBody::Scalar(value),
            range: Some(SourceRange::new(start, end)),
            last_line,
        }
    }

    fn sequence(&mut self, open: &Span, path: &NodePath) -> Result<Built, SyntaxError> {
        let flow = self.is_flow(open, '[');
        let mut items = Vec::new();
        let mut dangling = Vec::new();
        let mut values = Vec::new();
        let open_line = self.at(&open.start).line;
        let mut last_line = open_line;
        let mut end = self.at(&open.end);
        loop {
            match self.events.get(self.pos) {
                Some((Event::SequenceEnd, span)) => {
                    if flow {
                        end = self.at(&span.end);
                        last_line = end.line;
                    }
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
                None => return Err(self.unexpected("end of sequence")),
            }
            // mirror indices follow the value, which splices out dangling items
            let index = values.len().to_string();
            let child_path = path.child(index.clone());
            let child = self.node(&child_path)?;
            let line = child.range.map_or_else(
                || if items.is_empty() && dangling.is_empty() { open_line } else { last_line + 1 },
                |r| r.start.line,
            );
            if let Some(range) = child.range {
                end = range.end;
            }
            let child_last = child.last_line.max(line);
            last_line = last_line.max(child_last);
            let meta = NodeMeta {
                key: index,
                path: child_path,
                line,
                length: span_length(line, child_last),
                key_range: None,
                value_range: child.range,
                secret: false,
                incomplete: child.value.is_none(),
            };
            match child.value {
                Some(v) => {
                    values.push(v);
                    items.push(MappingNode::new(meta, child.body));
                }
                None => dangling.push(MappingNode::new(meta, child.body)),
            }
        }
        // dangling items stay in the mirror, keyed past the last value
        for mut node in dangling {
            let index = items.len().to_string();
            node.ann.path = path.child(index.clone());
            node.ann.key = index;
            items.push(node);
        }
        Ok(Built {
            value: Some(Value::Array(values)),
            body: AnnotatedBody::Sequence(items),
            range: Some(SourceRange::new(self.at(&open.start), end)),
            last_line,
        })
    }

    fn mapping(&mut self, open: &Span, path: &NodePath) -> Result<Built, SyntaxError> {
        let flow = self.is_flow(open, '{');
        let mut entries = IndexMap::new();
        let mut values = serde_json::Map::new();
        let mut last_line = self.at(&open.start).line;
        let mut end = self.at(&open.end);
        loop {
            match self.events.get(self.pos) {
                Some((Event::MappingEnd, span)) => {
                    if flow {
                        end = self.at(&span.end);
                        last_line = end.line;
                    }
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
                None => return Err(self.unexpected("end of mapping")),
            }
            let key_span = self.events[self.pos].1;
            let key_built = self.node(&path.child("?"))?;
            let key = key_text(key_built.value.as_ref());
            let key_range = key_built
                .range
                .unwrap_or_else(|| SourceRange::new(self.at(&key_span.start), self.at(&key_span.end)));
            let child_path = path.child(key.clone());
            let child = self.node(&child_path)?;
            let line = key_range.start.line;
            let child_last = child.last_line.max(line);
            end = child.range.map_or(key_range.end, |r| r.end);
            last_line = last_line.max(child_last);
            if let Some(v) = &child.value {
                values.insert(key.clone(), v.clone());
            } else {
                values.remove(&key);
            }
            entries.insert(
                key.clone(),
                MappingNode::new(
                    NodeMeta {
                        key,
                        path: child_path,
                        line,
                        length: span_length(line, child_last),
                        key_range: Some(key_range),
                        value_range: child.range,
                        secret: false,
                        incomplete: child.value.is_none(),
                    },
                    child.body,
                ),
            );
        }
        Ok(Built {
            value: Some(Value::Object(values)),
            body: AnnotatedBody::Mapping(entries),
            range: Some(SourceRange::new(self.at(&open.start), end)),
            last_line,
        })
    }

    /// Source line by absolute line number
    fn local_line(&self, line: usize) -> &str {
        line.checked_sub(self.line_offset + 1)
            .and_then(|i| self.lines.get(i))
            .copied()
            .unwrap_or("")
    }

    fn is_flow(&self, open: &Span, bracket: char) -> bool {
        let line = self.local_line(open.start.line() + self.line_offset);
        line.chars().nth(open.start.col()) == Some(bracket)
    }

    /// Last line holding content, skipping trailing blank and comment lines
    fn last_content_line(&self, start: &Marker, end: &Marker) -> usize {
        let first = start.line() + self.line_offset;
        let mut last = end.line() + self.line_offset;
        if end.col() == 0 && last > first {
            last -= 1;
        }
        while last > first {
            let text = self.local_line(last).trim();
            if text.is_empty() || text.starts_with('#') {
                last -= 1;
            } else {
                break;
            }
        }
        last
    }
}

/// Number of lines between the first and last content line, inclusive
#[inline]
fn span_length(first: usize, last: usize) -> usize {
    (last + 1).saturating_sub(first).max(1)
}

fn key_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Recompute mirror paths below `base`
pub(crate) fn repath_body(body: &mut AnnotatedBody<NodeMeta>, base: &NodePath) {
    match body {
        AnnotatedBody::Mapping(entries) => {
            for (key, child) in entries.iter_mut() {
                child.ann.path = base.child(key.clone());
                let path = child.ann.path.clone();
                repath_body(&mut child.body, &path);
            }
        }
        AnnotatedBody::Sequence(items) => {
            for (i, child) in items.iter_mut().enumerate() {
                child.ann.path = base.child(i.to_string());
                let path = child.ann.path.clone();
                repath_body(&mut child.body, &path);
            }
        }
        AnnotatedBody::Scalar(_) => {}
    }
}
