// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Line classifier for Mermaid-ish sources.
//!
//! This is not a Mermaid grammar. Each line is classified into a [`SourceLine`] with just enough
//! structure (node tokens, links, labels and their byte spans) for the editing operations and the
//! formatter to work on typed data. Anything the classifier does not understand is `Other` and is
//! carried through untouched.

use std::ops::Range;

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::ident::is_ident_char;
use crate::model::refs::{escape_label, unescape_label};
use crate::model::ShapeKind;

/// Diagram family, decided by the declaration keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Flowchart,
    State,
    Sequence,
    Other,
}

impl Dialect {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "flowchart" | "graph" => Some(Self::Flowchart),
            "stateDiagram" | "stateDiagram-v2" => Some(Self::State),
            "sequenceDiagram" => Some(Self::Sequence),
            "classDiagram" | "classDiagram-v2" | "erDiagram" | "gantt" | "pie" | "journey"
            | "mindmap" | "timeline" | "gitGraph" | "quadrantChart" | "requirementDiagram"
            | "C4Context" | "C4Container" | "C4Component" | "block-beta" | "xychart-beta"
            | "sankey-beta" | "wireframe" => Some(Self::Other),
            _ => None,
        }
    }

    /// Dialect of the first declaration line, if any.
    pub fn detect(text: &str) -> Option<Self> {
        classify(text).iter().find_map(|line| match line {
            SourceLine::Declaration { dialect, .. } => Some(*dialect),
            _ => None,
        })
    }
}

/// Label and kind carried by inline or standalone shape syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeShape {
    pub kind: ShapeKind,
    pub label: String,
}

/// One node occurrence on a line: `A`, `A[Label]`, `A(["Label"])`, `[*]`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeToken {
    pub id: SmolStr,
    /// Byte range of the whole token (identifier plus shape) within the raw line.
    pub span: Range<usize>,
    /// Byte range of just the identifier within the raw line.
    pub id_span: Range<usize>,
    pub shape: Option<NodeShape>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSyntax {
    /// `-->|label|`
    Pipe,
    /// `-- label -->`
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabel {
    pub text: String,
    pub syntax: LabelSyntax,
}

/// The operator between two node tokens, plus its label if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Arrow operator as it should be rendered, e.g. `-->`, `==>`, `-.->`.
    pub op: String,
    pub label: Option<EdgeLabel>,
    /// Byte range from the operator start through the end of its label syntax.
    pub span: Range<usize>,
    pub reversed: bool,
}

/// A `: label` suffix as used by state transitions and sequence messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingLabel {
    pub text: String,
    /// Byte range starting at the whitespace before `:` through the end of the label.
    pub span: Range<usize>,
}

/// A connection line, possibly chained (`A --> B --> C`).
///
/// `links[i]` joins `nodes[i]` and `nodes[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub nodes: SmallVec<[NodeToken; 2]>,
    pub links: SmallVec<[Link; 1]>,
    pub trailing: Option<TrailingLabel>,
}

impl Connection {
    /// `(link index, source id, target id)` for every edge on the line, in line order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, &str, &str)> + '_ {
        self.links.iter().enumerate().map(|(idx, link)| {
            let (left, right) = (self.nodes[idx].id.as_str(), self.nodes[idx + 1].id.as_str());
            if link.reversed {
                (idx, right, left)
            } else {
                (idx, left, right)
            }
        })
    }

    pub fn link_between(&self, source: &str, target: &str) -> Option<usize> {
        self.edges().find(|(_, from, to)| *from == source && *to == target).map(|(idx, _, _)| idx)
    }

    /// Index into `nodes` of the source/target token of link `idx`.
    pub fn endpoint_indices(&self, idx: usize) -> (usize, usize) {
        if self.links[idx].reversed {
            (idx + 1, idx)
        } else {
            (idx, idx + 1)
        }
    }

    /// Label of link `idx`; pipe/inline syntax wins over a trailing `: label`.
    pub fn label(&self, idx: usize) -> Option<&str> {
        if let Some(label) = &self.links[idx].label {
            return Some(label.text.as_str());
        }
        if self.links.len() == 1 {
            return self.trailing.as_ref().map(|t| t.text.as_str());
        }
        None
    }

    /// Renders the connection with bare identifiers and pipe labels.
    pub fn render_bare(&self) -> String {
        let mut out = String::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            if idx > 0 {
                let link = &self.links[idx - 1];
                out.push(' ');
                out.push_str(&link.op);
                if let Some(label) = &link.label {
                    out.push('|');
                    out.push_str(&label.text);
                    out.push('|');
                }
                out.push(' ');
            }
            out.push_str(&node.id);
        }
        if let Some(trailing) = &self.trailing {
            out.push_str(" : ");
            out.push_str(&trailing.text);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLine {
    Blank,
    Declaration { keyword: String, dialect: Dialect },
    Comment,
    NodeDef(NodeToken),
    Connection(Connection),
    /// `style <id> ...`
    StyleDecl { target: String },
    SubgraphStart { id: Option<String> },
    BlockEnd,
    Other,
}

impl SourceLine {
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Every node token on the line.
    pub fn node_tokens(&self) -> &[NodeToken] {
        match self {
            Self::NodeDef(token) => std::slice::from_ref(token),
            Self::Connection(connection) => &connection.nodes,
            _ => &[],
        }
    }
}

const OTHER_KEYWORDS: &[&str] = &[
    "classDef",
    "class",
    "click",
    "linkStyle",
    "direction",
    "participant",
    "actor",
    "note",
    "Note",
    "state",
    "accTitle",
    "accDescr",
    "title",
    "autonumber",
    "loop",
    "alt",
    "else",
    "opt",
    "par",
    "and",
    "rect",
    "critical",
    "break",
    "activate",
    "deactivate",
    "link",
    "links",
    "box",
    "create",
    "destroy",
];

/// Classifies every line of `text` (`text.lines()` order).
pub fn classify(text: &str) -> Vec<SourceLine> {
    let mut out = Vec::new();
    let mut saw_declaration = false;
    let mut in_front_matter = false;

    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if idx == 0 && trimmed == "---" {
            in_front_matter = true;
            out.push(SourceLine::Other);
            continue;
        }
        if in_front_matter {
            if trimmed == "---" {
                in_front_matter = false;
            }
            out.push(SourceLine::Other);
            continue;
        }

        if !saw_declaration {
            if let Some(line) = classify_declaration(trimmed) {
                saw_declaration = true;
                out.push(line);
                continue;
            }
        }

        out.push(classify_line(raw));
    }

    out
}

fn classify_declaration(trimmed: &str) -> Option<SourceLine> {
    let keyword = trimmed.trim_end_matches(';').split_whitespace().next()?;
    let dialect = Dialect::from_keyword(keyword)?;
    Some(SourceLine::Declaration { keyword: keyword.to_owned(), dialect })
}

/// Classifies a single body line (never a declaration).
pub fn classify_line(raw: &str) -> SourceLine {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return SourceLine::Blank;
    }
    if trimmed.starts_with("%%") {
        return SourceLine::Comment;
    }

    let mut words = trimmed.split_whitespace();
    let first = words.next().unwrap_or_default();
    match first {
        "style" => {
            let target = words.next().unwrap_or_default().to_owned();
            return SourceLine::StyleDecl { target };
        }
        "subgraph" => {
            let id = words
                .next()
                .map(|word| word.chars().take_while(|c| is_ident_char(*c)).collect::<String>())
                .filter(|id| !id.is_empty());
            return SourceLine::SubgraphStart { id };
        }
        "end" if trimmed == "end" => return SourceLine::BlockEnd,
        _ if OTHER_KEYWORDS.contains(&first) => return SourceLine::Other,
        _ => {}
    }

    let start = raw.len() - raw.trim_start().len();
    let body_end = start + trimmed.trim_end_matches(';').trim_end().len();
    let body = start..body_end;

    if let Some(connection) = parse_connection(raw, body.clone()) {
        return SourceLine::Connection(connection);
    }
    if let Some(token) = parse_node_token(raw, body) {
        return SourceLine::NodeDef(token);
    }
    SourceLine::Other
}

fn is_op_start_char(ch: char) -> bool {
    matches!(ch, '<' | '-' | '=' | '.' | '~')
}

fn is_op_char(ch: char) -> bool {
    matches!(ch, '<' | '>' | '-' | '=' | '.' | '~' | 'o' | 'x')
}

fn is_probable_edge_operator(op: &str) -> bool {
    op.chars().filter(|ch| matches!(ch, '-' | '=' | '.' | '~')).count() >= 2
}

/// Finds the next edge operator in `line[range]` that sits outside brackets and quotes.
fn find_edge_operator(line: &str, range: Range<usize>) -> Option<Range<usize>> {
    let segment = &line[range.clone()];
    let mut closers: Vec<char> = Vec::new();
    let mut in_quote = false;
    let mut chars = segment.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if in_quote {
            in_quote = ch != '"';
            continue;
        }
        if ch == '"' {
            in_quote = true;
            continue;
        }
        if closers.last() == Some(&ch) {
            closers.pop();
            continue;
        }
        match ch {
            '[' => closers.push(']'),
            '(' => closers.push(')'),
            '{' => closers.push('}'),
            _ => {}
        }
        if !closers.is_empty() || !is_op_start_char(ch) {
            continue;
        }

        let mut end = idx + ch.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !is_op_char(next) {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }
        // `-->ok` is an arrow to `ok`, not a circle-headed arrow to `k`.
        let mut op = &segment[idx..end];
        let followed_by_ident = segment[end..].chars().next().is_some_and(is_ident_char);
        if followed_by_ident && (op.ends_with('o') || op.ends_with('x')) {
            op = &op[..op.len() - 1];
        }
        if is_probable_edge_operator(op) {
            let start = range.start + idx;
            return Some(start..start + op.len());
        }
    }

    None
}

/// Finds a `:` in `line[range]` outside brackets and quotes.
fn find_trailing_colon(line: &str, range: Range<usize>) -> Option<usize> {
    let mut closers: Vec<char> = Vec::new();
    let mut in_quote = false;
    for (idx, ch) in line[range.clone()].char_indices() {
        if in_quote {
            in_quote = ch != '"';
            continue;
        }
        match ch {
            '"' => in_quote = true,
            _ if closers.last() == Some(&ch) => {
                closers.pop();
            }
            '[' => closers.push(']'),
            '(' => closers.push(')'),
            '{' => closers.push('}'),
            ':' if closers.is_empty() => return Some(range.start + idx),
            _ => {}
        }
    }
    None
}

fn trim_range(line: &str, range: Range<usize>) -> Range<usize> {
    let segment = &line[range.clone()];
    let start = range.start + (segment.len() - segment.trim_start().len());
    let end = range.start + segment.trim_end().len();
    start..end.max(start)
}

fn parse_connection(line: &str, body: Range<usize>) -> Option<Connection> {
    let first_op = find_edge_operator(line, body.clone())?;
    let lhs = parse_node_token(line, body.start..first_op.start)?;

    let mut nodes: SmallVec<[NodeToken; 2]> = SmallVec::new();
    let mut links: SmallVec<[Link; 1]> = SmallVec::new();
    let mut trailing = None;
    nodes.push(lhs);

    let mut op = first_op;
    loop {
        let op_text = &line[op.clone()];
        let mut link_end = op.end;
        let mut rendered_op = op_text.to_owned();
        let mut label = None;

        // Inline label syntax: `-- text -->`, `== text ==>`, `-. text .->`.
        if matches!(op_text, "--" | "==" | "-.") {
            if let Some(second) = find_edge_operator(line, op.end..body.end) {
                let text = line[op.end..second.start].trim();
                if !text.is_empty() {
                    label = Some(EdgeLabel { text: text.to_owned(), syntax: LabelSyntax::Inline });
                    rendered_op = if op_text == "-." {
                        "-.->".to_owned()
                    } else {
                        line[second.clone()].to_owned()
                    };
                    link_end = second.end;
                }
            }
        }

        // Both syntaxes on one link: the pipe label wins.
        let after_op = trim_range(line, link_end..body.end);
        if line[after_op.clone()].starts_with('|') {
            let (text, close) = parse_pipe_label(line, after_op.start + 1..body.end)?;
            label = Some(EdgeLabel { text, syntax: LabelSyntax::Pipe });
            link_end = close + 1;
        }

        let reversed = rendered_op.starts_with('<') && !rendered_op.ends_with('>');
        if reversed {
            rendered_op = rendered_op.trim_start_matches('<').to_owned() + ">";
        }
        links.push(Link { op: rendered_op, label, span: op.start..link_end, reversed });

        let rest = link_end..body.end;
        let colon = find_trailing_colon(line, rest.clone());
        match find_edge_operator(line, rest.start..colon.unwrap_or(body.end)) {
            Some(next_op) => {
                nodes.push(parse_node_token(line, rest.start..next_op.start)?);
                op = next_op;
            }
            None => {
                let rhs_token = parse_node_token(line, rest.start..colon.unwrap_or(body.end))?;
                if let Some(colon) = colon {
                    trailing = Some(TrailingLabel {
                        text: line[colon + 1..body.end].trim().to_owned(),
                        span: rhs_token.span.end..body.end,
                    });
                }
                nodes.push(rhs_token);
                break;
            }
        }
    }

    Some(Connection { nodes, links, trailing })
}

/// Text of a pipe label starting at `range.start`, plus the byte index of its closing `|`.
///
/// `|"a|b"|` is a quoted label and may contain `|`.
fn parse_pipe_label(line: &str, range: Range<usize>) -> Option<(String, usize)> {
    let inner = trim_range(line, range.clone());
    if line[inner.clone()].starts_with('"') {
        let quote_end = line[inner.start + 1..range.end].find('"').map(|at| inner.start + 1 + at);
        if let Some(quote_end) = quote_end {
            let after = trim_range(line, quote_end + 1..range.end);
            if line[after.clone()].starts_with('|') {
                let text = unescape_label(&line[inner.start + 1..quote_end]);
                return Some((text, after.start));
            }
        }
    }
    let close = line[range.clone()].find('|')? + range.start;
    Some((line[range.start..close].trim().to_owned(), close))
}

/// Renders `label` in pipe syntax, quoting it when it would not read back unchanged.
pub fn pipe_label(label: &str) -> String {
    if label.contains('|') || label.starts_with('"') {
        format!("|\"{}\"|", escape_label(label))
    } else {
        format!("|{label}|")
    }
}

const SHAPE_DELIMITERS: &[(&str, &str, ShapeKind)] = &[
    ("([", "])", ShapeKind::Terminal),
    ("((", "))", ShapeKind::State),
    ("[[", "]]", ShapeKind::Action),
    ("[(", ")]", ShapeKind::Action),
    ("[/", "/]", ShapeKind::Action),
    ("[\\", "\\]", ShapeKind::Action),
    ("{{", "}}", ShapeKind::Decision),
    ("[", "]", ShapeKind::Action),
    ("(", ")", ShapeKind::Terminal),
    ("{", "}", ShapeKind::Decision),
    (">", "]", ShapeKind::Action),
];

/// Parses `line[range]` (surrounding whitespace allowed) as exactly one node token.
pub(crate) fn parse_node_token(line: &str, range: Range<usize>) -> Option<NodeToken> {
    let span = trim_range(line, range);
    let token = &line[span.clone()];
    if token.is_empty() {
        return None;
    }
    if token == "[*]" {
        return Some(NodeToken {
            id: SmolStr::new(token),
            id_span: span.clone(),
            span,
            shape: None,
        });
    }

    let id_len = token.find(|c: char| !is_ident_char(c)).unwrap_or(token.len());
    if id_len == 0 {
        return None;
    }
    let id = &token[..id_len];
    let id_span = span.start..span.start + id_len;
    let rest = &token[id_len..];
    if rest.is_empty() {
        return Some(NodeToken { id: SmolStr::new(id), span, id_span, shape: None });
    }

    let (open, close, kind) = SHAPE_DELIMITERS.iter().find(|(open, close, _)| {
        let fits = rest.len() >= open.len() + close.len();
        fits && rest.starts_with(open) && rest.ends_with(close)
    })?;
    let inner = rest[open.len()..rest.len() - close.len()].trim();
    let unquoted = inner
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(inner);

    Some(NodeToken {
        id: SmolStr::new(id),
        span,
        id_span,
        shape: Some(NodeShape { kind: *kind, label: unescape_label(unquoted.trim()) }),
    })
}

/// Leading whitespace of `line`.
pub fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// The indentation used by body lines, defaulting to four spaces.
pub fn body_indent(text: &str) -> String {
    let lines = classify(text);
    text.lines()
        .zip(lines.iter())
        .find(|(raw, line)| {
            !matches!(line, SourceLine::Blank | SourceLine::Declaration { .. })
                && !indent_of(raw).is_empty()
        })
        .map(|(raw, _)| indent_of(raw).to_owned())
        .unwrap_or_else(|| "    ".to_owned())
}
