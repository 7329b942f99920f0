// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Per-operation text transforms used by `apply_edit`.
/// Keeps `ops::mod` focused on public op types and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Origin,
    Destination,
}

/// Source text split into lines, remembering whether it ended with a newline.
struct SourceLines {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl SourceLines {
    fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
            trailing_newline: text.is_empty() || text.ends_with('\n'),
        }
    }

    fn into_text(self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }
}

fn replace_span(line: &str, span: Range<usize>, with: &str) -> String {
    let mut out = String::with_capacity(line.len() + with.len());
    out.push_str(&line[..span.start]);
    out.push_str(with);
    out.push_str(&line[span.end..]);
    out
}

/// Where a new standalone definition goes: after the declaration and any comments following it.
fn definition_insert_index(classified: &[SourceLine]) -> usize {
    let Some(decl_idx) =
        classified.iter().position(|line| matches!(line, SourceLine::Declaration { .. }))
    else {
        return 0;
    };
    let mut idx = decl_idx + 1;
    while matches!(classified.get(idx), Some(SourceLine::Comment)) {
        idx += 1;
    }
    idx
}

fn standalone_definition(classified: &[SourceLine], id: &str) -> Option<(usize, Range<usize>)> {
    classified.iter().enumerate().find_map(|(idx, line)| match line {
        SourceLine::NodeDef(token) if token.id == id => Some((idx, token.span.clone())),
        _ => None,
    })
}

/// First token in line order that gives `id` a shape: `(line, span, kind, label)`.
fn first_shape(
    classified: &[SourceLine],
    id: &str,
) -> Option<(usize, Range<usize>, ShapeKind, String)> {
    classified.iter().enumerate().find_map(|(idx, line)| {
        line.node_tokens().iter().find_map(|token| {
            let shape = token.shape.as_ref().filter(|_| token.id == id)?;
            Some((idx, token.span.clone(), shape.kind, shape.label.clone()))
        })
    })
}

/// Whether `id` appears as a word anywhere but the declaration line.
fn is_mentioned(text: &str, classified: &[SourceLine], id: &str) -> bool {
    text.lines().zip(classified).any(|(raw, line)| {
        !matches!(line, SourceLine::Declaration { .. }) && contains_word(raw, id)
    })
}

fn create_node(text: &str, id: &str, kind: ShapeKind, label: &str) -> Result<String, EditError> {
    validate_node_ident(id)
        .map_err(|reason| EditError::InvalidIdentifier { id: id.to_owned(), reason })?;
    if contains_word(text, id) {
        return Err(EditError::IdentifierConflict { id: id.to_owned() });
    }

    let indent = body_indent(text);
    let mut source = SourceLines::new(text);
    source.lines.push(format!("{indent}{}", kind.definition(id, label)));
    source.lines.push(format!("{indent}{}", kind.style_line(id)));
    Ok(source.into_text())
}

fn retype_node(text: &str, id: &NodeIdent, kind: ShapeKind) -> Result<String, EditError> {
    let classified = classify(text);
    if !is_mentioned(text, &classified, id.as_str()) {
        return Err(EditError::NodeNotFound { id: id.clone() });
    }

    let label = first_shape(&classified, id.as_str())
        .map(|(_, _, _, label)| label)
        .unwrap_or_else(|| id.to_string());
    let definition = kind.definition(id.as_str(), &label);
    let mut source = SourceLines::new(text);

    for (idx, line) in classified.iter().enumerate() {
        if matches!(line, SourceLine::StyleDecl { target } if target == id.as_str()) {
            let indent = indent_of(&source.lines[idx]).to_owned();
            source.lines[idx] = format!("{indent}{}", kind.style_line(id.as_str()));
        }
    }

    // Connections never keep inline shape syntax for a retyped node.
    for (idx, line) in classified.iter().enumerate() {
        let SourceLine::Connection(connection) = line else {
            continue;
        };
        let mut spans: Vec<Range<usize>> = connection
            .nodes
            .iter()
            .filter(|token| token.id == id.as_str() && token.shape.is_some())
            .map(|token| token.span.clone())
            .collect();
        spans.sort_by_key(|span| std::cmp::Reverse(span.start));
        for span in spans {
            source.lines[idx] = replace_span(&source.lines[idx], span, id.as_str());
        }
    }

    if let Some((idx, span)) = standalone_definition(&classified, id.as_str()) {
        source.lines[idx] = replace_span(&source.lines[idx], span, &definition);
        return Ok(source.into_text());
    }
    let insert_at = definition_insert_index(&classified);
    source.lines.insert(insert_at, format!("{}{definition}", body_indent(text)));
    Ok(source.into_text())
}

fn relabel_node(text: &str, id: &NodeIdent, label: &str) -> Result<String, EditError> {
    let classified = classify(text);
    let mut source = SourceLines::new(text);

    if let Some((idx, span, kind, _)) = first_shape(&classified, id.as_str()) {
        let definition = kind.definition(id.as_str(), label);
        source.lines[idx] = replace_span(&source.lines[idx], span, &definition);
        return Ok(source.into_text());
    }
    let definition = ShapeKind::Action.definition(id.as_str(), label);
    if let Some((idx, span)) = standalone_definition(&classified, id.as_str()) {
        source.lines[idx] = replace_span(&source.lines[idx], span, &definition);
        return Ok(source.into_text());
    }
    if !is_mentioned(text, &classified, id.as_str()) {
        return Err(EditError::NodeNotFound { id: id.clone() });
    }

    let insert_at = definition_insert_index(&classified);
    source.lines.insert(insert_at, format!("{}{definition}", body_indent(text)));
    Ok(source.into_text())
}

fn delete_node(text: &str, id: &NodeIdent) -> Result<String, EditError> {
    let classified = classify(text);
    let doomed: BTreeSet<usize> = text
        .lines()
        .zip(&classified)
        .enumerate()
        .filter(|(_, (raw, line))| {
            !matches!(line, SourceLine::Declaration { .. }) && contains_word(raw, id.as_str())
        })
        .map(|(idx, _)| idx)
        .collect();
    if doomed.is_empty() {
        return Err(EditError::NodeNotFound { id: id.clone() });
    }

    let mut source = SourceLines::new(text);
    source.lines = std::mem::take(&mut source.lines)
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !doomed.contains(idx))
        .map(|(_, line)| line)
        .collect();
    Ok(source.into_text())
}

/// The classified connection an edge was located on, plus its line and link index.
fn located_connection(
    text: &str,
    edge: &EdgeKey,
) -> Result<(usize, Option<(Connection, usize)>), EditError> {
    let location = locate_edge(text, edge.source.as_str(), edge.target.as_str())
        .ok_or_else(|| EditError::EdgeNotFound { edge: edge.clone() })?;
    let connection = location.link.and_then(|link| match classify_line(&location.line_text) {
        SourceLine::Connection(connection) => Some((connection, link)),
        _ => None,
    });
    Ok((location.line, connection))
}

/// Rewrites a chained connection line as one line per link. A shaped token keeps its shape on the
/// first line it appears on; later lines use the bare id.
fn explode_chain(text: &str, line_idx: usize, connection: &Connection) -> String {
    let mut source = SourceLines::new(text);
    let raw = source.lines[line_idx].clone();
    let indent = indent_of(&raw);
    let mut emitted = vec![false; connection.nodes.len()];
    let mut token_text = |idx: usize| {
        let token = &connection.nodes[idx];
        if std::mem::replace(&mut emitted[idx], true) {
            token.id.to_string()
        } else {
            raw[token.span.clone()].to_owned()
        }
    };

    let mut replacement = Vec::with_capacity(connection.links.len());
    for (idx, link) in connection.links.iter().enumerate() {
        let left = token_text(idx);
        let right = token_text(idx + 1);
        replacement.push(format!("{indent}{left} {} {right}", &raw[link.span.clone()]));
    }
    if let (Some(last), Some(token)) = (replacement.last_mut(), connection.nodes.last()) {
        last.push_str(&raw[token.span.end..]);
    }

    source.lines.splice(line_idx..=line_idx, replacement);
    source.into_text()
}

fn relabel_edge(text: &str, edge: &EdgeKey, label: &str) -> Result<String, EditError> {
    let label = label.trim();
    let (line_idx, connection) = located_connection(text, edge)?;
    let mut source = SourceLines::new(text);
    let raw = source.lines[line_idx].clone();

    let Some((connection, link_idx)) = connection else {
        // Sequence-style message: the label is everything after the colon.
        let colon = raw.find(':').ok_or_else(|| EditError::EdgeNotFound { edge: edge.clone() })?;
        source.lines[line_idx] = format!("{}: {label}", &raw[..colon]);
        return Ok(source.into_text());
    };

    let uses_trailing = Dialect::detect(text) == Some(Dialect::State)
        || (connection.trailing.is_some() && connection.links.len() == 1);
    if uses_trailing {
        let Some(rhs) = connection.nodes.last() else {
            return Err(EditError::EdgeNotFound { edge: edge.clone() });
        };
        let tail_start = connection.trailing.as_ref().map_or(rhs.span.end, |t| t.span.end);
        let suffix = if label.is_empty() { String::new() } else { format!(" : {label}") };
        source.lines[line_idx] = replace_span(&raw, rhs.span.end..tail_start, &suffix);
        return Ok(source.into_text());
    }

    let link = &connection.links[link_idx];
    let op = if link.reversed {
        format!("<{}", link.op.trim_end_matches('>'))
    } else {
        link.op.clone()
    };
    let rendered = if label.is_empty() { op } else { format!("{op}{}", pipe_label(label)) };
    source.lines[line_idx] = replace_span(&raw, link.span.clone(), &rendered);
    Ok(source.into_text())
}

fn reroute_edge(
    text: &str,
    edge: &EdgeKey,
    endpoint: Endpoint,
    new_id: &NodeIdent,
    new_node: Option<&NewNode>,
) -> Result<String, EditError> {
    let (line_idx, connection) = located_connection(text, edge)?;
    let Some((connection, link_idx)) = connection else {
        return Err(EditError::EdgeNotFound { edge: edge.clone() });
    };
    if connection.links.len() > 1 {
        let exploded = explode_chain(text, line_idx, &connection);
        return reroute_edge(&exploded, edge, endpoint, new_id, new_node);
    }

    let classified = classify(text);
    let mut source = SourceLines::new(text);
    let raw = source.lines[line_idx].clone();
    let indent = indent_of(&raw).to_owned();

    let insert_after = if is_mentioned(text, &classified, new_id.as_str()) {
        None
    } else {
        let node = new_node.ok_or_else(|| EditError::MissingNodeDefinition { id: new_id.clone() })?;
        Some(format!("{indent}{}", node.kind.definition(new_id.as_str(), &node.label)))
    };

    let (source_idx, target_idx) = connection.endpoint_indices(link_idx);
    let token = match endpoint {
        Endpoint::Origin => &connection.nodes[source_idx],
        Endpoint::Destination => &connection.nodes[target_idx],
    };
    // The replaced endpoint keeps its label when its only definition was inline.
    let insert_before = token
        .shape
        .as_ref()
        .filter(|_| standalone_definition(&classified, &token.id).is_none())
        .map(|shape| format!("{indent}{}", shape.kind.definition(&token.id, &shape.label)));

    source.lines[line_idx] = replace_span(&raw, token.span.clone(), new_id.as_str());
    if let Some(line) = insert_after {
        source.lines.insert(line_idx + 1, line);
    }
    if let Some(line) = insert_before {
        source.lines.insert(line_idx, line);
    }
    Ok(source.into_text())
}

fn delete_edge(text: &str, edge: &EdgeKey) -> Result<String, EditError> {
    let (line_idx, connection) = located_connection(text, edge)?;
    if let Some((connection, _)) = connection.as_ref().filter(|(c, _)| c.links.len() > 1) {
        let exploded = explode_chain(text, line_idx, connection);
        return delete_edge(&exploded, edge);
    }

    let classified = classify(text);
    let mut source = SourceLines::new(text);
    let raw = source.lines.remove(line_idx);
    // Endpoints defined only inline keep their definition on a line of their own.
    let indent = indent_of(&raw).to_owned();
    let kept: Vec<String> = connection
        .iter()
        .flat_map(|(connection, _)| connection.nodes.iter())
        .filter(|token| token.shape.is_some())
        .filter(|token| standalone_definition(&classified, &token.id).is_none())
        .map(|token| format!("{indent}{}", &raw[token.span.clone()]))
        .collect();
    for (offset, line) in kept.into_iter().enumerate() {
        source.lines.insert(line_idx + offset, line);
    }
    Ok(source.into_text())
}

fn add_transition(
    text: &str,
    source_id: &NodeIdent,
    target_id: &NodeIdent,
    label: Option<&str>,
) -> Result<String, EditError> {
    let label = label.map(str::trim).filter(|label| !label.is_empty());
    let flowchart = Dialect::detect(text) == Some(Dialect::Flowchart);
    let statement = match (flowchart, label) {
        (true, Some(label)) => format!("{source_id} -->{} {target_id}", pipe_label(label)),
        (false, Some(label)) => format!("{source_id} --> {target_id} : {label}"),
        (_, None) => format!("{source_id} --> {target_id}"),
    };

    let classified = classify(text);
    let line = format!("{}{statement}", body_indent(text));
    let mut source = SourceLines::new(text);
    match standalone_definition(&classified, source_id.as_str()) {
        Some((idx, _)) => source.lines.insert(idx + 1, line),
        None => source.lines.push(line),
    }
    Ok(source.into_text())
}

fn apply_patch(text: &str, find: &str, replace: &str) -> Result<String, EditError> {
    if find.is_empty() {
        return Err(EditError::EmptyPatch);
    }
    let count = text.matches(find).count();
    if count != 1 {
        return Err(EditError::AmbiguousPatch { count });
    }
    Ok(text.replacen(find, replace, 1))
}
