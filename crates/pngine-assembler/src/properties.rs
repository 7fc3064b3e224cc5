use std::collections::HashMap;

use pngine_analyzer::{evaluate_expression, AnalysisResult};
use pngine_lexer::Token;
use pngine_parser::{node_token_text, Ast, NodeData, NodeIndex, NodeTag};

/// Finds the value node of `name=...` directly under `owner`, if present.
pub fn find_property(source: &str, tokens: &[Token], ast: &Ast, owner: NodeIndex, name: &str) -> Option<NodeIndex> {
    let props = match ast.data(owner) {
        NodeData::Range { start, end } => ast.extra((start, end)),
        _ => return None,
    };
    for &prop in props {
        if node_token_text(source, tokens, ast, prop) == name {
            return match ast.data(prop) {
                NodeData::Node(v) => Some(v),
                _ => None,
            };
        }
    }
    None
}

/// Evaluates `name=<expr>` as a number, defaulting to `default` if absent.
pub fn number_property(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
    defines: &HashMap<String, NodeIndex>,
    owner: NodeIndex,
    name: &str,
    default: f64,
) -> f64 {
    match find_property(source, tokens, ast, owner, name) {
        Some(node) => evaluate_expression(source, tokens, ast, defines, node).unwrap_or(default),
        None => default,
    }
}

/// Reads `name="..."` (or a bare identifier) as raw text, trimming quotes.
pub fn text_property<'a>(source: &'a str, tokens: &[Token], ast: &Ast, owner: NodeIndex, name: &str) -> Option<&'a str> {
    let value = find_property(source, tokens, ast, owner, name)?;
    Some(node_token_text(source, tokens, ast, value).trim_matches('"'))
}

/// Reads an identifier-valued property and resolves it to the macro node it
/// points to, via the analyzer's already-computed bindings.
pub fn ref_property(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
    analysis: &AnalysisResult,
    owner: NodeIndex,
    name: &str,
) -> Option<NodeIndex> {
    let value = find_property(source, tokens, ast, owner, name)?;
    if ast.tag(value) != NodeTag::IdentifierValue {
        return None;
    }
    analysis.resolved_identifiers.get(&value).copied()
}

/// Serializes a macro's property list as a stable `key=value;...` text blob.
/// Descriptor payloads only need to be a stable, parseable byte sequence for
/// a GPU back-end to consume; this keeps assembly independent of a full
/// JSON writer while staying deterministic across runs.
pub fn serialize_descriptor(source: &str, tokens: &[Token], ast: &Ast, owner: NodeIndex) -> String {
    let mut out = String::new();
    let props = match ast.data(owner) {
        NodeData::Range { start, end } => ast.extra((start, end)),
        _ => return out,
    };
    for &prop in props {
        let name = node_token_text(source, tokens, ast, prop);
        if let NodeData::Node(value) = ast.data(prop) {
            out.push_str(name);
            out.push('=');
            out.push_str(&serialize_value(source, tokens, ast, value));
            out.push(';');
        }
    }
    out
}

/// Renders a value node to text for a descriptor blob. Containers recurse
/// into their children rather than reading their own (brace/bracket) token,
/// since that token carries no content of its own.
fn serialize_value(source: &str, tokens: &[Token], ast: &Ast, node: NodeIndex) -> String {
    match ast.tag(node) {
        NodeTag::Object => {
            let mut out = String::from("{");
            if let NodeData::Range { start, end } = ast.data(node) {
                for &prop in ast.extra((start, end)) {
                    let name = node_token_text(source, tokens, ast, prop);
                    if let NodeData::Node(value) = ast.data(prop) {
                        out.push_str(name);
                        out.push('=');
                        out.push_str(&serialize_value(source, tokens, ast, value));
                        out.push(',');
                    }
                }
            }
            out.push('}');
            out
        }
        NodeTag::Array => {
            let mut out = String::from("[");
            if let NodeData::Range { start, end } = ast.data(node) {
                for &elem in ast.extra((start, end)) {
                    out.push_str(&serialize_value(source, tokens, ast, elem));
                    out.push(',');
                }
            }
            out.push(']');
            out
        }
        _ => node_token_text(source, tokens, ast, node).trim_matches('"').to_string(),
    }
}
