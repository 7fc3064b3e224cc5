use std::collections::HashMap;

use pngine_lexer::Token;
use pngine_parser::{node_token_text, Ast, NodeData, NodeIndex, NodeTag};

use crate::errors::AnalysisError;
use crate::namespace::Namespace;
use crate::symbols::SymbolTable;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Names every `#shaderModule`/`#wgsl` import edge reachable from `imports=[...]`
/// properties, in source order.
fn import_edges(source: &str, tokens: &[Token], ast: &Ast, owner: NodeIndex) -> Vec<(String, u32)> {
    let mut edges = Vec::new();
    let props = match ast.data(owner) {
        NodeData::Range { start, end } => ast.extra((start, end)),
        _ => return edges,
    };
    for &prop in props {
        if node_token_text(source, tokens, ast, prop) != "imports" {
            continue;
        }
        let value = match ast.data(prop) {
            NodeData::Node(v) => v,
            _ => continue,
        };
        if ast.tag(value) != NodeTag::Array {
            continue;
        }
        let elems = match ast.data(value) {
            NodeData::Range { start, end } => ast.extra((start, end)),
            _ => continue,
        };
        for &elem in elems {
            if matches!(ast.tag(elem), NodeTag::IdentifierValue | NodeTag::StringValue) {
                let name = node_token_text(source, tokens, ast, elem).trim_matches('"');
                let offset = tokens[ast.main_token(elem) as usize].start;
                edges.push((name.to_string(), offset));
            }
        }
    }
    edges
}

/// Detects cycles among `#shaderModule`/`#wgsl` nodes reachable via `imports`
/// properties, using an explicit stack so no recursion tracks the graph depth
/// (spec §9 design notes).
pub fn check_import_cycles(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
    symbols: &SymbolTable,
) -> Result<(), AnalysisError> {
    let mut colors: HashMap<NodeIndex, Color> = HashMap::new();
    let mut names: HashMap<NodeIndex, String> = HashMap::new();

    let shader_nodes: Vec<NodeIndex> = [Namespace::Wgsl, Namespace::ShaderModule]
        .iter()
        .filter_map(|ns| symbols.by_namespace.get(ns))
        .flat_map(|bucket| bucket.values().copied())
        .collect();

    for &node in &shader_nodes {
        colors.insert(node, Color::White);
        names.insert(node, node_token_text(source, tokens, ast, node).to_string());
    }

    for &start in &shader_nodes {
        if colors[&start] != Color::White {
            continue;
        }
        // Explicit DFS stack: (node, next unvisited edge index).
        let mut stack: Vec<(NodeIndex, usize)> = vec![(start, 0)];
        let mut path_edges: Vec<(String, u32)> = vec![(names[&start].clone(), 0)];
        colors.insert(start, Color::Gray);

        while let Some(&mut (node, ref mut edge_idx)) = stack.last_mut() {
            let edges = import_edges(source, tokens, ast, node);
            if *edge_idx >= edges.len() {
                colors.insert(node, Color::Black);
                stack.pop();
                path_edges.pop();
                continue;
            }
            let (target_name, offset) = edges[*edge_idx].clone();
            *edge_idx += 1;

            let target = find_shader(ast, tokens, source, &shader_nodes, &target_name);
            let target = match target {
                Some(t) => t,
                None => {
                    return Err(AnalysisError::UndefinedReference { offset, name: target_name });
                }
            };

            match colors.get(&target).copied().unwrap_or(Color::White) {
                Color::White => {
                    colors.insert(target, Color::Gray);
                    path_edges.push((target_name, offset));
                    stack.push((target, 0));
                }
                Color::Gray => {
                    let mut path: Vec<String> = path_edges.iter().map(|(n, _)| n.clone()).collect();
                    path.push(target_name);
                    return Err(AnalysisError::CircularDependency { path });
                }
                Color::Black => {}
            }
        }
    }
    Ok(())
}

fn find_shader(
    ast: &Ast,
    tokens: &[Token],
    source: &str,
    shader_nodes: &[NodeIndex],
    name: &str,
) -> Option<NodeIndex> {
    shader_nodes
        .iter()
        .copied()
        .find(|&n| node_token_text(source, tokens, ast, n) == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::collect_symbols;
    use pngine_parser::parse;

    #[test]
    fn direct_cycle_is_detected() {
        let src = r#"
            #wgsl a { value="" imports=[b] }
            #wgsl b { value="" imports=[a] }
        "#;
        let (ast, tokens) = parse(src).unwrap();
        let symbols = collect_symbols(src, &tokens, &ast).unwrap();
        let err = check_import_cycles(src, &tokens, &ast, &symbols).unwrap_err();
        assert!(matches!(err, AnalysisError::CircularDependency { .. }));
    }

    #[test]
    fn acyclic_chain_is_ok() {
        let src = r#"
            #wgsl a { value="" imports=[b] }
            #wgsl b { value="" imports=[] }
        "#;
        let (ast, tokens) = parse(src).unwrap();
        let symbols = collect_symbols(src, &tokens, &ast).unwrap();
        assert!(check_import_cycles(src, &tokens, &ast, &symbols).is_ok());
    }
}
