use std::collections::HashMap;
use std::f64::consts::{E, PI, TAU};

use pngine_parser::{node_token_text, Ast, NodeData, NodeIndex, NodeTag, Token, MAX_EXPR_DEPTH};

fn parse_number_literal(text: &str) -> Option<f64> {
    match text {
        "PI" => return Some(PI),
        "E" => return Some(E),
        "TAU" => return Some(TAU),
        _ => {}
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    text.parse::<f64>().ok()
}

/// Evaluates a compile-time arithmetic expression node (spec §4.3 phase 7).
/// Returns `None` on an unresolved identifier, division by zero, or an
/// expression deeper than `MAX_EXPR_DEPTH`; never returns NaN.
pub fn evaluate_expression(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
    defines: &HashMap<String, NodeIndex>,
    node: NodeIndex,
) -> Option<f64> {
    evaluate_inner(source, tokens, ast, defines, node, 0)
}

fn evaluate_inner(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
    defines: &HashMap<String, NodeIndex>,
    node: NodeIndex,
    depth: u32,
) -> Option<f64> {
    if depth > MAX_EXPR_DEPTH {
        return None;
    }
    let result = match ast.tag(node) {
        NodeTag::NumberValue => parse_number_literal(node_token_text(source, tokens, ast, node)),
        NodeTag::IdentifierValue => {
            let name = node_token_text(source, tokens, ast, node);
            let def_node = *defines.get(name)?;
            evaluate_inner(source, tokens, ast, defines, def_node, depth + 1)?
        }
        NodeTag::ExprNegate => {
            let operand = match ast.data(node) {
                NodeData::Node(n) => n,
                _ => return None,
            };
            -evaluate_inner(source, tokens, ast, defines, operand, depth + 1)?
        }
        NodeTag::ExprAdd | NodeTag::ExprSub | NodeTag::ExprMul | NodeTag::ExprDiv => {
            let (lhs, rhs) = match ast.data(node) {
                NodeData::Pair(a, b) => (a, b),
                _ => return None,
            };
            let a = evaluate_inner(source, tokens, ast, defines, lhs, depth + 1)?;
            let b = evaluate_inner(source, tokens, ast, defines, rhs, depth + 1)?;
            match ast.tag(node) {
                NodeTag::ExprAdd => a + b,
                NodeTag::ExprSub => a - b,
                NodeTag::ExprMul => a * b,
                NodeTag::ExprDiv => {
                    if b == 0.0 {
                        return None;
                    }
                    a / b
                }
                _ => unreachable!(),
            }
        }
        _ => return None,
    };
    if result.is_nan() || result.is_infinite() {
        None
    } else {
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pngine_parser::parse;

    fn eval_expr(src: &str) -> Option<f64> {
        let (ast, tokens) = parse(src).unwrap();
        let macro_node = ast.root_macros()[0];
        let value = match ast.data(macro_node) {
            NodeData::Range { start, end } => {
                let prop = ast.extra((start, end))[0];
                match ast.data(prop) {
                    NodeData::Node(v) => v,
                    _ => panic!(),
                }
            }
            _ => panic!(),
        };
        evaluate_expression(src, &tokens, &ast, &HashMap::new(), value)
    }

    #[test]
    fn precedence_and_parens() {
        assert_eq!(eval_expr("#buffer b { size=(1+2)*3 }"), Some(9.0));
    }

    #[test]
    fn division_by_zero_is_none() {
        assert_eq!(eval_expr("#buffer b { size=10/0 }"), None);
    }

    #[test]
    fn math_constants() {
        assert_eq!(eval_expr("#buffer b { size=PI }"), Some(PI));
    }

    #[test]
    fn negation() {
        assert_eq!(eval_expr("#buffer b { size=-(2+3) }"), Some(-5.0));
    }
}
