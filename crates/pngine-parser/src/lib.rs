//! Iterative, index-based AST parser for PBSF source (spec §4.2).

mod ast;
mod parser;

pub use ast::{Ast, NodeData, NodeIndex, NodeTag};
pub use parser::{parse, ParseError, MAX_EXPR_DEPTH, MAX_MACROS, MAX_PARSE_ITERATIONS, MAX_PROPERTIES};
pub use pngine_lexer::{MacroKeyword, Token, TokenTag};

/// Returns the source text covered by `node`'s main token, given the parsed
/// token slice. Useful for reading identifier/string/number leaf text.
pub fn node_token_text<'a>(source: &'a str, tokens: &[Token], ast: &Ast, node: NodeIndex) -> &'a str {
    let tok_idx = ast.main_token(node) as usize;
    let start = tokens[tok_idx].start as usize;
    let mut next = tok_idx + 1;
    while tokens[next].tag == TokenTag::LineComment {
        next += 1;
    }
    let end = tokens[next].start as usize;
    &source[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_macro_with_property() {
        let (ast, _tokens) = parse("#buffer b { size=1 usage=[UNIFORM] }").unwrap();
        let top = ast.root_macros();
        assert_eq!(top.len(), 1);
        assert!(matches!(ast.tag(top[0]), NodeTag::Macro(MacroKeyword::Buffer)));
    }

    #[test]
    fn define_macro_has_no_property_list() {
        let (ast, _tokens) = parse("#define N = 3").unwrap();
        let top = ast.root_macros();
        assert_eq!(top.len(), 1);
        assert!(matches!(ast.tag(top[0]), NodeTag::Macro(MacroKeyword::Define)));
        assert!(matches!(ast.data(top[0]), NodeData::Node(_)));
    }

    #[test]
    fn array_disambiguates_adjacent_minus_as_separate_elements() {
        let (ast, _tokens) = parse("#buffer b { usage=[1 -1 2 -2] }").unwrap();
        let buf = ast.root_macros()[0];
        let (pstart, pend) = match ast.data(buf) {
            NodeData::Range { start, end } => (start, end),
            _ => panic!("expected property range"),
        };
        let prop = ast.extra((pstart, pend))[0];
        let value = match ast.data(prop) {
            NodeData::Node(v) => v,
            _ => panic!(),
        };
        assert_eq!(ast.tag(value), NodeTag::Array);
        let (astart, aend) = match ast.data(value) {
            NodeData::Range { start, end } => (start, end),
            _ => panic!(),
        };
        assert_eq!(ast.extra((astart, aend)).len(), 4);
    }

    #[test]
    fn parenthesized_expression_in_array_is_one_element() {
        let (ast, _tokens) = parse("#buffer b { usage=[(1+2) 3] }").unwrap();
        let buf = ast.root_macros()[0];
        let (pstart, pend) = match ast.data(buf) {
            NodeData::Range { start, end } => (start, end),
            _ => panic!(),
        };
        let prop = ast.extra((pstart, pend))[0];
        let value = match ast.data(prop) {
            NodeData::Node(v) => v,
            _ => panic!(),
        };
        let (astart, aend) = match ast.data(value) {
            NodeData::Range { start, end } => (start, end),
            _ => panic!(),
        };
        let elems = ast.extra((astart, aend));
        assert_eq!(elems.len(), 2);
        assert_eq!(ast.tag(elems[0]), NodeTag::ExprAdd);
    }

    #[test]
    fn expression_precedence_and_parens() {
        let (ast, _tokens) = parse("#buffer b { size=(1+2)*3 }").unwrap();
        let buf = ast.root_macros()[0];
        let (pstart, pend) = match ast.data(buf) {
            NodeData::Range { start, end } => (start, end),
            _ => panic!(),
        };
        let prop = ast.extra((pstart, pend))[0];
        let value = match ast.data(prop) {
            NodeData::Node(v) => v,
            _ => panic!(),
        };
        assert_eq!(ast.tag(value), NodeTag::ExprMul);
    }

    #[test]
    fn uniform_access_vs_builtin_ref() {
        let (ast, _tokens) = parse("#frame f { perform=[] writeBuffer=[{ buffer=cb data=sh.cam }] x=canvas.width }").unwrap();
        let top = ast.root_macros()[0];
        let (pstart, pend) = match ast.data(top) {
            NodeData::Range { start, end } => (start, end),
            _ => panic!(),
        };
        let props = ast.extra((pstart, pend));
        let x_prop = props.iter().find(|&&p| matches!(ast.tag(p), NodeTag::Property)).copied().unwrap();
        let _ = x_prop;
        // `x` is the last property; its value is a builtin_ref.
        let last = *props.last().unwrap();
        let value = match ast.data(last) {
            NodeData::Node(v) => v,
            _ => panic!(),
        };
        assert_eq!(ast.tag(value), NodeTag::BuiltinRef);
    }

    #[test]
    fn nested_object_inside_array_inside_object_is_iterative() {
        let (ast, _tokens) = parse(
            "#frame f { writeBuffer=[{ buffer=cb data=sh.cam }] }",
        )
        .unwrap();
        assert!(ast.node_count() > 1);
    }
}
