use pngine_lexer::Token;
use pngine_parser::{node_token_text, Ast, NodeData, NodeIndex, NodeTag};

/// Maps one usage-flag identifier (case-insensitive, spec examples use both
/// `UNIFORM` and `copy_dst`) to its bit. Unrecognized flags contribute 0,
/// matching the analyzer's "advisory, not fatal" treatment of content it
/// does not need to fully understand to assemble bytecode.
fn flag_bit(name: &str) -> u32 {
    match name.to_ascii_uppercase().as_str() {
        "UNIFORM" => 0x01,
        "STORAGE" => 0x02,
        "COPY_SRC" => 0x04,
        "COPY_DST" => 0x08,
        "VERTEX" => 0x10,
        "INDEX" => 0x20,
        "INDIRECT" => 0x40,
        "QUERY_RESOLVE" => 0x80,
        "TEXTURE_BINDING" => 0x100,
        "RENDER_ATTACHMENT" => 0x200,
        _ => 0,
    }
}

/// Reads a `name=[flag flag ...]` property as an OR'd bitmask.
pub fn usage_bits(source: &str, tokens: &[Token], ast: &Ast, value: NodeIndex) -> u32 {
    let elems = match ast.tag(value) {
        NodeTag::Array => match ast.data(value) {
            NodeData::Range { start, end } => ast.extra((start, end)),
            _ => return 0,
        },
        _ => return 0,
    };
    let mut bits = 0u32;
    for &elem in elems {
        if matches!(ast.tag(elem), NodeTag::IdentifierValue) {
            bits |= flag_bit(node_token_text(source, tokens, ast, elem));
        }
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use pngine_parser::parse;

    #[test]
    fn combines_multiple_flags() {
        let src = "#buffer b { size=1 usage=[uniform copy_dst] }";
        let (ast, tokens) = parse(src).unwrap();
        let owner = ast.root_macros()[0];
        let value = match ast.data(owner) {
            NodeData::Range { start, end } => {
                let prop = ast.extra((start, end))[1];
                match ast.data(prop) {
                    NodeData::Node(v) => v,
                    _ => panic!(),
                }
            }
            _ => panic!(),
        };
        assert_eq!(usage_bits(src, &tokens, &ast, value), 0x01 | 0x08);
    }
}
