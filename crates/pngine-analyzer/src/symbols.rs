use std::collections::HashMap;

use pngine_lexer::{MacroKeyword, Token};
use pngine_parser::{node_token_text, Ast, NodeData, NodeIndex, NodeTag};

use crate::errors::AnalysisError;
use crate::namespace::Namespace;

/// One definition per namespace, keyed by name. Spec §4.3 phase 1.
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub by_namespace: HashMap<Namespace, HashMap<String, NodeIndex>>,
    pub defines: HashMap<String, NodeIndex>,
}

impl SymbolTable {
    pub fn lookup(&self, namespace: Namespace, name: &str) -> Option<NodeIndex> {
        self.by_namespace.get(&namespace)?.get(name).copied()
    }
}

fn macro_name<'a>(source: &'a str, tokens: &[Token], ast: &Ast, macro_node: NodeIndex) -> &'a str {
    node_token_text(source, tokens, ast, macro_node)
}

/// Walks every root-level macro once, recording its name in the matching
/// namespace and reporting any duplicate.
pub fn collect_symbols(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
) -> Result<SymbolTable, AnalysisError> {
    let mut table = SymbolTable::default();
    // Names are globally unique across namespaces (spec §3): a name claimed in
    // one namespace cannot be redefined in another, so this tracks every name
    // seen so far regardless of which bucket it landed in.
    let mut global_names: HashMap<String, &'static str> = HashMap::new();
    for &macro_node in ast.root_macros() {
        let kw = match ast.tag(macro_node) {
            NodeTag::Macro(kw) => kw,
            _ => continue,
        };
        let offset = token_offset(tokens, ast, macro_node);
        if kw == MacroKeyword::Define {
            let name = macro_name(source, tokens, ast, macro_node).to_string();
            if let Some(&first_kind) = global_names.get(&name) {
                return Err(AnalysisError::DuplicateDefinition {
                    name,
                    first_kind,
                    second_kind: "define",
                    offset,
                });
            }
            // Store the value node (not the macro node) so evaluators can
            // dereference a define directly via `NodeIndex`.
            let value = match ast.data(macro_node) {
                NodeData::Node(v) => v,
                _ => continue,
            };
            global_names.insert(name.clone(), "define");
            table.defines.insert(name, value);
            continue;
        }
        let namespace = match Namespace::from_macro_keyword(kw) {
            Some(ns) => ns,
            None => continue,
        };
        let name = macro_name(source, tokens, ast, macro_node).to_string();
        if let Some(&first_kind) = global_names.get(&name) {
            return Err(AnalysisError::DuplicateDefinition {
                name,
                first_kind,
                second_kind: namespace_label(namespace),
                offset,
            });
        }
        global_names.insert(name.clone(), namespace_label(namespace));
        table.by_namespace.entry(namespace).or_default().insert(name, macro_node);
    }
    Ok(table)
}

fn token_offset(tokens: &[Token], ast: &Ast, node: NodeIndex) -> u32 {
    tokens[ast.main_token(node) as usize].start
}

pub fn namespace_label(ns: Namespace) -> &'static str {
    match ns {
        Namespace::Wgsl => "wgsl",
        Namespace::ShaderModule => "shaderModule",
        Namespace::Buffer => "buffer",
        Namespace::Texture => "texture",
        Namespace::Sampler => "sampler",
        Namespace::BindGroup => "bindGroup",
        Namespace::BindGroupLayout => "bindGroupLayout",
        Namespace::PipelineLayout => "pipelineLayout",
        Namespace::RenderPipeline => "renderPipeline",
        Namespace::ComputePipeline => "computePipeline",
        Namespace::RenderPass => "renderPass",
        Namespace::ComputePass => "computePass",
        Namespace::RenderBundle => "renderBundle",
        Namespace::Frame => "frame",
        Namespace::Data => "data",
        Namespace::Queue => "queue",
        Namespace::ImageBitmap => "imageBitmap",
        Namespace::WasmCall => "wasmCall",
        Namespace::QuerySet => "querySet",
        Namespace::TextureView => "textureView",
        Namespace::Animation => "animation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pngine_parser::parse;

    #[test]
    fn same_name_across_namespaces_is_a_duplicate_definition() {
        let src = "#buffer b { size=1 usage=[UNIFORM] } #texture b { size=[1 1] format=RGBA8 }";
        let (ast, tokens) = parse(src).unwrap();
        let err = collect_symbols(src, &tokens, &ast).unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateDefinition { .. }));
    }

    #[test]
    fn collects_distinct_names_in_distinct_namespaces() {
        let src = "#buffer b { size=1 usage=[UNIFORM] } #texture t { size=[1 1] format=RGBA8 }";
        let (ast, tokens) = parse(src).unwrap();
        let table = collect_symbols(src, &tokens, &ast).unwrap();
        assert!(table.lookup(Namespace::Buffer, "b").is_some());
        assert!(table.lookup(Namespace::Texture, "t").is_some());
    }

    #[test]
    fn duplicate_definition_in_same_namespace_errors() {
        let src = "#buffer b { size=1 usage=[UNIFORM] } #buffer b { size=2 usage=[STORAGE] }";
        let (ast, tokens) = parse(src).unwrap();
        let err = collect_symbols(src, &tokens, &ast).unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateDefinition { .. }));
    }

    #[test]
    fn define_duplicate_errors() {
        let src = "#define N = 1 #define N = 2";
        let (ast, tokens) = parse(src).unwrap();
        let err = collect_symbols(src, &tokens, &ast).unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateDefinition { .. }));
    }
}
