//! Static analysis over a parsed PBSF [`pngine_parser::Ast`] (spec §4.3).
//!
//! Runs symbol collection, reference resolution, cycle detection, shader
//! deduplication, WGSL reflection, required-property validation and
//! compile-time expression evaluation over a single AST, accumulating every
//! error it finds rather than stopping at the first one (spec §7 policy).

mod cycles;
mod errors;
mod eval;
mod namespace;
mod reflect;
mod schema;
mod symbols;

use std::collections::HashMap;

use blake3::Hasher;
use pngine_lexer::{MacroKeyword, Token};
use pngine_parser::{node_token_text, Ast, NodeData, NodeIndex, NodeTag};

pub use errors::AnalysisError;
pub use eval::evaluate_expression;
pub use namespace::Namespace;
pub use reflect::{reflect_bindings, ResolvedUniform};
pub use schema::required_properties;
pub use symbols::{namespace_label, SymbolTable};

pub type ShaderDataId = u32;

/// A distinct shader body, deduplicated by content hash (spec §4.3 phase 4).
#[derive(Debug, Clone)]
pub struct ShaderFragment {
    pub data_id: ShaderDataId,
    pub text: String,
}

/// Everything the assembler needs out of analysis.
#[derive(Debug, Default)]
pub struct AnalysisResult {
    pub symbols: SymbolTable,
    /// `identifier_value` node -> the macro node it resolved to.
    pub resolved_identifiers: HashMap<NodeIndex, NodeIndex>,
    /// `uniform_access` node -> its reflected binding.
    pub resolved_uniforms: HashMap<NodeIndex, ResolvedUniform>,
    /// One entry per distinct shader body hash.
    pub shader_fragments: Vec<ShaderFragment>,
    /// `shader_module`/`wgsl` macro node -> its fragment's data id.
    pub shader_data_ids: HashMap<NodeIndex, ShaderDataId>,
    pub errors: Vec<AnalysisError>,
}

/// Runs the full analysis pipeline over `ast`. Errors accumulate; a
/// non-empty `errors` means the caller (the assembler) must abort, but the
/// rest of the result is still populated for tooling use.
pub fn analyze(source: &str, tokens: &[Token], ast: &Ast) -> AnalysisResult {
    let mut result = AnalysisResult::default();

    let symbols = match symbols::collect_symbols(source, tokens, ast) {
        Ok(table) => table,
        Err(e) => {
            result.errors.push(e);
            SymbolTable::default()
        }
    };

    validate_required_properties(source, tokens, ast, &mut result.errors);
    validate_render_pass_draw(source, tokens, ast, &mut result.errors);
    resolve_references(source, tokens, ast, &symbols, &mut result);

    if let Err(e) = cycles::check_import_cycles(source, tokens, ast, &symbols) {
        result.errors.push(e);
    }

    dedup_shaders(source, tokens, ast, &symbols, &mut result);
    reflect_uniforms(source, tokens, ast, &symbols, &mut result);

    result.symbols = symbols;
    result
}

fn validate_required_properties(source: &str, tokens: &[Token], ast: &Ast, errors: &mut Vec<AnalysisError>) {
    for &macro_node in ast.root_macros() {
        let kw = match ast.tag(macro_node) {
            NodeTag::Macro(kw) => kw,
            _ => continue,
        };
        if kw == MacroKeyword::Define {
            continue;
        }
        let owner = node_token_text(source, tokens, ast, macro_node).to_string();
        let props = match ast.data(macro_node) {
            NodeData::Range { start, end } => ast.extra((start, end)),
            _ => &[],
        };
        let present: Vec<&str> = props.iter().map(|&p| node_token_text(source, tokens, ast, p)).collect();
        for &required in required_properties(kw) {
            if !present.contains(&required) {
                errors.push(AnalysisError::MissingRequiredProperty {
                    owner: owner.clone(),
                    property: required,
                    offset: tokens[ast.main_token(macro_node) as usize].start,
                });
            }
        }
    }
}

/// `#renderPass` needs exactly one of `draw`/`drawIndexed` (spec §4.5/§6's
/// `draw`/`draw_indexed` opcode pair); `required_properties` can't express
/// "one of" so it's checked here instead.
fn validate_render_pass_draw(source: &str, tokens: &[Token], ast: &Ast, errors: &mut Vec<AnalysisError>) {
    for &macro_node in ast.root_macros() {
        if ast.tag(macro_node) != NodeTag::Macro(MacroKeyword::RenderPass) {
            continue;
        }
        let owner = node_token_text(source, tokens, ast, macro_node).to_string();
        let props = match ast.data(macro_node) {
            NodeData::Range { start, end } => ast.extra((start, end)),
            _ => &[],
        };
        let has_draw = props.iter().any(|&p| {
            let name = node_token_text(source, tokens, ast, p);
            name == "draw" || name == "drawIndexed"
        });
        if !has_draw {
            errors.push(AnalysisError::MissingRequiredProperty {
                owner,
                property: "draw or drawIndexed",
                offset: tokens[ast.main_token(macro_node) as usize].start,
            });
        }
    }
}

/// Maps a property name (and, where ambiguous, its owning macro kind) to the
/// namespace an `identifier_value` in that position should resolve against
/// (spec §4.3 phase 2).
fn property_target_namespace(owner_kw: MacroKeyword, property: &str) -> Option<Namespace> {
    Some(match property {
        "module" => Namespace::ShaderModule,
        "pipeline" => match owner_kw {
            MacroKeyword::ComputePass => Namespace::ComputePipeline,
            _ => Namespace::RenderPipeline,
        },
        "buffer" => Namespace::Buffer,
        "texture" => Namespace::Texture,
        "sampler" => Namespace::Sampler,
        "bindGroup" | "bindGroups" => Namespace::BindGroup,
        "layout" => match owner_kw {
            MacroKeyword::BindGroup => Namespace::BindGroupLayout,
            MacroKeyword::RenderPipeline | MacroKeyword::ComputePipeline => Namespace::PipelineLayout,
            _ => return None,
        },
        "bindGroupLayouts" => Namespace::BindGroupLayout,
        "view" | "textureView" => Namespace::TextureView,
        "queue" => Namespace::Queue,
        "data" => Namespace::Data,
        "imageBitmap" => Namespace::ImageBitmap,
        "renderBundle" | "renderBundles" => Namespace::RenderBundle,
        "vertexBuffers" => Namespace::Buffer,
        "frame" => Namespace::Frame,
        _ => return None,
    })
}

/// `perform=[...]` entries name a `render_pass`, `compute_pass` or `queue`
/// (spec §4.3 phase 2); tried in that order since the three namespaces are
/// disjoint by construction (spec §3's global-uniqueness invariant).
const PERFORM_NAMESPACES: [Namespace; 3] = [Namespace::RenderPass, Namespace::ComputePass, Namespace::Queue];

fn resolve_references(source: &str, tokens: &[Token], ast: &Ast, symbols: &SymbolTable, result: &mut AnalysisResult) {
    for &macro_node in ast.root_macros() {
        let owner_kw = match ast.tag(macro_node) {
            NodeTag::Macro(kw) => kw,
            _ => continue,
        };
        walk_properties(source, tokens, ast, macro_node, owner_kw, symbols, result);
    }
}

fn walk_properties(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
    owner: NodeIndex,
    owner_kw: MacroKeyword,
    symbols: &SymbolTable,
    result: &mut AnalysisResult,
) {
    let props = match ast.data(owner) {
        NodeData::Range { start, end } => ast.extra((start, end)),
        _ => return,
    };
    for &prop in props {
        let name = node_token_text(source, tokens, ast, prop).to_string();
        if let NodeData::Node(value) = ast.data(prop) {
            resolve_value(source, tokens, ast, &name, owner_kw, value, symbols, result);
        }
    }
}

fn resolve_value(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
    property_name: &str,
    owner_kw: MacroKeyword,
    value: NodeIndex,
    symbols: &SymbolTable,
    result: &mut AnalysisResult,
) {
    match ast.tag(value) {
        NodeTag::IdentifierValue => {
            let name = node_token_text(source, tokens, ast, value);
            if name == "auto" {
                return;
            }
            if property_name == "perform" {
                match PERFORM_NAMESPACES.iter().find_map(|&ns| symbols.lookup(ns, name).map(|t| (ns, t))) {
                    Some((_, target)) => {
                        result.resolved_identifiers.insert(value, target);
                    }
                    None => {
                        result.errors.push(AnalysisError::UndefinedReference {
                            offset: tokens[ast.main_token(value) as usize].start,
                            name: name.to_string(),
                        });
                    }
                }
                return;
            }
            let namespace = match property_target_namespace(owner_kw, property_name) {
                Some(ns) => ns,
                None => return,
            };
            match symbols.lookup(namespace, name) {
                Some(target) => {
                    result.resolved_identifiers.insert(value, target);
                }
                None => {
                    result.errors.push(AnalysisError::UndefinedReference {
                        offset: tokens[ast.main_token(value) as usize].start,
                        name: name.to_string(),
                    });
                }
            }
        }
        NodeTag::Array | NodeTag::Object => {
            let children = match ast.data(value) {
                NodeData::Range { start, end } => ast.extra((start, end)),
                _ => return,
            };
            for &child in children {
                match ast.tag(child) {
                    NodeTag::Property => {
                        let child_name = node_token_text(source, tokens, ast, child).to_string();
                        if let NodeData::Node(child_value) = ast.data(child) {
                            resolve_value(source, tokens, ast, &child_name, owner_kw, child_value, symbols, result);
                        }
                    }
                    _ => resolve_value(source, tokens, ast, property_name, owner_kw, child, symbols, result),
                }
            }
        }
        _ => {}
    }
}

fn shader_body_property(kw: MacroKeyword) -> Option<&'static str> {
    match kw {
        MacroKeyword::Wgsl => Some("value"),
        MacroKeyword::ShaderModule => Some("code"),
        _ => None,
    }
}

fn dedup_shaders(source: &str, tokens: &[Token], ast: &Ast, symbols: &SymbolTable, result: &mut AnalysisResult) {
    let mut by_hash: HashMap<[u8; 32], ShaderDataId> = HashMap::new();
    let shader_nodes: Vec<NodeIndex> = [Namespace::Wgsl, Namespace::ShaderModule]
        .iter()
        .filter_map(|ns| symbols.by_namespace.get(ns))
        .flat_map(|bucket| bucket.values().copied())
        .collect();

    for macro_node in shader_nodes {
        let kw = match ast.tag(macro_node) {
            NodeTag::Macro(kw) => kw,
            _ => continue,
        };
        let body_prop = match shader_body_property(kw) {
            Some(p) => p,
            None => continue,
        };
        let text = match find_property_text(source, tokens, ast, macro_node, body_prop) {
            Some(t) => t,
            None => continue,
        };
        let mut hasher = Hasher::new();
        hasher.update(text.as_bytes());
        let hash: [u8; 32] = *hasher.finalize().as_bytes();

        let next_id = result.shader_fragments.len() as ShaderDataId;
        let data_id = *by_hash.entry(hash).or_insert_with(|| {
            result.shader_fragments.push(ShaderFragment { data_id: next_id, text: text.to_string() });
            next_id
        });
        result.shader_data_ids.insert(macro_node, data_id);
    }
}

fn find_property_text<'a>(
    source: &'a str,
    tokens: &[Token],
    ast: &Ast,
    owner: NodeIndex,
    property: &str,
) -> Option<&'a str> {
    let props = match ast.data(owner) {
        NodeData::Range { start, end } => ast.extra((start, end)),
        _ => return None,
    };
    for &prop in props {
        if node_token_text(source, tokens, ast, prop) == property {
            let value = match ast.data(prop) {
                NodeData::Node(v) => v,
                _ => return None,
            };
            return Some(node_token_text(source, tokens, ast, value).trim_matches('"'));
        }
    }
    None
}

fn reflect_uniforms(source: &str, tokens: &[Token], ast: &Ast, symbols: &SymbolTable, result: &mut AnalysisResult) {
    for &macro_node in ast.root_macros() {
        walk_uniform_access(source, tokens, ast, macro_node, symbols, result);
    }
}

fn walk_uniform_access(
    source: &str,
    tokens: &[Token],
    ast: &Ast,
    node: NodeIndex,
    symbols: &SymbolTable,
    result: &mut AnalysisResult,
) {
    match ast.tag(node) {
        NodeTag::UniformAccess => {
            let (base_tok, field_tok) = match ast.data(node) {
                NodeData::Pair(a, b) => (a, b),
                _ => return,
            };
            let shader_name = token_text(source, tokens, base_tok);
            let var_name = token_text(source, tokens, field_tok);
            let shader_node = symbols
                .lookup(Namespace::ShaderModule, shader_name)
                .or_else(|| symbols.lookup(Namespace::Wgsl, shader_name));
            let shader_node = match shader_node {
                Some(n) => n,
                None => {
                    result.errors.push(AnalysisError::UndefinedReference {
                        offset: tokens[base_tok as usize].start,
                        name: shader_name.to_string(),
                    });
                    return;
                }
            };
            let kw = match ast.tag(shader_node) {
                NodeTag::Macro(kw) => kw,
                _ => return,
            };
            let body_prop = match shader_body_property(kw) {
                Some(p) => p,
                None => return,
            };
            let body = find_property_text(source, tokens, ast, shader_node, body_prop).unwrap_or_default();
            let binding = reflect_bindings(body)
                .into_iter()
                .find(|u| u.var_name == var_name)
                .unwrap_or(ResolvedUniform { bind_group: 0, binding: 0, var_name: var_name.to_string() });
            result.resolved_uniforms.insert(node, binding);
        }
        NodeTag::Property => {
            if let NodeData::Node(v) = ast.data(node) {
                walk_uniform_access(source, tokens, ast, v, symbols, result);
            }
        }
        NodeTag::Macro(_) | NodeTag::Array | NodeTag::Object => {
            let children = match ast.data(node) {
                NodeData::Range { start, end } => ast.extra((start, end)),
                _ => return,
            };
            for &child in children {
                walk_uniform_access(source, tokens, ast, child, symbols, result);
            }
        }
        _ => {}
    }
}

fn token_text<'a>(source: &'a str, tokens: &[Token], tok_idx: u32) -> &'a str {
    let start = tokens[tok_idx as usize].start as usize;
    let end = tokens[tok_idx as usize + 1].start as usize;
    &source[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pngine_parser::parse;

    fn run(src: &str) -> AnalysisResult {
        let (ast, tokens) = parse(src).unwrap();
        analyze(src, &tokens, &ast)
    }

    #[test]
    fn triangle_compiles_without_errors() {
        let src = r#"
            #wgsl s { value="@vertex fn vs() -> @builtin(position) vec4f { return vec4f(0); }" }
            #renderPipeline pp { layout=auto vertex={ entryPoint=vs module=s } }
            #renderPass draw { pipeline=pp draw=3 }
            #frame main { perform=[draw] }
        "#;
        let result = run(src);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
    }

    #[test]
    fn undefined_module_reference_errors() {
        let src = "#renderPipeline pp { vertex={ module=missing } }";
        let result = run(src);
        assert!(result.errors.iter().any(|e| matches!(e, AnalysisError::UndefinedReference { name, .. } if name == "missing")));
    }

    #[test]
    fn missing_required_property_is_reported() {
        let src = "#buffer b { size=1 }";
        let result = run(src);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, AnalysisError::MissingRequiredProperty { property, .. } if *property == "usage")));
    }

    #[test]
    fn wgsl_reflection_resolves_group_and_binding() {
        let src = r#"
            #wgsl sh { value="@group(1) @binding(2) var<uniform> cam : mat4x4f;" }
            #buffer cb { size=64 usage=[uniform copy_dst] }
            #frame main { perform=[] writeBuffer=[{ buffer=cb data=sh.cam }] }
        "#;
        let result = run(src);
        let binding = result.resolved_uniforms.values().find(|u| u.var_name == "cam").unwrap();
        assert_eq!(binding.bind_group, 1);
        assert_eq!(binding.binding, 2);
    }

    #[test]
    fn render_pass_with_draw_indexed_only_is_valid() {
        let src = "#renderPass p { pipeline=pp drawIndexed=6 }";
        let result = run(src);
        assert!(!result
            .errors
            .iter()
            .any(|e| matches!(e, AnalysisError::MissingRequiredProperty { property, .. } if property.starts_with("draw"))));
    }

    #[test]
    fn render_pass_missing_both_draw_and_draw_indexed_errors() {
        let src = "#renderPass p { pipeline=pp }";
        let result = run(src);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, AnalysisError::MissingRequiredProperty { property, .. } if *property == "draw or drawIndexed")));
    }

    #[test]
    fn undefined_perform_reference_errors() {
        let src = "#frame main { perform=[doesNotExist] }";
        let result = run(src);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, AnalysisError::UndefinedReference { name, .. } if name == "doesNotExist")));
    }

    #[test]
    fn vertex_buffer_reference_resolves() {
        let src = r#"
            #buffer vb { size=12 usage=[VERTEX] }
            #renderPass p { vertexBuffers=[vb] draw=3 }
            #frame main { perform=[p] }
        "#;
        let result = run(src);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.resolved_identifiers.len(), 2);
    }

    #[test]
    fn identical_shader_bodies_share_one_data_id() {
        let src = r#"
            #wgsl a { value="fn f() {}" }
            #wgsl b { value="fn f() {}" }
        "#;
        let result = run(src);
        assert_eq!(result.shader_fragments.len(), 1);
        assert_eq!(result.shader_data_ids.len(), 2);
    }
}
