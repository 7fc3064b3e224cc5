use pngine_lexer::MacroKeyword;

pub type NodeIndex = u32;

/// Struct-of-arrays AST. Node 0 is always [`NodeTag::Root`]; its
/// [`NodeData::Range`] lists the top-level macro node indices.
#[derive(Debug, Default)]
pub struct Ast {
    pub tags: Vec<NodeTag>,
    pub main_token: Vec<u32>,
    pub data: Vec<NodeData>,
    /// Side buffer that [`NodeData::Range`] indexes into.
    pub extra_data: Vec<NodeIndex>,
}

impl Ast {
    pub fn node_count(&self) -> usize {
        self.tags.len()
    }

    pub fn tag(&self, node: NodeIndex) -> NodeTag {
        self.tags[node as usize]
    }

    pub fn data(&self, node: NodeIndex) -> NodeData {
        self.data[node as usize]
    }

    pub fn main_token(&self, node: NodeIndex) -> u32 {
        self.main_token[node as usize]
    }

    /// Children of `node` when its data is a [`NodeData::Range`].
    pub fn extra(&self, range: (u32, u32)) -> &[NodeIndex] {
        &self.extra_data[range.0 as usize..range.1 as usize]
    }

    pub fn root_macros(&self) -> &[NodeIndex] {
        match self.data(0) {
            NodeData::Range { start, end } => self.extra((start, end)),
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    Root,
    Macro(MacroKeyword),
    Property,
    Object,
    Array,
    StringValue,
    NumberValue,
    BooleanValue,
    IdentifierValue,
    /// A string literal containing `$name` or `${expr}`; same payload as
    /// [`NodeTag::StringValue`], tagged separately per spec §6.
    RuntimeInterpolation,
    /// `canvas.<field>` / `time.<field>`.
    BuiltinRef,
    /// `<shader>.<var>`, resolved by the analyzer via WGSL reflection.
    UniformAccess,
    ExprAdd,
    ExprSub,
    ExprMul,
    ExprDiv,
    ExprNegate,
}

/// Node payload. `Pair`/`Node` values are themselves other node indices,
/// except for [`NodeTag::BuiltinRef`] and [`NodeTag::UniformAccess`] where the
/// pair holds (base identifier token, field identifier token) — a leaf needs
/// no child node, only the two token positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeData {
    None,
    Node(NodeIndex),
    Pair(u32, u32),
    Range { start: u32, end: u32 },
}
