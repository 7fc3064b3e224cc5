use crate::ast::{Ast, NodeData, NodeIndex, NodeTag};
use pngine_lexer::{lex, LexError, MacroKeyword, Token, TokenTag};
use thiserror::Error;

pub const MAX_MACROS: u32 = 4096;
pub const MAX_PROPERTIES: u32 = 1024;
pub const MAX_PARSE_ITERATIONS: u32 = 65536;
pub const MAX_EXPR_DEPTH: u32 = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("unexpected token at byte {offset}")]
    UnexpectedToken { offset: u32 },
    #[error("unclosed container starting at byte {offset}")]
    UnclosedContainer { offset: u32 },
    #[error("too many top-level macros (max {MAX_MACROS})")]
    TooManyMacros,
    #[error("too many properties in one macro (max {MAX_PROPERTIES})")]
    TooManyProperties,
    #[error("exceeded max parse iterations ({MAX_PARSE_ITERATIONS})")]
    TooManyIterations,
    #[error("arithmetic expression nesting exceeds {MAX_EXPR_DEPTH}")]
    ExprDepthExceeded,
    #[error("unexpected end of file")]
    UnexpectedEof,
}

/// Parses `source` into an [`Ast`], returning the original token slice
/// alongside it (spec §4.2's "output" contract).
pub fn parse(source: &str) -> Result<(Ast, Vec<Token>), ParseError> {
    let tokens = lex(source)?;
    let mut p = Parser {
        source,
        tokens,
        pos: 0,
        ast: Ast::default(),
    };
    // Reserve node 0 for the root so every other node index is nonzero.
    p.ast.tags.push(NodeTag::Root);
    p.ast.main_token.push(0);
    p.ast.data.push(NodeData::None);

    let root_range = p.parse_top_level()?;
    p.ast.data[0] = NodeData::Range { start: root_range.0, end: root_range.1 };

    let tokens = p.tokens;
    Ok((p.ast, tokens))
}

enum ContainerFrame {
    Array {
        main_token: u32,
        children: Vec<NodeIndex>,
    },
    Object {
        main_token: u32,
        children: Vec<NodeIndex>,
        pending_name: Option<u32>,
    },
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
}

impl<'a> Parser<'a> {
    fn skip_comments(&mut self) {
        while self.tokens[self.pos].tag == TokenTag::LineComment {
            self.pos += 1;
        }
    }

    fn peek_tag(&mut self) -> TokenTag {
        self.skip_comments();
        self.tokens[self.pos].tag
    }

    fn peek2_tag(&mut self) -> TokenTag {
        self.skip_comments();
        let mut j = self.pos + 1;
        while self.tokens[j].tag == TokenTag::LineComment {
            j += 1;
        }
        self.tokens[j].tag
    }

    fn cur_offset(&mut self) -> u32 {
        self.skip_comments();
        self.tokens[self.pos].start
    }

    /// Advances past the current significant token, returning its index.
    fn advance(&mut self) -> u32 {
        self.skip_comments();
        let idx = self.pos as u32;
        self.pos += 1;
        idx
    }

    fn expect(&mut self, tag: TokenTag) -> Result<u32, ParseError> {
        if self.peek_tag() == tag {
            Ok(self.advance())
        } else {
            Err(ParseError::UnexpectedToken { offset: self.cur_offset() })
        }
    }

    fn token_text(&mut self, tok_idx: u32) -> &'a str {
        self.skip_comments();
        let tok = self.tokens[tok_idx as usize];
        let mut next = tok_idx as usize + 1;
        while self.tokens[next].tag == TokenTag::LineComment {
            next += 1;
        }
        let end = self.tokens[next].start;
        &self.source[tok.start as usize..end as usize]
    }

    fn push_node(&mut self, tag: NodeTag, main_token: u32, data: NodeData) -> NodeIndex {
        let idx = self.ast.tags.len() as NodeIndex;
        self.ast.tags.push(tag);
        self.ast.main_token.push(main_token);
        self.ast.data.push(data);
        idx
    }

    fn push_range(&mut self, items: &[NodeIndex]) -> (u32, u32) {
        let start = self.ast.extra_data.len() as u32;
        self.ast.extra_data.extend_from_slice(items);
        let end = self.ast.extra_data.len() as u32;
        (start, end)
    }

    // ---- top level -------------------------------------------------

    fn parse_top_level(&mut self) -> Result<(u32, u32), ParseError> {
        let mut macros = Vec::new();
        let mut count = 0u32;
        while self.peek_tag() != TokenTag::Eof {
            count += 1;
            if count > MAX_MACROS {
                return Err(ParseError::TooManyMacros);
            }
            macros.push(self.parse_macro()?);
        }
        Ok(self.push_range(&macros))
    }

    fn parse_macro(&mut self) -> Result<NodeIndex, ParseError> {
        let kw_tok = self.cur_offset();
        let kw = match self.peek_tag() {
            TokenTag::MacroKeyword(kw) => {
                self.advance();
                kw
            }
            _ => return Err(ParseError::UnexpectedToken { offset: kw_tok }),
        };

        if kw == MacroKeyword::Define {
            let name_tok = self.expect(TokenTag::Identifier)?;
            self.expect(TokenTag::Equals)?;
            let value = self.parse_value()?;
            return Ok(self.push_node(NodeTag::Macro(kw), name_tok, NodeData::Node(value)));
        }

        let name_tok = self.expect(TokenTag::Identifier)?;
        self.expect(TokenTag::LBrace)?;

        let mut props = Vec::new();
        let mut count = 0u32;
        loop {
            if self.peek_tag() == TokenTag::RBrace {
                self.advance();
                break;
            }
            count += 1;
            if count > MAX_PROPERTIES {
                return Err(ParseError::TooManyProperties);
            }
            props.push(self.parse_property()?);
        }
        let range = self.push_range(&props);
        Ok(self.push_node(NodeTag::Macro(kw), name_tok, NodeData::Range { start: range.0, end: range.1 }))
    }

    fn parse_property(&mut self) -> Result<NodeIndex, ParseError> {
        let name_tok = self.expect(TokenTag::Identifier)?;
        self.expect(TokenTag::Equals)?;
        let value = self.parse_value()?;
        Ok(self.push_node(NodeTag::Property, name_tok, NodeData::Node(value)))
    }

    // ---- values ------------------------------------------------------

    fn at_container_start(&mut self) -> bool {
        matches!(self.peek_tag(), TokenTag::LBrace | TokenTag::LBracket)
    }

    /// Parses any value in "expression-allowed" context (property values,
    /// `#define` values). Arrays/objects dispatch to the iterative container
    /// machine; everything else is a leaf or a full arithmetic expression.
    fn parse_value(&mut self) -> Result<NodeIndex, ParseError> {
        if self.at_container_start() {
            self.parse_container()
        } else {
            self.parse_leaf_or_expr(true)
        }
    }

    fn parse_string_leaf(&mut self) -> Result<NodeIndex, ParseError> {
        let tok = self.advance();
        let text = self.token_text(tok);
        let tag = if text.contains('$') { NodeTag::RuntimeInterpolation } else { NodeTag::StringValue };
        Ok(self.push_node(tag, tok, NodeData::None))
    }

    fn parse_bool_leaf(&mut self) -> Result<NodeIndex, ParseError> {
        let tok = self.advance();
        Ok(self.push_node(NodeTag::BooleanValue, tok, NodeData::None))
    }

    /// `canvas.<field>` / `time.<field>` -> [`NodeTag::BuiltinRef`];
    /// anything else `a.b` -> [`NodeTag::UniformAccess`] (spec §4.2).
    fn parse_dotted_ref(&mut self) -> Result<NodeIndex, ParseError> {
        let base_tok = self.advance();
        self.expect(TokenTag::Dot)?;
        let field_tok = self.expect(TokenTag::Identifier)?;
        let base_text = self.token_text(base_tok);
        let tag = if base_text == "canvas" || base_text == "time" {
            NodeTag::BuiltinRef
        } else {
            NodeTag::UniformAccess
        };
        Ok(self.push_node(tag, base_tok, NodeData::Pair(base_tok, field_tok)))
    }

    /// Leaf/expression parsing. `allow_infix` is false inside array elements
    /// (spec §4.2 array disambiguation rule): a bare number or identifier is
    /// a single element, never combined with a following `+ - * /` unless
    /// explicitly parenthesized.
    fn parse_leaf_or_expr(&mut self, allow_infix: bool) -> Result<NodeIndex, ParseError> {
        match self.peek_tag() {
            TokenTag::String => self.parse_string_leaf(),
            TokenTag::True | TokenTag::False => self.parse_bool_leaf(),
            TokenTag::LParen => self.parse_expr(0),
            TokenTag::Identifier => {
                if self.peek2_tag() == TokenTag::Dot {
                    self.parse_dotted_ref()
                } else if allow_infix {
                    self.parse_expr(0)
                } else {
                    let tok = self.advance();
                    Ok(self.push_node(NodeTag::IdentifierValue, tok, NodeData::None))
                }
            }
            TokenTag::Number => {
                if allow_infix {
                    self.parse_expr(0)
                } else {
                    let tok = self.advance();
                    Ok(self.push_node(NodeTag::NumberValue, tok, NodeData::None))
                }
            }
            TokenTag::Minus => {
                if allow_infix {
                    self.parse_expr(0)
                } else {
                    // Unary minus on a single literal; not combined with a
                    // following element (array disambiguation rule).
                    let op_tok = self.advance();
                    let operand = match self.peek_tag() {
                        TokenTag::Number => {
                            let tok = self.advance();
                            self.push_node(NodeTag::NumberValue, tok, NodeData::None)
                        }
                        TokenTag::Identifier if self.peek2_tag() != TokenTag::Dot => {
                            let tok = self.advance();
                            self.push_node(NodeTag::IdentifierValue, tok, NodeData::None)
                        }
                        _ => return Err(ParseError::UnexpectedToken { offset: self.cur_offset() }),
                    };
                    Ok(self.push_node(NodeTag::ExprNegate, op_tok, NodeData::Node(operand)))
                }
            }
            _ => Err(ParseError::UnexpectedToken { offset: self.cur_offset() }),
        }
    }

    // ---- arithmetic expressions (bounded recursion, depth-checked) ---

    fn parse_expr(&mut self, depth: u32) -> Result<NodeIndex, ParseError> {
        if depth >= MAX_EXPR_DEPTH {
            return Err(ParseError::ExprDepthExceeded);
        }
        self.parse_add_sub(depth)
    }

    fn parse_add_sub(&mut self, depth: u32) -> Result<NodeIndex, ParseError> {
        let mut lhs = self.parse_mul_div(depth + 1)?;
        loop {
            match self.peek_tag() {
                TokenTag::Plus => {
                    let op = self.advance();
                    let rhs = self.parse_mul_div(depth + 1)?;
                    lhs = self.push_node(NodeTag::ExprAdd, op, NodeData::Pair(lhs, rhs));
                }
                TokenTag::Minus => {
                    let op = self.advance();
                    let rhs = self.parse_mul_div(depth + 1)?;
                    lhs = self.push_node(NodeTag::ExprSub, op, NodeData::Pair(lhs, rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_mul_div(&mut self, depth: u32) -> Result<NodeIndex, ParseError> {
        let mut lhs = self.parse_unary(depth + 1)?;
        loop {
            match self.peek_tag() {
                TokenTag::Star => {
                    let op = self.advance();
                    let rhs = self.parse_unary(depth + 1)?;
                    lhs = self.push_node(NodeTag::ExprMul, op, NodeData::Pair(lhs, rhs));
                }
                TokenTag::Slash => {
                    let op = self.advance();
                    let rhs = self.parse_unary(depth + 1)?;
                    lhs = self.push_node(NodeTag::ExprDiv, op, NodeData::Pair(lhs, rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, depth: u32) -> Result<NodeIndex, ParseError> {
        if depth >= MAX_EXPR_DEPTH {
            return Err(ParseError::ExprDepthExceeded);
        }
        if self.peek_tag() == TokenTag::Minus {
            let op = self.advance();
            let operand = self.parse_unary(depth + 1)?;
            Ok(self.push_node(NodeTag::ExprNegate, op, NodeData::Node(operand)))
        } else {
            self.parse_primary(depth + 1)
        }
    }

    fn parse_primary(&mut self, depth: u32) -> Result<NodeIndex, ParseError> {
        if depth >= MAX_EXPR_DEPTH {
            return Err(ParseError::ExprDepthExceeded);
        }
        match self.peek_tag() {
            TokenTag::LParen => {
                self.advance();
                let inner = self.parse_expr(depth + 1)?;
                self.expect(TokenTag::RParen)?;
                Ok(inner)
            }
            TokenTag::Number => {
                let tok = self.advance();
                Ok(self.push_node(NodeTag::NumberValue, tok, NodeData::None))
            }
            TokenTag::Identifier => {
                let tok = self.advance();
                Ok(self.push_node(NodeTag::IdentifierValue, tok, NodeData::None))
            }
            _ => Err(ParseError::UnexpectedToken { offset: self.cur_offset() }),
        }
    }

    // ---- containers: iterative, no native recursion -------------------

    fn parse_container(&mut self) -> Result<NodeIndex, ParseError> {
        let mut stack: Vec<ContainerFrame> = Vec::new();
        self.open_frame(&mut stack)?;
        let mut iterations = 0u32;

        loop {
            iterations += 1;
            if iterations > MAX_PARSE_ITERATIONS {
                return Err(ParseError::TooManyIterations);
            }

            let is_array = matches!(stack.last(), Some(ContainerFrame::Array { .. }));
            if is_array {
                if self.peek_tag() == TokenTag::RBracket {
                    self.advance();
                    let (main_token, children) = match stack.pop().unwrap() {
                        ContainerFrame::Array { main_token, children } => (main_token, children),
                        _ => unreachable!(),
                    };
                    let range = self.push_range(&children);
                    let node = self.push_node(NodeTag::Array, main_token, NodeData::Range { start: range.0, end: range.1 });
                    if stack.is_empty() {
                        return Ok(node);
                    }
                    self.deliver(&mut stack, node);
                } else if self.at_container_start() {
                    self.open_frame(&mut stack)?;
                } else {
                    let v = self.parse_leaf_or_expr(false)?;
                    if let Some(ContainerFrame::Array { children, .. }) = stack.last_mut() {
                        children.push(v);
                    }
                }
                continue;
            }

            // Object frame.
            let closing = self.peek_tag() == TokenTag::RBrace
                && matches!(stack.last(), Some(ContainerFrame::Object { pending_name: None, .. }));
            if closing {
                self.advance();
                let (main_token, children) = match stack.pop().unwrap() {
                    ContainerFrame::Object { main_token, children, .. } => (main_token, children),
                    _ => unreachable!(),
                };
                let range = self.push_range(&children);
                let node = self.push_node(NodeTag::Object, main_token, NodeData::Range { start: range.0, end: range.1 });
                if stack.is_empty() {
                    return Ok(node);
                }
                self.deliver(&mut stack, node);
                continue;
            }

            let has_pending = matches!(stack.last(), Some(ContainerFrame::Object { pending_name: Some(_), .. }));
            if !has_pending {
                // Expect `identifier = value`.
                let name_tok = self.expect(TokenTag::Identifier)?;
                self.expect(TokenTag::Equals)?;
                if let Some(ContainerFrame::Object { pending_name, .. }) = stack.last_mut() {
                    *pending_name = Some(name_tok);
                }
            }

            if self.at_container_start() {
                self.open_frame(&mut stack)?;
            } else {
                let v = self.parse_leaf_or_expr(true)?;
                self.finish_property(&mut stack, v);
            }
        }
    }

    fn open_frame(&mut self, stack: &mut Vec<ContainerFrame>) -> Result<(), ParseError> {
        match self.peek_tag() {
            TokenTag::LBracket => {
                let tok = self.advance();
                stack.push(ContainerFrame::Array { main_token: tok, children: Vec::new() });
                Ok(())
            }
            TokenTag::LBrace => {
                let tok = self.advance();
                stack.push(ContainerFrame::Object { main_token: tok, children: Vec::new(), pending_name: None });
                Ok(())
            }
            _ => Err(ParseError::UnexpectedToken { offset: self.cur_offset() }),
        }
    }

    /// Attaches a just-closed container's node to whichever frame now sits
    /// on top of the stack (an array element, or a pending property value).
    fn deliver(&mut self, stack: &mut Vec<ContainerFrame>, node: NodeIndex) {
        let is_object = matches!(stack.last(), Some(ContainerFrame::Object { .. }));
        if is_object {
            self.finish_property(stack, node);
        } else if let Some(ContainerFrame::Array { children, .. }) = stack.last_mut() {
            children.push(node);
        }
    }

    fn finish_property(&mut self, stack: &mut Vec<ContainerFrame>, value: NodeIndex) {
        if let Some(ContainerFrame::Object { pending_name, children, .. }) = stack.last_mut() {
            let name_tok = pending_name.take().expect("finish_property called without a pending name");
            let prop = self.push_node(NodeTag::Property, name_tok, NodeData::Node(value));
            children.push(prop);
        }
    }
}
