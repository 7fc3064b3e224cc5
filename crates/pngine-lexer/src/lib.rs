//! Tokenizer for PBSF source text.
//!
//! A single forward pass with one byte of lookahead turns source bytes into a
//! flat sequence of [`Token`]s (tag + start offset). A token's end is implied
//! by the next token's start; the final token is always [`TokenTag::Eof`].

use thiserror::Error;

/// One of the fixed macro keywords recognized after a leading `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKeyword {
    Wgsl,
    ShaderModule,
    Buffer,
    Texture,
    Sampler,
    BindGroup,
    BindGroupLayout,
    PipelineLayout,
    RenderPipeline,
    ComputePipeline,
    RenderPass,
    ComputePass,
    RenderBundle,
    Frame,
    Data,
    Queue,
    ImageBitmap,
    WasmCall,
    QuerySet,
    TextureView,
    Animation,
    Define,
}

impl MacroKeyword {
    /// Exact-match lookup against the compile-time keyword set. `name` is the
    /// identifier text following `#` (not including the `#` itself).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "wgsl" => Self::Wgsl,
            "shaderModule" => Self::ShaderModule,
            "buffer" => Self::Buffer,
            "texture" => Self::Texture,
            "sampler" => Self::Sampler,
            "bindGroup" => Self::BindGroup,
            "bindGroupLayout" => Self::BindGroupLayout,
            "pipelineLayout" => Self::PipelineLayout,
            "renderPipeline" => Self::RenderPipeline,
            "computePipeline" => Self::ComputePipeline,
            "renderPass" => Self::RenderPass,
            "computePass" => Self::ComputePass,
            "renderBundle" => Self::RenderBundle,
            "frame" => Self::Frame,
            "data" => Self::Data,
            "queue" => Self::Queue,
            "imageBitmap" => Self::ImageBitmap,
            "wasmCall" => Self::WasmCall,
            "querySet" => Self::QuerySet,
            "textureView" => Self::TextureView,
            "animation" => Self::Animation,
            "define" => Self::Define,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTag {
    MacroKeyword(MacroKeyword),
    Identifier,
    /// Decimal or `0x`-hex integer/float literal, or one of `PI`/`E`/`TAU`.
    Number,
    /// Double-quoted string; `start` points at the opening `"`.
    String,
    True,
    False,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Equals,
    Dot,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    /// `// ...` to end of line, kept as a real token so the parser can skip
    /// it structurally rather than the lexer swallowing it silently.
    LineComment,
    /// An unrecognized character, or `#` not followed by a known keyword.
    Invalid,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub tag: TokenTag,
    pub start: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated string literal starting at byte {start}")]
    UnterminatedString { start: u32 },
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Tokenizes `source`, appending a final [`TokenTag::Eof`] token.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < len {
        let b = bytes[i];
        let start = i as u32;

        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        match b {
            b'{' => {
                tokens.push(Token { tag: TokenTag::LBrace, start });
                i += 1;
            }
            b'}' => {
                tokens.push(Token { tag: TokenTag::RBrace, start });
                i += 1;
            }
            b'[' => {
                tokens.push(Token { tag: TokenTag::LBracket, start });
                i += 1;
            }
            b']' => {
                tokens.push(Token { tag: TokenTag::RBracket, start });
                i += 1;
            }
            b'(' => {
                tokens.push(Token { tag: TokenTag::LParen, start });
                i += 1;
            }
            b')' => {
                tokens.push(Token { tag: TokenTag::RParen, start });
                i += 1;
            }
            b'=' => {
                tokens.push(Token { tag: TokenTag::Equals, start });
                i += 1;
            }
            b'.' => {
                tokens.push(Token { tag: TokenTag::Dot, start });
                i += 1;
            }
            b',' => {
                tokens.push(Token { tag: TokenTag::Comma, start });
                i += 1;
            }
            b'+' => {
                tokens.push(Token { tag: TokenTag::Plus, start });
                i += 1;
            }
            b'-' => {
                tokens.push(Token { tag: TokenTag::Minus, start });
                i += 1;
            }
            b'*' => {
                tokens.push(Token { tag: TokenTag::Star, start });
                i += 1;
            }
            b'/' => {
                if i + 1 < len && bytes[i + 1] == b'/' {
                    tokens.push(Token { tag: TokenTag::LineComment, start });
                    i += 2;
                    while i < len && bytes[i] != b'\n' {
                        i += 1;
                    }
                } else {
                    tokens.push(Token { tag: TokenTag::Slash, start });
                    i += 1;
                }
            }
            b'#' => {
                let name_start = i + 1;
                let mut j = name_start;
                while j < len && is_ident_continue(bytes[j]) {
                    j += 1;
                }
                let name = &source[name_start..j];
                match MacroKeyword::from_name(name) {
                    Some(kw) => tokens.push(Token { tag: TokenTag::MacroKeyword(kw), start }),
                    None => tokens.push(Token { tag: TokenTag::Invalid, start }),
                }
                i = j;
            }
            b'"' => {
                let mut j = i + 1;
                let mut closed = false;
                while j < len {
                    match bytes[j] {
                        b'\\' if j + 1 < len => j += 2,
                        b'"' => {
                            closed = true;
                            j += 1;
                            break;
                        }
                        _ => j += 1,
                    }
                }
                if !closed {
                    return Err(LexError::UnterminatedString { start });
                }
                tokens.push(Token { tag: TokenTag::String, start });
                i = j;
            }
            b'0'..=b'9' => {
                let mut j = i;
                if bytes[j] == b'0' && j + 1 < len && (bytes[j + 1] == b'x' || bytes[j + 1] == b'X') {
                    j += 2;
                    while j < len && bytes[j].is_ascii_hexdigit() {
                        j += 1;
                    }
                } else {
                    while j < len && bytes[j].is_ascii_digit() {
                        j += 1;
                    }
                    if j < len && bytes[j] == b'.' && j + 1 < len && bytes[j + 1].is_ascii_digit() {
                        j += 1;
                        while j < len && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                    }
                    if j < len && (bytes[j] == b'e' || bytes[j] == b'E') {
                        let mut k = j + 1;
                        if k < len && (bytes[k] == b'+' || bytes[k] == b'-') {
                            k += 1;
                        }
                        if k < len && bytes[k].is_ascii_digit() {
                            j = k;
                            while j < len && bytes[j].is_ascii_digit() {
                                j += 1;
                            }
                        }
                    }
                }
                tokens.push(Token { tag: TokenTag::Number, start });
                i = j;
            }
            _ if is_ident_start(b) => {
                let mut j = i;
                while j < len && is_ident_continue(bytes[j]) {
                    j += 1;
                }
                let word = &source[i..j];
                let tag = match word {
                    "true" => TokenTag::True,
                    "false" => TokenTag::False,
                    "PI" | "E" | "TAU" => TokenTag::Number,
                    _ => TokenTag::Identifier,
                };
                tokens.push(Token { tag, start });
                i = j;
            }
            _ => {
                tokens.push(Token { tag: TokenTag::Invalid, start });
                i += 1;
            }
        }
    }

    tokens.push(Token { tag: TokenTag::Eof, start: len as u32 });
    Ok(tokens)
}

/// Returns the source slice covered by `token`, given the index of the token
/// immediately following it (its end is implied by the next token's start).
pub fn token_text<'a>(source: &'a str, token: Token, next_start: u32) -> &'a str {
    &source[token.start as usize..next_start as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(source: &str) -> Vec<TokenTag> {
        lex(source).unwrap().into_iter().map(|t| t.tag).collect()
    }

    #[test]
    fn lexes_macro_keyword_and_braces() {
        let toks = tags("#buffer b { size=1 }");
        assert_eq!(
            toks,
            vec![
                TokenTag::MacroKeyword(MacroKeyword::Buffer),
                TokenTag::Identifier,
                TokenTag::LBrace,
                TokenTag::Identifier,
                TokenTag::Equals,
                TokenTag::Number,
                TokenTag::RBrace,
                TokenTag::Eof,
            ]
        );
    }

    #[test]
    fn unknown_hash_keyword_is_invalid() {
        let toks = tags("#bogus x {}");
        assert_eq!(toks[0], TokenTag::Invalid);
    }

    #[test]
    fn line_comment_is_its_own_token() {
        let toks = tags("// hi\n#frame f {}");
        assert_eq!(toks[0], TokenTag::LineComment);
        assert_eq!(toks[1], TokenTag::MacroKeyword(MacroKeyword::Frame));
    }

    #[test]
    fn unterminated_string_errors() {
        let err = lex("#wgsl s { value=\"abc }").unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { start: 16 });
    }

    #[test]
    fn hex_and_decimal_numbers() {
        let toks = tags("0x1F 3.5 42 PI");
        assert_eq!(
            toks,
            vec![TokenTag::Number, TokenTag::Number, TokenTag::Number, TokenTag::Number, TokenTag::Eof]
        );
    }

    #[test]
    fn negative_number_list_is_four_tokens_wide() {
        // The lexer only sees `-` as its own token; disambiguation of
        // `[1 -1 2 -2]` into four array elements is the parser's job (spec
        // §4.2), but the lexer must at least hand it distinct minus tokens.
        let toks = tags("[1 -1 2 -2]");
        assert_eq!(
            toks,
            vec![
                TokenTag::LBracket,
                TokenTag::Number,
                TokenTag::Minus,
                TokenTag::Number,
                TokenTag::Number,
                TokenTag::Minus,
                TokenTag::Number,
                TokenTag::RBracket,
                TokenTag::Eof,
            ]
        );
    }
}
