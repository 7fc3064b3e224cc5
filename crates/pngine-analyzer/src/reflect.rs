/// One `@group(N) @binding(M) var<...> name : Type;` declaration found by
/// scanning WGSL source text (spec §4.3 phase 5). No WGSL parser dependency:
/// the grammar we need is a single regular statement shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUniform {
    pub bind_group: u32,
    pub binding: u32,
    pub var_name: String,
}

/// Scans `source` for `@group(N) @binding(M) var<storage|uniform,...> name : Type;`
/// declarations, in source order. Malformed matches (non-numeric group/binding,
/// missing `var`) are skipped rather than erroring: reflection is advisory,
/// final validation happens when a `UniformAccess` node resolves against the
/// returned list.
pub fn reflect_bindings(source: &str) -> Vec<ResolvedUniform> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(rel) = find_from(bytes, i, b"@group") {
        let mut cur = rel + b"@group".len();
        let group = match parse_paren_int(bytes, &mut cur) {
            Some(v) => v,
            None => {
                tracing::warn!(offset = rel, "@group without a parseable integer argument, skipping reflection match");
                i = rel + 1;
                continue;
            }
        };
        cur = skip_ws(bytes, cur);
        if !bytes[cur..].starts_with(b"@binding") {
            tracing::warn!(offset = rel, "@group not immediately followed by @binding, skipping reflection match");
            i = rel + 1;
            continue;
        }
        cur += b"@binding".len();
        let binding = match parse_paren_int(bytes, &mut cur) {
            Some(v) => v,
            None => {
                tracing::warn!(offset = rel, "@binding without a parseable integer argument, skipping reflection match");
                i = rel + 1;
                continue;
            }
        };
        cur = skip_ws(bytes, cur);
        if !bytes[cur..].starts_with(b"var") {
            tracing::warn!(offset = rel, "@group/@binding not followed by a var declaration, skipping reflection match");
            i = rel + 1;
            continue;
        }
        cur += 3;
        // Optional `<address_space, access_mode>`.
        cur = skip_ws(bytes, cur);
        if bytes.get(cur) == Some(&b'<') {
            match find_from(bytes, cur, b">") {
                Some(close) => cur = close + 1,
                None => {
                    i = rel + 1;
                    continue;
                }
            }
        }
        cur = skip_ws(bytes, cur);
        let name_start = cur;
        while cur < bytes.len() && is_ident_byte(bytes[cur]) {
            cur += 1;
        }
        if cur == name_start {
            i = rel + 1;
            continue;
        }
        let var_name = source[name_start..cur].to_string();
        out.push(ResolvedUniform { bind_group: group, binding, var_name });
        i = cur;
    }
    out
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn find_from(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Parses `(<digits>)` starting at `*cur` (which must point just past the
/// preceding keyword, whitespace allowed before `(`), advancing `*cur` past
/// the closing paren on success.
fn parse_paren_int(bytes: &[u8], cur: &mut usize) -> Option<u32> {
    let mut i = skip_ws(bytes, *cur);
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    i += 1;
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start || bytes.get(i) != Some(&b')') {
        return None;
    }
    let value: u32 = std::str::from_utf8(&bytes[digits_start..i]).ok()?.parse().ok()?;
    *cur = i + 1;
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_binding() {
        let src = "@group(1) @binding(2) var<uniform> cam : Camera;";
        let found = reflect_bindings(src);
        assert_eq!(found, vec![ResolvedUniform { bind_group: 1, binding: 2, var_name: "cam".into() }]);
    }

    #[test]
    fn finds_multiple_bindings_in_order() {
        let src = r#"
            @group(0) @binding(0) var<storage, read> particles : array<Particle>;
            @group(0) @binding(1) var samp : sampler;
        "#;
        let found = reflect_bindings(src);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].var_name, "particles");
        assert_eq!(found[1].var_name, "samp");
    }

    #[test]
    fn ignores_unrelated_at_attributes() {
        let src = "@vertex fn main() {}";
        assert!(reflect_bindings(src).is_empty());
    }
}
