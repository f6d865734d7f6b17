//! Template token scanning.
//!
//! Step templates use single-brace tokens: `{colors}` refers to a word-list
//! while authoring, and after slot assignment the same syntax carries index
//! markers (`{0}`, `{1}`, ...). Both passes share the scanner below.

/// Rewrite every `{token}` occurrence in `template`, left to right, by calling
/// `replace` with the token content (the text between the braces).
///
/// Notes:
/// - Tokens are non-greedy: the token ends at the first `}` after its `{`.
/// - A `{` with no closing `}` is passed through verbatim along with the rest
///   of the template.
/// - A token spanning a newline is not a token; the `{` is passed through and
///   scanning resumes after it.
/// - The first error returned by `replace` aborts the rewrite.
pub fn rewrite_tokens<E, F>(template: &str, mut replace: F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut idx = 0;

    while let Some(start) = find_byte(bytes, b'{', idx) {
        // Push everything up to the start of the token
        out.push_str(&template[idx..start]);

        match find_byte(bytes, b'}', start + 1) {
            Some(end) => {
                let content = &template[start + 1..end];
                if content.contains('\n') {
                    // Not a token; emit the brace and rescan right after it.
                    out.push('{');
                    idx = start + 1;
                } else {
                    out.push_str(&replace(content)?);
                    idx = end + 1;
                }
            }
            None => {
                // No matching end, push rest and stop
                out.push_str(&template[start..]);
                idx = template.len();
                break;
            }
        }
    }

    // Push any trailing text
    if idx < template.len() {
        out.push_str(&template[idx..]);
    }

    Ok(out)
}

/// Count the `{token}` occurrences in `template` without rewriting.
pub fn count_tokens(template: &str) -> usize {
    let mut n = 0;
    // Infallible rewrite; the output is discarded.
    let _ = rewrite_tokens::<std::convert::Infallible, _>(template, |_| {
        n += 1;
        Ok(String::new())
    });
    n
}

/// Find the first occurrence of `needle` in `haystack` starting at `from`.
fn find_byte(haystack: &[u8], needle: u8, from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(template: &str) -> String {
        rewrite_tokens::<std::convert::Infallible, _>(template, |t| Ok(t.to_uppercase())).unwrap()
    }

    #[test]
    fn rewrites_each_token_in_order() {
        assert_eq!(upper("{a} and {b}"), "A and B");
    }

    #[test]
    fn empty_token_is_still_a_token() {
        let mut seen = Vec::new();
        let out = rewrite_tokens::<std::convert::Infallible, _>("x{}y", |t| {
            seen.push(t.to_owned());
            Ok("_".into())
        })
        .unwrap();
        assert_eq!(out, "x_y");
        assert_eq!(seen, vec![""]);
    }

    #[test]
    fn unmatched_open_brace_passes_through() {
        assert_eq!(upper("tail {unclosed"), "tail {unclosed");
    }

    #[test]
    fn token_ends_at_first_closing_brace() {
        // The scanner is non-greedy: "{a{b}" is one token with content "a{b".
        let out = rewrite_tokens::<std::convert::Infallible, _>("{a{b}", |t| {
            assert_eq!(t, "a{b");
            Ok("x".into())
        })
        .unwrap();
        assert_eq!(out, "x");
    }

    #[test]
    fn newline_inside_braces_is_not_a_token() {
        assert_eq!(upper("{a\nb}{c}"), "{a\nb}C");
    }

    #[test]
    fn errors_abort_the_rewrite() {
        let res = rewrite_tokens("{a}{b}", |t| {
            if t == "b" {
                Err("boom")
            } else {
                Ok(String::new())
            }
        });
        assert_eq!(res.unwrap_err(), "boom");
    }

    #[test]
    fn counts_tokens() {
        assert_eq!(count_tokens("no tokens here"), 0);
        assert_eq!(count_tokens("{a} {a} {b}"), 3);
    }
}
