//! Redis-style glob matching for the in-memory store.
//!
//! Supports `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes, the same
//! subset `SCAN ... MATCH` understands.

/// Returns true if `text` matches `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` and the text index it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        if pi < pattern.len() && pattern[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
            continue;
        }

        if pi < pattern.len() {
            if let Some(next) = match_single(&pattern, pi, text[ti]) {
                pi = next;
                ti += 1;
                continue;
            }
        }

        match backtrack {
            Some((star, absorbed)) => {
                pi = star + 1;
                ti = absorbed + 1;
                backtrack = Some((star, absorbed + 1));
            }
            None => return false,
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}

/// Matches the single-character token at `pattern[pi]` against `c`.
///
/// Returns the index after the token on success.
fn match_single(pattern: &[char], pi: usize, c: char) -> Option<usize> {
    match pattern[pi] {
        '?' => Some(pi + 1),
        '[' => {
            let (matched, next) = match_class(pattern, pi, c);
            matched.then_some(next)
        }
        '\\' if pi + 1 < pattern.len() => (pattern[pi + 1] == c).then_some(pi + 2),
        literal => (literal == c).then_some(pi + 1),
    }
}

/// Matches a `[...]` class starting at `pattern[start]`.
///
/// An unterminated class extends to the end of the pattern.
fn match_class(pattern: &[char], start: usize, c: char) -> (bool, usize) {
    let mut i = start + 1;
    let negate = pattern.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        if pattern[i] == '\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (mut lo, mut hi) = (pattern[i], pattern[i + 2]);
            if lo > hi {
                std::mem::swap(&mut lo, &mut hi);
            }
            matched |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    // Skip the closing bracket if present.
    let next = if i < pattern.len() { i + 1 } else { i };
    (matched != negate, next)
}
