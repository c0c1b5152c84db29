//! String comparison and hashing helpers shared by the matcher, the rule
//! engine and the language code.
//!
//! All comparisons fold ASCII case only; font metadata is overwhelmingly
//! ASCII and the comparison has to be stable across locales.

use core::cmp::Ordering;

use globset::GlobBuilder;

#[inline]
fn skip_blanks(mut it: impl Iterator<Item = u8>) -> impl Iterator<Item = u8> {
    core::iter::from_fn(move || it.by_ref().find(|&c| c != b' '))
}

fn cmp_folded(a: impl Iterator<Item = u8>, b: impl Iterator<Item = u8>) -> Ordering {
    a.map(|c| c.to_ascii_lowercase())
        .cmp(b.map(|c| c.to_ascii_lowercase()))
}

/// Case-insensitive ordering.
pub fn FcStrCmpIgnoreCase(a: &str, b: &str) -> Ordering {
    cmp_folded(a.bytes(), b.bytes())
}

/// Case-insensitive ordering that also ignores spaces ("DejaVu Sans" == "dejavusans").
pub fn FcStrCmpIgnoreBlanksAndCase(a: &str, b: &str) -> Ordering {
    cmp_folded(skip_blanks(a.bytes()), skip_blanks(b.bytes()))
}

/// Returns the byte offset of the first case-insensitive occurrence of `needle` in `haystack`.
pub fn FcStrStrIgnoreCase(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() {
        return Some(0);
    }
    if n.len() > h.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Counts how many bytes of `s1` match `s2` before the first difference,
/// ignoring case and skipping any byte in `delims` on both sides.
pub fn FcStrMatchIgnoreCaseAndDelims(s1: &str, s2: &str, delims: &[u8]) -> usize {
    let a = s1.as_bytes();
    let b = s2.as_bytes();
    let (mut i, mut j) = (0, 0);
    loop {
        while i < a.len() && delims.contains(&a[i]) {
            i += 1;
        }
        while j < b.len() && delims.contains(&b[j]) {
            j += 1;
        }
        if i >= a.len() || j >= b.len() {
            return i;
        }
        if !a[i].eq_ignore_ascii_case(&b[j]) {
            return i;
        }
        i += 1;
        j += 1;
    }
}

/// Shell-style glob match (`*`, `?`, `[...]`). Wildcards cross `/`.
pub fn FcStrGlobMatch(glob: &str, s: &str) -> bool {
    match GlobBuilder::new(glob).literal_separator(false).build() {
        Ok(g) => g.compile_matcher().is_match(s),
        Err(e) => {
            log::debug!("invalid glob {:?}: {}", glob, e);
            false
        }
    }
}

#[inline]
fn hash_step(h: u32, c: u8) -> u32 {
    ((h << 3) ^ (h >> 3)).wrapping_add(u32::from(c))
}

pub fn FcStrHashIgnoreCase(s: &str) -> u32 {
    s.bytes()
        .fold(0, |h, c| hash_step(h, c.to_ascii_lowercase()))
}

/// Hash consistent with [`FcStrCmpIgnoreBlanksAndCase`].
pub fn FcStrHashIgnoreBlanksAndCase(s: &str) -> u32 {
    skip_blanks(s.bytes()).fold(0, |h, c| hash_step(h, c.to_ascii_lowercase()))
}
