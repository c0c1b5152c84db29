//! Sparse Unicode coverage sets.
//!
//! A charset is an ordered array of 256-codepoint pages. Each page holds a
//! shared, copy-on-write [`FcCharLeaf`] bitmap, so charsets that were frozen
//! for a cache can share identical leaves with each other.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::hash::{Hash, Hasher};
use std::collections::HashMap;

/// Highest code point a charset can address (16-bit page number).
pub const FC_CHARSET_MAX: u32 = 0x00FF_FFFF;

/// One page of coverage: 256 consecutive code points as eight 32-bit words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcCharLeaf {
    pub map: [u32; 8],
}

impl FcCharLeaf {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.iter().all(|&w| w == 0)
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.map.iter().map(|w| w.count_ones()).sum()
    }

    /// Rotating xor hash over the eight words.
    pub fn hash32(&self) -> u32 {
        self.map
            .iter()
            .fold(0u32, |h, &w| h.rotate_left(1) ^ w)
    }

    fn zip(&self, other: &FcCharLeaf, f: impl Fn(u32, u32) -> u32) -> FcCharLeaf {
        let mut map = [0u32; 8];
        for (i, w) in map.iter_mut().enumerate() {
            *w = f(self.map[i], other.map[i]);
        }
        FcCharLeaf { map }
    }
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcCharSet {
    // (page number, leaf); page numbers strictly increasing
    pages: Vec<(u16, Arc<FcCharLeaf>)>,
}

#[inline]
fn page_of(ucs4: u32) -> u16 {
    (ucs4 >> 8) as u16
}

#[inline]
fn bit_of(ucs4: u32) -> (usize, u32) {
    (((ucs4 >> 5) & 7) as usize, 1u32 << (ucs4 & 0x1f))
}

impl FcCharSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a charset from an iterator of code points, silently skipping
    /// anything above [`FC_CHARSET_MAX`].
    pub fn from_chars<I: IntoIterator<Item = u32>>(chars: I) -> Self {
        let mut cs = Self::new();
        for c in chars {
            cs.add_char(c);
        }
        cs
    }

    /// Builds a charset from inclusive code point ranges.
    pub fn from_ranges(ranges: &[(u32, u32)]) -> Self {
        Self::from_chars(ranges.iter().flat_map(|&(a, b)| a..=b))
    }

    /// Number of pages physically present, including emptied ones.
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// Binary search over the page array.
    fn find_leaf_pos(&self, page: u16) -> Result<usize, usize> {
        self.pages.binary_search_by_key(&page, |(p, _)| *p)
    }

    pub fn find_leaf(&self, ucs4: u32) -> Option<&FcCharLeaf> {
        self.find_leaf_pos(page_of(ucs4))
            .ok()
            .map(|i| &*self.pages[i].1)
    }

    fn find_leaf_create(&mut self, ucs4: u32) -> &mut FcCharLeaf {
        let page = page_of(ucs4);
        let pos = match self.find_leaf_pos(page) {
            Ok(pos) => pos,
            Err(pos) => {
                self.pages.insert(pos, (page, Arc::new(FcCharLeaf::default())));
                pos
            }
        };
        Arc::make_mut(&mut self.pages[pos].1)
    }

    /// Inserts a whole leaf at `page`, replacing any existing one.
    pub(crate) fn put_leaf(&mut self, page: u16, leaf: Arc<FcCharLeaf>) {
        match self.find_leaf_pos(page) {
            Ok(pos) => self.pages[pos].1 = leaf,
            Err(pos) => self.pages.insert(pos, (page, leaf)),
        }
    }

    pub(crate) fn raw_pages(&self) -> &[(u16, Arc<FcCharLeaf>)] {
        &self.pages
    }

    pub fn add_char(&mut self, ucs4: u32) -> bool {
        if ucs4 > FC_CHARSET_MAX {
            return false;
        }
        let (word, bit) = bit_of(ucs4);
        self.find_leaf_create(ucs4).map[word] |= bit;
        true
    }

    /// Clears a code point. Emptied leaves stay in the page array.
    pub fn del_char(&mut self, ucs4: u32) -> bool {
        if ucs4 > FC_CHARSET_MAX {
            return false;
        }
        let (word, bit) = bit_of(ucs4);
        if let Ok(pos) = self.find_leaf_pos(page_of(ucs4)) {
            if self.pages[pos].1.map[word] & bit != 0 {
                Arc::make_mut(&mut self.pages[pos].1).map[word] &= !bit;
            }
        }
        true
    }

    pub fn has_char(&self, ucs4: u32) -> bool {
        if ucs4 > FC_CHARSET_MAX {
            return false;
        }
        let (word, bit) = bit_of(ucs4);
        self.find_leaf(ucs4)
            .map(|l| l.map[word] & bit != 0)
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|(_, l)| l.is_empty())
    }

    /// Number of code points in the set.
    pub fn count(&self) -> u32 {
        self.pages.iter().map(|(_, l)| l.count()).sum()
    }

    /// Merge-walks both page arrays. `overlap` combines leaves present on both
    /// sides; `a_only`/`b_only` decide whether single-sided leaves are kept.
    fn operate(
        a: &FcCharSet,
        b: &FcCharSet,
        overlap: impl Fn(u32, u32) -> u32,
        a_only: bool,
        b_only: bool,
    ) -> FcCharSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.pages.len() || j < b.pages.len() {
            let pa = a.pages.get(i).map(|(p, _)| *p);
            let pb = b.pages.get(j).map(|(p, _)| *p);
            match (pa, pb) {
                (Some(x), Some(y)) if x == y => {
                    let leaf = a.pages[i].1.zip(&b.pages[j].1, &overlap);
                    if !leaf.is_empty() {
                        out.push((x, Arc::new(leaf)));
                    }
                    i += 1;
                    j += 1;
                }
                (Some(x), Some(y)) if x < y => {
                    if a_only && !a.pages[i].1.is_empty() {
                        out.push(a.pages[i].clone());
                    }
                    i += 1;
                }
                (Some(_), None) => {
                    if a_only && !a.pages[i].1.is_empty() {
                        out.push(a.pages[i].clone());
                    }
                    i += 1;
                }
                _ => {
                    if b_only && !b.pages[j].1.is_empty() {
                        out.push(b.pages[j].clone());
                    }
                    j += 1;
                }
            }
        }
        FcCharSet { pages: out }
    }

    pub fn union(&self, other: &FcCharSet) -> FcCharSet {
        Self::operate(self, other, |a, b| a | b, true, true)
    }

    pub fn intersect(&self, other: &FcCharSet) -> FcCharSet {
        Self::operate(self, other, |a, b| a & b, false, false)
    }

    /// Code points in `self` that are not in `other`.
    pub fn subtract(&self, other: &FcCharSet) -> FcCharSet {
        Self::operate(self, other, |a, b| a & !b, true, false)
    }

    /// Adds every code point of `other` to `self` in place.
    /// Returns whether `self` gained anything.
    pub fn merge(&mut self, other: &FcCharSet) -> bool {
        let mut changed = false;
        for (page, leaf) in &other.pages {
            if leaf.is_empty() {
                continue;
            }
            match self.find_leaf_pos(*page) {
                Ok(pos) => {
                    let mine = &self.pages[pos].1;
                    let merged = mine.zip(leaf, |a, b| a | b);
                    if merged != **mine {
                        self.pages[pos].1 = Arc::new(merged);
                        changed = true;
                    }
                }
                Err(pos) => {
                    self.pages.insert(pos, (*page, Arc::clone(leaf)));
                    changed = true;
                }
            }
        }
        changed
    }

    fn walk_count(&self, other: &FcCharSet, f: impl Fn(u32, Option<u32>) -> u32) -> u32 {
        let mut count = 0;
        for (page, leaf) in &self.pages {
            let theirs = other.find_leaf_pos(*page).ok().map(|p| &other.pages[p].1);
            for w in 0..8 {
                count += f(leaf.map[w], theirs.map(|l| l.map[w])).count_ones();
            }
        }
        count
    }

    pub fn intersect_count(&self, other: &FcCharSet) -> u32 {
        self.walk_count(other, |a, b| a & b.unwrap_or(0))
    }

    /// Number of code points in `self` missing from `other`.
    pub fn subtract_count(&self, other: &FcCharSet) -> u32 {
        self.walk_count(other, |a, b| a & !b.unwrap_or(0))
    }

    /// Whether every code point of `self` is in `other`.
    pub fn is_subset(&self, other: &FcCharSet) -> bool {
        self.pages.iter().all(|(page, leaf)| {
            if leaf.is_empty() {
                return true;
            }
            match other.find_leaf_pos(*page) {
                Ok(pos) => {
                    let theirs = &other.pages[pos].1;
                    (0..8).all(|w| leaf.map[w] & !theirs.map[w] == 0)
                }
                Err(_) => false,
            }
        })
    }

    /// Coverage bitmap of the page containing `ucs4`.
    pub fn coverage(&self, ucs4: u32) -> Option<[u32; 8]> {
        self.find_leaf(ucs4).map(|l| l.map)
    }

    /// Starts a page walk: returns the base code point and bitmap of the first
    /// non-empty page, and writes the cursor for [`next_page`](Self::next_page).
    pub fn first_page(&self, next: &mut usize) -> Option<(u32, [u32; 8])> {
        *next = 0;
        self.next_page(next)
    }

    pub fn next_page(&self, next: &mut usize) -> Option<(u32, [u32; 8])> {
        while *next < self.pages.len() {
            let (page, leaf) = &self.pages[*next];
            *next += 1;
            if !leaf.is_empty() {
                return Some((u32::from(*page) << 8, leaf.map));
            }
        }
        None
    }

    /// Iterates non-empty pages as `(base code point, bitmap)`.
    pub fn pages(&self) -> impl Iterator<Item = (u32, &FcCharLeaf)> + '_ {
        self.pages
            .iter()
            .filter(|(_, l)| !l.is_empty())
            .map(|(p, l)| (u32::from(*p) << 8, &**l))
    }

    /// Iterates every code point in ascending order.
    pub fn chars(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages().flat_map(|(base, leaf)| {
            (0..256u32).filter(move |&i| leaf.map[(i >> 5) as usize] & (1 << (i & 31)) != 0)
                .map(move |i| base + i)
        })
    }

    /// Content hash; empty leaves do not contribute.
    pub fn hash32(&self) -> u32 {
        let mut hash = 0u32;
        for (_, leaf) in self.pages() {
            hash = hash.rotate_left(1) ^ leaf.hash32();
        }
        for (base, _) in self.pages() {
            hash = hash.rotate_left(1) ^ (base >> 8);
        }
        hash
    }
}

impl PartialEq for FcCharSet {
    fn eq(&self, other: &Self) -> bool {
        self.pages()
            .map(|(b, l)| (b, l.map))
            .eq(other.pages().map(|(b, l)| (b, l.map)))
    }
}

impl Eq for FcCharSet {}

impl Hash for FcCharSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash32());
    }
}

/// Interns leaves and whole charsets so that freezing many similar charsets
/// (one per font) shares their storage.
#[derive(Debug, Default)]
pub struct FcCharSetFreezer {
    leaves: HashMap<FcCharLeaf, Arc<FcCharLeaf>>,
    sets: HashMap<u32, Vec<Arc<FcCharSet>>>,
    leaves_seen: usize,
    charsets_seen: usize,
}

impl FcCharSetFreezer {
    pub fn new() -> Self {
        Self::default()
    }

    fn freeze_leaf(&mut self, leaf: &FcCharLeaf) -> Arc<FcCharLeaf> {
        self.leaves_seen += 1;
        Arc::clone(
            self.leaves
                .entry(*leaf)
                .or_insert_with(|| Arc::new(*leaf)),
        )
    }

    /// Returns the shared frozen instance equal to `cs`, creating it on first sight.
    pub fn freeze(&mut self, cs: &FcCharSet) -> Arc<FcCharSet> {
        self.charsets_seen += 1;
        let hash = cs.hash32();
        if let Some(found) = self
            .sets
            .get(&hash)
            .and_then(|bucket| bucket.iter().find(|f| ***f == *cs))
        {
            return Arc::clone(found);
        }
        let mut frozen = FcCharSet::new();
        for (base, leaf) in cs.pages() {
            let shared = self.freeze_leaf(leaf);
            frozen.pages.push(((base >> 8) as u16, shared));
        }
        let frozen = Arc::new(frozen);
        self.sets.entry(hash).or_default().push(Arc::clone(&frozen));
        frozen
    }

    /// (distinct leaves, leaves seen, distinct charsets, charsets seen)
    pub fn stats(&self) -> (usize, usize, usize, usize) {
        (
            self.leaves.len(),
            self.leaves_seen,
            self.sets.values().map(Vec::len).sum(),
            self.charsets_seen,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_leaf_survives_delete() {
        let mut cs = FcCharSet::from_chars([0x41]);
        cs.del_char(0x41);
        assert_eq!(cs.num_pages(), 1);
        assert!(cs.is_empty());
        assert_eq!(cs, FcCharSet::new());
        assert_eq!(cs.hash32(), FcCharSet::new().hash32());
    }

    #[test]
    fn freezer_shares_leaves() {
        let mut fz = FcCharSetFreezer::new();
        let a = FcCharSet::from_ranges(&[(0x20, 0x7e)]);
        let mut b = a.clone();
        b.add_char(0x4e00);
        let fa = fz.freeze(&a);
        let fb = fz.freeze(&b);
        let fa2 = fz.freeze(&a.clone());
        assert!(Arc::ptr_eq(&fa, &fa2));
        assert!(Arc::ptr_eq(&fa.pages[0].1, &fb.pages[0].1));
        let (leaves, _, sets, seen) = fz.stats();
        assert_eq!((leaves, sets, seen), (2, 2, 3));
    }

    #[test]
    fn page_walk() {
        let cs = FcCharSet::from_chars([0x41, 0x42, 0x3042]);
        let mut next = 0;
        let (base, map) = cs.first_page(&mut next).unwrap();
        assert_eq!(base, 0);
        assert_eq!(map[2], 0b110);
        let (base, _) = cs.next_page(&mut next).unwrap();
        assert_eq!(base, 0x3000);
        assert!(cs.next_page(&mut next).is_none());
        assert_eq!(cs.chars().collect::<Vec<_>>(), vec![0x41, 0x42, 0x3042]);
    }
}
