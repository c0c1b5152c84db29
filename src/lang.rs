//! Language tags and language sets.
//!
//! Languages known at build time live in a sorted static table and are
//! stored as bits; anything else goes into an overflow string set. The
//! overflow set is not persisted into caches.

use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::hash::{Hash, Hasher};
use std::sync::LazyLock;

/// Three-level distance between two language tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FcLangResult {
    Equal = 0,
    DifferentTerritory = 1,
    DifferentLang = 2,
}

/// Known language tags, sorted bytewise.
pub const FC_LANG_TABLE: &[&str] = &[
    "aa", "ab", "af", "ak", "am", "an", "ar", "as", "ast", "av", "ay", "az-az", "az-ir", "ba",
    "be", "ber-dz", "ber-ma", "bg", "bh", "bho", "bi", "bin", "bm", "bn", "bo", "br", "brx",
    "bs", "bua", "byn", "ca", "ce", "ch", "chm", "chr", "ckb", "cmn", "co", "cop", "crh", "cs",
    "csb", "cu", "cv", "cy", "da", "de", "doi", "dv", "dz", "ee", "el", "en", "eo", "es", "et",
    "eu", "fa", "fat", "ff", "fi", "fil", "fj", "fo", "fr", "fur", "fy", "ga", "gd", "gez",
    "gl", "gn", "gu", "gv", "ha", "haw", "he", "hi", "hne", "ho", "hr", "hsb", "ht", "hu",
    "hy", "hz", "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja", "jv", "ka",
    "kaa", "kab", "ki", "kj", "kk", "kl", "km", "kn", "ko", "kok", "kr", "ks", "ku-am",
    "ku-iq", "ku-ir", "ku-tr", "kum", "kv", "kw", "kwm", "ky", "la", "lah", "lb", "lez", "lg",
    "li", "ln", "lo", "lt", "lv", "mai", "mg", "mh", "mi", "mk", "ml", "mn-cn", "mn-mn", "mni",
    "mo", "mr", "ms", "mt", "my", "na", "nb", "nds", "ne", "ng", "nl", "nn", "no", "nqo", "nr",
    "nso", "nv", "ny", "oc", "om", "or", "os", "ota", "pa", "pa-pk", "pap-an", "pap-aw", "pl",
    "ps-af", "ps-pk", "pt", "qu", "quz", "rm", "rn", "ro", "ru", "rw", "sa", "sah", "sat",
    "sc", "sco", "sd", "se", "sel", "sg", "sh", "shs", "si", "sid", "sk", "sl", "sm", "sma",
    "smj", "smn", "sms", "sn", "so", "sq", "sr", "ss", "st", "su", "sv", "sw", "syr", "szl",
    "ta", "te", "tg", "th", "ti-er", "ti-et", "tig", "tk", "tl", "tn", "to", "tr", "ts", "tt",
    "tw", "ty", "tyv", "ug", "uk", "und-zmth", "und-zsye", "ur", "uz", "ve", "vi", "vo", "vot",
    "wa", "wal", "wen", "wo", "xh", "yap", "yi", "yo", "za", "zh-cn", "zh-hk", "zh-mo",
    "zh-sg", "zh-tw", "zu",
];

pub const NUM_LANG_CHAR_SET: usize = FC_LANG_TABLE.len();
pub const NUM_LANG_SET_MAP: usize = (NUM_LANG_CHAR_SET + 31) / 32;

struct LangIndex {
    // [begin, end) into FC_LANG_TABLE per initial letter a..z
    ranges: [(usize, usize); 26],
    // one bitmap per language that exists with several territories
    country_sets: Vec<[u32; NUM_LANG_SET_MAP]>,
}

static LANG_INDEX: LazyLock<LangIndex> = LazyLock::new(|| {
    let mut ranges = [(0usize, 0usize); 26];
    for (letter, range) in ranges.iter_mut().enumerate() {
        let c = b'a' + letter as u8;
        let begin = FC_LANG_TABLE.partition_point(|l| l.as_bytes()[0] < c);
        let end = FC_LANG_TABLE.partition_point(|l| l.as_bytes()[0] <= c);
        *range = (begin, end);
    }

    let mut country_sets = Vec::new();
    let mut i = 0;
    while i < NUM_LANG_CHAR_SET {
        let base = lang_part(FC_LANG_TABLE[i]);
        let mut j = i + 1;
        while j < NUM_LANG_CHAR_SET && lang_part(FC_LANG_TABLE[j]) == base {
            j += 1;
        }
        if j - i > 1 && base != "und" {
            let mut map = [0u32; NUM_LANG_SET_MAP];
            for id in i..j {
                map[id >> 5] |= 1 << (id & 31);
            }
            country_sets.push(map);
        }
        i = j;
    }
    LangIndex { ranges, country_sets }
});

fn lang_part(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

#[inline]
fn lang_end(c: u8) -> bool {
    c == 0 || c == b'-'
}

#[inline]
fn byte_at(s: &[u8], i: usize) -> u8 {
    s.get(i).copied().unwrap_or(0)
}

/// Compares two tags from `s1`'s point of view.
///
/// A tag whose first segment is `und` never compares `Equal`.
pub fn FcLangCompare(s1: &str, s2: &str) -> FcLangResult {
    let a = s1.as_bytes();
    let b = s2.as_bytes();
    let is_und = a.len() >= 3 && a[..3].eq_ignore_ascii_case(b"und") && lang_end(byte_at(a, 3));
    let mut result = FcLangResult::DifferentLang;
    let mut i = 0;
    loop {
        let c1 = byte_at(a, i).to_ascii_lowercase();
        let c2 = byte_at(b, i).to_ascii_lowercase();
        i += 1;
        if c1 != c2 {
            if !is_und && lang_end(c1) && lang_end(c2) {
                result = FcLangResult::DifferentTerritory;
            }
            return result;
        } else if c1 == 0 {
            return if is_und { result } else { FcLangResult::Equal };
        } else if c1 == b'-' && !is_und {
            result = FcLangResult::DifferentTerritory;
        }
        if i == 4 && is_und {
            result = FcLangResult::DifferentTerritory;
        }
    }
}

/// Whether `sup` covers `sub`: same language, and the same territory or
/// one side without a territory.
pub fn FcLangContains(sup: &str, sub: &str) -> bool {
    let a = sup.as_bytes();
    let b = sub.as_bytes();
    let mut i = 0;
    loop {
        let c1 = byte_at(a, i);
        let c2 = byte_at(b, i);
        i += 1;
        if !c1.eq_ignore_ascii_case(&c2) {
            return (c1 == b'-' && c2 == 0) || (c1 == 0 && c2 == b'-');
        } else if c1 == 0 {
            return true;
        }
    }
}

/// Position of `lang` in [`FC_LANG_TABLE`], or the insertion point.
pub fn FcLangSetIndex(lang: &str) -> Result<usize, usize> {
    let lower = lang.to_ascii_lowercase();
    let first = match lower.as_bytes().first() {
        Some(c) => *c,
        None => return Err(0),
    };
    let (begin, end) = if first.is_ascii_lowercase() {
        LANG_INDEX.ranges[(first - b'a') as usize]
    } else if first < b'a' {
        (0, 0)
    } else {
        (NUM_LANG_CHAR_SET, NUM_LANG_CHAR_SET)
    };
    FC_LANG_TABLE[begin..end]
        .binary_search(&lower.as_str())
        .map(|i| i + begin)
        .map_err(|i| i + begin)
}

/// Normalises a locale-style name (`en_US.UTF-8@euro`) to a tag (`en-us`).
pub fn FcLangNormalize(lang: &str) -> Option<String> {
    let mut s = lang.trim().to_ascii_lowercase();
    if let Some(at) = s.find(['.', '@']) {
        s.truncate(at);
    }
    let s = s.replace('_', "-");
    if s == "c" || s == "posix" {
        return Some("en".to_string());
    }
    if s.is_empty() || !s.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'-') {
        return None;
    }
    Some(s)
}

static DEFAULT_LANGS: LazyLock<Vec<String>> = LazyLock::new(|| {
    let mut langs = Vec::new();
    if let Ok(list) = std::env::var("FC_LANG") {
        langs.extend(list.split(':').filter_map(FcLangNormalize));
    }
    if langs.is_empty() {
        let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
            .iter()
            .filter_map(|k| std::env::var(k).ok())
            .find(|v| !v.is_empty());
        if let Some(lang) = locale.as_deref().and_then(FcLangNormalize) {
            langs.push(lang);
        }
    }
    if langs.is_empty() {
        langs.push("en".to_string());
    }
    log::debug!("default languages: {:?}", langs);
    langs
});

/// Languages of the running process, computed once.
pub fn FcGetDefaultLangs() -> &'static [String] {
    &DEFAULT_LANGS
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcLangSet {
    map: [u32; NUM_LANG_SET_MAP],
    extra: BTreeSet<String>,
}

impl FcLangSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_langs<'a, I: IntoIterator<Item = &'a str>>(langs: I) -> Self {
        let mut ls = Self::new();
        for l in langs {
            ls.add(l);
        }
        ls
    }

    /// A langset holding `lang`, or an empty one. Used to promote strings
    /// and voids when comparing against a langset.
    pub fn promote(lang: Option<&str>) -> Self {
        let mut ls = Self::new();
        if let Some(l) = lang {
            ls.add(l);
        }
        ls
    }

    /// Builds a langset from a raw table bitmap (cache-resident form).
    pub fn from_map(map: [u32; NUM_LANG_SET_MAP]) -> Self {
        Self { map, extra: BTreeSet::new() }
    }

    pub fn map(&self) -> &[u32; NUM_LANG_SET_MAP] {
        &self.map
    }

    pub fn extra(&self) -> &BTreeSet<String> {
        &self.extra
    }

    #[inline]
    fn bit_get(&self, id: usize) -> bool {
        self.map[id >> 5] & (1 << (id & 31)) != 0
    }

    #[inline]
    fn bit_set(&mut self, id: usize) {
        self.map[id >> 5] |= 1 << (id & 31);
    }

    #[inline]
    fn bit_reset(&mut self, id: usize) {
        self.map[id >> 5] &= !(1 << (id & 31));
    }

    pub fn add(&mut self, lang: &str) -> bool {
        if lang.is_empty() {
            return false;
        }
        match FcLangSetIndex(lang) {
            Ok(id) => self.bit_set(id),
            Err(_) => {
                self.extra.insert(lang.to_ascii_lowercase());
            }
        }
        true
    }

    pub fn del(&mut self, lang: &str) -> bool {
        match FcLangSetIndex(lang) {
            Ok(id) => self.bit_reset(id),
            Err(_) => {
                self.extra.remove(&lang.to_ascii_lowercase());
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.map.iter().all(|&w| w == 0) && self.extra.is_empty()
    }

    /// Best match of `lang` against any member, scanning table neighbours
    /// that share its language.
    pub fn has_lang(&self, lang: &str) -> FcLangResult {
        let id = match FcLangSetIndex(lang) {
            Ok(id) if self.bit_get(id) => return FcLangResult::Equal,
            Ok(id) | Err(id) => id,
        };
        let mut best = FcLangResult::DifferentLang;
        for i in (0..id).rev() {
            let r = FcLangCompare(lang, FC_LANG_TABLE[i]);
            if r == FcLangResult::DifferentLang {
                break;
            }
            if self.bit_get(i) && r < best {
                best = r;
            }
        }
        for i in id..NUM_LANG_CHAR_SET {
            let r = FcLangCompare(lang, FC_LANG_TABLE[i]);
            if r == FcLangResult::DifferentLang {
                break;
            }
            if self.bit_get(i) && r < best {
                best = r;
            }
        }
        for extra in &self.extra {
            let r = FcLangCompare(lang, extra);
            if r < best {
                best = r;
            }
        }
        best
    }

    fn compare_str_set(&self, set: &BTreeSet<String>) -> FcLangResult {
        let mut best = FcLangResult::DifferentLang;
        for lang in set {
            best = best.min(self.has_lang(lang));
            if best == FcLangResult::Equal {
                break;
            }
        }
        best
    }

    /// Symmetric overlap test between two sets.
    pub fn compare(&self, other: &FcLangSet) -> FcLangResult {
        if (0..NUM_LANG_SET_MAP).any(|i| self.map[i] & other.map[i] != 0) {
            return FcLangResult::Equal;
        }
        let mut best = FcLangResult::DifferentLang;
        for set in &LANG_INDEX.country_sets {
            let a = (0..NUM_LANG_SET_MAP).any(|i| self.map[i] & set[i] != 0);
            let b = (0..NUM_LANG_SET_MAP).any(|i| other.map[i] & set[i] != 0);
            if a && b {
                best = FcLangResult::DifferentTerritory;
                break;
            }
        }
        if !self.extra.is_empty() {
            best = best.min(other.compare_str_set(&self.extra));
        }
        if best > FcLangResult::Equal && !other.extra.is_empty() {
            best = best.min(self.compare_str_set(&other.extra));
        }
        best
    }

    fn contains_lang(&self, lang: &str) -> bool {
        let id = match FcLangSetIndex(lang) {
            Ok(id) if self.bit_get(id) => return true,
            Ok(id) | Err(id) => id,
        };
        for i in (0..id).rev() {
            if FcLangCompare(FC_LANG_TABLE[i], lang) == FcLangResult::DifferentLang {
                break;
            }
            if self.bit_get(i) && FcLangContains(FC_LANG_TABLE[i], lang) {
                return true;
            }
        }
        for i in id..NUM_LANG_CHAR_SET {
            if FcLangCompare(FC_LANG_TABLE[i], lang) == FcLangResult::DifferentLang {
                break;
            }
            if self.bit_get(i) && FcLangContains(FC_LANG_TABLE[i], lang) {
                return true;
            }
        }
        self.extra.iter().any(|e| FcLangContains(e, lang))
    }

    /// Whether every language in `other` is covered by some language here.
    pub fn contains(&self, other: &FcLangSet) -> bool {
        for i in 0..NUM_LANG_SET_MAP {
            let missing = other.map[i] & !self.map[i];
            if missing == 0 {
                continue;
            }
            for j in 0..32 {
                let id = i * 32 + j;
                if missing & (1 << j) != 0 && id < NUM_LANG_CHAR_SET {
                    if !self.contains_lang(FC_LANG_TABLE[id]) {
                        return false;
                    }
                }
            }
        }
        other.extra.iter().all(|l| self.contains_lang(l))
    }

    /// All member tags, table languages first.
    pub fn get_langs(&self) -> BTreeSet<String> {
        let mut langs: BTreeSet<String> = (0..NUM_LANG_CHAR_SET)
            .filter(|&i| self.bit_get(i))
            .map(|i| FC_LANG_TABLE[i].to_string())
            .collect();
        langs.extend(self.extra.iter().cloned());
        langs
    }

    pub fn union(&self, other: &FcLangSet) -> FcLangSet {
        let mut out = self.clone();
        for lang in other.get_langs() {
            out.add(&lang);
        }
        out
    }

    pub fn subtract(&self, other: &FcLangSet) -> FcLangSet {
        let mut out = self.clone();
        for lang in other.get_langs() {
            out.del(&lang);
        }
        out
    }

    pub fn hash32(&self) -> u32 {
        let h = self.map.iter().fold(0u32, |h, &w| h ^ w);
        h ^ self.extra.len() as u32
    }
}

impl PartialEq for FcLangSet {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map && self.extra == other.extra
    }
}

impl Eq for FcLangSet {}

impl Hash for FcLangSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash32());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_indexed() {
        assert!(FC_LANG_TABLE.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(FcLangSetIndex("en").map(|i| FC_LANG_TABLE[i]), Ok("en"));
        assert_eq!(FcLangSetIndex("ZH-TW").map(|i| FC_LANG_TABLE[i]), Ok("zh-tw"));
        assert!(FcLangSetIndex("en-us").is_err());
        assert!(FcLangSetIndex("").is_err());
    }

    #[test]
    fn compare_tags() {
        assert_eq!(FcLangCompare("en", "EN"), FcLangResult::Equal);
        assert_eq!(FcLangCompare("en-us", "en-gb"), FcLangResult::DifferentTerritory);
        assert_eq!(FcLangCompare("en", "en-gb"), FcLangResult::DifferentTerritory);
        assert_eq!(FcLangCompare("en", "de"), FcLangResult::DifferentLang);
        assert_eq!(FcLangCompare("und-zsye", "und-zsye"), FcLangResult::DifferentTerritory);
        assert_eq!(FcLangCompare("und", "und"), FcLangResult::DifferentLang);
    }

    #[test]
    fn country_groups() {
        let a = FcLangSet::from_langs(["zh-cn"]);
        let b = FcLangSet::from_langs(["zh-tw"]);
        assert_eq!(a.compare(&b), FcLangResult::DifferentTerritory);
        assert_eq!(b.compare(&a), FcLangResult::DifferentTerritory);
        assert_eq!(a.has_lang("zh-hk"), FcLangResult::DifferentTerritory);
        assert_eq!(a.has_lang("ja"), FcLangResult::DifferentLang);
    }

    #[test]
    fn extras_and_contains() {
        let mut ls = FcLangSet::from_langs(["en", "x-klingon"]);
        assert_eq!(ls.extra().len(), 1);
        assert_eq!(ls.has_lang("x-klingon"), FcLangResult::Equal);
        assert!(ls.contains(&FcLangSet::from_langs(["en-us"])));
        assert!(!ls.contains(&FcLangSet::from_langs(["fr"])));
        ls.del("x-klingon");
        assert!(ls.extra().is_empty());
    }

    #[test]
    fn normalize_locale() {
        assert_eq!(FcLangNormalize("en_US.UTF-8").as_deref(), Some("en-us"));
        assert_eq!(FcLangNormalize("de_DE@euro").as_deref(), Some("de-de"));
        assert_eq!(FcLangNormalize("C").as_deref(), Some("en"));
        assert_eq!(FcLangNormalize(""), None);
    }
}
