//! Scoring fonts against a request: per-object distance functions, the
//! priority-ordered score vector, best match, sorted fallback lists and the
//! final render pattern.

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::charset::FcCharSet;
use crate::config::{FcConfig, FcConfigGetCurrent, FcConfigSubstituteWithPat, FcSetName};
use crate::hash::FcHashTable;
use crate::lang::FcLangCompare;
use crate::lang::FcLangResult;
use crate::name::FcFormatDouble;
use crate::object::*;
use crate::pattern::{FcFontSet, FcPattern};
use crate::strings::{
    FcStrCmpIgnoreBlanksAndCase, FcStrCmpIgnoreCase, FcStrGlobMatch, FcStrHashIgnoreBlanksAndCase,
    FcStrMatchIgnoreCaseAndDelims,
};
use crate::value::{FcValue, FcValueBinding, FcValueList};
use crate::weight::FcWeightToOpenTypeDouble;
use crate::{FcMatchKind, FcResult, PatternMatch};

/// Per-slot distances of one font, read in [`FcPriority`] order.
pub type FcScore = [f64; PRI_END];

const NO_MATCH: f64 = 1e99;

// ── Comparators ──
//
// Each returns the distance between a requested and an offered value (lower
// is better) together with the value a render pattern should carry, or
// `None` when the two cannot be compared.

fn number(v: &FcValue) -> Option<f64> {
    match v {
        FcValue::Integer(i) => Some(*i as f64),
        FcValue::Double(d) => Some(*d),
        _ => None,
    }
}

fn bounds(v: &FcValue) -> Option<(f64, f64)> {
    match v {
        FcValue::Range(r) => Some((r.begin, r.end)),
        v => number(v).map(|d| (d, d)),
    }
}

fn compare_number(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let d = (number(v2)? - number(v1)?).abs();
    Some((d, v2.clone()))
}

fn compare_string(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let d = !FcStrCmpIgnoreCase(v1.as_str()?, v2.as_str()?).is_eq();
    Some((d as u8 as f64, v2.clone()))
}

// Cheap reject on the first letter; a leading blank disables it.
fn first_letter_differs(a: &str, b: &str) -> bool {
    match (a.bytes().next(), b.bytes().next()) {
        (Some(x), Some(y)) => {
            !x.eq_ignore_ascii_case(&y) && x != b' ' && y != b' '
        }
        _ => false,
    }
}

fn compare_family(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let (a, b) = (v1.as_str()?, v2.as_str()?);
    if first_letter_differs(a, b) {
        return Some((1.0, v2.clone()));
    }
    let d = !FcStrCmpIgnoreBlanksAndCase(a, b).is_eq();
    Some((d as u8 as f64, v2.clone()))
}

fn compare_postscript(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let (a, b) = (v1.as_str()?, v2.as_str()?);
    if first_letter_differs(a, b) {
        return Some((1.0, v2.clone()));
    }
    if a.is_empty() {
        return Some(((!b.is_empty()) as u8 as f64, v2.clone()));
    }
    let n = FcStrMatchIgnoreCaseAndDelims(a, b, b" -");
    let len = a.len();
    Some(((len - n.min(len)) as f64 / len as f64, v2.clone()))
}

fn lang_distance(r: FcLangResult) -> f64 {
    match r {
        FcLangResult::Equal => 0.0,
        FcLangResult::DifferentTerritory => 1.0,
        FcLangResult::DifferentLang => 2.0,
    }
}

fn compare_lang(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let r = match (v1, v2) {
        (FcValue::LangSet(a), FcValue::LangSet(b)) => a.compare(b),
        (FcValue::LangSet(a), FcValue::String(b)) => a.has_lang(b),
        (FcValue::String(a), FcValue::LangSet(b)) => b.has_lang(a),
        (FcValue::String(a), FcValue::String(b)) => FcLangCompare(a, b),
        _ => return None,
    };
    Some((lang_distance(r), v2.clone()))
}

fn compare_bool(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let (a, b) = (v1.as_bool()?, v2.as_bool()?);
    let best = if b != PatternMatch::DontCare { b } else { a };
    let differ = matches!(
        (a, b),
        (PatternMatch::True, PatternMatch::False) | (PatternMatch::False, PatternMatch::True)
    );
    Some((differ as u8 as f64, FcValue::Bool(best)))
}

fn compare_charset(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let (a, b) = (v1.as_charset()?, v2.as_charset()?);
    Some((a.subtract_count(b) as f64, v2.clone()))
}

fn gap(b1: f64, e1: f64, b2: f64, e2: f64) -> Option<f64> {
    if e1 < b2 || e2 < b1 {
        Some((b2 - e1).abs().min((b1 - e2).abs()))
    } else {
        None
    }
}

fn compare_range(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let (b1, e1) = bounds(v1)?;
    let (b2, e2) = bounds(v2)?;
    // point of the offered range closest to the request
    let d = if e1 < b2 {
        b2
    } else if b1 > e2 {
        e2
    } else {
        (b1.max(b2) + e1.min(e2)) * 0.5
    };
    Some((gap(b1, e1, b2, e2).unwrap_or(0.0), FcValue::Double(d)))
}

fn compare_size(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let (b1, e1) = bounds(v1)?;
    let (b2, e2) = bounds(v2)?;
    let best = FcValue::Double((b1 + e1) * 0.5);
    if let Some(d) = gap(b1, e1, b2, e2) {
        return Some((d, best));
    }
    // request sits on the open end of a size range
    if b2 != e2 && b1 == e2 {
        return Some((1e-15, best));
    }
    Some((0.0, best))
}

fn compare_filename(v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    let (a, b) = (v1.as_str()?, v2.as_str()?);
    let d = if a == b {
        0.0
    } else if FcStrCmpIgnoreCase(a, b).is_eq() {
        1.0
    } else if FcStrGlobMatch(a, b) {
        2.0
    } else {
        3.0
    };
    Some((d, v2.clone()))
}

fn compare_values(kind: FcCompareKind, v1: &FcValue, v2: &FcValue) -> Option<(f64, FcValue)> {
    match kind {
        FcCompareKind::Number => compare_number(v1, v2),
        FcCompareKind::String => compare_string(v1, v2),
        FcCompareKind::Family => compare_family(v1, v2),
        FcCompareKind::PostScript => compare_postscript(v1, v2),
        FcCompareKind::Bool => compare_bool(v1, v2),
        FcCompareKind::CharSet => compare_charset(v1, v2),
        FcCompareKind::Lang => compare_lang(v1, v2),
        FcCompareKind::Range => compare_range(v1, v2),
        FcCompareKind::Size => compare_size(v1, v2),
        FcCompareKind::Filename => compare_filename(v1, v2),
    }
}

// ── Value list scoring ──

/// Outcome of scoring a requested value list against an offered one.
#[derive(Debug, Clone)]
pub struct FcValueListMatch {
    /// Value of the best pair, as a render pattern should carry it.
    pub best: Option<FcValue>,
    /// Position of the best offered value.
    pub pos: usize,
}

/// Scores every requested value of `v1` against every offered value of
/// `v2`. A pair's distance is `comparator * 1000 + request position`, so
/// earlier requested values win ties; among equal distances the earlier
/// offered value is kept unless a later one yields a string where the kept
/// one does not. The minima are added to `score` in the matcher's strong and
/// weak slots. Without a matcher nothing is scored and the first offered
/// value is reported.
pub fn FcCompareValueList(
    matcher: Option<&FcMatcher>,
    v1: &FcValueList,
    v2: &FcValueList,
    score: Option<&mut FcScore>,
) -> Result<FcValueListMatch, FcResult> {
    let Some(m) = matcher else {
        return Ok(FcValueListMatch {
            best: v2.get(0).map(|e| e.value.clone()),
            pos: 0,
        });
    };
    let single_slot = m.strong == m.weak;
    let mut best = NO_MATCH;
    let mut best_strong = NO_MATCH;
    let mut best_weak = NO_MATCH;
    let mut best_value = None;
    let mut pos = 0;

    'outer: for (j, e1) in v1.iter().enumerate() {
        for (k, e2) in v2.iter().enumerate() {
            let (d, value) = compare_values(m.kind, &e1.value, &e2.value)
                .ok_or(FcResult::TypeMismatch)?;
            let v = d * 1000.0 + j as f64;
            let prefer_string = v == best
                && matches!(value, FcValue::String(_))
                && !matches!(best_value, Some(FcValue::String(_)));
            if v < best || prefer_string {
                best_value = Some(value);
                best = v;
                pos = k;
            }
            if single_slot {
                if best < 1000.0 {
                    break 'outer;
                }
            } else if e1.binding == FcValueBinding::Strong {
                best_strong = best_strong.min(v);
            } else {
                best_weak = best_weak.min(v);
            }
        }
    }

    if let Some(score) = score {
        if single_slot {
            score[m.strong as usize] += best;
        } else {
            score[m.weak as usize] += best_weak;
            score[m.strong as usize] += best_strong;
        }
    }
    Ok(FcValueListMatch { best: best_value, pos })
}

// ── Request-wide compare data ──

#[derive(Debug, Clone, Copy)]
struct FamilyEntry {
    strong: f64,
    weak: f64,
}

/// Precomputed lookups for one request, shared by every font it is scored
/// against. The family table maps each requested family name to its
/// earliest strong and weak position.
pub struct FcCompareData {
    families: Option<FcHashTable<Arc<str>, FamilyEntry>>,
}

fn hash_family(s: &Arc<str>) -> u32 {
    FcStrHashIgnoreBlanksAndCase(s)
}

fn eq_family(a: &Arc<str>, b: &Arc<str>) -> bool {
    FcStrCmpIgnoreBlanksAndCase(a, b).is_eq()
}

impl FcCompareData {
    pub fn new(pat: &FcPattern) -> Self {
        let families = pat.values(FC_FAMILY_OBJECT).map(|list| {
            let table = FcHashTable::new(hash_family, eq_family);
            for (i, elt) in list.iter().enumerate() {
                let FcValue::String(name) = &elt.value else { continue };
                let mut entry = table
                    .find(name)
                    .unwrap_or(FamilyEntry { strong: NO_MATCH, weak: NO_MATCH });
                let i = i as f64;
                if elt.binding == FcValueBinding::Weak {
                    entry.weak = entry.weak.min(i);
                } else {
                    entry.strong = entry.strong.min(i);
                }
                table.replace(Arc::clone(name), entry);
            }
            table
        });
        FcCompareData { families }
    }

    fn compare_families(&self, font_families: &FcValueList, score: &mut FcScore) -> bool {
        let Some(table) = &self.families else {
            return false;
        };
        let mut strong = NO_MATCH;
        let mut weak = NO_MATCH;
        for v in font_families.values() {
            let FcValue::String(name) = v else { continue };
            if let Some(e) = table.find(name) {
                strong = strong.min(e.strong);
                weak = weak.min(e.weak);
            }
        }
        score[FcPriority::FamilyStrong as usize] = strong;
        score[FcPriority::FamilyWeak as usize] = weak;
        true
    }
}

fn compare_internal(pat: &FcPattern, fnt: &FcPattern, data: &FcCompareData) -> Result<FcScore, FcResult> {
    let mut score = [0.0; PRI_END];
    let (pe, fe) = (pat.elts(), fnt.elts());
    let (mut i1, mut i2) = (0, 0);
    while i1 < pe.len() && i2 < fe.len() {
        let (a, b) = (&pe[i1], &fe[i2]);
        match a.object.cmp(&b.object) {
            Ordering::Greater => i2 += 1,
            Ordering::Less => i1 += 1,
            Ordering::Equal => {
                let fast = a.object == FC_FAMILY_OBJECT && data.compare_families(&b.values, &mut score);
                if !fast {
                    let m = FcObjectToMatcher(a.object, false);
                    FcCompareValueList(m.as_ref(), &a.values, &b.values, Some(&mut score))?;
                }
                i1 += 1;
                i2 += 1;
            }
        }
    }
    Ok(score)
}

/// Score vector of `fnt` against the request `pat`. Only objects present
/// on both sides contribute.
pub fn FcCompare(pat: &FcPattern, fnt: &FcPattern) -> Result<FcScore, FcResult> {
    compare_internal(pat, fnt, &FcCompareData::new(pat))
}

/// Lexicographic order over the priority slots.
pub fn FcScoreCompare(a: &FcScore, b: &FcScore) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.partial_cmp(y).unwrap_or(Ordering::Equal))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn candidates<'a>(sets: &[&'a FcFontSet]) -> Vec<&'a Arc<FcPattern>> {
    sets.iter().flat_map(|s| s.fonts().iter()).collect()
}

#[cfg(all(feature = "multithreading", not(target_family = "wasm")))]
fn score_all(
    fonts: &[&Arc<FcPattern>],
    p: &FcPattern,
    data: &FcCompareData,
) -> Result<Vec<FcScore>, FcResult> {
    use rayon::prelude::*;
    fonts
        .par_iter()
        .map(|f| compare_internal(p, f, data))
        .collect()
}

#[cfg(not(all(feature = "multithreading", not(target_family = "wasm"))))]
fn score_all(
    fonts: &[&Arc<FcPattern>],
    p: &FcPattern,
    data: &FcCompareData,
) -> Result<Vec<FcScore>, FcResult> {
    fonts.iter().map(|f| compare_internal(p, f, data)).collect()
}

// ── Matching ──

// Best font of `sets`, with each scored object's binding set to Strong when
// its slot was matched exactly and Weak otherwise.
fn FcFontSetMatchInternal(sets: &[&FcFontSet], p: &FcPattern) -> Result<FcPattern, FcResult> {
    let data = FcCompareData::new(p);
    let mut best: Option<(&Arc<FcPattern>, FcScore)> = None;
    for set in sets {
        for font in set.fonts() {
            let score = compare_internal(p, font, &data)?;
            let better = match &best {
                None => true,
                Some((_, b)) => FcScoreCompare(&score, b).is_lt(),
            };
            if better {
                best = Some((font, score));
            }
        }
    }
    let (font, score) = best.ok_or(FcResult::NoMatch)?;
    log::trace!("best score {:?}", score);

    let mut pat = FcPattern::new();
    for elt in font.elts() {
        let list = match FcObjectToMatcher(elt.object, false) {
            None => elt.values.clone(),
            Some(m) => {
                let binding = if score[m.strong as usize] < 1000.0 {
                    FcValueBinding::Strong
                } else {
                    FcValueBinding::Weak
                };
                FcValueList::from_values(elt.values.values().cloned(), binding)
            }
        };
        pat.list_add(elt.object, list, true);
    }
    Ok(pat)
}

/// Best font of `sets` for `p`, prepared for rendering.
pub fn FcFontSetMatch(
    config: Option<&FcConfig>,
    sets: &[&FcFontSet],
    p: &FcPattern,
) -> Result<FcPattern, FcResult> {
    let best = FcFontSetMatchInternal(sets, p)?;
    FcFontRenderPrepare(config, p, &best)
}

fn with_config<R>(config: Option<&FcConfig>, f: impl FnOnce(&FcConfig) -> R) -> R {
    match config {
        Some(c) => f(c),
        None => f(&FcConfigGetCurrent()),
    }
}

/// Best system or application font of `config` (or the current
/// configuration) for `p`. The request is expected to have been through
/// pattern substitution and [`FcDefaultSubstitute`](crate::FcDefaultSubstitute).
pub fn FcFontMatch(config: Option<&FcConfig>, p: &FcPattern) -> Result<FcPattern, FcResult> {
    with_config(config, |config| {
        let sets = [
            config.fonts(FcSetName::System),
            config.fonts(FcSetName::Application),
        ];
        FcFontSetMatch(Some(config), &sets, p)
    })
}

// ── Sorting ──

struct FcSortNode<'a> {
    pattern: &'a Arc<FcPattern>,
    score: FcScore,
}

/// All fonts of `sets` ordered by closeness to `p`, together with the union
/// of their charsets.
///
/// Each requested language claims the best-ranked font that covers it;
/// fonts that claim none lose their language score and the list is ranked
/// again, so every requested language gets a font near the top. With
/// `trim`, fonts adding no code point beyond the ones ranked before them
/// are dropped (the first font is always kept).
pub fn FcFontSetSort(
    sets: &[&FcFontSet],
    p: &FcPattern,
    trim: bool,
) -> Result<(FcFontSet, FcCharSet), FcResult> {
    let fonts = candidates(sets);
    if fonts.is_empty() {
        return Err(FcResult::NoMatch);
    }
    let data = FcCompareData::new(p);
    let scores = score_all(&fonts, p, &data)?;
    let mut nodes: Vec<FcSortNode<'_>> = fonts
        .into_iter()
        .zip(scores)
        .map(|(pattern, score)| FcSortNode { pattern, score })
        .collect();
    nodes.sort_by(|a, b| FcScoreCompare(&a.score, &b.score));

    let lang_slot = FcPriority::Lang as usize;
    let langs: Vec<&FcValue> = p.values(FC_LANG_OBJECT).map(|l| l.values().collect()).unwrap_or_default();
    let mut satisfied = alloc::vec![false; langs.len()];
    for node in nodes.iter_mut() {
        let mut satisfies = false;
        if node.score[lang_slot] < 2000.0 {
            if let Ok(node_lang) = node.pattern.get(FC_LANG_OBJECT, 0) {
                for (i, lang) in langs.iter().enumerate() {
                    if satisfied[i] {
                        continue;
                    }
                    if let Some((d, _)) = compare_lang(lang, node_lang) {
                        if d < 2.0 {
                            satisfied[i] = true;
                            satisfies = true;
                            break;
                        }
                    }
                }
            }
        }
        if !satisfies {
            node.score[lang_slot] = 10000.0;
        }
    }
    nodes.sort_by(|a, b| FcScoreCompare(&a.score, &b.score));

    let mut out = FcFontSet::new();
    let mut cs = FcCharSet::new();
    for (i, node) in nodes.iter().enumerate() {
        let adds_chars = match node.pattern.get_charset(FC_CHARSET_OBJECT, 0) {
            Ok(ncs) => cs.merge(ncs),
            Err(_) => false,
        };
        if i == 0 || !trim || adds_chars {
            out.add_shared(Arc::clone(node.pattern));
        }
    }
    log::trace!("sorted {} fonts, kept {}", nodes.len(), out.len());
    Ok((out, cs))
}

/// [`FcFontSetSort`] over the system and application fonts of `config`, or
/// of the current configuration.
pub fn FcFontSort(
    config: Option<&FcConfig>,
    p: &FcPattern,
    trim: bool,
) -> Result<(FcFontSet, FcCharSet), FcResult> {
    with_config(config, |config| {
        let sets = [
            config.fonts(FcSetName::System),
            config.fonts(FcSetName::Application),
        ];
        FcFontSetSort(&sets, p, trim)
    })
}

// ── Render preparation ──

fn lang_companion(object: FcObject) -> Option<FcObject> {
    match object {
        FC_FAMILY_OBJECT => Some(FC_FAMILYLANG_OBJECT),
        FC_STYLE_OBJECT => Some(FC_STYLELANG_OBJECT),
        FC_FULLNAME_OBJECT => Some(FC_FULLNAMELANG_OBJECT),
        _ => None,
    }
}

fn is_lang_companion(object: FcObject) -> bool {
    matches!(
        object,
        FC_FAMILYLANG_OBJECT | FC_STYLELANG_OBJECT | FC_FULLNAMELANG_OBJECT
    )
}

// Moves the name in the best-matching language (and its tag) to the front.
fn localized_names(
    names: &FcValueList,
    font_langs: &FcValueList,
    pat_langs: &FcValueList,
    lang_object: FcObject,
) -> Result<(FcValueList, FcValueList), FcResult> {
    let m = FcObjectToMatcher(lang_object, true);
    let n = FcCompareValueList(m.as_ref(), pat_langs, font_langs, None)?.pos;
    let mut ln = FcValueList::new();
    let mut ll = FcValueList::new();
    for j in 0..names.len().max(font_langs.len()) {
        let first = j == n;
        if let Some(e) = names.get(j) {
            if first {
                ln.prepend(e.value.clone(), e.binding);
            } else {
                ln.append(e.value.clone(), e.binding);
            }
        }
        if let Some(e) = font_langs.get(j) {
            if first {
                ll.prepend(e.value.clone(), FcValueBinding::Strong);
            } else {
                ll.append(e.value.clone(), e.binding);
            }
        }
    }
    Ok((ln, ll))
}

/// Builds the pattern used to render `font` for the request `pat`.
///
/// Objects both sides carry take the comparator's best value; objects only
/// the font carries are copied; objects only the request carries are
/// appended. Localized names are reordered by the requested languages. For
/// variable fonts, weight/width/size axes resolved from ranges are written
/// to `fontvariations` ahead of any variations already present. Font
/// substitution runs last, with `pat` as the request.
pub fn FcFontRenderPrepare(
    config: Option<&FcConfig>,
    pat: &FcPattern,
    font: &FcPattern,
) -> Result<FcPattern, FcResult> {
    let variable = font.get_bool(FC_VARIABLE_OBJECT, 0) == Ok(PatternMatch::True);
    let mut variations: Vec<String> = Vec::new();
    let mut new = FcPattern::new();

    for fe in font.elts() {
        if is_lang_companion(fe.object) {
            continue;
        }
        if let Some(lang_object) = lang_companion(fe.object) {
            match (font.values(lang_object), pat.values(lang_object)) {
                (Some(font_langs), Some(pat_langs)) => {
                    let (ln, ll) = localized_names(&fe.values, font_langs, pat_langs, lang_object)?;
                    new.list_add(fe.object, ln, false);
                    new.list_add(lang_object, ll, false);
                    continue;
                }
                (Some(font_langs), None) => {
                    new.list_add(fe.object, fe.values.clone(), false);
                    new.list_add(lang_object, font_langs.clone(), false);
                    continue;
                }
                _ => {}
            }
        }

        let Some(pe) = pat.values(fe.object) else {
            new.list_add(fe.object, fe.values.clone(), true);
            continue;
        };
        let m = FcObjectToMatcher(fe.object, false);
        let Some(v) = FcCompareValueList(m.as_ref(), pe, &fe.values, None)?.best else {
            continue;
        };

        let is_range = matches!(fe.values.get(0).map(|e| &e.value), Some(FcValue::Range(_)));
        if variable && is_range {
            let axis = match fe.object {
                FC_WEIGHT_OBJECT => v.as_f64().map(|d| ("wght", FcWeightToOpenTypeDouble(d))),
                FC_WIDTH_OBJECT => v.as_f64().map(|d| ("wdth", d)),
                FC_SIZE_OBJECT => v.as_f64().map(|d| ("opsz", d)),
                _ => None,
            };
            if let Some((tag, num)) = axis {
                variations.push(format!("{}={}", tag, FcFormatDouble(num)));
            }
        }
        new.add_with_binding(fe.object, v, FcValueBinding::Strong, false);
    }

    for pe in pat.elts() {
        if font.has(pe.object) || is_lang_companion(pe.object) {
            continue;
        }
        new.list_add(pe.object, pe.values.clone(), false);
    }

    if variable && !variations.is_empty() {
        let mut s = variations.join(",");
        if let Ok(existing) = new.get_string(FC_FONT_VARIATIONS_OBJECT, 0) {
            s.push(',');
            s.push_str(existing);
            new.del(FC_FONT_VARIATIONS_OBJECT);
        }
        new.add_string(FC_FONT_VARIATIONS_OBJECT, &s);
    }

    FcConfigSubstituteWithPat(config, &mut new, Some(pat), FcMatchKind::Font);
    Ok(new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FcRange;

    fn strs(vals: &[&str], binding: FcValueBinding) -> FcValueList {
        FcValueList::from_values(vals.iter().map(|s| FcValue::from(*s)), binding)
    }

    #[test]
    fn comparator_distances() {
        let a = FcValue::from(10);
        let b = FcValue::from(12.5);
        assert_eq!(compare_number(&a, &b).map(|r| r.0), Some(2.5));
        assert!(compare_number(&a, &FcValue::from("x")).is_none());

        assert_eq!(compare_family(&"Deja Vu".into(), &"dejavu".into()).map(|r| r.0), Some(0.0));
        assert_eq!(compare_family(&"Arial".into(), &"Verdana".into()).map(|r| r.0), Some(1.0));

        let dc = FcValue::Bool(PatternMatch::DontCare);
        let t = FcValue::Bool(PatternMatch::True);
        let f = FcValue::Bool(PatternMatch::False);
        assert_eq!(compare_bool(&dc, &f).map(|r| r.0), Some(0.0));
        assert_eq!(compare_bool(&t, &f).map(|r| r.0), Some(1.0));
        assert!(matches!(compare_bool(&t, &dc), Some((_, FcValue::Bool(PatternMatch::True)))));

        assert_eq!(compare_lang(&"en-us".into(), &"en-gb".into()).map(|r| r.0), Some(1.0));
        assert_eq!(compare_lang(&"en".into(), &"de".into()).map(|r| r.0), Some(2.0));

        assert_eq!(compare_filename(&"/a/B.ttf".into(), &"/a/b.ttf".into()).map(|r| r.0), Some(1.0));
        assert_eq!(compare_filename(&"/a/*.ttf".into(), &"/a/b.ttf".into()).map(|r| r.0), Some(2.0));
    }

    #[test]
    fn range_and_size_distances() {
        let req = FcValue::from(80);
        let font = FcValue::Range(FcRange::new(100.0, 200.0));
        let (d, best) = compare_range(&req, &font).unwrap();
        assert_eq!(d, 20.0);
        assert!(matches!(best, FcValue::Double(b) if b == 100.0));

        let inside = FcValue::from(150);
        assert!(matches!(compare_range(&inside, &font), Some((d, FcValue::Double(b))) if d == 0.0 && b == 150.0));

        let sizes = FcValue::Range(FcRange::new(8.0, 12.0));
        assert_eq!(compare_size(&FcValue::from(12.0), &sizes).map(|r| r.0), Some(1e-15));
        assert_eq!(compare_size(&FcValue::from(10.0), &sizes).map(|r| r.0), Some(0.0));
        assert_eq!(compare_size(&FcValue::from(14.0), &sizes).map(|r| r.0), Some(2.0));
    }

    #[test]
    fn earlier_request_values_win() {
        let m = FcObjectToMatcher(FC_STYLE_OBJECT, false).unwrap();
        let req = strs(&["Bold", "Regular"], FcValueBinding::Strong);
        let offered = strs(&["Regular"], FcValueBinding::Strong);
        let mut score = [0.0; PRI_END];
        let r = FcCompareValueList(Some(&m), &req, &offered, Some(&mut score)).unwrap();
        assert_eq!(score[FcPriority::Style as usize], 1.0);
        assert_eq!(r.pos, 0);
    }

    #[test]
    fn family_fast_path_tracks_bindings() {
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "Foo");
        p.add_weak(FC_FAMILY_OBJECT, "Bar", true);
        let mut font = FcPattern::new();
        font.add_string(FC_FAMILY_OBJECT, "bar");
        let score = FcCompare(&p, &font).unwrap();
        assert_eq!(score[FcPriority::FamilyStrong as usize], NO_MATCH);
        assert_eq!(score[FcPriority::FamilyWeak as usize], 1.0);
    }

    #[test]
    fn bool_and_number_slots() {
        let mut p = FcPattern::new();
        p.add_bool(FC_ANTIALIAS_OBJECT, PatternMatch::True);
        let mut font = FcPattern::new();
        font.add_bool(FC_ANTIALIAS_OBJECT, PatternMatch::True);
        assert!(FcCompare(&p, &font).is_ok());

        let mut p = FcPattern::new();
        p.add_double(FC_PIXEL_SIZE_OBJECT, 12.0);
        let mut font = FcPattern::new();
        font.add_double(FC_PIXEL_SIZE_OBJECT, 12.0);
        assert_eq!(FcCompare(&p, &font).map(|s| s[FcPriority::PixelSize as usize]), Ok(0.0));
    }

    #[test]
    fn variable_axes_are_written() {
        let mut font = FcPattern::new();
        font.add_string(FC_FAMILY_OBJECT, "Var");
        font.add_bool(FC_VARIABLE_OBJECT, PatternMatch::True);
        font.add_range(FC_WEIGHT_OBJECT, FcRange::new(0.0, 210.0));
        font.add_string(FC_FONT_VARIATIONS_OBJECT, "slnt=-5");
        let mut pat = FcPattern::new();
        pat.add_integer(FC_WEIGHT_OBJECT, 200);
        let config = FcConfig::new();
        let r = FcFontRenderPrepare(Some(&config), &pat, &font).unwrap();
        assert_eq!(r.get_double(FC_WEIGHT_OBJECT, 0), Ok(200.0));
        assert_eq!(r.get_string(FC_FONT_VARIATIONS_OBJECT, 0), Ok("wght=700,slnt=-5"));
    }

    #[test]
    fn localized_name_moves_to_front() {
        let mut font = FcPattern::new();
        font.add_string(FC_FAMILY_OBJECT, "Sans");
        font.add_string(FC_FAMILYLANG_OBJECT, "en");
        font.add_string(FC_FAMILY_OBJECT, "Sanz");
        font.add_string(FC_FAMILYLANG_OBJECT, "de");
        let mut pat = FcPattern::new();
        pat.add_string(FC_FAMILYLANG_OBJECT, "de");
        let config = FcConfig::new();
        let r = FcFontRenderPrepare(Some(&config), &pat, &font).unwrap();
        assert_eq!(r.get_string(FC_FAMILY_OBJECT, 0), Ok("Sanz"));
        assert_eq!(r.get_string(FC_FAMILYLANG_OBJECT, 0), Ok("de"));
        assert_eq!(r.get_string(FC_FAMILY_OBJECT, 1), Ok("Sans"));
    }
}
