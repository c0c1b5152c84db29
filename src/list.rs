//! Font listing: every font matching a pattern, projected onto an object
//! set and deduplicated.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::{FcConfig, FcConfigGetCurrent, FcSetName};
use crate::expr::{FcConfigCompareValue, FcOp, FcOpFlags};
use crate::hash::FcHashTable;
use crate::lang::{FcGetDefaultLangs, FcLangCompare, FcLangResult};
use crate::object::*;
use crate::pattern::{FcFontSet, FcObjectSet, FcPattern};
use crate::value::FcValueList;

/// Bucket count of the listing dedup table.
const FC_LIST_HASH_SIZE: usize = 4099;

/// Every value in `pat` must be matched by some value in `font`.
fn FcListValueListMatchAny(pat: &FcValueList, font: &FcValueList) -> bool {
    pat.values().all(|pv| {
        font.values()
            .any(|fv| FcConfigCompareValue(fv, FcOp::Listing, FcOpFlags::IGNORE_BLANKS, pv))
    })
}

/// Whether `font` carries every object of `p` (other than `namelang`) with
/// values covering the requested ones.
pub fn FcListPatternMatchAny(p: &FcPattern, font: &FcPattern) -> bool {
    p.elts()
        .iter()
        .filter(|pe| pe.object != FC_NAMELANG_OBJECT)
        .all(|pe| match font.values(pe.object) {
            Some(fv) => FcListValueListMatchAny(&pe.values, fv),
            None => false,
        })
}

fn lang_companion(object: FcObject) -> Option<FcObject> {
    match object {
        FC_FAMILY_OBJECT => Some(FC_FAMILYLANG_OBJECT),
        FC_STYLE_OBJECT => Some(FC_STYLELANG_OBJECT),
        FC_FULLNAME_OBJECT => Some(FC_FULLNAMELANG_OBJECT),
        _ => None,
    }
}

// Index of the name whose language best matches the process languages;
// falls back to an English name, then the first one.
fn default_lang_index(font: &FcPattern, lang_object: FcObject) -> usize {
    let Some(langs) = font.values(lang_object) else {
        return 0;
    };
    let mut best: Option<(usize, usize)> = None;
    let mut english = None;
    for (idx, value) in langs.values().enumerate() {
        let Some(s) = value.as_str() else { continue };
        for (rank, lang) in FcGetDefaultLangs().iter().enumerate() {
            let score = match FcLangCompare(s, lang) {
                FcLangResult::Equal => rank * 2,
                FcLangResult::DifferentTerritory => rank * 2 + 1,
                FcLangResult::DifferentLang => continue,
            };
            if best.map_or(true, |(b, _)| score < b) {
                best = Some((score, idx));
            }
        }
        if english.is_none() && FcLangCompare(s, "en") != FcLangResult::DifferentLang {
            english = Some(idx);
        }
    }
    best.map(|(_, idx)| idx).or(english).unwrap_or(0)
}

// Copies the requested objects out of `font`. Localized names keep only the
// entry in the preferred language, together with its language tag.
fn project(font: &FcPattern, os: Option<&FcObjectSet>) -> FcPattern {
    let objects: Vec<FcObject> = match os {
        Some(os) => os.objects().to_vec(),
        None => font.elts().iter().map(|e| e.object).collect(),
    };
    let mut out = FcPattern::new();
    for &object in &objects {
        let Some(values) = font.values(object) else { continue };
        match lang_companion(object) {
            Some(lang_object) => {
                let idx = default_lang_index(font, lang_object);
                if let Some(elt) = values.get(idx).or_else(|| values.get(0)) {
                    out.add_with_binding(object, elt.value.clone(), elt.binding, true);
                }
                let wanted = os.map_or(true, |os| os.contains(lang_object));
                if let Ok(lang) = font.get_with_binding(lang_object, idx) {
                    if wanted && !out.has(lang_object) {
                        out.add_with_binding(lang_object, lang.value.clone(), lang.binding, true);
                    }
                }
            }
            None => {
                // already filled in from its name object
                if matches!(
                    object,
                    FC_FAMILYLANG_OBJECT | FC_STYLELANG_OBJECT | FC_FULLNAMELANG_OBJECT
                ) && out.has(object)
                {
                    continue;
                }
                out.list_add(object, values.clone(), true);
            }
        }
    }
    out
}

/// Lists the fonts of `sets` matching `p`, each reduced to the objects in
/// `os` (all objects when `None`), without duplicates. Order follows the
/// first occurrence of each distinct projection.
pub fn FcFontSetList(sets: &[&FcFontSet], p: &FcPattern, os: Option<&FcObjectSet>) -> FcFontSet {
    let seen: FcHashTable<Arc<FcPattern>, ()> = FcHashTable::with_buckets(
        FC_LIST_HASH_SIZE,
        |p| p.hash32(),
        |a, b| **a == **b,
    );
    let mut out = FcFontSet::new();
    for set in sets {
        for font in set.iter() {
            if !FcListPatternMatchAny(p, font) {
                continue;
            }
            let projected = Arc::new(project(font, os));
            if seen.add(Arc::clone(&projected), ()) {
                out.add_shared(projected);
            }
        }
    }
    log::trace!("list matched {} distinct fonts", out.len());
    out
}

/// [`FcFontSetList`] over the system and application fonts of `config`, or
/// of the current configuration.
pub fn FcFontList(config: Option<&FcConfig>, p: &FcPattern, os: Option<&FcObjectSet>) -> FcFontSet {
    let current;
    let config = match config {
        Some(c) => c,
        None => {
            current = FcConfigGetCurrent();
            &*current
        }
    };
    let sets = [
        config.fonts(FcSetName::System),
        config.fonts(FcSetName::Application),
    ];
    FcFontSetList(&sets, p, os)
}
