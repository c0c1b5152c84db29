//! Patterns: sorted maps from object id to value list, plus font sets and
//! object sets built on top of them.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::charset::FcCharSet;
use crate::lang::FcLangSet;
use crate::object::{
    FcObject, FcObjectFromName, FcObjectLookupIdByName, FcObjectName, FcObjectValidType,
};
use crate::value::{FcMatrix, FcRange, FcValue, FcValueBinding, FcValueElt, FcValueList};
use crate::{FcResult, PatternMatch};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcPatternElt {
    pub object: FcObject,
    pub values: FcValueList,
}

/// A font request or a font's metadata.
///
/// Elements are kept sorted by object id with no duplicates, so lookups are
/// binary searches and two patterns can be merge-walked in id order.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcPattern {
    elts: Vec<FcPatternElt>,
}

impl FcPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects present.
    #[inline]
    pub fn num(&self) -> usize {
        self.elts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elts.is_empty()
    }

    pub fn elts(&self) -> &[FcPatternElt] {
        &self.elts
    }

    fn position(&self, object: FcObject) -> Result<usize, usize> {
        self.elts.binary_search_by_key(&object, |e| e.object)
    }

    pub fn find_elt(&self, object: FcObject) -> Option<&FcPatternElt> {
        self.position(object).ok().map(|i| &self.elts[i])
    }

    pub fn find_elt_mut(&mut self, object: FcObject) -> Option<&mut FcPatternElt> {
        match self.position(object) {
            Ok(i) => Some(&mut self.elts[i]),
            Err(_) => None,
        }
    }

    /// Finds the element for `object`, inserting an empty one in sorted position.
    pub fn insert_elt(&mut self, object: FcObject) -> &mut FcPatternElt {
        let i = match self.position(object) {
            Ok(i) => i,
            Err(i) => {
                self.elts.insert(
                    i,
                    FcPatternElt {
                        object,
                        values: FcValueList::new(),
                    },
                );
                i
            }
        };
        &mut self.elts[i]
    }

    pub fn values(&self, object: FcObject) -> Option<&FcValueList> {
        self.find_elt(object).map(|e| &e.values)
    }

    pub fn has(&self, object: FcObject) -> bool {
        self.position(object).is_ok()
    }

    /// Adds one value. Rejects (and logs) values whose type the object does
    /// not accept; the pattern is then left unchanged.
    pub fn add_with_binding(
        &mut self,
        object: FcObject,
        value: FcValue,
        binding: FcValueBinding,
        append: bool,
    ) -> bool {
        if value.is_void() {
            return false;
        }
        if !FcObjectValidType(object, value.value_type()) {
            log::warn!(
                "pattern object {} does not accept value of type {:?}",
                FcObjectName(object).unwrap_or("<unknown>"),
                value.value_type()
            );
            return false;
        }
        let elt = self.insert_elt(object);
        if append {
            elt.values.append(value, binding)
        } else {
            elt.values.prepend(value, binding)
        }
    }

    /// Adds with a strong binding.
    pub fn add(&mut self, object: FcObject, value: impl Into<FcValue>, append: bool) -> bool {
        self.add_with_binding(object, value.into(), FcValueBinding::Strong, append)
    }

    pub fn add_weak(&mut self, object: FcObject, value: impl Into<FcValue>, append: bool) -> bool {
        self.add_with_binding(object, value.into(), FcValueBinding::Weak, append)
    }

    /// Adds by object name, registering unknown names.
    pub fn add_named(&mut self, name: &str, value: impl Into<FcValue>, append: bool) -> bool {
        let object = FcObjectLookupIdByName(name);
        self.add(object, value, append)
    }

    pub fn add_string(&mut self, object: FcObject, s: &str) -> bool {
        self.add(object, s, true)
    }

    pub fn add_integer(&mut self, object: FcObject, i: i32) -> bool {
        self.add(object, i, true)
    }

    pub fn add_double(&mut self, object: FcObject, d: f64) -> bool {
        self.add(object, d, true)
    }

    pub fn add_bool(&mut self, object: FcObject, b: PatternMatch) -> bool {
        self.add(object, b, true)
    }

    pub fn add_matrix(&mut self, object: FcObject, m: FcMatrix) -> bool {
        self.add(object, m, true)
    }

    pub fn add_range(&mut self, object: FcObject, r: FcRange) -> bool {
        self.add(object, r, true)
    }

    pub fn add_charset(&mut self, object: FcObject, cs: FcCharSet) -> bool {
        self.add(object, cs, true)
    }

    pub fn add_langset(&mut self, object: FcObject, ls: FcLangSet) -> bool {
        self.add(object, ls, true)
    }

    /// Adds a whole list. Either every value is accepted or nothing changes.
    pub fn list_add(&mut self, object: FcObject, list: FcValueList, append: bool) -> bool {
        if let Some(bad) = list
            .values()
            .find(|v| !FcObjectValidType(object, v.value_type()))
        {
            log::warn!(
                "pattern object {} does not accept value of type {:?}",
                FcObjectName(object).unwrap_or("<unknown>"),
                bad.value_type()
            );
            return false;
        }
        if list.is_empty() {
            return true;
        }
        let elt = self.insert_elt(object);
        let pos = if append { elt.values.len() } else { 0 };
        elt.values.splice_at(pos, list, FcValueBinding::Strong);
        true
    }

    pub fn get_with_binding(&self, object: FcObject, n: usize) -> Result<&FcValueElt, FcResult> {
        let elt = self.find_elt(object).ok_or(FcResult::NoMatch)?;
        elt.values.get(n).ok_or(FcResult::NoId)
    }

    /// The `n`th value of `object`.
    pub fn get(&self, object: FcObject, n: usize) -> Result<&FcValue, FcResult> {
        self.get_with_binding(object, n).map(|e| &e.value)
    }

    pub fn get_named(&self, name: &str, n: usize) -> Result<&FcValue, FcResult> {
        let object = FcObjectFromName(name).ok_or(FcResult::NoMatch)?;
        self.get(object, n)
    }

    pub fn get_string(&self, object: FcObject, n: usize) -> Result<&str, FcResult> {
        self.get(object, n)?.as_str().ok_or(FcResult::TypeMismatch)
    }

    /// Doubles are truncated.
    pub fn get_integer(&self, object: FcObject, n: usize) -> Result<i32, FcResult> {
        match self.get(object, n)? {
            FcValue::Integer(i) => Ok(*i),
            FcValue::Double(d) => Ok(*d as i32),
            _ => Err(FcResult::TypeMismatch),
        }
    }

    pub fn get_double(&self, object: FcObject, n: usize) -> Result<f64, FcResult> {
        self.get(object, n)?.as_f64().ok_or(FcResult::TypeMismatch)
    }

    pub fn get_bool(&self, object: FcObject, n: usize) -> Result<PatternMatch, FcResult> {
        self.get(object, n)?.as_bool().ok_or(FcResult::TypeMismatch)
    }

    pub fn get_matrix(&self, object: FcObject, n: usize) -> Result<&FcMatrix, FcResult> {
        self.get(object, n)?.as_matrix().ok_or(FcResult::TypeMismatch)
    }

    pub fn get_range(&self, object: FcObject, n: usize) -> Result<FcRange, FcResult> {
        self.get(object, n)?.as_range().ok_or(FcResult::TypeMismatch)
    }

    pub fn get_charset(&self, object: FcObject, n: usize) -> Result<&FcCharSet, FcResult> {
        self.get(object, n)?.as_charset().ok_or(FcResult::TypeMismatch)
    }

    pub fn get_langset(&self, object: FcObject, n: usize) -> Result<&FcLangSet, FcResult> {
        self.get(object, n)?.as_langset().ok_or(FcResult::TypeMismatch)
    }

    /// Removes every value of `object`.
    pub fn del(&mut self, object: FcObject) -> bool {
        match self.position(object) {
            Ok(i) => {
                self.elts.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// Removes the `n`th value of `object`, dropping the element once empty.
    pub fn remove(&mut self, object: FcObject, n: usize) -> bool {
        let Ok(i) = self.position(object) else {
            return false;
        };
        if self.elts[i].values.remove(n).is_none() {
            return false;
        }
        if self.elts[i].values.is_empty() {
            self.elts.remove(i);
        }
        true
    }

    /// Drops elements whose value list became empty.
    pub(crate) fn canonicalize(&mut self, object: FcObject) {
        if let Ok(i) = self.position(object) {
            if self.elts[i].values.is_empty() {
                self.elts.remove(i);
            }
        }
    }

    /// Independent deep copy.
    pub fn duplicate(&self) -> FcPattern {
        self.clone()
    }

    /// Projects onto `os`; `None` copies everything.
    pub fn filter(&self, os: Option<&FcObjectSet>) -> FcPattern {
        let Some(os) = os else {
            return self.clone();
        };
        FcPattern {
            elts: self
                .elts
                .iter()
                .filter(|e| os.contains(e.object))
                .cloned()
                .collect(),
        }
    }

    /// Appends every value of `other`, preserving bindings.
    pub fn append(&mut self, other: &FcPattern) -> bool {
        for elt in &other.elts {
            for v in &elt.values {
                if !self.add_with_binding(elt.object, v.value.clone(), v.binding, true) {
                    return false;
                }
            }
        }
        true
    }

    /// Equality restricted to the objects in `os`.
    pub fn equal_subset(&self, other: &FcPattern, os: &FcObjectSet) -> bool {
        os.objects().iter().all(|&o| match (self.values(o), other.values(o)) {
            (Some(a), Some(b)) => a.equal(b),
            (None, None) => true,
            _ => false,
        })
    }

    pub fn hash32(&self) -> u32 {
        self.elts.iter().fold(0u32, |h, e| {
            h.rotate_left(1) ^ e.object ^ e.values.hash32()
        })
    }

    pub fn iter(&self) -> FcPatternIter<'_> {
        FcPatternIter::start(self)
    }
}

impl PartialEq for FcPattern {
    fn eq(&self, other: &Self) -> bool {
        self.elts.len() == other.elts.len()
            && self
                .elts
                .iter()
                .zip(&other.elts)
                .all(|(a, b)| a.object == b.object && a.values.equal(&b.values))
    }
}

/// Cursor over a pattern's elements in object order.
///
/// The cursor remembers both the element index and its object id; every
/// access re-checks that the index still holds that object and re-finds it
/// otherwise.
#[derive(Debug, Clone, Copy)]
pub struct FcPatternIterState {
    index: usize,
    object: FcObject,
}

impl FcPatternIterState {
    pub fn object(&self) -> FcObject {
        self.object
    }

    pub fn resolve<'a>(&self, pat: &'a FcPattern) -> Option<&'a FcPatternElt> {
        match pat.elts.get(self.index) {
            Some(e) if e.object == self.object => Some(e),
            _ => pat.find_elt(self.object),
        }
    }
}

pub struct FcPatternIter<'a> {
    pat: &'a FcPattern,
    state: Option<FcPatternIterState>,
    started: bool,
}

impl<'a> FcPatternIter<'a> {
    pub fn start(pat: &'a FcPattern) -> Self {
        Self { pat, state: None, started: false }
    }

    /// Positions the cursor at `object`, if present.
    pub fn find(pat: &'a FcPattern, object: FcObject) -> Self {
        let state = pat
            .position(object)
            .ok()
            .map(|index| FcPatternIterState { index, object });
        Self { pat, state, started: true }
    }

    pub fn state(&self) -> Option<FcPatternIterState> {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state.and_then(|s| s.resolve(self.pat)).is_some()
    }
}

impl<'a> Iterator for FcPatternIter<'a> {
    type Item = &'a FcPatternElt;

    fn next(&mut self) -> Option<Self::Item> {
        let next_index = match (self.started, self.state) {
            (false, _) => 0,
            (true, Some(s)) => match self.pat.position(s.object) {
                Ok(i) => i + 1,
                Err(i) => i,
            },
            (true, None) => return None,
        };
        self.started = true;
        let elt = self.pat.elts.get(next_index);
        self.state = elt.map(|e| FcPatternIterState {
            index: next_index,
            object: e.object,
        });
        elt
    }
}

/// Ordered list of objects, used for projections and listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FcObjectSet {
    objects: Vec<FcObject>,
}

impl FcObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(names: &[&str]) -> Self {
        let mut os = Self::new();
        for name in names {
            os.add(FcObjectLookupIdByName(name));
        }
        os
    }

    pub fn add(&mut self, object: FcObject) -> bool {
        if !self.objects.contains(&object) {
            self.objects.push(object);
        }
        true
    }

    pub fn contains(&self, object: FcObject) -> bool {
        self.objects.contains(&object)
    }

    pub fn objects(&self) -> &[FcObject] {
        &self.objects
    }
}

/// Growable set of font patterns; insertion order breaks ties in matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FcFontSet {
    fonts: Vec<Arc<FcPattern>>,
}

impl FcFontSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, font: FcPattern) -> bool {
        self.fonts.push(Arc::new(font));
        true
    }

    pub fn add_shared(&mut self, font: Arc<FcPattern>) -> bool {
        self.fonts.push(font);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn font(&self, i: usize) -> Option<&Arc<FcPattern>> {
        self.fonts.get(i)
    }

    pub fn fonts(&self) -> &[Arc<FcPattern>] {
        &self.fonts
    }

    pub fn iter(&self) -> impl Iterator<Item = &FcPattern> + '_ {
        self.fonts.iter().map(|f| &**f)
    }
}

impl FromIterator<FcPattern> for FcFontSet {
    fn from_iter<T: IntoIterator<Item = FcPattern>>(iter: T) -> Self {
        FcFontSet {
            fonts: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;

    #[test]
    fn elements_stay_sorted() {
        let mut p = FcPattern::new();
        p.add_integer(FC_WEIGHT_OBJECT, 80);
        p.add_string(FC_FAMILY_OBJECT, "Arial");
        p.add_double(FC_SIZE_OBJECT, 12.0);
        let ids: Vec<_> = p.iter().map(|e| e.object).collect();
        assert_eq!(ids, vec![FC_FAMILY_OBJECT, FC_WEIGHT_OBJECT, FC_SIZE_OBJECT]);
    }

    #[test]
    fn rejects_mistyped_values() {
        let mut p = FcPattern::new();
        assert!(!p.add_integer(FC_FAMILY_OBJECT, 3));
        assert!(p.is_empty());
        assert!(!p.add(FC_FAMILY_OBJECT, FcValue::Void, true));
        assert!(p.is_empty());
    }

    #[test]
    fn get_variants() {
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "A");
        p.add(FC_FAMILY_OBJECT, "B", false);
        assert_eq!(p.get_string(FC_FAMILY_OBJECT, 0), Ok("B"));
        assert_eq!(p.get_string(FC_FAMILY_OBJECT, 2), Err(FcResult::NoId));
        assert_eq!(p.get_string(FC_STYLE_OBJECT, 0), Err(FcResult::NoMatch));
        assert_eq!(p.get_integer(FC_FAMILY_OBJECT, 0), Err(FcResult::TypeMismatch));
        assert!(p.remove(FC_FAMILY_OBJECT, 0));
        assert!(p.remove(FC_FAMILY_OBJECT, 0));
        assert!(!p.has(FC_FAMILY_OBJECT));
    }

    #[test]
    fn iterator_survives_insertion_before_cursor() {
        let mut p = FcPattern::new();
        p.add_integer(FC_SLANT_OBJECT, 0);
        p.add_integer(FC_WEIGHT_OBJECT, 80);
        let state = FcPatternIter::find(&p, FC_WEIGHT_OBJECT).state().unwrap();
        p.add_string(FC_FAMILY_OBJECT, "X");
        let elt = state.resolve(&p).unwrap();
        assert_eq!(elt.object, FC_WEIGHT_OBJECT);
    }

    #[test]
    fn filter_and_subset_equality() {
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "A");
        p.add_string(FC_STYLE_OBJECT, "Bold");
        let os = FcObjectSet::build(&[FC_FAMILY]);
        let f = p.filter(Some(&os));
        assert_eq!(f.num(), 1);
        assert!(f.equal_subset(&p, &os));
        assert_ne!(f, p);
    }
}
