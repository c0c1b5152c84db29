//! Tagged scalar values and the ordered value lists stored in patterns.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::cmp::Ordering;
use core::fmt;

use crate::charset::FcCharSet;
use crate::lang::FcLangSet;
use crate::strings::{FcStrCmpIgnoreCase, FcStrHashIgnoreCase};
use crate::PatternMatch;

/// Runtime type of an [`FcValue`]; also the declared type of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FcType {
    Unknown,
    Void,
    Integer,
    Double,
    String,
    Bool,
    Matrix,
    CharSet,
    FtFace,
    LangSet,
    Range,
}

/// 2x2 transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcMatrix {
    pub xx: f64,
    pub xy: f64,
    pub yx: f64,
    pub yy: f64,
}

impl FcMatrix {
    pub const IDENTITY: FcMatrix = FcMatrix { xx: 1.0, xy: 0.0, yx: 0.0, yy: 1.0 };

    pub fn multiply(&self, b: &FcMatrix) -> FcMatrix {
        FcMatrix {
            xx: self.xx * b.xx + self.xy * b.yx,
            xy: self.xx * b.xy + self.xy * b.yy,
            yx: self.yx * b.xx + self.yy * b.yx,
            yy: self.yx * b.xy + self.yy * b.yy,
        }
    }

    pub fn scale(&self, sx: f64, sy: f64) -> FcMatrix {
        self.multiply(&FcMatrix { xx: sx, xy: 0.0, yx: 0.0, yy: sy })
    }
}

impl Default for FcMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Closed numeric interval, used for weight/width/size of variable fonts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcRange {
    pub begin: f64,
    pub end: f64,
}

impl FcRange {
    pub fn new(begin: f64, end: f64) -> Self {
        Self { begin, end }
    }

    /// The degenerate range `[v, v]`.
    pub fn promote(v: f64) -> Self {
        Self { begin: v, end: v }
    }

    pub fn hash32(&self) -> u32 {
        double_hash(self.begin) ^ double_hash(self.end)
    }
}

/// Opaque face handle supplied by a scanner. Compared by identity and never
/// written into caches.
#[derive(Clone)]
pub struct FcFace(pub Arc<dyn Any + Send + Sync>);

impl fmt::Debug for FcFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FcFace({:p})", Arc::as_ptr(&self.0))
    }
}

impl PartialEq for FcFace {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FcValue {
    Unknown,
    Void,
    Integer(i32),
    Double(f64),
    String(Arc<str>),
    Bool(PatternMatch),
    Matrix(FcMatrix),
    CharSet(Arc<FcCharSet>),
    #[cfg_attr(feature = "serde", serde(skip))]
    FtFace(FcFace),
    LangSet(Arc<FcLangSet>),
    Range(FcRange),
}

#[inline]
fn double_hash(d: f64) -> u32 {
    let bits = d.to_bits();
    (bits as u32) ^ ((bits >> 32) as u32)
}

impl FcValue {
    pub fn value_type(&self) -> FcType {
        match self {
            FcValue::Unknown => FcType::Unknown,
            FcValue::Void => FcType::Void,
            FcValue::Integer(_) => FcType::Integer,
            FcValue::Double(_) => FcType::Double,
            FcValue::String(_) => FcType::String,
            FcValue::Bool(_) => FcType::Bool,
            FcValue::Matrix(_) => FcType::Matrix,
            FcValue::CharSet(_) => FcType::CharSet,
            FcValue::FtFace(_) => FcType::FtFace,
            FcValue::LangSet(_) => FcType::LangSet,
            FcValue::Range(_) => FcType::Range,
        }
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, FcValue::Void)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FcValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view: integers widen to doubles.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FcValue::Integer(i) => Some(f64::from(*i)),
            FcValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<PatternMatch> {
        match self {
            FcValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_charset(&self) -> Option<&FcCharSet> {
        match self {
            FcValue::CharSet(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_langset(&self) -> Option<&FcLangSet> {
        match self {
            FcValue::LangSet(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&FcMatrix> {
        match self {
            FcValue::Matrix(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<FcRange> {
        match self {
            FcValue::Range(r) => Some(*r),
            _ => None,
        }
    }

    /// Equality with int/double coercion; strings compare case-insensitively.
    pub fn equal(&self, other: &FcValue) -> bool {
        use FcValue::*;
        match (self, other) {
            (Integer(_) | Double(_), Integer(_) | Double(_)) => self.as_f64() == other.as_f64(),
            (Unknown, Unknown) => false,
            (Void, Void) => true,
            (String(a), String(b)) => FcStrCmpIgnoreCase(a, b) == Ordering::Equal,
            (Bool(a), Bool(b)) => a == b,
            (Matrix(a), Matrix(b)) => a == b,
            (CharSet(a), CharSet(b)) => a == b,
            (FtFace(a), FtFace(b)) => a == b,
            (LangSet(a), LangSet(b)) => a == b,
            (Range(a), Range(b)) => a == b,
            _ => false,
        }
    }

    /// Hash consistent with [`equal`](Self::equal).
    pub fn hash32(&self) -> u32 {
        match self {
            FcValue::Unknown | FcValue::Void => 0,
            FcValue::Integer(_) | FcValue::Double(_) => {
                double_hash(self.as_f64().unwrap_or_default())
            }
            FcValue::String(s) => FcStrHashIgnoreCase(s),
            FcValue::Bool(b) => *b as u32,
            FcValue::Matrix(m) => {
                double_hash(m.xx) ^ double_hash(m.xy) ^ double_hash(m.yx) ^ double_hash(m.yy)
            }
            FcValue::CharSet(c) => c.hash32(),
            FcValue::FtFace(f) => Arc::as_ptr(&f.0) as *const u8 as usize as u32,
            FcValue::LangSet(l) => l.hash32(),
            FcValue::Range(r) => r.hash32(),
        }
    }
}

impl PartialEq for FcValue {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl From<i32> for FcValue {
    fn from(v: i32) -> Self {
        FcValue::Integer(v)
    }
}

impl From<f64> for FcValue {
    fn from(v: f64) -> Self {
        FcValue::Double(v)
    }
}

impl From<&str> for FcValue {
    fn from(v: &str) -> Self {
        FcValue::String(Arc::from(v))
    }
}

impl From<String> for FcValue {
    fn from(v: String) -> Self {
        FcValue::String(Arc::from(v))
    }
}

impl From<bool> for FcValue {
    fn from(v: bool) -> Self {
        FcValue::Bool(PatternMatch::from(v))
    }
}

impl From<PatternMatch> for FcValue {
    fn from(v: PatternMatch) -> Self {
        FcValue::Bool(v)
    }
}

impl From<FcMatrix> for FcValue {
    fn from(v: FcMatrix) -> Self {
        FcValue::Matrix(v)
    }
}

impl From<FcRange> for FcValue {
    fn from(v: FcRange) -> Self {
        FcValue::Range(v)
    }
}

impl From<FcCharSet> for FcValue {
    fn from(v: FcCharSet) -> Self {
        FcValue::CharSet(Arc::new(v))
    }
}

impl From<FcLangSet> for FcValue {
    fn from(v: FcLangSet) -> Self {
        FcValue::LangSet(Arc::new(v))
    }
}

/// Provenance of a value; decides how later rules may replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FcValueBinding {
    Weak,
    Strong,
    /// Inherit the binding of whatever this value was copied from.
    Same,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcValueElt {
    pub value: FcValue,
    pub binding: FcValueBinding,
}

/// Ordered, non-unique list of values. Order is priority.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcValueList(Vec<FcValueElt>);

impl FcValueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I: IntoIterator<Item = FcValue>>(values: I, binding: FcValueBinding) -> Self {
        let mut list = Self::new();
        for v in values {
            list.append(v, binding);
        }
        list
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, FcValueElt> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, FcValueElt> {
        self.0.iter_mut()
    }

    pub fn values(&self) -> impl Iterator<Item = &FcValue> + '_ {
        self.0.iter().map(|e| &e.value)
    }

    pub fn get(&self, n: usize) -> Option<&FcValueElt> {
        self.0.get(n)
    }

    /// Inserts at `pos`. Void values never enter a list.
    pub fn insert(&mut self, pos: usize, value: FcValue, binding: FcValueBinding) -> bool {
        if value.is_void() {
            return false;
        }
        let pos = pos.min(self.0.len());
        self.0.insert(pos, FcValueElt { value, binding });
        true
    }

    pub fn append(&mut self, value: FcValue, binding: FcValueBinding) -> bool {
        let len = self.0.len();
        self.insert(len, value, binding)
    }

    pub fn prepend(&mut self, value: FcValue, binding: FcValueBinding) -> bool {
        self.insert(0, value, binding)
    }

    /// Splices `other` in at `pos`, resolving `Same` bindings to `inherit`.
    pub fn splice_at(&mut self, pos: usize, other: FcValueList, inherit: FcValueBinding) {
        let pos = pos.min(self.0.len());
        let incoming = other.0.into_iter().filter(|e| !e.value.is_void()).map(|mut e| {
            if e.binding == FcValueBinding::Same {
                e.binding = inherit;
            }
            e
        });
        self.0.splice(pos..pos, incoming);
    }

    pub fn remove(&mut self, pos: usize) -> Option<FcValueElt> {
        if pos < self.0.len() {
            Some(self.0.remove(pos))
        } else {
            None
        }
    }

    pub fn retain(&mut self, f: impl FnMut(&FcValueElt) -> bool) {
        self.0.retain(f)
    }

    /// Same values in the same order; bindings are ignored.
    pub fn equal(&self, other: &FcValueList) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| a.value.equal(&b.value))
    }

    pub fn hash32(&self) -> u32 {
        self.0
            .iter()
            .fold(0u32, |h, e| h.rotate_left(1) ^ e.value.hash32())
    }
}

impl PartialEq for FcValueList {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl<'a> IntoIterator for &'a FcValueList {
    type Item = &'a FcValueElt;
    type IntoIter = core::slice::Iter<'a, FcValueElt>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for FcValueList {
    type Item = FcValueElt;
    type IntoIter = alloc::vec::IntoIter<FcValueElt>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion() {
        assert_eq!(FcValue::Integer(400), FcValue::Double(400.0));
        assert_eq!(FcValue::Integer(400).hash32(), FcValue::Double(400.0).hash32());
        assert_ne!(FcValue::Integer(1), FcValue::from("1"));
        assert_eq!(FcValue::from("Arial"), FcValue::from("ARIAL"));
    }

    #[test]
    fn void_never_enters_a_list() {
        let mut l = FcValueList::new();
        assert!(!l.append(FcValue::Void, FcValueBinding::Strong));
        assert!(l.append(FcValue::from(1), FcValueBinding::Strong));
        assert!(l.prepend(FcValue::from(0), FcValueBinding::Weak));
        assert_eq!(l.len(), 2);
        assert_eq!(l.get(0).map(|e| e.binding), Some(FcValueBinding::Weak));
    }

    #[test]
    fn splice_resolves_same_binding() {
        let mut l = FcValueList::from_values([FcValue::from(1), FcValue::from(4)], FcValueBinding::Weak);
        let mid = FcValueList::from_values([FcValue::from(2), FcValue::from(3)], FcValueBinding::Same);
        l.splice_at(1, mid, FcValueBinding::Strong);
        let got: Vec<_> = l.iter().map(|e| (e.value.as_f64().unwrap(), e.binding)).collect();
        assert_eq!(got[1], (2.0, FcValueBinding::Strong));
        assert_eq!(got[3], (4.0, FcValueBinding::Weak));
    }
}
