//! Relocatable arena builder for cache blobs.
//!
//! Serializing is two passes over the same object graph. The alloc pass
//! reserves space for every distinct object, keyed by its address, and
//! accumulates the blob size. The write pass allocates the blob once and
//! replays the walk, encoding each object at its reserved offset. Links
//! between objects are stored as `i32` byte offsets relative to the start
//! of the object holding the link, so a blob is valid wherever it is
//! loaded or mapped.
//!
//! Encodings (little-endian, every object 8-aligned):
//!
//! | object | layout |
//! |---|---|
//! | string | `len: u32`, bytes |
//! | font set | `n: u32`, `n` × pattern link |
//! | pattern | `n: u32`, `n` × (`object: u32`, value list link) |
//! | value list | `n: u32`, `pad: u32`, `n` × 16-byte value |
//! | value | `tag: u32`, `binding: u32`, 8-byte payload (scalar or link) |
//! | matrix | 4 × `f64` |
//! | range | 2 × `f64` |
//! | charset | `n: u32`, `n` × (`page: u32`, leaf link) |
//! | leaf | 8 × `u32` |
//! | langset | `map_len: u32`, `pad: u32`, map words |
//!
//! Only the table bitmap of a langset is stored; languages outside the
//! table are dropped.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;
use std::collections::HashMap;

use crate::charset::{FcCharLeaf, FcCharSet};
use crate::lang::{FcLangSet, NUM_LANG_SET_MAP};
use crate::pattern::{FcFontSet, FcPattern};
use crate::value::{FcMatrix, FcRange, FcValue, FcValueBinding, FcValueList};

pub const FC_SERIALIZE_ALIGN: usize = 8;

// value tags
pub const FC_TAG_VOID: u32 = 1;
pub const FC_TAG_INTEGER: u32 = 2;
pub const FC_TAG_DOUBLE: u32 = 3;
pub const FC_TAG_STRING: u32 = 4;
pub const FC_TAG_BOOL: u32 = 5;
pub const FC_TAG_MATRIX: u32 = 6;
pub const FC_TAG_CHARSET: u32 = 7;
pub const FC_TAG_LANGSET: u32 = 9;
pub const FC_TAG_RANGE: u32 = 10;

pub const FC_VALUE_SIZE: usize = 16;
pub const FC_VALUE_LIST_HEADER: usize = 8;

#[inline]
fn align(n: usize) -> usize {
    (n + FC_SERIALIZE_ALIGN - 1) & !(FC_SERIALIZE_ALIGN - 1)
}

fn address<T: ?Sized + 'static>(object: &T) -> (usize, TypeId) {
    (object as *const T as *const () as usize, TypeId::of::<T>())
}

/// Arena state shared by both passes.
#[derive(Debug, Default)]
pub struct FcSerialize {
    size: usize,
    // (address, type) -> reserved offset
    offsets: HashMap<(usize, TypeId), usize>,
    buf: Vec<u8>,
}

impl FcSerialize {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes reserved so far.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reserves an anonymous block (headers and the like).
    pub fn reserve(&mut self, size: usize) -> usize {
        let offset = self.size;
        self.size = align(self.size + size);
        offset
    }

    /// Reserves `size` bytes for `object` unless it already has a block.
    /// Returns whether the object was new.
    pub fn alloc<T: ?Sized + 'static>(&mut self, object: &T, size: usize) -> bool {
        let key = address(object);
        if self.offsets.contains_key(&key) {
            return false;
        }
        let offset = self.reserve(size);
        self.offsets.insert(key, offset);
        true
    }

    /// Offset reserved for `object` in the alloc pass.
    pub fn offset<T: ?Sized + 'static>(&self, object: &T) -> Option<usize> {
        self.offsets.get(&address(object)).copied()
    }

    /// Switches to the write pass: allocates the zeroed blob.
    pub fn begin_write(&mut self) {
        self.buf = alloc::vec![0u8; self.size];
    }

    pub fn put_bytes(&mut self, at: usize, bytes: &[u8]) -> Option<()> {
        self.buf.get_mut(at..at + bytes.len())?.copy_from_slice(bytes);
        Some(())
    }

    pub fn put_u32(&mut self, at: usize, v: u32) -> Option<()> {
        self.put_bytes(at, &v.to_le_bytes())
    }

    pub fn put_i32(&mut self, at: usize, v: i32) -> Option<()> {
        self.put_bytes(at, &v.to_le_bytes())
    }

    pub fn put_f64(&mut self, at: usize, v: f64) -> Option<()> {
        self.put_bytes(at, &v.to_le_bytes())
    }

    /// Stores the link from the object at `base` (field at `at`) to `target`.
    pub fn put_link(&mut self, at: usize, base: usize, target: usize) -> Option<()> {
        let rel = i32::try_from(target as i64 - base as i64).ok()?;
        self.put_i32(at, rel)
    }

    /// The finished blob.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Something that can be laid out in a cache blob.
pub trait FcSerializeObject {
    /// Alloc pass: reserve this object and everything it links to.
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool;
    /// Write pass: encode this object and everything it links to, returning
    /// its offset.
    fn serialize(&self, s: &mut FcSerialize) -> Option<usize>;
}

impl FcSerializeObject for str {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        s.alloc(self, 4 + self.len());
        true
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        s.put_u32(at, u32::try_from(self.len()).ok()?)?;
        s.put_bytes(at + 4, self.as_bytes())?;
        Some(at)
    }
}

impl FcSerializeObject for FcMatrix {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        s.alloc(self, 32);
        true
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        for (i, v) in [self.xx, self.xy, self.yx, self.yy].into_iter().enumerate() {
            s.put_f64(at + i * 8, v)?;
        }
        Some(at)
    }
}

impl FcSerializeObject for FcRange {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        s.alloc(self, 16);
        true
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        s.put_f64(at, self.begin)?;
        s.put_f64(at + 8, self.end)?;
        Some(at)
    }
}

impl FcSerializeObject for FcCharLeaf {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        s.alloc(self, 32);
        true
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        for (i, w) in self.map.iter().enumerate() {
            s.put_u32(at + i * 4, *w)?;
        }
        Some(at)
    }
}

impl FcSerializeObject for FcCharSet {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        let pages: Vec<_> = self.raw_pages().iter().filter(|(_, l)| !l.is_empty()).collect();
        if !s.alloc(self, 4 + pages.len() * 8) {
            return true;
        }
        for (_, leaf) in pages {
            leaf.serialize_alloc(s);
        }
        true
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        let pages: Vec<_> = self.raw_pages().iter().filter(|(_, l)| !l.is_empty()).collect();
        s.put_u32(at, u32::try_from(pages.len()).ok()?)?;
        for (i, (page, leaf)) in pages.into_iter().enumerate() {
            let field = at + 4 + i * 8;
            let leaf_at = leaf.serialize(s)?;
            s.put_u32(field, u32::from(*page))?;
            s.put_link(field + 4, at, leaf_at)?;
        }
        Some(at)
    }
}

impl FcSerializeObject for FcLangSet {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        s.alloc(self, 8 + NUM_LANG_SET_MAP * 4);
        true
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        s.put_u32(at, NUM_LANG_SET_MAP as u32)?;
        for (i, w) in self.map().iter().enumerate() {
            s.put_u32(at + 8 + i * 4, *w)?;
        }
        Some(at)
    }
}

// Face handles belong to the running process and never reach a blob.
fn storable(v: &FcValue) -> bool {
    !matches!(v, FcValue::FtFace(_) | FcValue::Unknown)
}

fn binding_tag(b: FcValueBinding) -> u32 {
    match b {
        FcValueBinding::Weak => 0,
        FcValueBinding::Strong => 1,
        FcValueBinding::Same => 2,
    }
}

impl FcSerializeObject for FcValueList {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        let n = self.values().filter(|v| storable(v)).count();
        if !s.alloc(self, FC_VALUE_LIST_HEADER + n * FC_VALUE_SIZE) {
            return true;
        }
        for v in self.values() {
            match v {
                FcValue::String(st) => st.serialize_alloc(s),
                FcValue::Matrix(m) => m.serialize_alloc(s),
                FcValue::Range(r) => r.serialize_alloc(s),
                FcValue::CharSet(cs) => cs.serialize_alloc(s),
                FcValue::LangSet(ls) => ls.serialize_alloc(s),
                _ => true,
            };
        }
        true
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        let elts: Vec<_> = self.iter().filter(|e| storable(&e.value)).collect();
        s.put_u32(at, u32::try_from(elts.len()).ok()?)?;
        for (i, e) in elts.into_iter().enumerate() {
            let field = at + FC_VALUE_LIST_HEADER + i * FC_VALUE_SIZE;
            let payload = field + 8;
            s.put_u32(field + 4, binding_tag(e.binding))?;
            let tag = match &e.value {
                FcValue::Void => FC_TAG_VOID,
                FcValue::Integer(n) => {
                    s.put_i32(payload, *n)?;
                    FC_TAG_INTEGER
                }
                FcValue::Double(d) => {
                    s.put_f64(payload, *d)?;
                    FC_TAG_DOUBLE
                }
                FcValue::Bool(b) => {
                    s.put_u32(payload, *b as u32)?;
                    FC_TAG_BOOL
                }
                FcValue::String(st) => {
                    let target = st.serialize(s)?;
                    s.put_link(payload, at, target)?;
                    FC_TAG_STRING
                }
                FcValue::Matrix(m) => {
                    let target = m.serialize(s)?;
                    s.put_link(payload, at, target)?;
                    FC_TAG_MATRIX
                }
                FcValue::Range(r) => {
                    let target = r.serialize(s)?;
                    s.put_link(payload, at, target)?;
                    FC_TAG_RANGE
                }
                FcValue::CharSet(cs) => {
                    let target = cs.serialize(s)?;
                    s.put_link(payload, at, target)?;
                    FC_TAG_CHARSET
                }
                FcValue::LangSet(ls) => {
                    let target = ls.serialize(s)?;
                    s.put_link(payload, at, target)?;
                    FC_TAG_LANGSET
                }
                FcValue::Unknown | FcValue::FtFace(_) => return None,
            };
            s.put_u32(field, tag)?;
        }
        Some(at)
    }
}

impl FcSerializeObject for FcPattern {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        if !s.alloc(self, 4 + self.num() * 8) {
            return true;
        }
        self.elts().iter().all(|e| e.values.serialize_alloc(s))
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        s.put_u32(at, u32::try_from(self.num()).ok()?)?;
        for (i, e) in self.elts().iter().enumerate() {
            let field = at + 4 + i * 8;
            let list_at = e.values.serialize(s)?;
            s.put_u32(field, e.object)?;
            s.put_link(field + 4, at, list_at)?;
        }
        Some(at)
    }
}

impl FcSerializeObject for FcFontSet {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        if !s.alloc(self, 4 + self.len() * 4) {
            return true;
        }
        self.iter().all(|p| p.serialize_alloc(s))
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        let at = s.offset(self)?;
        s.put_u32(at, u32::try_from(self.len()).ok()?)?;
        for (i, p) in self.iter().enumerate() {
            let target = p.serialize(s)?;
            s.put_link(at + 4 + i * 4, at, target)?;
        }
        Some(at)
    }
}

impl<T: FcSerializeObject + ?Sized> FcSerializeObject for Arc<T> {
    fn serialize_alloc(&self, s: &mut FcSerialize) -> bool {
        (**self).serialize_alloc(s)
    }

    fn serialize(&self, s: &mut FcSerialize) -> Option<usize> {
        (**self).serialize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::FC_FAMILY_OBJECT;

    #[test]
    fn shared_objects_are_laid_out_once() {
        let name: Arc<str> = Arc::from("Shared");
        let mut a = FcPattern::new();
        a.add(FC_FAMILY_OBJECT, FcValue::String(Arc::clone(&name)), true);
        let mut b = FcPattern::new();
        b.add(FC_FAMILY_OBJECT, FcValue::String(Arc::clone(&name)), true);

        let mut s = FcSerialize::new();
        a.serialize_alloc(&mut s);
        let after_a = s.size();
        b.serialize_alloc(&mut s);
        // pattern and value list only; the string is reused
        assert_eq!(s.size() - after_a, align(4 + 8) + align(FC_VALUE_LIST_HEADER + FC_VALUE_SIZE));
        let total = s.size();

        s.begin_write();
        assert_eq!(a.serialize(&mut s), Some(0));
        assert!(b.serialize(&mut s).is_some());
        assert_eq!(s.finish().len(), total);
    }

    #[test]
    fn links_are_relative_to_their_object() {
        let mut s = FcSerialize::new();
        s.reserve(16);
        "abc".serialize_alloc(&mut s);
        s.begin_write();
        s.put_link(4, 0, 16).unwrap();
        let buf = s.finish();
        assert_eq!(i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]), 16);
    }
}
