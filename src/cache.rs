//! Directory caches: a font set frozen into a relocatable blob that can be
//! written to disk, mapped back in and read without fix-ups.
//!
//! Blob header (32 bytes, little-endian):
//!
//! | offset | field |
//! |---|---|
//! | 0 | magic |
//! | 4 | version |
//! | 8 | total size |
//! | 12 | link to the directory name |
//! | 16 | link to the subdirectory list (`n: u32`, `n` × string link) |
//! | 20 | link to the font set |
//! | 24 | directory mtime checksum (seconds) |
//! | 28 | directory mtime checksum (nanoseconds) |
//!
//! Header links are relative to the blob start; see [`crate::serialize`]
//! for the encoding of everything else.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;

use crate::charset::{FcCharLeaf, FcCharSet, FcCharSetFreezer};
use crate::error::FcCacheError;
use crate::lang::{FcLangSet, NUM_LANG_SET_MAP};
use crate::object::FcObjectValidType;
use crate::pattern::{FcFontSet, FcPattern};
use crate::serialize::*;
use crate::value::{FcMatrix, FcRange, FcValue, FcValueBinding, FcValueList};
use crate::PatternMatch;

/// Blob meant to be mapped from a file.
pub const FC_CACHE_MAGIC_MMAP: u32 = 0xFC02_FC04;
/// Blob built in memory.
pub const FC_CACHE_MAGIC_ALLOC: u32 = 0xFC02_FC05;
pub const FC_CACHE_VERSION: u32 = 9;
pub const FC_CACHE_HEADER_SIZE: usize = 32;

const FC_CACHE_SUFFIX: &str = "-le64.cache-9";

// ── Validating reader ──

#[derive(Clone, Copy)]
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn bytes(&self, at: usize, len: usize, what: &'static str) -> Result<&'a [u8], FcCacheError> {
        at.checked_add(len)
            .and_then(|end| self.buf.get(at..end))
            .ok_or(FcCacheError::BadOffset { what, offset: at })
    }

    fn u32(&self, at: usize, what: &'static str) -> Result<u32, FcCacheError> {
        let b = self.bytes(at, 4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&self, at: usize, what: &'static str) -> Result<i32, FcCacheError> {
        Ok(self.u32(at, what)? as i32)
    }

    fn f64(&self, at: usize, what: &'static str) -> Result<f64, FcCacheError> {
        let b = self.bytes(at, 8, what)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(f64::from_le_bytes(a))
    }

    // Follows the link stored at `field` of the object at `base`.
    fn link(&self, base: usize, field: usize, what: &'static str) -> Result<usize, FcCacheError> {
        let rel = self.i32(field, what)? as i64;
        let target = base as i64 + rel;
        if target < 0 || target as usize >= self.buf.len() {
            return Err(FcCacheError::BadOffset { what, offset: field });
        }
        Ok(target as usize)
    }

    // Element count whose elements of `size` bytes starting at `start` fit.
    fn count(&self, at: usize, start: usize, size: usize, what: &'static str) -> Result<usize, FcCacheError> {
        let n = self.u32(at, what)? as usize;
        self.bytes(start, n.saturating_mul(size), what)?;
        Ok(n)
    }

    fn string(&self, at: usize, what: &'static str) -> Result<&'a str, FcCacheError> {
        let len = self.u32(at, what)? as usize;
        let b = self.bytes(at + 4, len, what)?;
        core::str::from_utf8(b).map_err(|_| FcCacheError::BadString(what))
    }
}

// Rebuilds owned objects out of a blob. Shared blob objects stay shared:
// a charset or leaf reached twice decodes to one `Arc`.
struct Decoder<'a> {
    r: Reader<'a>,
    charsets: HashMap<usize, Arc<FcCharSet>>,
    leaves: HashMap<usize, Arc<FcCharLeaf>>,
    langsets: HashMap<usize, Arc<FcLangSet>>,
    strings: HashMap<usize, Arc<str>>,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Decoder {
            r: Reader { buf },
            charsets: HashMap::new(),
            leaves: HashMap::new(),
            langsets: HashMap::new(),
            strings: HashMap::new(),
        }
    }

    fn string(&mut self, at: usize) -> Result<Arc<str>, FcCacheError> {
        if let Some(s) = self.strings.get(&at) {
            return Ok(Arc::clone(s));
        }
        let s: Arc<str> = Arc::from(self.r.string(at, "string")?);
        self.strings.insert(at, Arc::clone(&s));
        Ok(s)
    }

    fn leaf(&mut self, at: usize) -> Result<Arc<FcCharLeaf>, FcCacheError> {
        if let Some(l) = self.leaves.get(&at) {
            return Ok(Arc::clone(l));
        }
        let mut leaf = FcCharLeaf::default();
        for (i, w) in leaf.map.iter_mut().enumerate() {
            *w = self.r.u32(at + i * 4, "charset leaf")?;
        }
        let leaf = Arc::new(leaf);
        self.leaves.insert(at, Arc::clone(&leaf));
        Ok(leaf)
    }

    fn charset(&mut self, at: usize) -> Result<Arc<FcCharSet>, FcCacheError> {
        if let Some(cs) = self.charsets.get(&at) {
            return Ok(Arc::clone(cs));
        }
        let n = self.r.count(at, at + 4, 8, "charset")?;
        let mut cs = FcCharSet::new();
        let mut last = None;
        for i in 0..n {
            let field = at + 4 + i * 8;
            let page = self.r.u32(field, "charset page")?;
            let page = u16::try_from(page)
                .ok()
                .filter(|p| last.map_or(true, |l| *p > l))
                .ok_or(FcCacheError::BadOffset { what: "charset page", offset: field })?;
            last = Some(page);
            let leaf_at = self.r.link(at, field + 4, "charset leaf")?;
            cs.put_leaf(page, self.leaf(leaf_at)?);
        }
        let cs = Arc::new(cs);
        self.charsets.insert(at, Arc::clone(&cs));
        Ok(cs)
    }

    fn langset(&mut self, at: usize) -> Result<Arc<FcLangSet>, FcCacheError> {
        if let Some(ls) = self.langsets.get(&at) {
            return Ok(Arc::clone(ls));
        }
        let map_len = self.r.count(at, at + 8, 4, "langset")?;
        let mut map = [0u32; NUM_LANG_SET_MAP];
        // blobs written against a shorter table leave the tail empty
        for (i, w) in map.iter_mut().enumerate().take(map_len) {
            *w = self.r.u32(at + 8 + i * 4, "langset map")?;
        }
        let ls = Arc::new(FcLangSet::from_map(map));
        self.langsets.insert(at, Arc::clone(&ls));
        Ok(ls)
    }

    fn value_list(&mut self, at: usize) -> Result<FcValueList, FcCacheError> {
        let start = at + FC_VALUE_LIST_HEADER;
        let n = self.r.count(at, start, FC_VALUE_SIZE, "value list")?;
        let mut list = FcValueList::new();
        for i in 0..n {
            let field = start + i * FC_VALUE_SIZE;
            let payload = field + 8;
            let binding = match self.r.u32(field + 4, "value binding")? {
                0 => FcValueBinding::Weak,
                1 => FcValueBinding::Strong,
                _ => FcValueBinding::Same,
            };
            let value = match self.r.u32(field, "value")? {
                FC_TAG_VOID => FcValue::Void,
                FC_TAG_INTEGER => FcValue::Integer(self.r.i32(payload, "integer")?),
                FC_TAG_DOUBLE => FcValue::Double(self.r.f64(payload, "double")?),
                FC_TAG_BOOL => FcValue::Bool(match self.r.u32(payload, "bool")? {
                    0 => PatternMatch::True,
                    1 => PatternMatch::False,
                    _ => PatternMatch::DontCare,
                }),
                FC_TAG_STRING => {
                    let t = self.r.link(at, payload, "string")?;
                    FcValue::String(self.string(t)?)
                }
                FC_TAG_MATRIX => {
                    let t = self.r.link(at, payload, "matrix")?;
                    FcValue::Matrix(FcMatrix {
                        xx: self.r.f64(t, "matrix")?,
                        xy: self.r.f64(t + 8, "matrix")?,
                        yx: self.r.f64(t + 16, "matrix")?,
                        yy: self.r.f64(t + 24, "matrix")?,
                    })
                }
                FC_TAG_RANGE => {
                    let t = self.r.link(at, payload, "range")?;
                    FcValue::Range(FcRange::new(self.r.f64(t, "range")?, self.r.f64(t + 8, "range")?))
                }
                FC_TAG_CHARSET => {
                    let t = self.r.link(at, payload, "charset")?;
                    FcValue::CharSet(self.charset(t)?)
                }
                FC_TAG_LANGSET => {
                    let t = self.r.link(at, payload, "langset")?;
                    FcValue::LangSet(self.langset(t)?)
                }
                tag => return Err(FcCacheError::BadValueTag(tag)),
            };
            list.append(value, binding);
        }
        Ok(list)
    }

    fn pattern(&mut self, at: usize) -> Result<FcPattern, FcCacheError> {
        let n = self.r.count(at, at + 4, 8, "pattern")?;
        let mut pat = FcPattern::new();
        let mut last = 0;
        for i in 0..n {
            let field = at + 4 + i * 8;
            let object = self.r.u32(field, "pattern object")?;
            if object <= last {
                return Err(FcCacheError::BadOffset { what: "pattern object", offset: field });
            }
            last = object;
            let list_at = self.r.link(at, field + 4, "value list")?;
            let list = self.value_list(list_at)?;
            if list.iter().any(|e| !FcObjectValidType(object, e.value.value_type())) {
                return Err(FcCacheError::BadValueTag(object));
            }
            pat.list_add(object, list, true);
        }
        Ok(pat)
    }

    fn font_links(&self, set_at: usize) -> Result<Vec<usize>, FcCacheError> {
        let n = self.r.count(set_at, set_at + 4, 4, "font set")?;
        (0..n)
            .map(|i| self.r.link(set_at, set_at + 4 + i * 4, "font"))
            .collect()
    }
}

// ── Cache handle ──

enum CacheData {
    Heap(Vec<u8>),
    #[cfg(all(feature = "std", not(target_family = "wasm")))]
    Mapped(mmapio::Mmap),
}

impl CacheData {
    fn bytes(&self) -> &[u8] {
        match self {
            CacheData::Heap(v) => v.as_slice(),
            #[cfg(all(feature = "std", not(target_family = "wasm")))]
            CacheData::Mapped(m) => &m[..],
        }
    }
}

struct CacheInner {
    data: CacheData,
    dir: String,
    subdirs: Vec<String>,
    fonts: Vec<usize>,
    checksum: (i32, i32),
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        let base = self.data.bytes().as_ptr() as usize;
        CACHES.lock().remove(&base);
    }
}

/// A loaded, validated cache blob. Cheap to clone.
#[derive(Clone)]
pub struct FcCache {
    inner: Arc<CacheInner>,
}

impl core::fmt::Debug for FcCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FcCache")
            .field("dir", &self.inner.dir)
            .field("fonts", &self.inner.fonts.len())
            .field("size", &self.bytes().len())
            .finish()
    }
}

impl PartialEq for FcCache {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Checks header, bounds of every link and type of every value of a blob.
pub fn FcCacheOffsetsValid(buf: &[u8]) -> Result<(), FcCacheError> {
    let header = parse_header(buf)?;
    let mut d = Decoder::new(buf);
    for at in d.font_links(header.set)? {
        d.pattern(at)?;
    }
    Ok(())
}

struct Header {
    dir: usize,
    subdirs: usize,
    set: usize,
    checksum: (i32, i32),
}

fn parse_header(buf: &[u8]) -> Result<Header, FcCacheError> {
    if buf.len() < FC_CACHE_HEADER_SIZE {
        return Err(FcCacheError::Truncated(buf.len()));
    }
    let r = Reader { buf };
    let magic = r.u32(0, "magic")?;
    if magic != FC_CACHE_MAGIC_MMAP && magic != FC_CACHE_MAGIC_ALLOC {
        return Err(FcCacheError::BadMagic(magic));
    }
    let version = r.u32(4, "version")?;
    if version != FC_CACHE_VERSION {
        return Err(FcCacheError::BadVersion(version));
    }
    let declared = r.u32(8, "size")? as usize;
    if declared != buf.len() {
        return Err(FcCacheError::SizeMismatch { declared, actual: buf.len() });
    }
    Ok(Header {
        dir: r.link(0, 12, "directory")?,
        subdirs: r.link(0, 16, "subdirectories")?,
        set: r.link(0, 20, "font set")?,
        checksum: (r.i32(24, "checksum")?, r.i32(28, "checksum")?),
    })
}

impl FcCache {
    fn from_data(data: CacheData) -> Result<FcCache, FcCacheError> {
        let buf = data.bytes();
        FcCacheOffsetsValid(buf)?;
        let header = parse_header(buf)?;
        let d = Decoder::new(buf);
        let dir = String::from(d.r.string(header.dir, "directory")?);
        let n = d.r.count(header.subdirs, header.subdirs + 4, 4, "subdirectories")?;
        let subdirs = (0..n)
            .map(|i| {
                let at = d.r.link(header.subdirs, header.subdirs + 4 + i * 4, "subdirectory")?;
                d.r.string(at, "subdirectory").map(String::from)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let fonts = d.font_links(header.set)?;
        let inner = Arc::new(CacheInner {
            data,
            dir,
            subdirs,
            fonts,
            checksum: header.checksum,
        });
        register(&inner);
        log::debug!("loaded cache for {} ({} fonts)", inner.dir, inner.fonts.len());
        Ok(FcCache { inner })
    }

    /// Validates and takes ownership of a blob.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<FcCache, FcCacheError> {
        Self::from_data(CacheData::Heap(bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        self.inner.data.bytes()
    }

    /// Directory the cache describes.
    pub fn dir(&self) -> &str {
        &self.inner.dir
    }

    pub fn subdirs(&self) -> &[String] {
        &self.inner.subdirs
    }

    /// Directory mtime (seconds, nanoseconds) recorded at build time.
    pub fn checksum(&self) -> (i32, i32) {
        self.inner.checksum
    }

    pub fn font_count(&self) -> usize {
        self.inner.fonts.len()
    }

    /// A view of font `i`, decoded on access.
    pub fn font(&self, i: usize) -> Option<FcCacheObject> {
        let offset = *self.inner.fonts.get(i)?;
        Some(FcCacheObject::CacheView { cache: self.clone(), offset })
    }

    /// Decodes every font. Charsets, langsets and strings shared inside the
    /// blob stay shared.
    pub fn font_set(&self) -> Result<FcFontSet, FcCacheError> {
        let mut d = Decoder::new(self.bytes());
        let mut set = FcFontSet::new();
        for &at in &self.inner.fonts {
            set.add(d.pattern(at)?);
        }
        Ok(set)
    }

    fn base(&self) -> usize {
        self.bytes().as_ptr() as usize
    }
}

/// A pattern that is either an ordinary heap value or lives inside a cache
/// blob. A view keeps its cache alive; it is never mutated in place.
#[derive(Debug, Clone)]
pub enum FcCacheObject {
    Owned(Arc<FcPattern>),
    CacheView { cache: FcCache, offset: usize },
}

impl FcCacheObject {
    pub fn is_cache_resident(&self) -> bool {
        matches!(self, FcCacheObject::CacheView { .. })
    }

    /// The pattern itself; views are decoded into a fresh copy.
    pub fn pattern(&self) -> Result<Arc<FcPattern>, FcCacheError> {
        match self {
            FcCacheObject::Owned(p) => Ok(Arc::clone(p)),
            FcCacheObject::CacheView { cache, offset } => {
                Decoder::new(cache.bytes()).pattern(*offset).map(Arc::new)
            }
        }
    }

    /// Address of the object, as understood by [`FcCacheFindByAddr`].
    pub fn addr(&self) -> usize {
        match self {
            FcCacheObject::Owned(p) => Arc::as_ptr(p) as usize,
            FcCacheObject::CacheView { cache, offset } => cache.base() + offset,
        }
    }

    /// Takes a reference on the owning cache; no-op for heap values, whose
    /// lifetime is their `Arc`'s.
    pub fn reference(&self) {
        if self.is_cache_resident() {
            FcCacheObjectReference(self.addr());
        }
    }

    pub fn dereference(&self) {
        if self.is_cache_resident() {
            FcCacheObjectDereference(self.addr());
        }
    }
}

// ── Registry ──

struct CacheEntry {
    end: usize,
    cache: Weak<CacheInner>,
    refs: usize,
}

// Blob start address -> entry.
static CACHES: LazyLock<Mutex<BTreeMap<usize, CacheEntry>>> =
    LazyLock::new(|| Mutex::new(BTreeMap::new()));

fn register(inner: &Arc<CacheInner>) {
    let bytes = inner.data.bytes();
    let base = bytes.as_ptr() as usize;
    CACHES.lock().insert(
        base,
        CacheEntry {
            end: base + bytes.len(),
            cache: Arc::downgrade(inner),
            refs: 1,
        },
    );
}

fn with_entry<R>(addr: usize, f: impl FnOnce(usize, &mut CacheEntry) -> R) -> Option<R> {
    let mut caches = CACHES.lock();
    let (&base, entry) = caches.range_mut(..=addr).next_back()?;
    if addr >= entry.end {
        return None;
    }
    Some(f(base, entry))
}

/// The loaded cache whose blob contains `addr`.
pub fn FcCacheFindByAddr(addr: usize) -> Option<FcCache> {
    with_entry(addr, |_, e| e.cache.upgrade())
        .flatten()
        .map(|inner| FcCache { inner })
}

/// Counts a reference to the object at `addr` against its cache.
pub fn FcCacheObjectReference(addr: usize) -> bool {
    with_entry(addr, |_, e| e.refs += 1).is_some()
}

/// Drops a reference taken with [`FcCacheObjectReference`]. When the count
/// reaches zero the cache leaves the registry; its memory goes with the
/// last [`FcCache`] handle.
pub fn FcCacheObjectDereference(addr: usize) -> bool {
    let mut caches = CACHES.lock();
    let Some((&base, entry)) = caches.range_mut(..=addr).next_back() else {
        return false;
    };
    if addr >= entry.end {
        return false;
    }
    entry.refs = entry.refs.saturating_sub(1);
    if entry.refs == 0 {
        caches.remove(&base);
    }
    true
}

/// Releases the reference taken when `cache` was loaded.
pub fn FcDirCacheUnload(cache: &FcCache) {
    FcCacheObjectDereference(cache.base());
}

/// Current reference count of the cache containing `addr`.
pub fn FcCacheReferenceCount(addr: usize) -> Option<usize> {
    with_entry(addr, |_, e| e.refs)
}

// ── Building ──

/// Serializes `set` with its directory metadata into a new cache.
/// Charsets are frozen first so identical coverage is stored once.
pub fn FcDirCacheBuild(
    set: &FcFontSet,
    dir: &str,
    subdirs: &[&str],
    checksum: (i32, i32),
) -> Result<FcCache, FcCacheError> {
    let set = freeze_charsets(set);
    let mut s = FcSerialize::new();
    let header = s.reserve(FC_CACHE_HEADER_SIZE);
    dir.serialize_alloc(&mut s);
    let dirs_at = s.reserve(4 + subdirs.len() * 4);
    for sub in subdirs {
        sub.serialize_alloc(&mut s);
    }
    if !set.serialize_alloc(&mut s) {
        return Err(FcCacheError::BadOffset { what: "font set", offset: s.size() });
    }
    let size = u32::try_from(s.size()).map_err(|_| FcCacheError::Truncated(s.size()))?;

    s.begin_write();
    let failed = |what: &'static str| FcCacheError::BadOffset { what, offset: 0 };
    let dir_at = dir.serialize(&mut s).ok_or_else(|| failed("directory"))?;
    s.put_u32(dirs_at, subdirs.len() as u32).ok_or_else(|| failed("subdirectories"))?;
    for (i, sub) in subdirs.iter().enumerate() {
        let at = sub.serialize(&mut s).ok_or_else(|| failed("subdirectory"))?;
        s.put_link(dirs_at + 4 + i * 4, dirs_at, at).ok_or_else(|| failed("subdirectory"))?;
    }
    let set_at = set.serialize(&mut s).ok_or_else(|| failed("font set"))?;
    write_header(&mut s, header, size, [dir_at, dirs_at, set_at], checksum)
        .ok_or_else(|| failed("header"))?;

    FcCache::from_bytes(s.finish())
}

fn write_header(
    s: &mut FcSerialize,
    at: usize,
    size: u32,
    links: [usize; 3],
    checksum: (i32, i32),
) -> Option<()> {
    s.put_u32(at, FC_CACHE_MAGIC_ALLOC)?;
    s.put_u32(at + 4, FC_CACHE_VERSION)?;
    s.put_u32(at + 8, size)?;
    for (i, target) in links.into_iter().enumerate() {
        s.put_link(at + 12 + i * 4, at, target)?;
    }
    s.put_i32(at + 24, checksum.0)?;
    s.put_i32(at + 28, checksum.1)
}

fn freeze_charsets(set: &FcFontSet) -> FcFontSet {
    let mut freezer = FcCharSetFreezer::new();
    let frozen: FcFontSet = set
        .iter()
        .map(|font| {
            let mut font = font.duplicate();
            if let Some(elt) = font.find_elt_mut(crate::object::FC_CHARSET_OBJECT) {
                for e in elt.values.iter_mut() {
                    if let FcValue::CharSet(cs) = &e.value {
                        e.value = FcValue::CharSet(freezer.freeze(cs));
                    }
                }
            }
            font
        })
        .collect();
    let (leaves, leaves_seen, sets, sets_seen) = freezer.stats();
    log::debug!(
        "froze {} charsets into {} ({} leaves into {})",
        sets_seen,
        sets,
        leaves_seen,
        leaves
    );
    frozen
}

// ── Files ──

/// Default per-user cache directory.
#[cfg(feature = "std")]
pub fn FcCacheDir() -> Option<std::path::PathBuf> {
    dirs::cache_dir().map(|d| d.join("fontconfig"))
}

/// Cache file name for `dir`: a hash of the path plus the format suffix.
pub fn FcDirCacheBasename(dir: &str) -> String {
    // FNV-1a, 64 bit
    let hash = dir
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
    alloc::format!("{:016x}{}", hash, FC_CACHE_SUFFIX)
}

/// Directory mtime as (seconds, nanoseconds), truncated to 32 bits.
#[cfg(feature = "std")]
pub fn FcDirChecksum(dir: &std::path::Path) -> Result<(i32, i32), FcCacheError> {
    let modified = std::fs::metadata(dir)?.modified()?;
    let since = modified
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    Ok((since.as_secs() as i32, since.subsec_nanos() as i32))
}

/// Whether `cache` still describes `dir` as it is on disk.
#[cfg(feature = "std")]
pub fn FcDirCacheValid(cache: &FcCache, dir: &std::path::Path) -> Result<(), FcCacheError> {
    if FcDirChecksum(dir)? != cache.checksum() {
        return Err(FcCacheError::Stale(dir.display().to_string()));
    }
    Ok(())
}

/// Writes the blob with one buffered write to a temporary file, then
/// renames it into place so readers never see a partial cache.
#[cfg(feature = "std")]
pub fn FcDirCacheWrite(cache: &FcCache, path: &std::path::Path) -> Result<(), FcCacheError> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("TMP");
    {
        let mut f = std::io::BufWriter::new(std::fs::File::create(&tmp)?);
        f.write_all(cache.bytes())?;
        f.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    log::debug!("wrote cache {}", path.display());
    Ok(())
}

/// Loads and validates a cache file, mapping it when possible.
#[cfg(feature = "std")]
pub fn FcDirCacheLoadFile(path: &std::path::Path) -> Result<FcCache, FcCacheError> {
    let file = std::fs::File::open(path)?;

    #[cfg(not(target_family = "wasm"))]
    {
        // SAFETY: cache files are replaced by rename, never rewritten in place
        if let Ok(map) = unsafe { mmapio::MmapOptions::new().map(&file) } {
            return FcCache::from_data(CacheData::Mapped(map)).map_err(|e| {
                log::warn!("rejecting cache {}: {}", path.display(), e);
                e
            });
        }
    }

    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut &file, &mut bytes)?;
    FcCache::from_bytes(bytes).map_err(|e| {
        log::warn!("rejecting cache {}: {}", path.display(), e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;

    fn sample_set() -> FcFontSet {
        let mut a = FcPattern::new();
        a.add_string(FC_FAMILY_OBJECT, "Alpha");
        a.add_integer(FC_WEIGHT_OBJECT, 80);
        a.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_ranges(&[(0x20, 0x7e)]));
        let mut b = FcPattern::new();
        b.add_string(FC_FAMILY_OBJECT, "Beta");
        b.add_range(FC_WEIGHT_OBJECT, FcRange::new(100.0, 900.0));
        b.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_ranges(&[(0x20, 0x7e)]));
        b.add_langset(FC_LANG_OBJECT, FcLangSet::from_langs(["en", "fr"]));
        b.add_matrix(FC_MATRIX_OBJECT, FcMatrix::IDENTITY.scale(2.0, 1.0));
        [a, b].into_iter().collect()
    }

    #[test]
    fn build_and_read_back() {
        let set = sample_set();
        let cache = FcDirCacheBuild(&set, "/fonts", &["/fonts/sub"], (7, 9)).unwrap();
        assert_eq!(cache.dir(), "/fonts");
        assert_eq!(cache.subdirs(), ["/fonts/sub"]);
        assert_eq!(cache.checksum(), (7, 9));
        let back = cache.font_set().unwrap();
        assert_eq!(back.len(), 2);
        for (x, y) in set.iter().zip(back.iter()) {
            assert_eq!(x, y);
        }
        // identical coverage is stored once and decodes to one charset
        let cs0 = back.font(0).unwrap().values(FC_CHARSET_OBJECT).unwrap().get(0).unwrap().value.clone();
        let cs1 = back.font(1).unwrap().values(FC_CHARSET_OBJECT).unwrap().get(0).unwrap().value.clone();
        match (cs0, cs1) {
            (FcValue::CharSet(a), FcValue::CharSet(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("charset expected"),
        }
    }

    #[test]
    fn langsets_keep_only_table_languages() {
        let mut p = FcPattern::new();
        p.add_langset(FC_LANG_OBJECT, FcLangSet::from_langs(["de", "x-private"]));
        let set: FcFontSet = [p].into_iter().collect();
        let back = FcDirCacheBuild(&set, "/fonts", &[], (0, 0)).unwrap().font_set().unwrap();
        let ls = back.font(0).unwrap().get_langset(FC_LANG_OBJECT, 0).unwrap();
        assert_eq!(ls.has_lang("de"), crate::lang::FcLangResult::Equal);
        assert!(ls.extra().is_empty());
    }

    #[test]
    fn blob_is_relocatable() {
        let cache = FcDirCacheBuild(&sample_set(), "/fonts", &[], (0, 0)).unwrap();
        let copy = FcCache::from_bytes(cache.bytes().to_vec()).unwrap();
        assert_eq!(cache.font_set().unwrap(), copy.font_set().unwrap());
    }

    #[test]
    fn corrupt_blobs_are_rejected() {
        let cache = FcDirCacheBuild(&sample_set(), "/fonts", &[], (0, 0)).unwrap();
        let mut bytes = cache.bytes().to_vec();
        assert!(matches!(FcCacheOffsetsValid(&bytes[..16]), Err(FcCacheError::Truncated(16))));
        bytes[0] = 0;
        assert!(matches!(FcCacheOffsetsValid(&bytes), Err(FcCacheError::BadMagic(_))));
        let mut bytes = cache.bytes().to_vec();
        // point the font set link past the end
        let len = bytes.len();
        bytes[20..24].copy_from_slice(&(len as i32).to_le_bytes());
        assert!(matches!(FcCacheOffsetsValid(&bytes), Err(FcCacheError::BadOffset { .. })));
    }

    #[test]
    fn views_and_registry() {
        let cache = FcDirCacheBuild(&sample_set(), "/fonts", &[], (0, 0)).unwrap();
        let view = cache.font(1).unwrap();
        assert!(view.is_cache_resident());
        assert_eq!(view.pattern().unwrap().get_string(FC_FAMILY_OBJECT, 0), Ok("Beta"));
        assert_eq!(FcCacheFindByAddr(view.addr()), Some(cache.clone()));
        view.reference();
        assert_eq!(FcCacheReferenceCount(view.addr()), Some(2));
        view.dereference();
        FcDirCacheUnload(&cache);
        assert_eq!(FcCacheFindByAddr(view.addr()), None);
        // the view still owns the bytes
        assert!(view.pattern().is_ok());
    }
}
