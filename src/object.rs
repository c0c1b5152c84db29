//! The object table: every built-in pattern object with its declared value
//! type, comparator and priority slots.
//!
//! Object ids are dense, start at 1 and follow table order. Names not in the
//! table are registered on first use and get ids above
//! [`FC_MAX_BASE_OBJECT`]; those accept values of any type and never take
//! part in scoring.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::RwLock;

use crate::value::FcType;

pub type FcObject = u32;

/// Score slots, in tie-break order. A font's score vector is compared
/// lexicographically in exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FcPriority {
    File,
    FontFormat,
    Variable,
    Scalable,
    Color,
    Foundry,
    Charset,
    FamilyStrong,
    PostscriptNameStrong,
    Lang,
    FamilyWeak,
    PostscriptNameWeak,
    Symbol,
    Spacing,
    Size,
    PixelSize,
    Style,
    Slant,
    Weight,
    Width,
    FontHasHint,
    Decorative,
    Antialias,
    Rasterizer,
    Outline,
    Order,
    FontVersion,
}

pub const PRI_END: usize = FcPriority::FontVersion as usize + 1;

/// Which distance function scores an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FcCompareKind {
    Number,
    String,
    Family,
    PostScript,
    Bool,
    CharSet,
    Lang,
    Range,
    Size,
    Filename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcMatcher {
    pub object: FcObject,
    pub kind: FcCompareKind,
    pub strong: FcPriority,
    pub weak: FcPriority,
}

#[derive(Debug, Clone, Copy)]
pub struct FcObjectDef {
    pub name: &'static str,
    pub ty: FcType,
    pub compare: Option<(FcCompareKind, FcPriority, FcPriority)>,
}

const fn obj(name: &'static str, ty: FcType) -> FcObjectDef {
    FcObjectDef { name, ty, compare: None }
}

const fn scored(name: &'static str, ty: FcType, kind: FcCompareKind, pri: FcPriority) -> FcObjectDef {
    FcObjectDef { name, ty, compare: Some((kind, pri, pri)) }
}

const fn scored2(
    name: &'static str,
    ty: FcType,
    kind: FcCompareKind,
    strong: FcPriority,
    weak: FcPriority,
) -> FcObjectDef {
    FcObjectDef { name, ty, compare: Some((kind, strong, weak)) }
}

use FcCompareKind as K;
use FcPriority as P;

/// Built-in objects; id = index + 1.
pub static FC_OBJECTS: [FcObjectDef; 56] = [
    scored2("family", FcType::String, K::Family, P::FamilyStrong, P::FamilyWeak),
    obj("familylang", FcType::String),
    scored("style", FcType::String, K::String, P::Style),
    obj("stylelang", FcType::String),
    obj("fullname", FcType::String),
    obj("fullnamelang", FcType::String),
    scored("slant", FcType::Integer, K::Number, P::Slant),
    scored("weight", FcType::Range, K::Range, P::Weight),
    scored("width", FcType::Range, K::Range, P::Width),
    scored("size", FcType::Range, K::Size, P::Size),
    obj("aspect", FcType::Double),
    scored("pixelsize", FcType::Double, K::Number, P::PixelSize),
    scored("spacing", FcType::Integer, K::Number, P::Spacing),
    scored("foundry", FcType::String, K::String, P::Foundry),
    scored("antialias", FcType::Bool, K::Bool, P::Antialias),
    obj("hintstyle", FcType::Integer),
    obj("hinting", FcType::Bool),
    obj("verticallayout", FcType::Bool),
    obj("autohint", FcType::Bool),
    obj("globaladvance", FcType::Bool),
    scored("file", FcType::String, K::Filename, P::File),
    obj("index", FcType::Integer),
    scored("rasterizer", FcType::String, K::String, P::Rasterizer),
    scored("outline", FcType::Bool, K::Bool, P::Outline),
    scored("scalable", FcType::Bool, K::Bool, P::Scalable),
    obj("dpi", FcType::Double),
    obj("rgba", FcType::Integer),
    obj("scale", FcType::Double),
    obj("minspace", FcType::Bool),
    obj("charwidth", FcType::Integer),
    obj("charheight", FcType::Integer),
    obj("matrix", FcType::Matrix),
    scored("charset", FcType::CharSet, K::CharSet, P::Charset),
    scored("lang", FcType::LangSet, K::Lang, P::Lang),
    scored("fontversion", FcType::Integer, K::Number, P::FontVersion),
    obj("capability", FcType::String),
    scored("fontformat", FcType::String, K::String, P::FontFormat),
    obj("embolden", FcType::Bool),
    obj("embeddedbitmap", FcType::Bool),
    scored("decorative", FcType::Bool, K::Bool, P::Decorative),
    obj("lcdfilter", FcType::Integer),
    obj("namelang", FcType::String),
    obj("fontfeatures", FcType::String),
    obj("prgname", FcType::String),
    obj("hash", FcType::String),
    scored2("postscriptname", FcType::String, K::PostScript, P::PostscriptNameStrong, P::PostscriptNameWeak),
    scored("color", FcType::Bool, K::Bool, P::Color),
    scored("symbol", FcType::Bool, K::Bool, P::Symbol),
    obj("fontvariations", FcType::String),
    scored("variable", FcType::Bool, K::Bool, P::Variable),
    scored("fonthashint", FcType::Bool, K::Bool, P::FontHasHint),
    scored("order", FcType::Integer, K::Number, P::Order),
    obj("desktop", FcType::String),
    obj("namedinstance", FcType::Bool),
    obj("fontwrapper", FcType::String),
    obj("ftface", FcType::FtFace),
];

pub const FC_FAMILY_OBJECT: FcObject = 1;
pub const FC_FAMILYLANG_OBJECT: FcObject = 2;
pub const FC_STYLE_OBJECT: FcObject = 3;
pub const FC_STYLELANG_OBJECT: FcObject = 4;
pub const FC_FULLNAME_OBJECT: FcObject = 5;
pub const FC_FULLNAMELANG_OBJECT: FcObject = 6;
pub const FC_SLANT_OBJECT: FcObject = 7;
pub const FC_WEIGHT_OBJECT: FcObject = 8;
pub const FC_WIDTH_OBJECT: FcObject = 9;
pub const FC_SIZE_OBJECT: FcObject = 10;
pub const FC_ASPECT_OBJECT: FcObject = 11;
pub const FC_PIXEL_SIZE_OBJECT: FcObject = 12;
pub const FC_SPACING_OBJECT: FcObject = 13;
pub const FC_FOUNDRY_OBJECT: FcObject = 14;
pub const FC_ANTIALIAS_OBJECT: FcObject = 15;
pub const FC_HINT_STYLE_OBJECT: FcObject = 16;
pub const FC_HINTING_OBJECT: FcObject = 17;
pub const FC_VERTICAL_LAYOUT_OBJECT: FcObject = 18;
pub const FC_AUTOHINT_OBJECT: FcObject = 19;
pub const FC_GLOBAL_ADVANCE_OBJECT: FcObject = 20;
pub const FC_FILE_OBJECT: FcObject = 21;
pub const FC_INDEX_OBJECT: FcObject = 22;
pub const FC_RASTERIZER_OBJECT: FcObject = 23;
pub const FC_OUTLINE_OBJECT: FcObject = 24;
pub const FC_SCALABLE_OBJECT: FcObject = 25;
pub const FC_DPI_OBJECT: FcObject = 26;
pub const FC_RGBA_OBJECT: FcObject = 27;
pub const FC_SCALE_OBJECT: FcObject = 28;
pub const FC_MINSPACE_OBJECT: FcObject = 29;
pub const FC_CHARWIDTH_OBJECT: FcObject = 30;
pub const FC_CHAR_HEIGHT_OBJECT: FcObject = 31;
pub const FC_MATRIX_OBJECT: FcObject = 32;
pub const FC_CHARSET_OBJECT: FcObject = 33;
pub const FC_LANG_OBJECT: FcObject = 34;
pub const FC_FONTVERSION_OBJECT: FcObject = 35;
pub const FC_CAPABILITY_OBJECT: FcObject = 36;
pub const FC_FONTFORMAT_OBJECT: FcObject = 37;
pub const FC_EMBOLDEN_OBJECT: FcObject = 38;
pub const FC_EMBEDDED_BITMAP_OBJECT: FcObject = 39;
pub const FC_DECORATIVE_OBJECT: FcObject = 40;
pub const FC_LCD_FILTER_OBJECT: FcObject = 41;
pub const FC_NAMELANG_OBJECT: FcObject = 42;
pub const FC_FONT_FEATURES_OBJECT: FcObject = 43;
pub const FC_PRGNAME_OBJECT: FcObject = 44;
pub const FC_HASH_OBJECT: FcObject = 45;
pub const FC_POSTSCRIPT_NAME_OBJECT: FcObject = 46;
pub const FC_COLOR_OBJECT: FcObject = 47;
pub const FC_SYMBOL_OBJECT: FcObject = 48;
pub const FC_FONT_VARIATIONS_OBJECT: FcObject = 49;
pub const FC_VARIABLE_OBJECT: FcObject = 50;
pub const FC_FONT_HAS_HINT_OBJECT: FcObject = 51;
pub const FC_ORDER_OBJECT: FcObject = 52;
pub const FC_DESKTOP_NAME_OBJECT: FcObject = 53;
pub const FC_NAMED_INSTANCE_OBJECT: FcObject = 54;
pub const FC_FONT_WRAPPER_OBJECT: FcObject = 55;
pub const FC_FT_FACE_OBJECT: FcObject = 56;

pub const FC_MAX_BASE_OBJECT: FcObject = 56;

// Object names, for callers that prefer the string API.
pub const FC_FAMILY: &str = "family";
pub const FC_FAMILYLANG: &str = "familylang";
pub const FC_STYLE: &str = "style";
pub const FC_STYLELANG: &str = "stylelang";
pub const FC_FULLNAME: &str = "fullname";
pub const FC_FULLNAMELANG: &str = "fullnamelang";
pub const FC_SLANT: &str = "slant";
pub const FC_WEIGHT: &str = "weight";
pub const FC_WIDTH: &str = "width";
pub const FC_SIZE: &str = "size";
pub const FC_PIXEL_SIZE: &str = "pixelsize";
pub const FC_SPACING: &str = "spacing";
pub const FC_FOUNDRY: &str = "foundry";
pub const FC_ANTIALIAS: &str = "antialias";
pub const FC_FILE: &str = "file";
pub const FC_INDEX: &str = "index";
pub const FC_SCALABLE: &str = "scalable";
pub const FC_CHARSET: &str = "charset";
pub const FC_LANG: &str = "lang";
pub const FC_FONTFORMAT: &str = "fontformat";
pub const FC_POSTSCRIPT_NAME: &str = "postscriptname";
pub const FC_COLOR: &str = "color";
pub const FC_VARIABLE: &str = "variable";
pub const FC_FONT_VARIATIONS: &str = "fontvariations";
pub const FC_ORDER: &str = "order";

static BUILTIN_BY_NAME: LazyLock<HashMap<&'static str, FcObject>> = LazyLock::new(|| {
    FC_OBJECTS
        .iter()
        .enumerate()
        .map(|(i, def)| (def.name, i as FcObject + 1))
        .collect()
});

// Names registered at runtime; never shrinks, so ids stay valid.
static CUSTOM_OBJECTS: LazyLock<RwLock<Vec<&'static str>>> =
    LazyLock::new(|| RwLock::new(Vec::new()));

/// Looks up an object id by name without registering it.
pub fn FcObjectFromName(name: &str) -> Option<FcObject> {
    if let Some(id) = BUILTIN_BY_NAME.get(name) {
        return Some(*id);
    }
    CUSTOM_OBJECTS
        .read()
        .iter()
        .position(|n| *n == name)
        .map(|i| FC_MAX_BASE_OBJECT + 1 + i as FcObject)
}

/// Looks up an object id by name, registering unknown names.
pub fn FcObjectLookupIdByName(name: &str) -> FcObject {
    if let Some(id) = FcObjectFromName(name) {
        return id;
    }
    let mut custom = CUSTOM_OBJECTS.write();
    // another writer may have registered it between the two locks
    if let Some(i) = custom.iter().position(|n| *n == name) {
        return FC_MAX_BASE_OBJECT + 1 + i as FcObject;
    }
    let leaked: &'static str = Box::leak(String::from(name).into_boxed_str());
    custom.push(leaked);
    log::debug!("registered custom object {:?}", name);
    FC_MAX_BASE_OBJECT + custom.len() as FcObject
}

pub fn FcObjectName(object: FcObject) -> Option<&'static str> {
    if object == 0 {
        return None;
    }
    if object <= FC_MAX_BASE_OBJECT {
        return Some(FC_OBJECTS[object as usize - 1].name);
    }
    CUSTOM_OBJECTS
        .read()
        .get((object - FC_MAX_BASE_OBJECT - 1) as usize)
        .copied()
}

pub fn FcObjectDefinition(object: FcObject) -> Option<&'static FcObjectDef> {
    if object == 0 || object > FC_MAX_BASE_OBJECT {
        return None;
    }
    Some(&FC_OBJECTS[object as usize - 1])
}

/// Declared type of an object; custom objects are `Unknown`.
pub fn FcObjectType(object: FcObject) -> FcType {
    FcObjectDefinition(object).map(|d| d.ty).unwrap_or(FcType::Unknown)
}

/// Whether a value of type `ty` may be stored under `object`.
pub fn FcObjectValidType(object: FcObject, ty: FcType) -> bool {
    match FcObjectType(object) {
        FcType::Unknown => true,
        FcType::Double | FcType::Integer => matches!(ty, FcType::Double | FcType::Integer),
        FcType::LangSet => matches!(ty, FcType::LangSet | FcType::String),
        FcType::Range => matches!(ty, FcType::Range | FcType::Double | FcType::Integer),
        declared => declared == ty,
    }
}

/// Matcher for `object`. With `include_lang`, the `*lang` companions of
/// family/style/fullname are scored like `lang`.
pub fn FcObjectToMatcher(object: FcObject, include_lang: bool) -> Option<FcMatcher> {
    let object = match object {
        FC_FAMILYLANG_OBJECT | FC_STYLELANG_OBJECT | FC_FULLNAMELANG_OBJECT if include_lang => {
            FC_LANG_OBJECT
        }
        o => o,
    };
    let (kind, strong, weak) = FcObjectDefinition(object)?.compare?;
    Some(FcMatcher { object, kind, strong, weak })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_table_order() {
        let ids = [
            (FC_FAMILY_OBJECT, FC_FAMILY),
            (FC_STYLE_OBJECT, FC_STYLE),
            (FC_WEIGHT_OBJECT, FC_WEIGHT),
            (FC_SIZE_OBJECT, FC_SIZE),
            (FC_PIXEL_SIZE_OBJECT, FC_PIXEL_SIZE),
            (FC_FILE_OBJECT, FC_FILE),
            (FC_CHARSET_OBJECT, FC_CHARSET),
            (FC_LANG_OBJECT, FC_LANG),
            (FC_FONTFORMAT_OBJECT, FC_FONTFORMAT),
            (FC_POSTSCRIPT_NAME_OBJECT, FC_POSTSCRIPT_NAME),
            (FC_VARIABLE_OBJECT, FC_VARIABLE),
            (FC_FONT_VARIATIONS_OBJECT, FC_FONT_VARIATIONS),
            (FC_ORDER_OBJECT, FC_ORDER),
        ];
        for (id, name) in ids {
            assert_eq!(FcObjectName(id), Some(name));
            assert_eq!(FcObjectFromName(name), Some(id));
        }
        assert_eq!(FcObjectName(FC_FT_FACE_OBJECT), Some("ftface"));
        assert_eq!(FcObjectName(FC_DESKTOP_NAME_OBJECT), Some("desktop"));
        assert_eq!(FcObjectName(FC_NAMELANG_OBJECT), Some("namelang"));
    }

    #[test]
    fn custom_objects_are_stable() {
        let a = FcObjectLookupIdByName("x-test-custom");
        assert!(a > FC_MAX_BASE_OBJECT);
        assert_eq!(FcObjectLookupIdByName("x-test-custom"), a);
        assert_eq!(FcObjectName(a), Some("x-test-custom"));
        assert!(FcObjectValidType(a, FcType::Matrix));
    }

    #[test]
    fn type_validation() {
        assert!(FcObjectValidType(FC_WEIGHT_OBJECT, FcType::Integer));
        assert!(FcObjectValidType(FC_LANG_OBJECT, FcType::String));
        assert!(!FcObjectValidType(FC_FAMILY_OBJECT, FcType::Integer));
        assert!(FcObjectValidType(FC_PIXEL_SIZE_OBJECT, FcType::Integer));
    }

    #[test]
    fn lang_companions_score_as_lang() {
        let m = FcObjectToMatcher(FC_FAMILYLANG_OBJECT, true).unwrap();
        assert_eq!(m.kind, FcCompareKind::Lang);
        assert!(FcObjectToMatcher(FC_FAMILYLANG_OBJECT, false).is_none());
        let fam = FcObjectToMatcher(FC_FAMILY_OBJECT, false).unwrap();
        assert_ne!(fam.strong, fam.weak);
        assert_eq!(PRI_END, 27);
        assert_eq!(FC_MAX_BASE_OBJECT as usize, FC_OBJECTS.len());
    }
}
