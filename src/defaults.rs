//! Default values every request receives before matching, and the
//! process-level names (program, desktop) rules may test against.

use alloc::string::String;
use std::sync::LazyLock;

use crate::lang::FcGetDefaultLangs;
use crate::name::{FC_HINT_FULL, FC_SLANT_ROMAN, FC_WEIGHT_REGULAR, FC_WIDTH_NORMAL};
use crate::object::*;
use crate::pattern::FcPattern;
use crate::value::{FcValue, FcValueBinding};
use crate::PatternMatch;

const BOOL_DEFAULTS: [(FcObject, PatternMatch); 8] = [
    (FC_HINTING_OBJECT, PatternMatch::True),
    (FC_VERTICAL_LAYOUT_OBJECT, PatternMatch::False),
    (FC_AUTOHINT_OBJECT, PatternMatch::False),
    (FC_GLOBAL_ADVANCE_OBJECT, PatternMatch::True),
    (FC_EMBEDDED_BITMAP_OBJECT, PatternMatch::True),
    (FC_DECORATIVE_OBJECT, PatternMatch::False),
    (FC_SYMBOL_OBJECT, PatternMatch::False),
    (FC_VARIABLE_OBJECT, PatternMatch::DontCare),
];

pub const FC_DEFAULT_SIZE: f64 = 12.0;
pub const FC_DEFAULT_DPI: f64 = 75.0;

static PRGNAME: LazyLock<Option<String>> = LazyLock::new(|| {
    let exe = std::env::current_exe().ok()?;
    let name = exe.file_name()?.to_string_lossy().into_owned();
    (!name.is_empty()).then_some(name)
});

static DESKTOP_NAME: LazyLock<Option<String>> = LazyLock::new(|| {
    std::env::var("XDG_CURRENT_DESKTOP")
        .ok()
        .filter(|s| !s.is_empty())
});

/// File name of the running executable, computed once.
pub fn FcGetPrgname() -> Option<&'static str> {
    PRGNAME.as_deref()
}

/// `XDG_CURRENT_DESKTOP`, read once.
pub fn FcGetDesktopName() -> Option<&'static str> {
    DESKTOP_NAME.as_deref()
}

/// First default language.
pub fn FcGetDefaultLang() -> &'static str {
    FcGetDefaultLangs().first().map(String::as_str).unwrap_or("en")
}

/// Fills in everything a request leaves open that matching and rendering
/// rely on: style axes, boolean rendering hints, size/pixel size/dpi/scale,
/// font version, hint style, naming languages and the program name.
pub fn FcDefaultSubstitute(pattern: &mut FcPattern) {
    if !pattern.has(FC_WEIGHT_OBJECT) {
        pattern.add_integer(FC_WEIGHT_OBJECT, FC_WEIGHT_REGULAR);
    }
    if !pattern.has(FC_SLANT_OBJECT) {
        pattern.add_integer(FC_SLANT_OBJECT, FC_SLANT_ROMAN);
    }
    if !pattern.has(FC_WIDTH_OBJECT) {
        pattern.add_integer(FC_WIDTH_OBJECT, FC_WIDTH_NORMAL);
    }
    for (object, value) in BOOL_DEFAULTS {
        if !pattern.has(object) {
            pattern.add_bool(object, value);
        }
    }

    let mut size = match pattern.get(FC_SIZE_OBJECT, 0) {
        Ok(FcValue::Range(r)) => (r.begin + r.end) * 0.5,
        Ok(v) => v.as_f64().unwrap_or(FC_DEFAULT_SIZE),
        Err(_) => FC_DEFAULT_SIZE,
    };
    let scale = pattern.get_double(FC_SCALE_OBJECT, 0).unwrap_or(1.0);
    let dpi = pattern.get_double(FC_DPI_OBJECT, 0).unwrap_or(FC_DEFAULT_DPI);

    match pattern.get_double(FC_PIXEL_SIZE_OBJECT, 0) {
        Err(_) => {
            pattern.del(FC_SCALE_OBJECT);
            pattern.add_double(FC_SCALE_OBJECT, scale);
            pattern.del(FC_DPI_OBJECT);
            pattern.add_double(FC_DPI_OBJECT, dpi);
            pattern.add_double(FC_PIXEL_SIZE_OBJECT, size * scale * dpi / 72.0);
        }
        Ok(pixelsize) => size = pixelsize / dpi * 72.0 / scale,
    }
    pattern.del(FC_SIZE_OBJECT);
    pattern.add_double(FC_SIZE_OBJECT, size);

    if !pattern.has(FC_FONTVERSION_OBJECT) {
        pattern.add_integer(FC_FONTVERSION_OBJECT, 0x7fff_ffff);
    }
    if !pattern.has(FC_HINT_STYLE_OBJECT) {
        pattern.add_integer(FC_HINT_STYLE_OBJECT, FC_HINT_FULL);
    }
    if !pattern.has(FC_NAMELANG_OBJECT) {
        pattern.add_string(FC_NAMELANG_OBJECT, FcGetDefaultLang());
    }

    // English names act as a fallback; "en-us" rather than "en" so an exact
    // "en" request still scores better
    let namelang = pattern.get(FC_NAMELANG_OBJECT, 0).ok().cloned();
    for object in [FC_FAMILYLANG_OBJECT, FC_STYLELANG_OBJECT, FC_FULLNAMELANG_OBJECT] {
        if pattern.has(object) {
            continue;
        }
        if let Some(namelang) = &namelang {
            pattern.add(object, namelang.clone(), true);
        }
        pattern.add_with_binding(object, FcValue::from("en-us"), FcValueBinding::Weak, true);
    }

    if !pattern.has(FC_PRGNAME_OBJECT) {
        if let Some(prgname) = FcGetPrgname() {
            pattern.add_string(FC_PRGNAME_OBJECT, prgname);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_open_properties() {
        let mut p = FcPattern::new();
        FcDefaultSubstitute(&mut p);
        assert_eq!(p.get_integer(FC_WEIGHT_OBJECT, 0), Ok(80));
        assert_eq!(p.get_integer(FC_SLANT_OBJECT, 0), Ok(0));
        assert_eq!(p.get_bool(FC_HINTING_OBJECT, 0), Ok(PatternMatch::True));
        assert_eq!(p.get_bool(FC_VARIABLE_OBJECT, 0), Ok(PatternMatch::DontCare));
        assert_eq!(p.get_double(FC_SIZE_OBJECT, 0), Ok(12.0));
        assert_eq!(p.get_double(FC_PIXEL_SIZE_OBJECT, 0), Ok(12.5));
        assert_eq!(p.get_string(FC_FAMILYLANG_OBJECT, 1), Ok("en-us"));
        assert_eq!(
            p.get_with_binding(FC_FAMILYLANG_OBJECT, 1).map(|v| v.binding),
            Ok(FcValueBinding::Weak)
        );
    }

    #[test]
    fn size_follows_explicit_pixel_size() {
        let mut p = FcPattern::new();
        p.add_double(FC_PIXEL_SIZE_OBJECT, 25.0);
        p.add_double(FC_DPI_OBJECT, 72.0);
        FcDefaultSubstitute(&mut p);
        assert_eq!(p.get_double(FC_SIZE_OBJECT, 0), Ok(25.0));
    }

    #[test]
    fn existing_values_are_kept() {
        let mut p = FcPattern::new();
        p.add_integer(FC_WEIGHT_OBJECT, 200);
        p.add_range(FC_SIZE_OBJECT, crate::value::FcRange::new(10.0, 14.0));
        FcDefaultSubstitute(&mut p);
        assert_eq!(p.get_integer(FC_WEIGHT_OBJECT, 0), Ok(200));
        assert_eq!(p.get_double(FC_SIZE_OBJECT, 0), Ok(12.0));
        assert_eq!(p.values(FC_SIZE_OBJECT).map(|l| l.len()), Some(1));
    }
}
