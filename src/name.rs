//! Named constants and the textual pattern format
//! (`Family,Family-Size,Size:object=value,value:constant`).

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::charset::FcCharSet;
use crate::lang::FcLangSet;
use crate::object::*;
use crate::pattern::FcPattern;
use crate::strings::FcStrCmpIgnoreBlanksAndCase;
use crate::value::{FcMatrix, FcRange, FcType, FcValue, FcValueList};
use crate::PatternMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcConstant {
    pub name: &'static str,
    pub object: &'static str,
    pub value: i32,
}

const fn c(name: &'static str, object: &'static str, value: i32) -> FcConstant {
    FcConstant { name, object, value }
}

pub const FC_WEIGHT_THIN: i32 = 0;
pub const FC_WEIGHT_EXTRALIGHT: i32 = 40;
pub const FC_WEIGHT_LIGHT: i32 = 50;
pub const FC_WEIGHT_DEMILIGHT: i32 = 55;
pub const FC_WEIGHT_BOOK: i32 = 75;
pub const FC_WEIGHT_REGULAR: i32 = 80;
pub const FC_WEIGHT_MEDIUM: i32 = 100;
pub const FC_WEIGHT_DEMIBOLD: i32 = 180;
pub const FC_WEIGHT_BOLD: i32 = 200;
pub const FC_WEIGHT_EXTRABOLD: i32 = 205;
pub const FC_WEIGHT_BLACK: i32 = 210;
pub const FC_WEIGHT_EXTRABLACK: i32 = 215;

pub const FC_SLANT_ROMAN: i32 = 0;
pub const FC_SLANT_ITALIC: i32 = 100;
pub const FC_SLANT_OBLIQUE: i32 = 110;

pub const FC_WIDTH_NORMAL: i32 = 100;

pub const FC_PROPORTIONAL: i32 = 0;
pub const FC_DUAL: i32 = 90;
pub const FC_MONO: i32 = 100;
pub const FC_CHARCELL: i32 = 110;

pub const FC_HINT_FULL: i32 = 3;

static CONSTANTS: &[FcConstant] = &[
    c("thin", FC_WEIGHT, FC_WEIGHT_THIN),
    c("extralight", FC_WEIGHT, FC_WEIGHT_EXTRALIGHT),
    c("ultralight", FC_WEIGHT, FC_WEIGHT_EXTRALIGHT),
    c("demilight", FC_WEIGHT, FC_WEIGHT_DEMILIGHT),
    c("semilight", FC_WEIGHT, FC_WEIGHT_DEMILIGHT),
    c("light", FC_WEIGHT, FC_WEIGHT_LIGHT),
    c("book", FC_WEIGHT, FC_WEIGHT_BOOK),
    c("regular", FC_WEIGHT, FC_WEIGHT_REGULAR),
    c("normal", FC_WEIGHT, FC_WEIGHT_REGULAR),
    c("medium", FC_WEIGHT, FC_WEIGHT_MEDIUM),
    c("demibold", FC_WEIGHT, FC_WEIGHT_DEMIBOLD),
    c("semibold", FC_WEIGHT, FC_WEIGHT_DEMIBOLD),
    c("bold", FC_WEIGHT, FC_WEIGHT_BOLD),
    c("extrabold", FC_WEIGHT, FC_WEIGHT_EXTRABOLD),
    c("ultrabold", FC_WEIGHT, FC_WEIGHT_EXTRABOLD),
    c("black", FC_WEIGHT, FC_WEIGHT_BLACK),
    c("heavy", FC_WEIGHT, FC_WEIGHT_BLACK),
    c("extrablack", FC_WEIGHT, FC_WEIGHT_EXTRABLACK),
    c("ultrablack", FC_WEIGHT, FC_WEIGHT_EXTRABLACK),
    c("roman", FC_SLANT, FC_SLANT_ROMAN),
    c("italic", FC_SLANT, FC_SLANT_ITALIC),
    c("oblique", FC_SLANT, FC_SLANT_OBLIQUE),
    c("ultracondensed", FC_WIDTH, 50),
    c("extracondensed", FC_WIDTH, 63),
    c("condensed", FC_WIDTH, 75),
    c("semicondensed", FC_WIDTH, 87),
    c("semiexpanded", FC_WIDTH, 113),
    c("expanded", FC_WIDTH, 125),
    c("extraexpanded", FC_WIDTH, 150),
    c("ultraexpanded", FC_WIDTH, 200),
    c("proportional", FC_SPACING, FC_PROPORTIONAL),
    c("dual", FC_SPACING, FC_DUAL),
    c("mono", FC_SPACING, FC_MONO),
    c("charcell", FC_SPACING, FC_CHARCELL),
    c("unknown", "rgba", 0),
    c("rgb", "rgba", 1),
    c("bgr", "rgba", 2),
    c("vrgb", "rgba", 3),
    c("vbgr", "rgba", 4),
    c("none", "rgba", 5),
    c("hintnone", "hintstyle", 0),
    c("hintslight", "hintstyle", 1),
    c("hintmedium", "hintstyle", 2),
    c("hintfull", "hintstyle", FC_HINT_FULL),
    c("antialias", FC_ANTIALIAS, 1),
    c("hinting", "hinting", 1),
    c("verticallayout", "verticallayout", 1),
    c("autohint", "autohint", 1),
    c("globaladvance", "globaladvance", 1),
    c("outline", "outline", 1),
    c("scalable", FC_SCALABLE, 1),
    c("minspace", "minspace", 1),
    c("embolden", "embolden", 1),
    c("embeddedbitmap", "embeddedbitmap", 1),
    c("decorative", "decorative", 1),
    c("lcdnone", "lcdfilter", 0),
    c("lcddefault", "lcdfilter", 1),
    c("lcdlight", "lcdfilter", 2),
    c("lcdlegacy", "lcdfilter", 3),
];

/// Looks up a constant by name, ignoring blanks and case.
pub fn FcNameGetConstant(name: &str) -> Option<&'static FcConstant> {
    CONSTANTS
        .iter()
        .find(|c| FcStrCmpIgnoreBlanksAndCase(c.name, name).is_eq())
}

fn FcNameGetConstantFor(name: &str, object: &str) -> Option<&'static FcConstant> {
    CONSTANTS.iter().find(|c| {
        c.object == object && FcStrCmpIgnoreBlanksAndCase(c.name, name).is_eq()
    })
}

pub fn FcNameConstant(name: &str) -> Option<i32> {
    FcNameGetConstant(name).map(|c| c.value)
}

/// Resolves `name` only if it is a constant of `object`.
pub fn FcNameConstantWithObjectCheck(name: &str, object: &str) -> Option<i32> {
    if let Some(c) = FcNameGetConstantFor(name, object) {
        return Some(c.value);
    }
    if let Some(c) = FcNameGetConstant(name) {
        log::warn!(
            "unexpected constant name {:?} used for object {:?}: should be {:?}",
            name,
            object,
            c.object
        );
    }
    None
}

/// Parses a boolean keyword (`true`, `no`, `on`, `dontcare`, ...).
pub fn FcNameBool(v: &str) -> Option<PatternMatch> {
    let mut chars = v.chars().map(|c| c.to_ascii_lowercase());
    match chars.next()? {
        't' | 'y' | '1' => Some(PatternMatch::True),
        'f' | 'n' | '0' => Some(PatternMatch::False),
        'd' => Some(PatternMatch::DontCare),
        'o' => match chars.next()? {
            'n' => Some(PatternMatch::True),
            'f' => Some(PatternMatch::False),
            _ => None,
        },
        _ => None,
    }
}

/// `%g`-style formatting: six significant digits, no trailing zeros.
pub fn FcFormatDouble(d: f64) -> String {
    if !d.is_finite() {
        return format!("{}", d);
    }
    if d == 0.0 {
        return String::from("0");
    }
    let exp = d.abs().log10().floor() as i32;
    if !(-5..6).contains(&exp) {
        let s = format!("{:.5e}", d);
        return match s.split_once('e') {
            Some((mantissa, e)) => {
                let mantissa = trim_fraction(mantissa);
                let e: i32 = e.parse().unwrap_or(0);
                format!("{}e{}{:02}", mantissa, if e < 0 { '-' } else { '+' }, e.abs())
            }
            None => s,
        };
    }
    let decimals = (5 - exp).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, d)).into()
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn parse_leading_double(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// C `atoi`: leading sign and digits, 0 when there are none.
fn parse_atoi(s: &str) -> i32 {
    let s = s.trim_start();
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut n: i64 = 0;
    for b in digits.bytes().take_while(|b| b.is_ascii_digit()) {
        n = (n * 10 + (b - b'0') as i64).min(i32::MAX as i64 + 1);
    }
    let n = if neg { -n } else { n };
    n.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn parse_charset(s: &str) -> Option<FcCharSet> {
    let mut cs = FcCharSet::new();
    for tok in s.split_whitespace() {
        let (first, last) = match tok.split_once('-') {
            Some((a, b)) => (
                u32::from_str_radix(a, 16).ok()?,
                u32::from_str_radix(b, 16).ok()?,
            ),
            None => {
                let v = u32::from_str_radix(tok, 16).ok()?;
                (v, v)
            }
        };
        if first > last {
            return None;
        }
        for ucs4 in first..=last {
            cs.add_char(ucs4);
        }
    }
    Some(cs)
}

fn parse_langset(s: &str) -> FcLangSet {
    let mut ls = FcLangSet::new();
    for lang in s.split('|').filter(|l| !l.is_empty()) {
        ls.add(lang);
    }
    ls
}

fn parse_range(s: &str, object: &str) -> FcValue {
    if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let mut parts = inner.split_whitespace();
        if let (Some(b), Some(e), None) = (parts.next(), parts.next(), parts.next()) {
            if let (Some(b), Some(e)) = (parse_leading_double(b), parse_leading_double(e)) {
                return FcValue::Range(FcRange::new(b, e));
            }
            if let (Some(b), Some(e)) = (
                FcNameConstantWithObjectCheck(b, object),
                FcNameConstantWithObjectCheck(e, object),
            ) {
                return FcValue::Range(FcRange::new(b as f64, e as f64));
            }
        }
    }
    if let Some(v) = FcNameConstantWithObjectCheck(s, object) {
        return FcValue::Double(v as f64);
    }
    parse_leading_double(s).map(FcValue::Double).unwrap_or(FcValue::Void)
}

/// Converts the textual form of a value of type `ty` for `object`.
pub fn FcNameConvert(ty: FcType, object: &str, s: &str) -> FcValue {
    match ty {
        FcType::Integer => FcValue::Integer(
            FcNameConstantWithObjectCheck(s, object).unwrap_or_else(|| parse_atoi(s)),
        ),
        FcType::String | FcType::Unknown => FcValue::from(s),
        FcType::Bool => FcNameBool(s).map(FcValue::Bool).unwrap_or(FcValue::Void),
        FcType::Double => parse_leading_double(s).map(FcValue::Double).unwrap_or(FcValue::Void),
        FcType::Matrix => {
            let v: Vec<f64> = s.split_whitespace().filter_map(parse_leading_double).collect();
            match v[..] {
                [xx, xy, yx, yy] => FcValue::Matrix(FcMatrix { xx, xy, yx, yy }),
                _ => FcValue::Void,
            }
        }
        FcType::CharSet => parse_charset(s).map(FcValue::from).unwrap_or(FcValue::Void),
        FcType::LangSet => FcValue::from(parse_langset(s)),
        FcType::Range => parse_range(s, object),
        FcType::Void | FcType::FtFace => FcValue::Void,
    }
}

// Copies up to the first unescaped delimiter; returns (token, delimiter, rest).
fn find_next<'a>(input: &'a str, delims: &str) -> (String, Option<char>, &'a str) {
    let mut out = String::new();
    let mut chars = input.char_indices();
    while let Some((i, ch)) = chars.next() {
        if ch == '\\' {
            if let Some((_, esc)) = chars.next() {
                out.push(esc);
            }
            continue;
        }
        if delims.contains(ch) {
            return (out, Some(ch), &input[i + ch.len_utf8()..]);
        }
        out.push(ch);
    }
    (out, None, "")
}

/// Parses the textual pattern format. Unknown constants are ignored;
/// malformed values for typed objects make the whole parse fail.
pub fn FcNameParse(name: &str) -> Option<FcPattern> {
    let mut pat = FcPattern::new();
    let mut rest = name;

    let mut delim;
    loop {
        let (family, d, r) = find_next(rest, "-,:");
        rest = r;
        delim = d;
        if !family.is_empty() {
            pat.add_string(FC_FAMILY_OBJECT, &family);
        }
        if delim != Some(',') {
            break;
        }
    }

    if delim == Some('-') {
        loop {
            let (size, d, r) = find_next(rest, "-,:");
            rest = r;
            delim = d;
            if let Some(size) = parse_leading_double(&size) {
                pat.add_double(FC_SIZE_OBJECT, size);
            }
            if delim != Some(',') {
                break;
            }
        }
    }

    while delim == Some(':') {
        let (token, d, r) = find_next(rest, "=_:");
        rest = r;
        delim = d;
        if token.is_empty() {
            continue;
        }
        if matches!(delim, Some('=') | Some('_')) {
            let object = FcObjectLookupIdByName(&token);
            let ty = FcObjectType(object);
            let object_name = FcObjectName(object).unwrap_or("");
            loop {
                let (value, d, r) = find_next(rest, ":,");
                rest = r;
                delim = d;
                let v = FcNameConvert(ty, object_name, &value);
                if v.is_void() {
                    log::debug!("cannot parse {:?} as a value of {}", value, object_name);
                    return None;
                }
                if !pat.add(object, v, true) {
                    return None;
                }
                if delim != Some(',') {
                    break;
                }
            }
        } else if let Some(c) = FcNameGetConstant(&token) {
            let object = FcObjectLookupIdByName(c.object);
            let v = match FcObjectType(object) {
                FcType::Bool => FcValue::Bool(PatternMatch::from(c.value != 0)),
                _ => FcValue::Integer(c.value),
            };
            pat.add(object, v, true);
        } else {
            log::debug!("ignoring unknown constant {:?}", token);
        }
    }

    Some(pat)
}

const ESCAPE_FIXED: &str = "\\-:,";
const ESCAPE_VARIABLE: &str = "\\=_:,";

fn push_escaped(out: &mut String, s: &str, escape: &str) {
    for ch in s.chars() {
        if escape.contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn unparse_charset(out: &mut String, cs: &FcCharSet) {
    let mut first = true;
    let mut run: Option<(u32, u32)> = None;
    let mut flush = |out: &mut String, (a, b): (u32, u32)| {
        if !first {
            out.push(' ');
        }
        first = false;
        if a == b {
            let _ = write!(out, "{:x}", a);
        } else {
            let _ = write!(out, "{:x}-{:x}", a, b);
        }
    };
    for ucs4 in cs.chars() {
        run = match run {
            Some((a, b)) if b + 1 == ucs4 => Some((a, ucs4)),
            Some(r) => {
                flush(out, r);
                Some((ucs4, ucs4))
            }
            None => Some((ucs4, ucs4)),
        };
    }
    if let Some(r) = run {
        flush(out, r);
    }
}

/// Textual form of a single value.
pub fn FcNameUnparseValue(out: &mut String, v: &FcValue, escape: &str) {
    match v {
        FcValue::Unknown | FcValue::Void => {}
        FcValue::Integer(i) => {
            let _ = write!(out, "{}", i);
        }
        FcValue::Double(d) => out.push_str(&FcFormatDouble(*d)),
        FcValue::String(s) => push_escaped(out, s, escape),
        FcValue::Bool(b) => out.push_str(match b {
            PatternMatch::True => "True",
            PatternMatch::False => "False",
            PatternMatch::DontCare => "DontCare",
        }),
        FcValue::Matrix(m) => {
            let _ = write!(
                out,
                "{} {} {} {}",
                FcFormatDouble(m.xx),
                FcFormatDouble(m.xy),
                FcFormatDouble(m.yx),
                FcFormatDouble(m.yy)
            );
        }
        FcValue::CharSet(cs) => unparse_charset(out, cs),
        FcValue::LangSet(ls) => {
            let langs: Vec<String> = ls.get_langs().into_iter().collect();
            push_escaped(out, &langs.join("|"), escape);
        }
        FcValue::Range(r) => {
            let _ = write!(out, "[{} {}]", FcFormatDouble(r.begin), FcFormatDouble(r.end));
        }
        FcValue::FtFace(_) => out.push_str("face"),
    }
}

fn unparse_list(out: &mut String, list: &FcValueList, escape: &str) {
    for (i, v) in list.values().enumerate() {
        if i > 0 {
            out.push(',');
        }
        FcNameUnparseValue(out, v, escape);
    }
}

/// Inverse of [`FcNameParse`] for built-in value types.
pub fn FcNameUnparse(pat: &FcPattern) -> String {
    let mut out = String::new();
    if let Some(families) = pat.values(FC_FAMILY_OBJECT) {
        unparse_list(&mut out, families, ESCAPE_FIXED);
    }
    if let Some(sizes) = pat.values(FC_SIZE_OBJECT) {
        out.push('-');
        unparse_list(&mut out, sizes, ESCAPE_FIXED);
    }
    for elt in pat.elts() {
        if elt.object == FC_FAMILY_OBJECT || elt.object == FC_SIZE_OBJECT {
            continue;
        }
        let Some(name) = FcObjectName(elt.object) else {
            continue;
        };
        out.push(':');
        push_escaped(&mut out, name, ESCAPE_VARIABLE);
        out.push('=');
        unparse_list(&mut out, &elt.values, ESCAPE_VARIABLE);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_resolve_per_object() {
        assert_eq!(FcNameConstant("Bold"), Some(200));
        assert_eq!(FcNameConstant("semi bold"), Some(180));
        assert_eq!(FcNameConstantWithObjectCheck("italic", FC_SLANT), Some(100));
        assert_eq!(FcNameConstantWithObjectCheck("italic", FC_WEIGHT), None);
        assert_eq!(FcNameConstant("nonsense"), None);
    }

    #[test]
    fn format_like_printf_g() {
        assert_eq!(FcFormatDouble(12.0), "12");
        assert_eq!(FcFormatDouble(10.5), "10.5");
        assert_eq!(FcFormatDouble(0.1), "0.1");
        assert_eq!(FcFormatDouble(1.0 / 3.0), "0.333333");
        assert_eq!(FcFormatDouble(1e20), "1e+20");
    }

    #[test]
    fn parse_family_size_and_elements() {
        let p = FcNameParse("Deja\\-Vu,Sans-10.5,12:weight=bold:slant=italic:antialias=false").unwrap();
        assert_eq!(p.get_string(FC_FAMILY_OBJECT, 0), Ok("Deja-Vu"));
        assert_eq!(p.get_string(FC_FAMILY_OBJECT, 1), Ok("Sans"));
        assert_eq!(p.get_double(FC_SIZE_OBJECT, 1), Ok(12.0));
        assert_eq!(p.get_double(FC_WEIGHT_OBJECT, 0), Ok(200.0));
        assert_eq!(p.get_integer(FC_SLANT_OBJECT, 0), Ok(100));
        assert_eq!(p.get_bool(FC_ANTIALIAS_OBJECT, 0), Ok(PatternMatch::False));
    }

    #[test]
    fn bare_constants() {
        let p = FcNameParse("Mono:bold:italic:decorative").unwrap();
        assert_eq!(p.get_integer(FC_WEIGHT_OBJECT, 0), Ok(200));
        assert_eq!(p.get_integer(FC_SLANT_OBJECT, 0), Ok(100));
        assert_eq!(p.get_bool(FC_DECORATIVE_OBJECT, 0), Ok(PatternMatch::True));
    }

    #[test]
    fn unparse_reparses() {
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "A:B");
        p.add_double(FC_SIZE_OBJECT, 11.0);
        p.add_range(FC_WEIGHT_OBJECT, FcRange::new(50.0, 200.0));
        p.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_ranges(&[(0x20, 0x7e), (0xa0, 0xa0)]));
        let text = FcNameUnparse(&p);
        assert_eq!(text, "A\\:B-11:weight=[50 200]:charset=20-7e a0");
        assert_eq!(FcNameParse(&text).unwrap(), p);
    }

    #[test]
    fn bad_value_fails_parse() {
        assert!(FcNameParse(":pixelsize=huge").is_none());
        assert!(FcNameParse(":antialias=maybe").is_none());
    }
}
