//! Fontconfig-style font configuration, caching and matching
//!
//! A request is an [`FcPattern`] of desired properties (family, size,
//! weight, language, ...). It is normalised by the substitution rules of an
//! [`FcConfig`], scored against every font pattern of a font set, and the
//! winner is merged back with the request into the pattern used for
//! rendering.
//!
//! # Usage
//!
//! ```rust
//! use fontmatch::{FcConfig, FcFontMatch, FcPattern, FC_FAMILY_OBJECT, FC_WEIGHT_OBJECT};
//!
//! let mut config = FcConfig::new();
//! let mut font = FcPattern::new();
//! font.add_string(FC_FAMILY_OBJECT, "DejaVu Sans");
//! font.add_integer(FC_WEIGHT_OBJECT, 80);
//! config.app_font_add_pattern(font);
//!
//! let mut request = fontmatch::FcNameParse("DejaVu Sans:bold").unwrap();
//! config.substitute(&mut request, None, fontmatch::FcMatchKind::Pattern);
//! fontmatch::FcDefaultSubstitute(&mut request);
//!
//! let result = FcFontMatch(Some(&config), &request).unwrap();
//! println!("{}", fontmatch::FcNameUnparse(&result));
//! ```

#![allow(non_snake_case)]

extern crate alloc;
extern crate core;

pub mod cache;
pub mod charset;
pub mod conf;
pub mod config;
pub mod defaults;
pub mod error;
pub mod expr;
pub mod hash;
pub mod lang;
pub mod list;
pub mod matching;
pub mod name;
pub mod object;
pub mod pattern;
pub mod rule;
pub mod serialize;
pub mod strings;
pub mod value;
pub mod weight;

#[cfg(test)]
mod tests;

pub use cache::{FcCache, FcCacheFindByAddr, FcCacheObject, FcDirCacheBuild, FcDirCacheUnload};
#[cfg(feature = "std")]
pub use cache::{FcDirCacheLoadFile, FcDirCacheWrite};
pub use charset::{FcCharLeaf, FcCharSet, FcCharSetFreezer};
pub use config::{FcConfig, FcConfigGetCurrent, FcConfigSetCurrent, FcSetName};
pub use defaults::FcDefaultSubstitute;
pub use error::{FcCacheError, FcConfigError};
pub use expr::{FcExpr, FcOp, FcOpFlags};
pub use lang::{FcLangCompare, FcLangResult, FcLangSet};
pub use list::{FcFontList, FcFontSetList, FcListPatternMatchAny};
pub use matching::{
    FcCompare, FcCompareValueList, FcFontMatch, FcFontRenderPrepare, FcFontSetMatch,
    FcFontSetSort, FcFontSort, FcScore, FcScoreCompare,
};
pub use name::{FcNameConstant, FcNameGetConstant, FcNameParse, FcNameUnparse};
pub use object::*;
pub use pattern::{FcFontSet, FcObjectSet, FcPattern, FcPatternElt, FcPatternIter};
pub use rule::{FcEdit, FcQual, FcRule, FcRuleSet, FcTest};
pub use value::{FcMatrix, FcRange, FcType, FcValue, FcValueBinding, FcValueList};
pub use weight::{FcWeightFromOpenType, FcWeightFromOpenTypeDouble, FcWeightToOpenType, FcWeightToOpenTypeDouble};

/// Tri-state boolean: `DontCare` matches both `True` and `False`.
#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub enum PatternMatch {
    True,
    False,
    DontCare,
}

impl PatternMatch {
    pub fn into_option(self) -> Option<bool> {
        match self {
            PatternMatch::True => Some(true),
            PatternMatch::False => Some(false),
            PatternMatch::DontCare => None,
        }
    }
}

impl Default for PatternMatch {
    fn default() -> Self {
        PatternMatch::DontCare
    }
}

impl From<bool> for PatternMatch {
    fn from(b: bool) -> Self {
        if b {
            PatternMatch::True
        } else {
            PatternMatch::False
        }
    }
}

/// Outcome of a lookup or match.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(C)]
pub enum FcResult {
    Match,
    NoMatch,
    TypeMismatch,
    NoId,
    OutOfMemory,
}

/// Which side a substitution rule runs against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub enum FcMatchKind {
    Pattern,
    Font,
    Scan,
}

impl FcMatchKind {
    pub const ALL: [FcMatchKind; 3] = [FcMatchKind::Pattern, FcMatchKind::Font, FcMatchKind::Scan];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}
