//! The expression language of substitution rules and its evaluator.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::charset::FcCharSet;
use crate::lang::FcLangSet;
use crate::name::FcNameConstant;
use crate::object::{FcObject, FcObjectLookupIdByName, FcObjectName};
use crate::pattern::FcPattern;
use crate::strings::{FcStrCmpIgnoreBlanksAndCase, FcStrCmpIgnoreCase, FcStrStrIgnoreCase};
use crate::value::{FcMatrix, FcRange, FcValue, FcValueBinding, FcValueList};
use crate::{FcMatchKind, PatternMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FcOp {
    Integer,
    Double,
    String,
    Matrix,
    Range,
    Bool,
    CharSet,
    LangSet,
    Nil,
    Field,
    Const,
    Assign,
    AssignReplace,
    PrependFirst,
    Prepend,
    Append,
    AppendLast,
    Delete,
    DeleteAll,
    Quest,
    Or,
    And,
    Equal,
    NotEqual,
    Contains,
    Listing,
    NotContains,
    Less,
    LessEqual,
    More,
    MoreEqual,
    Plus,
    Minus,
    Times,
    Divide,
    Not,
    Comma,
    Floor,
    Ceil,
    Round,
    Trunc,
    Invalid,
}

impl FcOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            FcOp::Equal
                | FcOp::NotEqual
                | FcOp::Contains
                | FcOp::Listing
                | FcOp::NotContains
                | FcOp::Less
                | FcOp::LessEqual
                | FcOp::More
                | FcOp::MoreEqual
        )
    }
}

/// Modifiers carried alongside a comparison operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FcOpFlags {
    /// String equality ignores blanks as well as case.
    pub ignore_blanks: bool,
}

impl FcOpFlags {
    pub const NONE: FcOpFlags = FcOpFlags { ignore_blanks: false };
    pub const IGNORE_BLANKS: FcOpFlags = FcOpFlags { ignore_blanks: true };
}

#[derive(Debug, Clone, PartialEq)]
pub enum FcExpr {
    Integer(i32),
    Double(f64),
    String(Arc<str>),
    Matrix(Box<[FcExpr; 4]>),
    Range(FcRange),
    Bool(PatternMatch),
    CharSet(Arc<FcCharSet>),
    LangSet(Arc<FcLangSet>),
    /// Value of an object, read from the pattern (or, inside a font-targeted
    /// rule with `kind == Some(Pattern)`, from the original request).
    /// `None` reads whatever the rule targets.
    Field { object: FcObject, kind: Option<FcMatchKind> },
    Const(Arc<str>),
    Quest(Box<FcExpr>, Box<FcExpr>, Box<FcExpr>),
    Binary {
        op: FcOp,
        flags: FcOpFlags,
        left: Box<FcExpr>,
        right: Box<FcExpr>,
    },
    Unary { op: FcOp, arg: Box<FcExpr> },
}

impl FcExpr {
    pub fn string(s: &str) -> Self {
        FcExpr::String(Arc::from(s))
    }

    pub fn field(name: &str) -> Self {
        FcExpr::Field {
            object: FcObjectLookupIdByName(name),
            kind: None,
        }
    }

    pub fn field_of(name: &str, kind: FcMatchKind) -> Self {
        FcExpr::Field {
            object: FcObjectLookupIdByName(name),
            kind: Some(kind),
        }
    }

    pub fn constant(name: &str) -> Self {
        FcExpr::Const(Arc::from(name))
    }

    pub fn binary(op: FcOp, left: FcExpr, right: FcExpr) -> Self {
        FcExpr::Binary {
            op,
            flags: FcOpFlags::NONE,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: FcOp, arg: FcExpr) -> Self {
        FcExpr::Unary { op, arg: Box::new(arg) }
    }

    pub fn quest(cond: FcExpr, then: FcExpr, otherwise: FcExpr) -> Self {
        FcExpr::Quest(Box::new(cond), Box::new(then), Box::new(otherwise))
    }

    /// Right-nested `Comma` chain; `None` for an empty list.
    pub fn list(mut exprs: Vec<FcExpr>) -> Option<Self> {
        let mut acc = exprs.pop()?;
        while let Some(e) = exprs.pop() {
            acc = FcExpr::binary(FcOp::Comma, e, acc);
        }
        Some(acc)
    }

    pub fn op(&self) -> FcOp {
        match self {
            FcExpr::Integer(_) => FcOp::Integer,
            FcExpr::Double(_) => FcOp::Double,
            FcExpr::String(_) => FcOp::String,
            FcExpr::Matrix(_) => FcOp::Matrix,
            FcExpr::Range(_) => FcOp::Range,
            FcExpr::Bool(_) => FcOp::Bool,
            FcExpr::CharSet(_) => FcOp::CharSet,
            FcExpr::LangSet(_) => FcOp::LangSet,
            FcExpr::Field { .. } => FcOp::Field,
            FcExpr::Const(_) => FcOp::Const,
            FcExpr::Quest(..) => FcOp::Quest,
            FcExpr::Binary { op, .. } | FcExpr::Unary { op, .. } => *op,
        }
    }
}

// ── Promotion ──

/// Brings `v` towards the type of `u` so the two can be compared or combined.
pub fn FcConfigPromote(v: &FcValue, u: Option<&FcValue>) -> FcValue {
    match v {
        FcValue::Integer(i) => {
            let d = *i as f64;
            match u {
                Some(FcValue::Range(_)) => FcValue::Range(FcRange::promote(d)),
                _ => FcValue::Double(d),
            }
        }
        FcValue::Double(d) => match u {
            Some(FcValue::Range(_)) => FcValue::Range(FcRange::promote(*d)),
            _ => v.clone(),
        },
        FcValue::Void => match u {
            Some(FcValue::Matrix(_)) => FcValue::Matrix(FcMatrix::IDENTITY),
            Some(FcValue::LangSet(_)) => FcValue::from(FcLangSet::new()),
            Some(FcValue::CharSet(_)) => FcValue::from(FcCharSet::new()),
            _ => FcValue::Void,
        },
        FcValue::String(s) => match u {
            Some(FcValue::LangSet(_)) => FcValue::from(FcLangSet::promote(Some(&**s))),
            _ => v.clone(),
        },
        _ => v.clone(),
    }
}

fn truthy(b: PatternMatch) -> bool {
    b != PatternMatch::False
}

fn range_compare(op: FcOp, a: &FcRange, b: &FcRange) -> bool {
    match op {
        FcOp::Equal => a.begin == b.begin && a.end == b.end,
        FcOp::Contains | FcOp::Listing => a.begin <= b.begin && a.end >= b.end,
        FcOp::NotEqual => a.begin != b.begin || a.end != b.end,
        FcOp::NotContains => a.begin > b.begin || a.end < b.end,
        FcOp::Less => a.end < b.begin,
        FcOp::LessEqual => a.end <= b.begin,
        FcOp::More => a.begin > b.end,
        FcOp::MoreEqual => a.begin >= b.end,
        _ => false,
    }
}

/// Applies comparison `op` to `left` and `right` after promotion.
/// Values of still-different types only satisfy the negated operators.
pub fn FcConfigCompareValue(left: &FcValue, op: FcOp, flags: FcOpFlags, right: &FcValue) -> bool {
    let l = FcConfigPromote(left, Some(right));
    let r = FcConfigPromote(right, Some(left));
    let negated = matches!(op, FcOp::NotEqual | FcOp::NotContains);

    match (&l, &r) {
        (FcValue::Double(a), FcValue::Double(b)) => match op {
            FcOp::Equal | FcOp::Contains | FcOp::Listing => a == b,
            FcOp::NotEqual | FcOp::NotContains => a != b,
            FcOp::Less => a < b,
            FcOp::LessEqual => a <= b,
            FcOp::More => a > b,
            FcOp::MoreEqual => a >= b,
            _ => false,
        },
        (FcValue::Bool(a), FcValue::Bool(b)) => match op {
            FcOp::Equal => a == b,
            FcOp::Contains | FcOp::Listing => a == b || *a == PatternMatch::DontCare,
            FcOp::NotEqual => a != b,
            FcOp::NotContains => !(a == b || *a == PatternMatch::DontCare),
            _ => false,
        },
        (FcValue::String(a), FcValue::String(b)) => {
            let eq = || {
                if flags.ignore_blanks {
                    FcStrCmpIgnoreBlanksAndCase(a, b).is_eq()
                } else {
                    FcStrCmpIgnoreCase(a, b).is_eq()
                }
            };
            match op {
                FcOp::Equal | FcOp::Listing => eq(),
                FcOp::Contains => FcStrStrIgnoreCase(a, b).is_some(),
                FcOp::NotEqual => !eq(),
                FcOp::NotContains => FcStrStrIgnoreCase(a, b).is_none(),
                _ => false,
            }
        }
        (FcValue::Matrix(a), FcValue::Matrix(b)) => match op {
            FcOp::Equal | FcOp::Contains | FcOp::Listing => a == b,
            FcOp::NotEqual | FcOp::NotContains => a != b,
            _ => false,
        },
        (FcValue::CharSet(a), FcValue::CharSet(b)) => match op {
            FcOp::Contains | FcOp::Listing => b.is_subset(a),
            FcOp::NotContains => !b.is_subset(a),
            FcOp::Equal => a == b,
            FcOp::NotEqual => a != b,
            _ => false,
        },
        (FcValue::LangSet(a), FcValue::LangSet(b)) => match op {
            FcOp::Contains | FcOp::Listing => a.contains(b),
            FcOp::NotContains => !a.contains(b),
            FcOp::Equal => a == b,
            FcOp::NotEqual => a != b,
            _ => false,
        },
        (FcValue::Void, FcValue::Void) => {
            matches!(op, FcOp::Equal | FcOp::Contains | FcOp::Listing)
        }
        (FcValue::FtFace(a), FcValue::FtFace(b)) => match op {
            FcOp::Equal | FcOp::Contains | FcOp::Listing => a == b,
            FcOp::NotEqual | FcOp::NotContains => a != b,
            _ => false,
        },
        (FcValue::Range(a), FcValue::Range(b)) => range_compare(op, a, b),
        _ => negated,
    }
}

// ── Evaluation ──

fn evaluate_double(p: &FcPattern, p_pat: Option<&FcPattern>, kind: FcMatchKind, e: &FcExpr) -> Option<f64> {
    match FcConfigPromote(&FcConfigEvaluate(p, p_pat, kind, e), None) {
        FcValue::Double(d) => Some(d),
        _ => None,
    }
}

fn arithmetic(op: FcOp, l: FcValue, r: FcValue) -> FcValue {
    let l = FcConfigPromote(&l, Some(&r));
    let r = FcConfigPromote(&r, Some(&l));
    let v = match (&l, &r) {
        (FcValue::Double(a), FcValue::Double(b)) => match op {
            FcOp::Plus => FcValue::Double(a + b),
            FcOp::Minus => FcValue::Double(a - b),
            FcOp::Times => FcValue::Double(a * b),
            FcOp::Divide => FcValue::Double(a / b),
            _ => FcValue::Void,
        },
        (FcValue::String(a), FcValue::String(b)) if op == FcOp::Plus => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            FcValue::from(s)
        }
        (FcValue::Matrix(a), FcValue::Matrix(b)) if op == FcOp::Times => {
            FcValue::Matrix(a.multiply(b))
        }
        (FcValue::CharSet(a), FcValue::CharSet(b)) => match op {
            FcOp::Plus => FcValue::from(a.union(b)),
            FcOp::Minus => FcValue::from(a.subtract(b)),
            _ => FcValue::Void,
        },
        (FcValue::LangSet(a), FcValue::LangSet(b)) => match op {
            FcOp::Plus => FcValue::from(a.union(b)),
            FcOp::Minus => FcValue::from(a.subtract(b)),
            _ => FcValue::Void,
        },
        _ => FcValue::Void,
    };
    // integral results go back to integers
    match v {
        FcValue::Double(d) if d == (d as i32) as f64 => FcValue::Integer(d as i32),
        v => v,
    }
}

/// Evaluates `e` against `p`. Fields of kind `Pattern` inside a
/// font-targeted evaluation read `p_pat`. Anything that cannot be
/// evaluated is `Void`.
pub fn FcConfigEvaluate(p: &FcPattern, p_pat: Option<&FcPattern>, kind: FcMatchKind, e: &FcExpr) -> FcValue {
    match e {
        FcExpr::Integer(i) => FcValue::Integer(*i),
        FcExpr::Double(d) => FcValue::Double(*d),
        FcExpr::String(s) => FcValue::String(Arc::clone(s)),
        FcExpr::Matrix(m) => {
            let mut out = [0.0f64; 4];
            for (slot, sub) in out.iter_mut().zip(m.iter()) {
                match evaluate_double(p, p_pat, kind, sub) {
                    Some(d) => *slot = d,
                    None => return FcValue::Void,
                }
            }
            FcValue::Matrix(FcMatrix {
                xx: out[0],
                xy: out[1],
                yx: out[2],
                yy: out[3],
            })
        }
        FcExpr::Range(r) => FcValue::Range(*r),
        FcExpr::Bool(b) => FcValue::Bool(*b),
        FcExpr::CharSet(c) => FcValue::CharSet(Arc::clone(c)),
        FcExpr::LangSet(l) => FcValue::LangSet(Arc::clone(l)),
        FcExpr::Field { object, kind: field_kind } => {
            let source = match (kind, *field_kind) {
                (FcMatchKind::Font, Some(FcMatchKind::Pattern)) => p_pat,
                (FcMatchKind::Pattern, Some(FcMatchKind::Font)) => {
                    log::warn!(
                        "<name> of {} has target=\"font\" in a <match target=\"pattern\">",
                        FcObjectName(*object).unwrap_or("<unknown>")
                    );
                    None
                }
                _ => Some(p),
            };
            source
                .and_then(|pat| pat.get(*object, 0).ok())
                .cloned()
                .unwrap_or(FcValue::Void)
        }
        FcExpr::Const(name) => match FcNameConstant(name) {
            Some(i) => FcValue::Integer(i),
            None => {
                log::warn!("unknown constant {:?}", name);
                FcValue::Void
            }
        },
        FcExpr::Quest(cond, then, otherwise) => match FcConfigEvaluate(p, p_pat, kind, cond) {
            FcValue::Bool(b) if truthy(b) => FcConfigEvaluate(p, p_pat, kind, then),
            FcValue::Bool(_) => FcConfigEvaluate(p, p_pat, kind, otherwise),
            _ => FcValue::Void,
        },
        FcExpr::Binary { op, flags, left, right } => {
            let l = FcConfigEvaluate(p, p_pat, kind, left);
            let r = FcConfigEvaluate(p, p_pat, kind, right);
            match op {
                op if op.is_comparison() => {
                    FcValue::Bool(PatternMatch::from(FcConfigCompareValue(&l, *op, *flags, &r)))
                }
                FcOp::Or | FcOp::And => match (l, r) {
                    (FcValue::Bool(a), FcValue::Bool(b)) => FcValue::Bool(PatternMatch::from(
                        if *op == FcOp::Or {
                            truthy(a) || truthy(b)
                        } else {
                            truthy(a) && truthy(b)
                        },
                    )),
                    _ => FcValue::Void,
                },
                FcOp::Plus | FcOp::Minus | FcOp::Times | FcOp::Divide => arithmetic(*op, l, r),
                _ => FcValue::Void,
            }
        }
        FcExpr::Unary { op, arg } => {
            let v = FcConfigEvaluate(p, p_pat, kind, arg);
            match (op, v) {
                (FcOp::Not, FcValue::Bool(b)) => FcValue::Bool(PatternMatch::from(!truthy(b))),
                (FcOp::Floor | FcOp::Ceil | FcOp::Round | FcOp::Trunc, FcValue::Integer(i)) => {
                    FcValue::Integer(i)
                }
                (FcOp::Floor, FcValue::Double(d)) => FcValue::Integer(d.floor() as i32),
                (FcOp::Ceil, FcValue::Double(d)) => FcValue::Integer(d.ceil() as i32),
                (FcOp::Round, FcValue::Double(d)) => FcValue::Integer((d + 0.5).floor() as i32),
                (FcOp::Trunc, FcValue::Double(d)) => FcValue::Integer(d.trunc() as i32),
                _ => FcValue::Void,
            }
        }
    }
}

/// Evaluates a (possibly `Comma`-chained) expression into a value list,
/// dropping values that evaluate to `Void`.
pub fn FcConfigValues(
    p: &FcPattern,
    p_pat: Option<&FcPattern>,
    kind: FcMatchKind,
    e: Option<&FcExpr>,
    binding: FcValueBinding,
) -> FcValueList {
    let mut list = FcValueList::new();
    let mut cur = e;
    while let Some(e) = cur {
        let (head, next) = match e {
            FcExpr::Binary { op: FcOp::Comma, left, right, .. } => (&**left, Some(&**right)),
            other => (other, None),
        };
        list.append(FcConfigEvaluate(p, p_pat, kind, head), binding);
        cur = next;
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;

    fn eval(p: &FcPattern, e: &FcExpr) -> FcValue {
        FcConfigEvaluate(p, None, FcMatchKind::Pattern, e)
    }

    #[test]
    fn arithmetic_and_integral_results() {
        let p = FcPattern::new();
        let sum = FcExpr::binary(FcOp::Plus, FcExpr::Integer(2), FcExpr::Double(3.0));
        assert_eq!(eval(&p, &sum), FcValue::Integer(5));
        let half = FcExpr::binary(FcOp::Divide, FcExpr::Integer(1), FcExpr::Integer(2));
        assert_eq!(eval(&p, &half), FcValue::Double(0.5));
        let cat = FcExpr::binary(FcOp::Plus, FcExpr::string("Deja"), FcExpr::string("Vu"));
        assert_eq!(eval(&p, &cat).as_str(), Some("DejaVu"));
    }

    #[test]
    fn fields_constants_and_quest() {
        let mut p = FcPattern::new();
        p.add_double(FC_SIZE_OBJECT, 12.0);
        let big = FcExpr::binary(FcOp::More, FcExpr::field(FC_SIZE), FcExpr::Integer(10));
        let e = FcExpr::quest(big, FcExpr::constant("bold"), FcExpr::constant("light"));
        assert_eq!(eval(&p, &e), FcValue::Integer(200));
        assert_eq!(eval(&p, &FcExpr::constant("nope")), FcValue::Void);
        assert_eq!(eval(&p, &FcExpr::field(FC_FAMILY)), FcValue::Void);
    }

    #[test]
    fn font_rules_read_request_fields() {
        let mut font = FcPattern::new();
        font.add_string(FC_FAMILY_OBJECT, "Font");
        let mut req = FcPattern::new();
        req.add_string(FC_FAMILY_OBJECT, "Request");
        let e = FcExpr::field_of(FC_FAMILY, FcMatchKind::Pattern);
        let v = FcConfigEvaluate(&font, Some(&req), FcMatchKind::Font, &e);
        assert_eq!(v.as_str(), Some("Request"));
        let e = FcExpr::field_of(FC_FAMILY, FcMatchKind::Font);
        let v = FcConfigEvaluate(&req, None, FcMatchKind::Pattern, &e);
        assert!(v.is_void());
    }

    #[test]
    fn rounding_ops() {
        let p = FcPattern::new();
        for (op, want) in [(FcOp::Floor, -2), (FcOp::Ceil, -1), (FcOp::Round, -1), (FcOp::Trunc, -1)] {
            assert_eq!(eval(&p, &FcExpr::unary(op, FcExpr::Double(-1.5))), FcValue::Integer(want));
        }
        assert_eq!(eval(&p, &FcExpr::unary(FcOp::Not, FcExpr::string("x"))), FcValue::Void);
    }

    #[test]
    fn compare_promotes_types() {
        let i = FcValue::Integer(12);
        let r = FcValue::Range(FcRange::new(10.0, 14.0));
        assert!(FcConfigCompareValue(&r, FcOp::Contains, FcOpFlags::NONE, &i));
        assert!(FcConfigCompareValue(&FcValue::Integer(3), FcOp::Equal, FcOpFlags::NONE, &FcValue::Double(3.0)));
        let s = FcValue::from("Deja Vu");
        let t = FcValue::from("dejavu");
        assert!(!FcConfigCompareValue(&s, FcOp::Equal, FcOpFlags::NONE, &t));
        assert!(FcConfigCompareValue(&s, FcOp::Equal, FcOpFlags::IGNORE_BLANKS, &t));
        // mismatched types only satisfy negations
        assert!(!FcConfigCompareValue(&s, FcOp::Equal, FcOpFlags::NONE, &i));
        assert!(FcConfigCompareValue(&s, FcOp::NotEqual, FcOpFlags::NONE, &i));
        let ls = FcValue::from(FcLangSet::from_langs(["en", "fr"]));
        assert!(FcConfigCompareValue(&ls, FcOp::Contains, FcOpFlags::NONE, &FcValue::from("fr")));
        let dc = FcValue::Bool(PatternMatch::DontCare);
        assert!(FcConfigCompareValue(&dc, FcOp::Listing, FcOpFlags::NONE, &FcValue::from(true)));
    }

    #[test]
    fn comma_lists_drop_void() {
        let p = FcPattern::new();
        let e = FcExpr::list(vec![FcExpr::string("a"), FcExpr::constant("nope"), FcExpr::string("b")]);
        let l = FcConfigValues(&p, None, FcMatchKind::Pattern, e.as_ref(), FcValueBinding::Weak);
        assert_eq!(l.len(), 2);
        assert_eq!(l.get(1).map(|v| v.binding), Some(FcValueBinding::Weak));
    }
}
