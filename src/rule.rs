//! Substitution rules: tests that gate and edits that rewrite a pattern.

use alloc::string::String;
use alloc::vec::Vec;

use crate::expr::{FcExpr, FcOp, FcOpFlags};
use crate::object::{FcObject, FcObjectLookupIdByName};
use crate::value::FcValueBinding;
use crate::FcMatchKind;

/// How a test combines its comparison over a value list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FcQual {
    /// Some value matches.
    Any,
    /// Every value matches (and a missing object matches).
    All,
    /// The first value matches.
    First,
    /// Some value other than the first matches.
    NotFirst,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FcTest {
    /// Pattern the test reads; `None` means the pattern the rule targets.
    pub kind: Option<FcMatchKind>,
    pub qual: FcQual,
    pub object: FcObject,
    pub op: FcOp,
    pub flags: FcOpFlags,
    pub expr: FcExpr,
}

impl FcTest {
    pub fn new(object: &str, qual: FcQual, op: FcOp, expr: FcExpr) -> Self {
        FcTest {
            kind: None,
            qual,
            object: FcObjectLookupIdByName(object),
            op,
            flags: FcOpFlags::NONE,
            expr,
        }
    }

    pub fn with_kind(mut self, kind: FcMatchKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn ignore_blanks(mut self) -> Self {
        self.flags = FcOpFlags::IGNORE_BLANKS;
        self
    }

    pub(crate) fn effective_kind(&self, rule_kind: FcMatchKind) -> FcMatchKind {
        self.kind.unwrap_or(rule_kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FcEdit {
    pub object: FcObject,
    /// One of the edit operators (`Assign` ... `DeleteAll`).
    pub op: FcOp,
    pub expr: Option<FcExpr>,
    pub binding: FcValueBinding,
}

impl FcEdit {
    pub fn new(object: &str, op: FcOp, expr: Option<FcExpr>, binding: FcValueBinding) -> Self {
        FcEdit {
            object: FcObjectLookupIdByName(object),
            op,
            expr,
            binding,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FcRule {
    Test(FcTest),
    Edit(FcEdit),
}

impl FcRule {
    pub fn object(&self) -> FcObject {
        match self {
            FcRule::Test(t) => t.object,
            FcRule::Edit(e) => e.object,
        }
    }
}

/// A named group of rule lists, one list of rules per `<match>`, kept per
/// target kind in registration order.
#[derive(Debug, Clone)]
pub struct FcRuleSet {
    pub name: String,
    pub description: String,
    pub domain: String,
    pub enabled: bool,
    subst: [Vec<Vec<FcRule>>; 3],
    max_object: FcObject,
}

impl Default for FcRuleSet {
    fn default() -> Self {
        Self::new("")
    }
}

impl FcRuleSet {
    pub fn new(name: &str) -> Self {
        FcRuleSet {
            name: String::from(name),
            description: String::new(),
            domain: String::new(),
            enabled: true,
            subst: [Vec::new(), Vec::new(), Vec::new()],
            max_object: 0,
        }
    }

    /// Registers one rule list for `kind`, returning its position. Empty
    /// lists are rejected.
    pub fn add(&mut self, rules: Vec<FcRule>, kind: FcMatchKind) -> Option<usize> {
        if rules.is_empty() {
            return None;
        }
        for r in &rules {
            self.max_object = self.max_object.max(r.object());
        }
        let lists = &mut self.subst[kind.index()];
        lists.push(rules);
        Some(lists.len() - 1)
    }

    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn rules(&self, kind: FcMatchKind) -> &[Vec<FcRule>] {
        &self.subst[kind.index()]
    }

    /// Largest object id any rule refers to.
    pub fn max_object(&self) -> FcObject {
        self.max_object
    }

    pub fn is_empty(&self) -> bool {
        self.subst.iter().all(|s| s.is_empty())
    }
}
