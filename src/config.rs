//! Runtime configuration and the substitution engine.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::collections::HashMap;

use arc_swap::ArcSwapOption;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::defaults::{FcGetDesktopName, FcGetPrgname};
use crate::expr::{FcConfigCompareValue, FcConfigEvaluate, FcConfigValues, FcExpr, FcOp, FcOpFlags};
use crate::hash::FcHashTable;
use crate::lang::{FcGetDefaultLangs, FcLangSet};
use crate::list::FcListPatternMatchAny;
use crate::object::*;
use crate::pattern::{FcFontSet, FcPattern};
use crate::rule::{FcEdit, FcQual, FcRule, FcRuleSet, FcTest};
use crate::strings::{
    FcStrCmpIgnoreBlanksAndCase, FcStrCmpIgnoreCase, FcStrHashIgnoreBlanksAndCase,
    FcStrHashIgnoreCase,
};
use crate::value::{FcValue, FcValueBinding, FcValueList};
use crate::FcMatchKind;

/// Which of a configuration's font sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FcSetName {
    System = 0,
    Application = 1,
}

#[derive(Debug, Clone, Default)]
struct FcGlobList {
    globs: Vec<String>,
    set: Option<GlobSet>,
}

impl FcGlobList {
    fn add(&mut self, glob: &str) -> bool {
        if let Err(e) = Glob::new(glob) {
            log::warn!("invalid glob {:?}: {}", glob, e);
            return false;
        }
        self.globs.push(String::from(glob));
        let mut builder = GlobSetBuilder::new();
        for g in self.globs.iter().filter_map(|g| Glob::new(g).ok()) {
            builder.add(g);
        }
        self.set = builder.build().ok();
        true
    }

    fn matches(&self, s: &str) -> bool {
        self.set.as_ref().is_some_and(|set| set.is_match(s))
    }
}

/// Font directories, filters, substitution rules and loaded font sets.
#[derive(Debug, Clone, Default)]
pub struct FcConfig {
    config_files: Vec<String>,
    font_dirs: Vec<String>,
    cache_dirs: Vec<String>,
    accept_globs: FcGlobList,
    reject_globs: FcGlobList,
    accept_patterns: Vec<FcPattern>,
    reject_patterns: Vec<FcPattern>,
    rule_sets: Vec<FcRuleSet>,
    max_object: FcObject,
    fonts: [FcFontSet; 2],
    /// Seconds between checks for font directory changes.
    pub rescan_interval: i32,
}

impl FcConfig {
    pub fn new() -> Self {
        FcConfig {
            rescan_interval: 30,
            ..Default::default()
        }
    }

    pub fn add_config_file(&mut self, path: &str) {
        self.config_files.push(String::from(path));
    }

    pub fn config_files(&self) -> &[String] {
        &self.config_files
    }

    pub fn add_font_dir(&mut self, dir: &str) -> bool {
        if !self.font_dirs.iter().any(|d| d == dir) {
            self.font_dirs.push(String::from(dir));
        }
        true
    }

    pub fn font_dirs(&self) -> &[String] {
        &self.font_dirs
    }

    pub fn add_cache_dir(&mut self, dir: &str) -> bool {
        if !self.cache_dirs.iter().any(|d| d == dir) {
            self.cache_dirs.push(String::from(dir));
        }
        true
    }

    pub fn cache_dirs(&self) -> &[String] {
        &self.cache_dirs
    }

    pub fn add_accept_glob(&mut self, glob: &str) -> bool {
        self.accept_globs.add(glob)
    }

    pub fn add_reject_glob(&mut self, glob: &str) -> bool {
        self.reject_globs.add(glob)
    }

    pub fn add_accept_pattern(&mut self, pattern: FcPattern) {
        self.accept_patterns.push(pattern);
    }

    pub fn add_reject_pattern(&mut self, pattern: FcPattern) {
        self.reject_patterns.push(pattern);
    }

    /// Appends a rule set; rule sets run in the order they were added.
    pub fn add_rule_set(&mut self, rs: FcRuleSet) {
        self.max_object = self.max_object.max(rs.max_object());
        self.rule_sets.push(rs);
    }

    pub fn rule_sets(&self) -> &[FcRuleSet] {
        &self.rule_sets
    }

    pub fn rule_sets_mut(&mut self) -> &mut [FcRuleSet] {
        &mut self.rule_sets
    }

    /// Largest object id referenced by any rule.
    pub fn max_object(&self) -> FcObject {
        self.max_object
    }

    /// Accepted unless rejected by a glob; an accept glob overrides rejection.
    pub fn accept_filename(&self, filename: &str) -> bool {
        if self.accept_globs.matches(filename) {
            return true;
        }
        !self.reject_globs.matches(filename)
    }

    /// Accepted unless matched by a reject pattern; an accept pattern
    /// overrides rejection.
    pub fn accept_font(&self, font: &FcPattern) -> bool {
        if self.accept_patterns.iter().any(|p| FcListPatternMatchAny(p, font)) {
            return true;
        }
        !self.reject_patterns.iter().any(|p| FcListPatternMatchAny(p, font))
    }

    pub fn fonts(&self, set: FcSetName) -> &FcFontSet {
        &self.fonts[set as usize]
    }

    /// Adds a font to `set` if it passes the filename and font filters.
    pub fn add_font(&mut self, set: FcSetName, font: FcPattern) -> bool {
        if let Ok(file) = font.get_string(FC_FILE_OBJECT, 0) {
            if !self.accept_filename(file) {
                log::debug!("rejecting font file {}", file);
                return false;
            }
        }
        if !self.accept_font(&font) {
            return false;
        }
        self.fonts[set as usize].add(font)
    }

    /// Runs scan-time substitution on freshly scanned fonts and adds the
    /// accepted ones to the system set.
    pub fn add_scanned_fonts<I: IntoIterator<Item = FcPattern>>(&mut self, fonts: I) -> usize {
        let mut added = 0;
        for mut font in fonts {
            self.substitute(&mut font, None, FcMatchKind::Scan);
            if self.add_font(FcSetName::System, font) {
                added += 1;
            }
        }
        added
    }

    /// Adds an application font.
    pub fn app_font_add_pattern(&mut self, font: FcPattern) -> bool {
        self.add_font(FcSetName::Application, font)
    }

    pub fn app_font_clear(&mut self) {
        self.fonts[FcSetName::Application as usize] = FcFontSet::new();
    }

    /// Applies every enabled rule set for `kind` to `p`. For font-targeted
    /// substitution `p_pat` is the original request.
    pub fn substitute(&self, p: &mut FcPattern, p_pat: Option<&FcPattern>, kind: FcMatchKind) -> bool {
        FcConfigSubstituteWithPat(Some(self), p, p_pat, kind)
    }
}

// ── Current configuration ──

static CURRENT: ArcSwapOption<FcConfig> = ArcSwapOption::const_empty();

/// The process-wide configuration, installing an empty one on first use.
pub fn FcConfigGetCurrent() -> Arc<FcConfig> {
    loop {
        if let Some(config) = CURRENT.load_full() {
            return config;
        }
        let fresh = Arc::new(FcConfig::new());
        let prev = CURRENT.compare_and_swap(&None::<Arc<FcConfig>>, Some(Arc::clone(&fresh)));
        if prev.is_none() {
            return fresh;
        }
    }
}

/// Replaces the process-wide configuration. Readers holding the old one
/// keep it alive until they drop it.
pub fn FcConfigSetCurrent(config: FcConfig) -> Arc<FcConfig> {
    let config = Arc::new(config);
    CURRENT.store(Some(Arc::clone(&config)));
    config
}

// ── Family table ──

// Counts of family names present in the pattern being substituted, so
// equality tests on long family lists need not scan.
struct FamilyTable {
    blanks: FcHashTable<Arc<str>, usize>,
    case: FcHashTable<Arc<str>, usize>,
}

fn hash_blanks(s: &Arc<str>) -> u32 {
    FcStrHashIgnoreBlanksAndCase(s)
}

fn eq_blanks(a: &Arc<str>, b: &Arc<str>) -> bool {
    FcStrCmpIgnoreBlanksAndCase(a, b).is_eq()
}

fn hash_case(s: &Arc<str>) -> u32 {
    FcStrHashIgnoreCase(s)
}

fn eq_case(a: &Arc<str>, b: &Arc<str>) -> bool {
    FcStrCmpIgnoreCase(a, b).is_eq()
}

impl FamilyTable {
    fn new(p: &FcPattern) -> Self {
        let table = FamilyTable {
            blanks: FcHashTable::new(hash_blanks, eq_blanks),
            case: FcHashTable::new(hash_case, eq_case),
        };
        if let Some(values) = p.values(FC_FAMILY_OBJECT) {
            table.add(values);
        }
        table
    }

    fn bump(t: &FcHashTable<Arc<str>, usize>, s: &Arc<str>, delta: isize) {
        let count = t.find(s).unwrap_or(0) as isize + delta;
        if count > 0 {
            t.replace(Arc::clone(s), count as usize);
        } else {
            t.remove(s);
        }
    }

    fn add(&self, values: &FcValueList) {
        for s in values.values().filter_map(|v| match v {
            FcValue::String(s) => Some(s),
            _ => None,
        }) {
            Self::bump(&self.blanks, s, 1);
            Self::bump(&self.case, s, 1);
        }
    }

    fn del(&self, v: &FcValue) {
        if let FcValue::String(s) = v {
            Self::bump(&self.blanks, s, -1);
            Self::bump(&self.case, s, -1);
        }
    }

    fn lookup(&self, flags: FcOpFlags, s: &Arc<str>) -> bool {
        let t = if flags.ignore_blanks { &self.blanks } else { &self.case };
        t.find(s).is_some_and(|n| n > 0)
    }
}

// ── Substitution ──

/// Index of the value in `values` satisfying test `t`, or `None`.
fn FcConfigMatchValueList(
    m: &FcPattern,
    p_pat: Option<&FcPattern>,
    kind: FcMatchKind,
    t: &FcTest,
    values: &FcValueList,
    table: Option<&FamilyTable>,
) -> Option<usize> {
    let mut ret = None;
    let mut cur = Some(&t.expr);
    while let Some(e) = cur {
        let (head, next) = match e {
            FcExpr::Binary { op: FcOp::Comma, left, right, .. } => (&**left, Some(&**right)),
            other => (other, None),
        };
        cur = next;
        let value = FcConfigEvaluate(m, p_pat, kind, head);

        if let (Some(table), FcValue::String(s)) = (table, &value) {
            if t.object == FC_FAMILY_OBJECT {
                if matches!(t.op, FcOp::Equal | FcOp::Listing) && !table.lookup(t.flags, s) {
                    ret = None;
                    continue;
                }
                if t.op == FcOp::NotEqual && t.qual == FcQual::All {
                    ret = if table.lookup(t.flags, s) { None } else { Some(0) };
                    continue;
                }
            }
        }

        for (i, v) in values.values().enumerate() {
            if FcConfigCompareValue(v, t.op, t.flags, &value) {
                ret.get_or_insert(i);
                if t.qual != FcQual::All {
                    break;
                }
            } else if t.qual == FcQual::All {
                ret = None;
                break;
            }
        }
    }
    ret
}

// Resolves `Same` bindings against the value at `position`.
fn resolve_same(list: &mut FcValueList, same: FcValueBinding) {
    for v in list.iter_mut() {
        if v.binding == FcValueBinding::Same {
            v.binding = same;
        }
    }
}

// Inserts `list` next to `position` (or at an end), returning the index of
// the first inserted value.
fn FcConfigAdd(
    p: &mut FcPattern,
    object: FcObject,
    position: Option<usize>,
    append: bool,
    mut list: FcValueList,
    table: Option<&FamilyTable>,
) -> Option<usize> {
    if let Some(bad) = list.values().find(|v| !FcObjectValidType(object, v.value_type())) {
        log::warn!(
            "pattern object {} does not accept value of type {:?}",
            FcObjectName(object).unwrap_or("<unknown>"),
            bad.value_type()
        );
        return None;
    }
    if list.is_empty() {
        return None;
    }
    if object == FC_FAMILY_OBJECT {
        if let Some(table) = table {
            table.add(&list);
        }
    }
    let elt = p.insert_elt(object);
    let same = position
        .and_then(|pos| elt.values.get(pos))
        .map(|v| v.binding)
        .unwrap_or(FcValueBinding::Weak);
    resolve_same(&mut list, same);
    let at = match (append, position) {
        (true, Some(pos)) => pos + 1,
        (true, None) => elt.values.len(),
        (false, Some(pos)) => pos,
        (false, None) => 0,
    };
    elt.values.splice_at(at, list, same);
    Some(at)
}

fn FcConfigDel(p: &mut FcPattern, object: FcObject, position: usize, table: Option<&FamilyTable>) {
    if let Some(elt) = p.find_elt_mut(object) {
        if let Some(removed) = elt.values.remove(position) {
            if object == FC_FAMILY_OBJECT {
                if let Some(table) = table {
                    table.del(&removed.value);
                }
            }
        }
    }
}

fn FcConfigPatternDel(p: &mut FcPattern, object: FcObject, table: Option<&FamilyTable>) {
    if let Some(elt) = p.find_elt_mut(object) {
        if object == FC_FAMILY_OBJECT {
            if let Some(table) = table {
                for v in elt.values.values() {
                    table.del(v);
                }
            }
        }
        elt.values = FcValueList::new();
    }
}

// Appends default languages until one the pattern already carries.
fn add_default_langs(p: &mut FcPattern) {
    let und = FcLangSet::from_langs(["und"]);
    for lang in FcGetDefaultLangs() {
        let covered = p.values(FC_LANG_OBJECT).is_some_and(|values| {
            values.values().any(|v| match v {
                FcValue::LangSet(ls) => {
                    ls.contains(&FcLangSet::from_langs([lang.as_str()])) || ls.contains(&und)
                }
                FcValue::String(s) => {
                    FcStrCmpIgnoreCase(s, lang).is_eq() || FcStrCmpIgnoreCase(s, "und").is_eq()
                }
                _ => false,
            })
        });
        if covered {
            break;
        }
        p.add_with_binding(FC_LANG_OBJECT, FcValue::from(lang.as_str()), FcValueBinding::Weak, true);
    }
}

// Value position marked by the first test on each object, for edits that
// work relative to the matched value.
type RuleState = HashMap<FcObject, Option<usize>>;

fn apply_edit(
    p: &mut FcPattern,
    p_pat: Option<&FcPattern>,
    kind: FcMatchKind,
    edit: &FcEdit,
    state: &mut RuleState,
    table: Option<&FamilyTable>,
) {
    let object = edit.object;
    let l = FcConfigValues(p, p_pat, kind, edit.expr.as_ref(), edit.binding);

    let position = state
        .get(&object)
        .copied()
        .flatten()
        .filter(|pos| p.values(object).is_some_and(|vl| *pos < vl.len()));

    let inserted = l.len();
    let new_position = match (edit.op, position) {
        (FcOp::Assign, Some(pos)) => {
            let at = FcConfigAdd(p, object, Some(pos), true, l, table);
            FcConfigDel(p, object, pos, table);
            at.map(|_| pos)
        }
        (FcOp::Assign | FcOp::AssignReplace, _) => {
            FcConfigPatternDel(p, object, table);
            FcConfigAdd(p, object, None, true, l, table);
            None
        }
        (FcOp::Prepend, Some(pos)) => match FcConfigAdd(p, object, Some(pos), false, l, table) {
            Some(_) => Some(pos + inserted),
            None => Some(pos),
        },
        (FcOp::Prepend | FcOp::PrependFirst, _) => {
            let added = FcConfigAdd(p, object, None, false, l, table).is_some();
            position.map(|pos| if added { pos + inserted } else { pos })
        }
        (FcOp::Append, Some(pos)) => {
            FcConfigAdd(p, object, Some(pos), true, l, table);
            Some(pos)
        }
        (FcOp::Append | FcOp::AppendLast, _) => {
            FcConfigAdd(p, object, None, true, l, table);
            position
        }
        (FcOp::Delete, Some(pos)) => {
            FcConfigDel(p, object, pos, table);
            None
        }
        (FcOp::Delete | FcOp::DeleteAll, _) => {
            FcConfigPatternDel(p, object, table);
            None
        }
        (other, _) => {
            log::warn!("invalid edit operator {:?}", other);
            position
        }
    };
    state.insert(object, new_position);
    p.canonicalize(object);
}

// Runs one rule list; returns false when a test fails.
fn apply_rules(
    p: &mut FcPattern,
    p_pat: Option<&FcPattern>,
    kind: FcMatchKind,
    rules: &[FcRule],
    table: &FamilyTable,
) -> bool {
    let mut state = RuleState::default();
    for rule in rules {
        match rule {
            FcRule::Test(t) => {
                let test_kind = t.effective_kind(kind);
                let (m, table) = if kind == FcMatchKind::Font && test_kind == FcMatchKind::Pattern {
                    (p_pat, None)
                } else {
                    (Some(&*p), Some(table))
                };
                let values = m.and_then(|m| m.values(t.object));
                let Some(values) = values else {
                    if t.qual == FcQual::All {
                        if test_kind == kind {
                            state.entry(t.object).or_insert(None);
                        }
                        continue;
                    }
                    return false;
                };
                let Some(m) = m else {
                    return false;
                };
                let vl = FcConfigMatchValueList(m, p_pat, kind, t, values, table);
                if test_kind == kind {
                    let slot = state.entry(t.object).or_insert(None);
                    if slot.is_none() {
                        *slot = vl;
                    }
                }
                match (vl, t.qual) {
                    (None, _) => return false,
                    (Some(i), FcQual::First) if i != 0 => return false,
                    (Some(0), FcQual::NotFirst) => return false,
                    _ => {}
                }
            }
            FcRule::Edit(edit) => apply_edit(p, p_pat, kind, edit, &mut state, Some(table)),
        }
    }
    true
}

/// Applies the configuration's rules for `kind` to `p`. Pattern-targeted
/// substitution first adds default languages, program name and desktop
/// name. Never fails: rules whose tests fail or whose values do not fit
/// simply have no effect.
pub fn FcConfigSubstituteWithPat(
    config: Option<&FcConfig>,
    p: &mut FcPattern,
    p_pat: Option<&FcPattern>,
    kind: FcMatchKind,
) -> bool {
    let current;
    let config = match config {
        Some(c) => c,
        None => {
            current = FcConfigGetCurrent();
            &*current
        }
    };

    if kind == FcMatchKind::Pattern {
        add_default_langs(p);
        if !p.has(FC_PRGNAME_OBJECT) {
            if let Some(prgname) = FcGetPrgname() {
                p.add_string(FC_PRGNAME_OBJECT, prgname);
            }
        }
        if !p.has(FC_DESKTOP_NAME_OBJECT) {
            if let Some(desktop) = FcGetDesktopName() {
                p.add_string(FC_DESKTOP_NAME_OBJECT, desktop);
            }
        }
    }

    let table = FamilyTable::new(p);
    for rs in config.rule_sets.iter().filter(|rs| rs.enabled) {
        for rules in rs.rules(kind) {
            let applied = apply_rules(p, p_pat, kind, rules, &table);
            log::trace!("rule list in {:?} {}", rs.name, if applied { "applied" } else { "skipped" });
        }
    }
    true
}

pub fn FcConfigSubstitute(config: Option<&FcConfig>, p: &mut FcPattern, kind: FcMatchKind) -> bool {
    FcConfigSubstituteWithPat(config, p, None, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::FcEdit;
    use crate::PatternMatch;

    fn families(p: &FcPattern) -> Vec<String> {
        p.values(FC_FAMILY_OBJECT)
            .map(|l| l.values().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default()
    }

    fn alias_rule(family: &str, prefer: &str) -> Vec<FcRule> {
        vec![
            FcRule::Test(FcTest::new(FC_FAMILY, FcQual::Any, FcOp::Equal, FcExpr::string(family))),
            FcRule::Edit(FcEdit::new(
                FC_FAMILY,
                FcOp::Prepend,
                Some(FcExpr::string(prefer)),
                FcValueBinding::Strong,
            )),
        ]
    }

    #[test]
    fn prepend_inserts_before_marked_value() {
        let mut rs = FcRuleSet::new("alias");
        rs.add(alias_rule("sans-serif", "DejaVu Sans"), FcMatchKind::Pattern);
        let mut config = FcConfig::new();
        config.add_rule_set(rs);

        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "Foo");
        p.add_string(FC_FAMILY_OBJECT, "sans-serif");
        config.substitute(&mut p, None, FcMatchKind::Pattern);
        assert_eq!(families(&p), ["Foo", "DejaVu Sans", "sans-serif"]);
    }

    #[test]
    fn failing_test_skips_edits() {
        let mut rs = FcRuleSet::new("alias");
        rs.add(alias_rule("serif", "DejaVu Serif"), FcMatchKind::Pattern);
        let mut config = FcConfig::new();
        config.add_rule_set(rs);
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "Foo");
        config.substitute(&mut p, None, FcMatchKind::Pattern);
        assert_eq!(families(&p), ["Foo"]);
    }

    #[test]
    fn assign_replaces_marked_value() {
        let mut rs = FcRuleSet::new("rename");
        rs.add(
            vec![
                FcRule::Test(FcTest::new(FC_FAMILY, FcQual::Any, FcOp::Equal, FcExpr::string("Helvetica"))),
                FcRule::Edit(FcEdit::new(FC_FAMILY, FcOp::Assign, Some(FcExpr::string("Arial")), FcValueBinding::Same)),
            ],
            FcMatchKind::Pattern,
        );
        let mut config = FcConfig::new();
        config.add_rule_set(rs);
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "Foo");
        p.add_string(FC_FAMILY_OBJECT, "helvetica");
        p.add_string(FC_FAMILY_OBJECT, "Bar");
        config.substitute(&mut p, None, FcMatchKind::Pattern);
        assert_eq!(families(&p), ["Foo", "Arial", "Bar"]);
        let b = p.get_with_binding(FC_FAMILY_OBJECT, 1).unwrap().binding;
        assert_eq!(b, FcValueBinding::Strong);
    }

    fn family_config(rules: Vec<FcRule>, kind: FcMatchKind) -> FcConfig {
        let mut rs = FcRuleSet::new("edits");
        rs.add(rules, kind);
        let mut config = FcConfig::new();
        config.add_rule_set(rs);
        config
    }

    fn family_pattern(names: &[&str]) -> FcPattern {
        let mut p = FcPattern::new();
        for name in names {
            p.add_string(FC_FAMILY_OBJECT, name);
        }
        p
    }

    fn family_test(qual: FcQual, op: FcOp, names: &[&str]) -> FcRule {
        let expr = FcExpr::list(names.iter().map(|n| FcExpr::string(n)).collect()).unwrap();
        FcRule::Test(FcTest::new(FC_FAMILY, qual, op, expr))
    }

    fn family_edit(op: FcOp, names: &[&str]) -> FcRule {
        let expr = FcExpr::list(names.iter().map(|n| FcExpr::string(n)).collect());
        FcRule::Edit(FcEdit::new(FC_FAMILY, op, expr, FcValueBinding::Strong))
    }

    fn run(config: &FcConfig, names: &[&str]) -> Vec<String> {
        let mut p = family_pattern(names);
        config.substitute(&mut p, None, FcMatchKind::Font);
        families(&p)
    }

    #[test]
    fn family_list_test_matches_any_listed_name() {
        let config = family_config(
            vec![
                family_test(FcQual::Any, FcOp::Equal, &["Nope", "Foo"]),
                family_edit(FcOp::Append, &["Added"]),
            ],
            FcMatchKind::Font,
        );
        assert_eq!(run(&config, &["Foo"]), ["Foo", "Added"]);
        // the mark sits on the matched value, not the head of the list
        assert_eq!(run(&config, &["Bar", "Foo", "Baz"]), ["Bar", "Foo", "Added", "Baz"]);
        assert_eq!(run(&config, &["Bar"]), ["Bar"]);
    }

    #[test]
    fn not_equal_all_over_family_names() {
        let config = family_config(
            vec![
                family_test(FcQual::All, FcOp::NotEqual, &["Comic Sans"]),
                family_edit(FcOp::AppendLast, &["Fallback"]),
            ],
            FcMatchKind::Font,
        );
        assert_eq!(run(&config, &["A", "B"]), ["A", "B", "Fallback"]);
        assert_eq!(run(&config, &["A", "comic sans"]), ["A", "comic sans"]);
    }

    #[test]
    fn delete_removes_marked_value_and_clears_mark() {
        let config = family_config(
            vec![
                family_test(FcQual::Any, FcOp::Equal, &["B"]),
                family_edit(FcOp::Delete, &[]),
                family_edit(FcOp::Append, &["Z"]),
            ],
            FcMatchKind::Font,
        );
        assert_eq!(run(&config, &["A", "B", "C"]), ["A", "C", "Z"]);
    }

    #[test]
    fn delete_all_drops_the_element() {
        let config = family_config(
            vec![
                family_test(FcQual::Any, FcOp::Equal, &["B"]),
                family_edit(FcOp::DeleteAll, &[]),
            ],
            FcMatchKind::Font,
        );
        let mut p = family_pattern(&["A", "B", "C"]);
        config.substitute(&mut p, None, FcMatchKind::Font);
        assert!(!p.has(FC_FAMILY_OBJECT));
    }

    #[test]
    fn prepend_first_and_append_last_keep_the_mark() {
        let config = family_config(
            vec![
                family_test(FcQual::Any, FcOp::Equal, &["B"]),
                family_edit(FcOp::PrependFirst, &["First"]),
                family_edit(FcOp::AppendLast, &["Last"]),
                family_edit(FcOp::Assign, &["Bee"]),
            ],
            FcMatchKind::Font,
        );
        assert_eq!(run(&config, &["A", "B", "C"]), ["First", "A", "Bee", "C", "Last"]);
    }

    #[test]
    fn assign_after_prepend_follows_marked_value() {
        let config = family_config(
            vec![
                family_test(FcQual::Any, FcOp::Equal, &["B"]),
                family_edit(FcOp::Prepend, &["P1", "P2"]),
                family_edit(FcOp::Assign, &["Bee"]),
            ],
            FcMatchKind::Font,
        );
        assert_eq!(run(&config, &["A", "B", "C"]), ["A", "P1", "P2", "Bee", "C"]);
    }

    #[test]
    fn not_first_rejects_a_head_match() {
        let config = family_config(
            vec![
                family_test(FcQual::NotFirst, FcOp::Equal, &["A"]),
                family_edit(FcOp::Append, &["X"]),
            ],
            FcMatchKind::Font,
        );
        assert_eq!(run(&config, &["A", "B"]), ["A", "B"]);
        assert_eq!(run(&config, &["B", "A"]), ["B", "A", "X"]);
    }

    #[test]
    fn request_test_on_missing_object_leaves_font_mark() {
        let style_test = FcRule::Test(
            FcTest::new(FC_STYLE, FcQual::All, FcOp::Equal, FcExpr::string("Bold"))
                .with_kind(FcMatchKind::Pattern),
        );
        for rules in [
            vec![
                family_test(FcQual::Any, FcOp::Equal, &["B"]),
                style_test.clone(),
                family_edit(FcOp::Assign, &["Bee"]),
            ],
            vec![
                style_test.clone(),
                family_test(FcQual::Any, FcOp::Equal, &["B"]),
                family_edit(FcOp::Assign, &["Bee"]),
            ],
        ] {
            let config = family_config(rules, FcMatchKind::Font);
            let request = family_pattern(&["B"]);
            let mut font = family_pattern(&["A", "B", "C"]);
            config.substitute(&mut font, Some(&request), FcMatchKind::Font);
            assert_eq!(families(&font), ["A", "Bee", "C"]);
        }
    }

    #[test]
    fn qual_all_matches_missing_object() {
        let mut rs = FcRuleSet::new("all");
        rs.add(
            vec![
                FcRule::Test(FcTest::new(FC_ANTIALIAS, FcQual::All, FcOp::Equal, FcExpr::Bool(PatternMatch::True))),
                FcRule::Edit(FcEdit::new("hinting", FcOp::Assign, Some(FcExpr::Bool(PatternMatch::False)), FcValueBinding::Weak)),
            ],
            FcMatchKind::Font,
        );
        let mut config = FcConfig::new();
        config.add_rule_set(rs);
        let mut font = FcPattern::new();
        config.substitute(&mut font, None, FcMatchKind::Font);
        assert_eq!(font.get_bool(FC_HINTING_OBJECT, 0), Ok(PatternMatch::False));
    }

    #[test]
    fn disabled_rule_sets_do_nothing() {
        let mut rs = FcRuleSet::new("alias");
        rs.add(alias_rule("sans-serif", "DejaVu Sans"), FcMatchKind::Pattern);
        rs.enable(false);
        let mut config = FcConfig::new();
        config.add_rule_set(rs);
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "sans-serif");
        config.substitute(&mut p, None, FcMatchKind::Pattern);
        assert_eq!(families(&p), ["sans-serif"]);
    }

    #[test]
    fn filters() {
        let mut config = FcConfig::new();
        config.add_reject_glob("/usr/share/fonts/bad/*");
        config.add_accept_glob("/usr/share/fonts/bad/keep.ttf");
        assert!(!config.accept_filename("/usr/share/fonts/bad/x.ttf"));
        assert!(config.accept_filename("/usr/share/fonts/bad/keep.ttf"));
        assert!(config.accept_filename("/usr/share/fonts/good/x.ttf"));

        let mut reject = FcPattern::new();
        reject.add_string(FC_FAMILY_OBJECT, "Bitmap Junk");
        config.add_reject_pattern(reject);
        let mut font = FcPattern::new();
        font.add_string(FC_FAMILY_OBJECT, "bitmapjunk");
        assert!(!config.accept_font(&font));
        assert!(!config.app_font_add_pattern(font));
        assert!(config.fonts(FcSetName::Application).is_empty());
    }

    #[test]
    fn current_config_is_installed_once() {
        let a = FcConfigGetCurrent();
        let b = FcConfigGetCurrent();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
