//! fonts.conf reader.
//!
//! The document is tokenized with `xmlparser` into a small element tree,
//! then interpreted. XML-level problems are errors; unknown elements and
//! bad attribute values are logged and skipped, so one broken `<match>`
//! does not discard the rest of the file.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::charset::FcCharSet;
use crate::config::FcConfig;
use crate::error::FcConfigError;
use crate::expr::{FcConfigEvaluate, FcExpr, FcOp};
use crate::lang::FcLangSet;
use crate::name::FcNameBool;
use crate::object::FC_FAMILY;
use crate::pattern::FcPattern;
use crate::rule::{FcEdit, FcQual, FcRule, FcRuleSet, FcTest};
use crate::value::{FcRange, FcValueBinding};
use crate::FcMatchKind;

// ── Element tree ──

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> &str {
        self.text.trim()
    }

    fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return String::from(s);
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn parse_tree(input: &str) -> Result<Element, FcConfigError> {
    use xmlparser::Token::*;
    use xmlparser::Tokenizer;

    // the bottom entry collects top-level elements
    let mut stack = vec![Element::default()];

    for token in Tokenizer::from(input) {
        match token? {
            ElementStart { local, .. } => {
                stack.push(Element {
                    name: local.as_str().to_string(),
                    ..Element::default()
                });
            }
            Attribute { local, value, .. } => {
                if let Some(top) = stack.last_mut() {
                    top.attrs
                        .push((local.as_str().to_string(), unescape(value.as_str())));
                }
            }
            Text { text } => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&unescape(text.as_str()));
                }
            }
            Cdata { text, .. } => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(text.as_str());
                }
            }
            ElementEnd { end, .. } => {
                match end {
                    xmlparser::ElementEnd::Open => continue,
                    xmlparser::ElementEnd::Close(_, local) => {
                        let open = stack.last().map(|e| e.name.as_str());
                        if stack.len() < 2 || open != Some(local.as_str()) {
                            return Err(FcConfigError::Unbalanced(local.as_str().to_string()));
                        }
                    }
                    xmlparser::ElementEnd::Empty => {}
                }
                if let Some(done) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(done);
                    }
                }
            }
            _ => {}
        }
    }

    if stack.len() != 1 {
        let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
        return Err(FcConfigError::Unbalanced(open));
    }
    let mut root = stack.pop().unwrap_or_default();
    match root.children.iter().position(|e| e.name == "fontconfig") {
        Some(i) => Ok(root.children.swap_remove(i)),
        None => Err(FcConfigError::Unbalanced(String::from("fontconfig"))),
    }
}

// ── Expressions ──

fn parse_number(e: &Element) -> Option<f64> {
    let t = e.text();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok().map(|v| v as f64),
        None => t.parse::<f64>().ok(),
    };
    if parsed.is_none() {
        log::warn!("\"{}\": not a valid <{}>", t, e.name);
    }
    parsed
}

fn binary_op(name: &str) -> Option<FcOp> {
    Some(match name {
        "plus" => FcOp::Plus,
        "minus" => FcOp::Minus,
        "times" => FcOp::Times,
        "divide" => FcOp::Divide,
        "and" => FcOp::And,
        "or" => FcOp::Or,
        "eq" => FcOp::Equal,
        "not_eq" => FcOp::NotEqual,
        "less" => FcOp::Less,
        "less_eq" => FcOp::LessEqual,
        "more" => FcOp::More,
        "more_eq" => FcOp::MoreEqual,
        "contains" => FcOp::Contains,
        "not_contains" => FcOp::NotContains,
        _ => return None,
    })
}

fn unary_op(name: &str) -> Option<FcOp> {
    Some(match name {
        "not" => FcOp::Not,
        "floor" => FcOp::Floor,
        "ceil" => FcOp::Ceil,
        "round" => FcOp::Round,
        "trunc" => FcOp::Trunc,
        _ => return None,
    })
}

fn match_kind(target: &str) -> Option<Option<FcMatchKind>> {
    match target {
        "default" => Some(None),
        "pattern" => Some(Some(FcMatchKind::Pattern)),
        "font" => Some(Some(FcMatchKind::Font)),
        "scan" => Some(Some(FcMatchKind::Scan)),
        _ => None,
    }
}

fn parse_charset(e: &Element) -> FcCharSet {
    let mut cs = FcCharSet::new();
    for c in &e.children {
        match c.name.as_str() {
            "int" => {
                if let Some(v) = parse_number(c) {
                    cs.add_char(v as u32);
                }
            }
            "range" => {
                let bounds: Vec<f64> = c.named("int").filter_map(parse_number).collect();
                if let [lo, hi] = bounds[..] {
                    for ucs4 in (lo as u32)..=(hi as u32) {
                        cs.add_char(ucs4);
                    }
                } else {
                    log::warn!("<range> in <charset> needs two <int>");
                }
            }
            other => log::warn!("unexpected <{}> in <charset>", other),
        }
    }
    cs
}

fn parse_expr(e: &Element) -> Option<FcExpr> {
    let name = e.name.as_str();
    if let Some(op) = binary_op(name) {
        let mut args = e.children.iter().filter_map(parse_expr);
        let first = args.next()?;
        return Some(args.fold(first, |acc, rhs| FcExpr::binary(op, acc, rhs)));
    }
    if let Some(op) = unary_op(name) {
        let arg = e.children.iter().find_map(parse_expr)?;
        return Some(FcExpr::unary(op, arg));
    }
    let expr = match name {
        "string" => FcExpr::string(e.text()),
        "int" => {
            let v = parse_number(e)?;
            if v.fract() == 0.0 && v.abs() <= i32::MAX as f64 {
                FcExpr::Integer(v as i32)
            } else {
                FcExpr::Double(v)
            }
        }
        "double" => FcExpr::Double(parse_number(e)?),
        "bool" => match FcNameBool(e.text()) {
            Some(b) => FcExpr::Bool(b),
            None => {
                log::warn!("\"{}\": not a valid <bool>", e.text());
                return None;
            }
        },
        "const" => FcExpr::constant(e.text()),
        "name" => match e.attr("target").map(match_kind) {
            None | Some(Some(None)) => FcExpr::field(e.text()),
            Some(Some(Some(kind))) => FcExpr::field_of(e.text(), kind),
            Some(None) => {
                log::warn!("invalid <name> target");
                return None;
            }
        },
        "range" => {
            let bounds: Vec<f64> = e.children.iter().filter_map(parse_number).collect();
            match bounds[..] {
                [lo, hi] if lo <= hi => FcExpr::Range(FcRange::new(lo, hi)),
                _ => {
                    log::warn!("invalid <range>");
                    return None;
                }
            }
        }
        "matrix" => {
            let parts: Vec<FcExpr> = e.children.iter().filter_map(parse_expr).collect();
            match <[FcExpr; 4]>::try_from(parts) {
                Ok(m) => FcExpr::Matrix(Box::new(m)),
                Err(_) => {
                    log::warn!("<matrix> needs four elements");
                    return None;
                }
            }
        }
        "charset" => FcExpr::CharSet(parse_charset(e).into()),
        "langset" => {
            let ls = FcLangSet::from_langs(e.named("string").map(Element::text));
            FcExpr::LangSet(ls.into())
        }
        "if" => {
            let mut parts = e.children.iter().filter_map(parse_expr);
            let (cond, then, otherwise) = (parts.next()?, parts.next()?, parts.next()?);
            FcExpr::quest(cond, then, otherwise)
        }
        other => {
            log::warn!("unknown expression element <{}>", other);
            return None;
        }
    };
    Some(expr)
}

// ── Rules ──

fn parse_test(e: &Element) -> Option<FcTest> {
    let Some(object) = e.attr("name") else {
        log::warn!("<test> without name");
        return None;
    };
    let qual = match e.attr("qual").unwrap_or("any") {
        "any" => FcQual::Any,
        "all" => FcQual::All,
        "first" => FcQual::First,
        "not_first" => FcQual::NotFirst,
        other => {
            log::warn!("invalid test qual \"{}\"", other);
            return None;
        }
    };
    let compare = e.attr("compare").unwrap_or("eq");
    let Some(op) = binary_op(compare).filter(|op| op.is_comparison()) else {
        log::warn!("invalid test compare \"{}\"", compare);
        return None;
    };
    let expr = FcExpr::list(e.children.iter().filter_map(parse_expr).collect())?;
    let mut test = FcTest::new(object, qual, op, expr);
    match e.attr("target").map(match_kind) {
        None | Some(Some(None)) => {}
        Some(Some(Some(kind))) => test = test.with_kind(kind),
        Some(None) => {
            log::warn!("invalid test target");
            return None;
        }
    }
    if e.attr("ignore-blanks").and_then(FcNameBool) == Some(crate::PatternMatch::True) {
        test = test.ignore_blanks();
    }
    Some(test)
}

fn parse_binding(e: &Element) -> Option<FcValueBinding> {
    match e.attr("binding").unwrap_or("weak") {
        "weak" => Some(FcValueBinding::Weak),
        "strong" => Some(FcValueBinding::Strong),
        "same" => Some(FcValueBinding::Same),
        other => {
            log::warn!("invalid binding \"{}\"", other);
            None
        }
    }
}

fn parse_edit(e: &Element) -> Option<FcEdit> {
    let Some(object) = e.attr("name") else {
        log::warn!("<edit> without name");
        return None;
    };
    let op = match e.attr("mode").unwrap_or("assign") {
        "assign" => FcOp::Assign,
        "assign_replace" => FcOp::AssignReplace,
        "prepend" => FcOp::Prepend,
        "prepend_first" => FcOp::PrependFirst,
        "append" => FcOp::Append,
        "append_last" => FcOp::AppendLast,
        "delete" => FcOp::Delete,
        "delete_all" => FcOp::DeleteAll,
        other => {
            log::warn!("invalid edit mode \"{}\"", other);
            return None;
        }
    };
    let binding = parse_binding(e)?;
    let expr = FcExpr::list(e.children.iter().filter_map(parse_expr).collect());
    Some(FcEdit::new(object, op, expr, binding))
}

fn parse_match(e: &Element, rs: &mut FcRuleSet) {
    let kind = match match_kind(e.attr("target").unwrap_or("pattern")) {
        Some(Some(kind)) => kind,
        _ => {
            log::warn!("invalid <match> target");
            return;
        }
    };
    let mut rules = Vec::new();
    for c in &e.children {
        match c.name.as_str() {
            "test" => match parse_test(c) {
                Some(t) => rules.push(FcRule::Test(t)),
                // a test that cannot be evaluated would let the edits run
                // unconditionally
                None => return,
            },
            "edit" => rules.extend(parse_edit(c).map(FcRule::Edit)),
            other => log::warn!("unexpected <{}> in <match>", other),
        }
    }
    rs.add(rules, kind);
}

// <alias> is shorthand for one pattern-targeted match per family.
fn parse_alias(e: &Element, rs: &mut FcRuleSet) {
    let Some(binding) = parse_binding(e) else { return };
    let families = |parent: &Element| -> Option<FcExpr> {
        FcExpr::list(parent.named("family").map(|f| FcExpr::string(f.text())).collect())
    };
    let section = |name: &str| e.named(name).find_map(|s| families(s));
    let (prefer, accept, default) = (section("prefer"), section("accept"), section("default"));

    for family in e.named("family") {
        let test = FcTest::new(FC_FAMILY, FcQual::Any, FcOp::Equal, FcExpr::string(family.text()))
            .ignore_blanks();
        let mut rules = vec![FcRule::Test(test)];
        for (expr, op) in [
            (&prefer, FcOp::Prepend),
            (&accept, FcOp::Append),
            (&default, FcOp::AppendLast),
        ] {
            if let Some(expr) = expr {
                rules.push(FcRule::Edit(FcEdit::new(FC_FAMILY, op, Some(expr.clone()), binding)));
            }
        }
        if rules.len() > 1 {
            rs.add(rules, FcMatchKind::Pattern);
        }
    }
}

// Constant expressions evaluated into a pattern for <acceptfont>/<rejectfont>.
fn parse_pattern(e: &Element) -> FcPattern {
    let empty = FcPattern::new();
    let mut pat = FcPattern::new();
    for elt in e.named("patelt") {
        let Some(name) = elt.attr("name") else {
            log::warn!("<patelt> without name");
            continue;
        };
        for expr in elt.children.iter().filter_map(parse_expr) {
            let v = FcConfigEvaluate(&empty, None, FcMatchKind::Pattern, &expr);
            if !pat.add_named(name, v, true) {
                log::warn!("<patelt name=\"{}\"> value has the wrong type", name);
            }
        }
    }
    pat
}

fn parse_selectfont(e: &Element, config: &mut FcConfig) {
    for part in &e.children {
        let accept = match part.name.as_str() {
            "acceptfont" => true,
            "rejectfont" => false,
            other => {
                log::warn!("unexpected <{}> in <selectfont>", other);
                continue;
            }
        };
        for c in &part.children {
            match (c.name.as_str(), accept) {
                ("glob", true) => {
                    config.add_accept_glob(c.text());
                }
                ("glob", false) => {
                    config.add_reject_glob(c.text());
                }
                ("pattern", true) => config.add_accept_pattern(parse_pattern(c)),
                ("pattern", false) => config.add_reject_pattern(parse_pattern(c)),
                (other, _) => log::warn!("unexpected <{}> in <{}>", other, part.name),
            }
        }
    }
}

// ── Directories ──

#[cfg(feature = "std")]
fn expand_dir(e: &Element, xdg_base: Option<std::path::PathBuf>) -> Option<String> {
    let text = e.text();
    if text.is_empty() {
        return None;
    }
    let path = match e.attr("prefix") {
        Some("xdg") => xdg_base?.join(text),
        _ => match text.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()?.join(rest),
            None => std::path::PathBuf::from(text),
        },
    };
    Some(path.to_string_lossy().into_owned())
}

#[cfg(not(feature = "std"))]
fn expand_dir(e: &Element, _xdg_base: Option<()>) -> Option<String> {
    Some(e.text().to_string()).filter(|t| !t.is_empty())
}

#[cfg(feature = "std")]
fn xdg_data() -> Option<std::path::PathBuf> {
    dirs::data_dir()
}

#[cfg(feature = "std")]
fn xdg_cache() -> Option<std::path::PathBuf> {
    dirs::cache_dir()
}

#[cfg(not(feature = "std"))]
fn xdg_data() -> Option<()> {
    None
}

#[cfg(not(feature = "std"))]
fn xdg_cache() -> Option<()> {
    None
}

// ── Entry points ──

impl FcConfig {
    /// Loads the elements of a fonts.conf document into this configuration.
    /// Rules land in one new rule set called `name`.
    pub fn parse_and_load(&mut self, name: &str, input: &str) -> Result<(), FcConfigError> {
        let root = parse_tree(input)?;
        let mut rs = FcRuleSet::new(name);

        for e in &root.children {
            match e.name.as_str() {
                "dir" => {
                    if let Some(dir) = expand_dir(e, xdg_data()) {
                        self.add_font_dir(&dir);
                    }
                }
                "cachedir" => {
                    if let Some(dir) = expand_dir(e, xdg_cache()) {
                        self.add_cache_dir(&dir);
                    }
                }
                "include" => log::warn!("<include> of \"{}\" is not followed", e.text()),
                "match" => parse_match(e, &mut rs),
                "alias" => parse_alias(e, &mut rs),
                "selectfont" => parse_selectfont(e, self),
                "config" => {
                    for rescan in e.named("rescan") {
                        if let Some(v) = rescan.named("int").find_map(parse_number) {
                            self.rescan_interval = v as i32;
                        }
                    }
                }
                "description" => rs.description = e.text().to_string(),
                other => log::warn!("unknown element <{}>", other),
            }
        }

        if !rs.is_empty() {
            self.add_rule_set(rs);
        }
        Ok(())
    }

    /// A configuration built from one fonts.conf document.
    pub fn from_xml_str(input: &str) -> Result<FcConfig, FcConfigError> {
        let mut config = FcConfig::new();
        config.parse_and_load("<string>", input)?;
        Ok(config)
    }

    /// A configuration built from a fonts.conf file.
    #[cfg(feature = "std")]
    pub fn from_file(path: &std::path::Path) -> Result<FcConfig, FcConfigError> {
        let input = std::fs::read_to_string(path)?;
        let name = path.to_string_lossy();
        let mut config = FcConfig::new();
        config.parse_and_load(&name, &input)?;
        config.add_config_file(&name);
        log::debug!("loaded configuration {}", name);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;
    use crate::PatternMatch;

    const CONF: &str = r#"<?xml version="1.0"?>
<!DOCTYPE fontconfig SYSTEM "urn:fontconfig:fonts.dtd">
<fontconfig>
  <description>test &amp; friends</description>
  <dir>/usr/share/fonts</dir>
  <cachedir>/var/cache/fontconfig</cachedir>
  <include ignore_missing="yes">conf.d</include>
  <match target="pattern">
    <test qual="any" name="family"><string>mono</string></test>
    <edit name="family" mode="assign" binding="same"><string>DejaVu Sans Mono</string></edit>
  </match>
  <match target="font">
    <test name="weight" compare="more_eq"><const>bold</const></test>
    <edit name="embolden" mode="assign"><bool>false</bool></edit>
    <edit name="pixelsize"><times><name>pixelsize</name><double>1.5</double></times></edit>
  </match>
  <alias binding="strong">
    <family>serif</family>
    <prefer><family>Noto Serif</family><family>DejaVu Serif</family></prefer>
    <default><family>Times</family></default>
  </alias>
  <selectfont>
    <rejectfont>
      <glob>/usr/share/fonts/bad/*</glob>
      <pattern><patelt name="scalable"><bool>false</bool></patelt></pattern>
    </rejectfont>
  </selectfont>
  <config><rescan><int>0</int></rescan></config>
</fontconfig>
"#;

    #[test]
    fn loads_document_sections() {
        let config = FcConfig::from_xml_str(CONF).unwrap();
        assert_eq!(config.font_dirs(), ["/usr/share/fonts"]);
        assert_eq!(config.cache_dirs(), ["/var/cache/fontconfig"]);
        assert_eq!(config.rescan_interval, 0);

        let rs = &config.rule_sets()[0];
        assert_eq!(rs.description, "test & friends");
        // one <match> plus one list for the single aliased family
        assert_eq!(rs.rules(FcMatchKind::Pattern).len(), 2);
        assert_eq!(rs.rules(FcMatchKind::Font).len(), 1);
        assert_eq!(rs.rules(FcMatchKind::Font)[0].len(), 3);

        assert!(!config.accept_filename("/usr/share/fonts/bad/x.ttf"));
        assert!(config.accept_filename("/usr/share/fonts/good/x.ttf"));
        let mut bitmap = FcPattern::new();
        bitmap.add_bool(FC_SCALABLE_OBJECT, PatternMatch::False);
        assert!(!config.accept_font(&bitmap));
    }

    #[test]
    fn rules_apply_to_requests() {
        let config = FcConfig::from_xml_str(CONF).unwrap();
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, "serif");
        config.substitute(&mut p, None, FcMatchKind::Pattern);
        let families: Vec<_> = p
            .values(FC_FAMILY_OBJECT)
            .unwrap()
            .values()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(families, ["Noto Serif", "DejaVu Serif", "serif", "Times"]);
    }

    #[test]
    fn expressions() {
        let root = parse_tree(
            "<fontconfig><if><bool>yes</bool><int>0x10</int><double>2.5</double></if>\
             <matrix><double>1</double><double>0</double><double>0</double><double>1</double></matrix>\
             <charset><int>65</int><range><int>97</int><int>99</int></range></charset>\
             <plus><int>1</int><int>2</int><int>3</int></plus></fontconfig>",
        )
        .unwrap();
        let exprs: Vec<FcExpr> = root.children.iter().filter_map(parse_expr).collect();
        assert_eq!(exprs.len(), 4);
        assert_eq!(exprs[0].op(), FcOp::Quest);
        assert_eq!(exprs[1].op(), FcOp::Matrix);
        match &exprs[2] {
            FcExpr::CharSet(cs) => assert_eq!(cs.count(), 4),
            other => panic!("unexpected {:?}", other),
        }
        let p = FcPattern::new();
        let sum = FcConfigEvaluate(&p, None, FcMatchKind::Pattern, &exprs[3]);
        assert_eq!(sum.as_f64(), Some(6.0));
    }

    #[test]
    fn malformed_documents() {
        assert!(FcConfig::from_xml_str("<fontconfig><dir>x</fontconfig>").is_err());
        assert!(FcConfig::from_xml_str("<fontconfig><dir>x</dir>").is_err());
        assert!(matches!(
            FcConfig::from_xml_str("<fonts/>"),
            Err(FcConfigError::Unbalanced(_))
        ));
        assert!(FcConfig::from_xml_str("<fontconfig><<</fontconfig>").is_err());
        // semantic problems only warn
        let c = FcConfig::from_xml_str(
            "<fontconfig><match target=\"nowhere\"/><edit/><frobnicate/></fontconfig>",
        )
        .unwrap();
        assert!(c.rule_sets().is_empty());
    }
}
