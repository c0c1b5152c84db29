use super::*;
use crate::cache::FcDirCacheBuild;
use crate::defaults::FcDefaultSubstitute;
use crate::name::FC_WEIGHT_BOLD;

fn font(family: &str, weight: i32, file: &str) -> FcPattern {
    let mut p = FcPattern::new();
    p.add_string(FC_FAMILY_OBJECT, family);
    p.add_integer(FC_WEIGHT_OBJECT, weight);
    p.add_integer(FC_SLANT_OBJECT, 0);
    p.add_string(FC_FILE_OBJECT, file);
    p.add_bool(FC_SCALABLE_OBJECT, PatternMatch::True);
    p
}

fn prepared(name: &str, config: &FcConfig) -> FcPattern {
    let mut request = FcNameParse(name).unwrap();
    config.substitute(&mut request, None, FcMatchKind::Pattern);
    FcDefaultSubstitute(&mut request);
    request
}

#[test]
fn test_request_pipeline() {
    // Parse, substitute, default and match, the way a client resolves a name
    let mut config = FcConfig::new();
    config.add_font(FcSetName::System, font("Alpha", 80, "/f/alpha.ttf"));
    config.add_font(FcSetName::System, font("Beta", 80, "/f/beta.ttf"));
    config.add_font(FcSetName::System, font("Beta", FC_WEIGHT_BOLD, "/f/beta-bold.ttf"));

    let request = prepared("Beta:bold", &config);
    let result = FcFontMatch(Some(&config), &request).unwrap();
    assert_eq!(result.get_string(FC_FILE_OBJECT, 0), Ok("/f/beta-bold.ttf"));
    assert_eq!(result.get_string(FC_FAMILY_OBJECT, 0), Ok("Beta"));
    // request-only properties are carried into the result
    assert!(result.has(FC_PIXEL_SIZE_OBJECT));
}

#[test]
fn test_application_fonts_take_part() {
    let mut config = FcConfig::new();
    config.add_font(FcSetName::System, font("Alpha", 80, "/f/alpha.ttf"));
    config.app_font_add_pattern(font("Gamma", 80, "/app/gamma.ttf"));

    let request = prepared("Gamma", &config);
    let result = FcFontMatch(Some(&config), &request).unwrap();
    assert_eq!(result.get_string(FC_FILE_OBJECT, 0), Ok("/app/gamma.ttf"));

    config.app_font_clear();
    let result = FcFontMatch(Some(&config), &request).unwrap();
    assert_eq!(result.get_string(FC_FILE_OBJECT, 0), Ok("/f/alpha.ttf"));
}

#[test]
fn test_alias_rules_reorder_candidates() {
    let mut config = FcConfig::from_xml_str(
        r#"<fontconfig>
             <alias><family>sans-serif</family><prefer><family>Beta</family></prefer></alias>
           </fontconfig>"#,
    )
    .unwrap();
    config.add_font(FcSetName::System, font("Alpha", 80, "/f/alpha.ttf"));
    config.add_font(FcSetName::System, font("Beta", 80, "/f/beta.ttf"));

    let request = prepared("sans-serif", &config);
    let (sorted, _) = FcFontSort(Some(&config), &request, false).unwrap();
    let files: Vec<_> = sorted
        .iter()
        .map(|p| p.get_string(FC_FILE_OBJECT, 0).unwrap())
        .collect();
    assert_eq!(files, ["/f/beta.ttf", "/f/alpha.ttf"]);
}

#[test]
fn test_cached_fonts_match_like_originals() {
    let mut set = FcFontSet::new();
    let mut latin = font("Alpha", 80, "/f/alpha.ttf");
    latin.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_ranges(&[(0x20, 0x7e)]));
    let mut greek = font("Delta", 80, "/f/delta.ttf");
    greek.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_ranges(&[(0x20, 0x7e), (0x391, 0x3c9)]));
    set.add(latin);
    set.add(greek);

    let cache = FcDirCacheBuild(&set, "/f", &[], (0, 0)).unwrap();
    let cached = cache.font_set().unwrap();

    let mut request = FcPattern::new();
    request.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_chars([0x41, 0x3b1]));
    let (a, cs_a) = FcFontSetSort(&[&set], &request, true).unwrap();
    let (b, cs_b) = FcFontSetSort(&[&cached], &request, true).unwrap();
    assert_eq!(a, b);
    assert_eq!(cs_a, cs_b);
    assert_eq!(a.font(0).unwrap().get_string(FC_FILE_OBJECT, 0), Ok("/f/delta.ttf"));
}
