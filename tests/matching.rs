use fontmatch::*;

fn family_weight(family: &str, weight: i32, file: &str) -> FcPattern {
    let mut p = FcPattern::new();
    p.add_string(FC_FAMILY_OBJECT, family);
    p.add_integer(FC_WEIGHT_OBJECT, weight);
    p.add_string(FC_FILE_OBJECT, file);
    p
}

#[test]
fn test_exact_match_wins() {
    let set: FcFontSet = [
        family_weight("Arial", 400, "/f/arial.ttf"),
        family_weight("Arial", 700, "/f/arial-bold.ttf"),
    ]
    .into_iter()
    .collect();

    let mut request = FcPattern::new();
    request.add_string(FC_FAMILY_OBJECT, "Arial");
    request.add_integer(FC_WEIGHT_OBJECT, 400);

    let config = FcConfig::new();
    let result = FcFontSetMatch(Some(&config), &[&set], &request).unwrap();
    assert_eq!(result.get_string(FC_FAMILY_OBJECT, 0), Ok("Arial"));
    assert_eq!(result.get_integer(FC_WEIGHT_OBJECT, 0), Ok(400));
    assert_eq!(result.get_string(FC_FILE_OBJECT, 0), Ok("/f/arial.ttf"));
    assert_eq!(
        result.get_with_binding(FC_FAMILY_OBJECT, 0).map(|e| e.binding),
        Ok(FcValueBinding::Strong)
    );
}

#[test]
fn test_charset_coverage_picks_superset() {
    let mut a = FcPattern::new();
    a.add_string(FC_FAMILY_OBJECT, "A");
    a.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_chars([0x41]));
    let mut b = FcPattern::new();
    b.add_string(FC_FAMILY_OBJECT, "B");
    b.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_chars([0x41, 0x42]));
    let set: FcFontSet = [a, b].into_iter().collect();

    let mut request = FcPattern::new();
    request.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_chars([0x41, 0x42]));

    let (sorted, coverage) = FcFontSetSort(&[&set], &request, false).unwrap();
    let families: Vec<_> = sorted
        .iter()
        .map(|p| p.get_string(FC_FAMILY_OBJECT, 0).unwrap())
        .collect();
    assert_eq!(families, ["B", "A"]);
    assert_eq!(coverage.count(), 2);

    let scores: Vec<_> = set
        .iter()
        .map(|f| FcCompare(&request, f).unwrap()[FcPriority::Charset as usize])
        .collect();
    assert_eq!(scores, [1000.0, 0.0]);
}

#[test]
fn test_language_fallback_representation() {
    // The generic font carries no lang at all, so a single lexicographic
    // pass would rank it first.
    let mut latin = FcPattern::new();
    latin.add_string(FC_FAMILY_OBJECT, "Generic");
    let mut fr = FcPattern::new();
    fr.add_string(FC_FAMILY_OBJECT, "Francais");
    fr.add_langset(FC_LANG_OBJECT, FcLangSet::from_langs(["fr"]));
    let mut de = FcPattern::new();
    de.add_string(FC_FAMILY_OBJECT, "Deutsch");
    de.add_langset(FC_LANG_OBJECT, FcLangSet::from_langs(["de"]));
    let set: FcFontSet = [latin, fr, de].into_iter().collect();

    let mut request = FcPattern::new();
    request.add_string(FC_LANG_OBJECT, "fr");
    request.add_string(FC_LANG_OBJECT, "de");

    let (sorted, _) = FcFontSetSort(&[&set], &request, false).unwrap();
    let families: Vec<_> = sorted
        .iter()
        .map(|p| p.get_string(FC_FAMILY_OBJECT, 0).unwrap())
        .collect();
    assert_eq!(families, ["Francais", "Deutsch", "Generic"]);
}

#[test]
fn test_dont_care_boolean() {
    let mut request = FcPattern::new();
    request.add_bool(FC_ANTIALIAS_OBJECT, PatternMatch::DontCare);

    let slot = FcPriority::Antialias as usize;
    for b in [PatternMatch::True, PatternMatch::False] {
        let mut font = FcPattern::new();
        font.add_bool(FC_ANTIALIAS_OBJECT, b);
        let score = FcCompare(&request, &font).unwrap();
        assert_eq!(score[slot], 0.0);
    }
}

#[test]
fn test_matching_is_deterministic() {
    let mut config = FcConfig::new();
    for (i, weight) in [50, 80, 80, 200].into_iter().enumerate() {
        config.add_font(
            FcSetName::System,
            family_weight("Same", weight, &format!("/f/{}.ttf", i)),
        );
    }
    let mut request = FcNameParse("Same:weight=80").unwrap();
    config.substitute(&mut request, None, FcMatchKind::Pattern);
    FcDefaultSubstitute(&mut request);

    let first = FcFontMatch(Some(&config), &request).unwrap();
    let second = FcFontMatch(Some(&config), &request).unwrap();
    assert_eq!(first, second);
    // the earlier of two equal candidates wins
    assert_eq!(first.get_string(FC_FILE_OBJECT, 0), Ok("/f/1.ttf"));
}

#[test]
fn test_empty_font_sets_do_not_match() {
    let empty = FcFontSet::new();
    let request = FcPattern::new();
    assert_eq!(
        FcFontSetMatch(Some(&FcConfig::new()), &[&empty], &request).err(),
        Some(FcResult::NoMatch)
    );
    assert!(FcFontSetSort(&[&empty], &request, true).is_err());
}

#[test]
fn test_list_with_object_set() {
    let set: FcFontSet = [
        family_weight("Mono", 80, "/f/mono.ttf"),
        family_weight("Mono", 200, "/f/mono-bold.ttf"),
        family_weight("Sans", 80, "/f/sans.ttf"),
    ]
    .into_iter()
    .collect();
    let mut request = FcPattern::new();
    request.add_string(FC_FAMILY_OBJECT, "mono");
    let os = FcObjectSet::build(&[FC_FAMILY, FC_WEIGHT]);
    let listed = FcFontSetList(&[&set], &request, Some(&os));
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|p| !p.has(FC_FILE_OBJECT)));
}
