use fontmatch::cache::*;
use fontmatch::*;

fn mixed_font_set() -> FcFontSet {
    let mut regular = FcPattern::new();
    regular.add_string(FC_FAMILY_OBJECT, "Mixed");
    regular.add_string(FC_FAMILY_OBJECT, "Mixed Sans");
    regular.add_string(FC_FAMILYLANG_OBJECT, "en");
    regular.add_integer(FC_WEIGHT_OBJECT, 80);
    regular.add_double(FC_SIZE_OBJECT, 11.5);
    regular.add_bool(FC_SCALABLE_OBJECT, PatternMatch::True);
    regular.add_bool(FC_COLOR_OBJECT, PatternMatch::DontCare);
    regular.add_matrix(FC_MATRIX_OBJECT, FcMatrix { xx: 1.0, xy: 0.2, yx: 0.0, yy: 1.0 });
    regular.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_ranges(&[(0x20, 0x7e), (0x400, 0x4ff)]));
    regular.add_langset(FC_LANG_OBJECT, FcLangSet::from_langs(["en", "ru", "uk"]));
    regular.add_weak(FC_STYLE_OBJECT, "Regular", true);

    let mut variable = FcPattern::new();
    variable.add_string(FC_FAMILY_OBJECT, "Mixed VF");
    variable.add_range(FC_WEIGHT_OBJECT, FcRange::new(40.0, 210.0));
    variable.add_bool(FC_VARIABLE_OBJECT, PatternMatch::True);
    variable.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_ranges(&[(0x20, 0x7e)]));

    [regular, variable, FcPattern::new()].into_iter().collect()
}

#[test]
fn test_round_trip_preserves_fonts() {
    let set = mixed_font_set();
    let cache = FcDirCacheBuild(&set, "/usr/share/fonts/mixed", &["/usr/share/fonts/mixed/sub"], (1, 2)).unwrap();
    assert_eq!(cache.font_count(), set.len());
    let back = cache.font_set().unwrap();
    for i in 0..set.len() {
        assert_eq!(set.font(i), back.font(i), "font {} differs", i);
    }
    for i in 0..set.len() {
        let view = cache.font(i).unwrap();
        assert_eq!(view.pattern().unwrap().as_ref(), set.font(i).unwrap().as_ref());
    }
    assert!(cache.font(set.len()).is_none());
}

#[test]
fn test_empty_set_round_trips() {
    let cache = FcDirCacheBuild(&FcFontSet::new(), "/empty", &[], (0, 0)).unwrap();
    assert_eq!(cache.font_count(), 0);
    assert!(cache.font_set().unwrap().is_empty());
}

#[test]
fn test_truncated_blobs_are_rejected() {
    let cache = FcDirCacheBuild(&mixed_font_set(), "/fonts", &[], (0, 0)).unwrap();
    let bytes = cache.bytes();
    for len in [0, 8, 31, bytes.len() / 2, bytes.len() - 1] {
        assert!(FcCache::from_bytes(bytes[..len].to_vec()).is_err(), "accepted {} bytes", len);
    }
}

#[test]
fn test_cached_fonts_can_be_matched() {
    let cache = FcDirCacheBuild(&mixed_font_set(), "/fonts", &[], (0, 0)).unwrap();
    let set = cache.font_set().unwrap();
    let mut request = FcPattern::new();
    request.add_string(FC_FAMILY_OBJECT, "Mixed VF");
    request.add_integer(FC_WEIGHT_OBJECT, 200);
    let result = FcFontSetMatch(Some(&FcConfig::new()), &[&set], &request).unwrap();
    assert_eq!(result.get_string(FC_FAMILY_OBJECT, 0), Ok("Mixed VF"));
    assert!(result.get_string(FC_FONT_VARIATIONS_OBJECT, 0).is_ok());
}

#[cfg(feature = "std")]
#[test]
fn test_cache_files() {
    let root = std::env::temp_dir().join(format!("fontmatch-cache-{}", std::process::id()));
    let fonts = root.join("fonts");
    std::fs::create_dir_all(&fonts).unwrap();
    let checksum = FcDirChecksum(&fonts).unwrap();

    let set = mixed_font_set();
    let dir_name = fonts.to_string_lossy().into_owned();
    let cache = FcDirCacheBuild(&set, &dir_name, &[], checksum).unwrap();
    // caches live outside the font directory so writing one keeps its mtime
    let path = root.join("cache").join(FcDirCacheBasename(&dir_name));
    FcDirCacheWrite(&cache, &path).unwrap();

    let loaded = FcDirCacheLoadFile(&path).unwrap();
    assert_eq!(loaded.dir(), dir_name);
    assert_eq!(loaded.font_set().unwrap(), set);
    assert!(FcDirCacheValid(&loaded, &fonts).is_ok());

    assert!(FcDirCacheLoadFile(&root.join("missing")).is_err());
    drop(loaded);
    std::fs::remove_dir_all(&root).unwrap();
}
