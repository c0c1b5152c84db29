use fontmatch::*;
use proptest::prelude::*;

fn charset() -> impl Strategy<Value = FcCharSet> {
    // a few pages, dense enough that leaves overlap
    prop::collection::vec(0u32..0x600, 0..120).prop_map(FcCharSet::from_chars)
}

fn langset() -> impl Strategy<Value = FcLangSet> {
    let langs = ["en", "en-us", "en-gb", "fr", "de", "zh-cn", "zh-tw", "pt", "x-klingon"];
    prop::sample::subsequence(langs.to_vec(), 0..langs.len())
        .prop_map(|picked| FcLangSet::from_langs(picked))
}

proptest! {
    #[test]
    fn union_contains_both(a in charset(), b in charset()) {
        let u = a.union(&b);
        prop_assert!(a.is_subset(&u));
        prop_assert!(b.is_subset(&u));
    }

    #[test]
    fn intersection_is_inside_both(a in charset(), b in charset()) {
        let i = a.intersect(&b);
        prop_assert!(i.is_subset(&a));
        prop_assert!(i.is_subset(&b));
    }

    #[test]
    fn difference_avoids_subtrahend(a in charset(), b in charset()) {
        let d = a.subtract(&b);
        prop_assert_eq!(d.intersect(&b).count(), 0);
        prop_assert_eq!(d.count(), a.subtract_count(&b));
    }

    #[test]
    fn inclusion_exclusion(a in charset(), b in charset()) {
        let u = a.union(&b).count();
        let i = a.intersect(&b).count();
        prop_assert_eq!(u + i, a.count() + b.count());
        prop_assert_eq!(i, a.intersect_count(&b));
    }

    #[test]
    fn deleting_everything_empties(chars in prop::collection::vec(0u32..0x600, 0..60)) {
        let mut cs = FcCharSet::from_chars(chars.iter().copied());
        for c in &chars {
            cs.del_char(*c);
        }
        prop_assert_eq!(cs.count(), 0);
        prop_assert_eq!(cs, FcCharSet::new());
    }

    #[test]
    fn langset_compare_is_symmetric(a in langset(), b in langset()) {
        prop_assert_eq!(a.compare(&b), b.compare(&a));
    }

    #[test]
    fn duplicates_are_equal_and_independent(
        family in "[A-Za-z ]{1,12}",
        weight in 0i32..215,
        size in 1.0f64..72.0,
        cs in charset(),
    ) {
        let mut p = FcPattern::new();
        p.add_string(FC_FAMILY_OBJECT, &family);
        p.add_integer(FC_WEIGHT_OBJECT, weight);
        p.add_double(FC_SIZE_OBJECT, size);
        p.add_charset(FC_CHARSET_OBJECT, cs);

        let mut dup = p.duplicate();
        prop_assert_eq!(&dup, &p);
        prop_assert_eq!(dup.hash32(), p.hash32());

        dup.del(FC_WEIGHT_OBJECT);
        dup.add_string(FC_FAMILY_OBJECT, "Other");
        prop_assert!(p.has(FC_WEIGHT_OBJECT));
        prop_assert_eq!(p.values(FC_FAMILY_OBJECT).map(|l| l.len()), Some(1));
    }
}
