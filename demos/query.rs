use fontmatch::*;
use std::time::Instant;

fn font(family: &str, style: &str, weight: i32, file: &str, ranges: &[(u32, u32)]) -> FcPattern {
    let mut p = FcPattern::new();
    p.add_string(FC_FAMILY_OBJECT, family);
    p.add_string(FC_STYLE_OBJECT, style);
    p.add_integer(FC_WEIGHT_OBJECT, weight);
    p.add_string(FC_FILE_OBJECT, file);
    p.add_bool(FC_SCALABLE_OBJECT, PatternMatch::True);
    p.add_charset(FC_CHARSET_OBJECT, FcCharSet::from_ranges(ranges));
    p
}

fn main() {
    // usage: query [name] [fonts.conf]
    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| String::from("sans-serif:bold"));
    let mut config = match args.next() {
        Some(path) => FcConfig::from_file(std::path::Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("{}: {}", path, e);
            std::process::exit(1);
        }),
        None => FcConfig::from_xml_str(
            r#"<fontconfig>
                 <alias><family>sans-serif</family><prefer><family>DejaVu Sans</family></prefer></alias>
                 <alias><family>monospace</family><prefer><family>DejaVu Sans Mono</family></prefer></alias>
               </fontconfig>"#,
        )
        .expect("built-in configuration"),
    };

    let latin = [(0x20, 0x7e), (0xa0, 0x17f)];
    let latin_greek = [(0x20, 0x7e), (0xa0, 0x17f), (0x370, 0x3ff)];
    for p in [
        font("DejaVu Sans", "Book", 80, "/fonts/DejaVuSans.ttf", &latin_greek),
        font("DejaVu Sans", "Bold", 200, "/fonts/DejaVuSans-Bold.ttf", &latin_greek),
        font("DejaVu Sans Mono", "Book", 80, "/fonts/DejaVuSansMono.ttf", &latin),
        font("Liberation Serif", "Regular", 80, "/fonts/LiberationSerif-Regular.ttf", &latin),
    ] {
        config.add_font(FcSetName::System, p);
    }

    let Some(mut request) = FcNameParse(&name) else {
        eprintln!("cannot parse \"{}\"", name);
        std::process::exit(1);
    };
    config.substitute(&mut request, None, FcMatchKind::Pattern);
    FcDefaultSubstitute(&mut request);
    println!("request: {}\n", FcNameUnparse(&request));

    let start = Instant::now();
    match FcFontMatch(Some(&config), &request) {
        Ok(m) => println!(
            "=== Match ({:?}) ===\n{}\n",
            start.elapsed(),
            FcNameUnparse(&m.filter(Some(&FcObjectSet::build(&[FC_FAMILY, "style", FC_FILE]))))
        ),
        Err(e) => println!("no match: {:?}\n", e),
    }

    let start = Instant::now();
    if let Ok((sorted, coverage)) = FcFontSort(Some(&config), &request, true) {
        println!("=== Sort, trimmed ({:?}, {} code points) ===", start.elapsed(), coverage.count());
        for (i, p) in sorted.iter().enumerate() {
            println!("  {}. {}", i + 1, p.get_string(FC_FILE_OBJECT, 0).unwrap_or("<no file>"));
        }
    }
}
