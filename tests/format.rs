use walkdir::WalkDir;

#[test]
fn demo_programs_parse_check_and_format() {
    let mut count = 0;

    for entry in WalkDir::new("demos").into_iter()
                                      .filter_map(Result::ok)
                                      .filter(|e| {
                                          e.path().extension().is_some_and(|ext| ext == "well")
                                      })
    {
        count += 1;
        let path = entry.path();
        let src = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("failed to read {path:?}: {e}"));

        let outcome = well::check_program(&src)
            .unwrap_or_else(|e| panic!("{path:?} failed the check:\n{}", e.render(&src)));
        assert!(outcome.unresolved.is_empty(),
                "{path:?} has undeclared commands: {:?}",
                outcome.unresolved);

        let formatted = well::format_source(&src)
            .unwrap_or_else(|e| panic!("{path:?} failed to format:\n{}", e.render(&src)));
        let again = well::format_source(&formatted)
            .unwrap_or_else(|e| panic!("canonical form of {path:?} failed to reparse:\n{}",
                                       e.render(&formatted)));
        assert_eq!(formatted, again, "{path:?} does not format to a fixpoint");
    }

    assert!(count > 0, "no demo programs found in demos/");
}

#[test]
fn formatting_canonicalizes_spacing() {
    let src = "function  main( )  {\nlet x=1+2\nprintln( x )\n}\n";
    let formatted = well::format_source(src).unwrap();
    assert_eq!(formatted, "function main() {\n\tlet x = 1 + 2\n\tprintln(x)\n}\n");
}

#[test]
fn formatting_preserves_raw_string_literals() {
    let src = "function main() {\n\tprintln(`raw ${not_a_var}`)\n}\n";
    let formatted = well::format_source(src).unwrap();
    assert!(formatted.contains("`raw ${not_a_var}`"));
}

#[test]
fn formatted_programs_keep_their_meaning() {
    let src = "function main() {\n\tlet x = 40 + 2\n\tprintln(\"x is ${x}\")\n}\n";
    let formatted = well::format_source(src).unwrap();

    let mut out1 = Vec::new();
    well::run_program(src, &mut out1, &mut Vec::new(), &well::RunOptions::default()).unwrap();
    let mut out2 = Vec::new();
    well::run_program(&formatted, &mut out2, &mut Vec::new(), &well::RunOptions::default())
        .unwrap();
    assert_eq!(out1, out2);
}
