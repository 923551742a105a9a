use well::template::{
    expander::{self, mapping_from_pairs, SingleQuoting, TemplateValue},
    parser,
};

fn argv(src: &str, pairs: &[(&str, TemplateValue)]) -> Vec<String> {
    let root = parser::parse(src).unwrap();
    expander::to_argv(&root, &mapping_from_pairs(pairs), SingleQuoting::Basic).unwrap()
}

#[test]
fn quoted_interpolation_inside_guillemets_stays_one_argument() {
    assert_eq!(argv("jq «.${key:%q} | .»", &[("key", "a long key".into())]),
               ["jq", ".\"a long key\" | ."]);
}

#[test]
fn dash_option_splits_a_value_into_arguments() {
    assert_eq!(argv("echo ${file:%-}", &[("file", "file A".into())]),
               ["echo", "file", "A"]);
}

#[test]
fn nested_single_guillemets_render_with_compounding_escapes() {
    let out = expander::parse_and_render("echo ‹echo ‹echo ‹${name}›››",
                                         &mapping_from_pairs(&[("name", "O'Reilly".into())]),
                                         SingleQuoting::Basic).unwrap();
    assert_eq!(out, r"echo 'echo \'echo \\\'O\\\\\\\'Reilly\\\'\''");
}

#[test]
fn rendered_and_argv_forms_agree_on_content() {
    // Joining the argv with single spaces matches the rendered string for
    // templates whose separators are single spaces and whose arguments
    // need no quoting.
    let pairs = [("name", TemplateValue::from("world"))];
    let src = "greet ${name} now";
    let rendered = expander::parse_and_render(src,
                                              &mapping_from_pairs(&pairs),
                                              SingleQuoting::Basic).unwrap();
    assert_eq!(argv(src, &pairs).join(" "), rendered);
}

#[test]
fn variables_are_listed_for_tooling() {
    let vars = expander::get_variables("run ${a} «${b}» ${a:%q}").unwrap();
    let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}
