use well::{run_program, RunOptions};

fn run(src: &str) -> Result<(String, String), String> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    match run_program(src, &mut stdout, &mut stderr, &RunOptions::default()) {
        Ok(()) => Ok((String::from_utf8_lossy(&stdout).into_owned(),
                      String::from_utf8_lossy(&stderr).into_owned())),
        Err(err) => Err(err.render(src)),
    }
}

fn run_ok(src: &str) -> String {
    match run(src) {
        Ok((stdout, _)) => stdout,
        Err(err) => panic!("program failed:\n{err}"),
    }
}

#[test]
fn hello() {
    let out = run_ok("function main() {\n\tprintln(\"hello\")\n}\n");
    assert_eq!(out, "hello\n");
}

#[test]
fn print_does_not_append_newline() {
    let out = run_ok("function main() {\n\tprint(\"a\", \"b\")\n\tprint(\"c\")\n}\n");
    assert_eq!(out, "a bc");
}

#[test]
fn echo_is_an_alias_of_print() {
    let out = run_ok("function main() {\n\techo(\"a\")\n}\n");
    assert_eq!(out, "a");
}

#[test]
fn let_and_arithmetic() {
    let out = run_ok("function main() {\n\tlet x = 1 + 2 * 3\n\tprintln(x)\n}\n");
    assert_eq!(out, "7\n");
}

#[test]
fn interpolation_reads_the_environment() {
    let src = "function main() {\n\tlet name = \"sina\"\n\tprintln(\"Hello ${name}!\")\n}\n";
    assert_eq!(run_ok(src), "Hello sina!\n");
}

#[test]
fn globals_are_visible_inside_functions() {
    let src = "let greeting = \"hi\"\nfunction f() {\n\tprintln(greeting)\n}\nfunction main() {\n\tf()\n}\n";
    assert_eq!(run_ok(src), "hi\n");
}

#[test]
fn functions_do_not_see_caller_locals() {
    let src = "function f() {\n\tprintln(local_of_main)\n}\nfunction main() {\n\tlet local_of_main = 1\n\tf()\n}\n";
    let err = run(src).unwrap_err();
    assert!(err.contains("\"local_of_main\" is missing"), "got: {err}");
}

#[test]
fn return_stops_the_block() {
    let src = "function f() string {\n\treturn \"early\"\n\tprintln(\"unreachable\")\n}\nfunction main() {\n\tprintln(f())\n}\n";
    assert_eq!(run_ok(src), "early\n");
}

#[test]
fn if_else_chains() {
    let src = "function main() {\n\tlet x = 2\n\tif x == 1 {\n\t\tprintln(\"one\")\n\t} else if x == 2 {\n\t\tprintln(\"two\")\n\t} else {\n\t\tprintln(\"other\")\n\t}\n}\n";
    assert_eq!(run_ok(src), "two\n");
}

#[test]
fn if_condition_must_be_boolean() {
    let err = run("function main() {\n\tif 1 {\n\t\tprintln(\"x\")\n\t}\n}\n").unwrap_err();
    assert!(err.contains("must be a boolean"), "got: {err}");
}

#[test]
fn regex_match_and_negation() {
    let src = "function main() {\n\tif \"hello\" ~~ \"ll\" {\n\t\tprintln(\"matched\")\n\t}\n\tif \"hello\" !~ \"zz\" {\n\t\tprintln(\"negated\")\n\t}\n}\n";
    assert_eq!(run_ok(src), "matched\nnegated\n");
}

#[test]
fn equality_projects_primitives() {
    let src = "function main() {\n\tif \"a\" == \"a\" {\n\t\tprintln(\"strings\")\n\t}\n\tif 1 != 2 {\n\t\tprintln(\"ints\")\n\t}\n}\n";
    assert_eq!(run_ok(src), "strings\nints\n");
}

#[test]
fn undefined_identifier_is_reported_with_position() {
    let err = run("function main() {\n\tprintln(zz)\n}\n").unwrap_err();
    assert!(err.contains("\"zz\" is missing"), "got: {err}");
    assert!(err.contains("line 2"), "got: {err}");
}

#[test]
fn duplicate_binding_in_one_scope() {
    let err = run("function main() {\n\tlet x = 1\n\tlet x = 2\n}\n").unwrap_err();
    assert!(err.contains("duplicate env key \"x\""), "got: {err}");
}

#[test]
fn missing_template_variable() {
    let err = run("function main() {\n\tprintln(\"${nope}\")\n}\n").unwrap_err();
    assert!(err.contains("variable nope is <nil>"), "got: {err}");
}

#[test]
fn arity_is_checked_before_binding() {
    let src = "function f(a string, b string) {\n\tprintln(a)\n}\nfunction main() {\n\tf(\"only one\")\n}\n";
    let err = run(src).unwrap_err();
    assert!(err.contains("f takes 2 args, call is sending 1"), "got: {err}");
}

#[test]
fn piped_arity_is_checked() {
    let src = "external (stdin reader) | nl() => \"nl\"\nfunction main() {\n\tpipe(nl())\n}\n";
    // `nl` declares one piped parameter and the call pipes nothing in.
    let err = run(src).unwrap_err();
    assert!(err.contains("nl takes 1 piped args, call is sending 0"), "got: {err}");
}

#[test]
fn unresolved_dependencies_fail_the_check() {
    let src = "function main() {\n\tpipe(foo())\n}\n";
    let err = run(src).unwrap_err();
    assert!(err.contains("undeclared"), "got: {err}");
    assert!(err.contains("foo"), "got: {err}");
    assert!(err.contains("2:7"), "got: {err}");
}

#[test]
fn float_arithmetic_promotes_integers() {
    let out = run_ok("function main() {\n\tprintln(1 + 0.5)\n\tprintln(7 / 2)\n}\n");
    assert_eq!(out, "1.5\n3\n");
}

#[test]
fn division_by_zero_is_an_error() {
    let err = run("function main() {\n\tprintln(1 / 0)\n}\n").unwrap_err();
    assert!(err.contains("division by zero"), "got: {err}");
}

#[test]
fn multiplication_binds_tighter_than_comparison() {
    let out = run_ok("function main() {\n\tif 2 * 3 == 6 {\n\t\tprintln(\"yes\")\n\t}\n}\n");
    assert_eq!(out, "yes\n");
}

#[test]
fn unary_not_and_negation() {
    let src = "function main() {\n\tif !false {\n\t\tprintln(-3)\n\t}\n}\n";
    assert_eq!(run_ok(src), "-3\n");
}

#[test]
fn calling_a_non_function_is_an_error() {
    let err = run("function main() {\n\tlet x = 1\n\tx()\n}\n").unwrap_err();
    assert!(err.contains("not callable"), "got: {err}");
}

#[test]
fn invalid_regex_pattern_is_an_error() {
    let err = run("function main() {\n\tif \"a\" ~~ \"(\" {\n\t\tprintln(\"x\")\n\t}\n}\n")
        .unwrap_err();
    assert!(err.contains("invalid regex"), "got: {err}");
}

#[test]
fn verbose_echoes_rendered_strings() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let options = RunOptions { verbose: true,
                               ..RunOptions::default() };
    run_program("function main() {\n\tprintln(\"hi\")\n}\n",
                &mut stdout,
                &mut stderr,
                &options).unwrap();
    assert!(String::from_utf8_lossy(&stderr).contains("+hi"));
}

#[cfg(unix)]
mod pipelines {
    use super::{run, run_ok};

    #[test]
    fn external_pipeline_end_to_end() {
        let src = r#"
external echo(s string) => "echo ${s:%q}"
external (stdin reader) | nl() => "nl"
external (stdin reader) | head(n int) => "head -n ${n}"

function greet(s1 string, s2 string) {
	println(s1, "and", s2)
	println(f2(0, 0))
	if "hello" ~~ "ll" {
		return true
	}
}
function f2(s1 string, s2 string) (string) {
	return "s1=${s1} and s2=${s2}"
}

function (stdin reader) | main() {
	let s1 = "hi"
	let bye = "bye"
	let out = echo("hello1\nhello2") | nl() | head(1)
	print_stream(out)
	let res = greet(s1, bye)
	println(res)
}
"#;
        assert_eq!(run_ok(src),
                   "     1\thello1\nhi and bye\ns1=0 and s2=0\ntrue\n");
    }

    #[test]
    fn pipe_capture_trims_and_returns() {
        let src = "external echo(s string) => \"echo ${s:%q}\"\nfunction main() {\n\tlet txt = pipe_capture(echo(\"captured\"))\n\tprintln(txt)\n}\n";
        assert_eq!(run_ok(src), "captured\n");
    }

    #[test]
    fn exec_builtin_returns_a_stream() {
        let src = "function main() {\n\tlet out = _exec(\"printf hi\")\n\tprint_stream(out)\n}\n";
        assert_eq!(run_ok(src), "hi");
    }

    #[test]
    fn streams_cannot_be_consumed_twice() {
        let src = "external echo(s string) => \"echo ${s:%q}\"\nfunction main() {\n\tlet out = echo(\"x\")\n\tprint_stream(out)\n\tprint_stream(out)\n}\n";
        let err = run(src).unwrap_err();
        assert!(err.contains("already been consumed"), "got: {err}");
    }

    #[test]
    fn streams_pipe_into_user_functions() {
        let src = r#"
external echo(s string) => "echo ${s:%q}"

function (input reader) | shout() {
	print_stream(input)
	println("done")
}

function main() {
	echo("payload") | shout()
}
"#;
        assert_eq!(run_ok(src), "payload\ndone\n");
    }

    #[test]
    fn streams_pipe_into_print_stream() {
        let src = "external echo(s string) => \"echo ${s:%q}\"\nfunction main() {\n\techo(\"direct\") | print_stream()\n}\n";
        assert_eq!(run_ok(src), "direct\n");
    }

    #[test]
    fn integer_arguments_interpolate_into_templates() {
        let src = "external echo(s string) => \"echo ${s:%q}\"\nexternal (stdin reader) | head(n int) => \"head -n ${n}\"\nfunction main() {\n\tprint_stream(echo(\"a\nb\nc\") | head(2))\n}\n";
        assert_eq!(run_ok(src), "a\nb\n");
    }

    #[test]
    fn broken_pipe_is_tolerated() {
        let src = "external yes() => \"yes\"\nexternal (stdin reader) | head(n int) => \"head -n ${n}\"\nfunction main() {\n\tprint_stream(yes() | head(3))\n}\n";
        assert_eq!(run_ok(src), "y\ny\ny\n");
    }

    #[test]
    fn failing_stage_aborts_with_a_log() {
        let src = "external boom() => \"false\"\nfunction main() {\n\tprint_stream(boom())\n}\n";
        let err = run(src).unwrap_err();
        assert!(err.contains("failed"), "got: {err}");
    }

    #[test]
    fn external_json_captures_both_streams() {
        let src = "function main() {\n\tlet out = external_json(\"echo j\")\n\tprintln(out)\n}\n";
        let out = run_ok(src);
        assert!(out.contains("\"stdout\":\"j\\n\""), "got: {out}");
    }
}
