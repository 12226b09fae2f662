// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    toml = { "toml", Some(Format::Toml) },
    conf = { "conf", Some(Format::Toml) },
    hcl = { "hcl", Some(Format::Hcl) },
    other = { "txt", None },
)]
fn format_from_extension(ext: &str, expected: Option<Format>) {
    assert_eq!(Format::from_extension(ext), expected);
}

#[test]
fn exec_and_script_are_exclusive() {
    let result = parse_conf(
        r#"
[job.x]
exec = "/bin/x"
script = "echo x"
"#,
        Format::Toml,
    );
    assert!(matches!(result, Err(ParseError::InvalidJob { name, .. }) if name == "x"));
}

#[test]
fn expect_requires_main_process() {
    let result = parse_conf(
        r#"
[job.x]
expect = "daemon"
"#,
        Format::Toml,
    );
    assert!(matches!(result, Err(ParseError::InvalidJob { .. })));
}

#[test]
fn job_without_processes_is_allowed() {
    // Abstract jobs exist purely to sequence events.
    let conf = parse_conf(
        r#"
[job.milestone]
start_on = "a and b"
"#,
        Format::Toml,
    )
    .unwrap();
    assert!(conf.jobs["milestone"].exec.is_none());
}

#[test]
fn toml_syntax_error_surfaces() {
    assert!(matches!(
        parse_conf("not [valid", Format::Toml),
        Err(ParseError::Toml(_))
    ));
}

#[test]
fn hcl_syntax_error_surfaces() {
    assert!(matches!(
        parse_conf("job \"x\" {", Format::Hcl),
        Err(ParseError::Hcl(_))
    ));
}
