//! File-level generation: template + style sheet on disk, model in memory.

use std::path::Path;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use htmlmail_core::TemplateError;
use htmlmail_renderer::{HtmlRenderer, RenderConfig, RenderError};
use rstest::rstest;
use serde::Serialize;

#[derive(Serialize)]
struct Receipt {
    customer: String,
    lines: Vec<Line>,
}

#[derive(Serialize)]
struct Line {
    item: String,
    amount: f64,
}

fn receipt() -> Receipt {
    Receipt {
        customer: "Ada".into(),
        lines: vec![
            Line {
                item: "Pen".into(),
                amount: 3.0,
            },
            Line {
                item: "Ink".into(),
                amount: 4.25,
            },
        ],
    }
}

const RECEIPT_HTML: &str = "\
<html>
<head><style></style></head>
<body>
<h1>Thanks, @customer</h1>
@{
    var total = 0;
    foreach (var line in lines) {
        total += line.amount;
<p>@line.item: @line.amount</p>
    }
}
<p>Total: @total</p>
</body>
</html>";

fn write_pair(dir: &TempDir, html: &str, css: &str) {
    dir.child("mail.html").write_str(html).unwrap();
    dir.child("mail.css").write_str(css).unwrap();
}

#[test]
fn generates_full_document() {
    let dir = TempDir::new().unwrap();
    write_pair(&dir, RECEIPT_HTML, "body{color:red}");

    let out = HtmlRenderer::new()
        .generate_html(&dir.path().join("mail.html"), &dir.path().join("mail.css"), &receipt())
        .unwrap();

    let expected = "\
<html>
<head><style>body{color:red}</style>
</head>
<body>
<h1>Thanks, Ada</h1>
<p>Pen: 3</p>
<p>Ink: 4.25</p>
<p>Total: 7.25</p>
</body>
</html>";
    assert_eq!(out, expected);
}

#[test]
fn style_sheet_appears_exactly_once() {
    let dir = TempDir::new().unwrap();
    write_pair(&dir, "<head><style></style></head><p>@customer</p>", "body{color:red}");

    let out = HtmlRenderer::new()
        .generate_html(&dir.path().join("mail.html"), &dir.path().join("mail.css"), &receipt())
        .unwrap();

    assert_eq!(out.matches("<style>body{color:red}</style>").count(), 1);
    assert!(!out.contains("<style></style>"));
}

#[rstest]
#[case("mail.html", "missing.css", "missing.css")]
#[case("missing.html", "mail.css", "missing.html")]
fn missing_file_is_io_error(#[case] html: &str, #[case] css: &str, #[case] reported: &str) {
    let dir = TempDir::new().unwrap();
    write_pair(&dir, "<p>@customer</p>", "p{}");

    let err = HtmlRenderer::new()
        .generate_html(&dir.path().join(html), &dir.path().join(css), &receipt())
        .unwrap_err();

    match err {
        RenderError::Io { path, .. } => assert_eq!(path, dir.path().join(reported)),
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn template_errors_name_the_file() {
    let dir = TempDir::new().unwrap();
    write_pair(&dir, "<p>ok</p>\n<p>@{ customer. }</p>", "p{}");
    let html = dir.path().join("mail.html");

    let err = HtmlRenderer::new()
        .generate_html(&html, &dir.path().join("mail.css"), &receipt())
        .unwrap_err();

    match &err {
        RenderError::Template {
            name,
            line_text,
            source: TemplateError::Parse { line: 2, .. },
        } => {
            assert_eq!(Path::new(name), html);
            assert_eq!(line_text.as_deref(), Some("<p>@{ customer. }</p>"));
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn config_file_drives_placeholder_and_limits() {
    let dir = TempDir::new().unwrap();
    dir.child("htmlmail.yaml")
        .write_str("placeholder: \"/*STYLE*/\"\nmax_iterations: 1\n")
        .unwrap();
    let config = RenderConfig::load(&dir.path().join("htmlmail.yaml")).unwrap();
    assert_eq!(config.placeholder, "/*STYLE*/");

    let renderer = HtmlRenderer::with_config(config);
    write_pair(&dir, "/*STYLE*/@customer", "a{}");
    let out = renderer
        .generate_html(&dir.path().join("mail.html"), &dir.path().join("mail.css"), &receipt())
        .unwrap();
    assert_eq!(out, "<style>a{}</style>\nAda");

    // Two lines exceed a one-iteration budget.
    write_pair(&dir, RECEIPT_HTML, "a{}");
    let err = renderer
        .generate_html(&dir.path().join("mail.html"), &dir.path().join("mail.css"), &receipt())
        .unwrap_err();
    assert!(
        matches!(err, RenderError::Template { source: TemplateError::Evaluation { .. }, .. }),
        "got: {err}"
    );
}

#[test]
fn malformed_config_is_reported_with_path() {
    let dir = TempDir::new().unwrap();
    dir.child("bad.yaml").write_str("strict: [not, a, bool]").unwrap();
    let err = RenderConfig::load(&dir.path().join("bad.yaml")).unwrap_err();
    assert!(matches!(err, RenderError::Config { .. }), "got: {err}");
    assert!(err.to_string().contains("bad.yaml"));
}
