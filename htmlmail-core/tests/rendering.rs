//! End-to-end rendering tests: template source + model → output text.

use htmlmail_core::{
    compile, render, Introspect, ModelObject, ParseErrorKind, TemplateError, Value,
};
use rstest::rstest;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct Order {
    customer: String,
    items: Vec<Item>,
    paid: bool,
}

#[derive(Serialize)]
struct Item {
    name: String,
    qty: u32,
    price: f64,
}

fn order() -> Order {
    Order {
        customer: "Ada".into(),
        items: vec![
            Item {
                name: "Pen".into(),
                qty: 2,
                price: 1.5,
            },
            Item {
                name: "Ink".into(),
                qty: 1,
                price: 4.0,
            },
        ],
        paid: false,
    }
}

const COUNT_TEMPLATE: &str = "@{ if (count > 0) {\nYou have @count items.\n} else {\nNo items.\n} }";

// ---------------------------------------------------------------------------
// Concrete scenarios
// ---------------------------------------------------------------------------

#[test]
fn hello_name() {
    assert_eq!(render("Hello @name!", &json!({"name": "Ada"})).unwrap(), "Hello Ada!");
}

#[rstest]
#[case(3, "You have 3 items.\n")]
#[case(0, "No items.\n")]
fn if_else_block_with_interleaved_text(#[case] count: u32, #[case] expected: &str) {
    let out = render(COUNT_TEMPLATE, &json!({ "count": count })).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn missing_required_path_fails() {
    let err = render("@{a.b.c}", &json!({"a": {}})).unwrap_err();
    assert!(
        matches!(&err, TemplateError::PathNotFound { line: 1, path } if path == "a.b"),
        "got: {err}"
    );
}

#[test]
fn missing_path_in_condition_is_absent() {
    let src = "@{ if (a.b.c) {\nfound\n} else {\nabsent\n} }";
    assert_eq!(render(src, &json!({"a": {}})).unwrap(), "absent\n");
}

#[test]
fn unterminated_block_is_a_parse_error() {
    let err = compile("before\n@{ if (x) {\ninside\n").unwrap_err();
    assert!(
        matches!(
            err,
            TemplateError::Parse {
                line: 2,
                kind: ParseErrorKind::UnterminatedBlock { opened_at: 2 },
            }
        ),
        "got: {err}"
    );
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[rstest]
#[case("")]
#[case("plain")]
#[case("line one\n  two  \nthree\n")]
#[case("<style>a { color: red; }</style>\n}\n{")]
#[case("  leading and trailing  ")]
fn marker_free_templates_render_unchanged(#[case] src: &str) {
    assert_eq!(render(src, &json!({})).unwrap(), src);
}

#[test]
fn crlf_input_keeps_crlf() {
    let src = "a\r\n@name\r\nc";
    assert_eq!(render(src, &json!({"name": "b"})).unwrap(), "a\r\nb\r\nc");
}

#[rstest]
#[case("name")]
#[case("customer.address.city")]
#[case("total")]
fn property_ref_matches_inline_expression(#[case] path: &str) {
    let model = json!({
        "name": "Ada",
        "total": 12.5,
        "customer": {"address": {"city": "London"}}
    });
    let by_ref = render(&format!("[@{path}]"), &model).unwrap();
    let by_expr = render(&format!("[@{{{path}}}]"), &model).unwrap();
    assert_eq!(by_ref, by_expr);
}

#[test]
fn rendering_is_idempotent() {
    let program = compile("@{\nforeach (var item in items) {\n- @item.name x@item.qty\n}\n}").unwrap();
    let model = Value::from_serialize(&order()).unwrap();
    let first = program.render(model.clone()).unwrap();
    let second = program.render(model).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, "- Pen x2\n- Ink x1\n");
}

#[test]
fn literal_braces_are_never_stripped() {
    let src = "@{\nif (paid) {\nPaid }\n} else {\n@:Unpaid }\n}\n}\n{done}";
    assert_eq!(render(src, &order()).unwrap(), "Unpaid }\n{done}");
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[test]
fn foreach_with_running_total() {
    let src = "\
<ul>
@{
    var total = 0;
    foreach (var item in Model.items) {
        total += item.qty * item.price;
<li>@item.name: @{ item.qty * item.price }</li>
    }
}
</ul>
<p>Total for @customer: @total</p>";
    let expected = "<ul>\n<li>Pen: 3</li>\n<li>Ink: 4</li>\n</ul>\n<p>Total for Ada: 7</p>";
    assert_eq!(render(src, &order()).unwrap(), expected);
}

#[test]
fn counted_for_loop() {
    let src = "@{\nfor (var i = 1; i <= 3; i++) {\n@i@{ i < 3 ? ',' : '' }\n}\n}";
    assert_eq!(render(src, &json!({})).unwrap(), "1,\n2,\n3\n");
}

#[test]
fn else_if_chain_picks_first_match() {
    let src = "@{\nif (n > 10) {\nbig\n} else if (n > 5) {\nmedium\n} else {\nsmall\n}\n}";
    assert_eq!(render(src, &json!({"n": 7})).unwrap(), "medium\n");
    assert_eq!(render(src, &json!({"n": 1})).unwrap(), "small\n");
}

#[test]
fn nested_blocks_close_at_the_balancing_brace() {
    let src = "@{\nforeach (var item in items) {\n    if (item.qty > 1) {\n@item.name (bulk)\n    }\n}\n}\nend";
    assert_eq!(render(src, &order()).unwrap(), "Pen (bulk)\nend");
}

#[test]
fn while_loop_and_explicit_text_marker() {
    let src = "@{\nvar n = 3;\nwhile (n > 0) {\n    @:for @n\n    n--;\n}\n}";
    assert_eq!(render(src, &json!({})).unwrap(), "for 3\nfor 2\nfor 1\n");
}

#[test]
fn statement_continued_with_leading_operator() {
    let src = "@{\nvar msg = \"a\"\n    + \"b\";\n}\n@msg";
    assert_eq!(render(src, &json!({})).unwrap(), "ab");
}

#[test]
fn iterating_a_non_sequence_fails() {
    let err = render("@{\nforeach (var c in name) {\n}\n}", &json!({"name": "Ada"})).unwrap_err();
    assert!(matches!(err, TemplateError::Evaluation { line: 2, .. }), "got: {err}");
}

#[test]
fn malformed_statement_reports_line() {
    let err = compile("ok\n@{\nvar x = ;\n}").unwrap_err();
    assert!(matches!(err, TemplateError::Parse { line: 3, .. }), "got: {err}");
}

#[test]
fn parse_errors_prevent_any_output() {
    // The first line is fine, but nothing is rendered because the second is not.
    let err = render("Hello @name\n@{ 1 + }", &json!({"name": "Ada"})).unwrap_err();
    assert!(matches!(err, TemplateError::Parse { line: 2, .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// Custom models
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Clock;

impl Introspect for Clock {
    fn member(&self, name: &str) -> Option<Value> {
        match name {
            "hour" => Some(Value::Number(9.0)),
            "zone" => Some(Value::from("UTC")),
            _ => None,
        }
    }

    fn member_names(&self) -> Vec<String> {
        vec!["hour".into(), "zone".into()]
    }
}

#[test]
fn custom_introspect_model() {
    let program = compile("@{ hour < 12 ? 'Good morning' : 'Hello' } (@Model.zone)").unwrap();
    assert_eq!(program.render(Value::object(Clock)).unwrap(), "Good morning (UTC)");
}

/// `0..n` as a sequence that can be counted and indexed but not copied out.
#[derive(Debug)]
struct Range(usize);

impl Introspect for Range {
    fn member(&self, _name: &str) -> Option<Value> {
        None
    }

    fn member_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn elements(&self) -> Option<Vec<Value>> {
        panic!("indexed access copied the whole sequence");
    }

    fn element_count(&self) -> Option<usize> {
        Some(self.0)
    }

    fn element(&self, index: usize) -> Option<Value> {
        (index < self.0).then(|| Value::Number(index as f64))
    }
}

#[test]
fn indexed_loop_reads_one_element_per_iteration() {
    let src = "\
@{
    var total = 0;
    for (var i = 0; i < items.Count; i++) {
        total += items[i];
    }
}
@total";
    let model = Value::object(ModelObject::new().with("items", Value::object(Range(10_000))));
    assert_eq!(compile(src).unwrap().render(model).unwrap(), "49995000");
}

#[test]
fn indexed_loop_over_large_list() {
    let items: Vec<Value> = (0..10_000).map(|i| Value::from(format!("item {i}"))).collect();
    let src = "@{\nfor (var i = 0; i < items.Count; i++) {\n    if (i == items.Count - 1) {\n@{ items[i] }\n    }\n}\n}";
    let model = Value::object(ModelObject::new().with("items", items));
    assert_eq!(compile(src).unwrap().render(model).unwrap(), "item 9999\n");
}

#[test]
fn program_renders_concurrently() {
    let program = compile("Hi @name").unwrap();
    let outputs: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| {
                let program = &program;
                s.spawn(move || {
                    let model = Value::object(ModelObject::new().with("name", name));
                    program.render(model).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(outputs, vec!["Hi a", "Hi b", "Hi c"]);
}
