use minijinja::Value;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

use tessera::helpers::{HelperFactories, HelperMap};
use tessera::templating::{MiniJinjaExecutor, RenderError};
use tessera::{RenderEngine, Scope};

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (name, content) in files {
        write(dir.path(), name, content);
    }
    dir
}

fn model(pairs: &[(&str, Value)]) -> Scope {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn earlier_directory_wins() {
    let a = fixture(&[("item.tmpl", "from a\n")]);
    let b = fixture(&[("item.tmpl", "from b\n"), ("only_b.tmpl", "b only\n")]);

    let engine = RenderEngine::builder().paths([a.path(), b.path()]).build();

    assert_eq!(engine.render("item.tmpl", &[]).unwrap(), "from a");
    assert_eq!(engine.render("only_b.tmpl", &[]).unwrap(), "b only");
}

#[test]
fn exported_and_inherited_data_reach_child() {
    let dir = fixture(&[
        (
            "outer.tmpl",
            "{% set flag_value = export(\"flag\", true) %}{{ render(\"inner.tmpl\") }}\n",
        ),
        ("inner.tmpl", "x={{ x }} flag={% if flag %}yes{% else %}no{% endif %}\n"),
    ]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    let out = engine
        .render_model("outer.tmpl", &model(&[("x", Value::from(1))]))
        .unwrap();
    assert_eq!(out, "x=1 flag=yes");
    assert_eq!(engine.depth(), 0);
}

#[test]
fn missing_fragment_renders_placeholder() {
    let dir = fixture(&[]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    let out = engine.render("missing.tmpl", &[]).unwrap();
    assert_eq!(out, "<!-- include 'missing.tmpl' not found -->\n");
    assert_eq!(engine.depth(), 0);
}

#[test]
fn missing_nested_fragment_degrades_inline() {
    let dir = fixture(&[("page.tmpl", "<div>{{ render(\"gone.tmpl\") }}</div>\n")]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    let out = engine.render("page.tmpl", &[]).unwrap();
    assert_eq!(out, "<div><!-- include 'gone.tmpl' not found -->\n</div>");
}

#[test]
fn export_overrides_explicit_argument() {
    let dir = fixture(&[
        (
            "parent.tmpl",
            "{% set k = export(\"k\", \"v\") %}{{ render(\"child.tmpl\", {\"k\": \"other\"}) }}",
        ),
        ("child.tmpl", "{{ k }}"),
    ]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    assert_eq!(engine.render("parent.tmpl", &[]).unwrap(), "v");
}

#[test]
fn child_export_is_not_visible_to_parent() {
    let dir = fixture(&[
        (
            "parent.tmpl",
            "{{ render(\"child.tmpl\") }}|{{ render(\"sibling.tmpl\") }}|{% if secret is defined %}leaked{% else %}hidden{% endif %}",
        ),
        ("child.tmpl", "{% set s = export(\"secret\", 1) %}child"),
        ("sibling.tmpl", "{% if secret is defined %}leaked{% else %}hidden{% endif %}"),
    ]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    assert_eq!(
        engine.render("parent.tmpl", &[]).unwrap(),
        "child|hidden|hidden"
    );
}

#[test]
fn later_data_arguments_override_earlier_ones() {
    let dir = fixture(&[("greet.tmpl", "{{ greeting }}, {{ name }}!")]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    let out = engine
        .render(
            "greet.tmpl",
            &[
                model(&[
                    ("greeting", Value::from("Hello")),
                    ("name", Value::from("nobody")),
                ]),
                model(&[("name", Value::from("World"))]),
            ],
        )
        .unwrap();
    assert_eq!(out, "Hello, World!");
}

#[test]
fn recursive_inclusion_deepens_the_stack() {
    let dir = fixture(&[(
        "count.tmpl",
        "{% if n > 0 %}{{ n }}{{ render(\"count.tmpl\", {\"n\": n - 1}) }}{% endif %}\n",
    )]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    let out = engine
        .render_model("count.tmpl", &model(&[("n", Value::from(3))]))
        .unwrap();
    assert_eq!(out, "321");
    assert_eq!(engine.depth(), 0);
}

#[test]
fn only_one_trailing_newline_is_removed() {
    let dir = fixture(&[("one.tmpl", "X\n"), ("two.tmpl", "X\n\n")]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    assert_eq!(engine.render("one.tmpl", &[]).unwrap(), "X");
    assert_eq!(engine.render("two.tmpl", &[]).unwrap(), "X\n");
}

#[test]
fn bound_helpers_are_in_every_scope() {
    let dir = fixture(&[
        ("page.tmpl", "{{ site }}: {{ render(\"nav.tmpl\") }}"),
        ("nav.tmpl", "{{ shout(site) }}"),
    ]);

    let mut helpers = HelperMap::new();
    helpers.insert("site", Value::from("example"));
    helpers.insert(
        "shout",
        Value::from_function(|text: String| text.to_uppercase()),
    );

    let engine = RenderEngine::builder()
        .paths([dir.path()])
        .helper_mapping(helpers)
        .build();
    engine.add_helper("site", None).unwrap();
    engine.add_helper("shout", None).unwrap();

    assert_eq!(engine.render("page.tmpl", &[]).unwrap(), "example: EXAMPLE");
}

#[test]
fn helpers_resolve_lazily_from_templates() {
    let dir = fixture(&[(
        "page.tmpl",
        "{{ helper(\"year\") }} {% if helper(\"missing\", false) is none %}absent{% endif %}",
    )]);

    let mut factories = HelperFactories::new();
    factories.register("year", || Value::from(2024));

    let engine = RenderEngine::builder()
        .paths([dir.path()])
        .helper_mapping(factories)
        .build();

    assert_eq!(engine.render("page.tmpl", &[]).unwrap(), "2024 absent");
    // Resolution through a fragment caches the helper for later scopes
    assert!(engine.all_helpers().unwrap().contains_key("year"));
}

#[test]
fn missing_helper_fails_the_render() {
    let dir = fixture(&[
        ("outer.tmpl", "before {{ render(\"inner.tmpl\") }} after"),
        ("inner.tmpl", "{{ helper(\"uri\") }}"),
    ]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    let err = engine.render("outer.tmpl", &[]).unwrap_err();
    assert!(matches!(err, RenderError::HelperNotFound { ref name } if name == "uri"));
    assert_eq!(engine.depth(), 0);
}

#[test]
fn escape_is_available_to_fragments() {
    let dir = fixture(&[(
        "escape.tmpl",
        "{{ escape(title) }}|{{ escape(title, false) }}",
    )]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    let out = engine
        .render_model("escape.tmpl", &model(&[("title", Value::from("<b>Tom & Jerry</b>"))]))
        .unwrap();
    assert_eq!(
        out,
        "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;|<b>Tom & Jerry</b>"
    );
}

#[test]
fn shell_wraps_rendered_body() {
    let dir = fixture(&[
        ("shell.tmpl", "<html><title>{{ title }}</title>{{ rendered_body }}</html>\n"),
        ("body.tmpl", "<p>{{ title }}</p>\n"),
        (
            "nested.tmpl",
            "{{ render_shell(\"shell.tmpl\", \"body.tmpl\", {\"title\": \"Inner\"}) }}",
        ),
    ]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    let out = engine
        .render_shell(
            "shell.tmpl",
            "body.tmpl",
            Some(model(&[("title", Value::from("Home"))])),
        )
        .unwrap();
    assert_eq!(out, "<html><title>Home</title><p>Home</p></html>");

    let nested = engine.render("nested.tmpl", &[]).unwrap();
    assert_eq!(nested, "<html><title>Inner</title><p>Inner</p></html>");
}

#[test]
fn strict_executor_rejects_undefined_variables() {
    let dir = fixture(&[("page.tmpl", "{{ nope }}")]);

    let lenient = RenderEngine::new(vec![dir.path().to_path_buf()]);
    assert_eq!(lenient.render("page.tmpl", &[]).unwrap(), "");

    let strict = RenderEngine::builder()
        .paths([dir.path()])
        .executor(MiniJinjaExecutor::strict())
        .build();
    let err = strict.render("page.tmpl", &[]).unwrap_err();
    assert!(matches!(err, RenderError::Template(_)));
    assert_eq!(strict.depth(), 0);
}

#[test]
fn non_map_render_arguments_are_rejected() {
    let dir = fixture(&[
        ("page.tmpl", "{{ render(\"inner.tmpl\", 5) }}"),
        ("inner.tmpl", "inner"),
    ]);
    let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

    assert!(engine.render("page.tmpl", &[]).is_err());
}
