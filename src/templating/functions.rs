use minijinja::value::Rest;
use minijinja::{Environment, Error, ErrorKind, Value};

use super::engine::RenderEngine;
use super::error::RenderError;
use super::scope::{Scope, scope_from_value};

/// Return `text` with `& < > " '` encoded as HTML entities, or unchanged when
/// `html_safe` is false. Other characters, `/` included, pass through.
pub fn escape(text: &str, html_safe: bool) -> String {
    if !html_safe {
        return text.to_string();
    }
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn into_template_error(context: String, error: RenderError) -> Error {
    Error::new(ErrorKind::InvalidOperation, context).with_source(error)
}

fn data_arguments(function: &str, args: &[Value]) -> Result<Vec<Scope>, Error> {
    args.iter()
        .map(|arg| {
            scope_from_value(arg).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("{function}() data arguments must be maps, got {:?}", arg.kind()),
                )
            })
        })
        .collect()
}

/// `render(target, *maps)`: include another fragment
pub fn render_function(engine: &RenderEngine, target: &str, args: &[Value]) -> Result<Value, Error> {
    let data = data_arguments("render", args)?;
    engine
        .render(target, &data)
        .map(Value::from)
        .map_err(|e| into_template_error(format!("failed to render '{target}'"), e))
}

/// `render_shell(shell, body, model=none)`: wrap a rendered body in a shell
pub fn render_shell_function(
    engine: &RenderEngine,
    shell: &str,
    body: &str,
    model: Option<Value>,
) -> Result<Value, Error> {
    let model = match model {
        Some(model) if !model.is_none() && !model.is_undefined() => {
            data_arguments("render_shell", std::slice::from_ref(&model))?.pop()
        }
        _ => None,
    };
    engine
        .render_shell(shell, body, model)
        .map(Value::from)
        .map_err(|e| into_template_error(format!("failed to render '{body}' inside '{shell}'"), e))
}

/// `helper(name, fail_on_missing=true)`: look up a helper by name
pub fn helper_function(
    engine: &RenderEngine,
    name: &str,
    fail_on_missing: Option<bool>,
) -> Result<Value, Error> {
    match engine.helper(name, fail_on_missing.unwrap_or(true)) {
        Ok(Some(helper)) => Ok(helper),
        Ok(None) => Ok(Value::from(())),
        Err(e) => Err(into_template_error(format!("helper '{name}' is unavailable"), e)),
    }
}

/// Register the engine callbacks with a MiniJinja environment
pub fn register_functions(env: &mut Environment<'static>, engine: &RenderEngine) {
    let e = engine.clone();
    env.add_function("render", move |target: String, args: Rest<Value>| {
        render_function(&e, &target, &args)
    });

    let e = engine.clone();
    env.add_function(
        "render_shell",
        move |shell: String, body: String, model: Option<Value>| {
            render_shell_function(&e, &shell, &body, model)
        },
    );

    let e = engine.clone();
    env.add_function("export", move |name: String, value: Value| {
        e.export(name, value)
    });

    let e = engine.clone();
    env.add_function("helper", move |name: String, fail_on_missing: Option<bool>| {
        helper_function(&e, &name, fail_on_missing)
    });

    env.add_function("escape", |text: Value, html_safe: Option<bool>| {
        let text = if text.is_none() || text.is_undefined() {
            String::new()
        } else {
            text.to_string()
        };
        escape(&text, html_safe.unwrap_or(true))
    });
}
