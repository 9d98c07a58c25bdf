//! Variable scopes and the frame stack of nested renders

use minijinja::Value;
use std::collections::BTreeMap;

/// Variables visible to one fragment, by name
pub type Scope = BTreeMap<String, Value>;

/// Copy every entry of `overlay` into `base`, replacing collisions
pub fn merge(base: &mut Scope, overlay: &Scope) {
    base.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
}

/// Convert a MiniJinja map value into a scope.
///
/// Returns `None` for values that are not maps.
pub fn scope_from_value(value: &Value) -> Option<Scope> {
    if value.kind() != minijinja::value::ValueKind::Map {
        return None;
    }

    let mut scope = Scope::new();
    for key in value.try_iter().ok()? {
        let item = value.get_item(&key).ok()?;
        scope.insert(key.to_string(), item);
    }
    Some(scope)
}

/// One level of active rendering
#[derive(Debug, Clone)]
struct Frame {
    data: Scope,
    exported: Scope,
}

/// The stack of active frames plus the root export slot.
///
/// The root slot collects exports made while no frame is active; they are
/// offered to the next top-level render the same way a frame's exports are
/// offered to its children.
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
    root_exported: Scope,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Data of the innermost active frame
    pub fn current_data(&self) -> Option<&Scope> {
        self.frames.last().map(|frame| &frame.data)
    }

    /// Exports of the innermost level, or the root slot outside any frame
    pub fn current_exported(&self) -> &Scope {
        self.frames
            .last()
            .map(|frame| &frame.exported)
            .unwrap_or(&self.root_exported)
    }

    /// Build the scope for a new frame.
    ///
    /// Precedence from lowest to highest: `helpers`, the current frame's data,
    /// each of `args` in order, then whatever the current level has exported.
    /// Exports are applied last and so beat explicit arguments.
    pub fn compose(&self, helpers: &Scope, args: &[Scope]) -> Scope {
        let mut scope = helpers.clone();
        if let Some(data) = self.current_data() {
            merge(&mut scope, data);
        }
        for arg in args {
            merge(&mut scope, arg);
        }
        merge(&mut scope, self.current_exported());
        scope
    }

    /// Enter a new level with a fresh export slot
    pub fn push(&mut self, data: Scope) {
        self.frames.push(Frame {
            data,
            exported: Scope::new(),
        });
    }

    /// Leave the innermost level, discarding its data and exports
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Record `value` under `name` in the current level's exports
    pub fn export(&mut self, name: impl Into<String>, value: Value) -> Value {
        let slot = match self.frames.last_mut() {
            Some(frame) => &mut frame.exported,
            None => &mut self.root_exported,
        };
        slot.insert(name.into(), value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(pairs: &[(&str, Value)]) -> Scope {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_compose_precedence() {
        let mut stack = FrameStack::new();
        let helpers = scope(&[("a", Value::from("helper")), ("b", Value::from("helper"))]);
        stack.push(scope(&[("b", Value::from("frame")), ("c", Value::from("frame"))]));

        let args = [
            scope(&[("c", Value::from("arg1")), ("d", Value::from("arg1"))]),
            scope(&[("d", Value::from("arg2"))]),
        ];
        let composed = stack.compose(&helpers, &args);

        assert_eq!(composed["a"], Value::from("helper"));
        assert_eq!(composed["b"], Value::from("frame"));
        assert_eq!(composed["c"], Value::from("arg1"));
        assert_eq!(composed["d"], Value::from("arg2"));
    }

    #[test]
    fn test_exports_override_arguments() {
        let mut stack = FrameStack::new();
        stack.push(Scope::new());
        stack.export("k", Value::from("exported"));

        let composed = stack.compose(&Scope::new(), &[scope(&[("k", Value::from("explicit"))])]);
        assert_eq!(composed["k"], Value::from("exported"));
    }

    #[test]
    fn test_export_does_not_touch_frame_data() {
        let mut stack = FrameStack::new();
        stack.push(scope(&[("x", Value::from(1))]));
        stack.export("flag", Value::from(true));

        let data = stack.current_data().unwrap();
        assert!(!data.contains_key("flag"));
        assert_eq!(stack.current_exported()["flag"], Value::from(true));
    }

    #[test]
    fn test_push_gives_fresh_export_slot() {
        let mut stack = FrameStack::new();
        stack.push(Scope::new());
        stack.export("k", Value::from(1));
        stack.push(Scope::new());

        assert!(stack.current_exported().is_empty());
        stack.pop();
        assert_eq!(stack.current_exported()["k"], Value::from(1));
    }

    #[test]
    fn test_export_outside_frame_uses_root_slot() {
        let mut stack = FrameStack::new();
        let returned = stack.export("title", Value::from("Home"));

        assert_eq!(returned, Value::from("Home"));
        assert_eq!(stack.depth(), 0);
        let composed = stack.compose(&Scope::new(), &[]);
        assert_eq!(composed["title"], Value::from("Home"));
    }

    #[test]
    fn test_scope_from_value() {
        let value = minijinja::context! { name => "World", count => 3 };
        let converted = scope_from_value(&value).unwrap();
        assert_eq!(converted["name"], Value::from("World"));
        assert_eq!(converted["count"], Value::from(3));

        assert!(scope_from_value(&Value::from("not a map")).is_none());
    }
}
