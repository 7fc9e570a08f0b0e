use std::io::Write;

use serde_json::{Map, Value};

use crate::error::{CompositionError, Result};

pub const MARKER_OPEN: &str = "§[";
pub const MARKER_CLOSE: &str = "]§";

/// A renderable unit. Rendering streams bytes to the writer, expanding
/// `§[…]§` markers; `resolve` writes a sibling fragment's rendering for
/// include markers.
pub trait Fragment: Send + Sync {
    fn execute(
        &self,
        w: &mut dyn Write,
        data: &Map<String, Value>,
        resolve: &mut dyn FnMut(&mut dyn Write, &str) -> Result<()>,
    ) -> Result<()>;
}

/// A fragment backed by a template string.
#[derive(Debug, Clone, PartialEq)]
pub struct StringFragment(String);

impl StringFragment {
    pub fn new(template: impl Into<String>) -> Self {
        StringFragment(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Fragment for StringFragment {
    fn execute(
        &self,
        w: &mut dyn Write,
        data: &Map<String, Value>,
        resolve: &mut dyn FnMut(&mut dyn Write, &str) -> Result<()>,
    ) -> Result<()> {
        execute_template(w, &self.0, data, resolve)
    }
}

/// Expands a template to the writer.
///
/// Marker forms: `§[name]§` variable lookup, `§[> name]§` mandatory include,
/// `§[#> name]§alt§[/name]§` optional include with alternative text. Bytes
/// outside markers are emitted verbatim; emitted bytes stay on the wire when
/// a later marker errors.
pub fn execute_template(
    w: &mut dyn Write,
    template: &str,
    data: &Map<String, Value>,
    resolve: &mut dyn FnMut(&mut dyn Write, &str) -> Result<()>,
) -> Result<()> {
    let mut rest = template;
    while let Some(start) = rest.find(MARKER_OPEN) {
        w.write_all(rest[..start].as_bytes())?;
        let after = &rest[start + MARKER_OPEN.len()..];
        let end = after.find(MARKER_CLOSE).ok_or_else(|| {
            CompositionError::Render(format!(
                "template parsing error, missing ending separator: {}",
                &rest[start..]
            ))
        })?;
        let marker = after[..end].trim();
        rest = &after[end + MARKER_CLOSE.len()..];

        if let Some(name) = marker.strip_prefix("#>") {
            let name = name.trim();
            let closing = format!("{MARKER_OPEN}/{name}{MARKER_CLOSE}");
            let block_end = rest.find(&closing).ok_or_else(|| {
                CompositionError::Render(format!(
                    "template parsing error, missing ending block: {closing}"
                ))
            })?;
            let alternative = &rest[..block_end];
            rest = &rest[block_end + closing.len()..];

            // The nested rendering is buffered, so a failing resolver leaves
            // no partial bytes before the alternative text.
            let mut nested = Vec::new();
            match resolve(&mut nested, name) {
                Ok(()) => w.write_all(&nested)?,
                Err(_) => w.write_all(alternative.as_bytes())?,
            }
        } else if let Some(name) = marker.strip_prefix('>') {
            resolve(w, name.trim())?;
        } else if marker.starts_with('/') {
            // Stray block terminator outside an optional include.
        } else {
            w.write_all(lookup(data, marker).as_bytes())?;
        }
    }
    w.write_all(rest.as_bytes())?;
    Ok(())
}

/// Resolves a dotted path against the data map. A literal key containing
/// dots wins over path descent.
fn lookup(data: &Map<String, Value>, path: &str) -> String {
    lookup_value(data, path).map(stringify).unwrap_or_default()
}

fn lookup_value<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(v) = data.get(path) {
        return Some(v);
    }
    let mut parts = path.split('.');
    let mut current = data.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // The query-parameter shape: a list of values resolves to its first
        // string entry.
        Value::Array(items) => items
            .first()
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default(),
        Value::Null | Value::Object(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn data_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test data must be a json object"),
        }
    }

    fn render(template: &str, data: Value) -> Result<String> {
        let data = data_map(data);
        let mut out = Vec::new();
        let mut no_resolve = |_: &mut dyn Write, _: &str| -> Result<()> { Ok(()) };
        execute_template(&mut out, template, &data, &mut no_resolve)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn variables() {
        let cases = vec![
            (json!({}), "xxx", "xxx"),
            (json!({}), "", ""),
            (json!({}), "--§[foo]§--", "----"),
            (json!({"foo": "bar"}), "§[foo]§", "bar"),
            (json!({"some": {"url": ["param"]}}), "§[some.url]§", "param"),
            (json!({"foo": {"bar": "bazz"}}), "§[foo.bar]§", "bazz"),
            (
                json!({"foo": {"bar": "bazz"}, "foo.bar": "overwrite"}),
                "§[foo.bar]§",
                "overwrite",
            ),
            (json!({"foo": {"bar": "bazz"}}), "§[foo.bar.nothing]§", ""),
            (json!({"foo": "bar"}), "§[ foo ]§", "bar"),
            (json!({"foo": "bar"}), "xxx-§[foo]§-yyy", "xxx-bar-yyy"),
            (
                json!({"foo": "bar", "bli": "blub"}),
                "xxx-§[foo]§-yyy-§[bli]§-zzz",
                "xxx-bar-yyy-blub-zzz",
            ),
            (json!({}), "xxx-§[not_existent_variable]§-yyy", "xxx--yyy"),
            (json!({}), "xxx-]§-yyy", "xxx-]§-yyy"),
            (json!({"answer": 42}), "§[answer]§", "42"),
            (json!({"flag": true}), "§[flag]§", "true"),
        ];
        for (data, template, expected) in cases {
            assert_eq!(render(template, data).unwrap(), expected, "template {template:?}");
        }
    }

    #[test]
    fn includes() {
        let cases: Vec<(HashMap<&str, &str>, &str, &str, Option<&str>)> = vec![
            (HashMap::from([("foo", "bar")]), "§[> foo]§", "bar", None),
            (HashMap::from([("foo", "bar")]), "§[>   foo   ]§", "bar", None),
            (
                HashMap::from([("foo", "bar")]),
                "xxx-§[> foo]§-yyy",
                "xxx-bar-yyy",
                None,
            ),
            (
                HashMap::from([("foo", "bar"), ("bli", "blub")]),
                "xxx-§[> foo]§-yyy-§[> bli]§-zzz",
                "xxx-bar-yyy-blub-zzz",
                None,
            ),
            (
                HashMap::new(),
                "xxx-§[> not_existent_fragment]§-yyy",
                "xxx-",
                Some("no fragment named not_existent_fragment"),
            ),
            (
                HashMap::from([("foo", "bar")]),
                "xxx-§[#> foo]§ alternative text §[/foo]§-yyy",
                "xxx-bar-yyy",
                None,
            ),
            (
                HashMap::new(),
                "xxx-§[#> foo]§ alternative text §[/foo]§-yyy",
                "xxx- alternative text -yyy",
                None,
            ),
            (
                HashMap::new(),
                "xxx-§[#> foo]§ alternative text §-yyy",
                "",
                Some("missing ending block: §[/foo]§"),
            ),
        ];

        for (fragments, template, expected, expected_err) in cases {
            let mut out = Vec::new();
            let mut resolve = |w: &mut dyn Write, name: &str| match fragments.get(name) {
                Some(body) => {
                    w.write_all(body.as_bytes())?;
                    Ok(())
                }
                None => Err(CompositionError::Render(format!("no fragment named {name}"))),
            };
            let result = execute_template(&mut out, template, &Map::new(), &mut resolve);
            match expected_err {
                None => {
                    result.unwrap();
                    assert_eq!(String::from_utf8(out).unwrap(), expected, "template {template:?}");
                }
                Some(msg) => {
                    let err = result.unwrap_err();
                    assert!(
                        err.to_string().contains(msg),
                        "expected {msg:?} in {err}, template {template:?}"
                    );
                    if !expected.is_empty() {
                        assert_eq!(String::from_utf8(out).unwrap(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn unterminated_marker() {
        for template in ["xxx-§[-yyy", "xxx-]§§[-yyy"] {
            let mut out = Vec::new();
            let mut resolve = |_: &mut dyn Write, _: &str| -> Result<()> { Ok(()) };
            let err =
                execute_template(&mut out, template, &Map::new(), &mut resolve).unwrap_err();
            assert!(
                err.to_string().contains("missing ending separator"),
                "template {template:?}, got {err}"
            );
        }
    }

    #[test]
    fn stray_block_terminator_is_dropped() {
        assert_eq!(render("a-§[/foo]§-b", json!({})).unwrap(), "a--b");
    }

    #[test]
    fn rendering_is_idempotent() {
        let data = json!({"foo": "bar"});
        let first = render("x-§[foo]§", data.clone()).unwrap();
        let second = render("x-§[foo]§", data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn optional_include_resolves_nested_at_most_once() {
        let mut calls = 0;
        let mut out = Vec::new();
        let mut resolve = |w: &mut dyn Write, _: &str| -> Result<()> {
            calls += 1;
            w.write_all(b"frag")?;
            Ok(())
        };
        execute_template(
            &mut out,
            "§[#> foo]§alt§[/foo]§",
            &Map::new(),
            &mut resolve,
        )
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "frag");
    }
}
