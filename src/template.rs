//! `$NAME` placeholder templating.
//!
//! Templates use the shell-like syntax of the packaged `.template` and
//! `.ldif` files: `$NAME` or `${NAME}` is replaced by the value of `NAME`,
//! and `$$` yields a literal `$`. Rendering is strict: a placeholder with no
//! value, or a `$` that starts no valid placeholder, is an error instead of
//! being copied through.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::sync::LazyLock;

use camino::Utf8Path;
use regex::{Captures, Regex};

use crate::error::DsInstanceError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<invalid>))",
    )
    .expect("placeholder pattern is valid")
});

#[derive(Clone, PartialEq, Eq)]
struct Value {
    text: String,
    secret: bool,
}

/// Values available to templates, keyed by placeholder name.
///
/// Values inserted with [`insert_secret`](Self::insert_secret) are masked in
/// `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SubstitutionMap {
    values: BTreeMap<String, Value>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(
            key.into(),
            Value {
                text: value.into(),
                secret: false,
            },
        );
    }

    pub fn insert_secret(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(
            key.into(),
            Value {
                text: value.into(),
                secret: true,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for SubstitutionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(k, v)| {
                let shown = if v.secret { "********" } else { v.text.as_str() };
                (k, shown)
            }))
            .finish()
    }
}

/// Renders `text` against `values`. `name` identifies the template in errors.
pub fn render(name: &str, text: &str, values: &SubstitutionMap) -> Result<String, DsInstanceError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(resolve(name, text, &caps, values)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);

    Ok(out)
}

fn resolve<'a>(
    name: &str,
    text: &str,
    caps: &Captures<'_>,
    values: &'a SubstitutionMap,
) -> Result<&'a str, DsInstanceError> {
    if caps.name("escaped").is_some() {
        return Ok("$");
    }
    if let Some(key) = caps.name("named").or_else(|| caps.name("braced")) {
        return values.get(key.as_str()).ok_or_else(|| DsInstanceError::Template {
            template: name.to_string(),
            reason: format!("no value for placeholder ${}", key.as_str()),
        });
    }

    let offset = caps.get(0).map_or(0, |m| m.start());
    let line = text[..offset].matches('\n').count() + 1;
    Err(DsInstanceError::Template {
        template: name.to_string(),
        reason: format!("invalid placeholder at line {}", line),
    })
}

/// Reads the template at `path` and renders it.
pub fn render_file(path: &Utf8Path, values: &SubstitutionMap) -> Result<String, DsInstanceError> {
    let text = fs::read_to_string(path)
        .map_err(|e| DsInstanceError::io(format!("failed to read template {}", path), e))?;
    render(path.as_str(), &text, values)
}
