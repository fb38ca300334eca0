// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass-through element attributes and class name composition.

use alloc::string::String;

use hashbrown::HashMap;

/// Option names consumed by the dropdown components.
///
/// These never reach the rendered element; the props builders route them to
/// typed fields (or drop them, in the case of `active`).
pub const RESERVED: &[&str] = &[
    "isTrigger",
    "classPrefix",
    "tagName",
    "defaultActive",
    "active",
    "className",
    "class",
];

/// Returns `true` if `name` is consumed by the dropdown rather than passed through.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Attributes forwarded unmodified to a rendered element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    map: HashMap<String, String>,
}

impl Attributes {
    /// Create an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pass-through attribute, returning the previous value.
    ///
    /// Reserved option names are rejected and `None` is returned.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        if is_reserved(&name) {
            log::trace!("dropping reserved attribute `{name}` from pass-through");
            return None;
        }
        self.map.insert(name, value.into())
    }

    /// Look up a pass-through attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Remove a pass-through attribute.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.map.remove(name)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parse a boolean option value.
///
/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`, ignoring ASCII case.
/// Returns `None` for anything else.
pub fn parse_flag(value: &str) -> Option<bool> {
    const TRUE: &[&str] = &["true", "1", "yes", "on"];
    const FALSE: &[&str] = &["false", "0", "no", "off"];
    let value = value.trim();
    if TRUE.iter().any(|t| value.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSE.iter().any(|f| value.eq_ignore_ascii_case(f)) {
        Some(false)
    } else {
        None
    }
}

/// Join a base class name with the modifiers whose condition holds.
///
/// Empty fragments are skipped, so the result never has stray spaces.
///
/// ```
/// use understory_dropdown::attrs::class_names;
///
/// let class = class_names(Some("menu"), [("menu-active", true), ("menu-right", false)]);
/// assert_eq!(class, "menu menu-active");
/// ```
pub fn class_names<S: AsRef<str>>(
    base: Option<&str>,
    modifiers: impl IntoIterator<Item = (S, bool)>,
) -> String {
    let mut out = String::new();
    let mut push = |part: &str| {
        if part.is_empty() {
            return;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(part);
    };
    if let Some(base) = base {
        for part in base.split_whitespace() {
            push(part);
        }
    }
    for (name, on) in modifiers {
        if on {
            push(name.as_ref());
        }
    }
    out
}
