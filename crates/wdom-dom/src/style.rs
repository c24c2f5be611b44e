//! CSSStyleDeclaration
//!
//! Inline style backing the `style` attribute. Properties keep insertion
//! order; `cssText` serializes them as `key: value;` pairs.

use crate::document::Document;
use crate::observer::{MutationRecord, MutationType};
use crate::protocol::TransferMutation;
use crate::{DomResult, NodeIndex};

const VENDOR_PREFIXES: [&str; 4] = ["webkit", "khtml", "moz", "ms"];

/// `backgroundColor` -> `background-color`, `webkitTransform` ->
/// `-webkit-transform`. A vendor prefix only counts at the start of the
/// key, so `columns` is left alone.
pub fn hyphenate_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    if VENDOR_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
        out.push('-');
    }
    let mut previous: Option<char> = None;
    for c in key.chars() {
        if c.is_ascii_uppercase() && previous.is_some_and(|p| p.is_ascii_alphabetic()) {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
        previous = Some(c);
    }
    out
}

/// Inline style properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssStyleDeclaration {
    properties: Vec<(String, String)>,
}

impl CssStyleDeclaration {
    /// Value of `key`, empty when unset
    pub fn get_property_value(&self, key: &str) -> &str {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, v)| v.as_str())
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// Number of properties with a non-empty value
    pub fn len(&self) -> usize {
        self.properties.iter().filter(|(_, v)| !v.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn css_text(&self) -> String {
        let mut text = String::new();
        for (key, value) in &self.properties {
            if !value.is_empty() {
                text.push_str(key);
                text.push_str(": ");
                text.push_str(value);
                text.push_str("; ");
            }
        }
        text.trim().to_string()
    }

    fn set_property(&mut self, key: &str, value: &str) {
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.properties.push((key.to_string(), value.to_string())),
        }
    }

    fn remove_property(&mut self, key: &str) -> String {
        match self.properties.iter().position(|(k, _)| k == key) {
            Some(position) => self.properties.remove(position).1,
            None => String::new(),
        }
    }

    /// Reset from `cssText`: alternating `key:value;` fragments, a dangling
    /// key without a value is dropped
    fn set_css_text(&mut self, text: &str) {
        self.properties.clear();
        let parts: Vec<&str> = text.split([':', ';']).collect();
        for pair in parts.chunks_exact(2) {
            self.set_property(&pair[0].trim().to_lowercase(), pair[1].trim());
        }
    }

    pub(crate) fn clear(&mut self) {
        self.properties.clear();
    }
}

/// Mutating view of one element's inline style
pub struct StyleMut<'a> {
    document: &'a mut Document,
    element: NodeIndex,
}

impl Document {
    /// `element.style`
    pub fn style(&mut self, element: NodeIndex) -> DomResult<StyleMut<'_>> {
        self.try_element(element)?;
        Ok(StyleMut { document: self, element })
    }

    /// Serialize the style into the attribute and record the change
    fn style_mutated(&mut self, element: NodeIndex) -> DomResult<()> {
        let data = self.element_mut(element)?;
        let value = data.style.css_text();
        let namespace_uri = data.namespace_uri.clone();
        let old_value = data.store_attribute(&namespace_uri, "style", &value);

        let name = self.runtime.store_string("style");
        let value_index = self.runtime.store_string(&value);
        self.mutate(
            MutationRecord {
                attribute_name: Some("style".to_string()),
                value: Some(value),
                old_value: Some(old_value),
                ..MutationRecord::new(MutationType::Attributes, element)
            },
            TransferMutation::Attributes {
                target: element,
                name,
                namespace: 0,
                value: Some(value_index),
            },
        );
        Ok(())
    }
}

impl StyleMut<'_> {
    fn declaration(&self) -> Option<&CssStyleDeclaration> {
        self.document.element(self.element).map(|data| &data.style)
    }

    pub fn get_property_value(&self, key: &str) -> String {
        self.declaration()
            .map(|style| style.get_property_value(key).to_string())
            .unwrap_or_default()
    }

    pub fn css_text(&self) -> String {
        self.declaration().map(CssStyleDeclaration::css_text).unwrap_or_default()
    }

    pub fn set_property(&mut self, key: &str, value: &str) -> DomResult<()> {
        self.document.element_mut(self.element)?.style.set_property(key, value);
        self.document.style_mutated(self.element)
    }

    /// Remove `key`, returning its previous value
    pub fn remove_property(&mut self, key: &str) -> DomResult<String> {
        let old_value = self.document.element_mut(self.element)?.style.remove_property(key);
        self.document.style_mutated(self.element)?;
        Ok(old_value)
    }

    pub fn set_css_text(&mut self, text: &str) -> DomResult<()> {
        self.document.element_mut(self.element)?.style.set_css_text(text);
        self.document.style_mutated(self.element)
    }

    /// Camel-cased accessor, e.g. `get("backgroundColor")`
    pub fn get(&self, camel_key: &str) -> String {
        self.get_property_value(&hyphenate_key(camel_key))
    }

    /// Camel-cased setter, e.g. `set("backgroundColor", "red")`
    pub fn set(&mut self, camel_key: &str, value: &str) -> DomResult<()> {
        self.set_property(&hyphenate_key(camel_key), value)
    }
}
