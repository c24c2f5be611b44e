//! Element Attributes
//!
//! Namespaced attribute storage. Names backed by a live property (`class`
//! and other token lists, `style`, an option's `selected`) are routed to
//! that property instead of being stored verbatim.

use crate::document::Document;
use crate::html::{self, ElementClass};
use crate::node::ElementData;
use crate::observer::{MutationRecord, MutationType};
use crate::protocol::TransferMutation;
use crate::{DomResult, NodeIndex, HTML_NAMESPACE};

/// Single attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub namespace_uri: String,
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(
        namespace_uri: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Attribute whose value lives in a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackedAttribute {
    TokenList,
    Style,
    OptionSelected,
}

impl BackedAttribute {
    fn resolve(element: &ElementData, name: &str) -> Option<Self> {
        if element.token_list(name).is_some() {
            Some(Self::TokenList)
        } else if name == "style" {
            Some(Self::Style)
        } else if name == "selected" && element.class() == ElementClass::Option {
            Some(Self::OptionSelected)
        } else {
            None
        }
    }

    fn read(self, element: &ElementData, name: &str) -> String {
        match self {
            Self::TokenList => {
                element.token_list(name).map(|list| list.value()).unwrap_or_default()
            }
            Self::Style => element.style().css_text(),
            Self::OptionSelected => html::forms::option_selected(element).to_string(),
        }
    }
}

/// Attribute value as script sees it: property-backed names read through
/// their property
pub(crate) fn attribute_value(
    element: &ElementData,
    namespace_uri: &str,
    name: &str,
) -> Option<String> {
    let attr = element.find_attribute(namespace_uri, name)?;
    Some(match BackedAttribute::resolve(element, name) {
        Some(backed) => backed.read(element, name),
        None => attr.value.clone(),
    })
}

/// Attribute capability of elements
pub trait ElementAttributes {
    fn set_attribute_ns(
        &mut self,
        element: NodeIndex,
        namespace_uri: &str,
        name: &str,
        value: &str,
    ) -> DomResult<()>;

    fn get_attribute_ns(
        &self,
        element: NodeIndex,
        namespace_uri: &str,
        name: &str,
    ) -> Option<String>;

    fn remove_attribute_ns(
        &mut self,
        element: NodeIndex,
        namespace_uri: &str,
        name: &str,
    ) -> DomResult<()>;

    fn has_attribute_ns(&self, element: NodeIndex, namespace_uri: &str, name: &str) -> bool;

    /// Whether the element carries any attribute
    fn has_attributes(&self, element: NodeIndex) -> bool;

    fn set_attribute(&mut self, element: NodeIndex, name: &str, value: &str) -> DomResult<()> {
        self.set_attribute_ns(element, HTML_NAMESPACE, name, value)
    }

    fn get_attribute(&self, element: NodeIndex, name: &str) -> Option<String> {
        self.get_attribute_ns(element, HTML_NAMESPACE, name)
    }

    fn remove_attribute(&mut self, element: NodeIndex, name: &str) -> DomResult<()> {
        self.remove_attribute_ns(element, HTML_NAMESPACE, name)
    }

    fn has_attribute(&self, element: NodeIndex, name: &str) -> bool {
        self.has_attribute_ns(element, HTML_NAMESPACE, name)
    }
}

impl ElementAttributes for Document {
    fn set_attribute_ns(
        &mut self,
        element: NodeIndex,
        namespace_uri: &str,
        name: &str,
        value: &str,
    ) -> DomResult<()> {
        let data = self.element_mut(element)?;
        if let Some(backed) = BackedAttribute::resolve(data, name) {
            if data.find_attribute(namespace_uri, name).is_none() {
                data.attributes.push(Attr::new(namespace_uri, name, value));
            }
            return match backed {
                BackedAttribute::TokenList => self.set_token_list_value(element, name, value),
                BackedAttribute::Style => self.style(element)?.set_css_text(value),
                BackedAttribute::OptionSelected => {
                    self.set_option_selected(element, value == "true")
                }
            };
        }

        let old_value = data.store_attribute(namespace_uri, name, value);
        let name_index = self.runtime.store_string(name);
        let namespace_index = self.runtime.store_string(namespace_uri);
        let value_index = self.runtime.store_string(value);
        self.mutate(
            MutationRecord {
                attribute_name: Some(name.to_string()),
                attribute_namespace: Some(namespace_uri.to_string()),
                value: Some(value.to_string()),
                old_value: Some(old_value),
                ..MutationRecord::new(MutationType::Attributes, element)
            },
            TransferMutation::Attributes {
                target: element,
                name: name_index,
                namespace: namespace_index,
                value: Some(value_index),
            },
        );
        Ok(())
    }

    fn get_attribute_ns(
        &self,
        element: NodeIndex,
        namespace_uri: &str,
        name: &str,
    ) -> Option<String> {
        attribute_value(self.element(element)?, namespace_uri, name)
    }

    fn remove_attribute_ns(
        &mut self,
        element: NodeIndex,
        namespace_uri: &str,
        name: &str,
    ) -> DomResult<()> {
        let data = self.element_mut(element)?;
        let Some(position) = data
            .attributes
            .iter()
            .position(|attr| attr.namespace_uri == namespace_uri && attr.name == name)
        else {
            return Ok(());
        };
        let old_value = data.attributes.remove(position).value;
        match BackedAttribute::resolve(data, name) {
            Some(BackedAttribute::TokenList) => {
                if let Some(list) = data.token_list_mut(name) {
                    list.clear();
                }
            }
            Some(BackedAttribute::Style) => data.style.clear(),
            _ => {}
        }

        let name_index = self.runtime.store_string(name);
        let namespace_index = self.runtime.store_string(namespace_uri);
        self.mutate(
            MutationRecord {
                attribute_name: Some(name.to_string()),
                attribute_namespace: Some(namespace_uri.to_string()),
                old_value: Some(old_value),
                ..MutationRecord::new(MutationType::Attributes, element)
            },
            TransferMutation::Attributes {
                target: element,
                name: name_index,
                namespace: namespace_index,
                value: None,
            },
        );
        Ok(())
    }

    fn has_attribute_ns(&self, element: NodeIndex, namespace_uri: &str, name: &str) -> bool {
        self.element(element)
            .is_some_and(|data| data.find_attribute(namespace_uri, name).is_some())
    }

    fn has_attributes(&self, element: NodeIndex) -> bool {
        self.element(element).is_some_and(|data| !data.attributes.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TransferMessage;
    use std::sync::mpsc;

    fn document() -> Document {
        let (tx, _rx) = mpsc::channel::<TransferMessage>();
        Document::new(tx)
    }

    #[test]
    fn test_set_get_remove() {
        let mut doc = document();
        let div = doc.create_element("div");
        doc.set_attribute(div, "foo", "bar").unwrap();
        assert_eq!(doc.get_attribute(div, "foo").as_deref(), Some("bar"));
        assert!(doc.has_attributes(div));

        doc.remove_attribute(div, "foo").unwrap();
        assert!(!doc.has_attribute(div, "foo"));
        assert_eq!(doc.get_attribute(div, "foo"), None);
    }

    #[test]
    fn test_namespaces_are_distinct() {
        let mut doc = document();
        let div = doc.create_element("div");
        doc.set_attribute_ns(div, "urn:a", "x", "1").unwrap();
        doc.set_attribute(div, "x", "2").unwrap();
        assert_eq!(doc.get_attribute_ns(div, "urn:a", "x").as_deref(), Some("1"));
        assert_eq!(doc.get_attribute(div, "x").as_deref(), Some("2"));
        assert_eq!(doc.element(div).unwrap().attributes().len(), 2);
    }

    #[test]
    fn test_class_attribute_is_backed() {
        let mut doc = document();
        let div = doc.create_element("div");
        doc.set_attribute(div, "class", " a  b a ").unwrap();
        assert!(doc.class_list(div).unwrap().contains("b"));
        assert_eq!(doc.get_attribute(div, "class").as_deref(), Some("a b"));

        doc.remove_attribute(div, "class").unwrap();
        assert!(doc.class_list(div).unwrap().is_empty());
    }

    #[test]
    fn test_style_attribute_is_backed() {
        let mut doc = document();
        let div = doc.create_element("div");
        doc.set_attribute(div, "style", "color: red").unwrap();
        assert_eq!(doc.style(div).unwrap().get_property_value("color"), "red");
        assert_eq!(doc.get_attribute(div, "style").as_deref(), Some("color: red;"));
    }
}
