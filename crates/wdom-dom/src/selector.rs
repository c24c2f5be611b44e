//! Selector matching
//!
//! `querySelector`/`querySelectorAll` over four simple selector forms:
//! `#id`, `.class`, `tag` and a bracketed attribute selector, optionally
//! combined as `tag[attr=value]`. There are no combinators.

use crate::attributes::attribute_value;
use crate::document::Document;
use crate::node::{ElementData, NodeType};
use crate::{NodeIndex, HTML_NAMESPACE};

/// Element descendants of `node` matching `predicate`, in pre-order
pub(crate) fn match_children_elements(
    document: &Document,
    node: NodeIndex,
    predicate: impl Fn(&ElementData) -> bool,
) -> Vec<NodeIndex> {
    let mut matches = Vec::new();
    collect_matches(document, node, &predicate, &mut matches);
    matches
}

fn collect_matches(
    document: &Document,
    node: NodeIndex,
    predicate: &impl Fn(&ElementData) -> bool,
    matches: &mut Vec<NodeIndex>,
) {
    let Some(entry) = document.node(node) else {
        return;
    };
    for &child in &entry.children {
        let Some(element) = document
            .node(child)
            .filter(|c| c.node_type == NodeType::Element)
            .and_then(|c| c.as_element())
        else {
            continue;
        };
        if predicate(element) {
            matches.push(child);
        }
        collect_matches(document, child, predicate, matches);
    }
}

/// First element descendant of `node` matching `predicate`, in pre-order
pub(crate) fn match_child_element(
    document: &Document,
    node: NodeIndex,
    predicate: impl Fn(&ElementData) -> bool,
) -> Option<NodeIndex> {
    fn walk(
        document: &Document,
        node: NodeIndex,
        predicate: &impl Fn(&ElementData) -> bool,
    ) -> Option<NodeIndex> {
        for child in document.children(node) {
            if document.element(child).is_some_and(predicate) {
                return Some(child);
            }
            if let Some(found) = walk(document, child, predicate) {
                return Some(found);
            }
        }
        None
    }
    walk(document, node, &predicate)
}

/// Closest strict ancestor of `node` matching `predicate`
pub(crate) fn match_nearest_parent(
    document: &Document,
    node: NodeIndex,
    predicate: impl Fn(&ElementData) -> bool,
) -> Option<NodeIndex> {
    let mut current = document.parent_node(node);
    while let Some(index) = current {
        if document.element(index).is_some_and(&predicate) {
            return Some(index);
        }
        current = document.parent_node(index);
    }
    None
}

/// Predicate on the upper-cased tag name
pub(crate) fn has_tag(element: &ElementData, tag_names: &[&str]) -> bool {
    tag_names
        .iter()
        .any(|tag| element.local_name().eq_ignore_ascii_case(tag))
}

/// Child query capability
pub trait ParentNode {
    fn query_selector(&self, node: NodeIndex, selector: &str) -> Option<NodeIndex>;

    fn query_selector_all(&self, node: NodeIndex, selector: &str) -> Vec<NodeIndex>;

    /// Descendants with the given tag, `*` for all
    fn get_elements_by_tag_name(&self, node: NodeIndex, tag_name: &str) -> Vec<NodeIndex>;

    /// Descendants carrying any of the space-separated class names
    fn get_elements_by_class_name(&self, node: NodeIndex, names: &str) -> Vec<NodeIndex>;
}

impl ParentNode for Document {
    fn query_selector(&self, node: NodeIndex, selector: &str) -> Option<NodeIndex> {
        self.query_selector_all(node, selector).into_iter().next()
    }

    fn query_selector_all(&self, node: NodeIndex, selector: &str) -> Vec<NodeIndex> {
        let Some(scoping_root) = self.node(node).map(|n| n.scoping_root) else {
            return Vec::new();
        };
        let selector = Selector::parse(selector);
        match_children_elements(self, scoping_root, |element| selector.matches(element))
            .into_iter()
            .filter(|&element| element != node && self.contains(node, element))
            .collect()
    }

    fn get_elements_by_tag_name(&self, node: NodeIndex, tag_name: &str) -> Vec<NodeIndex> {
        let lower = tag_name.to_lowercase();
        match_children_elements(self, node, |element| {
            if tag_name == "*" {
                true
            } else if element.namespace_uri() == HTML_NAMESPACE {
                element.local_name() == lower
            } else {
                element.local_name().to_uppercase() == tag_name
            }
        })
    }

    fn get_elements_by_class_name(&self, node: NodeIndex, names: &str) -> Vec<NodeIndex> {
        let names: Vec<&str> = names.split_whitespace().collect();
        match_children_elements(self, node, |element| {
            names.iter().any(|name| element.class_list().contains(name))
        })
    }
}

/// Parsed simple selector
#[derive(Debug, Clone, PartialEq)]
enum Selector {
    /// `[attr...]` on its own
    Attribute(AttributeSelector),
    Id(String, Option<AttributeSelector>),
    Class(String, Option<AttributeSelector>),
    Tag(String, Option<AttributeSelector>),
}

impl Selector {
    fn parse(selector: &str) -> Self {
        let brackets = match (selector.find('['), selector.find(']')) {
            (Some(open), Some(close)) if open < close => Some((open, close)),
            _ => None,
        };
        if selector.starts_with('[') {
            return Self::Attribute(AttributeSelector::parse(selector));
        }
        let (element_part, attribute) = match brackets {
            Some((open, close)) => (
                &selector[..open],
                Some(AttributeSelector::parse(&selector[open..=close])),
            ),
            None => (selector, None),
        };

        if let Some(id) = element_part.strip_prefix('#') {
            Self::Id(id.to_string(), attribute)
        } else if let Some(class) = element_part.strip_prefix('.') {
            Self::Class(class.to_string(), attribute)
        } else {
            Self::Tag(element_part.to_lowercase(), attribute)
        }
    }

    fn matches(&self, element: &ElementData) -> bool {
        let (simple, attribute) = match self {
            Self::Attribute(attribute) => return attribute.matches(element),
            Self::Id(id, attribute) => (element.id() == id, attribute),
            Self::Class(class, attribute) => (element.class_list().contains(class), attribute),
            Self::Tag(tag, attribute) => (element.local_name() == tag, attribute),
        };
        simple && attribute.as_ref().is_none_or(|attribute| attribute.matches(element))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOperator {
    Equals,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeSelector {
    name: String,
    /// `None` for a presence test
    operator: Option<(AttributeOperator, String)>,
    case_insensitive: bool,
}

impl AttributeSelector {
    /// Parse `[name]`, `[name op value]` or `[name op value i]`
    fn parse(selector: &str) -> Self {
        let inner = selector.strip_prefix('[').unwrap_or(selector);
        let inner = inner.split(']').next().unwrap_or_default().trim();

        let (inner, case_insensitive) = match inner.strip_suffix('i') {
            Some(rest) if rest.ends_with(char::is_whitespace) => (rest.trim_end(), true),
            _ => (inner, false),
        };

        let Some(equals) = inner.find('=') else {
            return Self {
                name: inner.to_string(),
                operator: None,
                case_insensitive,
            };
        };
        let (name, operator) = match inner[..equals].chars().last() {
            Some('~') => (&inner[..equals - 1], AttributeOperator::Includes),
            Some('|') => (&inner[..equals - 1], AttributeOperator::DashMatch),
            Some('^') => (&inner[..equals - 1], AttributeOperator::Prefix),
            Some('$') => (&inner[..equals - 1], AttributeOperator::Suffix),
            Some('*') => (&inner[..equals - 1], AttributeOperator::Substring),
            _ => (&inner[..equals], AttributeOperator::Equals),
        };
        let value = unquote(inner[equals + 1..].trim());
        let value = if case_insensitive { value.to_lowercase() } else { value.to_string() };

        Self {
            name: name.trim().to_string(),
            operator: Some((operator, value)),
            case_insensitive,
        }
    }

    fn matches(&self, element: &ElementData) -> bool {
        let Some((operator, expected)) = &self.operator else {
            return element.find_attribute(HTML_NAMESPACE, &self.name).is_some();
        };
        let Some(actual) =
            attribute_value(element, HTML_NAMESPACE, &self.name).filter(|v| !v.is_empty())
        else {
            return false;
        };
        let actual = if self.case_insensitive { actual.to_lowercase() } else { actual };

        match operator {
            AttributeOperator::Equals => actual == *expected,
            AttributeOperator::Includes => actual.split_whitespace().any(|token| token == expected),
            AttributeOperator::DashMatch => {
                actual == *expected
                    || actual
                        .strip_prefix(expected.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttributeOperator::Prefix => actual.starts_with(expected.as_str()),
            AttributeOperator::Suffix => actual.ends_with(expected.as_str()),
            AttributeOperator::Substring => actual.contains(expected.as_str()),
        }
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert!(matches!(Selector::parse("#x"), Selector::Id(ref id, None) if id == "x"));
        assert!(matches!(Selector::parse(".y"), Selector::Class(ref c, None) if c == "y"));
        assert!(matches!(Selector::parse("SPAN"), Selector::Tag(ref t, None) if t == "span"));
        assert!(matches!(Selector::parse("span[class=y]"), Selector::Tag(_, Some(_))));
        assert!(matches!(Selector::parse("[hidden]"), Selector::Attribute(_)));
    }

    #[test]
    fn test_parse_attribute_operators() {
        let selector = AttributeSelector::parse("[lang|=\"EN\" i]");
        assert_eq!(selector.name, "lang");
        assert_eq!(selector.operator, Some((AttributeOperator::DashMatch, "en".to_string())));
        assert!(selector.case_insensitive);

        // A trailing `i` inside the value is not a flag
        let selector = AttributeSelector::parse("[data-x=hi]");
        assert_eq!(selector.operator, Some((AttributeOperator::Equals, "hi".to_string())));
        assert!(!selector.case_insensitive);
    }

    #[test]
    fn test_attribute_matching() {
        let mut element = ElementData::new("a", HTML_NAMESPACE, crate::html::ElementClass::Generic);
        element.store_attribute(HTML_NAMESPACE, "href", "https://example.com/page");
        element.store_attribute(HTML_NAMESPACE, "lang", "en-US");
        element.store_attribute(HTML_NAMESPACE, "empty", "");

        assert!(AttributeSelector::parse("[href^=https]").matches(&element));
        assert!(AttributeSelector::parse("[href$=page]").matches(&element));
        assert!(AttributeSelector::parse("[href*=example]").matches(&element));
        assert!(AttributeSelector::parse("[lang|=en]").matches(&element));
        assert!(!AttributeSelector::parse("[lang|=e]").matches(&element));
        // Names stay case-sensitive
        assert!(!AttributeSelector::parse("[LANG=EN-us i]").matches(&element));
        assert!(AttributeSelector::parse("[lang=EN-us i]").matches(&element));
        assert!(AttributeSelector::parse("[empty]").matches(&element));
        assert!(!AttributeSelector::parse("[empty=]").matches(&element));
    }
}
