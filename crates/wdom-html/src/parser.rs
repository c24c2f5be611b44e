//! Markup parser
//!
//! Walks the input with two patterns, one for tags and comments and one for
//! `name=value` attribute pairs, and feeds the result into a [`TreeSink`].

use std::sync::LazyLock;

use regex::Regex;

use crate::tables::{closed_by_closing, closed_by_opening, is_raw_text, is_self_closing};
use crate::{ParseError, HTML_NAMESPACE, SVG_NAMESPACE};

static MARKUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<!--((?s:.)*?)-->|<(/?)([a-z][-.0-9_a-z]*)([^>]*?)(/?)>")
        .expect("markup pattern is valid")
});

static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(^|\s)([^\s"'>/=]+)\s*=\s*("([^"]+)"|'([^']+)'|(\S+))"#)
        .expect("attribute pattern is valid")
});

/// Receiver of the nodes built by [`parse`].
///
/// Implemented by the DOM so parsed nodes are created through the same paths
/// (and get the same identities) as nodes created by script.
pub trait TreeSink {
    type Handle: Copy + Eq;

    fn create_element(&mut self, namespace: &str, local_name: &str) -> Self::Handle;

    fn create_text(&mut self, data: &str) -> Self::Handle;

    fn create_comment(&mut self, data: &str) -> Self::Handle;

    fn set_attribute(&mut self, element: Self::Handle, name: &str, value: &str);

    fn append_child(&mut self, parent: Self::Handle, child: Self::Handle);

    /// Upper-cased tag name of an element created by this sink.
    fn tag_name(&self, element: Self::Handle) -> String;

    fn first_child(&self, node: Self::Handle) -> Option<Self::Handle>;

    /// Clear the parent pointer of `node` and of its direct children without
    /// reporting a mutation.
    fn release(&mut self, node: Self::Handle);
}

/// Parse `data` as the content of an element named `local_name` in
/// `namespace`.
///
/// Returns a detached wrapper element whose children are the parsed nodes.
/// The wrapper and its direct children have no parent; callers move the
/// children where they belong.
pub fn parse<S: TreeSink>(
    sink: &mut S,
    data: &str,
    namespace: &str,
    local_name: &str,
) -> Result<S::Handle, ParseError> {
    if namespace != HTML_NAMESPACE && namespace != SVG_NAMESPACE {
        return Err(ParseError::UnsupportedNamespace(namespace.to_string()));
    }
    tracing::debug!("Parsing {} bytes of markup into <{}>", data.len(), local_name);

    let data = format!("<q>{data}</q>");
    let root = sink.create_element(namespace, local_name);
    let mut stack = vec![root];
    let mut current_namespace = namespace;
    let mut last_text_pos = 0;
    let mut pos = 0;

    while let Some(caps) = MARKUP_PATTERN.captures_at(&data, pos) {
        let Some(whole) = caps.get(0) else { break };
        let mut parent = stack[stack.len() - 1];

        if last_text_pos < whole.start() {
            let text = sink.create_text(&data[last_text_pos..whole.start()]);
            sink.append_child(parent, text);
        }
        last_text_pos = whole.end();
        pos = whole.end();

        if let Some(comment) = caps.get(1) {
            let node = sink.create_comment(comment.as_str());
            sink.append_child(parent, node);
            continue;
        }

        let closing = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(5).is_some_and(|m| !m.as_str().is_empty());
        let tag_name = caps.get(3).map_or("", |m| m.as_str());
        let attributes = caps.get(4).map_or("", |m| m.as_str());
        let normalized = tag_name.to_ascii_uppercase();

        if normalized == "SVG" {
            current_namespace = if closing { HTML_NAMESPACE } else { SVG_NAMESPACE };
        }

        if !closing {
            if !self_closing && closed_by_opening(&sink.tag_name(parent), &normalized) {
                stack.pop();
                parent = stack[stack.len() - 1];
            }

            let local = if current_namespace == HTML_NAMESPACE {
                tag_name.to_ascii_lowercase()
            } else {
                tag_name.to_string()
            };
            let element = sink.create_element(current_namespace, &local);
            for attr in ATTRIBUTE_PATTERN.captures_iter(attributes) {
                let name = attr.get(2).map_or("", |m| m.as_str());
                let value = attr
                    .get(4)
                    .or_else(|| attr.get(5))
                    .or_else(|| attr.get(6))
                    .map_or("", |m| m.as_str());
                sink.set_attribute(element, name, value);
            }
            sink.append_child(parent, element);
            stack.push(element);

            if is_raw_text(&normalized) {
                let close_markup = format!("</{}>", normalized.to_ascii_lowercase());
                match data[pos..].find(&close_markup) {
                    Some(offset) => pos += offset,
                    None => {
                        return Err(ParseError::CloseMarkupNotFound {
                            tag: normalized.to_ascii_lowercase(),
                        });
                    }
                }
            }
        }

        if tag_name == "foreignObject" {
            current_namespace = if closing { SVG_NAMESPACE } else { HTML_NAMESPACE };
        }

        if closing || self_closing || is_self_closing(&normalized) {
            while stack.len() > 1 {
                let open = sink.tag_name(stack[stack.len() - 1]);
                if open == normalized {
                    stack.pop();
                    break;
                }
                // Close the current tag and retry against its parent
                if closed_by_closing(&open, &normalized) {
                    stack.pop();
                    continue;
                }
                break;
            }
        }
    }

    if stack.len() != 1 {
        return Err(ParseError::InvalidContent);
    }

    let wrapper = sink.first_child(root).ok_or(ParseError::InvalidHtml)?;
    sink.release(wrapper);
    Ok(wrapper)
}
