//! Edge case tests for wdom-html
//!
//! Malformed markup, implied end tags and raw-text handling.

use wdom_html::{parse, ParseError, TreeSink, HTML_NAMESPACE, SVG_NAMESPACE};

/// Sink that serializes the built tree back to markup.
#[derive(Default)]
struct MarkupSink {
    nodes: Vec<Entry>,
}

enum Entry {
    Element { name: String, attrs: Vec<(String, String)>, children: Vec<usize> },
    Text(String),
    Comment(String),
}

impl MarkupSink {
    fn serialize(&self, node: usize) -> String {
        match &self.nodes[node] {
            Entry::Text(text) => text.clone(),
            Entry::Comment(text) => format!("<!--{text}-->"),
            Entry::Element { name, attrs, children } => {
                let mut out = format!("<{name}");
                for (key, value) in attrs {
                    out.push_str(&format!(" {key}=\"{value}\""));
                }
                out.push('>');
                for &child in children {
                    out.push_str(&self.serialize(child));
                }
                out.push_str(&format!("</{name}>"));
                out
            }
        }
    }

    fn inner(&self, node: usize) -> String {
        match &self.nodes[node] {
            Entry::Element { children, .. } => {
                children.iter().map(|&c| self.serialize(c)).collect()
            }
            _ => String::new(),
        }
    }
}

impl TreeSink for MarkupSink {
    type Handle = usize;

    fn create_element(&mut self, _namespace: &str, local_name: &str) -> usize {
        self.nodes.push(Entry::Element {
            name: local_name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn create_text(&mut self, data: &str) -> usize {
        self.nodes.push(Entry::Text(data.to_string()));
        self.nodes.len() - 1
    }

    fn create_comment(&mut self, data: &str) -> usize {
        self.nodes.push(Entry::Comment(data.to_string()));
        self.nodes.len() - 1
    }

    fn set_attribute(&mut self, element: usize, name: &str, value: &str) {
        if let Entry::Element { attrs, .. } = &mut self.nodes[element] {
            attrs.push((name.to_string(), value.to_string()));
        }
    }

    fn append_child(&mut self, parent: usize, child: usize) {
        if let Entry::Element { children, .. } = &mut self.nodes[parent] {
            children.push(child);
        }
    }

    fn tag_name(&self, element: usize) -> String {
        match &self.nodes[element] {
            Entry::Element { name, .. } => name.to_ascii_uppercase(),
            _ => String::new(),
        }
    }

    fn first_child(&self, node: usize) -> Option<usize> {
        match &self.nodes[node] {
            Entry::Element { children, .. } => children.first().copied(),
            _ => None,
        }
    }

    fn release(&mut self, _node: usize) {}
}

fn roundtrip(html: &str) -> Result<String, ParseError> {
    let mut sink = MarkupSink::default();
    let wrapper = parse(&mut sink, html, HTML_NAMESPACE, "div")?;
    Ok(sink.inner(wrapper))
}

// ============================================================================
// EMPTY AND MINIMAL INPUT
// ============================================================================

#[test]
fn test_parse_empty_string() {
    assert_eq!(roundtrip("").unwrap(), "");
}

#[test]
fn test_parse_plain_text() {
    assert_eq!(roundtrip("just text").unwrap(), "just text");
}

// ============================================================================
// IMPLIED END TAGS
// ============================================================================

#[test]
fn test_paragraph_closed_by_div() {
    assert_eq!(
        roundtrip("<div><p>one<div>two</div></div>").unwrap(),
        "<div><p>one</p><div>two</div></div>"
    );
}

#[test]
fn test_table_cells_close_each_other() {
    let html = "<table><tr><td>a<td>b</tr></table>";
    assert_eq!(roundtrip(html).unwrap(), "<table><tr><td>a</td><td>b</td></tr></table>");
}

#[test]
fn test_options_close_each_other() {
    let html = "<select><option>a<option>b</select>";
    assert!(matches!(roundtrip(html), Err(ParseError::InvalidContent)));
}

#[test]
fn test_self_closing_slash() {
    assert_eq!(roundtrip("<span/>x").unwrap(), "<span></span>x");
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

#[test]
fn test_attribute_quoting_styles() {
    let html = "<a href='/x' title=\"t\" data-n=5></a>";
    assert_eq!(roundtrip(html).unwrap(), "<a href=\"/x\" title=\"t\" data-n=\"5\"></a>");
}

#[test]
fn test_attribute_without_value_is_dropped() {
    assert_eq!(roundtrip("<input disabled>").unwrap(), "<input></input>");
}

#[test]
fn test_tag_names_lowercased_in_html() {
    assert_eq!(roundtrip("<DIV CLASS=x></DIV>").unwrap(), "<div CLASS=\"x\"></div>");
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_unclosed_style_fails() {
    assert!(matches!(roundtrip("<style>a{}"), Err(ParseError::CloseMarkupNotFound { .. })));
}

#[test]
fn test_stray_close_tag_fails() {
    assert_eq!(roundtrip("<b>bold</i>"), Err(ParseError::InvalidContent));
}

#[test]
fn test_svg_context_is_supported() {
    let mut sink = MarkupSink::default();
    let wrapper = parse(&mut sink, "<circle r=\"1\"/>", SVG_NAMESPACE, "svg").unwrap();
    assert_eq!(sink.inner(wrapper), "<circle r=\"1\"></circle>");
}
