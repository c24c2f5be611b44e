//! HTML element classes
//!
//! Elements are created with an [`ElementClass`] chosen from their
//! namespace and local name. The class decides which properties are
//! reflected onto attributes, which extra token lists the element owns,
//! and which behavior (form controls, tables) applies to it.
//!
//! Script-style access goes through [`Document::property`] and
//! [`Document::set_property`]; typed accessors live in [`forms`] and
//! [`table`].

pub mod forms;
pub mod table;

use crate::attributes::ElementAttributes;
use crate::document::Document;
use crate::node::NodeType;
use crate::reflect::{self, PropertyValue, Reflected};
use crate::selector::{has_tag, match_nearest_parent};
use crate::tree::NodeOperations;
use crate::{DomResult, NodeIndex, HTML_NAMESPACE};

/// Element class, one per registered `HTML*Element` constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementClass {
    /// Plain `HTMLElement`
    #[default]
    Generic,
    Anchor,
    Button,
    Data,
    Embed,
    FieldSet,
    Form,
    IFrame,
    Image,
    Input,
    Label,
    Link,
    Map,
    Meter,
    Mod,
    OList,
    Option,
    Progress,
    Quote,
    Script,
    Select,
    Source,
    Style,
    TableCell,
    TableCol,
    Table,
    TableRow,
    TableSection,
    Time,
    DataList,
}

impl ElementClass {
    pub const ALL: [ElementClass; 30] = [
        Self::Generic,
        Self::Anchor,
        Self::Button,
        Self::Data,
        Self::Embed,
        Self::FieldSet,
        Self::Form,
        Self::IFrame,
        Self::Image,
        Self::Input,
        Self::Label,
        Self::Link,
        Self::Map,
        Self::Meter,
        Self::Mod,
        Self::OList,
        Self::Option,
        Self::Progress,
        Self::Quote,
        Self::Script,
        Self::Select,
        Self::Source,
        Self::Style,
        Self::TableCell,
        Self::TableCol,
        Self::Table,
        Self::TableRow,
        Self::TableSection,
        Self::Time,
        Self::DataList,
    ];

    /// Class registered for `namespace_uri:local_name`. Only HTML names are
    /// registered; everything else is a plain element.
    pub fn for_name(namespace_uri: &str, local_name: &str) -> Self {
        if namespace_uri != HTML_NAMESPACE {
            return Self::Generic;
        }
        match local_name {
            "a" => Self::Anchor,
            "button" => Self::Button,
            "data" => Self::Data,
            "embed" => Self::Embed,
            "fieldset" => Self::FieldSet,
            "form" => Self::Form,
            "iframe" => Self::IFrame,
            "img" => Self::Image,
            "input" => Self::Input,
            "label" => Self::Label,
            "link" => Self::Link,
            "map" => Self::Map,
            "meter" => Self::Meter,
            "del" | "ins" => Self::Mod,
            "ol" => Self::OList,
            "option" => Self::Option,
            "progress" => Self::Progress,
            "blockquote" | "q" => Self::Quote,
            "script" => Self::Script,
            "select" => Self::Select,
            "source" => Self::Source,
            "style" => Self::Style,
            "td" | "th" => Self::TableCell,
            "col" => Self::TableCol,
            "table" => Self::Table,
            "tr" => Self::TableRow,
            "thead" | "tfoot" | "tbody" => Self::TableSection,
            "time" => Self::Time,
            "datalist" => Self::DataList,
            _ => Self::Generic,
        }
    }

    /// Constructor name exposed on the worker global
    pub fn constructor_name(self) -> &'static str {
        match self {
            Self::Generic => "HTMLElement",
            Self::Anchor => "HTMLAnchorElement",
            Self::Button => "HTMLButtonElement",
            Self::Data => "HTMLDataElement",
            Self::Embed => "HTMLEmbedElement",
            Self::FieldSet => "HTMLFieldSetElement",
            Self::Form => "HTMLFormElement",
            Self::IFrame => "HTMLIFrameElement",
            Self::Image => "HTMLImageElement",
            Self::Input => "HTMLInputElement",
            Self::Label => "HTMLLabelElement",
            Self::Link => "HTMLLinkElement",
            Self::Map => "HTMLMapElement",
            Self::Meter => "HTMLMeterElement",
            Self::Mod => "HTMLModElement",
            Self::OList => "HTMLOListElement",
            Self::Option => "HTMLOptionElement",
            Self::Progress => "HTMLProgressElement",
            Self::Quote => "HTMLQuoteElement",
            Self::Script => "HTMLScriptElement",
            Self::Select => "HTMLSelectElement",
            Self::Source => "HTMLSourceElement",
            Self::Style => "HTMLStyleElement",
            Self::TableCell => "HTMLTableCellElement",
            Self::TableCol => "HTMLTableColElement",
            Self::Table => "HTMLTableElement",
            Self::TableRow => "HTMLTableRowElement",
            Self::TableSection => "HTMLTableSectionElement",
            Self::Time => "HTMLTimeElement",
            Self::DataList => "HTMLDataListElement",
        }
    }

    /// Attributes besides `class` that are backed by a token list
    pub fn token_list_attributes(self) -> &'static [&'static str] {
        match self {
            Self::Anchor | Self::Link => &["rel"],
            Self::IFrame => &["sandbox"],
            Self::TableCell => &["headers"],
            _ => &[],
        }
    }

    /// Reflection table of this class alone
    pub(crate) fn reflected(self) -> &'static [Reflected] {
        match self {
            Self::Generic
            | Self::Table
            | Self::TableRow
            | Self::TableSection
            | Self::DataList => &[],
            Self::Anchor => ANCHOR,
            Self::Button => BUTTON,
            Self::Data => DATA,
            Self::Embed => EMBED,
            Self::FieldSet => FIELDSET,
            Self::Form => FORM,
            Self::IFrame => IFRAME,
            Self::Image => IMAGE,
            Self::Input => INPUT,
            Self::Label => LABEL,
            Self::Link => LINK,
            Self::Map => MAP,
            Self::Meter => METER,
            Self::Mod => MOD,
            Self::OList => OLIST,
            Self::Option => OPTION,
            Self::Progress => PROGRESS,
            Self::Quote => QUOTE,
            Self::Script => SCRIPT,
            Self::Select => SELECT,
            Self::Source => SOURCE,
            Self::Style => STYLE,
            Self::TableCell => TABLE_CELL,
            Self::TableCol => TABLE_COL,
            Self::Time => TIME,
        }
    }

    /// Reflected `property`, looked up from the class up to `Element`
    pub(crate) fn reflected_property(self, property: &str) -> Option<&'static Reflected> {
        reflect::find(self.reflected(), property)
            .or_else(|| reflect::find(HTML_ELEMENT, property))
            .or_else(|| reflect::find(ELEMENT, property))
    }
}

// ============================================================================
// REFLECTION TABLES
// ============================================================================

const ELEMENT: &[Reflected] = &[Reflected::string("id", "")];

const HTML_ELEMENT: &[Reflected] = &[
    Reflected::string("accessKey", ""),
    Reflected::string("contentEditable", "inherit"),
    Reflected::string("dir", ""),
    Reflected::string("lang", ""),
    Reflected::string("title", ""),
    Reflected::keywords("draggable", false, "true", "false"),
    Reflected::boolean("hidden"),
    Reflected::boolean("noModule"),
    Reflected::keywords("spellcheck", true, "true", "false"),
    Reflected::keywords("translate", true, "yes", "no"),
];

const ANCHOR: &[Reflected] = &[
    Reflected::string("href", ""),
    Reflected::string("hreflang", ""),
    Reflected::string("media", ""),
    Reflected::string("target", ""),
    Reflected::string("type", ""),
];

const BUTTON: &[Reflected] = &[
    Reflected::string("formAction", ""),
    Reflected::string("formEnctype", ""),
    Reflected::string("formMethod", ""),
    Reflected::string("formTarget", ""),
    Reflected::string("name", ""),
    Reflected::string("type", "submit"),
    Reflected::string("value", ""),
    Reflected::boolean("autofocus"),
    Reflected::boolean("disabled"),
];

const DATA: &[Reflected] = &[Reflected::string("value", "")];

const EMBED: &[Reflected] = &[
    Reflected::string("height", ""),
    Reflected::string("src", ""),
    Reflected::string("type", ""),
    Reflected::string("width", ""),
];

const FIELDSET: &[Reflected] = &[Reflected::string("name", ""), Reflected::boolean("disabled")];

const FORM: &[Reflected] = &[
    Reflected::string("name", ""),
    Reflected::string("method", "get"),
    Reflected::string("target", ""),
    Reflected::string("action", ""),
    Reflected::string("enctype", "application/x-www-form-urlencoded"),
    Reflected::string("acceptCharset", "").attribute("accept-charset"),
    Reflected::string("autocomplete", "on"),
    Reflected::string("autocapitalize", "sentences"),
];

const IFRAME: &[Reflected] = &[
    Reflected::string("allow", ""),
    Reflected::boolean("allowFullscreen"),
    Reflected::string("csp", ""),
    Reflected::string("height", ""),
    Reflected::string("name", ""),
    Reflected::string("referrerPolicy", ""),
    Reflected::string("src", ""),
    Reflected::string("srcdoc", ""),
    Reflected::string("width", ""),
];

const IMAGE: &[Reflected] = &[
    Reflected::string("alt", ""),
    Reflected::string("crossOrigin", ""),
    Reflected::number("height", 0.0),
    Reflected::boolean("isMap"),
    Reflected::string("referrerPolicy", ""),
    Reflected::string("src", ""),
    Reflected::string("sizes", ""),
    Reflected::string("srcset", ""),
    Reflected::string("useMap", ""),
    Reflected::number("width", 0.0),
];

const INPUT: &[Reflected] = &[
    Reflected::string("accept", ""),
    Reflected::string("alt", ""),
    Reflected::string("autocapitalize", ""),
    Reflected::string("autocomplete", ""),
    Reflected::boolean("autofocus"),
    Reflected::boolean("defaultChecked").attribute("checked"),
    Reflected::string("defaultValue", "").attribute("value"),
    Reflected::string("dirName", ""),
    Reflected::boolean("disabled"),
    Reflected::string("formAction", ""),
    Reflected::string("formEncType", ""),
    Reflected::string("formMethod", ""),
    Reflected::string("formTarget", ""),
    Reflected::number("height", 0.0),
    Reflected::string("max", ""),
    Reflected::number("maxLength", 0.0),
    Reflected::string("min", ""),
    Reflected::boolean("multiple"),
    Reflected::string("name", ""),
    Reflected::string("pattern", ""),
    Reflected::string("placeholder", ""),
    Reflected::boolean("readOnly"),
    Reflected::boolean("required"),
    Reflected::number("size", 0.0),
    Reflected::string("src", ""),
    Reflected::string("step", ""),
    Reflected::string("type", "text"),
    Reflected::number("width", 0.0),
];

const LABEL: &[Reflected] = &[Reflected::string("htmlFor", "").attribute("for")];

const LINK: &[Reflected] = &[
    Reflected::string("as", ""),
    Reflected::string("crossOrigin", ""),
    Reflected::boolean("disabled"),
    Reflected::string("href", ""),
    Reflected::string("hreflang", ""),
    Reflected::string("media", ""),
    Reflected::string("referrerPolicy", ""),
    Reflected::string("sizes", ""),
    Reflected::string("type", ""),
];

const MAP: &[Reflected] = &[Reflected::string("name", "")];

const METER: &[Reflected] = &[
    Reflected::number("high", 0.0),
    Reflected::number("low", 0.0),
    Reflected::number("max", 1.0),
    Reflected::number("min", 0.0),
    Reflected::number("optimum", 0.0),
    Reflected::number("value", 0.0),
];

const MOD: &[Reflected] = &[Reflected::string("cite", ""), Reflected::string("datetime", "")];

const OLIST: &[Reflected] = &[
    Reflected::boolean("reversed"),
    Reflected::number("start", 1.0),
    Reflected::string("type", ""),
];

const OPTION: &[Reflected] = &[
    Reflected::boolean("defaultSelected").attribute("selected"),
    Reflected::boolean("disabled"),
    Reflected::string("type", ""),
];

const PROGRESS: &[Reflected] = &[Reflected::number("max", 1.0)];

const QUOTE: &[Reflected] = &[Reflected::string("cite", "")];

const SCRIPT: &[Reflected] = &[
    Reflected::string("type", ""),
    Reflected::string("src", ""),
    Reflected::string("charset", ""),
    Reflected::boolean("async"),
    Reflected::boolean("defer"),
    Reflected::string("crossOrigin", ""),
    Reflected::boolean("noModule"),
];

const SELECT: &[Reflected] = &[
    Reflected::boolean("multiple"),
    Reflected::string("name", ""),
    Reflected::boolean("required"),
];

const SOURCE: &[Reflected] = &[
    Reflected::string("media", ""),
    Reflected::string("sizes", ""),
    Reflected::string("src", ""),
    Reflected::string("srcset", ""),
    Reflected::string("type", ""),
];

const STYLE: &[Reflected] = &[Reflected::string("media", ""), Reflected::string("type", "")];

const TABLE_CELL: &[Reflected] = &[
    Reflected::string("abbr", ""),
    Reflected::number("colSpan", 1.0),
    Reflected::number("rowSpan", 1.0),
    Reflected::string("scope", ""),
];

const TABLE_COL: &[Reflected] = &[Reflected::number("span", 1.0)];

const TIME: &[Reflected] = &[Reflected::string("dateTime", "")];

// ============================================================================
// PROPERTY ACCESS
// ============================================================================

impl Document {
    /// Read a property by its script name.
    ///
    /// Lookup order: class behavior, reflected attributes, the common node
    /// properties, then expando values. Unknown names read as `Null`.
    pub fn property(&self, node: NodeIndex, name: &str) -> DomResult<PropertyValue> {
        let entry = self.try_node(node)?;
        let Some(element) = entry.as_element() else {
            return Ok(self.character_data_property(node, name));
        };
        let class = element.class();

        if let Some(value) = self.class_property(class, node, name) {
            return Ok(value);
        }
        if let Some(reflected) = class.reflected_property(name) {
            return Ok(reflected.get(self, node));
        }
        if let Some(value) = self.element_property(node, name) {
            return Ok(value);
        }
        Ok(element.expando.get(name).cloned().unwrap_or(PropertyValue::Null))
    }

    /// Write a property by its script name. Read-only names are ignored.
    pub fn set_property(
        &mut self,
        node: NodeIndex,
        name: &str,
        value: PropertyValue,
    ) -> DomResult<()> {
        let entry = self.try_node(node)?;
        let Some(element) = entry.as_element() else {
            return match name {
                "data" | "nodeValue" | "textContent" => self.set_data(node, &value.to_string()),
                _ => Ok(()),
            };
        };
        let class = element.class();

        if self.set_class_property(class, node, name, &value)? {
            return Ok(());
        }
        if let Some(reflected) = class.reflected_property(name) {
            return reflected.set(self, node, &value);
        }
        match name {
            "textContent" => self.set_text_content(node, &value.to_string()),
            "innerHTML" => self.set_inner_html(node, &value.to_string()),
            "className" => self.set_attribute(node, "class", &value.to_string()),
            "tagName" | "nodeName" | "nodeType" | "localName" | "namespaceURI" | "outerHTML"
            | "childElementCount" | "isConnected" => {
                tracing::trace!("Ignoring write to read-only property {} on {}", name, node);
                Ok(())
            }
            _ => {
                self.element_mut(node)?.expando.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    /// `HTMLElement.form`: closest `<form>` ancestor
    pub fn form_owner(&self, element: NodeIndex) -> Option<NodeIndex> {
        match_nearest_parent(self, element, |e| has_tag(e, &["FORM"]))
    }

    fn class_property(
        &self,
        class: ElementClass,
        node: NodeIndex,
        name: &str,
    ) -> Option<PropertyValue> {
        if let Some(value) = forms::property(self, class, node, name) {
            return Some(value);
        }
        if let Some(value) = table::property(self, class, node, name) {
            return Some(value);
        }
        match (class, name) {
            (ElementClass::Anchor, "text") => Some(self.text_content(node).into()),
            _ => None,
        }
    }

    fn set_class_property(
        &mut self,
        class: ElementClass,
        node: NodeIndex,
        name: &str,
        value: &PropertyValue,
    ) -> DomResult<bool> {
        if forms::set_property(self, class, node, name, value)? {
            return Ok(true);
        }
        match (class, name) {
            (ElementClass::Anchor, "text") => {
                self.set_text_content(node, &value.to_string())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn element_property(&self, node: NodeIndex, name: &str) -> Option<PropertyValue> {
        let entry = self.node(node)?;
        let element = entry.as_element()?;
        let value = match name {
            "textContent" => self.text_content(node).into(),
            "innerHTML" => self.inner_html(node).into(),
            "outerHTML" => self.outer_html(node).into(),
            "tagName" | "nodeName" => entry.node_name().into(),
            "nodeType" => f64::from(u16::from(entry.node_type())).into(),
            "localName" => element.local_name().into(),
            "namespaceURI" => element.namespace_uri().into(),
            "className" => element.class_list().value().into(),
            "childElementCount" => (self.child_element_count(node) as f64).into(),
            "isConnected" => entry.is_connected().into(),
            _ => return None,
        };
        Some(value)
    }

    fn character_data_property(&self, node: NodeIndex, name: &str) -> PropertyValue {
        let Some(entry) = self.node(node) else {
            return PropertyValue::Null;
        };
        match name {
            "data" | "nodeValue" | "textContent" => {
                entry.character_data().map(str::to_string).into()
            }
            "length" => entry
                .character_data()
                .map(|data| data.encode_utf16().count() as f64)
                .into(),
            "nodeName" => entry.node_name().into(),
            "nodeType" => f64::from(u16::from(entry.node_type())).into(),
            "isConnected" => entry.is_connected().into(),
            _ if entry.node_type() == NodeType::DocumentFragment && name == "childElementCount" => {
                (self.child_element_count(node) as f64).into()
            }
            _ => PropertyValue::Null,
        }
    }
}
