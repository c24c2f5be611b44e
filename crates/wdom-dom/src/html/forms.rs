//! Form controls
//!
//! Inputs, options and selects keep private state that is not reflected
//! to an attribute (`value`, `checked`, `selected`). Writes to that state
//! are sent to the main thread as property transfers.

use std::fmt;

use crate::attributes::ElementAttributes;
use crate::document::Document;
use crate::html::ElementClass;
use crate::node::{ElementData, ElementState};
use crate::protocol::{TransferMutation, WireProperty};
use crate::reflect::{format_number, parse_number, PropertyValue};
use crate::selector::{has_tag, match_child_element, match_children_elements};
use crate::tree::NodeOperations;
use crate::{DomError, DomResult, NodeIndex};

/// Elements that count as form controls for `elements`
const FORM_CONTROLS: &[&str] =
    &["BUTTON", "FIELDSET", "INPUT", "OBJECT", "OUTPUT", "SELECT", "TEXTAREA"];

/// `size` of a select without an explicit size
const SINGLE_SIZE: i32 = 1;
const MULTIPLE_SIZE: i32 = 4;

/// Calendar date held by a date input, `yyyy-mm-dd` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputDate {
    pub year: i32,
    /// 1-based
    pub month: u32,
    pub day: u32,
}

impl InputDate {
    /// Parse `year-month-day`; `None` unless all three parts form a real date
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split('-');
        let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let date = Self {
            year: year.trim().parse().ok()?,
            month: month.trim().parse().ok()?,
            day: day.trim().parse().ok()?,
        };
        (1..=12).contains(&date.month).then_some(())?;
        (1..=date.days_in_month()).contains(&date.day).then_some(date)
    }

    fn days_in_month(&self) -> u32 {
        match self.month {
            2 if self.year % 4 == 0 && (self.year % 100 != 0 || self.year % 400 == 0) => 29,
            2 => 28,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }
}

impl fmt::Display for InputDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Selectedness of an option element, `false` for anything else
pub(crate) fn option_selected(element: &ElementData) -> bool {
    matches!(element.state, ElementState::Option { selected: true })
}

fn is_option(element: &ElementData) -> bool {
    element.class() == ElementClass::Option
}

fn is_selected_option(element: &ElementData) -> bool {
    is_option(element) && option_selected(element)
}

fn unexpected(index: NodeIndex, expected: &'static str) -> DomError {
    DomError::UnexpectedClass { index: index.get(), expected }
}

/// Keep a select's value consistent when `child` is inserted
pub(crate) fn select_child_inserted(
    document: &mut Document,
    select: NodeIndex,
    child: NodeIndex,
) -> DomResult<()> {
    let Some(option) = document.element(child).filter(|e| is_option(e)) else {
        return Ok(());
    };
    let multiple = document.has_attribute(select, "multiple");
    if (!multiple && option_selected(option)) || document.select_value(select).is_empty() {
        let value = document.option_value(child);
        document.set_select_value(select, &value)?;
    }
    Ok(())
}

/// Fall back to the first option when a single select loses its selection
pub(crate) fn select_child_removed(
    document: &mut Document,
    select: NodeIndex,
    child: NodeIndex,
) -> DomResult<()> {
    let removed_selected = document.element(child).is_some_and(is_selected_option);
    if document.has_attribute(select, "multiple") || !removed_selected {
        return Ok(());
    }
    if let Some(&first) = document.select_options(select).first() {
        let value = document.option_value(first);
        document.set_select_value(select, &value)?;
    }
    Ok(())
}

/// Class-specific property reads for form elements
pub(crate) fn property(
    document: &Document,
    class: ElementClass,
    node: NodeIndex,
    name: &str,
) -> Option<PropertyValue> {
    let value = match (class, name) {
        (ElementClass::Input, "value") => document.input_value(node).ok()?.into(),
        (ElementClass::Input, "checked") => document.input_checked(node).ok()?.into(),
        (ElementClass::Input, "valueAsNumber") => document.value_as_number(node).ok()?.into(),
        (ElementClass::Option, "selected") => {
            document.element(node).is_some_and(option_selected).into()
        }
        (ElementClass::Option, "index") => (document.option_index(node) as f64).into(),
        (ElementClass::Option, "label") => document.option_label(node).into(),
        (ElementClass::Option, "value") => document.option_value(node).into(),
        (ElementClass::Option, "text") => document.text_content(node).into(),
        (ElementClass::Select, "length") => (document.select_options(node).len() as f64).into(),
        (ElementClass::Select, "selectedIndex") => document.selected_index(node).into(),
        (ElementClass::Select, "size") => document.select_size(node).ok()?.into(),
        (ElementClass::Select, "type") => document.select_type(node).into(),
        (ElementClass::Select, "value") => document.select_value(node).into(),
        (ElementClass::Progress, "value") => document.progress_value(node).ok()?.into(),
        (ElementClass::Progress, "position") => document.progress_position(node).ok()?.into(),
        (ElementClass::Form, "length") => (document.form_elements(node).len() as f64).into(),
        (ElementClass::FieldSet, "type") => document.tag_name(node)?.to_lowercase().into(),
        _ => return None,
    };
    Some(value)
}

/// Class-specific property writes; `false` when `name` is not handled here
pub(crate) fn set_property(
    document: &mut Document,
    class: ElementClass,
    node: NodeIndex,
    name: &str,
    value: &PropertyValue,
) -> DomResult<bool> {
    match (class, name) {
        (ElementClass::Input, "value") => document.set_input_value(node, &value.to_string())?,
        (ElementClass::Input, "checked") => document.set_input_checked(node, value.as_bool())?,
        (ElementClass::Input, "valueAsNumber") => {
            let number = match value {
                PropertyValue::Num(number) => Some(*number),
                _ => None,
            };
            document.set_value_as_number(node, number)?;
        }
        (ElementClass::Option, "selected") => document.set_option_selected(node, value.as_bool())?,
        (ElementClass::Option, "label") => {
            document.set_attribute(node, "label", &value.to_string())?
        }
        (ElementClass::Option, "value") => {
            document.set_attribute(node, "value", &value.to_string())?
        }
        (ElementClass::Option, "text") => document.set_text_content(node, &value.to_string())?,
        (ElementClass::Select, "selectedIndex") => {
            document.set_selected_index(node, value.as_number() as i64)?
        }
        (ElementClass::Select, "size") => document.set_select_size(node, value.as_number() as i32)?,
        (ElementClass::Select, "value") => document.set_select_value(node, &value.to_string())?,
        (ElementClass::Progress, "value") => document.set_progress_value(node, value.as_number())?,
        _ => return Ok(false),
    }
    Ok(true)
}

impl Document {
    // ========================================================================
    // INPUT
    // ========================================================================

    pub fn input_value(&self, input: NodeIndex) -> DomResult<&str> {
        match &self.try_element(input)?.state {
            ElementState::Input { value, .. } => Ok(value),
            _ => Err(unexpected(input, "HTMLInputElement")),
        }
    }

    /// Set the live value and send it as a `value` property transfer
    pub fn set_input_value(&mut self, input: NodeIndex, new_value: &str) -> DomResult<()> {
        match &mut self.element_mut(input)?.state {
            ElementState::Input { value, .. } => *value = new_value.to_string(),
            _ => return Err(unexpected(input, "HTMLInputElement")),
        }
        let name = self.runtime.store_string("value");
        let value = self.runtime.store_string(new_value);
        self.runtime.transfer(TransferMutation::Properties {
            target: input,
            name,
            value: WireProperty::Str(value),
        });
        Ok(())
    }

    pub fn input_checked(&self, input: NodeIndex) -> DomResult<bool> {
        match self.try_element(input)?.state {
            ElementState::Input { checked, .. } => Ok(checked),
            _ => Err(unexpected(input, "HTMLInputElement")),
        }
    }

    /// Set checkedness; unchanged values send nothing
    pub fn set_input_checked(&mut self, input: NodeIndex, new_checked: bool) -> DomResult<()> {
        match &mut self.element_mut(input)?.state {
            ElementState::Input { checked, .. } if *checked == new_checked => return Ok(()),
            ElementState::Input { checked, .. } => *checked = new_checked,
            _ => return Err(unexpected(input, "HTMLInputElement")),
        }
        let name = self.runtime.store_string("checked");
        self.runtime.transfer(TransferMutation::Properties {
            target: input,
            name,
            value: WireProperty::Bool(new_checked),
        });
        Ok(())
    }

    /// `NaN` for an empty value
    pub fn value_as_number(&self, input: NodeIndex) -> DomResult<f64> {
        let value = self.input_value(input)?;
        Ok(if value.is_empty() { f64::NAN } else { parse_number(value) })
    }

    /// `None` clears the value
    pub fn set_value_as_number(&mut self, input: NodeIndex, number: Option<f64>) -> DomResult<()> {
        let value = number.map(format_number).unwrap_or_default();
        self.set_input_value(input, &value)
    }

    pub fn value_as_date(&self, input: NodeIndex) -> DomResult<Option<InputDate>> {
        Ok(InputDate::parse(self.input_value(input)?))
    }

    pub fn set_value_as_date(&mut self, input: NodeIndex, date: InputDate) -> DomResult<()> {
        self.set_input_value(input, &date.to_string())
    }

    /// Labels in the document whose `for` names this control's id
    pub fn labels(&self, control: NodeIndex) -> Vec<NodeIndex> {
        let id = self.element(control).map(ElementData::id).unwrap_or_default();
        if id.is_empty() {
            return Vec::new();
        }
        match_children_elements(self, self.document_element(), |element| {
            has_tag(element, &["LABEL"])
                && element
                    .find_attribute(crate::HTML_NAMESPACE, "for")
                    .is_some_and(|attr| attr.value == id)
        })
    }

    // ========================================================================
    // OPTION
    // ========================================================================

    /// Mark an option (un)selected. Always transferred.
    pub fn set_option_selected(&mut self, option: NodeIndex, new_selected: bool) -> DomResult<()> {
        match &mut self.element_mut(option)?.state {
            ElementState::Option { selected } => *selected = new_selected,
            _ => return Err(unexpected(option, "HTMLOptionElement")),
        }
        let name = self.runtime.store_string("selected");
        self.runtime.transfer(TransferMutation::Properties {
            target: option,
            name,
            value: WireProperty::Bool(new_selected),
        });
        Ok(())
    }

    /// Position among the parent's element children, `0` when detached
    pub fn option_index(&self, option: NodeIndex) -> usize {
        self.parent_node(option)
            .and_then(|parent| self.children(parent).iter().position(|&child| child == option))
            .unwrap_or(0)
    }

    pub fn option_label(&self, option: NodeIndex) -> String {
        self.get_attribute(option, "label")
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| self.text_content(option))
    }

    pub fn option_value(&self, option: NodeIndex) -> String {
        self.get_attribute(option, "value")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.text_content(option))
    }

    // ========================================================================
    // SELECT
    // ========================================================================

    /// Option element children
    pub fn select_options(&self, select: NodeIndex) -> Vec<NodeIndex> {
        self.children(select)
            .into_iter()
            .filter(|&child| self.element(child).is_some_and(is_option))
            .collect()
    }

    /// Index among the element children of the first selected option,
    /// `-1` when nothing is selected
    pub fn selected_index(&self, select: NodeIndex) -> i32 {
        match_child_element(self, select, is_selected_option)
            .and_then(|selected| self.children(select).iter().position(|&child| child == selected))
            .map_or(-1, |index| index as i32)
    }

    pub fn set_selected_index(&mut self, select: NodeIndex, selected_index: i64) -> DomResult<()> {
        for (index, child) in self.children(select).into_iter().enumerate() {
            if self.element(child).is_some_and(is_option) {
                self.set_option_selected(child, index as i64 == selected_index)?;
            }
        }
        Ok(())
    }

    pub fn selected_options(&self, select: NodeIndex) -> Vec<NodeIndex> {
        match_children_elements(self, select, is_selected_option)
    }

    pub fn select_size(&self, select: NodeIndex) -> DomResult<i32> {
        match self.try_element(select)?.state {
            ElementState::Select { size } if size > 0 => Ok(size),
            ElementState::Select { .. } => Ok(self.default_select_size(select)),
            _ => Err(unexpected(select, "HTMLSelectElement")),
        }
    }

    /// Non-positive sizes fall back to the default for the select's mode
    pub fn set_select_size(&mut self, select: NodeIndex, new_size: i32) -> DomResult<()> {
        let resolved = if new_size > 0 { new_size } else { self.default_select_size(select) };
        match &mut self.element_mut(select)?.state {
            ElementState::Select { size } => *size = resolved,
            _ => return Err(unexpected(select, "HTMLSelectElement")),
        }
        Ok(())
    }

    fn default_select_size(&self, select: NodeIndex) -> i32 {
        if self.has_attribute(select, "multiple") {
            MULTIPLE_SIZE
        } else {
            SINGLE_SIZE
        }
    }

    pub fn select_type(&self, select: NodeIndex) -> &'static str {
        if self.has_attribute(select, "multiple") {
            "select-multiple"
        } else {
            "select-one"
        }
    }

    /// Value of the first selected option, `""` when none
    pub fn select_value(&self, select: NodeIndex) -> String {
        match_child_element(self, select, is_selected_option)
            .map(|option| self.option_value(option))
            .unwrap_or_default()
    }

    /// Select every option child whose value equals `value`
    pub fn set_select_value(&mut self, select: NodeIndex, value: &str) -> DomResult<()> {
        for option in self.select_options(select) {
            let selected = self.option_value(option) == value;
            self.set_option_selected(option, selected)?;
        }
        Ok(())
    }

    // ========================================================================
    // PROGRESS, LABEL, FORM, FIELDSET, MAP, DATALIST
    // ========================================================================

    pub fn progress_value(&self, progress: NodeIndex) -> DomResult<f64> {
        match self.try_element(progress)?.state {
            ElementState::Progress { value, .. } => Ok(value),
            _ => Err(unexpected(progress, "HTMLProgressElement")),
        }
    }

    pub fn set_progress_value(&mut self, progress: NodeIndex, new_value: f64) -> DomResult<()> {
        match &mut self.element_mut(progress)?.state {
            ElementState::Progress { indeterminate, value } => {
                *indeterminate = false;
                *value = new_value;
                Ok(())
            }
            _ => Err(unexpected(progress, "HTMLProgressElement")),
        }
    }

    /// `value / max`, or `-1` while no value was ever assigned
    pub fn progress_position(&self, progress: NodeIndex) -> DomResult<f64> {
        match self.try_element(progress)?.state {
            ElementState::Progress { indeterminate: true, .. } => Ok(-1.0),
            ElementState::Progress { value, .. } => {
                let max = self.property(progress, "max")?.as_number();
                Ok(value / max)
            }
            _ => Err(unexpected(progress, "HTMLProgressElement")),
        }
    }

    /// Element named by the label's `for`, else its first descendant input
    pub fn label_control(&self, label: NodeIndex) -> Option<NodeIndex> {
        match self.get_attribute(label, "for") {
            Some(id) => self.get_element_by_id(&id),
            None => match_child_element(self, label, |element| has_tag(element, &["INPUT"])),
        }
    }

    /// Descendant form controls of a form or fieldset
    pub fn form_elements(&self, container: NodeIndex) -> Vec<NodeIndex> {
        match_children_elements(self, container, |element| has_tag(element, FORM_CONTROLS))
    }

    pub fn map_areas(&self, map: NodeIndex) -> Vec<NodeIndex> {
        match_children_elements(self, map, |element| has_tag(element, &["AREA"]))
    }

    /// Option children of a datalist
    pub fn datalist_options(&self, datalist: NodeIndex) -> Vec<NodeIndex> {
        self.node(datalist)
            .map(|node| {
                node.child_nodes()
                    .iter()
                    .copied()
                    .filter(|&child| self.node(child).is_some_and(|c| c.node_name() == "OPTION"))
                    .collect()
            })
            .unwrap_or_default()
    }
}
