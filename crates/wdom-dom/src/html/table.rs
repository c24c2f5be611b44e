//! Tables
//!
//! Table parts are found by tag name among descendants, so rows inside
//! sections count as rows of the table.

use crate::document::Document;
use crate::html::ElementClass;
use crate::reflect::PropertyValue;
use crate::selector::{has_tag, match_child_element, match_children_elements, match_nearest_parent};
use crate::tree::NodeOperations;
use crate::{DomResult, NodeIndex};

/// Class-specific property reads for table elements
pub(crate) fn property(
    document: &Document,
    class: ElementClass,
    node: NodeIndex,
    name: &str,
) -> Option<PropertyValue> {
    let value = match (class, name) {
        (ElementClass::TableRow, "rowIndex") => document.row_index(node).into(),
        (ElementClass::TableRow, "sectionRowIndex") => document.section_row_index(node).into(),
        (ElementClass::TableCell, "cellIndex") => document.cell_index(node).into(),
        _ => return None,
    };
    Some(value)
}

fn position(nodes: &[NodeIndex], node: NodeIndex) -> i32 {
    nodes.iter().position(|&n| n == node).map_or(-1, |index| index as i32)
}

impl Document {
    // ========================================================================
    // TABLE
    // ========================================================================

    pub fn table_caption(&self, table: NodeIndex) -> Option<NodeIndex> {
        match_child_element(self, table, |element| has_tag(element, &["CAPTION"]))
    }

    /// Replace the caption with `caption`, placed first. Anything but a
    /// `<caption>` is ignored.
    pub fn set_table_caption(&mut self, table: NodeIndex, caption: NodeIndex) -> DomResult<()> {
        if self.tag_name(caption) != Some("CAPTION") {
            return Ok(());
        }
        if let Some(existing) = self.table_caption(table) {
            self.remove(existing)?;
        }
        let first = self.first_element_child(table);
        self.insert_before(table, caption, first)?;
        Ok(())
    }

    pub fn table_head(&self, table: NodeIndex) -> Option<NodeIndex> {
        match_child_element(self, table, |element| has_tag(element, &["THEAD"]))
    }

    /// Replace the head with `head`, placed after any caption and colgroups
    pub fn set_table_head(&mut self, table: NodeIndex, head: NodeIndex) -> DomResult<()> {
        if self.tag_name(head) != Some("THEAD") {
            return Ok(());
        }
        if let Some(existing) = self.table_head(table) {
            self.remove(existing)?;
        }
        self.insert_before_first_other(table, head, &["CAPTION", "COLGROUP"])
    }

    pub fn table_foot(&self, table: NodeIndex) -> Option<NodeIndex> {
        match_child_element(self, table, |element| has_tag(element, &["TFOOT"]))
    }

    /// Replace the foot with `foot`, placed after any caption, colgroups and
    /// head
    pub fn set_table_foot(&mut self, table: NodeIndex, foot: NodeIndex) -> DomResult<()> {
        if self.tag_name(foot) != Some("TFOOT") {
            return Ok(());
        }
        if let Some(existing) = self.table_foot(table) {
            self.remove(existing)?;
        }
        self.insert_before_first_other(table, foot, &["CAPTION", "COLGROUP", "THEAD"])
    }

    /// Insert `element` before the first element child not named in
    /// `skipped`, or append it
    fn insert_before_first_other(
        &mut self,
        parent: NodeIndex,
        element: NodeIndex,
        skipped: &[&str],
    ) -> DomResult<()> {
        let reference = self
            .children(parent)
            .into_iter()
            .find(|&child| self.element(child).is_some_and(|e| !has_tag(e, skipped)));
        self.insert_before(parent, element, reference)?;
        Ok(())
    }

    /// Every `<tr>` under a table or section
    pub fn table_rows(&self, node: NodeIndex) -> Vec<NodeIndex> {
        match_children_elements(self, node, |element| has_tag(element, &["TR"]))
    }

    pub fn table_bodies(&self, table: NodeIndex) -> Vec<NodeIndex> {
        match_children_elements(self, table, |element| has_tag(element, &["TBODY"]))
    }

    // ========================================================================
    // ROWS AND SECTIONS
    // ========================================================================

    pub fn row_cells(&self, row: NodeIndex) -> Vec<NodeIndex> {
        match_children_elements(self, row, |element| has_tag(element, &["TD", "TH"]))
    }

    /// Create a `<td>` and place it before the `index`th element child.
    /// Out-of-range and negative indices append.
    pub fn insert_cell(&mut self, row: NodeIndex, index: i32) -> DomResult<NodeIndex> {
        let cell = self.create_element("td");
        self.insert_at(row, cell, index, self.row_cells(row).len())?;
        Ok(cell)
    }

    pub fn delete_cell(&mut self, row: NodeIndex, index: usize) -> DomResult<()> {
        if let Some(&cell) = self.row_cells(row).get(index) {
            self.remove(cell)?;
        }
        Ok(())
    }

    /// Create a `<tr>` in a section, placed like [`Document::insert_cell`]
    pub fn insert_row(&mut self, section: NodeIndex, index: i32) -> DomResult<NodeIndex> {
        let row = self.create_element("tr");
        self.insert_at(section, row, index, self.table_rows(section).len())?;
        Ok(row)
    }

    pub fn delete_row(&mut self, section: NodeIndex, index: usize) -> DomResult<()> {
        if let Some(&row) = self.table_rows(section).get(index) {
            self.remove(row)?;
        }
        Ok(())
    }

    fn insert_at(
        &mut self,
        parent: NodeIndex,
        child: NodeIndex,
        index: i32,
        count: usize,
    ) -> DomResult<()> {
        let reference = usize::try_from(index)
            .ok()
            .filter(|&index| index < count)
            .and_then(|index| self.children(parent).get(index).copied());
        match reference {
            Some(reference) => self.insert_before(parent, child, Some(reference)).map(drop),
            None => self.append_child(parent, child).map(drop),
        }
    }

    /// Position among the rows of the enclosing table, `-1` outside one
    pub fn row_index(&self, row: NodeIndex) -> i32 {
        match_nearest_parent(self, row, |element| has_tag(element, &["TABLE"]))
            .map_or(-1, |table| position(&self.table_rows(table), row))
    }

    /// Position among the rows of the enclosing section or table
    pub fn section_row_index(&self, row: NodeIndex) -> i32 {
        match_nearest_parent(self, row, |element| {
            has_tag(element, &["TABLE", "TBODY", "THEAD", "TFOOT"])
        })
        .map_or(-1, |section| position(&self.table_rows(section), row))
    }

    /// Position among the cells of the enclosing row, `-1` outside one
    pub fn cell_index(&self, cell: NodeIndex) -> i32 {
        match_nearest_parent(self, cell, |element| has_tag(element, &["TR"]))
            .map_or(-1, |row| position(&self.row_cells(row), cell))
    }
}
