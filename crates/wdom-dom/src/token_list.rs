//! DOMTokenList
//!
//! Space-separated token sets backing `class`, `rel`, `sandbox` and
//! `headers`. The list lives on the element; [`TokenListMut`] writes every
//! change back to the attribute and records an `ATTRIBUTES` mutation.

use crate::document::Document;
use crate::observer::{MutationRecord, MutationType};
use crate::protocol::TransferMutation;
use crate::{DomError, DomResult, NodeIndex};

/// Ordered, de-duplicated token set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomTokenList {
    attribute_name: String,
    tokens: Vec<String>,
}

impl DomTokenList {
    pub fn new(attribute_name: &str) -> Self {
        Self {
            attribute_name: attribute_name.to_string(),
            tokens: Vec::new(),
        }
    }

    /// Attribute this list reflects
    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Tokens joined by a single space
    pub fn value(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    fn add(&mut self, tokens: &[&str]) {
        for token in tokens {
            if !token.is_empty() && !self.contains(token) {
                self.tokens.push(token.to_string());
            }
        }
    }

    fn remove(&mut self, tokens: &[&str]) {
        self.tokens.retain(|t| !tokens.contains(&t.as_str()));
    }

    /// `false` when `token` is absent
    fn replace(&mut self, token: &str, new_token: &str) -> bool {
        if !self.contains(token) {
            return false;
        }
        if token != new_token {
            self.remove(&[token]);
            self.add(&[new_token]);
        }
        true
    }

    /// Replace every token from a raw attribute value
    pub(crate) fn set_from(&mut self, value: &str) {
        self.tokens.clear();
        let tokens: Vec<&str> = value.split_whitespace().collect();
        self.add(&tokens);
    }

    pub(crate) fn clear(&mut self) {
        self.tokens.clear();
    }
}

/// Mutating view of one element's token list
pub struct TokenListMut<'a> {
    document: &'a mut Document,
    element: NodeIndex,
    attribute: String,
}

impl Document {
    /// `element.classList`
    pub fn class_list(&mut self, element: NodeIndex) -> DomResult<TokenListMut<'_>> {
        self.token_list(element, "class")
    }

    /// Token list backing `attribute` (`class`, `rel`, `sandbox`, `headers`)
    pub fn token_list(
        &mut self,
        element: NodeIndex,
        attribute: &str,
    ) -> DomResult<TokenListMut<'_>> {
        if self.try_element(element)?.token_list(attribute).is_none() {
            return Err(DomError::NoTokenList {
                index: element.get(),
                attribute: attribute.to_string(),
            });
        }
        Ok(TokenListMut {
            document: self,
            element,
            attribute: attribute.to_string(),
        })
    }

    /// Write `value` through the token list, as `setAttribute` does for a
    /// token-list attribute
    pub(crate) fn set_token_list_value(
        &mut self,
        element: NodeIndex,
        attribute: &str,
        value: &str,
    ) -> DomResult<()> {
        self.token_list(element, attribute)?.set_value(value)
    }

    /// Store the new value on the element and record the change
    fn token_list_mutated(
        &mut self,
        element: NodeIndex,
        attribute: &str,
        old_value: String,
        value: String,
    ) -> DomResult<()> {
        let data = self.element_mut(element)?;
        let namespace_uri = data.namespace_uri.clone();
        data.store_attribute(&namespace_uri, attribute, &value);

        let name = self.runtime.store_string(attribute);
        let value_index = self.runtime.store_string(&value);
        self.mutate(
            MutationRecord {
                attribute_name: Some(attribute.to_string()),
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

impl TokenListMut<'_> {
    fn missing(&self) -> DomError {
        DomError::NoTokenList {
            index: self.element.get(),
            attribute: self.attribute.clone(),
        }
    }

    fn list(&self) -> Option<&DomTokenList> {
        self.document
            .element(self.element)
            .and_then(|data| data.token_list(&self.attribute))
    }

    /// Apply `change` to the list, then write it back
    fn update(&mut self, change: impl FnOnce(&mut DomTokenList)) -> DomResult<()> {
        let missing = self.missing();
        let list = self
            .document
            .element_mut(self.element)?
            .token_list_mut(&self.attribute)
            .ok_or(missing)?;
        let old_value = list.value();
        change(list);
        let value = list.value();
        let attribute = self.attribute.clone();
        self.document.token_list_mutated(self.element, &attribute, old_value, value)
    }

    pub fn value(&self) -> String {
        self.list().map(DomTokenList::value).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.list().map_or(0, DomTokenList::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn item(&self, index: usize) -> Option<String> {
        self.list().and_then(|list| list.item(index)).map(str::to_string)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.list().is_some_and(|list| list.contains(token))
    }

    /// Add tokens, keeping first-occurrence order
    pub fn add(&mut self, tokens: &[&str]) -> DomResult<()> {
        self.update(|list| list.add(tokens))
    }

    pub fn remove(&mut self, tokens: &[&str]) -> DomResult<()> {
        self.update(|list| list.remove(tokens))
    }

    /// Replace `token` with `new_token`. Nothing is recorded when `token`
    /// is absent.
    pub fn replace(&mut self, token: &str, new_token: &str) -> DomResult<bool> {
        if !self.contains(token) {
            return Ok(false);
        }
        self.update(|list| {
            list.replace(token, new_token);
        })?;
        Ok(true)
    }

    /// Toggle `token`, returning whether it is present afterwards.
    ///
    /// `force` of `Some(true)` only adds, `Some(false)` only removes.
    pub fn toggle(&mut self, token: &str, force: Option<bool>) -> DomResult<bool> {
        if !self.contains(token) {
            if force == Some(false) {
                return Ok(false);
            }
            self.add(&[token])?;
            return Ok(true);
        }
        if force != Some(true) {
            self.remove(&[token])?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Replace all tokens from a whitespace-separated string. The attribute
    /// keeps the trimmed string as given.
    pub fn set_value(&mut self, value: &str) -> DomResult<()> {
        let missing = self.missing();
        let list = self
            .document
            .element_mut(self.element)?
            .token_list_mut(&self.attribute)
            .ok_or(missing)?;
        let old_value = list.value();
        let value = value.trim();
        list.set_from(value);
        let attribute = self.attribute.clone();
        self.document
            .token_list_mutated(self.element, &attribute, old_value, value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dedups() {
        let mut list = DomTokenList::new("class");
        list.add(&["a", "b", "a", ""]);
        assert_eq!(list.value(), "a b");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_replace_moves_to_end() {
        let mut list = DomTokenList::new("class");
        list.add(&["a", "b", "c"]);
        assert!(list.replace("a", "z"));
        assert_eq!(list.value(), "b c z");
        assert!(!list.replace("missing", "y"));
    }

    #[test]
    fn test_set_from_splits_whitespace() {
        let mut list = DomTokenList::new("rel");
        list.set_from("  noopener\tnoreferrer  noopener ");
        assert_eq!(list.tokens(), &["noopener".to_string(), "noreferrer".to_string()]);
    }
}
