//! Worker global scope
//!
//! What scripts see as `self`: the standard names that survive
//! sanitization, plus the stubs and constructors the shim provides.

use url::Url;
use wdom_dom::{Document, DomResult, ElementClass, EventListener, EventTarget};

use crate::config::WorkerConfig;
use crate::WorkerResult;

/// Host globals kept when the worker scope is sanitized
pub const WHITELISTED_GLOBALS: &[&str] = &[
    "Array",
    "ArrayBuffer",
    "Blob",
    "BigInt",
    "BigInt64Array",
    "BigUint64Array",
    "Boolean",
    "Cache",
    "CustomEvent",
    "DataView",
    "Date",
    "Error",
    "EvalError",
    "Event",
    "EventTarget",
    "Float32Array",
    "Float64Array",
    "Function",
    "Infinity",
    "Int16Array",
    "Int32Array",
    "Int8Array",
    "Intl",
    "JSON",
    "Map",
    "Math",
    "NaN",
    "Number",
    "Object",
    "Promise",
    "Proxy",
    "RangeError",
    "ReferenceError",
    "Reflect",
    "RegExp",
    "Set",
    "String",
    "Symbol",
    "SyntaxError",
    "TextDecoder",
    "TextEncoder",
    "TypeError",
    "URIError",
    "URL",
    "Uint16Array",
    "Uint32Array",
    "Uint8Array",
    "Uint8ClampedArray",
    "WeakMap",
    "WeakSet",
    "XMLHttpRequest",
    "atob",
    "btoa",
    "caches",
    "clearInterval",
    "clearTimeout",
    "console",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "escape",
    "eval",
    "fetch",
    "indexedDB",
    "isFinite",
    "isNaN",
    "onerror",
    "onrejectionhandled",
    "onunhandledrejection",
    "parseFloat",
    "parseInt",
    "performance",
    "setTimeout",
    "setInterval",
    "undefined",
    "unescape",
];

/// Names the shim itself installs on the scope
const SCOPE_GLOBALS: &[&str] = &[
    "navigator",
    "localStorage",
    "location",
    "url",
    "innerWidth",
    "innerHeight",
    "document",
    "addEventListener",
    "removeEventListener",
    "MutationObserver",
];

/// One object on the host global's prototype chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrototypeLevel {
    /// Constructor name of the object, e.g. `DedicatedWorkerGlobalScope`
    pub constructor: String,
    /// Own property names
    pub properties: Vec<String>,
}

impl PrototypeLevel {
    pub fn new(constructor: &str, properties: &[&str]) -> Self {
        Self {
            constructor: constructor.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// `navigator` stub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    pub user_agent: String,
}

/// In-memory `localStorage`, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalStorage {
    entries: Vec<(String, String)>,
}

impl LocalStorage {
    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn set_item(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove_item(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Key at `index`
    pub fn key(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The worker's `self`
#[derive(Debug, Clone)]
pub struct GlobalScope {
    pub navigator: Navigator,
    pub location: Url,
    pub local_storage: LocalStorage,
    /// Always `/`
    pub url: String,
    pub inner_width: f64,
    pub inner_height: f64,
    host: Vec<PrototypeLevel>,
    sanitize: bool,
}

impl GlobalScope {
    pub fn new(config: &WorkerConfig) -> WorkerResult<Self> {
        let mut local_storage = LocalStorage::default();
        for (key, value) in &config.local_storage {
            local_storage.set_item(key, value);
        }
        Ok(Self {
            navigator: Navigator {
                user_agent: config.user_agent.clone(),
            },
            location: config.location_url()?,
            local_storage,
            url: "/".to_string(),
            inner_width: f64::from(config.inner_width),
            inner_height: f64::from(config.inner_height),
            host: Vec::new(),
            sanitize: config.sanitize_globals,
        })
    }

    /// Delete every non-whitelisted property from each level of `chain`,
    /// stopping at `EventTarget`. Returns the removed names.
    pub fn sanitize(chain: &mut [PrototypeLevel]) -> Vec<String> {
        let mut removed = Vec::new();
        for level in chain.iter_mut().take_while(|level| level.constructor != "EventTarget") {
            level.properties.retain(|property| {
                let keep = WHITELISTED_GLOBALS.contains(&property.as_str());
                if !keep {
                    removed.push(property.clone());
                }
                keep
            });
        }
        if !removed.is_empty() {
            tracing::debug!("Removed {} host globals", removed.len());
        }
        removed
    }

    /// Adopt the host's prototype chain, sanitizing it when configured
    pub fn install_host(&mut self, mut chain: Vec<PrototypeLevel>) -> Vec<String> {
        let removed = if self.sanitize { Self::sanitize(&mut chain) } else { Vec::new() };
        self.host = chain;
        removed
    }

    /// Element constructors exposed on the scope
    pub fn constructors() -> impl Iterator<Item = &'static str> {
        ElementClass::ALL.into_iter().map(ElementClass::constructor_name)
    }

    /// Whether `name` resolves on the scope or the host chain
    pub fn has_global(&self, name: &str) -> bool {
        SCOPE_GLOBALS.contains(&name)
            || Self::constructors().any(|constructor| constructor == name)
            || self
                .host
                .iter()
                .any(|level| level.properties.iter().any(|property| property == name))
    }

    // ========================================================================
    // DEFAULT VIEW
    // ========================================================================

    /// `defaultView.addEventListener` registers on the document
    pub fn add_event_listener(
        &self,
        document: &mut Document,
        event_type: &str,
        listener: EventListener,
    ) -> DomResult<()> {
        document.add_event_listener(document.document_element(), event_type, listener)
    }

    pub fn remove_event_listener(
        &self,
        document: &mut Document,
        event_type: &str,
        listener: &EventListener,
    ) -> DomResult<bool> {
        document.remove_event_listener(document.document_element(), event_type, listener)
    }

    /// Copy the document's viewport after a resize
    pub(crate) fn sync_viewport(&mut self, document: &Document) {
        self.inner_width = document.inner_width();
        self.inner_height = document.inner_height();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_chain() -> Vec<PrototypeLevel> {
        vec![
            PrototypeLevel::new(
                "DedicatedWorkerGlobalScope",
                &["postMessage", "fetch", "importScripts"],
            ),
            PrototypeLevel::new("WorkerGlobalScope", &["console", "caches", "navigator"]),
            PrototypeLevel::new("EventTarget", &["addEventListener", "dispatchEvent"]),
        ]
    }

    #[test]
    fn test_sanitize_stops_at_event_target() {
        let mut chain = host_chain();
        let removed = GlobalScope::sanitize(&mut chain);
        assert_eq!(removed, vec!["postMessage", "importScripts", "navigator"]);
        assert_eq!(chain[0].properties, vec!["fetch"]);
        assert_eq!(chain[1].properties, vec!["console", "caches"]);
        assert_eq!(chain[2].properties.len(), 2);
    }

    #[test]
    fn test_install_host_respects_config() {
        let config = WorkerConfig {
            sanitize_globals: false,
            ..Default::default()
        };
        let mut scope = GlobalScope::new(&config).unwrap();
        assert!(scope.install_host(host_chain()).is_empty());
        assert!(scope.has_global("importScripts"));

        let mut scope = GlobalScope::new(&WorkerConfig::default()).unwrap();
        scope.install_host(host_chain());
        assert!(!scope.has_global("importScripts"));
        assert!(scope.has_global("fetch"));
        assert!(scope.has_global("HTMLTableRowElement"));
        assert!(scope.has_global("localStorage"));
    }

    #[test]
    fn test_scope_from_config() {
        let config = WorkerConfig {
            location: "https://example.com/page".to_string(),
            inner_width: 640,
            local_storage: vec![("a".into(), "1".into()), ("b".into(), "2".into())],
            ..Default::default()
        };
        let scope = GlobalScope::new(&config).unwrap();
        assert_eq!(scope.url, "/");
        assert_eq!(scope.location.host_str(), Some("example.com"));
        assert_eq!(scope.inner_width, 640.0);
        assert_eq!(scope.local_storage.key(1), Some("b"));
        assert_eq!(scope.local_storage.get_item("a"), Some("1"));
    }

    #[test]
    fn test_local_storage() {
        let mut storage = LocalStorage::default();
        storage.set_item("k", "v");
        storage.set_item("k", "w");
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get_item("k"), Some("w"));
        storage.remove_item("k");
        assert!(storage.is_empty());
        assert_eq!(storage.key(0), None);
    }

    #[test]
    fn test_constructors_cover_every_class() {
        assert_eq!(GlobalScope::constructors().count(), ElementClass::ALL.len());
        assert!(GlobalScope::constructors().any(|name| name == "HTMLInputElement"));
    }
}
