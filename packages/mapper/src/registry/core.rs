//! Name registry mapping qualified names to handlers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::handler::{AttributeReader, ElementReader};
use crate::config::validate_local_name;
use crate::error::{MapperError, Result};
use crate::qname::QName;

/// Shared element handler.
pub type SharedElementReader<T> = Arc<dyn ElementReader<T>>;

/// Shared attribute handler.
pub type SharedAttributeReader<T> = Arc<dyn AttributeReader<T>>;

type ElementFactory<T> = Arc<dyn Fn() -> SharedElementReader<T> + Send + Sync>;

enum ElementEntry<T: ?Sized> {
    Realized(SharedElementReader<T>),
    Factory(ElementFactory<T>),
}

impl<T: ?Sized> Clone for ElementEntry<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Realized(handler) => Self::Realized(Arc::clone(handler)),
            Self::Factory(factory) => Self::Factory(Arc::clone(factory)),
        }
    }
}

/// Registry mapping qualified names to element and attribute handlers.
///
/// Element handlers are either registered ready-made or as a factory that
/// realizes the handler on first use. Realized handlers are cached until
/// [`NameRegistry::clear_realized`], which the parse driver calls at the end
/// of every document. All methods take `&self` and are safe to call from
/// several threads at once.
///
/// Unregistering an element removes its registration as well as the cached
/// handler, so the name can be registered again afterwards.
pub struct NameRegistry<T: ?Sized> {
    elements: RwLock<HashMap<QName, ElementEntry<T>>>,
    realized: RwLock<HashMap<QName, SharedElementReader<T>>>,
    attributes: RwLock<HashMap<QName, SharedAttributeReader<T>>>,
}

fn read<V>(lock: &RwLock<V>) -> RwLockReadGuard<'_, V> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<V>(lock: &RwLock<V>) -> RwLockWriteGuard<'_, V> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl<T: ?Sized> NameRegistry<T> {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: RwLock::new(HashMap::new()),
            realized: RwLock::new(HashMap::new()),
            attributes: RwLock::new(HashMap::new()),
        }
    }

    fn insert_element(&self, name: QName, entry: ElementEntry<T>) -> Result<()> {
        validate_local_name(name.local_name())?;
        let mut elements = write(&self.elements);
        if elements.contains_key(&name) {
            return Err(MapperError::DuplicateRegistration {
                kind: "Element",
                name,
            });
        }
        tracing::debug!(element = %name, "Registered element handler");
        elements.insert(name, entry);
        Ok(())
    }

    /// Register a ready-made element handler.
    ///
    /// # Errors
    /// `DuplicateRegistration` if `name` is already registered, `InvalidName`
    /// if its local part is not an XML name. The registry is unchanged on error.
    pub fn register_element(&self, name: QName, handler: SharedElementReader<T>) -> Result<()> {
        self.insert_element(name, ElementEntry::Realized(handler))
    }

    /// Register an element handler realized by `factory` on first use.
    ///
    /// # Errors
    /// Same as [`NameRegistry::register_element`].
    pub fn register_element_factory<F>(&self, name: QName, factory: F) -> Result<()>
    where
        F: Fn() -> SharedElementReader<T> + Send + Sync + 'static,
    {
        self.insert_element(name, ElementEntry::Factory(Arc::new(factory)))
    }

    /// Register one lazily realized handler for `local_name` in each namespace.
    ///
    /// The factory receives the namespace URI of the handler it realizes.
    /// Either every name is registered or, on error, none is.
    ///
    /// # Errors
    /// `DuplicateRegistration` naming the first conflicting name.
    pub fn register_element_for_namespaces<I, S, F>(&self, local_name: &str, namespaces: I, factory: F) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str) -> SharedElementReader<T> + Send + Sync + 'static,
    {
        validate_local_name(local_name)?;
        let factory = Arc::new(factory);
        let names: Vec<(String, QName)> = namespaces
            .into_iter()
            .map(|ns| {
                let ns = ns.into();
                let name = QName::new(ns.clone(), local_name);
                (ns, name)
            })
            .collect();

        let mut elements = write(&self.elements);
        let mut seen = HashSet::new();
        for (_, name) in &names {
            if elements.contains_key(name) || !seen.insert(name) {
                return Err(MapperError::DuplicateRegistration {
                    kind: "Element",
                    name: name.clone(),
                });
            }
        }
        for (ns, name) in names {
            let factory = Arc::clone(&factory);
            tracing::debug!(element = %name, "Registered element handler");
            elements.insert(name, ElementEntry::Factory(Arc::new(move || factory(&ns))));
        }
        Ok(())
    }

    /// Remove the registration and any realized handler for `name`.
    ///
    /// Idempotent. Returns whether a registration was removed.
    pub fn unregister_element(&self, name: &QName) -> bool {
        let mut realized = write(&self.realized);
        realized.remove(name);
        write(&self.elements).remove(name).is_some()
    }

    /// Register an attribute handler.
    ///
    /// # Errors
    /// `DuplicateRegistration` if `name` is already registered.
    pub fn register_attribute(&self, name: QName, handler: SharedAttributeReader<T>) -> Result<()> {
        validate_local_name(name.local_name())?;
        let mut attributes = write(&self.attributes);
        if attributes.contains_key(&name) {
            return Err(MapperError::DuplicateRegistration {
                kind: "Attribute",
                name,
            });
        }
        tracing::debug!(attribute = %name, "Registered attribute handler");
        attributes.insert(name, handler);
        Ok(())
    }

    /// Remove the attribute handler for `name`. Returns whether one was removed.
    pub fn unregister_attribute(&self, name: &QName) -> bool {
        write(&self.attributes).remove(name).is_some()
    }

    /// Resolve the element handler for `name`, realizing it if needed.
    ///
    /// Factories run outside any lock; when two threads realize the same name
    /// concurrently the first cached handler wins. A handler is only cached
    /// if its factory is still the registered one once it is built.
    pub fn resolve_element(&self, name: &QName) -> Option<SharedElementReader<T>> {
        loop {
            if let Some(handler) = read(&self.realized).get(name) {
                return Some(Arc::clone(handler));
            }

            let entry = read(&self.elements).get(name).cloned()?;
            let factory = match entry {
                ElementEntry::Realized(handler) => return Some(handler),
                ElementEntry::Factory(factory) => factory,
            };

            let handler = factory();
            // Lock order: realized, then elements.
            let mut realized = write(&self.realized);
            if let Some(cached) = realized.get(name) {
                return Some(Arc::clone(cached));
            }
            let current = matches!(
                read(&self.elements).get(name),
                Some(ElementEntry::Factory(registered)) if Arc::ptr_eq(registered, &factory)
            );
            if current {
                tracing::debug!(element = %name, "Realized element handler");
                realized.insert(name.clone(), Arc::clone(&handler));
                return Some(handler);
            }
            tracing::debug!(element = %name, "Registration changed while realizing handler");
        }
    }

    /// Look up the attribute handler for `name`.
    pub fn resolve_attribute(&self, name: &QName) -> Option<SharedAttributeReader<T>> {
        read(&self.attributes).get(name).cloned()
    }

    /// Drop every realized handler; registrations stay.
    pub fn clear_realized(&self) {
        let mut realized = write(&self.realized);
        if !realized.is_empty() {
            tracing::debug!(count = realized.len(), "Clearing realized element handlers");
            realized.clear();
        }
    }

    /// Check if an element handler is registered for `name`.
    #[must_use]
    pub fn has_element(&self, name: &QName) -> bool {
        read(&self.elements).contains_key(name)
    }

    /// Check if an attribute handler is registered for `name`.
    #[must_use]
    pub fn has_attribute(&self, name: &QName) -> bool {
        read(&self.attributes).contains_key(name)
    }

    /// Number of element handlers currently realized from factories.
    #[must_use]
    pub fn realized_count(&self) -> usize {
        read(&self.realized).len()
    }

    /// Return set of all registered element names.
    #[must_use]
    pub fn element_names(&self) -> HashSet<QName> {
        read(&self.elements).keys().cloned().collect()
    }

    /// Return set of all registered attribute names.
    #[must_use]
    pub fn attribute_names(&self) -> HashSet<QName> {
        read(&self.attributes).keys().cloned().collect()
    }
}

impl<T: ?Sized> Default for NameRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for NameRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameRegistry")
            .field("elements", &read(&self.elements).len())
            .field("realized", &read(&self.realized).len())
            .field("attributes", &read(&self.attributes).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ExtendedReader;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    struct DummyHandler(&'static str);

    impl ElementReader<Vec<String>> for DummyHandler {
        fn read_element(&self, reader: &mut ExtendedReader<'_, Vec<String>>, value: &mut Vec<String>) -> Result<()> {
            value.push(self.0.to_string());
            reader.discard_remainder()
        }
    }

    struct DummyAttribute;

    impl AttributeReader<Vec<String>> for DummyAttribute {
        fn read_attribute(&self, _: &ExtendedReader<'_, Vec<String>>, _: usize, _: &mut Vec<String>) -> Result<()> {
            Ok(())
        }
    }

    fn dummy(label: &'static str) -> SharedElementReader<Vec<String>> {
        Arc::new(DummyHandler(label))
    }

    /// Run `handler` on a one-element document and return what it recorded.
    fn run(handler: &SharedElementReader<Vec<String>>) -> Vec<String> {
        let mut seen = Vec::new();
        let mut cursor = crate::xml::XmlReader::from_text("<item/>");
        crate::xml::XmlCursor::next(&mut cursor).unwrap();
        let mapper = crate::XmlMapper::new();
        let mut reader = ExtendedReader::new(&mapper, &mut cursor);
        handler.read_element(&mut reader, &mut seen).unwrap();
        seen
    }

    #[test]
    fn test_registry_register_and_resolve() {
        let registry = NameRegistry::new();
        let name = QName::new("urn:t", "root");
        registry.register_element(name.clone(), dummy("root")).unwrap();

        assert!(registry.has_element(&name));
        assert!(registry.resolve_element(&name).is_some());
        assert!(registry.resolve_element(&QName::local("root")).is_none());
        // Ready-made handlers are not part of the per-parse cache
        assert_eq!(registry.realized_count(), 0);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = NameRegistry::new();
        let name = QName::local("item");
        registry.register_element(name.clone(), dummy("first")).unwrap();

        let err = registry.register_element(name.clone(), dummy("second")).unwrap_err();
        assert!(matches!(err, MapperError::DuplicateRegistration { kind: "Element", .. }));

        let err = registry
            .register_element_factory(name.clone(), || dummy("third"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::SetupConflict);

        let handler = registry.resolve_element(&name).unwrap();
        assert_eq!(run(&handler), vec!["first".to_string()]);
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let registry = NameRegistry::<Vec<String>>::new();
        let err = registry
            .register_element(QName::local("1bad"), dummy("x"))
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidName(_)));
        assert!(registry.element_names().is_empty());
    }

    #[test]
    fn test_factory_is_lazy_and_cached_until_cleared() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = NameRegistry::new();
        let name = QName::local("lazy");
        let counter = Arc::clone(&calls);
        registry
            .register_element_factory(name.clone(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                dummy("lazy")
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first = registry.resolve_element(&name).unwrap();
        let second = registry.resolve_element(&name).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.realized_count(), 1);

        registry.clear_realized();
        assert_eq!(registry.realized_count(), 0);
        assert!(registry.has_element(&name));
        registry.resolve_element(&name).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregister_allows_reregistration() {
        let registry = NameRegistry::new();
        let name = QName::local("item");
        registry.register_element_factory(name.clone(), || dummy("a")).unwrap();
        registry.resolve_element(&name).unwrap();

        assert!(registry.unregister_element(&name));
        assert!(!registry.unregister_element(&name));
        assert!(registry.resolve_element(&name).is_none());
        assert_eq!(registry.realized_count(), 0);

        registry.register_element(name.clone(), dummy("b")).unwrap();
        assert!(registry.resolve_element(&name).is_some());
    }

    #[test]
    fn test_reregistration_during_realization_is_not_shadowed() {
        let registry = NameRegistry::new();
        let name = QName::local("item");
        let started = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        {
            let started = Arc::clone(&started);
            let release = Arc::clone(&release);
            registry
                .register_element_factory(name.clone(), move || {
                    started.wait();
                    release.wait();
                    dummy("old")
                })
                .unwrap();
        }

        let resolved = thread::scope(|s| {
            let worker = s.spawn(|| registry.resolve_element(&name));
            started.wait();
            assert!(registry.unregister_element(&name));
            registry.register_element(name.clone(), dummy("new")).unwrap();
            release.wait();
            worker.join().unwrap()
        });

        assert_eq!(run(&resolved.unwrap()), vec!["new".to_string()]);
        assert_eq!(registry.realized_count(), 0);
        assert_eq!(run(&registry.resolve_element(&name).unwrap()), vec!["new".to_string()]);
    }

    #[test]
    fn test_attribute_registration() {
        let registry = NameRegistry::new();
        let name = QName::local("x");
        registry.register_attribute(name.clone(), Arc::new(DummyAttribute)).unwrap();
        assert!(registry.has_attribute(&name));
        assert!(registry.resolve_attribute(&name).is_some());

        let err = registry
            .register_attribute(name.clone(), Arc::new(DummyAttribute))
            .unwrap_err();
        assert!(matches!(err, MapperError::DuplicateRegistration { kind: "Attribute", .. }));

        assert!(registry.unregister_attribute(&name));
        assert!(registry.resolve_attribute(&name).is_none());
    }

    #[test]
    fn test_register_for_namespaces_is_atomic() {
        let registry = NameRegistry::new();
        registry
            .register_element(QName::new("urn:v2", "root"), dummy("v2"))
            .unwrap();

        let err = registry
            .register_element_for_namespaces("root", ["urn:v1", "urn:v2", "urn:v3"], |_| dummy("any"))
            .unwrap_err();
        assert!(matches!(err, MapperError::DuplicateRegistration { .. }));
        assert!(!registry.has_element(&QName::new("urn:v1", "root")));
        assert!(!registry.has_element(&QName::new("urn:v3", "root")));

        registry
            .register_element_for_namespaces("root", ["urn:v1", "urn:v3"], |_| dummy("any"))
            .unwrap();
        assert_eq!(registry.element_names().len(), 3);
    }

    #[test]
    fn test_register_for_namespaces_passes_namespace() {
        let seen = Arc::new(RwLock::new(Vec::new()));
        let registry = NameRegistry::new();
        let log = Arc::clone(&seen);
        registry
            .register_element_for_namespaces("root", ["urn:a", "urn:b"], move |ns| {
                write(&*log).push(ns.to_string());
                dummy("root")
            })
            .unwrap();

        registry.resolve_element(&QName::new("urn:b", "root")).unwrap();
        assert_eq!(*read(&*seen), vec!["urn:b".to_string()]);
    }
}
