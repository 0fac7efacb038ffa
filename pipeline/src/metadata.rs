//! Decoration tables keyed by controller and action.

use std::collections::{BTreeMap, HashMap};

use crate::decoration::Decoration;

/// Ordered decorations for one parameter slot, innermost first.
///
/// Attaching prepends, so the most recently attached decoration evaluates
/// first and each later decoration receives the previous one's output as
/// its running value.
#[derive(Debug, Default)]
pub struct ParameterChain {
    decorations: Vec<Decoration>,
}

impl ParameterChain {
    pub(crate) fn attach(&mut self, decoration: Decoration) {
        self.decorations.insert(0, decoration);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decoration> {
        self.decorations.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }
}

impl<'a> IntoIterator for &'a ParameterChain {
    type Item = &'a Decoration;
    type IntoIter = std::slice::Iter<'a, Decoration>;

    fn into_iter(self) -> Self::IntoIter {
        self.decorations.iter()
    }
}

/// Per-action decoration table: parameter index to chain.
#[derive(Debug, Default)]
pub struct MethodMetadata {
    chains: BTreeMap<usize, ParameterChain>,
    decorated: bool,
}

impl MethodMetadata {
    #[must_use]
    pub fn chain(&self, index: usize) -> Option<&ParameterChain> {
        self.chains.get(&index)
    }

    /// Chains in ascending parameter-index order.
    pub fn chains(&self) -> impl Iterator<Item = (usize, &ParameterChain)> {
        self.chains.iter().map(|(index, chain)| (*index, chain))
    }

    /// Cached flag: has anything ever been attached to this action?
    #[must_use]
    pub fn has_decorations(&self) -> bool {
        self.decorated
    }

    fn attach(&mut self, index: usize, decoration: Decoration) {
        self.chains.entry(index).or_default().attach(decoration);
        self.decorated = true;
    }
}

/// Decoration table for every controller in the application.
///
/// Mutated only while the application is being assembled; frozen behind an
/// `Arc` before dispatch begins, so chains are never allocated or moved per
/// call.
#[derive(Debug, Default)]
pub struct MetadataStore {
    controllers: HashMap<String, HashMap<String, MethodMetadata>>,
}

impl MetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `decoration` to parameter `index` of `(controller, action)`,
    /// lazily creating the entry. Prepends: the most recently attached
    /// decoration for a slot evaluates first.
    pub fn decorate(
        &mut self,
        controller: &str,
        action: &str,
        index: usize,
        decoration: Decoration,
    ) {
        self.controllers
            .entry(controller.to_string())
            .or_default()
            .entry(action.to_string())
            .or_default()
            .attach(index, decoration);
    }

    #[must_use]
    pub fn method(&self, controller: &str, action: &str) -> Option<&MethodMetadata> {
        self.controllers.get(controller)?.get(action)
    }

    /// Whether `(controller, action)` carries any decoration at all.
    #[must_use]
    pub fn is_decorated(&self, controller: &str, action: &str) -> bool {
        self.method(controller, action)
            .is_some_and(MethodMetadata::has_decorations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::{Decoration, DecorationKind};

    fn noop(tag: &'static str) -> Decoration {
        Decoration::function(tag, |_ctx, prev| Ok(prev))
    }

    #[test]
    fn attaching_prepends_to_the_chain() {
        let mut store = MetadataStore::new();
        store.decorate("Widgets", "show", 0, noop("first"));
        store.decorate("Widgets", "show", 0, noop("second"));

        let metadata = store.method("Widgets", "show").unwrap();
        let tags: Vec<&str> = metadata.chain(0).unwrap().iter().map(Decoration::tag).collect();
        assert_eq!(tags, ["second", "first"]);
    }

    #[test]
    fn entries_are_created_lazily() {
        let mut store = MetadataStore::new();
        assert!(store.method("Widgets", "show").is_none());
        assert!(!store.is_decorated("Widgets", "show"));

        store.decorate("Widgets", "show", 1, noop("path"));
        assert!(store.is_decorated("Widgets", "show"));
        assert!(store.method("Widgets", "show").unwrap().chain(0).is_none());
        assert_eq!(store.method("Widgets", "show").unwrap().chain(1).unwrap().len(), 1);
    }

    #[test]
    fn chains_iterate_in_index_order() {
        let mut store = MetadataStore::new();
        store.decorate("Widgets", "show", 2, noop("c"));
        store.decorate("Widgets", "show", 0, noop("a"));

        let metadata = store.method("Widgets", "show").unwrap();
        let indices: Vec<usize> = metadata.chains().map(|(index, _)| index).collect();
        assert_eq!(indices, [0, 2]);
    }

    #[test]
    fn decoration_kinds_are_reported() {
        let function = noop("f");
        assert_eq!(function.kind(), Some(DecorationKind::Function));
        assert!(function.is_valid());

        let invalid = Decoration::new("broken");
        assert_eq!(invalid.kind(), None);
        assert!(!invalid.is_valid());
    }
}
