// Open-library registry keyed by canonical name.
use crate::core::ident::Ident;
use crate::core::library::Library;
use crate::core::unit::Unit;

#[derive(Debug)]
pub struct Registry<U> {
    open: Vec<Library<U>>,
}

impl<U: Unit> Registry<U> {
    pub fn new() -> Self {
        Self { open: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn contains(&self, name: &Ident) -> bool {
        self.position(name).is_some()
    }

    /// Already-open library with this canonical name; never touches the filesystem.
    pub fn find_open(&mut self, name: &Ident) -> Option<&mut Library<U>> {
        let index = self.position(name)?;
        Some(&mut self.open[index])
    }

    /// Callers check `find_open` first; at most one handle per canonical name.
    pub fn register(&mut self, library: Library<U>) -> &mut Library<U> {
        debug_assert!(
            !self.contains(library.name()),
            "library {} is already open",
            library.name()
        );
        self.open.push(library);
        let last = self.open.len() - 1;
        &mut self.open[last]
    }

    /// Removes and returns the handle; unknown names are ignored.
    pub fn unregister(&mut self, name: &Ident) -> Option<Library<U>> {
        let index = self.position(name)?;
        Some(self.open.remove(index))
    }

    fn position(&self, name: &Ident) -> Option<usize> {
        self.open.iter().position(|library| library.name() == name)
    }
}

impl<U: Unit> Default for Registry<U> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::core::ident::Ident;
    use crate::core::library::Library;
    use crate::core::tree::Tree;

    #[test]
    fn find_open_uses_canonical_name() {
        let mut registry: Registry<Tree> = Registry::new();
        registry.register(Library::ephemeral("work"));

        assert!(registry.find_open(&Ident::upcase("Work")).is_some());
        assert!(registry.find_open(&Ident::upcase("other")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry: Registry<Tree> = Registry::new();
        registry.register(Library::ephemeral("work"));

        let name = Ident::upcase("work");
        assert!(registry.unregister(&name).is_some());
        assert!(registry.unregister(&name).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_handle_keeps_cached_units() {
        let mut registry: Registry<Tree> = Registry::new();
        registry
            .register(Library::ephemeral("work"))
            .put(Tree::new("PKG", "package"));

        let library = registry.find_open(&Ident::upcase("WORK")).expect("open");
        assert_eq!(library.len(), 1);
    }
}
