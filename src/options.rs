//! Configurable router options, primarily the converter registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::converters::{
    ConverterFactory, DateTimeConverterFactory, IntConverterFactory, PathConverterFactory,
    UuidConverterFactory,
};
use crate::error::InvalidConverterName;
use crate::template::is_identifier;

/// The collection of named converter factories that may be referenced in
/// URI template field expressions.
///
/// Names may only use ASCII letters, digits, and underscores, and must
/// begin with a letter or underscore. Inserting under an existing name
/// replaces the factory; entries cannot be removed, so templates validated
/// against the map stay resolvable.
pub struct ConverterMap {
    entries: HashMap<String, Arc<dyn ConverterFactory>>,
}

impl ConverterMap {
    /// A map pre-installed with the built-in converters: `int`, `uuid`,
    /// `dt`, and `path`.
    pub(crate) fn with_builtins() -> ConverterMap {
        let mut map = ConverterMap {
            entries: HashMap::new(),
        };
        map.insert("int", Arc::new(IntConverterFactory))
            .expect("builtin converter names are valid identifiers");
        map.insert("uuid", Arc::new(UuidConverterFactory))
            .expect("builtin converter names are valid identifiers");
        map.insert("dt", Arc::new(DateTimeConverterFactory))
            .expect("builtin converter names are valid identifiers");
        map.insert("path", Arc::new(PathConverterFactory))
            .expect("builtin converter names are valid identifiers");
        map
    }

    /// Register a converter factory under `name`, replacing any previous
    /// entry of that name.
    pub fn insert(
        &mut self,
        name: &str,
        factory: Arc<dyn ConverterFactory>,
    ) -> Result<(), InvalidConverterName> {
        if !is_identifier(name) {
            return Err(InvalidConverterName(name.to_string()));
        }
        self.entries.insert(name.to_string(), factory);
        Ok(())
    }

    /// Look up a factory by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ConverterFactory>> {
        self.entries.get(name)
    }

    /// True if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Options configuring a router's behavior.
///
/// The converter map is exposed by reference only; it cannot be replaced
/// wholesale, so every entry has passed name validation.
pub struct RouterOptions {
    converters: ConverterMap,
}

impl RouterOptions {
    pub(crate) fn new() -> RouterOptions {
        RouterOptions {
            converters: ConverterMap::with_builtins(),
        }
    }

    /// The registered converters.
    pub fn converters(&self) -> &ConverterMap {
        &self.converters
    }

    /// The registered converters, for extension.
    pub fn converters_mut(&mut self) -> &mut ConverterMap {
        &mut self.converters
    }
}
