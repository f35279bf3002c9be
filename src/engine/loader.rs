use crate::error::Error;
use crate::fs::FileSystem;
use crate::plugin::PluginRegistry;
use crate::spec::{parse_definition, CommandTree, DefinitionStore, DefinitionTransformer};

/// Loads definitions from the store and turns them into command trees with
/// plugin commands merged in.
pub struct DefinitionLoader<'a, F: FileSystem> {
    store: DefinitionStore<F>,
    registry: &'a PluginRegistry,
}

impl<'a, F: FileSystem> DefinitionLoader<'a, F> {
    pub const fn new(store: DefinitionStore<F>, registry: &'a PluginRegistry) -> Self {
        Self { store, registry }
    }

    /// Names of all available definitions, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions directory cannot be read.
    pub fn names(&self) -> Result<Vec<String>, Error> {
        self.store.names()
    }

    /// Loads one definition; `None` if no such definition exists.
    ///
    /// # Errors
    ///
    /// Returns a definition error if the file cannot be parsed or transformed.
    pub fn load(&self, name: &str) -> Result<Option<CommandTree>, Error> {
        let Some(content) = self.store.read(name)? else {
            return Ok(None);
        };
        let document = parse_definition(name, &content)?;
        let tree = DefinitionTransformer::new(name)
            .transform(&document, self.registry.commands_for(name))?;
        Ok(Some(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;
    use crate::spec::Visibility;

    #[test]
    fn test_plugin_commands_merged_into_empty_definition() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("du.yaml"), "").unwrap();
        let registry = PluginRegistry::standard();
        let loader = DefinitionLoader::new(DefinitionStore::new(OsFileSystem, dir.path()), &registry);

        assert_eq!(loader.names().unwrap(), vec!["du"]);
        let tree = loader.load("du").unwrap().unwrap();
        let digitize = tree.find("digitization", "digitize").unwrap();
        assert!(digitize.plugin);
        assert_eq!(
            tree.find("digitization", "digitize-result").unwrap().visibility,
            Visibility::Disabled {
                reason: "Digitize result command not supported".into()
            }
        );
        assert!(loader.load("missing").unwrap().is_none());
    }
}
