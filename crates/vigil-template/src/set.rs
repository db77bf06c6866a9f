use crate::error::TemplateError;
use crate::stanza::read_stanzas;
use crate::template::TemplateDef;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// The compiled template collection, keyed by unique name.
///
/// Loading is lenient by design: a malformed template is logged and
/// skipped, a duplicate name keeps the first definition, and the rest of
/// the set always loads.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, Arc<TemplateDef>>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every stanza in `text`, skipping the ones that fail.
    pub fn compile(text: &str) -> Self {
        let mut set = Self::new();
        set.extend_from_text(text);
        set
    }

    /// Read and compile every file in `dir`, in file-name order so reloads
    /// resolve duplicates deterministically.
    pub fn load_dir(dir: &Path) -> Result<Self, TemplateError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut set = Self::new();
        for path in paths {
            let text = std::fs::read_to_string(&path)?;
            tracing::debug!(file = %path.display(), "Loading templates");
            set.extend_from_text(&text);
        }
        Ok(set)
    }

    fn extend_from_text(&mut self, text: &str) {
        for stanza in read_stanzas(text) {
            match TemplateDef::compile(&stanza) {
                Ok(def) => {
                    if self.templates.contains_key(&def.name) {
                        tracing::warn!(
                            name = %def.name,
                            line = stanza.line,
                            "Rejecting duplicate template definition"
                        );
                        continue;
                    }
                    self.templates.insert(def.name.clone(), Arc::new(def));
                }
                Err(e) => {
                    tracing::warn!(line = stanza.line, error = %e, "Skipping invalid template");
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TemplateDef>> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TemplateDef>> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
