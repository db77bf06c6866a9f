//! Which entities a template binds to.

use vigil_common::pattern::SimplePattern;
use vigil_common::types::Entity;

/// Compiled from the `on`/`os`/`hosts`/`families` fields. `on` matches
/// the entity's context (a plain name matches exactly, globs are
/// honored); the rest are filters that default to match-all when absent.
#[derive(Debug, Clone)]
pub struct Selector {
    pub on: SimplePattern,
    pub os: SimplePattern,
    pub hosts: SimplePattern,
    pub families: SimplePattern,
}

impl Selector {
    pub fn matches(&self, entity: &Entity) -> bool {
        self.on.matches(&entity.context)
            && self.os.matches(&entity.os)
            && self.hosts.matches(&entity.host)
            && self.families.matches(&entity.family)
    }
}
