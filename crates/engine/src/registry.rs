// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The class registry.
//!
//! Classes are kept in an arena with a precedence chain per name. The head
//! of a chain is the definition new starts use; a definition displaced by a
//! reload survives behind it, marked `deleted`, for as long as it still has
//! instances. `reconsider` runs whenever an instance goes away and destroys
//! a deleted class once it is unused.

use std::collections::HashMap;
use tracing::{debug, info};
use warden_core::{ClassId, IdAlloc, JobClass, SessionId};

/// Arena of job classes with per-name precedence chains.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    ids: IdAlloc,
    classes: HashMap<ClassId, JobClass>,
    /// Chain per name; index 0 is the definition new starts use.
    by_name: HashMap<String, Vec<ClassId>>,
}

/// Strip the identity fields so two definitions can be compared.
fn comparable(class: &JobClass) -> JobClass {
    let mut clone = class.clone();
    clone.id = ClassId::new(0);
    clone.instances.clear();
    clone.deleted = false;
    // A live operator tree may hold match state; compare structure only.
    if let Some(op) = &mut clone.start_on {
        op.reset();
    }
    if let Some(op) = &mut clone.stop_on {
        op.reset();
    }
    clone
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a class template, displacing any current head of its chain.
    ///
    /// A displaced head with instances is kept behind the new one, marked
    /// deleted; without instances it is destroyed outright.
    pub fn install(&mut self, template: JobClass) -> ClassId {
        let id = ClassId::new(self.ids.next());
        let mut class = template;
        class.id = id;
        class.deleted = false;

        let session = class.session;
        let previous = self
            .by_name
            .get(&class.name)
            .into_iter()
            .flatten()
            .copied()
            .find(|id| {
                self.classes
                    .get(id)
                    .map(|old| !old.deleted && old.session == session)
                    .unwrap_or(false)
            });
        if let Some(previous) = previous {
            let keep = self
                .classes
                .get_mut(&previous)
                .map(|old| {
                    old.deleted = true;
                    !old.instances.is_empty()
                })
                .unwrap_or(false);
            if !keep {
                if let Some(chain) = self.by_name.get_mut(&class.name) {
                    chain.retain(|c| *c != previous);
                }
                self.classes.remove(&previous);
                debug!(class = %class.name, "replaced unused definition");
            }
        }
        self.by_name
            .entry(class.name.clone())
            .or_default()
            .insert(0, id);
        info!(class = %class.name, id = %id, "class registered");
        self.classes.insert(id, class);
        id
    }

    /// Reconcile the registry against a freshly loaded set of templates.
    ///
    /// Unchanged definitions are kept (instances and condition state
    /// survive); changed ones are installed over their predecessor; classes
    /// no longer defined are marked deleted and destroyed once unused.
    pub fn reload(&mut self, templates: Vec<JobClass>) {
        let new_names: Vec<String> = templates.iter().map(|t| t.name.clone()).collect();

        for template in templates {
            let unchanged = self
                .visible(&template.name, template.session)
                .and_then(|id| self.classes.get(&id))
                .map(|current| comparable(current) == comparable(&template))
                .unwrap_or(false);
            if unchanged {
                debug!(class = %template.name, "definition unchanged");
                continue;
            }
            self.install(template);
        }

        // Classes whose definition disappeared.
        let dropped: Vec<ClassId> = self
            .classes
            .iter()
            .filter(|(_, class)| !class.deleted && !new_names.contains(&class.name))
            .map(|(id, _)| *id)
            .collect();
        for id in dropped {
            if let Some(class) = self.classes.get_mut(&id) {
                info!(class = %class.name, "class dropped by reload");
                class.deleted = true;
            }
            self.reconsider(id);
        }
    }

    /// Destroy a deleted class once its last instance is gone.
    ///
    /// Returns true if the class was removed.
    pub fn reconsider(&mut self, id: ClassId) -> bool {
        let remove = self
            .classes
            .get(&id)
            .map(|class| class.deleted && class.instances.is_empty())
            .unwrap_or(false);
        if remove {
            if let Some(class) = self.classes.remove(&id) {
                info!(class = %class.name, id = %id, "class destroyed");
                if let Some(chain) = self.by_name.get_mut(&class.name) {
                    chain.retain(|c| *c != id);
                    if chain.is_empty() {
                        self.by_name.remove(&class.name);
                    }
                }
            }
        }
        remove
    }

    /// The definition of `name` that new starts in `session` use.
    ///
    /// A session-scoped class shadows the system class of the same name
    /// inside its session; other sessions never see it.
    pub fn visible(&self, name: &str, session: Option<SessionId>) -> Option<ClassId> {
        let chain = self.by_name.get(name)?;
        let live: Vec<(&ClassId, &JobClass)> = chain
            .iter()
            .filter_map(|id| self.classes.get(id).map(|class| (id, class)))
            .filter(|(_, class)| !class.deleted)
            .collect();

        if session.is_some() {
            if let Some((id, _)) = live.iter().find(|(_, class)| class.session == session) {
                return Some(**id);
            }
        }
        live.iter()
            .find(|(_, class)| class.session.is_none())
            .map(|(id, _)| **id)
    }

    pub fn get(&self, id: ClassId) -> Option<&JobClass> {
        self.classes.get(&id)
    }

    pub fn get_mut(&mut self, id: ClassId) -> Option<&mut JobClass> {
        self.classes.get_mut(&id)
    }

    /// Every class id, deleted ones included, in name order.
    pub fn ids(&self) -> Vec<ClassId> {
        let mut ids: Vec<ClassId> = self.classes.keys().copied().collect();
        ids.sort_by(|a, b| {
            let name_a = self.classes.get(a).map(|c| c.name.as_str()).unwrap_or("");
            let name_b = self.classes.get(b).map(|c| c.name.as_str()).unwrap_or("");
            name_a.cmp(name_b).then(a.cmp(b))
        });
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobClass> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
