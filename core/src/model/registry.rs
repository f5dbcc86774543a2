//! Process-wide model registry and deferred-FK resolution (§3, §9
//! "Global pending set for deferred FKs maps to a process-scoped registry
//! owned by the model registry; every new model registration triggers a
//! resolve pass and removes matched entries").

use std::cell::RefCell;
use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;

use super::field::ForeignKeyField;
use super::meta::ModelMeta;

/// A model registration, shared so the join resolver and schema manager
/// can both borrow it; interior mutability is needed because resolving a
/// deferred FK on model A can mutate model B's `backrefs` after both are
/// already registered.
pub type SharedMeta = Rc<RefCell<ModelMeta>>;

// The registry, AST nodes and `Context` all use `Rc`/`RefCell` rather than
// `Arc`/`Mutex` throughout this crate (§5: rendering is call-local and
// connection state is per-thread by default), so the registry is kept
// thread-local rather than process-wide-with-a-lock: sharing an `Rc`
// across threads behind a `Mutex` would still be unsound (its refcount
// isn't atomic). A program that registers the same model types on every
// thread gets the behavior §3/§9 describe; one that registers types on a
// single thread and queries them from others is not supported by this
// toolkit's concurrency model (§5).
thread_local! {
    static REGISTRY: RefCell<IndexMap<CompactString, SharedMeta>> = RefCell::new(IndexMap::new());
}

fn lower(name: &str) -> CompactString {
    name.to_lowercase().into()
}

/// Registers `meta`, then runs a resolve pass in both directions (§9):
/// any of `meta`'s own deferred FKs whose target is already registered
/// resolve immediately; any other model's FK that was waiting on
/// `meta`'s name resolves now too.
pub fn register_model(meta: ModelMeta) -> SharedMeta {
    let key = lower(&meta.name);
    let shared: SharedMeta = Rc::new(RefCell::new(meta));

    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        registry.insert(key.clone(), shared.clone());

        let pending = std::mem::take(&mut shared.borrow_mut().pending_deferred);
        for deferred in pending {
            let target_key = lower(&deferred.target_model_name);
            match registry.get(&target_key).cloned() {
                Some(target) => resolve_one(&shared, &target, deferred),
                None => {
                    // Still pending; put it back for a later registration
                    // of the target model to pick up.
                    shared.borrow_mut().pending_deferred.push(deferred);
                }
            }
        }

        // Wire backrefs for this model's already-resolved (non-deferred)
        // `foreign_key()` fields whose target happens to already be
        // registered — the common parent-then-child declaration order.
        let owner_name = shared.borrow().name.clone();
        let forward_refs: Vec<(CompactString, CompactString)> = shared
            .borrow()
            .refs
            .iter()
            .map(|(field, target)| (field.clone(), target.clone()))
            .collect();
        for (field_name, target_name) in forward_refs {
            if let Some(target) = registry.get(&lower(&target_name)).cloned() {
                if Rc::ptr_eq(&target, &shared) {
                    continue;
                }
                target.borrow_mut().install_backref(owner_name.clone(), field_name);
            }
        }

        // Any other already-registered model whose deferred FK named this
        // one by string resolves now.
        for other in registry.values() {
            if Rc::ptr_eq(other, &shared) {
                continue;
            }
            let still_pending = std::mem::take(&mut other.borrow_mut().pending_deferred);
            for deferred in still_pending {
                if lower(&deferred.target_model_name) == key {
                    resolve_one(other, &shared, deferred);
                } else {
                    other.borrow_mut().pending_deferred.push(deferred);
                }
            }
        }
    });

    shared
}

fn resolve_one(owner: &SharedMeta, target: &SharedMeta, deferred: super::field::DeferredForeignKey) {
    let field_name = deferred.name.clone();
    let fk: Rc<ForeignKeyField> = Rc::new(deferred.resolve());
    owner.borrow_mut().install_resolved_fk(fk);
    let owner_name = owner.borrow().name.clone();
    target.borrow_mut().install_backref(owner_name, field_name);
}

pub fn lookup(name: &str) -> Option<SharedMeta> {
    REGISTRY.with(|registry| registry.borrow().get(&lower(name)).cloned())
}

/// Number of models with at least one still-unresolved deferred FK —
/// exposed for tests; not part of the public API surface a caller would
/// normally need.
#[cfg(test)]
pub fn pending_count() -> usize {
    REGISTRY.with(|registry| {
        registry
            .borrow()
            .values()
            .filter(|m| !m.borrow().pending_deferred.is_empty())
            .count()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::{DeferredForeignKey, FieldKind, ScalarField};
    use crate::model::meta::ModelMeta;

    #[test]
    fn deferred_fk_resolves_once_target_registers() {
        // Use unique names per test to avoid cross-test registry pollution
        // (the registry is process-global and tests run concurrently).
        let note = ModelMeta::builder("NoteA")
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .deferred_foreign_key(DeferredForeignKey::new("user", "UserA"))
            .build();
        let note_shared = register_model(note);
        assert!(!note_shared.borrow().refs.contains_key("user"));

        let user = ModelMeta::builder("UserA")
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .build();
        let user_shared = register_model(user);

        assert!(note_shared.borrow().refs.contains_key("user"));
        assert!(user_shared.borrow().model_backrefs.contains_key("notea"));
    }
}
