//! Override eligibility
//!
//! Decides which of the operations produced by [`walk_operations`] a derived
//! type may override. Methods must be fed most-derived first: the first
//! occurrence of a [`SignatureKey`] claims it, and every later (ancestor)
//! occurrence is discarded.
//!
//! [`walk_operations`]: super::walk_operations

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::vm::class::{Class, Method, SignatureKey, Visibility};
use crate::vm::types::TypeRef;

/// Why an operation is not overridden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Sealed method
    Final,
    /// Class-level method
    Static,
    /// Invisible to subclasses
    Private,
    /// No implementation to route to
    Abstract,
    /// Covariant-return shadow
    Bridge,
    /// Package-visible method declared in another namespace
    ForeignPackage,
    /// Same key already claimed by a more-derived declaration
    Shadowed,
}

/// Stateful filter over a most-derived-first walk
#[derive(Debug)]
pub struct EligibilityFilter {
    namespace: String,
    claimed: FxHashSet<SignatureKey>,
    bridged: FxHashMap<(String, Vec<TypeRef>), String>,
}

impl EligibilityFilter {
    /// Filter for a walk starting at `target`
    pub fn for_target(target: &Class) -> Self {
        Self {
            namespace: target.namespace().to_string(),
            claimed: FxHashSet::default(),
            bridged: FxHashMap::default(),
        }
    }

    /// Classify the next method of the walk
    pub fn classify(&mut self, method: &Method) -> Result<(), Exclusion> {
        let sig = &method.signature;
        if method.modifiers.is_static {
            return Err(Exclusion::Static);
        }
        if sig.visibility == Visibility::Private {
            return Err(Exclusion::Private);
        }

        let key = sig.key();
        if self.claimed.contains(&key) {
            return Err(Exclusion::Shadowed);
        }
        let shape = (sig.name.clone(), sig.params.clone());
        if let Some(bridge_owner) = self.bridged.get(&shape) {
            // a bridge proves the operation was overridden below this ancestor
            if bridge_owner != &sig.declaring_type {
                return Err(Exclusion::Shadowed);
            }
        }
        self.claimed.insert(key);

        if method.modifiers.is_bridge {
            self.bridged.insert(shape, sig.declaring_type.clone());
            return Err(Exclusion::Bridge);
        }
        if method.modifiers.is_final {
            return Err(Exclusion::Final);
        }
        if method.modifiers.is_abstract {
            return Err(Exclusion::Abstract);
        }
        if sig.visibility == Visibility::Package && namespace_of(&sig.declaring_type) != self.namespace {
            return Err(Exclusion::ForeignPackage);
        }
        Ok(())
    }

    /// Ordered, deduplicated override candidates for `target`
    pub fn eligible_operations(target: &Class) -> Vec<Arc<Method>> {
        let mut filter = Self::for_target(target);
        super::walk_operations(target)
            .filter(|method| filter.classify(method).is_ok())
            .cloned()
            .collect()
    }
}

fn namespace_of(type_name: &str) -> &str {
    type_name.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{ClassBuilder, MethodDef, Value};

    fn names(methods: &[Arc<Method>]) -> Vec<String> {
        methods
            .iter()
            .map(|m| format!("{}.{}", m.signature.declaring_type, m.name()))
            .collect()
    }

    #[test]
    fn test_excludes_final_static_private_abstract() {
        let class = ClassBuilder::new("demo.Mixed")
            .method(MethodDef::new("open"))
            .method(MethodDef::new("sealed").as_final())
            .method(MethodDef::new("util").as_static())
            .method(MethodDef::new("secret").visibility(Visibility::Private))
            .method(MethodDef::new("todo").as_abstract())
            .method(MethodDef::new("guarded").visibility(Visibility::Protected))
            .build();
        assert_eq!(
            names(&EligibilityFilter::eligible_operations(&class)),
            vec!["demo.Mixed.open", "demo.Mixed.guarded"]
        );
    }

    #[test]
    fn test_most_derived_wins() {
        let base = ClassBuilder::new("demo.Base")
            .method(MethodDef::new("run"))
            .method(MethodDef::new("stop"))
            .build();
        let child = ClassBuilder::new("demo.Child")
            .extends(&base)
            .method(MethodDef::new("run"))
            .build();
        assert_eq!(
            names(&EligibilityFilter::eligible_operations(&child)),
            vec!["demo.Child.run", "demo.Base.stop"]
        );
    }

    #[test]
    fn test_final_override_hides_ancestor() {
        let base = ClassBuilder::new("demo.Base")
            .method(MethodDef::new("peek"))
            .build();
        let child = ClassBuilder::new("demo.Child")
            .extends(&base)
            .method(MethodDef::new("peek").as_final())
            .build();
        assert!(EligibilityFilter::eligible_operations(&child).is_empty());
    }

    #[test]
    fn test_overloads_are_distinct() {
        let class = ClassBuilder::new("demo.Printer")
            .method(MethodDef::new("print").param(TypeRef::I32))
            .method(MethodDef::new("print").param(TypeRef::Str))
            .build();
        assert_eq!(EligibilityFilter::eligible_operations(&class).len(), 2);
    }

    #[test]
    fn test_bridge_hides_ancestor_shape() {
        let base = ClassBuilder::new("demo.Source")
            .method(MethodDef::new("next").returns(TypeRef::class("lang.Object")))
            .build();
        let child = ClassBuilder::new("demo.TextSource")
            .extends(&base)
            .method(
                MethodDef::new("next")
                    .returns(TypeRef::class("lang.Object"))
                    .as_bridge(),
            )
            .method(
                MethodDef::new("next")
                    .returns(TypeRef::Str)
                    .body(|_, _| Ok(Value::str("x"))),
            )
            .build();
        let eligible = EligibilityFilter::eligible_operations(&child);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].signature.return_type, TypeRef::Str);
    }

    #[test]
    fn test_package_visibility_depends_on_namespace() {
        let base = ClassBuilder::new("core.Base")
            .method(MethodDef::new("internal").visibility(Visibility::Package))
            .build();
        let same = ClassBuilder::new("core.Same").extends(&base).build();
        let other = ClassBuilder::new("app.Other").extends(&base).build();
        assert_eq!(EligibilityFilter::eligible_operations(&same).len(), 1);
        assert!(EligibilityFilter::eligible_operations(&other).is_empty());
    }
}
