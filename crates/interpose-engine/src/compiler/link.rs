//! Linking a parsed descriptor into a loadable class.
//!
//! Resolves names against the unit's classpath and the compiler's loaded
//! types, checks every member against the parent chain and builds the
//! generated class with routed operation bodies.

use std::sync::Arc;

use crate::compiler::ast::{InitDecl, InitTarget, Literal, Member, OverrideDecl, Unit};
use crate::compiler::error::CompileError;
use crate::proxy::router::{self, OperationId, PassThroughHandler};
use crate::vm::reflect::ancestor_chain;
use crate::vm::{
    Class, ClassBuilder, ClassRegistry, FieldDef, Initializer, InitializerDef, Method, MethodDef,
    PrimitiveKind, TypeRef, Value, Visibility,
};

/// What a generated initializer stores in the handler slot
#[derive(Debug, Clone, Copy)]
enum SlotSource {
    /// The first argument
    Argument,
    /// A fresh pass-through handler
    PassThrough,
    /// Nothing
    Empty,
}

/// Links one unit
pub struct Linker<'a> {
    classpath: &'a [Arc<Class>],
    loaded: &'a ClassRegistry,
}

impl<'a> Linker<'a> {
    /// Linker resolving names from `classpath` first, then `loaded`
    pub fn new(classpath: &'a [Arc<Class>], loaded: &'a ClassRegistry) -> Self {
        Self { classpath, loaded }
    }

    fn resolve(&self, name: &str) -> Result<Arc<Class>, CompileError> {
        self.classpath
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .or_else(|| self.loaded.get_by_name(name))
            .ok_or_else(|| CompileError::UndefinedType {
                name: name.to_string(),
            })
    }

    /// Link `unit`, which must declare a class called `unique_name`
    pub fn link(&self, unique_name: &str, unit: &Unit) -> Result<Arc<Class>, CompileError> {
        for import in &unit.uses {
            self.resolve(&import.text)?;
        }

        let decl = &unit.class;
        if decl.name.text != unique_name {
            return Err(CompileError::InvalidUnit {
                detail: format!(
                    "unit declares {} but {} was requested",
                    decl.name.text, unique_name
                ),
            });
        }
        let parent = self.resolve(&decl.parent.text)?;
        if parent.is_final() {
            return Err(CompileError::InvalidUnit {
                detail: format!("{} is final and cannot be extended", parent.name()),
            });
        }

        let slot_name = self.slot_name(decl.members.iter(), &parent)?;
        let slot = parent.field_layout().len();
        let chain = ancestor_chain(&parent);

        let mut builder = ClassBuilder::new(unique_name)
            .extends(&parent)
            .field(FieldDef::new(slot_name.clone(), TypeRef::Handler).visibility(Visibility::Private));

        let mut seen_overrides = Vec::new();
        let mut seen_arities = Vec::new();
        for member in &decl.members {
            match member {
                Member::Slot(_) => {}
                Member::Override(op) => {
                    let method = Self::overridden(op, &chain)?;
                    let key = method.signature.key();
                    if seen_overrides.contains(&key) {
                        return Err(CompileError::SignatureMismatch {
                            operation: op.describe(),
                            detail: "operation is overridden twice".to_string(),
                        });
                    }
                    seen_overrides.push(key);
                    builder = builder.method(Self::routed_method(op, method, &chain, slot)?);
                }
                Member::Init(init) => {
                    let arity = usize::from(init.param.is_some());
                    if seen_arities.contains(&arity) {
                        return Err(CompileError::InvalidInitializer {
                            detail: format!("more than one initializer taking {} arguments", arity),
                        });
                    }
                    seen_arities.push(arity);
                    builder = builder.initializer(Self::initializer(init, &parent, slot)?);
                }
            }
        }

        Ok(builder.proxy_of(&parent, &slot_name).build())
    }

    fn slot_name<'m>(
        &self,
        members: impl Iterator<Item = &'m Member>,
        parent: &Class,
    ) -> Result<String, CompileError> {
        let slots: Vec<&str> = members
            .filter_map(|m| match m {
                Member::Slot(slot) => Some(slot.name.as_str()),
                _ => None,
            })
            .collect();
        let name = match slots.as_slice() {
            [name] => *name,
            [] => {
                return Err(CompileError::InvalidUnit {
                    detail: "no handler slot declared".to_string(),
                })
            }
            _ => {
                return Err(CompileError::InvalidUnit {
                    detail: format!("{} handler slots declared", slots.len()),
                })
            }
        };
        if parent.chain_declares_field(name) {
            return Err(CompileError::InvalidUnit {
                detail: format!("slot {} collides with a field of {}", name, parent.name()),
            });
        }
        Ok(name.to_string())
    }

    fn overridden(op: &OverrideDecl, chain: &[Arc<Class>]) -> Result<Arc<Method>, CompileError> {
        let origin = chain
            .iter()
            .find(|c| c.name() == op.origin.text)
            .ok_or_else(|| CompileError::UnknownOperation {
                operation: op.describe(),
                origin: op.origin.text.clone(),
            })?;
        let method = origin
            .declared_methods()
            .iter()
            .find(|m| {
                !m.modifiers.is_bridge
                    && m.signature.name == op.name
                    && m.signature.params == op.params
                    && m.signature.return_type == op.return_type
            })
            .ok_or_else(|| CompileError::UnknownOperation {
                operation: op.describe(),
                origin: origin.name().to_string(),
            })?;

        let mismatch = |detail: &str| CompileError::SignatureMismatch {
            operation: op.describe(),
            detail: detail.to_string(),
        };
        let modifiers = method.modifiers;
        if modifiers.is_final {
            return Err(mismatch("operation is final"));
        }
        if modifiers.is_static {
            return Err(mismatch("operation is static"));
        }
        if modifiers.is_abstract {
            return Err(mismatch("operation has no implementation"));
        }
        if method.signature.visibility == Visibility::Private {
            return Err(mismatch("operation is private"));
        }
        if method.signature.variadic != op.variadic {
            return Err(mismatch("variadic marker differs"));
        }
        let declared: Vec<&str> = method.signature.throws.iter().map(|k| k.name()).collect();
        let same_throws = declared.len() == op.throws.len()
            && op.throws.iter().all(|name| declared.contains(&name.as_str()));
        if !same_throws {
            return Err(mismatch(&format!(
                "declared failures [{}] differ from [{}]",
                op.throws.join(", "),
                declared.join(", ")
            )));
        }
        Ok(method.clone())
    }

    fn routed_method(
        op: &OverrideDecl,
        method: Arc<Method>,
        chain: &[Arc<Class>],
        slot: usize,
    ) -> Result<MethodDef, CompileError> {
        let origin = chain
            .iter()
            .find(|c| c.name() == op.origin.text)
            .cloned()
            .ok_or_else(|| CompileError::UndefinedType {
                name: op.origin.text.clone(),
            })?;
        let sig = method.signature.clone();

        let mut def = sig
            .params
            .iter()
            .fold(MethodDef::new(sig.name.clone()), |def, ty| def.param(ty.clone()))
            .returns(sig.return_type.clone())
            .visibility(sig.visibility);
        for kind in &sig.throws {
            def = def.throws(kind.clone());
        }
        if sig.variadic {
            def = def.variadic();
        }

        let operation = OperationId::new(origin, method);
        Ok(def.body(move |this, args| router::dispatch(this, &operation, slot, args)))
    }

    fn initializer(
        init: &InitDecl,
        parent: &Class,
        slot: usize,
    ) -> Result<InitializerDef, CompileError> {
        let source = match (&init.param, init.passthrough) {
            (Some(name), true) => {
                return Err(CompileError::InvalidInitializer {
                    detail: format!(
                        "init({}) cannot install a pass-through handler",
                        name
                    ),
                })
            }
            (Some(_), false) => SlotSource::Argument,
            (None, true) => SlotSource::PassThrough,
            (None, false) => SlotSource::Empty,
        };

        let delegate: Option<(Arc<Initializer>, Vec<Value>)> = match &init.target {
            InitTarget::Nothing if parent.initializers().is_empty() => None,
            InitTarget::Nothing => {
                return Err(CompileError::InvalidInitializer {
                    detail: format!(
                        "{} declares initializers, init cannot delegate to none",
                        parent.name()
                    ),
                })
            }
            InitTarget::Super { index, args } => {
                let target = parent.initializers().get(*index).ok_or_else(|| {
                    CompileError::InvalidInitializer {
                        detail: format!("{} has no initializer #{}", parent.name(), index),
                    }
                })?;
                if !target.is_accessible() {
                    return Err(CompileError::InvalidInitializer {
                        detail: format!("initializer #{} of {} is private", index, parent.name()),
                    });
                }
                if target.params.len() != args.len() {
                    return Err(CompileError::InvalidInitializer {
                        detail: format!(
                            "initializer #{} of {} takes {} arguments, {} given",
                            index,
                            parent.name(),
                            target.params.len(),
                            args.len()
                        ),
                    });
                }
                let values = target
                    .params
                    .iter()
                    .zip(args)
                    .map(|(ty, literal)| literal_value(literal, ty))
                    .collect::<Result<Vec<_>, _>>()?;
                Some((target.clone(), values))
            }
        };

        let mut def = InitializerDef::new();
        if init.param.is_some() {
            def = def.param(TypeRef::Handler);
        }
        Ok(def.body(move |this, args| {
            if let Some((target, defaults)) = &delegate {
                target.run(this, defaults)?;
            }
            let handler = match source {
                SlotSource::Argument => args.first().cloned().unwrap_or(Value::Null),
                SlotSource::PassThrough => Value::Handler(Arc::new(PassThroughHandler)),
                SlotSource::Empty => Value::Null,
            };
            this.set_field_at(slot, handler)?;
            Ok(Value::Null)
        }))
    }
}

/// Convert a default literal to a value of `ty`
pub fn literal_value(literal: &Literal, ty: &TypeRef) -> Result<Value, CompileError> {
    let value = match (literal, ty) {
        (Literal::Null, TypeRef::Primitive(_) | TypeRef::Void) => None,
        (Literal::Null, _) => Some(Value::Null),
        (Literal::Bool(b), TypeRef::Primitive(PrimitiveKind::Bool)) => Some(Value::Bool(*b)),
        (Literal::Int(i), TypeRef::Primitive(PrimitiveKind::I32)) => {
            i32::try_from(*i).ok().map(Value::I32)
        }
        (Literal::Int(i), TypeRef::Primitive(PrimitiveKind::I64)) => Some(Value::I64(*i)),
        (Literal::Int(i), TypeRef::Primitive(PrimitiveKind::F64)) => Some(Value::F64(*i as f64)),
        (Literal::Int(0), TypeRef::Primitive(PrimitiveKind::Char)) => Some(Value::Char('\0')),
        (Literal::Float(f), TypeRef::Primitive(PrimitiveKind::F64)) => Some(Value::F64(*f)),
        _ => None,
    };
    value.ok_or_else(|| CompileError::InvalidDefault {
        literal: literal.to_string(),
        expected: ty.to_string(),
    })
}
