//! # Dispatch Tables
//!
//! Operations on a subsystem are described by [`OperationDescriptor`]s: a
//! name, a parameter signature, a [`CallKind`] and a plain function pointer.
//! A [`DispatchTable`] groups the descriptors for one target type, keyed by
//! name, with overloads distinguished by their parameter types.
//!
//! Resolution binds a target and argument values to exactly one descriptor.
//! The result is a [`ResolvedCall`], which the gate runs now or queues.
//!
//! ```rust
//! use readygate_core::{Arg, ArgType, CallKind, DispatchTable, OperationDescriptor, Target};
//!
//! struct Engine;
//!
//! impl Engine {
//!     fn load(&self, _path: &str) {}
//! }
//!
//! let mut table = DispatchTable::<Engine>::new();
//! table
//!     .register(OperationDescriptor::instance(
//!         "load",
//!         &[ArgType::Str],
//!         CallKind::Handoff,
//!         |engine, args| {
//!             engine.load(args[0].as_str(0)?.unwrap_or_default());
//!             Ok(())
//!         },
//!     ))
//!     .expect("register");
//!
//! let target = Target::instance(Engine);
//! let call = table.resolve(&target, "load", vec![Arg::new("profile")]);
//! assert!(call.is_ok());
//! ```

use crate::call::HandoffCall;
use crate::types::{Arg, ArgType, ArgValue, CallError, CallKind, ConfigurationError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Body of an operation bound to an instance.
pub type InstanceFn<T> = fn(&T, &[ArgValue]) -> Result<(), CallError>;

/// Body of an operation with no instance.
pub type StaticFn = fn(&[ArgValue]) -> Result<(), CallError>;

// =============================================================================
// TARGET
// =============================================================================

/// What an operation is invoked on.
pub enum Target<T> {
    /// A shared instance.
    Instance(Arc<T>),
    /// No instance; only static operations resolve.
    Static,
}

impl<T> Target<T> {
    /// Wrap a value as an instance target.
    pub fn instance(value: T) -> Self {
        Target::Instance(Arc::new(value))
    }

    fn kind(&self) -> &'static str {
        match self {
            Target::Instance(_) => "an instance",
            Target::Static => "static",
        }
    }
}

impl<T> Clone for Target<T> {
    fn clone(&self) -> Self {
        match self {
            Target::Instance(value) => Target::Instance(Arc::clone(value)),
            Target::Static => Target::Static,
        }
    }
}

// =============================================================================
// OPERATION DESCRIPTOR
// =============================================================================

enum Invoker<T> {
    Instance(InstanceFn<T>),
    Static(StaticFn),
}

impl<T> Clone for Invoker<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Invoker<T> {}

/// One named operation with a fixed parameter signature.
pub struct OperationDescriptor<T> {
    name: &'static str,
    params: &'static [ArgType],
    kind: CallKind,
    invoker: Invoker<T>,
}

impl<T> OperationDescriptor<T> {
    /// Describe an operation invoked on an instance of `T`.
    #[must_use]
    pub const fn instance(
        name: &'static str,
        params: &'static [ArgType],
        kind: CallKind,
        body: InstanceFn<T>,
    ) -> Self {
        Self {
            name,
            params,
            kind,
            invoker: Invoker::Instance(body),
        }
    }

    /// Describe an operation that needs no instance.
    #[must_use]
    pub const fn static_fn(
        name: &'static str,
        params: &'static [ArgType],
        kind: CallKind,
        body: StaticFn,
    ) -> Self {
        Self {
            name,
            params,
            kind,
            invoker: Invoker::Static(body),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn params(&self) -> &'static [ArgType] {
        self.params
    }

    #[must_use]
    pub fn kind(&self) -> CallKind {
        self.kind
    }

    /// Whether this descriptor needs an instance target.
    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(self.invoker, Invoker::Instance(_))
    }
}

impl<T> Clone for OperationDescriptor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OperationDescriptor<T> {}

impl<T> fmt::Debug for OperationDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("kind", &self.kind)
            .field("instance", &self.is_instance())
            .finish()
    }
}

// =============================================================================
// DISPATCH TABLE
// =============================================================================

/// Operations available on targets of type `T`.
pub struct DispatchTable<T> {
    ops: BTreeMap<&'static str, Vec<OperationDescriptor<T>>>,
}

impl<T> Default for DispatchTable<T> {
    fn default() -> Self {
        Self {
            ops: BTreeMap::new(),
        }
    }
}

impl<T> DispatchTable<T> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor. A second descriptor with the same name and
    /// parameter types is rejected.
    pub fn register(
        &mut self,
        descriptor: OperationDescriptor<T>,
    ) -> Result<&mut Self, ConfigurationError> {
        let overloads = self.ops.entry(descriptor.name).or_default();
        if overloads.iter().any(|d| d.params == descriptor.params) {
            return Err(ConfigurationError::DuplicateSignature {
                name: descriptor.name.to_string(),
                params: descriptor.params.to_vec(),
            });
        }
        overloads.push(descriptor);
        Ok(self)
    }

    /// Number of registered descriptors, overloads counted separately.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// All descriptors, ordered by name then registration.
    pub fn descriptors(&self) -> impl Iterator<Item = &OperationDescriptor<T>> {
        self.ops.values().flatten()
    }

    /// Find the descriptor matching `name` and the argument types.
    pub fn lookup(
        &self,
        name: &str,
        args: &[Arg],
    ) -> Result<&OperationDescriptor<T>, ConfigurationError> {
        let overloads = self
            .ops
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownOperation(name.to_string()))?;

        let found = args
            .iter()
            .enumerate()
            .map(|(index, arg)| arg.effective_type(index))
            .collect::<Result<Vec<_>, _>>()?;

        overloads
            .iter()
            .find(|d| d.params == found.as_slice())
            .ok_or_else(|| ConfigurationError::NoMatchingSignature {
                name: name.to_string(),
                found,
            })
    }

    /// Bind `target` and `args` to a queueable operation.
    ///
    /// Fails if no descriptor matches, if the descriptor is a `Direct` call,
    /// or if the target kind does not fit the descriptor.
    pub fn resolve(
        &self,
        target: &Target<T>,
        name: &str,
        args: Vec<Arg>,
    ) -> Result<ResolvedCall<T>, ConfigurationError> {
        let descriptor = *self.lookup(name, &args)?;

        if descriptor.kind != CallKind::Handoff {
            return Err(ConfigurationError::NotQueueable(name.to_string()));
        }

        let bound = match (descriptor.invoker, target) {
            (Invoker::Instance(body), Target::Instance(instance)) => {
                Bound::Instance(body, Arc::clone(instance))
            }
            (Invoker::Static(body), Target::Static) => Bound::Static(body),
            (invoker, target) => {
                let expected = match invoker {
                    Invoker::Instance(_) => "an instance operation",
                    Invoker::Static(_) => "a static operation",
                };
                return Err(ConfigurationError::TargetMismatch {
                    name: name.to_string(),
                    expected,
                    actual: target.kind(),
                });
            }
        };

        Ok(ResolvedCall {
            name: descriptor.name,
            bound,
            args: args.into_iter().map(|arg| arg.value).collect(),
        })
    }
}

// =============================================================================
// RESOLVED CALL
// =============================================================================

enum Bound<T> {
    Instance(InstanceFn<T>, Arc<T>),
    Static(StaticFn),
}

/// A descriptor bound to its target and argument values.
pub struct ResolvedCall<T> {
    name: &'static str,
    bound: Bound<T>,
    args: Vec<ArgValue>,
}

impl<T> ResolvedCall<T> {
    #[must_use]
    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }
}

impl<T: Send + Sync + 'static> HandoffCall for ResolvedCall<T> {
    fn name(&self) -> &str {
        self.name
    }

    fn call(self) -> Result<(), CallError> {
        match self.bound {
            Bound::Instance(body, instance) => body(&instance, &self.args),
            Bound::Static(body) => body(&self.args),
        }
    }
}

impl<T> fmt::Debug for ResolvedCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCall")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
