//! Method descriptors and invocation strategies.
//!
//! A [`MethodDescriptor`] is the immutable record of one callable: its name,
//! declaring type, parameter types, return type, modifiers and the
//! [`Invoker`] that performs the call. Descriptors are `Arc`-shared between
//! the table that declares them and every table that inherits or imports
//! them.
//!
//! # Invoker Calling Convention
//!
//! - Instance methods receive the receiver and the (coerced) arguments.
//! - Static methods and constructors receive `Value::Null` as receiver.
//! - Extension methods are static-shaped: the receiver arrives as `args[0]`,
//!   matching the leading self parameter of their signature.
//!
//! # Retention
//!
//! A descriptor holds its declaring type weakly, including where that type
//! appears in its own signature (a constructor's return type, a `compareTo`
//! parameter). The registry owns descriptors for as long as a type is
//! described, so a strong self-reference would keep every such type alive.
//! Invokers that need their own type should capture a [`WeakTypeRef`] too.

use std::fmt;
use std::sync::Arc;

use mop_ir::{Modifiers, Name, StringInterner, TypeKey, TypeRef, Visibility, WeakTypeRef};
use smallvec::SmallVec;

use crate::{InvokeError, Value};

/// Sentinel method name of constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";

type InvokeFn = dyn Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync;

/// Shared invocation strategy of a descriptor.
#[derive(Clone)]
pub struct Invoker(Arc<InvokeFn>);

impl Invoker {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        Invoker(Arc::new(f))
    }

    #[inline]
    pub fn call(&self, receiver: &Value, args: &[Value]) -> Result<Value, InvokeError> {
        (self.0)(receiver, args)
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invoker")
    }
}

/// Parameter types as resolved for one dispatch.
pub type ParamTypes = SmallVec<[TypeRef; 4]>;

/// A type in a signature.
#[derive(Clone)]
enum SigType {
    /// The declaring type, held through `DescriptorData::declaring`.
    Declaring,
    Other(TypeRef),
}

struct DescriptorData {
    name: Name,
    name_text: &'static str,
    declaring: WeakTypeRef,
    declaring_name: Arc<str>,
    params: Vec<SigType>,
    return_type: Option<SigType>,
    modifiers: Modifiers,
    invoker: Invoker,
}

/// Immutable, shared description of one callable.
#[derive(Clone)]
pub struct MethodDescriptor(Arc<DescriptorData>);

impl MethodDescriptor {
    /// Start describing a method `name` declared on `declaring`.
    pub fn builder<'a>(
        interner: &'a StringInterner,
        name: &str,
        declaring: &TypeRef,
    ) -> DescriptorBuilder<'a> {
        DescriptorBuilder {
            interner,
            name: interner.intern(name),
            declaring: declaring.clone(),
            params: Vec::new(),
            return_type: None,
            modifiers: Modifiers::PUBLIC,
        }
    }

    /// Start describing a constructor of `declaring`.
    pub fn constructor<'a>(
        interner: &'a StringInterner,
        declaring: &TypeRef,
    ) -> DescriptorBuilder<'a> {
        Self::builder(interner, CONSTRUCTOR_NAME, declaring).returns(declaring)
    }

    #[inline]
    pub fn name(&self) -> Name {
        self.0.name
    }

    pub fn name_text(&self) -> &'static str {
        self.0.name_text
    }

    pub fn declaring_key(&self) -> TypeKey {
        self.0.declaring.key()
    }

    pub fn declaring_name(&self) -> &str {
        &self.0.declaring_name
    }

    /// Declaring type, if it is still alive.
    pub fn declaring_type(&self) -> Option<TypeRef> {
        self.0.declaring.upgrade()
    }

    fn resolve_type(&self, ty: &SigType) -> Option<TypeRef> {
        match ty {
            SigType::Declaring => self.0.declaring.upgrade(),
            SigType::Other(ty) => Some(ty.clone()),
        }
    }

    fn type_key(&self, ty: &SigType) -> TypeKey {
        match ty {
            SigType::Declaring => self.0.declaring.key(),
            SigType::Other(ty) => ty.key(),
        }
    }

    fn type_name<'a>(&'a self, ty: &'a SigType) -> &'a str {
        match ty {
            SigType::Declaring => &self.0.declaring_name,
            SigType::Other(ty) => ty.name(),
        }
    }

    /// Parameter types, or `None` for a stale descriptor.
    pub fn param_types(&self) -> Option<ParamTypes> {
        self.0.params.iter().map(|ty| self.resolve_type(ty)).collect()
    }

    /// Parameter types; empty for a stale descriptor.
    pub fn params(&self) -> ParamTypes {
        self.param_types().unwrap_or_default()
    }

    pub fn param(&self, index: usize) -> Option<TypeRef> {
        self.0.params.get(index).and_then(|ty| self.resolve_type(ty))
    }

    /// Whether the signature names the declaring type and that type has
    /// been dropped. Stale descriptors never take part in resolution.
    pub fn is_stale(&self) -> bool {
        self.0.params.iter().any(|ty| matches!(ty, SigType::Declaring))
            && !self.0.declaring.is_alive()
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.0.params.len()
    }

    /// Declared return type; `None` for dynamically typed results.
    pub fn return_type(&self) -> Option<TypeRef> {
        self.0.return_type.as_ref().and_then(|ty| self.resolve_type(ty))
    }

    pub fn modifiers(&self) -> Modifiers {
        self.0.modifiers
    }

    pub fn visibility(&self) -> Visibility {
        self.0.modifiers.visibility()
    }

    pub fn is_static(&self) -> bool {
        self.0.modifiers.is_static()
    }

    pub fn is_extension(&self) -> bool {
        self.0.modifiers.is_extension()
    }

    pub fn is_constructor(&self) -> bool {
        self.0.name_text == CONSTRUCTOR_NAME
    }

    pub fn invoker(&self) -> &Invoker {
        &self.0.invoker
    }

    /// Whether both describe "the same method": equal name, visibility,
    /// return type and parameter types.
    pub fn same_method(&self, other: &MethodDescriptor) -> bool {
        let return_key = |m: &MethodDescriptor| m.0.return_type.as_ref().map(|ty| m.type_key(ty));
        self.0.name == other.0.name
            && self.visibility() == other.visibility()
            && return_key(self) == return_key(other)
            && self.same_params(other)
    }

    /// Whether both declare the identical parameter-type list.
    pub fn same_params(&self, other: &MethodDescriptor) -> bool {
        self.0.params.len() == other.0.params.len()
            && self
                .0
                .params
                .iter()
                .zip(&other.0.params)
                .all(|(a, b)| self.type_key(a) == other.type_key(b))
    }

    /// Whether both handles point at the same descriptor record.
    pub fn ptr_eq(&self, other: &MethodDescriptor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Copy of this descriptor flagged as an extension.
    pub(crate) fn as_extension(&self) -> MethodDescriptor {
        if self.is_extension() {
            return self.clone();
        }
        MethodDescriptor(Arc::new(DescriptorData {
            name: self.0.name,
            name_text: self.0.name_text,
            declaring: self.0.declaring.clone(),
            declaring_name: Arc::clone(&self.0.declaring_name),
            params: self.0.params.clone(),
            return_type: self.0.return_type.clone(),
            modifiers: self.0.modifiers | Modifiers::EXTENSION,
            invoker: self.0.invoker.clone(),
        }))
    }

    /// `name(P1, P2)` rendering used in diagnostics.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.0.params.iter().map(|ty| self.type_name(ty)).collect();
        format!("{}({})", self.0.name_text, params.join(", "))
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0.declaring_name, self.signature())
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.visibility())?;
        if self.is_static() {
            write!(f, "static ")?;
        }
        match &self.0.return_type {
            Some(ty) => write!(f, "{} ", self.type_name(ty))?,
            None => write!(f, "def ")?,
        }
        write!(f, "{}.{}", self.0.declaring_name, self.signature())
    }
}

/// Builder for [`MethodDescriptor`].
#[must_use]
pub struct DescriptorBuilder<'a> {
    interner: &'a StringInterner,
    name: Name,
    declaring: TypeRef,
    params: Vec<TypeRef>,
    return_type: Option<TypeRef>,
    modifiers: Modifiers,
}

impl DescriptorBuilder<'_> {
    pub fn param(mut self, ty: &TypeRef) -> Self {
        self.params.push(ty.clone());
        self
    }

    pub fn params(mut self, types: &[&TypeRef]) -> Self {
        self.params.extend(types.iter().map(|ty| (*ty).clone()));
        self
    }

    pub fn returns(mut self, ty: &TypeRef) -> Self {
        self.return_type = Some(ty.clone());
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.modifiers |= Modifiers::STATIC;
        self
    }

    /// Replace the visibility flags, keeping the others.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.modifiers
            .remove(Modifiers::PUBLIC | Modifiers::PROTECTED | Modifiers::PRIVATE);
        self.modifiers |= match visibility {
            Visibility::Public => Modifiers::PUBLIC,
            Visibility::Protected => Modifiers::PROTECTED,
            Visibility::Private => Modifiers::PRIVATE,
        };
        self
    }

    /// Bind the invocation strategy and finish.
    pub fn invoke<F>(self, f: F) -> MethodDescriptor
    where
        F: Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        self.invoker(Invoker::new(f))
    }

    pub fn invoker(self, invoker: Invoker) -> MethodDescriptor {
        let declaring = &self.declaring;
        let sig_type = |ty: TypeRef| {
            if &ty == declaring {
                SigType::Declaring
            } else {
                SigType::Other(ty)
            }
        };
        MethodDescriptor(Arc::new(DescriptorData {
            name: self.name,
            name_text: self.interner.lookup(self.name),
            declaring: declaring.downgrade(),
            declaring_name: Arc::from(declaring.name()),
            params: self.params.into_iter().map(sig_type).collect(),
            return_type: self.return_type.map(sig_type),
            modifiers: self.modifiers,
            invoker,
        }))
    }
}
