//! Error types for dispatch.
//!
//! # Structured Error Categories
//!
//! `DispatchErrorKind` carries the structured data of every failure the
//! engine can report. Factory functions (e.g. `no_such_method()`) are the
//! public constructors; the `Display` impl renders the kind.
//!
//! Categories:
//! - **Build-time**: `TableBuild`, fatal for that type, never retried.
//! - **Resolution-time**: `NoSuchMethod`, `NoSuchProperty`,
//!   `NoMatchingConstructor`, `NullReceiver`, `InvalidExtension`. Callers
//!   may recover, e.g. by forwarding to a delegate object.
//! - **Ambiguity**: `AmbiguousOverload`, an authoring defect, never resolved
//!   silently.
//! - **Access**: `ReadOnlyProperty`, `WriteOnlyProperty`, `AccessDenied`.
//! - **Invocation-time**: `Raised`, produced by callables and interceptors.

use std::fmt;

/// Result of a dispatch operation.
pub type DispatchResult<T = crate::Value> = Result<T, DispatchError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchErrorKind {
    #[error("cannot build dispatch table for {type_name}: {cause}")]
    TableBuild { type_name: String, cause: String },

    #[error(
        "no method '{name}' on type {type_name} for arguments ({})",
        .arg_types.join(", ")
    )]
    NoSuchMethod {
        name: String,
        type_name: String,
        arg_types: Vec<String>,
    },

    #[error("no property '{name}' on type {type_name}")]
    NoSuchProperty { name: String, type_name: String },

    #[error(
        "no constructor of {type_name} matches arguments ({})",
        .arg_types.join(", ")
    )]
    NoMatchingConstructor {
        type_name: String,
        arg_types: Vec<String>,
    },

    #[error(
        "ambiguous method overloading for '{name}' on type {type_name}: {}",
        .candidates.join(" vs ")
    )]
    AmbiguousOverload {
        name: String,
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("property '{name}' on type {type_name} is read-only")]
    ReadOnlyProperty { name: String, type_name: String },

    #[error("property '{name}' on type {type_name} is write-only")]
    WriteOnlyProperty { name: String, type_name: String },

    #[error("access to {member} on type {type_name} denied")]
    AccessDenied { member: String, type_name: String },

    #[error("cannot dispatch '{name}' on a null receiver")]
    NullReceiver { name: String },

    #[error("cannot register extension '{name}' on {target}: {reason}")]
    InvalidExtension {
        name: String,
        target: String,
        reason: String,
    },

    /// Failure raised by a callable or an interceptor hook.
    #[error("{message}")]
    Raised { message: String },
}

/// Dispatch error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    /// Additional context, outermost last.
    pub notes: Vec<String>,
}

impl DispatchError {
    fn from_kind(kind: DispatchErrorKind) -> Self {
        Self {
            kind,
            notes: Vec::new(),
        }
    }

    /// Attach a context note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Whether this is a resolution miss a caller may recover from.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            DispatchErrorKind::NoSuchMethod { .. }
                | DispatchErrorKind::NoSuchProperty { .. }
                | DispatchErrorKind::NoMatchingConstructor { .. }
        )
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DispatchError {}

impl From<DispatchErrorKind> for DispatchError {
    fn from(kind: DispatchErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

/// Failure reported by an invocation strategy.
///
/// The engine never hands these to callers as-is: `Wrapped` layers are
/// peeled off, `Target` is passed through unchanged and `IllegalAccess`
/// becomes [`DispatchErrorKind::AccessDenied`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvokeError {
    /// The callable itself failed.
    Target(DispatchError),
    /// The call mechanism refused access to the member.
    IllegalAccess { reason: String },
    /// A failure wrapped by the call mechanism.
    Wrapped(Box<InvokeError>),
}

impl InvokeError {
    /// A failure raised by the callable's own logic.
    pub fn raised(message: impl Into<String>) -> Self {
        InvokeError::Target(raised(message))
    }

    /// Wrap a failure the way a reflective call layer would.
    pub fn wrap(self) -> Self {
        InvokeError::Wrapped(Box::new(self))
    }

    pub(crate) fn into_dispatch_error(self, member: &str, type_name: &str) -> DispatchError {
        let mut current = self;
        loop {
            match current {
                InvokeError::Wrapped(inner) => current = *inner,
                InvokeError::Target(error) => return error,
                InvokeError::IllegalAccess { reason } => {
                    return access_denied(member, type_name).with_note(reason)
                }
            }
        }
    }
}

impl From<DispatchError> for InvokeError {
    fn from(error: DispatchError) -> Self {
        InvokeError::Target(error)
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Target(error) => write!(f, "{error}"),
            InvokeError::IllegalAccess { reason } => write!(f, "illegal access: {reason}"),
            InvokeError::Wrapped(inner) => write!(f, "invocation failed: {inner}"),
        }
    }
}

impl std::error::Error for InvokeError {}

// Factories

pub fn table_build(type_name: &str, cause: impl fmt::Display) -> DispatchError {
    DispatchErrorKind::TableBuild {
        type_name: type_name.to_owned(),
        cause: cause.to_string(),
    }
    .into()
}

pub fn no_such_method(name: &str, type_name: &str, arg_types: Vec<String>) -> DispatchError {
    DispatchErrorKind::NoSuchMethod {
        name: name.to_owned(),
        type_name: type_name.to_owned(),
        arg_types,
    }
    .into()
}

pub fn no_such_property(name: &str, type_name: &str) -> DispatchError {
    DispatchErrorKind::NoSuchProperty {
        name: name.to_owned(),
        type_name: type_name.to_owned(),
    }
    .into()
}

pub fn no_matching_constructor(type_name: &str, arg_types: Vec<String>) -> DispatchError {
    DispatchErrorKind::NoMatchingConstructor {
        type_name: type_name.to_owned(),
        arg_types,
    }
    .into()
}

pub fn ambiguous_overload(name: &str, type_name: &str, candidates: Vec<String>) -> DispatchError {
    DispatchErrorKind::AmbiguousOverload {
        name: name.to_owned(),
        type_name: type_name.to_owned(),
        candidates,
    }
    .into()
}

pub fn read_only_property(name: &str, type_name: &str) -> DispatchError {
    DispatchErrorKind::ReadOnlyProperty {
        name: name.to_owned(),
        type_name: type_name.to_owned(),
    }
    .into()
}

pub fn write_only_property(name: &str, type_name: &str) -> DispatchError {
    DispatchErrorKind::WriteOnlyProperty {
        name: name.to_owned(),
        type_name: type_name.to_owned(),
    }
    .into()
}

pub fn access_denied(member: &str, type_name: &str) -> DispatchError {
    DispatchErrorKind::AccessDenied {
        member: member.to_owned(),
        type_name: type_name.to_owned(),
    }
    .into()
}

pub fn null_receiver(name: &str) -> DispatchError {
    DispatchErrorKind::NullReceiver {
        name: name.to_owned(),
    }
    .into()
}

pub fn invalid_extension(name: &str, target: &str, reason: impl Into<String>) -> DispatchError {
    DispatchErrorKind::InvalidExtension {
        name: name.to_owned(),
        target: target.to_owned(),
        reason: reason.into(),
    }
    .into()
}

pub fn raised(message: impl Into<String>) -> DispatchError {
    DispatchErrorKind::Raised {
        message: message.into(),
    }
    .into()
}

#[cfg(test)]
mod tests;
