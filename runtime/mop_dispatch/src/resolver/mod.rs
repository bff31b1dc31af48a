//! Overload resolution.
//!
//! Picks the single best descriptor among the candidates sharing a name,
//! given the runtime argument values. Resolution is a pure function of the
//! candidate list and the arguments, so the same table and the same values
//! always produce the same descriptor or the same error.
//!
//! # Rules, in order
//!
//! 1. A lone candidate is selected when its arity fits; types are not checked.
//! 2. A single `null` argument selects the most general single-parameter
//!    overload.
//! 3. No arguments select the zero-parameter overload.
//! 4. Otherwise candidates are filtered by structural compatibility.
//! 5. A single-parameter overload also accepts zero arguments (implicit null).
//! 6. Several survivors are narrowed to the most specific; conflicting
//!    multi-parameter candidates are ambiguous.
//!
//! Stale descriptors, whose signature names a dropped declaring type, are
//! not candidates.

use mop_ir::TypeRef;
use smallvec::SmallVec;

use crate::core_types::CoreTypes;
use crate::errors::{ambiguous_overload, DispatchResult};
use crate::{MethodDescriptor, Value};

type Candidates<'a> = SmallVec<[&'a MethodDescriptor; 4]>;

/// Select the best candidate for `args`, or `None` when nothing fits.
///
/// `name` and `type_name` only feed the ambiguity error.
pub fn resolve(
    core: &CoreTypes,
    name: &str,
    type_name: &str,
    candidates: &[MethodDescriptor],
    args: &[Value],
) -> DispatchResult<Option<MethodDescriptor>> {
    let live: Vec<MethodDescriptor>;
    let candidates = if candidates.iter().any(MethodDescriptor::is_stale) {
        live = candidates.iter().filter(|m| !m.is_stale()).cloned().collect();
        &live[..]
    } else {
        candidates
    };
    let selected = match candidates {
        [] => None,
        [only] => arity_fits(only, args.len()).then(|| only.clone()),
        _ => match args {
            [Value::Null] => most_general_single_param(candidates),
            [] => candidates
                .iter()
                .find(|m| m.arity() == 0)
                .cloned()
                .or_else(|| most_general_single_param(candidates)),
            _ => {
                let compatible: Candidates<'_> = candidates
                    .iter()
                    .filter(|m| is_compatible(core, m, args))
                    .collect();
                match compatible.as_slice() {
                    [] => None,
                    [one] => Some((*one).clone()),
                    many => Some(most_specific(name, type_name, many)?),
                }
            }
        },
    };
    if let Some(method) = &selected {
        tracing::trace!(method = ?method, args = args.len(), "resolved overload");
    }
    Ok(selected)
}

fn arity_fits(method: &MethodDescriptor, arg_count: usize) -> bool {
    method.arity() == arg_count || (arg_count == 0 && method.arity() == 1)
}

/// Among single-parameter overloads whose parameter can hold `null`, the one
/// with the most general parameter type. Incomparable types prefer the
/// shallower hierarchy depth, then declaration order.
fn most_general_single_param(candidates: &[MethodDescriptor]) -> Option<MethodDescriptor> {
    let mut champion: Option<(&MethodDescriptor, TypeRef)> = None;
    for candidate in candidates {
        let Some(param) = candidate.param(0).filter(|_| candidate.arity() == 1) else {
            continue;
        };
        if param.is_primitive() {
            continue;
        }
        let Some((_, current_param)) = &champion else {
            champion = Some((candidate, param));
            continue;
        };
        if &param == current_param {
            continue;
        }
        let more_general = if param.is_assignable_from(current_param) {
            true
        } else if current_param.is_assignable_from(&param) {
            false
        } else {
            param.depth() < current_param.depth()
        };
        if more_general {
            champion = Some((candidate, param));
        }
    }
    champion.map(|(method, _)| method.clone())
}

/// Whether every argument can be passed to the matching parameter.
pub fn is_compatible(core: &CoreTypes, method: &MethodDescriptor, args: &[Value]) -> bool {
    method.arity() == args.len()
        && method
            .params()
            .iter()
            .zip(args)
            .all(|(param, arg)| accepts(core, param, arg))
}

fn accepts(core: &CoreTypes, param: &TypeRef, arg: &Value) -> bool {
    match arg {
        Value::Null => !param.is_primitive(),
        Value::Interpolated(_) => {
            param == &core.string || param.is_assignable_from(&core.gstring)
        }
        other => param.is_assignable_from(&core.type_of(other)),
    }
}

/// Narrow compatible candidates to the most specific one.
///
/// A running champion is replaced by a candidate unless the champion is
/// already at least as narrow in every position. Replacing a multi-parameter
/// champion requires the candidate to be at least as narrow everywhere.
fn most_specific(
    name: &str,
    type_name: &str,
    candidates: &[&MethodDescriptor],
) -> DispatchResult<MethodDescriptor> {
    let mut champion = candidates[0];
    let mut champion_params = champion.params();
    for &candidate in &candidates[1..] {
        let params = candidate.params();
        let champion_narrower = champion_params
            .iter()
            .zip(&params)
            .all(|(champ, cand)| cand.is_assignable_from(champ));
        if champion_narrower {
            continue;
        }
        if candidate.arity() > 1 {
            let conflicting = champion_params
                .iter()
                .zip(&params)
                .any(|(champ, cand)| !champ.is_assignable_from(cand));
            if conflicting {
                let signatures = candidates.iter().map(|m| m.signature()).collect();
                return Err(ambiguous_overload(name, type_name, signatures));
            }
        }
        champion = candidate;
        champion_params = params;
    }
    Ok(champion.clone())
}

/// Arguments as the selected descriptor receives them.
///
/// Interpolated text becomes `Str` for `String` parameters, integral values
/// become floating for floating parameters, and a single-parameter method
/// called with no arguments receives an implicit `null`.
pub fn coerce_arguments(
    core: &CoreTypes,
    method: &MethodDescriptor,
    args: &[Value],
) -> SmallVec<[Value; 4]> {
    if args.is_empty() && method.arity() == 1 {
        return smallvec::smallvec![Value::Null];
    }
    let params = method.params();
    args.iter()
        .enumerate()
        .map(|(i, arg)| match (params.get(i), arg) {
            (Some(param), Value::Interpolated(text)) if param == &core.string => {
                Value::Str(text.clone())
            }
            (Some(param), Value::Int(n))
                if param.primitive_kind().is_some_and(|kind| kind.is_floating()) =>
            {
                #[expect(clippy::cast_precision_loss, reason = "numeric widening")]
                let widened = *n as f64;
                Value::Float(widened)
            }
            _ => arg.clone(),
        })
        .collect()
}
