//! Runtime ABI known to the compiler.
//!
//! The runtime library (`mare-runtime`) exports printing helpers and
//! elementary math with the C calling convention. Their prototypes are
//! seeded into the prototype registry at the start of every compilation so
//! user programs can call them without writing `extern` declarations; the
//! symbols resolve at link time.

use crate::ast::{FnKind, Param, Prototype, Ty};
use crate::span::Span;

fn proto(name: &str, params: &[(&str, Ty)], ret: Ty) -> Prototype {
    Prototype {
        name: name.to_string(),
        params: params
            .iter()
            .map(|(name, ty)| Param {
                name: (*name).to_string(),
                ty: *ty,
            })
            .collect(),
        ret,
        kind: FnKind::Plain,
        span: Span::dummy(),
    }
}

fn unary_math(name: &str) -> [Prototype; 2] {
    [
        proto(&format!("__mare_{name}d"), &[("x", Ty::Double)], Ty::Double),
        proto(&format!("__mare_{name}f"), &[("x", Ty::Float)], Ty::Float),
    ]
}

fn binary_math(name: &str) -> [Prototype; 2] {
    [
        proto(
            &format!("__mare_{name}d"),
            &[("x", Ty::Double), ("y", Ty::Double)],
            Ty::Double,
        ),
        proto(
            &format!("__mare_{name}f"),
            &[("x", Ty::Float), ("y", Ty::Float)],
            Ty::Float,
        ),
    ]
}

/// Prototypes for every function the runtime library exports.
pub fn intrinsic_prototypes() -> Vec<Prototype> {
    let mut protos = vec![
        proto("__mare_printc", &[("x", Ty::I8)], Ty::Void),
        proto("__mare_printstr", &[("x", Ty::Str)], Ty::Void),
        proto("__mare_printf", &[("x", Ty::Float)], Ty::Void),
        proto("__mare_printd", &[("x", Ty::Double)], Ty::Void),
        proto("__mare_printi8", &[("x", Ty::I8)], Ty::Void),
        proto("__mare_printi16", &[("x", Ty::I16)], Ty::Void),
        proto("__mare_printi32", &[("x", Ty::I32)], Ty::Void),
        proto("__mare_printi64", &[("x", Ty::I64)], Ty::Void),
        proto("putchard", &[("x", Ty::Double)], Ty::Double),
    ];

    for name in ["sqrt", "sin", "cos", "tan", "log", "exp", "round", "floor", "ceil"] {
        protos.extend(unary_math(name));
    }
    for name in ["pow", "hypot", "fmod"] {
        protos.extend(binary_math(name));
    }

    protos
}
