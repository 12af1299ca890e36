//! # Symbolic Expression Simplification Module
//!
//! Light algebraic clean-up applied to solver branches and derivatives before they are
//! compiled or shown to the user.
//!
//! 1. **Constant Folding**: arithmetic and functions on numerical constants
//! 2. **Algebraic Identities**: x + 0 = x, x * 1 = x, 0 * x = 0, x ^ 1 = x
//! 3. **Coefficient Merging**: c1 * (c2 * x) = (c1 c2) * x, so repeated negation disappears
//!
//! Folding never produces NaN or infinities: `1 / 0` and `ln(-1)` stay symbolic and
//! become gaps only when sampled.

use crate::symbolic::symbolic_engine::Expr;

fn finite(value: f64) -> Option<Expr> {
    if value.is_finite() {
        Some(Expr::Const(value))
    } else {
        None
    }
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// Simplifies the expression bottom-up.
    ///
    /// # Returns
    /// an equivalent expression; sampling it gives the same values as sampling `self`
    /// wherever `self` is finite
    pub fn simplify(&self) -> Expr {
        self.map_children(|child| child.simplify()).simplify_node()
    }

    /// rules for a node whose children are already simplified
    fn simplify_node(self) -> Expr {
        match self {
            Expr::Add(lhs, rhs) => match (*lhs, *rhs) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
                (l, r) if l.is_zero() => r,
                (l, r) if r.is_zero() => l,
                // a + (-1 * b) = a - b
                (l, Expr::Mul(c, r)) if *c == Expr::Const(-1.0) => Expr::Sub(l.boxed(), r),
                (Expr::Const(a), r) => Expr::Add(r.boxed(), Box::new(Expr::Const(a))),
                (l, r) => Expr::Add(l.boxed(), r.boxed()),
            },
            Expr::Sub(lhs, rhs) => match (*lhs, *rhs) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
                (l, r) if r.is_zero() => l,
                (l, r) if l.is_zero() => (-r).simplify_node(),
                (l, r) if l == r => Expr::Const(0.0),
                // a - (-1 * b) = a + b
                (l, Expr::Mul(c, r)) if *c == Expr::Const(-1.0) => Expr::Add(l.boxed(), r),
                (l, r) => Expr::Sub(l.boxed(), r.boxed()),
            },
            Expr::Mul(lhs, rhs) => match (*lhs, *rhs) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
                (l, r) if l.is_zero() || r.is_zero() => Expr::Const(0.0),
                (l, r) if l.is_one() => r,
                (l, r) if r.is_one() => l,
                // constants go to the left
                (l, Expr::Const(b)) => Expr::Mul(Box::new(Expr::Const(b)), l.boxed()).simplify_node(),
                (Expr::Const(a), Expr::Mul(inner_l, inner_r)) => match *inner_l {
                    Expr::Const(b) => Expr::Mul(Box::new(Expr::Const(a * b)), inner_r).simplify_node(),
                    other => Expr::Mul(
                        Box::new(Expr::Const(a)),
                        Box::new(Expr::Mul(other.boxed(), inner_r)),
                    ),
                },
                (l, r) => Expr::Mul(l.boxed(), r.boxed()),
            },
            Expr::Div(lhs, rhs) => match (*lhs, *rhs) {
                (Expr::Const(a), Expr::Const(b)) if b != 0.0 => Expr::Const(a / b),
                (l, r) if l.is_zero() && !r.is_zero() => Expr::Const(0.0),
                (l, r) if r.is_one() => l,
                (l, r) if l == r && !r.is_zero() => Expr::Const(1.0),
                (l, r) => Expr::Div(l.boxed(), r.boxed()),
            },
            Expr::Pow(base, exp) => match (*base, *exp) {
                (Expr::Const(a), Expr::Const(b)) => {
                    finite(a.powf(b)).unwrap_or_else(|| Expr::Const(a).pow(Expr::Const(b)))
                }
                (b, e) if e.is_one() => b,
                (_, e) if e.is_zero() => Expr::Const(1.0),
                (b, _) if b.is_one() => Expr::Const(1.0),
                (b, e) => Expr::Pow(b.boxed(), e.boxed()),
            },
            other => {
                let folded = other
                    .unary_arg()
                    .and_then(|arg| arg.as_const())
                    .and_then(|v| other.apply_unary(v))
                    .and_then(finite);
                folded.unwrap_or(other)
            }
        }
    }
}
