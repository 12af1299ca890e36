//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of expression trees.
//!
//! ## Key Methods
//! - `diff(var: &str)` - derivative with respect to one symbol, unsimplified
//! - `diff_simplified(var: &str)` - derivative passed through `simplify()`
//!
//! ## Interesting Code Features
//!
//! 1. **Recursive Differentiation Rules**: product, quotient and chain rules for every
//!    supported function
//! 2. **General power rule**: `f^g` is handled for constant exponents, constant bases and
//!    the general case `f^g (g' ln f + g f'/f)`
//! 3. **Non-smooth functions**: `abs` differentiates to `sign(g) g'`; `sign`, `floor` and
//!    `ceil` are piecewise constant and differentiate to zero. Whether such a derivative is
//!    worth showing is decided by the plot layer, not here.

use crate::symbolic::symbolic_engine::Expr;

impl Expr {
    /// DIFFERENTIATION

    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// # Arguments
    /// * `var` - Variable name to differentiate with respect to
    ///
    /// # Returns
    /// New symbolic expression representing the derivative
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::var("x");
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x"); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        let one = || Expr::Const(1.0);
        let two = || Expr::Const(2.0);
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => lhs.diff(var) + rhs.diff(var),
            Expr::Sub(lhs, rhs) => lhs.diff(var) - rhs.diff(var),
            Expr::Mul(lhs, rhs) => {
                lhs.diff(var) * *rhs.clone() + *lhs.clone() * rhs.diff(var)
            }
            Expr::Div(lhs, rhs) => {
                (lhs.diff(var) * *rhs.clone() - rhs.diff(var) * *lhs.clone())
                    / (*rhs.clone() * *rhs.clone())
            }
            Expr::Pow(base, exp) => {
                let (f, g) = (*base.clone(), *exp.clone());
                if !g.contains_variable(var) {
                    g.clone() * f.clone().pow(g - one()) * f.diff(var)
                } else if !f.contains_variable(var) {
                    self.clone() * f.ln() * g.diff(var)
                } else {
                    self.clone() * (g.diff(var) * f.clone().ln() + g * f.diff(var) / f)
                }
            }
            Expr::Exp(expr) => self.clone() * expr.diff(var),
            Expr::Ln(expr) => expr.diff(var) / *expr.clone(),
            Expr::sin(expr) => Expr::cos(expr.clone()) * expr.diff(var),
            Expr::cos(expr) => -Expr::sin(expr.clone()) * expr.diff(var),
            Expr::tg(expr) => {
                one() / Expr::cos(expr.clone()).pow(two()) * expr.diff(var)
            }
            Expr::ctg(expr) => {
                Expr::Const(-1.0) / Expr::sin(expr.clone()).pow(two()) * expr.diff(var)
            }
            Expr::arcsin(expr) => {
                expr.diff(var) / (one() - (**expr).clone().pow(two())).sqrt()
            }
            Expr::arccos(expr) => {
                -expr.diff(var) / (one() - (**expr).clone().pow(two())).sqrt()
            }
            Expr::arctg(expr) => expr.diff(var) / (one() + (**expr).clone().pow(two())),
            Expr::arcctg(expr) => -expr.diff(var) / (one() + (**expr).clone().pow(two())),
            Expr::Abs(expr) => Expr::Sign(expr.clone()) * expr.diff(var),
            Expr::Sign(_) | Expr::Floor(_) | Expr::Ceil(_) => Expr::Const(0.0),
        }
    }

    /// derivative followed by algebraic clean-up
    pub fn diff_simplified(&self, var: &str) -> Expr {
        self.diff(var).simplify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval_at(expr: &Expr, x: f64) -> f64 {
        expr.compile(&["x"]).unwrap().eval(&[x])
    }

    /// central difference of `expr` at `x`
    fn numeric(expr: &Expr, x: f64) -> f64 {
        let h = 1e-6;
        (eval_at(expr, x + h) - eval_at(expr, x - h)) / (2.0 * h)
    }

    #[test]
    fn test_power_rule() {
        let f = Expr::parse_expression("x^2").unwrap();
        assert_eq!(f.diff_simplified("x").to_string(), "(2 * x)");
    }

    #[test]
    fn test_against_central_differences() {
        let cases = [
            "sin(x)*exp(x)",
            "ln(x^2+1)/x",
            "tan(x)+cot(x)",
            "arcsin(x/2)+arccos(x/3)",
            "atan(x)+acot(x)",
            "x^x",
            "2^x",
            "sqrt(x+1)",
        ];
        for case in cases {
            let f = Expr::parse_expression(case).unwrap();
            let df = f.diff_simplified("x");
            for &x in &[0.3, 0.7, 1.1] {
                assert_relative_eq!(eval_at(&df, x), numeric(&f, x), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_other_symbols_are_constants() {
        let f = Expr::parse_expression("a*x+b").unwrap();
        assert_eq!(f.diff_simplified("x"), Expr::var("a"));
    }

    #[test]
    fn test_piecewise_constant_functions() {
        let f = Expr::parse_expression("floor(x)+sign(x)+ceil(x)").unwrap();
        assert_eq!(f.diff_simplified("x"), Expr::Const(0.0));
    }

    #[test]
    fn test_abs_derivative_is_sign() {
        let f = Expr::parse_expression("abs(x)").unwrap();
        let df = f.diff_simplified("x");
        assert_eq!(eval_at(&df, 2.0), 1.0);
        assert_eq!(eval_at(&df, -2.0), -1.0);
    }
}
