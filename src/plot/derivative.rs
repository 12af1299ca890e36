//! Derivative builder: one derivative per solved branch, with the absolute value
//! handled as a two-sided piecewise function.
use crate::errors::PlotError;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::CompiledFunction;
use log::warn;

pub const ABS_NOT_MAIN: &str = "Can only compute the derivative of abs if it's the main function";

/// Derivative of one branch with respect to the plotting parameter
#[derive(Debug, Clone)]
pub enum Derivative {
    /// ordinary symbolic derivative
    Simple { expr: Expr, func: CompiledFunction },
    /// derivative of `abs(g)`: `right` where `inside >= 0`, `left` elsewhere
    AbsPiecewise {
        left: Expr,
        right: Expr,
        inside: Expr,
        left_func: CompiledFunction,
        right_func: CompiledFunction,
        inside_func: CompiledFunction,
    },
    /// derivative of `sign(g)`
    Zero,
}

fn unsupported_function(expr: &Expr) -> Option<&'static str> {
    ["floor", "ceil", "sign"]
        .into_iter()
        .find(|name| expr.any_node(&|e| e.function_name() == *name))
}

fn check_supported(expr: &Expr) -> Result<(), PlotError> {
    if expr.any_node(&|e| matches!(e, Expr::Abs(_))) {
        return Err(PlotError::DerivativeUnsupported(ABS_NOT_MAIN.to_string()));
    }
    if let Some(name) = unsupported_function(expr) {
        return Err(PlotError::DerivativeUnsupported(format!(
            "Cannot compute the derivative containing the '{}' function",
            name
        )));
    }
    Ok(())
}

impl Derivative {
    /// Builds the derivative of `branch` with respect to `param`.
    ///
    /// # Returns
    /// `PlotError::DerivativeUnsupported` for nested `abs` and for `floor`, `ceil` or `sign`
    /// below the top level; compile errors are passed through.
    pub fn build(branch: &Expr, param: &str, variables: &[String]) -> Result<Self, PlotError> {
        match branch {
            Expr::Abs(inside) => {
                check_supported(inside)?;
                let inside = (**inside).clone();
                let right = inside.diff_simplified(param);
                let left = (-inside.clone()).diff_simplified(param);
                Ok(Derivative::AbsPiecewise {
                    left_func: CompiledFunction::new(&left, param, variables)?,
                    right_func: CompiledFunction::new(&right, param, variables)?,
                    inside_func: CompiledFunction::new(&inside, param, variables)?,
                    left,
                    right,
                    inside,
                })
            }
            Expr::Sign(_) => Ok(Derivative::Zero),
            _ => {
                check_supported(branch)?;
                let expr = branch.diff_simplified(param);
                let func = CompiledFunction::new(&expr, param, variables)?;
                Ok(Derivative::Simple { expr, func })
            }
        }
    }

    /// Slope at parameter value `p`; the piecewise case picks its side with `inside(p) >= 0`.
    pub fn slope(&self, p: f64, values: &[f64]) -> Result<f64, PlotError> {
        match self {
            Derivative::Simple { func, .. } => func.eval(p, values),
            Derivative::AbsPiecewise {
                left_func,
                right_func,
                inside_func,
                ..
            } => {
                if inside_func.eval(p, values)? >= 0.0 {
                    right_func.eval(p, values)
                } else {
                    left_func.eval(p, values)
                }
            }
            Derivative::Zero => Ok(0.0),
        }
    }

    /// Text shown next to the expression, powers written with `^`
    pub fn text(&self) -> String {
        match self {
            Derivative::Simple { expr, .. } => expr.to_string(),
            Derivative::AbsPiecewise {
                left,
                right,
                inside,
                ..
            } => format!("{} if {} >= 0, {} otherwise", right, inside, left),
            Derivative::Zero => "0".to_string(),
        }
    }
}

/// Derivatives of all branches of one expression, positionally aligned with the branches.
#[derive(Debug, Clone, Default)]
pub struct DerivativeSet {
    /// `None` where the branch derivative could not be built
    pub slots: Vec<Option<Derivative>>,
    /// set only when every branch failed
    pub error: Option<String>,
}

impl DerivativeSet {
    pub fn build(branches: &[Expr], param: &str, variables: &[String]) -> Self {
        let mut last_error = None;
        let slots: Vec<Option<Derivative>> = branches
            .iter()
            .map(|branch| match Derivative::build(branch, param, variables) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!("derivative of {} failed: {}", branch, e);
                    last_error = Some(e.to_string());
                    None
                }
            })
            .collect();
        let failed = slots.iter().filter(|s| s.is_none()).count();
        let error = if !slots.is_empty() && failed == slots.len() {
            last_error
        } else {
            None
        };
        DerivativeSet { slots, error }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// texts of the successful slots
    pub fn texts(&self) -> Vec<String> {
        self.slots.iter().flatten().map(|d| d.text()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn branch(text: &str) -> Expr {
        Expr::parse_expression(text).unwrap()
    }

    #[test]
    fn test_abs_is_piecewise() {
        let d = Derivative::build(&branch("abs(x)"), "x", &[]).unwrap();
        assert!(matches!(d, Derivative::AbsPiecewise { .. }));
        assert_relative_eq!(d.slope(2.0, &[]).unwrap(), 1.0);
        assert_relative_eq!(d.slope(-2.0, &[]).unwrap(), -1.0);
        assert_relative_eq!(d.slope(0.0, &[]).unwrap(), 1.0);
    }

    #[test]
    fn test_abs_of_polynomial() {
        let d = Derivative::build(&branch("abs(x^2 - 4)"), "x", &[]).unwrap();
        // inside negative at x = 1: derivative of -(x^2 - 4) is -2x
        assert_relative_eq!(d.slope(1.0, &[]).unwrap(), -2.0);
        assert_relative_eq!(d.slope(3.0, &[]).unwrap(), 6.0);
    }

    #[test]
    fn test_sign_is_zero() {
        let d = Derivative::build(&branch("sign(x)"), "x", &[]).unwrap();
        assert!(matches!(d, Derivative::Zero));
        assert_eq!(d.slope(5.0, &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_nested_abs_rejected() {
        let err = Derivative::build(&branch("abs(x) + 1"), "x", &[]).unwrap_err();
        assert_eq!(err, PlotError::DerivativeUnsupported(ABS_NOT_MAIN.to_string()));
    }

    #[test]
    fn test_floor_rejected() {
        let err = Derivative::build(&branch("floor(x) * 2"), "x", &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot compute the derivative containing the 'floor' function"
        );
        let err = Derivative::build(&branch("x + sign(x)"), "x", &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot compute the derivative containing the 'sign' function"
        );
    }

    #[test]
    fn test_simple_text_uses_caret() {
        let d = Derivative::build(&branch("x^3"), "x", &[]).unwrap();
        assert_eq!(d.text(), "(3 * (x ^ 2))");
    }

    #[test]
    fn test_set_partial_success_is_not_an_error() {
        let set = DerivativeSet::build(&[branch("x^2"), branch("floor(x) + x")], "x", &[]);
        assert_eq!(set.slots.len(), 2);
        assert!(set.slots[0].is_some());
        assert!(set.slots[1].is_none());
        assert!(!set.is_error());
        assert_eq!(set.texts().len(), 1);
    }

    #[test]
    fn test_set_all_failed_is_an_error() {
        let set = DerivativeSet::build(&[branch("ceil(x)")], "x", &[]);
        assert!(set.is_error());
        assert_eq!(
            set.error.as_deref(),
            Some("Cannot compute the derivative containing the 'ceil' function")
        );
    }

    #[test]
    fn test_variables_in_derivative() {
        let vars = vec!["a".to_string()];
        let d = Derivative::build(&branch("a*x^2"), "x", &vars).unwrap();
        assert_relative_eq!(d.slope(2.0, &[3.0]).unwrap(), 12.0);
    }
}
