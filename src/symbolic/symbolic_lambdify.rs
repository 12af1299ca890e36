use crate::errors::PlotError;
use crate::symbolic::symbolic_engine::Expr;
use ndarray::Array1;
use std::f64::consts::PI;
use std::sync::Arc;

/// Compiled form of an expression: variables are replaced by their position in the
/// argument slice, so evaluation is a plain tree walk without name lookups.
#[derive(Clone, Debug)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    Powi(Box<Lambda>, i32),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    Ctg(Box<Lambda>),
    ArcSin(Box<Lambda>),
    ArcCos(Box<Lambda>),
    ArcTg(Box<Lambda>),
    ArcCtg(Box<Lambda>),
    Abs(Box<Lambda>),
    Sign(Box<Lambda>),
    Floor(Box<Lambda>),
    Ceil(Box<Lambda>),
}

/// sign with `sign(0) = 0`; `f64::signum` maps zero to one
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        value
    }
}

impl Expr {
    /// LAMBDIFICATION - Converting Symbolic Expressions to Executable Functions

    /// Compiles the expression against an ordered list of argument names.
    ///
    /// # Arguments
    /// * `vars` - argument names; position in this slice is the position in the evaluation slice
    ///
    /// # Returns
    /// `Lambda` tree, or `PlotError::UndefinedVariable` listing every name that is not in `vars`
    pub fn compile(&self, vars: &[&str]) -> Result<Lambda, PlotError> {
        let missing: Vec<String> = self
            .free_symbols()
            .into_iter()
            .filter(|name| !vars.contains(&name.as_str()))
            .collect();
        if !missing.is_empty() {
            return Err(PlotError::UndefinedVariable(missing));
        }
        Ok(self.compile_checked(vars))
    }

    fn compile_checked(&self, vars: &[&str]) -> Lambda {
        let c = |e: &Expr| Box::new(e.compile_checked(vars));
        match self {
            Expr::Var(name) => {
                // names were checked by `compile`
                let idx = vars.iter().position(|&v| v == name).unwrap_or(0);
                Lambda::Var(idx)
            }
            Expr::Const(v) => Lambda::Const(*v),
            Expr::Add(a, b) => Lambda::Add(c(a), c(b)),
            Expr::Sub(a, b) => Lambda::Sub(c(a), c(b)),
            Expr::Mul(a, b) => Lambda::Mul(c(a), c(b)),
            Expr::Div(a, b) => Lambda::Div(c(a), c(b)),
            Expr::Pow(a, b) => match b.as_const() {
                Some(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => {
                    Lambda::Powi(c(a), n as i32)
                }
                _ => Lambda::Pow(c(a), c(b)),
            },
            Expr::Exp(e) => Lambda::Exp(c(e)),
            Expr::Ln(e) => Lambda::Ln(c(e)),
            Expr::sin(e) => Lambda::Sin(c(e)),
            Expr::cos(e) => Lambda::Cos(c(e)),
            Expr::tg(e) => Lambda::Tg(c(e)),
            Expr::ctg(e) => Lambda::Ctg(c(e)),
            Expr::arcsin(e) => Lambda::ArcSin(c(e)),
            Expr::arccos(e) => Lambda::ArcCos(c(e)),
            Expr::arctg(e) => Lambda::ArcTg(c(e)),
            Expr::arcctg(e) => Lambda::ArcCtg(c(e)),
            Expr::Abs(e) => Lambda::Abs(c(e)),
            Expr::Sign(e) => Lambda::Sign(c(e)),
            Expr::Floor(e) => Lambda::Floor(c(e)),
            Expr::Ceil(e) => Lambda::Ceil(c(e)),
        }
    }

    /// Thread-safe closure over the compiled tree.
    pub fn lambdify_borrowed_thread_safe(
        &self,
        vars: &[&str],
    ) -> Result<Box<dyn Fn(&[f64]) -> f64 + Send + Sync>, PlotError> {
        let compiled = self.compile(vars)?;
        Ok(Box::new(compiled.as_closure()))
    }

    /// Value of a one-argument function node applied to a number.
    pub(crate) fn apply_unary(&self, v: f64) -> Option<f64> {
        let res = match self {
            Expr::Exp(_) => v.exp(),
            Expr::Ln(_) => v.ln(),
            Expr::sin(_) => v.sin(),
            Expr::cos(_) => v.cos(),
            Expr::tg(_) => v.tan(),
            Expr::ctg(_) => 1.0 / v.tan(),
            Expr::arcsin(_) => v.asin(),
            Expr::arccos(_) => v.acos(),
            Expr::arctg(_) => v.atan(),
            Expr::arcctg(_) => (PI / 2.0) - v.atan(),
            Expr::Abs(_) => v.abs(),
            Expr::Sign(_) => sign(v),
            Expr::Floor(_) => v.floor(),
            Expr::Ceil(_) => v.ceil(),
            _ => return None,
        };
        Some(res)
    }
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Lambda::Var(i) => args[*i],
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(args) + b.eval(args),
            Lambda::Sub(a, b) => a.eval(args) - b.eval(args),
            Lambda::Mul(a, b) => a.eval(args) * b.eval(args),
            Lambda::Div(a, b) => a.eval(args) / b.eval(args),
            Lambda::Pow(a, b) => a.eval(args).powf(b.eval(args)),
            Lambda::Powi(a, n) => a.eval(args).powi(*n),
            Lambda::Exp(e) => e.eval(args).exp(),
            Lambda::Ln(e) => e.eval(args).ln(),
            Lambda::Sin(e) => e.eval(args).sin(),
            Lambda::Cos(e) => e.eval(args).cos(),
            Lambda::Tg(e) => e.eval(args).tan(),
            Lambda::Ctg(e) => 1.0 / e.eval(args).tan(),
            Lambda::ArcSin(e) => e.eval(args).asin(),
            Lambda::ArcCos(e) => e.eval(args).acos(),
            Lambda::ArcTg(e) => e.eval(args).atan(),
            Lambda::ArcCtg(e) => (PI / 2.0) - e.eval(args).atan(),
            Lambda::Abs(e) => e.eval(args).abs(),
            Lambda::Sign(e) => sign(e.eval(args)),
            Lambda::Floor(e) => e.eval(args).floor(),
            Lambda::Ceil(e) => e.eval(args).ceil(),
        }
    }

    /// true if the tree reads no argument at all
    pub fn is_constant(&self) -> bool {
        match self {
            Lambda::Var(_) => false,
            Lambda::Const(_) => true,
            Lambda::Add(a, b)
            | Lambda::Sub(a, b)
            | Lambda::Mul(a, b)
            | Lambda::Div(a, b)
            | Lambda::Pow(a, b) => a.is_constant() && b.is_constant(),
            Lambda::Powi(e, _)
            | Lambda::Exp(e)
            | Lambda::Ln(e)
            | Lambda::Sin(e)
            | Lambda::Cos(e)
            | Lambda::Tg(e)
            | Lambda::Ctg(e)
            | Lambda::ArcSin(e)
            | Lambda::ArcCos(e)
            | Lambda::ArcTg(e)
            | Lambda::ArcCtg(e)
            | Lambda::Abs(e)
            | Lambda::Sign(e)
            | Lambda::Floor(e)
            | Lambda::Ceil(e) => e.is_constant(),
        }
    }

    pub fn as_closure(self) -> impl Fn(&[f64]) -> f64 + Send + Sync {
        move |args| self.eval(args)
    }
}

/// A compiled function of one plotting parameter plus the ordered variable values.
///
/// Argument 0 is the parameter (`x` for kind x, `y` for kind y); arguments 1.. are the
/// values of the scene variables in the order their names were given at compile time.
#[derive(Clone, Debug)]
pub struct CompiledFunction {
    lambda: Arc<Lambda>,
    arity: usize,
}

impl CompiledFunction {
    /// Compiles `expr` as a function of `param` followed by `variables`
    pub fn new(expr: &Expr, param: &str, variables: &[String]) -> Result<Self, PlotError> {
        let mut names: Vec<&str> = Vec::with_capacity(variables.len() + 1);
        names.push(param);
        names.extend(variables.iter().map(|s| s.as_str()));
        let lambda = expr.compile(&names)?;
        Ok(CompiledFunction {
            lambda: Arc::new(lambda),
            arity: names.len(),
        })
    }

    /// number of expected arguments: the parameter plus the variables
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_constant(&self) -> bool {
        self.lambda.is_constant()
    }

    /// Evaluates at one parameter value.
    ///
    /// Missing trailing variable values are an error, never a panic.
    pub fn eval(&self, param: f64, values: &[f64]) -> Result<f64, PlotError> {
        if values.len() + 1 < self.arity {
            return Err(PlotError::UndefinedVariable(Vec::new()));
        }
        let mut args = Vec::with_capacity(values.len() + 1);
        args.push(param);
        args.extend_from_slice(values);
        Ok(self.lambda.eval(&args))
    }

    /// Evaluates over a whole sample array; the argument buffer is reused between points.
    pub fn eval_array(&self, params: &Array1<f64>, values: &[f64]) -> Result<Array1<f64>, PlotError> {
        if values.len() + 1 < self.arity {
            return Err(PlotError::UndefinedVariable(Vec::new()));
        }
        let mut args = Vec::with_capacity(values.len() + 1);
        args.push(0.0);
        args.extend_from_slice(values);
        Ok(params.mapv(|p| {
            args[0] = p;
            self.lambda.eval(&args)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_compile_polynomial() {
        let x = Expr::var("x");
        let expr = x.clone() * x.clone() + x.clone() * Expr::Const(2.0) + Expr::Const(1.0);
        let f = expr.compile(&["x"]).unwrap();
        assert_eq!(f.eval(&[3.0]), 16.0);
    }

    #[test]
    fn test_compile_reports_undefined_variables() {
        let expr = Expr::var("x") + Expr::var("q");
        let err = expr.compile(&["x"]).unwrap_err();
        assert_eq!(err, PlotError::UndefinedVariable(vec!["q".to_string()]));
        assert_eq!(err.to_string(), "Expression uses undefined variables!");
    }

    #[test]
    fn test_integer_power_of_negative_base() {
        let expr = Expr::var("x").pow(Expr::Const(2.0));
        let f = expr.compile(&["x"]).unwrap();
        assert_eq!(f.eval(&[-3.0]), 9.0);
        let cube_root = Expr::var("x").pow(Expr::Const(1.0 / 3.0));
        let g = cube_root.compile(&["x"]).unwrap();
        assert!(g.eval(&[-8.0]).is_nan());
    }

    #[test]
    fn test_sign_of_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-2.0), -1.0);
        assert_eq!(sign(5.0), 1.0);
    }

    #[test]
    fn test_compiled_function_argument_order() {
        let expr = Expr::var("a") * Expr::var("x") + Expr::var("b");
        let vars = vec!["a".to_string(), "b".to_string()];
        let f = CompiledFunction::new(&expr, "x", &vars).unwrap();
        assert_eq!(f.arity(), 3);
        assert_relative_eq!(f.eval(2.0, &[3.0, 1.0]).unwrap(), 7.0);
        assert!(f.eval(2.0, &[3.0]).is_err());
    }

    #[test]
    fn test_eval_array_propagates_non_finite() {
        let expr = Expr::Const(1.0) / Expr::var("x");
        let f = CompiledFunction::new(&expr, "x", &[]).unwrap();
        let res = f.eval_array(&array![-1.0, 0.0, 2.0], &[]).unwrap();
        assert_eq!(res[0], -1.0);
        assert!(res[1].is_infinite());
        assert_eq!(res[2], 0.5);
    }

    #[test]
    fn test_constant_detection() {
        let f = CompiledFunction::new(&Expr::Const(4.0), "x", &[]).unwrap();
        assert!(f.is_constant());
        let g = CompiledFunction::new(&Expr::var("x"), "x", &[]).unwrap();
        assert!(!g.is_constant());
    }
}
