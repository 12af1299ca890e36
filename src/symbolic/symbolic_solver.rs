//! # Symbol Solver
//!
//! Turns the text of a relation into explicit branches of one plotting parameter.
//!
//! `y = x^2`         -> one branch of x (kind x)
//! `x^2 + y^2 = 25`  -> two branches of x, `-sqrt(..)/2` first
//! `x = sin(y)`      -> one branch of y (kind y)
//! `y^2`             -> no `=` and a free `y`: read as `x = y^2`
//!
//! The unknown is found in three steps: a fast path for `u = rhs`, a polynomial path
//! (degree up to two, coefficients may be any u-free expression) and an isolation path
//! that walks down the single occurrence of `u`, applying inverse functions on the way.
use crate::errors::PlotError;
use crate::symbolic::parse_expr::parse_expression_func;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::CompiledFunction;
use log::{debug, info};
use strum_macros::{Display, EnumString};

/// Which axis is the plotting parameter: kind x is `y = f(x)`, kind y is `x = f(y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Kind {
    #[strum(serialize = "x")]
    X,
    #[strum(serialize = "y")]
    Y,
}

impl Kind {
    /// the free parameter of the compiled functions
    pub fn parameter(&self) -> &'static str {
        match self {
            Kind::X => "x",
            Kind::Y => "y",
        }
    }

    /// the symbol the relation is solved for
    pub fn target(&self) -> &'static str {
        match self {
            Kind::X => "y",
            Kind::Y => "x",
        }
    }
}

/// highest polynomial degree solved in closed form
const MAX_POLY_DEGREE: usize = 2;
/// polynomials are expanded up to this degree before giving up on the polynomial path
const MAX_EXPANSION_DEGREE: usize = 8;

/// Outcome of a successful solve
#[derive(Debug, Clone)]
pub struct Solution {
    pub kind: Kind,
    /// simplified branches, one per explicit solution
    pub branches: Vec<Expr>,
    /// compiled branches in the same order
    pub functions: Vec<CompiledFunction>,
}

/// Splits the text into the two sides and picks the solve direction.
///
/// # Returns
/// (left side, right side, kind)
pub fn split_relation(raw: &str) -> Result<(Expr, Expr, Kind), PlotError> {
    if let Some((left, right)) = raw.split_once('=') {
        let lhs = parse_expression_func(left)?;
        let rhs = parse_expression_func(right)?;
        let kind = if left.trim() == "x" {
            Kind::Y
        } else if !lhs.contains_variable("y")
            && !rhs.contains_variable("y")
            && (lhs.contains_variable("x") || rhs.contains_variable("x"))
        {
            Kind::Y
        } else {
            Kind::X
        };
        Ok((lhs, rhs, kind))
    } else {
        let rhs = parse_expression_func(raw)?;
        let kind = if rhs.contains_variable("y") {
            Kind::Y
        } else {
            Kind::X
        };
        Ok((Expr::var(kind.target()), rhs, kind))
    }
}

/// Solves `lhs = rhs` for `unknown`.
///
/// # Returns
/// simplified branches; an empty vector when the equation has no solution
/// or is an identity
pub fn solve_for(lhs: &Expr, rhs: &Expr, unknown: &str) -> Result<Vec<Expr>, PlotError> {
    // fast path
    if let Expr::Var(name) = lhs {
        if name == unknown && !rhs.contains_variable(unknown) {
            return Ok(vec![rhs.simplify()]);
        }
    }
    if let Expr::Var(name) = rhs {
        if name == unknown && !lhs.contains_variable(unknown) {
            return Ok(vec![lhs.simplify()]);
        }
    }

    let difference = lhs.clone() - rhs.clone();
    if let Some(coeffs) = poly_coeffs(&difference, unknown) {
        if coeffs.len() <= MAX_POLY_DEGREE + 1 {
            return Ok(solve_polynomial(coeffs));
        }
    }

    let in_lhs = lhs.count_variable(unknown);
    let in_rhs = rhs.count_variable(unknown);
    let branches = match (in_lhs, in_rhs) {
        (1, 0) => isolate(lhs, rhs.clone(), unknown)?,
        (0, 1) => isolate(rhs, lhs.clone(), unknown)?,
        _ => {
            return Err(PlotError::Solve(format!("cannot solve for {}", unknown)));
        }
    };
    Ok(branches.into_iter().map(|b| b.simplify()).collect())
}

/// Full pipeline: parse, choose the direction, solve and compile every branch.
///
/// # Arguments
/// * `raw` - text typed by the user
/// * `variables` - ordered names of the scene variables, appended after the parameter
pub fn solve_expression(raw: &str, variables: &[String]) -> Result<Solution, PlotError> {
    let (lhs, rhs, kind) = split_relation(raw)?;
    let branches = solve_for(&lhs, &rhs, kind.target())?;
    if branches.is_empty() {
        return Err(PlotError::Solve("No solutions found".to_string()));
    }
    let functions = branches
        .iter()
        .map(|branch| CompiledFunction::new(branch, kind.parameter(), variables))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        "solved '{}' for {}: {}",
        raw,
        kind.target(),
        branches
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(" ; ")
    );
    info!("'{}' -> {} branch(es) of {}", raw, branches.len(), kind.parameter());
    Ok(Solution {
        kind,
        branches,
        functions,
    })
}

//___________________________________POLYNOMIAL PATH____________________________________

fn poly_add(a: Vec<Expr>, b: Vec<Expr>, sign: f64) -> Vec<Expr> {
    let n = a.len().max(b.len());
    let mut a = a.into_iter();
    let mut b = b.into_iter();
    (0..n)
        .map(|_| {
            let lhs = a.next().unwrap_or(Expr::Const(0.0));
            let rhs = b.next().unwrap_or(Expr::Const(0.0));
            let sum = if sign > 0.0 { lhs + rhs } else { lhs - rhs };
            sum.simplify()
        })
        .collect()
}

fn poly_mul(a: &[Expr], b: &[Expr]) -> Option<Vec<Expr>> {
    if a.len() + b.len() - 1 > MAX_EXPANSION_DEGREE + 1 {
        return None;
    }
    let mut res = vec![Expr::Const(0.0); a.len() + b.len() - 1];
    for (i, ai) in a.iter().enumerate() {
        for (j, bj) in b.iter().enumerate() {
            res[i + j] = (res[i + j].clone() + ai.clone() * bj.clone()).simplify();
        }
    }
    Some(res)
}

/// Coefficients `[c0, c1, ...]` of `expr` as a polynomial in `u`, trailing zeros trimmed.
/// `None` when `expr` is not polynomial in `u`.
pub fn poly_coeffs(expr: &Expr, u: &str) -> Option<Vec<Expr>> {
    let mut coeffs = poly_coeffs_raw(expr, u)?;
    while coeffs.len() > 1 && coeffs.last().is_some_and(|c| c.is_zero()) {
        coeffs.pop();
    }
    Some(coeffs)
}

fn poly_coeffs_raw(expr: &Expr, u: &str) -> Option<Vec<Expr>> {
    if !expr.contains_variable(u) {
        return Some(vec![expr.clone()]);
    }
    match expr {
        Expr::Var(_) => Some(vec![Expr::Const(0.0), Expr::Const(1.0)]),
        Expr::Add(a, b) => Some(poly_add(poly_coeffs_raw(a, u)?, poly_coeffs_raw(b, u)?, 1.0)),
        Expr::Sub(a, b) => Some(poly_add(poly_coeffs_raw(a, u)?, poly_coeffs_raw(b, u)?, -1.0)),
        Expr::Mul(a, b) => poly_mul(&poly_coeffs_raw(a, u)?, &poly_coeffs_raw(b, u)?),
        Expr::Div(a, b) if !b.contains_variable(u) => Some(
            poly_coeffs_raw(a, u)?
                .into_iter()
                .map(|c| (c / *b.clone()).simplify())
                .collect(),
        ),
        Expr::Pow(base, exp) => {
            let n = exp.as_const()?;
            if n < 0.0 || n.fract() != 0.0 || n as usize > MAX_EXPANSION_DEGREE {
                return None;
            }
            let base = poly_coeffs_raw(base, u)?;
            let mut acc = vec![Expr::Const(1.0)];
            for _ in 0..n as usize {
                acc = poly_mul(&acc, &base)?;
            }
            Some(acc)
        }
        _ => None,
    }
}

fn solve_polynomial(coeffs: Vec<Expr>) -> Vec<Expr> {
    match coeffs.len() {
        2 => {
            let (c0, c1) = (coeffs[0].clone(), coeffs[1].clone());
            vec![(-c0 / c1).simplify()]
        }
        3 => {
            let (c0, c1, c2) = (coeffs[0].clone(), coeffs[1].clone(), coeffs[2].clone());
            let disc = c1.clone().pow(Expr::Const(2.0)) - Expr::Const(4.0) * c2.clone() * c0;
            let root = disc.simplify().sqrt();
            let denom = Expr::Const(2.0) * c2;
            vec![
                ((-c1.clone() - root.clone()) / denom.clone()).simplify(),
                ((-c1 + root) / denom).simplify(),
            ]
        }
        // constant: either no solution or an identity, neither is plottable
        _ => Vec::new(),
    }
}

//___________________________________ISOLATION PATH____________________________________

/// Inverts the chain of operations around the single occurrence of `u` in `expr`,
/// so that `expr = target` becomes `u = ...`.
fn isolate(expr: &Expr, target: Expr, u: &str) -> Result<Vec<Expr>, PlotError> {
    let has = |e: &Expr| e.contains_variable(u);
    match expr {
        Expr::Var(name) if name == u => Ok(vec![target]),
        Expr::Add(a, b) => {
            if has(a) {
                isolate(a, target - *b.clone(), u)
            } else {
                isolate(b, target - *a.clone(), u)
            }
        }
        Expr::Sub(a, b) => {
            if has(a) {
                isolate(a, target + *b.clone(), u)
            } else {
                isolate(b, *a.clone() - target, u)
            }
        }
        Expr::Mul(a, b) => {
            if has(a) {
                isolate(a, target / *b.clone(), u)
            } else {
                isolate(b, target / *a.clone(), u)
            }
        }
        Expr::Div(a, b) => {
            if has(a) {
                isolate(a, target * *b.clone(), u)
            } else {
                isolate(b, *a.clone() / target, u)
            }
        }
        Expr::Pow(base, exp) => {
            if has(base) {
                match exp.as_const() {
                    Some(n) if n != 0.0 && n.fract() == 0.0 && (n as i64) % 2 == 0 => {
                        let root = target.pow(Expr::Const(1.0 / n));
                        let mut res = isolate(base, -root.clone(), u)?;
                        res.extend(isolate(base, root, u)?);
                        Ok(res)
                    }
                    Some(n) if n == 0.0 => Err(PlotError::Solve(format!("cannot solve for {}", u))),
                    _ => isolate(base, target.pow(Expr::Const(1.0) / *exp.clone()), u),
                }
            } else {
                isolate(exp, target.ln() / (**base).clone().ln(), u)
            }
        }
        Expr::Abs(a) => {
            let mut res = isolate(a, -target.clone(), u)?;
            res.extend(isolate(a, target, u)?);
            Ok(res)
        }
        Expr::Exp(a) => isolate(a, target.ln(), u),
        Expr::Ln(a) => isolate(a, target.exp(), u),
        Expr::sin(a) => isolate(a, Expr::arcsin(target.boxed()), u),
        Expr::cos(a) => isolate(a, Expr::arccos(target.boxed()), u),
        Expr::tg(a) => isolate(a, Expr::arctg(target.boxed()), u),
        Expr::ctg(a) => isolate(a, Expr::arcctg(target.boxed()), u),
        Expr::arcsin(a) => isolate(a, Expr::sin(target.boxed()), u),
        Expr::arccos(a) => isolate(a, Expr::cos(target.boxed()), u),
        Expr::arctg(a) => isolate(a, Expr::tg(target.boxed()), u),
        Expr::arcctg(a) => isolate(a, Expr::ctg(target.boxed()), u),
        other => Err(PlotError::Solve(format!(
            "cannot solve for {}: '{}' cannot be inverted",
            u,
            other.function_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn no_vars() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn test_explicit_function_of_x() {
        let sol = solve_expression("y = x^2", &no_vars()).unwrap();
        assert_eq!(sol.kind, Kind::X);
        assert_eq!(sol.functions.len(), 1);
        assert_relative_eq!(sol.functions[0].eval(3.0, &[]).unwrap(), 9.0);
    }

    #[test]
    fn test_circle_has_two_branches() {
        let sol = solve_expression("x^2 + y^2 = 25", &no_vars()).unwrap();
        assert_eq!(sol.kind, Kind::X);
        assert_eq!(sol.branches.len(), 2);
        assert_relative_eq!(sol.functions[0].eval(3.0, &[]).unwrap(), -4.0, epsilon = 1e-12);
        assert_relative_eq!(sol.functions[1].eval(3.0, &[]).unwrap(), 4.0, epsilon = 1e-12);
        assert!(sol.functions[1].eval(6.0, &[]).unwrap().is_nan());
    }

    #[test]
    fn test_lhs_x_solves_for_x() {
        let sol = solve_expression("x = sin(y)", &no_vars()).unwrap();
        assert_eq!(sol.kind, Kind::Y);
        assert_eq!(sol.kind.parameter(), "y");
        assert_relative_eq!(sol.functions[0].eval(0.5, &[]).unwrap(), 0.5f64.sin());
    }

    #[test]
    fn test_bare_expression_direction() {
        let sol = solve_expression("x^3 - 1", &no_vars()).unwrap();
        assert_eq!(sol.kind, Kind::X);
        let sol = solve_expression("y^2", &no_vars()).unwrap();
        assert_eq!(sol.kind, Kind::Y);
        assert_relative_eq!(sol.functions[0].eval(3.0, &[]).unwrap(), 9.0);
    }

    #[test]
    fn test_vertical_line() {
        let sol = solve_expression("x^2 = 4", &no_vars()).unwrap();
        assert_eq!(sol.kind, Kind::Y);
        assert_eq!(sol.branches.len(), 2);
        assert!(sol.functions.iter().all(|f| f.is_constant()));
    }

    #[test]
    fn test_linear_in_target() {
        let sol = solve_expression("2*y + x = 4", &no_vars()).unwrap();
        assert_eq!(sol.branches.len(), 1);
        assert_relative_eq!(sol.functions[0].eval(2.0, &[]).unwrap(), 1.0);
    }

    #[test]
    fn test_isolation_through_functions() {
        let sol = solve_expression("exp(y) = x", &no_vars()).unwrap();
        assert_relative_eq!(sol.functions[0].eval(1.0, &[]).unwrap(), 0.0);
        let sol = solve_expression("abs(y) = x", &no_vars()).unwrap();
        assert_eq!(sol.branches.len(), 2);
        assert_relative_eq!(sol.functions[0].eval(2.0, &[]).unwrap(), -2.0);
        assert_relative_eq!(sol.functions[1].eval(2.0, &[]).unwrap(), 2.0);
    }

    #[test]
    fn test_variables_are_compiled_in_order() {
        let vars = vec!["a".to_string(), "b".to_string()];
        let sol = solve_expression("y = a*x + b", &vars).unwrap();
        assert_relative_eq!(sol.functions[0].eval(2.0, &[3.0, 1.0]).unwrap(), 7.0);
    }

    #[test]
    fn test_undefined_variable() {
        let err = solve_expression("y = q*x", &no_vars()).unwrap_err();
        assert_eq!(err.to_string(), "Expression uses undefined variables!");
    }

    #[test]
    fn test_no_solution() {
        let err = solve_expression("3 = 4", &no_vars()).unwrap_err();
        assert_eq!(err, PlotError::Solve("No solutions found".to_string()));
    }

    #[test]
    fn test_unsolvable() {
        assert!(matches!(
            solve_expression("y = sin(y) + x", &no_vars()),
            Err(PlotError::Solve(_))
        ));
        assert!(matches!(
            solve_expression("floor(y) = x", &no_vars()),
            Err(PlotError::Solve(_))
        ));
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(
            solve_expression("y = (x", &no_vars()),
            Err(PlotError::Parse(_))
        ));
    }

    #[test]
    fn test_poly_coeffs() {
        let e = Expr::parse_expression("(y+1)^2 - 3").unwrap();
        let coeffs = poly_coeffs(&e, "y").unwrap();
        assert_eq!(coeffs, vec![Expr::Const(-2.0), Expr::Const(2.0), Expr::Const(1.0)]);
        let e = Expr::parse_expression("sin(y)").unwrap();
        assert!(poly_coeffs(&e, "y").is_none());
    }
}
