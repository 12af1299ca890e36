#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedGrapher::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("x^2 + 2*sin(x)").unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// let f = parsed_expression.compile(&["x"]).unwrap();
/// assert_eq!(f.eval(&[0.0]), 0.0);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// the expression tree, its printing, substitution and symbol queries
/// ________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
/// analytical derivatives
///# Example
/// ```
/// use RustedGrapher::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x^3").unwrap();
/// let df_dx = f.diff_simplified("x");
/// assert_eq!(df_dx.to_string(), "(3 * (x ^ 2))");
/// ```
pub mod symbolic_engine_derivatives;
/// algebraic clean-up of expression trees
pub mod symbolic_simplify;
/// turning expression trees into numeric functions
pub mod symbolic_lambdify;
///______________________________________________________________________________________________________________________________________________
/// solving a relation for `y` (or `x`) into explicit branches
///# Example
/// ```
/// use RustedGrapher::symbolic::symbolic_solver::{solve_expression, Kind};
/// let solution = solve_expression("x^2 + y^2 = 25", &[]).unwrap();
/// assert_eq!(solution.kind, Kind::X);
/// assert_eq!(solution.functions.len(), 2);
/// ```
/// _____________________________________________________________________________________________________________________________________________
pub mod symbolic_solver;
