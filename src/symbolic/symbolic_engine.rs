//! # Symbolic Engine Module
//!
//! Core expression tree of the calculator. A user relation such as `x^2 + y^2 = 25`
//! is parsed into two `Expr` trees, solved for one symbol, differentiated and finally
//! compiled into numeric closures that the sampler evaluates over thousands of points.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - symbols like "x", "y", "a"
//! - **Constants**: `Const(f64)` - numerical constants (`pi` and `e` are folded in by the parser)
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow`
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `ctg`, the inverse functions and the
//!   non-smooth functions `Abs`, `Sign`, `Floor`, `Ceil`
//!
//! ### Key Methods
//! - `free_symbols()` - sorted set of every variable name in the tree
//! - `substitute_variable()` - replace a symbol by an expression
//! - `count_variable()` - number of occurrences of a symbol (used by the isolation solver)
//! - `any_node()` - search the tree with a predicate (used by the derivative builder)
//!
//! ## Interesting Code Features
//!
//! 1. **Unary view**: every one-argument function is reachable through `unary_arg()` and
//!    `with_unary_arg()`, so tree walks only spell out the binary operators
//! 2. **Operator Overloading**: `std::ops` traits give natural syntax `x.clone() * x + c`
//! 3. **Non-standard Function Names**: mathematical notation (tg, ctg) for tan and cot

#![allow(non_camel_case_types)]

use std::collections::BTreeSet;
use std::fmt;

/// Core symbolic expression enum representing mathematical expressions as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// use symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "y", "a")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function: tan(x) - uses mathematical notation 'tg'
    tg(Box<Expr>),
    /// Cotangent function: cot(x) - uses mathematical notation 'ctg'
    ctg(Box<Expr>),
    /// Arcsine function: arcsin(x)
    arcsin(Box<Expr>),
    /// Arccosine function: arccos(x)
    arccos(Box<Expr>),
    /// Arctangent function: arctan(x) - uses mathematical notation 'arctg'
    arctg(Box<Expr>),
    /// Arccotangent function: arccot(x) - uses mathematical notation 'arcctg'
    arcctg(Box<Expr>),
    /// Absolute value: |x|
    Abs(Box<Expr>),
    /// Sign function: -1, 0 or 1
    Sign(Box<Expr>),
    /// Largest integer not greater than x
    Floor(Box<Expr>),
    /// Smallest integer not less than x
    Ceil(Box<Expr>),
}

/// Display implementation for pretty printing symbolic expressions.
///
/// Powers are printed with `^`, the same operator the parser accepts, so the derivative
/// text shown next to an expression can be pasted back as input.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => {
                if *val < 0.0 {
                    write!(f, "({})", val)
                } else {
                    write!(f, "{}", val)
                }
            }
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            _ => match self.unary_arg() {
                Some(arg) => write!(f, "{}({})", self.function_name(), arg),
                None => Ok(()),
            },
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    /// `-(-e)` collapses back to `e`, and negated constants stay constants
    fn neg(self) -> Self::Output {
        match self {
            Expr::Const(val) => Expr::Const(-val),
            Expr::Mul(lhs, rhs) if *lhs == Expr::Const(-1.0) => *rhs,
            other => Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(other)),
        }
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    pub fn sqrt(self) -> Expr {
        Expr::Pow(self.boxed(), Box::new(Expr::Const(0.5)))
    }

    pub fn abs(self) -> Expr {
        Expr::Abs(self.boxed())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 1.0)
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(val) => Some(*val),
            _ => None,
        }
    }

    /// Argument of a one-argument function node, `None` for leaves and binary operations.
    pub fn unary_arg(&self) -> Option<&Expr> {
        match self {
            Expr::Exp(arg)
            | Expr::Ln(arg)
            | Expr::sin(arg)
            | Expr::cos(arg)
            | Expr::tg(arg)
            | Expr::ctg(arg)
            | Expr::arcsin(arg)
            | Expr::arccos(arg)
            | Expr::arctg(arg)
            | Expr::arcctg(arg)
            | Expr::Abs(arg)
            | Expr::Sign(arg)
            | Expr::Floor(arg)
            | Expr::Ceil(arg) => Some(arg),
            _ => None,
        }
    }

    /// Rebuilds a one-argument function node of the same kind around a new argument.
    /// Leaves and binary nodes are returned unchanged.
    pub fn with_unary_arg(&self, arg: Expr) -> Expr {
        let arg = arg.boxed();
        match self {
            Expr::Exp(_) => Expr::Exp(arg),
            Expr::Ln(_) => Expr::Ln(arg),
            Expr::sin(_) => Expr::sin(arg),
            Expr::cos(_) => Expr::cos(arg),
            Expr::tg(_) => Expr::tg(arg),
            Expr::ctg(_) => Expr::ctg(arg),
            Expr::arcsin(_) => Expr::arcsin(arg),
            Expr::arccos(_) => Expr::arccos(arg),
            Expr::arctg(_) => Expr::arctg(arg),
            Expr::arcctg(_) => Expr::arcctg(arg),
            Expr::Abs(_) => Expr::Abs(arg),
            Expr::Sign(_) => Expr::Sign(arg),
            Expr::Floor(_) => Expr::Floor(arg),
            Expr::Ceil(_) => Expr::Ceil(arg),
            _ => self.clone(),
        }
    }

    /// Operands of a binary node.
    pub fn binary_args(&self) -> Option<(&Expr, &Expr)> {
        match self {
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => Some((lhs, rhs)),
            _ => None,
        }
    }

    /// Name used for printing and for error messages
    pub fn function_name(&self) -> &'static str {
        match self {
            Expr::Var(_) => "var",
            Expr::Const(_) => "const",
            Expr::Add(..) => "+",
            Expr::Sub(..) => "-",
            Expr::Mul(..) => "*",
            Expr::Div(..) => "/",
            Expr::Pow(..) => "^",
            Expr::Exp(_) => "exp",
            Expr::Ln(_) => "ln",
            Expr::sin(_) => "sin",
            Expr::cos(_) => "cos",
            Expr::tg(_) => "tg",
            Expr::ctg(_) => "ctg",
            Expr::arcsin(_) => "arcsin",
            Expr::arccos(_) => "arccos",
            Expr::arctg(_) => "arctg",
            Expr::arcctg(_) => "arcctg",
            Expr::Abs(_) => "abs",
            Expr::Sign(_) => "sign",
            Expr::Floor(_) => "floor",
            Expr::Ceil(_) => "ceil",
        }
    }

    /// Applies `f` to every direct child and rebuilds the node.
    pub fn map_children<F: Fn(&Expr) -> Expr>(&self, f: F) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(f(lhs)), Box::new(f(rhs))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(f(lhs)), Box::new(f(rhs))),
            Expr::Mul(lhs, rhs) => Expr::Mul(Box::new(f(lhs)), Box::new(f(rhs))),
            Expr::Div(lhs, rhs) => Expr::Div(Box::new(f(lhs)), Box::new(f(rhs))),
            Expr::Pow(base, exp) => Expr::Pow(Box::new(f(base)), Box::new(f(exp))),
            _ => match self.unary_arg() {
                Some(arg) => self.with_unary_arg(f(arg)),
                None => self.clone(),
            },
        }
    }

    /// Substitutes a variable with a constant value throughout the expression.
    ///
    /// # Arguments
    /// * `var` - Name of the variable to substitute
    /// * `value` - Numerical value to substitute for the variable
    ///
    /// # Returns
    /// New expression with the variable substituted
    pub fn set_variable(&self, var: &str, value: f64) -> Expr {
        self.substitute_variable(var, &Expr::Const(value))
    }

    /// substitute a variable with an expression
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            _ => self.map_children(|child| child.substitute_variable(var, expr)),
        }
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        self.count_variable(var_name) > 0
    }

    /// number of leaves equal to `Var(var_name)`
    pub fn count_variable(&self, var_name: &str) -> usize {
        match self {
            Expr::Var(name) => usize::from(name == var_name),
            Expr::Const(_) => 0,
            _ => {
                if let Some((lhs, rhs)) = self.binary_args() {
                    lhs.count_variable(var_name) + rhs.count_variable(var_name)
                } else {
                    self.unary_arg().map_or(0, |arg| arg.count_variable(var_name))
                }
            }
        }
    }

    /// Sorted set of all variable names appearing in the expression
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, acc: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                acc.insert(name.clone());
            }
            Expr::Const(_) => {}
            _ => {
                if let Some((lhs, rhs)) = self.binary_args() {
                    lhs.collect_symbols(acc);
                    rhs.collect_symbols(acc);
                } else if let Some(arg) = self.unary_arg() {
                    arg.collect_symbols(acc);
                }
            }
        }
    }

    /// true if `pred` holds for this node or any node below it
    pub fn any_node(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        if let Some((lhs, rhs)) = self.binary_args() {
            return lhs.any_node(pred) || rhs.any_node(pred);
        }
        self.unary_arg().is_some_and(|arg| arg.any_node(pred))
    }
}
