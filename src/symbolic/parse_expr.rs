//! turns a user string into a symbolic expression
//!
//! The grammar is a classic precedence ladder written with `nom` combinators:
//!
//! ```text
//!  sum     := product (('+' | '-') product)*
//!  product := unary (('*' | '/') unary)*
//!  unary   := '-' unary | '+' unary | power
//!  power   := primary ('^' unary)?          right associative
//!  primary := number | '(' sum ')' | name '(' sum ')' | name
//! ```
//! `**` is accepted as a synonym of `^` and whitespace is ignored.
use crate::errors::PlotError;
use crate::symbolic::symbolic_engine::Expr;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded},
};
use std::f64::consts::{E, PI};

fn apply_function(name: &str, arg: Expr) -> Option<Expr> {
    let arg_b = Box::new(arg.clone());
    let res = match name {
        "exp" => Expr::Exp(arg_b),
        "ln" | "log" => Expr::Ln(arg_b),
        "sqrt" => arg.sqrt(),
        "sin" => Expr::sin(arg_b),
        "cos" => Expr::cos(arg_b),
        "tan" | "tg" => Expr::tg(arg_b),
        "cot" | "ctg" => Expr::ctg(arg_b),
        "asin" | "arcsin" => Expr::arcsin(arg_b),
        "acos" | "arccos" => Expr::arccos(arg_b),
        "atan" | "arctan" | "arctg" => Expr::arctg(arg_b),
        "acot" | "arccot" | "arcctg" => Expr::arcctg(arg_b),
        "abs" => Expr::Abs(arg_b),
        "sign" | "sgn" => Expr::Sign(arg_b),
        "floor" => Expr::Floor(arg_b),
        "ceil" => Expr::Ceil(arg_b),
        // hyperbolic functions expand into exponentials
        "sinh" => (arg.clone().exp() - (-arg).exp()) / Expr::Const(2.0),
        "cosh" => (arg.clone().exp() + (-arg).exp()) / Expr::Const(2.0),
        _ => return None,
    };
    Some(res)
}

/// `**` becomes `^`, whitespace is dropped
pub fn preprocess(input: &str) -> String {
    input
        .replace("**", "^")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn parse_number(input: &str) -> IResult<&str, Expr> {
    let mantissa = alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ));
    let exponent = opt((one_of("eE"), opt(one_of("+-")), digit1));
    map_res(recognize(pair(mantissa, exponent)), |s: &str| {
        s.parse::<f64>().map(Expr::Const)
    })
    .parse(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

/// identifier: a function call, a named constant or a variable
fn parse_name(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = parse_identifier(input)?;
    if rest.starts_with('(') {
        let (rest, arg) = delimited(char('('), parse_sum, char(')')).parse(rest)?;
        return match apply_function(name, arg) {
            Some(expr) => Ok((rest, expr)),
            None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag))),
        };
    }
    let expr = match name {
        "pi" => Expr::Const(PI),
        "e" => Expr::Const(E),
        _ => Expr::Var(name.to_string()),
    };
    Ok((rest, expr))
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    alt((
        parse_number,
        delimited(char('('), parse_sum, char(')')),
        parse_name,
    ))
    .parse(input)
}

fn parse_power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = parse_primary(input)?;
    let (input, exponent) = opt(preceded(char('^'), parse_unary)).parse(input)?;
    let expr = match exponent {
        Some(exp) => base.pow(exp),
        None => base,
    };
    Ok((input, expr))
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(char('-'), parse_unary), |e: Expr| -e),
        preceded(char('+'), parse_unary),
        parse_power,
    ))
    .parse(input)
}

fn parse_product(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_unary(input)?;
    let (input, rest) = many0(pair(one_of("*/"), parse_unary)).parse(input)?;
    let expr = rest.into_iter().fold(first, |acc, (op, rhs)| {
        if op == '*' { acc * rhs } else { acc / rhs }
    });
    Ok((input, expr))
}

fn parse_sum(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_product(input)?;
    let (input, rest) = many0(pair(one_of("+-"), parse_product)).parse(input)?;
    let expr = rest.into_iter().fold(first, |acc, (op, rhs)| {
        if op == '+' { acc + rhs } else { acc - rhs }
    });
    Ok((input, expr))
}

/// Parses one side of a relation.
///
/// # Returns
/// the expression tree or `PlotError::Parse` naming the place where parsing stopped
pub fn parse_expression_func(input: &str) -> Result<Expr, PlotError> {
    let cleaned = preprocess(input);
    if cleaned.is_empty() {
        return Err(PlotError::Parse("empty expression".to_string()));
    }
    match all_consuming(parse_sum).parse(cleaned.as_str()) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Failure(e)) if e.code == ErrorKind::Tag => {
            let name: String = e
                .input
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            Err(PlotError::Parse(format!("unknown function '{}'", name)))
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(PlotError::Parse(format!(
            "could not parse expression near '{}'",
            e.input
        ))),
        Err(nom::Err::Incomplete(_)) => Err(PlotError::Parse(format!(
            "incomplete expression '{}'",
            cleaned
        ))),
    }
}

impl Expr {
    /// string to symbolic expression
    pub fn parse_expression(input: &str) -> Result<Expr, PlotError> {
        parse_expression_func(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(input: &str) -> Expr {
        Expr::parse_expression(input).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse("1+2*x").to_string(), "(1 + (2 * x))");
        assert_eq!(parse("(1+2)*x").to_string(), "((1 + 2) * x)");
        assert_eq!(parse("a-b-c").to_string(), "((a - b) - c)");
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(parse("x^2^3").to_string(), "(x ^ (2 ^ 3))");
        assert_eq!(parse("x**2"), parse("x^2"));
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse("-x^2");
        assert_eq!(
            expr,
            Expr::Mul(
                Box::new(Expr::Const(-1.0)),
                Box::new(Expr::var("x").pow(Expr::Const(2.0)))
            )
        );
        assert_eq!(parse("x^-1").to_string(), "(x ^ (-1))");
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(parse("sin(x)+ln(y)").to_string(), "(sin(x) + ln(y))");
        assert_eq!(parse("tan(x)"), Expr::tg(Expr::var("x").boxed()));
        assert_eq!(parse("sgn(x)"), Expr::Sign(Expr::var("x").boxed()));
        assert_eq!(parse("sqrt(x)"), Expr::var("x").pow(Expr::Const(0.5)));
        assert_relative_eq!(parse("pi").as_const().unwrap(), PI);
        assert_relative_eq!(parse("e").as_const().unwrap(), E);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse("2.5"), Expr::Const(2.5));
        assert_eq!(parse("1e-3"), Expr::Const(1e-3));
        assert_eq!(parse(".5"), Expr::Const(0.5));
    }

    #[test]
    fn test_whitespace_is_ignored() {
        assert_eq!(parse("  x ^ 2 +  1 "), parse("x^2+1"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Expr::parse_expression("x+"),
            Err(PlotError::Parse(_))
        ));
        assert!(matches!(
            Expr::parse_expression("(x"),
            Err(PlotError::Parse(_))
        ));
        assert!(Expr::parse_expression("").is_err());
        let err = Expr::parse_expression("foo(x)").unwrap_err();
        assert_eq!(err, PlotError::Parse("unknown function 'foo'".to_string()));
    }
}
