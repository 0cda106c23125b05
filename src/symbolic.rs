#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns an untrusted String into a symbolic expression
///
///# Example
/// ```
/// use RustedCalc::symbolic::parse_expr::parse;
/// let parsed_expression = parse("2x^2 + 3x + 1").unwrap();
/// assert_eq!(parsed_expression.to_string(), "2*x**2 + 3*x + 1");
/// // implicit multiplication and the X alias
/// assert_eq!(parse("X**2").unwrap(), parse("x^2").unwrap());
/// // anything outside the arithmetic grammar is rejected
/// assert!(parse("import os; os.system('rm -rf /')").is_err());
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) defines the expression tree `Expr` and its plain-text printing
/// 2) finds the free symbols of an expression
/// 3) substitutes variables
///# Example#
/// ```
/// use RustedCalc::symbolic::parse_expr::parse;
/// let expr = parse("x^2*y + sin(z) + pi").unwrap();
/// let symbols: Vec<String> = expr.free_symbols().into_iter().collect();
/// assert_eq!(symbols, vec!["x", "y", "z"]);
/// assert!(expr.has_variable("y"));
/// assert!(!expr.has_variable("pi"));
/// ```
pub mod symbolic_engine;
///____________________________________________________________________________________________________________________________
/// # Differentiation
/// symbolic (partial) derivatives of an expression
/// ```
/// use RustedCalc::symbolic::parse_expr::parse;
/// let expr = parse("x^2*y + y^3").unwrap();
/// assert_eq!(expr.diff("y").simplify().to_string(), "x**2 + 3*y**2");
/// ```
pub mod symbolic_engine_derivatives;
/// # Simplification
/// normal form of sums and products: like terms collected, rational coefficients, ordered terms
/// ```
/// use RustedCalc::symbolic::parse_expr::parse;
/// assert_eq!(parse("x + x + 2").unwrap().simplify().to_string(), "2*x + 2");
/// ```
pub mod symbolic_simplify;
/// # Integration
/// antiderivatives by table, substitution, integration by parts and partial fractions;
/// definite integrals with infinite bounds; Gauss-Legendre quadrature
/// ```
/// use RustedCalc::symbolic::parse_expr::parse;
/// let expr = parse("3*x^2").unwrap();
/// assert_eq!(expr.integrate("x").unwrap().to_string(), "x**3");
/// ```
pub mod symbolic_integration;
/// # Lambdify
/// turns a symbolic expression into a Rust closure and evaluates it over ndarray grids
/// ```
/// use RustedCalc::symbolic::parse_expr::parse;
/// let f = parse("x^2 + y").unwrap().lambdify(&["x", "y"]).unwrap();
/// assert_eq!(f(&[3.0, 1.0]), 10.0);
/// ```
pub mod symbolic_lambdify;
/// # LaTeX
/// typesetting of expressions
pub mod symbolic_latex;
/// # Solve
/// real solutions of `expr = 0`
/// ```
/// use RustedCalc::symbolic::parse_expr::parse;
/// use RustedCalc::symbolic::symbolic_solve::SolverConfig;
/// let roots = parse("x^2 - 4").unwrap().solve("x", &SolverConfig::default()).unwrap();
/// let text: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
/// assert_eq!(text, vec!["-2", "2"]);
/// ```
pub mod symbolic_solve;
/// numeric helpers shared by the symbolic modules
pub mod utils;
mod symbolic_engine_tests;
