//! Hand-written recursive descent parser for the InfluxQL query language.
//!
//! The scanner turns query text into `(Token, Pos, String)` triples, a
//! single-slot buffer provides one token of pushback, and the parser builds
//! the AST defined in `influxql-ast`. Two entry points operate on strings:
//! [`parse_query`] for a full statement sequence and [`parse_expr`] for a
//! lone expression.

mod expr;
pub mod parser;
pub mod scanner;
pub mod token;

use influxql_ast::{Expr, Query};

pub use parser::{ParseError, Parser};
pub use scanner::{BufScanner, Scanner};
pub use token::{Pos, Token};

/// Parse a query string into its AST representation.
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    Parser::new(input).parse_query()
}

/// Parse a single expression string into its AST representation.
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    Parser::new(input).parse_expr()
}
