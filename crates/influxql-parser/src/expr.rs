// Expression parser.
//
// Left-associative precedence climbing with a single in-place tree
// rotation per step. String literals that look like datetimes are probed
// and parsed into time literals here.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use influxql_ast::{parse_duration, Duration, Expr, RegexLiteral};
use regex::Regex;

use crate::parser::{tokstr, ParseError, Parser};
use crate::token::{Pos, Token};

/// A date-only string: `YYYY-MM-DD` and nothing else.
static DATE_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date probe"));

/// A date followed by anything: probes datetime-shaped strings. Strings
/// that merely start with a date prefix still match and are then rejected
/// as unparseable datetimes rather than silently becoming string literals.
static DATE_TIME_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}.+").expect("valid datetime probe"));

impl Parser<'_> {
    /// Parse a single expression.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        // The root of the tree; reshaped as operators stream in.
        let mut expr = self.parse_unary_expr()?;

        loop {
            // A non-operator token ends the expression.
            let (tok, _, _) = self.scan_ignore_whitespace();
            let Some(op) = tok.as_binary_op() else {
                self.unscan();
                return Ok(expr);
            };

            let rhs = self.parse_unary_expr()?;

            // When the incoming operator binds tighter than the root, the
            // root's right child rotates down to keep left associativity.
            expr = match expr {
                Expr::Binary {
                    lhs,
                    op: root_op,
                    rhs: root_rhs,
                } if root_op.precedence() < op.precedence() => Expr::Binary {
                    lhs,
                    op: root_op,
                    rhs: Box::new(Expr::Binary {
                        lhs: root_rhs,
                        op,
                        rhs: Box::new(rhs),
                    }),
                },
                root => Expr::Binary {
                    lhs: Box::new(root),
                    op,
                    rhs: Box::new(rhs),
                },
            };
        }
    }

    /// Parse a non-binary expression.
    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        // A parenthesized expression groups its own subtree.
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok == Token::LeftParen {
            let expr = self.parse_expr()?;
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok != Token::RightParen {
                return Err(ParseError::new(tokstr(tok, &lit), &[")"], pos));
            }
            return Ok(Expr::Paren(Box::new(expr)));
        }
        self.unscan();

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        match tok {
            Token::Ident => {
                // An immediately following paren makes this a call.
                let (next, _, _) = self.scan();
                if next == Token::LeftParen {
                    return self.parse_call(lit);
                }
                self.unscan();
                Ok(Expr::VarRef(lit))
            }
            Token::String => parse_string_literal(lit, pos),
            Token::Number => match lit.parse::<f64>() {
                Ok(v) => Ok(Expr::Number(v)),
                Err(_) => Err(ParseError::with_message("unable to parse number", pos)),
            },
            Token::True => Ok(Expr::Boolean(true)),
            Token::False => Ok(Expr::Boolean(false)),
            Token::DurationVal => {
                // The scanner only emits well-formed duration literals.
                Ok(Expr::Duration(
                    parse_duration(&lit).unwrap_or(Duration::ZERO),
                ))
            }
            Token::Mul => Ok(Expr::Wildcard),
            Token::Regex => match Regex::new(&lit) {
                Ok(re) => Ok(Expr::Regex(RegexLiteral::new(re))),
                Err(e) => Err(ParseError::with_message(e.to_string(), pos)),
            },
            _ => Err(ParseError::new(
                tokstr(tok, &lit),
                &["identifier", "string", "number", "bool"],
                pos,
            )),
        }
    }

    /// Parse a function call. The name and opening paren have been consumed;
    /// zero-argument calls are permitted.
    fn parse_call(&mut self, name: String) -> Result<Expr, ParseError> {
        let (tok, _, _) = self.scan();
        if tok == Token::RightParen {
            return Ok(Expr::Call {
                name,
                args: Vec::new(),
            });
        }
        self.unscan();

        let mut args = Vec::new();
        loop {
            args.push(self.parse_expr()?);
            let (tok, _, _) = self.scan();
            if tok != Token::Comma {
                self.unscan();
                break;
            }
        }

        let (tok, pos, lit) = self.scan();
        if tok != Token::RightParen {
            return Err(ParseError::new(tokstr(tok, &lit), &[")"], pos));
        }

        Ok(Expr::Call { name, args })
    }
}

/// Classify a string literal: datetime, date, or plain string.
fn parse_string_literal(lit: String, pos: Pos) -> Result<Expr, ParseError> {
    if DATE_TIME_STRING.is_match(&lit) {
        let t = NaiveDateTime::parse_from_str(&lit, "%Y-%m-%d %H:%M:%S%.f")
            .map(|dt| dt.and_utc())
            .or_else(|_| DateTime::parse_from_rfc3339(&lit).map(|dt| dt.with_timezone(&Utc)))
            .map_err(|_| ParseError::with_message("unable to parse datetime", pos))?;
        Ok(Expr::Time(t))
    } else if DATE_STRING.is_match(&lit) {
        let d = NaiveDate::parse_from_str(&lit, "%Y-%m-%d")
            .map_err(|_| ParseError::with_message("unable to parse date", pos))?;
        Ok(Expr::Time(d.and_time(NaiveTime::MIN).and_utc()))
    } else {
        Ok(Expr::String(lit))
    }
}

#[cfg(test)]
mod tests {
    use influxql_ast::BinaryOp;

    use super::*;

    fn parse(input: &str) -> Expr {
        match crate::parse_expr(input) {
            Ok(expr) => expr,
            Err(err) => unreachable!("parse error for `{input}`: {err}"),
        }
    }

    fn parse_err(input: &str) -> ParseError {
        match crate::parse_expr(input) {
            Ok(expr) => unreachable!("expected error for `{input}`, got {expr:?}"),
            Err(err) => err,
        }
    }

    fn var(name: &str) -> Expr {
        Expr::VarRef(name.to_owned())
    }

    fn binary(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
        Expr::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("42"), Expr::Number(42.0));
        assert_eq!(parse("10.5"), Expr::Number(10.5));
        assert_eq!(parse("'hello'"), Expr::String("hello".to_owned()));
        assert_eq!(parse("true"), Expr::Boolean(true));
        assert_eq!(parse("FALSE"), Expr::Boolean(false));
        assert_eq!(parse("10m"), Expr::Duration(Duration::minutes(10)));
        assert_eq!(parse("*"), Expr::Wildcard);
        assert_eq!(parse("host"), var("host"));
    }

    #[test]
    fn test_date_literal() {
        let expr = parse("'2015-01-02'");
        let expected = NaiveDate::from_ymd_opt(2015, 1, 2)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc();
        assert_eq!(expr, Expr::Time(expected));
    }

    #[test]
    fn test_datetime_literal() {
        let expr = parse("'2015-01-02 12:30:45'");
        let expected = NaiveDate::from_ymd_opt(2015, 1, 2)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap()
            .and_utc();
        assert_eq!(expr, Expr::Time(expected));
    }

    #[test]
    fn test_datetime_literal_fractional() {
        let expr = parse("'2015-01-02 12:30:45.500'");
        let expected = NaiveDate::from_ymd_opt(2015, 1, 2)
            .unwrap()
            .and_hms_micro_opt(12, 30, 45, 500_000)
            .unwrap()
            .and_utc();
        assert_eq!(expr, Expr::Time(expected));
    }

    #[test]
    fn test_datetime_literal_rfc3339() {
        let expr = parse("'2015-01-02T12:30:45Z'");
        let expected = NaiveDate::from_ymd_opt(2015, 1, 2)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap()
            .and_utc();
        assert_eq!(expr, Expr::Time(expected));
    }

    #[test]
    fn test_date_prefixed_garbage_is_rejected() {
        // Matches the datetime probe but parses as neither format; it must
        // not fall back to a plain string literal.
        let err = parse_err("'2015-01-02 nonsense'");
        assert_eq!(err.message.as_deref(), Some("unable to parse datetime"));
    }

    #[test]
    fn test_regex_in_comparison() {
        let expr = parse("host = /web\\/01/");
        match expr {
            Expr::Binary { rhs, .. } => match *rhs {
                Expr::Regex(re) => assert_eq!(re.as_str(), "web/01"),
                other => unreachable!("expected regex, got {other:?}"),
            },
            other => unreachable!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_regex_reports_compile_error() {
        let err = parse_err("host = /(/");
        assert!(err.message.is_some());
    }

    #[test]
    fn test_call_zero_args() {
        assert_eq!(
            parse("now()"),
            Expr::Call {
                name: "now".to_owned(),
                args: Vec::new(),
            }
        );
    }

    #[test]
    fn test_call_with_args() {
        assert_eq!(
            parse("percentile(value, 95)"),
            Expr::Call {
                name: "percentile".to_owned(),
                args: vec![var("value"), Expr::Number(95.0)],
            }
        );
    }

    #[test]
    fn test_call_duration_arg() {
        assert_eq!(
            parse("time(10m)"),
            Expr::Call {
                name: "time".to_owned(),
                args: vec![Expr::Duration(Duration::minutes(10))],
            }
        );
    }

    #[test]
    fn test_paren_expr() {
        assert_eq!(parse("(host)"), Expr::Paren(Box::new(var("host"))));
    }

    #[test]
    fn test_mul_binds_tighter_than_add() {
        // a + b * c => a + (b * c)
        assert_eq!(
            parse("a + b * c"),
            binary(
                var("a"),
                BinaryOp::Add,
                binary(var("b"), BinaryOp::Mul, var("c")),
            )
        );
    }

    #[test]
    fn test_add_binds_tighter_than_comparison() {
        // a + b < c + d => (a + b) < (c + d)
        assert_eq!(
            parse("a + b < c + d"),
            binary(
                binary(var("a"), BinaryOp::Add, var("b")),
                BinaryOp::Lt,
                binary(var("c"), BinaryOp::Add, var("d")),
            )
        );
    }

    #[test]
    fn test_comparison_binds_tighter_than_and() {
        assert_eq!(
            parse("a = 1 AND b = 2"),
            binary(
                binary(var("a"), BinaryOp::Eq, Expr::Number(1.0)),
                BinaryOp::And,
                binary(var("b"), BinaryOp::Eq, Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn test_and_or_equal_precedence_left_associative() {
        // a AND b OR c => (a AND b) OR c
        assert_eq!(
            parse("a AND b OR c"),
            binary(
                binary(var("a"), BinaryOp::And, var("b")),
                BinaryOp::Or,
                var("c"),
            )
        );
    }

    #[test]
    fn test_left_associativity_at_equal_precedence() {
        // a - b + c => (a - b) + c
        assert_eq!(
            parse("a - b + c"),
            binary(
                binary(var("a"), BinaryOp::Sub, var("b")),
                BinaryOp::Add,
                var("c"),
            )
        );
    }

    #[test]
    fn test_division_parses_as_operator() {
        assert_eq!(
            parse("a / b / c"),
            binary(
                binary(var("a"), BinaryOp::Div, var("b")),
                BinaryOp::Div,
                var("c"),
            )
        );
    }

    #[test]
    fn test_rotation_chain() {
        // a = b AND c = d AND e = f keeps AND spine left-deep.
        assert_eq!(
            parse("a = 1 AND b = 2 AND c = 3"),
            binary(
                binary(
                    binary(var("a"), BinaryOp::Eq, Expr::Number(1.0)),
                    BinaryOp::And,
                    binary(var("b"), BinaryOp::Eq, Expr::Number(2.0)),
                ),
                BinaryOp::And,
                binary(var("c"), BinaryOp::Eq, Expr::Number(3.0)),
            )
        );
    }

    #[test]
    fn test_paren_overrides_precedence() {
        // (a + b) * c keeps the paren node in the tree.
        assert_eq!(
            parse("(a + b) * c"),
            binary(
                Expr::Paren(Box::new(binary(var("a"), BinaryOp::Add, var("b")))),
                BinaryOp::Mul,
                var("c"),
            )
        );
    }

    #[test]
    fn test_unexpected_token_error() {
        let err = parse_err(",");
        assert_eq!(
            err.expected,
            vec!["identifier", "string", "number", "bool"]
        );
        assert_eq!(err.found, ",");
    }

    #[test]
    fn test_missing_rparen_error() {
        let err = parse_err("(a + b");
        assert_eq!(err.expected, vec![")"]);
    }

    #[test]
    fn test_expr_round_trip() {
        for input in [
            "a + b * c",
            "host = 'serverA'",
            "(a + b) * c",
            "time(10m)",
            "percentile(value, 95)",
            "value > 10 AND host = 'a' OR region = 'b'",
            "true",
            "10.5",
            "1h",
        ] {
            let expr = parse(input);
            let rendered = expr.to_string();
            assert_eq!(parse(&rendered), expr, "round trip through `{rendered}`");
        }
    }
}
