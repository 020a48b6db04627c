//! Abstract syntax tree node types for the InfluxQL query language.
//!
//! The parser in `influxql-parser` produces one [`Statement`] per
//! semicolon-delimited command, collected into a [`Query`]. Nodes are plain
//! values: they own their children, carry no source positions, and are
//! discarded wholesale by the consumer. Every node implements
//! `fmt::Display`, reconstructing canonical query text that re-parses to a
//! structurally equal tree.

mod display;
pub mod duration;
pub mod quote;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

pub use duration::{format_duration, parse_duration, Duration, InvalidDuration};
pub use quote::{is_reserved_word, quote_ident, quote_string};

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// An ordered sequence of parsed statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub statements: Vec<Statement>,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// A single parsed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Delete(DeleteStatement),

    ShowSeries(ShowSeriesStatement),
    ShowMeasurements(ShowMeasurementsStatement),
    ShowTagKeys(ShowTagKeysStatement),
    ShowTagValues(ShowTagValuesStatement),
    ShowFieldKeys(ShowFieldKeysStatement),
    ShowRetentionPolicies(ShowRetentionPoliciesStatement),
    ShowDatabases(ShowDatabasesStatement),
    ShowUsers(ShowUsersStatement),
    ShowContinuousQueries(ShowContinuousQueriesStatement),

    CreateDatabase(CreateDatabaseStatement),
    DropDatabase(DropDatabaseStatement),
    CreateRetentionPolicy(CreateRetentionPolicyStatement),
    AlterRetentionPolicy(AlterRetentionPolicyStatement),
    DropRetentionPolicy(DropRetentionPolicyStatement),
    CreateUser(CreateUserStatement),
    DropUser(DropUserStatement),
    Grant(GrantStatement),
    Revoke(RevokeStatement),
    CreateContinuousQuery(CreateContinuousQueryStatement),
    DropContinuousQuery(DropContinuousQueryStatement),
    DropMeasurement(DropMeasurementStatement),
    DropSeries(DropSeriesStatement),
}

/// `SELECT <fields> [INTO <target>] FROM <source> [WHERE <cond>]
/// [GROUP BY <dims>] [ORDER BY <sorts>] [LIMIT <n>] [OFFSET <n>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub fields: Vec<Field>,
    pub target: Option<Target>,
    pub source: Source,
    pub condition: Option<Expr>,
    pub dimensions: Vec<Dimension>,
    pub sort_fields: Vec<SortField>,
    /// Maximum number of rows; zero when no LIMIT clause was given.
    pub limit: u64,
    /// Number of rows to skip; zero when no OFFSET clause was given.
    pub offset: u64,
}

impl SelectStatement {
    /// Whether any top-level field expression is a function call.
    #[must_use]
    pub fn is_aggregated(&self) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f.expr, Expr::Call { .. }))
    }

    /// The interval of the `time(<duration>)` dimension call, if any.
    ///
    /// Returns [`Duration::ZERO`] when the statement has no `time` dimension.
    pub fn group_by_interval(&self) -> Result<Duration, GroupByIntervalError> {
        for dim in &self.dimensions {
            if let Expr::Call { name, args } = &dim.expr {
                if !name.eq_ignore_ascii_case("time") {
                    continue;
                }
                if args.len() != 1 {
                    return Err(GroupByIntervalError::ArgumentCount);
                }
                return match &args[0] {
                    Expr::Duration(d) => Ok(*d),
                    _ => Err(GroupByIntervalError::NotADuration),
                };
            }
        }
        Ok(Duration::ZERO)
    }
}

/// Returned when a `time` dimension call is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GroupByIntervalError {
    #[error("time dimension expected one argument")]
    ArgumentCount,
    #[error("time dimension must have one duration argument")]
    NotADuration,
}

/// `DELETE FROM <source> [WHERE <cond>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub source: Source,
    pub condition: Option<Expr>,
}

/// `SHOW SERIES [FROM <source>] [WHERE <cond>] [ORDER BY …] [LIMIT/OFFSET]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowSeriesStatement {
    pub source: Option<Source>,
    pub condition: Option<Expr>,
    pub sort_fields: Vec<SortField>,
    pub limit: u64,
    pub offset: u64,
}

/// `SHOW MEASUREMENTS [WHERE <cond>] [ORDER BY …] [LIMIT/OFFSET]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowMeasurementsStatement {
    pub source: Option<Source>,
    pub condition: Option<Expr>,
    pub sort_fields: Vec<SortField>,
    pub limit: u64,
    pub offset: u64,
}

/// `SHOW TAG KEYS [FROM <source>] [WHERE <cond>] [ORDER BY …] [LIMIT/OFFSET]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowTagKeysStatement {
    pub source: Option<Source>,
    pub condition: Option<Expr>,
    pub sort_fields: Vec<SortField>,
    pub limit: u64,
    pub offset: u64,
}

/// `SHOW TAG VALUES [FROM <source>] WITH KEY (= <key> | IN (<keys>))
/// [WHERE <cond>] [ORDER BY …] [LIMIT/OFFSET]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowTagValuesStatement {
    pub source: Option<Source>,
    pub tag_keys: Vec<String>,
    pub condition: Option<Expr>,
    pub sort_fields: Vec<SortField>,
    pub limit: u64,
    pub offset: u64,
}

/// `SHOW FIELD KEYS [FROM <source>] [ORDER BY …] [LIMIT/OFFSET]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowFieldKeysStatement {
    pub source: Option<Source>,
    pub condition: Option<Expr>,
    pub sort_fields: Vec<SortField>,
    pub limit: u64,
    pub offset: u64,
}

/// `SHOW RETENTION POLICIES <database>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowRetentionPoliciesStatement {
    pub database: String,
}

/// `SHOW DATABASES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowDatabasesStatement;

/// `SHOW USERS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowUsersStatement;

/// `SHOW CONTINUOUS QUERIES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowContinuousQueriesStatement;

/// `CREATE DATABASE <name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatabaseStatement {
    pub name: String,
}

/// `DROP DATABASE <name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropDatabaseStatement {
    pub name: String,
}

/// `CREATE RETENTION POLICY <name> ON <database> DURATION <d>
/// REPLICATION <n> [DEFAULT]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRetentionPolicyStatement {
    pub name: String,
    pub database: String,
    pub duration: Duration,
    /// Replication factor, in `1..=i32::MAX as u32`.
    pub replication: u32,
    pub default: bool,
}

/// `ALTER RETENTION POLICY <name> ON <database> <options>` where the
/// options are any non-empty subset of DURATION, REPLICATION and DEFAULT.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterRetentionPolicyStatement {
    pub name: String,
    pub database: String,
    pub duration: Option<Duration>,
    pub replication: Option<u32>,
    pub default: bool,
}

/// `DROP RETENTION POLICY <name> ON <database>`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropRetentionPolicyStatement {
    pub name: String,
    pub database: String,
}

/// `CREATE USER <name> WITH PASSWORD '<password>' [WITH ALL PRIVILEGES]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateUserStatement {
    pub name: String,
    pub password: String,
    /// Only [`Privilege::All`] can be granted at creation time.
    pub privilege: Option<Privilege>,
}

/// `DROP USER <name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropUserStatement {
    pub name: String,
}

/// `GRANT <privilege> [ON <database>] TO <user>`.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantStatement {
    pub privilege: Privilege,
    /// Absent for a cluster-wide grant, which only ALL PRIVILEGES permits.
    pub on: Option<String>,
    pub user: String,
}

/// `REVOKE <privilege> [ON <database>] FROM <user>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RevokeStatement {
    pub privilege: Privilege,
    pub on: Option<String>,
    pub user: String,
}

/// `CREATE CONTINUOUS QUERY <name> ON <database> BEGIN <select> END`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateContinuousQueryStatement {
    pub name: String,
    pub database: String,
    pub source: SelectStatement,
}

/// `DROP CONTINUOUS QUERY <name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropContinuousQueryStatement {
    pub name: String,
}

/// `DROP MEASUREMENT <name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropMeasurementStatement {
    pub name: String,
}

/// `DROP SERIES [FROM <source>] [WHERE <cond>]`, or `DROP SERIES <id>`
/// when neither clause is given.
#[derive(Debug, Clone, PartialEq)]
pub struct DropSeriesStatement {
    pub source: Option<Source>,
    pub condition: Option<Expr>,
    pub series_id: u32,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// The FROM clause of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Measurement(Measurement),
    Join(Join),
    Merge(Merge),
}

/// A named time-series collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
}

/// `join(<measurements>)` — series joined on matching timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub measurements: Vec<Measurement>,
}

/// `merge(<measurements>)` — series interleaved by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub measurements: Vec<Measurement>,
}

// ---------------------------------------------------------------------------
// Clause components
// ---------------------------------------------------------------------------

/// A projected expression with an optional alias (empty when absent).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub expr: Expr,
    pub alias: String,
}

/// A single GROUP BY term.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub expr: Expr,
}

/// A single ORDER BY term. The name is empty when only a direction was
/// given; a bare name with no direction sorts descending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortField {
    pub name: String,
    pub ascending: bool,
}

/// The INTO clause of a select statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub measurement: String,
    pub database: Option<String>,
}

/// An access privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Read,
    Write,
    All,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A binary operation; respects operator precedence and left
    /// associativity.
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },
    /// A parenthesized expression.
    Paren(Box<Expr>),
    /// A function call. Zero-argument calls are permitted.
    Call { name: String, args: Vec<Expr> },
    /// A reference to a field or tag.
    VarRef(String),
    /// `*`.
    Wildcard,
    Number(f64),
    String(String),
    Boolean(bool),
    Time(DateTime<Utc>),
    Duration(Duration),
    Regex(RegexLiteral),
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or | Self::And => 1,
            Self::Eq | Self::Neq | Self::Lt | Self::Lte | Self::Gt | Self::Gte => 2,
            Self::Add | Self::Sub => 3,
            Self::Mul | Self::Div => 4,
        }
    }
}

/// A compiled regular expression literal.
///
/// Equality compares the source pattern, not the compiled automaton.
#[derive(Debug, Clone)]
pub struct RegexLiteral {
    pub val: Regex,
}

impl RegexLiteral {
    #[must_use]
    pub fn new(val: Regex) -> Self {
        Self { val }
    }

    /// The source pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.val.as_str()
    }
}

impl PartialEq for RegexLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select_with(fields: Vec<Field>, dimensions: Vec<Dimension>) -> SelectStatement {
        SelectStatement {
            fields,
            target: None,
            source: Source::Measurement(Measurement {
                name: "cpu".to_owned(),
            }),
            condition: None,
            dimensions,
            sort_fields: Vec::new(),
            limit: 0,
            offset: 0,
        }
    }

    fn time_call(args: Vec<Expr>) -> Dimension {
        Dimension {
            expr: Expr::Call {
                name: "time".to_owned(),
                args,
            },
        }
    }

    #[test]
    fn test_is_aggregated() {
        let plain = select_with(
            vec![Field {
                expr: Expr::VarRef("value".to_owned()),
                alias: String::new(),
            }],
            Vec::new(),
        );
        assert!(!plain.is_aggregated());

        let agg = select_with(
            vec![Field {
                expr: Expr::Call {
                    name: "mean".to_owned(),
                    args: vec![Expr::VarRef("value".to_owned())],
                },
                alias: String::new(),
            }],
            Vec::new(),
        );
        assert!(agg.is_aggregated());
    }

    #[test]
    fn test_group_by_interval() {
        let stmt = select_with(
            Vec::new(),
            vec![time_call(vec![Expr::Duration(Duration::minutes(10))])],
        );
        assert_eq!(stmt.group_by_interval(), Ok(Duration::minutes(10)));
    }

    #[test]
    fn test_group_by_interval_absent_is_zero() {
        let stmt = select_with(
            Vec::new(),
            vec![Dimension {
                expr: Expr::VarRef("region".to_owned()),
            }],
        );
        assert_eq!(stmt.group_by_interval(), Ok(Duration::ZERO));
    }

    #[test]
    fn test_group_by_interval_errors() {
        let stmt = select_with(Vec::new(), vec![time_call(Vec::new())]);
        assert_eq!(
            stmt.group_by_interval(),
            Err(GroupByIntervalError::ArgumentCount)
        );

        let stmt = select_with(
            Vec::new(),
            vec![time_call(vec![Expr::VarRef("x".to_owned())])],
        );
        assert_eq!(
            stmt.group_by_interval(),
            Err(GroupByIntervalError::NotADuration)
        );
    }

    #[test]
    fn test_time_call_name_is_case_insensitive() {
        let stmt = select_with(
            Vec::new(),
            vec![Dimension {
                expr: Expr::Call {
                    name: "TIME".to_owned(),
                    args: vec![Expr::Duration(Duration::hours(1))],
                },
            }],
        );
        assert_eq!(stmt.group_by_interval(), Ok(Duration::hours(1)));
    }

    #[test]
    fn test_regex_literal_eq_compares_pattern() {
        let a = RegexLiteral::new(Regex::new("web.*").unwrap());
        let b = RegexLiteral::new(Regex::new("web.*").unwrap());
        let c = RegexLiteral::new(Regex::new("db.*").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_binary_op_precedence_ladder() {
        assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
        assert!(BinaryOp::Add.precedence() > BinaryOp::Eq.precedence());
        assert!(BinaryOp::Eq.precedence() > BinaryOp::And.precedence());
        assert_eq!(BinaryOp::And.precedence(), BinaryOp::Or.precedence());
    }
}
