// Statement parser.
//
// Hand-written recursive descent over a buffered token stream. Expression
// parsing lives in expr.rs. One token of pushback is all the grammar needs;
// the parser fails fast on the first error and never returns a partial tree.

use std::error::Error;
use std::fmt;

use influxql_ast::{
    parse_duration, AlterRetentionPolicyStatement, CreateContinuousQueryStatement,
    CreateDatabaseStatement, CreateRetentionPolicyStatement, CreateUserStatement, DeleteStatement,
    Dimension, DropContinuousQueryStatement, DropDatabaseStatement, DropMeasurementStatement,
    DropRetentionPolicyStatement, DropSeriesStatement, DropUserStatement, Duration, Expr, Field,
    GrantStatement, Join, Measurement, Merge, Privilege, Query, RevokeStatement, SelectStatement,
    ShowContinuousQueriesStatement, ShowDatabasesStatement, ShowFieldKeysStatement,
    ShowMeasurementsStatement, ShowRetentionPoliciesStatement, ShowSeriesStatement,
    ShowTagKeysStatement, ShowTagValuesStatement, ShowUsersStatement, SortField, Source, Statement,
    Target,
};

use crate::scanner::BufScanner;
use crate::token::{Pos, Token};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// An error produced while parsing query text.
///
/// Carries either a free-form message or a found/expected pair, always with
/// the source position of the offending token. Line and char render 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: Option<String>,
    pub found: String,
    pub expected: Vec<String>,
    pub pos: Pos,
}

impl ParseError {
    pub(crate) fn new(found: impl Into<String>, expected: &[&str], pos: Pos) -> Self {
        Self {
            message: None,
            found: found.into(),
            expected: expected.iter().map(|s| (*s).to_owned()).collect(),
            pos,
        }
    }

    pub(crate) fn with_message(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: Some(message.into()),
            found: String::new(),
            expected: Vec::new(),
            pos,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref msg) = self.message {
            write!(
                f,
                "{msg} at line {}, char {}",
                self.pos.line + 1,
                self.pos.column + 1
            )
        } else {
            write!(
                f,
                "found {}, expected {} at line {}, char {}",
                self.found,
                self.expected.join(", "),
                self.pos.line + 1,
                self.pos.column + 1
            )
        }
    }
}

impl Error for ParseError {}

/// Error-display text for a token: its literal when it has one, else its
/// printable name.
pub(crate) fn tokstr(tok: Token, lit: &str) -> String {
    if lit.is_empty() {
        tok.to_string()
    } else {
        lit.to_owned()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Whether a select statement must carry an INTO clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetRequirement {
    Required,
    NotRequired,
}

/// A recursive-descent parser over one input string.
///
/// Each instance owns its buffered scanner and holds no other state;
/// independent parsers may run in parallel freely.
pub struct Parser<'a> {
    s: BufScanner<'a>,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned at the start of `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            s: BufScanner::new(input),
        }
    }

    /// Parse a sequence of semicolon-separated statements.
    ///
    /// Empty or whitespace-only input yields an empty query.
    pub fn parse_query(&mut self) -> Result<Query, ParseError> {
        let span = tracing::debug_span!(
            target: "influxql.parse",
            "parse_query",
            statements = tracing::field::Empty,
        );
        let _guard = span.enter();

        let result = self.parse_query_inner();
        match &result {
            Ok(query) => {
                span.record("statements", query.statements.len() as u64);
            }
            Err(err) => {
                tracing::warn!(target: "influxql.parse", error = %err, "query rejected");
            }
        }
        result
    }

    fn parse_query_inner(&mut self) -> Result<Query, ParseError> {
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok == Token::Eof {
            return Ok(Query::default());
        }
        self.unscan();

        let mut statements = Vec::new();
        loop {
            statements.push(self.parse_statement()?);

            // Each statement ends at a semicolon or the end of input.
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok == Token::Eof {
                break;
            } else if tok != Token::Semicolon {
                return Err(ParseError::new(tokstr(tok, &lit), &[";", "EOF"], pos));
            }

            // A trailing semicolon is permitted.
            let (tok, _, _) = self.scan_ignore_whitespace();
            if tok == Token::Eof {
                break;
            }
            self.unscan();
        }

        Ok(Query { statements })
    }

    /// Parse a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        match tok {
            Token::KwSelect => Ok(Statement::Select(
                self.parse_select_statement(TargetRequirement::NotRequired)?,
            )),
            Token::KwDelete => Ok(Statement::Delete(self.parse_delete_statement()?)),
            Token::KwShow => self.parse_show_statement(),
            Token::KwCreate => self.parse_create_statement(),
            Token::KwDrop => self.parse_drop_statement(),
            Token::KwGrant => Ok(Statement::Grant(self.parse_grant_statement()?)),
            Token::KwRevoke => Ok(Statement::Revoke(self.parse_revoke_statement()?)),
            Token::KwAlter => self.parse_alter_statement(),
            _ => Err(ParseError::new(tokstr(tok, &lit), &["SELECT"], pos)),
        }
    }

    // -----------------------------------------------------------------------
    // Token navigation
    // -----------------------------------------------------------------------

    pub(crate) fn scan(&mut self) -> (Token, Pos, String) {
        self.s.scan()
    }

    pub(crate) fn unscan(&mut self) {
        self.s.unscan()
    }

    /// Scan the next token, skipping over a whitespace token.
    pub(crate) fn scan_ignore_whitespace(&mut self) -> (Token, Pos, String) {
        let item = self.scan();
        if item.0 == Token::Ws {
            return self.scan();
        }
        item
    }

    /// Consume the next token only if it is whitespace.
    pub(crate) fn consume_whitespace(&mut self) {
        let (tok, _, _) = self.scan();
        if tok != Token::Ws {
            self.unscan();
        }
    }

    /// Consume an expected sequence of keyword tokens.
    fn parse_tokens(&mut self, toks: &[Token]) -> Result<(), ParseError> {
        for expected in toks {
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok != *expected {
                let want = expected.to_string();
                return Err(ParseError::new(tokstr(tok, &lit), &[want.as_str()], pos));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Terminal parsers
    // -----------------------------------------------------------------------

    fn parse_ident(&mut self) -> Result<String, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Ident {
            return Err(ParseError::new(tokstr(tok, &lit), &["identifier"], pos));
        }
        Ok(lit)
    }

    fn parse_ident_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut idents = vec![self.parse_ident()?];
        loop {
            let (tok, _, _) = self.scan_ignore_whitespace();
            if tok != Token::Comma {
                self.unscan();
                return Ok(idents);
            }
            idents.push(self.parse_ident()?);
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::String {
            return Err(ParseError::new(tokstr(tok, &lit), &["string"], pos));
        }
        Ok(lit)
    }

    /// Parse an integer literal constrained to `min..=max`. The literal must
    /// carry no fractional part.
    fn parse_int(&mut self, min: i64, max: i64) -> Result<i64, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Number {
            return Err(ParseError::new(tokstr(tok, &lit), &["number"], pos));
        }

        if lit.contains('.') {
            return Err(ParseError::with_message("number must be an integer", pos));
        }

        let n: i64 = lit
            .parse()
            .map_err(|e: std::num::ParseIntError| ParseError::with_message(e.to_string(), pos))?;
        if n < min || n > max {
            return Err(ParseError::with_message(
                format!("invalid value {n}: must be {min} <= n <= {max}"),
                pos,
            ));
        }
        Ok(n)
    }

    /// Parse a 32-bit unsigned integer literal.
    fn parse_uint32(&mut self) -> Result<u32, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Number {
            return Err(ParseError::new(tokstr(tok, &lit), &["number"], pos));
        }
        lit.parse()
            .map_err(|e: std::num::ParseIntError| ParseError::with_message(e.to_string(), pos))
    }

    /// Parse a duration literal token.
    fn parse_duration_val(&mut self) -> Result<Duration, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::DurationVal {
            return Err(ParseError::new(tokstr(tok, &lit), &["duration"], pos));
        }
        parse_duration(&lit).map_err(|e| ParseError::with_message(e.to_string(), pos))
    }

    /// Parse `<keyword> <n>` when the keyword is present, returning zero
    /// otherwise. The number must be a positive integer.
    fn parse_optional_token_and_int(&mut self, t: Token) -> Result<u64, ParseError> {
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok != t {
            self.unscan();
            return Ok(0);
        }

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Number {
            return Err(ParseError::new(tokstr(tok, &lit), &["number"], pos));
        }
        if lit.contains('.') {
            return Err(ParseError::with_message(
                format!("fractional parts not allowed in {t}"),
                pos,
            ));
        }

        let n: i64 = lit.parse().unwrap_or(0);
        if n < 1 {
            return Err(ParseError::with_message(format!("{t} must be > 0"), pos));
        }
        Ok(n as u64)
    }

    // -----------------------------------------------------------------------
    // SELECT and DELETE
    // -----------------------------------------------------------------------

    /// Parse the remainder of a select statement. The SELECT token has
    /// already been consumed.
    fn parse_select_statement(
        &mut self,
        tr: TargetRequirement,
    ) -> Result<SelectStatement, ParseError> {
        let fields = self.parse_fields()?;
        let target = self.parse_target(tr)?;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwFrom {
            return Err(ParseError::new(tokstr(tok, &lit), &["FROM"], pos));
        }
        let source = self.parse_source()?;

        let condition = self.parse_condition()?;
        let dimensions = self.parse_dimensions()?;
        let sort_fields = self.parse_order_by()?;
        let limit = self.parse_optional_token_and_int(Token::KwLimit)?;
        let offset = self.parse_optional_token_and_int(Token::KwOffset)?;

        Ok(SelectStatement {
            fields,
            target,
            source,
            condition,
            dimensions,
            sort_fields,
            limit,
            offset,
        })
    }

    /// Parse the INTO clause, if any.
    fn parse_target(&mut self, tr: TargetRequirement) -> Result<Option<Target>, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwInto {
            if tr == TargetRequirement::Required {
                return Err(ParseError::new(tokstr(tok, &lit), &["INTO"], pos));
            }
            self.unscan();
            return Ok(None);
        }

        // The identifier names the destination measurement; an optional ON
        // clause names its database.
        let measurement = self.parse_ident()?;

        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok != Token::KwOn {
            self.unscan();
            return Ok(Some(Target {
                measurement,
                database: None,
            }));
        }
        let database = self.parse_ident()?;

        Ok(Some(Target {
            measurement,
            database: Some(database),
        }))
    }

    /// Parse a delete statement. The DELETE token has already been consumed.
    fn parse_delete_statement(&mut self) -> Result<DeleteStatement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwFrom {
            return Err(ParseError::new(tokstr(tok, &lit), &["FROM"], pos));
        }
        let source = self.parse_source()?;
        let condition = self.parse_condition()?;
        Ok(DeleteStatement { source, condition })
    }

    // -----------------------------------------------------------------------
    // Clause parsers
    // -----------------------------------------------------------------------

    /// Parse the projection list: a lone `*` or comma-separated fields.
    fn parse_fields(&mut self) -> Result<Vec<Field>, ParseError> {
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok == Token::Mul {
            return Ok(vec![Field {
                expr: Expr::Wildcard,
                alias: String::new(),
            }]);
        }
        self.unscan();

        let mut fields = Vec::new();
        loop {
            fields.push(self.parse_field()?);
            let (tok, _, _) = self.scan();
            if tok != Token::Comma {
                self.unscan();
                break;
            }
        }
        Ok(fields)
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let expr = self.parse_expr()?;
        let alias = self.parse_alias()?;
        // Leave a clean stream for the next clause dispatch.
        self.consume_whitespace();
        Ok(Field { expr, alias })
    }

    /// Parse an `AS <ident>` alias, returning an empty string when absent.
    fn parse_alias(&mut self) -> Result<String, ParseError> {
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok != Token::KwAs {
            self.unscan();
            return Ok(String::new());
        }
        self.parse_ident()
    }

    /// Parse the FROM clause: a measurement name or a join/merge call.
    fn parse_source(&mut self) -> Result<Source, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::Ident {
            return Err(ParseError::new(tokstr(tok, &lit), &["identifier"], pos));
        }

        // Without an immediately following paren this is a plain measurement.
        let (next, _, _) = self.scan();
        if next != Token::LeftParen {
            self.unscan();
            return Ok(Source::Measurement(Measurement { name: lit }));
        }

        let source_type = lit.to_ascii_lowercase();
        if source_type != "join" && source_type != "merge" {
            return Err(ParseError::with_message(
                format!("unknown merge type: {source_type}"),
                pos,
            ));
        }

        let mut measurements = Vec::new();
        loop {
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok != Token::Ident {
                return Err(ParseError::new(tokstr(tok, &lit), &["measurement name"], pos));
            }
            measurements.push(Measurement { name: lit });

            let (tok, _, _) = self.scan();
            if tok != Token::Comma {
                self.unscan();
                break;
            }
        }

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::RightParen {
            return Err(ParseError::new(tokstr(tok, &lit), &[")"], pos));
        }

        if source_type == "join" {
            Ok(Source::Join(Join { measurements }))
        } else {
            Ok(Source::Merge(Merge { measurements }))
        }
    }

    /// Parse the WHERE clause, if any.
    fn parse_condition(&mut self) -> Result<Option<Expr>, ParseError> {
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok != Token::KwWhere {
            self.unscan();
            return Ok(None);
        }
        Ok(Some(self.parse_expr()?))
    }

    /// Parse the GROUP BY clause, if any.
    fn parse_dimensions(&mut self) -> Result<Vec<Dimension>, ParseError> {
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok != Token::KwGroup {
            self.unscan();
            return Ok(Vec::new());
        }

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwBy {
            return Err(ParseError::new(tokstr(tok, &lit), &["BY"], pos));
        }

        let mut dimensions = Vec::new();
        loop {
            dimensions.push(self.parse_dimension()?);
            let (tok, _, _) = self.scan();
            if tok != Token::Comma {
                self.unscan();
                break;
            }
        }
        Ok(dimensions)
    }

    fn parse_dimension(&mut self) -> Result<Dimension, ParseError> {
        let expr = self.parse_expr()?;
        self.consume_whitespace();
        Ok(Dimension { expr })
    }

    /// Parse the ORDER BY clause, if any.
    fn parse_order_by(&mut self) -> Result<Vec<SortField>, ParseError> {
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok != Token::KwOrder {
            self.unscan();
            return Ok(Vec::new());
        }

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwBy {
            return Err(ParseError::new(tokstr(tok, &lit), &["BY"], pos));
        }

        self.parse_sort_fields()
    }

    fn parse_sort_fields(&mut self) -> Result<Vec<SortField>, ParseError> {
        let mut fields = vec![self.parse_sort_field()?];
        loop {
            let (tok, _, _) = self.scan_ignore_whitespace();
            if tok != Token::Comma {
                self.unscan();
                break;
            }
            fields.push(self.parse_sort_field()?);
        }
        Ok(fields)
    }

    /// Parse one ORDER BY term: a name, a direction, or both.
    fn parse_sort_field(&mut self) -> Result<SortField, ParseError> {
        let mut field = SortField::default();

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        let direction = if tok == Token::Ident || tok == Token::String {
            field.name = lit;
            let (tok, _, _) = self.scan_ignore_whitespace();
            if tok != Token::KwAsc && tok != Token::KwDesc {
                self.unscan();
                return Ok(field);
            }
            tok
        } else if tok != Token::KwAsc && tok != Token::KwDesc {
            return Err(ParseError::new(
                tokstr(tok, &lit),
                &["identifier, ASC, or DESC"],
                pos,
            ));
        } else {
            tok
        };

        field.ascending = direction == Token::KwAsc;
        Ok(field)
    }

    /// Parse `WITH KEY (= <key> | IN (<key list>))`.
    fn parse_tag_keys(&mut self) -> Result<Vec<String>, ParseError> {
        self.parse_tokens(&[Token::KwWith, Token::KwKey])?;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok == Token::KwIn {
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok != Token::LeftParen {
                return Err(ParseError::new(tokstr(tok, &lit), &["("], pos));
            }

            let tag_keys = self.parse_ident_list()?;

            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok != Token::RightParen {
                return Err(ParseError::new(tokstr(tok, &lit), &["("], pos));
            }
            Ok(tag_keys)
        } else if tok == Token::Eq {
            Ok(vec![self.parse_ident()?])
        } else {
            Err(ParseError::new(tokstr(tok, &lit), &["IN", "="], pos))
        }
    }

    /// Parse `[DEFAULT] RETENTION POLICY <name>`, returning the policy name
    /// and whether DEFAULT was given. Used by clauses that attach a policy
    /// qualifier after WITH.
    pub fn parse_retention_policy(&mut self) -> Result<(String, bool), ParseError> {
        let (mut tok, mut pos, mut lit) = self.scan_ignore_whitespace();
        let default = tok == Token::KwDefault;
        if default {
            (tok, pos, lit) = self.scan_ignore_whitespace();
        }

        if tok != Token::KwRetention {
            return Err(ParseError::new(tokstr(tok, &lit), &["RETENTION"], pos));
        }

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwPolicy {
            return Err(ParseError::new(tokstr(tok, &lit), &["POLICY"], pos));
        }

        let name = self.parse_ident()?;
        Ok((name, default))
    }

    // -----------------------------------------------------------------------
    // SHOW statements
    // -----------------------------------------------------------------------

    /// Dispatch a SHOW statement. The SHOW token has already been consumed.
    fn parse_show_statement(&mut self) -> Result<Statement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        match tok {
            Token::KwContinuous => Ok(Statement::ShowContinuousQueries(
                self.parse_show_continuous_queries_statement()?,
            )),
            Token::KwDatabases => Ok(Statement::ShowDatabases(ShowDatabasesStatement)),
            Token::KwField => {
                let (tok, pos, lit) = self.scan_ignore_whitespace();
                if tok == Token::KwKeys {
                    return Ok(Statement::ShowFieldKeys(
                        self.parse_show_field_keys_statement()?,
                    ));
                }
                Err(ParseError::new(tokstr(tok, &lit), &["KEYS", "VALUES"], pos))
            }
            Token::KwMeasurements => Ok(Statement::ShowMeasurements(
                self.parse_show_measurements_statement()?,
            )),
            Token::KwRetention => {
                let (tok, pos, lit) = self.scan_ignore_whitespace();
                if tok == Token::KwPolicies {
                    return Ok(Statement::ShowRetentionPolicies(
                        self.parse_show_retention_policies_statement()?,
                    ));
                }
                Err(ParseError::new(tokstr(tok, &lit), &["POLICIES"], pos))
            }
            Token::KwSeries => Ok(Statement::ShowSeries(self.parse_show_series_statement()?)),
            Token::KwTag => {
                let (tok, pos, lit) = self.scan_ignore_whitespace();
                if tok == Token::KwKeys {
                    return Ok(Statement::ShowTagKeys(
                        self.parse_show_tag_keys_statement()?,
                    ));
                } else if tok == Token::KwValues {
                    return Ok(Statement::ShowTagValues(
                        self.parse_show_tag_values_statement()?,
                    ));
                }
                Err(ParseError::new(tokstr(tok, &lit), &["KEYS", "VALUES"], pos))
            }
            Token::KwUsers => Ok(Statement::ShowUsers(ShowUsersStatement)),
            _ => Err(ParseError::new(
                tokstr(tok, &lit),
                &[
                    "CONTINUOUS",
                    "DATABASES",
                    "FIELD",
                    "MEASUREMENTS",
                    "RETENTION",
                    "SERIES",
                    "TAG",
                    "USERS",
                ],
                pos,
            )),
        }
    }

    /// Parse the optional `FROM <source>` clause shared by SHOW statements.
    fn parse_optional_source(&mut self) -> Result<Option<Source>, ParseError> {
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok == Token::KwFrom {
            Ok(Some(self.parse_source()?))
        } else {
            self.unscan();
            Ok(None)
        }
    }

    fn parse_show_series_statement(&mut self) -> Result<ShowSeriesStatement, ParseError> {
        let source = self.parse_optional_source()?;
        let condition = self.parse_condition()?;
        let sort_fields = self.parse_order_by()?;
        let limit = self.parse_optional_token_and_int(Token::KwLimit)?;
        let offset = self.parse_optional_token_and_int(Token::KwOffset)?;
        Ok(ShowSeriesStatement {
            source,
            condition,
            sort_fields,
            limit,
            offset,
        })
    }

    fn parse_show_measurements_statement(
        &mut self,
    ) -> Result<ShowMeasurementsStatement, ParseError> {
        let condition = self.parse_condition()?;
        let sort_fields = self.parse_order_by()?;
        let limit = self.parse_optional_token_and_int(Token::KwLimit)?;
        let offset = self.parse_optional_token_and_int(Token::KwOffset)?;
        Ok(ShowMeasurementsStatement {
            source: None,
            condition,
            sort_fields,
            limit,
            offset,
        })
    }

    fn parse_show_tag_keys_statement(&mut self) -> Result<ShowTagKeysStatement, ParseError> {
        let source = self.parse_optional_source()?;
        let condition = self.parse_condition()?;
        let sort_fields = self.parse_order_by()?;
        let limit = self.parse_optional_token_and_int(Token::KwLimit)?;
        let offset = self.parse_optional_token_and_int(Token::KwOffset)?;
        Ok(ShowTagKeysStatement {
            source,
            condition,
            sort_fields,
            limit,
            offset,
        })
    }

    fn parse_show_tag_values_statement(&mut self) -> Result<ShowTagValuesStatement, ParseError> {
        let source = self.parse_optional_source()?;
        let tag_keys = self.parse_tag_keys()?;
        let condition = self.parse_condition()?;
        let sort_fields = self.parse_order_by()?;
        let limit = self.parse_optional_token_and_int(Token::KwLimit)?;
        let offset = self.parse_optional_token_and_int(Token::KwOffset)?;
        Ok(ShowTagValuesStatement {
            source,
            tag_keys,
            condition,
            sort_fields,
            limit,
            offset,
        })
    }

    fn parse_show_field_keys_statement(&mut self) -> Result<ShowFieldKeysStatement, ParseError> {
        let source = self.parse_optional_source()?;
        let sort_fields = self.parse_order_by()?;
        let limit = self.parse_optional_token_and_int(Token::KwLimit)?;
        let offset = self.parse_optional_token_and_int(Token::KwOffset)?;
        Ok(ShowFieldKeysStatement {
            source,
            condition: None,
            sort_fields,
            limit,
            offset,
        })
    }

    fn parse_show_retention_policies_statement(
        &mut self,
    ) -> Result<ShowRetentionPoliciesStatement, ParseError> {
        let database = self.parse_ident()?;
        Ok(ShowRetentionPoliciesStatement { database })
    }

    fn parse_show_continuous_queries_statement(
        &mut self,
    ) -> Result<ShowContinuousQueriesStatement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwQueries {
            return Err(ParseError::new(tokstr(tok, &lit), &["QUERIES"], pos));
        }
        Ok(ShowContinuousQueriesStatement)
    }

    // -----------------------------------------------------------------------
    // CREATE statements
    // -----------------------------------------------------------------------

    /// Dispatch a CREATE statement. The CREATE token has already been
    /// consumed.
    fn parse_create_statement(&mut self) -> Result<Statement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok == Token::KwContinuous {
            return Ok(Statement::CreateContinuousQuery(
                self.parse_create_continuous_query_statement()?,
            ));
        } else if tok == Token::KwDatabase {
            return Ok(Statement::CreateDatabase(
                self.parse_create_database_statement()?,
            ));
        } else if tok == Token::KwUser {
            return Ok(Statement::CreateUser(self.parse_create_user_statement()?));
        } else if tok == Token::KwRetention {
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok != Token::KwPolicy {
                return Err(ParseError::new(tokstr(tok, &lit), &["POLICY"], pos));
            }
            return Ok(Statement::CreateRetentionPolicy(
                self.parse_create_retention_policy_statement()?,
            ));
        }

        Err(ParseError::new(
            tokstr(tok, &lit),
            &["CONTINUOUS", "DATABASE", "USER", "RETENTION"],
            pos,
        ))
    }

    fn parse_create_database_statement(&mut self) -> Result<CreateDatabaseStatement, ParseError> {
        let name = self.parse_ident()?;
        Ok(CreateDatabaseStatement { name })
    }

    /// Parse a create-retention-policy statement. The CREATE RETENTION
    /// POLICY tokens have already been consumed.
    fn parse_create_retention_policy_statement(
        &mut self,
    ) -> Result<CreateRetentionPolicyStatement, ParseError> {
        let name = self.parse_ident()?;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwOn {
            return Err(ParseError::new(tokstr(tok, &lit), &["ON"], pos));
        }
        let database = self.parse_ident()?;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwDuration {
            return Err(ParseError::new(tokstr(tok, &lit), &["DURATION"], pos));
        }
        let duration = self.parse_duration_val()?;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwReplication {
            return Err(ParseError::new(tokstr(tok, &lit), &["REPLICATION"], pos));
        }
        let replication = self.parse_int(1, i64::from(i32::MAX))? as u32;

        let (tok, _, _) = self.scan_ignore_whitespace();
        let default = tok == Token::KwDefault;
        if !default {
            self.unscan();
        }

        Ok(CreateRetentionPolicyStatement {
            name,
            database,
            duration,
            replication,
            default,
        })
    }

    fn parse_create_user_statement(&mut self) -> Result<CreateUserStatement, ParseError> {
        let name = self.parse_ident()?;

        self.parse_tokens(&[Token::KwWith, Token::KwPassword])?;
        let password = self.parse_string()?;

        // An optional second WITH clause may grant ALL PRIVILEGES; nothing
        // weaker can be granted at creation time.
        let (tok, _, _) = self.scan_ignore_whitespace();
        if tok != Token::KwWith {
            self.unscan();
            return Ok(CreateUserStatement {
                name,
                password,
                privilege: None,
            });
        }
        self.parse_tokens(&[Token::KwAll, Token::KwPrivileges])?;

        Ok(CreateUserStatement {
            name,
            password,
            privilege: Some(Privilege::All),
        })
    }

    /// Parse a create-continuous-query statement. The CREATE CONTINUOUS
    /// tokens have already been consumed.
    fn parse_create_continuous_query_statement(
        &mut self,
    ) -> Result<CreateContinuousQueryStatement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwQuery {
            return Err(ParseError::new(tokstr(tok, &lit), &["QUERY"], pos));
        }

        let name = self.parse_ident()?;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwOn {
            return Err(ParseError::new(tokstr(tok, &lit), &["ON"], pos));
        }
        let database = self.parse_ident()?;

        self.parse_tokens(&[Token::KwBegin, Token::KwSelect])?;
        let source = self.parse_select_statement(TargetRequirement::Required)?;

        // An aggregated query must be bucketed by a non-zero time interval.
        if source.is_aggregated() {
            let interval = source.group_by_interval();
            if !matches!(interval, Ok(d) if !d.is_zero()) {
                let (tok, pos, lit) = self.scan_ignore_whitespace();
                let mut err = ParseError::new(tokstr(tok, &lit), &["GROUP BY time(...)"], pos);
                if let Err(e) = interval {
                    err.expected.push(e.to_string());
                }
                return Err(err);
            }
        }

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwEnd {
            return Err(ParseError::new(tokstr(tok, &lit), &["END"], pos));
        }

        Ok(CreateContinuousQueryStatement {
            name,
            database,
            source,
        })
    }

    // -----------------------------------------------------------------------
    // DROP statements
    // -----------------------------------------------------------------------

    /// Dispatch a DROP statement. The DROP token has already been consumed.
    fn parse_drop_statement(&mut self) -> Result<Statement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok == Token::KwSeries {
            return Ok(Statement::DropSeries(self.parse_drop_series_statement()?));
        } else if tok == Token::KwMeasurement {
            return Ok(Statement::DropMeasurement(
                self.parse_drop_measurement_statement()?,
            ));
        } else if tok == Token::KwContinuous {
            return Ok(Statement::DropContinuousQuery(
                self.parse_drop_continuous_query_statement()?,
            ));
        } else if tok == Token::KwDatabase {
            return Ok(Statement::DropDatabase(
                self.parse_drop_database_statement()?,
            ));
        } else if tok == Token::KwRetention {
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok != Token::KwPolicy {
                return Err(ParseError::new(tokstr(tok, &lit), &["POLICY"], pos));
            }
            return Ok(Statement::DropRetentionPolicy(
                self.parse_drop_retention_policy_statement()?,
            ));
        } else if tok == Token::KwUser {
            return Ok(Statement::DropUser(self.parse_drop_user_statement()?));
        }

        Err(ParseError::new(
            tokstr(tok, &lit),
            &["SERIES", "CONTINUOUS", "MEASUREMENT"],
            pos,
        ))
    }

    /// Parse a drop-series statement. Without a FROM or WHERE clause the
    /// series must be named by id.
    fn parse_drop_series_statement(&mut self) -> Result<DropSeriesStatement, ParseError> {
        let source = self.parse_optional_source()?;
        let condition = self.parse_condition()?;

        let series_id = if source.is_none() && condition.is_none() {
            self.parse_uint32()?
        } else {
            0
        };

        Ok(DropSeriesStatement {
            source,
            condition,
            series_id,
        })
    }

    fn parse_drop_measurement_statement(&mut self) -> Result<DropMeasurementStatement, ParseError> {
        let name = self.parse_ident()?;
        Ok(DropMeasurementStatement { name })
    }

    fn parse_drop_continuous_query_statement(
        &mut self,
    ) -> Result<DropContinuousQueryStatement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwQuery {
            return Err(ParseError::new(tokstr(tok, &lit), &["QUERY"], pos));
        }
        let name = self.parse_ident()?;
        Ok(DropContinuousQueryStatement { name })
    }

    fn parse_drop_database_statement(&mut self) -> Result<DropDatabaseStatement, ParseError> {
        let name = self.parse_ident()?;
        Ok(DropDatabaseStatement { name })
    }

    fn parse_drop_retention_policy_statement(
        &mut self,
    ) -> Result<DropRetentionPolicyStatement, ParseError> {
        let name = self.parse_ident()?;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwOn {
            return Err(ParseError::new(tokstr(tok, &lit), &["ON"], pos));
        }
        let database = self.parse_ident()?;

        Ok(DropRetentionPolicyStatement { name, database })
    }

    fn parse_drop_user_statement(&mut self) -> Result<DropUserStatement, ParseError> {
        let name = self.parse_ident()?;
        Ok(DropUserStatement { name })
    }

    // -----------------------------------------------------------------------
    // ALTER statements
    // -----------------------------------------------------------------------

    /// Dispatch an ALTER statement. The ALTER token has already been
    /// consumed.
    fn parse_alter_statement(&mut self) -> Result<Statement, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok == Token::KwRetention {
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            if tok != Token::KwPolicy {
                return Err(ParseError::new(tokstr(tok, &lit), &["POLICY"], pos));
            }
            return Ok(Statement::AlterRetentionPolicy(
                self.parse_alter_retention_policy_statement()?,
            ));
        }

        Err(ParseError::new(tokstr(tok, &lit), &["RETENTION"], pos))
    }

    /// Parse an alter-retention-policy statement: up to three options in any
    /// order, at least one required.
    fn parse_alter_retention_policy_statement(
        &mut self,
    ) -> Result<AlterRetentionPolicyStatement, ParseError> {
        let name = self.parse_ident()?;

        let (tok, pos, lit) = self.scan_ignore_whitespace();
        if tok != Token::KwOn {
            return Err(ParseError::new(tokstr(tok, &lit), &["ON"], pos));
        }
        let database = self.parse_ident()?;

        let mut stmt = AlterRetentionPolicyStatement {
            name,
            database,
            duration: None,
            replication: None,
            default: false,
        };

        const MAX_NUM_OPTIONS: usize = 3;
        for i in 0..MAX_NUM_OPTIONS {
            let (tok, pos, lit) = self.scan_ignore_whitespace();
            match tok {
                Token::KwDuration => stmt.duration = Some(self.parse_duration_val()?),
                Token::KwReplication => {
                    stmt.replication = Some(self.parse_int(1, i64::from(i32::MAX))? as u32);
                }
                Token::KwDefault => stmt.default = true,
                _ => {
                    if i < 1 {
                        return Err(ParseError::new(
                            tokstr(tok, &lit),
                            &["DURATION", "RETENTION", "DEFAULT"],
                            pos,
                        ));
                    }
                    self.unscan();
                    break;
                }
            }
        }

        Ok(stmt)
    }

    // -----------------------------------------------------------------------
    // GRANT and REVOKE
    // -----------------------------------------------------------------------

    fn parse_grant_statement(&mut self) -> Result<GrantStatement, ParseError> {
        let privilege = self.parse_privilege()?;

        let mut on = None;
        let (mut tok, mut pos, mut lit) = self.scan_ignore_whitespace();
        if tok == Token::KwOn {
            on = Some(self.parse_ident()?);
            (tok, pos, lit) = self.scan_ignore_whitespace();
        } else if privilege != Privilege::All {
            // Only ALL PRIVILEGES may be granted cluster-wide; anything
            // weaker needs a database.
            return Err(ParseError::new(tokstr(tok, &lit), &["ON"], pos));
        }

        if tok != Token::KwTo {
            return Err(ParseError::new(tokstr(tok, &lit), &["TO"], pos));
        }
        let user = self.parse_ident()?;

        Ok(GrantStatement {
            privilege,
            on,
            user,
        })
    }

    fn parse_revoke_statement(&mut self) -> Result<RevokeStatement, ParseError> {
        let privilege = self.parse_privilege()?;

        let mut on = None;
        let (mut tok, mut pos, mut lit) = self.scan_ignore_whitespace();
        if tok == Token::KwOn {
            on = Some(self.parse_ident()?);
            (tok, pos, lit) = self.scan_ignore_whitespace();
        } else if privilege != Privilege::All {
            return Err(ParseError::new(tokstr(tok, &lit), &["ON"], pos));
        }

        if tok != Token::KwFrom {
            return Err(ParseError::new(tokstr(tok, &lit), &["FROM"], pos));
        }
        let user = self.parse_ident()?;

        Ok(RevokeStatement {
            privilege,
            on,
            user,
        })
    }

    fn parse_privilege(&mut self) -> Result<Privilege, ParseError> {
        let (tok, pos, lit) = self.scan_ignore_whitespace();
        match tok {
            Token::KwRead => Ok(Privilege::Read),
            Token::KwWrite => Ok(Privilege::Write),
            Token::KwAll => {
                // Consume the optional PRIVILEGES token.
                let (tok, _, _) = self.scan_ignore_whitespace();
                if tok != Token::KwPrivileges {
                    self.unscan();
                }
                Ok(Privilege::All)
            }
            _ => Err(ParseError::new(
                tokstr(tok, &lit),
                &["READ", "WRITE", "ALL [PRIVILEGES]"],
                pos,
            )),
        }
    }
}
