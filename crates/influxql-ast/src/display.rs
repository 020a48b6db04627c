// Canonical query-text rendering via `fmt::Display`.
//
// Rendered text re-parses to a structurally equal tree. Identifiers are
// written bare when they can survive the trip and quoted otherwise.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::quote::{is_reserved_word, quote_ident, quote_string};
use crate::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn comma_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// An identifier needs quoting when it cannot re-lex as a single bare
/// identifier token: empty, leading digit, a character outside
/// `[A-Za-z0-9_]`, or a reserved word.
fn needs_quoting(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    let first = name.as_bytes()[0];
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return true;
    }
    if name
        .bytes()
        .any(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
    {
        return true;
    }
    is_reserved_word(name)
}

fn write_ident(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if needs_quoting(name) {
        f.write_str(&quote_ident(&[name]))
    } else {
        f.write_str(name)
    }
}

fn write_time(f: &mut fmt::Formatter<'_>, t: &DateTime<Utc>) -> fmt::Result {
    if t.timestamp_subsec_nanos() == 0 {
        write!(f, "'{}'", t.format("%Y-%m-%d %H:%M:%S"))
    } else {
        write!(f, "'{}'", t.format("%Y-%m-%d %H:%M:%S%.f"))
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary { lhs, op, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Self::Paren(inner) => write!(f, "({inner})"),
            Self::Call { name, args } => {
                write_ident(f, name)?;
                f.write_str("(")?;
                comma_list(f, args)?;
                f.write_str(")")
            }
            Self::VarRef(name) => write_ident(f, name),
            Self::Wildcard => f.write_str("*"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(&quote_string(s)),
            Self::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Self::Time(t) => write_time(f, t),
            Self::Duration(d) => write!(f, "{d}"),
            Self::Regex(re) => write!(f, "/{}/", re.as_str().replace('/', "\\/")),
        }
    }
}

// ---------------------------------------------------------------------------
// Clause components
// ---------------------------------------------------------------------------

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if !self.alias.is_empty() {
            f.write_str(" AS ")?;
            write_ident(f, &self.alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write_ident(f, &self.name)?;
            f.write_str(" ")?;
        }
        f.write_str(if self.ascending { "ASC" } else { "DESC" })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ident(f, &self.measurement)?;
        if let Some(ref db) = self.database {
            f.write_str(" ON ")?;
            write_ident(f, db)?;
        }
        Ok(())
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::All => "ALL PRIVILEGES",
        })
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ident(f, &self.name)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measurement(m) => write!(f, "{m}"),
            Self::Join(j) => {
                f.write_str("join(")?;
                comma_list(f, &j.measurements)?;
                f.write_str(")")
            }
            Self::Merge(m) => {
                f.write_str("merge(")?;
                comma_list(f, &m.measurements)?;
                f.write_str(")")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared clause tails
// ---------------------------------------------------------------------------

fn write_condition(f: &mut fmt::Formatter<'_>, condition: &Option<Expr>) -> fmt::Result {
    if let Some(cond) = condition {
        write!(f, " WHERE {cond}")?;
    }
    Ok(())
}

fn write_sort_limit(
    f: &mut fmt::Formatter<'_>,
    sort_fields: &[SortField],
    limit: u64,
    offset: u64,
) -> fmt::Result {
    if !sort_fields.is_empty() {
        f.write_str(" ORDER BY ")?;
        comma_list(f, sort_fields)?;
    }
    if limit > 0 {
        write!(f, " LIMIT {limit}")?;
    }
    if offset > 0 {
        write!(f, " OFFSET {offset}")?;
    }
    Ok(())
}

fn write_from(f: &mut fmt::Formatter<'_>, source: &Option<Source>) -> fmt::Result {
    if let Some(src) = source {
        write!(f, " FROM {src}")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        comma_list(f, &self.fields)?;
        if let Some(ref target) = self.target {
            write!(f, " INTO {target}")?;
        }
        write!(f, " FROM {}", self.source)?;
        write_condition(f, &self.condition)?;
        if !self.dimensions.is_empty() {
            f.write_str(" GROUP BY ")?;
            comma_list(f, &self.dimensions)?;
        }
        write_sort_limit(f, &self.sort_fields, self.limit, self.offset)
    }
}

impl fmt::Display for DeleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.source)?;
        write_condition(f, &self.condition)
    }
}

impl fmt::Display for ShowSeriesStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW SERIES")?;
        write_from(f, &self.source)?;
        write_condition(f, &self.condition)?;
        write_sort_limit(f, &self.sort_fields, self.limit, self.offset)
    }
}

impl fmt::Display for ShowMeasurementsStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW MEASUREMENTS")?;
        write_from(f, &self.source)?;
        write_condition(f, &self.condition)?;
        write_sort_limit(f, &self.sort_fields, self.limit, self.offset)
    }
}

impl fmt::Display for ShowTagKeysStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW TAG KEYS")?;
        write_from(f, &self.source)?;
        write_condition(f, &self.condition)?;
        write_sort_limit(f, &self.sort_fields, self.limit, self.offset)
    }
}

impl fmt::Display for ShowTagValuesStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW TAG VALUES")?;
        write_from(f, &self.source)?;
        match self.tag_keys.as_slice() {
            [key] => {
                f.write_str(" WITH KEY = ")?;
                write_ident(f, key)?;
            }
            keys => {
                f.write_str(" WITH KEY IN (")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_ident(f, key)?;
                }
                f.write_str(")")?;
            }
        }
        write_condition(f, &self.condition)?;
        write_sort_limit(f, &self.sort_fields, self.limit, self.offset)
    }
}

impl fmt::Display for ShowFieldKeysStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW FIELD KEYS")?;
        write_from(f, &self.source)?;
        write_condition(f, &self.condition)?;
        write_sort_limit(f, &self.sort_fields, self.limit, self.offset)
    }
}

impl fmt::Display for ShowRetentionPoliciesStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW RETENTION POLICIES ")?;
        write_ident(f, &self.database)
    }
}

impl fmt::Display for ShowDatabasesStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW DATABASES")
    }
}

impl fmt::Display for ShowUsersStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW USERS")
    }
}

impl fmt::Display for ShowContinuousQueriesStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SHOW CONTINUOUS QUERIES")
    }
}

impl fmt::Display for CreateDatabaseStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE DATABASE ")?;
        write_ident(f, &self.name)
    }
}

impl fmt::Display for DropDatabaseStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DROP DATABASE ")?;
        write_ident(f, &self.name)
    }
}

impl fmt::Display for CreateRetentionPolicyStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE RETENTION POLICY ")?;
        write_ident(f, &self.name)?;
        f.write_str(" ON ")?;
        write_ident(f, &self.database)?;
        write!(f, " DURATION {} REPLICATION {}", self.duration, self.replication)?;
        if self.default {
            f.write_str(" DEFAULT")?;
        }
        Ok(())
    }
}

impl fmt::Display for AlterRetentionPolicyStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ALTER RETENTION POLICY ")?;
        write_ident(f, &self.name)?;
        f.write_str(" ON ")?;
        write_ident(f, &self.database)?;
        if let Some(d) = self.duration {
            write!(f, " DURATION {d}")?;
        }
        if let Some(n) = self.replication {
            write!(f, " REPLICATION {n}")?;
        }
        if self.default {
            f.write_str(" DEFAULT")?;
        }
        Ok(())
    }
}

impl fmt::Display for DropRetentionPolicyStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DROP RETENTION POLICY ")?;
        write_ident(f, &self.name)?;
        f.write_str(" ON ")?;
        write_ident(f, &self.database)
    }
}

impl fmt::Display for CreateUserStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE USER ")?;
        write_ident(f, &self.name)?;
        write!(f, " WITH PASSWORD {}", quote_string(&self.password))?;
        if self.privilege == Some(Privilege::All) {
            f.write_str(" WITH ALL PRIVILEGES")?;
        }
        Ok(())
    }
}

impl fmt::Display for DropUserStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DROP USER ")?;
        write_ident(f, &self.name)
    }
}

impl fmt::Display for GrantStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GRANT {}", self.privilege)?;
        if let Some(ref on) = self.on {
            f.write_str(" ON ")?;
            write_ident(f, on)?;
        }
        f.write_str(" TO ")?;
        write_ident(f, &self.user)
    }
}

impl fmt::Display for RevokeStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REVOKE {}", self.privilege)?;
        if let Some(ref on) = self.on {
            f.write_str(" ON ")?;
            write_ident(f, on)?;
        }
        f.write_str(" FROM ")?;
        write_ident(f, &self.user)
    }
}

impl fmt::Display for CreateContinuousQueryStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE CONTINUOUS QUERY ")?;
        write_ident(f, &self.name)?;
        f.write_str(" ON ")?;
        write_ident(f, &self.database)?;
        write!(f, " BEGIN {} END", self.source)
    }
}

impl fmt::Display for DropContinuousQueryStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DROP CONTINUOUS QUERY ")?;
        write_ident(f, &self.name)
    }
}

impl fmt::Display for DropMeasurementStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DROP MEASUREMENT ")?;
        write_ident(f, &self.name)
    }
}

impl fmt::Display for DropSeriesStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DROP SERIES")?;
        write_from(f, &self.source)?;
        write_condition(f, &self.condition)?;
        if self.source.is_none() && self.condition.is_none() {
            write!(f, " {}", self.series_id)?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(s) => write!(f, "{s}"),
            Self::Delete(s) => write!(f, "{s}"),
            Self::ShowSeries(s) => write!(f, "{s}"),
            Self::ShowMeasurements(s) => write!(f, "{s}"),
            Self::ShowTagKeys(s) => write!(f, "{s}"),
            Self::ShowTagValues(s) => write!(f, "{s}"),
            Self::ShowFieldKeys(s) => write!(f, "{s}"),
            Self::ShowRetentionPolicies(s) => write!(f, "{s}"),
            Self::ShowDatabases(s) => write!(f, "{s}"),
            Self::ShowUsers(s) => write!(f, "{s}"),
            Self::ShowContinuousQueries(s) => write!(f, "{s}"),
            Self::CreateDatabase(s) => write!(f, "{s}"),
            Self::DropDatabase(s) => write!(f, "{s}"),
            Self::CreateRetentionPolicy(s) => write!(f, "{s}"),
            Self::AlterRetentionPolicy(s) => write!(f, "{s}"),
            Self::DropRetentionPolicy(s) => write!(f, "{s}"),
            Self::CreateUser(s) => write!(f, "{s}"),
            Self::DropUser(s) => write!(f, "{s}"),
            Self::Grant(s) => write!(f, "{s}"),
            Self::Revoke(s) => write!(f, "{s}"),
            Self::CreateContinuousQuery(s) => write!(f, "{s}"),
            Self::DropContinuousQuery(s) => write!(f, "{s}"),
            Self::DropMeasurement(s) => write!(f, "{s}"),
            Self::DropSeries(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use regex::Regex;

    fn var(name: &str) -> Expr {
        Expr::VarRef(name.to_owned())
    }

    #[test]
    fn test_expr_rendering() {
        let expr = Expr::Binary {
            lhs: Box::new(var("host")),
            op: BinaryOp::Eq,
            rhs: Box::new(Expr::String("serverA".to_owned())),
        };
        assert_eq!(expr.to_string(), "host = 'serverA'");

        let call = Expr::Call {
            name: "mean".to_owned(),
            args: vec![var("value")],
        };
        assert_eq!(call.to_string(), "mean(value)");

        assert_eq!(Expr::Paren(Box::new(var("x"))).to_string(), "(x)");
        assert_eq!(Expr::Wildcard.to_string(), "*");
        assert_eq!(Expr::Number(10.0).to_string(), "10");
        assert_eq!(Expr::Number(2.5).to_string(), "2.5");
        assert_eq!(Expr::Boolean(true).to_string(), "true");
        assert_eq!(Expr::Duration(Duration::minutes(10)).to_string(), "10m");
    }

    #[test]
    fn test_time_rendering() {
        let t = NaiveDate::from_ymd_opt(2015, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(Expr::Time(t).to_string(), "'2015-01-02 00:00:00'");

        let t = NaiveDate::from_ymd_opt(2015, 1, 2)
            .unwrap()
            .and_hms_micro_opt(12, 30, 45, 500_000)
            .unwrap()
            .and_utc();
        assert_eq!(Expr::Time(t).to_string(), "'2015-01-02 12:30:45.500'");
    }

    #[test]
    fn test_regex_rendering_reescapes_slash() {
        let re = Expr::Regex(RegexLiteral::new(Regex::new("a/b").unwrap()));
        assert_eq!(re.to_string(), r"/a\/b/");
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(
            Expr::VarRef("1h.cpu".to_owned()).to_string(),
            "\"1h.cpu\""
        );
        assert_eq!(Expr::VarRef("select".to_owned()).to_string(), "\"select\"");
        assert_eq!(Expr::VarRef("host".to_owned()).to_string(), "host");
    }

    #[test]
    fn test_select_statement_rendering() {
        let stmt = SelectStatement {
            fields: vec![Field {
                expr: var("value"),
                alias: String::new(),
            }],
            target: None,
            source: Source::Measurement(Measurement {
                name: "cpu".to_owned(),
            }),
            condition: Some(Expr::Binary {
                lhs: Box::new(var("host")),
                op: BinaryOp::Eq,
                rhs: Box::new(Expr::String("serverA".to_owned())),
            }),
            dimensions: Vec::new(),
            sort_fields: Vec::new(),
            limit: 10,
            offset: 20,
        };
        assert_eq!(
            stmt.to_string(),
            "SELECT value FROM cpu WHERE host = 'serverA' LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_sort_field_rendering() {
        let asc = SortField {
            name: String::new(),
            ascending: true,
        };
        assert_eq!(asc.to_string(), "ASC");

        let named = SortField {
            name: "host".to_owned(),
            ascending: false,
        };
        assert_eq!(named.to_string(), "host DESC");
    }

    #[test]
    fn test_show_tag_values_rendering() {
        let mut stmt = ShowTagValuesStatement {
            source: Some(Source::Measurement(Measurement {
                name: "cpu".to_owned(),
            })),
            tag_keys: vec!["region".to_owned(), "host".to_owned()],
            condition: None,
            sort_fields: Vec::new(),
            limit: 0,
            offset: 0,
        };
        assert_eq!(
            stmt.to_string(),
            "SHOW TAG VALUES FROM cpu WITH KEY IN (region, host)"
        );

        stmt.tag_keys = vec!["region".to_owned()];
        assert_eq!(
            stmt.to_string(),
            "SHOW TAG VALUES FROM cpu WITH KEY = region"
        );
    }

    #[test]
    fn test_retention_policy_rendering() {
        let stmt = CreateRetentionPolicyStatement {
            name: "1h.cpu".to_owned(),
            database: "mydb".to_owned(),
            duration: Duration::hours(1),
            replication: 2,
            default: true,
        };
        assert_eq!(
            stmt.to_string(),
            "CREATE RETENTION POLICY \"1h.cpu\" ON mydb DURATION 1h REPLICATION 2 DEFAULT"
        );
    }

    #[test]
    fn test_grant_rendering() {
        let cluster = GrantStatement {
            privilege: Privilege::All,
            on: None,
            user: "jdoe".to_owned(),
        };
        assert_eq!(cluster.to_string(), "GRANT ALL PRIVILEGES TO jdoe");

        let scoped = GrantStatement {
            privilege: Privilege::Read,
            on: Some("mydb".to_owned()),
            user: "jdoe".to_owned(),
        };
        assert_eq!(scoped.to_string(), "GRANT READ ON mydb TO jdoe");
    }

    #[test]
    fn test_drop_series_rendering() {
        let by_id = DropSeriesStatement {
            source: None,
            condition: None,
            series_id: 42,
        };
        assert_eq!(by_id.to_string(), "DROP SERIES 42");

        let by_source = DropSeriesStatement {
            source: Some(Source::Measurement(Measurement {
                name: "cpu".to_owned(),
            })),
            condition: None,
            series_id: 0,
        };
        assert_eq!(by_source.to_string(), "DROP SERIES FROM cpu");
    }

    #[test]
    fn test_join_merge_rendering() {
        let join = Source::Join(Join {
            measurements: vec![
                Measurement {
                    name: "cpu".to_owned(),
                },
                Measurement {
                    name: "mem".to_owned(),
                },
            ],
        });
        assert_eq!(join.to_string(), "join(cpu, mem)");
    }

    #[test]
    fn test_query_joins_statements() {
        let q = Query {
            statements: vec![
                Statement::ShowDatabases(ShowDatabasesStatement),
                Statement::ShowUsers(ShowUsersStatement),
            ],
        };
        assert_eq!(q.to_string(), "SHOW DATABASES; SHOW USERS");
    }
}
