//! Owned SQL text with deferred parameter numbering. Text and values stay
//! apart until `build()` assigns `$n` positions, so one condition chain can
//! be spliced into several statements.
//!
//! `sqlx::QueryBuilder` numbers each bind as it is pushed and keeps its
//! arguments encoded and private. The statistics templates embed one
//! condition chain into a totals query and a shares query, each with its own
//! leading parameters, and tests compare the composed text and values. Both
//! need the fragment to be cloneable and readable, with numbering decided
//! only when the final statement is assembled.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, Postgres};

/// A value bound as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Text(String),
    BigInt(i64),
    Float(f64),
}

impl From<&str> for SqlArg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlArg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlArg {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<f64> for SqlArg {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Sql(String),
    Arg(SqlArg),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pieces: Vec<Piece>,
}

impl SqlFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sql: impl AsRef<str>) -> &mut Self {
        let sql = sql.as_ref();
        if sql.is_empty() {
            return self;
        }
        match self.pieces.last_mut() {
            Some(Piece::Sql(text)) => text.push_str(sql),
            _ => self.pieces.push(Piece::Sql(sql.to_string())),
        }
        self
    }

    pub fn push_bind(&mut self, arg: impl Into<SqlArg>) -> &mut Self {
        self.pieces.push(Piece::Arg(arg.into()));
        self
    }

    /// Splice another fragment in, keeping its values in order.
    pub fn append(&mut self, other: &SqlFragment) -> &mut Self {
        for piece in &other.pieces {
            match piece {
                Piece::Sql(text) => {
                    self.push(text);
                }
                Piece::Arg(arg) => {
                    self.push_bind(arg.clone());
                }
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn build(&self) -> BoundQuery {
        let mut sql = String::new();
        let mut args = Vec::new();
        for piece in &self.pieces {
            match piece {
                Piece::Sql(text) => sql.push_str(text),
                Piece::Arg(arg) => {
                    args.push(arg.clone());
                    sql.push('$');
                    sql.push_str(&args.len().to_string());
                }
            }
        }
        BoundQuery { sql, args }
    }
}

/// Finished statement: SQL text with `$n` placeholders and its values in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub args: Vec<SqlArg>,
}

impl BoundQuery {
    pub fn query(&self) -> Query<'_, Postgres, PgArguments> {
        self.args
            .iter()
            .fold(sqlx::query(&self.sql), |query, arg| match arg {
                SqlArg::Text(v) => query.bind(v.as_str()),
                SqlArg::BigInt(v) => query.bind(*v),
                SqlArg::Float(v) => query.bind(*v),
            })
    }

    pub fn query_as<O>(&self) -> QueryAs<'_, Postgres, O, PgArguments>
    where
        O: for<'r> FromRow<'r, PgRow>,
    {
        self.args
            .iter()
            .fold(sqlx::query_as::<_, O>(&self.sql), |query, arg| match arg {
                SqlArg::Text(v) => query.bind(v.as_str()),
                SqlArg::BigInt(v) => query.bind(*v),
                SqlArg::Float(v) => query.bind(*v),
            })
    }
}
