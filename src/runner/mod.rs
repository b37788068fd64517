//! The differential-driver boundary: run one statement on two databases and
//! compare what comes back.
//!
//! The generator never returns errors; everything here reports divergences
//! between the two executors as structured [`DiffError`] values.

pub mod digest;

pub use digest::{ResultSet, SqlOutcome};

use thiserror::Error;
use tracing::{error, info};

/// One side of the differential pair. Implementations wrap a database
/// connection; tests use canned in-memory executors.
pub trait SqlExecutor {
    fn execute(&mut self, sql: &str) -> Result<SqlOutcome, ExecError>;
}

/// An execution error as reported by a database, carried as message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ExecError(pub String);

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("admin check failed: {0}")]
    AdminCheck(ExecError),
    #[error("errors mismatch: {left:?} <> {right:?} {sql:?}")]
    ErrorMismatch {
        left: Option<ExecError>,
        right: Option<ExecError>,
        sql: String,
    },
    #[error("result digests mismatch: {left} != {right} {sql:?}\n{left_rows}\n{right_rows}")]
    DigestMismatch {
        left: String,
        right: String,
        sql: String,
        left_rows: String,
        right_rows: String,
    },
    #[error("rows affected mismatch: {left} != {right} {sql:?}")]
    RowsAffectedMismatch { left: u64, right: u64, sql: String },
    #[error("result kinds mismatch: {sql:?}")]
    KindMismatch { sql: String },
}

/// Version-skew messages that make a one-sided error benign; any match
/// declares the comparison successful.
const IGNORE_ERR_MSGS: &[&str] = &[
    "with index covered now",
    "Unknown system variable",
    "Split table region lower value count should be",
    "Column count doesn't match value count",
    "for column '_tidb_rowid'",
    "Unknown column '_tidb_rowid'",
];

/// Run `sql` on both databases and compare digests with row order ignored.
pub fn run_interact_test<A: SqlExecutor, B: SqlExecutor>(
    db1: &mut A,
    db2: &mut B,
    sql: &str,
) -> Result<(), DiffError> {
    interact(db1, db2, sql, true)
}

/// Like [`run_interact_test`] but order-sensitive, for statements whose
/// `order by` must be preserved.
pub fn run_interact_test_no_sort<A: SqlExecutor, B: SqlExecutor>(
    db1: &mut A,
    db2: &mut B,
    sql: &str,
) -> Result<(), DiffError> {
    interact(db1, db2, sql, false)
}

fn interact<A: SqlExecutor, B: SqlExecutor>(
    db1: &mut A,
    db2: &mut B,
    sql: &str,
    sort_result: bool,
) -> Result<(), DiffError> {
    // The generator may emit an empty statement (admin check under TiFlash);
    // there is nothing to run.
    if sql.is_empty() {
        return Ok(());
    }
    info!(%sql, "executing on both databases");
    let lower = sql.to_lowercase();
    let is_admin_check = lower.contains("admin") && lower.contains("check");

    let res1 = db1.execute(sql);
    let res2 = db2.execute(sql);

    if is_admin_check {
        for res in [&res1, &res2] {
            if let Err(err) = res {
                if err.0.contains("t exist") {
                    // Table-not-exist noise from a racing drop; suppress.
                    return Ok(());
                }
                return Err(DiffError::AdminCheck(err.clone()));
            }
        }
    }

    if !validate_errs(res1.as_ref().err(), res2.as_ref().err()) {
        error!(%sql, "error sets diverged");
        return Err(DiffError::ErrorMismatch {
            left: res1.err(),
            right: res2.err(),
            sql: sql.to_string(),
        });
    }
    let (Ok(out1), Ok(out2)) = (res1, res2) else {
        // Both errored with a matching (or allowlisted) outcome.
        return Ok(());
    };

    match (out1, out2) {
        (SqlOutcome::Rows(rs1), SqlOutcome::Rows(rs2)) => {
            let (h1, h2) = if sort_result {
                (rs1.ordered_digest(), rs2.ordered_digest())
            } else {
                (rs1.data_digest(), rs2.data_digest())
            };
            if h1 != h2 {
                error!(%sql, left = %h1, right = %h2, "result digests diverged");
                return Err(DiffError::DigestMismatch {
                    left: h1,
                    right: h2,
                    sql: sql.to_string(),
                    left_rows: rs1.pretty_print(),
                    right_rows: rs2.pretty_print(),
                });
            }
            Ok(())
        }
        (
            SqlOutcome::Exec {
                rows_affected: ra1,
            },
            SqlOutcome::Exec {
                rows_affected: ra2,
            },
        ) => {
            if ra1 != ra2 {
                error!(%sql, left = ra1, right = ra2, "rows affected diverged");
                return Err(DiffError::RowsAffectedMismatch {
                    left: ra1,
                    right: ra2,
                    sql: sql.to_string(),
                });
            }
            Ok(())
        }
        _ => Err(DiffError::KindMismatch {
            sql: sql.to_string(),
        }),
    }
}

/// Error sets match when both sides errored, neither did, or exactly one
/// side hit an allowlisted version-skew message.
pub fn validate_errs(err1: Option<&ExecError>, err2: Option<&ExecError>) -> bool {
    for msg in IGNORE_ERR_MSGS {
        if one_of_contains(err1, err2, msg) {
            return true;
        }
    }
    err1.is_some() == err2.is_some()
}

fn one_of_contains(err1: Option<&ExecError>, err2: Option<&ExecError>, msg: &str) -> bool {
    let left = err1.is_some_and(|e| e.0.contains(msg)) && err2.is_none();
    let right = err2.is_some_and(|e| e.0.contains(msg)) && err1.is_none();
    left || right
}
