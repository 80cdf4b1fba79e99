//! SQL text helpers in the HANA dialect.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use crate::model::relation::quote_identifier;
use crate::model::Relation;
use crate::{Error, Result};

/// Incremental strategies the adapter can materialize.
pub const INCREMENTAL_STRATEGIES: &[&str] = &["append", "merge", "delete+insert", "microbatch"];

pub fn date_function() -> &'static str {
    "CURRENT_DATE"
}

pub fn quote(identifier: &str) -> String {
    quote_identifier(identifier)
}

/// `expr + n interval` using HANA's ADD_* functions.
pub fn timestamp_add_sql(add_to: &str, number: i64, interval: &str) -> Result<String> {
    match interval.to_ascii_lowercase().as_str() {
        "hour" => Ok(format!("ADD_SECONDS({add_to}, {number} * 3600)")),
        "minute" => Ok(format!("ADD_SECONDS({add_to}, {number} * 60)")),
        "second" => Ok(format!("ADD_SECONDS({add_to}, {number})")),
        "day" => Ok(format!("ADD_DAYS({add_to}, {number})")),
        "year" => Ok(format!("ADD_YEARS({add_to}, {number})")),
        other => Err(Error::Configuration(format!("Unsupported interval: {other}"))),
    }
}

/// Query returning one row: the row-count difference between two
/// relations and the number of rows present in only one of them.
pub fn rows_different_sql(
    relation_a: &Relation,
    relation_b: &Relation,
    column_names: &[String],
    except_operator: &str,
) -> String {
    let mut names: Vec<String> = column_names.iter().map(|c| quote(c)).collect();
    names.sort();
    let columns = names.join(", ");
    let a = relation_a.render();
    let b = relation_b.render();
    let except_op = except_operator;

    format!(
        "with diff_count as (
    SELECT
        1 as id,
        COUNT(*) as num_missing FROM (
            (SELECT {columns} FROM {a} {except_op}
            SELECT {columns} FROM {b})
            UNION ALL
            (SELECT {columns} FROM {b} {except_op}
            SELECT {columns} FROM {a})
        ) as a
), table_a as (
    SELECT COUNT(*) as num_rows FROM {a}
), table_b as (
    SELECT COUNT(*) as num_rows FROM {b}
), row_count_diff as (
    select
        1 as id,
        table_a.num_rows - table_b.num_rows as difference
    from table_a, table_b
)
select
    row_count_diff.difference as row_count_difference,
    diff_count.num_missing as num_mismatched
from row_count_diff
join diff_count
    on row_count_diff.id = diff_count.id"
    )
}

/// Quote a seed column when the `quote_columns` config asks for it.
/// Absent or null config means unquoted.
pub fn quote_seed_column(column: &str, quote_config: Option<&Json>) -> Result<String> {
    match quote_config {
        None | Some(Json::Null) | Some(Json::Bool(false)) => Ok(column.to_string()),
        Some(Json::Bool(true)) => Ok(quote(column)),
        Some(other) => Err(Error::Configuration(format!(
            "The seed configuration value of \"quote_columns\" has an invalid type: {other}"
        ))),
    }
}

/// Fold `(grantee, privilege)` rows from `SHOW GRANTS` into
/// privilege → grantees.
pub fn standardize_grants<'a, I>(rows: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut grants: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (grantee, privilege) in rows {
        grants.entry(privilege.to_string()).or_default().push(grantee.to_string());
    }
    grants
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp_add() {
        assert_eq!(timestamp_add_sql("ts", 2, "hour").unwrap(), "ADD_SECONDS(ts, 2 * 3600)");
        assert_eq!(timestamp_add_sql("ts", 1, "DAY").unwrap(), "ADD_DAYS(ts, 1)");
        assert!(timestamp_add_sql("ts", 1, "fortnight").unwrap_err().to_string().contains("fortnight"));
    }

    #[test]
    fn test_rows_different_sql_sorts_quoted_columns() {
        let sql = rows_different_sql(
            &Relation::new("S", "A"),
            &Relation::new("S", "B"),
            &["b".into(), "a".into()],
            "EXCEPT",
        );
        assert!(sql.contains("SELECT \"a\", \"b\" FROM S.A EXCEPT"));
        assert!(sql.contains("SELECT COUNT(*) as num_rows FROM S.B"));
    }

    #[test]
    fn test_quote_seed_column() {
        assert_eq!(quote_seed_column("c", None).unwrap(), "c");
        assert_eq!(quote_seed_column("c", Some(&json!(true))).unwrap(), "\"c\"");
        assert!(quote_seed_column("c", Some(&json!("yes"))).is_err());
    }

    #[test]
    fn test_standardize_grants() {
        let grants = standardize_grants([("ALICE", "SELECT"), ("BOB", "SELECT"), ("ALICE", "INSERT")]);
        assert_eq!(grants["SELECT"], vec!["ALICE", "BOB"]);
        assert_eq!(grants["INSERT"], vec!["ALICE"]);
    }
}
