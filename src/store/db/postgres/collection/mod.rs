//! Per-collection SQL implementations plus the query plumbing they share.

mod event;
mod flow;
mod log;
mod session;

use std::sync::Arc;

use sea_query::{
    Alias as SeaAlias, Condition as SeaCondition, Expr as SeaExpr, Func as SeaFunc, IntoIden, Order as SeaOrder, PostgresQueryBuilder,
    Query as SeaQuery, Value as SeaValue,
};
use sea_query_binder::SqlxBinder;
use serde_json::Value as JsonValue;
use sqlx::Row;

use crate::{
    Result,
    store::{
        PageData, map_db_err,
        query::{Cond, Query},
    },
};

use super::{DbRow, synclient::SynClient};

pub use event::EventCollection;
pub use flow::FlowCollection;
pub use log::LogCollection;
pub use session::SessionCollection;

pub(crate) type DbConnection = Arc<SynClient>;

/// Translate the backend-neutral query filter into a sea-query condition.
pub(crate) fn into_query(q: &Query) -> SeaCondition {
    let mut condition = SeaCondition::all();
    for cond in q.conds() {
        condition = match cond {
            Cond::Eq(key, value) => condition.add(SeaExpr::col(SeaAlias::new(key)).eq(json_to_sea(value))),
            Cond::Ne(key, value) => condition.add(SeaExpr::col(SeaAlias::new(key)).ne(json_to_sea(value))),
        };
    }
    condition
}

fn json_to_sea(value: &JsonValue) -> SeaValue {
    match value {
        JsonValue::String(s) => s.clone().into(),
        JsonValue::Bool(b) => (*b).into(),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else {
                n.as_f64().unwrap_or(0.0).into()
            }
        }
        JsonValue::Null => SeaValue::String(None),
        other => other.to_string().into(),
    }
}

pub(crate) fn exists_in<I>(
    conn: &DbConnection,
    table: I,
    id: &str,
) -> Result<bool>
where
    I: IntoIden + Copy + 'static,
{
    let (sql, values) = SeaQuery::select()
        .from(table)
        .expr(SeaFunc::count(SeaExpr::col(SeaAlias::new("id"))))
        .and_where(SeaExpr::col(SeaAlias::new("id")).eq(id))
        .build_sqlx(PostgresQueryBuilder);

    let count = conn.query_one(sql.as_str(), values).map(|row| row.get::<i64, usize>(0)).map_err(map_db_err)?;

    Ok(count > 0)
}

pub(crate) fn find_in<T, I>(
    conn: &DbConnection,
    table: I,
    columns: &[I],
    id: &str,
) -> Result<T>
where
    T: DbRow,
    I: IntoIden + Copy + 'static,
{
    let (sql, values) = SeaQuery::select()
        .from(table)
        .columns(columns.to_vec())
        .and_where(SeaExpr::col(SeaAlias::new("id")).eq(id))
        .build_sqlx(PostgresQueryBuilder);

    conn.query_one(&sql, values).map(|row| T::from_row(&row).map_err(map_db_err)).map_err(map_db_err)?
}

pub(crate) fn query_page<T, I>(
    conn: &DbConnection,
    table: I,
    columns: &[I],
    q: &Query,
) -> Result<PageData<T>>
where
    T: DbRow,
    I: IntoIden + Copy + 'static,
{
    let filter = into_query(q);

    let mut count_query = SeaQuery::select();
    count_query.from(table).expr(SeaFunc::count(SeaExpr::col(SeaAlias::new("id"))));

    let mut query = SeaQuery::select();
    query.columns(columns.to_vec()).from(table);

    if !filter.is_empty() {
        count_query.cond_where(filter.clone());
        query.cond_where(filter);
    }

    for (order, rev) in q.order_by().iter() {
        query.order_by(
            SeaAlias::new(order),
            if *rev {
                SeaOrder::Desc
            } else {
                SeaOrder::Asc
            },
        );
    }

    let (sql, values) = query.limit(q.limit() as u64).offset(q.offset() as u64).build_sqlx(PostgresQueryBuilder);
    let (count_sql, count_values) = count_query.build_sqlx(PostgresQueryBuilder);

    let count = conn.query_one(count_sql.as_str(), count_values).map_err(map_db_err)?.get::<i64, usize>(0) as usize;
    let rows = conn
        .query(&sql, values)
        .map_err(map_db_err)?
        .iter()
        .map(|row| T::from_row(row))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_db_err)?;

    Ok(PageData {
        count,
        page_size: q.limit(),
        page_num: q.offset() / q.limit() + 1,
        page_count: count.div_ceil(q.limit()),
        rows,
    })
}

pub(crate) fn delete_in<I>(
    conn: &DbConnection,
    table: I,
    id: &str,
) -> Result<bool>
where
    I: IntoIden + Copy + 'static,
{
    let (sql, values) =
        SeaQuery::delete().from_table(table).and_where(SeaExpr::col(SeaAlias::new("id")).eq(id)).build_sqlx(PostgresQueryBuilder);

    let result = conn.execute(sql.as_str(), values).map_err(map_db_err)?;
    Ok(result.rows_affected() > 0)
}
