use sea_query::{ColumnDef, Expr as SeaExpr, Iden, Index, PostgresQueryBuilder, Query as SeaQuery, Table};
use sea_query_binder::SqlxBinder;
use sqlx::{Error as DbError, Row, postgres::PgRow};

use crate::{
    Result,
    store::{
        DbCollection, PageData, data, map_db_err,
        db::postgres::{DbInit, DbRow},
        query,
    },
};

use super::{DbConnection, delete_in, exists_in, find_in, query_page};

#[derive(Debug)]
pub struct SessionCollection {
    conn: DbConnection,
}

#[derive(Iden, Clone, Copy)]
#[iden = "sessions"]
enum CollectionIden {
    Table,

    Id,
    Fid,
    State,
    CurrentNid,
    StartTime,
    EndTime,
    Err,
    Timestamp,
}

const COLUMNS: [CollectionIden; 8] = [
    CollectionIden::Id,
    CollectionIden::Fid,
    CollectionIden::State,
    CollectionIden::CurrentNid,
    CollectionIden::StartTime,
    CollectionIden::EndTime,
    CollectionIden::Err,
    CollectionIden::Timestamp,
];

impl DbCollection for SessionCollection {
    type Item = data::Session;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        exists_in(&self.conn, CollectionIden::Table, id)
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        find_in(&self.conn, CollectionIden::Table, &COLUMNS[..], id)
    }

    fn query(
        &self,
        q: &query::Query,
    ) -> Result<PageData<Self::Item>> {
        query_page(&self.conn, CollectionIden::Table, &COLUMNS[..], q)
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let data = data.clone();
        let (sql, sql_values) = SeaQuery::insert()
            .into_table(CollectionIden::Table)
            .columns(COLUMNS)
            .values([
                data.id.into(),
                data.fid.into(),
                data.state.into(),
                data.current_nid.into(),
                data.start_time.into(),
                data.end_time.into(),
                data.err.into(),
                data.timestamp.into(),
            ])
            .map_err(map_db_err)?
            .build_sqlx(PostgresQueryBuilder);

        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let model = data.clone();
        let (sql, sql_values) = SeaQuery::update()
            .table(CollectionIden::Table)
            .values([
                (CollectionIden::Fid, model.fid.into()),
                (CollectionIden::State, model.state.into()),
                (CollectionIden::CurrentNid, model.current_nid.into()),
                (CollectionIden::StartTime, model.start_time.into()),
                (CollectionIden::EndTime, model.end_time.into()),
                (CollectionIden::Err, model.err.into()),
                (CollectionIden::Timestamp, model.timestamp.into()),
            ])
            .and_where(SeaExpr::col(CollectionIden::Id).eq(data.id.as_str()))
            .build_sqlx(PostgresQueryBuilder);

        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        delete_in(&self.conn, CollectionIden::Table, id)
    }
}

impl DbRow for data::Session {
    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized,
    {
        Ok(Self {
            id: row.get("id"),
            fid: row.get("fid"),
            state: row.get("state"),
            current_nid: row.get("current_nid"),
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            err: row.get("err"),
            timestamp: row.get("timestamp"),
        })
    }
}

impl DbInit for SessionCollection {
    fn init(&self) {
        let sql = [
            Table::create()
                .table(CollectionIden::Table)
                .if_not_exists()
                .col(ColumnDef::new(CollectionIden::Id).string().not_null().primary_key())
                .col(ColumnDef::new(CollectionIden::Fid).string().not_null())
                .col(ColumnDef::new(CollectionIden::State).string())
                .col(ColumnDef::new(CollectionIden::CurrentNid).string())
                .col(ColumnDef::new(CollectionIden::StartTime).big_integer().default(0))
                .col(ColumnDef::new(CollectionIden::EndTime).big_integer().default(0))
                .col(ColumnDef::new(CollectionIden::Err).string())
                .col(ColumnDef::new(CollectionIden::Timestamp).big_integer().default(0))
                .build(PostgresQueryBuilder),
            Index::create()
                .name("idx_sessions_fid")
                .if_not_exists()
                .table(CollectionIden::Table)
                .col(CollectionIden::Fid)
                .build(PostgresQueryBuilder),
        ];

        self.conn.batch_execute(&sql).unwrap();
    }
}

impl SessionCollection {
    pub fn new(conn: &DbConnection) -> Self {
        Self {
            conn: conn.clone(),
        }
    }
}
