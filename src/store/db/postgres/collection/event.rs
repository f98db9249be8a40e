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
pub struct EventCollection {
    conn: DbConnection,
}

#[derive(Iden, Clone, Copy)]
#[iden = "events"]
enum CollectionIden {
    Table,

    Id,
    Sid,
    Nid,
    Name,
    Message,
    Timestamp,
}

const COLUMNS: [CollectionIden; 6] = [
    CollectionIden::Id,
    CollectionIden::Sid,
    CollectionIden::Nid,
    CollectionIden::Name,
    CollectionIden::Message,
    CollectionIden::Timestamp,
];

impl DbCollection for EventCollection {
    type Item = data::Event;

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
            .values([data.id.into(), data.sid.into(), data.nid.into(), data.name.into(), data.message.into(), data.timestamp.into()])
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
                (CollectionIden::Sid, model.sid.into()),
                (CollectionIden::Nid, model.nid.into()),
                (CollectionIden::Name, model.name.into()),
                (CollectionIden::Message, model.message.into()),
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

impl DbRow for data::Event {
    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized,
    {
        Ok(Self {
            id: row.get("id"),
            sid: row.get("sid"),
            nid: row.get("nid"),
            name: row.get("name"),
            message: row.get("message"),
            timestamp: row.get("timestamp"),
        })
    }
}

impl DbInit for EventCollection {
    fn init(&self) {
        let sql = [
            Table::create()
                .table(CollectionIden::Table)
                .if_not_exists()
                .col(ColumnDef::new(CollectionIden::Id).string().not_null().primary_key())
                .col(ColumnDef::new(CollectionIden::Sid).string().not_null())
                .col(ColumnDef::new(CollectionIden::Nid).string())
                .col(ColumnDef::new(CollectionIden::Name).string())
                .col(ColumnDef::new(CollectionIden::Message).string())
                .col(ColumnDef::new(CollectionIden::Timestamp).big_integer().default(0))
                .build(PostgresQueryBuilder),
            Index::create()
                .name("idx_events_sid")
                .if_not_exists()
                .table(CollectionIden::Table)
                .col(CollectionIden::Sid)
                .build(PostgresQueryBuilder),
        ];

        self.conn.batch_execute(&sql).unwrap();
    }
}

impl EventCollection {
    pub fn new(conn: &DbConnection) -> Self {
        Self {
            conn: conn.clone(),
        }
    }
}
