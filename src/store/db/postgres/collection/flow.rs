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
pub struct FlowCollection {
    conn: DbConnection,
}

#[derive(Iden, Clone, Copy)]
#[iden = "flows"]
enum CollectionIden {
    Table,

    Id,
    TrainerId,
    Version,
    Name,
    Data,
    IsPublished,
    PublishedAt,
    PublishedBy,
    Revision,
    CreateTime,
    UpdateTime,
}

const COLUMNS: [CollectionIden; 11] = [
    CollectionIden::Id,
    CollectionIden::TrainerId,
    CollectionIden::Version,
    CollectionIden::Name,
    CollectionIden::Data,
    CollectionIden::IsPublished,
    CollectionIden::PublishedAt,
    CollectionIden::PublishedBy,
    CollectionIden::Revision,
    CollectionIden::CreateTime,
    CollectionIden::UpdateTime,
];

impl DbCollection for FlowCollection {
    type Item = data::Flow;

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
                data.trainer_id.into(),
                data.version.into(),
                data.name.into(),
                data.data.into(),
                data.is_published.into(),
                data.published_at.into(),
                data.published_by.into(),
                data.revision.into(),
                data.create_time.into(),
                data.update_time.into(),
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
            .values(Self::update_values(model))
            .and_where(SeaExpr::col(CollectionIden::Id).eq(data.id.as_str()))
            .build_sqlx(PostgresQueryBuilder);

        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Compare-and-swap update: only writes when the stored revision still
    /// equals `expected`, so concurrent publishes cannot both win.
    fn update_checked(
        &self,
        data: &Self::Item,
        expected: i64,
    ) -> Result<bool> {
        let model = data.clone();
        let (sql, sql_values) = SeaQuery::update()
            .table(CollectionIden::Table)
            .values(Self::update_values(model))
            .and_where(SeaExpr::col(CollectionIden::Id).eq(data.id.as_str()))
            .and_where(SeaExpr::col(CollectionIden::Revision).eq(expected))
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

impl DbRow for data::Flow {
    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized,
    {
        Ok(Self {
            id: row.get("id"),
            trainer_id: row.get("trainer_id"),
            version: row.get("version"),
            name: row.get("name"),
            data: row.get("data"),
            is_published: row.get("is_published"),
            published_at: row.get("published_at"),
            published_by: row.get("published_by"),
            revision: row.get("revision"),
            create_time: row.get("create_time"),
            update_time: row.get("update_time"),
        })
    }
}

impl DbInit for FlowCollection {
    fn init(&self) {
        let sql = [
            Table::create()
                .table(CollectionIden::Table)
                .if_not_exists()
                .col(ColumnDef::new(CollectionIden::Id).string().not_null().primary_key())
                .col(ColumnDef::new(CollectionIden::TrainerId).string().not_null())
                .col(ColumnDef::new(CollectionIden::Version).string())
                .col(ColumnDef::new(CollectionIden::Name).string())
                .col(ColumnDef::new(CollectionIden::Data).string().not_null())
                .col(ColumnDef::new(CollectionIden::IsPublished).boolean().not_null().default(false))
                .col(ColumnDef::new(CollectionIden::PublishedAt).big_integer())
                .col(ColumnDef::new(CollectionIden::PublishedBy).string())
                .col(ColumnDef::new(CollectionIden::Revision).big_integer().not_null().default(0))
                .col(ColumnDef::new(CollectionIden::CreateTime).big_integer().default(0))
                .col(ColumnDef::new(CollectionIden::UpdateTime).big_integer().default(0))
                .build(PostgresQueryBuilder),
            Index::create()
                .name("idx_flows_trainer_id")
                .if_not_exists()
                .table(CollectionIden::Table)
                .col(CollectionIden::TrainerId)
                .build(PostgresQueryBuilder),
        ];

        self.conn.batch_execute(&sql).unwrap();
    }
}

impl FlowCollection {
    pub fn new(conn: &DbConnection) -> Self {
        Self {
            conn: conn.clone(),
        }
    }

    fn update_values(model: data::Flow) -> [(CollectionIden, sea_query::SimpleExpr); 10] {
        [
            (CollectionIden::TrainerId, model.trainer_id.into()),
            (CollectionIden::Version, model.version.into()),
            (CollectionIden::Name, model.name.into()),
            (CollectionIden::Data, model.data.into()),
            (CollectionIden::IsPublished, model.is_published.into()),
            (CollectionIden::PublishedAt, model.published_at.into()),
            (CollectionIden::PublishedBy, model.published_by.into()),
            (CollectionIden::Revision, model.revision.into()),
            (CollectionIden::CreateTime, model.create_time.into()),
            (CollectionIden::UpdateTime, model.update_time.into()),
        ]
    }
}
