use std::{sync::Arc, time::Duration};

use sqlx::{
    Database, Error, IntoArguments, PgPool, Postgres,
    postgres::{PgPoolOptions, PgRow},
};
use tokio::{
    runtime::{Handle, Runtime},
    task::block_in_place,
};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 200;

/// Synchronous facade over the async sqlx pool.
///
/// The store traits are synchronous; this client drives queries to
/// completion on the engine's runtime, switching to `block_in_place` when
/// the caller is already on a runtime thread.
#[derive(Debug, Clone)]
pub struct SynClient {
    pool: PgPool,

    runtime: Arc<Runtime>,
}

impl SynClient {
    pub fn connect(
        db_url: &str,
        runtime: Arc<Runtime>,
    ) -> Self {
        let connect = PgPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT).max_connections(MAX_CONNECTIONS).connect(db_url);

        #[allow(clippy::expect_fun_call)]
        let pool = block_on(&runtime, connect).expect(&format!("failed to connect to DB {}", db_url));

        Self {
            pool,
            runtime,
        }
    }

    pub fn query_one<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<PgRow, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async {
            let mut conn = self.pool.acquire().await?;

            sqlx::query_with(sql, params).fetch_one(&mut *conn).await
        })
    }

    pub fn query<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<Vec<PgRow>, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async {
            let mut conn = self.pool.acquire().await?;

            sqlx::query_with(sql, params).fetch_all(&mut *conn).await
        })
    }

    pub fn execute<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> Result<<Postgres as Database>::QueryResult, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async {
            let mut conn = self.pool.acquire().await?;

            sqlx::query_with(sql, params).execute(&mut *conn).await
        })
    }

    pub fn batch_execute(
        &self,
        sqls: &[String],
    ) -> Result<(), Error> {
        block_on(&self.runtime, async {
            let mut tx = self.pool.begin().await?;

            for sql in sqls {
                sqlx::query(sql).execute(&mut *tx).await?;
            }
            tx.commit().await
        })
    }
}

/// Drive `future` to completion on `runtime`, regardless of whether the
/// calling thread already lives inside a runtime.
fn block_on<F: Future>(
    runtime: &Arc<Runtime>,
    future: F,
) -> F::Output {
    if Handle::try_current().is_ok() {
        block_in_place(|| runtime.block_on(future))
    } else {
        runtime.block_on(future)
    }
}
