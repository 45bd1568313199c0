use anyhow::Context;
use async_trait::async_trait;
use common::{DatasetKind, IngestError, NormalizedRecord, RecordKey, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Acquire, Postgres, Transaction};

use super::{InsertOutcome, RecordStore, StoreBatch};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Postgres-backed store; one transaction per batch, one savepoint per insert.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(db_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Creates the per-kind tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to create schema")?;
        Ok(())
    }
}

fn store_err(err: sqlx::Error) -> IngestError {
    IngestError::Store(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn exists_sql(kind: DatasetKind) -> &'static str {
    match kind {
        DatasetKind::Production => {
            "SELECT EXISTS(SELECT 1 FROM producao WHERE id_original = $1 AND ano = $2)"
        }
        DatasetKind::Commercialization => {
            "SELECT EXISTS(SELECT 1 FROM comercializacao WHERE id_original = $1 AND ano = $2)"
        }
        DatasetKind::Processing => {
            "SELECT EXISTS(SELECT 1 FROM processamento WHERE id_original = $1 AND ano = $2)"
        }
        DatasetKind::Import => "SELECT EXISTS(SELECT 1 FROM importacao WHERE pais = $1 AND ano = $2)",
        DatasetKind::Export => "SELECT EXISTS(SELECT 1 FROM exportacao WHERE pais = $1 AND ano = $2)",
    }
}

fn insert_sql(kind: DatasetKind) -> &'static str {
    match kind {
        DatasetKind::Production => {
            "INSERT INTO producao (id_original, control, produto, ano, producao_toneladas) VALUES ($1, $2, $3, $4, $5)"
        }
        DatasetKind::Commercialization => {
            "INSERT INTO comercializacao (id_original, control, produto, ano, volume_comercializado) VALUES ($1, $2, $3, $4, $5)"
        }
        DatasetKind::Processing => {
            "INSERT INTO processamento (id_original, control, cultivar, ano, volume_processado_litros) VALUES ($1, $2, $3, $4, $5)"
        }
        DatasetKind::Import => {
            "INSERT INTO importacao (pais, ano, quantidade, valor_usd) VALUES ($1, $2, $3, $4)"
        }
        DatasetKind::Export => {
            "INSERT INTO exportacao (pais, ano, quantidade, valor_usd) VALUES ($1, $2, $3, $4)"
        }
    }
}

fn shape_mismatch(kind: DatasetKind) -> IngestError {
    IngestError::Store(format!("record shape does not match the {} table", kind))
}

struct PgBatch {
    kind: DatasetKind,
    tx: Option<Transaction<'static, Postgres>>,
    /// Savepoints released so far; all of them become visible on commit.
    inserted: usize,
}

impl PgBatch {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| IngestError::Store("batch already committed".to_string()))
    }
}

#[async_trait]
impl StoreBatch for PgBatch {
    async fn exists(&mut self, key: &RecordKey) -> Result<bool> {
        let kind = self.kind;
        let sql = exists_sql(kind);
        let query = match (kind, key) {
            (
                DatasetKind::Production | DatasetKind::Commercialization | DatasetKind::Processing,
                RecordKey::Item { original_id, year },
            ) => sqlx::query_scalar::<Postgres, bool>(sql).bind(*original_id).bind(*year),
            (DatasetKind::Import | DatasetKind::Export, RecordKey::Country { country, year }) => {
                sqlx::query_scalar::<Postgres, bool>(sql).bind(country.clone()).bind(*year)
            }
            _ => return Err(shape_mismatch(kind)),
        };

        let tx = self.tx()?;
        query.fetch_one(&mut **tx).await.map_err(store_err)
    }

    async fn insert(&mut self, record: &NormalizedRecord) -> Result<InsertOutcome> {
        let kind = self.kind;
        let sql = insert_sql(kind);
        let query = match (kind, record) {
            (DatasetKind::Production | DatasetKind::Commercialization, NormalizedRecord::Product(r)) => {
                sqlx::query::<Postgres>(sql)
                    .bind(r.id)
                    .bind(r.control.clone())
                    .bind(r.produto.clone())
                    .bind(r.ano)
                    .bind(r.quantidade)
            }
            (DatasetKind::Processing, NormalizedRecord::Cultivar(r)) => sqlx::query::<Postgres>(sql)
                .bind(r.id)
                .bind(r.control.clone())
                .bind(r.cultivar.clone())
                .bind(r.ano)
                .bind(r.quantidade),
            (DatasetKind::Import | DatasetKind::Export, NormalizedRecord::Trade(r)) => {
                sqlx::query::<Postgres>(sql)
                    .bind(r.pais.clone())
                    .bind(r.ano)
                    .bind(r.quantidade)
                    .bind(r.valor_usd)
            }
            _ => return Err(shape_mismatch(kind)),
        };

        // A unique violation aborts the enclosing transaction unless confined to a savepoint.
        let tx = self.tx()?;
        let mut savepoint = tx.begin().await.map_err(store_err)?;
        match query.execute(&mut *savepoint).await {
            Ok(_) => {
                savepoint.commit().await.map_err(store_err)?;
                self.inserted += 1;
                Ok(InsertOutcome::Inserted)
            }
            Err(e) if is_unique_violation(&e) => {
                savepoint.rollback().await.map_err(store_err)?;
                Ok(InsertOutcome::AlreadyPresent)
            }
            Err(e) => Err(store_err(e)),
        }
    }

    async fn commit(&mut self) -> Result<usize> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| IngestError::Store("batch already committed".to_string()))?;
        tx.commit().await.map_err(store_err)?;
        Ok(self.inserted)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn begin(&self, kind: DatasetKind) -> Result<Box<dyn StoreBatch>> {
        let tx = self.pool.begin().await.map_err(store_err)?;
        Ok(Box::new(PgBatch {
            kind,
            tx: Some(tx),
            inserted: 0,
        }))
    }
}
