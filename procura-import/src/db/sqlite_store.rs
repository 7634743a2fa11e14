//! SQLite implementation of [`ImportStore`]
//!
//! Tables are created by `procura_common::db::init_database`.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{ImportStore, StoreError, StoreResult};
use crate::models::{AlertKey, BrandAlert, CanonicalRecord};

const RECORD_COLUMNS: &str = "orden_electronica, nro_orden_fisica, fecha_publicacion, \
    fecha_aceptacion, razon_social_entidad, ruc_entidad, unidad_ejecutora, \
    razon_social_proveedor, ruc_proveedor, direccion_proveedor, descripcion_ficha_producto, \
    marca_ficha_producto, nro_parte, categoria, catalogo, cantidad_entrega, precio_unitario, \
    sub_total, igv_entrega, monto_total_entrega, fecha_inicio_entrega, fecha_fin_entrega, \
    plazo_entrega, direccion_entrega, estado_orden_electronica, procedimiento, tipo_compra, \
    nro_entrega, total_entregas, dep_entrega, prov_entrega, dist_entrega, link_ficha_producto, \
    orden_digitalizada, acuerdo_marco, codigo_acuerdo_marco";

const ALERT_COLUMNS: &str =
    "orden_electronica, acuerdo_marco, brand_name, status, notes, created_at, updated_at";

/// sqlx-backed store
#[derive(Clone)]
pub struct SqliteImportStore {
    db: SqlitePool,
}

impl SqliteImportStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn record_insert(records: &[CanonicalRecord]) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO open_data_entries ({}) ", RECORD_COLUMNS));
    qb.push_values(records, |mut b, r| {
        b.push_bind(r.orden_electronica.clone())
            .push_bind(r.nro_orden_fisica.clone())
            .push_bind(r.fecha_publicacion)
            .push_bind(r.fecha_aceptacion)
            .push_bind(r.razon_social_entidad.clone())
            .push_bind(r.ruc_entidad.clone())
            .push_bind(r.unidad_ejecutora.clone())
            .push_bind(r.razon_social_proveedor.clone())
            .push_bind(r.ruc_proveedor.clone())
            .push_bind(r.direccion_proveedor.clone())
            .push_bind(r.descripcion_ficha_producto.clone())
            .push_bind(r.marca_ficha_producto.clone())
            .push_bind(r.nro_parte.clone())
            .push_bind(r.categoria.clone())
            .push_bind(r.catalogo.clone())
            .push_bind(r.cantidad_entrega)
            .push_bind(r.precio_unitario)
            .push_bind(r.sub_total)
            .push_bind(r.igv_entrega)
            .push_bind(r.monto_total_entrega)
            .push_bind(r.fecha_inicio_entrega)
            .push_bind(r.fecha_fin_entrega)
            .push_bind(r.plazo_entrega)
            .push_bind(r.direccion_entrega.clone())
            .push_bind(r.estado_orden_electronica.clone())
            .push_bind(r.procedimiento.clone())
            .push_bind(r.tipo_compra.clone())
            .push_bind(r.nro_entrega)
            .push_bind(r.total_entregas)
            .push_bind(r.dep_entrega.clone())
            .push_bind(r.prov_entrega.clone())
            .push_bind(r.dist_entrega.clone())
            .push_bind(r.link_ficha_producto.clone())
            .push_bind(r.orden_digitalizada.clone())
            .push_bind(r.acuerdo_marco.clone())
            .push_bind(r.codigo_acuerdo_marco.clone());
    });
    qb
}

fn alert_insert(alerts: &[BrandAlert]) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO brand_alerts ({}) ", ALERT_COLUMNS));
    qb.push_values(alerts, |mut b, a| {
        b.push_bind(a.business_key.clone())
            .push_bind(a.context_label.clone())
            .push_bind(a.brand_name.clone())
            .push_bind(a.status.as_str())
            .push_bind(a.note.clone())
            .push_bind(a.created_at)
            .push_bind(a.created_at);
    });
    qb
}

/// Map unique-constraint violations to [`StoreError::Conflict`]
fn classify(err: sqlx::Error) -> StoreError {
    let unique = err
        .as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false);
    if unique {
        StoreError::Conflict(err.to_string())
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl ImportStore for SqliteImportStore {
    async fn delete_records_for_context(&self, context_code: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM open_data_entries WHERE codigo_acuerdo_marco = ?")
            .bind(context_code)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_records(&self, records: &[CanonicalRecord]) -> StoreResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let result = record_insert(records)
            .build()
            .execute(&self.db)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn insert_record(&self, record: &CanonicalRecord) -> StoreResult<()> {
        record_insert(std::slice::from_ref(record))
            .build()
            .execute(&self.db)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn existing_alert_keys(&self, business_keys: &[String]) -> StoreResult<Vec<AlertKey>> {
        if business_keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT orden_electronica, brand_name FROM brand_alerts WHERE orden_electronica IN (",
        );
        let mut separated = qb.separated(", ");
        for key in business_keys {
            separated.push_bind(key.clone());
        }
        separated.push_unseparated(")");

        let rows: Vec<(String, String)> = qb.build_query_as().fetch_all(&self.db).await?;

        Ok(rows
            .into_iter()
            .map(|(business_key, brand_name)| AlertKey {
                business_key,
                brand_name,
            })
            .collect())
    }

    async fn alert_exists(&self, key: &AlertKey) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM brand_alerts WHERE orden_electronica = ? AND brand_name = ?",
        )
        .bind(&key.business_key)
        .bind(&key.brand_name)
        .fetch_one(&self.db)
        .await?;
        Ok(count > 0)
    }

    async fn insert_alerts(&self, alerts: &[BrandAlert]) -> StoreResult<u64> {
        if alerts.is_empty() {
            return Ok(0);
        }
        let result = alert_insert(alerts)
            .build()
            .execute(&self.db)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn insert_alert(&self, alert: &BrandAlert) -> StoreResult<()> {
        alert_insert(std::slice::from_ref(alert))
            .build()
            .execute(&self.db)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn count_records_for_context(&self, context_code: &str) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM open_data_entries WHERE codigo_acuerdo_marco = ?",
        )
        .bind(context_code)
        .fetch_one(&self.db)
        .await?;
        Ok(count.max(0) as u64)
    }
}
