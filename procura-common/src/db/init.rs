//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the import tables if
//! they are missing. Every statement is idempotent, so this runs on each
//! startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets dashboards read while an import writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_import_tables(&pool).await?;

    Ok(pool)
}

/// Create `open_data_entries` and `brand_alerts` if they don't exist
pub async fn create_import_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS open_data_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            orden_electronica TEXT NOT NULL,
            nro_orden_fisica TEXT NOT NULL DEFAULT '',
            fecha_publicacion TEXT NOT NULL,
            fecha_aceptacion TEXT NOT NULL,
            razon_social_entidad TEXT NOT NULL,
            ruc_entidad TEXT NOT NULL,
            unidad_ejecutora TEXT NOT NULL DEFAULT '',
            razon_social_proveedor TEXT NOT NULL,
            ruc_proveedor TEXT NOT NULL,
            direccion_proveedor TEXT,
            descripcion_ficha_producto TEXT,
            marca_ficha_producto TEXT,
            nro_parte TEXT,
            categoria TEXT NOT NULL DEFAULT '',
            catalogo TEXT NOT NULL DEFAULT '',
            cantidad_entrega REAL NOT NULL DEFAULT 0,
            precio_unitario REAL NOT NULL DEFAULT 0,
            sub_total REAL NOT NULL DEFAULT 0,
            igv_entrega REAL NOT NULL DEFAULT 0,
            monto_total_entrega REAL NOT NULL DEFAULT 0,
            fecha_inicio_entrega TEXT NOT NULL,
            fecha_fin_entrega TEXT NOT NULL,
            plazo_entrega REAL NOT NULL DEFAULT 0,
            direccion_entrega TEXT,
            estado_orden_electronica TEXT NOT NULL DEFAULT '',
            procedimiento TEXT NOT NULL DEFAULT '',
            tipo_compra TEXT NOT NULL DEFAULT '',
            nro_entrega REAL NOT NULL DEFAULT 0,
            total_entregas REAL NOT NULL DEFAULT 0,
            dep_entrega TEXT NOT NULL DEFAULT '',
            prov_entrega TEXT NOT NULL DEFAULT '',
            dist_entrega TEXT NOT NULL DEFAULT '',
            link_ficha_producto TEXT,
            orden_digitalizada TEXT,
            acuerdo_marco TEXT NOT NULL,
            codigo_acuerdo_marco TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_open_data_entries_codigo ON open_data_entries(codigo_acuerdo_marco)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS brand_alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            orden_electronica TEXT NOT NULL,
            acuerdo_marco TEXT NOT NULL,
            brand_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One alert per (order, brand), across all imports
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_brand_alerts_order_brand ON brand_alerts(orden_electronica, brand_name)",
    )
    .execute(pool)
    .await?;

    info!("Database tables initialized (open_data_entries, brand_alerts)");

    Ok(())
}
