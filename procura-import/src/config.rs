//! Import pipeline configuration
//!
//! [`ImportConfig`] is immutable data handed to the pipeline entry point: the
//! column alias table, the tracked brand table, and every tunable constant.
//! Compiled defaults cover the public procurement export layout; the
//! `[import]` table of `procura-import.toml` may override the numeric knobs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::fields;

/// How a canonical field's raw cell is coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Number,
}

/// One canonical field and the header spellings it is known by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: String,
    pub kind: FieldKind,
    /// Accepted header spellings, tried in order
    pub aliases: Vec<String>,
}

impl ColumnSpec {
    pub fn new(field: &str, kind: FieldKind, aliases: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            kind,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// A tracked brand and the literal patterns that reveal it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandPattern {
    pub brand: String,
    pub patterns: Vec<String>,
}

impl BrandPattern {
    pub fn new(brand: &str, patterns: &[&str]) -> Self {
        Self {
            brand: brand.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Immutable pipeline configuration
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Canonical field table (target schema order)
    pub columns: Vec<ColumnSpec>,
    /// Fields that must resolve from the header and be non-empty per row
    pub required_fields: Vec<String>,
    /// Fields that, when non-empty, must be an 11-digit tax id
    pub tax_id_fields: Vec<String>,
    /// Field holding the business key used for dedup, filtering and alerts
    pub business_key_field: String,
    /// Field scanned for tracked brands
    pub brand_field: String,
    /// Business keys with this suffix are dropped by the business filter
    pub exclusion_suffix: String,
    pub brands: Vec<BrandPattern>,
    /// 0-based row index of the header in the first sheet
    pub header_row_index: usize,
    /// Sheets with fewer rows are structurally invalid
    pub min_rows: usize,
    pub max_rows_per_chunk: usize,
    /// Files larger than this are chunked regardless of row count
    pub chunking_file_size_threshold: u64,
    pub record_batch_size: usize,
    pub alert_batch_size: usize,
    /// Row errors recorded per chunk before further messages are dropped
    pub error_ceiling: usize,
    /// Error messages included in the final summary
    pub summary_error_limit: usize,
    /// Failed record keys included in the final summary
    pub failed_record_limit: usize,
    pub inter_chunk_pause: Duration,
    /// Largest declared file size accepted by the trigger
    pub max_file_size_bytes: u64,
    pub fetch_timeout: Duration,
    /// Folder `file://` references may read from; `None` disables local reads
    pub local_file_root: Option<PathBuf>,
    /// Substituted for missing or unparseable dates
    pub sentinel_date: NaiveDate,
}

/// `[import]` table overrides from the TOML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOverrides {
    pub max_rows_per_chunk: Option<usize>,
    pub chunking_file_size_threshold: Option<u64>,
    pub record_batch_size: Option<usize>,
    pub alert_batch_size: Option<usize>,
    pub error_ceiling: Option<usize>,
    pub summary_error_limit: Option<usize>,
    pub inter_chunk_pause_ms: Option<u64>,
    pub max_file_size_bytes: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub local_file_root: Option<PathBuf>,
}

const MIB: u64 = 1024 * 1024;

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            required_fields: vec![
                fields::ORDEN_ELECTRONICA.to_string(),
                fields::RAZON_SOCIAL_ENTIDAD.to_string(),
                fields::RUC_ENTIDAD.to_string(),
                fields::RAZON_SOCIAL_PROVEEDOR.to_string(),
                fields::RUC_PROVEEDOR.to_string(),
            ],
            tax_id_fields: vec![
                fields::RUC_ENTIDAD.to_string(),
                fields::RUC_PROVEEDOR.to_string(),
            ],
            business_key_field: fields::ORDEN_ELECTRONICA.to_string(),
            brand_field: fields::MARCA_FICHA_PRODUCTO.to_string(),
            exclusion_suffix: "-0".to_string(),
            brands: default_brands(),
            header_row_index: 5,
            min_rows: 7,
            max_rows_per_chunk: 5000,
            chunking_file_size_threshold: 10 * MIB,
            record_batch_size: 50,
            alert_batch_size: 100,
            error_ceiling: 20,
            summary_error_limit: 20,
            failed_record_limit: 100,
            inter_chunk_pause: Duration::from_millis(100),
            max_file_size_bytes: 50 * MIB,
            fetch_timeout: Duration::from_secs(120),
            local_file_root: None,
            sentinel_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
        }
    }
}

impl ImportConfig {
    /// Apply TOML overrides on top of this configuration
    ///
    /// Zero sizes are ignored; a zero batch or chunk bound would stall the
    /// pipeline.
    pub fn with_overrides(mut self, overrides: &ImportOverrides) -> Self {
        if let Some(v) = overrides.max_rows_per_chunk.filter(|v| *v > 0) {
            self.max_rows_per_chunk = v;
        }
        if let Some(v) = overrides.chunking_file_size_threshold {
            self.chunking_file_size_threshold = v;
        }
        if let Some(v) = overrides.record_batch_size.filter(|v| *v > 0) {
            self.record_batch_size = v;
        }
        if let Some(v) = overrides.alert_batch_size.filter(|v| *v > 0) {
            self.alert_batch_size = v;
        }
        if let Some(v) = overrides.error_ceiling {
            self.error_ceiling = v;
        }
        if let Some(v) = overrides.summary_error_limit {
            self.summary_error_limit = v;
        }
        if let Some(v) = overrides.inter_chunk_pause_ms {
            self.inter_chunk_pause = Duration::from_millis(v);
        }
        if let Some(v) = overrides.max_file_size_bytes {
            self.max_file_size_bytes = v;
        }
        if let Some(v) = overrides.fetch_timeout_secs.filter(|v| *v > 0) {
            self.fetch_timeout = Duration::from_secs(v);
        }
        if let Some(root) = &overrides.local_file_root {
            self.local_file_root = Some(root.clone());
        }
        self
    }
}

fn default_columns() -> Vec<ColumnSpec> {
    use FieldKind::{Date, Number, Text};

    vec![
        ColumnSpec::new(
            fields::ORDEN_ELECTRONICA,
            Text,
            &[
                "Orden Electrónica",
                "ORDEN ELECTRÓNICA",
                "Orden Electronica",
                "ORDEN ELECTRONICA",
                "orden_electronica",
            ],
        ),
        ColumnSpec::new(
            fields::NRO_ORDEN_FISICA,
            Text,
            &[
                "Nro. Orden Física",
                "NRO. ORDEN FÍSICA",
                "Nro Orden Fisica",
                "NRO ORDEN FISICA",
                "Número Orden Física",
                "Nro Orden Física",
                "N ro Orden Física",
            ],
        ),
        ColumnSpec::new(
            fields::FECHA_PUBLICACION,
            Date,
            &[
                "Fecha Publicación",
                "FECHA PUBLICACIÓN",
                "Fecha de Publicación",
                "FECHA DE PUBLICACIÓN",
                "Fecha Publicacion",
                "FECHA PUBLICACION",
                "fecha_publicacion",
            ],
        ),
        ColumnSpec::new(
            fields::FECHA_ACEPTACION,
            Date,
            &[
                "Fecha Aceptación",
                "FECHA ACEPTACIÓN",
                "Fecha de Aceptación",
                "FECHA DE ACEPTACIÓN",
                "Fecha Aceptacion",
                "FECHA ACEPTACION",
            ],
        ),
        ColumnSpec::new(
            fields::RAZON_SOCIAL_ENTIDAD,
            Text,
            &[
                "Razón Social Entidad",
                "RAZÓN SOCIAL ENTIDAD",
                "Razon Social Entidad",
                "RAZON SOCIAL ENTIDAD",
                "Entidad",
            ],
        ),
        ColumnSpec::new(
            fields::RUC_ENTIDAD,
            Text,
            &["Ruc Entidad", "RUC ENTIDAD", "RUC Entidad", "ruc_entidad"],
        ),
        ColumnSpec::new(
            fields::UNIDAD_EJECUTORA,
            Text,
            &["Unidad Ejecutora", "UNIDAD EJECUTORA", "unidad_ejecutora"],
        ),
        ColumnSpec::new(
            fields::RAZON_SOCIAL_PROVEEDOR,
            Text,
            &[
                "Razón Social Proveedor",
                "RAZÓN SOCIAL PROVEEDOR",
                "Razon Social Proveedor",
                "RAZON SOCIAL PROVEEDOR",
                "Proveedor",
            ],
        ),
        ColumnSpec::new(
            fields::RUC_PROVEEDOR,
            Text,
            &["Ruc Proveedor", "RUC PROVEEDOR", "RUC Proveedor", "ruc_proveedor"],
        ),
        ColumnSpec::new(
            fields::DIRECCION_PROVEEDOR,
            Text,
            &[
                "Dirección Proveedor",
                "DIRECCIÓN PROVEEDOR",
                "Direccion Proveedor",
                "DIRECCION PROVEEDOR",
            ],
        ),
        ColumnSpec::new(
            fields::DESCRIPCION_FICHA_PRODUCTO,
            Text,
            &[
                "Descripción Ficha Producto",
                "DESCRIPCIÓN FICHA PRODUCTO",
                "Descripcion Ficha Producto",
                "DESCRIPCION FICHA PRODUCTO",
                "Descripción Producto",
                "Descripcion Producto",
            ],
        ),
        ColumnSpec::new(
            fields::MARCA_FICHA_PRODUCTO,
            Text,
            &[
                "Marca Ficha Producto",
                "MARCA FICHA PRODUCTO",
                "Marca Producto",
                "MARCA PRODUCTO",
            ],
        ),
        ColumnSpec::new(
            fields::NRO_PARTE,
            Text,
            &["Nro. Parte", "NRO. PARTE", "Nro Parte", "NRO PARTE", "Número Parte"],
        ),
        ColumnSpec::new(
            fields::CATEGORIA,
            Text,
            &["Categoría", "CATEGORÍA", "Categoria", "CATEGORIA"],
        ),
        ColumnSpec::new(
            fields::CATALOGO,
            Text,
            &["Catálogo", "CATÁLOGO", "Catalogo", "CATALOGO"],
        ),
        ColumnSpec::new(
            fields::CANTIDAD_ENTREGA,
            Number,
            &["Cantidad Entrega", "CANTIDAD ENTREGA", "Cantidad", "CANTIDAD"],
        ),
        ColumnSpec::new(
            fields::PRECIO_UNITARIO,
            Number,
            &["Precio Unitario", "PRECIO UNITARIO", "Precio Unit", "PRECIO UNIT"],
        ),
        ColumnSpec::new(
            fields::SUB_TOTAL,
            Number,
            &["Sub Total", "SUB TOTAL", "SubTotal", "SUBTOTAL"],
        ),
        ColumnSpec::new(
            fields::IGV_ENTREGA,
            Number,
            &["IGV Entrega", "IGV ENTREGA", "IGV", "igv"],
        ),
        ColumnSpec::new(
            fields::MONTO_TOTAL_ENTREGA,
            Number,
            &[
                "Monto Total Entrega",
                "MONTO TOTAL ENTREGA",
                "Monto Total",
                "MONTO TOTAL",
                "Total",
            ],
        ),
        ColumnSpec::new(
            fields::FECHA_INICIO_ENTREGA,
            Date,
            &[
                "Fecha Inicio Entrega",
                "FECHA INICIO ENTREGA",
                "Fecha Inicio",
                "FECHA INICIO",
            ],
        ),
        ColumnSpec::new(
            fields::FECHA_FIN_ENTREGA,
            Date,
            &["Fecha Fin Entrega", "FECHA FIN ENTREGA", "Fecha Fin", "FECHA FIN"],
        ),
        ColumnSpec::new(
            fields::PLAZO_ENTREGA,
            Number,
            &["Plazo Entrega", "PLAZO ENTREGA", "Plazo", "PLAZO", "Plaz o Entrega"],
        ),
        ColumnSpec::new(
            fields::DIRECCION_ENTREGA,
            Text,
            &[
                "Dirección Entrega",
                "DIRECCIÓN ENTREGA",
                "Direccion Entrega",
                "DIRECCION ENTREGA",
            ],
        ),
        ColumnSpec::new(
            fields::ESTADO_ORDEN_ELECTRONICA,
            Text,
            &[
                "Estado Orden Electrónica",
                "ESTADO ORDEN ELECTRÓNICA",
                "Estado Orden Electronica",
                "ESTADO ORDEN ELECTRONICA",
                "Estado de la Orden Electrónica",
                "ESTADO DE LA ORDEN ELECTRÓNICA",
                "Estado",
            ],
        ),
        ColumnSpec::new(
            fields::PROCEDIMIENTO,
            Text,
            &["Procedimiento", "PROCEDIMIENTO"],
        ),
        ColumnSpec::new(
            fields::TIPO_COMPRA,
            Text,
            &["Tipo Compra", "TIPO COMPRA", "Tipo de Compra", "TIPO DE COMPRA"],
        ),
        ColumnSpec::new(
            fields::NRO_ENTREGA,
            Number,
            &["Nro. Entrega", "NRO. ENTREGA", "Nro Entrega", "NRO ENTREGA"],
        ),
        ColumnSpec::new(
            fields::TOTAL_ENTREGAS,
            Number,
            &["Total Entregas", "TOTAL ENTREGAS"],
        ),
        ColumnSpec::new(
            fields::DEP_ENTREGA,
            Text,
            &["Dep. Entrega", "DEP. ENTREGA", "Dep Entrega", "DEP ENTREGA"],
        ),
        ColumnSpec::new(
            fields::PROV_ENTREGA,
            Text,
            &["Prov. Entrega", "PROV. ENTREGA", "Prov Entrega", "PROV ENTREGA"],
        ),
        ColumnSpec::new(
            fields::DIST_ENTREGA,
            Text,
            &["Dist. Entrega", "DIST. ENTREGA", "Dist Entrega", "DIST ENTREGA"],
        ),
        ColumnSpec::new(
            fields::LINK_FICHA_PRODUCTO,
            Text,
            &["Link Ficha Producto", "LINK FICHA PRODUCTO"],
        ),
        ColumnSpec::new(
            fields::ORDEN_DIGITALIZADA,
            Text,
            &["Orden Digitalizada", "ORDEN DIGITALIZADA"],
        ),
    ]
}

fn default_brands() -> Vec<BrandPattern> {
    vec![
        BrandPattern::new(
            "WORLDLIFE",
            &["WORLDLIFE", "MARCA: WORLDLIFE", "MARCA:WORLDLIFE", "MARCA WORLDLIFE"],
        ),
        BrandPattern::new(
            "HOPE LIFE",
            &[
                "HOPE LIFE",
                "MARCA: HOPE LIFE",
                "MARCA:HOPE LIFE",
                "MARCA HOPE LIFE",
                "HOPELIFE",
                "MARCA: HOPELIFE",
            ],
        ),
        BrandPattern::new("ZEUS", &["ZEUS", "MARCA: ZEUS", "MARCA:ZEUS", "MARCA ZEUS"]),
        BrandPattern::new(
            "VALHALLA",
            &["VALHALLA", "MARCA: VALHALLA", "MARCA:VALHALLA", "MARCA VALHALLA"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_export_layout() {
        let config = ImportConfig::default();
        assert_eq!(config.header_row_index, 5);
        assert_eq!(config.min_rows, 7);
        assert_eq!(config.max_rows_per_chunk, 5000);
        assert_eq!(config.record_batch_size, 50);
        assert_eq!(config.alert_batch_size, 100);
        assert_eq!(config.sentinel_date.to_string(), "2000-01-01");
        assert_eq!(config.brands.len(), 4);
    }

    #[test]
    fn test_every_required_field_has_a_column() {
        let config = ImportConfig::default();
        for field in &config.required_fields {
            assert!(
                config.columns.iter().any(|c| &c.field == field),
                "required field {} missing from column table",
                field
            );
        }
    }

    #[test]
    fn test_kinds_are_declared() {
        let config = ImportConfig::default();
        let kind_of = |field: &str| {
            config
                .columns
                .iter()
                .find(|c| c.field == field)
                .map(|c| c.kind)
        };
        assert_eq!(kind_of(fields::FECHA_PUBLICACION), Some(FieldKind::Date));
        assert_eq!(kind_of(fields::IGV_ENTREGA), Some(FieldKind::Number));
        assert_eq!(kind_of(fields::RUC_ENTIDAD), Some(FieldKind::Text));
        assert_eq!(kind_of("no_such_field"), None);
    }

    #[test]
    fn test_overrides_apply_and_ignore_zero_sizes() {
        let overrides = ImportOverrides {
            max_rows_per_chunk: Some(0),
            record_batch_size: Some(25),
            inter_chunk_pause_ms: Some(0),
            ..Default::default()
        };

        let config = ImportConfig::default().with_overrides(&overrides);

        assert_eq!(config.max_rows_per_chunk, 5000);
        assert_eq!(config.record_batch_size, 25);
        assert_eq!(config.inter_chunk_pause, Duration::ZERO);
    }

    #[test]
    fn test_local_reads_disabled_unless_root_configured() {
        assert_eq!(ImportConfig::default().local_file_root, None);

        let overrides: ImportOverrides =
            serde_json::from_str(r#"{"local_file_root": "/srv/procura/uploads"}"#).unwrap();
        let config = ImportConfig::default().with_overrides(&overrides);

        assert_eq!(
            config.local_file_root,
            Some(PathBuf::from("/srv/procura/uploads"))
        );
    }
}
