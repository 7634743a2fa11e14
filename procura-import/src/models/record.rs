//! Canonical procurement records and brand alerts

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Canonical field names (target schema column names)
pub mod fields {
    pub const ORDEN_ELECTRONICA: &str = "orden_electronica";
    pub const NRO_ORDEN_FISICA: &str = "nro_orden_fisica";
    pub const FECHA_PUBLICACION: &str = "fecha_publicacion";
    pub const FECHA_ACEPTACION: &str = "fecha_aceptacion";
    pub const RAZON_SOCIAL_ENTIDAD: &str = "razon_social_entidad";
    pub const RUC_ENTIDAD: &str = "ruc_entidad";
    pub const UNIDAD_EJECUTORA: &str = "unidad_ejecutora";
    pub const RAZON_SOCIAL_PROVEEDOR: &str = "razon_social_proveedor";
    pub const RUC_PROVEEDOR: &str = "ruc_proveedor";
    pub const DIRECCION_PROVEEDOR: &str = "direccion_proveedor";
    pub const DESCRIPCION_FICHA_PRODUCTO: &str = "descripcion_ficha_producto";
    pub const MARCA_FICHA_PRODUCTO: &str = "marca_ficha_producto";
    pub const NRO_PARTE: &str = "nro_parte";
    pub const CATEGORIA: &str = "categoria";
    pub const CATALOGO: &str = "catalogo";
    pub const CANTIDAD_ENTREGA: &str = "cantidad_entrega";
    pub const PRECIO_UNITARIO: &str = "precio_unitario";
    pub const SUB_TOTAL: &str = "sub_total";
    pub const IGV_ENTREGA: &str = "igv_entrega";
    pub const MONTO_TOTAL_ENTREGA: &str = "monto_total_entrega";
    pub const FECHA_INICIO_ENTREGA: &str = "fecha_inicio_entrega";
    pub const FECHA_FIN_ENTREGA: &str = "fecha_fin_entrega";
    pub const PLAZO_ENTREGA: &str = "plazo_entrega";
    pub const DIRECCION_ENTREGA: &str = "direccion_entrega";
    pub const ESTADO_ORDEN_ELECTRONICA: &str = "estado_orden_electronica";
    pub const PROCEDIMIENTO: &str = "procedimiento";
    pub const TIPO_COMPRA: &str = "tipo_compra";
    pub const NRO_ENTREGA: &str = "nro_entrega";
    pub const TOTAL_ENTREGAS: &str = "total_entregas";
    pub const DEP_ENTREGA: &str = "dep_entrega";
    pub const PROV_ENTREGA: &str = "prov_entrega";
    pub const DIST_ENTREGA: &str = "dist_entrega";
    pub const LINK_FICHA_PRODUCTO: &str = "link_ficha_producto";
    pub const ORDEN_DIGITALIZADA: &str = "orden_digitalizada";
}

/// Context tag scoping one import batch
///
/// `label` is the trimmed framework-agreement label as entered by the
/// operator (e.g. `"EXT-CE-2022-5 Material medico"`); `code` is its first
/// whitespace-delimited token (`"EXT-CE-2022-5"`). Replace-by-context
/// deletes by `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTag {
    pub label: String,
    pub code: String,
}

impl ContextTag {
    /// Derive the tag from a raw label; `None` when the label is blank
    pub fn from_label(raw: &str) -> Option<Self> {
        let label = raw.trim();
        let code = label.split_whitespace().next()?;
        Some(Self {
            label: label.to_string(),
            code: code.to_string(),
        })
    }
}

/// Coerced value of one canonical field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Number(f64),
}

/// Normalized target-schema record for one sheet line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub orden_electronica: String,
    pub nro_orden_fisica: String,
    pub fecha_publicacion: NaiveDate,
    pub fecha_aceptacion: NaiveDate,
    pub razon_social_entidad: String,
    pub ruc_entidad: String,
    pub unidad_ejecutora: String,
    pub razon_social_proveedor: String,
    pub ruc_proveedor: String,
    pub direccion_proveedor: String,
    pub descripcion_ficha_producto: String,
    pub marca_ficha_producto: String,
    pub nro_parte: String,
    pub categoria: String,
    pub catalogo: String,
    pub cantidad_entrega: f64,
    pub precio_unitario: f64,
    pub sub_total: f64,
    pub igv_entrega: f64,
    pub monto_total_entrega: f64,
    pub fecha_inicio_entrega: NaiveDate,
    pub fecha_fin_entrega: NaiveDate,
    pub plazo_entrega: f64,
    pub direccion_entrega: String,
    pub estado_orden_electronica: String,
    pub procedimiento: String,
    pub tipo_compra: String,
    pub nro_entrega: f64,
    pub total_entregas: f64,
    pub dep_entrega: String,
    pub prov_entrega: String,
    pub dist_entrega: String,
    pub link_ficha_producto: String,
    pub orden_digitalizada: String,
    /// Trimmed context label
    pub acuerdo_marco: String,
    /// Context code
    pub codigo_acuerdo_marco: String,
}

impl CanonicalRecord {
    /// Empty record tagged with `context`; dates start at `sentinel`
    pub fn new(context: &ContextTag, sentinel: NaiveDate) -> Self {
        Self {
            orden_electronica: String::new(),
            nro_orden_fisica: String::new(),
            fecha_publicacion: sentinel,
            fecha_aceptacion: sentinel,
            razon_social_entidad: String::new(),
            ruc_entidad: String::new(),
            unidad_ejecutora: String::new(),
            razon_social_proveedor: String::new(),
            ruc_proveedor: String::new(),
            direccion_proveedor: String::new(),
            descripcion_ficha_producto: String::new(),
            marca_ficha_producto: String::new(),
            nro_parte: String::new(),
            categoria: String::new(),
            catalogo: String::new(),
            cantidad_entrega: 0.0,
            precio_unitario: 0.0,
            sub_total: 0.0,
            igv_entrega: 0.0,
            monto_total_entrega: 0.0,
            fecha_inicio_entrega: sentinel,
            fecha_fin_entrega: sentinel,
            plazo_entrega: 0.0,
            direccion_entrega: String::new(),
            estado_orden_electronica: String::new(),
            procedimiento: String::new(),
            tipo_compra: String::new(),
            nro_entrega: 0.0,
            total_entregas: 0.0,
            dep_entrega: String::new(),
            prov_entrega: String::new(),
            dist_entrega: String::new(),
            link_ficha_producto: String::new(),
            orden_digitalizada: String::new(),
            acuerdo_marco: context.label.clone(),
            codigo_acuerdo_marco: context.code.clone(),
        }
    }

    /// Assign a coerced value to the named field
    ///
    /// Returns `false` when the field is not part of the schema. A value of
    /// the wrong kind is converted: dates and numbers render as text, text
    /// leaves a date or numeric field untouched.
    pub fn set(&mut self, field: &str, value: FieldValue) -> bool {
        use fields::*;

        let slot = match field {
            ORDEN_ELECTRONICA => Slot::Text(&mut self.orden_electronica),
            NRO_ORDEN_FISICA => Slot::Text(&mut self.nro_orden_fisica),
            FECHA_PUBLICACION => Slot::Date(&mut self.fecha_publicacion),
            FECHA_ACEPTACION => Slot::Date(&mut self.fecha_aceptacion),
            RAZON_SOCIAL_ENTIDAD => Slot::Text(&mut self.razon_social_entidad),
            RUC_ENTIDAD => Slot::Text(&mut self.ruc_entidad),
            UNIDAD_EJECUTORA => Slot::Text(&mut self.unidad_ejecutora),
            RAZON_SOCIAL_PROVEEDOR => Slot::Text(&mut self.razon_social_proveedor),
            RUC_PROVEEDOR => Slot::Text(&mut self.ruc_proveedor),
            DIRECCION_PROVEEDOR => Slot::Text(&mut self.direccion_proveedor),
            DESCRIPCION_FICHA_PRODUCTO => Slot::Text(&mut self.descripcion_ficha_producto),
            MARCA_FICHA_PRODUCTO => Slot::Text(&mut self.marca_ficha_producto),
            NRO_PARTE => Slot::Text(&mut self.nro_parte),
            CATEGORIA => Slot::Text(&mut self.categoria),
            CATALOGO => Slot::Text(&mut self.catalogo),
            CANTIDAD_ENTREGA => Slot::Number(&mut self.cantidad_entrega),
            PRECIO_UNITARIO => Slot::Number(&mut self.precio_unitario),
            SUB_TOTAL => Slot::Number(&mut self.sub_total),
            IGV_ENTREGA => Slot::Number(&mut self.igv_entrega),
            MONTO_TOTAL_ENTREGA => Slot::Number(&mut self.monto_total_entrega),
            FECHA_INICIO_ENTREGA => Slot::Date(&mut self.fecha_inicio_entrega),
            FECHA_FIN_ENTREGA => Slot::Date(&mut self.fecha_fin_entrega),
            PLAZO_ENTREGA => Slot::Number(&mut self.plazo_entrega),
            DIRECCION_ENTREGA => Slot::Text(&mut self.direccion_entrega),
            ESTADO_ORDEN_ELECTRONICA => Slot::Text(&mut self.estado_orden_electronica),
            PROCEDIMIENTO => Slot::Text(&mut self.procedimiento),
            TIPO_COMPRA => Slot::Text(&mut self.tipo_compra),
            NRO_ENTREGA => Slot::Number(&mut self.nro_entrega),
            TOTAL_ENTREGAS => Slot::Number(&mut self.total_entregas),
            DEP_ENTREGA => Slot::Text(&mut self.dep_entrega),
            PROV_ENTREGA => Slot::Text(&mut self.prov_entrega),
            DIST_ENTREGA => Slot::Text(&mut self.dist_entrega),
            LINK_FICHA_PRODUCTO => Slot::Text(&mut self.link_ficha_producto),
            ORDEN_DIGITALIZADA => Slot::Text(&mut self.orden_digitalizada),
            _ => return false,
        };

        match (slot, value) {
            (Slot::Text(s), FieldValue::Text(v)) => *s = v,
            (Slot::Text(s), FieldValue::Date(d)) => *s = d.format("%Y-%m-%d").to_string(),
            (Slot::Text(s), FieldValue::Number(n)) => *s = n.to_string(),
            (Slot::Date(s), FieldValue::Date(d)) => *s = d,
            (Slot::Number(s), FieldValue::Number(n)) => *s = n,
            _ => {}
        }
        true
    }
}

enum Slot<'a> {
    Text(&'a mut String),
    Date(&'a mut NaiveDate),
    Number(&'a mut f64),
}

/// Review status of a brand alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
        }
    }
}

/// A tracked brand mentioned in a record's brand field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandAlert {
    pub business_key: String,
    /// Context label of the job that raised it
    pub context_label: String,
    pub brand_name: String,
    pub status: AlertStatus,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl BrandAlert {
    pub fn key(&self) -> AlertKey {
        AlertKey {
            business_key: self.business_key.clone(),
            brand_name: self.brand_name.clone(),
        }
    }
}

/// Uniqueness key of a brand alert
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertKey {
    pub business_key: String,
    pub brand_name: String,
}
