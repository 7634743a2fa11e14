//! Sheet row builders mirroring the procurement export layout
//!
//! Rows 1-5 hold the export banner, row 6 the header, data from row 7.

use procura_import::models::{Cell, RawRow};

/// Header texts as the export writes them
pub const HEADER: [&str; 9] = [
    "Orden Electrónica",
    "Razón Social Entidad",
    "RUC ENTIDAD",
    "Razón Social Proveedor",
    "RUC PROVEEDOR",
    "Marca Ficha Producto",
    "Fecha Publicación",
    "Sub Total",
    "Nro. Orden Física",
];

/// One data row; fields left as `None` take valid defaults
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub key: String,
    pub entidad: Option<String>,
    pub ruc_entidad: Option<String>,
    pub proveedor: Option<String>,
    pub ruc_proveedor: Option<String>,
    pub marca: Option<String>,
    pub fecha: Option<Cell>,
    pub sub_total: Option<Cell>,
}

impl OrderRow {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entidad: None,
            ruc_entidad: None,
            proveedor: None,
            ruc_proveedor: None,
            marca: None,
            fecha: None,
            sub_total: None,
        }
    }

    pub fn marca(mut self, marca: &str) -> Self {
        self.marca = Some(marca.to_string());
        self
    }

    pub fn ruc_entidad(mut self, ruc: &str) -> Self {
        self.ruc_entidad = Some(ruc.to_string());
        self
    }

    pub fn proveedor(mut self, name: &str) -> Self {
        self.proveedor = Some(name.to_string());
        self
    }

    pub fn sub_total(mut self, cell: Cell) -> Self {
        self.sub_total = Some(cell);
        self
    }

    pub fn fecha(mut self, cell: Cell) -> Self {
        self.fecha = Some(cell);
        self
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            text(&self.key),
            text(self.entidad.as_deref().unwrap_or("Hospital Regional de Ica")),
            text(self.ruc_entidad.as_deref().unwrap_or("20123456789")),
            text(self.proveedor.as_deref().unwrap_or("Distribuidora Andina SAC")),
            text(self.ruc_proveedor.as_deref().unwrap_or("20600000001")),
            text(self.marca.as_deref().unwrap_or("GENERICO")),
            self.fecha.clone().unwrap_or(Cell::Number(45292.0)),
            self.sub_total.clone().unwrap_or(Cell::Number(150.0)),
            text("OF-001"),
        ]
    }
}

pub fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

/// Full sheet with the standard header
pub fn sheet(rows: &[OrderRow]) -> Vec<RawRow> {
    sheet_with_header(&HEADER, rows)
}

/// Full sheet with a custom header row
pub fn sheet_with_header(header: &[&str], rows: &[OrderRow]) -> Vec<RawRow> {
    let mut sheet = preamble();
    sheet.push(RawRow::new(6, header.iter().map(|h| text(h)).collect()));
    for (i, row) in rows.iter().enumerate() {
        sheet.push(RawRow::new(7 + i, row.cells()));
    }
    sheet
}

/// Keys `OC-2024-1 ..= OC-2024-n`, all valid
pub fn numbered(n: usize) -> Vec<OrderRow> {
    (1..=n).map(|i| OrderRow::new(format!("OC-2024-{}", i))).collect()
}

fn preamble() -> Vec<RawRow> {
    vec![
        RawRow::new(1, vec![text("Reporte de Órdenes de Compra")]),
        RawRow::new(2, vec![text("Acuerdo Marco EXT-CE-2022-5")]),
        RawRow::new(3, vec![Cell::Empty]),
        RawRow::new(4, vec![text("Generado: 05/03/2024")]),
        RawRow::new(5, vec![Cell::Empty]),
    ]
}
