//! The fixed-schema invoice record and the spreadsheet row built from it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Normalized invoice record.
///
/// Always exposes exactly these five fields. An absent value is `None`,
/// never zero or an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Invoice date as `DD/MM/YYYY`.
    pub date: Option<String>,

    /// Amount before tax.
    pub pre_tax_amount: Option<Decimal>,

    /// VAT rate as a fraction (`0.20` for 20%).
    pub vat_rate: Option<Decimal>,

    /// VAT amount.
    pub vat_amount: Option<Decimal>,

    /// Amount including tax.
    pub total_amount: Option<Decimal>,
}

impl InvoiceRecord {
    /// Column headers in row order.
    pub const COLUMNS: [&'static str; 5] = [
        "date",
        "pre_tax_amount",
        "vat_rate",
        "vat_amount",
        "total_amount",
    ];

    /// Build the spreadsheet row: date, pre-tax, VAT rate, VAT amount, total.
    pub fn to_row(&self) -> SheetRow {
        SheetRow([
            self.date.clone().map_or(Cell::Empty, Cell::Text),
            Cell::from_amount(self.pre_tax_amount),
            Cell::from_amount(self.vat_rate),
            Cell::from_amount(self.vat_amount),
            Cell::from_amount(self.total_amount),
        ])
    }

    /// Number of fields that carry a value.
    pub fn present_count(&self) -> usize {
        self.to_row().cells().iter().filter(|c| !c.is_empty()).count()
    }
}

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(Decimal),
    Empty,
}

impl Cell {
    fn from_amount(value: Option<Decimal>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// A five-cell row in publisher column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow(pub [Cell; 5]);

impl SheetRow {
    pub fn cells(&self) -> &[Cell; 5] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_row_order() {
        let record = InvoiceRecord {
            date: Some("09/03/2024".to_string()),
            pre_tax_amount: Some(dec("100.00")),
            vat_rate: Some(dec("0.20")),
            vat_amount: Some(dec("20.00")),
            total_amount: Some(dec("120.00")),
        };

        assert_eq!(
            record.to_row(),
            SheetRow([
                Cell::Text("09/03/2024".to_string()),
                Cell::Number(dec("100.00")),
                Cell::Number(dec("0.20")),
                Cell::Number(dec("20.00")),
                Cell::Number(dec("120.00")),
            ])
        );
        assert_eq!(record.present_count(), 5);
    }

    #[test]
    fn test_absent_fields_stay_empty() {
        let record = InvoiceRecord {
            total_amount: Some(dec("12.5")),
            ..Default::default()
        };
        let row = record.to_row();
        assert_eq!(row.cells()[0], Cell::Empty);
        assert_eq!(row.cells()[1], Cell::Empty);
        assert_eq!(row.cells()[4], Cell::Number(dec("12.5")));
        assert_eq!(record.present_count(), 1);
    }

    #[test]
    fn test_serializes_exactly_five_keys() {
        let json = serde_json::to_value(InvoiceRecord::default()).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        let mut expected: Vec<&str> = InvoiceRecord::COLUMNS.to_vec();
        expected.sort();
        let mut keys: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, expected);
        assert!(json["date"].is_null());
    }
}
