//! Raw extraction mapping to the fixed five-field invoice record.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::extraction::{RawExtraction, RawValue};
use crate::models::config::FieldMap;
use crate::models::record::InvoiceRecord;
use crate::template::values::{parse_amount, parse_date};

/// Output format of the record date.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Normalize a raw extraction into an [`InvoiceRecord`].
///
/// No extraction gives no record. Otherwise every field of the record is
/// either a parsed value or `None`; unparseable raw values are logged and
/// dropped, never turned into zero or an empty string.
pub fn normalize(raw: Option<&RawExtraction>, fields: &FieldMap) -> Option<InvoiceRecord> {
    let raw = raw?;

    let record = InvoiceRecord {
        date: raw.get(&fields.date).and_then(|v| date_value(&fields.date, v)),
        pre_tax_amount: number_field(raw, &fields.pre_tax_amount),
        vat_rate: number_field(raw, &fields.vat_rate),
        vat_amount: number_field(raw, &fields.vat_amount),
        total_amount: number_field(raw, &fields.total_amount),
    };

    debug!(
        "Normalized record from template '{}': {} of 5 fields present",
        raw.template,
        record.present_count()
    );
    Some(record)
}

fn date_value(field: &str, value: &RawValue) -> Option<String> {
    let date = match value {
        RawValue::Date(date) => Some(*date),
        RawValue::Text(text) => parse_date(text, &[]),
        RawValue::Number(_) => None,
    };

    if date.is_none() {
        warn!("Field '{}': '{}' is not a date, leaving it empty", field, value);
    }
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn number_field(raw: &RawExtraction, field: &str) -> Option<Decimal> {
    let value = raw.get(field)?;
    let number = match value {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(text) => parse_amount(text),
        RawValue::Date(_) => None,
    };

    if number.is_none() {
        warn!("Field '{}': '{}' is not a number, leaving it empty", field, value);
    }
    number
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn raw(fields: &[(&str, RawValue)]) -> RawExtraction {
        RawExtraction {
            template: "vendorA".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_no_result_gives_no_record() {
        assert_eq!(normalize(None, &FieldMap::default()), None);
    }

    #[test]
    fn test_date_formatting() {
        let extraction = raw(&[(
            "date",
            RawValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
        )]);
        let record = normalize(Some(&extraction), &FieldMap::default()).unwrap();
        assert_eq!(record.date.as_deref(), Some("09/03/2024"));
    }

    #[test]
    fn test_text_date_is_parsed() {
        let extraction = raw(&[("date", RawValue::Text("9 mars 2024".to_string()))]);
        let record = normalize(Some(&extraction), &FieldMap::default()).unwrap();
        assert_eq!(record.date.as_deref(), Some("09/03/2024"));
    }

    #[test]
    fn test_subset_keeps_all_fields() {
        let extraction = raw(&[
            ("amount", RawValue::Number(dec("120.00"))),
            ("issuer", RawValue::Text("VendorA Inc.".to_string())),
        ]);
        let record = normalize(Some(&extraction), &FieldMap::default()).unwrap();

        assert_eq!(
            record,
            InvoiceRecord {
                total_amount: Some(dec("120.00")),
                ..Default::default()
            }
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_numbers_from_text_and_pass_through() {
        let extraction = raw(&[
            ("ht", RawValue::Text("1 000,00".to_string())),
            ("tva_rate", RawValue::Text("20%".to_string())),
            ("tva_amount", RawValue::Number(dec("200.00"))),
            ("amount", RawValue::Text("1.200,00 €".to_string())),
        ]);
        let record = normalize(Some(&extraction), &FieldMap::default()).unwrap();

        assert_eq!(record.pre_tax_amount, Some(dec("1000.00")));
        assert_eq!(record.vat_rate, Some(dec("0.20")));
        assert_eq!(record.vat_amount, Some(dec("200.00")));
        assert_eq!(record.total_amount, Some(dec("1200.00")));
    }

    #[test]
    fn test_unparseable_values_become_absent() {
        let extraction = raw(&[
            ("date", RawValue::Text("sometime".to_string())),
            ("amount", RawValue::Text("n/a".to_string())),
        ]);
        let record = normalize(Some(&extraction), &FieldMap::default()).unwrap();
        assert_eq!(record, InvoiceRecord::default());
    }

    #[test]
    fn test_custom_field_map() {
        let fields = FieldMap {
            total_amount: "total_ttc".to_string(),
            ..FieldMap::default()
        };
        let extraction = raw(&[
            ("total_ttc", RawValue::Number(dec("42"))),
            ("amount", RawValue::Number(dec("1"))),
        ]);
        let record = normalize(Some(&extraction), &fields).unwrap();
        assert_eq!(record.total_amount, Some(dec("42")));
    }
}
