use crate::pna::layout::{ColumnLayout, Field};
use serde::{Deserialize, Serialize};

const DELIMITER: char = ',';

/// How the first row of an export is treated.
///
/// WinePoS exports may or may not carry a header line. `Parse` keeps the
/// first line as a data candidate, where a header simply fails to join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    #[default]
    Parse,
    Skip,
}

/// A single line from a WinePoS PnA export.
///
/// Text fields are `None` when the row is too short to contain the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceRecord {
    pub item_num: Option<String>,
    pub descr: Option<String>,
    pub vintage: Option<String>,
    pub size_descr: Option<String>,
    pub case_qty: Option<String>,
    pub unit_price: Option<String>,
    pub shlf_price: Option<String>,
    pub pack_qty: Option<String>,
    pub wc_shlfprce: Option<String>,
    pub on_hand: Option<f64>,
    pub n_comparable_data: Option<String>,
    pub tax_flag: Option<String>,
    pub sale_price: Option<String>,
    pub case_sale_price: Option<String>,
    pub invoice_cost_bottle: Option<String>,
    pub sale_type: Option<String>,
    pub pack_sale_price: Option<String>,
    pub web_unit_sale_price: Option<String>,
    pub full_barcode: Option<String>,
}
impl SourceRecord {
    /// Builds a record from a single export line.
    ///
    /// Never fails: columns past the end of the line are left as `None`.
    pub fn from_line(line: &str, layout: &ColumnLayout) -> Self {
        let fields = line.split(DELIMITER).collect::<Vec<&str>>();
        let text = |field: Field| -> Option<String> {
            layout
                .index_of(field)
                .and_then(|idx| fields.get(idx))
                .map(|value| value.to_string())
        };
        let raw_on_hand = layout
            .index_of(Field::OnHand)
            .and_then(|idx| fields.get(idx).copied());
        SourceRecord {
            item_num: text(Field::ItemNum),
            descr: text(Field::Descr),
            vintage: text(Field::Vintage),
            size_descr: text(Field::SizeDescr),
            case_qty: text(Field::CaseQty),
            unit_price: text(Field::UnitPrice),
            shlf_price: text(Field::ShlfPrice),
            pack_qty: text(Field::PackQty),
            wc_shlfprce: text(Field::WcShlfprce),
            on_hand: coerce_quantity(raw_on_hand),
            n_comparable_data: text(Field::NComparableData),
            tax_flag: text(Field::TaxFlag),
            sale_price: text(Field::SalePrice),
            case_sale_price: text(Field::CaseSalePrice),
            invoice_cost_bottle: text(Field::InvoiceCostBottle),
            sale_type: text(Field::SaleType),
            pack_sale_price: text(Field::PackSalePrice),
            web_unit_sale_price: text(Field::WebUnitSalePrice),
            full_barcode: text(Field::FullBarcode),
        }
    }
    /// Returns the join key, if the row has one.
    pub fn item_num(&self) -> Option<&str> {
        self.item_num.as_deref()
    }
}

/// Coerces the on hand quantity column.
///
/// * blank or whitespace only: `Some(0.0)`
/// * a finite decimal number: that number
/// * anything else, including a missing column: `None`
pub fn coerce_quantity(raw: Option<&str>) -> Option<f64> {
    let token = raw?.trim();
    if token.is_empty() {
        return Some(0.0);
    }
    token.parse::<f64>().ok().filter(|qty| qty.is_finite())
}

/// Decodes every non-blank line of an export, in file order.
///
/// A trailing `\r` is stripped so CRLF exports decode the same as LF ones.
pub fn parse_export(
    content: &str,
    layout: &ColumnLayout,
    header: HeaderPolicy,
) -> Vec<SourceRecord> {
    let lines = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty());
    let skip = match header {
        HeaderPolicy::Parse => 0,
        HeaderPolicy::Skip => 1,
    };
    lines
        .skip(skip)
        .map(|line| SourceRecord::from_line(line, layout))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_EXPORT: &str = include_str!("../../tests/data/WinePosExport.csv");

    /// Builds a 63 column line with the given `(index, value)` pairs set.
    fn wide_line(cols: &[(usize, &str)]) -> String {
        let mut fields = vec![""; 63];
        for (idx, value) in cols {
            fields[*idx] = *value;
        }
        fields.join(",")
    }

    #[test]
    fn decodes_named_columns() {
        let line = wide_line(&[
            (0, "101"),
            (1, "WineA"),
            (7, "9.99"),
            (11, "5"),
            (12, "0001"),
            (48, "8.99"),
            (62, "9990001"),
        ]);
        let rec = SourceRecord::from_line(&line, &ColumnLayout::winepos());
        assert_eq!(rec.item_num(), Some("101"));
        assert_eq!(rec.descr.as_deref(), Some("WineA"));
        assert_eq!(rec.unit_price.as_deref(), Some("9.99"));
        assert_eq!(rec.on_hand, Some(5.0));
        assert_eq!(rec.n_comparable_data.as_deref(), Some("0001"));
        assert_eq!(rec.web_unit_sale_price.as_deref(), Some("8.99"));
        assert_eq!(rec.full_barcode.as_deref(), Some("9990001"));
        assert_eq!(rec.vintage.as_deref(), Some(""));
    }
    #[test]
    fn short_row_leaves_missing_columns_empty() {
        let rec = SourceRecord::from_line("101,WineA,,,,,,9.99", &ColumnLayout::winepos());
        assert_eq!(rec.item_num(), Some("101"));
        assert_eq!(rec.unit_price.as_deref(), Some("9.99"));
        assert_eq!(rec.shlf_price, None);
        assert_eq!(rec.on_hand, None);
        assert_eq!(rec.full_barcode, None);
    }
    #[test]
    fn on_hand_coercion_policy() {
        assert_eq!(coerce_quantity(Some("12")), Some(12.0));
        assert_eq!(coerce_quantity(Some(" 3.5 ")), Some(3.5));
        assert_eq!(coerce_quantity(Some("-2")), Some(-2.0));
        assert_eq!(coerce_quantity(Some("")), Some(0.0));
        assert_eq!(coerce_quantity(Some("   ")), Some(0.0));
        assert_eq!(coerce_quantity(Some("n/a")), None);
        assert_eq!(coerce_quantity(Some("NaN")), None);
        assert_eq!(coerce_quantity(Some("inf")), None);
        assert_eq!(coerce_quantity(None), None);
    }
    #[test]
    fn blank_lines_and_crlf() {
        let content = format!(
            "{}\r\n\r\n{}\n",
            wide_line(&[(0, "1"), (11, "2")]),
            wide_line(&[(0, "2")])
        );
        let recs = parse_export(&content, &ColumnLayout::winepos(), HeaderPolicy::Parse);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].on_hand, Some(2.0));
        assert_eq!(recs[1].full_barcode.as_deref(), Some(""));
    }
    #[test]
    fn empty_content_yields_no_records() {
        assert!(parse_export("", &ColumnLayout::winepos(), HeaderPolicy::Parse).is_empty());
        assert!(parse_export("\n\n", &ColumnLayout::winepos(), HeaderPolicy::Skip).is_empty());
    }
    #[test]
    fn header_policy() {
        let layout = ColumnLayout::winepos();
        let parsed = parse_export(TEST_EXPORT, &layout, HeaderPolicy::Parse);
        let skipped = parse_export(TEST_EXPORT, &layout, HeaderPolicy::Skip);
        assert_eq!(parsed.len(), skipped.len() + 1);
        assert_eq!(parsed[0].item_num(), Some("item_num"));
        assert_eq!(parsed[0].on_hand, None);
        assert_eq!(skipped[0], parsed[1]);
    }
    #[test]
    fn keeps_file_order() {
        let recs = parse_export(TEST_EXPORT, &ColumnLayout::winepos(), HeaderPolicy::Skip);
        let keys = recs.iter().filter_map(|r| r.item_num()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["101", "102", "103", "104", "105"]);
    }
}
