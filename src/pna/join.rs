use crate::pna::mapping::MappingTable;
use crate::pna::record::SourceRecord;
use serde::{Serialize, Serializer};

/// A PnA record in the shape the store update consumer expects.
///
/// Text fields absent from the source row or the mapping file are left out
/// of the serialized object, and an unreadable quantity is written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upc: Option<String>,
    pub store_item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prod_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<String>,
    #[serde(serialize_with = "serialize_quantity")]
    pub total_qty: Option<f64>,
    #[serde(rename = "altUPC1", skip_serializing_if = "Option::is_none")]
    pub alt_upc1: Option<String>,
    #[serde(rename = "altUPC2", skip_serializing_if = "Option::is_none")]
    pub alt_upc2: Option<String>,
}

/// Column names of a [`NormalizedRecord`], in serialization order.
pub const NORMALIZED_COLUMNS: [&str; 9] = [
    "productId",
    "upc",
    "storeItemId",
    "prodName",
    "price",
    "salePrice",
    "totalQty",
    "altUPC1",
    "altUPC2",
];

/// Writes whole quantities as integers, so `5.0` is written as `5`.
fn serialize_quantity<S: Serializer>(qty: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match *qty {
        Some(q) if q.fract() == 0.0 && q.abs() < i64::MAX as f64 => {
            serializer.serialize_i64(q as i64)
        }
        Some(q) => serializer.serialize_f64(q),
        None => serializer.serialize_none(),
    }
}

/// Counts from a single [`join`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub matched: usize,
    pub unmatched: usize,
}

/// Joins export records against the mapping table.
///
/// Records whose `item_num` has no mapping are dropped. Matching records keep
/// their relative order.
pub fn join(
    table: &MappingTable,
    records: &[SourceRecord],
) -> (Vec<NormalizedRecord>, JoinSummary) {
    let normalized = records
        .iter()
        .filter_map(|rec| {
            let item_num = rec.item_num()?;
            let entry = table.get(item_num)?;
            Some(NormalizedRecord {
                product_id: entry.id.clone(),
                upc: entry.upc.clone(),
                store_item_id: item_num.to_string(),
                prod_name: rec.descr.clone(),
                price: rec.unit_price.clone(),
                sale_price: rec.web_unit_sale_price.clone(),
                total_qty: rec.on_hand,
                alt_upc1: rec.n_comparable_data.clone(),
                alt_upc2: rec.full_barcode.clone(),
            })
        })
        .collect::<Vec<NormalizedRecord>>();
    let summary = JoinSummary {
        matched: normalized.len(),
        unmatched: records.len() - normalized.len(),
    };
    (normalized, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pna::layout::ColumnLayout;
    use crate::pna::mapping::MappingEntry;
    use crate::pna::record::{parse_export, HeaderPolicy};
    use std::collections::BTreeMap;

    static TEST_EXPORT: &str = include_str!("../../tests/data/WinePosExport.csv");
    static TEST_MAPPINGS: &str = "tests/data/productmappings.csv";

    fn entry(item_num: &str, id: &str, upc: &str) -> MappingEntry {
        MappingEntry {
            item_num: item_num.to_string(),
            id: Some(id.to_string()),
            upc: Some(upc.to_string()),
            attributes: BTreeMap::new(),
        }
    }
    fn record(item_num: &str) -> SourceRecord {
        SourceRecord {
            item_num: Some(item_num.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn end_to_end_example() {
        let table = std::iter::once(entry("101", "P1", "UPC1")).collect::<MappingTable>();
        let line = "101,WineA,,,,,,9.99,,,,5,";
        let recs = vec![SourceRecord::from_line(line, &ColumnLayout::winepos())];
        let (out, summary) = join(&table, &recs);
        assert_eq!(summary, JoinSummary { matched: 1, unmatched: 0 });
        assert_eq!(
            out[0],
            NormalizedRecord {
                product_id: Some("P1".into()),
                upc: Some("UPC1".into()),
                store_item_id: "101".into(),
                prod_name: Some("WineA".into()),
                price: Some("9.99".into()),
                sale_price: None,
                total_qty: Some(5.0),
                alt_upc1: Some("".into()),
                alt_upc2: None,
            }
        );
    }
    #[test]
    fn unmatched_rows_are_dropped_in_order() {
        let table = vec![entry("b", "B", "1"), entry("d", "D", "2"), entry("a", "A", "3")]
            .into_iter()
            .collect::<MappingTable>();
        let recs = ["a", "x", "b", "c", "d", "a"].map(record);
        let (out, summary) = join(&table, &recs);
        let keys = out.iter().map(|r| r.store_item_id.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["a", "b", "d", "a"]);
        assert_eq!(summary, JoinSummary { matched: 4, unmatched: 2 });
        assert!(out.len() <= recs.len());
        assert!(out.iter().all(|r| table.contains_key(&r.store_item_id)));
    }
    #[test]
    fn record_without_key_never_joins() {
        let table = std::iter::once(entry("", "E", "0")).collect::<MappingTable>();
        let (out, _) = join(&table, &[SourceRecord::default()]);
        assert!(out.is_empty());
    }
    #[test]
    fn join_fixture_files() {
        let table = MappingTable::from_csv_path(TEST_MAPPINGS).unwrap();
        let recs = parse_export(TEST_EXPORT, &ColumnLayout::winepos(), HeaderPolicy::Parse);
        let (out, summary) = join(&table, &recs);
        assert_eq!(summary, JoinSummary { matched: 4, unmatched: 2 });
        let keys = out.iter().map(|r| r.store_item_id.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["101", "103", "104", "105"]);
        // 103 carries a non numeric on hand value, 104 is a short row
        assert_eq!(out[1].total_qty, None);
        assert_eq!(out[2].alt_upc2, None);
        assert_eq!(out[3].product_id.as_deref(), Some("P5"));
        assert_eq!(out[3].total_qty, Some(12.0));
    }
    #[test]
    fn serializes_with_consumer_keys() {
        let table = std::iter::once(entry("101", "P1", "UPC1")).collect::<MappingTable>();
        let layout = ColumnLayout::winepos();
        let recs = vec![SourceRecord::from_line("101,WineA,,,,,,9.99,,,,x", &layout)];
        let (out, _) = join(&table, &recs);
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"[{"productId":"P1","upc":"UPC1","storeItemId":"101","#,
                r#""prodName":"WineA","price":"9.99","totalQty":null}]"#
            )
        );
    }
    #[test]
    fn whole_quantities_serialize_as_integers() {
        let table = std::iter::once(entry("101", "P1", "UPC1")).collect::<MappingTable>();
        let layout = ColumnLayout::winepos();
        let recs = ["101,,,,,,,,,,,5", "101,,,,,,,,,,,3.5", "101,,,,,,,,,,,"]
            .map(|line| SourceRecord::from_line(line, &layout));
        let (out, _) = join(&table, &recs);
        let qty = out
            .iter()
            .map(|r| serde_json::to_value(r).unwrap()["totalQty"].to_string())
            .collect::<Vec<_>>();
        assert_eq!(qty, vec!["5", "3.5", "0"]);
    }
    #[test]
    fn mapping_without_upc_leaves_it_out() {
        let table = MappingTable::from_csv_bytes(b"item_num,id\n101,P1\n").unwrap();
        let recs = vec![SourceRecord::from_line("101,WineA", &ColumnLayout::winepos())];
        let (out, summary) = join(&table, &recs);
        assert_eq!(summary, JoinSummary { matched: 1, unmatched: 0 });
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["productId"], "P1");
        assert!(json.get("upc").is_none());
    }
}
