//! Encoding of normalized records for the store update consumer.

use crate::pna::join::{NormalizedRecord, NORMALIZED_COLUMNS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unable to encode records as json")]
    Json(#[from] serde_json::Error),
    #[error("Unable to encode records as csv")]
    Csv(#[from] csv::Error),
    #[error("Csv writer could not be flushed")]
    Flush(#[from] csv::IntoInnerError<csv::Writer<Vec<u8>>>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A JSON array of records.
    #[default]
    Json,
    /// A header row of the record keys followed by one row per record,
    /// CRLF terminated. Missing values are empty cells.
    Csv,
}
impl OutputFormat {
    /// Encodes `records`. The same records always encode to the same bytes.
    pub fn encode(&self, records: &[NormalizedRecord]) -> Result<Vec<u8>, EncodeError> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_vec(records)?),
            OutputFormat::Csv => encode_csv(records),
        }
    }
}

fn encode_csv(records: &[NormalizedRecord]) -> Result<Vec<u8>, EncodeError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    wtr.write_record(NORMALIZED_COLUMNS)?;
    for rec in records {
        let qty = rec.total_qty.map(|q| q.to_string()).unwrap_or_default();
        wtr.write_record([
            rec.product_id.as_deref().unwrap_or_default(),
            rec.upc.as_deref().unwrap_or_default(),
            rec.store_item_id.as_str(),
            rec.prod_name.as_deref().unwrap_or_default(),
            rec.price.as_deref().unwrap_or_default(),
            rec.sale_price.as_deref().unwrap_or_default(),
            qty.as_str(),
            rec.alt_upc1.as_deref().unwrap_or_default(),
            rec.alt_upc2.as_deref().unwrap_or_default(),
        ])?;
    }
    Ok(wtr.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NormalizedRecord {
        NormalizedRecord {
            product_id: Some("P1".into()),
            upc: Some("UPC1".into()),
            store_item_id: "101".into(),
            prod_name: Some("Wine, Red".into()),
            price: Some("9.99".into()),
            sale_price: None,
            total_qty: Some(5.0),
            alt_upc1: Some("0001".into()),
            alt_upc2: None,
        }
    }

    #[test]
    fn empty_json_array() {
        assert_eq!(OutputFormat::Json.encode(&[]).unwrap(), b"[]");
    }
    #[test]
    fn csv_has_header_and_quoting() {
        let out = OutputFormat::Csv.encode(&[record()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "productId,upc,storeItemId,prodName,price,salePrice,totalQty,altUPC1,altUPC2\r\n\
             P1,UPC1,101,\"Wine, Red\",9.99,,5,0001,\r\n"
        );
    }
    #[test]
    fn encoding_is_deterministic() {
        let recs = vec![record(), record()];
        for format in [OutputFormat::Json, OutputFormat::Csv] {
            assert_eq!(format.encode(&recs).unwrap(), format.encode(&recs).unwrap());
        }
    }
}
