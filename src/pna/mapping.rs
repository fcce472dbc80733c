use crate::pna::result::{MappingError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

const ITEM_KEY: &str = "item_num";
const CANONICAL_ID: &str = "id";
const UPC: &str = "upc";

/// A single row from the product mapping file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub item_num: String,
    /// `None` when the file has no `id` column.
    pub id: Option<String>,
    /// `None` when the file has no `upc` column.
    pub upc: Option<String>,
    /// Every column of the row, keyed by header name.
    pub attributes: BTreeMap<String, String>,
}

/// Product mappings keyed by the store's item number.
///
/// Built once per run and never mutated afterwards.
#[derive(Debug, Default, Clone)]
pub struct MappingTable {
    entries: HashMap<String, MappingEntry>,
}
impl MappingTable {
    /// Reads a mapping csv with a header row.
    ///
    /// Only `item_num` is required; `id` and `upc` are read when present.
    ///
    /// # Errors
    ///
    /// Fails the whole load if the header lacks `item_num`, a row has an
    /// empty `item_num`, or a row cannot be read as csv (wrong field count,
    /// bad UTF-8). No partial table is returned.
    pub fn from_csv_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(rdr);
        let header = csv_reader.headers()?.clone();
        let column = |name: &str| header.iter().position(|h| h.trim() == name);
        let key_col = column(ITEM_KEY).ok_or(MappingError::MissingColumn(ITEM_KEY))?;
        let id_col = column(CANONICAL_ID);
        let upc_col = column(UPC);

        let mut table = MappingTable::default();
        for wrapped_record in csv_reader.into_records() {
            let record = wrapped_record?;
            let item_num = record.get(key_col).unwrap_or_default();
            if item_num.is_empty() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(MappingError::MissingItemKey { line });
            }
            let attributes = header
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>();
            table.insert(MappingEntry {
                item_num: item_num.to_string(),
                id: id_col.and_then(|idx| record.get(idx)).map(str::to_string),
                upc: upc_col.and_then(|idx| record.get(idx)).map(str::to_string),
                attributes,
            });
        }
        Ok(table)
    }
    /// Convenience wrapper around [`MappingTable::from_csv_reader`] for bytes
    /// fetched from object storage.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_csv_reader(bytes)
    }
    pub fn from_csv_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        Self::from_csv_reader(file)
    }
    /// Inserts an entry, replacing any earlier entry with the same key.
    fn insert(&mut self, entry: MappingEntry) {
        self.entries.insert(entry.item_num.clone(), entry);
    }
    pub fn get(&self, item_num: &str) -> Option<&MappingEntry> {
        self.entries.get(item_num)
    }
    pub fn contains_key(&self, item_num: &str) -> bool {
        self.entries.contains_key(item_num)
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
impl FromIterator<MappingEntry> for MappingTable {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        let mut table = MappingTable::default();
        iter.into_iter().for_each(|entry| table.insert(entry));
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    static TEST_MAPPINGS: &str = "tests/data/productmappings.csv";

    #[test]
    fn load_mapping_csv() {
        let table = MappingTable::from_csv_path(TEST_MAPPINGS).unwrap();
        assert_eq!(table.len(), 5);
        let entry = table.get("101").unwrap();
        assert_eq!(entry.id.as_deref(), Some("P1"));
        assert_eq!(entry.upc.as_deref(), Some("UPC1"));
        assert_eq!(entry.attributes.get("name").map(String::as_str), Some("Wine A"));
        assert!(!table.contains_key("102"));
    }
    #[test]
    fn duplicate_key_last_write_wins() {
        let table = MappingTable::from_csv_path(TEST_MAPPINGS).unwrap();
        let entry = table.get("105").unwrap();
        assert_eq!(entry.id.as_deref(), Some("P5"));
        assert_eq!(entry.upc.as_deref(), Some("UPC5"));
    }
    #[test]
    fn malformed_row_fails_whole_load() {
        let err = MappingTable::from_csv_path("tests/data/MalformedMappings.csv").unwrap_err();
        assert!(matches!(err, MappingError::Csv(_)));
    }
    #[test]
    fn blank_item_key_fails_load() {
        let err = MappingTable::from_csv_path("tests/data/BlankKeyMappings.csv").unwrap_err();
        assert!(matches!(err, MappingError::MissingItemKey { line: 3 }));
    }
    #[test]
    fn only_item_key_is_required() {
        let table = MappingTable::from_csv_path("tests/data/NoUpcMappings.csv").unwrap();
        let entry = table.get("101").unwrap();
        assert_eq!(entry.id.as_deref(), Some("P1"));
        assert_eq!(entry.upc, None);

        let table = MappingTable::from_csv_bytes(b"item_num,name\n101,Wine\n").unwrap();
        let entry = table.get("101").unwrap();
        assert_eq!((entry.id.as_deref(), entry.upc.as_deref()), (None, None));
        assert_eq!(entry.attributes.get("name").map(String::as_str), Some("Wine"));
    }
    #[test]
    fn missing_item_key_column_fails_load() {
        let err = MappingTable::from_csv_bytes(b"id,upc\nP1,UPC1\n").unwrap_err();
        assert!(matches!(err, MappingError::MissingColumn("item_num")));
    }
    #[test]
    fn missing_file_is_an_error() {
        assert!(MappingTable::from_csv_path("tests/data/does-not-exist.csv").is_err());
    }
    #[test]
    fn header_only_is_an_empty_table() {
        let table = MappingTable::from_csv_bytes(b"item_num,id,upc\n").unwrap();
        assert!(table.is_empty());
    }
}
