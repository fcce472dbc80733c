use crate::pna::result::LayoutError;
use std::collections::HashMap;

/// Named columns consumed from a WinePoS export row.
///
/// The export has 63+ columns, only these carry anything the join needs or
/// passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ItemNum,
    Descr,
    Vintage,
    SizeDescr,
    CaseQty,
    UnitPrice,
    ShlfPrice,
    PackQty,
    WcShlfprce,
    OnHand,
    NComparableData,
    TaxFlag,
    SalePrice,
    CaseSalePrice,
    InvoiceCostBottle,
    SaleType,
    PackSalePrice,
    WebUnitSalePrice,
    FullBarcode,
}
impl Field {
    /// Column name as it appears in the WinePoS documentation.
    pub fn name(&self) -> &'static str {
        match self {
            Field::ItemNum => "item_num",
            Field::Descr => "descr",
            Field::Vintage => "vintage",
            Field::SizeDescr => "size_descr",
            Field::CaseQty => "case_qty",
            Field::UnitPrice => "unit_price",
            Field::ShlfPrice => "shlf_price",
            Field::PackQty => "pack_qty",
            Field::WcShlfprce => "wc_shlfprce",
            Field::OnHand => "on_hand",
            Field::NComparableData => "n_comparable_data",
            Field::TaxFlag => "tax_flag",
            Field::SalePrice => "sale_price",
            Field::CaseSalePrice => "case_sale_price",
            Field::InvoiceCostBottle => "invoice_cost_bottle",
            Field::SaleType => "sale_type",
            Field::PackSalePrice => "pack_sale_price",
            Field::WebUnitSalePrice => "web_unit_sale_price",
            Field::FullBarcode => "full_barcode",
        }
    }
}

/// Zero based column index of every [`Field`] in a WinePoS export.
const WINEPOS_COLUMNS: [(Field, usize); 19] = [
    (Field::ItemNum, 0),
    (Field::Descr, 1),
    (Field::Vintage, 2),
    (Field::SizeDescr, 4),
    (Field::CaseQty, 6),
    (Field::UnitPrice, 7),
    (Field::ShlfPrice, 8),
    (Field::PackQty, 9),
    (Field::WcShlfprce, 10),
    (Field::OnHand, 11),
    (Field::NComparableData, 12),
    (Field::TaxFlag, 18),
    (Field::SalePrice, 19),
    (Field::CaseSalePrice, 20),
    (Field::InvoiceCostBottle, 38),
    (Field::SaleType, 39),
    (Field::PackSalePrice, 40),
    (Field::WebUnitSalePrice, 48),
    (Field::FullBarcode, 62),
];

/// Maps each [`Field`] to the column it is read from.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    columns: Vec<(Field, usize)>,
}
impl ColumnLayout {
    /// The layout of the WinePoS PnA export.
    pub fn winepos() -> Self {
        Self::new(WINEPOS_COLUMNS.to_vec())
    }
    pub fn new(columns: Vec<(Field, usize)>) -> Self {
        Self { columns }
    }
    /// Returns the column index of `field`, `None` if the layout omits it.
    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, idx)| *idx)
    }
    /// Number of columns a row needs for every field to be present.
    pub fn width(&self) -> usize {
        self.columns
            .iter()
            .map(|(_, idx)| idx + 1)
            .max()
            .unwrap_or(0)
    }
    /// Errors if two fields share a column, or a field is listed twice.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut by_index: HashMap<usize, Field> = HashMap::new();
        let mut seen: Vec<Field> = Vec::with_capacity(self.columns.len());
        for (field, idx) in &self.columns {
            if seen.contains(field) {
                return Err(LayoutError::DuplicateField(field.name()));
            }
            seen.push(*field);
            if let Some(first) = by_index.insert(*idx, *field) {
                return Err(LayoutError::DuplicateIndex {
                    index: *idx,
                    first: first.name(),
                    second: field.name(),
                });
            }
        }
        Ok(())
    }
}
impl Default for ColumnLayout {
    fn default() -> Self {
        Self::winepos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winepos_layout_is_valid() {
        let layout = ColumnLayout::winepos();
        layout.validate().unwrap();
        assert_eq!(layout.width(), 63);
        assert_eq!(layout.index_of(Field::OnHand), Some(11));
        assert_eq!(layout.index_of(Field::WebUnitSalePrice), Some(48));
    }
    #[test]
    fn shared_column_is_rejected() {
        let layout = ColumnLayout::new(vec![(Field::ItemNum, 0), (Field::Descr, 0)]);
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::DuplicateIndex { index: 0, .. })
        ));
    }
    #[test]
    fn repeated_field_is_rejected() {
        let layout = ColumnLayout::new(vec![(Field::ItemNum, 0), (Field::ItemNum, 3)]);
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::DuplicateField("item_num"))
        ));
    }
}
