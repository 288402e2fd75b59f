use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Item as returned by the QBO query API. Only the fields we export are
/// modelled; everything is optional because the vendor omits empty values.
/// A field of an unexpected JSON type reads as absent instead of failing the
/// whole page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "Type", default, deserialize_with = "lenient_string")]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_price: Option<Amount>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub qty_on_hand: Option<Amount>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fully_qualified_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_meta_data")]
    pub meta_data: Option<MetaData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetaData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_updated_time: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    })
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<Amount>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => Some(Amount::Number(n)),
        Value::String(s) if !s.is_empty() => Some(Amount::Text(s)),
        _ => None,
    })
}

fn lenient_meta_data<'de, D>(deserializer: D) -> Result<Option<MetaData>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

/// Price or quantity exactly as the vendor sent it, so `275` is written back
/// as `275` and a quoted `"12.50"` as `12.50`.
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    Number(serde_json::Number),
    Text(String),
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Amount::Number(n) => n.serialize(serializer),
            Amount::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<i64> for Amount {
    fn from(n: i64) -> Self {
        Amount::Number(n.into())
    }
}

pub const INVENTORY_TYPE: &str = "Inventory";

/// Stock level column. Non-inventory items get `N/A` instead of a zero so
/// nobody reads a stock count into a service line.
#[derive(Debug, Clone, PartialEq)]
pub enum QtyOnHand {
    Count(Amount),
    Unknown,
    NotApplicable,
}

impl Serialize for QtyOnHand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QtyOnHand::Count(qty) => qty.serialize(serializer),
            QtyOnHand::Unknown => serializer.serialize_str(""),
            QtyOnHand::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

/// Normalized item row; field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecord {
    #[serde(rename = "QBO_ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub item_type: String,
    #[serde(rename = "Active")]
    pub active: bool,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Unit_Price")]
    pub unit_price: Option<Amount>,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Qty_On_Hand")]
    pub qty_on_hand: QtyOnHand,
    #[serde(rename = "Full_Name")]
    pub full_name: String,
    #[serde(rename = "Last_Modified")]
    pub last_modified: String,
}

pub const COLUMNS: [&str; 10] = [
    "QBO_ID",
    "Name",
    "Type",
    "Active",
    "Description",
    "Unit_Price",
    "SKU",
    "Qty_On_Hand",
    "Full_Name",
    "Last_Modified",
];

impl From<RawItem> for ItemRecord {
    fn from(raw: RawItem) -> Self {
        let name = raw.name.unwrap_or_default();
        let item_type = raw.item_type.unwrap_or_default();
        let qty_on_hand = if item_type == INVENTORY_TYPE {
            raw.qty_on_hand.map_or(QtyOnHand::Unknown, QtyOnHand::Count)
        } else {
            QtyOnHand::NotApplicable
        };

        Self {
            id: raw.id.unwrap_or_default(),
            full_name: raw.fully_qualified_name.unwrap_or_else(|| name.clone()),
            name,
            item_type,
            active: raw.active.unwrap_or(true),
            description: raw.description.unwrap_or_default(),
            unit_price: raw.unit_price,
            sku: raw.sku.unwrap_or_default(),
            qty_on_hand,
            last_modified: raw
                .meta_data
                .and_then(|m| m.last_updated_time)
                .unwrap_or_default(),
        }
    }
}

pub fn normalize(items: Vec<RawItem>) -> Vec<ItemRecord> {
    items.into_iter().map(ItemRecord::from).collect()
}
