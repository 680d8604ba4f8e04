/// Represents a customer order as shown on the board.
///
/// Orders arrive as raw JSON records keyed by [`OrderId`] inside a
/// [`Snapshot`](crate::model::Snapshot). [`Order::from_record`] turns a record
/// into a validated `Order`; anything it rejects surfaces as a
/// [`MalformedOrderError`].
///
/// Field names follow the backend's wire format (`type_service`,
/// `total_price`, `delivery_fee_waived`, ...).
use crate::reconciler::MalformedOrderError;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;

/// Type-safe identifier for Orders.
///
/// Assigned by the backend (the key of the record in the collection) and never
/// reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an order. Only the backend mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "new" | "nouvelle" => Some(OrderStatus::Pending),
            "completed" | "done" | "ready" | "terminee" | "terminée" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

/// How the customer receives the order. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceType {
    Delivery,
    Takeaway,
    DineIn,
    #[default]
    Unspecified,
}

impl ServiceType {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Delivery => "Delivery",
            ServiceType::Takeaway => "Takeaway",
            ServiceType::DineIn => "Dine-in",
            ServiceType::Unspecified => "Unspecified",
        }
    }

    /// Wire value written back by [`Order::to_record`].
    pub fn wire_label(&self) -> &'static str {
        match self {
            ServiceType::Delivery => "Livraison",
            ServiceType::Takeaway => "À emporter",
            ServiceType::DineIn => "Sur place",
            ServiceType::Unspecified => "Non spécifié",
        }
    }
}

impl From<&str> for ServiceType {
    fn from(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "livraison" | "delivery" => ServiceType::Delivery,
            "à emporter" | "a emporter" | "emporter" | "takeaway" | "take-away" => {
                ServiceType::Takeaway
            }
            "sur place" | "dine-in" | "dine in" => ServiceType::DineIn,
            _ => ServiceType::Unspecified,
        }
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    /// Price of the whole line (unit price times quantity).
    #[serde(rename = "total_price")]
    pub unit_total: f64,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_total: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: OrderStatus,
    #[serde(rename = "type_service", default, deserialize_with = "deserialize_service_type")]
    pub service_type: ServiceType,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    #[serde(default)]
    pub delivery_fee: f64,
    #[serde(default)]
    pub delivery_fee_waived: bool,
    pub total: f64,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Order {
    /// Creates a pending, unspecified-service order with no delivery metadata.
    ///
    /// # Arguments
    /// * `timestamp` - Creation time, the board's sort key
    /// * `items` - Order lines
    /// * `total` - Amount due; also used as the subtotal
    pub fn new(timestamp: DateTime<Utc>, items: Vec<LineItem>, total: f64) -> Self {
        Self {
            timestamp,
            status: OrderStatus::Pending,
            service_type: ServiceType::Unspecified,
            items,
            subtotal: total,
            delivery_fee: 0.0,
            delivery_fee_waived: false,
            total,
            phone_number: None,
            formatted_address: None,
            delivery_address: None,
            distance_km: None,
            notes: None,
        }
    }

    /// Decodes and validates one snapshot record.
    pub fn from_record(id: &OrderId, record: &Value) -> Result<Self, MalformedOrderError> {
        if !record.is_object() {
            return Err(MalformedOrderError::NotAnObject { id: id.clone() });
        }
        let order = Order::deserialize(record).map_err(|e| MalformedOrderError::Decode {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        order.validate(id)?;
        Ok(order)
    }

    fn validate(&self, id: &OrderId) -> Result<(), MalformedOrderError> {
        let invalid = |field: &'static str, problem: &str| MalformedOrderError::InvalidField {
            id: id.clone(),
            field,
            problem: problem.to_string(),
        };

        for (field, amount) in [
            ("subtotal", self.subtotal),
            ("delivery_fee", self.delivery_fee),
            ("total", self.total),
        ] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(invalid(field, "must be a non-negative amount"));
            }
        }
        if let Some(distance) = self.distance_km {
            if !distance.is_finite() || distance < 0.0 {
                return Err(invalid("distance_km", "must be a non-negative distance"));
            }
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(invalid("items", "quantity must be at least 1"));
            }
            if !item.unit_total.is_finite() || item.unit_total < 0.0 {
                return Err(invalid("items", "line total must be a non-negative amount"));
            }
        }
        Ok(())
    }

    /// Delivery address to display; the geocoded form wins over the raw one.
    pub fn address(&self) -> Option<&str> {
        self.formatted_address
            .as_deref()
            .or(self.delivery_address.as_deref())
            .filter(|a| !a.trim().is_empty())
    }

    pub fn is_delivery(&self) -> bool {
        self.service_type == ServiceType::Delivery
    }

    /// Encodes the order back into its wire record.
    pub fn to_record(&self) -> Value {
        let items: Vec<Value> = self
            .items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "quantity": item.quantity,
                    "total_price": item.unit_total,
                })
            })
            .collect();

        let mut record = json!({
            "timestamp": self.timestamp.to_rfc3339(),
            "status": self.status.as_str(),
            "type_service": self.service_type.wire_label(),
            "items": items,
            "subtotal": self.subtotal,
            "delivery_fee": self.delivery_fee,
            "delivery_fee_waived": self.delivery_fee_waived,
            "total": self.total,
        });
        if let Value::Object(fields) = &mut record {
            let optional = [
                ("phone_number", self.phone_number.clone().map(Value::from)),
                ("formatted_address", self.formatted_address.clone().map(Value::from)),
                ("delivery_address", self.delivery_address.clone().map(Value::from)),
                ("distance_km", self.distance_km.map(Value::from)),
                ("notes", self.notes.clone().map(Value::from)),
            ];
            for (key, value) in optional {
                if let Some(value) = value {
                    fields.insert(key.to_string(), value);
                }
            }
        }
        record
    }
}

// =============================================================================
// WIRE HELPERS
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
}

/// Parses the textual timestamp forms the backend has been seen to write.
///
/// RFC 3339 first, then naive ISO-8601 (no offset) read as the board's local
/// time, the way the kitchen tablets write it. A naive time falling in a DST
/// gap is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?;
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc));
    Some(local.unwrap_or_else(|| Utc.from_utc_datetime(&naive)))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let millis = match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(ms) => ms,
        RawTimestamp::FractionalMillis(ms) if ms.is_finite() => ms as i64,
        RawTimestamp::FractionalMillis(_) => {
            return Err(D::Error::custom("timestamp is not a finite number"));
        }
        RawTimestamp::Text(text) => {
            return parse_timestamp(&text)
                .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp `{text}`")));
        }
    };
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| D::Error::custom(format!("timestamp {millis} out of range")))
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<OrderStatus, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<String>::deserialize(deserializer)? {
        None => Ok(OrderStatus::Pending),
        Some(raw) => OrderStatus::parse(&raw)
            .ok_or_else(|| D::Error::custom(format!("unknown status `{raw}`"))),
    }
}

fn deserialize_service_type<'de, D>(deserializer: D) -> Result<ServiceType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|raw| ServiceType::from(raw.as_str()))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Value {
        json!({
            "timestamp": "2024-03-01T12:30:00",
            "type_service": "Livraison",
            "items": [{"name": "Menu Curry", "quantity": 2, "total_price": 17.8}],
            "subtotal": 17.8,
            "delivery_fee": 2.5,
            "total": 20.3,
            "phone_number": "0600000000",
            "delivery_address": "1 rue de Paris",
            "formatted_address": "1 Rue de Paris, 28100 Dreux",
            "distance_km": 1.4
        })
    }

    #[test]
    fn test_decodes_wire_record() {
        let id = OrderId::from("-Nabc");
        let order = Order::from_record(&id, &record()).expect("valid record");

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.service_type, ServiceType::Delivery);
        assert_eq!(order.items, vec![LineItem::new("Menu Curry", 2, 17.8)]);
        assert_eq!(order.address(), Some("1 Rue de Paris, 28100 Dreux"));
        assert_eq!(order.timestamp, local(2024, 3, 1, 12, 30));
    }

    fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T13:30:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);

        let wall_clock = local(2024, 3, 1, 12, 30);
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(wall_clock));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00.000"), Some(wall_clock));

        let mut raw = record();
        raw["timestamp"] = json!(expected.timestamp_millis());
        let order = Order::from_record(&OrderId::from("a"), &raw).unwrap();
        assert_eq!(order.timestamp, expected);
    }

    #[test]
    fn test_status_and_service_aliases() {
        let mut raw = record();
        raw["status"] = json!("Terminée");
        raw["type_service"] = json!("Sur place");
        let order = Order::from_record(&OrderId::from("a"), &raw).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.service_type, ServiceType::DineIn);

        raw["type_service"] = json!("drive-through");
        let order = Order::from_record(&OrderId::from("a"), &raw).unwrap();
        assert_eq!(order.service_type, ServiceType::Unspecified);
    }

    #[test]
    fn test_rejects_missing_items() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("items");
        let err = Order::from_record(&OrderId::from("broken"), &raw).unwrap_err();
        assert!(matches!(err, MalformedOrderError::Decode { .. }));
        assert_eq!(err.order_id(), &OrderId::from("broken"));
        assert!(err.to_string().contains("items"), "unexpected message: {err}");
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut raw = record();
        raw["status"] = json!("lost");
        assert!(Order::from_record(&OrderId::from("a"), &raw).is_err());

        let mut raw = record();
        raw["total"] = json!(-1.0);
        let err = Order::from_record(&OrderId::from("a"), &raw).unwrap_err();
        assert!(matches!(err, MalformedOrderError::InvalidField { field: "total", .. }));

        let mut raw = record();
        raw["items"][0]["quantity"] = json!(0);
        assert!(Order::from_record(&OrderId::from("a"), &raw).is_err());

        let err = Order::from_record(&OrderId::from("a"), &json!("order")).unwrap_err();
        assert!(matches!(err, MalformedOrderError::NotAnObject { .. }));
    }

    #[test]
    fn test_record_encoding_decodes_to_same_order() {
        let id = OrderId::from("a");
        let order = Order::from_record(&id, &record()).unwrap();
        let again = Order::from_record(&id, &order.to_record()).unwrap();
        assert_eq!(order, again);
    }
}
