//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    PostOffice,
    Courier,
    Address,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::PostOffice => "post_office",
            DeliveryType::Courier => "courier",
            DeliveryType::Address => "address",
        }
    }

    /// Parses the wire name, returning `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "post_office" => Some(DeliveryType::PostOffice),
            "courier" => Some(DeliveryType::Courier),
            "address" => Some(DeliveryType::Address),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated customer contact details.
///
/// Either `full_name` is set, or both `first_name` and `last_name` are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CustomerInfo {
    /// Name to address the customer by.
    pub fn display_name(&self) -> String {
        if !self.full_name.is_empty() {
            return self.full_name.clone();
        }
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            _ => self.last_name.clone(),
        }
    }
}

/// Validated delivery details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    #[serde(rename = "type")]
    pub delivery_type: DeliveryType,
    pub country: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_office: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(full: &str, first: &str, last: &str) -> CustomerInfo {
        CustomerInfo {
            first_name: first.into(),
            last_name: last.into(),
            full_name: full.into(),
            phone: "+380501112233".into(),
            email: None,
        }
    }

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(customer("Ivan Petrenko", "X", "Y").display_name(), "Ivan Petrenko");
        assert_eq!(customer("", "Ivan", "Petrenko").display_name(), "Ivan Petrenko");
    }

    #[test]
    fn delivery_type_round_trips_through_wire_names() {
        for delivery in [
            DeliveryType::PostOffice,
            DeliveryType::Courier,
            DeliveryType::Address,
        ] {
            assert_eq!(DeliveryType::parse(delivery.as_str()), Some(delivery));
        }
        assert_eq!(DeliveryType::parse("pickup"), None);
    }

    #[test]
    fn delivery_info_uses_type_key() {
        let info = DeliveryInfo {
            delivery_type: DeliveryType::PostOffice,
            country: "UA".into(),
            city: "Kyiv".into(),
            address: None,
            post_office: Some("12".into()),
            instructions: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "post_office");
        assert_eq!(json["postOffice"], "12");
        assert!(json.get("address").is_none());
    }
}
