use serde::{Deserialize, Serialize};

/// A shop client (`/clients/`). Named `Customer` to avoid confusion with the
/// HTTP client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning client id
    #[serde(default)]
    pub client: Option<i64>,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub plate_number: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub mileage: Option<u32>,
}

impl Vehicle {
    /// "2014 Toyota Corolla"
    pub fn description(&self) -> String {
        let mut parts = Vec::new();
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        if !self.make.is_empty() {
            parts.push(self.make.clone());
        }
        if !self.model.is_empty() {
            parts.push(self.model.clone());
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_description() {
        let vehicle = Vehicle {
            make: "Toyota".into(),
            model: "Corolla".into(),
            year: Some(2014),
            ..Default::default()
        };
        assert_eq!(vehicle.description(), "2014 Toyota Corolla");

        let partial = Vehicle {
            make: "Ford".into(),
            ..Default::default()
        };
        assert_eq!(partial.description(), "Ford");
    }

    #[test]
    fn test_customer_full_name_trims() {
        let customer = Customer {
            first_name: "Grace".into(),
            ..Default::default()
        };
        assert_eq!(customer.full_name(), "Grace");
    }

    #[test]
    fn test_new_customer_omits_id() {
        let json = serde_json::to_value(Customer {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(json.get("id").is_none());
    }
}
