//! Address form shared by checkout and the account address book.

use serde::Deserialize;

use crate::commerce::{Address, AddressInput};

/// Address fields as posted by a form (and used to prefill one).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AddressForm {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country_code: String,
    pub phone: String,
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl AddressForm {
    /// Validate required fields and convert to mutation input.
    ///
    /// # Errors
    ///
    /// Returns a message naming the missing fields.
    pub fn to_input(&self) -> Result<AddressInput, String> {
        let required = [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("address", &self.address_1),
            ("city", &self.city),
            ("postal code", &self.postal_code),
            ("country", &self.country_code),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(label, _)| *label)
            .collect();
        if !missing.is_empty() {
            return Err(format!("Please fill in: {}.", missing.join(", ")));
        }

        Ok(AddressInput {
            first_name: optional(&self.first_name),
            last_name: optional(&self.last_name),
            company: optional(&self.company),
            address_1: optional(&self.address_1),
            address_2: optional(&self.address_2),
            city: optional(&self.city),
            province: optional(&self.province),
            postal_code: optional(&self.postal_code),
            country_code: optional(&self.country_code).map(|c| c.to_ascii_lowercase()),
            phone: optional(&self.phone),
        })
    }
}

impl From<&Address> for AddressForm {
    fn from(address: &Address) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            first_name: text(&address.first_name),
            last_name: text(&address.last_name),
            company: text(&address.company),
            address_1: text(&address.address_1),
            address_2: text(&address.address_2),
            city: text(&address.city),
            province: text(&address.province),
            postal_code: text(&address.postal_code),
            country_code: text(&address.country_code),
            phone: text(&address.phone),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete() -> AddressForm {
        AddressForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            address_1: " 12 St James's Square ".to_string(),
            city: "London".to_string(),
            postal_code: "SW1Y 4JH".to_string(),
            country_code: "GB".to_string(),
            ..AddressForm::default()
        }
    }

    #[test]
    fn test_to_input_trims_and_drops_blanks() {
        let input = complete().to_input().unwrap();
        assert_eq!(input.address_1.as_deref(), Some("12 St James's Square"));
        assert_eq!(input.country_code.as_deref(), Some("gb"));
        assert_eq!(input.company, None);
        assert_eq!(input.phone, None);
    }

    #[test]
    fn test_to_input_names_missing_fields() {
        let form = AddressForm {
            city: String::new(),
            postal_code: "  ".to_string(),
            ..complete()
        };
        assert_eq!(
            form.to_input().unwrap_err(),
            "Please fill in: city, postal code."
        );
    }

    #[test]
    fn test_prefill_from_address() {
        let address = Address {
            first_name: Some("Ada".to_string()),
            city: Some("London".to_string()),
            ..Address::default()
        };
        let form = AddressForm::from(&address);
        assert_eq!(form.first_name, "Ada");
        assert_eq!(form.city, "London");
        assert!(form.last_name.is_empty());
    }
}
