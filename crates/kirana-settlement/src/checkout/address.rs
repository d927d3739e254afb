//! Shipping address.

use crate::error::SettlementError;
use serde::{Deserialize, Serialize};

/// A postal address for delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Recipient name.
    pub recipient: String,
    /// Address line 1.
    pub line1: String,
    /// Address line 2 (apt, floor, landmark).
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// State/province.
    pub state: Option<String>,
    /// Postal/PIN code.
    pub postal_code: String,
    /// Country name.
    pub country: String,
    /// Phone number.
    pub phone: Option<String>,
}

impl Address {
    /// Create a new address.
    pub fn new(
        recipient: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            line1: line1.into(),
            line2: None,
            city: city.into(),
            state: None,
            postal_code: postal_code.into(),
            country: country.into(),
            phone: None,
        }
    }

    /// Check if all required fields are filled.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Reject a malformed address before any store access.
    pub fn validate(&self) -> Result<(), SettlementError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SettlementError::InvalidAddress(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.recipient.trim().is_empty() {
            missing.push("recipient");
        }
        if self.line1.trim().is_empty() {
            missing.push("line1");
        }
        if self.city.trim().is_empty() {
            missing.push("city");
        }
        if self.postal_code.trim().is_empty() {
            missing.push("postal code");
        }
        if self.country.trim().is_empty() {
            missing.push("country");
        }
        missing
    }

    /// Format as a single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.clone()];
        if let Some(ref line2) = self.line2 {
            parts.push(line2.clone());
        }
        parts.push(self.city.clone());
        if let Some(ref state) = self.state {
            parts.push(state.clone());
        }
        parts.push(self.postal_code.clone());
        parts.push(self.country.clone());
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_address() {
        let address = Address::new("A. Rao", "12 MG Road", "Bengaluru", "560001", "India");
        assert!(address.is_complete());
        assert!(address.validate().is_ok());
    }

    #[test]
    fn test_incomplete_address_names_fields() {
        let address = Address::new("A. Rao", "", "Bengaluru", "", "India");
        let err = address.validate().unwrap_err();
        match err {
            SettlementError::InvalidAddress(message) => {
                assert!(message.contains("line1"));
                assert!(message.contains("postal code"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_one_line() {
        let mut address = Address::new("A. Rao", "12 MG Road", "Bengaluru", "560001", "India");
        address.line2 = Some("3rd floor".to_string());
        assert_eq!(
            address.one_line(),
            "12 MG Road, 3rd floor, Bengaluru, 560001, India"
        );
    }
}
