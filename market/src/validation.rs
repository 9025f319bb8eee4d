//! Parsing of raw listing fields.

use crate::error::{MarketError, Result};
use crate::types::{ListingChanges, ListingInput, ListingPatch};

/// A required text field, trimmed.
///
/// # Errors
///
/// [`MarketError::MissingField`] if blank.
pub fn required(value: &str, field: &'static str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MarketError::MissingField { field });
    }
    Ok(value.to_string())
}

/// Parse a stock quantity. Stock only reaches zero through orders.
///
/// # Errors
///
/// [`MarketError::InvalidQuantity`] unless the text is a positive whole
/// number in range.
pub fn parse_quantity(raw: &str) -> Result<u32> {
    let quantity: u32 = raw.trim().parse().map_err(|_| MarketError::InvalidQuantity)?;
    if quantity == 0 {
        return Err(MarketError::InvalidQuantity);
    }
    Ok(quantity)
}

/// Parse a unit price.
///
/// # Errors
///
/// [`MarketError::InvalidPrice`] unless the text is a positive finite number.
///
/// # Examples
///
/// ```
/// use bazaar_market::validation::parse_price;
///
/// assert_eq!(parse_price(" 12.50 "), Ok(12.5));
/// assert!(parse_price("0").is_err());
/// assert!(parse_price("inf").is_err());
/// assert!(parse_price("twelve").is_err());
/// ```
pub fn parse_price(raw: &str) -> Result<f64> {
    let price: f64 = raw.trim().parse().map_err(|_| MarketError::InvalidPrice)?;
    if !price.is_finite() || price <= 0.0 {
        return Err(MarketError::InvalidPrice);
    }
    Ok(price)
}

/// Check a search bound.
///
/// # Errors
///
/// [`MarketError::InvalidPrice`] for negative or non-finite bounds.
pub fn check_bound(bound: Option<f64>) -> Result<Option<f64>> {
    match bound {
        Some(b) if !b.is_finite() || b < 0.0 => Err(MarketError::InvalidPrice),
        other => Ok(other),
    }
}

/// Fields of a new listing, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidListing {
    /// Category / title.
    pub category: String,
    /// Initial stock (positive).
    pub quantity: u32,
    /// Unit price.
    pub price: f64,
    /// Description.
    pub description: String,
    /// Contact.
    pub contact: String,
}

/// Validate a new listing.
///
/// Text fields are checked before numbers, so a form missing its category
/// reports that first.
///
/// # Errors
///
/// [`MarketError::MissingField`], [`MarketError::InvalidQuantity`],
/// [`MarketError::InvalidPrice`].
pub fn validate_input(input: &ListingInput) -> Result<ValidListing> {
    let category = required(&input.category, "category")?;
    let contact = required(&input.contact, "contact")?;
    let quantity = parse_quantity(&input.quantity)?;
    let price = parse_price(&input.price)?;
    Ok(ValidListing {
        category,
        quantity,
        price,
        description: input.description.trim().to_string(),
        contact,
    })
}

/// Validate edits.
///
/// # Errors
///
/// Same as [`validate_input`], for each field present.
pub fn validate_patch(patch: &ListingPatch) -> Result<ListingChanges> {
    Ok(ListingChanges {
        category: patch
            .category
            .as_deref()
            .map(|c| required(c, "category"))
            .transpose()?,
        quantity: patch
            .quantity
            .as_deref()
            .map(parse_quantity)
            .transpose()?,
        price: patch.price.as_deref().map(parse_price).transpose()?,
        description: patch.description.as_deref().map(|d| d.trim().to_string()),
        contact: patch
            .contact
            .as_deref()
            .map(|c| required(c, "contact"))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(quantity: &str, price: &str) -> ListingInput {
        ListingInput {
            category: "Bicycle".into(),
            quantity: quantity.into(),
            price: price.into(),
            description: "  red  ".into(),
            contact: "555-0100".into(),
        }
    }

    #[test]
    fn test_quantity_parse_failures() {
        for bad in ["abc", "", "-1", "0", "2.5", "99999999999"] {
            assert_eq!(
                validate_input(&input(bad, "10")).map(|v| v.quantity),
                Err(MarketError::InvalidQuantity),
                "quantity {bad:?}"
            );
        }
    }

    #[test]
    fn test_price_parse_failures() {
        for bad in ["abc", "", "-3", "0", "NaN", "inf"] {
            assert_eq!(
                validate_input(&input("1", bad)).map(|v| v.price),
                Err(MarketError::InvalidPrice),
                "price {bad:?}"
            );
        }
    }

    #[test]
    fn test_missing_text_fields() {
        let mut blank = input("1", "1");
        blank.category = "   ".into();
        assert_eq!(
            validate_input(&blank).map(|v| v.quantity),
            Err(MarketError::MissingField { field: "category" })
        );

        let mut no_contact = input("1", "1");
        no_contact.contact = String::new();
        assert_eq!(
            validate_input(&no_contact).map(|v| v.quantity),
            Err(MarketError::MissingField { field: "contact" })
        );
    }

    #[test]
    fn test_valid_input_is_trimmed() {
        let valid = validate_input(&input(" 3 ", "12.5")).unwrap_or_else(|e| {
            unreachable!("valid input rejected: {e}");
        });
        assert_eq!(valid.quantity, 3);
        assert!((valid.price - 12.5).abs() < f64::EPSILON);
        assert_eq!(valid.description, "red");
    }

    #[test]
    fn test_patch_quantity_follows_create_rules() {
        for bad in ["0", "-2", "x"] {
            let patch = ListingPatch {
                quantity: Some(bad.into()),
                ..ListingPatch::default()
            };
            assert_eq!(
                validate_patch(&patch).map(|c| c.quantity),
                Err(MarketError::InvalidQuantity),
                "quantity {bad:?}"
            );
        }

        let patch = ListingPatch {
            quantity: Some(" 7 ".into()),
            ..ListingPatch::default()
        };
        assert_eq!(validate_patch(&patch).map(|c| c.quantity), Ok(Some(7)));
    }

    #[test]
    fn test_bounds() {
        assert_eq!(check_bound(None), Ok(None));
        assert_eq!(check_bound(Some(0.0)), Ok(Some(0.0)));
        assert_eq!(check_bound(Some(-1.0)), Err(MarketError::InvalidPrice));
        assert_eq!(check_bound(Some(f64::NAN)), Err(MarketError::InvalidPrice));
    }
}
