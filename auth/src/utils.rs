//! Input validation helpers for registration and profile updates.

use crate::error::{AuthError, Result};

/// Validate email address format.
///
/// Basic RFC 5322 shape:
/// - exactly one `@`
/// - non-empty local part and dotted domain
/// - 3 to 255 characters
///
/// # Examples
///
/// ```
/// use bazaar_auth::utils::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("user+tag@subdomain.example.com"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let local_ok = local
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'));
    let domain_ok = domain
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-'));
    if !local_ok || !domain_ok {
        return false;
    }

    // Needs at least two labels, none empty.
    let mut labels = domain.split('.');
    let count = domain.split('.').count();
    count >= 2 && labels.all(|label| !label.is_empty())
}

/// Trim and lowercase an address so uniqueness is case-insensitive.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Validate and normalize a handle.
///
/// # Errors
///
/// [`AuthError::MissingField`] if the handle is blank.
pub fn validate_handle(handle: &str) -> Result<String> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(AuthError::MissingField { field: "handle" });
    }
    Ok(handle.to_string())
}

/// Validate and normalize a contact address.
///
/// # Errors
///
/// [`AuthError::MissingField`] if blank, [`AuthError::InvalidAddressFormat`]
/// if not an email.
pub fn validate_address(address: &str) -> Result<String> {
    let address = normalize_address(address);
    if address.is_empty() {
        return Err(AuthError::MissingField { field: "address" });
    }
    if !is_valid_email(&address) {
        return Err(AuthError::InvalidAddressFormat);
    }
    Ok(address)
}

/// Check a secret against the length policy.
///
/// # Errors
///
/// [`AuthError::MissingField`] if empty, [`AuthError::WeakSecret`] if shorter
/// than `min_length` characters.
pub fn validate_secret(secret: &str, min_length: usize) -> Result<()> {
    if secret.is_empty() {
        return Err(AuthError::MissingField { field: "secret" });
    }
    if secret.chars().count() < min_length {
        return Err(AuthError::WeakSecret { min_length });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user+tag@example.com"));
        assert!(is_valid_email("user_name@subdomain.example.com"));
        assert!(is_valid_email("user-name@example.co.uk"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("not an email@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_address_is_normalized() {
        assert_eq!(
            validate_address("  Alice@Example.COM "),
            Ok("alice@example.com".to_string())
        );
        assert_eq!(validate_address("   "), Err(AuthError::MissingField { field: "address" }));
        assert_eq!(validate_address("nope"), Err(AuthError::InvalidAddressFormat));
    }

    #[test]
    fn test_handle_is_trimmed_but_case_preserved() {
        assert_eq!(validate_handle(" Alice "), Ok("Alice".to_string()));
        assert_eq!(validate_handle(""), Err(AuthError::MissingField { field: "handle" }));
    }

    #[test]
    fn test_secret_policy() {
        assert_eq!(validate_secret("abc", 6), Err(AuthError::WeakSecret { min_length: 6 }));
        assert_eq!(validate_secret("", 6), Err(AuthError::MissingField { field: "secret" }));
        assert_eq!(validate_secret("secret", 6), Ok(()));
        // Characters, not bytes
        assert_eq!(validate_secret("ééééé", 6), Err(AuthError::WeakSecret { min_length: 6 }));
    }
}
