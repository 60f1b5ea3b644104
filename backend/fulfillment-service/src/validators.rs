use validator::ValidateEmail;

/// Input helpers shared by the handlers and services

/// Trimmed value of a request field, treating blank strings as absent.
pub fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Exact value of a request field, treating only the empty string as absent.
///
/// Used for codes, gateway identifiers and signatures, which are compared
/// byte for byte.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

/// Canonical form used as the OTP store key and inside verification tokens.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format (RFC 5322 subset, as implemented by `validator`)
pub fn validate_email(email: &str) -> bool {
    email.len() <= 254 && email.validate_email()
}

/// Mask email for logging
pub fn mask_email(email: &str) -> String {
    match email.find('@') {
        Some(at_pos) => {
            let local = &email[..at_pos];
            let domain = &email[at_pos..];
            match local.chars().next() {
                Some(first) if local.chars().count() > 2 => format!("{first}***{domain}"),
                _ => format!("**{domain}"),
            }
        }
        None => "***@***".to_string(),
    }
}
