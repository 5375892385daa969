//! Input validation utilities.

use crate::entities::UserId;
use crate::error::{MessengerError, MessengerResult};

/// Validate username: 3 to 30 characters of letters, digits, `_` or `-`
pub fn validate_username(username: &str) -> MessengerResult<()> {
    let length = username.chars().count();
    if !(3..=30).contains(&length) {
        return Err(MessengerError::invalid_input(
            "username must be between 3 and 30 characters long",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(MessengerError::invalid_input(
            "username can only contain letters, numbers, underscores, and hyphens",
        ));
    }

    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> MessengerResult<()> {
    if email.len() > 255 {
        return Err(MessengerError::invalid_input("email too long"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(MessengerError::invalid_input("invalid email format"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> MessengerResult<()> {
    if password.len() < 8 {
        return Err(MessengerError::invalid_input(
            "password must be at least 8 characters long",
        ));
    }
    if password.len() > 128 {
        return Err(MessengerError::invalid_input(
            "password must be less than 128 characters long",
        ));
    }
    Ok(())
}

/// Trim a search term. Empty or overlong terms are refused.
pub fn validate_search(query: &str) -> MessengerResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(MessengerError::invalid_input("search term must not be empty"));
    }
    if query.chars().count() > 100 {
        return Err(MessengerError::invalid_input(
            "search term must be at most 100 characters long",
        ));
    }
    Ok(query)
}

/// Remove duplicate members while keeping first-seen order. A conversation
/// needs at least two distinct members.
pub fn dedupe_members(recipients: &[UserId]) -> MessengerResult<Vec<UserId>> {
    let mut members: Vec<UserId> = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        if !members.contains(recipient) {
            members.push(*recipient);
        }
    }

    if members.len() < 2 {
        return Err(MessengerError::invalid_input(
            "a conversation needs at least two distinct recipients",
        ));
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn usernames() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@@example.com").is_err());
        assert!(validate_email("al ice@example.com").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn search_terms() {
        assert_eq!(validate_search("  ali ").unwrap(), "ali");
        assert!(validate_search("   ").is_err());
        assert!(validate_search(&"q".repeat(101)).is_err());
    }

    #[test]
    fn members_are_deduplicated_in_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(dedupe_members(&[a, b, a]).unwrap(), vec![a, b]);
        assert!(dedupe_members(&[a, a]).is_err());
        assert!(dedupe_members(&[]).is_err());
    }
}
