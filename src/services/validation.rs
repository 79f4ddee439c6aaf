//! Field-level validation for the auth forms. Each check returns the error
//! message for that field, or `None` when the value passes; callers collect
//! the non-empty ones into a 422 response.

pub fn username_error(username: &str, taken: bool) -> Option<String> {
    if username.is_empty() {
        Some("Username is required.".to_string())
    } else if username.len() > 20 {
        Some("Username cannot exceed 20 characters.".to_string())
    } else if taken {
        Some("Username is already taken, please try another one.".to_string())
    } else {
        None
    }
}

pub fn email_error(email: &str, taken: bool) -> Option<String> {
    if email.is_empty() {
        Some("Email address is required.".to_string())
    } else if email.len() > 255 {
        Some("Email address cannot exceed 255 characters.".to_string())
    } else if !is_plausible_email(email) {
        Some("Enter a valid email address.".to_string())
    } else if taken {
        Some("Email address is already taken, please try another one.".to_string())
    } else {
        None
    }
}

pub fn password_error(password: &str) -> Option<String> {
    if password.is_empty() {
        Some("Password is required.".to_string())
    } else if password.len() < 8 {
        Some("Password must be at least 8 characters long.".to_string())
    } else if password.len() > 72 {
        Some("Password cannot exceed 72 characters.".to_string())
    } else if password.chars().any(char::is_whitespace) {
        Some("Password must not contain spaces.".to_string())
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain at least one lowercase letter.".to_string())
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter.".to_string())
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one digit.".to_string())
    } else {
        None
    }
}

pub fn repeated_password_error(password: &str, repeated: &str) -> Option<String> {
    if repeated.is_empty() {
        Some("You must confirm your password.".to_string())
    } else if password != repeated {
        Some("The passwords entered do not match.".to_string())
    } else {
        None
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(username_error("", false).is_some());
        assert!(username_error(&"x".repeat(21), false).is_some());
        assert!(username_error("ada", true).is_some());
        assert!(username_error("ada", false).is_none());
    }

    #[test]
    fn email_rules() {
        assert!(email_error("", false).is_some());
        assert!(email_error("no-at-sign", false).is_some());
        assert!(email_error("a@b", false).is_some());
        assert!(email_error("a @b.com", false).is_some());
        assert!(email_error("ada@example.com", true).is_some());
        assert!(email_error("ada@example.com", false).is_none());
    }

    #[test]
    fn password_rules() {
        assert!(password_error("").is_some());
        assert!(password_error("Sh0rt").is_some());
        assert!(password_error(&format!("A1{}", "a".repeat(71))).is_some());
        assert!(password_error("With Space1A").is_some());
        assert!(password_error("NOLOWERCASE1").is_some());
        assert!(password_error("nouppercase1").is_some());
        assert!(password_error("NoDigitsHere").is_some());
        assert!(password_error("Valid_Passw0rd").is_none());
    }

    #[test]
    fn repeated_password_rules() {
        assert!(repeated_password_error("Valid_Passw0rd", "").is_some());
        assert!(repeated_password_error("Valid_Passw0rd", "other").is_some());
        assert!(repeated_password_error("Valid_Passw0rd", "Valid_Passw0rd").is_none());
    }
}
