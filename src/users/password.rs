use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;
use unicode_general_category::{get_general_category, GeneralCategory};

pub const MIN_PASSWORD_LEN: usize = 8;
/// Upper bound in characters.
pub const MAX_PASSWORD_LEN: usize = 72;

/// First password rule a candidate breaks, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("password must be at least {} characters long", MIN_PASSWORD_LEN)]
    TooShort,
    #[error("password must not exceed {} characters", MAX_PASSWORD_LEN)]
    TooLong,
    #[error("password must not contain spaces")]
    ContainsSpace,
    #[error("password must contain at least one uppercase letter")]
    MissingUpper,
    #[error("password must contain at least one lowercase letter")]
    MissingLower,
    #[error("password must contain at least one number")]
    MissingNumber,
    #[error("password must contain at least one special character")]
    MissingSpecial,
}

pub fn validate_password_strength(password: &str) -> Result<(), PasswordPolicyError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(PasswordPolicyError::TooShort);
    }
    if len > MAX_PASSWORD_LEN {
        return Err(PasswordPolicyError::TooLong);
    }
    if password.chars().any(char::is_whitespace) {
        return Err(PasswordPolicyError::ContainsSpace);
    }

    let (mut upper, mut lower, mut number, mut special) = (false, false, false, false);
    for c in password.chars() {
        if c.is_uppercase() {
            upper = true;
        } else if c.is_lowercase() {
            lower = true;
        } else if c.is_numeric() {
            number = true;
        } else if is_special(c) {
            special = true;
        }
    }

    if !upper {
        return Err(PasswordPolicyError::MissingUpper);
    }
    if !lower {
        return Err(PasswordPolicyError::MissingLower);
    }
    if !number {
        return Err(PasswordPolicyError::MissingNumber);
    }
    if !special {
        return Err(PasswordPolicyError::MissingSpecial);
    }
    Ok(())
}

/// Punctuation or symbol, ASCII or any Unicode P*/S* category.
fn is_special(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    matches!(
        get_general_category(c),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
            | GeneralCategory::MathSymbol
            | GeneralCategory::CurrencySymbol
            | GeneralCategory::ModifierSymbol
            | GeneralCategory::OtherSymbol
    )
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Hashes off the async workers; argon2 is deliberately expensive.
pub async fn hash_password_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

pub async fn verify_password_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert_ne!(hash, password);
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "Correct-Horse-9";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("Correct-Horse-8", &hash).expect("verify should not error"));
        assert!(!verify_password("", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("Test123!@#").unwrap();
        let b = hash_password("Test123!@#").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn blocking_helpers_roundtrip() {
        let hash = hash_password_blocking("Test123!@#".into()).await.unwrap();
        assert!(verify_password_blocking("Test123!@#".into(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("Test123!@$".into(), hash)
            .await
            .unwrap());
    }

    #[test]
    fn policy_accepts_strong_password() {
        assert_eq!(validate_password_strength("Test123!@#"), Ok(()));
        assert_eq!(validate_password_strength("Aa1!aaaa"), Ok(()));
        assert_eq!(validate_password_strength(&format!("Aa1!{}", "a".repeat(68))), Ok(()));
    }

    #[test]
    fn policy_reports_each_rule() {
        use PasswordPolicyError::*;
        assert_eq!(validate_password_strength("short1!"), Err(TooShort));
        assert_eq!(validate_password_strength(&"Aa1!".repeat(20)), Err(TooLong));
        assert_eq!(validate_password_strength("Has Space1!"), Err(ContainsSpace));
        assert_eq!(validate_password_strength("alllower123!"), Err(MissingUpper));
        assert_eq!(validate_password_strength("ALLUPPER123!"), Err(MissingLower));
        assert_eq!(validate_password_strength("NoNumber!!"), Err(MissingNumber));
        assert_eq!(validate_password_strength("NoSpecial123"), Err(MissingSpecial));
    }

    #[test]
    fn policy_reports_first_failing_rule() {
        use PasswordPolicyError::*;
        // too short wins over everything else
        assert_eq!(validate_password_strength("a b"), Err(TooShort));
        // whitespace is reported before missing character classes
        assert_eq!(validate_password_strength("all lower"), Err(ContainsSpace));
        assert_eq!(validate_password_strength("Tab\tbed12!"), Err(ContainsSpace));
        // missing upper before missing number
        assert_eq!(validate_password_strength("lowercase!!"), Err(MissingUpper));
    }

    #[test]
    fn special_means_punctuation_or_symbol() {
        use PasswordPolicyError::MissingSpecial;
        // combining acute accent (Mn), zero-width space (Cf), soft hyphen (Cf)
        assert_eq!(validate_password_strength("Aa1aaaa\u{0301}"), Err(MissingSpecial));
        assert_eq!(validate_password_strength("Aa1aaaa\u{200B}"), Err(MissingSpecial));
        assert_eq!(validate_password_strength("Aa1aaaa\u{AD}"), Err(MissingSpecial));
        // non-ASCII punctuation and symbols count
        assert_eq!(validate_password_strength("Aa1aaaa\u{00BF}"), Ok(()));
        assert_eq!(validate_password_strength("Aa1aaaa\u{20AC}"), Ok(()));
        assert_eq!(validate_password_strength("Aa1aaaa\u{2014}"), Ok(()));
        for c in ['!', '#', '_', '~', '^', '`', '|', '+'] {
            assert_eq!(validate_password_strength(&format!("Aa1aaaa{c}")), Ok(()), "{c}");
        }
    }

    #[test]
    fn policy_counts_characters_not_bytes() {
        // 8 characters, more than 8 bytes
        assert_eq!(validate_password_strength("Ää1!ääää"), Ok(()));
    }

    #[test]
    fn error_messages_name_the_rule() {
        assert_eq!(
            PasswordPolicyError::TooShort.to_string(),
            "password must be at least 8 characters long"
        );
        assert_eq!(
            PasswordPolicyError::TooLong.to_string(),
            "password must not exceed 72 characters"
        );
    }
}
