/// Cleans a numeric field as the terminal renders it: surrounding
/// whitespace, one leading sign character, thousands separators.
///
/// An empty or sign-only input converts to `0`; anything else that fails
/// integer conversion is an error so callers can skip the row.
pub fn clean_signed_int(raw: &str) -> Result<i64, NumericError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let digits: String = rest.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return Ok(0);
    }

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NumericError::Unparseable(raw.to_string()));
    }

    let magnitude: i64 = digits
        .parse()
        .map_err(|_| NumericError::Unparseable(raw.to_string()))?;

    Ok(if negative { -magnitude } else { magnitude })
}

#[derive(Debug, thiserror::Error)]
pub enum NumericError {
    #[error("Not a numeric field: {0:?}")]
    Unparseable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands_separators_and_sign() {
        assert_eq!(clean_signed_int("1,234,567").unwrap(), 1_234_567);
        assert_eq!(clean_signed_int("+4,850").unwrap(), 4_850);
        assert_eq!(clean_signed_int("-12,345").unwrap(), -12_345);
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(clean_signed_int("  73,400 ").unwrap(), 73_400);
        assert_eq!(clean_signed_int("\t-250\n").unwrap(), -250);
    }

    #[test]
    fn test_empty_and_sign_only_convert_to_zero() {
        assert_eq!(clean_signed_int("").unwrap(), 0);
        assert_eq!(clean_signed_int("   ").unwrap(), 0);
        assert_eq!(clean_signed_int("+").unwrap(), 0);
        assert_eq!(clean_signed_int("-").unwrap(), 0);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(clean_signed_int("12a4").is_err());
        assert!(clean_signed_int("--5").is_err());
        assert!(clean_signed_int("1 234").is_err());
    }
}
