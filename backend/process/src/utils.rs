use chrono::prelude::*;
use registry::{DateKey, RegistryError};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Explicit `MM-DD` when given, today's key otherwise.
pub fn resolve_date_key(input: Option<&str>) -> Result<DateKey, RegistryError> {
    match input {
        Some(raw) => raw.trim().parse(),
        None => Ok(DateKey::from(today())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key() {
        assert_eq!(resolve_date_key(Some("03-05")).unwrap().as_str(), "03-05");
        assert_eq!(resolve_date_key(Some(" 12-31 ")).unwrap().as_str(), "12-31");
    }

    #[test]
    fn test_default_is_today() {
        let expected = DateKey::from(today());
        assert_eq!(resolve_date_key(None).unwrap(), expected);
    }

    #[test]
    fn test_rejects_full_dates() {
        assert!(resolve_date_key(Some("2024-03-05")).is_err());
        assert!(resolve_date_key(Some("")).is_err());
        assert!(resolve_date_key(Some("02-30")).is_err());
    }
}
