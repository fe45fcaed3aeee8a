use std::sync::LazyLock;

use regex::Regex;
use registry::{Nupcan, Stage};
use serde::Deserialize;

use crate::error::AppError;

const MAX_FIELD_LEN: usize = 200;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub name: String,
    pub email: String,
    pub exam_name: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub exam_name: String,
}

pub fn validate_registration(payload: RegistrationPayload) -> Result<Registration, AppError> {
    let name = sanitize(&payload.name);
    let exam_name = sanitize(&payload.exam_name);
    let email = payload.email.trim().to_lowercase();

    for (field, value) in [("name", &name), ("examName", &exam_name), ("email", &email)] {
        if value.is_empty() {
            return Err(AppError::InvalidRegistration(format!("{field} is required")));
        }
        if value.chars().count() > MAX_FIELD_LEN {
            return Err(AppError::InvalidRegistration(format!("{field} is too long")));
        }
    }

    if !EMAIL.is_match(&email) {
        return Err(AppError::InvalidRegistration(format!(
            "{email:?} is not an email address"
        )));
    }

    Ok(Registration {
        name,
        email,
        exam_name,
    })
}

/// Trims and collapses inner whitespace. Accents and punctuation are kept, names need them.
pub fn sanitize(input: &str) -> String {
    let without_controls: String = input
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();

    WHITESPACE
        .replace_all(without_controls.trim(), " ")
        .into_owned()
}

pub fn parse_nupcan(raw: &str) -> Result<Nupcan, AppError> {
    raw.parse().map_err(AppError::from)
}

pub fn parse_stage(raw: &str) -> Result<Stage, AppError> {
    raw.parse().map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, email: &str, exam_name: &str) -> RegistrationPayload {
        RegistrationPayload {
            name: name.to_string(),
            email: email.to_string(),
            exam_name: exam_name.to_string(),
        }
    }

    #[test]
    fn test_basic() {
        assert_eq!(sanitize("Jean  Moussavou"), "Jean Moussavou");
        assert_eq!(sanitize("Éléonore N'Dong"), "Éléonore N'Dong");
    }

    #[test]
    fn test_leading_trailing_spaces() {
        assert_eq!(sanitize("   hello   "), "hello");
        assert_eq!(sanitize("  multiple   spaces  "), "multiple spaces");
        assert_eq!(sanitize("tabs\tand\nnewlines"), "tabs and newlines");
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(sanitize("abc\u{0}def"), "abcdef");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("     "), "");
    }

    #[test]
    fn test_valid_registration() {
        let registration =
            validate_registration(payload(" Ada  Obame ", " Ada@Example.GA ", "ENS  Libreville"))
                .unwrap();

        assert_eq!(
            registration,
            Registration {
                name: "Ada Obame".to_string(),
                email: "ada@example.ga".to_string(),
                exam_name: "ENS Libreville".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_registration() {
        assert!(validate_registration(payload("", "ada@example.ga", "ENS")).is_err());
        assert!(validate_registration(payload("Ada", "ada@example.ga", "   ")).is_err());
        assert!(validate_registration(payload("Ada", "not-an-email", "ENS")).is_err());
        assert!(validate_registration(payload("Ada", "a@b@c.ga", "ENS")).is_err());
        assert!(validate_registration(payload(&"a".repeat(201), "ada@example.ga", "ENS")).is_err());
    }

    #[test]
    fn test_path_parsing() {
        assert!(parse_nupcan("GABCONCOURS-03-05-1").is_ok());
        assert!(matches!(
            parse_nupcan("unknown-id"),
            Err(AppError::MalformedIdentifier(_))
        ));
        assert_eq!(parse_stage("payment").unwrap(), Stage::Payment);
        assert!(parse_stage("refund").is_err());
    }
}
