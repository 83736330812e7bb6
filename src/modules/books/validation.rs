//! Field-level validation of book drafts.
//!
//! Every rule looks at a single field. All violations are collected, so a
//! client learns about every bad field in one round trip.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::models::{BookDraft, NewBook};

pub const ISBN_MAX_LEN: usize = 50;
pub const TITLE_MIN_LEN: usize = 1;
pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MIN_LEN: usize = 10;
pub const DESCRIPTION_MAX_LEN: usize = 10_000;
pub const MIN_PAGES: i32 = 40;

/// One violated constraint, keyed by the field's wire name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

impl BookDraft {
    /// Validate against today's date (UTC).
    pub fn validate(self) -> Result<NewBook, Vec<FieldViolation>> {
        self.validate_on(Utc::now().date_naive())
    }

    /// Validate with `today` as the reference date for the publication rule.
    pub fn validate_on(self, today: NaiveDate) -> Result<NewBook, Vec<FieldViolation>> {
        let violations = self.violations_on(today);

        match (self.title, self.price) {
            (Some(title), Some(price)) if violations.is_empty() => Ok(NewBook {
                isbn: self.isbn,
                title,
                description: self.description,
                price,
                publication_date: self.publication_date,
                nb_of_pages: self.nb_of_pages,
                image_url: self.image_url,
            }),
            _ => Err(violations),
        }
    }

    /// Every constraint this draft breaks, in field order.
    pub fn violations_on(&self, today: NaiveDate) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        if let Some(isbn) = &self.isbn {
            if char_len(isbn) > ISBN_MAX_LEN {
                violations.push(FieldViolation::new(
                    "isbn",
                    format!("size must be at most {ISBN_MAX_LEN}"),
                ));
            }
        }

        match &self.title {
            None => violations.push(FieldViolation::new("title", "must not be null")),
            Some(title) => {
                let len = char_len(title);
                if !(TITLE_MIN_LEN..=TITLE_MAX_LEN).contains(&len) {
                    violations.push(FieldViolation::new(
                        "title",
                        format!("size must be between {TITLE_MIN_LEN} and {TITLE_MAX_LEN}"),
                    ));
                }
            }
        }

        if let Some(description) = &self.description {
            let len = char_len(description);
            if !(DESCRIPTION_MIN_LEN..=DESCRIPTION_MAX_LEN).contains(&len) {
                violations.push(FieldViolation::new(
                    "description",
                    format!(
                        "size must be between {DESCRIPTION_MIN_LEN} and {DESCRIPTION_MAX_LEN}"
                    ),
                ));
            }
        }

        match self.price {
            None => violations.push(FieldViolation::new("price", "must not be null")),
            Some(price) if price < Decimal::ONE => violations.push(FieldViolation::new(
                "price",
                "must be greater than or equal to 1",
            )),
            Some(_) => {}
        }

        if let Some(published) = self.publication_date {
            if published >= today {
                violations.push(FieldViolation::new(
                    "publication-date",
                    "must be a date in the past",
                ));
            }
        }

        if let Some(pages) = self.nb_of_pages {
            if pages < MIN_PAGES {
                violations.push(FieldViolation::new(
                    "nb-of-pages",
                    format!("must be greater than or equal to {MIN_PAGES}"),
                ));
            }
        }

        violations
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn fields(violations: &[FieldViolation]) -> Vec<&'static str> {
        violations.iter().map(|v| v.field).collect()
    }

    fn complete_draft() -> BookDraft {
        BookDraft {
            isbn: Some("978-3-86680-192-9".to_string()),
            title: Some("The Secrets of Arcadia".to_string()),
            description: Some("A young heroine holds the fate of her kingdom.".to_string()),
            price: Some(dec("19.99")),
            publication_date: NaiveDate::from_ymd_opt(2023, 9, 15),
            nb_of_pages: Some(428),
            image_url: Some("https://covers.example/arcadia.png".to_string()),
        }
    }

    #[test]
    fn complete_draft_is_valid() {
        let book = complete_draft().validate_on(today()).unwrap();
        assert_eq!(book.title, "The Secrets of Arcadia");
        assert_eq!(book.price, dec("19.99"));
        assert_eq!(book.image_url.as_deref(), Some("https://covers.example/arcadia.png"));
    }

    #[test]
    fn only_title_and_price_are_required() {
        assert!(BookDraft::new("T", Decimal::ONE).validate_on(today()).is_ok());

        let violations = BookDraft::default().validate_on(today()).unwrap_err();
        assert_eq!(fields(&violations), vec!["title", "price"]);
        assert!(violations.iter().all(|v| v.message == "must not be null"));
    }

    #[test]
    fn title_length_bounds() {
        assert!(BookDraft::new("", Decimal::ONE).validate_on(today()).is_err());
        assert!(BookDraft::new("x".repeat(100), Decimal::ONE).validate_on(today()).is_ok());
        assert!(BookDraft::new("x".repeat(101), Decimal::ONE).validate_on(today()).is_err());
        // Lengths are counted in characters, not bytes.
        assert!(BookDraft::new("é".repeat(100), Decimal::ONE).validate_on(today()).is_ok());
    }

    #[test]
    fn price_must_be_at_least_one() {
        let violations = BookDraft::new("T", Decimal::ZERO).validate_on(today()).unwrap_err();
        assert_eq!(
            violations,
            vec![FieldViolation::new("price", "must be greater than or equal to 1")]
        );
        assert!(BookDraft::new("T", dec("0.99")).validate_on(today()).is_err());
        assert!(BookDraft::new("T", dec("1.00")).validate_on(today()).is_ok());
    }

    #[test]
    fn description_length_bounds() {
        let mut draft = BookDraft::new("T", Decimal::ONE);

        draft.description = Some("too short".to_string());
        assert_eq!(fields(&draft.violations_on(today())), vec!["description"]);

        draft.description = Some("just right".to_string());
        assert!(draft.violations_on(today()).is_empty());

        draft.description = Some("d".repeat(10_001));
        assert_eq!(fields(&draft.violations_on(today())), vec!["description"]);
    }

    #[test]
    fn publication_date_must_be_strictly_past() {
        let mut draft = BookDraft::new("T", Decimal::ONE);

        draft.publication_date = today().pred_opt();
        assert!(draft.violations_on(today()).is_empty());

        draft.publication_date = Some(today());
        assert_eq!(fields(&draft.violations_on(today())), vec!["publication-date"]);

        draft.publication_date = today().succ_opt();
        assert_eq!(fields(&draft.violations_on(today())), vec!["publication-date"]);
    }

    #[test]
    fn page_count_minimum() {
        let mut draft = BookDraft::new("T", Decimal::ONE);

        draft.nb_of_pages = Some(39);
        assert_eq!(fields(&draft.violations_on(today())), vec!["nb-of-pages"]);

        draft.nb_of_pages = Some(40);
        assert!(draft.violations_on(today()).is_empty());
    }

    #[test]
    fn isbn_is_only_length_checked() {
        let mut draft = BookDraft::new("T", Decimal::ONE);

        draft.isbn = Some("13-84356-not-a-real-isbn".to_string());
        assert!(draft.violations_on(today()).is_empty());

        draft.isbn = Some("9".repeat(51));
        assert_eq!(fields(&draft.violations_on(today())), vec!["isbn"]);
    }

    #[test]
    fn all_violations_are_reported_together() {
        let draft = BookDraft {
            isbn: None,
            title: Some(String::new()),
            description: Some("short".to_string()),
            price: Some(Decimal::ZERO),
            publication_date: today().succ_opt(),
            nb_of_pages: Some(12),
            image_url: None,
        };

        assert_eq!(
            fields(&draft.validate_on(today()).unwrap_err()),
            vec!["title", "description", "price", "publication-date", "nb-of-pages"]
        );
    }
}
