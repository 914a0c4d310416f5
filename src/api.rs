use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::model::{ListingQuery, NewAuthor, NewBook, SortBy};

const MAX_NAME_LEN: usize = 120;
const MAX_TITLE_LEN: usize = 200;
const MAX_ISBN_LEN: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub sort_by: Option<String>,
    pub search_query: Option<String>,
}

impl ListParams {
    pub fn into_listing_query(self) -> ListingQuery {
        // an all-blank term means no filter; any other term is matched as typed
        let search = self.search_query.filter(|q| !q.trim().is_empty());

        ListingQuery {
            sort: SortBy::from_param(self.sort_by.as_deref()),
            search,
        }
    }
}

/// Raw author form fields. Kept as strings so a rejected form can be re-rendered as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub birthdate: String,
    #[serde(default)]
    pub date_of_death: String,
}

impl AuthorForm {
    pub fn validate(&self) -> Result<NewAuthor> {
        let name = required_text("name", &self.name, MAX_NAME_LEN)?;

        let birth_date = parse_date("birthdate", &self.birthdate)?
            .ok_or_else(|| CatalogError::validation("birthdate is required"))?;
        let date_of_death = parse_date("date_of_death", &self.date_of_death)?;

        if let Some(death) = date_of_death {
            if death < birth_date {
                return Err(CatalogError::validation("date_of_death cannot be before birthdate"));
            }
        }

        Ok(NewAuthor {
            name,
            birth_date,
            date_of_death,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub publication_year: String,
    #[serde(default)]
    pub author_id: String,
}

impl BookForm {
    pub fn validate(&self) -> Result<NewBook> {
        let title = required_text("title", &self.title, MAX_TITLE_LEN)?;

        let isbn = self.isbn.trim();
        if isbn.chars().count() > MAX_ISBN_LEN {
            return Err(CatalogError::validation(format!(
                "isbn must be at most {MAX_ISBN_LEN} characters"
            )));
        }
        let isbn = (!isbn.is_empty()).then(|| isbn.to_string());

        let publication_year = parse_year(&self.publication_year)?;

        let author_id = self.author_id.trim();
        if author_id.is_empty() {
            return Err(CatalogError::validation("author_id is required"));
        }
        let author_id = author_id
            .parse::<i64>()
            .map_err(|_| CatalogError::validation(format!("author_id '{author_id}' is not a number")))?;

        Ok(NewBook {
            title,
            isbn,
            publication_year,
            author_id,
        })
    }

    pub fn selected_author(&self) -> Option<i64> {
        self.author_id.trim().parse().ok()
    }
}

fn required_text(field: &str, value: &str, max_len: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(CatalogError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

/// Parses a `YYYY-MM-DD` date. Empty input is `None`.
pub fn parse_date(field: &str, value: &str) -> Result<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| CatalogError::validation(format!("{field} '{value}' is not a YYYY-MM-DD date")))
}

/// Parses a four digit `YYYY` year.
pub fn parse_year(value: &str) -> Result<i32> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::validation("publication_year is required"));
    }
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CatalogError::validation(format!(
            "publication_year '{value}' is not a YYYY year"
        )));
    }
    value
        .parse()
        .map_err(|_| CatalogError::validation(format!("publication_year '{value}' is not a YYYY year")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author_form(name: &str, birthdate: &str, date_of_death: &str) -> AuthorForm {
        AuthorForm {
            name: name.into(),
            birthdate: birthdate.into(),
            date_of_death: date_of_death.into(),
        }
    }

    fn book_form(title: &str, isbn: &str, year: &str, author_id: &str) -> BookForm {
        BookForm {
            title: title.into(),
            isbn: isbn.into(),
            publication_year: year.into(),
            author_id: author_id.into(),
        }
    }

    #[test]
    fn test_list_params() {
        let query = ListParams {
            sort_by: Some("author".into()),
            search_query: Some("  tolkien ".into()),
        }
        .into_listing_query();
        assert_eq!(query.sort, SortBy::Author);
        assert_eq!(query.search.as_deref(), Some("  tolkien "));

        let query = ListParams {
            sort_by: None,
            search_query: Some("   ".into()),
        }
        .into_listing_query();
        assert_eq!(query, ListingQuery::default());
    }

    #[test]
    fn test_author_form_valid() {
        let author = author_form("Jane Doe", "1970-01-01", "").validate().unwrap();
        assert_eq!(author.name, "Jane Doe");
        assert_eq!(author.birth_date, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(author.date_of_death, None);

        let author = author_form("Ursula K. Le Guin", "1929-10-21", "2018-01-22")
            .validate()
            .unwrap();
        assert_eq!(author.date_of_death, NaiveDate::from_ymd_opt(2018, 1, 22));
    }

    #[test]
    fn test_author_form_rejects_bad_dates() {
        for form in [
            author_form("Jane Doe", "", ""),
            author_form("Jane Doe", "01/01/1970", ""),
            author_form("Jane Doe", "1970-13-01", ""),
            author_form("Jane Doe", "1970-01-01", "yesterday"),
            author_form("Jane Doe", "1970-01-01", "1960-01-01"),
        ] {
            let err = form.validate().unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)), "{form:?} gave {err}");
        }
    }

    #[test]
    fn test_author_form_rejects_blank_name() {
        let err = author_form("  ", "1970-01-01", "").validate().unwrap_err();
        assert_eq!(err.user_message(), "name is required");

        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(author_form(&long, "1970-01-01", "").validate().is_err());
    }

    #[test]
    fn test_book_form_valid() {
        let book = book_form("Example", "", "2020", "1").validate().unwrap();
        assert_eq!(
            book,
            NewBook {
                title: "Example".into(),
                isbn: None,
                publication_year: 2020,
                author_id: 1,
            }
        );

        let book = book_form("The Hobbit", " 9780261103573 ", "1937", "4").validate().unwrap();
        assert_eq!(book.isbn.as_deref(), Some("9780261103573"));
    }

    #[test]
    fn test_book_form_rejects_bad_input() {
        for form in [
            book_form("Example", "", "", "1"),
            book_form("Example", "", "20", "1"),
            book_form("Example", "", "2020-01-01", "1"),
            book_form("Example", "", "year", "1"),
            book_form("Example", "", "2020", ""),
            book_form("Example", "", "2020", "one"),
            book_form("", "", "2020", "1"),
            book_form("Example", &"9".repeat(MAX_ISBN_LEN + 1), "2020", "1"),
        ] {
            let err = form.validate().unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)), "{form:?} gave {err}");
        }
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("1984").unwrap(), 1984);
        assert_eq!(parse_year(" 0042 ").unwrap(), 42);
        assert!(parse_year("+123").is_err());
        assert!(parse_year("12345").is_err());
    }

    #[test]
    fn test_selected_author() {
        assert_eq!(book_form("", "", "", "3").selected_author(), Some(3));
        assert_eq!(book_form("", "", "", "x").selected_author(), None);
    }
}
