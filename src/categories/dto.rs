use serde::{Deserialize, Serialize};

use crate::categories::repo::Category;

#[derive(Debug, Deserialize)]
pub struct CategoriesQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}
fn default_page() -> i64 {
    1
}
fn default_page_size() -> i64 {
    6
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct ToggleInterestRequest {
    pub category_id: i32,
    pub is_interested: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleInterestResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_to_first_page_of_six() {
        let q: CategoriesQuery = serde_json::from_str("{}").expect("defaults");
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 6);
    }

    #[test]
    fn query_accepts_explicit_values() {
        let q: CategoriesQuery =
            serde_json::from_str(r#"{"page": 3, "page_size": 12}"#).expect("parse");
        assert_eq!(q.page, 3);
        assert_eq!(q.page_size, 12);
    }
}
