use axum::http::Uri;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use validator::{Validate, ValidationErrors};

use super::response::ProfileResponse;

#[derive(Debug, Deserialize, Serialize)]
pub struct UserWrapper<T> {
    pub user: T,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ProfileWrapper {
    pub profile: ProfileResponse,
}

/// Page-number pagination envelope for list endpoints.
#[derive(Debug, Deserialize, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> UserWrapper<T> {
    pub fn wrap_with_user_data(request: T) -> UserWrapper<T> {
        UserWrapper { user: request }
    }
}

impl<T: Validate> Validate for UserWrapper<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.user.validate()
    }
}

impl<T> Paginated<T> {
    pub fn new(results: Vec<T>, count: i64, page: &Page, uri: &Uri) -> Self {
        let next = (page.number * page.size < count as u64)
            .then(|| page_link(uri, page.number + 1));
        let previous = (page.number > 1).then(|| page_link(uri, page.number - 1));
        Paginated {
            count,
            next,
            previous,
            results,
        }
    }
}

/// A requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    pub fn new(number: Option<u32>, size: u32) -> Self {
        Page {
            number: u64::from(number.unwrap_or(1).max(1)),
            size: u64::from(size.max(1)),
        }
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }

    pub fn offset(&self) -> i64 {
        ((self.number - 1) * self.size) as i64
    }

    /// Page one always exists, later pages only while they hold rows.
    pub fn exists_for(&self, count: i64) -> bool {
        self.number == 1 || self.offset() < count
    }
}

/// `uri` with its `page` parameter replaced, other parameters kept.
pub fn page_link(uri: &Uri, page: u64) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
        .filter(|(key, _)| *key != "page")
        .for_each(|(key, value)| {
            query.append_pair(&key, &value);
        });
    query.append_pair("page", &page.to_string());
    format!("{}?{}", uri.path(), query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offsets() {
        let page = Page::new(Some(3), 10);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.limit(), 10);
        assert_eq!(Page::new(None, 10).offset(), 0);
        assert_eq!(Page::new(Some(0), 10).number, 1);
    }

    #[test]
    fn pages_past_the_end_do_not_exist() {
        assert!(Page::new(Some(1), 10).exists_for(0));
        assert!(Page::new(Some(2), 10).exists_for(11));
        assert!(!Page::new(Some(2), 10).exists_for(10));
    }

    #[test]
    fn links_keep_other_parameters() {
        let uri: Uri = "/api/recipes/?search=taco&page=2".parse().unwrap();
        assert_eq!(page_link(&uri, 3), "/api/recipes/?search=taco&page=3");
        let uri: Uri = "/api/recipes/".parse().unwrap();
        assert_eq!(page_link(&uri, 2), "/api/recipes/?page=2");
        let uri: Uri = "/api/recipes/?search=mac+%26+cheese&page=1".parse().unwrap();
        assert_eq!(
            page_link(&uri, 2),
            "/api/recipes/?search=mac+%26+cheese&page=2"
        );
    }

    #[test]
    fn envelope_links() {
        let uri: Uri = "/api/comments/".parse().unwrap();
        let first = Paginated::new(vec![1, 2], 5, &Page::new(None, 2), &uri);
        assert_eq!(first.next.as_deref(), Some("/api/comments/?page=2"));
        assert!(first.previous.is_none());
        let last = Paginated::new(vec![5], 5, &Page::new(Some(3), 2), &uri);
        assert!(last.next.is_none());
        assert_eq!(last.previous.as_deref(), Some("/api/comments/?page=2"));
    }
}
