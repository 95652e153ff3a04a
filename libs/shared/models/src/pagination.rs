use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldErrors};

pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 100;

/// Raw `offset`/`limit` query parameters.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn validate(&self) -> Result<PageRequest, AppError> {
        let mut errors = FieldErrors::new();

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            errors.insert("offset".to_string(), "must be greater than or equal to 0".to_string());
        }

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT as i64);
        if !(1..=MAX_LIMIT as i64).contains(&limit) {
            errors.insert("limit".to_string(), format!("must be between 1 and {}", MAX_LIMIT));
        }

        if !errors.is_empty() {
            return Err(AppError::ValidationError(errors));
        }

        Ok(PageRequest::new(offset as u64, limit as u32))
    }
}

/// A validated page window. The page index is `offset / limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u32,
}

impl PageRequest {
    pub fn new(offset: u64, limit: u32) -> Self {
        let size = limit.max(1);
        Self {
            page: offset / size as u64,
            size,
        }
    }

    pub fn first(size: u32) -> Self {
        Self::new(0, size)
    }

    /// Index of the first row in this page.
    pub fn skip(&self) -> u64 {
        self.page * self.size as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub total_elements: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub metadata: PageMetadata,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, total_elements: u64, request: PageRequest) -> Self {
        let size = request.size as u64;
        Self {
            content,
            metadata: PageMetadata {
                total_elements,
                total_pages: total_elements.div_ceil(size),
                current_page: request.page,
                page_size: request.size,
            },
        }
    }

    /// Cuts one page out of an already ordered, complete result set.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let content = all
            .into_iter()
            .skip(request.skip() as usize)
            .take(request.size as usize)
            .collect();
        Self::new(content, total, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn offset_maps_to_page_index() {
        let request = PageParams { offset: Some(50), limit: Some(20) }.validate().unwrap();
        assert_eq!(request.page, 2);
        assert_eq!(request.skip(), 40);
    }

    #[test]
    fn rejects_out_of_range_limits() {
        let result = PageParams { offset: Some(-1), limit: Some(101) }.validate();
        assert_matches!(result, Err(AppError::ValidationError(errors)) => {
            assert!(errors.contains_key("offset"));
            assert!(errors.contains_key("limit"));
        });
    }

    #[test]
    fn slices_sorted_results() {
        let page = Page::from_sorted((1..=7).collect::<Vec<_>>(), PageRequest::new(3, 3));
        assert_eq!(page.content, vec![4, 5, 6]);
        assert_eq!(page.metadata.total_pages, 3);
        assert_eq!(page.metadata.total_elements, 7);
        assert_eq!(page.metadata.current_page, 1);
    }
}
