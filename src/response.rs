use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub total: Option<i64>,
    pub has_more: Option<bool>,
}

impl Meta {
    /// Pagination metadata for a page that returned `returned` rows out of `total`.
    pub fn new(page: i64, limit: i64, total: i64, returned: usize) -> Self {
        let offset = (page - 1) * limit;
        Self {
            page: Some(page),
            limit: Some(limit),
            total: Some(total),
            has_more: Some(offset + (returned as i64) < total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            limit: None,
            total: None,
            has_more: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta,
        }
    }

    /// Wrap the payload in another type, keeping the message and metadata.
    pub fn map<U: Serialize>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            message: self.message,
            data: self.data.map(f),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_more_is_false_on_last_page() {
        let meta = Meta::new(2, 8, 12, 4);
        assert_eq!(meta.has_more, Some(false));
    }

    #[test]
    fn has_more_is_true_when_rows_remain() {
        let meta = Meta::new(1, 2, 5, 2);
        assert_eq!(meta.has_more, Some(true));
    }
}
