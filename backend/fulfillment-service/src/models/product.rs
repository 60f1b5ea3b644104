use serde::{Deserialize, Serialize};

/// Catalog entry for a purchasable project.
///
/// `file_ref` is either an object key inside the storage bucket or the public
/// URL the file was originally uploaded under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Price in the smallest currency unit
    pub price: i64,
    pub file_ref: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub description: Option<String>,
}

impl Product {
    /// Non-blank file reference, if the product has one.
    pub fn file_reference(&self) -> Option<&str> {
        self.file_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(file_ref: Option<&str>) -> Product {
        Product {
            id: "p1".into(),
            name: "Starter Kit".into(),
            price: 500,
            file_ref: file_ref.map(str::to_string),
            thumbnail_ref: None,
            description: None,
        }
    }

    #[test]
    fn test_blank_file_reference_is_missing() {
        assert_eq!(product(None).file_reference(), None);
        assert_eq!(product(Some("   ")).file_reference(), None);
        assert_eq!(product(Some(" f1 ")).file_reference(), Some("f1"));
    }
}
