use serde::{Deserialize, Serialize};

/// Grading certificate attached to a stone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(default)]
    pub lab: Option<String>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default, rename = "certNumber")]
    pub cert_number: Option<String>,
    #[serde(default)]
    pub carats: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub clarity: Option<String>,
    #[serde(default)]
    pub cut: Option<String>,
}

/// Media and certificate block nested under each upstream item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiamondDetail {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub certificate: Option<Certificate>,
}

/// One purchasable stone as returned by the inventory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiamondRecord {
    pub id: String,
    #[serde(default)]
    pub diamond: Option<DiamondDetail>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub discount: Option<f64>,
}

impl DiamondRecord {
    /// Non-blank image URL, if the stone has one.
    pub fn image_url(&self) -> Option<&str> {
        self.diamond
            .as_ref()
            .and_then(|d| d.image.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.image_url().is_some()
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.diamond.as_ref().and_then(|d| d.certificate.as_ref())
    }

    pub fn carats(&self) -> Option<f64> {
        self.certificate().and_then(|c| c.carats)
    }

    pub fn color(&self) -> Option<&str> {
        self.certificate().and_then(|c| c.color.as_deref())
    }

    pub fn clarity(&self) -> Option<&str> {
        self.certificate().and_then(|c| c.clarity.as_deref())
    }

    pub fn cut(&self) -> Option<&str> {
        self.certificate().and_then(|c| c.cut.as_deref())
    }
}

/// One page of normalized search output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub items: Vec<DiamondRecord>,
    /// Upstream-reported total; never recomputed from the filtered page.
    pub total_count: u64,
    pub has_more: bool,
    /// Items the upstream returned before the image policy was applied.
    pub page_size: usize,
    pub offset: u32,
}

impl SearchResult {
    pub fn empty(offset: u32) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            has_more: false,
            page_size: 0,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_upstream_item() {
        let item: DiamondRecord = serde_json::from_value(json!({
            "id": "abc",
            "price": 125000,
            "discount": null,
            "diamond": {
                "image": "https://img.example/1.jpg",
                "video": null,
                "certificate": {
                    "lab": "GIA",
                    "shape": "ROUND",
                    "certNumber": "2141438170",
                    "carats": 1.01,
                    "color": "E",
                    "clarity": "VS1",
                    "cut": "EX"
                }
            }
        }))
        .unwrap();
        assert_eq!(item.price, Some(125000.0));
        assert_eq!(item.carats(), Some(1.01));
        assert_eq!(item.cut(), Some("EX"));
        assert_eq!(
            item.certificate().and_then(|c| c.cert_number.as_deref()),
            Some("2141438170")
        );
        assert!(item.has_image());
    }

    #[test]
    fn blank_image_is_not_an_image() {
        let item: DiamondRecord = serde_json::from_value(json!({
            "id": "abc",
            "diamond": { "image": "   " }
        }))
        .unwrap();
        assert!(!item.has_image());

        let bare: DiamondRecord = serde_json::from_value(json!({ "id": "x" })).unwrap();
        assert!(!bare.has_image());
        assert_eq!(bare.carats(), None);
    }
}
