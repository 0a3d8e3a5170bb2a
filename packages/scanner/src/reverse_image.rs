//! Reverse-image search helper: one-click engine URLs for an image.
//!
//! Pure URL templating; no network calls are made.

use serde::Serialize;

/// One search-engine link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineLink {
    pub engine: &'static str,
    pub url: String,
}

/// Build the fixed, ordered list of reverse-image search URLs for an
/// image URL.
pub fn links_for(image_url: &str) -> Vec<EngineLink> {
    let encoded = urlencoding::encode(image_url);
    vec![
        EngineLink {
            engine: "Google Images",
            url: format!("https://www.google.com/searchbyimage?image_url={encoded}"),
        },
        EngineLink {
            engine: "Google Lens",
            url: format!("https://lens.google.com/uploadbyurl?url={encoded}"),
        },
        EngineLink {
            engine: "Bing Visual Search",
            url: format!("https://www.bing.com/images/search?view=detailv2&iss=sbi&q=imgurl:{encoded}"),
        },
        EngineLink {
            engine: "TinEye",
            url: format!("https://tineye.com/search?url={encoded}"),
        },
        EngineLink {
            engine: "Yandex Images",
            url: format!("https://yandex.com/images/search?rpt=imageview&url={encoded}"),
        },
    ]
}
