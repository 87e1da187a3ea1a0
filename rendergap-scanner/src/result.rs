use serde::{Deserialize, Serialize};

/// One URL rendered under one scripting mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderCapture {
    pub url: String,
    pub javascript_enabled: bool,
    pub html: String,
    pub text: String,
    /// Only captured on the scripting-disabled pass.
    pub title: Option<String>,
}

impl RenderCapture {
    pub fn new(url: String, javascript_enabled: bool, html: String, title: Option<String>) -> Self {
        let text = crate::extract::visible_text(&html);
        Self {
            url,
            javascript_enabled,
            html,
            text,
            title,
        }
    }

    /// Length of the visible text in characters.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Both renders of a page and the share of its text that survives without
/// scripting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub url: String,
    pub ssr_percentage: f64,
    pub page_title: Option<String>,
    /// Scripting disabled.
    pub initial: RenderCapture,
    /// Scripting enabled.
    pub rendered: RenderCapture,
}
