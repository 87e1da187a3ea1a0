//! Picks the pages worth rendering out of a site's candidate links.

use crate::model::PageDepth;

/// Path fragments that mark a URL as a content page.
pub const SEO_KEYWORDS: [&str; 9] = [
    "product", "blog", "article", "post", "category", "news", "shop", "item", "service",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    pub homepage: Option<String>,
    pub mid_page: Option<String>,
    pub deep_page: Option<String>,
}

impl PageSelection {
    /// Selected pages in Homepage, Mid, Deep order.
    pub fn pages(&self) -> Vec<(PageDepth, &str)> {
        [
            (PageDepth::Homepage, &self.homepage),
            (PageDepth::Mid, &self.mid_page),
            (PageDepth::Deep, &self.deep_page),
        ]
        .into_iter()
        .filter_map(|(depth, url)| url.as_deref().map(|u| (depth, u)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.homepage.is_none() && self.mid_page.is_none() && self.deep_page.is_none()
    }
}

pub fn is_seo_relevant(url: &str) -> bool {
    let lower = url.to_lowercase();
    SEO_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

pub fn select(urls: &[String]) -> PageSelection {
    let Some(first) = urls.first() else {
        return PageSelection::default();
    };

    if urls.len() < 3 {
        return PageSelection {
            homepage: Some(first.clone()),
            ..PageSelection::default()
        };
    }

    let relevant: Vec<&String> = urls.iter().filter(|u| is_seo_relevant(u)).collect();

    let mid_page = if relevant.is_empty() {
        &urls[urls.len() / 2]
    } else {
        relevant[relevant.len() / 2]
    };

    let deep_page = match relevant.last() {
        Some(last) if relevant.len() >= 2 => *last,
        _ => &urls[urls.len() - 1],
    };

    PageSelection {
        homepage: Some(first.clone()),
        mid_page: Some(mid_page.clone()),
        deep_page: Some(deep_page.clone()),
    }
}
