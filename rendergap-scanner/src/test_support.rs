//! In-memory renderer for unit tests.

use crate::error::{Result, ScanError};
use crate::renderer::{ContextOptions, RenderContext, Renderer, WaitUntil};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
pub(crate) struct StubPage {
    pub html: String,
    pub title: Option<String>,
    pub scripts: HashMap<String, Value>,
}

/// Serves one page for scripted contexts and another for static ones, and
/// counts how many contexts were opened and closed.
#[derive(Default)]
pub(crate) struct StubRenderer {
    pub scripted: StubPage,
    pub static_only: StubPage,
    pub fail_navigation: bool,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl StubRenderer {
    pub fn scripted(html: &str) -> Self {
        Self {
            scripted: StubPage {
                html: html.to_string(),
                ..StubPage::default()
            },
            ..Self::default()
        }
    }

    pub fn with_static(mut self, html: &str, title: Option<&str>) -> Self {
        self.static_only = StubPage {
            html: html.to_string(),
            title: title.map(str::to_string),
            ..StubPage::default()
        };
        self
    }

    pub fn with_script(mut self, script: &str, value: Value) -> Self {
        self.scripted.scripts.insert(script.to_string(), value);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_navigation: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct StubContext {
    page: StubPage,
    fail_navigation: bool,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let page = if options.javascript_enabled {
            self.scripted.clone()
        } else {
            self.static_only.clone()
        };
        Ok(Box::new(StubContext {
            page,
            fail_navigation: self.fail_navigation,
            closed: self.closed.clone(),
        }))
    }
}

#[async_trait]
impl RenderContext for StubContext {
    async fn navigate(&mut self, url: &str, _wait: WaitUntil) -> Result<()> {
        if self.fail_navigation {
            return Err(ScanError::Render(format!("net::ERR_CONNECTION_REFUSED at {url}")));
        }
        Ok(())
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        Ok(self.page.scripts.get(script).cloned().unwrap_or(Value::Bool(false)))
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.html.clone())
    }

    async fn title(&self) -> Result<Option<String>> {
        Ok(self.page.title.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
