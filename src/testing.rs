use crate::error::{ComicSaverError, Result};
use crate::scroll::{BOTTOM_SCRIPT, HEIGHT_SCRIPT, SCROLL_SCRIPT};
use crate::traits::{BrowserCookie, PageDriver};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

pub const FAKE_USER_AGENT: &str = "FakeAgent/1.0";

type HeightModel = Box<dyn Fn(usize) -> i64 + Send + Sync>;

#[derive(Default)]
struct ScrollModel {
    step: usize,
    offset: i64,
}

/// Scripted browser: page height follows a model indexed by scroll step.
pub struct FakeDriver {
    height_at: HeightModel,
    viewport: i64,
    scroll: Mutex<ScrollModel>,
    pages: HashMap<String, String>,
    current: Mutex<Option<String>>,
    navigations: Mutex<Vec<String>>,
    cookies: Vec<BrowserCookie>,
    element_count: usize,
}

impl FakeDriver {
    /// Heights per scroll step; the last value holds forever.
    pub fn with_heights(heights: Vec<i64>, viewport: i64) -> Self {
        Self::new(
            Box::new(move |step| heights[step.min(heights.len() - 1)]),
            viewport,
        )
    }

    /// Every scroll step adds one viewport of content.
    pub fn growing(viewport: i64) -> Self {
        Self::new(Box::new(move |step| viewport * (step as i64 + 2)), viewport)
    }

    fn new(height_at: HeightModel, viewport: i64) -> Self {
        Self {
            height_at,
            viewport,
            scroll: Mutex::new(ScrollModel::default()),
            pages: HashMap::new(),
            current: Mutex::new(None),
            navigations: Mutex::new(Vec::new()),
            cookies: Vec::new(),
            element_count: 1,
        }
    }

    /// Serves `html` for any navigation whose URL starts with `url_prefix`.
    pub fn page(mut self, url_prefix: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url_prefix.to_string(), html.into());
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(BrowserCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: "readcomiconline.li".to_string(),
            path: "/".to_string(),
        });
        self
    }

    pub fn element_count(mut self, count: usize) -> Self {
        self.element_count = count;
        self
    }

    pub fn scroll_count(&self) -> usize {
        self.scroll.lock().unwrap().step
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        *self.scroll.lock().unwrap() = ScrollModel::default();

        let page = self
            .pages
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, html)| html.clone());
        *self.current.lock().unwrap() = page;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let mut scroll = self.scroll.lock().unwrap();
        let height = (self.height_at)(scroll.step);
        match script {
            SCROLL_SCRIPT => {
                scroll.step += 1;
                let height = (self.height_at)(scroll.step);
                scroll.offset = (scroll.offset + self.viewport).min((height - self.viewport).max(0));
                Ok(json!(true))
            }
            HEIGHT_SCRIPT => Ok(json!(height)),
            BOTTOM_SCRIPT => Ok(json!(scroll.offset + self.viewport)),
            other => Err(ComicSaverError::script(format!("unexpected script: {}", other))),
        }
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        Ok(self.cookies.clone())
    }

    async fn count_elements(&self, _selector: &str) -> Result<usize> {
        Ok(self.element_count)
    }

    async fn user_agent(&self) -> Result<String> {
        Ok(FAKE_USER_AGENT.to_string())
    }
}
