use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use tokio::sync::OnceCell;

use crate::error::HostError;
use crate::models::ExtractionResult;
use crate::utils::mykoob::extract_grades;

/// Only tabs whose URL contains this are scraped.
pub const GRADES_PAGE: &str = "https://family.mykoob.lv/?viewgrades/period";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub url: Option<String>,
}

impl Tab {
    pub fn is_grades_page(&self) -> bool {
        self.url.as_deref().is_some_and(|url| url.contains(GRADES_PAGE))
    }
}

/// A place the grades page is rendered in.
///
/// Implementations only discover the active tab and hand over its markup;
/// the extraction itself is shared.
#[async_trait]
pub trait Host: Send + Sync {
    async fn active_tab(&self) -> Result<Option<Tab>, HostError>;

    async fn page_source(&self, tab: &Tab) -> Result<Option<String>, HostError>;

    async fn inject_extractor(&self, tab: &Tab) -> Result<Option<ExtractionResult>, HostError> {
        Ok(self.page_source(tab).await?.map(|html| extract_grades(&html)))
    }
}

/// A grades page saved to disk ("Save page as..." in the browser).
pub struct SnapshotHost {
    path: PathBuf,
    url: Option<String>,
    html: OnceCell<String>,
}

impl SnapshotHost {
    /// `url` overrides the address recorded in the snapshot itself.
    pub fn new(path: impl Into<PathBuf>, url: Option<String>) -> Self {
        SnapshotHost {
            path: path.into(),
            url,
            html: OnceCell::new(),
        }
    }

    // The file is read on first use and shared by the tab query and the injection.
    async fn read(&self) -> Result<&str, HostError> {
        self.html
            .get_or_try_init(|| read_snapshot(&self.path))
            .await
            .map(String::as_str)
    }
}

async fn read_snapshot(path: &Path) -> Result<String, HostError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn saved_from_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<!--\s*saved from url=\(\d+\)(\S+?)\s*-->").expect("saved-from pattern is valid")
    })
}

/// The address browsers record in the `<!-- saved from url=(NNNN)... -->` comment.
pub fn saved_from_url(html: &str) -> Option<String> {
    saved_from_pattern()
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|url| url.as_str().to_string())
}

#[async_trait]
impl Host for SnapshotHost {
    async fn active_tab(&self) -> Result<Option<Tab>, HostError> {
        if let Some(url) = &self.url {
            return Ok(Some(Tab {
                url: Some(url.clone()),
            }));
        }
        let url = saved_from_url(self.read().await?);
        if url.is_none() {
            info!("{} does not record the address it was saved from", self.path.display());
        }
        Ok(Some(Tab { url }))
    }

    async fn page_source(&self, _tab: &Tab) -> Result<Option<String>, HostError> {
        let html = self.read().await?;
        if html.trim().is_empty() {
            debug!("{} is empty", self.path.display());
            return Ok(None);
        }
        Ok(Some(html.to_string()))
    }
}

#[cfg(feature = "chromium")]
pub use chromium::ChromiumHost;

#[cfg(feature = "chromium")]
mod chromium {
    use async_trait::async_trait;
    use chromiumoxide::browser::Browser;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use log::{debug, warn};
    use tokio::task::JoinHandle;

    use super::{Host, Tab};
    use crate::error::HostError;

    /// A running Chromium reached over the DevTools protocol
    /// (start it with `--remote-debugging-port=9222`).
    pub struct ChromiumHost {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    impl ChromiumHost {
        pub async fn connect(endpoint: &str) -> Result<Self, HostError> {
            let (browser, mut handler) = Browser::connect(endpoint)
                .await
                .map_err(|e| HostError::Connect(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!("DevTools handler stopped: {}", e);
                        break;
                    }
                }
            });

            Ok(ChromiumHost { browser, handler })
        }

        async fn tabs(&self) -> Result<Vec<(Page, Tab)>, HostError> {
            let pages = self
                .browser
                .pages()
                .await
                .map_err(|e| HostError::Connect(e.to_string()))?;

            let mut tabs = Vec::with_capacity(pages.len());
            for page in pages {
                let url = page
                    .url()
                    .await
                    .map_err(|e| HostError::Connect(e.to_string()))?
                    .map(|u| u.to_string());
                tabs.push((page, Tab { url }));
            }
            Ok(tabs)
        }
    }

    impl Drop for ChromiumHost {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }

    #[async_trait]
    impl Host for ChromiumHost {
        async fn active_tab(&self) -> Result<Option<Tab>, HostError> {
            let tabs = self.tabs().await?;
            let grades_tab = tabs.iter().find(|(_, tab)| tab.is_grades_page());
            Ok(grades_tab.or(tabs.first()).map(|(_, tab)| tab.clone()))
        }

        async fn page_source(&self, tab: &Tab) -> Result<Option<String>, HostError> {
            let Some((page, _)) = self.tabs().await?.into_iter().find(|(_, t)| t == tab) else {
                warn!("Tab {:?} went away before it could be read", tab.url);
                return Ok(None);
            };

            let html: String = page
                .evaluate("document.documentElement.outerHTML")
                .await
                .map_err(|e| HostError::Injection(e.to_string()))?
                .into_value()
                .map_err(|e| HostError::Injection(format!("failed to read page HTML: {e:?}")))?;
            Ok(Some(html))
        }
    }
}
