use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::config::ChunkerConfig;
use crate::content_script::ContentScript;
use crate::dom::DomTree;
use crate::error::{ChunkError, Result};
use crate::host::HostChannel;
use crate::surface::TabSurface;
use headless_chrome::{Browser, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// A Chrome/Chromium instance whose active tab hosts the content script
pub struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Hide the automation banner and navigator.webdriver flag
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // Navigation sessions sit idle while the user reads; the default is 30 seconds
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.path = options.chrome_path;
        launch_opts.user_data_dir = options.user_data_dir;
        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| ChunkError::LaunchFailed(e.to_string()))?;
        browser
            .new_tab()
            .map_err(|e| ChunkError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        log::info!("Launched browser (headless: {})", options.headless);
        Ok(Self { browser })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect(options.ws_url).map_err(|e| ChunkError::ConnectionFailed(e.to_string()))?;
        Ok(Self { browser })
    }

    /// Get the active tab
    pub fn tab(&self) -> Result<Arc<Tab>> {
        self.get_active_tab()
    }

    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| ChunkError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// Get the currently active tab by checking the document visibility and focus state
    pub fn get_active_tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.get_tabs()?;

        for probe in [
            "document.visibilityState === 'visible' && document.hasFocus()",
            "document.visibilityState === 'visible'",
        ] {
            for tab in &tabs {
                match tab.evaluate(probe, false) {
                    Ok(remote_object) => {
                        if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                            return Ok(tab.clone());
                        }
                    }
                    Err(e) => log::debug!("Failed to check tab status: {}", e),
                }
            }
        }

        // A headless tab that was never shown can still be the only one
        match tabs.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(ChunkError::TabOperationFailed("No active tab found".to_string())),
        }
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Navigate the active tab and wait for the load to finish
    pub fn navigate(&self, url: &str) -> Result<()> {
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| ChunkError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| ChunkError::NavigationFailed(format!("Navigation timeout: {}", e)))?;

        log::info!("Navigated to {}", url);
        Ok(())
    }

    /// Capture the DOM of the active tab
    pub fn snapshot(&self) -> Result<DomTree> {
        DomTree::from_tab(&self.tab()?)
    }

    /// Page surface over the active tab
    pub fn surface(&self, config: &ChunkerConfig) -> Result<TabSurface> {
        Ok(TabSurface::new(self.tab()?).with_retry(config.retry.clone()))
    }

    /// Content script bound to the active tab
    pub fn content_script<H: HostChannel>(&self, host: H, config: ChunkerConfig) -> Result<ContentScript<TabSurface, H>> {
        let surface = self.surface(&config)?;
        ContentScript::new(surface, host, config)
    }

    /// Close every tab; the browser process exits when dropped
    pub fn close(&self) -> Result<()> {
        for tab in self.get_tabs()? {
            if let Err(e) = tab.close(false) {
                log::debug!("Failed to close tab: {}", e);
            }
        }
        Ok(())
    }
}
