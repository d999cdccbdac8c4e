//! In-memory catalog site implementing [`PageAutomation`] for tests.
//!
//! Pages are rendered from state on every call and queried with the same CSS
//! selectors the crawler uses, so clicks and waits behave like a small DOM.

use crate::browser::{AutomationError, PageAutomation, WaitOptions, WaitPolicy, SNAPSHOT_SCRIPT};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct FakeRow {
    pub sku: String,
    pub vpn: String,
    pub upc: Option<String>,
    pub msrp: String,
    pub price: String,
    pub stock: String,
}

impl FakeRow {
    pub fn new(sku: impl Into<String>) -> Self {
        let sku = sku.into();
        Self {
            vpn: format!("VPN-{}", sku),
            upc: Some(format!("UPC-{}", sku)),
            msrp: "100.00".to_string(),
            price: "89.99".to_string(),
            stock: "5".to_string(),
            sku,
        }
    }

    pub fn without_upc(mut self) -> Self {
        self.upc = None;
        self
    }

    fn render(&self) -> String {
        let upc = self
            .upc
            .as_ref()
            .map(|u| format!(r#"<div class="product info ean show">{}</div>"#, u))
            .unwrap_or_default();

        format!(
            r#"<div class="row product">
                <a class="js-adobe-tracking" href="/Site/ProductDetail?sku={sku}">
                    <span>Item {sku}</span>
                </a>
                <span class="sku">{sku}</span>
                <span class="vpn">{vpn}</span>
                <p class="msrp"><span class="display-block">{msrp}</span></p>
                <p class="panda-price">{price}</p>
                {upc}
                <a class="stockinformation">{stock}</a>
            </div>"#,
            sku = self.sku,
            vpn = self.vpn,
            msrp = self.msrp,
            price = self.price,
            upc = upc,
            stock = self.stock,
        )
    }
}

#[derive(Debug, Clone)]
pub struct FakeCategory {
    pub label: String,
    pub id: String,
    pub pages: Vec<Vec<FakeRow>>,
}

impl FakeCategory {
    /// A category whose pages hold the given number of generated rows.
    pub fn with_page_sizes(label: &str, id: &str, sizes: &[usize]) -> Self {
        let pages = sizes
            .iter()
            .enumerate()
            .map(|(p, &n)| {
                (0..n).map(|r| FakeRow::new(format!("{}-p{}-r{}", id, p + 1, r + 1))).collect()
            })
            .collect();
        Self { label: label.to_string(), id: id.to_string(), pages }
    }
}

#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub login_form: bool,
    pub listing: bool,
    pub category_panel: bool,
    pub categories: Vec<FakeCategory>,
    /// Render a disabled next control on the last page instead of omitting it.
    pub disabled_next_on_last: bool,
    /// The first snapshot after a category click still shows the old listing.
    pub lagging_toggle: bool,
    /// Submitting the login form signs in.
    pub accept_login: bool,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            login_form: true,
            listing: true,
            category_panel: true,
            categories: Vec::new(),
            disabled_next_on_last: false,
            lagging_toggle: false,
            accept_login: true,
        }
    }
}

#[derive(Debug, Default)]
enum Location {
    #[default]
    Blank,
    Login,
    Search,
}

#[derive(Debug, Default)]
struct State {
    location: Location,
    logged_in: bool,
    focused: Option<String>,
    typed: Vec<String>,
    checked: Vec<bool>,
    page: usize,
    max_checked: usize,
    navigations: Vec<String>,
    next_clicks: usize,
    snapshots: usize,
    /// Markup served by the next snapshot instead of the live page.
    stale: Option<String>,
    closed: bool,
}

/// Cloneable handle; clones share state so tests can inspect after a run.
#[derive(Clone)]
pub struct FakeSite {
    layout: Arc<SiteLayout>,
    state: Arc<Mutex<State>>,
}

impl FakeSite {
    pub fn new(layout: SiteLayout) -> Self {
        let state = State { checked: vec![false; layout.categories.len()], ..State::default() };
        Self { layout: Arc::new(layout), state: Arc::new(Mutex::new(state)) }
    }

    pub fn logged_in(&self) -> bool {
        self.state.lock().unwrap().logged_in
    }

    pub fn typed(&self) -> Vec<String> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn next_clicks(&self) -> usize {
        self.state.lock().unwrap().next_clicks
    }

    pub fn snapshots(&self) -> usize {
        self.state.lock().unwrap().snapshots
    }

    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Highest number of simultaneously checked categories seen.
    pub fn max_checked(&self) -> usize {
        self.state.lock().unwrap().max_checked
    }

    pub fn any_checked(&self) -> bool {
        self.state.lock().unwrap().checked.iter().any(|c| *c)
    }

    fn render(&self, state: &State) -> String {
        let body = match state.location {
            Location::Blank => String::new(),
            Location::Login => self.render_login(state),
            Location::Search => self.render_search(state),
        };
        format!("<html><body>{}</body></html>", body)
    }

    fn render_login(&self, state: &State) -> String {
        if state.logged_in {
            return "<p>Welcome back</p>".to_string();
        }
        if !self.layout.login_form {
            return "<p>Maintenance</p>".to_string();
        }
        r#"<form>
            <input id="okta-signin-username" data-action="focus">
            <input id="okta-signin-password" type="password" data-action="focus">
            <input id="okta-signin-submit" type="submit" data-action="submit">
        </form>"#
            .to_string()
    }

    fn render_search(&self, state: &State) -> String {
        if !self.layout.listing {
            return "<p>Loading...</p>".to_string();
        }

        let mut html = String::new();

        if self.layout.category_panel {
            html.push_str(r#"<div id="category-facet">"#);
            for (i, cat) in self.layout.categories.iter().enumerate() {
                let checked = if state.checked[i] { " checked" } else { "" };
                html.push_str(&format!(
                    concat!(
                        r#"<label class="checkbox">"#,
                        r#"<input type="checkbox" id="{}" data-action="toggle" data-index="{}"{}>"#,
                        " {} ({})</label>"
                    ),
                    cat.id,
                    i,
                    checked,
                    cat.label,
                    cat.pages.iter().map(Vec::len).sum::<usize>()
                ));
            }
            html.push_str("</div>");
        }

        let active: Vec<&FakeCategory> = self
            .layout
            .categories
            .iter()
            .zip(&state.checked)
            .filter_map(|(cat, checked)| checked.then_some(cat))
            .collect();

        let filter: Vec<&str> = active.iter().map(|c| c.id.as_str()).collect();
        html.push_str(&format!(
            r#"<div id="searchResults" data-filter="{}" data-page="{}">"#,
            filter.join(","),
            state.page + 1
        ));
        for cat in &active {
            if let Some(rows) = cat.pages.get(state.page) {
                for row in rows {
                    html.push_str(&row.render());
                }
            }
        }
        html.push_str("</div>");

        let last_page = active.iter().map(|c| c.pages.len()).max().unwrap_or(1).max(1) - 1;
        if state.page < last_page {
            html.push_str(concat!(
                r#"<ul class="pagination"><li class="next">"#,
                r##"<a href="#" data-action="next">Next</a></li></ul>"##
            ));
        } else if self.layout.disabled_next_on_last {
            html.push_str(concat!(
                r#"<ul class="pagination"><li class="next">"#,
                r#"<a class="disabled" aria-disabled="true">Next</a></li></ul>"#
            ));
        }

        html
    }

    fn find_attrs(html: &str, selector: &str) -> Option<Vec<(String, String)>> {
        let selector = Selector::parse(selector).ok()?;
        let document = Html::parse_document(html);
        let element = document.select(&selector).next()?;
        Some(element.value().attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

#[async_trait]
impl PageAutomation for FakeSite {
    async fn navigate(&self, url: &str, _policy: WaitPolicy) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(AutomationError::SessionClosed);
        }
        state.navigations.push(url.to_string());
        state.location =
            if url.contains("/Site/Search") { Location::Search } else { Location::Login };
        Ok(())
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        options: WaitOptions,
    ) -> Result<(), AutomationError> {
        let state = self.state.lock().unwrap();
        let html = self.render(&state);

        match Self::find_attrs(&html, selector) {
            Some(attrs) if !options.visible || attr(&attrs, "hidden").is_none() => Ok(()),
            _ => Err(AutomationError::Timeout {
                selector: selector.to_string(),
                timeout: options.timeout,
            }),
        }
    }

    async fn is_interactable(&self, selector: &str) -> Result<bool, AutomationError> {
        let state = self.state.lock().unwrap();
        let html = self.render(&state);

        Ok(match Self::find_attrs(&html, selector) {
            Some(attrs) => {
                attr(&attrs, "disabled").is_none()
                    && attr(&attrs, "aria-disabled") != Some("true")
                    && !attr(&attrs, "class")
                        .unwrap_or("")
                        .split_whitespace()
                        .any(|c| c == "disabled")
            }
            None => false,
        })
    }

    async fn click(&self, selector: &str) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(AutomationError::SessionClosed);
        }
        let html = self.render(&state);
        let attrs = Self::find_attrs(&html, selector)
            .ok_or_else(|| AutomationError::NotFound { selector: selector.to_string() })?;

        match attr(&attrs, "data-action") {
            Some("focus") => state.focused = attr(&attrs, "id").map(String::from),
            Some("submit") => state.logged_in = self.layout.accept_login,
            Some("toggle") => {
                if self.layout.lagging_toggle {
                    state.stale = Some(html.clone());
                }
                let index: usize =
                    attr(&attrs, "data-index").and_then(|i| i.parse().ok()).unwrap_or(0);
                let flag = &mut state.checked[index];
                *flag = !*flag;
                state.page = 0;
                let checked = state.checked.iter().filter(|c| **c).count();
                state.max_checked = state.max_checked.max(checked);
            }
            Some("next") => {
                state.page += 1;
                state.next_clicks += 1;
            }
            _ => {}
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        if state.focused.is_none() {
            return Err(AutomationError::Driver("no focused element".to_string()));
        }
        state.typed.push(text.to_string());
        Ok(())
    }

    async fn evaluate(&self, script: &str, _args: Vec<Value>) -> Result<Value, AutomationError> {
        let mut state = self.state.lock().unwrap();
        if script != SNAPSHOT_SCRIPT {
            return Err(AutomationError::Script(format!("unsupported script: {}", script)));
        }
        state.snapshots += 1;
        let html = match state.stale.take() {
            Some(stale) => stale,
            None => self.render(&state),
        };
        Ok(Value::String(html))
    }

    async fn close(&self) -> Result<(), AutomationError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
