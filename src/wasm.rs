use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::debounce::Clock;
use crate::error::QrError;
use crate::export::{Download, DownloadSink};
use crate::session::{NotificationKind, RenderOutcome, Session};
use crate::style::{ErrorCorrection, PRESETS};

/// `performance.now()`, monotonic from page load. Falls back to `Date.now()`
/// outside a window context.
struct JsClock;

impl Clock for JsClock {
    fn now(&self) -> Duration {
        let millis = web_sys::window()
            .and_then(|window| window.performance())
            .map(|performance| performance.now())
            .unwrap_or_else(js_sys::Date::now);
        Duration::from_secs_f64(millis.max(0.0) / 1000.0)
    }
}

/// Triggers a browser download through a temporary `<a download>` element.
struct AnchorSink;

impl DownloadSink for AnchorSink {
    fn deliver(&mut self, download: &Download) -> crate::error::Result<()> {
        click_download_link(&download.filename, &download.data_url())
            .map_err(|e| QrError::Download(format!("{:?}", e)))
    }
}

fn click_download_link(filename: &str, href: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let body = document.body().ok_or_else(|| JsValue::from_str("No body"))?;

    let link: web_sys::HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    link.set_download(filename);
    link.set_href(href);

    body.append_child(&link)?;
    link.click();
    body.remove_child(&link)?;
    Ok(())
}

fn to_js(err: QrError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
#[derive(Clone)]
pub struct Toast {
    title: String,
    description: String,
    pub destructive: bool,
}

#[wasm_bindgen]
impl Toast {
    pub fn get_title(&self) -> String {
        self.title.clone()
    }

    pub fn get_description(&self) -> String {
        self.description.clone()
    }
}

/// Page-side handle: the form calls the setters, the page listens for renders.
#[wasm_bindgen]
pub struct QrGeneratorApp {
    session: Rc<RefCell<Session<JsClock>>>,
    timeout: Rc<Cell<Option<i32>>>,
    listener: Rc<RefCell<Option<js_sys::Function>>>,
    on_timeout: Closure<dyn FnMut()>,
}

#[wasm_bindgen]
impl QrGeneratorApp {
    #[wasm_bindgen(constructor)]
    pub fn new() -> QrGeneratorApp {
        console_error_panic_hook::set_once();
        let session = Rc::new(RefCell::new(Session::new(JsClock)));
        let timeout = Rc::new(Cell::new(None));
        let listener = Rc::new(RefCell::new(None));
        let on_timeout = render_callback(
            Rc::clone(&session),
            Rc::clone(&timeout),
            Rc::clone(&listener),
        );
        QrGeneratorApp {
            session,
            timeout,
            listener,
            on_timeout,
        }
    }

    /// `callback` runs after every debounced render, successful or not.
    pub fn set_on_render(&self, callback: js_sys::Function) {
        *self.listener.borrow_mut() = Some(callback);
    }

    pub fn set_content(&self, content: String) {
        self.session.borrow_mut().set_content(content);
        self.schedule();
    }

    pub fn apply_example(&self, name: &str) -> Result<(), JsValue> {
        self.session.borrow_mut().apply_example(name).map_err(to_js)?;
        self.schedule();
        Ok(())
    }

    pub fn clear(&self) {
        self.session.borrow_mut().clear();
        self.schedule();
    }

    pub fn set_foreground(&self, color: String) {
        self.session.borrow_mut().set_foreground(color);
        self.schedule();
    }

    pub fn set_background(&self, color: String) {
        self.session.borrow_mut().set_background(color);
        self.schedule();
    }

    pub fn apply_preset(&self, name: &str) -> Result<(), JsValue> {
        self.session.borrow_mut().apply_preset(name).map_err(to_js)?;
        self.schedule();
        Ok(())
    }

    pub fn set_size(&self, size: u32) {
        self.session.borrow_mut().set_size(size);
        self.schedule();
    }

    pub fn set_margin(&self, margin: u32) {
        self.session.borrow_mut().set_margin(margin);
        self.schedule();
    }

    pub fn set_error_correction(&self, level: &str) -> Result<(), JsValue> {
        let level: ErrorCorrection = level.parse().map_err(to_js)?;
        self.session.borrow_mut().set_error_correction(level);
        self.schedule();
        Ok(())
    }

    pub fn get_content(&self) -> String {
        self.session.borrow().content().to_string()
    }

    pub fn get_foreground(&self) -> String {
        self.session.borrow().foreground().to_string()
    }

    pub fn get_background(&self) -> String {
        self.session.borrow().background().to_string()
    }

    pub fn get_size(&self) -> u32 {
        self.session.borrow().size()
    }

    pub fn get_margin(&self) -> u32 {
        self.session.borrow().margin()
    }

    pub fn get_error_correction(&self) -> String {
        self.session.borrow().error_correction().to_string()
    }

    pub fn can_download(&self) -> bool {
        self.session.borrow().can_download()
    }

    /// PNG data URL of the current image, `undefined` when nothing is shown.
    pub fn data_url(&self) -> Option<String> {
        self.session.borrow().rendered().map(|r| r.data_url())
    }

    pub fn download(&self) -> Result<bool, JsValue> {
        self.session
            .borrow_mut()
            .download(&mut AnchorSink)
            .map_err(to_js)
    }

    pub fn take_notification(&self) -> Option<Toast> {
        self.session.borrow_mut().pop_notification().map(|n| Toast {
            title: n.title,
            description: n.description,
            destructive: n.kind == NotificationKind::Destructive,
        })
    }

    pub fn preset_names() -> js_sys::Array {
        PRESETS.iter().map(|p| JsValue::from_str(p.name)).collect()
    }
}

impl QrGeneratorApp {
    /// Replaces any outstanding timer with one armed for the latest change. Every
    /// timer shares `on_timeout`, so cleared timers leave nothing behind.
    fn schedule(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Some(id) = self.timeout.take() {
            window.clear_timeout_with_handle(id);
        }

        let Some(delay) = self.session.borrow().remaining() else {
            return;
        };

        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            self.on_timeout.as_ref().unchecked_ref(),
            delay.as_millis() as i32,
        ) {
            Ok(id) => self.timeout.set(Some(id)),
            Err(e) => web_sys::console::error_2(&JsValue::from_str("Failed to schedule render:"), &e),
        }
    }
}

impl Default for QrGeneratorApp {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for QrGeneratorApp {
    fn drop(&mut self) {
        if let Some(id) = self.timeout.take() {
            if let Some(window) = web_sys::window() {
                window.clear_timeout_with_handle(id);
            }
        }
    }
}

fn render_callback(
    session: Rc<RefCell<Session<JsClock>>>,
    timeout: Rc<Cell<Option<i32>>>,
    listener: Rc<RefCell<Option<js_sys::Function>>>,
) -> Closure<dyn FnMut()> {
    Closure::new(move || {
        timeout.set(None);

        let outcome = {
            let mut session = session.borrow_mut();
            match session.pending_ticket() {
                Some(ticket) => session.fire(ticket),
                None => None,
            }
        };
        if outcome == Some(RenderOutcome::Failed) {
            if let Some(message) = session.borrow().last_error() {
                web_sys::console::error_2(
                    &JsValue::from_str("Error generating QR code:"),
                    &JsValue::from_str(message),
                );
            }
        }

        if outcome.is_some() {
            let callback = listener.borrow().clone();
            if let Some(callback) = callback {
                if let Err(e) = callback.call0(&JsValue::NULL) {
                    web_sys::console::error_1(&e);
                }
            }
        }
    })
}
