use image::RgbaImage;
use std::collections::VecDeque;

use crate::debounce::{Clock, Debouncer, Ticket};
use crate::error::{QrError, Result};
use crate::export::{encode_png, to_data_url, Download, DownloadSink, DEFAULT_FILENAME};
use crate::qr::{self, QrMatrix};
use crate::style::{
    clamp_margin, clamp_size, find_preset, ErrorCorrection, Style, DEFAULT_BACKGROUND,
    DEFAULT_FOREGROUND, DEFAULT_MARGIN, DEFAULT_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickExample {
    pub name: &'static str,
    pub content: &'static str,
}

pub const EXAMPLES: [QuickExample; 4] = [
    QuickExample { name: "GitHub", content: "https://github.com" },
    QuickExample { name: "Hello World", content: "Hello, World!" },
    QuickExample { name: "Email", content: "mailto:contact@example.com" },
    QuickExample { name: "Phone", content: "tel:+1234567890" },
];

/// Matches names case-insensitively, ignoring spaces ("hello world" == "helloworld").
pub fn find_example(name: &str) -> Result<&'static QuickExample> {
    let wanted: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    EXAMPLES
        .iter()
        .find(|e| {
            let candidate: String = e.name.chars().filter(|c| !c.is_whitespace()).collect();
            candidate.eq_ignore_ascii_case(&wanted)
        })
        .ok_or_else(|| QrError::UnknownExample(name.trim().to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Destructive,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
}

impl Notification {
    fn success(description: &str) -> Self {
        Notification {
            title: "Success".to_string(),
            description: description.to_string(),
            kind: NotificationKind::Info,
        }
    }

    fn error(description: &str) -> Self {
        Notification {
            title: "Error".to_string(),
            description: description.to_string(),
            kind: NotificationKind::Destructive,
        }
    }
}

/// The last successful render.
#[derive(Debug, Clone)]
pub struct RenderedQr {
    pub content: String,
    pub style: Style,
    pub image: RgbaImage,
    pub matrix: QrMatrix,
    pub png: Vec<u8>,
}

impl RenderedQr {
    pub fn data_url(&self) -> String {
        to_data_url(&self.png)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Content was empty; any previous image was dropped.
    Cleared,
    Rendered,
    Failed,
}

/// Starting values for a session's style fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDefaults {
    pub foreground: String,
    pub background: String,
    pub size: u32,
    pub margin: u32,
    pub error_correction: ErrorCorrection,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        StyleDefaults {
            foreground: DEFAULT_FOREGROUND.to_string(),
            background: DEFAULT_BACKGROUND.to_string(),
            size: DEFAULT_SIZE,
            margin: DEFAULT_MARGIN,
            error_correction: ErrorCorrection::M,
        }
    }
}

/// Content and style being edited. Every change restarts the debouncer;
/// front ends render through [`Session::poll`] or [`Session::fire`].
pub struct Session<C: Clock> {
    clock: C,
    debouncer: Debouncer,

    content: String,
    foreground: String,
    background: String,
    size: u32,
    margin: u32,
    error_correction: ErrorCorrection,

    rendered: Option<RenderedQr>,
    last_error: Option<String>,
    render_count: u64,
    download_filename: String,
    notifications: VecDeque<Notification>,
}

impl<C: Clock> Session<C> {
    pub fn new(clock: C) -> Self {
        Self::with_style(clock, Debouncer::default(), StyleDefaults::default())
    }

    pub fn with_style(clock: C, debouncer: Debouncer, defaults: StyleDefaults) -> Self {
        Session {
            clock,
            debouncer,
            content: String::new(),
            foreground: defaults.foreground,
            background: defaults.background,
            size: clamp_size(defaults.size),
            margin: clamp_margin(defaults.margin),
            error_correction: defaults.error_correction,
            rendered: None,
            last_error: None,
            render_count: 0,
            download_filename: DEFAULT_FILENAME.to_string(),
            notifications: VecDeque::new(),
        }
    }

    pub fn set_download_filename(&mut self, filename: impl Into<String>) {
        self.download_filename = filename.into();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn foreground(&self) -> &str {
        &self.foreground
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    pub fn error_correction(&self) -> ErrorCorrection {
        self.error_correction
    }

    pub fn rendered(&self) -> Option<&RenderedQr> {
        self.rendered.as_ref()
    }

    /// Message of the most recent failed render, cleared by the next render.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn pending_ticket(&self) -> Option<Ticket> {
        self.debouncer.pending_ticket()
    }

    pub fn remaining(&self) -> Option<std::time::Duration> {
        self.debouncer.remaining(self.clock.now())
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    pub fn can_download(&self) -> bool {
        self.rendered.is_some()
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if content != self.content {
            self.content = content;
            self.changed("content");
        }
    }

    pub fn apply_example(&mut self, name: &str) -> Result<()> {
        let example = find_example(name)?;
        self.set_content(example.content);
        Ok(())
    }

    /// Empties the content and hides the current image without waiting.
    pub fn clear(&mut self) {
        self.set_content("");
        self.rendered = None;
    }

    pub fn set_foreground(&mut self, color: impl Into<String>) {
        let color = color.into();
        if color != self.foreground {
            self.foreground = color;
            self.changed("foreground");
        }
    }

    pub fn set_background(&mut self, color: impl Into<String>) {
        let color = color.into();
        if color != self.background {
            self.background = color;
            self.changed("background");
        }
    }

    /// Sets both colors under a single debounce restart.
    pub fn apply_preset(&mut self, name: &str) -> Result<()> {
        let preset = find_preset(name)?;
        if preset.foreground != self.foreground || preset.background != self.background {
            self.foreground = preset.foreground.to_string();
            self.background = preset.background.to_string();
            self.changed("preset");
        }
        Ok(())
    }

    pub fn set_size(&mut self, size: u32) {
        let size = clamp_size(size);
        if size != self.size {
            self.size = size;
            self.changed("size");
        }
    }

    pub fn set_margin(&mut self, margin: u32) {
        let margin = clamp_margin(margin);
        if margin != self.margin {
            self.margin = margin;
            self.changed("margin");
        }
    }

    pub fn set_error_correction(&mut self, level: ErrorCorrection) {
        if level != self.error_correction {
            self.error_correction = level;
            self.changed("error_correction");
        }
    }

    fn changed(&mut self, field: &str) {
        let ticket = self.debouncer.trigger(self.clock.now());
        tracing::debug!(field, ?ticket, "input changed, render rescheduled");
    }

    /// Renders if the quiet period has elapsed since the last change.
    pub fn poll(&mut self) -> Option<RenderOutcome> {
        self.debouncer
            .poll(self.clock.now())
            .map(|_| self.render_now())
    }

    /// Renders if `ticket` belongs to the latest change.
    pub fn fire(&mut self, ticket: Ticket) -> Option<RenderOutcome> {
        if self.debouncer.fire(ticket) {
            Some(self.render_now())
        } else {
            tracing::trace!(?ticket, "stale render ticket ignored");
            None
        }
    }

    /// Renders the current state immediately, dropping any pending render.
    pub fn render_now(&mut self) -> RenderOutcome {
        self.debouncer.cancel();

        self.last_error = None;
        if self.content.trim().is_empty() {
            self.rendered = None;
            return RenderOutcome::Cleared;
        }

        let result = self.render_current();
        self.render_count += 1;

        match result {
            Ok(rendered) => {
                tracing::info!(
                    chars = rendered.content.chars().count(),
                    size = rendered.image.width(),
                    ecl = %rendered.style.error_correction,
                    "rendered QR code"
                );
                self.rendered = Some(rendered);
                RenderOutcome::Rendered
            }
            Err(e) => {
                tracing::error!("Error generating QR code: {}", e);
                self.rendered = None;
                self.last_error = Some(e.to_string());
                self.notifications.push_back(Notification::error(
                    "Failed to generate QR code. Please try again.",
                ));
                RenderOutcome::Failed
            }
        }
    }

    fn render_current(&self) -> Result<RenderedQr> {
        let style = Style::resolve(
            &self.foreground,
            &self.background,
            self.size,
            self.margin,
            self.error_correction,
        )?;
        let (image, matrix) = qr::generate(&self.content, &style)?;
        let png = encode_png(&image)?;

        Ok(RenderedQr {
            content: self.content.clone(),
            style,
            image,
            matrix,
            png,
        })
    }

    /// Hands the current image to `sink`. Returns `Ok(false)` if there is
    /// nothing to download.
    pub fn download<S: DownloadSink + ?Sized>(&mut self, sink: &mut S) -> Result<bool> {
        let Some(rendered) = &self.rendered else {
            return Ok(false);
        };

        let download = Download::new(rendered.png.clone()).with_filename(&self.download_filename);
        match sink.deliver(&download) {
            Ok(()) => {
                tracing::info!(filename = %download.filename, "QR code downloaded");
                self.notifications
                    .push_back(Notification::success("QR code downloaded successfully!"));
                Ok(true)
            }
            Err(e) => {
                tracing::error!("Error downloading QR code: {}", e);
                self.notifications
                    .push_back(Notification::error("Failed to download QR code."));
                Err(e)
            }
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    pub fn pop_notification(&mut self) -> Option<Notification> {
        self.notifications.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::{ManualClock, DEBOUNCE_DELAY};
    use std::time::Duration;

    fn session() -> (Session<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (Session::new(clock.clone()), clock)
    }

    struct FailingSink;

    impl DownloadSink for FailingSink {
        fn deliver(&mut self, _download: &Download) -> Result<()> {
            Err(QrError::Download("disk full".to_string()))
        }
    }

    #[test]
    fn test_defaults() {
        let (session, _) = session();
        assert_eq!(session.content(), "");
        assert_eq!(session.foreground(), "#000000");
        assert_eq!(session.background(), "#FFFFFF");
        assert_eq!(session.size(), 300);
        assert_eq!(session.margin(), 2);
        assert_eq!(session.error_correction(), ErrorCorrection::M);
        assert!(!session.can_download());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_render_after_debounce() {
        let (mut session, clock) = session();
        session.set_content("Hello, World!");

        clock.advance(DEBOUNCE_DELAY - Duration::from_millis(1));
        assert_eq!(session.poll(), None);
        assert!(!session.can_download());

        clock.advance(Duration::from_millis(1));
        assert_eq!(session.poll(), Some(RenderOutcome::Rendered));
        assert!(session.can_download());

        let rendered = session.rendered().unwrap();
        assert_eq!(rendered.content, "Hello, World!");
        assert_eq!(rendered.image.width(), 300);
        assert!(rendered.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_rapid_edits_render_once() {
        let (mut session, clock) = session();
        for text in ["h", "he", "hel", "hell", "hello"] {
            session.set_content(text);
            clock.advance(Duration::from_millis(100));
            assert_eq!(session.poll(), None);
        }

        clock.advance(DEBOUNCE_DELAY);
        assert_eq!(session.poll(), Some(RenderOutcome::Rendered));
        assert_eq!(session.poll(), None);
        assert_eq!(session.render_count(), 1);
        assert_eq!(session.rendered().unwrap().content, "hello");
    }

    #[test]
    fn test_stale_ticket_does_not_render() {
        let (mut session, _) = session();
        session.set_content("first");
        let stale = session.pending_ticket().unwrap();
        session.set_content("second");
        let live = session.pending_ticket().unwrap();

        assert_eq!(session.fire(stale), None);
        assert_eq!(session.fire(live), Some(RenderOutcome::Rendered));
        assert_eq!(session.rendered().unwrap().content, "second");
    }

    #[test]
    fn test_shared_timer_fires_latest_pending_once() {
        let (mut session, _) = session();
        let fire_pending = |session: &mut Session<ManualClock>| {
            session.pending_ticket().and_then(|ticket| session.fire(ticket))
        };

        session.set_content("a");
        session.set_foreground("#166534");
        session.set_content("ab");
        assert_eq!(fire_pending(&mut session), Some(RenderOutcome::Rendered));
        assert_eq!(fire_pending(&mut session), None);

        assert_eq!(session.render_count(), 1);
        let rendered = session.rendered().unwrap();
        assert_eq!(rendered.content, "ab");
        assert_eq!(rendered.style.foreground.to_string(), "#166534");
    }

    #[test]
    fn test_unchanged_value_does_not_reschedule() {
        let (mut session, _) = session();
        session.set_size(300);
        session.set_margin(2);
        session.set_foreground("#000000");
        session.set_error_correction(ErrorCorrection::M);
        assert!(!session.is_pending());

        session.set_size(310);
        assert!(!session.is_pending(), "310 snaps back to 300");
        session.set_size(460);
        assert_eq!(session.size(), 450);
        assert!(session.is_pending());
    }

    #[test]
    fn test_empty_content_produces_nothing() {
        let (mut session, clock) = session();
        session.set_content("   \n\t");
        clock.advance(DEBOUNCE_DELAY);

        assert_eq!(session.poll(), Some(RenderOutcome::Cleared));
        assert!(!session.can_download());
        assert_eq!(session.render_count(), 0);
        assert!(session.take_notifications().is_empty());

        let mut sink: Vec<Download> = Vec::new();
        assert!(!session.download(&mut sink).unwrap());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_preset_updates_both_colors_before_render() {
        let (mut session, clock) = session();
        session.set_content("preset");
        session.apply_preset("green").unwrap();

        assert_eq!(session.foreground(), "#166534");
        assert_eq!(session.background(), "#dcfce7");

        clock.advance(DEBOUNCE_DELAY);
        session.poll();
        let style = session.rendered().unwrap().style;
        assert_eq!(style.foreground.to_string(), "#166534");
        assert_eq!(style.background.to_string(), "#dcfce7");
        assert_eq!(session.render_count(), 1);
    }

    #[test]
    fn test_unknown_preset_leaves_state() {
        let (mut session, _) = session();
        assert!(session.apply_preset("neon").is_err());
        assert_eq!(session.foreground(), "#000000");
        assert!(!session.is_pending());
    }

    #[test]
    fn test_invalid_color_fails_and_notifies() {
        let (mut session, clock) = session();
        session.set_content("ok");
        clock.advance(DEBOUNCE_DELAY);
        session.poll();
        assert!(session.can_download());

        session.set_foreground("#12");
        clock.advance(DEBOUNCE_DELAY);
        assert_eq!(session.poll(), Some(RenderOutcome::Failed));
        assert!(!session.can_download());
        assert_eq!(session.last_error(), Some("Invalid hex color: #12"));

        let notes = session.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Error");
        assert_eq!(notes[0].kind, NotificationKind::Destructive);
        assert!(session.take_notifications().is_empty());
    }

    #[test]
    fn test_oversized_payload_fails_at_high_correction() {
        let (mut session, clock) = session();
        session.set_content("a".repeat(2000));
        session.set_error_correction(ErrorCorrection::H);
        clock.advance(DEBOUNCE_DELAY);
        assert_eq!(session.poll(), Some(RenderOutcome::Failed));

        session.set_error_correction(ErrorCorrection::L);
        clock.advance(DEBOUNCE_DELAY);
        assert_eq!(session.poll(), Some(RenderOutcome::Rendered));
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn test_clear_hides_image_immediately() {
        let (mut session, clock) = session();
        session.apply_example("github").unwrap();
        assert_eq!(session.content(), "https://github.com");
        clock.advance(DEBOUNCE_DELAY);
        session.poll();
        assert!(session.can_download());

        session.clear();
        assert_eq!(session.content(), "");
        assert!(!session.can_download());
    }

    #[test]
    fn test_find_example() {
        assert_eq!(find_example("hello world").unwrap().content, "Hello, World!");
        assert_eq!(find_example("HelloWorld").unwrap().content, "Hello, World!");
        assert_eq!(find_example("phone").unwrap().content, "tel:+1234567890");
        assert!(matches!(find_example("fax"), Err(QrError::UnknownExample(_))));
    }

    #[test]
    fn test_download_notifies() {
        let (mut session, _) = session();
        session.set_content("download me");
        session.render_now();

        let mut sink: Vec<Download> = Vec::new();
        assert!(session.download(&mut sink).unwrap());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].filename, "qrcode.png");
        assert_eq!(sink[0].png, session.rendered().unwrap().png);

        let note = session.pop_notification().unwrap();
        assert_eq!(note.title, "Success");
        assert_eq!(note.description, "QR code downloaded successfully!");
    }

    #[test]
    fn test_download_failure_is_reported() {
        let (mut session, _) = session();
        session.set_content("x");
        session.render_now();

        assert!(matches!(
            session.download(&mut FailingSink),
            Err(QrError::Download(_))
        ));
        assert_eq!(
            session.pop_notification().unwrap().kind,
            NotificationKind::Destructive
        );
    }
}
