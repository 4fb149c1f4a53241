pub mod config;
pub mod debounce;
pub mod edit;
pub mod error;
pub mod export;
pub mod qr;
pub mod session;
pub mod style;

#[cfg(feature = "cli")]
pub mod logging;

#[cfg(feature = "terminal")]
pub mod terminal;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::Config;
pub use debounce::{Clock, Debouncer, ManualClock, Ticket, DEBOUNCE_DELAY};
#[cfg(not(target_arch = "wasm32"))]
pub use debounce::MonotonicClock;
pub use error::QrError;
pub use export::{Download, DownloadSink, FileSink};
pub use qr::{generate, QrMatrix};
pub use session::{Notification, NotificationKind, RenderOutcome, RenderedQr, Session};
pub use style::{ErrorCorrection, HexColor, Style, PRESETS};
