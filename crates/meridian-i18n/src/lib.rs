//! # Meridian I18n
//!
//! Message catalogs and locale-aware message lookup.
//!
//! Message files live under the application's `messages/` directory and are
//! named `<anything>.<language>`, for example `app.en` or `errors.fr`. Each file
//! holds `key=value` entries grouped into region sections (see
//! [`MessageFile`]). At startup [`MessageCatalog::load`] reads them all; at
//! request time [`MessageCatalog::message`] resolves a key for a locale with a
//! region, language, default-language fallback chain.

#![doc(html_root_url = "https://docs.rs/meridian-i18n/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod error;
mod format;
mod loader;
mod messages;

pub use catalog::{parse_locale, MessageCatalog};
pub use error::{I18nError, I18nResult};
pub use format::format_message;
pub use loader::{language_of, load_messages, read_message_file, MESSAGES_DIR};
pub use messages::{MessageFile, DEFAULT_SECTION};

/// Render-argument key under which the current locale is exposed.
pub const CURRENT_LOCALE_RENDER_ARG: &str = "currentLocale";
