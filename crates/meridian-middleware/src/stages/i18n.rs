//! Locale resolution.
//!
//! The locale is decided once per request, in order of precedence:
//!
//! 1. the locale cookie, if the request carries one
//! 2. the highest-quality `Accept-Language` entry
//! 3. the empty locale
//!
//! The result is stored on the request and exposed to rendering under
//! [`CURRENT_LOCALE_RENDER_ARG`].

use meridian_extract::Cookies;
use meridian_i18n::CURRENT_LOCALE_RENDER_ARG;

use crate::controller::Controller;
use crate::filter::{BoxFuture, Filter, Next, Stage};

/// Resolves the request locale.
#[derive(Debug, Clone)]
pub struct I18nFilter {
    cookie_name: String,
}

impl I18nFilter {
    /// Creates a filter reading the locale cookie `cookie_name`.
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }

    /// Returns the locale cookie name.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn resolve(&self, c: &Controller) -> String {
        let request = c.request();
        if let Some(locale) = Cookies::from_headers(request.headers()).get(&self.cookie_name) {
            tracing::debug!(locale, cookie = %self.cookie_name, "locale from cookie");
            return locale.to_string();
        }
        match request.accept_languages().preferred() {
            Some(language) => {
                tracing::debug!(locale = language, "locale from Accept-Language");
                language.to_string()
            }
            None => String::new(),
        }
    }
}

impl Filter for I18nFilter {
    fn name(&self) -> &'static str {
        "i18n"
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::I18n)
    }

    fn call<'a>(&'a self, c: &'a mut Controller, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let locale = self.resolve(c);
            c.render_args_mut().insert(
                CURRENT_LOCALE_RENDER_ARG.to_string(),
                serde_json::Value::String(locale.clone()),
            );
            c.request_mut().set_locale(locale);
            next.run(c).await;
        })
    }
}
