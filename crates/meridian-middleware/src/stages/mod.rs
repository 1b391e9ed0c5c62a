//! The core filter stages.
//!
//! | Stage | Filter             | Purpose                                           |
//! |-------|--------------------|---------------------------------------------------|
//! | 1     | [`I18nFilter`]     | Resolve the locale from cookie or Accept-Language |
//! | 2     | [`ParamsFilter`]   | Parse query/form/multipart; clean up temp files   |
//! | 3     | [`PanicFilter`]    | Turn faults downstream into error outcomes        |
//! | 4     | [`ActionInvoker`]  | Bind arguments and call the routed action         |

mod i18n;
mod invoker;
mod panic;
mod params;

pub use i18n::I18nFilter;
pub use invoker::ActionInvoker;
pub use panic::{install_panic_hook, recover, take_panic_stack, PanicFilter};
pub use params::ParamsFilter;
