//! Positional placeholder substitution for message templates.

use std::fmt::{Display, Write};

/// Substitutes `args` into `template`, one per placeholder, left to right.
///
/// Recognized placeholders are `%s`, `%d` and `%v`; `%%` is a literal percent
/// sign. Placeholders left over once the arguments run out stay verbatim, and
/// surplus arguments are ignored.
///
/// # Example
///
/// ```
/// use meridian_i18n::format_message;
///
/// let text = format_message("%s has %d new messages", &[&"Ana", &3]);
/// assert_eq!(text, "Ana has 3 new messages");
/// assert_eq!(format_message("100%% of %s", &[]), "100% of %s");
/// ```
#[must_use]
pub fn format_message(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(verb @ ('s' | 'd' | 'v')) => {
                chars.next();
                match args.next() {
                    Some(arg) => {
                        let _ = write!(out, "{arg}");
                    }
                    None => {
                        out.push('%');
                        out.push(verb);
                    }
                }
            }
            _ => out.push('%'),
        }
    }

    out
}
