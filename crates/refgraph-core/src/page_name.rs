//! Page-name cleaning and plural/singular counterparts.
//!
//! Every name that enters the reference graph or the rename engine goes through
//! [`clean_name`] first, so that `[test page]`, `[Test  Page]` and `[Test Page]`
//! all refer to the same page.

/// Punctuation that may appear inside a page name.
pub const PUNCTUATION_CHARS_ALLOWED: &str = " ()&+,-=._$";

/// Punctuation kept by the legacy ("wikified") form. Spaces are not in here,
/// so `"test page"` wikifies to `"TestPage"`.
pub const LEGACY_CHARS_ALLOWED: &str = "._";

/// Clean a link or page name with the rule used when pages are created.
///
/// Trims the input, collapses whitespace runs, drops characters that are
/// neither letters, digits nor in [`PUNCTUATION_CHARS_ALLOWED`], and
/// capitalizes the first letter after a dropped character.
///
/// Example: `clean_name("  my  page!name ")` → `"My pageName"`
pub fn clean_name(link: &str) -> String {
    clean_with(link, PUNCTUATION_CHARS_ALLOWED)
}

/// Legacy form of a name: same rule as [`clean_name`], but only `.` and `_`
/// survive as punctuation. Older content often links to `TestPage` where the
/// page is now called `Test Page`.
pub fn wikify_name(link: &str) -> String {
    clean_with(link, LEGACY_CHARS_ALLOWED)
}

fn clean_with(link: &str, allowed: &str) -> String {
    let link = link.trim();
    let mut clean = String::with_capacity(link.len());
    let mut word_start = true;
    let mut was_space = false;

    for ch in link.chars() {
        if ch.is_whitespace() {
            if was_space {
                continue;
            }
            was_space = true;
        } else {
            was_space = false;
        }

        if ch.is_alphanumeric() || allowed.contains(ch) {
            if word_start {
                clean.extend(ch.to_uppercase());
            } else {
                clean.push(ch);
            }
            word_start = false;
        } else {
            word_start = true;
        }
    }

    clean
}

/// The English plural/singular counterpart of a name: strips a trailing `s`,
/// or appends one. Returns `None` for empty names, for a bare `"s"`, and for
/// attachment names (anything containing `/`).
pub fn plural_counterpart(name: &str) -> Option<String> {
    if name.is_empty() || name.contains('/') {
        return None;
    }
    match name.strip_suffix('s') {
        Some("") => None,
        Some(singular) => Some(singular.to_string()),
        None => Some(format!("{}s", name)),
    }
}

/// Split an attachment name `Page/file.txt` into `("Page", "file.txt")`.
pub fn split_attachment_name(name: &str) -> Option<(&str, &str)> {
    let (parent, file) = name.split_once('/')?;
    if parent.is_empty() || file.is_empty() {
        return None;
    }
    Some((parent, file))
}

/// Full attachment name for a file owned by `parent`.
pub fn attachment_name(parent: &str, file: &str) -> String {
    format!("{}/{}", parent, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_keeps_simple_name() {
        assert_eq!(clean_name("TestPage"), "TestPage");
    }

    #[test]
    fn clean_trims_and_collapses_whitespace() {
        assert_eq!(clean_name("  Test   Page  "), "Test Page");
    }

    #[test]
    fn clean_capitalizes_first_letter() {
        assert_eq!(clean_name("test page"), "Test page");
    }

    #[test]
    fn clean_drops_illegal_chars_and_capitalizes_after_them() {
        assert_eq!(clean_name("foo!bar"), "FooBar");
        assert_eq!(clean_name("what?now"), "WhatNow");
    }

    #[test]
    fn clean_keeps_allowed_punctuation() {
        assert_eq!(clean_name("Foo (bar) & co."), "Foo (bar) & co.");
        assert_eq!(clean_name("a-b_c$d"), "A-b_c$d");
    }

    #[test]
    fn clean_handles_unicode_letters() {
        assert_eq!(clean_name("äpfel und birnen"), "Äpfel und birnen");
    }

    #[test]
    fn clean_empty_stays_empty() {
        assert_eq!(clean_name("   "), "");
        assert_eq!(clean_name("!!!"), "");
    }

    #[test]
    fn wikify_joins_words() {
        assert_eq!(wikify_name("test page"), "TestPage");
        assert_eq!(wikify_name("Test Page"), "TestPage");
        assert_eq!(wikify_name("file.name_v2"), "File.name_v2");
    }

    #[test]
    fn plural_counterpart_appends_or_strips() {
        assert_eq!(plural_counterpart("Foobar").as_deref(), Some("Foobars"));
        assert_eq!(plural_counterpart("Foobars").as_deref(), Some("Foobar"));
    }

    #[test]
    fn plural_counterpart_skips_degenerate_names() {
        assert_eq!(plural_counterpart(""), None);
        assert_eq!(plural_counterpart("s"), None);
        assert_eq!(plural_counterpart("Page/files"), None);
    }

    #[test]
    fn splits_attachment_names() {
        assert_eq!(split_attachment_name("TestPage/foo.txt"), Some(("TestPage", "foo.txt")));
        assert_eq!(split_attachment_name("TestPage"), None);
        assert_eq!(split_attachment_name("/foo.txt"), None);
        assert_eq!(attachment_name("TestPage", "foo.txt"), "TestPage/foo.txt");
    }
}
