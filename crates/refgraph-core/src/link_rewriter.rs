//! Rewrites links in page text when the page they point at is renamed.
//!
//! Works on the segment stream from [`crate::link_parser::tokenize`]: escaped
//! segments are copied as-is, link occurrences are matched against the old
//! name and rebuilt, and (optionally) bare CamelCase words in text segments
//! are replaced.

use crate::link_parser::{camel_case_links, tokenize, LinkOccurrence, Segment};
use crate::page_name::{clean_name, wikify_name};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Also rewrite bare CamelCase words outside brackets.
    pub camel_case_links: bool,
}

/// Return `source` with every link to `from` pointing at `to` instead.
///
/// Anchors (`#section`) and attachment sub-paths (`/file.txt`) survive the
/// rewrite. A link whose display text is the target and contains whitespace
/// (`[Test Page]`) keeps its text and gains an explicit target
/// (`[Test Page|NewName]`).
pub fn rewrite_links(source: &str, from: &str, to: &str, options: RewriteOptions) -> String {
    let mut out = String::with_capacity(source.len() + 32);
    for segment in tokenize(source) {
        match segment {
            Segment::Text(text) if options.camel_case_links => {
                rewrite_camel_case(text, from, to, &mut out)
            }
            Segment::Text(text) | Segment::Escaped(text) => out.push_str(text),
            Segment::Link(occ) => rewrite_occurrence(&occ, from, to, &mut out),
        }
    }
    out
}

/// A link target split into its cleaned page part and the suffix that must
/// be carried over (`#anchor` or `/attachment`).
struct RealLink<'a> {
    cleaned: String,
    suffix: &'a str,
}

impl<'a> RealLink<'a> {
    fn parse(original: &'a str) -> Self {
        let (real, suffix) = match original.find(|c| c == '#' || c == '/') {
            Some(idx) => original.split_at(idx),
            None => (original, ""),
        };
        RealLink {
            cleaned: clean_name(real),
            suffix,
        }
    }

    /// Same page as `from`, either literally, after cleaning, or in the
    /// legacy wikified spelling.
    fn points_to(&self, original: &str, from: &str) -> bool {
        if self.cleaned.is_empty() {
            return false;
        }
        self.cleaned == from || original.trim() == from || wikify_name(&self.cleaned) == from
    }

    fn has_whitespace(&self) -> bool {
        self.cleaned.contains(char::is_whitespace)
    }

    fn retarget(&self, to: &str) -> String {
        format!("{}{}", to, self.suffix)
    }
}

fn rewrite_occurrence(occ: &LinkOccurrence<'_>, from: &str, to: &str, out: &mut String) {
    if occ.is_implicit() {
        let real = RealLink::parse(occ.text);
        if !real.points_to(occ.text, from) {
            out.push_str(occ.raw);
            return;
        }
        if real.has_whitespace() {
            // Keep the human-readable text, point it at the new name.
            push_link(out, occ.text, Some(&real.retarget(to)), occ.attributes);
        } else {
            push_link(out, &real.retarget(to), occ.link, occ.attributes);
        }
        return;
    }

    let target = occ.link.unwrap_or_default();
    let real = RealLink::parse(target);
    if !real.points_to(target, from) {
        out.push_str(occ.raw);
        return;
    }
    let text = occ.text.replace(from, to);
    push_link(out, &text, Some(&real.retarget(to)), occ.attributes);
}

fn push_link(out: &mut String, text: &str, link: Option<&str>, attributes: Option<&str>) {
    out.push('[');
    out.push_str(text);
    if let Some(link) = link {
        out.push('|');
        out.push_str(link);
        if let Some(attributes) = attributes {
            out.push('|');
            out.push_str(attributes);
        }
    }
    out.push(']');
}

fn rewrite_camel_case(text: &str, from: &str, to: &str, out: &mut String) {
    let mut last = 0;
    for (start, end) in camel_case_links(text) {
        if &text[start..end] == from {
            out.push_str(&text[last..start]);
            out.push_str(to);
            last = end;
        }
    }
    out.push_str(&text[last..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(source: &str, from: &str, to: &str) -> String {
        rewrite_links(source, from, to, RewriteOptions::default())
    }

    fn rewrite_cc(source: &str, from: &str, to: &str) -> String {
        rewrite_links(source, from, to, RewriteOptions { camel_case_links: true })
    }

    #[test]
    fn rewrites_simple_link() {
        assert_eq!(rewrite("[TestPage]", "TestPage", "FooTest"), "[FooTest]");
    }

    #[test]
    fn leaves_other_links_alone() {
        let text = "See [Other] and [TestPage2]";
        assert_eq!(rewrite(text, "TestPage", "FooTest"), text);
    }

    #[test]
    fn preserves_surrounding_text() {
        assert_eq!(
            rewrite("Before [TestPage] after", "TestPage", "FooTest"),
            "Before [FooTest] after"
        );
    }

    #[test]
    fn rewrites_every_occurrence() {
        assert_eq!(
            rewrite("[TestPage] and [TestPage]", "TestPage", "FooTest"),
            "[FooTest] and [FooTest]"
        );
    }

    #[test]
    fn rewrites_explicit_target_and_display_text() {
        assert_eq!(
            rewrite("[Link to TestPage2|TestPage2|target='_new']", "TestPage2", "Test"),
            "[Link to Test|Test|target='_new']"
        );
    }

    #[test]
    fn display_text_untouched_when_target_differs() {
        let text = "[About TestPage|OtherPage]";
        assert_eq!(rewrite(text, "TestPage", "FooTest"), text);
    }

    #[test]
    fn preserves_anchor() {
        assert_eq!(rewrite("[TestPage#Section]", "TestPage", "FooTest"), "[FooTest#Section]");
        assert_eq!(
            rewrite("[Read this|TestPage#Section]", "TestPage", "FooTest"),
            "[Read this|FooTest#Section]"
        );
    }

    #[test]
    fn preserves_attachment_sub_path() {
        assert_eq!(
            rewrite("[TestPage/foo.txt]", "TestPage", "FooTest"),
            "[FooTest/foo.txt]"
        );
    }

    #[test]
    fn whitespace_text_becomes_explicit_link() {
        assert_eq!(
            rewrite("[Test Page]", "Test Page", "Renamed"),
            "[Test Page|Renamed]"
        );
    }

    #[test]
    fn legacy_spelling_matches() {
        // "test page" wikifies to "TestPage".
        assert_eq!(
            rewrite("[test page]", "TestPage", "FooTest"),
            "[test page|FooTest]"
        );
    }

    #[test]
    fn variant_spelling_matches_after_cleaning() {
        assert_eq!(rewrite("[testPage]", "TestPage", "FooTest"), "[FooTest]");
        assert_eq!(rewrite("[ TestPage ]", "TestPage", "FooTest"), "[FooTest]");
    }

    #[test]
    fn empty_target_uses_display_text() {
        assert_eq!(rewrite("[TestPage|]", "TestPage", "FooTest"), "[FooTest|]");
    }

    #[test]
    fn empty_display_text_is_rewritten() {
        assert_eq!(rewrite("[|TestPage]", "TestPage", "FooTest"), "[|FooTest]");
    }

    #[test]
    fn escaped_links_pass_through() {
        let text = "~[TestPage] [[TestPage] {{{[TestPage]}}}";
        assert_eq!(rewrite(text, "TestPage", "FooTest"), text);
    }

    #[test]
    fn doubled_bracket_form_is_unchanged() {
        assert_eq!(rewrite("[[TestPage]]", "TestPage", "FooTest"), "[[TestPage]]");
    }

    #[test]
    fn camel_case_disabled_leaves_bare_words() {
        assert_eq!(rewrite("TestPage", "TestPage", "FooTest"), "TestPage");
    }

    #[test]
    fn camel_case_rewrites_bare_word() {
        assert_eq!(rewrite_cc("TestPage", "TestPage", "FooTest"), "FooTest");
    }

    #[test]
    fn camel_case_rewrites_only_whole_words() {
        assert_eq!(
            rewrite_cc("TestPage TestPage2 xTestPage ~TestPage", "TestPage", "FooTest"),
            "FooTest TestPage2 xTestPage ~TestPage"
        );
    }

    #[test]
    fn camel_case_after_multibyte_space() {
        assert_eq!(
            rewrite_cc("x\u{3000}TestPage", "TestPage", "FooTest"),
            "x\u{3000}FooTest"
        );
        assert_eq!(
            rewrite_cc("a\u{00A0}TestPage", "TestPage", "FooTest"),
            "a\u{00A0}FooTest"
        );
    }

    #[test]
    fn stray_bracket_before_link() {
        assert_eq!(
            rewrite("a[i and see [TestPage]", "TestPage", "FooTest"),
            "a[i and see [FooTest]"
        );
    }

    #[test]
    fn camel_case_and_brackets_together() {
        assert_eq!(
            rewrite_cc("TestPage links to [TestPage|TestPage]", "TestPage", "FooTest"),
            "FooTest links to [FooTest|FooTest]"
        );
    }

    #[test]
    fn camel_case_ignores_urls_and_open_brackets() {
        let text = "http://x.org/TestPage [ TestPage";
        assert_eq!(rewrite_cc(text, "TestPage", "FooTest"), text);
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(
            rewrite("Grüße an [TestPage] ✓", "TestPage", "FooTest"),
            "Grüße an [FooTest] ✓"
        );
    }

    #[test]
    fn no_links_is_identity() {
        let text = "Nothing to see [here";
        assert_eq!(rewrite(text, "TestPage", "FooTest"), text);
    }
}
