use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Terminal cells needed to show `s`. Tabs count as 4.
pub fn display_width(s: &str) -> usize {
    s.graphemes(true).map(grapheme_width).sum()
}

fn grapheme_width(g: &str) -> usize {
    if g == "\t" { 4 } else { UnicodeWidthStr::width(g) }
}

/// Cut `s` to at most `max_cells`, ending in `…` when anything was dropped.
/// Never splits a grapheme cluster.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }
    let budget = max_cells - 1;
    let mut used = 0;
    let mut out = String::new();
    for g in s.graphemes(true) {
        let w = grapheme_width(g);
        if used + w > budget {
            break;
        }
        used += w;
        out.push_str(g);
    }
    out.push('\u{2026}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_counts_cells() {
        assert_eq!(display_width("Hydrate"), 7);
        assert_eq!(display_width("水を飲む"), 8);
        assert_eq!(display_width("🧘 breathe"), 10);
        assert_eq!(display_width("cafe\u{0301}"), 4);
        assert_eq!(display_width("a\tb"), 6);
    }

    #[test]
    fn truncate_short_string_untouched() {
        assert_eq!(truncate_to_width("Meditate", 8), "Meditate");
        assert_eq!(truncate_to_width("", 0), "");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Build personal dashboard", 10), "Build per\u{2026}");
        assert_eq!(truncate_to_width("abc", 1), "\u{2026}");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn truncate_never_splits_wide_chars() {
        // each CJK char is 2 cells; 5 cells leaves room for two plus the ellipsis
        assert_eq!(truncate_to_width("日本語の本", 5), "日本\u{2026}");
    }
}
