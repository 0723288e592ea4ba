//! Technology family tab strip.

use ratatui::text::{Line, Span};

use crate::theme;

/// One line of tab labels with the active one bracketed and highlighted.
/// `None` renders every label inactive.
pub fn family_tabs<'a>(labels: &[&'a str], active_index: Option<usize>) -> Line<'a> {
    let mut spans = Vec::with_capacity(labels.len() * 2);

    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", theme::hint()));
        }

        if Some(i) == active_index {
            spans.push(Span::styled(format!("[{label}]"), theme::family_active()));
        } else {
            spans.push(Span::styled(*label, theme::family_idle()));
        }
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_tab_is_bracketed() {
        let line = family_tabs(&["Operating Systems", "Databases"], Some(1));
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "Operating Systems  [Databases]");
    }

    #[test]
    fn no_active_tab() {
        let line = family_tabs(&["A", "B"], None);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "A  B");
    }
}
