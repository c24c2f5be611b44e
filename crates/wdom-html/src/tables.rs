//! Implied end-tag tables
//!
//! All lookups take upper-cased tag names.

/// Elements that never have content and close themselves.
pub(crate) fn is_self_closing(tag: &str) -> bool {
    matches!(
        tag,
        "AREA" | "BASE" | "BR" | "COL" | "HR" | "IMG" | "INPUT" | "LINK" | "META" | "PARAM"
            | "SOURCE" | "TRACK" | "WBR"
    )
}

/// Elements whose content is raw text up to the literal closing tag.
pub(crate) fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "SCRIPT" | "NOSCRIPT" | "STYLE" | "PRE")
}

/// Whether opening `tag` implicitly closes an open `parent`.
pub(crate) fn closed_by_opening(parent: &str, tag: &str) -> bool {
    match parent {
        "LI" => tag == "LI",
        "DT" | "DD" => matches!(tag, "DT" | "DD"),
        "P" => matches!(
            tag,
            "ADDRESS" | "ARTICLE" | "ASIDE" | "BLOCKQUOTE" | "DETAILS" | "DIV" | "DL"
                | "FIELDSET" | "FIGCAPTION" | "FIGURE" | "FOOTER" | "FORM" | "H1" | "H2"
                | "H3" | "H4" | "H5" | "H6" | "HEADER" | "HR" | "MAIN" | "NAV" | "OL" | "P"
                | "PRE" | "SECTION" | "TABLE" | "UL"
        ),
        "RT" | "RP" => matches!(tag, "RT" | "RP"),
        "OPTGROUP" => tag == "OPTGROUP",
        "OPTION" => matches!(tag, "OPTION" | "OPTGROUP"),
        "THEAD" | "TBODY" => matches!(tag, "TBODY" | "TFOOT"),
        "TR" => tag == "TR",
        "TD" | "TH" => matches!(tag, "TD" | "TH"),
        _ => false,
    }
}

/// Whether closing `tag` implicitly closes an open `parent` first.
pub(crate) fn closed_by_closing(parent: &str, tag: &str) -> bool {
    match parent {
        "LI" => matches!(tag, "UL" | "OL"),
        "A" | "B" | "I" | "P" => tag == "DIV",
        "TD" | "TH" => matches!(tag, "TR" | "TABLE"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_items_close_each_other() {
        assert!(closed_by_opening("LI", "LI"));
        assert!(!closed_by_opening("LI", "UL"));
        assert!(closed_by_closing("LI", "UL"));
    }

    #[test]
    fn test_paragraph_closed_by_block() {
        assert!(closed_by_opening("P", "DIV"));
        assert!(closed_by_opening("P", "H3"));
        assert!(!closed_by_opening("P", "SPAN"));
    }

    #[test]
    fn test_void_and_raw_text() {
        assert!(is_self_closing("BR"));
        assert!(!is_self_closing("EMBED"));
        assert!(is_raw_text("SCRIPT"));
        assert!(!is_raw_text("TEXTAREA"));
    }
}
