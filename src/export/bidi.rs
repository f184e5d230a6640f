//! Display formatting applied to transcript lines right before output.

use unicode_bidi::BidiInfo;

/// Turns a logical-order line into the form it should be printed in.
pub trait DisplayFormatter: Send + Sync {
    fn format_line(&self, line: &str) -> String;
}

/// Leaves lines in logical order, for terminals that do their own bidi.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl DisplayFormatter for Passthrough {
    fn format_line(&self, line: &str) -> String {
        line.to_string()
    }
}

/// Reorders each line into visual order with the Unicode bidirectional
/// algorithm, so right-to-left text reads correctly on terminals without
/// bidi support. The paragraph direction follows the first strong character.
#[derive(Debug, Default, Clone, Copy)]
pub struct BidiFormatter;

impl DisplayFormatter for BidiFormatter {
    fn format_line(&self, line: &str) -> String {
        line.split('\n')
            .map(|l| {
                let info = BidiInfo::new(l, None);
                info.paragraphs
                    .iter()
                    .map(|para| info.reorder_line(para, para.range.clone()).into_owned())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
