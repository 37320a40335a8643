use crate::content::AlignmentPair;

/// Marker colors, assigned by pair position modulo the palette length.
pub const PALETTE: [&str; 6] = [
    "#E53935", // red
    "#1E88E5", // blue
    "#43A047", // green
    "#FB8C00", // orange
    "#8E24AA", // purple
    "#00ACC1", // cyan
];

const SEPARATOR: &str = " ";

/// Colored markup for both sides of a list of aligned phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignedMarkup {
    pub source: String,
    pub translated: String,
}

pub fn marker(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

fn span(color: &str, text: &str) -> String {
    format!(r#"<span style="color:{}">{}</span>"#, color, text)
}

/// Renders the i-th source phrase and the i-th translated phrase with the same color.
/// Long lists reuse colors from the start of the palette.
pub fn align(pairs: &[AlignmentPair]) -> AlignedMarkup {
    let (source, translated): (Vec<_>, Vec<_>) = pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            let color = marker(i);
            (span(color, &pair.source), span(color, &pair.translated))
        })
        .unzip();

    AlignedMarkup {
        source: source.join(SEPARATOR),
        translated: translated.join(SEPARATOR),
    }
}
