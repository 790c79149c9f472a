//! Line classification of prose runs for rendering.

/// A displayable line of prose. Blank lines are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProseLine<'a> {
    /// A line wrapped in `**`, without the markers.
    Heading(&'a str),
    /// A `* ` or `- ` bullet, without the marker.
    ListItem(&'a str),
    Paragraph(&'a str),
}

impl<'a> ProseLine<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            ProseLine::Heading(t) | ProseLine::ListItem(t) | ProseLine::Paragraph(t) => t,
        }
    }
}

pub fn classify_lines(prose: &str) -> Vec<ProseLine<'_>> {
    prose
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter_map(classify)
        .collect()
}

fn classify(line: &str) -> Option<ProseLine<'_>> {
    if line.len() >= 4 && line.starts_with("**") && line.ends_with("**") {
        return Some(ProseLine::Heading(&line[2..line.len() - 2]));
    }
    if let Some(item) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        return Some(ProseLine::ListItem(item));
    }
    if line.trim().is_empty() {
        None
    } else {
        Some(ProseLine::Paragraph(line))
    }
}
