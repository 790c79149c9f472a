//! Structured view of a model response: analysis and script sections split
//! into prose and code runs.

use super::SCRIPT_HEADERS;
use super::lexer::{Token, tokenize};

/// Marker placed between concatenated script blocks, after the comment prefix.
pub const SCRIPT_JOIN_MARKER: &str = "--- Synthesizer: Appended from next code block ---";

/// A fenced code span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlock<'a> {
    pub language: Option<&'a str>,
    /// Code without the opening line and the newline before the closing fence.
    pub code: &'a str,
    /// False while the closing fence has not arrived yet.
    pub complete: bool,
}

/// One run of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Run<'a> {
    /// Verbatim text outside any fence.
    Prose(&'a str),
    Code(CodeBlock<'a>),
}

/// Alternating prose and code runs of one section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment<'a> {
    pub runs: Vec<Run<'a>>,
}

impl<'a> Segment<'a> {
    fn parse(text: &'a str) -> Self {
        let mut runs = Vec::new();
        let mut open: Option<(Option<&'a str>, &'a str)> = None;

        for token in tokenize(text) {
            match token {
                Token::Text(t) => match open.as_mut() {
                    Some((_, code)) => *code = t,
                    None => runs.push(Run::Prose(t)),
                },
                Token::FenceOpen { language } => open = Some((language, "")),
                Token::FenceClose => {
                    if let Some((language, code)) = open.take() {
                        runs.push(Run::Code(CodeBlock {
                            language,
                            code: strip_closing_newline(code),
                            complete: true,
                        }));
                    }
                }
            }
        }

        if let Some((language, code)) = open {
            runs.push(Run::Code(CodeBlock {
                language,
                code,
                complete: false,
            }));
        }
        Self { runs }
    }

    pub fn prose_runs(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.runs.iter().filter_map(|run| match run {
            Run::Prose(text) => Some(*text),
            Run::Code(_) => None,
        })
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeBlock<'a>> + '_ {
        self.runs.iter().filter_map(|run| match run {
            Run::Code(block) => Some(block),
            Run::Prose(_) => None,
        })
    }

    /// True when the segment has nothing but whitespace to show.
    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|run| match run {
            Run::Prose(text) => text.trim().is_empty(),
            Run::Code(_) => false,
        })
    }
}

fn strip_closing_newline(code: &str) -> &str {
    code.strip_suffix('\n')
        .map(|c| c.strip_suffix('\r').unwrap_or(c))
        .unwrap_or(code)
}

/// How the response was split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout<'a> {
    /// A script header was found.
    Sectioned {
        analysis: Segment<'a>,
        script: Segment<'a>,
    },
    /// No script header: the whole text is one mixed segment.
    Fallback(Segment<'a>),
}

/// Derived, never stored. Re-derived from the latest text on every delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredDocument<'a> {
    pub layout: Layout<'a>,
}

impl<'a> StructuredDocument<'a> {
    /// Splits `text` at the earliest script header, then tokenises each side.
    pub fn extract(text: &'a str) -> Self {
        let layout = match find_script_header(text) {
            Some((start, header)) => Layout::Sectioned {
                analysis: Segment::parse(&text[..start]),
                script: Segment::parse(&text[start + header.len()..]),
            },
            None => Layout::Fallback(Segment::parse(text)),
        };
        Self { layout }
    }

    pub fn is_sectioned(&self) -> bool {
        matches!(self.layout, Layout::Sectioned { .. })
    }

    pub fn analysis(&self) -> Option<&Segment<'a>> {
        match &self.layout {
            Layout::Sectioned { analysis, .. } => Some(analysis),
            Layout::Fallback(_) => None,
        }
    }

    pub fn script(&self) -> Option<&Segment<'a>> {
        match &self.layout {
            Layout::Sectioned { script, .. } => Some(script),
            Layout::Fallback(_) => None,
        }
    }

    /// Segments in display order.
    pub fn segments(&self) -> Vec<&Segment<'a>> {
        match &self.layout {
            Layout::Sectioned { analysis, script } => vec![analysis, script],
            Layout::Fallback(segment) => vec![segment],
        }
    }

    /// Every prose run, in document order.
    pub fn prose_runs(&self) -> Vec<&'a str> {
        self.segments()
            .into_iter()
            .flat_map(|segment| segment.prose_runs())
            .collect()
    }

    /// Closed code blocks of the script section.
    pub fn script_blocks(&self) -> Vec<&'a str> {
        self.script()
            .map(|script| {
                script
                    .code_blocks()
                    .filter(|block| block.complete)
                    .map(|block| block.code)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Concatenates the script blocks, separated by a marker comment.
    ///
    /// Returns `None` when the script section has no closed code block.
    pub fn downloadable_script(&self, comment_prefix: &str) -> Option<String> {
        let blocks = self.script_blocks();
        if blocks.is_empty() {
            return None;
        }
        let separator = format!("\n\n{comment_prefix} {SCRIPT_JOIN_MARKER}\n\n");
        Some(blocks.join(&separator))
    }
}

/// Earliest header occurrence; the longest header wins when two start together.
fn find_script_header(text: &str) -> Option<(usize, &'static str)> {
    SCRIPT_HEADERS
        .iter()
        .filter_map(|header| text.find(header).map(|pos| (pos, *header)))
        .min_by(|(a_pos, a), (b_pos, b)| a_pos.cmp(b_pos).then(b.len().cmp(&a.len())))
}
