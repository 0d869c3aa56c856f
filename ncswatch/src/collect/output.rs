//! Per-device output buffer and file format.
//!
//! A file is a sequence of blocks joined by one blank line. Header blocks
//! look like `### r1 - show clock ###`; every other block is the captured
//! response for the header before it.

use std::fs;
use std::path::Path;

use crate::error::OutputError;

const SEPARATOR: &str = "\n\n";

/// One block of an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Full header line, including the `###` markers.
    Header(String),

    /// Captured command output.
    Response(String),
}

impl Block {
    fn as_str(&self) -> &str {
        match self {
            Block::Header(text) | Block::Response(text) => text,
        }
    }
}

/// Ordered, append-only record of one device run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    blocks: Vec<Block>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `### {device} - {command} ###`, or
    /// `### {device} slot {slot} - {command} ###` for line-card commands.
    pub fn push_header(&mut self, device: &str, slot: Option<&str>, command: &str) {
        let header = match slot {
            Some(slot) => format!("### {} slot {} - {} ###", device, slot, command),
            None => format!("### {} - {} ###", device, command),
        };
        self.blocks.push(Block::Header(header));
    }

    pub fn push_response(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Response(text.into()));
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// File contents: blocks joined by a blank line.
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(Block::as_str)
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    /// Write the rendered buffer, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), OutputError> {
        let write_err = |source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, self.render()).map_err(write_err)
    }

    /// Parse rendered text back into blocks.
    ///
    /// A response runs until a blank line followed by a header line, so
    /// responses may themselves contain blank lines.
    ///
    /// The rendered format has no escaping. A response that itself holds a
    /// blank line followed by a `### ... ###` line is split at that line on
    /// read-back, or rejected as malformed when no blank line follows it.
    pub fn parse(text: &str) -> Result<Self, OutputError> {
        let mut blocks = Vec::new();
        if text.is_empty() {
            return Ok(Self { blocks });
        }

        let mut rest = text;
        loop {
            let (header, after) = match rest.split_once('\n') {
                Some((line, after)) => (line, Some(after)),
                None => (rest, None),
            };
            if !is_header(header) {
                return Err(OutputError::Malformed {
                    message: format!("expected a header line, found '{}'", header),
                });
            }
            blocks.push(Block::Header(header.to_string()));

            // Header was the last line
            let Some(after) = after else { break };
            // Next header follows directly
            let Some(body) = after.strip_prefix('\n') else {
                return Err(OutputError::Malformed {
                    message: format!("missing blank line after '{}'", header),
                });
            };

            if is_header_line_start(body) {
                // Two headers in a row: the first command never answered
                rest = body;
                continue;
            }

            match find_next_header(body) {
                Some(end) => {
                    blocks.push(Block::Response(body[..end].to_string()));
                    rest = &body[end + SEPARATOR.len()..];
                }
                None => {
                    blocks.push(Block::Response(body.to_string()));
                    break;
                }
            }
        }

        Ok(Self { blocks })
    }

    /// Read and parse an output file.
    pub fn read_from(path: &Path) -> Result<Self, OutputError> {
        let text = fs::read_to_string(path).map_err(|source| OutputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

fn is_header(line: &str) -> bool {
    line.len() >= 8 && line.starts_with("### ") && line.ends_with(" ###")
}

fn is_header_line_start(text: &str) -> bool {
    is_header(text.split('\n').next().unwrap_or_default())
}

/// Offset of the blank-line separator that precedes the next header.
fn find_next_header(body: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = body[from..].find(SEPARATOR) {
        let at = from + pos;
        if is_header_line_start(&body[at + SEPARATOR.len()..]) {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutputBuffer {
        let mut buffer = OutputBuffer::new();
        buffer.push_header("r1", Some("0"), "ofa_show_ltrace | grep linkstatus");
        buffer.push_response("linkstatus up\n\nlinkstatus down");
        buffer.push_header("r1", None, "show interface HundredGigE0/0/0/0");
        buffer.push_response("HundredGigE0/0/0/0 is up");
        buffer
    }

    #[test]
    fn test_headers() {
        let buffer = sample();
        assert_eq!(
            buffer.blocks()[0],
            Block::Header("### r1 slot 0 - ofa_show_ltrace | grep linkstatus ###".into())
        );
        assert_eq!(
            buffer.blocks()[2],
            Block::Header("### r1 - show interface HundredGigE0/0/0/0 ###".into())
        );
    }

    #[test]
    fn test_render_joins_with_blank_line() {
        let mut buffer = OutputBuffer::new();
        buffer.push_header("r1", None, "show clock");
        buffer.push_response("10:00");
        assert_eq!(buffer.render(), "### r1 - show clock ###\n\n10:00");
        assert_eq!(OutputBuffer::new().render(), "");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1").join("Hourly-script-log-2026-10-16-100000.txt");

        let buffer = sample();
        buffer.write_to(&path).unwrap();

        assert_eq!(OutputBuffer::read_from(&path).unwrap(), buffer);
    }

    #[test]
    fn test_dangling_header_round_trip() {
        let mut buffer = sample();
        buffer.push_header("r1", None, "show controllers HundredGigE0/0/0/0 phy");

        let parsed = OutputBuffer::parse(&buffer.render()).unwrap();
        assert_eq!(parsed, buffer);
        assert!(matches!(parsed.blocks().last(), Some(Block::Header(_))));
    }

    #[test]
    fn test_header_like_response_line_splits() {
        let mut buffer = OutputBuffer::new();
        buffer.push_header("r1", None, "show running-config banner");
        buffer.push_response("banner motd\n\n### maintenance ###\n\nend");

        let parsed = OutputBuffer::parse(&buffer.render()).unwrap();
        assert_eq!(
            parsed.blocks(),
            &[
                Block::Header("### r1 - show running-config banner ###".into()),
                Block::Response("banner motd".into()),
                Block::Header("### maintenance ###".into()),
                Block::Response("end".into()),
            ]
        );

        let mut buffer = OutputBuffer::new();
        buffer.push_header("r1", None, "show running-config banner");
        buffer.push_response("banner motd\n\n### maintenance ###\nend");
        assert!(matches!(
            OutputBuffer::parse(&buffer.render()),
            Err(OutputError::Malformed { .. })
        ));
    }

    #[test]
    fn test_empty_file() {
        assert!(OutputBuffer::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            OutputBuffer::parse("no header here"),
            Err(OutputError::Malformed { .. })
        ));
    }
}
