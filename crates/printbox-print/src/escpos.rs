// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ESC/POS receipt encoder.
//
// Turns a job into the ordered frames a line-oriented thermal printer
// expects: initialise, attribution header, word-wrapped body, feed/cut
// trailer.  Pure and deterministic: the same job always yields the same
// bytes.
//
// Submitted text is untrusted.  Every byte below 0x20 (and DEL) starts or
// terminates a control sequence on ESC/POS devices, so none of them may
// reach the body or header from user input.  Only CR LF line endings
// produced here are emitted.

use printbox_core::config::PrinterConfig;
use printbox_core::types::Job;
use sha2::{Digest, Sha256};

/// Escape (command prefix).
const ESC: u8 = 0x1B;
/// Group separator (command prefix).
const GS: u8 = 0x1D;

/// ESC @ — reset the printer to power-on defaults.
pub const INITIALIZE: [u8; 2] = [ESC, b'@'];
/// ESC t 16 — select the WPC1252 character table.
pub const SELECT_CP1252: [u8; 3] = [ESC, b't', 16];
/// ESC a 0 — left justification.
pub const ALIGN_LEFT: [u8; 3] = [ESC, b'a', 0];
/// GS V 66 0 — feed to the cutter and partial cut.
pub const PARTIAL_CUT: [u8; 4] = [GS, b'V', 66, 0];

const CRLF: &[u8] = b"\r\n";
const REPLACEMENT: u8 = b'?';
const HEADER_FROM: &[u8] = b"-- from ";

/// Which part of the receipt a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Init,
    Header,
    Body,
    Trailer,
}

/// One unit of the printer wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub bytes: Vec<u8>,
}

impl Frame {
    fn new(kind: FrameKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }
}

/// Layout options, taken from the printer section of the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptEncoder {
    line_width: usize,
    feed_lines: usize,
    cut_paper: bool,
}

impl Default for ReceiptEncoder {
    fn default() -> Self {
        Self::from_config(&PrinterConfig::default())
    }
}

impl ReceiptEncoder {
    pub fn new(line_width: usize, feed_lines: usize, cut_paper: bool) -> Self {
        Self {
            line_width: line_width.max(1),
            feed_lines,
            cut_paper,
        }
    }

    pub fn from_config(config: &PrinterConfig) -> Self {
        Self::new(config.line_width, config.feed_lines, config.cut_paper)
    }

    pub fn line_width(&self) -> usize {
        self.line_width
    }

    /// Encode a job into its receipt frames.
    pub fn encode(&self, job: &Job) -> Vec<Frame> {
        let mut frames = Vec::new();

        let mut init = Vec::with_capacity(10);
        init.extend_from_slice(&INITIALIZE);
        init.extend_from_slice(&SELECT_CP1252);
        init.extend_from_slice(&ALIGN_LEFT);
        init.extend_from_slice(CRLF);
        frames.push(Frame::new(FrameKind::Init, init));

        frames.push(Frame::new(FrameKind::Header, self.header(job)));

        for paragraph in sanitize(&job.text) {
            for mut line in wrap(&paragraph, self.line_width) {
                line.extend_from_slice(CRLF);
                frames.push(Frame::new(FrameKind::Body, line));
            }
        }

        let mut trailer = CRLF.repeat(self.feed_lines);
        if self.cut_paper {
            trailer.extend_from_slice(&PARTIAL_CUT);
        }
        frames.push(Frame::new(FrameKind::Trailer, trailer));

        frames
    }

    /// `-- from <origin>` / `   at HH:MM:SS of Month D`, then a blank line.
    fn header(&self, job: &Job) -> Vec<u8> {
        // The origin is forced onto one line and clipped so the header never
        // wraps.
        let mut origin: Vec<u8> = sanitize(&job.origin).join(&b' ');
        origin.truncate(self.line_width.saturating_sub(HEADER_FROM.len()));

        let stamp = job.submitted_at.format("   at %H:%M:%S of %B %-d").to_string();

        let mut out = Vec::with_capacity(HEADER_FROM.len() + origin.len() + stamp.len() + 6);
        out.extend_from_slice(HEADER_FROM);
        out.extend_from_slice(&origin);
        out.extend_from_slice(CRLF);
        out.extend(stamp.chars().filter_map(encode_char));
        out.extend_from_slice(CRLF);
        out.extend_from_slice(CRLF);
        out
    }
}

/// Concatenate frames into the byte stream sent on the wire.
pub fn payload(frames: &[Frame]) -> Vec<u8> {
    frames.iter().flat_map(|f| f.bytes.iter().copied()).collect()
}

/// SHA-256 of the wire payload, hex encoded.  Logged per delivery so an
/// operator can match a receipt to exactly what was sent.
pub fn digest(frames: &[Frame]) -> String {
    let mut hasher = Sha256::new();
    for frame in frames {
        hasher.update(&frame.bytes);
    }
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Text sanitising
// ---------------------------------------------------------------------------

/// Encode text to WPC1252 and split it into paragraphs at line breaks.
///
/// CR LF, lone CR and lone LF all count as one break.  Other controls are
/// dropped; tabs become spaces.
fn sanitize(text: &str) -> Vec<Vec<u8>> {
    let mut paragraphs = vec![Vec::new()];
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\r' || c == '\n' {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            paragraphs.push(Vec::new());
            continue;
        }
        if let (Some(byte), Some(current)) = (encode_char(c), paragraphs.last_mut()) {
            current.push(byte);
        }
    }

    paragraphs
}

/// Map one character to a printable WPC1252 byte.
///
/// `None` drops the character; unmappable characters become `?`.
fn encode_char(c: char) -> Option<u8> {
    match c {
        '\t' => Some(b' '),
        '\u{00}'..='\u{1F}' | '\u{7F}'..='\u{9F}' => None,
        ' '..='~' => Some(c as u8),
        '\u{A0}' => Some(b' '),
        '\u{A1}'..='\u{FF}' => Some(c as u8),
        _ => Some(cp1252_extended(c).unwrap_or(REPLACEMENT)),
    }
}

/// The 0x80–0x9F block, where WPC1252 departs from Latin-1.
fn cp1252_extended(c: char) -> Option<u8> {
    let byte = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

// ---------------------------------------------------------------------------
// Wrapping
// ---------------------------------------------------------------------------

/// Greedy word wrap of one paragraph.
///
/// Words longer than `width` are split hard.  An empty paragraph yields a
/// single empty line so intentional blank lines survive.
fn wrap(paragraph: &[u8], width: usize) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut line: Vec<u8> = Vec::with_capacity(width);

    for mut word in paragraph.split(|b| *b == b' ').filter(|w| !w.is_empty()) {
        while word.len() > width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let (head, rest) = word.split_at(width);
            lines.push(head.to_vec());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        if !line.is_empty() && line.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(b' ');
        }
        line.extend_from_slice(word);
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}
