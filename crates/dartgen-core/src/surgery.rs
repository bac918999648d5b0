//! Structural patching of the Dart service class.
//!
//! The service file is tokenized just enough to know where comments, string
//! literals and braces are. The class body is then located by brace
//! matching, and the marker is only accepted as a comment directly inside
//! that body, so marker text in strings or method bodies never matches.

use crate::error::{Error, Result};

/// How generated methods are merged into the service class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchMode {
    /// Replace everything between the marker and the end of the class
    Replace,
    /// Insert before the closing brace of the class, keeping existing code
    #[default]
    Append,
}

impl PatchMode {
    pub fn from_replace(replace: bool) -> Self {
        if replace {
            Self::Replace
        } else {
            Self::Append
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatchOptions<'a> {
    /// Class to patch; the first class in the file when `None` or not found
    pub class_name: Option<&'a str>,
    pub marker: &'a str,
    pub mode: PatchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
    Semi,
    Comment,
    Word,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
struct ClassSpan {
    name: String,
    open_token: usize,
    close_token: usize,
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn tokenize(src: &'a str) -> Result<Vec<Token>> {
        let mut scanner = Scanner {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        };
        scanner.scan_code(false)?;
        Ok(scanner.tokens)
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, record: bool, kind: TokenKind, start: usize) {
        if record {
            self.tokens.push(Token {
                kind,
                start,
                end: self.pos,
            });
        }
    }

    fn line(&self, pos: usize) -> usize {
        let end = pos.min(self.bytes.len());
        self.bytes[..end].iter().filter(|b| **b == b'\n').count() + 1
    }

    /// Scan code to the end of input, or with `interpolation` up to and
    /// including the `}` that closes a `${` expression
    fn scan_code(&mut self, interpolation: bool) -> Result<()> {
        let record = !interpolation;
        let entry = self.pos;
        let mut depth = 0usize;

        while let Some(b) = self.peek(0) {
            let start = self.pos;
            match b {
                b'/' if self.peek(1) == Some(b'/') => {
                    while self.peek(0).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                    self.push(record, TokenKind::Comment, start);
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.block_comment()?;
                    self.push(record, TokenKind::Comment, start);
                }
                b'\'' | b'"' => self.string(false)?,
                b'{' => {
                    self.pos += 1;
                    depth += 1;
                    self.push(record, TokenKind::Open, start);
                }
                b'}' => {
                    self.pos += 1;
                    if interpolation && depth == 0 {
                        return Ok(());
                    }
                    depth = depth.saturating_sub(1);
                    self.push(record, TokenKind::Close, start);
                }
                b';' => {
                    self.pos += 1;
                    self.push(record, TokenKind::Semi, start);
                }
                c if is_ident_start(c) => {
                    while self.peek(0).is_some_and(is_ident_char) {
                        self.pos += 1;
                    }
                    let raw_prefix = &self.src[start..self.pos] == "r";
                    if raw_prefix && matches!(self.peek(0), Some(b'\'' | b'"')) {
                        self.string(true)?;
                    } else {
                        self.push(record, TokenKind::Word, start);
                    }
                }
                _ => self.pos += 1,
            }
        }

        if interpolation {
            return Err(Error::surgery(format!(
                "unterminated string interpolation starting on line {}",
                self.line(entry)
            )));
        }
        Ok(())
    }

    /// Dart block comments nest
    fn block_comment(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 2;
        let mut depth = 1;
        while depth > 0 {
            match (self.peek(0), self.peek(1)) {
                (None, _) => {
                    return Err(Error::surgery(format!(
                        "unterminated block comment starting on line {}",
                        self.line(start)
                    )));
                }
                (Some(b'/'), Some(b'*')) => {
                    depth += 1;
                    self.pos += 2;
                }
                (Some(b'*'), Some(b'/')) => {
                    depth -= 1;
                    self.pos += 2;
                }
                _ => self.pos += 1,
            }
        }
        Ok(())
    }

    /// Skip a string literal starting at the opening quote
    fn string(&mut self, raw: bool) -> Result<()> {
        let start = self.pos;
        let quote = self.bytes[self.pos];
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let unterminated = |line: usize| {
            Error::surgery(format!("unterminated string literal starting on line {line}"))
        };
        loop {
            let Some(b) = self.peek(0) else {
                return Err(unterminated(self.line(start)));
            };
            match b {
                b'\\' if !raw => self.pos += 2,
                b'$' if !raw && self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.scan_code(true)?;
                }
                b'\n' if !triple => return Err(unterminated(self.line(start))),
                _ if b == quote => {
                    if !triple {
                        self.pos += 1;
                        return Ok(());
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        self.pos += 3;
                        return Ok(());
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

/// Top-level classes with their body braces
fn find_classes(src: &str, tokens: &[Token]) -> Vec<ClassSpan> {
    let mut classes = Vec::new();
    let mut stack: Vec<(usize, Option<String>)> = Vec::new();
    let mut pending: Option<String> = None;

    for (idx, token) in tokens.iter().enumerate() {
        let top_level = stack.is_empty();
        match token.kind {
            TokenKind::Word if top_level && &src[token.start..token.end] == "class" => {
                pending = tokens
                    .get(idx + 1)
                    .filter(|next| next.kind == TokenKind::Word)
                    .map(|next| src[next.start..next.end].to_string());
            }
            // `class A = B with C;` has no body
            TokenKind::Semi if top_level => pending = None,
            TokenKind::Open => {
                let name = if top_level { pending.take() } else { None };
                stack.push((idx, name));
            }
            TokenKind::Close => {
                if let Some((open_token, Some(name))) = stack.pop() {
                    classes.push(ClassSpan {
                        name,
                        open_token,
                        close_token: idx,
                    });
                }
            }
            _ => {}
        }
    }
    classes
}

fn normalize_comment(text: &str) -> &str {
    text.trim().trim_start_matches('/').trim()
}

/// Byte range of the marker comment directly inside `class`
fn find_marker(
    src: &str,
    tokens: &[Token],
    class: &ClassSpan,
    marker: &str,
) -> Option<(usize, usize)> {
    let wanted = normalize_comment(marker);
    let mut depth = 0usize;
    for token in &tokens[class.open_token + 1..class.close_token] {
        match token.kind {
            TokenKind::Open => depth += 1,
            TokenKind::Close => depth = depth.saturating_sub(1),
            TokenKind::Comment
                if depth == 0 && normalize_comment(&src[token.start..token.end]) == wanted =>
            {
                return Some((token.start, token.end));
            }
            _ => {}
        }
    }
    None
}

/// Start of the line holding `pos` when only whitespace precedes it there
fn line_start_if_blank(src: &str, pos: usize) -> usize {
    let line_start = src[..pos].rfind('\n').map_or(0, |i| i + 1);
    if src[line_start..pos].trim().is_empty() {
        line_start
    } else {
        pos
    }
}

/// Merge `block` (rendered methods) into the service class of `source`
pub fn patch_service(source: &str, block: &str, options: &PatchOptions<'_>) -> Result<String> {
    let tokens = Scanner::tokenize(source)?;
    let classes = find_classes(source, &tokens);

    let class = match options.class_name {
        Some(name) => classes.iter().find(|c| c.name == name).or_else(|| {
            log::warn!(
                "Class '{}' not found in service file, using the first class instead",
                name
            );
            classes.first()
        }),
        None => classes.first(),
    }
    .ok_or_else(|| Error::surgery("no class declaration found in service file"))?;

    let close = tokens[class.close_token].start;
    let block = block.trim_end();

    let Some((_, marker_end)) = find_marker(source, &tokens, class, options.marker) else {
        log::warn!(
            "Marker not found in class '{}', inserting it before the closing brace",
            class.name
        );
        let insert_at = line_start_if_blank(source, close);
        let mut out = String::with_capacity(source.len() + block.len() + options.marker.len() + 8);
        out.push_str(&source[..insert_at]);
        if insert_at == close {
            out.push('\n');
        }
        out.push_str("\n  ");
        out.push_str(options.marker.trim());
        out.push('\n');
        if !block.is_empty() {
            out.push_str(block);
            out.push('\n');
        }
        out.push_str(&source[insert_at..]);
        return Ok(out);
    };

    let mut out = String::with_capacity(source.len() + block.len() + 2);
    match options.mode {
        PatchMode::Replace => {
            let close_line = line_start_if_blank(source, close);
            out.push_str(&source[..marker_end]);
            out.push('\n');
            if !block.is_empty() {
                out.push_str(block);
                out.push('\n');
            }
            out.push_str(&source[close_line..]);
        }
        PatchMode::Append => {
            let insert_at = line_start_if_blank(source, close);
            out.push_str(&source[..insert_at]);
            if insert_at == close {
                out.push('\n');
            }
            if !block.is_empty() {
                out.push('\n');
                out.push_str(block);
                out.push('\n');
            }
            out.push_str(&source[insert_at..]);
        }
    }
    Ok(out)
}
