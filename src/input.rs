use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Stdin};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::codec::{QType, UnknownQType};

/// One classified line from the input stream (§4.C).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Directive(String),
    Query(String),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rewind is only supported for file input, not a live stream")]
pub struct NotRewindable;

enum Source {
    Stdin(BufReader<Stdin>),
    File(BufReader<File>),
}

/// A lazy, line-oriented source of query/directive lines (§4.C). Lines
/// that are empty or begin with `;` are skipped transparently; they never
/// reach the caller and never consume a query id.
pub struct InputStream {
    source: Source,
}

impl InputStream {
    pub fn stdin() -> Self {
        Self {
            source: Source::Stdin(BufReader::new(io::stdin())),
        }
    }

    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            source: Source::File(BufReader::new(file)),
        })
    }

    pub fn next_line(&mut self) -> io::Result<LineKind> {
        loop {
            let mut raw = String::new();
            let bytes_read = match &mut self.source {
                Source::Stdin(r) => r.read_line(&mut raw)?,
                Source::File(r) => r.read_line(&mut raw)?,
            };
            if bytes_read == 0 {
                return Ok(LineKind::Eof);
            }

            let line = raw.trim_end_matches(['\n', '\r']);
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('#') {
                return Ok(LineKind::Directive(rest.trim_start().to_string()));
            }
            return Ok(LineKind::Query(line.to_string()));
        }
    }

    pub fn rewind(&mut self) -> Result<(), NotRewindable> {
        match &mut self.source {
            Source::File(r) => {
                r.seek(SeekFrom::Start(0)).map_err(|_| NotRewindable)?;
                Ok(())
            }
            Source::Stdin(_) => Err(NotRewindable),
        }
    }
}

/// One of the four recognized directive names (§4.C/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveName {
    Server,
    Port,
    MaxQueries,
    MaxWait,
}

impl DirectiveName {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "server" => Some(Self::Server),
            "port" => Some(Self::Port),
            "maxqueries" => Some(Self::MaxQueries),
            "maxwait" => Some(Self::MaxWait),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Directive {
    pub name: DirectiveName,
    pub value: String,
    pub trailing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("directive line is empty")]
    Empty,
    #[error("unknown directive name: {0}")]
    UnknownName(String),
    #[error("directive '{0}' is missing a value")]
    MissingValue(String),
}

/// Parses a `# <name> <value> [trailing...]` directive body (the text
/// after the leading `#` has already been stripped by `InputStream`).
pub fn parse_directive(text: &str) -> Result<Directive, DirectiveError> {
    let mut tokens = text.split_whitespace();
    let name_tok = tokens.next().ok_or(DirectiveError::Empty)?;
    let name =
        DirectiveName::parse(name_tok).ok_or_else(|| DirectiveError::UnknownName(name_tok.to_string()))?;
    let value = tokens
        .next()
        .ok_or_else(|| DirectiveError::MissingValue(name_tok.to_string()))?
        .to_string();
    let trailing: Vec<String> = tokens.map(str::to_string).collect();
    Ok(Directive {
        name,
        value,
        trailing,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryLineError {
    #[error("query line must have exactly two fields, got {0}")]
    WrongFieldCount(usize),
    #[error(transparent)]
    UnknownQType(#[from] UnknownQType),
}

/// Parses a `<domain> <qtype>` query line (§4.C/§6) — exactly two
/// whitespace-separated tokens.
pub fn parse_query(text: &str) -> Result<(String, QType), QueryLineError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(QueryLineError::WrongFieldCount(tokens.len()));
    }
    let qtype: QType = tokens[1].parse()?;
    Ok((tokens[0].to_string(), qtype))
}

/// Ensures `data_file` vs. stdin selection is routed through one place,
/// matching this crate's style of keeping `main` thin.
pub fn open_input(data_file: Option<&PathBuf>) -> io::Result<InputStream> {
    match data_file {
        Some(path) => InputStream::open(path),
        None => Ok(InputStream::stdin()),
    }
}
