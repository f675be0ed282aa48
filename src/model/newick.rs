//! Newick text: compact notation for building and printing trees.
//!
//! ```text
//! ((A:1.0,B:2.0)AB:0.5,'C d':3.0)Root;
//! ```
//!
//! Supports quoted labels (`''` escapes a quote), `[...]` comments and
//! several `;`-terminated trees in one input.

use std::fmt;
use std::str::FromStr;

use super::{Clade, Tree};
use crate::{Error, Result};

/// Parse every `;`-terminated tree in the input.
pub fn parse_trees(input: &str) -> Result<Vec<Tree>> {
    let mut reader = Reader::new(input);
    let mut trees = Vec::new();
    loop {
        reader.skip_ws()?;
        if reader.peek().is_none() {
            break;
        }
        let root = reader.subtree()?;
        reader.skip_ws()?;
        match reader.bump() {
            Some(';') => trees.push(Tree::new(root)),
            Some(c) => return Err(reader.error(format!("Expected ';', got '{c}'"))),
            None => return Err(reader.error("Missing ';' at end of tree".into())),
        }
    }
    Ok(trees)
}

impl FromStr for Tree {
    type Err = Error;

    /// Parse exactly one tree.
    fn from_str(s: &str) -> Result<Tree> {
        let mut trees = parse_trees(s)?;
        match trees.len() {
            1 => Ok(trees.remove(0)),
            n => Err(Error::SyntaxError {
                position: 0,
                message: format!("Expected one Newick tree, found {n}"),
            }),
        }
    }
}

// ============================================================================
// Reader
// ============================================================================

struct Reader {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl Reader {
    fn new(input: &str) -> Self {
        Self { chars: input.char_indices().collect(), pos: 0, len: input.len() }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |&(i, _)| i)
    }

    fn error(&self, message: String) -> Error {
        Error::SyntaxError { position: self.offset(), message }
    }

    /// Skip whitespace and `[...]` comments.
    fn skip_ws(&mut self) -> Result<()> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '[' {
                let start = self.offset();
                while let Some(c) = self.bump() {
                    if c == ']' {
                        break;
                    }
                }
                if self.chars.get(self.pos - 1).map(|&(_, c)| c) != Some(']') {
                    return Err(Error::SyntaxError {
                        position: start,
                        message: "Unterminated comment".into(),
                    });
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    /// One clade with all its descendants. Open clade lists are kept on an
    /// explicit stack, so nesting depth is bounded by memory only.
    fn subtree(&mut self) -> Result<Clade> {
        let mut open: Vec<Clade> = Vec::new();
        loop {
            self.skip_ws()?;
            if self.peek() == Some('(') {
                self.pos += 1;
                open.push(Clade::new());
                continue;
            }
            let mut clade = Clade::new();
            self.tail(&mut clade)?;
            loop {
                let Some(parent) = open.last_mut() else { return Ok(clade) };
                parent.push(clade);
                self.skip_ws()?;
                match self.bump() {
                    Some(',') => break,
                    Some(')') => {
                        clade = match open.pop() {
                            Some(closed) => closed,
                            None => return Err(self.error("Unbalanced ')'".into())),
                        };
                        self.tail(&mut clade)?;
                    }
                    Some(c) => return Err(self.error(format!("Expected ',' or ')', got '{c}'"))),
                    None => return Err(self.error("Unterminated clade list".into())),
                }
            }
        }
    }

    /// Label and optional `:length` after a clade's child list.
    fn tail(&mut self, clade: &mut Clade) -> Result<()> {
        self.skip_ws()?;
        clade.name = self.label()?;
        self.skip_ws()?;
        if self.peek() == Some(':') {
            self.pos += 1;
            self.skip_ws()?;
            clade.branch_length = Some(self.number()?);
        }
        Ok(())
    }

    fn label(&mut self) -> Result<Option<String>> {
        if self.peek() == Some('\'') {
            let start = self.offset();
            self.pos += 1;
            let mut s = String::new();
            loop {
                match self.bump() {
                    Some('\'') if self.peek() == Some('\'') => {
                        self.pos += 1;
                        s.push('\'');
                    }
                    Some('\'') => return Ok(Some(s)),
                    Some(c) => s.push(c),
                    None => {
                        return Err(Error::SyntaxError {
                            position: start,
                            message: "Unterminated quoted label".into(),
                        });
                    }
                }
            }
        }
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || is_reserved(c) {
                break;
            }
            s.push(c);
            self.pos += 1;
        }
        Ok(if s.is_empty() { None } else { Some(s) })
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.offset();
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-') {
                s.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        s.parse::<f64>().map_err(|_| Error::SyntaxError {
            position: start,
            message: format!("Invalid branch length '{s}'"),
        })
    }
}

pub(crate) fn is_reserved(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '\'' | ':' | ';' | ',')
}

// ============================================================================
// Writer
// ============================================================================

enum Step<'a> {
    Enter(&'a Clade),
    Comma,
    Exit(&'a Clade),
}

impl fmt::Display for Clade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Step::Enter(self)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(clade) if clade.clades.is_empty() => clade.write_tail(f)?,
                Step::Enter(clade) => {
                    f.write_str("(")?;
                    stack.push(Step::Exit(clade));
                    for (i, child) in clade.clades.iter().enumerate().rev() {
                        stack.push(Step::Enter(child));
                        if i > 0 {
                            stack.push(Step::Comma);
                        }
                    }
                }
                Step::Comma => f.write_str(",")?,
                Step::Exit(clade) => {
                    f.write_str(")")?;
                    clade.write_tail(f)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.root)
    }
}
