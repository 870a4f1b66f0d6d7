//! Programs: ordered chains of blocks.
//!
//! Blocks live in an arena owned by the [`Program`]; `prev`/`next` links are
//! [`BlockId`] indices into it, so a block never outlives or dangles from
//! its program.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use cnc_common::machine::config::Kinematics;
use tracing::{debug, info};

use crate::block::{Block, tokenizer};
use crate::error::{BlockError, ProgramError};

/// Index of a block inside its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// Append-only ordered chain of blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    blocks: Vec<Block>,
    /// 1-based source line of each block, 0 when pushed directly.
    lines: Vec<usize>,
    limits: Kinematics,
}

impl Program {
    /// Empty program; blocks are synthesized against `limits`.
    pub fn new(limits: Kinematics) -> Self {
        Self {
            blocks: Vec::new(),
            lines: Vec::new(),
            limits,
        }
    }

    /// Parse a whole program text.
    ///
    /// # Errors
    ///
    /// The first failing line, as `ProgramError::Block` with its 1-based number.
    pub fn parse_str(text: &str, limits: &Kinematics) -> Result<Self, ProgramError> {
        let mut program = Self::new(*limits);
        for (index, line) in text.lines().enumerate() {
            program
                .push_numbered(line, index + 1)
                .map_err(|source| ProgramError::Block {
                    line: index + 1,
                    text: line.trim().to_string(),
                    source,
                })?;
        }
        info!("Parsed program: {} blocks", program.len());
        debug!("Program:\n{}", program.describe());
        Ok(program)
    }

    /// Read and parse a program file.
    ///
    /// # Errors
    ///
    /// `ProgramError::Io` if the file cannot be read, otherwise as [`Program::parse_str`].
    pub fn load(path: impl AsRef<Path>, limits: &Kinematics) -> Result<Self, ProgramError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ProgramError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loading program {}", path.display());
        Self::parse_str(&text, limits)
    }

    /// Parse `line` as the successor of the current tail and append it.
    ///
    /// Blank and comment-only lines are skipped and yield `None`.
    ///
    /// # Errors
    ///
    /// Propagates the block's parse, geometry or profile error; the program
    /// is left unchanged.
    pub fn push_line(&mut self, line: &str) -> Result<Option<BlockId>, BlockError> {
        self.push_numbered(line, 0)
    }

    fn push_numbered(&mut self, line: &str, number: usize) -> Result<Option<BlockId>, BlockError> {
        if tokenizer::is_blank(line) {
            return Ok(None);
        }
        let block = Block::parse(line, self.blocks.last(), &self.limits)?;
        Ok(Some(self.append(block, number)))
    }

    fn append(&mut self, mut block: Block, number: usize) -> BlockId {
        let id = BlockId(self.blocks.len());
        if let Some(tail) = self.blocks.last_mut() {
            tail.next = Some(id);
            block.prev = Some(BlockId(id.0 - 1));
        }
        self.blocks.push(block);
        self.lines.push(number);
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn head(&self) -> Option<BlockId> {
        (!self.blocks.is_empty()).then_some(BlockId(0))
    }

    pub fn tail(&self) -> Option<BlockId> {
        self.blocks.len().checked_sub(1).map(BlockId)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0)
    }

    /// 1-based source line of a block, when it was parsed from text.
    pub fn source_line(&self, id: BlockId) -> Option<usize> {
        self.lines.get(id.0).copied().filter(|&l| l > 0)
    }

    /// Kinematic limits the blocks were synthesized against.
    pub fn limits(&self) -> &Kinematics {
        &self.limits
    }

    /// Walk the chain from head to tail.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor {
            program: self,
            next: self.head(),
        }
    }

    /// Multi-line listing of every block.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for block in self.cursor() {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{block}");
        }
        out
    }
}

/// Sequential traversal following `next` links; `None` signals the end.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    program: &'a Program,
    next: Option<BlockId>,
}

impl<'a> Iterator for Cursor<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.program.get(self.next?)?;
        self.next = block.next;
        Some(block)
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Block;
    type IntoIter = Cursor<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.cursor()
    }
}
