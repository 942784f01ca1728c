//! Low level tokenizer for the structure block.

use core::mem::size_of;

use num_traits::FromPrimitive;

use crate::error::FdtErr;
use crate::prelude::*;
use crate::spec::{fdt_prop_header, FdtTok};

/// One decoded structure block record.
pub(crate) enum Token<'dt> {
    /// Opens a node. The name is the raw bytes up to the terminator,
    /// empty for the root node.
    BeginNode { name: &'dt [u8] },
    EndNode,
    Prop { nameoff: usize, value: &'dt [u8] },
    Nop,
}

/// Rounds a structure block offset up to the next token boundary.
const fn align_tok(off: usize) -> usize {
    (off + size_of::<u32>() - 1) & !(size_of::<u32>() - 1)
}

/// Decodes the record starting at `*off` within the structure block.
///
/// Returns `None` for the End token. On success `*off` is left at the next
/// token boundary, so repeated calls walk the block in order. All offsets
/// are relative to the start of the structure block; this is also the node
/// offset convention of the query API, with the root node at offset 0.
pub(crate) fn next_token<'dt>(
    blk: &'dt [u8],
    off: &mut usize,
) -> Result<Option<Token<'dt>>, FdtErr> {
    let tok_val = blk.read_be_u32(*off)?;
    *off += size_of::<u32>();

    match FromPrimitive::from_u32(tok_val) {
        Some(FdtTok::BeginNode) => {
            let name = blk.read_bstring0(*off)?;

            // Move past the name, its terminator and the padding.
            *off = align_tok(*off + name.len() + 1);
            Ok(Some(Token::BeginNode { name }))
        }
        Some(FdtTok::Prop) => {
            let len = blk.read_be_u32(*off + offset_of!(fdt_prop_header, len))? as usize;
            let nameoff = blk.read_be_u32(*off + offset_of!(fdt_prop_header, nameoff))? as usize;
            *off += size_of::<fdt_prop_header>();

            let end = off.checked_add(len).ok_or(FdtErr::Truncated)?;
            let value = blk.get(*off..end).ok_or(FdtErr::Truncated)?;
            *off = align_tok(end);
            Ok(Some(Token::Prop { nameoff, value }))
        }
        Some(FdtTok::EndNode) => Ok(Some(Token::EndNode)),
        Some(FdtTok::Nop) => Ok(Some(Token::Nop)),
        Some(FdtTok::End) => Ok(None),
        None => Err(FdtErr::BadStructure),
    }
}

/// A fallible iterator over `(offset, token)` pairs of a structure block.
///
/// The offset of each yielded pair is the position the token itself starts
/// at, which for BeginNode tokens is the node's offset.
#[derive(Clone)]
pub(crate) struct TokenIter<'dt> {
    blk: &'dt [u8],
    offset: usize,
}

impl<'dt> TokenIter<'dt> {
    pub(crate) fn new(blk: &'dt [u8]) -> Self {
        Self { blk, offset: 0 }
    }

    pub(crate) fn starting_at(blk: &'dt [u8], offset: usize) -> Self {
        Self { blk, offset }
    }
}

impl<'dt> FallibleIterator for TokenIter<'dt> {
    type Item = (usize, Token<'dt>);
    type Error = FdtErr;

    fn next(&mut self) -> Result<Option<Self::Item>, FdtErr> {
        let start = self.offset;
        match next_token(self.blk, &mut self.offset)? {
            Some(tok) => Ok(Some((start, tok))),
            None => Ok(None),
        }
    }
}
