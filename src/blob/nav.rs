//! Offset based lookups over the structure block.

use core::mem::size_of;
use core::str::from_utf8;

#[cfg(feature = "alloc")]
use alloc::string::String;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::error::{FdtErr, Result};
use crate::prelude::*;
use crate::spec::Phandle;

use super::parse::{next_token, Token, TokenIter};
use super::FdtBlob;

/// Node name comparison as the C library performs it: a search component
/// without a unit address matches a node of that name under any unit
/// address, while a component carrying `@` must match exactly.
fn node_name_eq(name: &str, component: &str) -> bool {
    if name == component {
        return true;
    }
    if !component.contains('@') {
        if let Some(rest) = name.strip_prefix(component) {
            return rest.starts_with('@');
        }
    }
    false
}

/// Whether a NUL separated string list property contains `needle`.
fn stringlist_contains(value: &[u8], needle: &str) -> bool {
    value
        .split(|&b| b == 0)
        .any(|entry| entry == needle.as_bytes())
}

/// Decodes a single cell phandle value. Zero and all ones are reserved
/// markers, not phandles.
fn phandle_cell(value: &[u8]) -> Option<Phandle> {
    match value {
        [a, b, c, d] => match u32::from_be_bytes([*a, *b, *c, *d]) {
            0 | u32::MAX => None,
            cell => Some(cell),
        },
        _ => None,
    }
}

impl<'dt> FdtBlob<'dt> {
    /// Checks that `offset` starts a BeginNode token. Returns the node's
    /// raw name and the offset just past the token, where its properties
    /// and children begin.
    fn begin_node_at(&self, offset: usize) -> Result<(&'dt [u8], usize), FdtErr> {
        if offset % size_of::<u32>() != 0 {
            return Err(FdtErr::BadOffset);
        }
        let mut pos = offset;
        match next_token(self.struct_block, &mut pos) {
            Ok(Some(Token::BeginNode { name })) => Ok((name, pos)),
            _ => Err(FdtErr::BadOffset),
        }
    }

    /// Finds the direct child of the node at `parent` matching `component`.
    fn subnode_offset(&self, parent: usize, component: &str) -> Result<usize, FdtErr> {
        let (_, interior) = self.begin_node_at(parent)?;
        let mut iter = TokenIter::starting_at(self.struct_block, interior);
        let mut depth = 0usize;
        while let Some((off, tok)) = iter.next()? {
            match tok {
                Token::BeginNode { name } => {
                    if depth == 0 && node_name_eq(from_utf8(name)?, component) {
                        return Ok(off);
                    }
                    depth += 1;
                }
                Token::EndNode => {
                    if depth == 0 {
                        // The parent closed without a matching child.
                        return Err(FdtErr::NotFound);
                    }
                    depth -= 1;
                }
                Token::Prop { .. } | Token::Nop => {}
            }
        }
        Err(FdtErr::BadStructure)
    }

    /// Resolves an absolute path to the offset of the node it names.
    pub fn find_node_by_path(&self, path: &str) -> Result<usize, FdtErr> {
        if !path.starts_with('/') {
            return Err(FdtErr::BadPath);
        }
        let mut offset = 0;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            offset = self.subnode_offset(offset, component)?;
        }
        Ok(offset)
    }

    /// Finds the first node in document order whose `compatible` property
    /// lists `compat`.
    pub fn find_node_by_compatible(&self, compat: &str) -> Result<usize, FdtErr> {
        let mut iter = TokenIter::new(self.struct_block);
        let mut current = 0;
        while let Some((off, tok)) = iter.next()? {
            match tok {
                Token::BeginNode { .. } => current = off,
                Token::Prop { nameoff, value } => {
                    if self.string_at(nameoff)? == "compatible"
                        && stringlist_contains(value, compat)
                    {
                        return Ok(current);
                    }
                }
                Token::EndNode | Token::Nop => {}
            }
        }
        Err(FdtErr::NotFound)
    }

    /// Returns the name of the node at `offset`, empty for the root.
    pub fn name_of_offset(&self, offset: usize) -> Result<&'dt str, FdtErr> {
        let (name, _) = self.begin_node_at(offset)?;
        Ok(from_utf8(name)?)
    }

    /// Builds the absolute path of the node at `offset`.
    ///
    /// The target is validated first, then located by one forward walk of
    /// the block with a running name stack. An offset whose bytes happen to
    /// read as a node but which the walk never reaches (one pointing into
    /// the middle of a record) is rejected rather than given a fabricated
    /// path.
    #[cfg(feature = "alloc")]
    pub fn path_of_offset(&self, offset: usize) -> Result<String, FdtErr> {
        self.begin_node_at(offset)?;
        let mut stack: Vec<&'dt str> = Vec::new();
        let mut iter = TokenIter::new(self.struct_block);
        while let Some((off, tok)) = iter.next()? {
            match tok {
                Token::BeginNode { name } => {
                    stack.push(from_utf8(name)?);
                    if off == offset {
                        // The first entry is the root's empty name.
                        let mut path = String::new();
                        for component in &stack[1..] {
                            path.push('/');
                            path.push_str(component);
                        }
                        if path.is_empty() {
                            path.push('/');
                        }
                        return Ok(path);
                    }
                }
                Token::EndNode => {
                    if stack.pop().is_none() {
                        return Err(FdtErr::BadStructure);
                    }
                }
                Token::Prop { .. } | Token::Nop => {}
            }
        }
        Err(FdtErr::BadOffset)
    }

    /// Returns an iterator over the properties directly on the node at
    /// `offset`, as `(name, raw value)` pairs in declaration order.
    pub fn properties_of_offset(&self, offset: usize) -> Result<PropsIter<'dt>, FdtErr> {
        let (_, interior) = self.begin_node_at(offset)?;
        Ok(PropsIter {
            blob: *self,
            iter: TokenIter::starting_at(self.struct_block, interior),
            done: false,
        })
    }

    /// Looks up `alias` under the `/aliases` node and returns the path
    /// string it stores. Any miss, including the absence of `/aliases`
    /// itself, is `None`.
    pub fn resolve_alias(&self, alias: &str) -> Option<&'dt str> {
        let offset = self.find_node_by_path("/aliases").ok()?;
        let mut props = self.properties_of_offset(offset).ok()?;
        let (_, value) = match props.find(|&(name, _)| Ok(name == alias)) {
            Ok(Some(found)) => found,
            _ => return None,
        };
        match value.split_last() {
            Some((&0, path)) => from_utf8(path).ok(),
            _ => None,
        }
    }

    /// Reads the phandle of the node at `offset` from its `phandle`
    /// property, falling back to the legacy `linux,phandle` name. `None`
    /// when the node has no such property, the value is not a single cell,
    /// or the cell holds a reserved marker.
    pub fn phandle_of_offset(&self, offset: usize) -> Option<Phandle> {
        let mut props = self.properties_of_offset(offset).ok()?;
        let mut legacy = None;
        loop {
            match props.next() {
                Ok(Some((name, value))) => {
                    if name == "phandle" {
                        if let Some(cell) = phandle_cell(value) {
                            return Some(cell);
                        }
                    } else if name == "linux,phandle" && legacy.is_none() {
                        legacy = phandle_cell(value);
                    }
                }
                Ok(None) => return legacy,
                Err(_) => return None,
            }
        }
    }

    /// Scans the whole tree for the largest phandle value.
    ///
    /// The scan is best effort: a structure error ends it early and the
    /// largest value seen so far still counts. `None` means no node
    /// defines a phandle.
    pub fn max_phandle(&self) -> Option<Phandle> {
        let mut iter = TokenIter::new(self.struct_block);
        let mut max = None;
        while let Ok(Some((_, tok))) = iter.next() {
            if let Token::Prop { nameoff, value } = tok {
                let name = match self.string_at(nameoff) {
                    Ok(name) => name,
                    Err(_) => break,
                };
                if name == "phandle" || name == "linux,phandle" {
                    max = max.max(phandle_cell(value));
                }
            }
        }
        max
    }
}

/// A fallible iterator over one node's properties.
///
/// Iteration ends at the node's first child, since properties precede
/// child nodes within a node's record.
#[derive(Clone)]
pub struct PropsIter<'dt> {
    blob: FdtBlob<'dt>,
    iter: TokenIter<'dt>,
    done: bool,
}

impl<'dt> FallibleIterator for PropsIter<'dt> {
    type Item = (&'dt str, &'dt [u8]);
    type Error = FdtErr;

    fn next(&mut self) -> Result<Option<Self::Item>, FdtErr> {
        if self.done {
            return Ok(None);
        }
        loop {
            match self.iter.next()? {
                Some((_, Token::Prop { nameoff, value })) => {
                    return Ok(Some((self.blob.string_at(nameoff)?, value)));
                }
                Some((_, Token::Nop)) => {}
                Some(_) => {
                    self.done = true;
                    return Ok(None);
                }
                None => {
                    // The block ended inside an open node.
                    self.done = true;
                    return Err(FdtErr::BadStructure);
                }
            }
        }
    }
}
