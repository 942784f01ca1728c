//! The owning handle over a loaded device tree image.

use core::cell::Cell;
use core::convert::TryFrom;

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

#[cfg(feature = "std")]
use std::path::{Path, PathBuf};

use crate::blob::{FdtBlob, Header};
use crate::error::{FdtErr, FdtError, Result};
use crate::prelude::*;
use crate::spec::header_size_of_version;
use crate::value::PropValue;

/// Where the bytes of a device tree image come from.
///
/// The source is settled before any parsing begins, so an image can only
/// ever be named by a filesystem path or handed over as an owned buffer.
#[derive(Debug, Clone)]
pub enum BlobSource {
    /// Read the image from the filesystem.
    #[cfg(feature = "std")]
    Path(PathBuf),
    /// Take these bytes as the image.
    Bytes(Vec<u8>),
}

#[cfg(feature = "std")]
impl From<PathBuf> for BlobSource {
    fn from(path: PathBuf) -> Self {
        BlobSource::Path(path)
    }
}

#[cfg(feature = "std")]
impl From<&Path> for BlobSource {
    fn from(path: &Path) -> Self {
        BlobSource::Path(path.to_path_buf())
    }
}

#[cfg(feature = "std")]
impl From<&str> for BlobSource {
    fn from(path: &str) -> Self {
        BlobSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for BlobSource {
    fn from(bytes: Vec<u8>) -> Self {
        BlobSource::Bytes(bytes)
    }
}

impl From<&[u8]> for BlobSource {
    fn from(bytes: &[u8]) -> Self {
        BlobSource::Bytes(bytes.to_vec())
    }
}

/// An open device tree image.
///
/// The handle owns the image bytes, the header fields cached at open
/// time, and a last-error slot in the style of libfdt: every failing
/// lookup stores its negative code, readable afterwards through
/// [`Fdt::errno`], and successful lookups leave the slot untouched.
///
/// The error slot is a [`Cell`], so the handle is not `Sync`; sharing
/// one across threads takes an external lock.
#[derive(Debug)]
pub struct Fdt {
    buf: Vec<u8>,
    header: Header,
    errno: Cell<i32>,
}

impl Fdt {
    /// Opens a device tree image.
    ///
    /// The header is validated and cached before the handle exists, so a
    /// handle over a malformed image is never observable. The error slot
    /// starts at zero.
    pub fn open(source: BlobSource) -> Result<Self> {
        let buf = match source {
            #[cfg(feature = "std")]
            BlobSource::Path(path) => std::fs::read(path)?,
            BlobSource::Bytes(bytes) => bytes,
        };
        let header = *FdtBlob::new(&buf)?.header();
        Ok(Fdt {
            buf,
            header,
            errno: Cell::new(0),
        })
    }

    /// Opens the image stored at `path`.
    #[cfg(feature = "std")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(BlobSource::Path(path.as_ref().to_path_buf()))
    }

    /// Opens an image already held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::open(BlobSource::Bytes(bytes))
    }

    /// The magic number from the header, `0xd00dfeed` for every image
    /// this library accepts.
    pub fn magic(&self) -> u32 {
        self.header.magic
    }

    /// The format version from the header.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// The header length implied by the image's version, 40 for v17.
    pub fn headersize(&self) -> u32 {
        header_size_of_version(self.header.version)
    }

    /// The image length claimed by the header.
    pub fn totalsize(&self) -> u32 {
        self.header.totalsize
    }

    /// The code of the most recent failed lookup, 0 before any failure.
    pub fn errno(&self) -> i32 {
        self.errno.get()
    }

    fn blob(&self) -> FdtBlob<'_> {
        FdtBlob::with_header(&self.buf, self.header)
    }

    /// Latches `err` in the error slot and reports the lookup failure.
    fn fail<T>(&self, err: FdtErr) -> Result<T> {
        self.errno.set(err.code());
        Err(FdtError::Lookup(err))
    }

    /// Converts a caller-facing offset into a block position. Offsets
    /// are exchanged as `i32` in libfdt's manner; negatives never name a
    /// node.
    fn checked_offset(&self, offset: i32) -> Result<usize> {
        match usize::try_from(offset) {
            Ok(offset) => Ok(offset),
            Err(_) => self.fail(FdtErr::BadOffset),
        }
    }

    /// Resolves an absolute path to the offset of the node it names.
    ///
    /// The root is `"/"` at offset 0. A path component without a unit
    /// address matches a node of that name under any unit address.
    pub fn get_node_offset_by_path(&self, path: &str) -> Result<i32> {
        match self.blob().find_node_by_path(path) {
            Ok(offset) => Ok(offset as i32),
            Err(err) => self.fail(err),
        }
    }

    /// Finds the first node in document order whose `compatible` list
    /// contains `compat` as a whole entry.
    pub fn get_node_offset_by_compat(&self, compat: &str) -> Result<i32> {
        match self.blob().find_node_by_compatible(compat) {
            Ok(offset) => Ok(offset as i32),
            Err(err) => self.fail(err),
        }
    }

    /// Renders the absolute path of the node at `offset`.
    pub fn get_node_path_by_offset(&self, offset: i32) -> Result<String> {
        let offset = self.checked_offset(offset)?;
        match self.blob().path_of_offset(offset) {
            Ok(path) => Ok(path),
            Err(err) => self.fail(err),
        }
    }

    /// Resolves `alias` through the `/aliases` node to the path it
    /// stores.
    ///
    /// A missing alias, like a tree without `/aliases`, is an ordinary
    /// `None` and leaves the error slot alone.
    pub fn get_node_path_by_alias(&self, alias: &str) -> Option<String> {
        self.blob().resolve_alias(alias).map(String::from)
    }

    /// Returns the name of the node at `offset`, `""` for the root.
    pub fn get_node_name_by_offset(&self, offset: i32) -> Result<&str> {
        let offset = self.checked_offset(offset)?;
        match self.blob().name_of_offset(offset) {
            Ok(name) => Ok(name),
            Err(err) => self.fail(err),
        }
    }

    /// Collects the classified properties of the node at `path`.
    pub fn get_props_by_path(&self, path: &str) -> Result<BTreeMap<String, PropValue>> {
        match self.blob().find_node_by_path(path) {
            Ok(offset) => self.props_at(offset),
            Err(err) => self.fail(err),
        }
    }

    /// Collects the classified properties of the node at `offset`.
    pub fn get_props_by_offset(&self, offset: i32) -> Result<BTreeMap<String, PropValue>> {
        let offset = self.checked_offset(offset)?;
        self.props_at(offset)
    }

    /// Collects the classified properties of the first node compatible
    /// with `compat`.
    pub fn get_props_by_compat(&self, compat: &str) -> Result<BTreeMap<String, PropValue>> {
        match self.blob().find_node_by_compatible(compat) {
            Ok(offset) => self.props_at(offset),
            Err(err) => self.fail(err),
        }
    }

    fn props_at(&self, offset: usize) -> Result<BTreeMap<String, PropValue>> {
        let blob = self.blob();
        let mut props = match blob.properties_of_offset(offset) {
            Ok(props) => props,
            Err(err) => return self.fail(err),
        };
        let mut map = BTreeMap::new();
        loop {
            match props.next() {
                Ok(Some((name, value))) => {
                    map.insert(name.to_string(), PropValue::classify(name, value));
                }
                Ok(None) => return Ok(map),
                Err(err) => return self.fail(err),
            }
        }
    }

    /// Reads the phandle of the node at `offset` as a lowercase hex
    /// string.
    ///
    /// Invalid offsets and nodes without a usable phandle property come
    /// back as `None` without touching the error slot.
    pub fn get_phandle_by_offset(&self, offset: i32) -> Option<String> {
        let offset = usize::try_from(offset).ok()?;
        let phandle = self.blob().phandle_of_offset(offset)?;
        Some(format!("{:#x}", phandle))
    }

    /// Finds the largest phandle defined anywhere in the tree, as a
    /// lowercase hex string. `None` when no node defines one.
    pub fn get_max_phandle(&self) -> Option<String> {
        let phandle = self.blob().max_phandle()?;
        Some(format!("{:#x}", phandle))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn sources_convert_from_owned_and_borrowed_bytes() {
        assert!(matches!(
            BlobSource::from(vec![0u8, 1, 2]),
            BlobSource::Bytes(_)
        ));
        assert!(matches!(
            BlobSource::from(&[0u8, 1, 2][..]),
            BlobSource::Bytes(_)
        ));
    }

    #[cfg(feature = "std")]
    #[test]
    fn sources_convert_from_path_spellings() {
        assert!(matches!(
            BlobSource::from("image.dtb"),
            BlobSource::Path(_)
        ));
        assert!(matches!(
            BlobSource::from(PathBuf::from("image.dtb")),
            BlobSource::Path(_)
        ));
        assert!(matches!(
            BlobSource::from(Path::new("image.dtb")),
            BlobSource::Path(_)
        ));
    }
}
