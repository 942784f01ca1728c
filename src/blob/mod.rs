//! A validated, borrowed view of a flattened device tree image.
//!
//! [`FdtBlob`] checks the fixed header once and hands out offset based
//! navigation over the structure block. Node offsets are relative to the
//! start of the structure block, with the root node at offset 0, matching
//! the offset convention of the C device tree library.

mod nav;
mod parse;

pub use nav::PropsIter;

use core::cmp;
use core::mem::size_of;
use core::ops::Range;

use crate::error::{FdtErr, FdtError, Result};
use crate::prelude::*;
use crate::priv_util::SliceReadResult;
use crate::spec::{fdt_header, header_size_of_version, FDT_MAGIC};

macro_rules! get_be32_field {
    ( $f:ident, $s:ident, $buf:expr ) => {
        $buf.read_be_u32(offset_of!($s, $f))
    };
}

/// All fields of the fixed header, decoded to host endianness.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub(crate) magic: u32,
    pub(crate) totalsize: u32,
    pub(crate) off_dt_struct: u32,
    pub(crate) off_dt_strings: u32,
    pub(crate) off_mem_rsvmap: u32,
    pub(crate) version: u32,
    pub(crate) last_comp_version: u32,
    pub(crate) boot_cpuid_phys: u32,
    pub(crate) size_dt_strings: u32,
    pub(crate) size_dt_struct: u32,
}

impl Header {
    fn read(buf: &[u8]) -> SliceReadResult<Self> {
        Ok(Self {
            magic: get_be32_field!(magic, fdt_header, buf)?,
            totalsize: get_be32_field!(totalsize, fdt_header, buf)?,
            off_dt_struct: get_be32_field!(off_dt_struct, fdt_header, buf)?,
            off_dt_strings: get_be32_field!(off_dt_strings, fdt_header, buf)?,
            off_mem_rsvmap: get_be32_field!(off_mem_rsvmap, fdt_header, buf)?,
            version: get_be32_field!(version, fdt_header, buf)?,
            last_comp_version: get_be32_field!(last_comp_version, fdt_header, buf)?,
            boot_cpuid_phys: get_be32_field!(boot_cpuid_phys, fdt_header, buf)?,
            size_dt_strings: get_be32_field!(size_dt_strings, fdt_header, buf)?,
            size_dt_struct: get_be32_field!(size_dt_struct, fdt_header, buf)?,
        })
    }

    /// The structure block range this header declares, clamped to `len`.
    ///
    /// Versions before 17 do not record the block's size; for those the
    /// block is taken to run to the end of the image.
    fn struct_range(&self, len: usize) -> Range<usize> {
        let start = cmp::min(self.off_dt_struct as usize, len);
        let end = if self.version >= 17 {
            cmp::min(
                (self.off_dt_struct as usize).saturating_add(self.size_dt_struct as usize),
                len,
            )
        } else {
            len
        };
        start..cmp::max(start, end)
    }

    /// The strings block range this header declares, clamped to `len`.
    fn strings_range(&self, len: usize) -> Range<usize> {
        let start = cmp::min(self.off_dt_strings as usize, len);
        let end = if self.version >= 3 {
            cmp::min(
                (self.off_dt_strings as usize).saturating_add(self.size_dt_strings as usize),
                len,
            )
        } else {
            len
        };
        start..cmp::max(start, end)
    }
}

/// A borrowed flattened device tree image whose header has been validated.
///
/// The view is cheap to copy; it holds the image slice, the decoded header
/// and the two sub-block slices the navigation methods read from.
#[derive(Debug, Clone, Copy)]
pub struct FdtBlob<'dt> {
    buf: &'dt [u8],
    header: Header,
    struct_block: &'dt [u8],
    strings_block: &'dt [u8],
}

impl<'dt> FdtBlob<'dt> {
    /// Validates `buf` as a flattened device tree and constructs the view.
    ///
    /// The buffer must start with the magic number and hold at least
    /// `totalsize` bytes; the structure and strings blocks must lie inside
    /// the declared image. Trailing bytes past `totalsize` are ignored.
    pub fn new(buf: &'dt [u8]) -> Result<Self> {
        let header = Header::read(buf).map_err(|_| FdtError::TruncatedHeader(buf.len()))?;
        if header.magic != FDT_MAGIC {
            return Err(FdtError::BadMagic(header.magic));
        }

        let total = header.totalsize as usize;
        if total < size_of::<fdt_header>() {
            return Err(FdtError::TruncatedBlob {
                need: size_of::<fdt_header>(),
                have: total,
            });
        }
        if total > buf.len() {
            return Err(FdtError::TruncatedBlob {
                need: total,
                have: buf.len(),
            });
        }
        // Offsets are exchanged as i32 at the query surface.
        if total > i32::MAX as usize {
            return Err(FdtError::TruncatedBlob {
                need: total,
                have: i32::MAX as usize,
            });
        }

        if header.version >= 17 {
            let need = u64::from(header.off_dt_struct) + u64::from(header.size_dt_struct);
            if need > total as u64 {
                return Err(FdtError::TruncatedBlob {
                    need: need as usize,
                    have: total,
                });
            }
        }
        if header.version >= 3 {
            let need = u64::from(header.off_dt_strings) + u64::from(header.size_dt_strings);
            if need > total as u64 {
                return Err(FdtError::TruncatedBlob {
                    need: need as usize,
                    have: total,
                });
            }
        }
        if header.off_dt_struct as usize > total || header.off_dt_strings as usize > total {
            return Err(FdtError::TruncatedBlob {
                need: cmp::max(header.off_dt_struct, header.off_dt_strings) as usize,
                have: total,
            });
        }

        Ok(Self::with_header(buf, header))
    }

    /// Rebuilds a view over a buffer whose header has already been
    /// validated by [`FdtBlob::new`]. All block ranges are clamped to the
    /// buffer, so a stale header degrades to empty blocks rather than a
    /// panic.
    pub(crate) fn with_header(buf: &'dt [u8], header: Header) -> Self {
        let total = cmp::min(header.totalsize as usize, buf.len());
        Self {
            buf: &buf[..total],
            header,
            struct_block: &buf[header.struct_range(total)],
            strings_block: &buf[header.strings_range(total)],
        }
    }

    pub(crate) fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the magic field of the header.
    #[must_use]
    pub fn magic(&self) -> u32 {
        self.header.magic
    }

    /// Returns the totalsize field of the header: the byte length of the
    /// whole image.
    #[must_use]
    pub fn totalsize(&self) -> u32 {
        self.header.totalsize
    }

    /// Returns the offset of the structure block within the image.
    #[must_use]
    pub fn off_dt_struct(&self) -> u32 {
        self.header.off_dt_struct
    }

    /// Returns the offset of the strings block within the image.
    #[must_use]
    pub fn off_dt_strings(&self) -> u32 {
        self.header.off_dt_strings
    }

    /// Returns the offset of the memory reservation map within the image.
    #[must_use]
    pub fn off_mem_rsvmap(&self) -> u32 {
        self.header.off_mem_rsvmap
    }

    /// Returns the version field of the header.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Returns the last compatible version field of the header.
    #[must_use]
    pub fn last_comp_version(&self) -> u32 {
        self.header.last_comp_version
    }

    /// Returns the physical ID of the boot CPU.
    #[must_use]
    pub fn boot_cpuid_phys(&self) -> u32 {
        self.header.boot_cpuid_phys
    }

    /// Returns the size of the strings block.
    #[must_use]
    pub fn size_dt_strings(&self) -> u32 {
        self.header.size_dt_strings
    }

    /// Returns the size of the structure block.
    #[must_use]
    pub fn size_dt_struct(&self) -> u32 {
        self.header.size_dt_struct
    }

    /// Returns the header length implied by the version field.
    #[must_use]
    pub fn headersize(&self) -> u32 {
        header_size_of_version(self.header.version)
    }

    /// Returns the whole image, trimmed to `totalsize`.
    #[must_use]
    pub fn buf(&self) -> &'dt [u8] {
        self.buf
    }

    /// Reads the NUL terminated property name at `nameoff` in the strings
    /// block.
    pub(crate) fn string_at(&self, nameoff: usize) -> Result<&'dt str, FdtErr> {
        let bytes = self
            .strings_block
            .read_bstring0(nameoff)
            .map_err(|_| FdtErr::BadStructure)?;
        Ok(core::str::from_utf8(bytes)?)
    }
}
