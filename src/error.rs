//! Errors reported by this library

use core::fmt;
use core::result;
use core::str::Utf8Error;

use num_derive::FromPrimitive;

use crate::priv_util::SliceReadError;

/// Signed status codes stored into a handle's `errno` by failing lookups.
///
/// The names and numbering follow the C device tree library: codes are
/// contiguous, starting at -1, in declaration order. That ordering is part
/// of the contract. The i-th declared code (0-indexed) has the value
/// `-(i + 1)`, and [`FdtErr::TABLE`] exposes the whole set in order so
/// callers may enumerate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum FdtErr {
    /// The requested node or property does not exist.
    NotFound = -1,
    /// Attempted to create a node or property which already exists.
    Exists = -2,
    /// A buffer was too small to contain the result.
    NoSpace = -3,
    /// The supplied offset does not reference a node.
    BadOffset = -4,
    /// The supplied path is malformed.
    BadPath = -5,
    /// The supplied phandle value was invalid (0 or all ones).
    BadPhandle = -6,
    /// The tree was in a state this operation does not handle.
    BadState = -7,
    /// The buffer ends before the structure it declares.
    Truncated = -8,
    /// The buffer does not begin with the FDT magic number.
    BadMagic = -9,
    /// The tree carries a version this library cannot read.
    BadVersion = -10,
    /// The structure block is corrupt.
    BadStructure = -11,
    /// The sub-blocks are not laid out in the required order.
    BadLayout = -12,
    /// An inconsistency was detected inside the library itself.
    Internal = -13,
    /// A `#address-cells` or `#size-cells` value is out of range.
    BadNCells = -14,
    /// A property value is unsuitable for the requested operation.
    BadValue = -15,
    /// Overlay application failed.
    BadOverlay = -16,
    /// The tree defines no phandles.
    NoPhandles = -17,
    /// Invalid flags were supplied.
    BadFlags = -18,
}

pub const FDT_ERR_NOTFOUND: i32 = FdtErr::NotFound as i32;
pub const FDT_ERR_EXISTS: i32 = FdtErr::Exists as i32;
pub const FDT_ERR_NOSPACE: i32 = FdtErr::NoSpace as i32;
pub const FDT_ERR_BADOFFSET: i32 = FdtErr::BadOffset as i32;
pub const FDT_ERR_BADPATH: i32 = FdtErr::BadPath as i32;
pub const FDT_ERR_BADPHANDLE: i32 = FdtErr::BadPhandle as i32;
pub const FDT_ERR_BADSTATE: i32 = FdtErr::BadState as i32;
pub const FDT_ERR_TRUNCATED: i32 = FdtErr::Truncated as i32;
pub const FDT_ERR_BADMAGIC: i32 = FdtErr::BadMagic as i32;
pub const FDT_ERR_BADVERSION: i32 = FdtErr::BadVersion as i32;
pub const FDT_ERR_BADSTRUCTURE: i32 = FdtErr::BadStructure as i32;
pub const FDT_ERR_BADLAYOUT: i32 = FdtErr::BadLayout as i32;
pub const FDT_ERR_INTERNAL: i32 = FdtErr::Internal as i32;
pub const FDT_ERR_BADNCELLS: i32 = FdtErr::BadNCells as i32;
pub const FDT_ERR_BADVALUE: i32 = FdtErr::BadValue as i32;
pub const FDT_ERR_BADOVERLAY: i32 = FdtErr::BadOverlay as i32;
pub const FDT_ERR_NOPHANDLES: i32 = FdtErr::NoPhandles as i32;
pub const FDT_ERR_BADFLAGS: i32 = FdtErr::BadFlags as i32;

impl FdtErr {
    /// Every named code in declaration order, so `TABLE[i].1 == -(i + 1)`.
    pub const TABLE: [(&'static str, i32); 18] = [
        ("FDT_ERR_NOTFOUND", FDT_ERR_NOTFOUND),
        ("FDT_ERR_EXISTS", FDT_ERR_EXISTS),
        ("FDT_ERR_NOSPACE", FDT_ERR_NOSPACE),
        ("FDT_ERR_BADOFFSET", FDT_ERR_BADOFFSET),
        ("FDT_ERR_BADPATH", FDT_ERR_BADPATH),
        ("FDT_ERR_BADPHANDLE", FDT_ERR_BADPHANDLE),
        ("FDT_ERR_BADSTATE", FDT_ERR_BADSTATE),
        ("FDT_ERR_TRUNCATED", FDT_ERR_TRUNCATED),
        ("FDT_ERR_BADMAGIC", FDT_ERR_BADMAGIC),
        ("FDT_ERR_BADVERSION", FDT_ERR_BADVERSION),
        ("FDT_ERR_BADSTRUCTURE", FDT_ERR_BADSTRUCTURE),
        ("FDT_ERR_BADLAYOUT", FDT_ERR_BADLAYOUT),
        ("FDT_ERR_INTERNAL", FDT_ERR_INTERNAL),
        ("FDT_ERR_BADNCELLS", FDT_ERR_BADNCELLS),
        ("FDT_ERR_BADVALUE", FDT_ERR_BADVALUE),
        ("FDT_ERR_BADOVERLAY", FDT_ERR_BADOVERLAY),
        ("FDT_ERR_NOPHANDLES", FDT_ERR_NOPHANDLES),
        ("FDT_ERR_BADFLAGS", FDT_ERR_BADFLAGS),
    ];

    /// The raw value a failing lookup stores into `errno`.
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Converts a stored `errno` value back into its code, if it names one.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        num_traits::FromPrimitive::from_i32(code)
    }

    /// A short description of the code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FdtErr::NotFound => "node or property not found",
            FdtErr::Exists => "node or property already exists",
            FdtErr::NoSpace => "not enough space to expand",
            FdtErr::BadOffset => "invalid offset",
            FdtErr::BadPath => "bad path format",
            FdtErr::BadPhandle => "invalid phandle",
            FdtErr::BadState => "incomplete devicetree",
            FdtErr::Truncated => "devicetree is truncated",
            FdtErr::BadMagic => "invalid magic number",
            FdtErr::BadVersion => "unsupported devicetree version",
            FdtErr::BadStructure => "corrupt devicetree structure",
            FdtErr::BadLayout => "incorrect devicetree layout",
            FdtErr::Internal => "internal error",
            FdtErr::BadNCells => "invalid #xxx-cells",
            FdtErr::BadValue => "unexpected property value",
            FdtErr::BadOverlay => "invalid devicetree overlay",
            FdtErr::NoPhandles => "no phandles available",
            FdtErr::BadFlags => "invalid flags",
        }
    }
}

impl fmt::Display for FdtErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        f.write_str(self.as_str())
    }
}

impl From<SliceReadError> for FdtErr {
    fn from(_: SliceReadError) -> FdtErr {
        FdtErr::Truncated
    }
}

impl From<Utf8Error> for FdtErr {
    fn from(_: Utf8Error) -> FdtErr {
        FdtErr::BadStructure
    }
}

/// An error describing why a device tree could not be loaded or queried.
#[derive(Debug)]
pub enum FdtError {
    /// The backing file could not be read.
    #[cfg(feature = "std")]
    Io(std::io::Error),

    /// The buffer ends before the fixed header does. Carries the buffer
    /// length.
    TruncatedHeader(usize),

    /// The magic number FDT_MAGIC was not found at the start of the buffer.
    /// Carries the value found instead.
    BadMagic(u32),

    /// The header declares more bytes than the buffer holds, or a sub-block
    /// reaches past the end of the declared image.
    TruncatedBlob { need: usize, have: usize },

    /// A lookup failed against an otherwise valid tree. The same code is
    /// latched into the handle's `errno`.
    Lookup(FdtErr),
}

/// Broad grouping of [`FdtError`] variants, mirroring the distinction
/// between storage faults, malformed images, and plain lookup misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Lookup,
}

impl FdtError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            #[cfg(feature = "std")]
            FdtError::Io(_) => ErrorKind::Io,
            FdtError::TruncatedHeader(_)
            | FdtError::BadMagic(_)
            | FdtError::TruncatedBlob { .. } => ErrorKind::Format,
            FdtError::Lookup(_) => ErrorKind::Lookup,
        }
    }
}

impl From<FdtErr> for FdtError {
    fn from(e: FdtErr) -> FdtError {
        FdtError::Lookup(e)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for FdtError {
    fn from(e: std::io::Error) -> FdtError {
        FdtError::Io(e)
    }
}

impl fmt::Display for FdtError {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match self {
            #[cfg(feature = "std")]
            FdtError::Io(err) => write!(f, "failed to load device tree: {}", err),
            FdtError::TruncatedHeader(len) => {
                write!(f, "buffer of {} bytes ends before the header does", len)
            }
            FdtError::BadMagic(found) => {
                write!(f, "invalid magic number: {:#010x}", found)
            }
            FdtError::TruncatedBlob { need, have } => {
                write!(f, "image needs {} bytes but only {} are available", need, have)
            }
            FdtError::Lookup(code) => write!(f, "{}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FdtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FdtError::Io(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FdtErr {}

/// The result of a load or query.
pub type Result<T, E = FdtError> = core::result::Result<T, E>;
