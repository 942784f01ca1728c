//! Flattened device tree wire format definitions.

use core::mem::size_of;

use endian_type::types::u32_be;
use num_derive::FromPrimitive;

pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Tokens delimiting the records of the structure block.
#[derive(FromPrimitive)]
pub enum FdtTok {
    BeginNode = 0x1,
    EndNode = 0x2,
    Prop = 0x3,
    Nop = 0x4,
    End = 0x9,
}

/// A node's phandle cell value. Zero and all ones are reserved markers
/// rather than phandles.
pub type Phandle = u32;

// Header lengths of the format revisions still met in the wild. Each
// revision appended one field; only v17 carries `size_dt_struct`.
pub const FDT_V1_SIZE: u32 = 7 * size_of::<u32>() as u32;
pub const FDT_V2_SIZE: u32 = FDT_V1_SIZE + size_of::<u32>() as u32;
pub const FDT_V3_SIZE: u32 = FDT_V2_SIZE + size_of::<u32>() as u32;
pub const FDT_V16_SIZE: u32 = FDT_V3_SIZE;
pub const FDT_V17_SIZE: u32 = FDT_V16_SIZE + size_of::<u32>() as u32;

/// Returns the length of the header that `version` declares.
#[must_use]
pub fn header_size_of_version(version: u32) -> u32 {
    if version <= 1 {
        FDT_V1_SIZE
    } else if version <= 2 {
        FDT_V2_SIZE
    } else if version <= 3 {
        FDT_V3_SIZE
    } else if version <= 16 {
        FDT_V16_SIZE
    } else {
        FDT_V17_SIZE
    }
}

// As defined by the spec.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct fdt_header {
    pub magic: u32_be,
    pub totalsize: u32_be,
    pub off_dt_struct: u32_be,
    pub off_dt_strings: u32_be,
    pub off_mem_rsvmap: u32_be,
    pub version: u32_be,
    pub last_comp_version: u32_be,
    pub boot_cpuid_phys: u32_be,
    pub size_dt_strings: u32_be,
    pub size_dt_struct: u32_be,
}

#[allow(non_camel_case_types)]
#[repr(C)]
pub struct fdt_prop_header {
    pub len: u32_be,
    pub nameoff: u32_be,
}

const_assert_eq!(size_of::<fdt_header>(), FDT_V17_SIZE as usize);
const_assert_eq!(size_of::<fdt_prop_header>(), 2 * size_of::<u32>());
