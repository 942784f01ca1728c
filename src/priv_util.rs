use core::mem::size_of;

#[derive(Debug, Copy, Clone)]
pub enum SliceReadError {
    UnexpectedEndOfInput,
}

pub(crate) type SliceReadResult<T> = Result<T, SliceReadError>;

/// Bounds checked big endian reads out of a byte slice.
///
/// The owned buffers this library works over carry no alignment guarantee,
/// so every read goes byte by byte through `from_be_bytes`.
pub(crate) trait SliceRead<'a> {
    fn read_be_u32(&self, pos: usize) -> SliceReadResult<u32>;
    fn read_bstring0(&self, pos: usize) -> SliceReadResult<&'a [u8]>;
}

impl<'a> SliceRead<'a> for &'a [u8] {
    fn read_be_u32(&self, pos: usize) -> SliceReadResult<u32> {
        match pos.checked_add(size_of::<u32>()) {
            Some(end) if end <= self.len() => {
                let b = &self[pos..end];
                Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            _ => Err(SliceReadError::UnexpectedEndOfInput),
        }
    }

    fn read_bstring0(&self, pos: usize) -> SliceReadResult<&'a [u8]> {
        for i in pos..self.len() {
            if self[i] == 0 {
                return Ok(&self[pos..i]);
            }
        }
        Err(SliceReadError::UnexpectedEndOfInput)
    }
}
