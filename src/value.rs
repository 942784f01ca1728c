//! Property value classification.
//!
//! FDT properties carry no type tag. The byte layout alone decides how a
//! value is presented: the presence and placement of NUL terminators, the
//! length modulo the cell size, and a printable ASCII check. The rule order
//! here is load bearing for compatibility and must not be "improved": the
//! string heuristic wins over the cell interpretation whenever both apply.

use core::mem::size_of;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::prelude::*;

/// A property value decoded into a human usable representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    /// A string, or a NUL separated string list kept as one scalar value.
    Text(String),
    /// A single 32-bit big-endian cell as lowercase `0x` hex.
    Number(String),
    /// Two or more 32-bit big-endian cells, each as lowercase `0x` hex.
    NumberArray(Vec<String>),
}

impl PropValue {
    /// Classifies a property's raw bytes, in priority order:
    ///
    /// 1. An empty span is `Text("")`. Presence properties such as
    ///    `ranges` carry no payload at all.
    /// 2. A property named `compatible` is always `Text` of everything
    ///    before its final byte, whatever the bytes look like.
    /// 3. A span passing the printable string test is `Text` with the
    ///    final NUL stripped. Embedded NULs separating list entries stay
    ///    in place, so a multi-entry list reads as one scalar string.
    /// 4. A length that is not a multiple of 4 is `Text`, decoded
    ///    lossily, one trailing NUL stripped if present.
    /// 5. Exactly 4 bytes are a `Number`.
    /// 6. Anything else is a `NumberArray` in original cell order.
    pub fn classify(name: &str, value: &[u8]) -> PropValue {
        if value.is_empty() {
            return PropValue::Text(String::new());
        }
        if name == "compatible" {
            return PropValue::Text(lossy(&value[..value.len() - 1]));
        }
        if is_printable_string(value) || value.len() % size_of::<u32>() != 0 {
            return PropValue::Text(text_of(value));
        }
        if let &[a, b, c, d] = value {
            return PropValue::Number(hex_cell(u32::from_be_bytes([a, b, c, d])));
        }
        let mut cells = Vec::with_capacity(value.len() / size_of::<u32>());
        let mut pos = 0;
        while let Ok(cell) = value.read_be_u32(pos) {
            cells.push(hex_cell(cell));
            pos += size_of::<u32>();
        }
        PropValue::NumberArray(cells)
    }
}

fn hex_cell(cell: u32) -> String {
    format!("{:#x}", cell)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decodes `value` as text, stripping one trailing NUL if present.
fn text_of(value: &[u8]) -> String {
    match value.split_last() {
        Some((&0, body)) => lossy(body),
        _ => lossy(value),
    }
}

/// The printable string test: the span ends in NUL and every NUL
/// separated segment before it is non-empty printable ASCII.
fn is_printable_string(value: &[u8]) -> bool {
    let body = match value.split_last() {
        Some((&0, body)) => body,
        _ => return false,
    };
    body.split(|&b| b == 0)
        .all(|seg| !seg.is_empty() && seg.iter().all(|&b| (0x20..=0x7e).contains(&b)))
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn empty_values_are_presence_flags() {
        assert_eq!(PropValue::classify("ranges", b""), PropValue::Text(String::new()));
    }

    #[test]
    fn single_strings_decode_without_their_terminator() {
        assert_eq!(
            PropValue::classify("model", b"riscv-virtio,qemu\0"),
            PropValue::Text("riscv-virtio,qemu".into())
        );
        assert_eq!(
            PropValue::classify("stdout-path", b"/soc/uart@10000000\0"),
            PropValue::Text("/soc/uart@10000000".into())
        );
    }

    #[test]
    fn strings_win_over_cells_when_the_length_is_a_multiple_of_four() {
        // 12 bytes would also split evenly into three cells.
        assert_eq!(
            PropValue::classify("type", b"virtio,mmio\0"),
            PropValue::Text("virtio,mmio".into())
        );
    }

    #[test]
    fn string_lists_stay_one_scalar_text() {
        assert_eq!(
            PropValue::classify("names", b"abc\0def\0"),
            PropValue::Text("abc\0def".into())
        );
    }

    #[test]
    fn compatible_is_text_by_name_alone() {
        assert_eq!(
            PropValue::classify("compatible", b"ns16550a\0"),
            PropValue::Text("ns16550a".into())
        );
        assert_eq!(
            PropValue::classify("compatible", b"sifive,plic-1.0.0\0riscv,plic0\0"),
            PropValue::Text("sifive,plic-1.0.0\0riscv,plic0".into())
        );
    }

    #[test]
    fn odd_lengths_fall_back_to_lossy_text() {
        assert_eq!(
            PropValue::classify("blob", &[0x80, 0x01, 0x02]),
            PropValue::Text("\u{fffd}\u{1}\u{2}".into())
        );
        // A trailing NUL is stripped even when the rest is not printable.
        assert_eq!(
            PropValue::classify("blob", &[b'a', 0x81, 0x02, 0x03, 0]),
            PropValue::Text("a\u{fffd}\u{2}\u{3}".into())
        );
    }

    #[test]
    fn four_bytes_are_one_number() {
        assert_eq!(
            PropValue::classify("clock-frequency", &[0x00, 0x38, 0x40, 0x00]),
            PropValue::Number("0x384000".into())
        );
        assert_eq!(
            PropValue::classify("cell", &[0, 0, 0, 0]),
            PropValue::Number("0x0".into())
        );
    }

    #[test]
    fn longer_cell_runs_are_arrays() {
        let reg = [
            0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
        ];
        assert_eq!(
            PropValue::classify("reg", &reg),
            PropValue::NumberArray(vec![
                "0x0".into(),
                "0x10000000".into(),
                "0x0".into(),
                "0x100".into(),
            ])
        );
    }

    #[test]
    fn printable_test_requires_terminated_nonempty_segments() {
        assert!(is_printable_string(b"ok\0"));
        assert!(is_printable_string(b"a\0b\0"));
        assert!(is_printable_string(b"~\0"));
        assert!(!is_printable_string(b"ok"));
        assert!(!is_printable_string(b""));
        assert!(!is_printable_string(b"\0"));
        assert!(!is_printable_string(b"a\0\0"));
        assert!(!is_printable_string(&[0x1f, 0]));
        assert!(!is_printable_string(&[0x7f, 0]));
    }
}
