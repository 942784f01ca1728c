//! Test support: assembles device tree images in memory.
//!
//! The layout is the fixed v17 one: header, a terminating memory
//! reservation entry, the structure block, then the strings block.

const HEADER_LEN: usize = 40;
const RSVMAP_LEN: usize = 16;

const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_END: u32 = 0x9;

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn pad(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Builds a structure block and its strings block token by token.
pub struct BlobBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl BlobBuilder {
    pub fn new() -> Self {
        BlobBuilder {
            structure: Vec::new(),
            strings: Vec::new(),
        }
    }

    /// Interns a property name, reusing an existing entry if present.
    fn string_offset(&mut self, name: &str) -> u32 {
        let needle = name.as_bytes();
        let mut pos = 0;
        while pos < self.strings.len() {
            let len = self.strings[pos..].iter().position(|&b| b == 0).unwrap();
            if &self.strings[pos..pos + len] == needle {
                return pos as u32;
            }
            pos += len + 1;
        }
        let off = self.strings.len() as u32;
        self.strings.extend_from_slice(needle);
        self.strings.push(0);
        off
    }

    pub fn begin_node(&mut self, name: &str) {
        push_u32(&mut self.structure, FDT_BEGIN_NODE);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        pad(&mut self.structure);
    }

    pub fn end_node(&mut self) {
        push_u32(&mut self.structure, FDT_END_NODE);
    }

    pub fn prop(&mut self, name: &str, value: &[u8]) {
        let nameoff = self.string_offset(name);
        push_u32(&mut self.structure, FDT_PROP);
        push_u32(&mut self.structure, value.len() as u32);
        push_u32(&mut self.structure, nameoff);
        self.structure.extend_from_slice(value);
        pad(&mut self.structure);
    }

    pub fn prop_u32(&mut self, name: &str, value: u32) {
        self.prop(name, &value.to_be_bytes());
    }

    pub fn prop_str(&mut self, name: &str, value: &str) {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.prop(name, &bytes);
    }

    pub fn prop_cells(&mut self, name: &str, cells: &[u32]) {
        let mut bytes = Vec::with_capacity(cells.len() * 4);
        for &cell in cells {
            bytes.extend_from_slice(&cell.to_be_bytes());
        }
        self.prop(name, &bytes);
    }

    pub fn build(&self) -> Vec<u8> {
        let mut structure = self.structure.clone();
        push_u32(&mut structure, FDT_END);

        let off_struct = HEADER_LEN + RSVMAP_LEN;
        let off_strings = off_struct + structure.len();
        let totalsize = off_strings + self.strings.len();

        let mut image = Vec::with_capacity(totalsize);
        for &field in &[
            0xd00d_feed,
            totalsize as u32,
            off_struct as u32,
            off_strings as u32,
            HEADER_LEN as u32,
            17,
            16,
            0,
            self.strings.len() as u32,
            structure.len() as u32,
        ] {
            push_u32(&mut image, field);
        }
        image.extend_from_slice(&[0u8; RSVMAP_LEN]);
        image.extend_from_slice(&structure);
        image.extend_from_slice(&self.strings);
        image
    }
}

/// An image shaped like the device tree QEMU hands a riscv virt machine,
/// trimmed to the nodes the tests look at.
pub fn sample_blob() -> Vec<u8> {
    let mut b = BlobBuilder::new();

    b.begin_node("");
    b.prop_u32("#address-cells", 2);
    b.prop_u32("#size-cells", 2);
    b.prop_str("compatible", "riscv-virtio");
    b.prop_str("model", "riscv-virtio,qemu");

    b.begin_node("aliases");
    b.prop_str("serial0", "/soc/uart@10000000");
    b.end_node();

    b.begin_node("chosen");
    b.prop("bootargs", b"");
    b.prop_str("stdout-path", "/soc/uart@10000000");
    b.end_node();

    b.begin_node("cpus");
    b.prop_u32("#address-cells", 1);
    b.prop_u32("#size-cells", 0);
    b.prop_u32("timebase-frequency", 0x0098_9680);

    b.begin_node("cpu@0");
    b.prop_str("device_type", "cpu");
    b.prop_u32("reg", 0);
    b.prop_str("compatible", "riscv");
    b.prop_u32("phandle", 1);

    b.begin_node("interrupt-controller");
    b.prop_u32("#interrupt-cells", 1);
    b.prop("interrupt-controller", b"");
    b.prop_str("compatible", "riscv,cpu-intc");
    b.prop_u32("phandle", 2);
    b.end_node();

    b.end_node();
    b.end_node();

    b.begin_node("soc");
    b.prop_u32("#address-cells", 2);
    b.prop_u32("#size-cells", 2);
    b.prop_str("compatible", "simple-bus");
    b.prop("ranges", b"");

    b.begin_node("uart@10000000");
    b.prop_u32("interrupts", 0xa);
    b.prop_u32("interrupt-parent", 3);
    b.prop_u32("clock-frequency", 0x0038_4000);
    b.prop_cells("reg", &[0x0, 0x1000_0000, 0x0, 0x100]);
    b.prop_str("compatible", "ns16550a");
    b.end_node();

    b.begin_node("plic@c000000");
    b.prop_u32("phandle", 3);
    b.prop_u32("riscv,ndev", 0x35);
    b.prop_cells("reg", &[0x0, 0xc00_0000, 0x0, 0x60_0000]);
    b.prop("interrupt-controller", b"");
    b.prop_str("compatible", "sifive,plic-1.0.0\0riscv,plic0");
    b.end_node();

    b.begin_node("virtio_mmio@10001000");
    b.prop_u32("interrupts", 1);
    b.prop_cells("reg", &[0x0, 0x1000_1000, 0x0, 0x1000]);
    b.prop_str("compatible", "virtio,mmio");
    b.end_node();

    b.begin_node("test@100000");
    b.prop_u32("phandle", 4);
    b.prop_cells("reg", &[0x0, 0x10_0000, 0x0, 0x1000]);
    b.prop_str("compatible", "sifive,test1\0sifive,test0\0syscon");
    b.end_node();

    b.end_node();
    b.end_node();

    b.build()
}
