//! Guest address space: a sparse, lazily-zero-initialized byte store with
//! little-endian multi-width access.

use std::collections::BTreeMap;

/// One loadable ELF segment, as an external loader would hand it to us:
/// `{vaddr, bytes, mem_size, flags}`.
#[derive(Debug, Clone)]
pub struct Segment {
    pub vaddr: u64,
    pub bytes: Vec<u8>,
    pub mem_size: u64,
    pub writable: bool,
    pub executable: bool,
}

/// Sparse byte-addressable guest memory.
///
/// Backed by a `BTreeMap<u64, u8>` rather than a flat `Vec<u8>`: guest
/// address spaces for small benchmark binaries are enormous and mostly
/// unwritten (stack at `0x7FFF...`, text/data somewhere low, heap growing
/// from a configured break). A page-granular sparse map would be more
/// realistic of a production loader but a per-byte map keeps the model
/// simple and is exactly as correct; see DESIGN.md for the tradeoff note.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    bytes: BTreeMap<u64, u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Not the ELF loader itself — a test and bring-up helper that lays
    /// down already-resolved segments the way a real loader's output
    /// would.
    pub fn load_segments(&mut self, segments: &[Segment]) {
        for segment in segments {
            for (offset, byte) in segment.bytes.iter().enumerate() {
                self.bytes.insert(segment.vaddr + offset as u64, *byte);
            }
        }
    }

    pub fn read_u8(&self, addr: u64) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) {
        self.bytes.insert(addr, value);
    }

    pub fn read_u16(&self, addr: u64) -> u16 {
        u16::from_le_bytes(self.read_bytes::<2>(addr))
    }

    pub fn write_u16(&mut self, addr: u64, value: u16) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn read_u32(&self, addr: u64) -> u32 {
        u32::from_le_bytes(self.read_bytes::<4>(addr))
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn read_u64(&self, addr: u64) -> u64 {
        u64::from_le_bytes(self.read_bytes::<8>(addr))
    }

    pub fn write_u64(&mut self, addr: u64, value: u64) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn read_u128(&self, addr: u64) -> u128 {
        u128::from_le_bytes(self.read_bytes::<16>(addr))
    }

    pub fn write_u128(&mut self, addr: u64, value: u128) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    fn read_bytes<const N: usize>(&self, addr: u64) -> [u8; N] {
        let mut buf = [0u8; N];
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_u8(addr + i as u64);
        }
        buf
    }

    fn write_bytes(&mut self, addr: u64, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.write_u8(addr + i as u64, *byte);
        }
    }

    /// Copy `len` bytes out of guest memory starting at `addr`, for
    /// syscalls like `write` that hand a guest buffer to the host.
    pub fn read_slice(&self, addr: u64, len: usize) -> Vec<u8> {
        (0..len as u64).map(|i| self.read_u8(addr + i)).collect()
    }

    /// Copy a host-produced buffer into guest memory, for syscalls like
    /// `read` that fill a guest buffer from the host.
    pub fn write_slice(&mut self, addr: u64, data: &[u8]) {
        self.write_bytes(addr, data);
    }

    /// Read a NUL-terminated string starting at `addr`, as `openat` needs
    /// for its path argument.
    pub fn read_cstr(&self, addr: u64) -> Vec<u8> {
        let mut out = Vec::new();
        let mut cursor = addr;
        loop {
            let byte = self.read_u8(cursor);
            if byte == 0 {
                break;
            }
            out.push(byte);
            cursor += 1;
        }
        out
    }
}
