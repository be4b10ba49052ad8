//! Growable object image the compilers write into.

use tracing::trace;

/// Hard size limit of one object image.
pub const MAX_IMAGE_SIZE: usize = 0x10_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("program exceeds {}KB", MAX_IMAGE_SIZE / 1024)]
    Overflow,
    #[error("image offset {0:#x} is outside the written area")]
    OutOfBounds(usize),
}

/// Byte buffer with a write position.
///
/// The position can be moved back with [`ObjectImage::set_offset`]; bytes past it stay
/// in the buffer and are overwritten by later appends, which lets the block compiler
/// re-emit a method body from the same starting point on every relaxation pass.
#[derive(Debug, Clone, Default)]
pub struct ObjectImage {
    bytes: Vec<u8>,
    offset: usize,
}

impl ObjectImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) -> Result<(), ImageError> {
        if offset > self.bytes.len() {
            return Err(ImageError::OutOfBounds(offset));
        }
        self.offset = offset;
        Ok(())
    }

    /// Bytes written up to the current position.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.offset]
    }

    pub fn append(&mut self, byte: u8) -> Result<(), ImageError> {
        if self.offset >= MAX_IMAGE_SIZE {
            return Err(ImageError::Overflow);
        }
        if self.offset < self.bytes.len() {
            self.bytes[self.offset] = byte;
        } else {
            self.bytes.push(byte);
        }
        self.offset += 1;
        Ok(())
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), ImageError> {
        trace!(offset = self.offset, len = bytes.len(), "append");
        for &b in bytes {
            self.append(b)?;
        }
        Ok(())
    }

    pub fn append_word(&mut self, value: u16) -> Result<(), ImageError> {
        self.append_bytes(&value.to_le_bytes())
    }

    pub fn append_long(&mut self, value: u32) -> Result<(), ImageError> {
        self.append_bytes(&value.to_le_bytes())
    }

    pub fn replace_byte(&mut self, offset: usize, value: u8) -> Result<(), ImageError> {
        self.replace(offset, &[value])
    }

    pub fn replace_word(&mut self, offset: usize, value: u16) -> Result<(), ImageError> {
        self.replace(offset, &value.to_le_bytes())
    }

    pub fn replace_long(&mut self, offset: usize, value: u32) -> Result<(), ImageError> {
        self.replace(offset, &value.to_le_bytes())
    }

    fn replace(&mut self, offset: usize, bytes: &[u8]) -> Result<(), ImageError> {
        let end = offset + bytes.len();
        if end > self.offset {
            return Err(ImageError::OutOfBounds(offset));
        }
        self.bytes[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read(&self, offset: usize) -> Result<u8, ImageError> {
        self.as_bytes()
            .get(offset)
            .copied()
            .ok_or(ImageError::OutOfBounds(offset))
    }

    pub fn read_word(&self, offset: usize) -> Result<u16, ImageError> {
        Ok(u16::from_le_bytes([self.read(offset)?, self.read(offset + 1)?]))
    }

    pub fn read_long(&self, offset: usize) -> Result<u32, ImageError> {
        Ok(u32::from_le_bytes([
            self.read(offset)?,
            self.read(offset + 1)?,
            self.read(offset + 2)?,
            self.read(offset + 3)?,
        ]))
    }

    /// Sixteen bytes per row, each row prefixed with its offset.
    pub fn hex_dump(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.as_bytes().chunks(16).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
            out.push_str(&format!("{:05X}- {}\n", row * 16, hex.join(" ")));
        }
        out
    }
}
