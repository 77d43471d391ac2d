//! Little-endian primitive reader and writer shared by all message kinds.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use super::{CodecError, MAGIC};

/// Append-only message builder.
pub(crate) struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_header(&mut self, version: i32) {
        self.buf.extend_from_slice(&MAGIC);
        self.write_i32(version);
    }

    pub fn write_i32(&mut self, value: i32) {
        // Writing into a Vec cannot fail.
        let _ = self.buf.write_i32::<LittleEndian>(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        let _ = self.buf.write_f32::<LittleEndian>(value);
    }

    pub fn write_f32s(&mut self, values: &[f32]) {
        for v in values {
            self.write_f32(*v);
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_len(&mut self, field: &'static str, len: usize) -> Result<(), CodecError> {
        let len = i32::try_from(len).map_err(|_| CodecError::TooLarge { field, len })?;
        self.write_i32(len);
        Ok(())
    }

    /// Length-prefixed byte run.
    pub fn write_bytes(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), CodecError> {
        self.write_len(field, bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_str(&mut self, field: &'static str, s: &str) -> Result<(), CodecError> {
        self.write_bytes(field, s.as_bytes())
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over a received message.
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let buf = self.buf;
        let slice = &buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Check the magic and return the version field.
    pub fn read_header(&mut self) -> Result<i32, CodecError> {
        let available = self.remaining().min(MAGIC.len());
        let magic = match self.take(MAGIC.len()) {
            Ok(m) => m,
            Err(_) => {
                return Err(CodecError::InvalidHeader {
                    found: self.buf[self.pos..self.pos + available].to_vec(),
                });
            }
        };
        if magic != MAGIC {
            return Err(CodecError::InvalidHeader {
                found: magic.to_vec(),
            });
        }
        self.read_i32()
    }

    /// Header whose version must match exactly.
    pub fn expect_header(&mut self, expected: i32) -> Result<(), CodecError> {
        let found = self.read_header()?;
        if found != expected {
            return Err(CodecError::UnsupportedVersion { expected, found });
        }
        Ok(())
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_f32s<const N: usize>(&mut self) -> Result<[f32; N], CodecError> {
        let mut out = [0.0; N];
        for v in out.iter_mut() {
            *v = self.read_f32()?;
        }
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_len(&mut self, field: &'static str) -> Result<usize, CodecError> {
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| CodecError::NegativeLength { field, value })
    }

    pub fn read_bytes(&mut self, field: &'static str) -> Result<&'a [u8], CodecError> {
        let len = self.read_len(field)?;
        self.take(len)
    }

    pub fn read_string(&mut self, field: &'static str) -> Result<String, CodecError> {
        let bytes = self.read_bytes(field)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8 { field })
    }

    /// Everything not yet consumed.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let buf = self.buf;
        let rest = &buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }

    /// Fail if any bytes remain unread.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(CodecError::TrailingBytes { count }),
        }
    }
}
