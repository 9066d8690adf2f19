//! Abstract byte-stream interface.
//!
//! Backends provide raw byte i/o plus offset/size bookkeeping; all the
//! typed accessors are provided on top and honor the stream's current
//! byte-order setting. Multi-byte values default to little-endian.

use thiserror::Error;

/// Errors from stream i/o and from the serialization layer built on it.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Read past the end of the stream.
    #[error("unexpected end of stream at offset {offset}")]
    UnexpectedEof {
        /// Offset at which the read was attempted.
        offset: u64,
    },

    /// Seek target outside the stream bounds.
    #[error("seek to offset {offset} outside stream of size {size}")]
    InvalidSeek {
        /// Requested offset.
        offset: u64,
        /// Stream size at the time of the seek.
        size: u64,
    },

    /// The stream does not support writing.
    #[error("stream is not writable")]
    NotWritable,

    /// A length-prefixed string exceeded the caller's bound.
    #[error("string of length {len} exceeds limit {limit}")]
    StringTooLong {
        /// Encoded length.
        len: usize,
        /// Caller-imposed bound.
        limit: usize,
    },

    /// Payload bytes that cannot be decoded.
    #[error("malformed stream data: {0}")]
    Malformed(String),

    /// Serialized type-name prefix did not match the expected class.
    #[error("serialized data is not a `{expected}`")]
    ClassMismatch {
        /// Name of the class the reader expected.
        expected: String,
    },

    /// Serialized object names a class unknown to the host.
    #[error("serialized data references unknown class `{0}`")]
    UnknownClass(String),

    /// Underlying i/o failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Io(err.to_string())
    }
}

/// Byte order for multi-byte stream accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Least significant byte first (the default).
    #[default]
    LittleEndian,
    /// Most significant byte first.
    BigEndian,
}

/// Reference point for [`Stream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Absolute offset from the start.
    Begin,
    /// Relative to the current offset.
    Current,
    /// Relative to the end of the stream.
    End,
}

/// A seekable byte stream.
///
/// Implementors supply the byte-level primitives; the typed accessors are
/// provided methods and must not be overridden, so every backend encodes
/// scalars identically.
pub trait Stream {
    /// Current byte order for multi-byte accessors.
    fn byte_order(&self) -> ByteOrder;

    /// Switches the byte order for subsequent multi-byte accessors.
    fn set_byte_order(&mut self, order: ByteOrder);

    /// Current read/write offset.
    fn offset(&self) -> u64;

    /// Moves the read/write offset. Offsets up to and including the
    /// stream size are valid.
    fn set_offset(&mut self, offset: u64) -> Result<(), StreamError>;

    /// Total stream size in bytes.
    fn size(&self) -> u64;

    /// True once the offset has reached the end of the stream.
    fn eof(&self) -> bool {
        self.offset() >= self.size()
    }

    /// Reads up to `buf.len()` bytes, returning the count read.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;

    /// Writes all of `buf`, growing the stream if needed.
    fn write_bytes(&mut self, buf: &[u8]) -> Result<(), StreamError>;

    /// Releases the underlying resource. Idempotent.
    fn close(&mut self) {}

    // ------------------------------------------------------------------
    // Provided accessors
    // ------------------------------------------------------------------

    /// Moves the offset relative to `mode`.
    fn seek(&mut self, delta: i64, mode: SeekMode) -> Result<(), StreamError> {
        let base = match mode {
            SeekMode::Begin => 0,
            SeekMode::Current => self.offset() as i64,
            SeekMode::End => self.size() as i64,
        };
        let target = base + delta;
        if target < 0 {
            return Err(StreamError::InvalidSeek {
                offset: target.unsigned_abs(),
                size: self.size(),
            });
        }
        self.set_offset(target as u64)
    }

    /// Reads exactly `buf.len()` bytes or fails with
    /// [`StreamError::UnexpectedEof`].
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_bytes(&mut buf[filled..])?;
            if n == 0 {
                return Err(StreamError::UnexpectedEof {
                    offset: self.offset(),
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Reads a single byte.
    fn read_u8(&mut self) -> Result<u8, StreamError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Writes a single byte.
    fn write_u8(&mut self, value: u8) -> Result<(), StreamError> {
        self.write_bytes(&[value])
    }

    /// Reads a 16-bit signed integer in the current byte order.
    fn read_i16(&mut self) -> Result<i16, StreamError> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(match self.byte_order() {
            ByteOrder::LittleEndian => i16::from_le_bytes(buf),
            ByteOrder::BigEndian => i16::from_be_bytes(buf),
        })
    }

    /// Writes a 16-bit signed integer in the current byte order.
    fn write_i16(&mut self, value: i16) -> Result<(), StreamError> {
        let buf = match self.byte_order() {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        self.write_bytes(&buf)
    }

    /// Reads a 32-bit unsigned integer in the current byte order.
    fn read_u32(&mut self) -> Result<u32, StreamError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(match self.byte_order() {
            ByteOrder::LittleEndian => u32::from_le_bytes(buf),
            ByteOrder::BigEndian => u32::from_be_bytes(buf),
        })
    }

    /// Writes a 32-bit unsigned integer in the current byte order.
    fn write_u32(&mut self, value: u32) -> Result<(), StreamError> {
        let buf = match self.byte_order() {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        self.write_bytes(&buf)
    }

    /// Reads a 32-bit signed integer in the current byte order.
    fn read_i32(&mut self) -> Result<i32, StreamError> {
        Ok(self.read_u32()? as i32)
    }

    /// Writes a 32-bit signed integer in the current byte order.
    fn write_i32(&mut self, value: i32) -> Result<(), StreamError> {
        self.write_u32(value as u32)
    }

    /// Reads a 64-bit signed integer in the current byte order.
    fn read_i64(&mut self) -> Result<i64, StreamError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(match self.byte_order() {
            ByteOrder::LittleEndian => i64::from_le_bytes(buf),
            ByteOrder::BigEndian => i64::from_be_bytes(buf),
        })
    }

    /// Writes a 64-bit signed integer in the current byte order.
    fn write_i64(&mut self, value: i64) -> Result<(), StreamError> {
        let buf = match self.byte_order() {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        self.write_bytes(&buf)
    }

    /// Reads a 32-bit float in the current byte order.
    fn read_f32(&mut self) -> Result<f32, StreamError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Writes a 32-bit float in the current byte order.
    fn write_f32(&mut self, value: f32) -> Result<(), StreamError> {
        self.write_u32(value.to_bits())
    }

    /// Reads a 64-bit float in the current byte order.
    fn read_f64(&mut self) -> Result<f64, StreamError> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    /// Writes a 64-bit float in the current byte order.
    fn write_f64(&mut self, value: f64) -> Result<(), StreamError> {
        self.write_i64(value.to_bits() as i64)
    }

    /// Reads a `u32` length prefix followed by that many UTF-8 bytes.
    ///
    /// Fails with [`StreamError::StringTooLong`] when the encoded length
    /// exceeds `limit`; the length prefix is consumed in that case and
    /// the caller is responsible for rewinding.
    fn read_len_string(&mut self, limit: usize) -> Result<String, StreamError> {
        let len = self.read_u32()? as usize;
        if len > limit {
            return Err(StreamError::StringTooLong { len, limit });
        }
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| StreamError::Malformed(e.to_string()))
    }

    /// Writes a `u32` length prefix followed by the string's UTF-8 bytes.
    fn write_len_string(&mut self, value: &str) -> Result<(), StreamError> {
        self.write_u32(value.len() as u32)?;
        self.write_bytes(value.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-memory stream for exercising the provided accessors
    /// without pulling in the host crate.
    struct VecStream {
        data: Vec<u8>,
        offset: usize,
        order: ByteOrder,
    }

    impl VecStream {
        fn new() -> Self {
            VecStream {
                data: Vec::new(),
                offset: 0,
                order: ByteOrder::default(),
            }
        }
    }

    impl Stream for VecStream {
        fn byte_order(&self) -> ByteOrder {
            self.order
        }
        fn set_byte_order(&mut self, order: ByteOrder) {
            self.order = order;
        }
        fn offset(&self) -> u64 {
            self.offset as u64
        }
        fn set_offset(&mut self, offset: u64) -> Result<(), StreamError> {
            if offset > self.data.len() as u64 {
                return Err(StreamError::InvalidSeek {
                    offset,
                    size: self.data.len() as u64,
                });
            }
            self.offset = offset as usize;
            Ok(())
        }
        fn size(&self) -> u64 {
            self.data.len() as u64
        }
        fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
            let avail = self.data.len() - self.offset;
            let n = avail.min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
            self.offset += n;
            Ok(n)
        }
        fn write_bytes(&mut self, buf: &[u8]) -> Result<(), StreamError> {
            let end = self.offset + buf.len();
            if end > self.data.len() {
                self.data.resize(end, 0);
            }
            self.data[self.offset..end].copy_from_slice(buf);
            self.offset = end;
            Ok(())
        }
    }

    #[test]
    fn test_scalar_round_trip_little_endian() {
        let mut s = VecStream::new();
        s.write_u8(0xAB).unwrap();
        s.write_i32(-12345).unwrap();
        s.write_f32(1.5).unwrap();
        s.write_i64(1 << 40).unwrap();
        s.set_offset(0).unwrap();
        assert_eq!(s.read_u8().unwrap(), 0xAB);
        assert_eq!(s.read_i32().unwrap(), -12345);
        assert_eq!(s.read_f32().unwrap(), 1.5);
        assert_eq!(s.read_i64().unwrap(), 1 << 40);
        assert!(s.eof());
    }

    #[test]
    fn test_byte_order_switch() {
        let mut s = VecStream::new();
        s.set_byte_order(ByteOrder::BigEndian);
        s.write_u32(0x1122_3344).unwrap();
        assert_eq!(s.data, vec![0x11, 0x22, 0x33, 0x44]);
        s.set_offset(0).unwrap();
        s.set_byte_order(ByteOrder::LittleEndian);
        assert_eq!(s.read_u32().unwrap(), 0x4433_2211);
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut s = VecStream::new();
        s.write_u8(1).unwrap();
        s.set_offset(0).unwrap();
        assert!(matches!(
            s.read_u32(),
            Err(StreamError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_len_string_round_trip_and_limit() {
        let mut s = VecStream::new();
        s.write_len_string("Envelope").unwrap();
        s.set_offset(0).unwrap();
        assert_eq!(s.read_len_string(64).unwrap(), "Envelope");

        s.set_offset(0).unwrap();
        assert!(matches!(
            s.read_len_string(4),
            Err(StreamError::StringTooLong { len: 8, limit: 4 })
        ));
    }

    #[test]
    fn test_seek_modes() {
        let mut s = VecStream::new();
        s.write_bytes(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        s.seek(0, SeekMode::Begin).unwrap();
        assert_eq!(s.offset(), 0);
        s.seek(3, SeekMode::Current).unwrap();
        assert_eq!(s.offset(), 3);
        s.seek(-2, SeekMode::End).unwrap();
        assert_eq!(s.offset(), 6);
        assert!(s.seek(-1, SeekMode::Begin).is_err());
    }
}
