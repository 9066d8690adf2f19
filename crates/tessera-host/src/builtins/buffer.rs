//! Growable in-memory byte buffer with a stream interface.

use std::any::Any;

use tessera_core::component::{
    CapabilitySet, Component, ComponentBox, ComponentHeader, PoolPriority,
};
use tessera_core::ids::CLID_BUFFER;
use tessera_core::stream::{ByteOrder, Stream, StreamError};
use tessera_core::value::Value;

/// In-memory byte buffer. Writes past the end grow the buffer; the
/// array group exposes the bytes for indexed access.
pub struct BufferObj {
    header: ComponentHeader,
    data: Vec<u8>,
    offset: usize,
    order: ByteOrder,
}

impl BufferObj {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        BufferObj {
            header: ComponentHeader::new(CLID_BUFFER),
            data: Vec::new(),
            offset: 0,
            order: ByteOrder::default(),
        }
    }

    /// Buffer contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the contents and rewinds the stream offset.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.offset = 0;
    }
}

impl Default for BufferObj {
    fn default() -> Self {
        Self::new()
    }
}

impl Stream for BufferObj {
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

impl Component for BufferObj {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "Buffer"
    }

    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }

    fn spawn(&self) -> ComponentBox {
        let mut obj = BufferObj::new();
        obj.header.set_class_id(self.header.class_id());
        Box::new(obj)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::STREAM
            | CapabilitySet::SERIALIZATION
            | CapabilitySet::ARRAY
            | CapabilitySet::ITERATOR
    }

    fn copy_from(&mut self, other: &dyn Component) -> bool {
        match other.as_any().downcast_ref::<BufferObj>() {
            Some(src) => {
                self.data = src.data.clone();
                self.offset = 0;
                self.order = src.order;
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn Component) -> bool {
        other
            .as_any()
            .downcast_ref::<BufferObj>()
            .is_some_and(|o| o.data == self.data)
    }

    fn reinit(&mut self) {
        self.data.clear();
        self.offset = 0;
        self.order = ByteOrder::default();
    }

    fn pool_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn pool_priority(&self) -> PoolPriority {
        PoolPriority::Medium
    }

    fn as_stream(&mut self) -> Option<&mut dyn Stream> {
        Some(self)
    }

    fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.write_u32(self.data.len() as u32)?;
        stream.write_bytes(&self.data)
    }

    fn deserialize_fields(
        &mut self,
        stream: &mut dyn Stream,
        _host: &dyn tessera_core::host::HostApi,
    ) -> Result<(), StreamError> {
        let len = stream.read_u32()? as usize;
        let mut data = vec![0u8; len];
        stream.read_exact(&mut data)?;
        self.set_data(data);
        Ok(())
    }

    fn value_iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        Some(Box::new(self.data.iter().map(|&b| Value::Int(b as i32))))
    }

    fn array_len(&self) -> Option<usize> {
        Some(self.data.len())
    }

    fn array_capacity(&self) -> Option<usize> {
        Some(self.data.capacity())
    }

    fn array_alloc(&mut self, len: usize) -> bool {
        self.data.resize(len, 0);
        self.offset = self.offset.min(self.data.len());
        true
    }

    fn element_byte_size(&self) -> usize {
        1
    }

    fn array_get(&self, index: usize, out: &mut Value) -> bool {
        match self.data.get(index) {
            Some(&b) => {
                out.set_i32(b as i32);
                true
            }
            None => {
                *out = Value::Void;
                false
            }
        }
    }

    fn array_set(
        &mut self,
        index: usize,
        value: Value,
        _host: &dyn tessera_core::host::HostApi,
    ) -> bool {
        match self.data.get_mut(index) {
            Some(byte) => {
                *byte = value.get_i32() as u8;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_view_round_trip() {
        let mut buf = BufferObj::new();
        let stream = buf.as_stream().unwrap();
        stream.write_i32(-7).unwrap();
        stream.write_len_string("chunk").unwrap();
        stream.set_offset(0).unwrap();
        assert_eq!(stream.read_i32().unwrap(), -7);
        assert_eq!(stream.read_len_string(64).unwrap(), "chunk");
        assert!(stream.eof());
    }

    #[test]
    fn test_array_alloc_sizes_and_clamps_offset() {
        let mut buf = BufferObj::new();
        buf.write_bytes(&[5; 8]).unwrap();
        assert!(buf.array_alloc(4));
        assert_eq!(buf.array_len(), Some(4));
        assert_eq!(buf.offset(), 4);
        assert!(buf.array_alloc(6));
        assert_eq!(buf.data(), &[5, 5, 5, 5, 0, 0]);
        assert_eq!(buf.element_byte_size(), 1);
    }

    #[test]
    fn test_write_past_end_grows() {
        let mut buf = BufferObj::new();
        buf.set_offset(0).unwrap();
        buf.write_bytes(&[1, 2]).unwrap();
        buf.set_offset(1).unwrap();
        buf.write_bytes(&[9, 9, 9]).unwrap();
        assert_eq!(buf.data(), &[1, 9, 9, 9]);
    }

    #[test]
    fn test_array_access_bounds() {
        let mut buf = BufferObj::new();
        buf.set_data(vec![5, 6]);
        let mut out = Value::Void;
        assert!(buf.array_get(0, &mut out));
        assert_eq!(out.get_i32(), 5);
        assert!(!buf.array_get(2, &mut out));
        assert_eq!(buf.array_len(), Some(2));
    }

    #[test]
    fn test_iteration_yields_bytes() {
        let mut buf = BufferObj::new();
        buf.set_data(vec![10, 20]);
        let collected: Vec<i32> = buf.value_iter().unwrap().map(|v| v.get_i32()).collect();
        assert_eq!(collected, vec![10, 20]);
    }
}
