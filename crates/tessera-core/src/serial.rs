//! Self-describing serialization helpers.
//!
//! The wire form of an object is a length-prefixed type name followed by
//! the class's own field encoding. Readers verify the name before
//! consuming fields and rewind the stream on mismatch, so a caller can
//! probe a stream against several candidate classes.

use crate::component::ComponentBox;
use crate::host::HostApi;
use crate::stream::{Stream, StreamError};

/// Longest type-name prefix a reader will consume while probing.
///
/// Bounding the probe keeps a corrupt length prefix from turning into a
/// huge allocation before the name comparison fails.
pub const MAX_SERIAL_NAME_LEN: usize = 64;

/// Reads a name-prefixed object from `stream`, instantiating it through
/// `host` by its serialized class name.
///
/// The stream is left at its starting offset on failure.
pub fn read_component(
    stream: &mut dyn Stream,
    host: &dyn HostApi,
) -> Result<ComponentBox, StreamError> {
    let start = stream.offset();
    let result = read_component_inner(stream, host, start);
    if result.is_err() {
        let _ = stream.set_offset(start);
    }
    result
}

fn read_component_inner(
    stream: &mut dyn Stream,
    host: &dyn HostApi,
    start: u64,
) -> Result<ComponentBox, StreamError> {
    let name = stream.read_len_string(MAX_SERIAL_NAME_LEN)?;
    let class_id = host
        .class_id_by_name(&name)
        .ok_or(StreamError::UnknownClass(name))?;
    let mut obj = host
        .new_by_class_id(class_id)
        .map_err(|e| StreamError::Malformed(e.to_string()))?;
    // Rewind so the instance verifies its own type prefix.
    stream.set_offset(start)?;
    match obj.deserialize(stream, host, true) {
        Ok(()) => Ok(obj),
        Err(err) => {
            if let Err(del) = host.delete_component(obj) {
                log::warn!("discarding partial deserialization failed: {del}");
            }
            Err(err)
        }
    }
}
