use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Snapshot byte format. bincode over the serde graph is deterministic:
/// identical state always produces identical bytes.
pub fn write_state<W: Write, T: Serialize>(writer: W, state: &T) -> bincode::Result<()> {
    bincode::serialize_into(writer, state)
}

pub fn read_state<R: Read, T: DeserializeOwned>(reader: R) -> bincode::Result<T> {
    bincode::deserialize_from(reader)
}
