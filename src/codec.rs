// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Binary snapshot codec (spec §4.8).
//!
//! Layout, little-endian throughout, modeled on the source library's
//! `stream.c` segment structure:
//!
//! ```text
//! component segment (one per registered component):
//!   tag=ComponentHeader:u8  id:u64  size:u32  name_len:u32  name:[u8; name_len]
//!
//! table segment (one per archetype):
//!   tag=TableHeader:u8  type_len:u32  ids:[u64; type_len]  row_count:u32
//!   (per id with a column, in id order)
//!     tag=ColumnHeader:u8  byte_size:u32  data:[u8; byte_size]
//!
//! footer segment (exactly one, last):
//!   tag=Footer:u8  version:u32
//! ```
//!
//! The component segment is written before any table so a table's column
//! sizes (and thus which ids own a column) can be resolved while decoding,
//! without a second pass over the buffer.
//!
//! ids are written 8 bytes wide, not the 4 bytes `stream.c` uses for its
//! `ecs_entity_t`: this crate's [`EntityId`] is a full 64-bit opaque value
//! (index, generation, and pair/wildcard flag bits, spec §3/§4.1), and a
//! `flecs`-style `int32_t` truncation would silently drop either half of a
//! pair or the generation. See `DESIGN.md`'s "Stream id width" entry.
//!
//! [`SnapshotWriter`] and [`SnapshotReader`] are the real codec: resumable
//! state machines that make progress over whatever buffer size a caller
//! hands them, one call at a time, matching the source library's
//! `ecs_component_reader`/`ecs_table_reader` (spec §4.8 "resumable over
//! arbitrarily sized user buffers"). [`encode`]/[`decode`] are convenience
//! wrappers that drive one to completion into/out of an owned `Vec<u8>`.

use rustc_hash::FxHashMap;

use crate::entity::EntityId;
use crate::error::{EcsError, Result};

pub const STREAM_VERSION: u32 = 1;

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq)]
enum Tag {
    ComponentHeader = 1,
    TableHeader = 2,
    ColumnHeader = 3,
    Footer = 4,
}

impl Tag {
    fn from_byte(b: u8) -> Option<Tag> {
        match b {
            1 => Some(Tag::ComponentHeader),
            2 => Some(Tag::TableHeader),
            3 => Some(Tag::ColumnHeader),
            4 => Some(Tag::Footer),
            _ => None,
        }
    }
}

/// One decoded component record.
pub struct DecodedComponent {
    pub id: EntityId,
    pub size: u32,
    pub name: String,
}

/// One decoded archetype: its type (sorted id list), row count, and the
/// column bytes for each id in that type that carries a column.
pub struct DecodedTable {
    pub ids: Vec<EntityId>,
    pub row_count: u32,
    pub columns: Vec<(EntityId, Vec<u8>)>,
}

pub struct Snapshot {
    pub components: Vec<DecodedComponent>,
    pub tables: Vec<DecodedTable>,
    pub version: u32,
}

/// A single component to write into the component segment.
pub struct EncodeComponent<'a> {
    pub id: EntityId,
    pub size: u32,
    pub name: &'a str,
}

/// A single archetype to write into the table segment.
pub struct EncodeTable<'a> {
    pub ids: &'a [EntityId],
    pub row_count: u32,
    /// Raw bytes for each id in `ids` that owns a column, in `ids` order.
    pub columns: &'a [(EntityId, &'a [u8])],
}

// ---- resumable writer ------------------------------------------------------

#[derive(Clone, Copy)]
enum WriteStage {
    ComponentHeader(usize),
    ComponentId(usize),
    ComponentSize(usize),
    ComponentNameLen(usize),
    ComponentName { index: usize, written: usize },
    TableHeader(usize),
    TableTypeLen(usize),
    TableIds { table: usize, id_index: usize },
    TableRowCount(usize),
    TableColumnHeader { table: usize, column: usize },
    TableColumnSize { table: usize, column: usize },
    TableColumnData { table: usize, column: usize, written: usize },
    Footer,
    Done,
}

/// Resumable writer for the snapshot stream (spec §4.8).
///
/// Call [`SnapshotWriter::write_into`] repeatedly with caller-supplied
/// buffers of any size until it returns 0 and [`SnapshotWriter::is_done`]
/// is true. A 0 return with `is_done()` false means `out` was too small to
/// hold the next atomic field (a tag, a `u32`, or a `u64` id) and must be
/// retried with a larger buffer; it never means the stream is stuck.
pub struct SnapshotWriter<'a> {
    components: &'a [EncodeComponent<'a>],
    tables: &'a [EncodeTable<'a>],
    stage: WriteStage,
}

impl<'a> SnapshotWriter<'a> {
    pub fn new(components: &'a [EncodeComponent<'a>], tables: &'a [EncodeTable<'a>]) -> Self {
        Self {
            components,
            tables,
            stage: WriteStage::ComponentHeader(0),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.stage, WriteStage::Done)
    }

    /// Writes as many whole atomic fields as fit into `out`, advancing
    /// internal state. Returns the number of bytes written.
    pub fn write_into(&mut self, out: &mut [u8]) -> usize {
        let mut total = 0;
        while total < out.len() {
            let wrote = self.write_one(&mut out[total..]);
            if wrote == 0 {
                break;
            }
            total += wrote;
        }
        total
    }

    /// Advances past stage transitions that produce no bytes (segment and
    /// table boundaries) so `write_one`'s match arm always either produces
    /// bytes or genuinely needs a bigger buffer.
    fn settle(&mut self) {
        loop {
            match self.stage {
                WriteStage::ComponentHeader(i) if i >= self.components.len() => {
                    self.stage = WriteStage::TableHeader(0);
                }
                WriteStage::TableHeader(i) if i >= self.tables.len() => {
                    self.stage = WriteStage::Footer;
                }
                WriteStage::TableColumnHeader { table, column } if column >= self.tables[table].columns.len() => {
                    self.stage = WriteStage::TableHeader(table + 1);
                }
                _ => break,
            }
        }
    }

    fn write_one(&mut self, out: &mut [u8]) -> usize {
        self.settle();

        match self.stage {
            WriteStage::ComponentHeader(i) => {
                if out.is_empty() {
                    return 0;
                }
                out[0] = Tag::ComponentHeader as u8;
                self.stage = WriteStage::ComponentId(i);
                1
            }
            WriteStage::ComponentId(i) => {
                if out.len() < 8 {
                    return 0;
                }
                out[..8].copy_from_slice(&self.components[i].id.to_bits().to_le_bytes());
                self.stage = WriteStage::ComponentSize(i);
                8
            }
            WriteStage::ComponentSize(i) => {
                if out.len() < 4 {
                    return 0;
                }
                out[..4].copy_from_slice(&self.components[i].size.to_le_bytes());
                self.stage = WriteStage::ComponentNameLen(i);
                4
            }
            WriteStage::ComponentNameLen(i) => {
                if out.len() < 4 {
                    return 0;
                }
                let len = self.components[i].name.len() as u32;
                out[..4].copy_from_slice(&len.to_le_bytes());
                self.stage = WriteStage::ComponentName { index: i, written: 0 };
                4
            }
            WriteStage::ComponentName { index, written } => {
                let name = self.components[index].name.as_bytes();
                let remaining = name.len() - written;
                if remaining == 0 {
                    self.stage = WriteStage::ComponentHeader(index + 1);
                    return self.write_one(out);
                }
                if out.is_empty() {
                    return 0;
                }
                let n = remaining.min(out.len());
                out[..n].copy_from_slice(&name[written..written + n]);
                let new_written = written + n;
                self.stage = if new_written == name.len() {
                    WriteStage::ComponentHeader(index + 1)
                } else {
                    WriteStage::ComponentName { index, written: new_written }
                };
                n
            }
            WriteStage::TableHeader(i) => {
                if out.is_empty() {
                    return 0;
                }
                out[0] = Tag::TableHeader as u8;
                self.stage = WriteStage::TableTypeLen(i);
                1
            }
            WriteStage::TableTypeLen(i) => {
                if out.len() < 4 {
                    return 0;
                }
                let len = self.tables[i].ids.len() as u32;
                out[..4].copy_from_slice(&len.to_le_bytes());
                self.stage = if self.tables[i].ids.is_empty() {
                    WriteStage::TableRowCount(i)
                } else {
                    WriteStage::TableIds { table: i, id_index: 0 }
                };
                4
            }
            WriteStage::TableIds { table, id_index } => {
                if out.len() < 8 {
                    return 0;
                }
                out[..8].copy_from_slice(&self.tables[table].ids[id_index].to_bits().to_le_bytes());
                let next = id_index + 1;
                self.stage = if next == self.tables[table].ids.len() {
                    WriteStage::TableRowCount(table)
                } else {
                    WriteStage::TableIds { table, id_index: next }
                };
                8
            }
            WriteStage::TableRowCount(i) => {
                if out.len() < 4 {
                    return 0;
                }
                out[..4].copy_from_slice(&self.tables[i].row_count.to_le_bytes());
                self.stage = WriteStage::TableColumnHeader { table: i, column: 0 };
                4
            }
            WriteStage::TableColumnHeader { table, column } => {
                if out.is_empty() {
                    return 0;
                }
                out[0] = Tag::ColumnHeader as u8;
                self.stage = WriteStage::TableColumnSize { table, column };
                1
            }
            WriteStage::TableColumnSize { table, column } => {
                if out.len() < 4 {
                    return 0;
                }
                let size = self.tables[table].columns[column].1.len() as u32;
                out[..4].copy_from_slice(&size.to_le_bytes());
                self.stage = WriteStage::TableColumnData { table, column, written: 0 };
                4
            }
            WriteStage::TableColumnData { table, column, written } => {
                let data = self.tables[table].columns[column].1;
                let remaining = data.len() - written;
                if remaining == 0 {
                    self.stage = WriteStage::TableColumnHeader { table, column: column + 1 };
                    return self.write_one(out);
                }
                if out.is_empty() {
                    return 0;
                }
                let n = remaining.min(out.len());
                out[..n].copy_from_slice(&data[written..written + n]);
                let new_written = written + n;
                self.stage = if new_written == data.len() {
                    WriteStage::TableColumnHeader { table, column: column + 1 }
                } else {
                    WriteStage::TableColumnData { table, column, written: new_written }
                };
                n
            }
            WriteStage::Footer => {
                if out.len() < 5 {
                    return 0;
                }
                out[0] = Tag::Footer as u8;
                out[1..5].copy_from_slice(&STREAM_VERSION.to_le_bytes());
                self.stage = WriteStage::Done;
                5
            }
            WriteStage::Done => 0,
        }
    }
}

/// Drives a [`SnapshotWriter`] to completion into an owned buffer. A
/// convenience built on the resumable writer, not a separate code path: it
/// feeds the writer through a fixed-size chunk large enough to hold any
/// single atomic field, so it always makes progress one field at a time.
pub fn encode(components: &[EncodeComponent], tables: &[EncodeTable]) -> Vec<u8> {
    let mut writer = SnapshotWriter::new(components, tables);
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = writer.write_into(&mut chunk);
        if n > 0 {
            buf.extend_from_slice(&chunk[..n]);
        }
        if writer.is_done() {
            break;
        }
        if n == 0 {
            // 4096 bytes comfortably exceeds the largest atomic field (the
            // 8-byte id); reaching here would mean a logic error above.
            unreachable!("snapshot writer made no progress with a full chunk buffer");
        }
    }
    buf
}

// ---- resumable reader -------------------------------------------------------

#[derive(Clone, Copy)]
enum ReadStage {
    /// Expect a one-byte segment/record tag next.
    Tag,
    ComponentId,
    ComponentSize,
    ComponentNameLen,
    ComponentName,
    TableTypeLen,
    TableIds,
    TableRowCount,
    TableColumnSize,
    TableColumnData,
    Footer,
    Done,
}

/// Resumable reader for the snapshot stream (spec §4.8), the counterpart to
/// [`SnapshotWriter`]. Feed it buffers of any size, in order, via
/// [`SnapshotReader::feed`] until [`SnapshotReader::is_done`] is true, then
/// call [`SnapshotReader::finish`].
pub struct SnapshotReader {
    stage: ReadStage,
    sizes: FxHashMap<EntityId, u32>,
    components: Vec<DecodedComponent>,
    tables: Vec<DecodedTable>,
    version: u32,

    cur_component_id: EntityId,
    cur_component_size: u32,
    cur_name_len: usize,
    cur_name_buf: Vec<u8>,

    cur_type_len: usize,
    cur_ids: Vec<EntityId>,
    cur_row_count: u32,
    cur_columns: Vec<(EntityId, Vec<u8>)>,
    /// ids of the current table that own a column, in `cur_ids` order;
    /// resolved once `cur_ids` is fully read, consumed one per column.
    cur_columns_needed: Vec<EntityId>,
    cur_column_progress: usize,
    cur_column_len: usize,
    cur_column_buf: Vec<u8>,
}

impl Default for SnapshotReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotReader {
    pub fn new() -> Self {
        Self {
            stage: ReadStage::Tag,
            sizes: FxHashMap::default(),
            components: Vec::new(),
            tables: Vec::new(),
            version: 0,
            cur_component_id: EntityId::NULL,
            cur_component_size: 0,
            cur_name_len: 0,
            cur_name_buf: Vec::new(),
            cur_type_len: 0,
            cur_ids: Vec::new(),
            cur_row_count: 0,
            cur_columns: Vec::new(),
            cur_columns_needed: Vec::new(),
            cur_column_progress: 0,
            cur_column_len: 0,
            cur_column_buf: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.stage, ReadStage::Done)
    }

    /// Consumes as many whole atomic fields as `buf` holds, advancing
    /// internal state. Returns the number of bytes consumed; 0 with
    /// `is_done()` false means `buf` was too small for the next atomic
    /// field and must be retried with more data.
    pub fn feed(&mut self, buf: &[u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            let used = self.feed_one(&buf[total..])?;
            if used == 0 {
                break;
            }
            total += used;
        }
        Ok(total)
    }

    fn settle(&mut self) -> Result<()> {
        loop {
            match self.stage {
                ReadStage::TableIds if self.cur_ids.len() == self.cur_type_len => {
                    self.cur_columns_needed = self
                        .cur_ids
                        .iter()
                        .copied()
                        .filter(|id| self.sizes.get(id).copied().unwrap_or(0) > 0)
                        .collect();
                    self.cur_column_progress = 0;
                    self.stage = ReadStage::TableRowCount;
                }
                _ => return Ok(()),
            }
        }
    }

    fn finish_component(&mut self) {
        let name = String::from_utf8_lossy(&self.cur_name_buf).into_owned();
        self.sizes.insert(self.cur_component_id, self.cur_component_size);
        self.components.push(DecodedComponent {
            id: self.cur_component_id,
            size: self.cur_component_size,
            name,
        });
    }

    fn finish_column(&mut self) {
        let id = self.cur_columns_needed[self.cur_column_progress];
        let data = std::mem::take(&mut self.cur_column_buf);
        self.cur_columns.push((id, data));
        self.cur_column_progress += 1;
    }

    fn finish_table(&mut self) {
        self.tables.push(DecodedTable {
            ids: std::mem::take(&mut self.cur_ids),
            row_count: self.cur_row_count,
            columns: std::mem::take(&mut self.cur_columns),
        });
    }

    fn feed_one(&mut self, buf: &[u8]) -> Result<usize> {
        self.settle()?;

        match self.stage {
            ReadStage::Tag => {
                if buf.is_empty() {
                    return Ok(0);
                }
                let Some(tag) = Tag::from_byte(buf[0]) else {
                    return Err(EcsError::IoError(format!("unrecognized stream tag {}", buf[0])));
                };
                match tag {
                    Tag::ComponentHeader => self.stage = ReadStage::ComponentId,
                    Tag::TableHeader => {
                        self.cur_ids.clear();
                        self.cur_columns.clear();
                        self.stage = ReadStage::TableTypeLen;
                    }
                    Tag::ColumnHeader => {
                        if self.cur_column_progress >= self.cur_columns_needed.len() {
                            return Err(EcsError::IoError("unexpected column header".into()));
                        }
                        self.stage = ReadStage::TableColumnSize;
                    }
                    Tag::Footer => self.stage = ReadStage::Footer,
                }
                Ok(1)
            }
            ReadStage::ComponentId => {
                if buf.len() < 8 {
                    return Ok(0);
                }
                self.cur_component_id = EntityId::from_bits(u64::from_le_bytes(buf[..8].try_into().unwrap()));
                self.stage = ReadStage::ComponentSize;
                Ok(8)
            }
            ReadStage::ComponentSize => {
                if buf.len() < 4 {
                    return Ok(0);
                }
                self.cur_component_size = u32::from_le_bytes(buf[..4].try_into().unwrap());
                self.stage = ReadStage::ComponentNameLen;
                Ok(4)
            }
            ReadStage::ComponentNameLen => {
                if buf.len() < 4 {
                    return Ok(0);
                }
                self.cur_name_len = u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize;
                self.cur_name_buf.clear();
                self.stage = ReadStage::ComponentName;
                Ok(4)
            }
            ReadStage::ComponentName => {
                let remaining = self.cur_name_len - self.cur_name_buf.len();
                if remaining == 0 {
                    self.finish_component();
                    self.stage = ReadStage::Tag;
                    return self.feed_one(buf);
                }
                if buf.is_empty() {
                    return Ok(0);
                }
                let n = remaining.min(buf.len());
                self.cur_name_buf.extend_from_slice(&buf[..n]);
                if self.cur_name_buf.len() == self.cur_name_len {
                    self.finish_component();
                    self.stage = ReadStage::Tag;
                }
                Ok(n)
            }
            ReadStage::TableTypeLen => {
                if buf.len() < 4 {
                    return Ok(0);
                }
                self.cur_type_len = u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize;
                self.stage = ReadStage::TableIds;
                Ok(4)
            }
            ReadStage::TableIds => {
                // `settle` already transitions away once `cur_ids` is full
                // (including the zero-id case), so this arm only runs when
                // another id is still expected.
                if buf.len() < 8 {
                    return Ok(0);
                }
                self.cur_ids
                    .push(EntityId::from_bits(u64::from_le_bytes(buf[..8].try_into().unwrap())));
                Ok(8)
            }
            ReadStage::TableRowCount => {
                if buf.len() < 4 {
                    return Ok(0);
                }
                self.cur_row_count = u32::from_le_bytes(buf[..4].try_into().unwrap());
                self.stage = ReadStage::Tag;
                if self.cur_columns_needed.is_empty() {
                    self.finish_table();
                }
                Ok(4)
            }
            ReadStage::TableColumnSize => {
                if buf.len() < 4 {
                    return Ok(0);
                }
                self.cur_column_len = u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize;
                self.cur_column_buf.clear();
                self.stage = ReadStage::TableColumnData;
                Ok(4)
            }
            ReadStage::TableColumnData => {
                let remaining = self.cur_column_len - self.cur_column_buf.len();
                if remaining == 0 {
                    self.finish_column();
                    self.stage = ReadStage::Tag;
                    if self.cur_column_progress == self.cur_columns_needed.len() {
                        self.finish_table();
                    }
                    return self.feed_one(buf);
                }
                if buf.is_empty() {
                    return Ok(0);
                }
                let n = remaining.min(buf.len());
                self.cur_column_buf.extend_from_slice(&buf[..n]);
                if self.cur_column_buf.len() == self.cur_column_len {
                    self.finish_column();
                    self.stage = ReadStage::Tag;
                    if self.cur_column_progress == self.cur_columns_needed.len() {
                        self.finish_table();
                    }
                }
                Ok(n)
            }
            ReadStage::Footer => {
                if buf.len() < 4 {
                    return Ok(0);
                }
                self.version = u32::from_le_bytes(buf[..4].try_into().unwrap());
                self.stage = ReadStage::Done;
                Ok(4)
            }
            ReadStage::Done => Ok(0),
        }
    }

    /// Consumes the reader into the decoded snapshot. Only meaningful once
    /// [`SnapshotReader::is_done`] is true.
    pub fn finish(self) -> Result<Snapshot> {
        if !self.is_done() {
            return Err(EcsError::IoError("truncated stream".into()));
        }
        Ok(Snapshot {
            components: self.components,
            tables: self.tables,
            version: self.version,
        })
    }
}

/// Drives a [`SnapshotReader`] to completion over an in-memory buffer. A
/// convenience built on the resumable reader: feeds it in chunks so a
/// truncated buffer surfaces the same "made no progress" signal a live
/// streaming caller would see.
pub fn decode(buf: &[u8]) -> Result<Snapshot> {
    let mut reader = SnapshotReader::new();
    let mut pos = 0;
    const CHUNK: usize = 4096;
    while pos < buf.len() {
        let end = (pos + CHUNK).min(buf.len());
        let used = reader.feed(&buf[pos..end])?;
        if used == 0 {
            return Err(EcsError::IoError("truncated stream".into()));
        }
        pos += used;
    }
    reader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_components_and_an_empty_table() {
        let pos = EntityId::new_plain(1, 0);
        let components = vec![EncodeComponent {
            id: pos,
            size: 8,
            name: "Position",
        }];
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let table = EncodeTable {
            ids: &[pos],
            row_count: 1,
            columns: &[(pos, &data)],
        };
        let buf = encode(&components, &[table]);
        let snapshot = decode(&buf).unwrap();

        assert_eq!(snapshot.version, STREAM_VERSION);
        assert_eq!(snapshot.components.len(), 1);
        assert_eq!(snapshot.components[0].name, "Position");
        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.tables[0].row_count, 1);
        assert_eq!(snapshot.tables[0].columns[0].1, data);
    }

    #[test]
    fn tags_carry_no_column_bytes() {
        let tag_id = EntityId::new_plain(2, 0);
        let components = vec![EncodeComponent {
            id: tag_id,
            size: 0,
            name: "Dead",
        }];
        let table = EncodeTable {
            ids: &[tag_id],
            row_count: 3,
            columns: &[],
        };
        let buf = encode(&components, &[table]);
        let snapshot = decode(&buf).unwrap();
        assert!(snapshot.tables[0].columns.is_empty());
        assert_eq!(snapshot.tables[0].row_count, 3);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let buf = vec![Tag::ComponentHeader as u8, 1, 2];
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn writer_resumes_across_one_byte_at_a_time_buffers() {
        let pos = EntityId::new_plain(1, 0);
        let vel = EntityId::new_plain(2, 0);
        let components = vec![
            EncodeComponent { id: pos, size: 8, name: "Position" },
            EncodeComponent { id: vel, size: 4, name: "Velocity" },
        ];
        let pos_data = [1u8; 8];
        let vel_data = [2u8; 4];
        let tables = [EncodeTable {
            ids: &[pos, vel],
            row_count: 1,
            columns: &[(pos, &pos_data), (vel, &vel_data)],
        }];

        let mut writer = SnapshotWriter::new(&components, &tables);
        let mut whole = Vec::new();
        let mut one = [0u8; 1];
        while !writer.is_done() {
            let n = writer.write_into(&mut one);
            assert!(n <= 1);
            whole.extend_from_slice(&one[..n]);
        }

        let expected = encode(&components, &tables);
        assert_eq!(whole, expected);
    }

    #[test]
    fn reader_resumes_across_three_byte_at_a_time_feeds() {
        let pos = EntityId::new_plain(1, 0);
        let components = vec![EncodeComponent {
            id: pos,
            size: 8,
            name: "Position"
        }];
        let data = [9u8; 8];
        let tables = [EncodeTable {
            ids: &[pos],
            row_count: 2,
            columns: &[(pos, &data)],
        }];
        let buf = encode(&components, &tables);

        let mut reader = SnapshotReader::new();
        let mut offset = 0;
        while offset < buf.len() {
            let end = (offset + 3).min(buf.len());
            let used = reader.feed(&buf[offset..end]).unwrap();
            if used > 0 {
                offset += used;
            } else {
                // the 3-byte window didn't cover the next atomic field;
                // widen it until it does.
                let used = reader.feed(&buf[offset..]).unwrap();
                assert!(used > 0);
                offset += used;
            }
        }
        let snapshot = reader.finish().unwrap();
        assert_eq!(snapshot.tables[0].row_count, 2);
        assert_eq!(snapshot.tables[0].columns[0].1, data);
    }

    #[test]
    fn reader_reports_unrecognized_tag() {
        let buf = [0xffu8, 0, 0, 0, 0];
        assert!(decode(&buf).is_err());
    }
}
