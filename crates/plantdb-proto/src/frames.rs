//! Fixed-layout request and response frames. All integers little endian.

use plantdb_core::error::FormatError;
use plantdb_core::result::ResultCode;
use plantdb_core::types::{PackRecord, PackSummary, PlantSummary, StorageStats, StorageStatus};
use plantdb_format::bytes::{put_str, put_u16, put_u32, put_u8, read_u16, read_u8};
use plantdb_store::PlantFilter;

pub const LIST_REQUEST_LEN: usize = 4;
pub const DELETE_REQUEST_LEN: usize = 2;

pub const LIST_HEADER_LEN: usize = 4;
pub const LIST_ENTRY_LEN: usize = 22;
/// Entries carried by one plant list frame.
pub const LIST_PAGE_MAX: usize = 10;
const LIST_NAME_LEN: usize = 16;

pub const STATS_FRAME_LEN: usize = 26;
pub const OP_RESULT_LEN: usize = 8;

pub const PACK_LIST_REQUEST_LEN: usize = 4;
pub const PACK_LIST_ENTRY_LEN: usize = 30;
pub const PACK_LIST_PAGE_MAX: usize = 4;
const PACK_LIST_NAME_LEN: usize = 24;
pub const PACK_CONTENT_HEADER_LEN: usize = 8;
pub const PACK_CONTENT_MAX: usize = 16;

/// `max_count` value requesting a notification stream of every match.
pub const STREAM_ALL: u8 = 0;
pub const FILTER_ALL: u8 = 0xFE;
pub const FILTER_CUSTOM: u8 = 0xFF;

/// Flag byte of a plant list frame.
pub mod stream_flags {
    pub const NORMAL: u8 = 0x00;
    pub const COMPLETE: u8 = 0x01;
    pub const ERROR: u8 = 0x02;
    pub const STARTING: u8 = 0x80;
}

/// Listing filter carried in one byte: `0xFE` all, `0xFF` custom, anything
/// else a pack id (`0x00` being the built-in set).
pub fn plant_filter(byte: u8) -> PlantFilter {
    match byte {
        FILTER_ALL => PlantFilter::All,
        FILTER_CUSTOM => PlantFilter::Custom,
        pack_id => PlantFilter::Pack(u16::from(pack_id)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    pub offset: u16,
    pub max_count: u8,
    pub filter: u8,
}

impl ListRequest {
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        Ok(Self {
            offset: read_u16(bytes, 0)?,
            max_count: read_u8(bytes, 2)?,
            filter: read_u8(bytes, 3)?,
        })
    }

    pub fn encode(&self) -> [u8; LIST_REQUEST_LEN] {
        let mut buf = [0u8; LIST_REQUEST_LEN];
        put_u16(&mut buf, 0, self.offset);
        put_u8(&mut buf, 2, self.max_count);
        put_u8(&mut buf, 3, self.filter);
        buf
    }

    pub const fn is_stream(&self) -> bool {
        self.max_count == STREAM_ALL
    }

    /// Entries per read, clamped to what one frame holds.
    pub fn page_size(&self) -> usize {
        usize::from(self.max_count).clamp(1, LIST_PAGE_MAX)
    }

    /// Client bug seen in the field: filter and count bytes swapped.
    pub const fn looks_swapped(&self) -> bool {
        self.offset == 0 && self.filter == 0x00 && self.max_count == 0xFF
    }
}

/// Plant list frame: header plus up to [`LIST_PAGE_MAX`] entries.
pub fn encode_plant_list(total_count: u16, flags: u8, entries: &[PlantSummary]) -> Vec<u8> {
    let entries = entries.get(..LIST_PAGE_MAX).unwrap_or(entries);
    let mut buf = vec![0u8; LIST_HEADER_LEN + entries.len() * LIST_ENTRY_LEN];
    put_u16(&mut buf, 0, total_count);
    put_u8(&mut buf, 2, count_u8(entries.len()));
    put_u8(&mut buf, 3, flags);
    for (i, entry) in entries.iter().enumerate() {
        let off = LIST_HEADER_LEN + i * LIST_ENTRY_LEN;
        put_u16(&mut buf, off, entry.plant_id);
        put_u16(&mut buf, off + 2, entry.pack_id);
        put_u16(&mut buf, off + 4, entry.version);
        put_str(&mut buf, off + 6, LIST_NAME_LEN, &entry.name);
    }
    buf
}

/// Storage statistics frame. The pack count includes the built-in pack.
pub fn encode_stats(stats: &StorageStats) -> [u8; STATS_FRAME_LEN] {
    let mut buf = [0u8; STATS_FRAME_LEN];
    let pack_count = if stats.status == StorageStatus::Ok {
        stats.pack_count.saturating_add(1)
    } else {
        stats.pack_count
    };
    put_u32(&mut buf, 0, saturate_u32(stats.total_bytes));
    put_u32(&mut buf, 4, saturate_u32(stats.used_bytes));
    put_u32(&mut buf, 8, saturate_u32(stats.free_bytes));
    put_u16(&mut buf, 12, stats.plant_count);
    put_u16(&mut buf, 14, stats.custom_plant_count);
    put_u16(&mut buf, 16, pack_count);
    put_u16(&mut buf, 18, stats.builtin_count);
    put_u8(&mut buf, 20, stats.status.as_u8());
    put_u32(&mut buf, 22, stats.change_counter);
    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    Install = 0,
    Delete = 1,
    List = 2,
}

/// Outcome of one install or delete, as sent to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpResult {
    pub operation: Operation,
    pub result: ResultCode,
    pub plant_id: u16,
    pub version: u16,
}

impl OpResult {
    pub fn encode(&self) -> [u8; OP_RESULT_LEN] {
        let mut buf = [0u8; OP_RESULT_LEN];
        put_u8(&mut buf, 0, self.operation as u8);
        put_u8(&mut buf, 1, self.result.as_u8());
        put_u16(&mut buf, 2, self.plant_id);
        put_u16(&mut buf, 4, self.version);
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackListOp {
    /// Page through packs; the parameter is the offset.
    #[default]
    List,
    /// Member ids of one pack; the parameter is the pack id.
    Content,
}

impl PackListOp {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::List),
            0x02 => Some(Self::Content),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::List => 0x01,
            Self::Content => 0x02,
        }
    }
}

/// Raw pack list request; the opcode is checked by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackListRequest {
    pub opcode: u8,
    pub param: u16,
}

impl PackListRequest {
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        Ok(Self {
            opcode: read_u8(bytes, 0)?,
            param: read_u16(bytes, 1)?,
        })
    }

    pub fn encode(&self) -> [u8; PACK_LIST_REQUEST_LEN] {
        let mut buf = [0u8; PACK_LIST_REQUEST_LEN];
        put_u8(&mut buf, 0, self.opcode);
        put_u16(&mut buf, 1, self.param);
        buf
    }
}

pub fn encode_pack_list(total_count: u16, include_builtin: bool, entries: &[PackSummary]) -> Vec<u8> {
    let entries = entries.get(..PACK_LIST_PAGE_MAX).unwrap_or(entries);
    let mut buf = vec![0u8; LIST_HEADER_LEN + entries.len() * PACK_LIST_ENTRY_LEN];
    put_u16(&mut buf, 0, total_count);
    put_u8(&mut buf, 2, count_u8(entries.len()));
    put_u8(&mut buf, 3, u8::from(include_builtin));
    for (i, entry) in entries.iter().enumerate() {
        let off = LIST_HEADER_LEN + i * PACK_LIST_ENTRY_LEN;
        put_u16(&mut buf, off, entry.pack_id);
        put_u16(&mut buf, off + 2, entry.version);
        put_u16(&mut buf, off + 4, entry.plant_count);
        put_str(&mut buf, off + 6, PACK_LIST_NAME_LEN, &entry.name);
    }
    buf
}

/// Pack content frame with the first [`PACK_CONTENT_MAX`] member ids.
pub fn encode_pack_content(pack: &PackRecord) -> Vec<u8> {
    let ids = pack.plant_ids.get(..PACK_CONTENT_MAX).unwrap_or(&pack.plant_ids);
    let mut buf = vec![0u8; PACK_CONTENT_HEADER_LEN + ids.len() * 2];
    put_u16(&mut buf, 0, pack.pack_id);
    put_u16(&mut buf, 2, pack.version);
    put_u16(&mut buf, 4, u16::try_from(pack.plant_ids.len()).unwrap_or(u16::MAX));
    put_u8(&mut buf, 6, count_u8(ids.len()));
    for (i, id) in ids.iter().enumerate() {
        put_u16(&mut buf, PACK_CONTENT_HEADER_LEN + i * 2, *id);
    }
    buf
}

/// Content frame for a pack that could not be read: id only, no members.
pub fn encode_missing_pack_content(pack_id: u16) -> Vec<u8> {
    let mut buf = vec![0u8; PACK_CONTENT_HEADER_LEN];
    put_u16(&mut buf, 0, pack_id);
    buf
}

fn count_u8(n: usize) -> u8 {
    u8::try_from(n).unwrap_or(u8::MAX)
}

fn saturate_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantdb_format::bytes::{read_str, read_u32};

    fn summary(plant_id: u16, name: &str) -> PlantSummary {
        PlantSummary {
            plant_id,
            pack_id: 3,
            version: 2,
            name: name.to_string(),
        }
    }

    #[test]
    fn filter_byte_mapping() {
        assert_eq!(plant_filter(0xFE), PlantFilter::All);
        assert_eq!(plant_filter(0xFF), PlantFilter::Custom);
        assert_eq!(plant_filter(0x00), PlantFilter::Pack(0));
        assert_eq!(plant_filter(0x2A), PlantFilter::Pack(42));
    }

    #[test]
    fn list_request_page_size_is_clamped() {
        let req = ListRequest::decode(&[0x05, 0x00, 40, 0xFF]).unwrap();
        assert_eq!(req.offset, 5);
        assert_eq!(req.page_size(), LIST_PAGE_MAX);
        assert!(!req.is_stream());

        let stream = ListRequest::decode(&[0, 0, 0, 0xFE]).unwrap();
        assert!(stream.is_stream());
        assert!(ListRequest::decode(&[0, 0, 0xFF, 0]).unwrap().looks_swapped());
    }

    #[test]
    fn plant_list_layout() {
        let frame = encode_plant_list(
            12,
            stream_flags::STARTING,
            &[summary(7, "Tomato"), summary(8, "Extraordinarily Long Name")],
        );
        assert_eq!(frame.len(), LIST_HEADER_LEN + 2 * LIST_ENTRY_LEN);
        assert_eq!(read_u16(&frame, 0).unwrap(), 12);
        assert_eq!(frame[2], 2);
        assert_eq!(frame[3], 0x80);
        assert_eq!(read_u16(&frame, 4).unwrap(), 7);
        assert_eq!(read_u16(&frame, 6).unwrap(), 3);
        assert_eq!(read_u16(&frame, 8).unwrap(), 2);
        assert_eq!(read_str(&frame, 10, 16, "name").unwrap(), "Tomato");
        assert_eq!(
            read_str(&frame, 4 + LIST_ENTRY_LEN + 6, 16, "name").unwrap(),
            "Extraordinarily"
        );
    }

    #[test]
    fn stats_layout_counts_builtin_pack() {
        let stats = StorageStats {
            status: StorageStatus::Ok,
            total_bytes: 1 << 40,
            used_bytes: 4096,
            free_bytes: 8192,
            plant_count: 30,
            custom_plant_count: 4,
            pack_count: 2,
            builtin_count: 26,
            change_counter: 0xDEAD_BEEF,
        };
        let frame = encode_stats(&stats);
        assert_eq!(read_u32(&frame, 0).unwrap(), u32::MAX);
        assert_eq!(read_u32(&frame, 4).unwrap(), 4096);
        assert_eq!(read_u32(&frame, 8).unwrap(), 8192);
        assert_eq!(read_u16(&frame, 12).unwrap(), 30);
        assert_eq!(read_u16(&frame, 14).unwrap(), 4);
        assert_eq!(read_u16(&frame, 16).unwrap(), 3);
        assert_eq!(read_u16(&frame, 18).unwrap(), 26);
        assert_eq!(frame[20], 0);
        assert_eq!(frame[21], 0);
        assert_eq!(read_u32(&frame, 22).unwrap(), 0xDEAD_BEEF);

        let not_ready = encode_stats(&StorageStats {
            status: StorageStatus::NotReady,
            builtin_count: 26,
            ..StorageStats::default()
        });
        assert_eq!(not_ready[20], 1);
        assert_eq!(read_u16(&not_ready, 16).unwrap(), 0);
    }

    #[test]
    fn op_result_layout() {
        let frame = OpResult {
            operation: Operation::Delete,
            result: ResultCode::NotFound,
            plant_id: 0x1234,
            version: 0,
        }
        .encode();
        assert_eq!(frame, [1, 7, 0x34, 0x12, 0, 0, 0, 0]);
    }

    #[test]
    fn pack_content_caps_member_ids() {
        let pack = PackRecord {
            pack_id: 9,
            version: 4,
            name: "Orchard".to_string(),
            plant_ids: (100..140).collect(),
        };
        let frame = encode_pack_content(&pack);
        assert_eq!(frame.len(), PACK_CONTENT_HEADER_LEN + 2 * PACK_CONTENT_MAX);
        assert_eq!(read_u16(&frame, 4).unwrap(), 40);
        assert_eq!(frame[6], 16);
        assert_eq!(read_u16(&frame, 8).unwrap(), 100);
        assert_eq!(read_u16(&frame, frame.len() - 2).unwrap(), 115);
    }
}
