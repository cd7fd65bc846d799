//! On-disk formats for plant, pack and manifest records.

pub mod bytes;
mod crc;
pub mod layout;
mod reader;
pub mod writer;

pub use crc::crc32;
pub use layout::{Collection, RecordKind, StoreLayout};
pub use reader::{
    decode_manifest, decode_pack, decode_plant, decode_plant_payload, decode_record,
    parse_header, RecordHeader,
};
pub use writer::{
    encode_manifest, encode_pack, encode_plant, encode_plant_payload, encode_record, HEADER_LEN,
    PLANT_PAYLOAD_LEN,
};
