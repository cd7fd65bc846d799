use anyhow::Context;
use plantdb_format::{decode_manifest, decode_pack, decode_plant, parse_header, RecordKind};
use serde::Serialize;

use crate::types::HeaderJson;
use crate::util::{detect_kind, print_json};

pub(crate) fn cmd_inspect(path: &str, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read {path}"))?;
    let kind = detect_kind(&bytes)
        .ok_or_else(|| anyhow::anyhow!("{path}: not a plant, pack or manifest record"))?;
    let header = parse_header(&bytes, kind).with_context(|| format!("parse header of {path}"))?;
    let header = HeaderJson {
        magic: header.magic,
        schema_version: header.schema_version,
        crc32: header.crc32,
        payload_size: header.payload_size,
    };
    let record = match kind {
        RecordKind::Plant => serde_json::to_value(decode_plant(&bytes)?)?,
        RecordKind::Pack => serde_json::to_value(decode_pack(&bytes)?)?,
        RecordKind::Manifest => serde_json::to_value(decode_manifest(&bytes)?)?,
    };

    if json {
        #[derive(Serialize)]
        struct Out<'a> {
            path: &'a str,
            kind: &'static str,
            file_length_bytes: usize,
            header: HeaderJson,
            record: serde_json::Value,
        }
        return print_json(&Out {
            path,
            kind: kind.name(),
            file_length_bytes: bytes.len(),
            header,
            record,
        });
    }

    println!("File: {path}");
    println!("Kind: {}", kind.name());
    println!(
        "Header: magic=0x{:08X} schema={} crc32=0x{:08X} payload={} bytes (file {} bytes)",
        header.magic,
        header.schema_version,
        header.crc32,
        header.payload_size,
        bytes.len()
    );
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
