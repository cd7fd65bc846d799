use anyhow::Context;
use plantdb_format::{decode_manifest, decode_pack, decode_plant, RecordKind};

use crate::types::ValidateJson;
use crate::util::{detect_kind, print_json};

pub(crate) fn cmd_validate(path: &str, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read {path}"))?;
    let kind = detect_kind(&bytes);
    let err = match kind {
        Some(kind) => check(&bytes, kind).err(),
        None => Some("unrecognised record magic".to_string()),
    };
    if json {
        let out = ValidateJson {
            ok: err.is_none(),
            path,
            kind: kind.map(RecordKind::name),
            error: err,
        };
        print_json(&out)?;
        if out.ok {
            Ok(())
        } else {
            std::process::exit(1);
        }
    } else if let Some(e) = err {
        anyhow::bail!("INVALID: {path}: {e}");
    } else {
        println!("OK: {path} ({})", kind.map_or("?", RecordKind::name));
        Ok(())
    }
}

fn check(bytes: &[u8], kind: RecordKind) -> Result<(), String> {
    let result = match kind {
        RecordKind::Plant => decode_plant(bytes).map(|_| ()),
        RecordKind::Pack => decode_pack(bytes).map(|_| ()),
        RecordKind::Manifest => decode_manifest(bytes).map(|_| ()),
    };
    result.map_err(|e| e.to_string())
}
