//! Directory layout and file naming under the store root.
//!
//! ```text
//! <root>/plants/p_XXXX.bin   plant records, XXXX = uppercase hex id
//! <root>/plants/p_XXXX.tmp   in-flight plant write
//! <root>/packs/k_XXXX.bin    pack records
//! <root>/packs/k_XXXX.tmp    in-flight pack write
//! <root>/manifest.bin
//! <root>/counter.bin
//! ```

use std::path::{Path, PathBuf};

pub const PLANTS_DIR: &str = "plants";
pub const PACKS_DIR: &str = "packs";
pub const MANIFEST_FILE: &str = "manifest.bin";
pub const COUNTER_FILE: &str = "counter.bin";
pub const OPTIONS_FILE: &str = "options.json";

const RECORD_EXT: &str = "bin";
const TEMP_EXT: &str = "tmp";

const MAGIC_PLANT: u32 = 0x504C_4E54; // 'P' 'L' 'N' 'T'
const MAGIC_PACK: u32 = 0x5041_434B; // 'P' 'A' 'C' 'K'
const MAGIC_MANIFEST: u32 = 0x4D4E_4654; // 'M' 'N' 'F' 'T'

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Plant,
    Pack,
    Manifest,
}

impl RecordKind {
    pub const fn magic(self) -> u32 {
        match self {
            Self::Plant => MAGIC_PLANT,
            Self::Pack => MAGIC_PACK,
            Self::Manifest => MAGIC_MANIFEST,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Plant => "plant",
            Self::Pack => "pack",
            Self::Manifest => "manifest",
        }
    }
}

/// A directory of per-id record files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Plants,
    Packs,
}

impl Collection {
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Plants => PLANTS_DIR,
            Self::Packs => PACKS_DIR,
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Plants => "p_",
            Self::Packs => "k_",
        }
    }

    pub const fn record_kind(self) -> RecordKind {
        match self {
            Self::Plants => RecordKind::Plant,
            Self::Packs => RecordKind::Pack,
        }
    }

    pub fn file_name(self, id: u16) -> String {
        format!("{}{id:04X}.{RECORD_EXT}", self.prefix())
    }

    pub fn temp_file_name(self, id: u16) -> String {
        format!("{}{id:04X}.{TEMP_EXT}", self.prefix())
    }

    /// Id encoded in a record file name, or `None` if `name` is not one.
    ///
    /// Only the uppercase spelling produced by [`Collection::file_name`]
    /// matches, so a parsed id always maps back to the same entry.
    pub fn parse_file_name(self, name: &str) -> Option<u16> {
        self.parse_with_ext(name, RECORD_EXT)
    }

    pub fn parse_temp_file_name(self, name: &str) -> Option<u16> {
        self.parse_with_ext(name, TEMP_EXT)
    }

    fn parse_with_ext(self, name: &str, ext: &str) -> Option<u16> {
        let rest = name.strip_prefix(self.prefix())?;
        let (hex, found_ext) = rest.split_once('.')?;
        let upper_hex = |b: u8| b.is_ascii_digit() || (b'A'..=b'F').contains(&b);
        if found_ext != ext || hex.len() != 4 || !hex.bytes().all(upper_hex) {
            return None;
        }
        u16::from_str_radix(hex, 16).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.dir_name())
    }

    pub fn record_path(&self, collection: Collection, id: u16) -> PathBuf {
        self.dir(collection).join(collection.file_name(id))
    }

    pub fn temp_path(&self, collection: Collection, id: u16) -> PathBuf {
        self.dir(collection).join(collection.temp_file_name(id))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn manifest_temp_path(&self) -> PathBuf {
        self.root.join(format!("{MANIFEST_FILE}.{TEMP_EXT}"))
    }

    pub fn counter_path(&self) -> PathBuf {
        self.root.join(COUNTER_FILE)
    }

    pub fn options_path(&self) -> PathBuf {
        self.root.join(OPTIONS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_use_zero_padded_uppercase_hex() {
        let layout = StoreLayout::new("/lfs/packs");
        assert_eq!(
            layout.record_path(Collection::Plants, 0x2a),
            PathBuf::from("/lfs/packs/plants/p_002A.bin")
        );
        assert_eq!(
            layout.temp_path(Collection::Plants, 0x2a),
            PathBuf::from("/lfs/packs/plants/p_002A.tmp")
        );
        assert_eq!(
            layout.record_path(Collection::Packs, 0xBEEF),
            PathBuf::from("/lfs/packs/packs/k_BEEF.bin")
        );
        assert_eq!(layout.counter_path(), PathBuf::from("/lfs/packs/counter.bin"));
    }

    #[test]
    fn parses_only_matching_names() {
        let plants = Collection::Plants;
        assert_eq!(plants.parse_file_name("p_002A.bin"), Some(0x2a));
        assert_eq!(plants.parse_file_name("p_002a.bin"), None);
        assert_eq!(plants.parse_temp_file_name("p_000a.tmp"), None);
        assert_eq!(plants.parse_file_name("p_002A.tmp"), None);
        assert_eq!(plants.parse_temp_file_name("p_002A.tmp"), Some(0x2a));
        assert_eq!(plants.parse_file_name("k_002A.bin"), None);
        assert_eq!(plants.parse_file_name("p_2A.bin"), None);
        assert_eq!(plants.parse_file_name("p_+02A.bin"), None);
        assert_eq!(plants.parse_file_name("p_002A.bin.bak"), None);
        assert_eq!(Collection::Packs.parse_file_name("k_0001.bin"), Some(1));
    }
}
