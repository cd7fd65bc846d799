use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "plantdb",
    version,
    about = "Maintain and inspect a plantdb record store",
    long_about = "Maintain and inspect a plantdb record store.\n\nNotes:\n  - Each plant and pack is one checksummed file under the store root.\n  - A record is only replaced by a strictly newer version."
)]
pub(crate) struct Cli {
    /// Store root directory.
    #[arg(long, global = true, default_value = "plantdb")]
    pub(crate) root: String,

    /// Emit machine-readable JSON instead of human output.
    #[arg(long, global = true)]
    pub(crate) json: bool,

    /// Log more on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub(crate) verbose: u8,

    #[command(subcommand)]
    pub(crate) cmd: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create the store layout and provision the built-in species.
    Init {
        /// Also write an options.json with every default spelled out.
        #[arg(long)]
        options: bool,
    },
    /// Install any built-in species missing from the store.
    Provision,
    /// Install a plant from a JSON file.
    Install {
        /// JSON plant record.
        path: String,
    },
    /// Install a pack and its plants from a JSON file.
    InstallPack {
        /// JSON object with `pack` and `plants`.
        path: String,
    },
    /// Print one plant.
    Get { id: u16 },
    /// Delete one plant.
    Delete { id: u16 },
    /// List plant summaries.
    List {
        /// Candidate files to skip before listing.
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Maximum entries (defaults to the configured page size).
        #[arg(long)]
        limit: Option<usize>,
        /// Only plants owned by this pack (0 is the built-in set).
        #[arg(long, conflicts_with = "custom")]
        pack: Option<u16>,
        /// Only plants owned by an installed pack.
        #[arg(long)]
        custom: bool,
    },
    /// List packs, the built-in pack first.
    Packs {
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print one pack and its member ids.
    Pack { id: u16 },
    /// Delete a pack, optionally with the plants it owns.
    DeletePack {
        id: u16,
        #[arg(long)]
        with_plants: bool,
    },
    /// Storage usage, counts and change counter.
    Stats,
    /// Crop coefficient of a plant on a day after planting.
    Kc { id: u16, day: u16 },
    /// Root depth in millimetres of a plant on a day after planting.
    RootDepth { id: u16, day: u16 },
    /// Check that a record file decodes cleanly.
    Validate {
        /// Plant, pack or manifest file.
        path: String,
    },
    /// Print the header and decoded content of a record file.
    Inspect {
        /// Plant, pack or manifest file.
        path: String,
    },
    /// Compare manifest.bin against the stored records.
    Manifest {
        /// Rewrite the manifest from the current records instead.
        #[arg(long)]
        write: bool,
    },
}
