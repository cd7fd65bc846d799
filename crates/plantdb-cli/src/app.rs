use crate::cli::{Cli, Command};
use crate::commands;

pub(crate) fn run(cli: Cli) -> anyhow::Result<()> {
    let root = cli.root.as_str();
    let json = cli.json;
    match cli.cmd {
        Command::Init { options } => commands::init::cmd_init(root, options, json),
        Command::Provision => commands::provision::cmd_provision(root, json),
        Command::Install { path } => commands::plants::cmd_install(root, &path, json),
        Command::InstallPack { path } => commands::packs::cmd_install_pack(root, &path, json),
        Command::Get { id } => commands::plants::cmd_get(root, id, json),
        Command::Delete { id } => commands::plants::cmd_delete(root, id, json),
        Command::List {
            offset,
            limit,
            pack,
            custom,
        } => commands::plants::cmd_list(root, offset, limit, pack, custom, json),
        Command::Packs { offset, limit } => commands::packs::cmd_packs(root, offset, limit, json),
        Command::Pack { id } => commands::packs::cmd_pack(root, id, json),
        Command::DeletePack { id, with_plants } => {
            commands::packs::cmd_delete_pack(root, id, with_plants, json)
        }
        Command::Stats => commands::stats::cmd_stats(root, json),
        Command::Kc { id, day } => commands::derived::cmd_kc(root, id, day, json),
        Command::RootDepth { id, day } => commands::derived::cmd_root_depth(root, id, day, json),
        Command::Validate { path } => commands::validate::cmd_validate(&path, json),
        Command::Inspect { path } => commands::inspect::cmd_inspect(&path, json),
        Command::Manifest { write } => commands::manifest::cmd_manifest(root, write, json),
    }
}
