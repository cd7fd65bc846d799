//! One module per subcommand group of the `plantdb` binary.

pub(crate) mod derived;
pub(crate) mod init;
pub(crate) mod inspect;
pub(crate) mod manifest;
pub(crate) mod packs;
pub(crate) mod plants;
pub(crate) mod provision;
pub(crate) mod stats;
pub(crate) mod validate;
