use std::path::PathBuf;

use clap::Parser;

use crate::{prelude::*, store::JsonStore};

#[derive(Parser)]
pub struct StoreArgs {
    /// JSON file with the published state, created when missing.
    #[clap(long = "state-file", env = "STATE_FILE", default_value = "meerkat-state.json")]
    path: PathBuf,
}

impl StoreArgs {
    pub fn open(&self) -> Result<JsonStore> {
        JsonStore::open(&self.path)
    }
}
