use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use tokio::process::Command;

use super::{locate, run_tool, Decryptor};
use crate::{decrypt::KeyMap, error::DashcapResult};

/// Bento4 `mp4decrypt`.
///
/// The default instance looks the program up on `PATH` the first time a
/// track is decrypted, so unencrypted content never needs it installed.
#[derive(Debug, Clone, Default)]
pub struct Mp4Decrypt {
    program: Option<PathBuf>,
}

impl Mp4Decrypt {
    pub const PROGRAM: &'static str = "mp4decrypt";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> DashcapResult<PathBuf> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => locate(Self::PROGRAM),
        }
    }
}

fn mp4decrypt_args(keys: &KeyMap, input: &Path, output: &Path) -> Vec<OsString> {
    let mut args = Vec::with_capacity(keys.len() * 2 + 2);
    for pair in keys.pairs() {
        args.push("--key".into());
        args.push(pair.into());
    }
    args.push(input.into());
    args.push(output.into());
    args
}

impl Decryptor for Mp4Decrypt {
    async fn decrypt(&self, keys: &KeyMap, input: &Path, output: &Path) -> DashcapResult<()> {
        let mut command = Command::new(self.program()?);
        command.args(mp4decrypt_args(keys, input, output));
        run_tool(Self::PROGRAM, command).await?;
        Ok(())
    }
}
