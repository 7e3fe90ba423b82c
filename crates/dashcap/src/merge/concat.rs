use std::path::{Path, PathBuf};

use tokio::{fs::File, io::AsyncWriteExt};

use crate::error::DashcapResult;

/// Byte-wise concatenation of `segments` into `output`. Fragmented MP4 needs
/// no framing between segments.
pub async fn concatenate(segments: &[PathBuf], output: impl AsRef<Path>) -> DashcapResult<u64> {
    let mut output = File::create(output.as_ref()).await?;
    let mut written = 0;
    for segment in segments {
        let mut file = File::open(segment).await?;
        written += tokio::io::copy(&mut file, &mut output).await?;
    }
    output.flush().await?;
    Ok(written)
}
