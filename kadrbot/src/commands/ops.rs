use std::path::Path;

use serde::Serialize;

use kadr_core::{MediaProber, MediaSection, StorageSection, UsageStats, UsageStore, VideoMetadata};

use crate::{OutputFormat, Result};

pub fn stats(storage: &StorageSection, format: OutputFormat) -> Result<()> {
    let store = UsageStore::builder()
        .path(&storage.database_path)
        .read_only(true)
        .build()?;
    let stats = store.stats()?;
    render(&stats, format)
}

pub async fn probe(media: &MediaSection, format: OutputFormat, path: &Path) -> Result<()> {
    let prober = MediaProber::from_config(media);
    let metadata = prober.describe(path).await;
    render(&metadata, format)
}

pub async fn compress(media: &MediaSection, input: &Path, output: &Path) -> Result<()> {
    let prober = MediaProber::from_config(media);
    prober.compress(input, output).await?;
    println!("compressed {} -> {}", input.display(), output.display());
    Ok(())
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + TextRender,
{
    match format {
        OutputFormat::Text => println!("{}", value.text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

trait TextRender {
    fn text(&self) -> String;
}

impl TextRender for UsageStats {
    fn text(&self) -> String {
        format!(
            "users:  {}\nvideos: {}",
            self.total_users, self.total_videos
        )
    }
}

impl TextRender for VideoMetadata {
    fn text(&self) -> String {
        format!(
            "duration:   {} s\nresolution: {}\nfps:        {}",
            self.duration, self.resolution, self.fps
        )
    }
}
