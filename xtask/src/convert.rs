use crate::common::logger_init;
use clap::Args;
use spm_tokenizer::{convert, Result};
use std::time::Instant;

#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Merge rules file.
    #[clap(short, long, default_value = "merges.txt")]
    merges: String,
    /// Output model file.
    #[clap(short, long, default_value = "new.model")]
    output: String,
    /// Log level, may be "off", "trace", "debug", "info" or "error".
    #[clap(long)]
    log: Option<String>,
}

impl ConvertArgs {
    pub fn invoke(self) -> Result<()> {
        logger_init(&self.log);

        let time = Instant::now();
        let summary = convert(&self.merges, &self.output)?;
        println!(
            "convert {} merges into {} pieces ({} bytes) ... {:?}",
            summary.merges,
            summary.pieces,
            summary.bytes_written,
            time.elapsed()
        );
        Ok(())
    }
}
