use crate::common::logger_init;
use clap::Args;
use spm_tokenizer::{ByteTable, Result};

#[derive(Args)]
pub(crate) struct TableArgs {
    /// Log level, may be "off", "trace", "debug", "info" or "error".
    #[clap(long)]
    log: Option<String>,
}

impl TableArgs {
    pub fn invoke(self) -> Result<()> {
        logger_init(&self.log);

        let table = ByteTable::new();
        for (c, b) in table.iter() {
            println!("{b:3} 0x{b:02x} -> {c} U+{:04X}", c as u32);
        }
        Ok(())
    }
}
