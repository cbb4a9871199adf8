use crate::common::logger_init;
use clap::Args;
use spm_tokenizer::{
    encode_sample, missing_from, verify, ByteTable, ModelProto, ReferenceVocab, Result,
    SAMPLE_TEXTS,
};

#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Model file to verify.
    #[clap(short, long, default_value = "new.model")]
    model: String,
    /// Reference GPT-2 `vocab.json`.
    #[clap(long)]
    vocab: Option<String>,
    /// Print the report as json.
    #[clap(long)]
    json: bool,
    /// Log level, may be "off", "trace", "debug", "info" or "error".
    #[clap(long)]
    log: Option<String>,
}

impl CheckArgs {
    pub fn invoke(self) -> Result<()> {
        logger_init(&self.log);

        let table = ByteTable::new();
        let model = ModelProto::from_model_file(&self.model)?;
        info!("load {} pieces from {}", model.pieces.len(), self.model);

        let mut report = verify(&model, &table)?;
        if let Some(path) = &self.vocab {
            let reference = ReferenceVocab::from_json_file(path)?;
            if reference.is_empty() {
                warn!("reference vocab {path} is empty");
            }
            info!("load {} reference tokens from {path}", reference.len());
            let missing = missing_from(&model, &reference);
            if !missing.is_empty() {
                warn!(
                    "{} of {} merges missing from {path}",
                    missing.len(),
                    report.merges
                );
            }
            report.missing_from_reference = Some(missing);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!(
            "{}: {} pieces, {} merges, {} bytes, {} control",
            self.model, report.pieces, report.merges, report.bytes, report.control
        );
        if let Some(missing) = &report.missing_from_reference {
            println!("{} merges missing from reference vocab", missing.len());
            for piece in missing.iter().take(16) {
                println!("  {piece}");
            }
        }
        for text in SAMPLE_TEXTS {
            println!("{text:?} -> {}", encode_sample(text, &table)?);
        }
        Ok(())
    }
}
