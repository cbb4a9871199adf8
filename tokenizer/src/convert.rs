use crate::{
    byte_level::ByteTable, merges::Merges, model::ModelProto, vocab::build_vocab, Result,
};
use std::{path::Path, time::Instant};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Summary {
    pub merges: usize,
    pub pieces: usize,
    pub bytes_written: usize,
}

/// 读取 `merges` 中的合并规则，转换为 SentencePiece 模型写入 `output`。
///
/// 合并规则全部解析成功后才会打开输出文件。
pub fn convert(merges: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Summary> {
    let table = ByteTable::new();

    let time = Instant::now();
    let merges = Merges::from_file(merges)?;
    info!("parse merges ... {:?}", time.elapsed());

    let model = ModelProto::byte_level_bpe(build_vocab(&merges, &table));

    let time = Instant::now();
    let bytes_written = model.write_to(&output)?;
    info!(
        "write {} ({bytes_written} bytes) ... {:?}",
        output.as_ref().display(),
        time.elapsed()
    );

    Ok(Summary {
        merges: merges.len(),
        pieces: model.pieces.len(),
        bytes_written,
    })
}

#[test]
fn convert_file() {
    use crate::check::verify;
    use std::fs;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("merges.txt");
    let output = dir.path().join("new.model");
    fs::write(&input, "#version: 0.2\nĠ t\nĠ a\nh e\nĠt he\n").unwrap();

    let summary = convert(&input, &output).unwrap();
    assert_eq!(summary.merges, 4);
    assert_eq!(summary.pieces, 3 + 4 + 256);
    assert_eq!(summary.bytes_written as u64, fs::metadata(&output).unwrap().len());

    let model = ModelProto::from_model_file(&output).unwrap();
    assert_eq!(model.pieces[6].piece, "▁the");
    verify(&model, &ByteTable::new()).unwrap();
}

#[test]
fn malformed_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("merges.txt");
    let output = dir.path().join("new.model");
    std::fs::write(&input, "a b\nabc\n").unwrap();

    assert!(matches!(
        convert(&input, &output),
        Err(crate::Error::MalformedMergeLine { line: 2, .. })
    ));
    assert!(!output.exists());
}

#[test]
fn missing_input() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        convert(dir.path().join("none.txt"), dir.path().join("new.model")),
        Err(crate::Error::Io(_))
    ));
}
