use crate::{
    byte_level::{ByteTable, GPT2_WORD_BOUNDARY, WORD_BOUNDARY},
    model::{ModelProto, ModelType},
    vocab::{PieceType, BOS, EOS, NUM_SPECIAL, UNK},
    Error, Result,
};
use itertools::Itertools;
use serde::Serialize;
use std::{collections::HashMap, fs::File, io::BufReader, path::Path};

/// 用于人工比对的样例文本。
pub const SAMPLE_TEXTS: [&str; 7] = [
    "Hello World!",
    "안녕!",
    "1234!!?:)Helloaa😆🙇‍♂️",
    "abαβ 累計7239人",
    "xy.,z     de",
    "I've fused the lights.",
    "abαβ123🙇‍♂️🙇‍♂️🙇‍♂️🙇‍♂️          ",
];

/// GPT-2 风格的 `vocab.json`，只用到其中的键。
pub struct ReferenceVocab(HashMap<String, u32>);

impl ReferenceVocab {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(Self(serde_json::from_reader(reader)?))
    }

    #[inline]
    pub fn from_map(map: HashMap<String, u32>) -> Self {
        Self(map)
    }

    /// Looks up a model piece, spelled with `▁`, under its GPT-2 spelling.
    pub fn contains(&self, piece: &str) -> bool {
        let gpt2 = piece.replace(WORD_BOUNDARY, GPT2_WORD_BOUNDARY.encode_utf8(&mut [0; 4]));
        self.0.contains_key(&gpt2)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Serialize, Clone, Default, PartialEq, Debug)]
pub struct Report {
    pub pieces: usize,
    pub merges: usize,
    pub bytes: usize,
    pub control: usize,
    /// 参考词表中缺失的合并词，未提供参考词表时为 `None`。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_from_reference: Option<Vec<String>>,
}

fn layout_error(msg: impl Into<String>) -> Error {
    Error::Layout(msg.into())
}

/// 检查模型是否符合字节级 BPE 转换结果的布局。
pub fn verify(model: &ModelProto, table: &ByteTable) -> Result<Report> {
    if model.trainer_spec.model_type != ModelType::Bpe {
        return Err(layout_error(format!(
            "model type is {:?}",
            model.trainer_spec.model_type
        )));
    }
    let normalizer = &model.normalizer_spec;
    if normalizer.add_dummy_prefix || normalizer.remove_extra_whitespaces {
        return Err(layout_error(format!("normalizer enabled: {normalizer:?}")));
    }

    let pieces = &model.pieces;
    if pieces.len() < NUM_SPECIAL + 256 {
        return Err(layout_error(format!("only {} pieces", pieces.len())));
    }
    let specials = [
        (UNK, PieceType::Unknown),
        (BOS, PieceType::Control),
        (EOS, PieceType::Control),
    ];
    for (i, (piece, ty)) in specials.into_iter().enumerate() {
        if pieces[i].piece != piece || pieces[i].ty != ty {
            return Err(layout_error(format!("piece {i} is {:?}", pieces[i])));
        }
    }

    let ranked = &pieces[NUM_SPECIAL..];
    let (merges, bytes) = ranked.split_at(ranked.len() - 256);
    if let Some((i, p)) = merges.iter().find_position(|p| p.ty != PieceType::Normal) {
        return Err(layout_error(format!("piece {} is {p:?}", NUM_SPECIAL + i)));
    }
    for (i, p) in merges.iter().enumerate() {
        if p.piece.is_empty() || !p.piece.chars().all(|c| table.contains(c)) {
            return Err(layout_error(format!(
                "merge {:?} at {} is outside the byte alphabet",
                p.piece,
                NUM_SPECIAL + i
            )));
        }
    }

    let mut covered = [false; 256];
    for p in bytes {
        let mut chars = p.piece.chars();
        let byte = match (p.ty, chars.next(), chars.next()) {
            (PieceType::Byte, Some(c), None) => table.byte_of(c),
            _ => None,
        };
        match byte {
            Some(b) if !covered[b as usize] => covered[b as usize] = true,
            _ => return Err(layout_error(format!("unexpected byte piece {p:?}"))),
        }
    }

    if let Some((a, b)) = ranked
        .iter()
        .tuple_windows()
        .find(|(a, b)| a.score <= b.score)
    {
        return Err(layout_error(format!(
            "scores not strictly decreasing: {:?} ({}) then {:?} ({})",
            a.piece, a.score, b.piece, b.score
        )));
    }

    Ok(Report {
        pieces: pieces.len(),
        merges: merges.len(),
        bytes: bytes.len(),
        control: pieces.iter().filter(|p| p.ty == PieceType::Control).count(),
        missing_from_reference: None,
    })
}

/// 列出参考词表中不存在的合并词。
pub fn missing_from(model: &ModelProto, reference: &ReferenceVocab) -> Vec<String> {
    model
        .pieces
        .iter()
        .filter(|p| p.ty == PieceType::Normal && !reference.contains(&p.piece))
        .map(|p| p.piece.clone())
        .collect()
}

/// 把样例文本转为字节表字母表，并确认能还原。
pub fn encode_sample(text: &str, table: &ByteTable) -> Result<String> {
    let encoded = table.encode(text.as_bytes());
    match table.decode(&encoded) {
        Some(bytes) if bytes == text.as_bytes() => Ok(encoded),
        _ => Err(layout_error(format!("sample {text:?} does not round trip"))),
    }
}

#[cfg(test)]
fn converted(text: &str) -> (ModelProto, ByteTable) {
    let table = ByteTable::new();
    let merges = crate::merges::Merges::parse(text).unwrap();
    let pieces = crate::vocab::build_vocab(&merges, &table);
    (ModelProto::byte_level_bpe(pieces), table)
}

#[test]
fn accepts_converted() {
    let (model, table) = converted("Ġ t\nh e\nĠt he\n");
    let report = verify(&model, &table).unwrap();
    assert_eq!(report.pieces, 3 + 3 + 256);
    assert_eq!(report.merges, 3);
    assert_eq!(report.bytes, 256);
    assert_eq!(report.control, 2);
}

#[test]
fn rejects_bad_layouts() {
    let (model, table) = converted("a b\nc d\n");

    let mut swapped = model.clone();
    swapped.pieces.swap(3, 4);
    assert!(matches!(verify(&swapped, &table), Err(Error::Layout(_))));

    let mut mistyped = model.clone();
    mistyped.pieces[3].ty = PieceType::UserDefined;
    assert!(matches!(verify(&mistyped, &table), Err(Error::Layout(_))));

    let mut duplicated = model.clone();
    let last = duplicated.pieces.len() - 1;
    duplicated.pieces[last].piece = "!".into();
    assert!(matches!(verify(&duplicated, &table), Err(Error::Layout(_))));

    let mut normalized = model.clone();
    normalized.normalizer_spec.add_dummy_prefix = true;
    assert!(matches!(verify(&normalized, &table), Err(Error::Layout(_))));

    let mut unigram = model;
    unigram.trainer_spec.model_type = ModelType::Unigram;
    assert!(matches!(verify(&unigram, &table), Err(Error::Layout(_))));
}

#[test]
fn reference_vocab() {
    let (model, _) = converted("Ġ t\nh e\n");
    let reference = ReferenceVocab::from_map(
        [("Ġt", 0), ("x", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    );
    assert_eq!(reference.len(), 2);
    assert!(!reference.is_empty());
    assert!(reference.contains("▁t"));
    assert_eq!(missing_from(&model, &reference), ["he"]);
}

#[test]
fn samples_round_trip() {
    let table = ByteTable::new();
    for text in SAMPLE_TEXTS {
        let encoded = encode_sample(text, &table).unwrap();
        assert!(!encoded.contains(' '));
    }
    assert_eq!(encode_sample("Hello World!", &table).unwrap(), "Hello▁World!");
}
