//! 把 GPT-2 风格的字节级 BPE 合并规则转换为 SentencePiece 模型。

mod byte_level;
mod check;
mod convert;
mod error;
mod merges;
mod model;
mod vocab;

#[macro_use]
extern crate log;

pub use byte_level::{ByteTable, GPT2_WORD_BOUNDARY, WORD_BOUNDARY};
pub use check::{encode_sample, missing_from, verify, ReferenceVocab, Report, SAMPLE_TEXTS};
pub use convert::{convert, Summary};
pub use error::{Error, Result};
pub use merges::{Merge, Merges};
pub use model::{ModelProto, ModelType, NormalizerSpec, TrainerSpec};
pub use vocab::{build_vocab, rank_score, Piece, PieceType, BOS, EOS, NUM_SPECIAL, UNK};
