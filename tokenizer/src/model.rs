//! SentencePiece `ModelProto` 的读写，只处理转换器用到的字段。
//!
//! ```text
//! ModelProto     { 1: repeated SentencePiece, 2: TrainerSpec, 3: NormalizerSpec }
//! SentencePiece  { 1: piece <str>, 2: score <f32>, 3: type <enum> }
//! TrainerSpec    { 3: model_type <enum> }
//! NormalizerSpec { 3: add_dummy_prefix <bool>, 4: remove_extra_whitespaces <bool> }
//! ```

use crate::{
    vocab::{Piece, PieceType},
    Error, Result,
};
use memmap2::Mmap;
use std::{fs, fs::File, path::Path};

/// `TrainerSpec.ModelType` 的取值。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum ModelType {
    Unigram = 1,
    Bpe = 2,
    Word = 3,
    Char = 4,
}

impl ModelType {
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            1 => Some(Self::Unigram),
            2 => Some(Self::Bpe),
            3 => Some(Self::Word),
            4 => Some(Self::Char),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TrainerSpec {
    pub model_type: ModelType,
}

impl Default for TrainerSpec {
    #[inline]
    fn default() -> Self {
        Self {
            model_type: ModelType::Unigram,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NormalizerSpec {
    pub add_dummy_prefix: bool,
    pub remove_extra_whitespaces: bool,
}

impl Default for NormalizerSpec {
    #[inline]
    fn default() -> Self {
        Self {
            add_dummy_prefix: true,
            remove_extra_whitespaces: true,
        }
    }
}

#[derive(Clone, Default, PartialEq, Debug)]
pub struct ModelProto {
    pub pieces: Vec<Piece>,
    pub trainer_spec: TrainerSpec,
    pub normalizer_spec: NormalizerSpec,
}

const VARINT: u8 = 0;
const FIXED64: u8 = 1;
const LEN: u8 = 2;
const FIXED32: u8 = 5;

impl ModelProto {
    /// 字节级 BPE 模型：不添加前导空格，也不合并空白。
    pub fn byte_level_bpe(pieces: Vec<Piece>) -> Self {
        Self {
            pieces,
            trainer_spec: TrainerSpec {
                model_type: ModelType::Bpe,
            },
            normalizer_spec: NormalizerSpec {
                add_dummy_prefix: false,
                remove_extra_whitespaces: false,
            },
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut msg = Vec::new();
        for piece in &self.pieces {
            msg.clear();
            put_bytes(&mut msg, 1, piece.piece.as_bytes());
            put_tag(&mut msg, 2, FIXED32);
            msg.extend_from_slice(&piece.score.to_le_bytes());
            put_tag(&mut msg, 3, VARINT);
            put_varint(&mut msg, piece.ty as u64);
            put_bytes(&mut buf, 1, &msg);
        }

        msg.clear();
        put_tag(&mut msg, 3, VARINT);
        put_varint(&mut msg, self.trainer_spec.model_type as u64);
        put_bytes(&mut buf, 2, &msg);

        msg.clear();
        put_tag(&mut msg, 3, VARINT);
        put_varint(&mut msg, self.normalizer_spec.add_dummy_prefix as u64);
        put_tag(&mut msg, 4, VARINT);
        put_varint(&mut msg, self.normalizer_spec.remove_extra_whitespaces as u64);
        put_bytes(&mut buf, 3, &msg);

        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut ans = Self::default();
        let mut reader = Reader::new(buf);
        while let Some((field, wire)) = reader.tag()? {
            match (field, wire) {
                (1, LEN) => ans.pieces.push(decode_piece(reader.bytes()?)?),
                (2, LEN) => {
                    let mut spec = Reader::new(reader.bytes()?);
                    while let Some((field, wire)) = spec.tag()? {
                        match (field, wire) {
                            (3, VARINT) => {
                                let raw = spec.varint()?;
                                ans.trainer_spec.model_type = ModelType::from_raw(raw)
                                    .ok_or_else(|| decode_error(format!("model type {raw}")))?;
                            }
                            (_, wire) => spec.skip(wire)?,
                        }
                    }
                }
                (3, LEN) => {
                    let mut spec = Reader::new(reader.bytes()?);
                    while let Some((field, wire)) = spec.tag()? {
                        match (field, wire) {
                            (3, VARINT) => ans.normalizer_spec.add_dummy_prefix = spec.varint()? != 0,
                            (4, VARINT) => {
                                ans.normalizer_spec.remove_extra_whitespaces = spec.varint()? != 0
                            }
                            (_, wire) => spec.skip(wire)?,
                        }
                    }
                }
                (_, wire) => reader.skip(wire)?,
            }
        }
        Ok(ans)
    }

    pub fn from_model_file(model_file: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(model_file)?;
        let mmap = unsafe { Mmap::map(&file) }?;
        Self::decode(&mmap)
    }

    /// 在内存中完成编码后一次性写入文件。
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<usize> {
        let buf = self.encode();
        fs::write(path, &buf)?;
        Ok(buf.len())
    }
}

fn decode_piece(buf: &[u8]) -> Result<Piece> {
    let mut piece = Piece::new(String::new(), 0., PieceType::Normal);
    let mut reader = Reader::new(buf);
    while let Some((field, wire)) = reader.tag()? {
        match (field, wire) {
            (1, LEN) => {
                piece.piece = std::str::from_utf8(reader.bytes()?)
                    .map_err(|_| decode_error("piece is not utf-8"))?
                    .to_string()
            }
            (2, FIXED32) => piece.score = f32::from_le_bytes(reader.fixed32()?),
            (3, VARINT) => {
                let raw = reader.varint()?;
                piece.ty = PieceType::from_raw(raw)
                    .ok_or_else(|| decode_error(format!("piece type {raw}")))?;
            }
            (_, wire) => reader.skip(wire)?,
        }
    }
    Ok(piece)
}

#[inline]
fn decode_error(msg: impl Into<String>) -> Error {
    Error::Decode(msg.into())
}

fn put_varint(buf: &mut Vec<u8>, mut val: u64) {
    while val >= 0x80 {
        buf.push((val as u8) | 0x80);
        val >>= 7;
    }
    buf.push(val as u8);
}

#[inline]
fn put_tag(buf: &mut Vec<u8>, field: u32, wire: u8) {
    put_varint(buf, ((field as u64) << 3) | wire as u64);
}

#[inline]
fn put_bytes(buf: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    put_tag(buf, field, LEN);
    put_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    #[inline]
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.buf.len() < len {
            return Err(decode_error("unexpected end of message"));
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn varint(&mut self) -> Result<u64> {
        let mut val = 0u64;
        for shift in (0..64).step_by(7) {
            let b = self.take(1)?[0];
            val |= ((b & 0x7f) as u64) << shift;
            if b & 0x80 == 0 {
                return Ok(val);
            }
        }
        Err(decode_error("varint too long"))
    }

    fn tag(&mut self) -> Result<Option<(u32, u8)>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let key = self.varint()?;
        Ok(Some(((key >> 3) as u32, (key & 7) as u8)))
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.varint()? as usize;
        self.take(len)
    }

    fn fixed32(&mut self) -> Result<[u8; 4]> {
        let mut ans = [0; 4];
        ans.copy_from_slice(self.take(4)?);
        Ok(ans)
    }

    fn skip(&mut self, wire: u8) -> Result<()> {
        match wire {
            VARINT => self.varint().map(drop),
            FIXED64 => self.take(8).map(drop),
            LEN => self.bytes().map(drop),
            FIXED32 => self.take(4).map(drop),
            _ => Err(decode_error(format!("unsupported wire type {wire}"))),
        }
    }
}

#[test]
fn wire_layout() {
    let model = ModelProto::byte_level_bpe(vec![Piece::new("<unk>", 0., PieceType::Unknown)]);
    let buf = model.encode();
    #[rustfmt::skip]
    let expected = [
        0x0a, 14, 0x0a, 5, b'<', b'u', b'n', b'k', b'>', 0x15, 0, 0, 0, 0, 0x18, 2,
        0x12, 2, 0x18, 2,
        0x1a, 4, 0x18, 0, 0x20, 0,
    ];
    assert_eq!(buf, expected);
}

#[test]
fn decode_back() {
    use crate::{byte_level::ByteTable, merges::Merges, vocab::build_vocab};

    let merges = Merges::parse("Ġ t\nĠt he\n").unwrap();
    let model = ModelProto::byte_level_bpe(build_vocab(&merges, &ByteTable::new()));
    let decoded = ModelProto::decode(&model.encode()).unwrap();
    assert_eq!(decoded, model);
    assert_eq!(decoded.pieces[4].piece, "▁the");
}

#[test]
fn defaults_and_unknown_fields() {
    // piece 带一个未知的 fixed64 字段，ModelProto 带一个未知的 varint 字段。
    #[rustfmt::skip]
    let buf = [
        0x0a, 12, 0x0a, 1, b'a', 0x21, 1, 2, 3, 4, 5, 6, 7, 8,
        0x28, 0x96, 0x01,
    ];
    let model = ModelProto::decode(&buf).unwrap();
    assert_eq!(model.pieces, [Piece::new("a", 0., PieceType::Normal)]);
    assert_eq!(model.trainer_spec.model_type, ModelType::Unigram);
    assert!(model.normalizer_spec.add_dummy_prefix);
    assert!(model.normalizer_spec.remove_extra_whitespaces);
}

#[test]
fn truncated() {
    let buf = ModelProto::byte_level_bpe(vec![Piece::new("ab", -0.1, PieceType::Normal)]).encode();
    for len in [1, 3, 8] {
        assert!(matches!(
            ModelProto::decode(&buf[..len]),
            Err(Error::Decode(_))
        ));
    }
}

#[test]
fn varint() {
    let mut buf = Vec::new();
    put_varint(&mut buf, 300);
    assert_eq!(buf, [0xac, 0x02]);
    assert_eq!(Reader::new(&buf).varint().unwrap(), 300);
}
