use crate::{byte_level::ByteTable, merges::Merge};

pub const UNK: &str = "<unk>";
pub const BOS: &str = "<s>";
pub const EOS: &str = "</s>";

/// 特殊词的数量，位于词表开头。
pub const NUM_SPECIAL: usize = 3;

/// `SentencePiece.Type` 的取值。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum PieceType {
    Normal = 1,
    Unknown = 2,
    Control = 3,
    UserDefined = 4,
    Unused = 5,
    Byte = 6,
}

impl PieceType {
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            1 => Some(Self::Normal),
            2 => Some(Self::Unknown),
            3 => Some(Self::Control),
            4 => Some(Self::UserDefined),
            5 => Some(Self::Unused),
            6 => Some(Self::Byte),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Piece {
    pub piece: String,
    pub score: f32,
    pub ty: PieceType,
}

impl Piece {
    #[inline]
    pub fn new(piece: impl Into<String>, score: f32, ty: PieceType) -> Self {
        Self {
            piece: piece.into(),
            score,
            ty,
        }
    }
}

/// Score of the entry at global `rank`, merges first and bytes after them.
#[inline]
pub fn rank_score(rank: usize) -> f32 {
    (rank as f64 * -0.1 - 0.1) as f32
}

/// 按 `<unk>`、`<s>`、`</s>`、合并规则、字节的顺序生成词表。
pub fn build_vocab<'a>(
    merges: impl IntoIterator<Item = &'a Merge>,
    table: &ByteTable,
) -> Vec<Piece> {
    let mut pieces = vec![
        Piece::new(UNK, 0., PieceType::Unknown),
        Piece::new(BOS, 0., PieceType::Control),
        Piece::new(EOS, 0., PieceType::Control),
    ];
    pieces.extend(
        merges
            .into_iter()
            .enumerate()
            .map(|(i, merge)| Piece::new(merge.piece(), rank_score(i), PieceType::Normal)),
    );
    let num_merges = pieces.len() - NUM_SPECIAL;
    pieces.extend(table.iter().enumerate().map(|(j, (c, _))| {
        Piece::new(c.to_string(), rank_score(num_merges + j), PieceType::Byte)
    }));
    debug!(
        "vocab built: {num_merges} merges, {} pieces",
        pieces.len()
    );
    pieces
}

#[cfg(test)]
fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[test]
fn layout() {
    use crate::merges::Merges;

    let table = ByteTable::new();
    let merges = Merges::parse("a b\nc d\n").unwrap();
    let pieces = build_vocab(&merges, &table);
    assert_eq!(pieces.len(), NUM_SPECIAL + 2 + 256);

    assert_eq!(pieces[0], Piece::new("<unk>", 0., PieceType::Unknown));
    assert_eq!(pieces[1], Piece::new("<s>", 0., PieceType::Control));
    assert_eq!(pieces[2], Piece::new("</s>", 0., PieceType::Control));
    assert_eq!(pieces[3], Piece::new("ab", -0.1, PieceType::Normal));
    assert_eq!(pieces[4], Piece::new("cd", -0.2, PieceType::Normal));

    let bytes = &pieces[5..];
    assert!(bytes.iter().all(|p| p.ty == PieceType::Byte));
    assert_eq!(bytes[0].piece, "!");
    assert!(approx(bytes[0].score, -0.3));
    assert!(approx(bytes[1].score, -0.4));
    assert!(approx(bytes[255].score, -25.8));
    for (piece, (c, _)) in bytes.iter().zip(table.iter()) {
        assert_eq!(piece.piece, c.to_string());
    }
}

#[test]
fn scores_strictly_decrease() {
    let table = ByteTable::new();
    let text = (0..5000).map(|i| format!("a{i} b\n")).collect::<String>();
    let merges = crate::merges::Merges::parse(&text).unwrap();
    let pieces = build_vocab(&merges, &table);
    let ranked = &pieces[NUM_SPECIAL..];
    assert!(ranked.windows(2).all(|w| w[0].score > w[1].score));

    let lowest_merge = ranked[merges.len() - 1].score;
    assert!(ranked[merges.len()..].iter().all(|p| p.score < lowest_merge));
}

#[test]
fn no_merges() {
    let pieces = build_vocab(&crate::merges::Merges::default(), &ByteTable::new());
    assert_eq!(pieces.len(), NUM_SPECIAL + 256);
    assert_eq!(pieces[3].score, -0.1);
}
