//! 字节与可打印 unicode 字符之间的双射表。

use std::collections::HashMap;

/// SentencePiece 使用的词边界标记，空格字节映射到此字符。
pub const WORD_BOUNDARY: char = '▁';

/// GPT-2 merges.txt 中的词边界标记。
pub const GPT2_WORD_BOUNDARY: char = 'Ġ';

const SPACE: u8 = b' ';

/// Converts a code point produced by [`ByteTable::new`] into its character.
#[inline]
fn codepoint_to_char(cp: u32) -> char {
    // Seeds are below 256, fallbacks below 512 and the placeholder is U+2581.
    char::from_u32(cp).unwrap()
}

#[derive(Clone, Debug)]
pub struct ByteTable {
    /// 每个字节对应的字符。
    encoder: [char; 256],
    /// 字符到字节的反查表。
    decoder: HashMap<char, u8>,
    /// 构造顺序，种子区间在前，回退字节在后。
    order: Vec<u8>,
}

impl ByteTable {
    pub fn new() -> Self {
        let mut bs = Vec::with_capacity(256);
        bs.extend(b'!'..=b'~');
        bs.extend(0xa1u8..=0xac);
        bs.extend(0xaeu8..=0xff);
        let mut cs = bs.iter().map(|&b| b as u32).collect::<Vec<_>>();

        let mut n = 0u32;
        for b in 0..=255u8 {
            if b == SPACE {
                bs.push(b);
                cs.push(WORD_BOUNDARY as u32);
                n += 1;
            } else if !bs.contains(&b) {
                bs.push(b);
                cs.push(256 + n);
                n += 1;
            }
        }

        let mut encoder = ['\0'; 256];
        for (&b, &cp) in bs.iter().zip(&cs) {
            encoder[b as usize] = codepoint_to_char(cp);
        }
        let decoder = bs
            .iter()
            .map(|&b| (encoder[b as usize], b))
            .collect::<HashMap<_, _>>();
        debug_assert_eq!(decoder.len(), 256);

        Self {
            encoder,
            decoder,
            order: bs,
        }
    }

    #[inline]
    pub fn char_of(&self, byte: u8) -> char {
        self.encoder[byte as usize]
    }

    #[inline]
    pub fn byte_of(&self, c: char) -> Option<u8> {
        self.decoder.get(&c).copied()
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        self.decoder.contains_key(&c)
    }

    /// Walks the inverse table as `(char, byte)` in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (char, u8)> + '_ {
        self.order.iter().map(|&b| (self.encoder[b as usize], b))
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| self.char_of(b)).collect()
    }

    pub fn decode(&self, text: &str) -> Option<Vec<u8>> {
        text.chars().map(|c| self.byte_of(c)).collect()
    }
}

impl Default for ByteTable {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn bijection() {
    let table = ByteTable::new();
    for b in 0..=255u8 {
        assert_eq!(table.byte_of(table.char_of(b)), Some(b));
    }
    let mut chars = table.iter().map(|(c, _)| c).collect::<Vec<_>>();
    chars.sort_unstable();
    chars.dedup();
    assert_eq!(chars.len(), 256);
}

#[test]
fn codepoints() {
    assert_eq!(codepoint_to_char(b'!' as u32), '!');
    assert_eq!(codepoint_to_char(256), '\u{100}');
    assert_eq!(codepoint_to_char(WORD_BOUNDARY as u32), WORD_BOUNDARY);
}

#[test]
fn space_is_word_boundary() {
    let table = ByteTable::new();
    assert_eq!(table.char_of(b' '), WORD_BOUNDARY);
    assert_eq!(table.byte_of(WORD_BOUNDARY), Some(b' '));
    assert_eq!(table.iter().filter(|&(c, _)| c == WORD_BOUNDARY).count(), 1);
    assert!(!table.contains(GPT2_WORD_BOUNDARY));
}

#[test]
fn seeds_and_fallbacks() {
    let table = ByteTable::new();
    assert_eq!(table.char_of(b'a'), 'a');
    assert_eq!(table.char_of(0xa1), '¡');
    assert_eq!(table.char_of(0xff), 'ÿ');
    assert_eq!(table.char_of(0), '\u{100}');
    assert_eq!(table.char_of(31), '\u{11f}');
    // 空格占用了一个计数。
    assert_eq!(table.char_of(127), '\u{121}');
    assert_eq!(table.char_of(0xad), '\u{143}');
    for (c, b) in table.iter() {
        assert!(!c.is_whitespace() && !c.is_control(), "byte {b} -> {c:?}");
    }
}

#[test]
fn iteration_order() {
    let table = ByteTable::new();
    let order = table.iter().map(|(_, b)| b).collect::<Vec<_>>();
    assert_eq!(order.len(), 256);
    assert_eq!(order[0], b'!');
    assert_eq!(order[93], b'~');
    assert_eq!(order[94], 0xa1);
    assert_eq!(order[188], 0);
    assert_eq!(order[220], b' ');
    assert_eq!(order[255], 0xad);
}

#[test]
fn text_round_trip() {
    let table = ByteTable::new();
    for text in ["Hello World!", "안녕!", "abαβ 累計7239人", "xy.,z     de", "🙇‍♂️\t\n\0"] {
        let encoded = table.encode(text.as_bytes());
        assert_eq!(encoded.chars().count(), text.len());
        assert_eq!(table.decode(&encoded).unwrap(), text.as_bytes());
    }
    assert_eq!(table.encode(b"a b"), "a▁b");
    assert_eq!(table.decode("a b"), None);
}
