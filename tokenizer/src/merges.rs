use crate::{
    byte_level::{GPT2_WORD_BOUNDARY, WORD_BOUNDARY},
    Error, Result,
};
use itertools::Itertools;
use memmap2::Mmap;
use std::{fs::File, path::Path};

/// 一条合并规则，行号越小优先级越高。
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Merge {
    pub left: String,
    pub right: String,
    /// 在源文件中的行号，从 1 开始。
    pub line: usize,
}

impl Merge {
    /// 合并后的词。
    #[inline]
    pub fn piece(&self) -> String {
        format!("{}{}", self.left, self.right)
    }
}

#[derive(Clone, Default, Debug)]
pub struct Merges(Vec<Merge>);

impl Merges {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file) }?;
        let text = std::str::from_utf8(&mmap).map_err(|_| Error::NotUtf8 {
            path: path.to_path_buf(),
        })?;
        let merges = Self::parse(text)?;
        info!("read {} merges from {}", merges.len(), path.display());
        Ok(merges)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut merges = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let rewritten = line.replace(GPT2_WORD_BOUNDARY, WORD_BOUNDARY.encode_utf8(&mut [0; 4]));
            let Some((left, right)) = rewritten.split(' ').collect_tuple() else {
                return Err(Error::MalformedMergeLine {
                    line: i + 1,
                    text: line.to_string(),
                });
            };
            merges.push(Merge {
                left: left.to_string(),
                right: right.to_string(),
                line: i + 1,
            });
        }
        debug!("parsed {} merge rules", merges.len());
        Ok(Self(merges))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Merge> {
        self.0.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Merge] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Merges {
    type Item = &'a Merge;
    type IntoIter = std::slice::Iter<'a, Merge>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[test]
fn parse_merges() {
    let merges = Merges::parse("#version: 0.2\nĠ t\nĠt he\r\nh e\n").unwrap();
    let pieces = merges.iter().map(Merge::piece).collect::<Vec<_>>();
    assert_eq!(pieces, ["▁t", "▁the", "he"]);
    assert_eq!(merges.as_slice()[0].left, "▁");
    assert_eq!(merges.as_slice()[0].line, 2);
    assert_eq!(merges.as_slice()[2].line, 4);
}

#[test]
fn comments_never_produce_merges() {
    let merges = Merges::parse("# comment a b\na b\n  # indented\nc d").unwrap();
    let pieces = merges.iter().map(Merge::piece).collect::<Vec<_>>();
    assert_eq!(pieces, ["ab", "cd"]);
}

#[test]
fn malformed_lines() {
    for (text, line) in [
        ("a b\nabc\n", 2),
        ("a b c", 1),
        ("x y\na  b", 2),
        ("a b\n\nc d\n", 2),
        ("   \n", 1),
    ] {
        match Merges::parse(text) {
            Err(Error::MalformedMergeLine { line: l, .. }) => assert_eq!(l, line),
            other => panic!("{text:?} -> {other:?}"),
        }
    }
}

#[test]
fn blank_line_is_malformed() {
    match Merges::parse("a b\n\nc d\n") {
        Err(Error::MalformedMergeLine { line, text }) => {
            assert_eq!(line, 2);
            assert_eq!(text, "");
        }
        other => panic!("{other:?}"),
    }
}

#[test]
fn read_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "#version: 0.2").unwrap();
    writeln!(file, "Ġ a").unwrap();
    let merges = Merges::from_file(file.path()).unwrap();
    assert_eq!(merges.len(), 1);

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    bad.write_all(&[b'a', b' ', 0xff]).unwrap();
    assert!(matches!(
        Merges::from_file(bad.path()),
        Err(Error::NotUtf8 { .. })
    ));
}
