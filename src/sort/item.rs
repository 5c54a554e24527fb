//! The spill-file record: one `key<TAB>count` line per unique key.

use crate::{ClonescanError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyItem {
    pub key: String,
    pub count: u64,
}

impl KeyItem {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        KeyItem {
            key: key.into(),
            count,
        }
    }

    pub fn parse(line: &str) -> Result<KeyItem> {
        let (key, count) = line
            .split_once('\t')
            .ok_or_else(|| ClonescanError::Parse(format!("bad key line: {:?}", line)))?;
        let count = count
            .trim()
            .parse::<u64>()
            .map_err(|_| ClonescanError::Parse(format!("bad key count: {:?}", line)))?;
        Ok(KeyItem::new(key, count))
    }
}

/// Line-at-a-time reader over a sorted key stream.
pub struct KeyReader {
    buf: BufReader<Box<dyn Read + Send>>,
}

impl KeyReader {
    pub fn new(input: Box<dyn Read + Send>) -> Self {
        KeyReader {
            buf: BufReader::new(input),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(KeyReader::new(Box::new(file)))
    }

    pub fn next(&mut self) -> Result<Option<KeyItem>> {
        loop {
            let mut line = String::new();
            if self.buf.read_line(&mut line)? == 0 {
                return Ok(None);
            }

            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }

            return KeyItem::parse(trimmed).map(Some);
        }
    }
}

pub struct KeyWriter<W: Write> {
    buf: BufWriter<W>,
}

impl KeyWriter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(KeyWriter {
            buf: BufWriter::new(File::create(path)?),
        })
    }
}

impl<W: Write> KeyWriter<W> {
    pub fn write(&mut self, item: &KeyItem) -> Result<()> {
        writeln!(self.buf, "{}\t{}", item.key, item.count)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.buf.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_round_trip() {
        let item = KeyItem::new("ACGT", 42);

        let mut bytes = Vec::new();
        {
            let mut w = KeyWriter {
                buf: BufWriter::new(&mut bytes),
            };
            w.write(&item).unwrap();
            w.finish().unwrap();
        }

        let line = String::from_utf8(bytes).unwrap();
        assert_eq!(KeyItem::parse(line.trim_end()).unwrap(), item);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(KeyItem::parse("no-tab-here").is_err());
        assert!(KeyItem::parse("ACGT\tnotanumber").is_err());
    }

    #[test]
    fn test_reader_skips_blank_lines() {
        let doc = "AAA\t1\n\nCCC\t2\n";
        let mut reader = KeyReader::new(Box::new(std::io::Cursor::new(doc.as_bytes().to_vec())));

        assert_eq!(reader.next().unwrap().unwrap(), KeyItem::new("AAA", 1));
        assert_eq!(reader.next().unwrap().unwrap(), KeyItem::new("CCC", 2));
        assert!(reader.next().unwrap().is_none());
    }
}
