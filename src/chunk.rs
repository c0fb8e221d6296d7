//! Splitting the accession list into request-sized batches

use std::fs;
use std::path::Path;

use crate::errors::HarvestError;

/// An ordered batch of accession identifiers, fetched with one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk(Vec<String>);

impl Chunk {
    /// A single chunk of the given identifiers, trimmed and with blank ones
    /// dropped. Gives `None` when nothing is left, a chunk is never empty.
    pub fn new<I>(ids: I) -> Option<Chunk>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let ids: Vec<String> = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_owned())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            None
        } else {
            Some(Chunk(ids))
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A short description for log messages
    pub fn span(&self) -> String {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) if first != last => format!("{}..{}", first, last),
            (Some(first), _) => first.clone(),
            _ => String::new(),
        }
    }
}


/// Lazily groups identifiers into chunks, see `chunk_ids`
#[derive(Debug)]
pub struct Chunks<I> {
    ids: I,
    size: usize,
}

impl<I, S> Iterator for Chunks<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let mut chunk = Vec::with_capacity(self.size);
        for id in self.ids.by_ref() {
            let id = id.as_ref().trim();
            if id.is_empty() {
                continue;
            }
            chunk.push(id.to_owned());
            if chunk.len() == self.size {
                break;
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(Chunk(chunk))
        }
    }
}

/// Splits `ids` into consecutive chunks of `size`; only the last one may be
/// shorter. Identifiers are trimmed and blank ones dropped, duplicates are
/// passed through. Concatenating the chunks gives back the cleaned input.
///
/// Panics if `size` is 0, which `HarvestConfig::validate` rejects.
pub fn chunk_ids<I>(ids: I, size: usize) -> Chunks<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    assert!(size > 0, "chunk size must be positive");
    Chunks {
        ids: ids.into_iter(),
        size,
    }
}

/// Reads an accession list, one identifier per line
pub fn read_id_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>, HarvestError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| HarvestError::Input {
        path: path.to_owned(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("MN{:06}.1", i)).collect()
    }

    #[test]
    fn chunk_count() {
        for &(n, size) in &[(0, 300), (1, 300), (300, 300), (301, 300), (1000, 300), (7, 1), (7, 3)] {
            let input = ids(n);
            let chunks: Vec<Chunk> = chunk_ids(&input, size).collect();
            assert_eq!(chunks.len(), n.div_ceil(size), "{} ids in chunks of {}", n, size);
            assert!(chunks.iter().all(|c| c.len() <= size && !c.is_empty()));
            let rejoined: Vec<String> = chunks.iter().flat_map(|c| c.ids().to_vec()).collect();
            assert_eq!(rejoined, input);
        }
    }

    #[test]
    fn blank_ids_are_dropped() {
        let input = ["AB000001.1", "", "  ", " AB000002.1 ", "AB000001.1"];
        let chunks: Vec<Chunk> = chunk_ids(input, 2).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].ids(), &["AB000001.1", "AB000002.1"]);
        // duplicates are not ours to remove
        assert_eq!(chunks[1].ids(), &["AB000001.1"]);
    }

    #[test]
    fn span() {
        let chunk = Chunk::new(["A1", "A2", "A3"]).unwrap();
        assert_eq!(chunk.span(), "A1..A3");
        let chunk = Chunk::new(["A1"]).unwrap();
        assert_eq!(chunk.span(), "A1");
    }

    #[test]
    fn no_empty_chunk() {
        assert_eq!(Chunk::new(Vec::<String>::new()), None);
        assert_eq!(Chunk::new(["", "  ", "\t"]), None);
        let chunk = Chunk::new(["", " A1 "]).unwrap();
        assert_eq!(chunk.ids(), &["A1"]);
        assert!(!chunk.is_empty());
        assert_eq!(chunk_ids(["", " "], 2).next(), None);
    }

    #[test]
    #[should_panic]
    fn zero_size() {
        let _ = chunk_ids(ids(3), 0);
    }

    #[test]
    fn id_list_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "MN000001.1\n\n  MN000002.1\r\nMN000003.1").unwrap();
        let list = read_id_list(file.path()).unwrap();
        assert_eq!(list, vec!["MN000001.1", "MN000002.1", "MN000003.1"]);
        match read_id_list(file.path().with_extension("missing")) {
            Err(HarvestError::Input { .. }) => {}
            x => panic!("{:?}", x),
        }
    }
}
