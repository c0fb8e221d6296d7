//! Run configuration: the three lists that decide what is extracted, and
//! the knobs of the fetch loop.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::fetch::RetryPolicy;
use crate::writer::TableLayout;
use crate::FeatureKind;

/// Names under which COI turns up in `/gene` and `/product` qualifiers
pub const DEFAULT_RECOGNITION: &[&str] = &[
    "CO1",
    "COI",
    "COXI",
    "COX1",
    "MT-CO1",
    "MT-COX1",
    "cox",
    "coi",
    "cox1",
    "cytochrome oxidase subunit I",
    "cytochrome c oxidase subunit 1",
    "cytochrome oxidase subunit 1",
    "cytochrome c oxidase subunit I",
    "CoxI",
    "Cox1",
    "co1",
    "coI",
];

pub const DEFAULT_FEATURE_TYPES: &[&str] = &["CDS", "gene"];

pub const DEFAULT_HEADERS: &[&str] = &[
    "accession",
    "collected_by",
    "collection_date",
    "gene",
    "lat_lon",
    "organism",
    "sequence",
    "taxonomy",
    "notes",
    "country",
];

pub const DEFAULT_CHUNK_SIZE: usize = 300;
pub const DEFAULT_PACE_EVERY: usize = 20;
pub const DEFAULT_PACE_PAUSE: Duration = Duration::from_secs(20);

/// Qualifier values accepted as a name of the target gene. Matching is
/// exact, case included.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionList(Vec<String>);

impl RecognitionList {
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|name| name == value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for RecognitionList {
    fn default() -> Self {
        DEFAULT_RECOGNITION.iter().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for RecognitionList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut names: Vec<String> = Vec::new();
        for name in iter {
            let name = name.as_ref();
            if !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }
        RecognitionList(names)
    }
}

/// Feature kinds a match may come from
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTypeList(Vec<FeatureKind>);

impl FeatureTypeList {
    pub fn contains(&self, kind: &FeatureKind) -> bool {
        self.0.contains(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FeatureTypeList {
    fn default() -> Self {
        DEFAULT_FEATURE_TYPES.iter().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for FeatureTypeList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FeatureTypeList(iter.into_iter().map(|s| FeatureKind::from(s.as_ref())).collect())
    }
}

/// Table columns, in order
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderList(Vec<String>);

impl HeaderList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for HeaderList {
    fn default() -> Self {
        DEFAULT_HEADERS.iter().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for HeaderList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        HeaderList(iter.into_iter().map(|s| s.as_ref().to_owned()).collect())
    }
}

/// Proactive rate limiting between chunks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    /// Pause after this many chunks, counting abandoned ones
    pub every: usize,
    pub pause: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            every: DEFAULT_PACE_EVERY,
            pause: DEFAULT_PACE_PAUSE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub recognition: RecognitionList,
    pub feature_types: FeatureTypeList,
    pub headers: HeaderList,
    pub chunk_size: usize,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
    pub layout: TableLayout,
    /// Log the IDs of abandoned chunks as `Fetch failed`
    pub log_fetch_failures: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            recognition: RecognitionList::default(),
            feature_types: FeatureTypeList::default(),
            headers: HeaderList::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            pacing: Pacing::default(),
            retry: RetryPolicy::default(),
            layout: TableLayout::default(),
            log_fetch_failures: false,
        }
    }
}

impl HarvestConfig {
    pub fn recognition(mut self, recognition: RecognitionList) -> Self {
        self.recognition = recognition;
        self
    }

    pub fn feature_types(mut self, feature_types: FeatureTypeList) -> Self {
        self.feature_types = feature_types;
        self
    }

    pub fn headers(mut self, headers: HeaderList) -> Self {
        self.headers = headers;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn layout(mut self, layout: TableLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn log_fetch_failures(mut self, log: bool) -> Self {
        self.log_fetch_failures = log;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.recognition.is_empty() {
            return Err(ConfigError::EmptyList("recognition"));
        }
        if self.feature_types.is_empty() {
            return Err(ConfigError::EmptyList("feature type"));
        }
        if self.headers.is_empty() {
            return Err(ConfigError::EmptyList("header"));
        }
        Ok(())
    }
}

/// Reads an override list: one entry per line, surrounding whitespace
/// trimmed, blank lines skipped
pub fn load_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound(path.to_owned()),
        _ => ConfigError::Unreadable {
            path: path.to_owned(),
            source: e,
        },
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.recognition.len(), 17);
        assert!(config.recognition.contains("COI"));
        assert!(config.recognition.contains("cytochrome c oxidase subunit I"));
        assert!(!config.recognition.contains("COII"));
        assert!(config.feature_types.contains(&feature_kind!("CDS")));
        assert!(config.feature_types.contains(&feature_kind!("gene")));
        assert!(!config.feature_types.contains(&feature_kind!("source")));
        assert_eq!(config.headers.len(), 10);
        assert_eq!(config.chunk_size, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid() {
        match HarvestConfig::default().chunk_size(0).validate() {
            Err(ConfigError::ZeroChunkSize) => {}
            x => panic!("{:?}", x),
        }
        let empty: Vec<&str> = vec![];
        match HarvestConfig::default()
            .headers(empty.into_iter().collect())
            .validate()
        {
            Err(ConfigError::EmptyList("header")) => {}
            x => panic!("{:?}", x),
        }
    }

    #[test]
    fn recognition_list_is_deduplicated() {
        let list: RecognitionList = ["COI", "COX1", "COI"].iter().collect();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn load_override_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "  COI \n\nCOX1\r\n\tMT-CO1\n").unwrap();
        let list = load_list(file.path()).unwrap();
        assert_eq!(list, vec!["COI", "COX1", "MT-CO1"]);
    }

    #[test]
    fn load_missing_list() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        match load_list(&missing) {
            Err(ConfigError::NotFound(path)) => assert_eq!(path, missing),
            x => panic!("{:?}", x),
        }
        assert_eq!(
            ConfigError::NotFound(missing.clone()).to_string(),
            format!("File was not found: {}", missing.display())
        );
    }
}
