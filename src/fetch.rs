//! Fetching chunks of GenBank records from NCBI Entrez, with bounded
//! retries when the service asks us to slow down.

use std::io::Read;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use thiserror::Error;

use crate::chunk::Chunk;
use crate::reader::RecordReader;

pub const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 429
    #[error("Too many requests")]
    Throttled { retry_after: Option<Duration> },
    #[error("Transient failure: {0}")]
    Transient(String),
    #[error("Request failed: {0}")]
    Fatal(String),
}

/// Something that answers a batch of identifiers with a GenBank flat file
/// stream
pub trait BatchSource {
    fn fetch_batch(&mut self, ids: &[String]) -> Result<Box<dyn Read>, FetchError>;
}

impl<F> BatchSource for F
where
    F: FnMut(&[String]) -> Result<Box<dyn Read>, FetchError>,
{
    fn fetch_batch(&mut self, ids: &[String]) -> Result<Box<dyn Read>, FetchError> {
        self(ids)
    }
}

/// Connection settings for `EntrezClient`
#[derive(Debug, Clone)]
pub struct EntrezSettings {
    pub base_url: String,
    pub db: String,
    pub tool: String,
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EntrezSettings {
    fn default() -> Self {
        EntrezSettings {
            base_url: EFETCH_URL.into(),
            db: "nucleotide".into(),
            tool: env!("CARGO_PKG_NAME").into(),
            email: None,
            api_key: None,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Requests `gbwithparts` text from efetch. The identifiers travel in a
/// POST body since a 300 ID query string gets long.
#[derive(Debug)]
pub struct EntrezClient {
    client: Client,
    settings: EntrezSettings,
}

impl EntrezClient {
    pub fn new(settings: EntrezSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Fatal(e.to_string()))?;
        Ok(EntrezClient { client, settings })
    }

    fn form(&self, ids: &[String]) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("db", self.settings.db.clone()),
            ("id", ids.join(",")),
            ("rettype", "gbwithparts".to_owned()),
            ("retmode", "text".to_owned()),
            ("tool", self.settings.tool.clone()),
        ];
        if let Some(ref email) = self.settings.email {
            form.push(("email", email.clone()));
        }
        if let Some(ref key) = self.settings.api_key {
            form.push(("api_key", key.clone()));
        }
        form
    }
}

impl BatchSource for EntrezClient {
    fn fetch_batch(&mut self, ids: &[String]) -> Result<Box<dyn Read>, FetchError> {
        let response = self
            .client
            .post(&self.settings.base_url)
            .form(&self.form(ids))
            .send()
            .map_err(classify_request_error)?;
        Ok(Box::new(check_status(response)?))
    }
}

fn classify_request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        FetchError::Transient(e.to_string())
    } else {
        FetchError::Fatal(e.to_string())
    }
}

fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    Err(classify_status(status, retry_after))
}

fn classify_status(status: StatusCode, retry_after: Option<Duration>) -> FetchError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        FetchError::Throttled { retry_after }
    } else if status.is_server_error() {
        FetchError::Transient(format!("HTTP {}", status))
    } else {
        FetchError::Fatal(format!("HTTP {}", status))
    }
}

/// How long to back off when throttled, and for how many attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_throttle_retries: u32,
    pub cooldown: Duration,
    pub backoff_factor: u32,
    pub max_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_throttle_retries: 5,
            cooldown: Duration::from_secs(5),
            backoff_factor: 2,
            max_cooldown: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Cooldown before retry number `attempt` (0-based). A server supplied
    /// `Retry-After` is honoured if it asks for longer.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let factor = self.backoff_factor.saturating_pow(attempt);
        let backoff = self
            .cooldown
            .checked_mul(factor)
            .unwrap_or(self.max_cooldown)
            .min(self.max_cooldown);
        match retry_after {
            Some(r) => backoff.max(r),
            None => backoff,
        }
    }
}

/// Blocks the current thread. Exists so that cooldowns can be observed in
/// tests instead of waited out.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration)
    }
}

/// Turns a chunk into a stream of records, retrying throttled requests
#[derive(Debug)]
pub struct Fetcher<S: BatchSource> {
    source: S,
    policy: RetryPolicy,
}

impl<S: BatchSource> Fetcher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Fetcher { source, policy }
    }

    /// Fetches `chunk`, retrying on throttling until the policy gives up.
    /// `on_throttle` sees every cooldown before it is slept. Any other
    /// failure, or throttling past the retry limit, is returned and the
    /// chunk is left to the caller to abandon.
    pub fn fetch(
        &mut self,
        chunk: &Chunk,
        sleeper: &mut dyn Sleeper,
        mut on_throttle: impl FnMut(u32, Duration),
    ) -> Result<RecordReader<Box<dyn Read>>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.source.fetch_batch(chunk.ids()) {
                Ok(body) => return Ok(RecordReader::new(body)),
                Err(FetchError::Throttled { retry_after })
                    if attempt < self.policy.max_throttle_retries =>
                {
                    let delay = self.policy.delay(attempt, retry_after);
                    attempt += 1;
                    warn!(
                        "Too many requests for chunk {}, retrying in {}s (attempt {}/{})",
                        chunk.span(),
                        delay.as_secs_f32(),
                        attempt,
                        self.policy.max_throttle_retries
                    );
                    on_throttle(attempt, delay);
                    sleeper.sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::collections::VecDeque;

    /// Sleeps for no time and remembers what it was asked
    #[derive(Debug, Default)]
    pub struct RecordingSleeper(pub Vec<Duration>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.0.push(duration)
        }
    }

    /// Replies from a script, one entry per request
    pub struct ScriptedSource {
        pub replies: VecDeque<Result<&'static [u8], FetchError>>,
        pub requests: Vec<Vec<String>>,
    }

    impl ScriptedSource {
        pub fn new(replies: Vec<Result<&'static [u8], FetchError>>) -> Self {
            ScriptedSource {
                replies: replies.into(),
                requests: vec![],
            }
        }
    }

    impl BatchSource for ScriptedSource {
        fn fetch_batch(&mut self, ids: &[String]) -> Result<Box<dyn Read>, FetchError> {
            self.requests.push(ids.to_vec());
            match self.replies.pop_front() {
                Some(Ok(body)) => Ok(Box::new(body)),
                Some(Err(e)) => Err(e),
                None => Err(FetchError::Fatal("script exhausted".into())),
            }
        }
    }

    const RECORD: &[u8] = b"LOCUS       AB000001                   6 bp    DNA     linear   INV 01-JAN-2020
VERSION     AB000001.1
ORIGIN
        1 acgtac
//
";

    fn chunk() -> Chunk {
        Chunk::new(["AB000001.1"]).unwrap()
    }

    fn throttled() -> Result<&'static [u8], FetchError> {
        Err(FetchError::Throttled { retry_after: None })
    }

    #[test]
    fn backoff() {
        let policy = RetryPolicy::default();
        let secs: Vec<u64> = (0..8).map(|a| policy.delay(a, None).as_secs()).collect();
        assert_eq!(secs, vec![5, 10, 20, 40, 80, 120, 120, 120]);
        assert_eq!(
            policy.delay(0, Some(Duration::from_secs(30))),
            Duration::from_secs(30)
        );
        assert_eq!(
            policy.delay(3, Some(Duration::from_secs(1))),
            Duration::from_secs(40)
        );
        // no overflow for silly attempt counts
        assert_eq!(policy.delay(200, None), policy.max_cooldown);
    }

    #[test]
    fn status_classes() {
        match classify_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(7))) {
            FetchError::Throttled { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)))
            }
            x => panic!("{:?}", x),
        }
        match classify_status(StatusCode::BAD_GATEWAY, None) {
            FetchError::Transient(_) => {}
            x => panic!("{:?}", x),
        }
        match classify_status(StatusCode::BAD_REQUEST, None) {
            FetchError::Fatal(_) => {}
            x => panic!("{:?}", x),
        }
    }

    #[test]
    fn request_form() {
        let client = EntrezClient::new(EntrezSettings {
            email: Some("someone@example.org".into()),
            ..EntrezSettings::default()
        })
        .unwrap();
        let form = client.form(&["A1".to_owned(), "A2".to_owned()]);
        assert!(form.contains(&("id", "A1,A2".to_owned())));
        assert!(form.contains(&("rettype", "gbwithparts".to_owned())));
        assert!(form.contains(&("email", "someone@example.org".to_owned())));
        assert!(!form.iter().any(|(k, _)| *k == "api_key"));
    }

    #[test]
    fn retry_after_throttling() {
        let source = ScriptedSource::new(vec![throttled(), throttled(), Ok(RECORD)]);
        let mut fetcher = Fetcher::new(source, RetryPolicy::default());
        let mut sleeper = RecordingSleeper::default();
        let mut seen = vec![];
        let records: Vec<_> = fetcher
            .fetch(&chunk(), &mut sleeper, |attempt, _| seen.push(attempt))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(sleeper.0, vec![Duration::from_secs(5), Duration::from_secs(10)]);
        assert_eq!(fetcher.into_source().requests.len(), 3);
    }

    #[test]
    fn throttling_gives_up() {
        let policy = RetryPolicy {
            max_throttle_retries: 2,
            ..RetryPolicy::default()
        };
        let source = ScriptedSource::new(vec![throttled(), throttled(), throttled(), Ok(RECORD)]);
        let mut fetcher = Fetcher::new(source, policy);
        let mut sleeper = RecordingSleeper::default();
        match fetcher.fetch(&chunk(), &mut sleeper, |_, _| {}) {
            Err(FetchError::Throttled { .. }) => {}
            Err(e) => panic!("{:?}", e),
            Ok(_) => panic!("expected to give up"),
        }
        assert_eq!(sleeper.0.len(), 2);
        assert_eq!(fetcher.into_source().requests.len(), 3);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let source = ScriptedSource::new(vec![Err(FetchError::Transient("HTTP 502".into()))]);
        let mut fetcher = Fetcher::new(source, RetryPolicy::default());
        let mut sleeper = RecordingSleeper::default();
        assert!(fetcher.fetch(&chunk(), &mut sleeper, |_, _| {}).is_err());
        assert!(sleeper.0.is_empty());
    }

    #[test]
    fn closure_source() {
        let source = |ids: &[String]| -> Result<Box<dyn Read>, FetchError> {
            assert_eq!(ids, &["AB000001.1"]);
            Ok(Box::new(RECORD))
        };
        let mut fetcher = Fetcher::new(source, RetryPolicy::default());
        let record = fetcher
            .fetch(&chunk(), &mut RecordingSleeper::default(), |_, _| {})
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(record.id, "AB000001.1");
    }
}
