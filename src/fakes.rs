//! In-memory fakes for the HTTP and object-store seams (testing only).
//!
//! `ScriptedHttp` replays canned responses per `(method, url)`; the last
//! response of a route repeats forever. `MemoryObjectStore` keeps objects in
//! a map and lists them in key order like S3 does.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::TransportError;
use crate::http::{HttpFetch, HttpRequest, HttpResponse, Method};
use crate::storage::{ObjectStore, ObjectSummary};

type Reply = Result<HttpResponse, TransportError>;

// ---------------------------------------------------------------------------
// ScriptedHttp
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScriptedHttp {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method url`.
    pub fn respond(&self, method: Method, url: &str, status: u16, body: impl Into<String>) {
        self.push(method, url, Ok(HttpResponse::new(status, body)));
    }

    /// Queue a transport failure for `method url`.
    pub fn fail(&self, method: Method, url: &str, err: TransportError) {
        self.push(method, url, Err(err));
    }

    pub fn on_get(&self, url: &str, status: u16, body: impl Into<String>) {
        self.respond(Method::Get, url, status, body);
    }

    pub fn on_head(&self, url: &str, status: u16) {
        self.respond(Method::Head, url, status, "");
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// How many times `method url` was requested.
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    fn push(&self, method: Method, url: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(reply);
    }
}

impl HttpFetch for ScriptedHttp {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = (request.method, request.url.clone());
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(replies) if replies.len() > 1 => replies.pop_front().unwrap(),
            Some(replies) => replies
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "no scripted reply"))),
            None => Ok(HttpResponse::new(404, "no scripted route")),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryObjectStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: Mutex<HashMap<String, BTreeMap<String, (DateTime<Utc>, Vec<u8>)>>>,
    list_calls: Mutex<Vec<(String, Option<String>)>>,
    failure: Mutex<Option<TransportError>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, last_modified: DateTime<Utc>) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), (last_modified, Vec::new()));
    }

    /// Make every subsequent call fail with `err`.
    pub fn fail_with(&self, err: TransportError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn contents(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|(_, body)| body.clone())
    }

    /// `(bucket, prefix)` of every listing made so far.
    pub fn list_calls(&self) -> Vec<(String, Option<String>)> {
        self.list_calls.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), TransportError> {
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectSummary>, TransportError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((bucket.to_string(), prefix.map(str::to_string)));
        self.check_failure()?;

        let buckets = self.buckets.lock().unwrap();
        let objects = match buckets.get(bucket) {
            Some(objects) => objects,
            None => return Ok(Vec::new()),
        };

        Ok(objects
            .iter()
            .filter(|(key, _)| prefix.map_or(true, |p| key.starts_with(p)))
            .map(|(key, (last_modified, _))| ObjectSummary::new(key.clone(), *last_modified))
            .collect())
    }

    fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), TransportError> {
        self.check_failure()?;
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), (Utc::now(), body));
        Ok(())
    }
}
