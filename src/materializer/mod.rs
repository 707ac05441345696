//! Response materializer
//!
//! This module turns one application response into at most one file:
//! - Invoking the application, with a conditional header on repeat visits
//! - Mapping the URL path to a destination with [`map_path`]
//! - Detecting file/directory conflicts (reported as status 999)
//! - Draining every body shape to disk and releasing it on every exit path

mod path_mapper;

pub use path_mapper::map_path;

use crate::app::{find_header, Application, BodyReader, Request, Response};
use crate::config::OutputConfig;
use crate::state::VisitOutcome;
use crate::url::CrawlTarget;
use std::any::Any;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Sentinel status: the response could not be written because of a
/// file/directory name conflict
pub const CONFLICT_STATUS: u16 = 999;

/// Result of materializing one crawl target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub target: CrawlTarget,

    /// Application status, or 500 / 999 for local failures
    pub status: u16,

    pub headers: Vec<(String, String)>,

    /// Destination file, `None` when nothing was written
    pub file: Option<PathBuf>,
}

impl Visit {
    fn without_file(target: &CrawlTarget, status: u16, headers: Vec<(String, String)>) -> Self {
        Self {
            target: target.clone(),
            status,
            headers,
            file: None,
        }
    }

    /// Returns the first header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn location(&self) -> Option<&str> {
        self.header("Location")
    }

    pub fn outcome(&self) -> VisitOutcome {
        VisitOutcome::from_visit(self.status, self.file.is_some())
    }
}

/// What a previous successful visit left behind
#[derive(Debug, Clone)]
struct PriorVisit {
    last_modified: Option<String>,
    file: PathBuf,
}

enum WriteFailure {
    Conflict,
    Io(io::Error),
}

impl From<io::Error> for WriteFailure {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            ErrorKind::NotADirectory | ErrorKind::IsADirectory | ErrorKind::AlreadyExists => {
                WriteFailure::Conflict
            }
            _ => WriteFailure::Io(e),
        }
    }
}

/// Writes application responses under a destination root
pub struct Materializer {
    root: PathBuf,
    index_name: String,
    prior_visits: HashMap<String, PriorVisit>,
}

impl Materializer {
    pub fn new(root: impl Into<PathBuf>, index_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_name: index_name.into(),
            prior_visits: HashMap::new(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.destination, &config.index_name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination file for a URL path
    pub fn destination(&self, url_path: &str) -> PathBuf {
        map_path(&self.root, url_path, &self.index_name)
    }

    /// Invokes the application for `target` and writes the response
    ///
    /// Never fails: application errors and panics become status 500, path
    /// conflicts become [`CONFLICT_STATUS`], and in both cases no file is
    /// reported.
    pub fn materialize(&mut self, app: &dyn Application, target: &CrawlTarget) -> Visit {
        let mut request = Request::get(target);
        if let Some(token) = self
            .prior_visits
            .get(&target.path)
            .and_then(|prior| prior.last_modified.clone())
        {
            request = request.with_header("If-Modified-Since", token);
        }

        let response = match invoke(app, &request) {
            Some(response) => response,
            None => return Visit::without_file(target, 500, Vec::new()),
        };

        let Response {
            status,
            headers,
            body,
        } = response;
        let mut reader = body.into_reader();

        match status {
            304 => {
                close_body(&mut reader);
                let file = self
                    .prior_visits
                    .get(&target.path)
                    .map(|prior| prior.file.clone());
                if file.is_none() {
                    tracing::debug!("{} answered 304 without a prior 200 visit", target);
                }
                Visit {
                    target: target.clone(),
                    status,
                    headers,
                    file,
                }
            }

            200 => {
                let destination = self.destination(&target.path);
                match write_body(&self.root, &destination, &mut reader) {
                    Ok(()) => {
                        self.prior_visits.insert(
                            target.path.clone(),
                            PriorVisit {
                                last_modified: find_header(&headers, "Last-Modified")
                                    .map(str::to_string),
                                file: destination.clone(),
                            },
                        );
                        Visit {
                            target: target.clone(),
                            status,
                            headers,
                            file: Some(destination),
                        }
                    }
                    Err(WriteFailure::Conflict) => {
                        tracing::warn!(
                            "Path conflict for {}: {} clashes with an existing file or directory",
                            target,
                            destination.display()
                        );
                        Visit::without_file(target, CONFLICT_STATUS, headers)
                    }
                    Err(WriteFailure::Io(e)) => {
                        tracing::error!(
                            "Failed to write {} for {}: {}",
                            destination.display(),
                            target,
                            e
                        );
                        Visit::without_file(target, 500, headers)
                    }
                }
            }

            _ => {
                close_body(&mut reader);
                Visit::without_file(target, status, headers)
            }
        }
    }
}

/// Calls the application, turning errors and panics into `None`
fn invoke(app: &dyn Application, request: &Request) -> Option<Response> {
    match panic::catch_unwind(AssertUnwindSafe(|| app.call(request))) {
        Ok(Ok(response)) => Some(response),
        Ok(Err(e)) => {
            tracing::warn!("Application failed for {}: {:#}", request.path, e);
            None
        }
        Err(payload) => {
            tracing::warn!(
                "Application panicked for {}: {}",
                request.path,
                panic_message(&*payload)
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Releases the body; a panicking close is logged and otherwise ignored
fn close_body(reader: &mut BodyReader) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| reader.close())) {
        tracing::warn!("Response body panicked on close: {}", panic_message(&*payload));
    }
}

/// Copies the body into `file`; a panic inside the body source is an I/O error
fn drain_body(reader: &mut BodyReader, file: &mut File) -> io::Result<u64> {
    panic::catch_unwind(AssertUnwindSafe(|| io::copy(reader, file))).unwrap_or_else(|payload| {
        Err(io::Error::new(
            ErrorKind::Other,
            format!("body panicked: {}", panic_message(&*payload)),
        ))
    })
}

/// Drains `reader` into `destination`, creating parent directories
///
/// Every directory between `root` and the destination must either be missing
/// or already be a directory, and the destination itself must not be one.
/// The reader is closed before returning on every path, and a partial file
/// is removed when draining fails or panics.
fn write_body(root: &Path, destination: &Path, reader: &mut BodyReader) -> Result<(), WriteFailure> {
    let result = prepare_destination(root, destination).and_then(|()| {
        let mut file = File::create(destination)?;
        if let Err(e) = drain_body(reader, &mut file) {
            drop(file);
            let _ = fs::remove_file(destination);
            return Err(WriteFailure::Io(e));
        }
        Ok(())
    });

    close_body(reader);
    result
}

fn prepare_destination(root: &Path, destination: &Path) -> Result<(), WriteFailure> {
    if destination.is_dir() {
        return Err(WriteFailure::Conflict);
    }

    let parent = match destination.parent() {
        Some(parent) => parent,
        None => return Ok(()),
    };

    if let Ok(relative) = parent.strip_prefix(root) {
        let mut current = root.to_path_buf();
        for component in relative.components() {
            current.push(component);
            match fs::metadata(&current) {
                Ok(metadata) if !metadata.is_dir() => return Err(WriteFailure::Conflict),
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => return Err(WriteFailure::Io(e)),
            }
        }
    }

    fs::create_dir_all(parent)?;
    Ok(())
}
