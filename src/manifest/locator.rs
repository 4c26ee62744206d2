//! Selection policy for the authoritative manifest inside an archive.
//!
//! Archives are accepted in two shapes only: the manifest sits at the
//! archive root, or the archive has exactly one top-level directory which
//! holds the manifest. Anything else is either ambiguous (several
//! candidates compete) or silently not found.

use tracing::trace;

use super::ArchiveIndex;

/// Outcome of [`locate_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The authoritative entry and its content, read once while checking
    /// that it is readable
    Found { index: usize, content: Vec<u8> },
    NotFound,
    /// More than one candidate exists and none may be picked
    Ambiguous,
}

/// Find the entry named `file_name` that best represents the archive root.
///
/// A readable root-level entry always wins. Otherwise the directory listing
/// is scanned once, tracking the distinct top-level paths and the number of
/// entries whose base name is `file_name`, and the manifest is looked up
/// inside the single top-level directory.
pub async fn locate_file<A>(archive: &A, file_name: &str) -> Location
where
    A: ArchiveIndex + ?Sized,
{
    if let Some(index) = archive.locate_name(file_name)
        && let Some(content) = read_readable(archive, index).await
    {
        trace!(index, "manifest found at archive root");
        return Location::Found { index, content };
    }

    let mut scan = Scan::default();
    for index in 0..archive.entry_count() {
        let Some(name) = archive.name_at(index) else {
            continue;
        };
        if let Some(location) = scan.fold(name, file_name) {
            trace!(index, entry = name, ?location, "scan stopped early");
            return location;
        }
    }

    scan.resolve(archive, file_name).await
}

/// Accumulated state of the directory scan
#[derive(Debug, Default)]
struct Scan {
    /// Distinct top-level paths, in discovery order
    top_level: Vec<String>,
    /// Entries whose base name matches, at any depth
    candidates: usize,
}

impl Scan {
    /// Insert a top-level path, returning true once more than one is known.
    fn record(&mut self, path: String) -> bool {
        if !self.top_level.contains(&path) {
            self.top_level.push(path);
        }
        self.top_level.len() > 1
    }

    fn fold(&mut self, name: &str, file_name: &str) -> Option<Location> {
        if basename(name) == file_name {
            self.candidates += 1;
        }

        let dir = dirname(name);

        // Entry sits directly under the root, directory markers included
        if dir == "." {
            if self.record(name.to_owned()) {
                return Some(if self.candidates > 1 {
                    Location::Ambiguous
                } else {
                    Location::NotFound
                });
            }
            return None;
        }

        // Entry one level deep, for archives without directory records
        if !dir.contains(is_separator) {
            if self.record(format!("{dir}/")) {
                return Some(Location::NotFound);
            }
            if self.candidates > 1 {
                return Some(Location::Ambiguous);
            }
        }

        None
    }

    async fn resolve<A>(self, archive: &A, file_name: &str) -> Location
    where
        A: ArchiveIndex + ?Sized,
    {
        let Some(root) = self.top_level.first() else {
            return Location::NotFound;
        };
        let Some(index) = archive.locate_name(&format!("{root}{file_name}")) else {
            return Location::NotFound;
        };

        if self.candidates > 1 {
            return Location::Ambiguous;
        }
        match read_readable(archive, index).await {
            Some(content) => Location::Found { index, content },
            None => Location::NotFound,
        }
    }
}

/// Content of the entry at `index`, or `None` when it cannot be read.
async fn read_readable<A>(archive: &A, index: usize) -> Option<Vec<u8>>
where
    A: ArchiveIndex + ?Sized,
{
    match archive.read_index(index).await {
        Ok(content) => Some(content),
        Err(err) => {
            trace!(index, error = %err, "entry is not readable");
            None
        }
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Parent path of `path`; `"."` when there is none.
fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    if trimmed.is_empty() {
        // Empty, or nothing but separators
        return if path.is_empty() { "." } else { &path[..1] };
    }

    match trimmed.rfind(is_separator) {
        None => ".",
        Some(pos) => {
            let parent = trimmed[..pos].trim_end_matches(is_separator);
            if parent.is_empty() {
                &trimmed[..1]
            } else {
                parent
            }
        }
    }
}

/// Final segment of `path`, ignoring trailing separators.
fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    match trimmed.rfind(is_separator) {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}
