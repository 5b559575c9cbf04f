//! Final report assembly: library ordering and page counts.

use crate::types::{LibraryRecord, PageError, PageSummary, ScanReport};
use std::cmp::Ordering;

/// Textual tie-break key: `name@version` (empty version renders as
/// `name@`). Plain byte-wise comparison, no locale collation.
fn tie_break_key(lib: &LibraryRecord) -> String {
    format!("{}@{}", lib.name, lib.version.as_deref().unwrap_or(""))
}

/// Sort libraries for the report: vulnerability count descending, then
/// occurrences descending, then `name@version` ascending.
pub fn sort_libraries(libraries: &mut [LibraryRecord]) {
    libraries.sort_by(|a, b| {
        match b.vulnerability_count.cmp(&a.vulnerability_count) {
            Ordering::Equal => {}
            other => return other,
        }
        match b.occurrences.cmp(&a.occurrences) {
            Ordering::Equal => {}
            other => return other,
        }
        tie_break_key(a).cmp(&tie_break_key(b))
    });
}

/// Assemble the immutable scan report. `failed` is derived, never
/// tracked separately: every scanned page either succeeded or produced a
/// [`PageError`].
pub fn assemble(
    discovered: usize,
    scanned: usize,
    ok: usize,
    page_errors: Vec<PageError>,
    mut libraries: Vec<LibraryRecord>,
) -> ScanReport {
    sort_libraries(&mut libraries);

    ScanReport {
        pages: PageSummary {
            discovered,
            scanned,
            ok,
            failed: scanned - ok,
        },
        page_errors,
        libraries,
    }
}
