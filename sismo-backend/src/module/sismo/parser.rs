///! Event table HTML parser
///!
///! Extracts rows from the `#sismos` table of the listing page. Malformed
///! rows are dropped, never reported as errors.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::EventRecord;

const ROW_SELECTOR: &str = "#sismos tr";
const CELL_SELECTOR: &str = "td";

/// Number, date, time, depth, magnitude, latitude, longitude, location
const EXPECTED_CELLS: usize = 8;

fn cell_text(td: ElementRef<'_>) -> String {
    td.text().collect::<String>().trim().to_string()
}

/// Parse the listing page into records, in document order.
///
/// The first row of the table is the header and is always skipped.
pub fn parse_events_html(html: &str) -> Vec<EventRecord> {
    let (row_sel, td_sel) = match (Selector::parse(ROW_SELECTOR), Selector::parse(CELL_SELECTOR)) {
        (Ok(row), Ok(td)) => (row, td),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Invalid event table selector: {}", e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let mut events = Vec::new();

    for (index, tr) in document.select(&row_sel).enumerate() {
        if index == 0 {
            continue;
        }

        let cells: Vec<String> = tr.select(&td_sel).map(cell_text).collect();

        if cells.len() != EXPECTED_CELLS {
            debug!("Skipping row {} with {} cells", index, cells.len());
            continue;
        }
        if cells[0].is_empty() {
            debug!("Skipping row {} without an event number", index);
            continue;
        }

        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();
        events.push(EventRecord {
            id:        next(),
            date:      next(),
            time:      next(),
            depth:     next(),
            magnitude: next(),
            latitude:  next(),
            longitude: next(),
            location:  next(),
        });
    }

    debug!("Parsed {} events from listing", events.len());
    events
}
