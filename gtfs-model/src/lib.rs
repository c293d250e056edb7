/*! Typed in-memory model of a static [GTFS](https://gtfs.org/) feed.

This crate reads the tabular files of a feed (from a directory or a zip
archive), deserializes them into Rust structs and verifies the relationships
between them.

## Design decisions

### Two representations

The [RawFeed] representation holds the rows as close as possible to their
tabular form. [Feed] re-organizes the data: stop times live inside their
[Trip], objects are keyed by id, and every cross-relation reference has been
verified. Building a [Feed] is all-or-nothing; nothing of a broken feed is
observable.

### Time representation

Stop times are offsets in seconds from the service day's nominal midnight,
and hours at or above 24 are preserved as offsets above 86399 rather than
wrapped: a departure at "25:30:00" belongs to the same service day as one at
"23:30:00", half an hour earlier. See [parse_clock_time].

### Use of enums

Integer codes are represented as Rust enums ([RouteMode], [LocationType],
[Exception]); unknown codes are kept with their value, not errored.
*/
#![warn(missing_docs)]

mod enums;
pub mod error;
mod feed;
mod objects;
mod raw_feed;
mod serde_helpers;


pub use error::Error;
pub use feed::Feed;
pub use objects::*;
pub use raw_feed::RawFeed;
pub use serde_helpers::{format_clock_time, parse_clock_time};
