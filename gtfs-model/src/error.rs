//! Module for the error management
use thiserror::Error;

/// An error that can occur when reading or validating a GTFS feed.
///
/// Loading is all-or-nothing: any of these aborts the load and no partially
/// constructed [crate::Feed] is observable.
#[derive(Error, Debug)]
pub enum Error {
    /// A mandatory file is not present in the feed
    #[error("could not find file {0}")]
    MissingFile(String),
    /// The feed defines no service days at all
    #[error("neither calendar.txt nor calendar_dates.txt is present")]
    MissingCalendar,
    /// A file references an id that is not present
    #[error("the id {0} is not known")]
    ReferenceError(String),
    /// Two rows of the same relation share an identifier
    #[error("duplicate id {0}")]
    DuplicateId(String),
    /// The given path to the feed is neither a file nor a directory
    #[error("could not read feed: {0} is neither a file nor a directory")]
    NotFileNorDirectory(String),
    /// The time is not given in the HH:MM:SS format
    #[error("'{0}' is not a valid time; HH:MM:SS format is expected")]
    InvalidTime(String),
    /// A stop's coordinates are outside the valid WGS84 ranges
    #[error("stop {0} has coordinates outside the valid latitude/longitude range")]
    InvalidCoordinate(String),
    /// stop_sequence values must strictly increase within a trip
    #[error("trip {0}: stop_sequence values must be strictly increasing")]
    StopSequenceOrder(String),
    /// A vehicle cannot depart from a stop before arriving at it
    #[error("trip {trip_id}: departure before arrival at stop_sequence {stop_sequence}")]
    DepartureBeforeArrival {
        /// Trip the offending stop time belongs to
        trip_id: String,
        /// Sequence index of the offending stop time
        stop_sequence: u32,
    },
    /// Generic Input/Output error while reading a file
    #[error("impossible to read file")]
    IO(#[from] std::io::Error),
    /// Impossible to read a file
    #[error("impossible to read '{file_name}'")]
    NamedFileIO {
        /// The file name that could not be read
        file_name: String,
        /// The initial error that caused the unability to read the file
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Impossible to read a CSV file
    #[error("impossible to read csv file '{file_name}'")]
    Csv {
        /// File name that could not be parsed as CSV
        file_name: String,
        /// The initial error by the csv library
        #[source]
        source: csv::Error,
    },
    /// Error when trying to unzip the feed archive
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
