use crate::objects::*;
use crate::Error;
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Data structure that maps the GTFS tabular files with little intelligence
///
/// Each relation is kept as close to its file as possible so that a schema
/// problem can be reported with the file it came from. To manipulate the
/// transit data, [crate::Feed] is the structure to use.
#[derive(Debug)]
pub struct RawFeed {
    /// All Calendar, None if the file was absent as it is not mandatory
    pub calendar: Option<Result<Vec<Calendar>, Error>>,
    /// All Calendar dates, None if the file was absent as it is not mandatory
    pub calendar_dates: Option<Result<Vec<CalendarDate>, Error>>,
    /// All Stops
    pub stops: Result<Vec<Stop>, Error>,
    /// All Routes
    pub routes: Result<Vec<Route>, Error>,
    /// All Trips
    pub trips: Result<Vec<RawTrip>, Error>,
    /// All StopTimes
    pub stop_times: Result<Vec<RawStopTime>, Error>,
    /// All shape points, None if the file was absent as it is not mandatory
    pub shapes: Option<Result<Vec<Shape>, Error>>,
}

impl Default for RawFeed {
    fn default() -> Self {
        RawFeed {
            calendar: None,
            calendar_dates: None,
            stops: Ok(Vec::new()),
            routes: Ok(Vec::new()),
            trips: Ok(Vec::new()),
            stop_times: Ok(Vec::new()),
            shapes: None,
        }
    }
}

impl RawFeed {
    /// Reads the raw feed from a local zip archive or local directory
    pub fn from_path<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let p = path.as_ref();
        if p.is_file() {
            let reader = File::open(p)?;
            Self::from_reader(reader)
        } else if p.is_dir() {
            Self::from_directory(p)
        } else {
            Err(Error::NotFileNorDirectory(format!("{}", p.display())))
        }
    }

    fn from_directory(p: &Path) -> Result<Self, Error> {
        // Calendar files are not mandatory on their own: we use None if they
        // don't exist, not an Error. Whether at least one of them is present
        // is checked when the typed feed is built.
        Ok(RawFeed {
            calendar: read_objs_from_optional_path(p, "calendar.txt"),
            calendar_dates: read_objs_from_optional_path(p, "calendar_dates.txt"),
            stops: read_objs_from_path(p.join("stops.txt")),
            routes: read_objs_from_path(p.join("routes.txt")),
            trips: read_objs_from_path(p.join("trips.txt")),
            stop_times: read_objs_from_path(p.join("stop_times.txt")),
            shapes: read_objs_from_optional_path(p, "shapes.txt"),
        })
    }

    /// Reads a zipped feed from any object implementing [std::io::Read] and [std::io::Seek]
    pub fn from_reader<T: std::io::Read + std::io::Seek>(reader: T) -> Result<Self, Error> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut file_mapping = HashMap::new();

        for i in 0..archive.len() {
            let archive_file = archive.by_index(i)?;

            for feed_file in &[
                "calendar.txt",
                "calendar_dates.txt",
                "routes.txt",
                "stops.txt",
                "stop_times.txt",
                "trips.txt",
                "shapes.txt",
            ] {
                let path = Path::new(archive_file.name());
                if path.file_name() == Some(std::ffi::OsStr::new(feed_file)) {
                    file_mapping.insert(*feed_file, i);
                    break;
                }
            }
        }

        Ok(RawFeed {
            calendar: read_optional_file(&file_mapping, &mut archive, "calendar.txt"),
            calendar_dates: read_optional_file(&file_mapping, &mut archive, "calendar_dates.txt"),
            stops: read_file(&file_mapping, &mut archive, "stops.txt"),
            routes: read_file(&file_mapping, &mut archive, "routes.txt"),
            trips: read_file(&file_mapping, &mut archive, "trips.txt"),
            stop_times: read_file(&file_mapping, &mut archive, "stop_times.txt"),
            shapes: read_optional_file(&file_mapping, &mut archive, "shapes.txt"),
        })
    }

    /// Logs how many rows each relation holds. Mostly to be sure that everything was read
    pub fn log_stats(&self) {
        info!("  Stops: {}", mandatory_file_summary(&self.stops));
        info!("  Routes: {}", mandatory_file_summary(&self.routes));
        info!("  Trips: {}", mandatory_file_summary(&self.trips));
        info!("  Stop times: {}", mandatory_file_summary(&self.stop_times));
        info!("  Calendar: {}", optional_file_summary(&self.calendar));
        info!(
            "  Calendar dates: {}",
            optional_file_summary(&self.calendar_dates)
        );
        info!("  Shapes: {}", optional_file_summary(&self.shapes));
    }
}

fn mandatory_file_summary<T>(objs: &Result<Vec<T>, Error>) -> String {
    match objs {
        Ok(vec) => format!("{} rows", vec.len()),
        Err(e) => format!("could not read: {}", e),
    }
}

fn optional_file_summary<T>(objs: &Option<Result<Vec<T>, Error>>) -> String {
    match objs {
        Some(objs) => mandatory_file_summary(objs),
        None => "file not present".to_string(),
    }
}

fn read_objs<T, O>(mut reader: T, file_name: &str) -> Result<Vec<O>, Error>
where
    for<'de> O: Deserialize<'de>,
    T: std::io::Read,
{
    let mut bom = [0; 3];
    reader.read_exact(&mut bom).map_err(|e| Error::NamedFileIO {
        file_name: file_name.to_owned(),
        source: Box::new(e),
    })?;

    let chained = if bom != [0xefu8, 0xbbu8, 0xbfu8] {
        bom.chain(reader)
    } else {
        [].chain(reader)
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_reader(chained);
    // We store the headers to be able to deserialize by column name
    let headers = reader
        .headers()
        .map_err(|e| Error::Csv {
            file_name: file_name.to_owned(),
            source: e,
        })?
        .clone();

    let mut rec = csv::StringRecord::new();
    let mut objs = Vec::new();

    while reader.read_record(&mut rec).map_err(|e| Error::Csv {
        file_name: file_name.to_owned(),
        source: e,
    })? {
        let obj = rec.deserialize(Some(&headers)).map_err(|e| Error::Csv {
            file_name: file_name.to_owned(),
            source: e,
        })?;
        objs.push(obj);
    }
    Ok(objs)
}

fn read_objs_from_path<O>(path: std::path::PathBuf) -> Result<Vec<O>, Error>
where
    for<'de> O: Deserialize<'de>,
{
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("invalid_file_name")
        .to_string();
    if path.exists() {
        File::open(path)
            .map_err(|e| Error::NamedFileIO {
                file_name: file_name.to_owned(),
                source: Box::new(e),
            })
            .and_then(|r| read_objs(r, &file_name))
    } else {
        Err(Error::MissingFile(file_name))
    }
}

fn read_objs_from_optional_path<O>(
    dir_path: &Path,
    file_name: &str,
) -> Option<Result<Vec<O>, Error>>
where
    for<'de> O: Deserialize<'de>,
{
    File::open(dir_path.join(file_name))
        .ok()
        .map(|r| read_objs(r, file_name))
}

fn read_file<O, T>(
    file_mapping: &HashMap<&str, usize>,
    archive: &mut zip::ZipArchive<T>,
    file_name: &str,
) -> Result<Vec<O>, Error>
where
    for<'de> O: Deserialize<'de>,
    T: std::io::Read + std::io::Seek,
{
    read_optional_file(file_mapping, archive, file_name)
        .unwrap_or_else(|| Err(Error::MissingFile(file_name.to_owned())))
}

fn read_optional_file<O, T>(
    file_mapping: &HashMap<&str, usize>,
    archive: &mut zip::ZipArchive<T>,
    file_name: &str,
) -> Option<Result<Vec<O>, Error>>
where
    for<'de> O: Deserialize<'de>,
    T: std::io::Read + std::io::Seek,
{
    file_mapping.get(file_name).map(|i| {
        read_objs(
            archive.by_index(*i).map_err(|e| Error::NamedFileIO {
                file_name: file_name.to_owned(),
                source: Box::new(e),
            })?,
            file_name,
        )
    })
}
