//! California housing dataset (1990 census block groups)

use crate::data::Dataset;
use crate::error::{PipelineError, Result};
use std::io::Read;

/// Canonical download location of the archive
pub const CALIFORNIA_HOUSING_URL: &str = "https://ndownloader.figshare.com/files/5976036";

/// File name of the cached archive
pub const ARCHIVE_NAME: &str = "cal_housing.tgz";

/// SHA-256 of the archive
pub const ARCHIVE_SHA256: &str =
    "aaa5c9a6afe2225cc2aed2723682ae403280c4a3695a2ddda4ffb5d8215ea681";

/// Archive member holding the raw table
pub const ARCHIVE_MEMBER: &str = "CaliforniaHousing/cal_housing.data";

/// Column order of the raw, header-less table
const RAW_COLUMNS: [&str; 9] = [
    "longitude",
    "latitude",
    "housingMedianAge",
    "totalRooms",
    "totalBedrooms",
    "population",
    "households",
    "medianIncome",
    "medianHouseValue",
];

/// Feature columns of the extracted dataset
pub const FEATURE_NAMES: [&str; 8] = [
    "MedInc",
    "HouseAge",
    "AveRooms",
    "AveBedrms",
    "Population",
    "AveOccup",
    "Latitude",
    "Longitude",
];

/// Parse `cal_housing.data` into the feature set.
///
/// Room, bedroom and occupancy counts become per-household averages and the
/// target is the median house value in units of $100,000.
pub fn parse_cal_housing<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut dataset = Dataset::new(FEATURE_NAMES.iter().map(|s| s.to_string()).collect());

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != RAW_COLUMNS.len() {
            return Err(PipelineError::DataSource(format!(
                "row {} has {} fields, expected {}",
                row + 1,
                record.len(),
                RAW_COLUMNS.len()
            )));
        }

        let mut raw = [0.0f64; 9];
        for (i, value) in record.iter().enumerate() {
            raw[i] = value.parse().map_err(|_| PipelineError::NonNumeric {
                column: RAW_COLUMNS[i].to_string(),
                row: row + 1,
                value: value.to_string(),
            })?;
        }

        let [longitude, latitude, age, rooms, bedrooms, population, households, income, value] =
            raw;

        dataset.add_sample(
            vec![
                income,
                age,
                rooms / households,
                bedrooms / households,
                population,
                population / households,
                latitude,
                longitude,
            ],
            value / 100_000.0,
        );
    }

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
-122.230000,37.880000,41.000000,880.000000,129.000000,322.000000,126.000000,8.325200,452600.000000
-122.220000,37.860000,21.000000,7099.000000,1106.000000,2401.000000,1138.000000,8.301400,358500.000000
";

    #[test]
    fn test_derived_features() {
        let dataset = parse_cal_housing(SAMPLE.as_bytes()).unwrap();

        assert_eq!(dataset.n_samples(), 2);
        assert_eq!(
            dataset.column_names(),
            vec![
                "MedInc", "HouseAge", "AveRooms", "AveBedrms", "Population", "AveOccup",
                "Latitude", "Longitude", "target"
            ]
        );

        let row = &dataset.features[0];
        assert!((row[0] - 8.3252).abs() < 1e-9);
        assert_eq!(row[1], 41.0);
        assert!((row[2] - 880.0 / 126.0).abs() < 1e-12);
        assert!((row[3] - 129.0 / 126.0).abs() < 1e-12);
        assert_eq!(row[4], 322.0);
        assert!((row[5] - 322.0 / 126.0).abs() < 1e-12);
        assert_eq!(row[6], 37.88);
        assert_eq!(row[7], -122.23);
        assert!((dataset.targets[0] - 4.526).abs() < 1e-12);
    }

    #[test]
    fn test_short_row_is_rejected() {
        let err = parse_cal_housing("1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::DataSource(_)));
    }

    #[test]
    fn test_garbage_cell_is_rejected() {
        let err = parse_cal_housing("1,2,3,4,x,6,7,8,9\n".as_bytes()).unwrap_err();
        assert!(
            matches!(err, PipelineError::NonNumeric { ref column, .. } if column == "totalBedrooms")
        );
    }
}
