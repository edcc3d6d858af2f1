//! Tests for data module

use super::*;

fn transactions() -> DataFrame {
    DataFrame::from_columns(vec![
        ("amount", Series::float(vec![12.5, 40.0, f64::NAN, 7.25, 19.0])),
        ("quantity", Series::int(vec![1, 4, 2, 1, 2])),
        (
            "payment",
            Series::categorical(&["Cash", "Card", "Card", "Mobile", "Cash"]),
        ),
        ("member", Series::bool(vec![true, false, true, true, false])),
    ])
    .unwrap()
}

#[test]
fn test_series_creation() {
    let float_series = Series::float(vec![1.0, 2.0, 3.0]);
    assert_eq!(float_series.len(), 3);
    assert_eq!(float_series.dtype(), "float64");

    let int_series = Series::int(vec![1, 2, 3]);
    assert_eq!(int_series.dtype(), "int64");

    let bool_series = Series::bool(vec![true, false, true]);
    assert_eq!(bool_series.dtype(), "bool");

    let string_series = Series::string(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(string_series.dtype(), "string");

    let cat_series = Series::categorical(&["B", "A", "B", "C"]);
    assert_eq!(cat_series.len(), 4);
    assert_eq!(cat_series.dtype(), "categorical");
    assert_eq!(cat_series.levels().unwrap(), &["A", "B", "C"]);
    assert_eq!(cat_series.level_counts().unwrap(), vec![1, 2, 1]);
}

#[test]
fn test_series_statistics() {
    let series = Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0]);

    assert_eq!(series.mean().unwrap(), 3.0);
    assert!((series.std(1).unwrap() - 1.58113883).abs() < 1e-6);
    assert_eq!(series.sum().unwrap(), 15.0);

    let stats = series.describe().unwrap();
    assert_eq!(stats.count, 5);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.q50, 3.0);
    assert_eq!(stats.max, 5.0);
}

#[test]
fn test_describe_skips_missing() {
    let series = Series::float(vec![1.0, f64::NAN, 3.0]);
    let stats = series.describe().unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.mean, 2.0);
    assert_eq!(series.missing_count(), 1);
}

#[test]
fn test_categorical_with_unknown_level_fails() {
    let levels = vec!["A".to_string(), "B".to_string()];
    assert!(Series::categorical_with_levels(&["A", "B"], levels.clone()).is_ok());
    assert!(matches!(
        Series::categorical_with_levels(&["A", "Z"], levels),
        Err(DataError::InvalidParameter(_))
    ));
}

#[test]
fn test_take_keeps_levels() {
    let series = Series::categorical(&["A", "B", "C"]);
    let taken = series.take(&[0, 0, 1]).unwrap();
    assert_eq!(taken.levels().unwrap(), &["A", "B", "C"]);
    assert_eq!(taken.level_counts().unwrap(), vec![2, 1, 0]);

    assert!(matches!(
        series.take(&[3]),
        Err(DataError::IndexOutOfBounds { index: 3, len: 3 })
    ));
}

#[test]
fn test_dataframe_creation() {
    let df = transactions();
    assert_eq!(df.shape(), (5, 4));
    assert_eq!(df.column_names(), vec!["amount", "quantity", "payment", "member"]);

    let schema = df.schema();
    assert_eq!(schema[2].column_type, ColumnType::Categorical);
    assert_eq!(schema[1].to_string(), "quantity: int64");
}

#[test]
fn test_dataframe_rejects_ragged_columns() {
    let result = DataFrame::from_columns(vec![
        ("x", Series::float(vec![1.0, 2.0])),
        ("y", Series::float(vec![1.0])),
    ]);
    assert!(matches!(result, Err(DataError::DimensionMismatch { .. })));
}

#[test]
fn test_dataframe_select() {
    let df = transactions();
    let selected = df.select(["amount", "member"]).unwrap();
    assert_eq!(selected.shape(), (5, 2));
    assert!(matches!(
        df.select(["nope"]),
        Err(DataError::ColumnNotFound(_))
    ));
}

#[test]
fn test_dataframe_filter() {
    let df = transactions();
    let filtered = df.filter(&[true, false, true, false, true]).unwrap();
    assert_eq!(filtered.shape(), (3, 4));

    if let Series::Int(arr) = filtered.get_column("quantity").unwrap() {
        assert_eq!(arr.to_vec(), vec![1, 2, 2]);
    } else {
        panic!("Expected Int series");
    }
}

#[test]
fn test_take_rows_with_repeats() {
    let df = transactions();
    let resampled = df.take_rows(&[4, 4, 0, 1, 1]).unwrap();
    assert_eq!(resampled.nrows(), 5);
    assert_eq!(resampled.value("quantity", 0).unwrap(), SeriesValue::Int(2));
    assert_eq!(
        resampled.value("payment", 2).unwrap(),
        SeriesValue::String("Cash".to_string())
    );
    assert_eq!(
        resampled.get_column("payment").unwrap().levels().unwrap().len(),
        3
    );
}

#[test]
fn test_rename_keeps_position() {
    let df = transactions().rename(&[("quantity", "qty")]).unwrap();
    assert_eq!(df.column_names()[1], "qty");
}

#[test]
fn test_drop_missing_and_categorize() {
    let df = transactions();
    let (cleaned, report) = df.clean(&["amount"], &["quantity"]).unwrap();

    assert_eq!(cleaned.nrows(), 4);
    assert_eq!(report.rows_dropped(), 1);
    assert_eq!(report.missing_by_column, vec![("amount".to_string(), 1)]);
    assert_eq!(report.categorized, vec!["quantity".to_string()]);
    assert_eq!(
        cleaned.get_column("quantity").unwrap().levels().unwrap(),
        &["1", "2", "4"]
    );
}

#[test]
fn test_read_csv_infers_types() {
    let text = "amount,quantity,payment,member\n\
                12.5,1,Cash,true\n\
                ,4,Card,false\n\
                7.25,2,Mobile,TRUE\n";
    let df = read_csv_from(text.as_bytes(), &CsvOptions::default().categorical(["payment"])).unwrap();

    let schema: Vec<ColumnType> = df.schema().into_iter().map(|f| f.column_type).collect();
    assert_eq!(
        schema,
        vec![
            ColumnType::Float,
            ColumnType::Int,
            ColumnType::Categorical,
            ColumnType::Bool
        ]
    );
    assert!(df.get_column("amount").unwrap().is_missing(1));
}

#[test]
fn test_read_csv_categorical_missing_cells_are_not_levels() {
    let text = "y,region\n1.0,North\n2.0,NA\n3.0,\n4.0,South\n";
    let df = read_csv_from(text.as_bytes(), &CsvOptions::default().categorical(["region"])).unwrap();

    let region = df.get_column("region").unwrap();
    assert_eq!(region.levels().unwrap(), &["North".to_string(), "South".to_string()]);
    assert!(!region.is_missing(0));
    assert!(region.is_missing(1));
    assert!(region.is_missing(2));
    assert_eq!(region.missing_count(), 2);
    assert_eq!(region.level_counts().unwrap(), vec![1, 1]);
    assert!(region.to_f64_array().unwrap()[1].is_nan());

    let (cleaned, report) = df.drop_missing(&["region"]).unwrap();
    assert_eq!(report.rows_after, 2);
    assert_eq!(report.missing_by_column, vec![("region".to_string(), 2)]);
    assert_eq!(cleaned.get_column("region").unwrap().missing_count(), 0);
    assert_eq!(
        cleaned.get_column("y").unwrap().to_f64_array().unwrap().to_vec(),
        vec![1.0, 4.0]
    );
}

#[test]
fn test_categorical_missing_cells_survive_round_trip() {
    let df = DataFrame::from_columns(vec![(
        "region",
        Series::categorical(&["North", "", "South"]),
    )])
    .unwrap();
    let mut buffer = Vec::new();
    write_csv_to(&df, &mut buffer, &CsvOptions::default()).unwrap();

    let loaded = read_csv_from(buffer.as_slice(), &CsvOptions::default().categorical(["region"])).unwrap();
    let region = loaded.get_column("region").unwrap();
    assert_eq!(region.levels().unwrap().len(), 2);
    assert!(region.is_missing(1));
}

#[test]
fn test_read_csv_missing_ints_promote_to_float() {
    let text = "qty\n1\nNA\n3\n";
    let df = read_csv_from(text.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(df.get_column("qty").unwrap().column_type(), ColumnType::Float);
}

#[test]
fn test_read_csv_unknown_categorical_column() {
    let text = "x\n1\n";
    let options = CsvOptions::default().categorical(["y"]);
    assert!(matches!(
        read_csv_from(text.as_bytes(), &options),
        Err(DataError::ColumnNotFound(_))
    ));
}

#[test]
fn test_csv_round_trip() {
    let df = transactions();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transactions.csv");

    write_csv(&df, &path, &CsvOptions::default()).unwrap();
    let loaded = read_csv(&path, &CsvOptions::default().categorical(["payment"])).unwrap();

    assert_eq!(loaded.shape(), df.shape());
    assert_eq!(loaded.schema(), df.schema());
    assert!(loaded.get_column("amount").unwrap().is_missing(2));
}

#[test]
fn test_semicolon_delimiter() {
    let text = "a;b\n1;x\n2;y\n";
    let df = read_csv_from(text.as_bytes(), &CsvOptions::default().delimiter(b';')).unwrap();
    assert_eq!(df.shape(), (2, 2));
    assert_eq!(df.get_column("b").unwrap().column_type(), ColumnType::String);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn take_rows_has_index_count_rows(
            values in proptest::collection::vec(-1e6f64..1e6, 1..50),
            picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..80),
        ) {
            let n = values.len();
            let df = DataFrame::from_columns(vec![("x", Series::float(values))]).unwrap();
            let indices: Vec<usize> = picks.iter().map(|p| p.index(n)).collect();
            let taken = df.take_rows(&indices).unwrap();
            prop_assert_eq!(taken.nrows(), indices.len());
        }
    }
}
