use pretty_assertions::assert_eq;
use quake_table::{
    Array, DType, Dimension, Header, RowMask, Scalar, Shape, SubHeader, Table, TableError,
    TableOptions,
};

fn coords_header() -> Header {
    Header::grouped(
        "coords",
        vec![
            SubHeader::new("x").with_unit("m"),
            SubHeader::new("y").with_unit("m"),
            SubHeader::new("z").with_unit("m"),
        ],
    )
    .unwrap()
}

/// `coords = (x, y, z)` plus `t`, filled with three rows through `add_rows`.
fn sample_table() -> Table {
    let mut table = Table::named("sample");
    table
        .add_columns(vec![coords_header(), Header::new("t").with_unit("s")], None)
        .unwrap();
    assert_eq!(table.row_count(), 0);
    table
        .add_rows(&[
            Array::grid(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]),
            Array::flat(vec![10.0, 20.0, 30.0]),
        ])
        .unwrap();
    table
}

#[test]
fn rows_appended_after_initial_data_extend_sub_columns() {
    let mut table = Table::new();
    table
        .add_column(
            coords_header(),
            Some(Array::grid(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])),
        )
        .unwrap();
    table
        .add_column(Header::new("t"), Some(Array::flat(vec![10.0, 20.0])))
        .unwrap();
    assert_eq!(table.nrows_capacity(), 2);

    table
        .add_rows(&[Array::grid(vec![[7.0, 8.0, 9.0]]), Array::flat(vec![30.0])])
        .unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.nrows_capacity(), 4);
    assert_eq!(
        table.get_column("y").unwrap().to_vec::<f64>().unwrap(),
        vec![2.0, 5.0, 8.0]
    );
    assert_eq!(
        table.column("t").unwrap().to_vec::<f64>().unwrap(),
        vec![10.0, 20.0, 30.0]
    );
    table.check_invariants().unwrap();
}

#[test]
fn sub_columns_are_strided_views_of_their_group() {
    let mut table = sample_table();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.column_count(), 2);

    let y = table.get_column("y").unwrap();
    assert_eq!(y.shape(), Shape::Flat(3));
    assert_eq!(y.to_vec::<f64>().unwrap(), vec![2.0, 5.0, 8.0]);
    assert_eq!(y.as_slice::<f64>(), None);
    assert_eq!(y.get::<f64>(2), Some(8.0));
    assert_eq!(y.get::<f64>(3), None);

    let coords = table.column("coords").unwrap();
    assert!(coords.is_grid());
    assert_eq!(coords.shape(), Shape::Grid { rows: 3, cols: 3 });
    assert_eq!(coords.row::<f64>(1), Some(&[4.0, 5.0, 6.0][..]));
    assert_eq!(coords.at::<f64>(2, 0), Some(7.0));
    assert_eq!(coords.scalar(0, 2), Some(Scalar::F64(3.0)));

    let t = table.column("t").unwrap();
    assert_eq!(t.as_slice::<f64>(), Some(&[10.0, 20.0, 30.0][..]));
}

#[test]
fn column_names_and_headers() {
    let table = sample_table();
    assert_eq!(table.column_names(), vec!["coords", "x", "y", "z", "t"]);
    assert!(table.has_column("z"));
    assert!(!table.has_column("w"));
    assert_eq!(table.header("t").and_then(Header::unit), Some("s"));
    // Sub-columns are not headers of their own.
    assert!(table.header("x").is_none());
    assert_eq!(
        table.column("w").unwrap_err(),
        TableError::ColumnNotFound("w".to_owned())
    );
}

#[test]
fn adding_a_column_after_rows_back_fills_defaults() {
    let mut table = sample_table();
    table
        .add_column(Header::new("count").with_default(-1i64), None)
        .unwrap();
    let count = table.column("count").unwrap();
    assert_eq!(count.dtype(), DType::I64);
    assert_eq!(count.to_vec::<i64>().unwrap(), vec![-1, -1, -1]);
    table.check_invariants().unwrap();
}

#[test]
fn growth_keeps_rows_and_uses_power_of_two_capacity() {
    let mut table = sample_table();
    assert_eq!(table.nrows_capacity(), 4);

    table
        .add_rows(&[
            Array::grid(vec![[0.5, 0.5, 0.5], [1.5, 1.5, 1.5]]),
            Array::flat(vec![40.0, 50.0]),
        ])
        .unwrap();
    assert_eq!(table.row_count(), 5);
    assert_eq!(table.nrows_capacity(), 8);
    assert_eq!(
        table.column("x").unwrap().to_vec::<f64>().unwrap(),
        vec![1.0, 4.0, 7.0, 0.5, 1.5]
    );
    assert_eq!(
        table.column("t").unwrap().to_vec::<f64>().unwrap(),
        vec![10.0, 20.0, 30.0, 40.0, 50.0]
    );
    table.check_invariants().unwrap();
}

#[test]
fn explicit_capacity_is_transparent() {
    let mut table = sample_table();
    let before = table.column("coords").unwrap().to_array();

    table.set_nrows_capacity(100).unwrap();
    assert_eq!(table.nrows_capacity(), 100);
    assert_eq!(table.column("coords").unwrap().to_array(), before);

    table.set_nrows_capacity(3).unwrap();
    assert_eq!(table.column("coords").unwrap().to_array(), before);
    table.check_invariants().unwrap();
}

#[test]
fn shrinking_below_row_count_is_rejected() {
    let mut table = sample_table();
    let capacity = table.nrows_capacity();
    let generation = table.generation();

    let err = table.set_nrows_capacity(2).unwrap_err();
    assert_eq!(
        err,
        TableError::CapacityViolation {
            requested: 2,
            nrows: 3
        }
    );
    assert_eq!(table.nrows_capacity(), capacity);
    assert_eq!(table.generation(), generation);
    assert_eq!(table.row_count(), 3);
}

#[test]
fn options_set_initial_capacity_and_floor() {
    let mut table = Table::with_options(TableOptions {
        name: Some("hinted".to_owned()),
        nrows_capacity: Some(10),
        nrows_capacity_min: 16,
    });
    assert_eq!(table.name(), Some("hinted"));
    assert_eq!(table.nrows_capacity(), 16);
    assert_eq!(table.nrows_capacity_min(), 16);

    table
        .add_column(Header::new("t"), Some(Array::flat(vec![0.0; 17])))
        .unwrap();
    assert_eq!(table.nrows_capacity(), 32);
}

#[test]
fn duplicate_names_are_rejected() {
    let mut table = sample_table();
    let err = table.add_column(Header::new("x"), None).unwrap_err();
    assert_eq!(
        err,
        TableError::DuplicateColumnName {
            name: "x".to_owned()
        }
    );

    let err = table
        .add_column(
            Header::grouped("pair", vec![SubHeader::new("a"), SubHeader::new("t")]).unwrap(),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, TableError::DuplicateColumnName { .. }));
    assert!(!table.has_column("pair"));
    assert!(!table.has_column("a"));
}

#[test]
fn element_types_must_match_exactly() {
    let mut table = sample_table();
    let ints = Array::flat(vec![1i32, 2, 3]);

    let err = table
        .add_column(Header::new("n"), Some(ints.clone()))
        .unwrap_err();
    assert_eq!(
        err,
        TableError::TypeMismatch {
            column: "n".to_owned(),
            expected: DType::F64,
            actual: DType::I32,
        }
    );

    table
        .add_column(Header::new("n"), Some(ints.cast(DType::F64).unwrap()))
        .unwrap();
    assert_eq!(
        table.column("n").unwrap().to_vec::<f64>().unwrap(),
        vec![1.0, 2.0, 3.0]
    );
    assert!(matches!(
        table.column("n").unwrap().to_vec::<i32>(),
        Err(TableError::TypeMismatch { .. })
    ));
}

#[test]
fn lossy_casts_fail() {
    let err = Array::flat(vec![0.5f64]).cast(DType::I64).unwrap_err();
    assert_eq!(
        err,
        TableError::LossyCast {
            value: Scalar::F64(0.5),
            dtype: DType::I64
        }
    );
    assert!(Array::flat(vec![true]).cast(DType::I32).is_err());
    assert_eq!(
        Array::flat(vec![3.0f64]).cast(DType::I32).unwrap(),
        Array::flat(vec![3i32])
    );
}

#[test]
fn add_rows_validates_before_writing() {
    let mut table = sample_table();
    let generation = table.generation();

    let err = table
        .add_rows(&[
            Array::grid(vec![[1.0, 2.0, 3.0]; 2]),
            Array::flat(vec![1.0]),
        ])
        .unwrap_err();
    assert_eq!(
        err,
        TableError::ShapeMismatch {
            column: "t".to_owned(),
            dimension: Dimension::Rows,
            expected: 2,
            actual: 1,
        }
    );

    let err = table
        .add_rows(&[Array::grid(vec![[1.0, 2.0]]), Array::flat(vec![1.0])])
        .unwrap_err();
    assert!(matches!(
        err,
        TableError::ShapeMismatch {
            dimension: Dimension::Columns,
            ..
        }
    ));

    let err = table
        .add_rows(&[Array::grid(vec![[1.0, 2.0, 3.0]])])
        .unwrap_err();
    assert!(matches!(
        err,
        TableError::ShapeMismatch {
            dimension: Dimension::Arrays,
            expected: 2,
            actual: 1,
            ..
        }
    ));

    let err = table
        .add_rows(&[Array::grid(vec![[1, 2, 3]]), Array::flat(vec![1.0])])
        .unwrap_err();
    assert!(matches!(err, TableError::TypeMismatch { .. }));

    assert_eq!(table.row_count(), 3);
    assert_eq!(table.generation(), generation);
    table.check_invariants().unwrap();
}

#[test]
fn add_columns_is_not_atomic() {
    let mut table = sample_table();

    let err = table
        .add_columns(
            vec![Header::new("a"), Header::new("b")],
            Some(vec![Array::flat(vec![0.0; 3]), Array::flat(vec![0.0; 2])]),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TableError::ShapeMismatch {
            dimension: Dimension::Rows,
            ..
        }
    ));
    assert!(table.has_column("a"));
    assert!(!table.has_column("b"));

    let err = table
        .add_columns(vec![Header::new("c")], Some(Vec::new()))
        .unwrap_err();
    assert!(matches!(
        err,
        TableError::ShapeMismatch {
            dimension: Dimension::Arrays,
            ..
        }
    ));
    assert!(!table.has_column("c"));
}

#[test]
fn masked_selection() {
    let mut table = sample_table();
    table
        .add_column(
            Header::new("deep").with_dtype(DType::Bool),
            Some(Array::flat(vec![false, true, true])),
        )
        .unwrap();

    assert_eq!(
        table.get_column_masked("y", RowMask::Column("deep")).unwrap(),
        Array::flat(vec![5.0, 8.0])
    );
    assert_eq!(
        table
            .get_column_masked("t", RowMask::Bool(&[true, false, true]))
            .unwrap(),
        Array::flat(vec![10.0, 30.0])
    );
    assert_eq!(
        table
            .get_column_masked("coords", RowMask::Indices(&[2, 0]))
            .unwrap(),
        Array::grid(vec![[7.0, 8.0, 9.0], [1.0, 2.0, 3.0]])
    );
    assert_eq!(
        table.get_column_masked("z", RowMask::All).unwrap(),
        Array::flat(vec![3.0, 6.0, 9.0])
    );
}

#[test]
fn invalid_masks_are_rejected() {
    let mut table = sample_table();

    assert_eq!(
        table
            .get_column_masked("t", RowMask::Indices(&[0, 3]))
            .unwrap_err(),
        TableError::RowOutOfRange { index: 3, nrows: 3 }
    );
    assert!(matches!(
        table.get_column_masked("t", RowMask::Bool(&[true])),
        Err(TableError::ShapeMismatch {
            dimension: Dimension::Rows,
            ..
        })
    ));
    assert!(matches!(
        table.get_column_masked("t", RowMask::Column("x")),
        Err(TableError::TypeMismatch {
            expected: DType::Bool,
            ..
        })
    ));
    assert!(matches!(
        table.get_column_masked("t", RowMask::Column("nope")),
        Err(TableError::ColumnNotFound(_))
    ));
}

#[test]
fn handles_go_stale_after_reallocation() {
    let mut table = sample_table();
    let handle = table.handle("y").unwrap();
    assert_eq!(
        table.view(handle).unwrap().to_vec::<f64>().unwrap(),
        vec![2.0, 5.0, 8.0]
    );

    // Fits in the current capacity of 4.
    table
        .add_rows(&[Array::grid(vec![[0.0; 3]]), Array::flat(vec![0.0])])
        .unwrap();
    assert_eq!(table.view(handle).unwrap().len(), 4);

    table
        .add_rows(&[Array::grid(vec![[0.0; 3]]), Array::flat(vec![0.0])])
        .unwrap();
    assert_eq!(
        table.view(handle).unwrap_err(),
        TableError::StaleHandle {
            issued: handle.generation(),
            current: table.generation(),
        }
    );

    let fresh = table.handle("y").unwrap();
    assert_eq!(table.view(fresh).unwrap().len(), 5);
}

#[test]
fn display_prints_the_schema() {
    let table = sample_table();
    assert_eq!(
        table.to_string(),
        "name: sample\nnrows: 3\nncols: 2\nheaders:\n  - coords (f64) [x, y, z]\n  - t (f64, s)"
    );
}
