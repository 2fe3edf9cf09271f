//! Null-count behaviour of the column index, including statistics-omitted
//! leaves.

mod common;

use rowshred::record::Record;
use rowshred::writer::RecordWriter;

#[test]
fn null_counts_reflect_per_column_nulls() {
    let mut buf = Vec::new();
    {
        let mut writer = RecordWriter::from_fields(
            &mut buf,
            &[
                "name=x, type=INT64, repetitiontype=OPTIONAL",
                "name=y, type=INT64, repetitiontype=OPTIONAL",
                "name=z, type=INT64, repetitiontype=OPTIONAL, omitstats=true",
                "name=u, type=INT64",
                "name=v, type=INT64, omitstats=true",
            ],
        )
        .unwrap();

        let rows: [(Option<i64>, Option<i64>, Option<i64>, i64, i64); 3] = [
            (Some(0), Some(0), Some(0), 1, 1),
            (None, Some(1), Some(1), 2, 2),
            (None, None, None, 3, 3),
        ];
        for (x, y, z, u, v) in rows {
            writer
                .write(Record::group([
                    ("x", Record::from(x)),
                    ("y", Record::from(y)),
                    ("z", Record::from(z)),
                    ("u", Record::from(u)),
                    ("v", Record::from(v)),
                ]))
                .unwrap();
        }
        writer.stop().unwrap();
    }

    let file = common::read_footer(&buf);
    assert_eq!(file.row_groups.len(), 1);
    let columns = &file.row_groups[0].columns;
    assert_eq!(columns.len(), 5);

    let expected: [Option<Vec<i64>>; 5] =
        [Some(vec![2]), Some(vec![1]), None, Some(vec![0]), None];
    for (chunk, expected_counts) in columns.iter().zip(expected) {
        let index = common::read_column_index(&buf, chunk).expect("column index present");
        assert_eq!(index.null_counts, expected_counts);
    }
}

#[test]
fn all_null_column_counts_every_row() {
    let mut buf = Vec::new();
    {
        let mut writer = RecordWriter::from_fields(
            &mut buf,
            &[
                "name=x, type=INT64, repetitiontype=OPTIONAL",
                "name=z, type=INT64, repetitiontype=OPTIONAL",
            ],
        )
        .unwrap();
        for i in 0..6i64 {
            writer
                .write(Record::group([
                    ("x", Record::from(i)),
                    ("z", Record::null()),
                ]))
                .unwrap();
        }
        writer.stop().unwrap();
    }

    let file = common::read_footer(&buf);
    assert_eq!(file.row_groups.len(), 1);
    let columns = &file.row_groups[0].columns;
    assert_eq!(columns.len(), 2);

    let x_index = common::read_column_index(&buf, &columns[0]).unwrap();
    assert_eq!(x_index.null_counts, Some(vec![0]));

    let z_index = common::read_column_index(&buf, &columns[1]).unwrap();
    assert_eq!(z_index.null_counts, Some(vec![6]));
    // the all-null column produced a single null page with empty bounds
    assert_eq!(z_index.null_pages, vec![true]);
    assert_eq!(z_index.min_values, vec![Vec::<u8>::new()]);
    assert_eq!(z_index.max_values, vec![Vec::<u8>::new()]);

    // and the values themselves round-trip
    let z_values = common::read_column_values(&buf, &file, 0, 1);
    assert_eq!(z_values, vec![None; 6]);
    let x_values = common::read_column_values(&buf, &file, 0, 0);
    assert_eq!(
        x_values,
        (0..6i64).map(|i| Some(rowshred::record::Value::I64(i))).collect::<Vec<_>>()
    );
}
