//! Column index min/max and null-page behaviour across mixed null
//! patterns, exercised with a tiny page size so every column cuts both
//! null and non-null pages.

mod common;

use rand::Rng;
use rowshred::file::properties::WriterProperties;
use rowshred::record::Record;
use rowshred::writer::RecordWriter;

#[test]
fn min_max_and_null_pages_across_null_patterns() {
    let fields = [
        "name=name, type=BYTE_ARRAY, convertedtype=UTF8, encoding=PLAIN_DICTIONARY, repetitiontype=OPTIONAL",
        "name=age, type=INT32, repetitiontype=OPTIONAL",
        "name=id, type=INT64, repetitiontype=OPTIONAL",
        "name=weight, type=DOUBLE, repetitiontype=OPTIONAL",
        "name=score, type=INT64, repetitiontype=OPTIONAL",
    ];

    let mut buf = Vec::new();
    {
        let props = WriterProperties::builder()
            .set_page_size(64)
            .set_np(4)
            .build()
            .unwrap();
        let mut writer =
            RecordWriter::from_fields_with_properties(&mut buf, &fields, props).unwrap();

        let full_row = |i: i64| {
            Record::group([
                ("name", Record::from(format!("index_{i}"))),
                ("age", Record::from(20 + (i as i32) % 5)),
                ("id", Record::from(i + 1)),
                ("weight", Record::from(50.0 + i as f64 * 0.1)),
                ("score", Record::from(i * 7)),
            ])
        };
        let null_row = || {
            Record::group([
                ("name", Record::null()),
                ("age", Record::null()),
                ("id", Record::null()),
                ("weight", Record::null()),
                ("score", Record::null()),
            ])
        };

        // 40 rows fully present
        for i in 0..40 {
            writer.write(full_row(i)).unwrap();
        }
        // 40 rows entirely null
        for _ in 40..80 {
            writer.write(null_row()).unwrap();
        }
        // 40 rows with a 40% chance of being present
        let mut rng = rand::thread_rng();
        for i in 80..120 {
            let row = if rng.gen_bool(0.4) { full_row(i) } else { null_row() };
            writer.write(row).unwrap();
        }

        writer.stop().unwrap();
    }

    let file = common::read_footer(&buf);
    assert_eq!(file.num_rows, 120);
    assert_eq!(file.row_groups.len(), 1);
    let columns = &file.row_groups[0].columns;
    assert_eq!(columns.len(), 5);

    for (i, chunk) in columns.iter().enumerate() {
        let index = common::read_column_index(&buf, chunk)
            .unwrap_or_else(|| panic!("column {i} is missing its column index"));

        let num_pages = index.null_pages.len();
        assert!(num_pages > 1, "column {i} should cut multiple pages");
        assert_eq!(index.min_values.len(), num_pages, "column {i} min length");
        assert_eq!(index.max_values.len(), num_pages, "column {i} max length");

        let null_counts =
            index.null_counts.as_ref().unwrap_or_else(|| panic!("column {i} null counts"));
        assert_eq!(null_counts.len(), num_pages, "column {i} null count length");
        assert!(null_counts.iter().all(|&c| c >= 0), "column {i} counts non-negative");

        // per-page bounds: empty exactly for null pages
        for (j, &is_null_page) in index.null_pages.iter().enumerate() {
            if is_null_page {
                assert!(index.min_values[j].is_empty(), "column {i} page {j} min");
                assert!(index.max_values[j].is_empty(), "column {i} page {j} max");
            } else {
                assert!(!index.min_values[j].is_empty(), "column {i} page {j} min");
                assert!(!index.max_values[j].is_empty(), "column {i} page {j} max");
            }
        }

        // the 40-row null run must surface at least one pure null page, and
        // the leading full segment at least one non-null page
        assert!(
            index.null_pages.iter().any(|&p| p),
            "column {i} should have a null page"
        );
        assert!(
            index.null_pages.iter().any(|&p| !p),
            "column {i} should have a non-null page"
        );

        // total nulls across pages equal the nulls the chunk reports
        let meta = chunk.meta_data.as_ref().unwrap();
        let chunk_nulls =
            meta.statistics.as_ref().and_then(|s| s.null_count).expect("chunk null count");
        assert_eq!(null_counts.iter().sum::<i64>(), chunk_nulls, "column {i} null totals");

        // offset index agrees on page count and row coverage
        let offset_index = common::read_offset_index(&buf, chunk).unwrap();
        assert_eq!(offset_index.page_locations.len(), num_pages);
        assert_eq!(offset_index.page_locations[0].first_row_index, 0);
        let mut last_first_row = -1i64;
        for location in &offset_index.page_locations {
            assert!(location.first_row_index > last_first_row);
            assert!(location.first_row_index < 120);
            last_first_row = location.first_row_index;
        }
    }
}
