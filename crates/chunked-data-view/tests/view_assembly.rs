//! End-to-end chunk access through memory and directory stores.

use std::sync::Arc;

use chunked_data_view::{
    AxisDefinition, ChunkFill, ChunkedDataView, ChunkedDataViewBuilder, Extractor, GribExtractor,
    MissingFieldPolicy, PartSlice, ViewConfig, ViewDefinition, ViewError,
};
use field_store::{FieldStore, MemoryStore};
use mars_request::Key;
use test_utils::{
    assert_slice_approx_eq, populate_memory_store, record_values, requests, seeded_directory_store,
    seeded_memory_store,
};

const PAYLOAD: usize = 10;

fn grib() -> Box<dyn Extractor> {
    Box::new(GribExtractor::new())
}

fn with_base(request: &str) -> String {
    format!("{},{}", requests::BASE, request)
}

/// Two parts over the same dates: params t/u in the first, v/w/z in the second.
fn two_part_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    populate_memory_store(&store, "date=20200101/20200102,param=t/u", |ordinal, _| {
        record_values(ordinal, PAYLOAD)
    });
    populate_memory_store(&store, "date=20200101/20200102,param=v/w/z", |ordinal, _| {
        record_values(100 + ordinal, PAYLOAD)
    });
    store
}

fn two_part_view(
    store: Arc<MemoryStore>,
    param_chunked: bool,
) -> chunked_data_view::Result<ChunkedDataView> {
    let axes = || {
        vec![
            AxisDefinition::chunked(["date"]),
            AxisDefinition::new(["param"], param_chunked),
        ]
    };
    ChunkedDataViewBuilder::new(store)
        .add_part("date=20200101/20200102,param=t/u", axes(), grib())
        .add_part("date=20200101/20200102,param=v/w/z", axes(), grib())
        .extend_on_axis(1)
        .build()
}

#[test]
fn test_single_part_shape_and_chunking() {
    let request = with_base("date=20200101/20200102/20200103,time=0/6/12/18,param=t");
    let (store, _) = seeded_memory_store(&request, PAYLOAD);

    let view = ChunkedDataViewBuilder::new(store)
        .add_part(
            request,
            vec![
                AxisDefinition::chunked(["date"]),
                AxisDefinition::chunked(["time"]),
                AxisDefinition::chunked(["param"]),
            ],
            grib(),
        )
        .build()
        .unwrap();

    assert_eq!(view.shape(), &[3, 4, 1, PAYLOAD]);
    assert_eq!(view.chunks(), &[3, 4, 1, 1]);
    assert_eq!(view.chunk_shape(), &[1, 1, 1, PAYLOAD]);
    assert_eq!(view.count_chunk_values(), PAYLOAD);
    assert_eq!(view.n_axes(), 3);

    // date 2, time 18 is record 2 * 4 + 3.
    let (values, fill) = view.chunk(&[2, 3, 0]).unwrap();
    assert!(fill.is_complete());
    assert_slice_approx_eq!(&values, &record_values(11, PAYLOAD), 1e-2);
}

#[test]
fn test_repeated_access_returns_fresh_data() {
    let request = "date=20200101/20200102/20200103";
    let (store, _) = seeded_memory_store(request, PAYLOAD);
    let view = ChunkedDataViewBuilder::new(store)
        .add_part(request, vec![AxisDefinition::chunked(["date"])], grib())
        .build()
        .unwrap();

    let mut out = vec![0.0; view.count_chunk_values()];
    for date in [0, 1, 2, 0] {
        let fill = view.at(&[date], &mut out).unwrap();
        assert_eq!(fill, ChunkFill::new(1, 1));
        assert_slice_approx_eq!(&out, &record_values(date, PAYLOAD), 1e-2);
    }
}

#[test]
fn test_bulk_axis_fills_whole_chunk() {
    let request = "date=20200101/20200102,step=0/6/12";
    let (store, _) = seeded_memory_store(request, PAYLOAD);
    let view = ChunkedDataViewBuilder::new(store)
        .add_part(
            request,
            vec![AxisDefinition::chunked(["date"]), AxisDefinition::bulk(["step"])],
            grib(),
        )
        .build()
        .unwrap();

    assert_eq!(view.chunk_shape(), &[1, 3, PAYLOAD]);
    assert_eq!(view.chunks(), &[2, 1, 1]);

    let (values, fill) = view.chunk(&[1, 0]).unwrap();
    assert_eq!(fill, ChunkFill::new(3, 3));
    let expected: Vec<f32> = (3..6).flat_map(|r| record_values(r, PAYLOAD)).collect();
    assert_slice_approx_eq!(&values, &expected, 1e-2);
}

#[test]
fn test_two_parts_concatenate_on_extension_axis() {
    let view = two_part_view(two_part_store(), true).unwrap();

    assert_eq!(view.shape(), &[2, 5, PAYLOAD]);
    assert_eq!(view.chunks(), &[2, 5, 1]);

    let route = view.route(&[0, 4]).unwrap();
    assert_eq!(
        route,
        vec![PartSlice {
            part: 1,
            part_index: vec![0, 2],
            offset: vec![0, 0, 0],
            shape: vec![1, 1, PAYLOAD],
        }]
    );

    let route = view.route(&[1, 1]).unwrap();
    assert_eq!(route.len(), 1);
    assert_eq!(route[0].part, 0);
    assert_eq!(route[0].part_index, vec![1, 1]);

    // date 1, param z: record 1 * 3 + 2 of the second part.
    let (values, fill) = view.chunk(&[1, 4]).unwrap();
    assert!(fill.is_complete());
    assert_slice_approx_eq!(&values, &record_values(105, PAYLOAD), 1e-2);

    // date 0, param u: record 1 of the first part.
    let (values, _) = view.chunk(&[0, 1]).unwrap();
    assert_slice_approx_eq!(&values, &record_values(1, PAYLOAD), 1e-2);
}

#[test]
fn test_bulk_extension_axis_gathers_every_part() {
    let view = two_part_view(two_part_store(), false).unwrap();

    assert_eq!(view.shape(), &[2, 5, PAYLOAD]);
    assert_eq!(view.chunk_shape(), &[1, 5, PAYLOAD]);
    assert_eq!(view.chunks(), &[2, 1, 1]);

    let route = view.route(&[1, 0]).unwrap();
    assert_eq!(route.len(), 2);
    assert_eq!(route[1].offset, vec![0, 2, 0]);
    assert_eq!(route[1].shape, vec![1, 3, PAYLOAD]);

    let (values, fill) = view.chunk(&[1, 0]).unwrap();
    assert_eq!(fill, ChunkFill::new(5, 5));
    let expected: Vec<f32> = [2, 3, 103, 104, 105]
        .iter()
        .flat_map(|&r| record_values(r, PAYLOAD))
        .collect();
    assert_slice_approx_eq!(&values, &expected, 1e-2);
}

#[test]
fn test_mismatching_parts_fail_to_build() {
    let store = Arc::new(MemoryStore::new());
    populate_memory_store(&store, "date=20200101/20200102/20200103,param=t/u/v", |o, _| {
        record_values(o, PAYLOAD)
    });

    let axes = || vec![AxisDefinition::chunked(["date"]), AxisDefinition::chunked(["param"])];
    let err = ChunkedDataViewBuilder::new(store)
        .add_part("date=20200101/20200102,param=t/u", axes(), grib())
        .add_part("date=20200101/20200102/20200103,param=v", axes(), grib())
        .extend_on_axis(1)
        .build()
        .unwrap_err();
    assert!(matches!(err, ViewError::Config(msg) if msg.contains("axis 0")));
}

#[test]
fn test_mismatching_chunking_fails_to_build() {
    let store = two_part_store();
    let err = ChunkedDataViewBuilder::new(store)
        .add_part(
            "date=20200101/20200102,param=t/u",
            vec![AxisDefinition::bulk(["date"]), AxisDefinition::chunked(["param"])],
            grib(),
        )
        .add_part(
            "date=20200101/20200102,param=v/w/z",
            vec![AxisDefinition::chunked(["date"]), AxisDefinition::chunked(["param"])],
            grib(),
        )
        .extend_on_axis(1)
        .build()
        .unwrap_err();
    assert!(matches!(err, ViewError::Config(msg) if msg.contains("bulk")));
}

#[test]
fn test_axis_coverage_is_checked_at_build() {
    let request = "date=20200101/20200102,param=t/u";
    let (store, _) = seeded_memory_store(request, PAYLOAD);

    let uncovered = ChunkedDataViewBuilder::new(store.clone())
        .add_part(request, vec![AxisDefinition::chunked(["date"])], grib())
        .build();
    assert!(matches!(uncovered, Err(ViewError::Config(_))));

    let duplicated = ChunkedDataViewBuilder::new(store)
        .add_part(
            request,
            vec![
                AxisDefinition::chunked(["date"]),
                AxisDefinition::chunked(["param"]),
                AxisDefinition::bulk(["date"]),
            ],
            grib(),
        )
        .build();
    assert!(matches!(duplicated, Err(ViewError::Config(_))));
}

#[test]
fn test_chunk_index_validation() {
    let request = "date=20200101/20200102/20200103";
    let (store, _) = seeded_memory_store(request, PAYLOAD);
    let view = ChunkedDataViewBuilder::new(store)
        .add_part(request, vec![AxisDefinition::chunked(["date"])], grib())
        .build()
        .unwrap();
    let mut out = vec![0.0; PAYLOAD];

    assert!(matches!(
        view.at(&[3], &mut out),
        Err(ViewError::IndexOutOfBounds { index: 3, bound: 3, .. })
    ));
    assert!(matches!(
        view.at(&[], &mut out),
        Err(ViewError::ChunkIndexLength { got: 0, expected: 1 })
    ));
    assert!(matches!(
        view.at(&[0, 0, 0], &mut out),
        Err(ViewError::ChunkIndexLength { got: 3, expected: 1 })
    ));
    assert!(matches!(
        view.at(&[0, 1], &mut out),
        Err(ViewError::IndexOutOfBounds { index: 1, bound: 1, .. })
    ));
    assert!(matches!(
        view.at(&[0], &mut out[..PAYLOAD - 1]),
        Err(ViewError::BufferTooSmall { .. })
    ));

    // The payload axis may be addressed explicitly.
    view.at(&[1, 0], &mut out).unwrap();
    assert_slice_approx_eq!(&out, &record_values(1, PAYLOAD), 1e-2);
}

#[test]
fn test_larger_buffer_keeps_its_tail() {
    let request = "date=20200101";
    let (store, _) = seeded_memory_store(request, PAYLOAD);
    let view = ChunkedDataViewBuilder::new(store)
        .add_part(request, vec![AxisDefinition::chunked(["date"])], grib())
        .build()
        .unwrap();

    let mut out = vec![-1.0; PAYLOAD + 2];
    view.at(&[0], &mut out).unwrap();
    assert_eq!(&out[PAYLOAD..], &[-1.0, -1.0]);
}

#[test]
fn test_missing_record_leaves_fill_value() {
    let store = Arc::new(MemoryStore::new());
    populate_memory_store(&store, "date=20200101,step=0/6", |o, _| record_values(o, PAYLOAD));

    let build = |config: ViewConfig| {
        ChunkedDataViewBuilder::new(store.clone())
            .add_part(
                "date=20200101,step=0/6/12",
                vec![AxisDefinition::chunked(["date"]), AxisDefinition::bulk(["step"])],
                grib(),
            )
            .with_config(config)
            .build()
            .unwrap()
    };

    let view = build(ViewConfig::default());
    let (values, fill) = view.chunk(&[0, 0]).unwrap();
    assert_eq!(fill, ChunkFill::new(2, 3));
    assert!(values[2 * PAYLOAD..].iter().all(|v| v.is_nan()));

    let strict = build(ViewConfig {
        missing_fields: MissingFieldPolicy::Strict,
        fill_value: f32::NAN,
    });
    assert!(matches!(
        strict.chunk(&[0, 0]),
        Err(ViewError::IncompleteChunk { filled: 2, expected: 3, .. })
    ));
}

#[test]
fn test_undecodable_record_is_skipped() {
    let request = "date=20200101,step=0/6/12";
    let (store, keys) = seeded_memory_store(request, PAYLOAD);
    store.archive(keys[1].clone(), b"GRIBbroken".to_vec());

    let view = ChunkedDataViewBuilder::new(store)
        .add_part(
            request,
            vec![AxisDefinition::chunked(["date"]), AxisDefinition::bulk(["step"])],
            grib(),
        )
        .with_config(ViewConfig {
            missing_fields: MissingFieldPolicy::Tolerate,
            fill_value: -999.0,
        })
        .build()
        .unwrap();

    let mut out = vec![0.0; view.count_chunk_values()];
    let fill = view.at(&[0, 0], &mut out).unwrap();
    assert_eq!(fill, ChunkFill::new(2, 3));
    assert_slice_approx_eq!(&out[..PAYLOAD], &record_values(0, PAYLOAD), 1e-2);
    assert!(out[PAYLOAD..2 * PAYLOAD].iter().all(|&v| v == -999.0));
    assert_slice_approx_eq!(&out[2 * PAYLOAD..], &record_values(2, PAYLOAD), 1e-2);
}

#[test]
fn test_query_without_records_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    populate_memory_store(&store, "date=20200101", |o, _| record_values(o, PAYLOAD));

    let view = ChunkedDataViewBuilder::new(store)
        .add_part(
            "date=20200101/20200102",
            vec![AxisDefinition::chunked(["date"])],
            grib(),
        )
        .build()
        .unwrap();

    view.chunk(&[0]).unwrap();
    assert!(matches!(view.chunk(&[1]), Err(ViewError::NoData { .. })));
}

#[test]
fn test_probe_failure_is_reported() {
    let store: Arc<dyn FieldStore> = Arc::new(MemoryStore::new());
    let err = ChunkedDataViewBuilder::new(store)
        .add_part("date=20200101", vec![AxisDefinition::chunked(["date"])], grib())
        .build()
        .unwrap_err();
    assert!(matches!(err, ViewError::Probe { .. }));
}

#[test]
fn test_view_from_yaml_definition() {
    let yaml = r#"
extension_axis: 1
parts:
  - request: "date=20200101/20200102,param=t/u"
    axes:
      - keys: [date]
      - keys: [param]
  - request: "date=20200101/20200102,param=v/w/z"
    axes:
      - keys: [date]
      - keys: [param]
"#;
    let definition = ViewDefinition::from_yaml_str(yaml).unwrap();
    let view = ChunkedDataViewBuilder::from_definition(&definition, two_part_store())
        .build()
        .unwrap();

    assert_eq!(view.shape(), &[2, 5, PAYLOAD]);
    let (values, _) = view.chunk(&[0, 2]).unwrap();
    assert_slice_approx_eq!(&values, &record_values(100, PAYLOAD), 1e-2);
}

#[test]
fn test_directory_store_end_to_end() {
    let request = "date=20200101/20200102,time=0/12";
    let (_dir, store) = seeded_directory_store(request, PAYLOAD);

    let view = ChunkedDataViewBuilder::new(Arc::new(store))
        .add_part(
            request,
            vec![AxisDefinition::bulk(["date"]), AxisDefinition::chunked(["time"])],
            grib(),
        )
        .build()
        .unwrap();

    assert_eq!(view.chunk_shape(), &[2, 1, PAYLOAD]);
    let (values, fill) = view.chunk(&[0, 1]).unwrap();
    assert!(fill.is_complete());
    let expected: Vec<f32> = [1, 3]
        .iter()
        .flat_map(|&r| record_values(r, PAYLOAD))
        .collect();
    assert_slice_approx_eq!(&values, &expected, 1e-2);
}

#[test]
fn test_concurrent_readers_share_a_view() {
    let request = "step=0/to/7";
    let (store, _) = seeded_memory_store(request, PAYLOAD);
    let view = Arc::new(
        ChunkedDataViewBuilder::new(store)
            .add_part(request, vec![AxisDefinition::chunked(["step"])], grib())
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|step| {
            let view = Arc::clone(&view);
            std::thread::spawn(move || {
                let (values, _) = view.chunk(&[step]).unwrap();
                (step, values)
            })
        })
        .collect();

    for handle in handles {
        let (step, values) = handle.join().unwrap();
        assert_slice_approx_eq!(&values, &record_values(step, PAYLOAD), 1e-2);
    }
}

#[test]
fn test_key_order_does_not_matter() {
    // Records archived in reverse order still land in axis order.
    let store = Arc::new(MemoryStore::new());
    let request = mars_request::Request::parse("step=0/6/12").unwrap();
    for (ordinal, key) in request.expand().into_iter().enumerate().rev() {
        store.archive(key, test_utils::grib_message(record_values(ordinal, PAYLOAD)));
    }
    let key: Key = "step=12".parse().unwrap();
    assert_eq!(store.keys()[0], key);

    let view = ChunkedDataViewBuilder::new(store)
        .add_part("step=0/6/12", vec![AxisDefinition::bulk(["step"])], grib())
        .build()
        .unwrap();
    let (values, _) = view.chunk(&[0]).unwrap();
    let expected: Vec<f32> = (0..3).flat_map(|r| record_values(r, PAYLOAD)).collect();
    assert_slice_approx_eq!(&values, &expected, 1e-2);
}
