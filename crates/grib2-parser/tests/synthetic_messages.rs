//! Parse and decode messages produced by the synthetic builder.

use bytes::Bytes;
use chrono::{Datelike, Timelike};
use grib2_parser::{Grib2Error, Grib2Message, Grib2Reader};
use test_utils::{assert_approx_eq, assert_slice_approx_eq, create_test_grid, Grib2Builder};

#[test]
fn test_message_sections_are_parsed() {
    let data = Grib2Builder::new()
        .with_reference_time(2020, 3, 4, 12)
        .with_grid(5, 4)
        .with_parameter(2, 3)
        .with_level(100, 850)
        .with_forecast_hour(6)
        .build();

    let msg = Grib2Message::parse(Bytes::from(data)).expect("parse");

    assert_eq!(msg.indicator.edition, 2);
    assert_eq!(msg.identification.center, 98);
    assert_eq!(msg.identification.reference_time.year(), 2020);
    assert_eq!(msg.identification.reference_time.month(), 3);
    assert_eq!(msg.identification.reference_time.hour(), 12);
    assert_eq!(msg.grid_dims(), (4, 5));
    assert_eq!(msg.num_values(), 20);
    assert_eq!(msg.grid_definition.first_latitude, 90_000_000);
    assert_eq!(msg.product_definition.parameter_category, 2);
    assert_eq!(msg.product_definition.parameter_number, 3);
    assert_eq!(msg.product_definition.level_type, 100);
    assert_eq!(msg.product_definition.level_value, 850);
    assert_eq!(msg.product_definition.forecast_time, 6);
    assert!(!msg.bitmap.is_present());
}

#[test]
fn test_grid_values_round_trip() {
    let grid = create_test_grid(6, 3);
    let data = Grib2Builder::new().with_grid(6, 3).with_data(grid.clone()).build();

    let msg = Grib2Message::parse(Bytes::from(data)).unwrap();
    assert_eq!(msg.data_representation.bits_per_value, 16);
    assert!(msg.data_representation.binary_scale_factor < 0);

    let values = msg.unpack_data().unwrap();
    assert_slice_approx_eq!(&values, &grid, 1e-3);
}

#[test]
fn test_constant_field_decodes_to_reference() {
    let data = Grib2Builder::new().with_grid(3, 3).with_constant_value(273.5).build();
    let msg = Grib2Message::parse(Bytes::from(data)).unwrap();
    assert_eq!(msg.data_representation.bits_per_value, 0);

    let values = msg.unpack_data().unwrap();
    assert_eq!(values.len(), 9);
    for v in values {
        assert_approx_eq!(v, 273.5, 1e-6);
    }
}

#[test]
fn test_bitmap_points_decode_as_nan() {
    let data = Grib2Builder::new()
        .with_values(vec![10.0, 0.0, 12.0, 0.0, 14.0])
        .with_bitmap(vec![true, false, true, false, true])
        .build();

    let msg = Grib2Message::parse(Bytes::from(data)).unwrap();
    assert!(msg.bitmap.is_present());
    assert_eq!(msg.data_representation.num_data_points, 3);

    let values = msg.unpack_data().unwrap();
    assert_slice_approx_eq!(&values, &[10.0, f32::NAN, 12.0, f32::NAN, 14.0], 1e-3);
}

#[test]
fn test_unsupported_packing_template() {
    let data = Grib2Builder::new().with_packing_template(40).build();
    let msg = Grib2Message::parse(Bytes::from(data)).unwrap();
    assert!(matches!(msg.unpack_data(), Err(Grib2Error::UnsupportedPacking(40))));
}

#[test]
fn test_reader_iterates_concatenated_messages() {
    let mut buffer = Vec::new();
    for step in 0..3u32 {
        buffer.extend(
            Grib2Builder::new()
                .with_values(vec![step as f32, step as f32 + 1.0])
                .with_forecast_hour(step)
                .build(),
        );
    }
    let total = buffer.len();

    let mut reader = Grib2Reader::new(Bytes::from(buffer));
    let mut steps = Vec::new();
    while let Some(msg) = reader.next_message().unwrap() {
        steps.push(msg.product_definition.forecast_time);
        assert_eq!(msg.num_values(), 2);
    }
    assert_eq!(steps, vec![0, 1, 2]);
    assert_eq!(reader.offset(), total);
}

#[test]
fn test_trailing_garbage_is_reported() {
    let mut buffer = Grib2Builder::new().build();
    buffer.extend_from_slice(b"junk");

    let results: Vec<_> = Grib2Reader::new(Bytes::from(buffer)).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[test]
fn test_truncated_message_is_rejected() {
    let mut data = Grib2Builder::new().with_values(vec![1.0, 2.0]).build();
    data.truncate(data.len() - 6);

    let mut reader = Grib2Reader::new(Bytes::from(data.clone()));
    assert!(reader.next_message().is_err());
    assert!(Grib2Message::parse(Bytes::from(data)).is_err());
}
