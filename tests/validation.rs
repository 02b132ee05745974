//! Validation behaviour over adversarial inputs.

use aerosense::events::EventEmitter;
use aerosense::reading::RawReading;
use aerosense::state::PipelineState;
use aerosense::steps::{Step, StepContext, StepError, ValidateReadings};
use proptest::prelude::*;

mod common;
use common::raw_at;

fn ctx() -> StepContext {
    StepContext {
        run_id: "validation".to_string(),
        step_number: 1,
        events: EventEmitter::disabled(),
    }
}

async fn validate(raw: Vec<RawReading>) -> Result<(Vec<aerosense::reading::Reading>, usize), StepError> {
    let state = PipelineState::new(raw, 3);
    let update = ValidateReadings.run(&state, ctx()).await?;
    Ok((
        update.readings.expect("validation always writes readings"),
        update.dropped_readings.unwrap_or(0),
    ))
}

#[tokio::test]
async fn mixed_input_keeps_only_trustworthy_rows() {
    let raw = vec![
        raw_at(0, 10.0, 20.0),
        RawReading {
            timestamp: Some("08/01/2026 10:00".to_string()), // wrong format
            pm25: Some(10.0),
            pm10: Some(20.0),
        },
        RawReading {
            timestamp: Some("2026-08-01T02:00:00Z".to_string()),
            pm25: None,
            pm10: Some(20.0),
        },
        raw_at(3, 15.0, -0.1),
        raw_at(4, 0.0, 0.0), // zero is valid
    ];

    let (readings, dropped) = validate(raw).await.unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(dropped, 3);
    assert_eq!(readings[1].pm25, 0.0);
}

#[tokio::test]
async fn order_is_preserved() {
    // deliberately unsorted timestamps; validation must not reorder
    let raw = vec![raw_at(5, 1.0, 1.0), raw_at(2, 2.0, 2.0), raw_at(9, 3.0, 3.0)];
    let (readings, _) = validate(raw).await.unwrap();
    let values: Vec<f64> = readings.iter().map(|r| r.pm25).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
}

#[tokio::test]
async fn every_row_invalid_is_no_valid_data_not_a_crash() {
    let raw = vec![raw_at(0, -5.0, 20.0), raw_at(1, -6.0, 21.0)];
    let err = validate(raw).await.unwrap_err();
    assert!(matches!(err, StepError::NoValidData { dropped: 2 }));
}

fn candidate_strategy() -> impl Strategy<Value = RawReading> {
    (
        proptest::option::of(0u32..48),
        proptest::option::of(-100.0f64..500.0),
        proptest::option::of(-100.0f64..900.0),
    )
        .prop_map(|(hour, pm25, pm10)| RawReading {
            timestamp: hour.map(|h| format!("2026-08-{:02}T{:02}:00:00Z", 1 + h / 24, h % 24)),
            pm25,
            pm10,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any input with at least one valid reading: output length never
    /// exceeds input length and every survivor is non-negative.
    #[test]
    fn survivors_are_bounded_and_non_negative(mut raw in proptest::collection::vec(candidate_strategy(), 0..40)) {
        // guarantee at least one valid row so validation cannot legitimately fail
        raw.push(RawReading::new("2026-08-03T00:00:00Z", 1.0, 2.0));
        let total = raw.len();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (readings, dropped) = rt.block_on(validate(raw)).unwrap();

        prop_assert!(readings.len() <= total);
        prop_assert_eq!(readings.len() + dropped, total);
        for reading in &readings {
            prop_assert!(reading.pm25 >= 0.0);
            prop_assert!(reading.pm10 >= 0.0);
        }
    }
}
