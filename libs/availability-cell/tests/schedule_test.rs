// libs/availability-cell/tests/schedule_test.rs
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use uuid::Uuid;

use availability_cell::models::{AvailabilityException, AvailabilityRule, ExceptionKind, RuleKind};
use availability_cell::AvailabilityService;
use shared_models::TimeRange;

fn monday_window() -> TimeRange {
    // 2026-03-02 is a Monday.
    TimeRange::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

fn utc_range(day: u32, start_hour: u32, end_hour: u32) -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2026, 3, day, start_hour, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 3, day, end_hour, 0, 0).unwrap(),
    )
    .unwrap()
}

fn weekday_rule(provider_id: Uuid, weekday: Weekday, start_hour: u32, end_hour: u32) -> AvailabilityRule {
    AvailabilityRule {
        id: Uuid::new_v4(),
        provider_id,
        kind: RuleKind::Recurring {
            weekday,
            start_time: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap(),
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_until: None,
        },
    }
}

#[tokio::test]
async fn blackout_splits_recurring_day() {
    let service = AvailabilityService::new();
    let provider_id = Uuid::new_v4();

    service.add_rule(weekday_rule(provider_id, Weekday::Mon, 9, 17)).await.unwrap();
    service
        .apply_exception(AvailabilityException {
            id: Uuid::new_v4(),
            provider_id,
            window: utc_range(2, 12, 13),
            kind: ExceptionKind::Blackout,
        })
        .await;

    let available = service.resolve_available(provider_id, monday_window()).await;
    assert_eq!(available, vec![utc_range(2, 9, 12), utc_range(2, 13, 17)]);
}

#[tokio::test]
async fn add_exception_unions_with_rules() {
    let service = AvailabilityService::new();
    let provider_id = Uuid::new_v4();

    service.add_rule(weekday_rule(provider_id, Weekday::Mon, 9, 12)).await.unwrap();
    service
        .apply_exception(AvailabilityException {
            id: Uuid::new_v4(),
            provider_id,
            window: utc_range(2, 11, 14),
            kind: ExceptionKind::Add,
        })
        .await;

    let available = service.resolve_available(provider_id, monday_window()).await;
    assert_eq!(available, vec![utc_range(2, 9, 14)]);
}

#[tokio::test]
async fn exception_order_does_not_change_result() {
    let provider_id = Uuid::new_v4();
    let blackout = AvailabilityException {
        id: Uuid::new_v4(),
        provider_id,
        window: utc_range(2, 12, 13),
        kind: ExceptionKind::Blackout,
    };
    let add = AvailabilityException {
        id: Uuid::new_v4(),
        provider_id,
        window: utc_range(2, 18, 19),
        kind: ExceptionKind::Add,
    };

    let forward = AvailabilityService::new();
    forward.add_rule(weekday_rule(provider_id, Weekday::Mon, 9, 17)).await.unwrap();
    forward.apply_exception(blackout.clone()).await;
    forward.apply_exception(add.clone()).await;

    let reversed = AvailabilityService::new();
    reversed.apply_exception(add).await;
    reversed.apply_exception(blackout).await;
    reversed.add_rule(weekday_rule(provider_id, Weekday::Mon, 9, 17)).await.unwrap();

    let window = monday_window();
    assert_eq!(
        forward.resolve_available(provider_id, window).await,
        reversed.resolve_available(provider_id, window).await
    );
}

#[tokio::test]
async fn resolve_is_idempotent() {
    let service = AvailabilityService::new();
    let provider_id = Uuid::new_v4();
    service.add_rule(weekday_rule(provider_id, Weekday::Mon, 9, 17)).await.unwrap();

    let first = service.resolve_available(provider_id, monday_window()).await;
    let second = service.resolve_available(provider_id, monday_window()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn recurring_rule_honors_validity_window() {
    let service = AvailabilityService::new();
    let provider_id = Uuid::new_v4();

    service
        .add_rule(AvailabilityRule {
            id: Uuid::new_v4(),
            provider_id,
            kind: RuleKind::Recurring {
                weekday: Weekday::Mon,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                effective_until: Some(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()),
            },
        })
        .await
        .unwrap();

    // The rule expired two days before the queried Monday.
    let available = service.resolve_available(provider_id, monday_window()).await;
    assert!(available.is_empty());
}

#[tokio::test]
async fn one_off_rules_are_clipped_to_the_query_window() {
    let service = AvailabilityService::new();
    let provider_id = Uuid::new_v4();

    service
        .add_rule(AvailabilityRule {
            id: Uuid::new_v4(),
            provider_id,
            kind: RuleKind::OneOff(
                TimeRange::new(
                    Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2026, 3, 3, 2, 0, 0).unwrap(),
                )
                .unwrap(),
            ),
        })
        .await
        .unwrap();

    let available = service.resolve_available(provider_id, monday_window()).await;
    assert_eq!(
        available,
        vec![TimeRange::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap(),
        )
        .unwrap()]
    );
}

#[tokio::test]
async fn unknown_provider_has_no_availability() {
    let service = AvailabilityService::new();
    let available = service.resolve_available(Uuid::new_v4(), monday_window()).await;
    assert!(available.is_empty());
}

#[tokio::test]
async fn inverted_recurring_times_are_rejected() {
    let service = AvailabilityService::new();
    let provider_id = Uuid::new_v4();

    let result = service
        .add_rule(AvailabilityRule {
            id: Uuid::new_v4(),
            provider_id,
            kind: RuleKind::Recurring {
                weekday: Weekday::Mon,
                start_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                effective_until: None,
            },
        })
        .await;

    assert_matches::assert_matches!(result, Err(shared_models::SchedulingError::InvalidRange(_)));
}

#[tokio::test]
async fn snapshot_replace_discards_previous_exceptions() {
    let service = AvailabilityService::new();
    let provider_id = Uuid::new_v4();
    service.add_rule(weekday_rule(provider_id, Weekday::Mon, 9, 17)).await.unwrap();

    // An applied all-day blackout wipes the Monday entirely.
    service
        .apply_exception(AvailabilityException {
            id: Uuid::new_v4(),
            provider_id,
            window: utc_range(2, 9, 17),
            kind: ExceptionKind::Blackout,
        })
        .await;
    assert!(service.resolve_available(provider_id, monday_window()).await.is_empty());

    // A fresh snapshot replaces it; only the snapshot's lunch blackout remains.
    service
        .replace_exceptions(
            provider_id,
            vec![AvailabilityException {
                id: Uuid::new_v4(),
                provider_id,
                window: utc_range(2, 12, 13),
                kind: ExceptionKind::Blackout,
            }],
        )
        .await;

    let available = service.resolve_available(provider_id, monday_window()).await;
    assert_eq!(available, vec![utc_range(2, 9, 12), utc_range(2, 13, 17)]);
}

#[tokio::test]
async fn removed_exception_stops_applying() {
    let service = AvailabilityService::new();
    let provider_id = Uuid::new_v4();
    let exception_id = Uuid::new_v4();

    service.add_rule(weekday_rule(provider_id, Weekday::Mon, 9, 17)).await.unwrap();
    service
        .apply_exception(AvailabilityException {
            id: exception_id,
            provider_id,
            window: utc_range(2, 9, 17),
            kind: ExceptionKind::Blackout,
        })
        .await;

    assert!(service.resolve_available(provider_id, monday_window()).await.is_empty());

    service.remove_exception(provider_id, exception_id).await.unwrap();
    assert_eq!(service.resolve_available(provider_id, monday_window()).await, vec![utc_range(2, 9, 17)]);
}
