use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use slot_booking::core::booking::BookingWriter;
use slot_booking::core::{AppointmentReader, BookingRequest, SlotWindow};
use slot_booking::domain::model::Appointment;
use slot_booking::utils::error::PersistenceKind;
use slot_booking::{BookingError, BookingFlow, MemoryStore, Scheduler};

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    june(day).and_hms_opt(h, m, s).unwrap()
}

fn seeded(id: &str, start: NaiveDateTime) -> Appointment {
    Appointment {
        id: id.to_string(),
        service_id: "consultation".to_string(),
        customer_name: "Existing Customer".to_string(),
        customer_email: "existing@x.com".to_string(),
        start_time: start,
    }
}

fn scheduler() -> (MemoryStore, Scheduler<MemoryStore>) {
    let store = MemoryStore::with_sample_catalog();
    let scheduler = Scheduler::new(store.clone(), SlotWindow::default());
    (store, scheduler)
}

/// Scenario A: 09:00 與 09:30 已被預約
#[tokio::test]
async fn test_first_two_slots_taken_on_booked_day() -> Result<()> {
    let (store, scheduler) = scheduler();
    store.seed_appointment(seeded("a", at(10, 9, 0, 0))).await?;
    store.seed_appointment(seeded("b", at(10, 9, 30, 0))).await?;

    let availability = scheduler.availability(june(10)).await?;

    assert_eq!(availability.len(), 16);
    assert!(availability[0].is_taken);
    assert!(availability[1].is_taken);
    assert!(availability[2..].iter().all(|a| !a.is_taken));
    Ok(())
}

/// Scenario B: 成功預約後當日清單包含 10:00
#[tokio::test]
async fn test_booking_shows_up_in_day_listing() -> Result<()> {
    let (store, scheduler) = scheduler();
    let request = BookingRequest::new("consultation", at(10, 10, 0, 0), "Jane", "jane@x.com");

    let id = scheduler.book(&request).await?;

    assert!(!id.is_empty());
    let starts = store.list_appointments_for_day(june(10)).await?;
    assert_eq!(starts, vec![at(10, 10, 0, 0)]);

    let availability = scheduler.availability(june(10)).await?;
    assert!(availability[2].is_taken);
    assert_eq!(availability.iter().filter(|a| a.is_taken).count(), 1);
    Ok(())
}

/// Scenario C: 同一時段同時送出兩筆，只有一筆成功
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_writes_for_same_start_yield_one_winner() -> Result<()> {
    let store = MemoryStore::with_sample_catalog();
    let request = BookingRequest::new("consultation", at(10, 10, 0, 0), "Jane", "jane@x.com");
    let rival = BookingRequest::new("consultation", at(10, 10, 0, 0), "John", "john@x.com");

    let first = {
        let writer = BookingWriter::new(store.clone());
        tokio::spawn(async move { writer.submit_booking(&request).await })
    };
    let second = {
        let writer = BookingWriter::new(store.clone());
        tokio::spawn(async move { writer.submit_booking(&rival).await })
    };

    let results = vec![first.await?, second.await?];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find_map(|r| r.err()).unwrap();
    assert!(matches!(
        loser,
        BookingError::Persistence {
            kind: PersistenceKind::Conflict,
            ..
        }
    ));
    assert!(loser.is_slot_taken());
    assert!(loser.user_friendly_message().contains("pick another"));
    assert_eq!(store.appointments().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_scheduler_bookings_yield_one_winner() -> Result<()> {
    let (store, scheduler) = scheduler();
    let request = BookingRequest::new("consultation", at(10, 14, 0, 0), "Jane", "jane@x.com");
    let rival = BookingRequest::new("follow-up", at(10, 14, 0, 0), "John", "john@x.com");

    let (a, b) = tokio::join!(scheduler.book(&request), scheduler.book(&rival));

    assert!(a.is_ok() ^ b.is_ok());
    let loser = a.err().or(b.err()).unwrap();
    assert!(loser.is_slot_taken());
    assert_eq!(store.appointments().await.len(), 1);
    Ok(())
}

/// Scenario D: 23:59:59 屬於當日，隔日 00:00:00 不屬於
#[tokio::test]
async fn test_day_boundary_is_half_open() -> Result<()> {
    let (store, scheduler) = scheduler();
    store.seed_appointment(seeded("late", at(10, 23, 59, 59))).await?;
    store.seed_appointment(seeded("next", at(11, 0, 0, 0))).await?;

    let booked = scheduler.booked_starts(june(10)).await?;

    assert_eq!(booked, vec![at(10, 23, 59, 59)]);
    Ok(())
}

#[tokio::test]
async fn test_stale_selection_rejected_before_write() -> Result<()> {
    let (store, scheduler) = scheduler();
    let availability = scheduler.availability(june(10)).await?;
    assert!(!availability[4].is_taken);

    // 其他人在讀取後搶先預約
    store.seed_appointment(seeded("other", at(10, 11, 0, 0))).await?;

    let request = BookingRequest::new("consultation", at(10, 11, 0, 0), "Jane", "jane@x.com");
    let err = scheduler.book(&request).await.unwrap_err();

    assert!(matches!(err, BookingError::StaleAvailability { .. }));
    assert!(err.is_slot_taken());
    assert_eq!(store.appointments().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_incomplete_requests_never_reach_the_store() -> Result<()> {
    let (store, scheduler) = scheduler();

    let mut missing_service = BookingRequest::new("consultation", at(10, 10, 0, 0), "Jane", "jane@x.com");
    missing_service.service_id = None;
    let mut missing_start = missing_service.clone();
    missing_start.service_id = Some("consultation".to_string());
    missing_start.start_time = None;
    let empty_name = BookingRequest::new("consultation", at(10, 10, 0, 0), "", "jane@x.com");
    let empty_email = BookingRequest::new("consultation", at(10, 10, 0, 0), "Jane", " ");

    for request in [missing_service, missing_start, empty_name, empty_email] {
        let err = scheduler.book(&request).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation { .. }), "{:?}", err);
    }

    assert!(store.appointments().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_off_grid_start_rejected() -> Result<()> {
    let (store, scheduler) = scheduler();

    for start in [at(10, 8, 30, 0), at(10, 17, 0, 0), at(10, 10, 15, 0)] {
        let request = BookingRequest::new("consultation", start, "Jane", "jane@x.com");
        let err = scheduler.book(&request).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation { .. }));
    }

    assert!(store.appointments().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_service_lookup() -> Result<()> {
    let (_, scheduler) = scheduler();

    assert_eq!(scheduler.find_service("consultation").await?.name, "Consultation");
    assert!(matches!(
        scheduler.find_service("missing").await,
        Err(BookingError::Validation { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_wizard_end_to_end_with_conflict_then_retry() -> Result<()> {
    let (store, scheduler) = scheduler();
    let service = scheduler.find_service("consultation").await?;

    let mut flow = BookingFlow::new();
    flow.select_service(service)?;
    flow.select_date(june(10), scheduler.availability(june(10)).await?)?;
    flow.select_slot(at(10, 10, 0, 0))?;
    flow.set_details("Jane", "jane@x.com")?;

    // 另一位使用者先完成預約
    store.seed_appointment(seeded("rival", at(10, 10, 0, 0))).await?;

    let request = flow.begin_submit()?;
    let outcome = scheduler.book(&request).await;
    flow.complete(&outcome)?;

    let stale_day = match &flow {
        BookingFlow::SelectingDate {
            stale_day: Some(day),
            ..
        } => *day,
        other => panic!("unexpected state {:?}", other),
    };

    // 重新讀取並改選其他時段
    flow.select_date(stale_day, scheduler.availability(stale_day).await?)?;
    assert!(flow.select_slot(at(10, 10, 0, 0)).is_err());
    flow.select_slot(at(10, 10, 30, 0))?;
    flow.set_details("Jane", "jane@x.com")?;

    let request = flow.begin_submit()?;
    let outcome = scheduler.book(&request).await;
    flow.complete(&outcome)?;

    assert_eq!(flow.step_name(), "done");
    assert_eq!(store.appointments().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_operator_listing_includes_service_details() -> Result<()> {
    let (_, scheduler) = scheduler();
    scheduler
        .book(&BookingRequest::new("deep-tissue", at(12, 9, 0, 0), "Ann", "ann@x.com"))
        .await?;
    scheduler
        .book(&BookingRequest::new("consultation", at(10, 16, 30, 0), "Bob", "bob@x.com"))
        .await?;

    let listing = scheduler.operator_listing(at(11, 0, 0, 0)).await?;

    assert_eq!(listing.total(), 2);
    let first = &listing.entries[0];
    assert_eq!(first.summary.appointment.customer_name, "Bob");
    assert_eq!(first.summary.service_name, "Consultation");
    assert!(first.is_finished);
    let second = &listing.entries[1];
    assert_eq!(second.summary.service_name, "Deep Tissue Massage");
    assert_eq!(second.summary.service_price, 90.0);
    assert!(!second.is_finished);
    Ok(())
}

#[tokio::test]
async fn test_selectable_days_follow_horizon() {
    let (_, scheduler) = scheduler();
    let days = scheduler.selectable_days(june(28), 14);
    assert_eq!(days.len(), 14);
    assert_eq!(days[13], NaiveDate::from_ymd_opt(2024, 7, 11).unwrap());
}
