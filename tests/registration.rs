//! Registration workflow tests, run against both store backends

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tokio_test::{assert_err, assert_ok};

use guerite_server::{
    config::{DatabaseConfig, LiveViewConfig, RegistrationConfig},
    models::{NewVisit, Photo, Photos, VisitorFields},
    repository::{InMemoryStore, RecordStore, SqliteStore},
    services::Services,
    AppError,
};

async fn stores() -> Vec<(&'static str, Arc<dyn RecordStore>)> {
    vec![
        ("memory", Arc::new(InMemoryStore::new())),
        (
            "sqlite",
            Arc::new(SqliteStore::in_memory().await.expect("sqlite store")),
        ),
    ]
}

fn services(store: Arc<dyn RecordStore>) -> Services {
    Services::new(
        store,
        &RegistrationConfig::default(),
        &LiveViewConfig::default(),
    )
}

fn doe(last_name: &str) -> VisitorFields {
    VisitorFields {
        last_name: last_name.into(),
        first_names: "John".into(),
        birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        birth_place: "Abidjan".into(),
        phone: "0102030405".into(),
        national_id_number: "123456789012".into(),
        occupation: "Engineer".into(),
    }
}

fn at(date: (i32, u32, u32), time: (u32, u32, u32)) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(date.0, date.1, date.2)
        .unwrap()
        .and_hms_opt(time.0, time.1, time.2)
        .unwrap()
}

fn photo(tag: &str) -> Photo {
    Photo::parse(format!("data:image/jpeg;base64,{}", tag)).unwrap()
}

#[tokio::test]
async fn test_first_and_returning_visit() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let registration = &services.registration;

        let first = registration
            .record_visit(&doe("Doe"), Photos::default())
            .await
            .unwrap();
        assert_eq!(first.visitor_id, 1, "{}", backend);
        assert!(first.is_new_visitor, "{}", backend);

        let visits = store.list_visits().await.unwrap();
        assert_eq!(visits.len(), 1, "{}", backend);
        assert_eq!(visits[0].visitor_id, 1);
        assert_eq!(visits[0].national_id_number, "123456789012");
        assert!(visits[0].exit_time.is_none());

        let second = registration
            .record_visit(&doe("Doe2"), Photos::default())
            .await
            .unwrap();
        assert_eq!(second.visitor_id, 1, "{}", backend);
        assert!(!second.is_new_visitor, "{}", backend);

        let visitor = store
            .get_visitor_by_national_id("123456789012")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(visitor.last_name, "Doe", "{}", backend);
        assert_eq!(store.list_visitors().await.unwrap().len(), 1);
        assert_eq!(
            store
                .list_visits_by_national_id("123456789012")
                .await
                .unwrap()
                .len(),
            2,
            "{}",
            backend
        );
    }
}

#[tokio::test]
async fn test_deregister_cascades_and_is_idempotent() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let registration = &services.registration;

        let kept = VisitorFields {
            national_id_number: "CI00000001".into(),
            ..doe("Other")
        };
        let kept_visit = registration
            .record_visit(&kept, Photos::default())
            .await
            .unwrap();

        let recorded = registration
            .record_visit(&doe("Doe"), Photos::default())
            .await
            .unwrap();
        for _ in 0..3 {
            registration
                .record_visit(&doe("Doe"), Photos::default())
                .await
                .unwrap();
        }

        assert_ok!(registration.deregister_visitor(recorded.visitor_id).await);
        assert_ok!(registration.deregister_visitor(recorded.visitor_id).await);

        let visits = store.list_visits().await.unwrap();
        assert!(
            visits.iter().all(|v| v.visitor_id != recorded.visitor_id),
            "{}",
            backend
        );
        assert_eq!(visits.len(), 1, "{}", backend);
        assert_eq!(visits[0].id, kept_visit.visit_id);

        let visitors = store.list_visitors().await.unwrap();
        assert_eq!(visitors.len(), 1, "{}", backend);
        assert!(store
            .get_visitor_by_national_id("123456789012")
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn test_everything_removed_after_single_deregister() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let recorded = services
            .registration
            .record_visit(&doe("Doe"), Photos::default())
            .await
            .unwrap();

        services
            .registration
            .deregister_visitor(recorded.visitor_id)
            .await
            .unwrap();

        assert!(store.list_visitors().await.unwrap().is_empty(), "{}", backend);
        assert!(store.list_visits().await.unwrap().is_empty(), "{}", backend);
    }
}

#[tokio::test]
async fn test_uniqueness_across_creates() {
    for (backend, store) in stores().await {
        assert_ok!(store.create_visitor(&doe("A")).await);
        for name in ["B", "C", "D"] {
            let err = store.create_visitor(&doe(name)).await.unwrap_err();
            assert!(err.is_constraint_violation(), "{}: {:?}", backend, err);
        }

        let matching = store
            .list_visitors()
            .await
            .unwrap()
            .into_iter()
            .filter(|v| v.national_id_number == "123456789012")
            .count();
        assert_eq!(matching, 1, "{}", backend);
    }
}

#[tokio::test]
async fn test_history_newest_first() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let registration = &services.registration;

        let t1 = at((2024, 1, 5), (9, 0, 0));
        let t2 = at((2024, 1, 5), (14, 30, 0));
        let t3 = at((2024, 2, 1), (8, 15, 0));

        // Recorded out of order on purpose
        let v2 = registration
            .record_visit_at(&doe("Doe"), Photos::default(), t2)
            .await
            .unwrap();
        let v3 = registration
            .record_visit_at(&doe("Doe"), Photos::default(), t3)
            .await
            .unwrap();
        let v1 = registration
            .record_visit_at(&doe("Doe"), Photos::default(), t1)
            .await
            .unwrap();

        let history = services.history.history_for("123456789012").await.unwrap();
        let ids: Vec<i64> = history.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![v3.visit_id, v2.visit_id, v1.visit_id], "{}", backend);
        assert_eq!(history[0].entry_time, "08:15:00");

        assert!(services.history.history_for("").await.unwrap().is_empty());
        assert!(services
            .history
            .history_for("UNKNOWN-ID")
            .await
            .unwrap()
            .is_empty());
    }
}

#[tokio::test]
async fn test_history_ties_newest_insert_first() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let visit = NewVisit {
            visitor_id: 1,
            national_id_number: "123456789012".into(),
            visit_date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            entry_time: "10:00:00".into(),
            exit_time: None,
            reason: None,
            notes: None,
        };
        let first = store.create_visit(&visit).await.unwrap();
        let second = store.create_visit(&visit).await.unwrap();

        let history = services.history.history_for("123456789012").await.unwrap();
        assert_eq!(history[0].id, second, "{}", backend);
        assert_eq!(history[1].id, first, "{}", backend);
    }
}

#[tokio::test]
async fn test_short_identifier_is_not_looked_up() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        services
            .registration
            .record_visit(&doe("Doe"), Photos::default())
            .await
            .unwrap();

        // Prefix of a stored ID, and too short to check
        assert!(
            services.duplicates.detect("1234").await.unwrap().is_none(),
            "{}",
            backend
        );
        assert!(services
            .duplicates
            .detect("123456789012")
            .await
            .unwrap()
            .is_some());
    }
}

#[tokio::test]
async fn test_check_out_last_write_wins() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let registration = &services.registration;
        let recorded = registration
            .record_visit(&doe("Doe"), Photos::default())
            .await
            .unwrap();

        registration
            .check_out(recorded.visit_id, Some("18:30:00".into()))
            .await
            .unwrap();
        let history = services.history.history_for("123456789012").await.unwrap();
        assert_eq!(history[0].exit_time.as_deref(), Some("18:30:00"), "{}", backend);

        registration
            .check_out(recorded.visit_id, Some("19:00:00".into()))
            .await
            .unwrap();
        let history = services.history.history_for("123456789012").await.unwrap();
        assert_eq!(history[0].exit_time.as_deref(), Some("19:00:00"), "{}", backend);

        // Store level: unknown visit is a no-op
        assert!(!store.update_visit_exit(9999, "20:00:00").await.unwrap());
        let err = assert_err!(registration.check_out(9999, None).await);
        assert!(matches!(err, AppError::NotFound { .. }), "{}", backend);
    }
}

#[tokio::test]
async fn test_photos_attach_and_merge() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let registration = &services.registration;

        let first = registration
            .record_visit(
                &doe("Doe"),
                Photos {
                    front: Some(photo("front1")),
                    back: Some(photo("back1")),
                },
            )
            .await
            .unwrap();

        let visitor = store.get_visitor(first.visitor_id).await.unwrap().unwrap();
        assert_eq!(visitor.front_photo, Some(photo("front1")), "{}", backend);
        assert_eq!(visitor.back_photo, Some(photo("back1")), "{}", backend);

        // Returning visitor re-captures only the front
        registration
            .record_visit(
                &doe("Doe"),
                Photos {
                    front: Some(photo("front2")),
                    back: None,
                },
            )
            .await
            .unwrap();

        let visitor = store.get_visitor(first.visitor_id).await.unwrap().unwrap();
        assert_eq!(visitor.front_photo, Some(photo("front2")), "{}", backend);
        assert_eq!(visitor.back_photo, Some(photo("back1")), "{}", backend);

        let updated = registration
            .attach_photos(
                first.visitor_id,
                Photos {
                    front: None,
                    back: Some(photo("back3")),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.front_photo, Some(photo("front2")));
        assert_eq!(updated.back_photo, Some(photo("back3")));

        registration
            .deregister_visitor(first.visitor_id)
            .await
            .unwrap();
        let err = assert_err!(
            registration
                .attach_photos(first.visitor_id, Photos::default())
                .await
        );
        assert!(matches!(err, AppError::NotFound { .. }), "{}", backend);
        let err = assert_err!(
            store
                .update_visitor_photos(first.visitor_id, None, None)
                .await
        );
        assert!(matches!(err, AppError::NotFound { .. }), "{}", backend);
    }
}

async fn race_first_visits(backend: &str, store: Arc<dyn RecordStore>) {
    let services = Arc::new(services(store.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let services = services.clone();
            tokio::spawn(async move {
                services
                    .registration
                    .record_visit(&doe(&format!("Racer{}", i)), Photos::default())
                    .await
            })
        })
        .collect();

    let mut visitor_ids = Vec::new();
    let mut created = 0;
    for handle in handles {
        let recorded = handle.await.unwrap().unwrap();
        visitor_ids.push(recorded.visitor_id);
        if recorded.is_new_visitor {
            created += 1;
        }
    }

    visitor_ids.dedup();
    assert_eq!(visitor_ids.len(), 1, "{}", backend);
    assert_eq!(created, 1, "{}", backend);
    assert_eq!(store.list_visitors().await.unwrap().len(), 1, "{}", backend);
    assert_eq!(store.list_visits().await.unwrap().len(), 8, "{}", backend);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_visits_share_one_visitor() {
    for (backend, store) in stores().await {
        race_first_visits(backend, store).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_visits_on_database_file() {
    let dir = std::env::temp_dir().join(format!("guerite-race-{}", std::process::id()));
    let config = DatabaseConfig {
        path: dir.join("guerite.db").display().to_string(),
        ..DatabaseConfig::default()
    };
    assert!(config.max_connections > 1);
    let _ = std::fs::remove_dir_all(&dir);

    let store = SqliteStore::open(&config).await.expect("sqlite file store");
    race_first_visits("sqlite-file", Arc::new(store)).await;

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_padded_national_id_reuses_visitor() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let padded = VisitorFields {
            national_id_number: " 12345678 ".into(),
            ..doe("Doe")
        };

        let first = assert_ok!(
            services
                .registration
                .record_visit(&padded, Photos::default())
                .await
        );
        let second = assert_ok!(
            services
                .registration
                .record_visit(&padded, Photos::default())
                .await
        );
        assert!(first.is_new_visitor, "{}", backend);
        assert!(!second.is_new_visitor, "{}", backend);
        assert_eq!(first.visitor_id, second.visitor_id, "{}", backend);

        let visitors = store.list_visitors().await.unwrap();
        assert_eq!(visitors.len(), 1, "{}", backend);
        assert_eq!(visitors[0].national_id_number, "12345678", "{}", backend);
        assert_eq!(
            services.history.history_for(" 12345678").await.unwrap().len(),
            2,
            "{}",
            backend
        );
    }
}

#[tokio::test]
async fn test_padded_short_national_id_rejected() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let padded = VisitorFields {
            national_id_number: "1234567 ".into(),
            ..doe("Doe")
        };

        for _ in 0..2 {
            let err = assert_err!(
                services
                    .registration
                    .record_visit(&padded, Photos::default())
                    .await
            );
            assert!(matches!(err, AppError::MalformedInput(_)), "{}", backend);
        }
        assert!(store.list_visitors().await.unwrap().is_empty(), "{}", backend);
        assert!(store.list_visits().await.unwrap().is_empty(), "{}", backend);
    }
}

#[tokio::test]
async fn test_live_view_sees_registration() {
    for (backend, store) in stores().await {
        let services = services(store.clone());
        let view = services.live_view();
        let mut updates = view.subscribe();

        services
            .registration
            .record_visit(&doe("Doe"), Photos::default())
            .await
            .unwrap();

        let snapshot = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.visits.len() == 1 && snapshot.visitors.len() == 1 {
                    return snapshot;
                }
                updates.changed().await.unwrap();
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{}: live view never caught up", backend));

        assert_eq!(snapshot.visitors[0].last_name, "Doe");
        view.stop().await;
    }
}
