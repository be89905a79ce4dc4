mod common;

use birthday_core::{
    open_db, open_db_in_memory, SqliteSubscriptionRepository, Subscription, SubscriptionError,
    SubscriptionRepository, SubscriptionService, SubscriptionValidationError,
};
use common::{all_edges, date, edge_count, register};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn subscribe_twice_keeps_single_edge() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let bob = register(&conn, "Bob", date(1991, 4, 11));
    let repo = SqliteSubscriptionRepository::new(&conn);

    repo.subscribe(Subscription::new(ann.id, bob.id)).unwrap();
    let err = repo
        .subscribe(Subscription::new(ann.id, bob.id))
        .unwrap_err();

    assert!(matches!(err, SubscriptionError::AlreadySubscribed(edge) if edge == Subscription::new(ann.id, bob.id)));
    assert_eq!(edge_count(&conn, ann.id, bob.id), 1);
}

#[test]
fn edges_are_directed() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let bob = register(&conn, "Bob", date(1991, 4, 11));
    let repo = SqliteSubscriptionRepository::new(&conn);

    repo.subscribe(Subscription::new(ann.id, bob.id)).unwrap();
    repo.subscribe(Subscription::new(bob.id, ann.id)).unwrap();

    assert_eq!(all_edges(&conn), vec![(ann.id, bob.id), (bob.id, ann.id)]);
}

#[test]
fn unsubscribe_without_edge_fails_and_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let bob = register(&conn, "Bob", date(1991, 4, 11));
    let cid = register(&conn, "Cid", date(1992, 5, 12));
    let repo = SqliteSubscriptionRepository::new(&conn);
    repo.subscribe(Subscription::new(cid.id, bob.id)).unwrap();

    let err = repo
        .unsubscribe(Subscription::new(ann.id, bob.id))
        .unwrap_err();

    assert!(matches!(err, SubscriptionError::NotSubscribed(_)));
    assert!(err.is_client_error());
    assert_eq!(all_edges(&conn), vec![(cid.id, bob.id)]);
}

#[test]
fn subscribe_then_unsubscribe_restores_empty_store() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let bob = register(&conn, "Bob", date(1991, 4, 11));
    let repo = SqliteSubscriptionRepository::new(&conn);

    repo.subscribe(Subscription::new(ann.id, bob.id)).unwrap();
    repo.unsubscribe(Subscription::new(ann.id, bob.id)).unwrap();

    assert!(all_edges(&conn).is_empty());
    assert!(matches!(
        repo.unsubscribe(Subscription::new(ann.id, bob.id)),
        Err(SubscriptionError::NotSubscribed(_))
    ));
}

#[test]
fn self_subscription_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let repo = SqliteSubscriptionRepository::new(&conn);

    let err = repo
        .subscribe(Subscription::new(ann.id, ann.id))
        .unwrap_err();

    assert!(matches!(
        err,
        SubscriptionError::Validation(SubscriptionValidationError::SelfSubscription(id)) if id == ann.id
    ));
    assert!(all_edges(&conn).is_empty());
}

#[test]
fn subscribe_to_unknown_user_reports_missing_id() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let repo = SqliteSubscriptionRepository::new(&conn);

    let err = repo.subscribe(Subscription::new(ann.id, 404)).unwrap_err();
    assert!(matches!(err, SubscriptionError::UserNotFound(404)));

    let err = repo.subscribe(Subscription::new(405, ann.id)).unwrap_err();
    assert!(matches!(err, SubscriptionError::UserNotFound(405)));
    assert!(all_edges(&conn).is_empty());
}

#[test]
fn available_list_excludes_self_and_followed_users() {
    let conn = open_db_in_memory().unwrap();
    let u1 = register(&conn, "Ann", date(1990, 3, 10));
    let u2 = register(&conn, "Bob", date(1991, 4, 11));
    let u3 = register(&conn, "Cid", date(1992, 5, 12));
    let repo = SqliteSubscriptionRepository::new(&conn);
    repo.subscribe(Subscription::new(u1.id, u2.id)).unwrap();

    let available = repo.list_available_for_subscription(u1.id).unwrap();
    assert_eq!(available, vec![u3.clone()]);

    let for_bob = repo.list_available_for_subscription(u2.id).unwrap();
    assert_eq!(for_bob, vec![u1, u3]);
}

#[test]
fn available_list_for_sole_user_is_empty() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let repo = SqliteSubscriptionRepository::new(&conn);

    assert!(repo.list_available_for_subscription(ann.id).unwrap().is_empty());
}

#[test]
fn subscribers_are_listed_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let honoree = register(&conn, "Ann", date(1990, 3, 10));
    let s1 = register(&conn, "Bob", date(1991, 4, 11));
    let s2 = register(&conn, "Cid", date(1992, 5, 12));
    let outsider = register(&conn, "Dan", date(1993, 6, 13));
    let repo = SqliteSubscriptionRepository::new(&conn);
    repo.subscribe(Subscription::new(s2.id, honoree.id)).unwrap();
    repo.subscribe(Subscription::new(s1.id, honoree.id)).unwrap();
    repo.subscribe(Subscription::new(honoree.id, outsider.id)).unwrap();

    let subscribers = repo.list_subscribers(honoree.id).unwrap();
    assert_eq!(subscribers, vec![s1, s2]);
    assert!(repo.list_subscribers(404).unwrap().is_empty());
}

#[test]
fn service_reports_same_outcomes_as_store() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let bob = register(&conn, "Bob", date(1991, 4, 11));
    let service = SubscriptionService::new(SqliteSubscriptionRepository::new(&conn));

    service.subscribe(ann.id, bob.id).unwrap();
    assert!(matches!(
        service.subscribe(ann.id, bob.id),
        Err(SubscriptionError::AlreadySubscribed(_))
    ));
    assert!(service.list_available(ann.id).unwrap().is_empty());
    assert_eq!(service.list_subscribers(bob.id).unwrap(), vec![ann.clone()]);

    service.unsubscribe(ann.id, bob.id).unwrap();
    assert_eq!(service.list_available(ann.id).unwrap(), vec![bob]);
}

#[test]
fn deleting_a_user_removes_their_edges() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let bob = register(&conn, "Bob", date(1991, 4, 11));
    let repo = SqliteSubscriptionRepository::new(&conn);
    repo.subscribe(Subscription::new(ann.id, bob.id)).unwrap();
    repo.subscribe(Subscription::new(bob.id, ann.id)).unwrap();

    conn.execute("DELETE FROM users WHERE id = ?1;", [bob.id])
        .unwrap();

    assert!(all_edges(&conn).is_empty());
}

#[test]
fn concurrent_subscribes_on_separate_connections_write_one_edge() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("birthdays.db");
    let conn = open_db(&path).unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let bob = register(&conn, "Bob", date(1991, 4, 11));
    let edge = Subscription::new(ann.id, bob.id);

    const WRITERS: usize = 4;
    for _ in 0..10 {
        let barrier = Arc::new(Barrier::new(WRITERS));
        let writers = (0..WRITERS)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let path = path.clone();
                thread::spawn(move || {
                    let conn = open_db(&path).unwrap();
                    barrier.wait();
                    SqliteSubscriptionRepository::new(&conn).subscribe(edge)
                })
            })
            .collect::<Vec<_>>();

        let results = writers
            .into_iter()
            .map(|writer| writer.join().unwrap())
            .collect::<Vec<_>>();
        let created = results.iter().filter(|result| result.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|result| matches!(result, Err(SubscriptionError::AlreadySubscribed(_))))
            .count();

        assert_eq!(created, 1, "{results:?}");
        assert_eq!(duplicates, WRITERS - 1, "{results:?}");
        assert_eq!(edge_count(&conn, ann.id, bob.id), 1);

        SqliteSubscriptionRepository::new(&conn)
            .unsubscribe(edge)
            .unwrap();
    }
}
