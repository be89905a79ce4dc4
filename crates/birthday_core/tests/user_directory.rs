mod common;

use birthday_core::{
    open_db_in_memory, NewUser, RepoError, SqliteUserRepository, UserRepository, UserService,
    UserValidationError,
};
use common::{date, register};

fn new_user(name: &str, email: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: "argon2-hash".to_string(),
        date_of_birth: date(1990, 3, 10),
    }
}

#[test]
fn register_assigns_increasing_ids_and_normalizes_email() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);

    let ann = repo
        .create_user(&new_user("  Ann ", "Ann@Example.COM"))
        .unwrap();
    let bob = repo.create_user(&new_user("Bob", "bob@example.com")).unwrap();

    assert!(bob.id > ann.id);
    assert_eq!(ann.name, "Ann");
    assert_eq!(ann.email, "ann@example.com");
    assert_eq!(repo.get_user(ann.id).unwrap(), Some(ann));
    assert_eq!(repo.get_user(9_999).unwrap(), None);
}

#[test]
fn duplicate_email_is_rejected_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);
    repo.create_user(&new_user("Ann", "ann@example.com"))
        .unwrap();

    let err = repo
        .create_user(&new_user("Other Ann", "ANN@example.com"))
        .unwrap_err();

    assert!(matches!(err, RepoError::EmailTaken(email) if email == "ann@example.com"));
}

#[test]
fn invalid_registration_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);

    let err = repo.create_user(&new_user("Ann", "not-an-email")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(UserValidationError::InvalidEmail(_))
    ));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn birthday_lookup_matches_month_and_day_only() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));
    let bob = register(&conn, "Bob", date(1975, 3, 10));
    register(&conn, "Cid", date(1990, 3, 11));
    let repo = SqliteUserRepository::new(&conn);

    assert_eq!(
        repo.users_with_birthday_on(date(2026, 3, 10)).unwrap(),
        vec![ann, bob]
    );
    assert!(repo
        .users_with_birthday_on(date(2026, 3, 9))
        .unwrap()
        .is_empty());
}

#[test]
fn leap_day_birthdays_are_announced_on_march_first_in_common_years() {
    let conn = open_db_in_memory().unwrap();
    let leap = register(&conn, "Leap", date(2000, 2, 29));
    let march = register(&conn, "March", date(1999, 3, 1));
    let repo = SqliteUserRepository::new(&conn);

    assert_eq!(
        repo.users_with_birthday_on(date(2025, 3, 1)).unwrap(),
        vec![leap.clone(), march.clone()]
    );
    assert_eq!(
        repo.users_with_birthday_on(date(2024, 3, 1)).unwrap(),
        vec![march]
    );
    assert_eq!(
        repo.users_with_birthday_on(date(2024, 2, 29)).unwrap(),
        vec![leap]
    );
}

#[test]
fn credentials_lookup_returns_stored_hash() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::new(&conn));
    let ann = service
        .register(&new_user("Ann", "ann@example.com"))
        .unwrap();

    let credentials = service
        .find_credentials_by_email(" ANN@example.com ")
        .unwrap()
        .expect("registered email should resolve");
    assert_eq!(credentials.user, ann);
    assert_eq!(service.get_user(ann.id).unwrap(), Some(ann.clone()));
    assert_eq!(credentials.password_hash, "argon2-hash");

    assert!(service
        .find_credentials_by_email("nobody@example.com")
        .unwrap()
        .is_none());
}

#[test]
fn user_read_model_serializes_without_password_hash() {
    let conn = open_db_in_memory().unwrap();
    let ann = register(&conn, "Ann", date(1990, 3, 10));

    let json = serde_json::to_value(&ann).unwrap();
    assert_eq!(json["email"], "ann@example.com");
    assert_eq!(json["date_of_birth"], "1990-03-10");
    assert!(json.get("password_hash").is_none());
}

#[test]
fn birth_years_outside_four_digits_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);

    for year in [-1, 10_000] {
        let mut user = new_user("Zed", "zed@example.com");
        user.date_of_birth = date(year, 3, 10);
        let err = repo.create_user(&user).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Validation(UserValidationError::YearOutOfRange(rejected)) if rejected == year
        ));
    }

    let mut early = new_user("Early", "early@example.com");
    early.date_of_birth = date(1, 3, 10);
    let early = repo.create_user(&early).unwrap();
    assert_eq!(
        repo.users_with_birthday_on(date(2026, 3, 10)).unwrap(),
        vec![early]
    );
}
