//! Transaction atomicity and callback ordering on both connectors.

use schemadb_core::{doc, Connector, CoreError, Upsert, WhereClause};
use schemadb_testkit::{memory_connector, recording_connector, sqlite_connector, user};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn push(log: &Log, entry: &str) {
    log.borrow_mut().push(entry.to_string());
}

fn commit_runs_commit_then_complete<C: Connector>(db: &C) {
    let events = log();
    let outcome = {
        let (a, b, c) = (events.clone(), events.clone(), events.clone());
        db.transaction(move |txn| {
            txn.create("User", user(1))
                .create("User", user(2))
                .update("User", WhereClause::eq("id", "u1"), doc! { "age" => 3 })
                .on_complete(move || {
                    push(&a, "complete");
                    Ok(())
                })
                .on_commit(move || {
                    push(&b, "commit");
                    Ok(())
                })
                .on_error(move |_: &CoreError| {
                    push(&c, "error");
                    Ok(())
                });
            Ok(())
        })
        .unwrap()
    };

    assert_eq!(outcome.operations, 3);
    assert_eq!(outcome.callback_failures, 0);
    assert_eq!(*events.borrow(), vec!["commit", "complete"]);
    assert_eq!(db.count("User", &WhereClause::eq("age", 3)).unwrap(), 1);
}

fn failed_write_rolls_back_and_runs_error_callbacks<C: Connector>(db: &C) {
    db.create("User", user(1)).unwrap();
    let events = log();

    let err = {
        let (a, b, c) = (events.clone(), events.clone(), events.clone());
        db.transaction(move |txn| {
            txn.create("User", user(2))
                .delete("User", WhereClause::eq("id", "u1"))
                .create("User", user(2))
                .on_commit(move || {
                    push(&a, "commit");
                    Ok(())
                })
                .on_error(move |err: &CoreError| {
                    push(&b, if err.is_unique_violation() { "unique" } else { "other" });
                    Ok(())
                })
                .on_complete(move || {
                    push(&c, "complete");
                    Ok(())
                });
            Ok(())
        })
        .unwrap_err()
    };

    assert!(err.is_unique_violation(), "{err}");
    assert_eq!(*events.borrow(), vec!["unique", "complete"]);
    let ids: Vec<_> = db
        .find_many("User", Default::default())
        .unwrap()
        .into_iter()
        .filter_map(|doc| doc.get("id").and_then(|v| v.as_str().map(str::to_string)))
        .collect();
    assert_eq!(ids, vec!["u1"]);
}

fn body_error_applies_nothing<C: Connector>(db: &C) {
    let events = log();
    let err = {
        let seen = events.clone();
        db.transaction(move |txn| {
            txn.create("User", user(1)).on_error(move |err: &CoreError| {
                push(&seen, &err.to_string());
                Ok(())
            });
            Err(CoreError::invalid_where("body gave up"))
        })
        .unwrap_err()
    };
    assert!(matches!(err, CoreError::InvalidWhere { .. }));
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 0);
}

fn failing_callbacks_are_isolated<C: Connector>(db: &C) {
    let events = log();
    let outcome = {
        let (a, b) = (events.clone(), events.clone());
        db.transaction(move |txn| {
            txn.create("User", user(1))
                .on_commit(|| Err("first callback failed".into()))
                .on_commit(|| panic!("second callback panicked"))
                .on_commit(move || {
                    push(&a, "third");
                    Ok(())
                })
                .on_complete(move || {
                    push(&b, "complete");
                    Ok(())
                });
            Ok(())
        })
        .unwrap()
    };
    assert_eq!(outcome.callback_failures, 2);
    assert_eq!(*events.borrow(), vec!["third", "complete"]);
    assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 1);
}

fn completion_registered_by_caller_runs_last<C: Connector>(db: &C) {
    let events = log();
    let (inner, outer) = (events.clone(), events.clone());
    db.transaction_with_completion(
        move |txn| {
            txn.upsert(
                "User",
                Upsert::new(WhereClause::eq("id", "u1"), user(1), doc! {}),
            )
            .on_complete(move || {
                push(&inner, "body");
                Ok(())
            });
            Ok(())
        },
        move || {
            push(&outer, "caller");
            Ok(())
        },
    )
    .unwrap();
    assert_eq!(*events.borrow(), vec!["body", "caller"]);
    assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 1);
}

fn body_reads_see_state_before_the_transaction<C: Connector>(db: &C) {
    db.create("User", user(1)).unwrap();
    db.transaction(|txn| {
        txn.delete("User", WhereClause::all());
        assert_eq!(db.count("User", &WhereClause::all())?, 1);
        Ok(())
    })
    .unwrap();
    assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 0);
}

fn transaction_ids_increase<C: Connector>(db: &C) {
    let first = db.transaction(|_| Ok(())).unwrap();
    let second = db.transaction(|_| Ok(())).unwrap();
    assert!(second.id > first.id);
    assert_eq!(first.operations, 0);
}

macro_rules! on_every_backend {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[test]
                fn $name() {
                    schemadb_testkit::init_tracing();
                    super::$name(&super::memory_connector());
                }
            )*
        }

        mod sqlite {
            $(
                #[test]
                fn $name() {
                    schemadb_testkit::init_tracing();
                    super::$name(&super::sqlite_connector());
                }
            )*
        }
    };
}

on_every_backend!(
    commit_runs_commit_then_complete,
    failed_write_rolls_back_and_runs_error_callbacks,
    body_error_applies_nothing,
    failing_callbacks_are_isolated,
    completion_registered_by_caller_runs_last,
    body_reads_see_state_before_the_transaction,
    transaction_ids_increase,
);

#[test]
fn sql_transaction_is_one_begin_commit_pair() {
    let db = recording_connector();
    db.transaction(|txn| {
        txn.create("User", user(1))
            .create("User", user(2))
            .delete("User", WhereClause::eq("id", "u2"));
        Ok(())
    })
    .unwrap();

    let store = db.store();
    assert_eq!(store.count_prefix(schemadb_storage::BEGIN), 1);
    assert_eq!(store.count_prefix(schemadb_storage::COMMIT), 1);
    assert_eq!(store.count_prefix(schemadb_storage::ROLLBACK), 0);
    assert_eq!(store.count_prefix("INSERT"), 2);
    assert_eq!(store.count_prefix("DELETE"), 1);
}

#[test]
fn sql_failed_transaction_rolls_back() {
    let db = recording_connector();
    let err = db
        .transaction(|txn| {
            txn.create("User", user(1)).create("User", user(1));
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(db.store().count_prefix(schemadb_storage::ROLLBACK), 1);
    assert_eq!(db.store().count_prefix(schemadb_storage::COMMIT), 0);
    assert_eq!(db.count("User", &WhereClause::all()).unwrap(), 0);
}
