#![cfg(feature = "rusqlite")]

mod common;

use common::{CountingExecutor, gate, ids, seeded_db, texts};
use futures_util::future::join_all;
use rowgate::prelude::*;

#[tokio::test]
async fn concurrent_unique_lookups_share_one_query() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let posts = scope.table("posts").unwrap();

    let keys: Vec<LoaderKey> = [1, 2, 3, 99, 2].into_iter().map(|id| ("post_id", id).into()).collect();
    let rows = join_all(keys.iter().map(|key| posts.find_unique(key))).await;
    assert_eq!(exec.queries(), 1);

    let messages: Vec<Option<String>> = rows
        .into_iter()
        .map(|row| {
            row.unwrap()
                .and_then(|row| row.get("message").and_then(Value::as_str).map(String::from))
        })
        .collect();
    assert_eq!(
        messages,
        [
            Some("test 2".to_string()),
            Some("first".to_string()),
            Some("c".to_string()),
            None,
            Some("first".to_string()),
        ]
    );
    assert!(exec.last_sql().unwrap().contains(r#""posts"."post_id" IN (?, ?, ?, ?)"#));

    // Cached for the rest of the scope.
    let again = posts.find_unique(&("post_id", 3).into()).await.unwrap();
    assert!(again.is_some());
    let missing = posts.find_unique(&("post_id", 99).into()).await.unwrap();
    assert!(missing.is_none());
    assert_eq!(exec.queries(), 1);
}

#[tokio::test]
async fn keys_compare_by_value() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let posts = scope.table("posts").unwrap();

    let key_a: LoaderKey = ("post_id", 1).into();
    let key_b: LoaderKey = ("post_id", 1.0).into();
    let (a, b) = futures_util::join!(
        posts.find_unique(&key_a),
        posts.find_unique(&key_b)
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(exec.queries(), 1);
}

#[tokio::test]
async fn scopes_do_not_share_caches() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let key = LoaderKey::from(("user_id", 1));

    for _ in 0..2 {
        let scope = gate.scope(&exec);
        let user = scope.table("users").unwrap().find_unique(&key).await.unwrap();
        assert!(user.is_some());
    }
    assert_eq!(exec.queries(), 2);

    let scope = gate.scope(&exec);
    let users = scope.table("users").unwrap();
    users.find_unique(&key).await.unwrap();
    scope.clear();
    users.find_unique(&key).await.unwrap();
    assert_eq!(exec.queries(), 4);
}

#[tokio::test]
async fn many_by_key_groups_and_orders() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let posts = scope.table("posts").unwrap();
    let by_message = OrderSpec::new().asc("message");

    let keys: Vec<LoaderKey> = [1, 2, 3].into_iter().map(|id| ("author_id", id).into()).collect();
    let results = join_all(
        keys.iter()
            .map(|key| posts.find_many_by_key(key, Some(&by_message))),
    )
    .await;
    assert_eq!(exec.queries(), 1);

    let results: Vec<Vec<Row>> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(texts(&results[0], "message"), ["first", "test 2"]);
    // Post 5 is soft-deleted.
    assert_eq!(texts(&results[1], "message"), ["a", "c"]);
    assert!(results[2].is_empty());

    let with_deleted = scope
        .table("posts")
        .unwrap()
        .include_deleted()
        .find_many_by_key(&keys[1], Some(&by_message))
        .await
        .unwrap();
    assert_eq!(texts(&with_deleted, "message"), ["a", "b", "c"]);
    assert_eq!(exec.queries(), 1);
}

#[tokio::test]
async fn first_ordering_wins_for_a_key() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let posts = scope.table("posts").unwrap();
    let key = LoaderKey::from(("author_id", 2));

    let asc = OrderSpec::new().asc("message");
    let desc = OrderSpec::new().desc("message");
    let (first, second) = futures_util::join!(
        posts.find_many_by_key(&key, Some(&asc)),
        posts.find_many_by_key(&key, Some(&desc))
    );
    assert_eq!(texts(&first.unwrap(), "message"), ["a", "c"]);
    assert_eq!(texts(&second.unwrap(), "message"), ["a", "c"]);

    let later = posts.find_many_by_key(&key, Some(&desc)).await.unwrap();
    assert_eq!(texts(&later, "message"), ["a", "c"]);
    assert_eq!(exec.queries(), 1);
}

#[tokio::test]
async fn batch_ordering_applies_to_every_key_it_fetches() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let posts = scope.table("posts").unwrap();

    let asc = OrderSpec::new().asc("message");
    let desc = OrderSpec::new().desc("message");
    let john_key: LoaderKey = ("author_id", 1).into();
    let jane_key: LoaderKey = ("author_id", 2).into();
    let (john, jane) = futures_util::join!(
        posts.find_many_by_key(&john_key, Some(&asc)),
        posts.find_many_by_key(&jane_key, Some(&desc))
    );
    assert_eq!(exec.queries(), 1);
    assert_eq!(texts(&john.unwrap(), "message"), ["first", "test 2"]);
    // Jane's key was new to the batch but still follows its first ordering.
    assert_eq!(texts(&jane.unwrap(), "message"), ["a", "c"]);
}

#[tokio::test]
async fn compound_keys() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let members = scope.table("team_members").unwrap();

    let keys = [
        LoaderKey::new().with("team_id", 10).with("user_id", 2),
        LoaderKey::new().with("user_id", 3).with("team_id", 20),
        LoaderKey::new().with("team_id", 20).with("user_id", 1),
    ];
    let rows = join_all(keys.iter().map(|key| members.find_unique(key))).await;
    assert_eq!(exec.queries(), 1);

    let roles: Vec<Option<Value>> = rows
        .into_iter()
        .map(|row| row.unwrap().and_then(|row| row.get("role").cloned()))
        .collect();
    assert_eq!(roles, [Some(Value::from("member")), Some(Value::from("member")), None]);

    let team = members
        .find_many_by_key(&("team_id", 10).into(), Some(&OrderSpec::new().asc("user_id")))
        .await
        .unwrap();
    assert_eq!(ids(&team, "user_id"), [1, 2]);

    // Keys built from fetched rows address the same entries.
    for member in &team {
        let key_row: Row = ["team_id", "user_id"]
            .into_iter()
            .map(|column| (column, member.get(column).cloned().unwrap()))
            .collect();
        let found = members.find_unique(&LoaderKey::from(&key_row)).await.unwrap();
        assert_eq!(found.as_ref(), Some(member));
    }
}

#[tokio::test]
async fn soft_deleted_rows_are_hidden_but_cached() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let key = LoaderKey::from(("user_id", 4));

    let hidden = scope.table("users").unwrap().find_unique(&key).await.unwrap();
    assert!(hidden.is_none());

    let shown = scope
        .table("users")
        .unwrap()
        .include_deleted()
        .find_unique(&key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shown.get("deleted"), Some(&Value::Boolean(true)));
    assert_eq!(exec.queries(), 1);
}

#[tokio::test]
async fn a_failed_batch_fails_every_requester_and_is_retried() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let users = scope.table("users").unwrap();

    exec.fail_next();
    let keys: Vec<LoaderKey> = [1, 2, 3].into_iter().map(|id| ("user_id", id).into()).collect();
    let results = join_all(keys.iter().map(|key| users.find_unique(key))).await;
    assert_eq!(exec.queries(), 1);
    for result in results {
        assert_eq!(
            result.unwrap_err(),
            RowgateError::ExecutionFailure("database is locked".into())
        );
    }

    let retried = users.find_unique(&keys[0]).await.unwrap();
    assert!(retried.is_some());
    assert_eq!(exec.queries(), 2);
}

#[tokio::test]
async fn loaders_only_exist_for_declared_keys() {
    let conn = seeded_db();
    let exec = CountingExecutor::new(&conn);
    let gate = gate();
    let scope = gate.scope(&exec);
    let posts = scope.table("posts").unwrap();

    let not_unique = posts.find_unique(&("author_id", 1).into()).await.unwrap_err();
    assert!(matches!(not_unique, RowgateError::UnknownKey { .. }));

    let not_declared = posts.find_many_by_key(&("message", "a").into(), None).await.unwrap_err();
    assert!(matches!(not_declared, RowgateError::UnknownKey { .. }));

    let mistyped = posts.find_unique(&("post_id", "1").into()).await.unwrap_err();
    assert!(matches!(mistyped, RowgateError::TypeMismatch { .. }));

    let partial = scope
        .table("team_members")
        .unwrap()
        .find_unique(&("team_id", 10).into())
        .await
        .unwrap_err();
    assert!(matches!(partial, RowgateError::UnknownKey { .. }));

    assert_eq!(exec.statements(), 0);
}
