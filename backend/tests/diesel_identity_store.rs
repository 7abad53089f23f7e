//! `DieselIdentityStore` against embedded PostgreSQL.
//!
//! Sign-up races rely on `users_username_key` and `users_email_key`; a
//! violation must come back as a conflict naming the colliding column.

use chrono::Utc;
use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

use critique::domain::pagination::PageRequest;
use critique::domain::ports::{IdentityStore, IdentityStoreError};
use critique::domain::{ConfirmationCode, EmailAddress, Role, User, Username};
use critique::outbound::persistence::DieselIdentityStore;

#[path = "support/pg_embed.rs"]
mod pg_embed;

use pg_embed::{handle_cluster_setup_failure, migrated_database, pool, test_cluster};

const TEST_DB: &str = "diesel_identity_store_test";

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    store: DieselIdentityStore,
}

fn account(username: &str, email: &str) -> User {
    User::register(
        Username::new(username).expect("username"),
        EmailAddress::new(email).expect("email"),
        ConfirmationCode::new("ABCDEFGHIJKL").expect("code"),
        Utc::now(),
    )
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    let url = migrated_database(&runtime, &cluster, TEST_DB)?;
    let store = DieselIdentityStore::new(pool(&runtime, &url)?);
    Ok(TestContext {
        runtime,
        _cluster: cluster,
        store,
    })
}

#[fixture]
fn store_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
#[case::username("ada", "other@example.com", "username")]
#[case::email("lovelace", "ada@example.com", "email")]
fn colliding_accounts_name_the_taken_field(
    store_context: Option<TestContext>,
    #[case] username: &str,
    #[case] email: &str,
    #[case] field: &str,
) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: colliding_accounts_name_the_taken_field skipped");
        return;
    };
    context
        .runtime
        .block_on(context.store.insert(&account("ada", "ada@example.com")))
        .expect("first account");

    let result = context
        .runtime
        .block_on(context.store.insert(&account(username, email)));

    assert_eq!(result, Err(IdentityStoreError::duplicate(field)));
}

#[rstest]
fn stored_accounts_round_trip(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: stored_accounts_round_trip skipped");
        return;
    };
    let mut user = account("grace", "grace@example.com");
    user.role = Role::Moderator;
    user.bio = "Compilers".to_owned();
    context
        .runtime
        .block_on(context.store.insert(&user))
        .expect("insert");

    let fresh = ConfirmationCode::new("MNOPQRSTUVWX").expect("code");
    context
        .runtime
        .block_on(context.store.set_confirmation_code(&user.id, &fresh))
        .expect("set code");
    let found = context
        .runtime
        .block_on(context.store.find_by_username(&user.username))
        .expect("lookup")
        .expect("account exists");

    assert_eq!(found.id, user.id);
    assert_eq!(found.role, Role::Moderator);
    assert_eq!(found.bio, "Compilers");
    assert!(found
        .confirmation_code
        .as_ref()
        .is_some_and(|code| code.matches("MNOPQRSTUVWX")));
}

#[rstest]
fn deleted_accounts_disappear_from_listings(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: deleted_accounts_disappear_from_listings skipped");
        return;
    };
    let ada = account("ada", "ada@example.com");
    for user in [&ada, &account("grace", "grace@example.com")] {
        context
            .runtime
            .block_on(context.store.insert(user))
            .expect("insert");
    }

    let deleted = context
        .runtime
        .block_on(context.store.delete(&ada.username))
        .expect("delete");
    let page = context
        .runtime
        .block_on(context.store.list(None, PageRequest::default()))
        .expect("list");

    assert!(deleted);
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].username.as_str(), "grace");
}
