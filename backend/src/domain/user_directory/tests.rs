//! User directory behaviour against mocked ports.

use super::*;
use crate::domain::access::Tier;
use crate::domain::ports::{IdentityStoreError, MockConfirmationCodeGenerator, MockIdentityStore};
use crate::domain::{ConfirmationCode, ErrorCode, UserId};
use crate::test_support::FixedClock;
use rstest::rstest;

type Directory = UserDirectoryService<MockIdentityStore, MockConfirmationCodeGenerator>;

fn account(username: &str, role: Role) -> User {
    let mut user = User::register(
        Username::new(username).expect("username"),
        EmailAddress::new(format!("{username}@example.com")).expect("email"),
        ConfirmationCode::new("CODECODECODE").expect("code"),
        FixedClock::default_instant(),
    );
    user.role = role;
    user
}

fn as_requester(user: &User) -> Requester {
    Requester::from_user(user)
}

fn directory(store: MockIdentityStore) -> Directory {
    let mut codes = MockConfirmationCodeGenerator::new();
    codes
        .expect_generate()
        .returning(|| ConfirmationCode::new("ADMINMADE123").expect("code"));
    UserDirectoryService::new(
        Arc::new(store),
        Arc::new(codes),
        Arc::new(FixedClock::default()),
    )
}

#[rstest]
#[case(Tier::User)]
#[case(Tier::Moderator)]
#[tokio::test]
async fn non_admins_cannot_list_accounts(#[case] tier: Tier) {
    let mut store = MockIdentityStore::new();
    store.expect_list().never();
    let requester = Requester::Authenticated {
        id: UserId::random(),
        tier,
    };

    let error = directory(store)
        .list(&requester, None, PageRequest::default())
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn self_update_keeps_the_stored_role() {
    let user = account("ada", Role::User);
    let requester = as_requester(&user);
    let mut store = MockIdentityStore::new();
    store
        .expect_find_by_id()
        .returning(move |_| Ok(Some(user.clone())));
    store
        .expect_update()
        .withf(|user| user.role == Role::User && user.bio == "Critic")
        .times(1)
        .returning(|_| Ok(true));

    let updated = directory(store)
        .update_me(
            &requester,
            AccountChanges {
                role: Some("admin".to_owned()),
                bio: Some("Critic".to_owned()),
                ..AccountChanges::default()
            },
        )
        .await
        .expect("updated");

    assert_eq!(updated.role, Role::User);
    assert_eq!(updated.username.as_str(), "ada");
}

#[rstest]
#[tokio::test]
async fn admins_may_promote_accounts() {
    let admin = account("root", Role::Admin);
    let mut store = MockIdentityStore::new();
    store
        .expect_find_by_username()
        .returning(|_| Ok(Some(account("ada", Role::User))));
    store
        .expect_update()
        .withf(|user| user.role == Role::Moderator)
        .times(1)
        .returning(|_| Ok(true));

    let updated = directory(store)
        .update(
            &as_requester(&admin),
            "ada",
            AccountChanges {
                role: Some("moderator".to_owned()),
                ..AccountChanges::default()
            },
        )
        .await
        .expect("promoted");

    assert_eq!(updated.role, Role::Moderator);
}

#[rstest]
#[tokio::test]
async fn unknown_roles_are_invalid() {
    let admin = account("root", Role::Admin);
    let mut store = MockIdentityStore::new();
    store
        .expect_find_by_username()
        .returning(|_| Ok(Some(account("ada", Role::User))));
    store.expect_update().never();

    let error = directory(store)
        .update(
            &as_requester(&admin),
            "ada",
            AccountChanges {
                role: Some("owner".to_owned()),
                ..AccountChanges::default()
            },
        )
        .await
        .expect_err("bad role");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn admin_created_accounts_get_a_code_and_role() {
    let admin = account("root", Role::Admin);
    let mut store = MockIdentityStore::new();
    store
        .expect_insert()
        .withf(|user| {
            user.role == Role::Moderator
                && user
                    .confirmation_code
                    .as_ref()
                    .is_some_and(|code| code.matches("ADMINMADE123"))
        })
        .times(1)
        .returning(|_| Ok(()));

    let user = directory(store)
        .create(
            &as_requester(&admin),
            NewAccountInput {
                username: "grace".to_owned(),
                email: "grace@example.com".to_owned(),
                role: Some("moderator".to_owned()),
                ..NewAccountInput::default()
            },
        )
        .await
        .expect("created");

    assert_eq!(user.date_joined, FixedClock::default_instant());
}

#[rstest]
#[tokio::test]
async fn duplicate_accounts_conflict() {
    let admin = account("root", Role::Admin);
    let mut store = MockIdentityStore::new();
    store
        .expect_insert()
        .returning(|_| Err(IdentityStoreError::duplicate("email")));

    let error = directory(store)
        .create(
            &as_requester(&admin),
            NewAccountInput {
                username: "grace".to_owned(),
                email: "root@example.com".to_owned(),
                ..NewAccountInput::default()
            },
        )
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn searching_for_an_impossible_username_returns_nothing() {
    let admin = account("root", Role::Admin);
    let mut store = MockIdentityStore::new();
    store.expect_list().never();

    let page = directory(store)
        .list(
            &as_requester(&admin),
            Some("has space".to_owned()),
            PageRequest::default(),
        )
        .await
        .expect("empty page");

    assert_eq!(page.count, 0);
}

#[rstest]
#[tokio::test]
async fn anonymous_profile_reads_are_unauthenticated() {
    let error = directory(MockIdentityStore::new())
        .me(&Requester::Anonymous)
        .await
        .expect_err("anonymous");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
}
