#![allow(clippy::unwrap_used)]
// Integration tests for contexts, validation and impersonation using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{basic_auth, method, path, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diradmin_api::Connection;
use diradmin_core::{
    Account, AccountType, AdminContext, ConnectionConfig, Context, CoreError, Reseller,
    ResellerCapable, ResellerContext, User, UserContext, connect_admin,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn secret() -> SecretString {
    SecretString::from("secret".to_string())
}

async fn setup(username: &str) -> (MockServer, Connection) {
    let server = MockServer::start().await;
    let conn = Connection::new(&server.uri(), username, secret()).unwrap();
    (server, conn)
}

fn text(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_owned(), "text/plain")
}

async fn mount_own_config(server: &MockServer, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/CMD_API_SHOW_USER_CONFIG"))
        .and(query_param_is_missing("user"))
        .respond_with(text(body))
        .expect(times)
        .mount(server)
        .await;
}

// ── Validation ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_context_over_user_account_is_mismatch() {
    let (server, conn) = setup("bob").await;
    mount_own_config(&server, "usertype=user&username=bob", 1).await;

    let result = AdminContext::new(conn, true).await;

    match result {
        Err(CoreError::ContextMismatch { expected, actual }) => {
            assert_eq!(expected, AccountType::Admin);
            assert_eq!(actual, AccountType::User);
        }
        other => panic!("expected ContextMismatch, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unvalidated_context_makes_no_request() {
    let (server, conn) = setup("bob").await;
    mount_own_config(&server, "usertype=user&username=bob", 0).await;

    let ctx = AdminContext::new(conn, false).await.unwrap();
    assert_eq!(ctx.username(), "bob");
}

#[tokio::test]
async fn test_context_user_is_fetched_once() {
    let (server, conn) = setup("admin").await;
    mount_own_config(&server, "usertype=admin&username=admin&email=root%40example.com", 1).await;

    let ctx = AdminContext::new(conn, true).await.unwrap();
    let first = ctx.context_user().await.unwrap();
    let second = ctx.context_user().await.unwrap();

    assert!(matches!(first, Account::Admin(_)));
    assert_eq!(second.name(), "admin");
    assert_eq!(ctx.account_type().await.unwrap(), AccountType::Admin);
    // Served from the preloaded config category.
    assert_eq!(
        first.as_user().email().await.unwrap().as_deref(),
        Some("root@example.com")
    );
}

#[tokio::test]
async fn test_unknown_usertype_fails_context_user() {
    let (server, conn) = setup("bob").await;
    mount_own_config(&server, "usertype=alien&username=bob", 1).await;

    let ctx = UserContext::new(conn, false).await.unwrap();
    let result = ctx.context_user().await;

    assert!(
        matches!(result, Err(CoreError::UnknownUserType { ref usertype }) if usertype == "alien"),
        "expected UnknownUserType, got: {result:?}"
    );
}

#[tokio::test]
async fn test_connect_admin_validates_account() {
    let (server, _) = setup("admin").await;
    mount_own_config(&server, "usertype=admin&username=admin", 1).await;

    let config = ConnectionConfig::new(server.uri().parse().unwrap(), "admin", secret());
    let ctx = connect_admin(&config, true).await.unwrap();

    assert_eq!(ctx.admin().await.unwrap().name(), "admin");
}

// ── Dispatch ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_from_config_dispatches_on_usertype() {
    let (_server, conn) = setup("admin").await;
    let ctx = AdminContext::new(conn, false).await.unwrap();

    let reseller = Account::from_config(json!({"usertype": "reseller", "username": "r1"}), ctx.handle())
        .unwrap();
    assert!(matches!(reseller, Account::Reseller(_)));
    assert_eq!(reseller.account_type(), AccountType::Reseller);

    let user = Account::from_config(json!({"usertype": "user", "username": "u1"}), ctx.handle())
        .unwrap();
    assert!(matches!(user, Account::User(_)));

    let alien = Account::from_config(json!({"usertype": "alien", "username": "x"}), ctx.handle());
    assert!(matches!(alien, Err(CoreError::UnknownUserType { .. })));
}

// ── Impersonation ───────────────────────────────────────────────────

#[tokio::test]
async fn test_impersonation_chain_keeps_authenticated_user() {
    let (server, conn) = setup("admin").await;

    Mock::given(method("GET"))
        .and(path("/CMD_API_SHOW_USER_CONFIG"))
        .and(basic_auth("admin|u1", "secret"))
        .respond_with(text("usertype=user&username=u1"))
        .expect(1)
        .mount(&server)
        .await;

    let admin = AdminContext::new(conn, false).await.unwrap();
    let reseller = admin.impersonate_reseller("r1", false).await.unwrap();
    let user = reseller.impersonate_user("u1", true).await.unwrap();

    assert_eq!(user.connection().authenticated_user(), "admin");
    assert_eq!(user.username(), "u1");
    assert_eq!(reseller.username(), "r1");
    assert_eq!(admin.username(), "admin");
}

#[tokio::test]
async fn test_validated_reseller_impersonation_checks_type() {
    let (server, conn) = setup("admin").await;

    Mock::given(method("GET"))
        .and(path("/CMD_API_SHOW_USER_CONFIG"))
        .and(basic_auth("admin|bob", "secret"))
        .respond_with(text("usertype=user&username=bob"))
        .mount(&server)
        .await;

    let admin = AdminContext::new(conn, false).await.unwrap();
    let result = admin.impersonate_reseller("bob", true).await;

    assert!(matches!(
        result,
        Err(CoreError::ContextMismatch {
            expected: AccountType::Reseller,
            actual: AccountType::User,
        })
    ));
}

#[tokio::test]
async fn test_self_managed_context_is_shared_or_fresh() {
    let (server, conn) = setup("reseller").await;
    mount_own_config(&server, "usertype=reseller&username=reseller", 1).await;

    let ctx = ResellerContext::new(conn, false).await.unwrap();

    let own = ctx.reseller().await.unwrap();
    assert!(own.as_user().is_self_managed());
    let same = own.as_user().get_self_managed_context().unwrap();
    assert!(same.same_as(ctx.handle()));

    let alice = User::new("alice", AccountType::User, ctx.handle());
    assert!(!alice.is_self_managed());
    let fresh = alice.get_self_managed_context().unwrap();
    assert!(!fresh.same_as(ctx.handle()));
    assert_eq!(fresh.username(), "alice");
    assert_eq!(fresh.connection().authenticated_user(), "reseller");
    assert_eq!(fresh.role(), AccountType::User);
}

#[tokio::test]
async fn test_entity_impersonation_requires_higher_context() {
    let (_server, conn) = setup("bob").await;
    let ctx = UserContext::new(conn, false).await.unwrap();

    let carol = User::new("carol", AccountType::User, ctx.handle());
    let result = carol.impersonate(false).await;
    assert!(
        matches!(
            result,
            Err(CoreError::InsufficientPrivilege {
                required: AccountType::Reseller,
                ..
            })
        ),
        "expected InsufficientPrivilege, got: {result:?}"
    );

    assert!(matches!(
        carol.get_self_managed_context(),
        Err(CoreError::InsufficientPrivilege { .. })
    ));
}

#[tokio::test]
async fn test_reseller_entity_impersonation_requires_admin() {
    let (_server, conn) = setup("reseller").await;
    let ctx = ResellerContext::new(conn, false).await.unwrap();

    let other = Reseller::new("r2", ctx.handle());
    let result = other.impersonate(false).await;

    assert!(matches!(
        result,
        Err(CoreError::InsufficientPrivilege {
            required: AccountType::Admin,
            ..
        })
    ));
}

#[tokio::test]
async fn test_reseller_entity_impersonation_from_admin() {
    let (_server, conn) = setup("admin").await;
    let ctx = AdminContext::new(conn, false).await.unwrap();

    let reseller = Reseller::new("r1", ctx.handle());
    let impersonated = reseller.impersonate(false).await.unwrap();

    assert_eq!(impersonated.username(), "r1");
    assert_eq!(impersonated.connection().authenticated_user(), "admin");
}

#[tokio::test]
async fn test_reseller_account_impersonates_with_its_own_role() {
    let (server, conn) = setup("admin").await;

    Mock::given(method("GET"))
        .and(path("/CMD_API_SHOW_USER_CONFIG"))
        .and(basic_auth("admin|r1", "secret"))
        .respond_with(text("usertype=reseller&username=r1"))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = AdminContext::new(conn, false).await.unwrap();
    let account =
        Account::from_config(json!({"usertype": "reseller", "username": "r1"}), ctx.handle())
            .unwrap();

    // The plain-user path refuses to hand out a user-role context.
    let result = account.as_user().impersonate(false).await;
    assert!(
        matches!(
            result,
            Err(CoreError::ContextMismatch {
                expected: AccountType::User,
                actual: AccountType::Reseller,
            })
        ),
        "expected ContextMismatch, got: {result:?}"
    );

    let reseller = account.as_reseller().unwrap();
    let impersonated = reseller.impersonate(true).await.unwrap();
    assert_eq!(impersonated.handle().role(), AccountType::Reseller);
    assert_eq!(impersonated.username(), "r1");

    // Both impersonation paths agree on the role.
    let derived = account.as_user().get_self_managed_context().unwrap();
    assert_eq!(derived.role(), impersonated.handle().role());
}

// ── Listings ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_listings_and_version() {
    let (server, conn) = setup("admin").await;

    Mock::given(method("GET"))
        .and(path("/CMD_API_SHOW_RESELLERS"))
        .respond_with(text("list[]=r1&list[]=r2"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/CMD_API_SHOW_ADMINS"))
        .respond_with(text("list[]=admin"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "1.670"})))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = AdminContext::new(conn, false).await.unwrap();

    let resellers = ctx.resellers().await.unwrap();
    let names: Vec<&str> = resellers.iter().map(Reseller::name).collect();
    assert_eq!(names, ["r1", "r2"]);

    let admins = ctx.admins().await.unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].as_user().kind(), AccountType::Admin);

    let version = ctx.version().await.unwrap();
    assert_eq!(version["version"], json!("1.670"));
}

#[tokio::test]
async fn test_admin_lists_every_user() {
    let (server, conn) = setup("admin").await;

    Mock::given(method("GET"))
        .and(path("/CMD_API_SHOW_ALL_USERS"))
        .and(basic_auth("admin", "secret"))
        .respond_with(text("list[]=alice&list[]=bob&list[]=carol"))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = AdminContext::new(conn, false).await.unwrap();
    let users = ctx.all_users().await.unwrap();

    let names: Vec<&str> = users.iter().map(User::name).collect();
    assert_eq!(names, ["alice", "bob", "carol"]);
    assert!(users.iter().all(|u| u.kind() == AccountType::User));
}

#[tokio::test]
async fn test_reseller_context_lists_own_users() {
    let (server, conn) = setup("reseller").await;

    Mock::given(method("GET"))
        .and(path("/CMD_API_SHOW_USERS"))
        .and(basic_auth("reseller", "secret"))
        .respond_with(text("list[]=alice&list[]=bob"))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = ResellerContext::new(conn, false).await.unwrap();
    let users = ctx.users().await.unwrap();

    let names: Vec<&str> = users.iter().map(User::name).collect();
    assert_eq!(names, ["alice", "bob"]);
    assert!(users.iter().all(|u| u.kind() == AccountType::User));
}
