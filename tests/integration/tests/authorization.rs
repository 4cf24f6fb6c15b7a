//! Org scoping of every vault operation, across roles.

use chatvault_core::{derive_abilities, Action, SecretFilter, SecretString, Subject};
use chatvault_integration_tests::{admin, manager, test_keys, viewer};
use chatvault_secrets::{SecretVault, VaultError};

async fn two_org_vault() -> (SecretVault, String, String) {
    let vault = SecretVault::in_memory(test_keys());
    let a = vault
        .create(&admin("a1", "orgA"), "alpha", &SecretString::new("alpha-token-0123456789"))
        .await
        .unwrap();
    let b = vault
        .create(&admin("b1", "orgB"), "bravo", &SecretString::new("bravo-token-0123456789"))
        .await
        .unwrap();
    (vault, a.id, b.id)
}

#[tokio::test]
async fn test_listing_is_org_bound_for_every_role() {
    let (vault, a, _) = two_org_vault().await;

    for identity in [manager("m1", "orgA"), admin("a2", "orgA")] {
        let listed = vault.list(Some(&identity)).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![a.as_str()], "{:?} saw {:?}", identity.role(), ids);
        assert!(listed.iter().all(|s| s.org_id == "orgA"));
    }

    assert!(vault.list(Some(&viewer("v1", "orgA"))).await.unwrap().is_empty());
    assert!(vault.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cross_org_read_is_invisible() {
    let (vault, a, b) = two_org_vault().await;
    let admin_a = admin("a2", "orgA");

    assert!(vault.get_for(Some(&admin_a), &a).await.unwrap().is_some());
    assert!(vault.get_for(Some(&admin_a), &b).await.unwrap().is_none());
    assert!(vault.get_for(None, &a).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reveal_requires_admin_in_same_org() {
    let (vault, a, _) = two_org_vault().await;
    let secret = vault.get_by_id(&a).await.unwrap().unwrap();

    let token = vault.reveal(Some(&admin("a2", "orgA")), &secret).await.unwrap();
    assert_eq!(token.expose(), "alpha-token-0123456789");

    for identity in [admin("b2", "orgB"), manager("m1", "orgA"), viewer("v1", "orgA")] {
        let err = vault.reveal(Some(&identity), &secret).await.unwrap_err();
        assert!(matches!(err, VaultError::Authorization(_)));
        assert_eq!(err.code(), "FORBIDDEN");
    }

    let err = vault.reveal(None, &secret).await.unwrap_err();
    assert!(matches!(err, VaultError::Authorization(_)));
}

#[tokio::test]
async fn test_only_admin_may_create() {
    let vault = SecretVault::in_memory(test_keys());
    let token = SecretString::new("some-long-token-value-01");

    assert!(vault
        .create_for(Some(&admin("a1", "orgA")), "ok", &token)
        .await
        .is_ok());

    for identity in [manager("m1", "orgA"), viewer("v1", "orgA")] {
        let err = vault
            .create_for(Some(&identity), "nope", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Authorization(_)));
    }

    let err = vault.create_for(None, "nope", &token).await.unwrap_err();
    assert!(matches!(err, VaultError::Authorization(_)));
    assert_eq!(vault.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_requires_ownership() {
    let (vault, a, b) = two_org_vault().await;

    // Same org, different admin: visible but not owned.
    let err = vault
        .delete_for(Some(&admin("a2", "orgA")), &a)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    // Other org: not visible at all.
    let err = vault
        .delete_for(Some(&admin("a1", "orgA")), &b)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    vault.delete_for(Some(&admin("a1", "orgA")), &a).await.unwrap();
    assert_eq!(vault.count().await.unwrap(), 1);
}

#[test]
fn test_gate_and_filter_agree() {
    let identities = [
        Some(admin("a1", "orgA")),
        Some(manager("m1", "orgA")),
        Some(viewer("v1", "orgA")),
        None,
    ];
    for identity in &identities {
        let abilities = derive_abilities(identity.as_ref());
        for action in [Action::Create, Action::Read, Action::Unmask, Action::Delete] {
            let filter = abilities.filter(action, Subject::Secret);
            assert_eq!(
                abilities.can(action, Subject::Secret),
                filter.is_some(),
                "{action:?} for {:?}",
                identity.as_ref().map(|i| i.id.as_str())
            );
        }
    }

    let read = derive_abilities(Some(&manager("m1", "orgA")))
        .filter(Action::Read, Subject::Secret)
        .unwrap();
    assert_ne!(read, SecretFilter::All);
}
