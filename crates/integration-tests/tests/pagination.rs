//! Store listing pagination over the whole table.
//!
//! Kept to a single test: it reads every page and assumes no other test in
//! this binary inserts stores meanwhile.

use std::collections::BTreeSet;

use delicious_core::PageRequest;
use delicious_core::types::page::DEFAULT_PAGE_SIZE;
use delicious_integration_tests::{TestContext, unique};
use delicious_web::db::StoreRepository;

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_pages_cover_every_store_once() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Pager").await;
    for _ in 0..=DEFAULT_PAGE_SIZE {
        ctx.create_store(&unique("paged"), &[], (-79.38, 43.65), owner.id)
            .await;
    }

    let repo = StoreRepository::new(&ctx.pool);
    let all: BTreeSet<_> = repo
        .all()
        .await
        .expect("all stores")
        .into_iter()
        .map(|s| s.id)
        .collect();

    let first = repo.list(PageRequest::new(1)).await.expect("page 1");
    let total_pages = first.pagination.total_pages;
    assert_eq!(
        first.pagination.total_count,
        u64::try_from(all.len()).expect("fits")
    );
    assert!(total_pages >= 2);

    let mut seen = BTreeSet::new();
    for page in 1..=total_pages {
        let listed = repo.list(PageRequest::new(page)).await.expect("page");
        assert!(listed.stores.len() <= usize::try_from(DEFAULT_PAGE_SIZE).expect("fits"));
        assert!(!listed.stores.is_empty(), "page {page} is empty");
        assert_eq!(listed.pagination.correction(listed.stores.len()), None);
        for store in listed.stores {
            assert!(seen.insert(store.id), "{} listed twice", store.slug);
        }
    }
    assert_eq!(seen, all);

    let past_end = repo
        .list(PageRequest::new(total_pages + 1))
        .await
        .expect("past the end");
    assert!(past_end.stores.is_empty());
    assert_eq!(
        past_end.pagination.correction(past_end.stores.len()),
        Some(total_pages)
    );
}
