//! Store repository tests: slugs, ownership, tags, rankings, search and proximity.

use std::collections::BTreeSet;

use uuid::Uuid;

use delicious_core::GeoPoint;
use delicious_core::types::geo::{DEFAULT_NEAR_LIMIT, DEFAULT_NEAR_RADIUS_METERS};
use delicious_integration_tests::{TestContext, unique};
use delicious_web::db::{RepositoryError, ReviewRepository, StoreRepository};
use delicious_web::models::{ReviewInput, StoreInput};

/// Degrees of latitude per kilometre, close enough for fixtures.
const DEG_PER_KM: f64 = 1.0 / 111.32;

fn draft(name: &str) -> StoreInput {
    StoreInput {
        name: name.to_owned(),
        description: String::new(),
        tags: vec![],
        address: "2 Test Street".to_owned(),
        lng: "-79.38".to_owned(),
        lat: "43.65".to_owned(),
    }
}

// =============================================================================
// Slugs
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_same_name_gets_numbered_slug() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Slug Owner").await;
    let name = unique("slug test");

    let first = ctx.create_store(&name, &[], (-79.38, 43.65), owner.id).await;
    let second = ctx.create_store(&name, &[], (-79.38, 43.65), owner.id).await;

    assert_eq!(first.slug.as_str(), name);
    assert_eq!(second.slug.as_str(), format!("{name}-2"));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_update_without_rename_keeps_slug() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Slug Owner").await;
    let name = unique("stable slug");
    let store = ctx.create_store(&name, &[], (-79.38, 43.65), owner.id).await;

    let mut input = draft(&name);
    input.description = "Now with a description".to_owned();
    let updated = StoreRepository::new(&ctx.pool)
        .update(store.id, owner.id, &input.validate().expect("valid"))
        .await
        .expect("update");

    assert_eq!(updated.slug, store.slug);
    assert_eq!(updated.description.as_deref(), Some("Now with a description"));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_rename_onto_taken_slug_gets_suffix() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Slug Owner").await;
    let taken = unique("taken");
    ctx.create_store(&taken, &[], (-79.38, 43.65), owner.id).await;
    let other = ctx
        .create_store(&unique("other"), &[], (-79.38, 43.65), owner.id)
        .await;

    let renamed = StoreRepository::new(&ctx.pool)
        .update(other.id, owner.id, &draft(&taken).validate().expect("valid"))
        .await
        .expect("update");

    assert_eq!(renamed.slug.as_str(), format!("{taken}-2"));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_counted_slug_already_taken_moves_to_next_suffix() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Slug Owner").await;
    let name = unique("gap");

    let first = ctx.create_store(&name, &[], (-79.38, 43.65), owner.id).await;
    let second = ctx.create_store(&name, &[], (-79.38, 43.65), owner.id).await;
    assert_eq!(second.slug.as_str(), format!("{name}-2"));

    // Only `-2` is left in the family, so the count points back at it
    StoreRepository::new(&ctx.pool)
        .update(first.id, owner.id, &draft(&unique("moved")).validate().expect("valid"))
        .await
        .expect("rename");

    let third = ctx.create_store(&name, &[], (-79.38, 43.65), owner.id).await;
    assert_eq!(third.slug.as_str(), format!("{name}-3"));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_concurrent_creates_get_distinct_slugs() {
    const CREATES: usize = 4;

    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Rusher").await;
    let rush = draft(&unique("rush")).validate().expect("valid");

    let owner_id = owner.id;
    let tasks: Vec<_> = (0..CREATES)
        .map(|_| {
            let pool = ctx.pool.clone();
            let rush = rush.clone();
            tokio::spawn(async move { StoreRepository::new(&pool).create(&rush, owner_id).await })
        })
        .collect();

    let mut slugs = BTreeSet::new();
    for task in tasks {
        let store = task.await.expect("join").expect("create");
        slugs.insert(store.slug.as_str().to_owned());
    }
    assert_eq!(slugs.len(), CREATES);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_update_by_non_owner_is_forbidden() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Owner").await;
    let intruder = ctx.create_user("Intruder").await;
    let name = unique("guarded");
    let store = ctx.create_store(&name, &[], (-79.38, 43.65), owner.id).await;

    let result = StoreRepository::new(&ctx.pool)
        .update(store.id, intruder.id, &draft("Hijacked").validate().expect("valid"))
        .await;

    assert!(matches!(result, Err(RepositoryError::Forbidden)));
    let unchanged = StoreRepository::new(&ctx.pool)
        .find_by_id(store.id)
        .await
        .expect("find");
    assert_eq!(unchanged.name, name);
}

// =============================================================================
// Tags
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_tag_counts_and_filter() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Tagger").await;
    let tag_a = unique("tag a");
    let tag_b = unique("tag b");

    let both = ctx
        .create_store(&unique("both"), &[tag_a.as_str(), tag_b.as_str()], (-79.38, 43.65), owner.id)
        .await;
    let only_a = ctx
        .create_store(&unique("only a"), &[tag_a.as_str()], (-79.38, 43.65), owner.id)
        .await;

    let repo = StoreRepository::new(&ctx.pool);
    let counts = repo.tag_counts().await.expect("tag counts");
    let count_of = |tag: &str| counts.iter().find(|c| c.tag == tag).map(|c| c.count);
    assert_eq!(count_of(&tag_a), Some(2));
    assert_eq!(count_of(&tag_b), Some(1));

    let tagged = repo.find_by_tag(Some(&tag_b)).await.expect("by tag");
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged.first().map(|s| s.id), Some(both.id));

    let tagged = repo.find_by_tag(Some(&tag_a)).await.expect("by tag");
    let ids: Vec<_> = tagged.iter().map(|s| s.id).collect();
    assert!(ids.contains(&both.id));
    assert!(ids.contains(&only_a.id));
}

// =============================================================================
// Top rated
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_top_rated_needs_two_reviews() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Owner").await;
    let critic = ctx.create_user("Critic").await;

    let rated = ctx
        .create_store(&unique("rated"), &[], (-79.38, 43.65), owner.id)
        .await;
    let lonely = ctx
        .create_store(&unique("lonely"), &[], (-79.38, 43.65), owner.id)
        .await;

    let reviews = ReviewRepository::new(&ctx.pool);
    for (store, rating) in [(rated.id, 4), (rated.id, 5), (lonely.id, 5)] {
        let review = ReviewInput {
            text: "Tested".to_owned(),
            rating: Some(rating),
        }
        .validate()
        .expect("valid review");
        reviews
            .create(store, critic.id, &review)
            .await
            .expect("create review");
    }

    let top = StoreRepository::new(&ctx.pool)
        .top_rated(i64::from(i32::MAX))
        .await
        .expect("top rated");

    let entry = top
        .iter()
        .find(|t| t.slug == rated.slug)
        .expect("store with two reviews is ranked");
    assert!((entry.average_rating - 4.5).abs() < f64::EPSILON);
    assert_eq!(entry.review_count, 2);
    assert!(top.iter().all(|t| t.slug != lonely.slug));
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_search_returns_every_match() {
    const MATCHES: usize = 7;

    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Searcher").await;
    let word = format!("zz{}", Uuid::new_v4().simple());

    let mut expected = BTreeSet::new();
    for i in 0..MATCHES {
        let store = ctx
            .create_store(&format!("{word} Bakery {i}"), &[], (-79.38, 43.65), owner.id)
            .await;
        expected.insert(store.id);
    }
    ctx.create_store(&unique("unrelated"), &[], (-79.38, 43.65), owner.id)
        .await;

    let found = StoreRepository::new(&ctx.pool)
        .search(&word)
        .await
        .expect("search");

    let ids: BTreeSet<_> = found.iter().map(|s| s.id).collect();
    assert_eq!(found.len(), MATCHES);
    assert_eq!(ids, expected);
}

// =============================================================================
// Proximity
// =============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_near_filters_by_radius_and_sorts_by_distance() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user("Explorer").await;

    // A fresh origin per run so earlier fixtures don't crowd the results
    let spread = u32::try_from(Uuid::new_v4().as_u128() % 3400).expect("fits");
    let lng = -170.0 + f64::from(spread) / 10.0;
    let lat = -45.0;

    let far = ctx
        .create_store(&unique("far"), &[], (lng, lat + 15.0 * DEG_PER_KM), owner.id)
        .await;
    let mid = ctx
        .create_store(&unique("mid"), &[], (lng, lat + 5.0 * DEG_PER_KM), owner.id)
        .await;
    let here = ctx.create_store(&unique("here"), &[], (lng, lat), owner.id).await;

    let origin = GeoPoint::new(lng, lat).expect("origin");
    let found = StoreRepository::new(&ctx.pool)
        .near(origin, DEFAULT_NEAR_RADIUS_METERS, DEFAULT_NEAR_LIMIT)
        .await
        .expect("near");

    let slugs: Vec<_> = found.iter().map(|s| s.slug.clone()).collect();
    assert_eq!(slugs, vec![here.slug, mid.slug]);
    assert!(!found.iter().any(|s| s.slug == far.slug));
    assert!(found.windows(2).all(|w| match w {
        [a, b] => a.distance_meters <= b.distance_meters,
        _ => true,
    }));
}
