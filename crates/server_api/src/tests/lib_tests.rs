use super::*;
use async_trait::async_trait;
use shared::domain::CityId;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

struct FixedDirectory {
    lookup: CityLookup,
    calls: AtomicUsize,
}

impl FixedDirectory {
    fn new(lookup: CityLookup) -> Arc<Self> {
        Arc::new(Self {
            lookup,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CityDirectory for FixedDirectory {
    async fn city_by_slug(&self, _slug: &CitySlug) -> anyhow::Result<CityLookup> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup.clone())
    }
}

struct BrokenDirectory;

#[async_trait]
impl CityDirectory for BrokenDirectory {
    async fn city_by_slug(&self, _slug: &CitySlug) -> anyhow::Result<CityLookup> {
        Err(anyhow::anyhow!("relation \"cities\" does not exist"))
    }
}

struct StalledDirectory;

#[async_trait]
impl CityDirectory for StalledDirectory {
    async fn city_by_slug(&self, _slug: &CitySlug) -> anyhow::Result<CityLookup> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(CityLookup::NotFound)
    }
}

fn springfield(is_active: bool) -> City {
    City {
        id: CityId("0b7d".into()),
        name: "Springfield".into(),
        slug: "springfield".into(),
        logo_url: "https://x/logo.png".into(),
        primary_color: "#112233".into(),
        secondary_color: String::new(),
        accent_color: "#ffcc00".into(),
        db_url: "postgres://tenant-db".into(),
        is_active,
    }
}

#[tokio::test]
async fn active_city_projects_to_theme() {
    let directory = FixedDirectory::new(CityLookup::Found(springfield(true)));
    let svc = ThemeService::new(directory.clone());

    let theme = get_city_theme(&svc, "springfield").await.expect("theme");
    assert_eq!(
        theme,
        CityThemeResponse {
            name: "Springfield".into(),
            slug: "springfield".into(),
            logo_url: "https://x/logo.png".into(),
            primary_color: "#112233".into(),
            secondary_color: String::new(),
            accent_color: "#ffcc00".into(),
        }
    );
    assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inactive_city_is_forbidden() {
    let svc = ThemeService::new(FixedDirectory::new(CityLookup::Found(springfield(false))));
    let err = get_city_theme(&svc, "springfield")
        .await
        .expect_err("should fail");
    assert!(matches!(err.code, ErrorCode::Forbidden));
    assert_eq!(err.message, "city disabled");
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let svc = ThemeService::new(FixedDirectory::new(CityLookup::NotFound));
    let err = get_city_theme(&svc, "nope").await.expect_err("should fail");
    assert!(matches!(err.code, ErrorCode::NotFound));
    assert_eq!(err.message, "city not found");
}

#[tokio::test]
async fn empty_slug_is_rejected_before_the_store() {
    let directory = FixedDirectory::new(CityLookup::NotFound);
    let svc = ThemeService::new(directory.clone());

    let err = get_city_theme(&svc, "").await.expect_err("should fail");
    assert!(matches!(err.code, ErrorCode::InvalidRequest));
    assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_failure_is_internal_without_detail() {
    let svc = ThemeService::new(Arc::new(BrokenDirectory));
    let err = get_city_theme(&svc, "springfield")
        .await
        .expect_err("should fail");
    assert!(matches!(err.code, ErrorCode::Internal));
    assert!(!err.message.contains("cities"));
}

#[tokio::test]
async fn stalled_lookup_times_out_as_internal() {
    let svc = ThemeService::new(Arc::new(StalledDirectory))
        .with_query_timeout(Duration::from_millis(50));

    let started = Instant::now();
    let err = get_city_theme(&svc, "springfield")
        .await
        .expect_err("should time out");
    assert!(matches!(err.code, ErrorCode::Internal));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn inspect_returns_inactive_city() {
    let svc = ThemeService::new(FixedDirectory::new(CityLookup::Found(springfield(false))));
    let city = inspect_city(&svc, "springfield").await.expect("city");
    assert!(!city.is_active);
    assert_eq!(city.db_url, "postgres://tenant-db");
}

#[test]
fn default_timeout_is_five_seconds() {
    let svc = ThemeService::new(FixedDirectory::new(CityLookup::NotFound));
    assert_eq!(svc.query_timeout, Duration::from_secs(5));
}
