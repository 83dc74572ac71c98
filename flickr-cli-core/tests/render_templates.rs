use std::fs;

use flickr_cli_core::contract::{Granularity, ItemRecord, MockBinaryFetcher, TakenDate};
use flickr_cli_core::render::TemplateRenderEngine;
use flickr_cli_core::transfer::TransferGuard;
use tempfile::tempdir;

fn photo(id: &str, title: &str, taken: &str, granularity: Granularity, format: &str) -> ItemRecord {
    ItemRecord {
        id: id.to_string(),
        title: title.to_string(),
        taken: TakenDate {
            taken: taken.to_string(),
            granularity,
        },
        original_format: format.to_string(),
        original_url: Some(format!("https://live.staticflickr.com/s/{id}_os_o.{format}")),
        ..Default::default()
    }
}

/// Listing order deliberately differs from path order.
fn fixture() -> Vec<ItemRecord> {
    vec![
        photo("456", "Foobar", "2017-11-01 08:12:01", Granularity::Month, "jpg"),
        photo("123", "Lorem ipsum", "2019-01-01 13:45:00", Granularity::Exact, "png"),
    ]
}

fn writing_fetcher(expected_calls: usize) -> MockBinaryFetcher {
    let mut fetcher = MockBinaryFetcher::new();
    fetcher
        .expect_fetch()
        .times(expected_calls)
        .returning(|url, dest| {
            fs::write(dest, url.as_bytes()).unwrap();
            Ok(url.len() as u64)
        });
    fetcher
}

#[tokio::test]
async fn archive_template_writes_hashed_paths_and_sorted_csv() {
    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("archive");
    let engine = TemplateRenderEngine::new("archive", &dest).unwrap();
    let fetcher = writing_fetcher(2);
    let guard = TransferGuard::new(&fetcher);

    let mut callbacks = 0;
    let summary = engine
        .render(&fixture(), &guard, |_| callbacks += 1)
        .await
        .unwrap();

    assert_eq!(callbacks, 2);
    assert_eq!(summary.rendered, 2);
    assert_eq!(summary.transferred, 2);
    assert_eq!(summary.aggregate, dest.join("photos.csv"));

    // 20/2c/123.png sorts before 25/0c/456.jpg.
    assert_eq!(
        fs::read_to_string(dest.join("photos.csv")).unwrap(),
        "id,date_taken,title\n123,2019-01-01 13:45:00,Lorem ipsum\n456,2017-11-01 08:12:01,Foobar\n"
    );
    assert_eq!(
        fs::read_to_string(dest.join("20/2c/123.yml")).unwrap(),
        "id: 123\ndate_taken: 2019-01-01 13:45:00\ntitle: Lorem ipsum\n"
    );
    assert_eq!(
        fs::read_to_string(dest.join("25/0c/456.yml")).unwrap(),
        "id: 456\ndate_taken: 2017-11-01 08:12:01\ntitle: Foobar\n"
    );
    assert!(dest.join("20/2c/123.png").is_file());
    assert!(dest.join("25/0c/456.jpg").is_file());
}

#[tokio::test]
async fn second_render_transfers_nothing() {
    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("archive");
    let fetcher = writing_fetcher(2);
    let guard = TransferGuard::new(&fetcher);

    let first = TemplateRenderEngine::new("archive", &dest)
        .unwrap()
        .render(&fixture(), &guard, |_| {})
        .await
        .unwrap();
    let csv_after_first = fs::read_to_string(dest.join("photos.csv")).unwrap();

    let second = TemplateRenderEngine::new("archive", &dest)
        .unwrap()
        .render(&fixture(), &guard, |_| {})
        .await
        .unwrap();

    assert_eq!(first.transferred, 2);
    assert_eq!(second.transferred, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(
        fs::read_to_string(dest.join("photos.csv")).unwrap(),
        csv_after_first
    );
}

#[tokio::test]
async fn aggregate_order_ignores_listing_order() {
    let tmp = tempdir().unwrap();
    let fetcher = writing_fetcher(4);
    let guard = TransferGuard::new(&fetcher);

    let mut reversed = fixture();
    reversed.reverse();

    let a = tmp.path().join("a");
    let b = tmp.path().join("b");
    TemplateRenderEngine::new("archive", &a)
        .unwrap()
        .render(&fixture(), &guard, |_| {})
        .await
        .unwrap();
    TemplateRenderEngine::new("archive", &b)
        .unwrap()
        .render(&reversed, &guard, |_| {})
        .await
        .unwrap();

    assert_eq!(
        fs::read_to_string(a.join("photos.csv")).unwrap(),
        fs::read_to_string(b.join("photos.csv")).unwrap()
    );
}

#[tokio::test]
async fn latex_template_escapes_text_and_formats_dates() {
    let tmp = tempdir().unwrap();
    let dest = tmp.path().join("latex");
    let fetcher = writing_fetcher(1);
    let guard = TransferGuard::new(&fetcher);
    let mut record = photo("123", "50% off & more", "2019-01-01 13:45:00", Granularity::Exact, "png");
    record.description = "<b>Beach</b> day".to_string();

    let engine = TemplateRenderEngine::new("latex", &dest).unwrap();
    assert!(engine.template().photo.is_none());
    engine.render(&[record], &guard, |_| {}).await.unwrap();

    let tex = fs::read_to_string(dest.join("photos.tex")).unwrap();
    assert!(tex.contains("50\\% off \\& more"));
    assert!(tex.contains("Beach day"));
    assert!(tex.contains("{photos/123.png}"));
    assert!(tex.contains("2019 Jan 1 1:45 pm"));
    assert!(tex.contains("https://flic.kr/p/38"));
    assert!(dest.join("photos/123.png").is_file());
}

#[tokio::test]
async fn custom_template_directory_is_used_by_path() {
    let tmp = tempdir().unwrap();
    let tpl = tmp.path().join("gallery");
    fs::create_dir(&tpl).unwrap();
    fs::write(tpl.join("path.jinja"), "{{ taken.date|substr(0, 4) }}/{{ id }}.{{ ext }}\n").unwrap();
    fs::write(tpl.join("photo.md.jinja"), "# {{ title }}\n\n![]({{ path }})\n").unwrap();
    fs::write(
        tpl.join("photos.md.jinja"),
        "{% for photo in photos %}\n- [{{ photo.title }}]({{ photo.path }})\n{% endfor %}\n",
    )
    .unwrap();

    let dest = tmp.path().join("out");
    let fetcher = writing_fetcher(2);
    let guard = TransferGuard::new(&fetcher);
    TemplateRenderEngine::new(tpl.to_str().unwrap(), &dest)
        .unwrap()
        .render(&fixture(), &guard, |_| {})
        .await
        .unwrap();

    assert_eq!(
        fs::read_to_string(dest.join("2019/123.md")).unwrap(),
        "# Lorem ipsum\n\n![](2019/123.png)\n"
    );
    assert_eq!(
        fs::read_to_string(dest.join("photos.md")).unwrap(),
        "- [Foobar](2017/456.jpg)\n- [Lorem ipsum](2019/123.png)\n"
    );
}
