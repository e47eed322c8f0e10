//! End-to-end category listing against a local HTTP stub.

mod support;

use std::collections::HashMap;

use shamela::core::category::extract_category;
use shamela::core::config::HarvestConfig;
use shamela::core::retry::RetryEnvelope;

const CATEGORY_PAGE: &str = r#"<html><head><title>قسم التفسير | المكتبة</title></head>
<body>
<ul>
<li><a href="/book/10/1">كتاب التفسير الأول</a></li>
<li><a href="/book/20/1">كتاب التفسير الثاني</a></li>
<li><a href="/book/10/2">نفس الكتاب، صفحة أخرى</a></li>
</ul>
</body></html>"#;

#[test]
fn category_listing_deduplicates_book_ids_in_order() {
    let mut routes = HashMap::new();
    routes.insert("/category/3", CATEGORY_PAGE);
    let base_url = support::start_stub_server(routes);

    let config = HarvestConfig {
        base_url: base_url.clone(),
        ..HarvestConfig::default()
    };
    let envelope = RetryEnvelope::new(config);

    let listing = extract_category(&envelope, &base_url, "3").expect("category fetch should succeed");

    assert_eq!(listing.category_name.as_deref(), Some("قسم التفسير"));
    let ids: Vec<&str> = listing.book_ids.iter().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["10", "20"]);
}
