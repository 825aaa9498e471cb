mod common;

use common::{ids, json_body, TestApp};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn product(name: &str, category_id: &Value, price: f64) -> Value {
    json!({
        "name": name,
        "category_id": category_id,
        "price": price,
        "description": format!("{name} description"),
        "stock": 5,
    })
}

async fn list(app: &TestApp, query: &str) -> Value {
    let response = app
        .get(&format!("/api/products{query}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "{query}");
    json_body(response).await
}

#[tokio::test]
async fn test_price_low_orders_bags() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let bags = app.create_category(&admin, "Bags").await;
    let other = app.create_category(&admin, "Shoes").await;

    let a = app.create_product(&admin, product("Product A", &bags["id"], 100.0)).await;
    let b = app.create_product(&admin, product("Product B", &bags["id"], 80.0)).await;
    app.create_product(&admin, product("Sneaker", &other["id"], 50.0)).await;

    let page = list(&app, &format!("?category={}&sort=price_low", bags["id"])).await;
    assert_eq!(ids(&page["data"]), vec![b["id"].as_i64().unwrap(), a["id"].as_i64().unwrap()]);
    assert_eq!(page["total"], 2);
    assert_eq!(page["data"][0]["category"]["slug"], "bags");
}

#[tokio::test]
async fn test_sorts_are_monotonic() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Mixed").await;
    for (name, price) in [("Delta", 40.0), ("alpha", 10.0), ("Charlie", 40.0), ("Bravo", 25.5)] {
        app.create_product(&admin, product(name, &category["id"], price)).await;
    }

    let prices = |page: &Value| -> Vec<f64> {
        page["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["price"].as_f64().unwrap())
            .collect()
    };

    let low = prices(&list(&app, "?sort=price_low").await);
    assert!(low.windows(2).all(|w| w[0] <= w[1]), "{low:?}");

    let high = prices(&list(&app, "?sort=price_high").await);
    assert!(high.windows(2).all(|w| w[0] >= w[1]), "{high:?}");

    //unknown sort falls back to newest first
    let latest = list(&app, "?sort=cheapest").await;
    let mut expected = ids(&list(&app, "?sort=price_low").await);
    expected.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(ids(&latest["data"]), expected);

    let names: Vec<String> = list(&app, "?sort=name").await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[tokio::test]
async fn test_filters_compose_with_and() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let bags = app.create_category(&admin, "Bags").await;
    let hats = app.create_category(&admin, "Hats").await;

    let mut featured_bag = product("Leather Tote", &bags["id"], 120.0);
    featured_bag["is_featured"] = json!(true);
    app.create_product(&admin, featured_bag).await;
    app.create_product(&admin, product("Canvas Tote", &bags["id"], 40.0)).await;
    let mut featured_hat = product("Tote Hat", &hats["id"], 60.0);
    featured_hat["is_featured"] = json!(true);
    app.create_product(&admin, featured_hat).await;
    let mut hidden = product("Hidden Tote", &bags["id"], 70.0);
    hidden["is_active"] = json!(false);
    app.create_product(&admin, hidden).await;

    let page = list(
        &app,
        &format!(
            "?search=TOTE&category_id={}&featured=true&min_price=50&max_price=200",
            bags["id"]
        ),
    )
    .await;
    let data = page["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "Leather Tote");

    let everything = list(&app, "?search=tote").await;
    assert_eq!(everything["total"], 3);
    for item in everything["data"].as_array().unwrap() {
        assert_eq!(item["is_active"], true);
        assert!(item["name"].as_str().unwrap().to_lowercase().contains("tote"));
    }
}

#[tokio::test]
async fn test_search_matches_non_ascii_names() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let sweets = app.create_category(&admin, "Sweets").await;
    app.create_product(&admin, product("ÉCLAIR Box", &sweets["id"], 12.0)).await;
    app.create_product(&admin, product("Macaron Tin", &sweets["id"], 9.0)).await;

    //"ÉCLAIR", "Éclair", "box"
    for query in ["?search=%C3%89CLAIR", "?search=%C3%89clair", "?search=box"] {
        let page = list(&app, query).await;
        assert_eq!(page["total"], 1, "{query}");
        assert_eq!(page["data"][0]["name"], "ÉCLAIR Box");
    }

    //only ASCII letters fold, as in SQLite's LOWER()
    assert_eq!(list(&app, "?search=%C3%A9clair").await["total"], 0);
}

#[tokio::test]
async fn test_single_price_bound_is_ignored() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Cups").await;
    for (name, price) in [("Small Cup", 5.0), ("Big Cup", 50.0), ("Huge Cup", 500.0)] {
        app.create_product(&admin, product(name, &category["id"], price)).await;
    }

    let none = list(&app, "").await;
    let only_min = list(&app, "?min_price=100").await;
    let only_max = list(&app, "?max_price=10").await;
    assert_eq!(ids(&only_min["data"]), ids(&none["data"]));
    assert_eq!(ids(&only_max["data"]), ids(&none["data"]));

    let both = list(&app, "?min_price=5&max_price=50").await;
    assert_eq!(both["total"], 2);
}

#[tokio::test]
async fn test_pages_cover_every_product_once() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Socks").await;
    for i in 0..7 {
        app.create_product(&admin, product(&format!("Sock {i}"), &category["id"], 3.0)).await;
    }

    let first = list(&app, "?sort=price_low&per_page=3").await;
    assert_eq!(first["total"], 7);
    assert_eq!(first["total_pages"], 3);

    let mut seen = Vec::new();
    for page in 1..=first["total_pages"].as_u64().unwrap() {
        let body = list(&app, &format!("?sort=price_low&per_page=3&page={page}")).await;
        seen.extend(ids(&body["data"]));
    }
    let mut all = ids(&list(&app, "?per_page=100").await["data"]);
    all.sort_unstable();
    let mut unique = seen.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(seen.len(), 7);
    assert_eq!(unique, all);

    let clamped = list(&app, "?page=0&per_page=0").await;
    assert_eq!(clamped["page"], 1);
    assert_eq!(clamped["per_page"], 1);

    let beyond = list(&app, "?page=99").await;
    assert!(beyond["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_product_detail_and_featured() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Lamps").await;

    let mut desk = product("Desk Lamp", &category["id"], 30.0);
    desk["is_featured"] = json!(true);
    app.create_product(&admin, desk).await;
    let mut hidden = product("Floor Lamp", &category["id"], 90.0);
    hidden["is_active"] = json!(false);
    hidden["is_featured"] = json!(true);
    app.create_product(&admin, hidden).await;

    let response = app.get("/api/products/desk-lamp").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Desk Lamp");
    assert_eq!(body["in_stock"], true);
    assert_eq!(body["category"]["name"], "Lamps");

    let response = app.get("/api/products/floor-lamp").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let featured = json_body(app.get("/api/products/featured").send().await.unwrap()).await;
    let names: Vec<&str> = featured
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Desk Lamp"]);

    let admin_page = json_body(
        app.get("/api/admin/products?active=false")
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(admin_page["total"], 1);
    assert_eq!(admin_page["per_page"], 10);
    assert_eq!(admin_page["data"][0]["name"], "Floor Lamp");
}

#[tokio::test]
async fn test_similar_stays_in_category_and_excludes_self() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let bags = app.create_category(&admin, "Bags").await;
    let hats = app.create_category(&admin, "Hats").await;

    let source = app.create_product(&admin, product("Tote", &bags["id"], 10.0)).await;
    let peer = app.create_product(&admin, product("Clutch", &bags["id"], 20.0)).await;
    let mut inactive = product("Old Satchel", &bags["id"], 30.0);
    inactive["is_active"] = json!(false);
    app.create_product(&admin, inactive).await;
    app.create_product(&admin, product("Beanie", &hats["id"], 15.0)).await;

    let similar = json_body(
        app.get(&format!("/api/products/{}/similar", source["id"]))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(ids(&similar), vec![peer["id"].as_i64().unwrap()]);

    let lonely = app.create_product(&admin, product("Fedora", &hats["id"], 25.0)).await;
    let response = app
        .get(&format!("/api/products/{}/similar?limit=1", lonely["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(ids(&json_body(response).await).len(), 1);

    let response = app.get("/api/products/9999/similar").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
