//! Builders for CivitAI `GET /models/{id}` and search payloads.

use serde_json::{Value, json};

/// Model document whose first version's first file carries `download_url`
/// and `name`; either may be omitted.
#[must_use]
pub fn model_body(id: u64, download_url: Option<&str>, name: Option<&str>) -> Value {
    let mut file = serde_json::Map::new();
    file.insert("type".into(), json!("Model"));
    if let Some(url) = download_url {
        file.insert("downloadUrl".into(), json!(url));
    }
    if let Some(name) = name {
        file.insert("name".into(), json!(name));
    }
    json!({
        "id": id,
        "name": format!("model-{id}"),
        "description": "<p>fixture</p>",
        "tags": ["portrait", "photography"],
        "modelVersions": [
            {
                "id": id * 10,
                "baseModel": "Flux.1 D",
                "trainedWords": ["ohwx", "portrait"],
                "files": [Value::Object(file)]
            }
        ]
    })
}

/// Model document without any versions.
#[must_use]
pub fn model_without_versions(id: u64) -> Value {
    json!({ "id": id, "name": format!("model-{id}"), "modelVersions": [] })
}

/// Search response listing `(id, name)` pairs.
#[must_use]
pub fn search_body(items: &[(u64, &str)]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(id, name)| {
            json!({
                "id": id,
                "name": name,
                "type": "LORA",
                "tags": ["portrait"],
                "stats": { "rating": 4.5, "downloadCount": 1200 }
            })
        })
        .collect();
    let total = items.len();
    json!({ "items": items, "metadata": { "totalItems": total } })
}

/// Search response listing `(id, name, rating)`; `None` omits the rating.
#[must_use]
pub fn rated_search_body(items: &[(u64, &str, Option<f64>)]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(id, name, rating)| {
            let stats = rating.map_or_else(
                || json!({ "downloadCount": 10 }),
                |rating| json!({ "rating": rating, "downloadCount": 10 }),
            );
            json!({ "id": id, "name": name, "type": "LORA", "tags": [], "stats": stats })
        })
        .collect();
    json!({ "items": items })
}
