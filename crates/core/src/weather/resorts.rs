use crate::domain::resort::{default_resorts, SkiResort};
use crate::weather::ResortProvider;
use serde_json::Value;
use std::sync::{Arc, RwLock};

pub const DEFAULT_CITY: &str = "北京";
pub const DEFAULT_KEYWORDS: &str = "滑雪场";

const DEFAULT_RATING: f64 = 4.0;
const SKI_MARKER: &str = "滑雪";

/// Resort lookup with a built-in list as the floor. Remembers the last
/// successful search so ids from it can be resolved later.
pub struct ResortDirectory {
    provider: Option<Arc<dyn ResortProvider>>,
    known: RwLock<Vec<SkiResort>>,
}

impl ResortDirectory {
    pub fn new(provider: Option<Arc<dyn ResortProvider>>) -> Self {
        Self {
            provider,
            known: RwLock::new(default_resorts()),
        }
    }

    pub async fn search(&self, city: &str, keywords: &str) -> Vec<SkiResort> {
        let Some(provider) = &self.provider else {
            return default_resorts();
        };

        match provider.search_resorts(city, keywords).await {
            Ok(resorts) if !resorts.is_empty() => {
                *self.known.write().unwrap_or_else(|e| e.into_inner()) = resorts.clone();
                resorts
            }
            Ok(_) => {
                tracing::info!(%city, %keywords, "resort search returned nothing; using built-in list");
                default_resorts()
            }
            Err(err) => {
                tracing::warn!(%city, %keywords, error = %format!("{err:#}"), "resort search failed; using built-in list");
                default_resorts()
            }
        }
    }

    #[cfg(test)]
    fn known(&self) -> Vec<SkiResort> {
        self.known.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn find(&self, id: &str) -> Option<SkiResort> {
        self.known
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .or_else(|| default_resorts().into_iter().find(|r| r.id == id))
    }
}

/// POI search payload -> ski resorts. Entries that are not ski venues are dropped.
pub fn parse_pois(payload: &Value, requested_city: &str) -> Vec<SkiResort> {
    let Some(pois) = payload.get("pois").and_then(Value::as_array) else {
        return Vec::new();
    };

    pois.iter()
        .filter(|poi| is_ski_venue(poi))
        .filter_map(|poi| {
            let id = str_field(poi, "id")?;
            let name = str_field(poi, "name")?;
            Some(SkiResort {
                id,
                name,
                address: str_field(poi, "address").unwrap_or_default(),
                location: str_field(poi, "location").unwrap_or_default(),
                rating: poi
                    .get("biz_ext")
                    .and_then(|b| b.get("rating"))
                    .and_then(parse_rating)
                    .unwrap_or(DEFAULT_RATING),
                tel: first_str(poi.get("tel")),
                city_name: str_field(poi, "cityname").unwrap_or_else(|| requested_city.to_string()),
                district: str_field(poi, "adname").unwrap_or_default(),
                photo_url: poi
                    .get("photos")
                    .and_then(|p| p.get(0))
                    .and_then(|p| str_field(p, "url")),
            })
        })
        .collect()
}

fn is_ski_venue(poi: &Value) -> bool {
    ["type", "name"].iter().any(|key| {
        poi.get(*key)
            .and_then(Value::as_str)
            .is_some_and(|s| s.contains(SKI_MARKER))
    })
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// The POI API sends strings, numbers or an empty array for missing values.
fn parse_rating(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|r| r.is_finite())
}

fn first_str(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => items.iter().find_map(|i| first_str(Some(i))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeProvider(anyhow::Result<Vec<SkiResort>>);

    #[async_trait::async_trait]
    impl ResortProvider for FakeProvider {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn search_resorts(&self, _city: &str, _keywords: &str) -> anyhow::Result<Vec<SkiResort>> {
            match &self.0 {
                Ok(resorts) => Ok(resorts.clone()),
                Err(err) => Err(anyhow::anyhow!("{err}")),
            }
        }
    }

    fn payload() -> Value {
        json!({
            "pois": [
                {
                    "id": "P1", "name": "Wanlong Ski Resort", "type": "体育休闲服务;滑雪",
                    "address": "Hongtu Village", "location": "115.4,40.9",
                    "biz_ext": {"rating": "4.8"}, "tel": ["0313-1234567", "0313-7654321"],
                    "cityname": "Zhangjiakou", "adname": "Chongli",
                    "photos": [{"url": "http://example.com/a.jpg"}]
                },
                {
                    "id": "P2", "name": "Jundushan 滑雪场", "type": "体育休闲服务",
                    "biz_ext": {"rating": []}, "tel": []
                },
                {"id": "P4", "name": "Ski Rental Shop Cafe", "type": "餐饮服务"},
                {"id": "P3", "name": "Shopping Mall", "type": "购物服务"},
                {"name": "滑雪场 without id"}
            ]
        })
    }

    #[test]
    fn parses_and_filters_pois() {
        let resorts = parse_pois(&payload(), "张家口");
        assert_eq!(resorts.len(), 2);

        let wanlong = &resorts[0];
        assert_eq!(wanlong.rating, 4.8);
        assert_eq!(wanlong.tel.as_deref(), Some("0313-1234567"));
        assert_eq!(wanlong.district, "Chongli");
        assert_eq!(wanlong.photo_url.as_deref(), Some("http://example.com/a.jpg"));

        let jundushan = &resorts[1];
        assert_eq!(jundushan.id, "P2");
        assert_eq!(jundushan.rating, DEFAULT_RATING);
        assert_eq!(jundushan.tel, None);
        assert_eq!(jundushan.city_name, "张家口");
        assert_eq!(jundushan.photo_url, None);
    }

    #[test]
    fn english_ski_names_alone_do_not_qualify() {
        let payload = json!({"pois": [
            {"id": "C1", "name": "Ski Rental Shop Cafe", "type": "餐饮服务"},
            {"id": "C2", "name": "Skyline Ski Hotel", "type": "住宿服务"}
        ]});
        assert!(parse_pois(&payload, "北京").is_empty());
    }

    #[test]
    fn missing_pois_is_empty() {
        assert!(parse_pois(&json!({"status": "0"}), "北京").is_empty());
    }

    #[tokio::test]
    async fn successful_search_is_remembered() {
        let found = parse_pois(&payload(), "张家口");
        let dir = ResortDirectory::new(Some(Arc::new(FakeProvider(Ok(found.clone())))));
        assert_eq!(dir.search("张家口", DEFAULT_KEYWORDS).await, found);
        assert_eq!(dir.find("P1").map(|r| r.name), Some("Wanlong Ski Resort".to_string()));
        // Built-in ids still resolve after a search replaced the list.
        assert!(dir.find("B000A9WZYZ").is_some());
    }

    #[tokio::test]
    async fn empty_or_failed_search_falls_back() {
        let empty = ResortDirectory::new(Some(Arc::new(FakeProvider(Ok(vec![])))));
        assert_eq!(empty.search(DEFAULT_CITY, DEFAULT_KEYWORDS).await, default_resorts());

        let failing = ResortDirectory::new(Some(Arc::new(FakeProvider(Err(anyhow::anyhow!("502"))))));
        assert_eq!(failing.search(DEFAULT_CITY, DEFAULT_KEYWORDS).await, default_resorts());
        assert_eq!(failing.known(), default_resorts());
    }

    #[tokio::test]
    async fn no_provider_means_built_in_list() {
        let dir = ResortDirectory::new(None);
        assert_eq!(dir.search(DEFAULT_CITY, DEFAULT_KEYWORDS).await.len(), 6);
        assert!(dir.find("nope").is_none());
    }
}
