use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkiResort {
    pub id: String,
    pub name: String,
    pub address: String,
    /// "lng,lat", as returned by the POI provider.
    pub location: String,
    pub rating: f64,
    pub tel: Option<String>,
    pub city_name: String,
    pub district: String,
    pub photo_url: Option<String>,
}

impl SkiResort {
    /// Coordinates in the "lat,lng" order the weather provider expects.
    pub fn weather_query(&self) -> Option<String> {
        let (lng, lat) = self.location.split_once(',')?;
        let (lng, lat) = (lng.trim(), lat.trim());
        if lng.parse::<f64>().is_err() || lat.parse::<f64>().is_err() {
            return None;
        }
        Some(format!("{lat},{lng}"))
    }

    pub fn display_address(&self) -> String {
        match (self.district.trim(), self.city_name.trim()) {
            ("", city) => city.to_string(),
            (district, "") => district.to_string(),
            (district, city) => format!("{district}, {city}"),
        }
    }
}

fn resort(
    id: &str,
    name: &str,
    address: &str,
    location: &str,
    rating: f64,
    tel: &str,
    district: &str,
    photo_url: &str,
) -> SkiResort {
    SkiResort {
        id: id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        location: location.to_string(),
        rating,
        tel: Some(tel.to_string()),
        city_name: "Beijing".to_string(),
        district: district.to_string(),
        photo_url: Some(photo_url.to_string()),
    }
}

/// Built-in resorts used whenever the directory lookup fails or comes back empty.
pub fn default_resorts() -> Vec<SkiResort> {
    vec![
        resort(
            "B000A9WZYZ",
            "Beijing Nanshan Ski Resort",
            "Shengshuitou Village, Henanzhai Town",
            "116.862291,40.330682",
            4.7,
            "010-84411182",
            "Miyun",
            "http://aos-cdn-image.amap.com/sns/ugccomment/3536b704-a109-4932-b1cd-034bd594dc93.jpg",
        ),
        resort(
            "B000A7PQ9P",
            "Beijing Jundushan Ski Resort",
            "588 Zhenshun Village, Cuicun Town",
            "116.331248,40.239676",
            4.6,
            "010-60725888",
            "Changping",
            "http://store.is.autonavi.com/showpic/afeffb36fcc6b0b110828a07c0dfd2b2",
        ),
        resort(
            "B000A7ZMPK",
            "Beijing Yuyang International Ski Resort",
            "688 East Dawangwu Village, Donggaocun Town",
            "117.147716,40.077197",
            4.5,
            "010-69908282",
            "Pinggu",
            "http://store.is.autonavi.com/showpic/ae59fd776e05f7038024d276e49ff1c4",
        ),
        resort(
            "B0HKOUL9IC",
            "National Alpine Skiing Centre",
            "Haituo Mountain, Yanqing",
            "115.810122,40.550457",
            4.5,
            "010-69119500",
            "Yanqing",
            "http://store.is.autonavi.com/showpic/f012c9a2309e8ec2dfed8da02dad7e80",
        ),
        resort(
            "B000A7Q5WI",
            "Beijing Qiaobo Indoor Ski Centre",
            "6 Shun'an Road",
            "116.661514,40.200128",
            4.5,
            "010-60413499",
            "Shunyi",
            "http://store.is.autonavi.com/showpic/03c5bfc20abd5e93204ffff742dd076e",
        ),
        resort(
            "B000A04209",
            "Beijing Huaibei International Ski Resort",
            "548 Hefangkou Village, Huaibei Town",
            "116.656299,40.447449",
            4.5,
            "010-60687328",
            "Huairou",
            "http://store.is.autonavi.com/showpic/2f81c227e06611f29d82a04dbae6cc1a",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_query_swaps_to_lat_lng() {
        let r = &default_resorts()[0];
        assert_eq!(r.weather_query().as_deref(), Some("40.330682,116.862291"));
    }

    #[test]
    fn display_address_skips_blank_parts() {
        let mut r = default_resorts()[0].clone();
        assert_eq!(r.display_address(), "Miyun, Beijing");
        r.district.clear();
        assert_eq!(r.display_address(), "Beijing");
    }

    #[test]
    fn weather_query_rejects_garbage() {
        let mut r = default_resorts()[0].clone();
        r.location = String::new();
        assert_eq!(r.weather_query(), None);
        r.location = "east,north".to_string();
        assert_eq!(r.weather_query(), None);
    }
}
