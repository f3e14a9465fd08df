use std::collections::BTreeMap;

pub trait Dated {
    fn key(&self) -> &str;
    fn year(&self) -> i32;
}

// Only a strictly greater year replaces the retained record; ties keep the first.
#[derive(Debug)]
pub struct LatestByKey<R> {
    latest: BTreeMap<String, R>,
}

impl<R: Dated> LatestByKey<R> {
    pub fn new() -> Self {
        Self {
            latest: BTreeMap::new(),
        }
    }

    pub fn offer(&mut self, candidate: R) {
        let newer = self
            .latest
            .get(candidate.key())
            .is_none_or(|current| candidate.year() > current.year());
        if newer {
            self.latest.insert(candidate.key().to_string(), candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    pub fn into_records(self) -> Vec<R> {
        self.latest.into_values().collect()
    }
}

impl<R: Dated> Default for LatestByKey<R> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn parse_year(value: &str) -> Option<i32> {
    value.trim().parse().ok()
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point(&'static str, i32, u8);

    impl Dated for Point {
        fn key(&self) -> &str {
            self.0
        }

        fn year(&self) -> i32 {
            self.1
        }
    }

    #[test]
    fn ties_keep_first_seen() {
        let mut latest = LatestByKey::new();
        latest.offer(Point("FRA", 2020, 1));
        latest.offer(Point("FRA", 2020, 2));
        latest.offer(Point("FRA", 2019, 3));
        let records = latest.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].2, 1);
    }

    #[test]
    fn greater_year_replaces() {
        let mut latest = LatestByKey::new();
        latest.offer(Point("DEU", 2001, 1));
        latest.offer(Point("DEU", 2005, 2));
        latest.offer(Point("AUT", 1999, 3));
        let records = latest.into_records();
        assert_eq!(records.iter().map(|p| p.0).collect::<Vec<_>>(), ["AUT", "DEU"]);
        assert_eq!(records[1].2, 2);
    }

    #[test]
    fn numbers_tolerate_whitespace() {
        assert_eq!(parse_year(" 2020 "), Some(2020));
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("20.5"), None);
        assert_eq!(parse_number("1.5"), Some(1.5));
        assert_eq!(parse_number("n/a"), None);
    }
}
