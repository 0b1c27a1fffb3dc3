//!
//! src/timeline.rs
//!
//! Groups an artist's releases by year. Years are keys of a BTreeMap so
//! they iterate ascending; the order inside a year is chosen by the
//! provider that builds the timeline
//!

use std::collections::BTreeMap;

pub type Timeline<T> = BTreeMap<String, Vec<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    Ascending,
    Descending
}

/// Year prefix of a release date ("1994-04-19" -> "1994"), none when blank
pub fn release_year(date: &str) -> Option<&str> {
    date.split('-')
        .next()
        .map(str::trim)
        .filter(|year| !year.is_empty())
}

/// Entries without a release date are dropped. Sorting is stable, equal
/// dates keep the order the provider returned them in
pub fn build_timeline<T, F>(items: Vec<T>, date_of: F, order: DateOrder) -> Timeline<T>
where
    F: Fn(&T) -> Option<&str>,
{
    let mut timeline: Timeline<T> = BTreeMap::new();
    for item in items {
        let Some(year) = date_of(&item).and_then(release_year).map(str::to_string) else {
            continue;
        };
        timeline.entry(year).or_default().push(item);
    }

    for releases in timeline.values_mut() {
        releases.sort_by(|a, b| {
            let (a, b) = (date_of(a).unwrap_or(""), date_of(b).unwrap_or(""));
            match order {
                DateOrder::Ascending => a.cmp(b),
                DateOrder::Descending => b.cmp(a)
            }
        });
    }
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn releases() -> Vec<(&'static str, Option<&'static str>)> {
        vec![
            ("late", Some("1994-10-01")),
            ("undated", None),
            ("early", Some("1994-04-19")),
            ("blank", Some("")),
            ("next", Some("1996")),
            ("first", Some("1991-07-02")),
        ]
    }

    #[test]
    fn years_ascend_and_undated_entries_drop() {
        let timeline = build_timeline(releases(), |r| r.1, DateOrder::Ascending);
        let years: Vec<&str> = timeline.keys().map(String::as_str).collect();
        assert_eq!(years, vec!["1991", "1994", "1996"]);
        assert_eq!(timeline.values().map(Vec::len).sum::<usize>(), 4);
    }

    #[test]
    fn order_within_year_follows_provider() {
        let asc = build_timeline(releases(), |r| r.1, DateOrder::Ascending);
        let names: Vec<&str> = asc["1994"].iter().map(|r| r.0).collect();
        assert_eq!(names, vec!["early", "late"]);

        let desc = build_timeline(releases(), |r| r.1, DateOrder::Descending);
        let names: Vec<&str> = desc["1994"].iter().map(|r| r.0).collect();
        assert_eq!(names, vec!["late", "early"]);
    }

    #[test]
    fn year_prefix() {
        assert_eq!(release_year("2001-09-11"), Some("2001"));
        assert_eq!(release_year("2001"), Some("2001"));
        assert_eq!(release_year(""), None);
    }
}
