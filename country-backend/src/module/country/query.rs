use country_common::{Country, CountryQuery, SortKey};
use std::cmp::Ordering;

/// Apply the listing filters and ordering to a set of records
///
/// Region and currency filters are case-insensitive exact matches. Records
/// without a GDP sort after all others in both GDP orders; ties are broken
/// by name.
pub fn filter_and_sort<'a>(
    countries: impl IntoIterator<Item = &'a Country>,
    query: &CountryQuery,
) -> Vec<Country> {
    let region = normalized(&query.region);
    let currency = normalized(&query.currency);

    let mut matched: Vec<Country> = countries
        .into_iter()
        .filter(|c| matches_filter(&c.region, region.as_deref()))
        .filter(|c| matches_filter(&c.currency_code, currency.as_deref()))
        .cloned()
        .collect();

    let compare = comparator(query.sort_key());
    matched.sort_by(compare);
    matched
}

pub fn comparator(sort: SortKey) -> fn(&Country, &Country) -> Ordering {
    match sort {
        SortKey::GdpDesc => gdp_desc,
        SortKey::GdpAsc => gdp_asc,
        SortKey::PopulationDesc => population_desc,
        SortKey::PopulationAsc => population_asc,
    }
}

fn population_desc(a: &Country, b: &Country) -> Ordering {
    b.population.cmp(&a.population).then_with(|| by_name(a, b))
}

fn population_asc(a: &Country, b: &Country) -> Ordering {
    a.population.cmp(&b.population).then_with(|| by_name(a, b))
}

pub fn gdp_desc(a: &Country, b: &Country) -> Ordering {
    match (&a.estimated_gdp, &b.estimated_gdp) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| by_name(a, b))
}

pub fn gdp_asc(a: &Country, b: &Country) -> Ordering {
    match (&a.estimated_gdp, &b.estimated_gdp) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| by_name(a, b))
}

fn by_name(a: &Country, b: &Country) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn matches_filter(field: &Option<String>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => field.as_deref().is_some_and(|v| v.to_lowercase() == wanted),
    }
}
